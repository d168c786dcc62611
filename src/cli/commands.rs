use std::path::Path;

use anyhow::{anyhow, Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::api::client::HttpClient;
use crate::api::models::Message;
use crate::api::openai_compat::{chat_complete, chat_complete_stream};
use crate::cli::args::{IoArgs, RuntimeArgs};
use crate::config::settings::{Settings, API_KEY_ENV};
use crate::history::context::trim_to_context;
use crate::history::store::{self, validate_thread_name};
use crate::history::{
    Entry, FileHistoryStore, History, HistoryStore, MemoryHistoryStore, StoreError,
};
use crate::utils::format;

/// Entries to persist for one exchange, plus the messages to send.
#[derive(Debug)]
pub struct Turn {
    pub new_entries: Vec<Entry>,
    pub messages: Vec<Message>,
}

/// Assemble the outgoing conversation from stored history and a new prompt.
///
/// A fresh thread gets the configured system role as its first entry.
pub fn prepare_turn(history: &[Entry], prompt: &str, settings: &Settings) -> Turn {
    let mut new_entries = Vec::new();
    if history.is_empty() {
        if let Some(role) = settings.role.as_deref().filter(|r| !r.trim().is_empty()) {
            new_entries.push(Entry::new(Message::system(role)));
        }
    }
    new_entries.push(Entry::new(Message::user(prompt)));

    let mut all = history.to_vec();
    all.extend(new_entries.iter().cloned());
    let messages = trim_to_context(&all, settings.context_window)
        .into_iter()
        .map(|e| e.message)
        .collect();
    Turn { new_entries, messages }
}

fn resolve_thread<'a>(settings: &'a Settings, runtime: &'a RuntimeArgs) -> Result<&'a str> {
    let thread = runtime.thread.as_deref().unwrap_or(&settings.thread);
    validate_thread_name(thread)?;
    Ok(thread)
}

fn open_store(settings: &Settings) -> Result<FileHistoryStore> {
    Ok(FileHistoryStore::new(settings.history_dir()?))
}

/// Store for a chat turn. With history omitted the turn starts empty and is never persisted.
pub fn open_turn_store(settings: &Settings, omit_history: bool) -> Result<Box<dyn HistoryStore>> {
    if omit_history {
        debug!("history omitted, using in-memory store");
        return Ok(Box::new(MemoryHistoryStore::new()));
    }
    Ok(Box::new(open_store(settings)?))
}

fn read_or_empty(store: &dyn HistoryStore, thread: &str) -> Result<Vec<Entry>> {
    match store.read_thread(thread) {
        Ok(entries) => Ok(entries),
        Err(StoreError::NotFound(_)) => Ok(Vec::new()),
        Err(e) => Err(e).with_context(|| format!("Failed to load thread {}", thread)),
    }
}

pub async fn handle_interactive(settings: &Settings, runtime: &RuntimeArgs, io: &IoArgs) -> Result<()> {
    use dialoguer::Input;
    println!("{}", style("Interactive mode. Ctrl+C to exit.").cyan());
    loop {
        let line: String = Input::new().with_prompt("You").interact_text()?;
        if line.trim().is_empty() { continue; }
        handle_chat(settings, Some(line), runtime, io).await?;
    }
}

pub async fn handle_chat(settings: &Settings, prompt: Option<String>, runtime: &RuntimeArgs, io: &IoArgs) -> Result<()> {
    // Prefer file input if provided
    let prompt = match (&io.input_file, &prompt) {
        (Some(path), _) => crate::utils::io::read_to_string(path)?.trim().to_string(),
        (None, Some(p)) if !p.trim().is_empty() => p.to_string(),
        _ => return Err(anyhow!("Prompt is empty. Provide text or use interactive/chat mode.")),
    };

    // Resolve API key: config first, then env
    let api_key = settings
        .api_key
        .clone()
        .or_else(|| std::env::var(API_KEY_ENV).ok())
        .ok_or_else(|| anyhow!("API key is not set. Use `config set api-key ...` or set env {}", API_KEY_ENV))?;
    let api_key = crate::utils::secrets::normalize_api_key(&api_key);

    let thread = resolve_thread(settings, runtime)?;
    let omit_history = settings.omit_history || runtime.no_history;
    let store = open_turn_store(settings, omit_history)?;

    let history = read_or_empty(&*store, thread)?;
    let turn = prepare_turn(&history, &prompt, settings);
    debug!(thread, history = history.len(), sent = turn.messages.len(), "prepared turn");

    let mut request = settings.completions_request(turn.messages);
    if let Some(model) = &runtime.model {
        request.model = model.clone();
    }

    let client = HttpClient::new()?.client;
    let reply = if runtime.stream {
        let content = chat_complete_stream(&client, settings.base_url(), &api_key, request, |chunk| {
            print!("{}", chunk);
            let _ = std::io::Write::flush(&mut std::io::stdout());
        }).await?;
        // newline after stream
        println!();
        Message::assistant(content)
    } else {
        let pb = ProgressBar::new_spinner().with_message("Waiting for completion...");
        if let Ok(spinner) = ProgressStyle::with_template("{spinner} {msg}") {
            pb.set_style(spinner);
        }
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        let result = chat_complete(&client, settings.base_url(), &api_key, request).await;
        pb.finish_and_clear();
        let reply = result?;
        println!("{}", reply.content.as_text());
        reply
    };

    let mut entries = turn.new_entries;
    entries.push(Entry::new(reply.clone()));
    store::append(&*store, thread, &entries)
        .with_context(|| format!("Failed to save thread {}", thread))?;
    if !omit_history {
        info!(thread, appended = entries.len(), "recorded exchange");
    }

    if let Some(out) = &io.output_file { crate::utils::io::write_string(out, &reply.content.as_text())?; }
    Ok(())
}

pub async fn handle_history(settings: &Settings, runtime: &RuntimeArgs, io: &IoArgs, thread: Option<&str>) -> Result<()> {
    let thread = match thread {
        Some(t) => t,
        None => resolve_thread(settings, runtime)?,
    };
    let store = open_store(settings)?;
    let transcript = History::new(&store).print(thread)?;

    if transcript.is_empty() {
        eprintln!("{}", format::warn(&format!("Thread {} is empty", thread)));
        return Ok(());
    }
    if let Some(out) = &io.output_file {
        crate::utils::io::write_string(out, &transcript)?;
        eprintln!("{}", format::success(&format!("Wrote transcript to {}", out)));
    } else {
        print!("{}", transcript);
    }
    Ok(())
}

pub async fn handle_thread_list(settings: &Settings, runtime: &RuntimeArgs) -> Result<()> {
    let store = open_store(settings)?;
    let current = runtime.thread.as_deref().unwrap_or(&settings.thread);
    let threads = store.list_threads()?;
    if threads.is_empty() {
        println!("No threads in {}", store.dir().display());
        return Ok(());
    }
    for name in threads {
        let mark = if name == current { "*" } else { " " };
        let count = store.read_thread(&name).map(|e| e.len());
        match count {
            Ok(n) => println!("{} {} ({} entries)", mark, name, n),
            Err(e) => println!("{} {} {}", mark, name, format::error(&format!("({})", e))),
        }
    }
    Ok(())
}

pub async fn handle_thread_delete(settings: &Settings, name: &str) -> Result<()> {
    let store = open_store(settings)?;
    store.delete_thread(name)?;
    println!("{}", format::success(&format!("Deleted thread {}", name)));
    Ok(())
}

pub async fn handle_config_init(force: bool, scope: Option<&str>) -> Result<()> {
    let project_root = match scope {
        Some("project") => Some(std::env::current_dir()?),
        _ => None,
    };
    let path = Settings::init_scoped(force, project_root.as_deref())?;
    println!("{}", format::success(&format!("Wrote default config to {}", path.display())));
    Ok(())
}

pub async fn handle_config_list(settings: &Settings) -> Result<()> {
    println!("api_key: {}", settings.api_key.as_deref().map(format::mask_secret).unwrap_or_else(|| "-".to_string()));
    println!("model: {}", settings.model);
    println!("base_url: {}", settings.base_url());
    println!("thread: {}", settings.thread);
    println!("history_dir: {}", settings.history_dir()?.display());
    println!("omit_history: {}", settings.omit_history);
    println!("context_window: {}", settings.context_window);
    println!("role: {}", settings.role.as_deref().unwrap_or("-"));
    let opt = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
    println!("temperature: {}", opt(settings.temperature.map(|v| v.to_string())));
    println!("top_p: {}", opt(settings.top_p.map(|v| v.to_string())));
    println!("frequency_penalty: {}", opt(settings.frequency_penalty.map(|v| v.to_string())));
    println!("presence_penalty: {}", opt(settings.presence_penalty.map(|v| v.to_string())));
    println!("max_tokens: {}", opt(settings.max_tokens.map(|v| v.to_string())));
    println!("seed: {}", opt(settings.seed.map(|v| v.to_string())));
    Ok(())
}

pub async fn handle_config_set(settings: &mut Settings, key: &str, value: &str, config: Option<&Path>) -> Result<()> {
    settings.set(key, value)?;
    settings.save(config)?;
    println!("{}", format::success(&format!("Set {}", key)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::Role;

    #[test]
    fn new_thread_is_seeded_with_role() {
        let settings = Settings::default();
        let turn = prepare_turn(&[], "hello", &settings);
        assert_eq!(turn.new_entries.len(), 2);
        assert_eq!(*turn.new_entries[0].role(), Role::System);
        assert_eq!(turn.messages.last(), Some(&Message::user("hello")));
    }

    #[test]
    fn existing_thread_is_replayed_without_reseeding() {
        let settings = Settings::default();
        let history = vec![
            Entry::from(Message::system("sys")),
            Entry::from(Message::user("q1")),
            Entry::from(Message::assistant("a1")),
        ];
        let turn = prepare_turn(&history, "q2", &settings);
        assert_eq!(turn.new_entries.len(), 1);
        assert_eq!(turn.messages.len(), 4);
        assert_eq!(turn.messages[2], Message::assistant("a1"));
    }

    #[test]
    fn blank_role_is_not_seeded() {
        let settings = Settings { role: Some("  ".into()), ..Settings::default() };
        let turn = prepare_turn(&[], "hi", &settings);
        assert_eq!(turn.new_entries.len(), 1);
    }

    #[test]
    fn oversized_prompt_is_still_sent() {
        let settings = Settings { context_window: 10, ..Settings::default() };
        let history = vec![Entry::from(Message::system("sys")), Entry::from(Message::assistant("a"))];
        let prompt = "one two three four five six seven eight nine ten eleven";
        let turn = prepare_turn(&history, prompt, &settings);
        assert_eq!(turn.messages, vec![Message::system("sys"), Message::user(prompt)]);
    }

    #[test]
    fn omitted_history_never_touches_disk() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            history_dir: Some(dir.path().join("history").to_string_lossy().into_owned()),
            ..Settings::default()
        };
        let store = open_turn_store(&settings, true).unwrap();
        store::append(&*store, "default", &[Entry::new(Message::user("hi"))]).unwrap();
        assert!(!dir.path().join("history").exists());

        let store = open_turn_store(&settings, false).unwrap();
        store::append(&*store, "default", &[Entry::new(Message::user("hi"))]).unwrap();
        assert!(dir.path().join("history").join("default.json").exists());
    }
}
