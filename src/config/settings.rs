use std::{fs, path::Path, path::PathBuf, str::FromStr};

use anyhow::{Context, Result};
use dirs::home_dir;
use serde::{Deserialize, Serialize};

use crate::api::models::{CompletionsRequest, Message};
use crate::api::openai_compat::DEFAULT_BASE_URL;
use crate::history::FileHistoryStore;

const APP_DIR_NAME: &str = ".convo";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_key: Option<String>,
    pub model: String,
    /// Base URL for OpenAI-compatible providers
    pub base_url: Option<String>,
    /// Thread used when `--thread` is not given
    pub thread: String,
    /// Where thread files live; defaults to ~/.convo/history
    pub history_dir: Option<String>,
    /// Send only the current prompt and skip persisting the exchange
    pub omit_history: bool,
    /// Approximate token budget for replayed history (0 = unlimited)
    pub context_window: usize,
    /// System prompt seeded into new threads
    pub role: Option<String>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub max_tokens: Option<u32>,
    pub seed: Option<i64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            thread: "default".to_string(),
            history_dir: None,
            omit_history: false,
            context_window: 8192,
            role: Some("You are a helpful assistant.".to_string()),
            temperature: None,
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
            max_tokens: None,
            seed: None,
        }
    }
}

fn parse_opt<T: FromStr>(key: &str, value: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    let parsed = value
        .parse::<T>()
        .with_context(|| format!("Invalid value for {}: {}", key, value))?;
    Ok(Some(parsed))
}

fn parse_opt_string(value: &str) -> Option<String> {
    if value.is_empty() || value.eq_ignore_ascii_case("none") { None } else { Some(value.to_owned()) }
}

impl Settings {
    pub fn load_with(project_root: Option<&Path>, explicit: Option<&Path>) -> Result<Self> {
        let path = resolve_config_path(project_root, explicit)?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let value: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config TOML at {}", path.display()))?;
        Ok(value)
    }

    pub fn save_with(&self, project_root: Option<&Path>, explicit: Option<&Path>) -> Result<()> {
        let (dir, path) = resolve_config_dir_and_file(project_root, explicit)?;
        if !dir.exists() {
            fs::create_dir_all(&dir).with_context(|| format!(
                "Failed to create config directory at {}",
                dir.display()
            ))?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write config at {}", path.display()))?;
        Ok(())
    }

    pub fn load(explicit: Option<&Path>) -> Result<Self> { Self::load_with(None, explicit) }
    pub fn save(&self, explicit: Option<&Path>) -> Result<()> { self.save_with(None, explicit) }

    pub fn init_scoped(force: bool, project_root: Option<&Path>) -> Result<PathBuf> {
        let (dir, file) = if let Some(root) = project_root {
            (root.to_path_buf(), root.join(CONFIG_FILE_NAME))
        } else {
            (config_dir_path()?, config_file_path()?)
        };
        if file.exists() && !force {
            anyhow::bail!("Config already exists at {} (use --force to overwrite)", file.display());
        }
        if !dir.exists() { fs::create_dir_all(&dir)?; }
        let default = Self::default();
        let content = toml::to_string_pretty(&default)?;
        fs::write(&file, content)?;
        Ok(file)
    }

    /// Update one field from its textual form. `none` or an empty value clears optional fields.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key.replace('-', "_").as_str() {
            "api_key" => self.api_key = parse_opt_string(value),
            "model" => self.model = value.to_owned(),
            "base_url" => self.base_url = parse_opt_string(value),
            "thread" => {
                crate::history::store::validate_thread_name(value)?;
                self.thread = value.to_owned()
            }
            "history_dir" => self.history_dir = parse_opt_string(value),
            "omit_history" => {
                self.omit_history = value
                    .parse()
                    .with_context(|| format!("Invalid value for {}: {}", key, value))?
            }
            "context_window" => {
                self.context_window = value
                    .parse()
                    .with_context(|| format!("Invalid value for {}: {}", key, value))?
            }
            "role" => self.role = parse_opt_string(value),
            "temperature" => self.temperature = parse_opt(key, value)?,
            "top_p" => self.top_p = parse_opt(key, value)?,
            "frequency_penalty" => self.frequency_penalty = parse_opt(key, value)?,
            "presence_penalty" => self.presence_penalty = parse_opt(key, value)?,
            "max_tokens" => self.max_tokens = parse_opt(key, value)?,
            "seed" => self.seed = parse_opt(key, value)?,
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn history_dir(&self) -> Result<PathBuf> {
        match &self.history_dir {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => FileHistoryStore::default_dir().context("Cannot resolve home directory"),
        }
    }

    /// Request skeleton carrying the tuning parameters from this config.
    pub fn completions_request(&self, messages: Vec<Message>) -> CompletionsRequest {
        CompletionsRequest {
            model: self.model.clone(),
            temperature: self.temperature,
            top_p: self.top_p,
            frequency_penalty: self.frequency_penalty,
            presence_penalty: self.presence_penalty,
            max_completion_tokens: self.max_tokens,
            seed: self.seed,
            messages,
            stream: false,
        }
    }
}

fn config_dir_path() -> Result<PathBuf> {
    let home = home_dir().context("Cannot resolve home directory")?;
    Ok(home.join(APP_DIR_NAME))
}

fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir_path()?.join(CONFIG_FILE_NAME))
}

fn resolve_config_path(project_root: Option<&Path>, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = explicit { return Ok(p.to_path_buf()); }
    if let Some(root) = project_root { return Ok(root.join(CONFIG_FILE_NAME)); }
    config_file_path()
}

fn resolve_config_dir_and_file(project_root: Option<&Path>, explicit: Option<&Path>) -> Result<(PathBuf, PathBuf)> {
    if let Some(p) = explicit {
        let dir = p.parent().unwrap_or_else(|| Path::new("."));
        return Ok((dir.to_path_buf(), p.to_path_buf()));
    }
    if let Some(root) = project_root {
        return Ok((root.to_path_buf(), root.join(CONFIG_FILE_NAME)));
    }
    let dir = config_dir_path()?;
    Ok((dir.clone(), dir.join(CONFIG_FILE_NAME)))
}
