//! Renders a stored thread as a human-readable transcript.
//!
//! Consecutive user entries are merged into a single block by plain string
//! append; every other role gets a block of its own. Blocks are separated
//! by a `---` line.

use tracing::debug;

use crate::api::models::Role;
use crate::history::entry::Entry;
use crate::history::store::{HistoryStore, StoreError};

const DELIMITER: &str = "\n---\n";

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("failed to read thread '{thread}': {source}")]
    Read {
        thread: String,
        #[source]
        source: StoreError,
    },
}

pub struct History<S> {
    store: S,
}

impl<S: HistoryStore> History<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Read `thread` from the store and render it. Nothing is rendered if the read fails.
    pub fn print(&self, thread: &str) -> Result<String, HistoryError> {
        let entries = self.store.read_thread(thread).map_err(|source| HistoryError::Read {
            thread: thread.to_string(),
            source,
        })?;
        debug!(thread, entries = entries.len(), "rendering thread");
        Ok(render(&entries))
    }
}

fn header(role: &Role) -> String {
    match role {
        Role::System => "**SYSTEM** 💻:".to_string(),
        Role::User => "**USER** 👤:".to_string(),
        Role::Assistant => "**ASSISTANT** 🤖:".to_string(),
        Role::Unknown(label) if label.trim().is_empty() => "**UNKNOWN** ❔:".to_string(),
        Role::Unknown(label) => format!("**{}** ❔:", label),
    }
}

fn push_block(out: &mut String, role: &Role, content: &str) {
    if !out.is_empty() {
        out.push_str(DELIMITER);
    }
    out.push_str(&header(role));
    out.push('\n');
    out.push_str(content);
    out.push('\n');
}

/// Render an ordered entry sequence. An empty sequence yields an empty string.
pub fn render(entries: &[Entry]) -> String {
    let mut out = String::new();
    let mut pending_user: Option<String> = None;

    for entry in entries {
        let content = entry.message.content.as_text();
        match entry.role() {
            Role::User => pending_user.get_or_insert_with(String::new).push_str(&content),
            role => {
                if let Some(run) = pending_user.take() {
                    push_block(&mut out, &Role::User, &run);
                }
                push_block(&mut out, role, &content);
            }
        }
    }
    if let Some(run) = pending_user {
        push_block(&mut out, &Role::User, &run);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::Message;

    fn entries(msgs: Vec<Message>) -> Vec<Entry> {
        msgs.into_iter().map(Entry::from).collect()
    }

    #[test]
    fn exact_layout() {
        let out = render(&entries(vec![
            Message::system("s"),
            Message::user("u1"),
            Message::user("u2"),
            Message::assistant("a"),
        ]));
        assert_eq!(
            out,
            "**SYSTEM** 💻:\ns\n\n---\n**USER** 👤:\nu1u2\n\n---\n**ASSISTANT** 🤖:\na\n"
        );
    }

    #[test]
    fn repeated_assistant_is_not_merged() {
        let out = render(&entries(vec![Message::assistant("a"), Message::assistant("b")]));
        assert_eq!(out, "**ASSISTANT** 🤖:\na\n\n---\n**ASSISTANT** 🤖:\nb\n");
    }

    #[test]
    fn unknown_role_gets_own_block() {
        let out = render(&entries(vec![
            Message::new("tool", "t1"),
            Message::new("tool", "t2"),
        ]));
        assert_eq!(out, "**tool** ❔:\nt1\n\n---\n**tool** ❔:\nt2\n");
    }

    #[test]
    fn unknown_role_labels_stay_distinguishable() {
        let out = render(&entries(vec![Message::new("", "x"), Message::new("User", "y")]));
        assert_eq!(out, "**UNKNOWN** ❔:\nx\n\n---\n**User** ❔:\ny\n");
    }

    #[test]
    fn empty_content_still_emits_block() {
        let out = render(&entries(vec![Message::user("")]));
        assert_eq!(out, "**USER** 👤:\n\n");
    }
}
