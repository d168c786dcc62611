use crate::api::models::Role;
use crate::history::entry::Entry;

/// Rough per-message cost of role and framing tokens.
const MESSAGE_OVERHEAD: usize = 4;

pub fn estimate_tokens(entry: &Entry) -> usize {
    entry.message.content.as_text().split_whitespace().count() + MESSAGE_OVERHEAD
}

/// Drop the oldest non-system entries until the estimate fits `max_tokens`.
///
/// System entries and the final entry (the pending prompt) are never
/// dropped, so the result can still exceed the budget when they alone are
/// too large. `max_tokens == 0` disables trimming.
pub fn trim_to_context(entries: &[Entry], max_tokens: usize) -> Vec<Entry> {
    if max_tokens == 0 {
        return entries.to_vec();
    }

    let mut total: usize = entries.iter().map(estimate_tokens).sum();
    let mut keep = vec![true; entries.len()];
    let droppable = entries.len().saturating_sub(1);
    for (i, entry) in entries[..droppable].iter().enumerate() {
        if total <= max_tokens {
            break;
        }
        if *entry.role() == Role::System {
            continue;
        }
        keep[i] = false;
        total -= estimate_tokens(entry);
    }

    entries
        .iter()
        .zip(keep)
        .filter_map(|(entry, kept)| kept.then(|| entry.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::Message;

    fn e(msg: Message) -> Entry { Entry::from(msg) }

    #[test]
    fn zero_budget_keeps_everything() {
        let all = vec![e(Message::user("one two")), e(Message::assistant("three"))];
        assert_eq!(trim_to_context(&all, 0), all);
    }

    #[test]
    fn drops_oldest_but_keeps_system() {
        let all = vec![
            e(Message::system("be brief")),          // 2 + 4
            e(Message::user("first question here")), // 3 + 4
            e(Message::assistant("first answer")),   // 2 + 4
            e(Message::user("second")),              // 1 + 4
        ];
        let trimmed = trim_to_context(&all, 12);
        assert_eq!(trimmed, vec![all[0].clone(), all[3].clone()]);
    }

    #[test]
    fn fits_untouched() {
        let all = vec![e(Message::user("hi")), e(Message::assistant("hello"))];
        assert_eq!(trim_to_context(&all, 100), all);
    }

    #[test]
    fn oversized_prompt_survives() {
        let prompt = "one two three four five six seven eight nine ten eleven";
        let all = vec![
            e(Message::system("sys")),
            e(Message::assistant("a")),
            e(Message::user(prompt)),
        ];
        let trimmed = trim_to_context(&all, 10);
        assert_eq!(trimmed, vec![all[0].clone(), all[2].clone()]);
    }
}
