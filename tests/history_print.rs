use std::sync::atomic::{AtomicUsize, Ordering};

use convo_cli::api::models::{ContentPart, Message};
use convo_cli::history::{Entry, History, HistoryError, HistoryStore, StoreError};

const THREAD: &str = "threadName";

/// Serves a fixed result for one thread and counts reads.
struct StubStore {
    entries: Option<Vec<Entry>>,
    reads: AtomicUsize,
}

impl StubStore {
    fn with(msgs: Vec<Message>) -> Self {
        Self { entries: Some(msgs.into_iter().map(Entry::from).collect()), reads: Default::default() }
    }

    fn failing() -> Self {
        Self { entries: None, reads: Default::default() }
    }
}

impl HistoryStore for StubStore {
    fn read_thread(&self, name: &str) -> Result<Vec<Entry>, StoreError> {
        assert_eq!(name, THREAD);
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.entries.clone().ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn write_thread(&self, _: &str, _: &[Entry]) -> Result<(), StoreError> {
        panic!("renderer must not write");
    }

    fn list_threads(&self) -> Result<Vec<String>, StoreError> { Ok(vec![]) }

    fn delete_thread(&self, _: &str) -> Result<(), StoreError> {
        panic!("renderer must not delete");
    }
}

#[test]
fn store_error_is_propagated() {
    let store = StubStore::failing();
    let err = History::new(&store).print(THREAD).unwrap_err();
    let HistoryError::Read { thread, source } = &err;
    assert_eq!(thread, THREAD);
    assert!(matches!(source, StoreError::NotFound(_)));
    assert!(err.to_string().contains("threadName"));
    assert_eq!(store.reads.load(Ordering::SeqCst), 1);
}

#[test]
fn empty_thread_renders_empty_string() {
    let result = History::new(StubStore::with(vec![])).print(THREAD).unwrap();
    assert_eq!(result, "");
}

#[test]
fn concatenates_multiple_user_messages() {
    let store = StubStore::with(vec![
        Message::user("first message"),
        Message::user(" second message"),
        Message::assistant("response"),
    ]);
    let result = History::new(store).print(THREAD).unwrap();
    assert!(result.contains("**USER** 👤:\nfirst message second message\n"));
    assert!(result.contains("**ASSISTANT** 🤖:\nresponse\n"));
}

#[test]
fn prints_all_roles_in_order() {
    let store = StubStore::with(vec![
        Message::system("system message"),
        Message::user("user message"),
        Message::assistant("assistant message"),
    ]);
    let result = History::new(store).print(THREAD).unwrap();
    assert_eq!(
        result,
        "**SYSTEM** 💻:\nsystem message\n\
         \n---\n**USER** 👤:\nuser message\n\
         \n---\n**ASSISTANT** 🤖:\nassistant message\n"
    );
}

#[test]
fn flushes_trailing_user_run() {
    let store = StubStore::with(vec![Message::user("first message"), Message::user(" second message")]);
    let result = History::new(store).print(THREAD).unwrap();
    assert_eq!(result, "**USER** 👤:\nfirst message second message\n");
}

#[test]
fn user_runs_split_by_other_roles_stay_separate() {
    let store = StubStore::with(vec![
        Message::user("a"),
        Message::assistant("b"),
        Message::user("c"),
        Message::user("d"),
    ]);
    let result = History::new(store).print(THREAD).unwrap();
    assert_eq!(
        result,
        "**USER** 👤:\na\n\n---\n**ASSISTANT** 🤖:\nb\n\n---\n**USER** 👤:\ncd\n"
    );
    assert_eq!(result.matches("\n---\n").count(), 2);
}

#[test]
fn multipart_content_is_flattened() {
    let store = StubStore::with(vec![Message::user(vec![
        ContentPart::text("what is this? "),
        ContentPart::image("https://example.com/cat.png"),
    ])]);
    let result = History::new(store).print(THREAD).unwrap();
    assert_eq!(result, "**USER** 👤:\nwhat is this? [image: https://example.com/cat.png]\n");
}

#[test]
fn rendering_is_repeatable() {
    let store = StubStore::with(vec![
        Message::system("s"),
        Message::user("u"),
        Message::user("v"),
        Message::assistant("a"),
    ]);
    let history = History::new(store);
    let first = history.print(THREAD).unwrap();
    let second = history.print(THREAD).unwrap();
    assert_eq!(first, second);
}
