pub mod context;
pub mod entry;
pub mod printer;
pub mod store;

pub use entry::Entry;
pub use printer::{render, History, HistoryError};
pub use store::{FileHistoryStore, HistoryStore, MemoryHistoryStore, StoreError};
