//! Conversation-history manager for chat-completion clients.
//!
//! Threads are stored as ordered [`history::Entry`] records and can be
//! rendered back into a readable transcript with [`history::History`].

pub mod api;
pub mod cli;
pub mod config;
pub mod history;
pub mod utils;
