pub mod client;
pub mod models;
pub mod openai_compat;
