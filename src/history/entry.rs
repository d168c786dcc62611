use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::models::{Message, Role};

/// One persisted turn of a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub message: Message,
    /// Absent on records written before timestamps were tracked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Entry {
    pub fn new(message: Message) -> Self {
        Self { message, timestamp: Some(Utc::now()) }
    }

    pub fn role(&self) -> &Role {
        &self.message.role
    }
}

impl From<Message> for Entry {
    fn from(message: Message) -> Self {
        Self { message, timestamp: None }
    }
}
