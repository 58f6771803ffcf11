use crate::domain::value_objects::{MessageId, UserId};
use chrono::{DateTime, Utc};

/// Write shape for a message append. The id is generated client-side so a
/// retried append is idempotent at the store level.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub id: MessageId,
    pub sender_id: UserId,
    pub body: String,
}

impl NewMessage {
    pub fn new(sender_id: UserId, body: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            sender_id,
            body: body.into(),
        }
    }
}

/// An immutable chat message. Ordered by `sent_at` ascending with the store's
/// insertion sequence breaking ties.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub seq: u64,
}

impl Message {
    pub fn sent_at_millis(&self) -> i64 {
        self.sent_at.timestamp_millis()
    }
}
