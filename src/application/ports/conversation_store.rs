use crate::application::ports::Snapshots;
use crate::domain::entities::{Conversation, Message, NewMessage};
use crate::domain::value_objects::{ConversationId, UserId};
use crate::shared::AppError;
use async_trait::async_trait;

/// Thin adapter over the external document store for conversations and their
/// message subcollections.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn get_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, AppError>;

    /// Appends a message. Idempotent by message id: redelivering the same
    /// append returns the already-stored message instead of duplicating it.
    async fn append_message(
        &self,
        conversation: &ConversationId,
        message: &NewMessage,
    ) -> Result<Message, AppError>;

    /// Updates the denormalized `last_message` summary. Separate from the
    /// append on purpose: losing this write is acceptable and self-heals on
    /// the next send.
    async fn update_summary(
        &self,
        conversation: &ConversationId,
        last_message: &str,
    ) -> Result<(), AppError>;

    /// The conversation's message stream, ascending by `sent_at` with
    /// insertion order breaking ties.
    async fn watch_messages(
        &self,
        conversation: &ConversationId,
    ) -> Result<Snapshots<Vec<Message>>, AppError>;

    /// All conversations `user` participates in, most recent activity first.
    async fn watch_user_conversations(
        &self,
        user: &UserId,
    ) -> Result<Snapshots<Vec<Conversation>>, AppError>;
}
