use crate::application::ports::{ConversationStore, Snapshots};
use crate::domain::entities::{Conversation, Message, NewMessage};
use crate::domain::value_objects::{ConversationId, UserId};
use crate::shared::{AppError, LimitsConfig};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

/// An open conversation view: the live message stream, the local draft
/// buffer, and send/retry behavior.
///
/// One message subscription per open session. Dropping the session releases
/// it, so navigating to another conversation cannot leak the previous one.
pub struct ConversationSession {
    conversation: Conversation,
    user: UserId,
    store: Arc<dyn ConversationStore>,
    messages: Snapshots<Vec<Message>>,
    draft: String,
    max_message_len: usize,
}

impl std::fmt::Debug for ConversationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationSession")
            .field("conversation", &self.conversation)
            .field("user", &self.user)
            .field("draft", &self.draft)
            .field("max_message_len", &self.max_message_len)
            .finish_non_exhaustive()
    }
}

impl ConversationSession {
    pub async fn open(
        store: Arc<dyn ConversationStore>,
        user: UserId,
        conversation_id: ConversationId,
        limits: &LimitsConfig,
    ) -> Result<Self, AppError> {
        let conversation = store
            .get_conversation(&conversation_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("conversation {conversation_id}")))?;
        if !conversation.participants.contains(&user) {
            return Err(AppError::InvalidInput(format!(
                "{user} is not a participant of conversation {conversation_id}"
            )));
        }

        let messages = store.watch_messages(&conversation_id).await?;
        Ok(Self {
            conversation,
            user,
            store,
            messages,
            draft: String::new(),
            max_message_len: limits.max_message_len,
        })
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn counterpart(&self) -> Option<&UserId> {
        self.conversation.counterpart(&self.user)
    }

    /// Current message snapshot, ascending by `sent_at`.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.current()
    }

    pub fn watch_messages(&self) -> watch::Receiver<Vec<Message>> {
        self.messages.watch()
    }

    pub async fn changed(&mut self) -> Result<(), AppError> {
        self.messages.changed().await
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Sends the draft buffer. On failure before the append commits, the
    /// composed text is restored so nothing is silently lost.
    pub async fn send_draft(&mut self) -> Result<Message, AppError> {
        let draft = std::mem::take(&mut self.draft);
        match self.send(&draft).await {
            Ok(message) => Ok(message),
            Err(err) => {
                self.draft = draft;
                Err(err)
            }
        }
    }

    /// Appends a message, then refreshes the conversation summary.
    ///
    /// The two writes are deliberately not atomic: the summary is advisory
    /// and self-heals on the next send, so a failure after the committed
    /// append is logged and not retried.
    pub async fn send(&self, body: &str) -> Result<Message, AppError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(AppError::InvalidInput(
                "message body must not be empty".into(),
            ));
        }
        if body.chars().count() > self.max_message_len {
            return Err(AppError::InvalidInput(format!(
                "message body exceeds {} characters",
                self.max_message_len
            )));
        }

        let message = NewMessage::new(self.user.clone(), body);
        let stored = self
            .store
            .append_message(&self.conversation.id, &message)
            .await?;

        if let Err(err) = self.store.update_summary(&self.conversation.id, body).await {
            warn!(
                conversation = %self.conversation.id,
                error = %err,
                "summary update failed after committed append"
            );
        }
        Ok(stored)
    }
}
