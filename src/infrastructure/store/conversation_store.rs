use crate::application::ports::{ConversationStore, Snapshots};
use crate::domain::entities::{Conversation, Message, NewMessage};
use crate::domain::value_objects::{ConversationId, UserId};
use crate::infrastructure::store::documents::{self, messages_collection, CHATS};
use crate::infrastructure::store::memory::{MemoryDocumentStore, Query, SortDir, WriteOp};
use crate::infrastructure::store::{relay_snapshots, with_timeout};
use crate::shared::{AppError, StoreConfig};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// `ConversationStore` over the in-memory document store.
pub struct MemoryConversationStore {
    store: Arc<MemoryDocumentStore>,
    op_timeout: Duration,
}

impl MemoryConversationStore {
    pub fn new(store: Arc<MemoryDocumentStore>, config: &StoreConfig) -> Self {
        Self {
            store,
            op_timeout: config.op_timeout(),
        }
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn get_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, AppError> {
        let doc = with_timeout(self.op_timeout, self.store.get(CHATS, id.as_str())).await?;
        doc.as_ref().map(documents::parse_conversation).transpose()
    }

    async fn append_message(
        &self,
        conversation: &ConversationId,
        message: &NewMessage,
    ) -> Result<Message, AppError> {
        let collection = messages_collection(conversation);
        // Insert-if-absent keyed by the client message id. A redelivered
        // append is a no-op and the read-back returns the original message.
        with_timeout(
            self.op_timeout,
            self.store.commit(vec![WriteOp::Insert {
                collection: collection.clone(),
                id: message.id.as_str().into(),
                data: documents::new_message_data(message),
            }]),
        )
        .await?;

        let doc = with_timeout(
            self.op_timeout,
            self.store.get(&collection, message.id.as_str()),
        )
        .await?
        .ok_or_else(|| AppError::Internal(format!("message {} vanished after append", message.id)))?;
        documents::parse_message(&doc)
    }

    async fn update_summary(
        &self,
        conversation: &ConversationId,
        last_message: &str,
    ) -> Result<(), AppError> {
        with_timeout(
            self.op_timeout,
            self.store.commit(vec![WriteOp::Update {
                collection: CHATS.into(),
                id: conversation.as_str().into(),
                data: documents::summary_data(last_message),
            }]),
        )
        .await?;
        Ok(())
    }

    async fn watch_messages(
        &self,
        conversation: &ConversationId,
    ) -> Result<Snapshots<Vec<Message>>, AppError> {
        let query =
            Query::collection(messages_collection(conversation)).order_by("timestamp", SortDir::Asc);
        let rx = with_timeout(self.op_timeout, self.store.subscribe(query)).await?;
        Ok(relay_snapshots(rx, documents::parse_message, |_| {}))
    }

    async fn watch_user_conversations(
        &self,
        user: &UserId,
    ) -> Result<Snapshots<Vec<Conversation>>, AppError> {
        let query =
            Query::collection(CHATS).filter_array_contains("participants", json!(user.as_str()));
        let rx = with_timeout(self.op_timeout, self.store.subscribe(query)).await?;
        // Ordered client-side so the store needs no composite
        // filter-plus-sort support for this query.
        Ok(relay_snapshots(
            rx,
            documents::parse_conversation,
            |conversations: &mut Vec<Conversation>| {
                conversations.sort_by_key(|c| std::cmp::Reverse(c.activity_millis()));
            },
        ))
    }
}
