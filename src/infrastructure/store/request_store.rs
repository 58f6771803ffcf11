use crate::application::ports::{RequestStore, Snapshots};
use crate::domain::entities::{MatchRequest, NewConversation, NewMatchRequest};
use crate::domain::value_objects::{RequestId, UserId};
use crate::infrastructure::store::documents::{self, CHATS, MATCH_REQUESTS};
use crate::infrastructure::store::memory::{MemoryDocumentStore, Query, SortDir, WriteOp};
use crate::infrastructure::store::{relay_snapshots, with_timeout};
use crate::shared::{AppError, StoreConfig};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// `RequestStore` over the in-memory document store. Owns the document
/// validation and the per-operation timeout policy; callers never see raw
/// documents or timeout machinery.
pub struct MemoryRequestStore {
    store: Arc<MemoryDocumentStore>,
    op_timeout: Duration,
}

impl MemoryRequestStore {
    pub fn new(store: Arc<MemoryDocumentStore>, config: &StoreConfig) -> Self {
        Self {
            store,
            op_timeout: config.op_timeout(),
        }
    }
}

#[async_trait]
impl RequestStore for MemoryRequestStore {
    async fn create_request(&self, request: &NewMatchRequest) -> Result<RequestId, AppError> {
        let ids = with_timeout(
            self.op_timeout,
            self.store.commit(vec![WriteOp::Create {
                collection: MATCH_REQUESTS.into(),
                data: documents::new_request_data(request),
            }]),
        )
        .await?;
        let id = ids
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("create returned no document id".into()))?;
        RequestId::new(id)
    }

    async fn get_request(&self, id: &RequestId) -> Result<Option<MatchRequest>, AppError> {
        let doc = with_timeout(self.op_timeout, self.store.get(MATCH_REQUESTS, id.as_str())).await?;
        doc.as_ref().map(documents::parse_request).transpose()
    }

    async fn accept_request(
        &self,
        id: &RequestId,
        conversation: &NewConversation,
    ) -> Result<(), AppError> {
        // One batch: both writes land or neither does.
        with_timeout(
            self.op_timeout,
            self.store.commit(vec![
                WriteOp::Update {
                    collection: MATCH_REQUESTS.into(),
                    id: id.as_str().into(),
                    data: json!({"status": "accepted"}),
                },
                WriteOp::Upsert {
                    collection: CHATS.into(),
                    id: conversation.id.as_str().into(),
                    data: documents::new_conversation_data(conversation),
                },
            ]),
        )
        .await?;
        Ok(())
    }

    async fn decline_request(&self, id: &RequestId) -> Result<(), AppError> {
        with_timeout(
            self.op_timeout,
            self.store.commit(vec![WriteOp::Update {
                collection: MATCH_REQUESTS.into(),
                id: id.as_str().into(),
                data: json!({"status": "declined"}),
            }]),
        )
        .await?;
        Ok(())
    }

    async fn watch_incoming_pending(
        &self,
        owner: &UserId,
    ) -> Result<Snapshots<Vec<MatchRequest>>, AppError> {
        let query = Query::collection(MATCH_REQUESTS)
            .filter_eq("targetOwnerId", json!(owner.as_str()))
            .filter_eq("status", json!("pending"))
            .order_by("createdAt", SortDir::Desc);
        let rx = with_timeout(self.op_timeout, self.store.subscribe(query)).await?;
        Ok(relay_snapshots(rx, documents::parse_request, |_| {}))
    }

    async fn watch_outgoing_pending(
        &self,
        requester: &UserId,
    ) -> Result<Snapshots<Vec<MatchRequest>>, AppError> {
        let query = Query::collection(MATCH_REQUESTS)
            .filter_eq("requesterId", json!(requester.as_str()))
            .filter_eq("status", json!("pending"))
            .order_by("createdAt", SortDir::Desc);
        let rx = with_timeout(self.op_timeout, self.store.subscribe(query)).await?;
        Ok(relay_snapshots(rx, documents::parse_request, |_| {}))
    }
}
