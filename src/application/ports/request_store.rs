use crate::application::ports::Snapshots;
use crate::domain::entities::{MatchRequest, NewConversation, NewMatchRequest};
use crate::domain::value_objects::{RequestId, UserId};
use crate::shared::AppError;
use async_trait::async_trait;

/// Thin adapter over the external document store for match requests.
///
/// `accept_request` is the one transactional member: it must apply the status
/// update and the conversation merge-upsert as a single all-or-nothing batch.
/// Partial application (status updated but conversation missing, or vice
/// versa) is a correctness violation.
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn create_request(&self, request: &NewMatchRequest) -> Result<RequestId, AppError>;

    async fn get_request(&self, id: &RequestId) -> Result<Option<MatchRequest>, AppError>;

    /// Atomically marks the request accepted and merge-upserts the
    /// conversation at its deterministic id. The merge must never overwrite
    /// an existing conversation's `created_at` or history.
    async fn accept_request(
        &self,
        id: &RequestId,
        conversation: &NewConversation,
    ) -> Result<(), AppError>;

    async fn decline_request(&self, id: &RequestId) -> Result<(), AppError>;

    /// Pending requests addressed to `owner`, newest first.
    async fn watch_incoming_pending(
        &self,
        owner: &UserId,
    ) -> Result<Snapshots<Vec<MatchRequest>>, AppError>;

    /// Pending requests initiated by `requester`, newest first.
    async fn watch_outgoing_pending(
        &self,
        requester: &UserId,
    ) -> Result<Snapshots<Vec<MatchRequest>>, AppError>;
}
