use crate::application::ports::RequestStore;
use crate::domain::entities::{NewConversation, NewMatchRequest, RequestDecision, RequestStatus};
use crate::domain::value_objects::{OwnerIdentity, RequestId, SubjectId, UserId};
use crate::shared::AppError;
use std::sync::Arc;
use tracing::{debug, info};

/// Owns the pending/accepted/declined state machine for match requests and
/// the accept-time transactional write that creates the conversation.
///
/// Mutual exclusion for the one-conversation-per-pair invariant is
/// structural: the conversation is written under its deterministic pair id
/// with merge semantics, so a multi-writer accept race converges on a single
/// document without any locking.
pub struct MatchLifecycleService {
    requests: Arc<dyn RequestStore>,
}

impl MatchLifecycleService {
    pub fn new(requests: Arc<dyn RequestStore>) -> Self {
        Self { requests }
    }

    /// Creates a pending request from `requester` toward a subject owned by
    /// `target_owner`. Duplicate pending requests toward the same target are
    /// tolerated here; the projector deduplicates them in the derived view.
    pub async fn send_request(
        &self,
        requester: &OwnerIdentity,
        target_owner: &UserId,
        target_subject_id: &SubjectId,
        target_subject_name: &str,
    ) -> Result<RequestId, AppError> {
        if requester.user_id == *target_owner {
            return Err(AppError::InvalidInput(
                "cannot request a match with your own pet".into(),
            ));
        }
        let subject_name = target_subject_name.trim();
        if subject_name.is_empty() {
            return Err(AppError::InvalidInput("subject name is required".into()));
        }

        let request = NewMatchRequest {
            requester_id: requester.user_id.clone(),
            requester_handle: requester.handle.clone(),
            target_owner_id: target_owner.clone(),
            target_subject_id: target_subject_id.clone(),
            target_subject_name: subject_name.to_string(),
        };
        let id = self.requests.create_request(&request).await?;
        info!(
            request_id = %id,
            requester = %requester.user_id,
            target_owner = %target_owner,
            subject = %target_subject_id,
            "match request sent"
        );
        Ok(id)
    }

    /// Resolves a pending request.
    ///
    /// Accepting performs a single atomic batch: status update plus the
    /// conversation merge-upsert. Re-applying an already-applied decision is
    /// a no-op (so a retried accept never re-creates a conversation), while
    /// the opposite decision on a terminal request is an `InvalidTransition`.
    pub async fn respond(
        &self,
        request_id: &RequestId,
        decision: RequestDecision,
    ) -> Result<(), AppError> {
        let request = self
            .requests
            .get_request(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("match request {request_id}")))?;

        match request.status {
            RequestStatus::Pending => {}
            status if status == decision.status() => {
                debug!(request_id = %request_id, status = %status, "decision already applied");
                return Ok(());
            }
            status => {
                return Err(AppError::InvalidTransition(format!(
                    "request {request_id} is already {status}"
                )));
            }
        }

        match decision {
            RequestDecision::Accepted => {
                let conversation = NewConversation::for_request(&request)?;
                self.requests
                    .accept_request(request_id, &conversation)
                    .await?;
                info!(
                    request_id = %request_id,
                    conversation = %conversation.id,
                    "match request accepted"
                );
            }
            RequestDecision::Declined => {
                self.requests.decline_request(request_id).await?;
                info!(request_id = %request_id, "match request declined");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
