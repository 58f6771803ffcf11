use crate::application::ports::{ConversationStore, RequestStore};
use crate::domain::entities::{Conversation, MatchRequest};
use crate::domain::value_objects::{SubjectId, UserId};
use crate::shared::AppError;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Derived relationship state for one signed-in owner.
///
/// Eventually consistent with the store: the projector recomputes the whole
/// view from the latest snapshots on every update, so it never depends on
/// the relative order in which the three channels deliver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationshipView {
    /// Counterparts of every conversation the owner participates in.
    /// Candidates in this set are excluded from "requestable" lists.
    pub matched_peer_ids: HashSet<UserId>,
    /// Subjects with an outstanding outgoing request, used to disable
    /// duplicate "request" actions in the UI layer.
    pub pending_outgoing_subjects: HashSet<SubjectId>,
    /// Pending requests addressed to the owner, newest first.
    pub incoming_requests: Vec<MatchRequest>,
}

impl RelationshipView {
    pub fn is_matched(&self, peer: &UserId) -> bool {
        self.matched_peer_ids.contains(peer)
    }

    pub fn has_pending_request_for(&self, subject: &SubjectId) -> bool {
        self.pending_outgoing_subjects.contains(subject)
    }
}

/// Combines the three presence subscriptions (incoming pending, outgoing
/// pending, conversation list) into one continuously updated
/// [`RelationshipView`]. One projector per authenticated session; dropping it
/// aborts the worker and releases all three subscriptions.
#[derive(Debug)]
pub struct PresenceProjector {
    view_rx: watch::Receiver<RelationshipView>,
    worker: JoinHandle<()>,
}

impl PresenceProjector {
    pub async fn open(
        user: UserId,
        requests: Arc<dyn RequestStore>,
        conversations: Arc<dyn ConversationStore>,
    ) -> Result<Self, AppError> {
        let mut incoming = requests.watch_incoming_pending(&user).await?;
        let mut outgoing = requests.watch_outgoing_pending(&user).await?;
        let mut convs = conversations.watch_user_conversations(&user).await?;

        let initial = project(
            &user,
            &incoming.current(),
            &outgoing.current(),
            &convs.current(),
        );
        let (view_tx, view_rx) = watch::channel(initial);

        let worker = tokio::spawn(async move {
            loop {
                let changed = tokio::select! {
                    result = incoming.changed() => result,
                    result = outgoing.changed() => result,
                    result = convs.changed() => result,
                };
                if changed.is_err() {
                    debug!(user = %user, "presence subscription closed, stopping projector");
                    break;
                }
                let next = project(
                    &user,
                    &incoming.current(),
                    &outgoing.current(),
                    &convs.current(),
                );
                // send_if_modified keeps unchanged snapshots from waking
                // consumers; returns false with no receivers, which is fine.
                view_tx.send_if_modified(|current| {
                    if *current != next {
                        *current = next;
                        true
                    } else {
                        false
                    }
                });
            }
        });

        Ok(Self { view_rx, worker })
    }

    /// The latest derived view.
    pub fn view(&self) -> RelationshipView {
        self.view_rx.borrow().clone()
    }

    /// Receiver for consumers that want to await recomputations.
    pub fn watch(&self) -> watch::Receiver<RelationshipView> {
        self.view_rx.clone()
    }

    pub async fn changed(&mut self) -> Result<(), AppError> {
        self.view_rx
            .changed()
            .await
            .map_err(|_| AppError::StoreUnavailable("presence projector stopped".into()))
    }
}

impl Drop for PresenceProjector {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

fn project(
    user: &UserId,
    incoming: &[MatchRequest],
    outgoing: &[MatchRequest],
    conversations: &[Conversation],
) -> RelationshipView {
    let matched_peer_ids = conversations
        .iter()
        .filter_map(|c| c.counterpart(user).cloned())
        .collect();

    let pending_outgoing_subjects = outgoing
        .iter()
        .map(|r| r.target_subject_id.clone())
        .collect();

    // The adapter already orders incoming requests; re-sorting here keeps the
    // newest-first contract independent of any one store's query support.
    let mut incoming_requests = incoming.to_vec();
    incoming_requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    RelationshipView {
        matched_peer_ids,
        pending_outgoing_subjects,
        incoming_requests,
    }
}

#[cfg(test)]
mod tests;
