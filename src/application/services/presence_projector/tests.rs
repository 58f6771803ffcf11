use super::*;
use crate::application::ports::Snapshots;
use crate::domain::entities::{NewConversation, NewMatchRequest, NewMessage, RequestStatus};
use crate::domain::value_objects::{ConversationId, RequestId};
use crate::shared::AppError;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mockall::mock;
use std::time::Duration;
use tokio::time::timeout;

mock! {
    pub Requests {}

    #[async_trait]
    impl RequestStore for Requests {
        async fn create_request(&self, request: &NewMatchRequest) -> Result<RequestId, AppError>;

        async fn get_request(&self, id: &RequestId) -> Result<Option<MatchRequest>, AppError>;

        async fn accept_request(
            &self,
            id: &RequestId,
            conversation: &NewConversation,
        ) -> Result<(), AppError>;

        async fn decline_request(&self, id: &RequestId) -> Result<(), AppError>;

        async fn watch_incoming_pending(
            &self,
            owner: &UserId,
        ) -> Result<Snapshots<Vec<MatchRequest>>, AppError>;

        async fn watch_outgoing_pending(
            &self,
            requester: &UserId,
        ) -> Result<Snapshots<Vec<MatchRequest>>, AppError>;
    }
}

mock! {
    pub Conversations {}

    #[async_trait]
    impl ConversationStore for Conversations {
        async fn get_conversation(
            &self,
            id: &ConversationId,
        ) -> Result<Option<Conversation>, AppError>;

        async fn append_message(
            &self,
            conversation: &ConversationId,
            message: &NewMessage,
        ) -> Result<crate::domain::entities::Message, AppError>;

        async fn update_summary(
            &self,
            conversation: &ConversationId,
            last_message: &str,
        ) -> Result<(), AppError>;

        async fn watch_messages(
            &self,
            conversation: &ConversationId,
        ) -> Result<Snapshots<Vec<crate::domain::entities::Message>>, AppError>;

        async fn watch_user_conversations(
            &self,
            user: &UserId,
        ) -> Result<Snapshots<Vec<Conversation>>, AppError>;
    }
}

fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

fn request(id: &str, requester: &str, target: &str, subject: &str, millis: i64) -> MatchRequest {
    MatchRequest {
        id: RequestId::new(id).unwrap(),
        requester_id: user(requester),
        requester_handle: format!("{requester}@example.com"),
        target_owner_id: user(target),
        target_subject_id: SubjectId::new(subject).unwrap(),
        target_subject_name: subject.to_string(),
        status: RequestStatus::Pending,
        created_at: Utc.timestamp_millis_opt(millis).unwrap(),
    }
}

fn conversation(a: &str, b: &str) -> Conversation {
    let a = user(a);
    let b = user(b);
    Conversation {
        id: ConversationId::for_pair(&a, &b).unwrap(),
        participants: [a, b],
        last_message: None,
        last_message_at: None,
        created_at: Utc.timestamp_millis_opt(1_000).unwrap(),
    }
}

struct Feeds {
    incoming: watch::Sender<Vec<MatchRequest>>,
    outgoing: watch::Sender<Vec<MatchRequest>>,
    conversations: watch::Sender<Vec<Conversation>>,
}

async fn projector_with_feeds(
    incoming: Vec<MatchRequest>,
    outgoing: Vec<MatchRequest>,
    conversations: Vec<Conversation>,
) -> (PresenceProjector, Feeds) {
    let (incoming_tx, incoming_rx) = watch::channel(incoming);
    let (outgoing_tx, outgoing_rx) = watch::channel(outgoing);
    let (convs_tx, convs_rx) = watch::channel(conversations);

    let mut requests = MockRequests::new();
    requests
        .expect_watch_incoming_pending()
        .times(1)
        .return_once(move |_| Ok(Snapshots::new(incoming_rx)));
    requests
        .expect_watch_outgoing_pending()
        .times(1)
        .return_once(move |_| Ok(Snapshots::new(outgoing_rx)));

    let mut convs = MockConversations::new();
    convs
        .expect_watch_user_conversations()
        .times(1)
        .return_once(move |_| Ok(Snapshots::new(convs_rx)));

    let projector = PresenceProjector::open(user("owner-y"), Arc::new(requests), Arc::new(convs))
        .await
        .expect("projector opens");

    (
        projector,
        Feeds {
            incoming: incoming_tx,
            outgoing: outgoing_tx,
            conversations: convs_tx,
        },
    )
}

#[tokio::test]
async fn initial_view_reflects_existing_snapshots() {
    let (projector, _feeds) = projector_with_feeds(
        vec![request("req-1", "owner-x", "owner-y", "pet-buddy", 1_000)],
        vec![],
        vec![conversation("owner-y", "owner-z")],
    )
    .await;

    let view = projector.view();
    assert_eq!(view.incoming_requests.len(), 1);
    assert!(view.is_matched(&user("owner-z")));
    assert!(!view.is_matched(&user("owner-x")));
}

#[tokio::test]
async fn incoming_update_recomputes_view_newest_first() {
    let (mut projector, feeds) = projector_with_feeds(vec![], vec![], vec![]).await;

    feeds
        .incoming
        .send(vec![
            request("req-1", "owner-x", "owner-y", "pet-buddy", 1_000),
            request("req-2", "owner-z", "owner-y", "pet-rex", 2_000),
        ])
        .unwrap();

    timeout(Duration::from_secs(1), projector.changed())
        .await
        .expect("view updates within a tick")
        .expect("projector alive");

    let view = projector.view();
    assert_eq!(view.incoming_requests[0].id.as_str(), "req-2");
    assert_eq!(view.incoming_requests[1].id.as_str(), "req-1");
}

#[tokio::test]
async fn new_conversation_routes_peer_into_matched() {
    let (mut projector, feeds) = projector_with_feeds(vec![], vec![], vec![]).await;

    feeds
        .conversations
        .send(vec![conversation("owner-x", "owner-y")])
        .unwrap();

    timeout(Duration::from_secs(1), projector.changed())
        .await
        .expect("view updates within a tick")
        .expect("projector alive");

    assert!(projector.view().is_matched(&user("owner-x")));
}

#[tokio::test]
async fn outgoing_pending_flags_subject() {
    let (mut projector, feeds) = projector_with_feeds(vec![], vec![], vec![]).await;

    feeds
        .outgoing
        .send(vec![request("req-1", "owner-y", "owner-x", "pet-buddy", 1_000)])
        .unwrap();

    timeout(Duration::from_secs(1), projector.changed())
        .await
        .expect("view updates within a tick")
        .expect("projector alive");

    let view = projector.view();
    assert!(view.has_pending_request_for(&SubjectId::new("pet-buddy").unwrap()));

    // Clearing the pending request releases the subject again.
    feeds.outgoing.send(vec![]).unwrap();
    timeout(Duration::from_secs(1), projector.changed())
        .await
        .expect("view updates within a tick")
        .expect("projector alive");
    assert!(!projector
        .view()
        .has_pending_request_for(&SubjectId::new("pet-buddy").unwrap()));
}

#[tokio::test]
async fn redelivered_identical_snapshot_does_not_wake_consumers() {
    let (mut projector, feeds) = projector_with_feeds(
        vec![request("req-1", "owner-x", "owner-y", "pet-buddy", 1_000)],
        vec![],
        vec![],
    )
    .await;

    // Same content as the initial snapshot.
    feeds
        .incoming
        .send(vec![request("req-1", "owner-x", "owner-y", "pet-buddy", 1_000)])
        .unwrap();

    let woke = timeout(Duration::from_millis(100), projector.changed()).await;
    assert!(woke.is_err(), "identical snapshot must not publish a new view");
}
