use super::*;
use crate::application::ports::Snapshots;
use crate::domain::entities::MatchRequest;
use crate::domain::value_objects::ConversationId;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mockall::mock;
use std::sync::Arc;

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

fn requester() -> OwnerIdentity {
    OwnerIdentity::new(UserId::new("owner-x").unwrap(), "x@example.com")
}

fn pending_request(status: RequestStatus) -> MatchRequest {
    MatchRequest {
        id: RequestId::new("req-1").unwrap(),
        requester_id: UserId::new("owner-x").unwrap(),
        requester_handle: "x@example.com".into(),
        target_owner_id: UserId::new("owner-y").unwrap(),
        target_subject_id: SubjectId::new("pet-buddy").unwrap(),
        target_subject_name: "Buddy".into(),
        status,
        created_at: Utc.timestamp_millis_opt(1_000).unwrap(),
    }
}

fn service(requests: MockRequests) -> MatchLifecycleService {
    MatchLifecycleService::new(Arc::new(requests))
}

#[tokio::test]
async fn send_request_creates_pending_request() {
    let mut requests = MockRequests::new();
    requests
        .expect_create_request()
        .times(1)
        .withf(|request| {
            request.requester_id.as_str() == "owner-x"
                && request.target_owner_id.as_str() == "owner-y"
                && request.target_subject_name == "Buddy"
        })
        .returning(|_| Ok(RequestId::new("req-1").unwrap()));

    let id = service(requests)
        .send_request(
            &requester(),
            &UserId::new("owner-y").unwrap(),
            &SubjectId::new("pet-buddy").unwrap(),
            " Buddy ",
        )
        .await
        .expect("send succeeds");

    assert_eq!(id.as_str(), "req-1");
}

#[tokio::test]
async fn send_request_rejects_self_target() {
    let requests = MockRequests::new();

    let err = service(requests)
        .send_request(
            &requester(),
            &UserId::new("owner-x").unwrap(),
            &SubjectId::new("pet-buddy").unwrap(),
            "Buddy",
        )
        .await
        .expect_err("self-target rejected");

    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn accept_batches_status_and_deterministic_conversation() {
    let mut requests = MockRequests::new();
    requests
        .expect_get_request()
        .times(1)
        .returning(|_| Ok(Some(pending_request(RequestStatus::Pending))));

    let expected_id = ConversationId::for_pair(
        &UserId::new("owner-x").unwrap(),
        &UserId::new("owner-y").unwrap(),
    )
    .unwrap();
    requests
        .expect_accept_request()
        .times(1)
        .withf(move |id, conversation| {
            id.as_str() == "req-1" && conversation.id == expected_id
        })
        .returning(|_, _| Ok(()));

    service(requests)
        .respond(&RequestId::new("req-1").unwrap(), RequestDecision::Accepted)
        .await
        .expect("accept succeeds");
}

#[tokio::test]
async fn decline_only_updates_status() {
    let mut requests = MockRequests::new();
    requests
        .expect_get_request()
        .times(1)
        .returning(|_| Ok(Some(pending_request(RequestStatus::Pending))));
    requests
        .expect_decline_request()
        .times(1)
        .returning(|_| Ok(()));
    requests.expect_accept_request().never();

    service(requests)
        .respond(&RequestId::new("req-1").unwrap(), RequestDecision::Declined)
        .await
        .expect("decline succeeds");
}

#[tokio::test]
async fn repeated_accept_is_a_noop() {
    let mut requests = MockRequests::new();
    requests
        .expect_get_request()
        .times(1)
        .returning(|_| Ok(Some(pending_request(RequestStatus::Accepted))));
    requests.expect_accept_request().never();

    service(requests)
        .respond(&RequestId::new("req-1").unwrap(), RequestDecision::Accepted)
        .await
        .expect("repeated accept is not an error");
}

#[tokio::test]
async fn conflicting_decision_on_terminal_request_fails() {
    let mut requests = MockRequests::new();
    requests
        .expect_get_request()
        .times(1)
        .returning(|_| Ok(Some(pending_request(RequestStatus::Declined))));

    let err = service(requests)
        .respond(&RequestId::new("req-1").unwrap(), RequestDecision::Accepted)
        .await
        .expect_err("terminal state is sticky");

    assert!(matches!(err, AppError::InvalidTransition(_)));
}

#[tokio::test]
async fn responding_to_unknown_request_is_not_found() {
    let mut requests = MockRequests::new();
    requests.expect_get_request().times(1).returning(|_| Ok(None));

    let err = service(requests)
        .respond(&RequestId::new("req-9").unwrap(), RequestDecision::Accepted)
        .await
        .expect_err("unknown request");

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn store_failure_surfaces_and_leaves_request_pending() {
    let mut requests = MockRequests::new();
    requests
        .expect_get_request()
        .times(1)
        .returning(|_| Ok(Some(pending_request(RequestStatus::Pending))));
    requests
        .expect_accept_request()
        .times(1)
        .returning(|_, _| Err(AppError::StoreUnavailable("offline".into())));

    let err = service(requests)
        .respond(&RequestId::new("req-1").unwrap(), RequestDecision::Accepted)
        .await
        .expect_err("store failure propagates");

    assert!(matches!(err, AppError::StoreUnavailable(_)));
}
