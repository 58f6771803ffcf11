use crate::domain::value_objects::{RequestId, SubjectId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a match request. The status is monotonic: once a
/// request leaves `Pending` it never reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Declined,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Declined => "declined",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(RequestStatus::Pending),
            "accepted" => Ok(RequestStatus::Accepted),
            "declined" => Ok(RequestStatus::Declined),
            _ => Err(()),
        }
    }
}

/// The recipient's answer to a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDecision {
    Accepted,
    Declined,
}

impl RequestDecision {
    pub fn status(self) -> RequestStatus {
        match self {
            RequestDecision::Accepted => RequestStatus::Accepted,
            RequestDecision::Declined => RequestStatus::Declined,
        }
    }
}

/// Write shape for a new request. Status starts as `Pending` and `created_at`
/// is assigned by the store at commit time.
#[derive(Debug, Clone)]
pub struct NewMatchRequest {
    pub requester_id: UserId,
    pub requester_handle: String,
    pub target_owner_id: UserId,
    pub target_subject_id: SubjectId,
    pub target_subject_name: String,
}

/// A pairing request between two owners. Every field except `status` is
/// immutable after creation; the request is retained as an audit trail and
/// never deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRequest {
    pub id: RequestId,
    pub requester_id: UserId,
    pub requester_handle: String,
    pub target_owner_id: UserId,
    pub target_subject_id: SubjectId,
    pub target_subject_name: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

impl MatchRequest {
    pub fn created_at_millis(&self) -> i64 {
        self.created_at.timestamp_millis()
    }
}
