use crate::domain::entities::{
    Conversation, MatchRequest, Message, NewConversation, NewMatchRequest, NewMessage,
    RequestStatus,
};
use crate::domain::value_objects::{ConversationId, MessageId, RequestId, SubjectId, UserId};
use crate::infrastructure::store::memory::{Document, SERVER_TIMESTAMP};
use crate::shared::AppError;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const MATCH_REQUESTS: &str = "matchRequests";
pub const CHATS: &str = "chats";

/// Messages live in a per-conversation subcollection.
pub fn messages_collection(conversation: &ConversationId) -> String {
    format!("{CHATS}/{conversation}/messages")
}

/// Stored shape of a match request. Field names are part of the persisted
/// format, so they stay camelCase regardless of Rust convention.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchRequestDoc {
    requester_id: String,
    requester_handle: String,
    target_owner_id: String,
    target_subject_id: String,
    target_subject_name: String,
    status: String,
    created_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConversationDoc {
    participants: Vec<String>,
    #[serde(default)]
    last_message: Option<String>,
    #[serde(default)]
    last_message_timestamp: Option<i64>,
    created_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageDoc {
    sender_id: String,
    text: String,
    timestamp: i64,
}

pub fn new_request_data(request: &NewMatchRequest) -> Value {
    json!({
        "requesterId": request.requester_id.as_str(),
        "requesterHandle": request.requester_handle,
        "targetOwnerId": request.target_owner_id.as_str(),
        "targetSubjectId": request.target_subject_id.as_str(),
        "targetSubjectName": request.target_subject_name,
        "status": RequestStatus::Pending.as_str(),
        "createdAt": SERVER_TIMESTAMP,
    })
}

/// Merge-upsert payload for the accept-time conversation write. `createdAt`
/// is a sentinel, so merging over an existing conversation keeps its original
/// creation time.
pub fn new_conversation_data(conversation: &NewConversation) -> Value {
    json!({
        "participants": [
            conversation.participants[0].as_str(),
            conversation.participants[1].as_str(),
        ],
        "createdAt": SERVER_TIMESTAMP,
    })
}

pub fn new_message_data(message: &NewMessage) -> Value {
    json!({
        "senderId": message.sender_id.as_str(),
        "text": message.body,
        "timestamp": SERVER_TIMESTAMP,
    })
}

pub fn summary_data(last_message: &str) -> Value {
    json!({
        "lastMessage": last_message,
        "lastMessageTimestamp": SERVER_TIMESTAMP,
    })
}

pub fn parse_request(doc: &Document) -> Result<MatchRequest, AppError> {
    let raw: MatchRequestDoc = serde_json::from_value(doc.data.clone())?;
    let status: RequestStatus = raw
        .status
        .parse()
        .map_err(|_| malformed(doc, "unknown status"))?;
    Ok(MatchRequest {
        id: RequestId::new(doc.id.clone())?,
        requester_id: UserId::new(raw.requester_id)?,
        requester_handle: raw.requester_handle,
        target_owner_id: UserId::new(raw.target_owner_id)?,
        target_subject_id: SubjectId::new(raw.target_subject_id)?,
        target_subject_name: raw.target_subject_name,
        status,
        created_at: millis_to_datetime(raw.created_at)?,
    })
}

pub fn parse_conversation(doc: &Document) -> Result<Conversation, AppError> {
    let raw: ConversationDoc = serde_json::from_value(doc.data.clone())?;
    let [a, b]: [String; 2] = raw
        .participants
        .try_into()
        .map_err(|_| malformed(doc, "expected exactly two participants"))?;
    let last_message_at = raw
        .last_message_timestamp
        .map(millis_to_datetime)
        .transpose()?;
    Ok(Conversation {
        id: ConversationId::new(doc.id.clone())?,
        participants: [UserId::new(a)?, UserId::new(b)?],
        last_message: raw.last_message,
        last_message_at,
        created_at: millis_to_datetime(raw.created_at)?,
    })
}

pub fn parse_message(doc: &Document) -> Result<Message, AppError> {
    let raw: MessageDoc = serde_json::from_value(doc.data.clone())?;
    Ok(Message {
        id: MessageId::new(doc.id.clone())?,
        sender_id: UserId::new(raw.sender_id)?,
        body: raw.text,
        sent_at: millis_to_datetime(raw.timestamp)?,
        seq: doc.seq,
    })
}

pub fn millis_to_datetime(millis: i64) -> Result<DateTime<Utc>, AppError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| AppError::Internal(format!("timestamp {millis} is out of range")))
}

fn malformed(doc: &Document, reason: &str) -> AppError {
    AppError::Internal(format!("malformed document {}: {reason}", doc.id))
}
