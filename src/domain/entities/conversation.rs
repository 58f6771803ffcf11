use crate::domain::entities::MatchRequest;
use crate::domain::value_objects::{ConversationId, UserId};
use crate::shared::AppError;
use chrono::{DateTime, Utc};

/// Write shape for the conversation created when a request is accepted.
/// Keyed by the deterministic pair id, so a concurrent accept from the other
/// side lands on the same document.
#[derive(Debug, Clone)]
pub struct NewConversation {
    pub id: ConversationId,
    pub participants: [UserId; 2],
}

impl NewConversation {
    pub fn for_pair(a: UserId, b: UserId) -> Result<Self, AppError> {
        let id = ConversationId::for_pair(&a, &b)?;
        Ok(Self {
            id,
            participants: [a, b],
        })
    }

    pub fn for_request(request: &MatchRequest) -> Result<Self, AppError> {
        Self::for_pair(
            request.requester_id.clone(),
            request.target_owner_id.clone(),
        )
    }
}

/// A conversation between exactly two owners. `last_message` and
/// `last_message_at` are denormalized for list rendering and are advisory
/// only; the message subcollection is the authoritative history.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: ConversationId,
    pub participants: [UserId; 2],
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// The other side of the pair, or `None` when `me` is not a participant.
    pub fn counterpart(&self, me: &UserId) -> Option<&UserId> {
        if !self.participants.contains(me) {
            return None;
        }
        self.participants.iter().find(|p| *p != me)
    }

    /// Sort key for the conversation list: most recent activity, falling back
    /// to the epoch when no message has been sent yet.
    pub fn activity_millis(&self) -> i64 {
        self.last_message_at
            .map(|t| t.timestamp_millis())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
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

    #[test]
    fn counterpart_is_the_other_participant() {
        let conv = conversation("x", "y");
        assert_eq!(conv.counterpart(&user("x")), Some(&user("y")));
        assert_eq!(conv.counterpart(&user("y")), Some(&user("x")));
        assert_eq!(conv.counterpart(&user("z")), None);
    }

    #[test]
    fn new_conversation_rejects_self_pair() {
        assert!(NewConversation::for_pair(user("x"), user("x")).is_err());
    }
}
