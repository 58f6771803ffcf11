use crate::domain::value_objects::UserId;
use crate::shared::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;

const PAIR_SEPARATOR: char = ':';

/// Canonical conversation identifier derived from the two participants.
///
/// The id is the sorted join of the two owner ids, so both sides of a pair
/// always compute the same key. Writing the conversation under this key is
/// what guarantees at most one conversation per unordered pair without any
/// store-side uniqueness constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(String);

impl ConversationId {
    /// Derive the id for an unordered pair. Identities are opaque tokens
    /// without an embedded separator, so the join is collision-free.
    pub fn for_pair(a: &UserId, b: &UserId) -> Result<Self, AppError> {
        if a == b {
            return Err(AppError::InvalidInput(
                "a conversation requires two distinct participants".into(),
            ));
        }
        let (first, second) = if a.as_str() <= b.as_str() {
            (a, b)
        } else {
            (b, a)
        };
        Ok(Self(format!(
            "{}{}{}",
            first.as_str(),
            PAIR_SEPARATOR,
            second.as_str()
        )))
    }

    pub fn new(value: impl Into<String>) -> Result<Self, AppError> {
        let value = value.into();
        if value.is_empty() {
            return Err(AppError::InvalidInput(
                "conversation id cannot be empty".into(),
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ConversationId> for String {
    fn from(id: ConversationId) -> Self {
        id.0
    }
}
