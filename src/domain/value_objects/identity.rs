use crate::domain::value_objects::UserId;
use serde::{Deserialize, Serialize};

/// Display identity of a signed-in owner, as provided by the auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerIdentity {
    pub user_id: UserId,
    pub handle: String,
}

impl OwnerIdentity {
    pub fn new(user_id: UserId, handle: impl Into<String>) -> Self {
        Self {
            user_id,
            handle: handle.into(),
        }
    }
}
