pub mod conversation_id;
pub mod identity;
pub mod ids;

pub use conversation_id::ConversationId;
pub use identity::OwnerIdentity;
pub use ids::{MessageId, RequestId, SubjectId, UserId};
