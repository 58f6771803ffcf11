pub mod conversation_session;
pub mod match_lifecycle;
pub mod presence_projector;

pub use conversation_session::ConversationSession;
pub use match_lifecycle::MatchLifecycleService;
pub use presence_projector::{PresenceProjector, RelationshipView};
