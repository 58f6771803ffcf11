pub mod conversation;
pub mod match_request;
pub mod message;

pub use conversation::{Conversation, NewConversation};
pub use match_request::{MatchRequest, NewMatchRequest, RequestDecision, RequestStatus};
pub use message::{Message, NewMessage};
