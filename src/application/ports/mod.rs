pub mod conversation_store;
pub mod request_store;
pub mod subscription;

pub use conversation_store::ConversationStore;
pub use request_store::RequestStore;
pub use subscription::Snapshots;
