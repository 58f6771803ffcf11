use crate::application::ports::{ConversationStore, RequestStore, Snapshots};
use crate::application::services::{
    ConversationSession, MatchLifecycleService, PresenceProjector,
};
use crate::domain::entities::{Conversation, RequestDecision};
use crate::domain::value_objects::{
    ConversationId, OwnerIdentity, RequestId, SubjectId, UserId,
};
use crate::infrastructure::store::{
    MemoryConversationStore, MemoryDocumentStore, MemoryRequestStore,
};
use crate::shared::{AppError, EngineConfig};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Composition root. Wires the stores and services together and carries the
/// ambient identity of the signed-in owner.
///
/// Every operation resolves the current identity first; with nobody signed in
/// it fails `NotAuthenticated` before touching the store.
pub struct MatchEngine {
    requests: Arc<dyn RequestStore>,
    conversations: Arc<dyn ConversationStore>,
    lifecycle: MatchLifecycleService,
    config: EngineConfig,
    identity: RwLock<Option<OwnerIdentity>>,
}

impl MatchEngine {
    pub fn new(
        requests: Arc<dyn RequestStore>,
        conversations: Arc<dyn ConversationStore>,
        config: EngineConfig,
    ) -> Self {
        let lifecycle = MatchLifecycleService::new(requests.clone());
        Self {
            requests,
            conversations,
            lifecycle,
            config,
            identity: RwLock::new(None),
        }
    }

    /// Engine over a shared document store. Several engines over the same
    /// store model several signed-in clients.
    pub fn with_store(store: Arc<MemoryDocumentStore>, config: EngineConfig) -> Self {
        let requests = Arc::new(MemoryRequestStore::new(store.clone(), &config.store));
        let conversations = Arc::new(MemoryConversationStore::new(store, &config.store));
        Self::new(requests, conversations, config)
    }

    pub fn in_memory(config: EngineConfig) -> Self {
        Self::with_store(Arc::new(MemoryDocumentStore::new()), config)
    }

    pub async fn sign_in(&self, identity: OwnerIdentity) {
        info!(user = %identity.user_id, "signed in");
        *self.identity.write().await = Some(identity);
    }

    pub async fn sign_out(&self) {
        if let Some(identity) = self.identity.write().await.take() {
            info!(user = %identity.user_id, "signed out");
        }
    }

    pub async fn current_identity(&self) -> Result<OwnerIdentity, AppError> {
        self.identity
            .read()
            .await
            .clone()
            .ok_or(AppError::NotAuthenticated)
    }

    pub async fn send_match_request(
        &self,
        target_owner: &UserId,
        target_subject_id: &SubjectId,
        target_subject_name: &str,
    ) -> Result<RequestId, AppError> {
        let requester = self.current_identity().await?;
        self.lifecycle
            .send_request(&requester, target_owner, target_subject_id, target_subject_name)
            .await
    }

    pub async fn respond_to_request(
        &self,
        request_id: &RequestId,
        decision: RequestDecision,
    ) -> Result<(), AppError> {
        self.current_identity().await?;
        self.lifecycle.respond(request_id, decision).await
    }

    /// Live relationship view for the signed-in owner. Each call opens an
    /// independent projector with its own three subscriptions.
    pub async fn presence(&self) -> Result<PresenceProjector, AppError> {
        let identity = self.current_identity().await?;
        PresenceProjector::open(
            identity.user_id,
            self.requests.clone(),
            self.conversations.clone(),
        )
        .await
    }

    pub async fn open_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<ConversationSession, AppError> {
        let identity = self.current_identity().await?;
        ConversationSession::open(
            self.conversations.clone(),
            identity.user_id,
            conversation_id.clone(),
            &self.config.limits,
        )
        .await
    }

    /// Live conversation list for the signed-in owner, most recent activity
    /// first.
    pub async fn conversations(&self) -> Result<Snapshots<Vec<Conversation>>, AppError> {
        let identity = self.current_identity().await?;
        self.conversations
            .watch_user_conversations(&identity.user_id)
            .await
    }

    /// The deterministic conversation id between the signed-in owner and
    /// `peer`, whether or not the conversation exists yet.
    pub async fn conversation_id_with(&self, peer: &UserId) -> Result<ConversationId, AppError> {
        let identity = self.current_identity().await?;
        ConversationId::for_pair(&identity.user_id, peer)
    }
}
