//! Application state: signed-in session, workflows, conversations.
//!
//! Each store is a plain owned value mutated through `&mut self`.

pub mod auth;
pub mod conversations;
pub mod workflows;

use std::sync::Arc;

use crate::api::ApiClient;

pub use auth::{AuthSession, AuthStore, Role, User};
pub use conversations::{ConversationStore, LiveChange, OpenConversation};
pub use workflows::WorkflowStore;

pub struct AppState {
    auth: AuthStore,
    pub workflows: WorkflowStore,
    pub conversations: ConversationStore,
    client: Arc<ApiClient>,
}

impl AppState {
    /// All stores backed by one API client, with conversations for `page_id`.
    pub fn new(client: Arc<ApiClient>, page_id: impl Into<String>) -> Self {
        Self {
            auth: AuthStore::new(),
            workflows: WorkflowStore::new(client.clone()),
            conversations: ConversationStore::new(client.clone(), page_id),
            client,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Read-only view of the session. Changes go through `sign_in`,
    /// `sign_out` and `restore` so the client token stays in step.
    pub fn auth(&self) -> &AuthStore {
        &self.auth
    }

    pub fn fail_sign_in(&mut self, message: impl Into<String>) {
        self.auth.fail(message);
    }

    pub fn clear_auth_error(&mut self) {
        self.auth.clear_error();
    }

    /// Record the session and use its token for later requests.
    pub async fn sign_in(&mut self, session: AuthSession) {
        self.client.set_token(Some(session.token.clone())).await;
        self.auth.sign_in(session);
    }

    pub async fn sign_out(&mut self) {
        self.client.set_token(None).await;
        self.auth.sign_out();
    }

    /// Restore a persisted session and hand its token to the client.
    /// On failure the session and the client token are both cleared.
    pub async fn restore(&mut self, stored: &str) -> bool {
        let restored = self.auth.restore(stored);
        self.client.set_token(self.auth.token().cloned()).await;
        restored
    }
}
