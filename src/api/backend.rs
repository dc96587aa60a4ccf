//! Backend traits the state stores are written against.
//!
//! `ApiClient` implements both; tests substitute in-memory backends.

use async_trait::async_trait;

use super::conversations::{Conversation, Message};
use super::workflows::NewWorkflow;
use crate::error::ApiError;
use crate::workflow::Workflow;

/// Workflow persistence.
#[async_trait]
pub trait WorkflowBackend: Send + Sync {
    /// All workflows of one company.
    async fn list_workflows(&self, company_id: &str) -> Result<Vec<Workflow>, ApiError>;

    async fn get_workflow(&self, id: &str) -> Result<Workflow, ApiError>;

    /// Create a workflow; the backend assigns id and timestamps.
    async fn create_workflow(&self, new: &NewWorkflow) -> Result<Workflow, ApiError>;

    /// Replace the stored workflow with `workflow` as a whole.
    async fn put_workflow(&self, workflow: &Workflow) -> Result<Workflow, ApiError>;

    async fn delete_workflow(&self, id: &str) -> Result<(), ApiError>;
}

/// Live chat conversations of one WhatsApp page.
#[async_trait]
pub trait ConversationBackend: Send + Sync {
    async fn list_conversations(&self, page_id: &str) -> Result<Vec<Conversation>, ApiError>;

    async fn list_messages(
        &self,
        page_id: &str,
        sender_id: &str,
        limit: u32,
    ) -> Result<Vec<Message>, ApiError>;

    async fn send_message(
        &self,
        page_id: &str,
        sender_id: &str,
        content: &str,
    ) -> Result<Message, ApiError>;

    async fn archive_conversation(&self, page_id: &str, sender_id: &str) -> Result<(), ApiError>;

    async fn mark_read(&self, page_id: &str, sender_id: &str) -> Result<(), ApiError>;
}
