//! REST client for the bot backend.

pub mod backend;
pub mod client;
pub mod companies;
pub mod conversations;
pub mod knowledge;
pub mod workflows;

pub use backend::{ConversationBackend, WorkflowBackend};
pub use client::ApiClient;
pub use companies::{Company, CompanyStatus, CompanyUpdate, Namespaces};
pub use conversations::{
    Conversation, ConversationStatus, DEFAULT_MESSAGE_LIMIT, Direction, FileReference, Message,
};
pub use knowledge::{KnowledgeUpload, Row};
pub use workflows::NewWorkflow;
