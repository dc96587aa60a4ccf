//! Error types for botflow.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Step error: {0}")]
    Step(#[from] StepError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Live connection error: {0}")]
    Live(#[from] LiveError),

    #[error("Conversation error: {0}")]
    Conversation(#[from] ConversationError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Construction problems that block a step (and its workflow) from being saved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepError {
    #[error("Step {step_id} has no field name")]
    MissingFieldName { step_id: String },

    #[error("Step {step_id} has no question")]
    MissingQuestion { step_id: String },

    #[error("Select step {step_id} needs at least one option")]
    NoOptions { step_id: String },

    #[error("Step {step_id} has duplicate option value '{value}'")]
    DuplicateOptionValue { step_id: String, value: String },

    #[error("Step {step_id} depends on '{depends_on}' but has no showWhen value")]
    MissingShowWhen { step_id: String, depends_on: String },

    #[error("Step {step_id} depends on its own field '{field_name}'")]
    SelfDependency { step_id: String, field_name: String },

    #[error("Step {step_id} has an invalid pattern: {reason}")]
    InvalidPattern { step_id: String, reason: String },
}

/// Errors from editing a workflow or the open-workflow store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("Step {step_id} not found")]
    StepNotFound { step_id: String },

    #[error("Step {step_id} already exists")]
    DuplicateStepId { step_id: String },

    #[error("No workflow is open")]
    NoWorkflowOpen,

    #[error("Workflow {id} is not loaded")]
    UnknownWorkflow { id: String },

    #[error("Workflow {id} failed checks: {count} problem(s)")]
    Invalid { id: String, count: usize },
}

/// Backend REST errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request {method} {path} failed: {reason}")]
    RequestFailed {
        method: String,
        path: String,
        reason: String,
    },

    #[error("Request {method} {path} returned {status}: {body}")]
    Status {
        method: String,
        path: String,
        status: u16,
        body: String,
    },

    #[error("Not authorized for {method} {path}")]
    Unauthorized { method: String, path: String },

    #[error("Invalid response from {path}: {reason}")]
    InvalidResponse { path: String, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request {path} timed out after {timeout:?}")]
    Timeout { path: String, timeout: Duration },
}

/// Live push-connection errors.
#[derive(Debug, thiserror::Error)]
pub enum LiveError {
    #[error("Cannot connect: page id is empty")]
    MissingPageId,

    #[error("Invalid live URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Live connection task has stopped")]
    Stopped,
}

/// Errors from the conversation store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversationError {
    #[error("No conversation is open")]
    NoneOpen,

    #[error("Message is empty")]
    EmptyMessage,
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
