/// Error taxonomy for the orchestration core
///
/// Every fallible operation in the library returns `Result<T>` over `OrchestratorError`.
/// `kind()` gives the stable taxonomy name that mutating UI actions surface next to the message.

use crate::{project::Role, workflow::WorkflowStatus};

/// Library-wide result alias
pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// A record exists but the caller is not its creator
    #[error("access denied: `{caller}` is not the creator of project `{project_id}`")]
    AccessDenied { project_id: String, caller: String },

    /// The caller's role does not allow the requested action
    #[error("role `{role}` may not {action}")]
    Forbidden { role: Role, action: String },

    /// Workflow document failed structural validation
    #[error("workflow for project `{project_id}` is invalid: {reason}")]
    Validation { project_id: String, reason: String },

    /// Status change that would break the draft → finalized → deployed order
    #[error("invalid status transition `{from}` -> `{to}` for project `{project_id}`")]
    InvalidTransition {
        project_id: String,
        from: WorkflowStatus,
        to: WorkflowStatus,
    },

    /// Write based on a stale record version
    #[error("version conflict on project `{project_id}`: expected {expected}, found {actual}")]
    VersionConflict {
        project_id: String,
        expected: u64,
        actual: u64,
    },

    /// Command payload failed its per-variant schema
    #[error("invalid `{command_type}` command: {reason}")]
    InvalidCommand {
        command_type: &'static str,
        reason: String,
    },

    /// Timeout or connection failure talking to the remote service
    #[error("transport failure on {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Remote service answered a command with a non-2xx status
    #[error("command rejected with status {status}: {message}")]
    CommandRejected { status: u16, message: String },

    /// Status never reached a terminal state within the attempt budget
    #[error("`{id}` did not reach a terminal status after {attempts} attempts")]
    PollingTimeout { id: String, attempts: u32 },

    /// Unknown workflow, session, or project record
    #[error("not found: {0}")]
    NotFound(String),

    /// Remote response body did not match the expected shape
    #[error("unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OrchestratorError {
    /// Stable taxonomy name for display next to the message
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AccessDenied { .. } => "AccessDenied",
            Self::Forbidden { .. } => "Forbidden",
            Self::Validation { .. } => "ValidationError",
            Self::InvalidTransition { .. } => "InvalidTransition",
            Self::VersionConflict { .. } => "VersionConflict",
            Self::InvalidCommand { .. } => "InvalidCommand",
            Self::Transport { .. } => "TransportError",
            Self::CommandRejected { .. } => "CommandRejected",
            Self::PollingTimeout { .. } => "PollingTimeout",
            Self::NotFound(_) => "NotFound",
            Self::Decode { .. } => "DecodeError",
            Self::Storage(_) => "StorageError",
            Self::Serialization(_) => "SerializationError",
        }
    }

    /// True when a transport failure was caused by the per-request timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { source, .. } if source.is_timeout())
    }
}
