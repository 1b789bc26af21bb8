/// al-orchestrator: client-side orchestration core for collaborative active learning
///
/// This library keeps a project's active-learning workflow configuration under versioned,
/// creator-only control, submits it to the remote orchestration service (falling back to a
/// simulated mode when the service is unavailable), drives the session lifecycle through typed
/// commands gated by participant roles, and mirrors remote session state by polling.

// Core configuration and setup
pub mod config;

// Error taxonomy shared by every operation
pub mod error;

// Project membership and role-based permission gates
pub mod project;

// Workflow configuration layer - template, validation, versioned store, auto-save
pub mod workflow;

// Remote runtime - commands, client with simulated fallback, session polling, deployment
pub mod runtime;

// Component wiring and tracing setup
pub mod bootstrap;

// Re-export commonly used types for external consumers
pub use bootstrap::{create_orchestrator, init_tracing, Orchestrator};
pub use error::{OrchestratorError, Result};
pub use project::{resolve_role, Caller, Identity, ProjectData, Role};
pub use runtime::{deploy_project, ClientContext, CommandClient, Mode, SessionPoller};
pub use workflow::{AlConfig, ConfigStore, WorkflowDocument, WorkflowRecord, WorkflowStatus};
