/// Workflow configuration layer
///
/// This module owns everything about a project's workflow document before it leaves the client:
/// - Type definitions (document, lifecycle metadata, records)
/// - Template construction and structural validation
/// - SQLite persistence with sqlx and the versioned config store on top of it
/// - Debounced auto-save of in-progress edits

// Core workflow type definitions
pub mod types;

// Canonical active-learning template
pub mod template;

// Structural validation with petgraph cycle detection
pub mod validator;

// SQLite persistence layer for workflow records
pub mod storage;

// Lifecycle rules, access control, and save notifications
pub mod store;

pub mod autosave;

// Re-export commonly used types
pub use autosave::AutoSaver;
pub use store::{AutoSaveOutcome, ConfigStore, SaveSubscription};
pub use types::{
    AlConfig, MetadataPatch, RecordMetadata, WorkflowDocument, WorkflowRecord, WorkflowStatus,
    WorkflowSummary,
};
