/// Remote orchestration runtime
///
/// This module talks to the orchestration service on behalf of a caller:
/// - Typed lifecycle commands and their wire envelope
/// - The HTTP transport and the command client with its simulated fallback
/// - Session polling with lock-free snapshots
/// - Project deployment from the config store

// Live / simulated mode switch
pub mod mode;

// Caller, contract, and mode carried by every client call
pub mod context;

// Typed command payloads and the command envelope
pub mod commands;

// Remote-owned session and workflow run records
pub mod session;

// reqwest transport with per-call timeouts
pub mod transport;

pub mod client;

pub mod poller;

pub mod deploy;

// Re-export main types
pub use client::CommandClient;
pub use commands::{Command, CommandType};
pub use context::ClientContext;
pub use deploy::{deploy_project, DeploymentOutcome};
pub use mode::{Mode, ModeSwitch};
pub use poller::{PollerHandle, SessionPoller};
pub use session::{Session, SessionStats, SessionStatus, WorkflowRunStatus};
