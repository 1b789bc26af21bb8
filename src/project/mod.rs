/// Project membership and access control
///
/// Reads project data from the external registry and turns it into a caller role that gates
/// workflow edits, contributor management, and session commands.

pub mod role;
pub mod types;

pub use role::{authorize, resolve_role, Action, Caller, Role};
pub use types::{Identity, Participant, ProjectData};
