/// Participant role resolution and permission gates
///
/// Roles are derived on every check from the registry snapshot, never cached, so a change in
/// project membership takes effect on the next call.

use crate::error::{OrchestratorError, Result};
use crate::project::types::{Identity, ProjectData};
use crate::runtime::commands::CommandType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Permission level of a caller within one project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Project creator, sole authority for workflow edits and session lifecycle
    Coordinator,
    /// Listed participant, labels queried samples
    Contributor,
    /// Anyone else, read-only
    Observer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Coordinator => "coordinator",
            Role::Contributor => "contributor",
            Role::Observer => "observer",
        }
    }

    /// Permission table, matching what the orchestration server enforces on its side
    pub fn permits(&self, action: Action) -> bool {
        match (self, action) {
            (Role::Coordinator, _) => true,
            (Role::Contributor, Action::Issue(CommandType::SubmitLabels)) => true,
            (Role::Contributor, Action::ViewContributors) => true,
            (Role::Contributor, Action::ViewProjectData) => true,
            (Role::Contributor, _) => false,
            (Role::Observer, Action::ViewProjectData) => true,
            (Role::Observer, _) => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something a caller may attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SubmitWorkflow,
    Issue(CommandType),
    ManageContributors,
    ViewContributors,
    ViewProjectData,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::SubmitWorkflow => f.write_str("submit the workflow"),
            Action::Issue(command) => write!(f, "issue `{}`", command.as_str()),
            Action::ManageContributors => f.write_str("invite or remove contributors"),
            Action::ViewContributors => f.write_str("view contributor management"),
            Action::ViewProjectData => f.write_str("view project data"),
        }
    }
}

/// Derive the caller's role from registry data
pub fn resolve_role(identity: &Identity, project: &ProjectData) -> Role {
    if identity.matches(&project.creator) {
        Role::Coordinator
    } else if project.lists_participant(identity) || project.is_member || project.is_owner {
        Role::Contributor
    } else {
        Role::Observer
    }
}

/// Fail with `Forbidden` unless the role permits the action
pub fn authorize(role: Role, action: Action) -> Result<()> {
    if role.permits(action) {
        Ok(())
    } else {
        tracing::debug!("Denied {} for role {}", action, role);
        Err(OrchestratorError::Forbidden {
            role,
            action: action.to_string(),
        })
    }
}

/// An identity together with the role it resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub identity: Identity,
    pub role: Role,
}

impl Caller {
    pub fn new(identity: Identity, role: Role) -> Self {
        Self { identity, role }
    }

    /// Resolve the role for `identity` against a fresh registry snapshot
    pub fn resolve(identity: Identity, project: &ProjectData) -> Self {
        let role = resolve_role(&identity, project);
        Self { identity, role }
    }

    pub fn authorize(&self, action: Action) -> Result<()> {
        authorize(self.role, action)
    }
}
