/// Per-call client context
///
/// Carries who is calling, the registry snapshot their role is derived from, which project
/// contract they act on, and the shared mode switch. Every client operation takes one, so
/// the mode is explicit state instead of a global.
///
/// The role is never cached: each permission check resolves it against the current
/// snapshot, and clones of a context share that snapshot.

use crate::project::{Caller, Identity, ProjectData, Role};
use crate::runtime::mode::{Mode, ModeSwitch};
use arc_swap::ArcSwap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ClientContext {
    identity: Identity,
    project: Arc<ArcSwap<ProjectData>>,
    /// Project contract address sent along with commands and submissions
    pub contract_address: Option<String>,
    pub mode: ModeSwitch,
}

impl ClientContext {
    pub fn new(identity: Identity, project: ProjectData, mode: ModeSwitch) -> Self {
        Self {
            identity,
            project: Arc::new(ArcSwap::from_pointee(project)),
            contract_address: None,
            mode,
        }
    }

    pub fn with_contract(mut self, address: impl Into<String>) -> Self {
        self.contract_address = Some(address.into());
        self
    }

    /// Replace the registry snapshot; later checks on every clone see the new membership
    pub fn update_project(&self, project: ProjectData) {
        self.project.store(Arc::new(project));
    }

    pub fn project(&self) -> Arc<ProjectData> {
        self.project.load_full()
    }

    /// Caller resolved against the current snapshot
    pub fn caller(&self) -> Caller {
        Caller::resolve(self.identity.clone(), &self.project.load())
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn role(&self) -> Role {
        self.caller().role
    }

    pub fn current_mode(&self) -> Mode {
        self.mode.mode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{types::Participant, Action};
    use crate::runtime::commands::CommandType;

    fn project(participants: &[&str]) -> ProjectData {
        ProjectData {
            project_id: "0xproject".into(),
            creator: "0xalice".into(),
            participants: participants
                .iter()
                .map(|address| Participant {
                    address: address.to_string(),
                    role: None,
                })
                .collect(),
            ..ProjectData::default()
        }
    }

    #[test]
    fn role_follows_membership_changes() {
        let ctx = ClientContext::new(Identity::new("0xBob"), project(&[]), ModeSwitch::new());
        let shared = ctx.clone();
        assert_eq!(ctx.role(), Role::Observer);
        assert!(ctx.caller().authorize(Action::Issue(CommandType::SubmitLabels)).is_err());

        shared.update_project(project(&["0xbob"]));
        assert_eq!(ctx.role(), Role::Contributor);
        assert!(ctx.caller().authorize(Action::Issue(CommandType::SubmitLabels)).is_ok());

        ctx.update_project(project(&[]));
        assert_eq!(shared.role(), Role::Observer);
    }

    #[test]
    fn creator_resolves_to_coordinator() {
        let ctx = ClientContext::new(Identity::new("0xALICE"), project(&[]), ModeSwitch::new());
        assert_eq!(ctx.role(), Role::Coordinator);
        assert_eq!(ctx.caller().identity, Identity::new("0xalice"));
    }
}
