/// Project membership types consumed from the external project registry
///
/// The registry (an on-chain project contract) is an outside collaborator; this crate only
/// reads the creator and participant list it reports in order to derive caller roles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wallet identity of a caller (e.g. "0xA11CE...")
///
/// Wallet addresses are compared case-insensitively, the original casing is kept for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against another address
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.0)
    }
}

impl Eq for Identity {}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

/// Snapshot of a project as reported by the registry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectData {
    /// Project identifier in the registry
    #[serde(default)]
    pub project_id: String,
    /// Wallet that created the project
    pub creator: String,
    /// Listed participants
    #[serde(default)]
    pub participants: Vec<Participant>,
    /// Registry says the current wallet is a member
    #[serde(default)]
    pub is_member: bool,
    /// Registry says the current wallet owns the project
    #[serde(default)]
    pub is_owner: bool,
}

/// A listed project participant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub address: String,
    /// Free-form role label from the registry ("contributor", "labeler", ...)
    #[serde(default)]
    pub role: Option<String>,
}

impl ProjectData {
    /// True when the identity appears in the participant list
    pub fn lists_participant(&self, identity: &Identity) -> bool {
        self.participants
            .iter()
            .any(|participant| identity.matches(&participant.address))
    }
}
