/// Core workflow type definitions
///
/// The workflow document is a CWL-shaped description of the active-learning pipeline. It is
/// persisted as JSON next to its lifecycle metadata and submitted verbatim to the remote
/// execution service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A complete workflow document: declared inputs, declared outputs, and a pipeline of steps
///
/// Version and class tags are kept as free strings so that malformed documents can be
/// represented and rejected by the validator instead of failing to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDocument {
    /// Document format version tag (e.g. "v1.2")
    #[serde(rename = "cwlVersion", default)]
    pub version: String,
    /// Document class tag (e.g. "Workflow")
    #[serde(default)]
    pub class: String,
    /// Workflow identifier (e.g. "al-workflow-p1")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Human-readable title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub inputs: Vec<WorkflowInput>,
    #[serde(default)]
    pub outputs: Vec<WorkflowOutput>,
    /// Pipeline steps in declaration order
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

/// Declared workflow input with its type and default value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInput {
    pub id: String,
    /// Type tag ("File", "string", "int", "float", "string[]")
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

/// Declared workflow output bound to a step output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowOutput {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Source in "step_id/output_id" form
    #[serde(rename = "outputSource")]
    pub output_source: String,
}

/// One named pipeline step
///
/// `inputs` maps each step parameter to its source: either a workflow input id or a
/// "step_id/output_id" reference to an earlier step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: String,
    /// Tool description the step runs (e.g. "al_iteration.cwl")
    pub run: String,
    #[serde(rename = "in", default)]
    pub inputs: Vec<StepInput>,
    #[serde(default)]
    pub out: Vec<String>,
}

/// Binding of a step parameter to its source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInput {
    pub id: String,
    pub source: String,
}

impl StepInput {
    pub fn new(id: &str, source: &str) -> Self {
        Self {
            id: id.to_string(),
            source: source.to_string(),
        }
    }
}

impl WorkflowDocument {
    pub fn input(&self, id: &str) -> Option<&WorkflowInput> {
        self.inputs.iter().find(|input| input.id == id)
    }

    pub fn step(&self, id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|step| step.id == id)
    }

    /// Input id → default value, as submitted alongside the document
    pub fn default_inputs(&self) -> serde_json::Map<String, Value> {
        self.inputs
            .iter()
            .filter_map(|input| input.default.clone().map(|value| (input.id.clone(), value)))
            .collect()
    }
}

/// Active-learning parameters a coordinator edits
///
/// Defaults follow the orchestration server's own fallbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlConfig {
    /// Query strategy name understood by the AL engine
    pub query_strategy: String,
    /// Model configuration, serialized to text inside the document
    pub model_config: Value,
    /// Samples queried per round
    pub labeling_budget: u32,
    /// Maximum number of query → label → train rounds
    pub max_iterations: u32,
    /// Fraction of data held out for validation
    pub validation_split: f64,
    /// Adds the federated coordination step when set
    pub is_federated: bool,
    /// Contributor wallets taking part in federated rounds
    pub contributors: Vec<String>,
}

impl Default for AlConfig {
    fn default() -> Self {
        Self {
            query_strategy: "uncertainty_sampling".to_string(),
            model_config: serde_json::json!({ "model_type": "RandomForestClassifier" }),
            labeling_budget: 10,
            max_iterations: 50,
            validation_split: 0.2,
            is_federated: false,
            contributors: Vec::new(),
        }
    }
}

/// Lifecycle status of a workflow record, ordered draft < finalized < deployed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Draft,
    Finalized,
    Deployed,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Draft => "draft",
            WorkflowStatus::Finalized => "finalized",
            WorkflowStatus::Deployed => "deployed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(WorkflowStatus::Draft),
            "finalized" => Some(WorkflowStatus::Finalized),
            "deployed" => Some(WorkflowStatus::Deployed),
            _ => None,
        }
    }

    /// Status never moves backwards
    pub fn can_become(&self, next: WorkflowStatus) -> bool {
        next >= *self
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle metadata stored with every workflow record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Wallet that created the record; the only identity allowed to touch it
    pub creator: String,
    pub last_modified_at: DateTime<Utc>,
    /// Bumped on every persisted mutation, starting at 1
    pub version: u64,
    pub auto_saved: bool,
    pub status: WorkflowStatus,
    #[serde(default)]
    pub finalized_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deployed_at: Option<DateTime<Utc>>,
    /// Remote identifier recorded on deployment
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Partial metadata update merged over the stored metadata; set fields win
///
/// Callers may only restate the current status. Lifecycle stamps are set by the store's
/// finalize and deploy paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataPatch {
    pub auto_saved: Option<bool>,
    pub status: Option<WorkflowStatus>,
    pub(crate) finalized_at: Option<DateTime<Utc>>,
    pub(crate) deployed_at: Option<DateTime<Utc>>,
    pub(crate) session_id: Option<String>,
}

impl MetadataPatch {
    /// Patch applied by auto-save
    pub fn auto_saved_draft() -> Self {
        Self {
            auto_saved: Some(true),
            status: Some(WorkflowStatus::Draft),
            ..Self::default()
        }
    }

    /// Merge over `metadata`
    pub fn apply_to(&self, metadata: &mut RecordMetadata) {
        if let Some(auto_saved) = self.auto_saved {
            metadata.auto_saved = auto_saved;
        }
        if let Some(status) = self.status {
            metadata.status = status;
        }
        if let Some(finalized_at) = self.finalized_at {
            metadata.finalized_at = Some(finalized_at);
        }
        if let Some(deployed_at) = self.deployed_at {
            metadata.deployed_at = Some(deployed_at);
        }
        if let Some(session_id) = &self.session_id {
            metadata.session_id = Some(session_id.clone());
        }
    }
}

/// One project's workflow plus its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub project_id: String,
    pub workflow: WorkflowDocument,
    pub metadata: RecordMetadata,
}

/// Record listing entry for read-only display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowSummary {
    pub project_id: String,
    pub creator: String,
    pub status: WorkflowStatus,
    pub version: u64,
    pub last_modified_at: DateTime<Utc>,
}

/// Contributor invitation awaiting acceptance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingInvitation {
    pub project_id: String,
    pub invitee: String,
    pub invited_by: String,
    pub invited_at: DateTime<Utc>,
}

/// "Saved" notification delivered to subscribers of one project
#[derive(Debug, Clone, PartialEq)]
pub struct SavedEvent {
    pub project_id: String,
    pub version: u64,
    pub saved_at: DateTime<Utc>,
    pub auto_saved: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> RecordMetadata {
        RecordMetadata {
            creator: "0xalice".into(),
            last_modified_at: Utc::now(),
            version: 3,
            auto_saved: false,
            status: WorkflowStatus::Draft,
            finalized_at: None,
            deployed_at: None,
            session_id: None,
        }
    }

    #[test]
    fn status_is_ordered_and_never_regresses() {
        assert!(WorkflowStatus::Draft.can_become(WorkflowStatus::Finalized));
        assert!(WorkflowStatus::Finalized.can_become(WorkflowStatus::Deployed));
        assert!(WorkflowStatus::Finalized.can_become(WorkflowStatus::Finalized));
        assert!(!WorkflowStatus::Deployed.can_become(WorkflowStatus::Draft));
        assert!(!WorkflowStatus::Finalized.can_become(WorkflowStatus::Draft));
        assert_eq!(WorkflowStatus::parse("deployed"), Some(WorkflowStatus::Deployed));
        assert_eq!(WorkflowStatus::parse("archived"), None);
    }

    #[test]
    fn patch_fields_win_and_absent_fields_are_kept() {
        let mut merged = metadata();
        merged.session_id = Some("old".into());

        MetadataPatch {
            auto_saved: Some(true),
            ..MetadataPatch::default()
        }
        .apply_to(&mut merged);

        assert!(merged.auto_saved);
        assert_eq!(merged.session_id.as_deref(), Some("old"));
        assert_eq!(merged.status, WorkflowStatus::Draft);
    }

    #[test]
    fn document_uses_cwl_field_names() {
        let doc: WorkflowDocument = serde_json::from_value(serde_json::json!({
            "cwlVersion": "v1.2",
            "class": "Workflow",
            "inputs": [{ "id": "query_strategy", "type": "string", "default": "entropy" }],
            "outputs": [{ "id": "model_out", "type": "File", "outputSource": "train/model_out" }],
            "steps": [{
                "id": "train",
                "run": "train.cwl",
                "in": [{ "id": "query_strategy", "source": "query_strategy" }],
                "out": ["model_out"]
            }]
        }))
        .unwrap();

        assert_eq!(doc.version, "v1.2");
        assert_eq!(doc.step("train").unwrap().out, vec!["model_out".to_string()]);
        assert_eq!(
            doc.default_inputs().get("query_strategy"),
            Some(&serde_json::json!("entropy"))
        );
    }
}
