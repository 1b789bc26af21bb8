/// Remote-owned records mirrored by the client
///
/// Sessions, session statistics, and workflow run status are owned by the orchestration
/// service; the client decodes them leniently and never mutates them.

use crate::workflow::types::WorkflowDocument;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Status of an active-learning session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    WaitingForLabels,
    Training,
    Completed,
    /// Any status this client does not know yet
    #[serde(other)]
    Unknown,
}

/// A sample the engine asked contributors to label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueriedSample {
    pub sample_id: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub uncertainty: Option<f64>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Model quality reported after a training round
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub precision: Option<f64>,
    #[serde(default)]
    pub recall: Option<f64>,
    #[serde(default)]
    pub f1_score: Option<f64>,
    #[serde(default)]
    pub round: Option<u32>,
    /// Fields this client does not model
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// One query → label → train session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub status: SessionStatus,
    #[serde(default)]
    pub current_round: u32,
    #[serde(default)]
    pub total_rounds: u32,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub queried_samples: Vec<QueriedSample>,
    #[serde(default)]
    pub accuracy_metrics: Option<AccuracyMetrics>,
}

impl Session {
    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SessionList {
    #[serde(default)]
    pub sessions: Vec<Session>,
}

/// Aggregated labeling progress of a project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionStats {
    pub project_id: String,
    pub total_contributors: u32,
    pub total_samples: u32,
    pub labeled_samples: u32,
    pub consensus_samples: u32,
    pub progress_percentage: f64,
    pub contributors: Vec<Value>,
}

impl SessionStats {
    /// Stats shown for a project the service has no data for
    pub fn empty(project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            ..Self::default()
        }
    }
}

/// Run status of a submitted workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkflowRunStatus {
    Submitted,
    Pending,
    Running,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl WorkflowRunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowRunStatus::Completed | WorkflowRunStatus::Failed)
    }
}

/// Status report of a submitted workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStatusReport {
    pub workflow_id: String,
    pub status: WorkflowRunStatus,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub output: Option<Value>,
}

/// Body posted to the workflow submission endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowSubmission {
    pub project_id: String,
    pub cwl_workflow: WorkflowDocument,
    pub inputs: serde_json::Map<String, Value>,
    pub metadata: Value,
    pub user_wallet: String,
    pub user_role: String,
    pub contract_address: Option<String>,
}

/// Identifier handed back for a submitted workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub workflow_id: String,
    #[serde(default)]
    pub project_id: String,
    pub status: WorkflowRunStatus,
    /// True when the response was fabricated locally
    #[serde(default)]
    pub simulated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sessions_decode_leniently() {
        let session: Session = serde_json::from_value(json!({
            "session_id": "s1",
            "status": "waiting_for_smart_contract_results",
            "current_round": 2,
            "total_rounds": 10,
            "created_at": "2025-01-01T10:00:00",
            "accuracy_metrics": {},
            "is_dal_session": true
        }))
        .unwrap();

        assert_eq!(session.status, SessionStatus::Unknown);
        assert_eq!(session.current_round, 2);
        assert!(session.queried_samples.is_empty());
        assert_eq!(session.accuracy_metrics, Some(AccuracyMetrics::default()));
    }

    #[test]
    fn run_status_terminal_states() {
        let status: WorkflowRunStatus = serde_json::from_value(json!("COMPLETED")).unwrap();
        assert!(status.is_terminal());
        assert!(WorkflowRunStatus::Failed.is_terminal());
        assert!(!WorkflowRunStatus::Running.is_terminal());

        let other: WorkflowRunStatus = serde_json::from_value(json!("QUEUED")).unwrap();
        assert_eq!(other, WorkflowRunStatus::Unknown);
    }

    #[test]
    fn stats_fill_missing_fields() {
        let stats: SessionStats =
            serde_json::from_value(json!({ "project_id": "p1", "labeled_samples": 4 })).unwrap();
        assert_eq!(stats.labeled_samples, 4);
        assert_eq!(stats.total_samples, 0);
        assert_eq!(SessionStats::empty("p2").project_id, "p2");
    }
}
