/// Project deployment: finalize, submit, record
///
/// Connects the config store to the command client. A draft is finalized first, the finalized
/// document goes to the remote service (or the simulated fallback), and the returned
/// identifier is recorded on the record as it moves to `deployed`.

use crate::error::{OrchestratorError, Result};
use crate::project::Action;
use crate::runtime::{
    client::CommandClient,
    context::ClientContext,
    mode::Mode,
    session::{SubmitResponse, WorkflowSubmission},
};
use crate::workflow::{
    store::ConfigStore,
    types::{WorkflowRecord, WorkflowStatus},
};
use serde_json::json;

#[derive(Debug, Clone)]
pub struct DeploymentOutcome {
    pub record: WorkflowRecord,
    pub submission: SubmitResponse,
    /// Mode in effect once the submission finished
    pub mode: Mode,
}

pub async fn deploy_project(
    store: &ConfigStore,
    client: &CommandClient,
    ctx: &ClientContext,
    project_id: &str,
) -> Result<DeploymentOutcome> {
    let caller = ctx.caller();
    caller.authorize(Action::SubmitWorkflow)?;
    let identity = &caller.identity;

    let record = store
        .load(project_id, identity)
        .await?
        .ok_or_else(|| OrchestratorError::NotFound(format!("workflow record for project `{}`", project_id)))?;

    match record.metadata.status {
        WorkflowStatus::Deployed => {
            return Err(OrchestratorError::InvalidTransition {
                project_id: project_id.to_string(),
                from: WorkflowStatus::Deployed,
                to: WorkflowStatus::Deployed,
            })
        }
        WorkflowStatus::Draft => {
            store.finalize(project_id, identity).await?;
        }
        WorkflowStatus::Finalized => {}
    }

    let record = store
        .load(project_id, identity)
        .await?
        .ok_or_else(|| OrchestratorError::NotFound(format!("workflow record for project `{}`", project_id)))?;

    let submission = WorkflowSubmission {
        project_id: project_id.to_string(),
        inputs: record.workflow.default_inputs(),
        cwl_workflow: record.workflow.clone(),
        metadata: json!({
            "creator": record.metadata.creator,
            "version": record.metadata.version,
            "finalized_at": record.metadata.finalized_at,
        }),
        user_wallet: identity.to_string(),
        user_role: caller.role.as_str().to_string(),
        contract_address: ctx.contract_address.clone(),
    };

    let submitted = client.submit_workflow(ctx, &submission).await?;
    let deployed = store
        .mark_deployed(project_id, identity, &submitted.workflow_id)
        .await?;

    tracing::info!(
        "🚀 Project {} deployed ({} mode, workflow {})",
        project_id,
        ctx.current_mode(),
        submitted.workflow_id
    );

    Ok(DeploymentOutcome {
        record: deployed,
        submission: submitted,
        mode: ctx.current_mode(),
    })
}
