/// Command client for the remote orchestration service
///
/// Every remote interaction funnels through `Transport` with an explicit timeout. Workflow
/// submission degrades to simulated mode the first time the service fails it; commands are
/// authorized against the caller's role and validated before anything is sent.

use crate::config::RemoteConfig;
use crate::error::{OrchestratorError, Result};
use crate::project::Action;
use crate::runtime::{
    commands::{
        Command, CommandEnvelope, CommandResponse, ContinueQuerying, PromptTraining,
        StartQuerying, SubmitLabels, TerminateProject,
    },
    context::ClientContext,
    session::{
        Session, SessionList, SessionStats, SubmitResponse, WorkflowRunStatus,
        WorkflowStatusReport, WorkflowSubmission,
    },
    transport::{Transport, TransportResponse},
};
use chrono::Utc;
use std::time::Duration;

/// Prefix of identifiers fabricated in simulated mode
pub const SIMULATED_ID_PREFIX: &str = "dev-";

const SUBMIT_PATH: &str = "/workflow/submit";
const COMMAND_PATH: &str = "/al-engine/command";

#[derive(Debug, Clone)]
pub struct CommandClient {
    transport: Transport,
}

impl CommandClient {
    pub fn new(remote: RemoteConfig) -> Result<Self> {
        Ok(Self {
            transport: Transport::new(remote)?,
        })
    }

    fn remote(&self) -> &RemoteConfig {
        self.transport.remote()
    }

    /// Submit a finalized workflow for execution
    ///
    /// A transport failure or 5xx answer switches the context into simulated mode for good;
    /// that submission and every later one get a fabricated identifier without touching the
    /// network.
    pub async fn submit_workflow(
        &self,
        ctx: &ClientContext,
        submission: &WorkflowSubmission,
    ) -> Result<SubmitResponse> {
        ctx.caller().authorize(Action::SubmitWorkflow)?;

        if ctx.mode.is_simulated() {
            return Ok(self.simulated_submission(submission).await);
        }

        let response = match self
            .transport
            .post_json(SUBMIT_PATH, submission, self.remote().request_timeout())
            .await
        {
            Ok(response) => response,
            Err(e @ OrchestratorError::Transport { .. }) => {
                ctx.mode.enter_simulated(&e.to_string());
                return Ok(self.simulated_submission(submission).await);
            }
            Err(e) => return Err(e),
        };

        if response.is_server_error() {
            ctx.mode.enter_simulated(&format!("HTTP {} from {}", response.status, SUBMIT_PATH));
            return Ok(self.simulated_submission(submission).await);
        }
        let response = ensure_success(response)?;

        let submitted: SubmitResponse = response.json()?;
        tracing::info!(
            "📤 Submitted workflow for project {} as {}",
            submission.project_id,
            submitted.workflow_id
        );
        Ok(submitted)
    }

    async fn simulated_submission(&self, submission: &WorkflowSubmission) -> SubmitResponse {
        tokio::time::sleep(self.remote().simulated_latency()).await;
        let workflow_id = format!("{}{}", SIMULATED_ID_PREFIX, uuid::Uuid::new_v4());
        tracing::info!(
            "Simulated submission for project {} as {}",
            submission.project_id,
            workflow_id
        );

        SubmitResponse {
            workflow_id,
            project_id: submission.project_id.clone(),
            status: WorkflowRunStatus::Submitted,
            simulated: true,
        }
    }

    /// Current run status of a submitted workflow
    pub async fn workflow_status(&self, ctx: &ClientContext, workflow_id: &str) -> Result<WorkflowStatusReport> {
        if ctx.mode.is_simulated() && workflow_id.starts_with(SIMULATED_ID_PREFIX) {
            return Ok(WorkflowStatusReport {
                workflow_id: workflow_id.to_string(),
                status: WorkflowRunStatus::Completed,
                created_at: None,
                started_at: None,
                completed_at: Some(Utc::now().to_rfc3339()),
                output: None,
            });
        }

        let path = format!("/workflow/status/{}", workflow_id);
        let response = self
            .transport
            .get(&path, &[], self.remote().request_timeout())
            .await?;

        if response.status == 404 {
            return Err(OrchestratorError::NotFound(format!("workflow `{}`", workflow_id)));
        }
        ensure_success(response)?.json()
    }

    /// Poll the run status until it is COMPLETED or FAILED
    ///
    /// Polls run one after another, `interval` apart. Failed polls count as attempts and are
    /// retried; after `max_attempts` without a terminal status the result is `PollingTimeout`.
    pub async fn poll_until_complete(
        &self,
        ctx: &ClientContext,
        workflow_id: &str,
        interval: Duration,
        max_attempts: u32,
    ) -> Result<WorkflowStatusReport> {
        for attempt in 1..=max_attempts {
            match self.workflow_status(ctx, workflow_id).await {
                Ok(report) if report.status.is_terminal() => {
                    tracing::info!("Workflow {} finished as {:?}", workflow_id, report.status);
                    return Ok(report);
                }
                Ok(report) => {
                    tracing::debug!(
                        "Workflow {} is {:?} (attempt {}/{})",
                        workflow_id,
                        report.status,
                        attempt,
                        max_attempts
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Status poll for {} failed (attempt {}/{}): {}",
                        workflow_id,
                        attempt,
                        max_attempts,
                        e
                    );
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(interval).await;
            }
        }

        Err(OrchestratorError::PollingTimeout {
            id: workflow_id.to_string(),
            attempts: max_attempts,
        })
    }

    /// Authorize, validate, and post a lifecycle command
    pub async fn send_command(
        &self,
        ctx: &ClientContext,
        project_id: &str,
        workflow_id: &str,
        command: Command,
    ) -> Result<CommandResponse> {
        let command_type = command.command_type();
        let caller = ctx.caller();
        caller.authorize(Action::Issue(command_type))?;
        command.validate()?;

        let envelope = CommandEnvelope {
            command_type,
            project_id: project_id.to_string(),
            workflow_id: workflow_id.to_string(),
            parameters: command.parameters()?,
            timestamp: Utc::now(),
            user_wallet: caller.identity.to_string(),
            user_role: caller.role,
            contract_address: ctx.contract_address.clone(),
        };

        let response = self
            .transport
            .post_json(COMMAND_PATH, &envelope, self.remote().request_timeout())
            .await?;
        let response = ensure_success(response)?;

        let acknowledged: CommandResponse = response.json()?;
        tracing::info!(
            "Command {} accepted for project {} ({})",
            command_type,
            project_id,
            acknowledged.status
        );
        Ok(acknowledged)
    }

    pub async fn start_querying(
        &self,
        ctx: &ClientContext,
        project_id: &str,
        workflow_id: &str,
        payload: StartQuerying,
    ) -> Result<CommandResponse> {
        self.send_command(ctx, project_id, workflow_id, Command::StartQuerying(payload))
            .await
    }

    pub async fn continue_querying(
        &self,
        ctx: &ClientContext,
        project_id: &str,
        workflow_id: &str,
        payload: ContinueQuerying,
    ) -> Result<CommandResponse> {
        self.send_command(ctx, project_id, workflow_id, Command::ContinueQuerying(payload))
            .await
    }

    pub async fn prompt_training(
        &self,
        ctx: &ClientContext,
        project_id: &str,
        workflow_id: &str,
        payload: PromptTraining,
    ) -> Result<CommandResponse> {
        self.send_command(ctx, project_id, workflow_id, Command::PromptTraining(payload))
            .await
    }

    pub async fn submit_labels(
        &self,
        ctx: &ClientContext,
        project_id: &str,
        workflow_id: &str,
        payload: SubmitLabels,
    ) -> Result<CommandResponse> {
        self.send_command(ctx, project_id, workflow_id, Command::SubmitLabels(payload))
            .await
    }

    pub async fn terminate_project(
        &self,
        ctx: &ClientContext,
        project_id: &str,
        workflow_id: &str,
        payload: TerminateProject,
    ) -> Result<CommandResponse> {
        self.send_command(ctx, project_id, workflow_id, Command::TerminateProject(payload))
            .await
    }

    /// Sessions of a project; an unknown project has none
    pub async fn sessions(&self, ctx: &ClientContext, project_id: &str) -> Result<Vec<Session>> {
        ctx.caller().authorize(Action::ViewProjectData)?;
        let path = format!("/al-engine/sessions/{}", project_id);
        let response = self
            .transport
            .get(&path, &[], self.remote().request_timeout())
            .await?;

        if response.status == 404 {
            return Ok(Vec::new());
        }
        let list: SessionList = ensure_success(response)?.json()?;
        Ok(list.sessions)
    }

    pub async fn session(&self, ctx: &ClientContext, project_id: &str, session_id: &str) -> Result<Session> {
        ctx.caller().authorize(Action::ViewProjectData)?;
        let path = format!("/al-engine/sessions/{}/{}", project_id, session_id);
        let response = self
            .transport
            .get(&path, &[], self.remote().request_timeout())
            .await?;

        if response.status == 404 {
            return Err(OrchestratorError::NotFound(format!(
                "session `{}` of project `{}`",
                session_id, project_id
            )));
        }
        ensure_success(response)?.json()
    }

    /// Labeling progress; a project without stats reports empty stats
    pub async fn session_stats(&self, ctx: &ClientContext, project_id: &str) -> Result<SessionStats> {
        let caller = ctx.caller();
        caller.authorize(Action::ViewProjectData)?;
        let path = format!("/al-engine/session-stats/{}", project_id);
        let wallet = caller.identity.to_string();
        let headers = [("X-User-Wallet", wallet.as_str()), ("X-User-Role", caller.role.as_str())];
        let response = self
            .transport
            .get(&path, &headers, self.remote().request_timeout())
            .await?;

        if response.status == 404 {
            return Ok(SessionStats::empty(project_id));
        }
        ensure_success(response)?.json()
    }

    /// Reachability check; any failure reads as unhealthy
    pub async fn health_check(&self) -> bool {
        let path = self.remote().health_path.clone();
        match self.transport.get(&path, &[], self.remote().health_timeout()).await {
            Ok(response) if response.is_success() => true,
            Ok(response) => {
                tracing::debug!("Health check answered {}", response.status);
                false
            }
            Err(e) => {
                tracing::debug!("Health check failed: {}", e);
                false
            }
        }
    }
}

fn ensure_success(response: TransportResponse) -> Result<TransportResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(OrchestratorError::CommandRejected {
            status: response.status,
            message: response.server_message(),
        })
    }
}
