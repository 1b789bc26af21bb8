/// Versioned workflow configuration store
///
/// Owns the draft → finalized → deployed lifecycle of each project's workflow record:
/// creator-only mutation, a strictly increasing version, auto-save for drafts, validation at
/// finalize time, and the staleness sweep run when the store is opened. Saves are announced to
/// project-scoped subscribers.

use crate::config::StoreConfig;
use crate::error::{OrchestratorError, Result};
use crate::project::{Action, Caller, Identity, ProjectData};
use crate::workflow::{
    storage::WorkflowStorage,
    template::build_template,
    types::{
        AlConfig, MetadataPatch, PendingInvitation, RecordMetadata, SavedEvent,
        WorkflowDocument, WorkflowRecord, WorkflowStatus, WorkflowSummary,
    },
    validator::validation_issues,
};
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex};

const SAVED_CHANNEL_CAPACITY: usize = 64;

/// Result of an auto-save attempt
#[derive(Debug, Clone, PartialEq)]
pub enum AutoSaveOutcome {
    Saved(WorkflowRecord),
    /// Record is past draft; auto-save no longer writes to it
    Skipped(WorkflowStatus),
}

/// Workflow record store with lifecycle rules
#[derive(Debug)]
pub struct ConfigStore {
    storage: WorkflowStorage,
    saved_tx: broadcast::Sender<SavedEvent>,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
    max_draft_age: chrono::Duration,
}

impl ConfigStore {
    /// Open the store and sweep stale drafts
    pub async fn open(storage: WorkflowStorage, config: &StoreConfig) -> Result<Self> {
        storage.init_schema().await?;
        let (saved_tx, _) = broadcast::channel(SAVED_CHANNEL_CAPACITY);

        let store = Self {
            storage,
            saved_tx,
            write_lock: Mutex::new(()),
            max_draft_age: config.max_draft_age(),
        };

        let purged = store.sweep_stale_drafts().await?;
        tracing::info!(
            "Workflow config store ready ({} stale drafts purged, max draft age {} days)",
            purged,
            store.max_draft_age.num_days()
        );

        Ok(store)
    }

    /// Subscribe to "saved" notifications for one project
    pub fn subscribe(&self, project_id: &str) -> SaveSubscription {
        SaveSubscription {
            project_id: project_id.to_string(),
            receiver: self.saved_tx.subscribe(),
        }
    }

    /// Load a record; only its creator may read it
    pub async fn load(&self, project_id: &str, caller: &Identity) -> Result<Option<WorkflowRecord>> {
        match self.storage.get_record(project_id).await? {
            Some(record) => {
                ensure_creator(&record, caller)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Load a record, creating the draft from the template on first access
    pub async fn load_or_create(
        &self,
        project_id: &str,
        caller: &Identity,
        title: &str,
        config: &AlConfig,
    ) -> Result<WorkflowRecord> {
        if let Some(record) = self.load(project_id, caller).await? {
            return Ok(record);
        }

        tracing::info!("Creating workflow draft for project {} from template", project_id);
        let workflow = build_template(project_id, title, config);
        match self.save(project_id, caller, workflow, MetadataPatch::default()).await {
            Err(OrchestratorError::VersionConflict { .. }) => self
                .load(project_id, caller)
                .await?
                .ok_or_else(|| OrchestratorError::NotFound(format!("project `{}`", project_id))),
            other => other,
        }
    }

    /// Persist a workflow with a metadata patch merged over the stored metadata
    ///
    /// Bumps the version and stamps the modification time. Fails with `InvalidTransition` if
    /// the patch names any status other than the current one (status only moves through
    /// `finalize` and `mark_deployed`), and with `VersionConflict` if another writer changed the
    /// record in between.
    pub async fn save(
        &self,
        project_id: &str,
        caller: &Identity,
        workflow: WorkflowDocument,
        patch: MetadataPatch,
    ) -> Result<WorkflowRecord> {
        let _guard = self.write_lock.lock().await;
        let existing = self.storage.get_record(project_id).await?;
        ensure_status_unchanged(project_id, caller, existing.as_ref(), &patch)?;
        self.write(project_id, caller, existing, workflow, patch).await
    }

    /// `save` that fails unless the stored version is still `expected_version`
    pub async fn save_versioned(
        &self,
        project_id: &str,
        caller: &Identity,
        workflow: WorkflowDocument,
        patch: MetadataPatch,
        expected_version: u64,
    ) -> Result<WorkflowRecord> {
        let _guard = self.write_lock.lock().await;
        let existing = self.storage.get_record(project_id).await?;

        let actual = existing.as_ref().map(|record| record.metadata.version).unwrap_or(0);
        if actual != expected_version {
            tracing::warn!(
                "Rejected stale write to project {} (expected v{}, found v{})",
                project_id,
                expected_version,
                actual
            );
            return Err(OrchestratorError::VersionConflict {
                project_id: project_id.to_string(),
                expected: expected_version,
                actual,
            });
        }

        ensure_status_unchanged(project_id, caller, existing.as_ref(), &patch)?;
        self.write(project_id, caller, existing, workflow, patch).await
    }

    /// Save an in-progress edit as an auto-saved draft
    ///
    /// Records that are already finalized or deployed are left untouched.
    pub async fn auto_save(
        &self,
        project_id: &str,
        caller: &Identity,
        workflow: WorkflowDocument,
    ) -> Result<AutoSaveOutcome> {
        let _guard = self.write_lock.lock().await;
        let existing = self.storage.get_record(project_id).await?;

        if let Some(record) = &existing {
            ensure_creator(record, caller)?;
            if record.metadata.status != WorkflowStatus::Draft {
                tracing::debug!(
                    "Skipping auto-save for project {}: record is {}",
                    project_id,
                    record.metadata.status
                );
                return Ok(AutoSaveOutcome::Skipped(record.metadata.status));
            }
        }

        let record = self
            .write(project_id, caller, existing, workflow, MetadataPatch::auto_saved_draft())
            .await?;
        Ok(AutoSaveOutcome::Saved(record))
    }

    /// Validate the workflow and move the record to `finalized`
    ///
    /// Returns false when the record was already finalized. A failed validation leaves the
    /// record unchanged.
    pub async fn finalize(&self, project_id: &str, caller: &Identity) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let record = self.require_record(project_id, caller).await?;

        match record.metadata.status {
            WorkflowStatus::Finalized => return Ok(false),
            WorkflowStatus::Deployed => {
                return Err(OrchestratorError::InvalidTransition {
                    project_id: project_id.to_string(),
                    from: WorkflowStatus::Deployed,
                    to: WorkflowStatus::Finalized,
                })
            }
            WorkflowStatus::Draft => {}
        }

        let issues = validation_issues(&record.workflow);
        if !issues.is_empty() {
            tracing::warn!("Finalize rejected for project {}: {}", project_id, issues.join("; "));
            return Err(OrchestratorError::Validation {
                project_id: project_id.to_string(),
                reason: issues.join("; "),
            });
        }

        let patch = MetadataPatch {
            status: Some(WorkflowStatus::Finalized),
            auto_saved: Some(false),
            finalized_at: Some(Utc::now()),
            ..MetadataPatch::default()
        };
        let workflow = record.workflow.clone();
        self.write(project_id, caller, Some(record), workflow, patch).await?;

        tracing::info!("Finalized workflow for project {}", project_id);
        Ok(true)
    }

    /// Move a finalized record to `deployed` and remember the remote identifier
    pub async fn mark_deployed(
        &self,
        project_id: &str,
        caller: &Identity,
        session_id: &str,
    ) -> Result<WorkflowRecord> {
        let _guard = self.write_lock.lock().await;
        let record = self.require_record(project_id, caller).await?;

        if record.metadata.status != WorkflowStatus::Finalized {
            return Err(OrchestratorError::InvalidTransition {
                project_id: project_id.to_string(),
                from: record.metadata.status,
                to: WorkflowStatus::Deployed,
            });
        }

        let patch = MetadataPatch {
            status: Some(WorkflowStatus::Deployed),
            deployed_at: Some(Utc::now()),
            session_id: Some(session_id.to_string()),
            ..MetadataPatch::default()
        };
        let workflow = record.workflow.clone();
        let deployed = self.write(project_id, caller, Some(record), workflow, patch).await?;

        tracing::info!("Project {} deployed as {}", project_id, session_id);
        Ok(deployed)
    }

    /// Explicitly delete a record (creator only)
    pub async fn remove(&self, project_id: &str, caller: &Identity) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        match self.storage.get_record(project_id).await? {
            Some(record) => {
                ensure_creator(&record, caller)?;
                let removed = self.storage.delete_record(project_id).await?;
                tracing::info!("Removed workflow record for project {}", project_id);
                Ok(removed)
            }
            None => Ok(false),
        }
    }

    /// Purge drafts not modified within the configured max age
    pub async fn sweep_stale_drafts(&self) -> Result<u64> {
        let Some(cutoff) = Utc::now().checked_sub_signed(self.max_draft_age) else {
            tracing::debug!(
                "Draft max age of {} days reaches past the earliest timestamp, nothing to purge",
                self.max_draft_age.num_days()
            );
            return Ok(0);
        };
        let purged = self.storage.purge_drafts_before(cutoff).await?;
        if purged > 0 {
            tracing::info!("Purged {} stale workflow drafts older than {}", purged, cutoff);
        }
        Ok(purged)
    }

    /// Read-only listing of every record
    pub async fn summaries(&self) -> Result<Vec<WorkflowSummary>> {
        self.storage.list_summaries().await
    }

    /// Invite a contributor to a project
    ///
    /// The caller's role is derived from the registry snapshot on every call, and a stored
    /// record must have been created by the caller.
    pub async fn invite_contributor(
        &self,
        project_id: &str,
        identity: &Identity,
        project: &ProjectData,
        invitee: &str,
    ) -> Result<PendingInvitation> {
        self.authorize_management(project_id, identity, project).await?;

        let invitation = PendingInvitation {
            project_id: project_id.to_string(),
            invitee: invitee.to_lowercase(),
            invited_by: identity.to_string(),
            invited_at: Utc::now(),
        };
        self.storage.insert_invitation(&invitation).await?;

        tracing::info!("Invited {} to project {}", invitation.invitee, project_id);
        Ok(invitation)
    }

    /// Withdraw a pending invitation, under the same gate as `invite_contributor`
    pub async fn revoke_invitation(
        &self,
        project_id: &str,
        identity: &Identity,
        project: &ProjectData,
        invitee: &str,
    ) -> Result<bool> {
        self.authorize_management(project_id, identity, project).await?;
        self.storage.delete_invitation(project_id, invitee).await
    }

    /// Pending invitations for display; observers are denied
    pub async fn pending_invitations(
        &self,
        project_id: &str,
        identity: &Identity,
        project: &ProjectData,
    ) -> Result<Vec<PendingInvitation>> {
        Caller::resolve(identity.clone(), project).authorize(Action::ViewContributors)?;
        self.storage.list_invitations(project_id).await
    }

    async fn authorize_management(
        &self,
        project_id: &str,
        identity: &Identity,
        project: &ProjectData,
    ) -> Result<()> {
        Caller::resolve(identity.clone(), project).authorize(Action::ManageContributors)?;
        if let Some(record) = self.storage.get_record(project_id).await? {
            ensure_creator(&record, identity)?;
        }
        Ok(())
    }

    async fn require_record(&self, project_id: &str, caller: &Identity) -> Result<WorkflowRecord> {
        let record = self
            .storage
            .get_record(project_id)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound(format!("workflow record for project `{}`", project_id)))?;
        ensure_creator(&record, caller)?;
        Ok(record)
    }

    /// Merge, bump, persist, and announce; callers hold the write lock
    async fn write(
        &self,
        project_id: &str,
        caller: &Identity,
        existing: Option<WorkflowRecord>,
        workflow: WorkflowDocument,
        patch: MetadataPatch,
    ) -> Result<WorkflowRecord> {
        let now = Utc::now();

        let metadata = match existing {
            Some(record) => {
                ensure_creator(&record, caller)?;

                let mut metadata = record.metadata;
                if let Some(next) = patch.status {
                    if !metadata.status.can_become(next) {
                        return Err(OrchestratorError::InvalidTransition {
                            project_id: project_id.to_string(),
                            from: metadata.status,
                            to: next,
                        });
                    }
                }
                patch.apply_to(&mut metadata);
                metadata.version += 1;
                metadata.last_modified_at = strictly_after(metadata.last_modified_at, now);
                metadata
            }
            None => {
                let mut metadata = RecordMetadata {
                    creator: caller.to_string(),
                    last_modified_at: now,
                    version: 1,
                    auto_saved: false,
                    status: WorkflowStatus::Draft,
                    finalized_at: None,
                    deployed_at: None,
                    session_id: None,
                };
                patch.apply_to(&mut metadata);
                metadata
            }
        };

        let record = WorkflowRecord {
            project_id: project_id.to_string(),
            workflow,
            metadata,
        };

        if !self.storage.write_record(&record).await? {
            let actual = self.storage.current_version(project_id).await?.unwrap_or(0);
            tracing::warn!(
                "Concurrent write detected on project {} (wrote v{}, store has v{})",
                project_id,
                record.metadata.version,
                actual
            );
            return Err(OrchestratorError::VersionConflict {
                project_id: project_id.to_string(),
                expected: record.metadata.version - 1,
                actual,
            });
        }

        tracing::debug!(
            "Saved project {} v{} ({}{})",
            project_id,
            record.metadata.version,
            record.metadata.status,
            if record.metadata.auto_saved { ", auto-saved" } else { "" }
        );

        // no subscribers is fine
        let _ = self.saved_tx.send(SavedEvent {
            project_id: project_id.to_string(),
            version: record.metadata.version,
            saved_at: record.metadata.last_modified_at,
            auto_saved: record.metadata.auto_saved,
        });

        Ok(record)
    }
}

/// Receiver of "saved" notifications for a single project
#[derive(Debug)]
pub struct SaveSubscription {
    project_id: String,
    receiver: broadcast::Receiver<SavedEvent>,
}

impl SaveSubscription {
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Next save of this project; `None` once the store is gone
    ///
    /// A subscriber that falls behind skips the missed events and continues with the newest.
    pub async fn recv(&mut self) -> Option<SavedEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.project_id == self.project_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("Save subscription for {} skipped {} events", self.project_id, skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Reject caller patches that would change the lifecycle status
///
/// New records always start as drafts.
fn ensure_status_unchanged(
    project_id: &str,
    caller: &Identity,
    existing: Option<&WorkflowRecord>,
    patch: &MetadataPatch,
) -> Result<()> {
    let current = match existing {
        Some(record) => {
            ensure_creator(record, caller)?;
            record.metadata.status
        }
        None => WorkflowStatus::Draft,
    };

    match patch.status {
        Some(next) if next != current => Err(OrchestratorError::InvalidTransition {
            project_id: project_id.to_string(),
            from: current,
            to: next,
        }),
        _ => Ok(()),
    }
}

fn ensure_creator(record: &WorkflowRecord, caller: &Identity) -> Result<()> {
    if caller.matches(&record.metadata.creator) {
        Ok(())
    } else {
        Err(OrchestratorError::AccessDenied {
            project_id: record.project_id.clone(),
            caller: caller.to_string(),
        })
    }
}

/// `now`, pushed forward so modification times strictly increase
fn strictly_after(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + chrono::Duration::milliseconds(1)
    }
}
