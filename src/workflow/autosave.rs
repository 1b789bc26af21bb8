/// Debounced auto-save for in-progress workflow edits
///
/// Each edit replaces the pending document; once edits stop arriving for the configured delay
/// the latest one is written through `ConfigStore::auto_save`. Earlier edits within the window
/// are never written.

use crate::error::Result;
use crate::project::Identity;
use crate::workflow::{
    store::{AutoSaveOutcome, ConfigStore},
    types::WorkflowDocument,
};
use std::{sync::Arc, time::Duration};
use tokio::{sync::watch, task::JoinHandle};

/// Background auto-saver bound to one project and caller
#[derive(Debug)]
pub struct AutoSaver {
    project_id: String,
    edits: watch::Sender<Option<WorkflowDocument>>,
    task: Option<JoinHandle<()>>,
}

impl AutoSaver {
    /// Start the debounce task
    pub fn spawn(store: Arc<ConfigStore>, project_id: &str, caller: Identity, delay: Duration) -> Self {
        let (edits, receiver) = watch::channel(None);
        let task = tokio::spawn(debounce_loop(
            store,
            project_id.to_string(),
            caller,
            delay,
            receiver,
        ));

        tracing::debug!("Auto-save started for project {} ({:?} debounce)", project_id, delay);
        Self {
            project_id: project_id.to_string(),
            edits,
            task: Some(task),
        }
    }

    /// Record an edit; restarts the debounce window
    pub fn edit(&self, workflow: WorkflowDocument) {
        self.edits.send_replace(Some(workflow));
    }

    /// Flush any pending edit and stop the task
    pub async fn shutdown(mut self) {
        let task = self.task.take();
        // closing the channel lets the loop write the last pending edit and exit
        let (closed, _) = watch::channel(None);
        drop(std::mem::replace(&mut self.edits, closed));

        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!("Auto-save task for {} ended abnormally: {}", self.project_id, e);
            }
        }
    }
}

impl Drop for AutoSaver {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn debounce_loop(
    store: Arc<ConfigStore>,
    project_id: String,
    caller: Identity,
    delay: Duration,
    mut edits: watch::Receiver<Option<WorkflowDocument>>,
) {
    loop {
        // wait for the first edit of a burst
        if edits.changed().await.is_err() {
            return;
        }

        // extend the window while edits keep arriving
        let open = loop {
            tokio::select! {
                changed = edits.changed() => {
                    if changed.is_err() {
                        break false;
                    }
                }
                _ = tokio::time::sleep(delay) => break true,
            }
        };

        let pending = edits.borrow_and_update().clone();
        if let Some(workflow) = pending {
            if let Err(e) = save_pending(&store, &project_id, &caller, workflow).await {
                tracing::warn!("Auto-save failed for project {}: {}", project_id, e);
            }
        }

        if !open {
            return;
        }
    }
}

async fn save_pending(
    store: &ConfigStore,
    project_id: &str,
    caller: &Identity,
    workflow: WorkflowDocument,
) -> Result<()> {
    match store.auto_save(project_id, caller, workflow).await? {
        AutoSaveOutcome::Saved(record) => {
            tracing::debug!("Auto-saved project {} as v{}", project_id, record.metadata.version);
        }
        AutoSaveOutcome::Skipped(status) => {
            tracing::debug!("Auto-save for project {} skipped, record is {}", project_id, status);
        }
    }
    Ok(())
}
