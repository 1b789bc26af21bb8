/// Session poller
///
/// Keeps a lock-free snapshot of a project's sessions and the currently selected session.
/// Each refresh swaps in the new list and replaces the selection with the refreshed object of
/// the same identity. A failed refresh leaves the last known good snapshot in place.

use crate::error::Result;
use crate::runtime::{client::CommandClient, context::ClientContext, session::Session};
use arc_swap::{ArcSwap, ArcSwapOption};
use std::{sync::Arc, time::Duration};
use tokio::{task::JoinHandle, time::MissedTickBehavior};

#[derive(Debug)]
pub struct SessionPoller {
    client: CommandClient,
    ctx: ClientContext,
    project_id: String,
    sessions: ArcSwap<Vec<Session>>,
    selected: ArcSwapOption<Session>,
}

impl SessionPoller {
    pub fn new(client: CommandClient, ctx: ClientContext, project_id: &str) -> Self {
        Self {
            client,
            ctx,
            project_id: project_id.to_string(),
            sessions: ArcSwap::new(Arc::new(Vec::new())),
            selected: ArcSwapOption::empty(),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Last known good session list
    pub fn sessions(&self) -> Arc<Vec<Session>> {
        self.sessions.load_full()
    }

    pub fn selected(&self) -> Option<Arc<Session>> {
        self.selected.load_full()
    }

    /// Select a session from the current snapshot; false if it is not listed
    pub fn select(&self, session_id: &str) -> bool {
        let current = self.sessions.load();
        match current.iter().find(|session| session.session_id == session_id) {
            Some(session) => {
                self.selected.store(Some(Arc::new(session.clone())));
                true
            }
            None => false,
        }
    }

    pub fn clear_selection(&self) {
        self.selected.store(None);
    }

    /// Fetch the session list once and swap it in
    pub async fn refresh(&self) -> Result<Arc<Vec<Session>>> {
        let fetched = match self.client.sessions(&self.ctx, &self.project_id).await {
            Ok(sessions) => Arc::new(sessions),
            Err(e) => {
                tracing::warn!(
                    "Session refresh for project {} failed, keeping last known state: {}",
                    self.project_id,
                    e
                );
                return Err(e);
            }
        };

        self.sessions.store(Arc::clone(&fetched));

        // compare-and-swap so a selection change made meanwhile is never overwritten
        self.selected.rcu(|current| {
            match reconcile_selection(current.as_deref(), &fetched) {
                Some(next) => Some(Arc::new(next)),
                None => current.clone(),
            }
        });

        tracing::debug!(
            "Refreshed {} sessions for project {}",
            fetched.len(),
            self.project_id
        );
        Ok(fetched)
    }

    /// Refresh on a fixed interval until the handle is dropped
    pub fn spawn(self: &Arc<Self>, interval: Duration) -> PollerHandle {
        let poller = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // failures are logged by refresh and retried on the next tick
                let _ = poller.refresh().await;
            }
        });

        tracing::info!(
            "Polling sessions for project {} every {:?}",
            self.project_id,
            interval
        );
        PollerHandle { task }
    }
}

/// Refreshed object with the same identity as `selected`, if the new list has one
///
/// `None` means the selection stays as it is: either nothing was selected or the
/// selected session is missing from the refreshed list.
pub fn reconcile_selection(selected: Option<&Session>, refreshed: &[Session]) -> Option<Session> {
    let selected = selected?;
    refreshed
        .iter()
        .find(|session| session.session_id == selected.session_id)
        .cloned()
}

/// Owns the polling task; dropping it stops polling
#[derive(Debug)]
pub struct PollerHandle {
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn stop(self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
