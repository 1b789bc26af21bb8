/// Orchestrator setup and initialization
///
/// Wires together the components: record storage, config store, command client, and the
/// shared mode switch.

use crate::{
    config::Config,
    error::Result,
    project::{Identity, ProjectData},
    runtime::{
        client::CommandClient,
        context::ClientContext,
        mode::ModeSwitch,
        poller::{PollerHandle, SessionPoller},
        session::WorkflowStatusReport,
    },
    workflow::{autosave::AutoSaver, storage::WorkflowStorage, store::ConfigStore},
};
use std::sync::Arc;

/// Assembled orchestration core
#[derive(Debug, Clone)]
pub struct Orchestrator {
    pub config: Config,
    pub store: Arc<ConfigStore>,
    pub client: CommandClient,
    pub mode: ModeSwitch,
}

impl Orchestrator {
    /// Context for a wallet acting on a registry project, sharing this orchestrator's mode switch
    pub fn context(&self, identity: Identity, project: ProjectData) -> ClientContext {
        ClientContext::new(identity, project, self.mode.clone())
    }

    /// Debounced auto-saver for one project using the configured quiet period
    pub fn auto_saver(&self, project_id: &str, identity: Identity) -> AutoSaver {
        AutoSaver::spawn(
            Arc::clone(&self.store),
            project_id,
            identity,
            self.config.store.autosave_delay(),
        )
    }

    /// Start background session refreshes at the configured interval
    pub fn watch_sessions(&self, ctx: ClientContext, project_id: &str) -> (Arc<SessionPoller>, PollerHandle) {
        let poller = Arc::new(SessionPoller::new(self.client.clone(), ctx, project_id));
        let handle = poller.spawn(self.config.polling.session_refresh_interval());
        (poller, handle)
    }

    /// Poll a submitted workflow until it finishes, with the configured cadence and attempt limit
    pub async fn await_workflow(&self, ctx: &ClientContext, workflow_id: &str) -> Result<WorkflowStatusReport> {
        self.client
            .poll_until_complete(
                ctx,
                workflow_id,
                self.config.polling.status_poll_interval(),
                self.config.polling.status_poll_max_attempts,
            )
            .await
    }
}

/// Initialize the tracing subscriber; call once per process
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();
}

/// Create the orchestrator with all components initialized
///
/// Opening the store runs the stale draft sweep.
pub async fn create_orchestrator(config: Config) -> Result<Orchestrator> {
    if let Some(data_dir) = config.store.data_dir() {
        tracing::info!("📁 Ensuring data directory exists: {}", data_dir.display());
        if let Err(e) = std::fs::create_dir_all(&data_dir) {
            tracing::warn!("Failed to create data directory {}: {}", data_dir.display(), e);
        }
    }

    tracing::info!("📋 Initializing workflow record storage");
    let storage = WorkflowStorage::connect(&config.store.database_url).await?;
    let store = Arc::new(ConfigStore::open(storage, &config.store).await?);

    tracing::info!("🔗 Initializing command client for {}", config.remote.base_url);
    let client = CommandClient::new(config.remote.clone())?;

    tracing::info!("✅ Orchestrator initialized successfully");
    Ok(Orchestrator {
        config,
        store,
        client,
        mode: ModeSwitch::new(),
    })
}
