/// al-orchestrator: client-side orchestration core for collaborative active learning
///
/// Entry point that loads configuration from the environment, opens the workflow record store
/// (sweeping stale drafts), and checks that the remote orchestration service is reachable.

use al_orchestrator::{config::Config, create_orchestrator, init_tracing};

/// Application entry point
///
/// Reports the stored records and whether the remote service is reachable. An unreachable
/// service is not fatal: submissions fall back to simulated mode on first use.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (defaults to localhost:5004 and data/workflows.db)
    let config = Config::default();
    init_tracing();

    tracing::info!("Starting al-orchestrator...");
    let orchestrator = create_orchestrator(config).await?;

    let summaries = orchestrator.store.summaries().await?;
    tracing::info!("{} workflow records in store", summaries.len());
    for summary in &summaries {
        tracing::info!(
            "  {} v{} {} (creator {})",
            summary.project_id,
            summary.version,
            summary.status,
            summary.creator
        );
    }

    if orchestrator.client.health_check().await {
        tracing::info!("Remote orchestration service reachable at {}", orchestrator.config.remote.base_url);
    } else {
        tracing::warn!(
            "Remote orchestration service unreachable at {}, submissions will be simulated",
            orchestrator.config.remote.base_url
        );
    }

    Ok(())
}
