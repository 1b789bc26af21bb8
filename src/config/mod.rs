/// Configuration management for the orchestration core
///
/// Remote service endpoints, local record storage, and polling cadence. Every value can be
/// overridden through an `AL_ORCHESTRATOR_*` environment variable.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote orchestration service
    pub remote: RemoteConfig,
    /// Local workflow record storage
    pub store: StoreConfig,
    /// Session and status polling
    pub polling: PollingConfig,
}

/// Remote orchestration service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the orchestration server (e.g., "http://localhost:5004")
    pub base_url: String,
    /// Timeout for workflow submission, status, command, and session requests
    pub request_timeout_secs: u64,
    /// Timeout for the health check
    pub health_timeout_secs: u64,
    /// Path requested by the health check
    pub health_path: String,
    /// Delay applied to fabricated responses in simulated mode
    pub simulated_latency_ms: u64,
}

/// Workflow record storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database holding workflow records (default: "sqlite://data/workflows.db")
    pub database_url: String,
    /// Drafts untouched for longer than this are purged when the store opens
    pub max_draft_age_days: u32,
    /// Quiet period before an in-progress edit is auto-saved
    pub autosave_delay_ms: u64,
}

/// Polling cadence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Session list refresh interval
    pub session_refresh_interval_ms: u64,
    /// Delay between workflow status polls
    pub status_poll_interval_ms: u64,
    /// Status polls before giving up with a timeout
    pub status_poll_max_attempts: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: env_or("AL_ORCHESTRATOR_BASE_URL", "http://localhost:5004".to_string()),
            request_timeout_secs: env_or("AL_ORCHESTRATOR_REQUEST_TIMEOUT_SECS", 30),
            health_timeout_secs: env_or("AL_ORCHESTRATOR_HEALTH_TIMEOUT_SECS", 5),
            health_path: env_or("AL_ORCHESTRATOR_HEALTH_PATH", "/api".to_string()),
            simulated_latency_ms: env_or("AL_ORCHESTRATOR_SIMULATED_LATENCY_MS", 1000),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: env_or(
                "AL_ORCHESTRATOR_DATABASE_URL",
                "sqlite://data/workflows.db".to_string(),
            ),
            max_draft_age_days: env_or("AL_ORCHESTRATOR_MAX_DRAFT_AGE_DAYS", 7),
            autosave_delay_ms: env_or("AL_ORCHESTRATOR_AUTOSAVE_DELAY_MS", 2000),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            session_refresh_interval_ms: env_or("AL_ORCHESTRATOR_SESSION_REFRESH_MS", 5000),
            status_poll_interval_ms: env_or("AL_ORCHESTRATOR_STATUS_POLL_MS", 2000),
            status_poll_max_attempts: env_or("AL_ORCHESTRATOR_STATUS_POLL_ATTEMPTS", 30),
        }
    }
}

impl RemoteConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }

    /// Base URL with any trailing slash removed, ready for path joining
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl StoreConfig {
    pub fn max_draft_age(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.max_draft_age_days))
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    /// Local filesystem directory holding the database file, if any
    pub fn data_dir(&self) -> Option<std::path::PathBuf> {
        let path = self
            .database_url
            .strip_prefix("sqlite://")
            .or_else(|| self.database_url.strip_prefix("sqlite:"))?;
        if path.is_empty() || path.starts_with(":memory:") {
            return None;
        }
        let path = path.split('?').next().unwrap_or(path);
        std::path::Path::new(path)
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(|parent| parent.to_path_buf())
    }
}

impl PollingConfig {
    pub fn session_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.session_refresh_interval_ms)
    }

    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_millis(self.status_poll_interval_ms)
    }
}

/// Environment override, falling back to `default` when unset or unparsable
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
