/// HTTP transport to the remote orchestration service
///
/// A single reqwest client with shared defaults; every call names its own timeout. Send
/// failures (including timeouts) surface as `TransportError`, any HTTP status is handed back
/// to the caller for interpretation.

use crate::config::RemoteConfig;
use crate::error::{OrchestratorError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

fn user_agent() -> String {
    format!("al-orchestrator/{}", env!("CARGO_PKG_VERSION"))
}

/// Status and raw body of a completed request
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub endpoint: String,
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| OrchestratorError::Decode {
            endpoint: self.endpoint.clone(),
            message: e.to_string(),
        })
    }

    /// Human-readable reason from an error body: its `error` or `message` field, else the body
    pub fn server_message(&self) -> String {
        serde_json::from_str::<serde_json::Value>(&self.body)
            .ok()
            .and_then(|value| {
                ["error", "message"].iter().find_map(|field| {
                    value.get(*field).and_then(|v| v.as_str()).map(str::to_string)
                })
            })
            .unwrap_or_else(|| self.body.trim().to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    remote: RemoteConfig,
}

impl Transport {
    pub fn new(remote: RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent())
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .build()
            .map_err(|source| OrchestratorError::Transport {
                endpoint: remote.base_url.clone(),
                source,
            })?;

        Ok(Self { client, remote })
    }

    pub fn remote(&self) -> &RemoteConfig {
        &self.remote
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<TransportResponse> {
        let endpoint = self.remote.endpoint(path);
        tracing::debug!("POST {}", endpoint);
        let request = self.client.post(&endpoint).json(body).timeout(timeout);
        self.send(endpoint, request).await
    }

    pub async fn get(
        &self,
        path: &str,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<TransportResponse> {
        let endpoint = self.remote.endpoint(path);
        tracing::debug!("GET {}", endpoint);
        let mut request = self.client.get(&endpoint).timeout(timeout);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        self.send(endpoint, request).await
    }

    async fn send(&self, endpoint: String, request: reqwest::RequestBuilder) -> Result<TransportResponse> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(source) => return Err(OrchestratorError::Transport { endpoint, source }),
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(source) => return Err(OrchestratorError::Transport { endpoint, source }),
        };

        tracing::debug!("{} answered {}", endpoint, status);
        Ok(TransportResponse { endpoint, status, body })
    }
}
