//! In-process mock of the remote orchestration service

#![allow(dead_code)]

use al_orchestrator::{
    config::RemoteConfig,
    project::{Identity, Participant, ProjectData, Role},
    runtime::{ClientContext, CommandClient, ModeSwitch},
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, AtomicU16, AtomicU64, AtomicUsize, Ordering},
    Arc, Mutex,
};

#[derive(Debug)]
pub struct MockState {
    pub submit_status: AtomicU16,
    pub submit_hits: AtomicUsize,
    pub status_hits: AtomicUsize,
    pub fail_sessions: AtomicBool,
    pub commands: Mutex<Vec<Value>>,
    pub sessions: Mutex<Vec<Value>>,
    pub stats_wallet: Mutex<Option<String>>,
    /// Delay before the command and status handlers answer
    pub stall_ms: AtomicU64,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            submit_status: AtomicU16::new(200),
            submit_hits: AtomicUsize::new(0),
            status_hits: AtomicUsize::new(0),
            fail_sessions: AtomicBool::new(false),
            commands: Mutex::new(Vec::new()),
            sessions: Mutex::new(Vec::new()),
            stats_wallet: Mutex::new(None),
            stall_ms: AtomicU64::new(0),
        }
    }
}

impl MockState {
    pub fn set_sessions(&self, sessions: Vec<Value>) {
        *self.sessions.lock().unwrap() = sessions;
    }

    pub fn command_count(&self) -> usize {
        self.commands.lock().unwrap().len()
    }

    async fn stall(&self) {
        let ms = self.stall_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
        }
    }
}

pub struct MockRemote {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockRemote {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/api", get(|| async { "ok" }))
            .route("/workflow/submit", post(submit))
            .route("/workflow/status/{id}", get(workflow_status))
            .route("/al-engine/command", post(command))
            .route("/al-engine/sessions/{project_id}", get(sessions))
            .route("/al-engine/sessions/{project_id}/{session_id}", get(session))
            .route("/al-engine/session-stats/{project_id}", get(session_stats))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn remote_config(&self) -> RemoteConfig {
        remote_config(format!("http://{}", self.addr))
    }

    pub fn client(&self) -> CommandClient {
        CommandClient::new(self.remote_config()).unwrap()
    }

    /// Client whose requests give up after one second
    pub fn impatient_client(&self) -> CommandClient {
        let mut config = self.remote_config();
        config.request_timeout_secs = 1;
        CommandClient::new(config).unwrap()
    }
}

pub fn remote_config(base_url: String) -> RemoteConfig {
    RemoteConfig {
        base_url,
        request_timeout_secs: 5,
        health_timeout_secs: 1,
        health_path: "/api".into(),
        simulated_latency_ms: 10,
    }
}

/// Base URL of a port nothing listens on
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Registry snapshot under which `wallet` resolves to `role`
pub fn project_for(wallet: &str, role: Role) -> ProjectData {
    let participants = match role {
        Role::Contributor => vec![Participant {
            address: wallet.to_string(),
            role: Some("contributor".into()),
        }],
        _ => Vec::new(),
    };
    ProjectData {
        project_id: "0xproject".into(),
        creator: match role {
            Role::Coordinator => wallet.to_string(),
            _ => "0xcreator".into(),
        },
        participants,
        ..ProjectData::default()
    }
}

pub fn context(wallet: &str, role: Role) -> ClientContext {
    ClientContext::new(Identity::new(wallet), project_for(wallet, role), ModeSwitch::new())
        .with_contract("0xcontract")
}

pub fn session_json(id: &str, status: &str, round: u32) -> Value {
    json!({
        "session_id": id,
        "status": status,
        "current_round": round,
        "total_rounds": 10,
        "created_at": "2025-01-01T10:00:00",
        "accuracy_metrics": {}
    })
}

async fn submit(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let hit = state.submit_hits.fetch_add(1, Ordering::SeqCst) + 1;
    let status = state.submit_status.load(Ordering::SeqCst);
    if status != 200 {
        let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (code, Json(json!({ "error": "engine unavailable" }))).into_response();
    }

    Json(json!({
        "workflow_id": format!("wf-{}", hit),
        "project_id": body["project_id"],
        "status": "SUBMITTED"
    }))
    .into_response()
}

async fn workflow_status(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    state.status_hits.fetch_add(1, Ordering::SeqCst);
    state.stall().await;
    if id == "missing" {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": "Workflow not found" }))).into_response();
    }
    Json(json!({
        "workflow_id": id,
        "status": "RUNNING",
        "created_at": "2025-01-01T10:00:00"
    }))
    .into_response()
}

async fn command(State(state): State<Arc<MockState>>, Json(envelope): Json<Value>) -> Response {
    state.commands.lock().unwrap().push(envelope.clone());
    state.stall().await;

    let session_id = envelope["parameters"]["session_id"].as_str().unwrap_or_default();
    if session_id == "unknown" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Session unknown not found for project p1" })),
        )
            .into_response();
    }

    Json(json!({
        "command_id": "cmd-1",
        "status": "accepted",
        "message": format!("{} accepted", envelope["command_type"].as_str().unwrap_or_default()),
        "timestamp": "2025-01-01T10:00:00"
    }))
    .into_response()
}

async fn sessions(State(state): State<Arc<MockState>>, Path(_project_id): Path<String>) -> Response {
    state.stall().await;
    if state.fail_sessions.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    let sessions = state.sessions.lock().unwrap().clone();
    Json(json!({ "sessions": sessions })).into_response()
}

async fn session(
    State(state): State<Arc<MockState>>,
    Path((_project_id, session_id)): Path<(String, String)>,
) -> Response {
    let sessions = state.sessions.lock().unwrap().clone();
    match sessions.into_iter().find(|s| s["session_id"] == json!(session_id)) {
        Some(found) => Json(found).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "Session not found" }))).into_response(),
    }
}

async fn session_stats(
    State(state): State<Arc<MockState>>,
    Path(project_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let wallet = headers
        .get("x-user-wallet")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    *state.stats_wallet.lock().unwrap() = wallet;

    if project_id != "p1" {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": "no stats" }))).into_response();
    }
    Json(json!({
        "project_id": project_id,
        "total_contributors": 2,
        "total_samples": 20,
        "labeled_samples": 5,
        "consensus_samples": 3,
        "progress_percentage": 25.0,
        "contributors": []
    }))
    .into_response()
}
