mod common;

use al_orchestrator::{
    project::Role,
    runtime::{
        client::SIMULATED_ID_PREFIX,
        commands::{ContinueQuerying, LabeledSample, StartQuerying, SubmitLabels, TerminateProject},
        session::WorkflowSubmission,
        CommandClient, Mode, WorkflowRunStatus,
    },
    workflow::{template::build_template, AlConfig},
    OrchestratorError,
};
use common::{closed_port_url, context, remote_config, session_json, MockRemote};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn submission() -> WorkflowSubmission {
    let workflow = build_template("p1", "Title", &AlConfig::default());
    WorkflowSubmission {
        project_id: "p1".into(),
        inputs: workflow.default_inputs(),
        cwl_workflow: workflow,
        metadata: json!({}),
        user_wallet: "0xalice".into(),
        user_role: "coordinator".into(),
        contract_address: Some("0xcontract".into()),
    }
}

#[tokio::test]
async fn live_submission_returns_remote_identifier() {
    let remote = MockRemote::start().await;
    let client = remote.client();
    let ctx = context("0xalice", Role::Coordinator);

    let submitted = client.submit_workflow(&ctx, &submission()).await.unwrap();

    assert_eq!(submitted.workflow_id, "wf-1");
    assert_eq!(submitted.status, WorkflowRunStatus::Submitted);
    assert!(!submitted.simulated);
    assert_eq!(ctx.current_mode(), Mode::Live);
}

#[tokio::test]
async fn server_error_switches_to_simulated_mode_for_good() {
    let remote = MockRemote::start().await;
    remote.state.submit_status.store(503, Ordering::SeqCst);
    let client = remote.client();
    let ctx = context("0xalice", Role::Coordinator);

    let first = client.submit_workflow(&ctx, &submission()).await.unwrap();
    assert!(first.simulated);
    assert!(first.workflow_id.starts_with(SIMULATED_ID_PREFIX));
    assert_eq!(first.status, WorkflowRunStatus::Submitted);
    assert_eq!(ctx.current_mode(), Mode::Simulated);

    // the service recovers, but the switch is sticky
    remote.state.submit_status.store(200, Ordering::SeqCst);
    let second = client.submit_workflow(&ctx, &submission()).await.unwrap();
    assert!(second.simulated);
    assert_ne!(second.workflow_id, first.workflow_id);
    assert_eq!(remote.state.submit_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unreachable_service_also_falls_back() {
    let client = CommandClient::new(remote_config(closed_port_url().await)).unwrap();
    let ctx = context("0xalice", Role::Coordinator);

    let submitted = client.submit_workflow(&ctx, &submission()).await.unwrap();

    assert!(submitted.simulated);
    assert_eq!(ctx.current_mode(), Mode::Simulated);
}

#[tokio::test]
async fn client_errors_on_submission_are_not_a_fallback() {
    let remote = MockRemote::start().await;
    remote.state.submit_status.store(400, Ordering::SeqCst);
    let ctx = context("0xalice", Role::Coordinator);

    let err = remote.client().submit_workflow(&ctx, &submission()).await.unwrap_err();

    assert!(matches!(err, OrchestratorError::CommandRejected { status: 400, .. }));
    assert_eq!(ctx.current_mode(), Mode::Live);
}

#[tokio::test]
async fn polling_times_out_after_exactly_max_attempts() {
    let remote = MockRemote::start().await;
    let ctx = context("0xalice", Role::Coordinator);

    let err = remote
        .client()
        .poll_until_complete(&ctx, "wf-1", Duration::from_millis(10), 3)
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::PollingTimeout { attempts: 3, .. }));
    assert_eq!(remote.state.status_hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn slow_command_fails_with_a_timeout_and_stays_live() {
    let remote = MockRemote::start().await;
    remote.state.stall_ms.store(2_000, Ordering::SeqCst);
    let ctx = context("0xalice", Role::Coordinator);

    let err = remote
        .impatient_client()
        .terminate_project(&ctx, "p1", "wf-1", TerminateProject::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "TransportError");
    assert!(err.is_timeout());
    assert!(!matches!(err, OrchestratorError::CommandRejected { .. }));
    assert_eq!(ctx.current_mode(), Mode::Live);
}

#[tokio::test]
async fn slow_status_polls_count_as_attempts() {
    let remote = MockRemote::start().await;
    remote.state.stall_ms.store(2_000, Ordering::SeqCst);
    let ctx = context("0xalice", Role::Coordinator);
    let client = remote.impatient_client();

    let err = client.workflow_status(&ctx, "wf-1").await.unwrap_err();
    assert!(err.is_timeout());

    let err = client
        .poll_until_complete(&ctx, "wf-1", Duration::from_millis(10), 2)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::PollingTimeout { attempts: 2, .. }));
    assert_eq!(remote.state.status_hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn unreachable_service_fails_commands_without_switching_mode() {
    let client = CommandClient::new(remote_config(closed_port_url().await)).unwrap();
    let ctx = context("0xalice", Role::Coordinator);

    let err = client
        .terminate_project(&ctx, "p1", "wf-1", TerminateProject::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "TransportError");
    assert!(!err.is_timeout());
    assert_eq!(ctx.current_mode(), Mode::Live);
}

#[tokio::test]
async fn simulated_identifiers_complete_without_the_network() {
    let client = CommandClient::new(remote_config(closed_port_url().await)).unwrap();
    let ctx = context("0xalice", Role::Coordinator);
    let submitted = client.submit_workflow(&ctx, &submission()).await.unwrap();

    let report = client
        .poll_until_complete(&ctx, &submitted.workflow_id, Duration::from_millis(10), 3)
        .await
        .unwrap();

    assert_eq!(report.status, WorkflowRunStatus::Completed);
}

#[tokio::test]
async fn unknown_workflow_is_not_found() {
    let remote = MockRemote::start().await;
    let ctx = context("0xalice", Role::Coordinator);

    let err = remote.client().workflow_status(&ctx, "missing").await.unwrap_err();
    assert_eq!(err.kind(), "NotFound");
}

#[tokio::test]
async fn commands_are_posted_as_envelopes() {
    let remote = MockRemote::start().await;
    let ctx = context("0xalice", Role::Coordinator);

    let ack = remote
        .client()
        .start_querying(
            &ctx,
            "p1",
            "wf-1",
            StartQuerying {
                query_count: 5,
                strategy_override: None,
                max_rounds: Some(3),
            },
        )
        .await
        .unwrap();
    assert_eq!(ack.status, "accepted");

    let commands = remote.state.commands.lock().unwrap().clone();
    assert_eq!(commands.len(), 1);
    let envelope = &commands[0];
    assert_eq!(envelope["command_type"], json!("start_querying"));
    assert_eq!(envelope["project_id"], json!("p1"));
    assert_eq!(envelope["workflow_id"], json!("wf-1"));
    assert_eq!(envelope["parameters"], json!({ "query_count": 5, "max_rounds": 3 }));
    assert_eq!(envelope["user_wallet"], json!("0xalice"));
    assert_eq!(envelope["user_role"], json!("coordinator"));
    assert_eq!(envelope["contract_address"], json!("0xcontract"));
}

#[tokio::test]
async fn rejected_commands_carry_the_server_message() {
    let remote = MockRemote::start().await;
    let ctx = context("0xalice", Role::Coordinator);

    let err = remote
        .client()
        .continue_querying(
            &ctx,
            "p1",
            "wf-1",
            ContinueQuerying {
                session_id: "unknown".into(),
                query_count: None,
            },
        )
        .await
        .unwrap_err();

    match err {
        OrchestratorError::CommandRejected { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Session unknown not found for project p1");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn role_gates_run_before_anything_is_sent() {
    let remote = MockRemote::start().await;
    let client = remote.client();

    let observer = context("0xeve", Role::Observer);
    let err = client
        .terminate_project(&observer, "p1", "wf-1", TerminateProject::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "Forbidden");

    let contributor = context("0xbob", Role::Contributor);
    assert!(client
        .terminate_project(&contributor, "p1", "wf-1", TerminateProject::default())
        .await
        .is_err());
    assert!(client.submit_workflow(&contributor, &submission()).await.is_err());
    assert_eq!(remote.state.command_count(), 0);
    assert_eq!(remote.state.submit_hits.load(Ordering::SeqCst), 0);

    let labels = SubmitLabels {
        session_id: "s1".into(),
        labeled_samples: vec![LabeledSample {
            sample_id: "sample_r1_0".into(),
            label: json!("positive"),
        }],
    };
    client.submit_labels(&contributor, "p1", "wf-1", labels).await.unwrap();
    let commands = remote.state.commands.lock().unwrap().clone();
    assert_eq!(commands[0]["user_role"], json!("contributor"));
}

#[tokio::test]
async fn invalid_payloads_are_never_sent() {
    let remote = MockRemote::start().await;
    let ctx = context("0xbob", Role::Contributor);

    let err = remote
        .client()
        .submit_labels(
            &ctx,
            "p1",
            "wf-1",
            SubmitLabels {
                session_id: "s1".into(),
                labeled_samples: vec![],
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "InvalidCommand");
    assert_eq!(remote.state.command_count(), 0);
}

#[tokio::test]
async fn sessions_detail_and_stats() {
    let remote = MockRemote::start().await;
    remote.state.set_sessions(vec![
        session_json("s1", "active", 1),
        session_json("s2", "completed", 10),
    ]);
    let client = remote.client();
    let ctx = context("0xbob", Role::Contributor);

    let sessions = client.sessions(&ctx, "p1").await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert!(sessions[1].is_completed());

    let detail = client.session(&ctx, "p1", "s1").await.unwrap();
    assert_eq!(detail.current_round, 1);
    assert_eq!(client.session(&ctx, "p1", "nope").await.unwrap_err().kind(), "NotFound");

    let stats = client.session_stats(&ctx, "p1").await.unwrap();
    assert_eq!(stats.labeled_samples, 5);
    assert_eq!(remote.state.stats_wallet.lock().unwrap().as_deref(), Some("0xbob"));

    let empty = client.session_stats(&ctx, "p9").await.unwrap();
    assert_eq!(empty.project_id, "p9");
    assert_eq!(empty.total_samples, 0);
}

#[tokio::test]
async fn health_check_never_fails() {
    let remote = MockRemote::start().await;
    assert!(remote.client().health_check().await);

    let down = CommandClient::new(remote_config(closed_port_url().await)).unwrap();
    assert!(!down.health_check().await);
}
