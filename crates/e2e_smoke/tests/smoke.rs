use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::post;
use chmask_contracts::RunMode;
use chmask_runner::config::RunnerConfig;
use chmask_runner::runner::{self, JobError};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[derive(Clone, Default)]
struct MockClickHouse {
    bodies: Arc<Mutex<Vec<String>>>,
    authorized: Arc<Mutex<Vec<bool>>>,
}

async fn query(
    State(mock): State<MockClickHouse>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    // base64("masker:s3cret")
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some("Basic bWFza2VyOnMzY3JldA==");
    mock.authorized
        .lock()
        .expect("lock must not be poisoned")
        .push(authorized);
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            "Code: 516. DB::Exception: masker: Authentication failed".to_string(),
        );
    }

    let fail = body.contains("ALTER TABLE analytics_db.chat_exchanges_local")
        && body.contains("first >= toDateTime('2024-01-01 01:00:00')");
    mock.bodies
        .lock()
        .expect("lock must not be poisoned")
        .push(body);

    if fail {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Code: 341. DB::Exception: Mutation failed".to_string(),
        )
    } else {
        (StatusCode::OK, String::new())
    }
}

async fn spawn_mock_clickhouse(
    mock: MockClickHouse,
) -> (SocketAddr, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let app = Router::new().route("/", post(query)).with_state(mock);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind should succeed");
    let addr = listener.local_addr().expect("local_addr should succeed");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    (addr, shutdown_tx, handle)
}

fn base_env(output_dir: &std::path::Path) -> HashMap<String, String> {
    HashMap::from([
        ("CUSTOMER_ID".to_string(), "7".to_string()),
        (
            "START_DATETIME".to_string(),
            "2024-01-01 00:00:00".to_string(),
        ),
        ("END_DATETIME".to_string(), "2024-01-01 01:30:00".to_string()),
        ("INTERVAL_MINUTES".to_string(), "60".to_string()),
        ("MODE".to_string(), "GENERATE".to_string()),
        ("CLICKHOUSE_DATABASE".to_string(), "analytics_db".to_string()),
        (
            "MASK_OUTPUT_DIR".to_string(),
            output_dir.to_string_lossy().to_string(),
        ),
    ])
}

#[tokio::test]
async fn generate_run_writes_full_script_for_all_tables() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let config = RunnerConfig::from_kv(&base_env(dir.path())).expect("config should parse");
    let registry = config.registry().expect("registry should build");

    let outcome = runner::run(&config, registry)
        .await
        .expect("generate run should succeed");

    let path = dir.path().join("queries_7_all.sql");
    assert_eq!(
        outcome.artifact.as_ref().map(|a| a.path.clone()),
        Some(path.clone())
    );
    assert_eq!(outcome.mode, RunMode::Generate);

    let script = std::fs::read_to_string(&path).expect("artifact should exist");
    let statements = script.split("\n\n").collect::<Vec<_>>();
    assert_eq!(statements.len(), 7 * 2);
    assert!(statements.iter().all(|s| s.contains("customer_id = 7")));
    assert!(statements.iter().all(|s| !s.contains("engine_id")));

    let chat_events = statements[0];
    assert!(chat_events.starts_with(
        "ALTER TABLE analytics_db.chat_events_local ON CLUSTER analytics\nUPDATE\n    ip_address = '***',"
    ));
    assert!(chat_events.contains("date >= toDateTime('2024-01-01 00:00:00')"));
    assert!(chat_events.contains("date < toDateTime('2024-01-01 01:00:00')"));
    assert!(statements[13].contains("traits = ['***']"));
}

#[tokio::test]
async fn generate_run_with_engine_scope_and_empty_range() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let mut env = base_env(dir.path());
    env.insert("ENGINE_ID".to_string(), "12".to_string());
    env.insert("END_DATETIME".to_string(), "2024-01-01 00:00:00".to_string());
    let config = RunnerConfig::from_kv(&env).expect("config should parse");
    let registry = config.registry().expect("registry should build");

    let outcome = runner::run(&config, registry)
        .await
        .expect("generate run should succeed");

    assert_eq!(outcome.windows, 0);
    assert_eq!(outcome.statements, 0);
    let path = dir.path().join("queries_7_12.sql");
    assert_eq!(
        std::fs::read_to_string(&path).expect("artifact should exist"),
        ""
    );
}

fn execute_env(output_dir: &std::path::Path, addr: SocketAddr, password: &str) -> HashMap<String, String> {
    let mut env = base_env(output_dir);
    env.insert("MODE".to_string(), "EXECUTE".to_string());
    env.insert("ENGINE_ID".to_string(), "3".to_string());
    env.insert("CLICKHOUSE_HOST".to_string(), addr.ip().to_string());
    env.insert("CLICKHOUSE_PORT".to_string(), addr.port().to_string());
    env.insert("CLICKHOUSE_TIMEOUT".to_string(), "5".to_string());
    env.insert("CLICKHOUSE_USER".to_string(), "masker".to_string());
    env.insert("CLICKHOUSE_PASSWORD".to_string(), password.to_string());
    env.insert(
        "MASK_TABLES".to_string(),
        "chat_events,chat_exchanges".to_string(),
    );
    env
}

#[tokio::test]
async fn execute_run_dispatches_every_statement_despite_failure() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let mock = MockClickHouse::default();
    let (addr, shutdown, task) = spawn_mock_clickhouse(mock.clone()).await;

    let config = RunnerConfig::from_kv(&execute_env(dir.path(), addr, "s3cret"))
        .expect("config should parse");
    let registry = config.registry().expect("registry should build");
    let outcome = runner::run(&config, registry)
        .await
        .expect("execute run should complete");

    shutdown.send(()).ok();
    let _ = task.await;

    let bodies = mock.bodies.lock().expect("lock must not be poisoned");
    assert_eq!(bodies[0], "SELECT 1");
    let statements = &bodies[1..];
    assert_eq!(statements.len(), 4);
    assert!(statements[0].contains("chat_events_local"));
    assert!(statements[1].contains("chat_events_local"));
    assert!(statements[2].contains("chat_exchanges_local"));
    assert!(statements[3].contains("chat_exchanges_local"));
    assert!(statements.iter().all(|s| s.contains("AND engine_id = 3;")));

    assert_eq!(outcome.statements, 4);
    assert_eq!(outcome.succeeded, 3);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].table_name, "chat_exchanges");
    assert!(outcome.artifact.is_none());
    assert!(!dir.path().join("queries_7_3.sql").exists());
}

#[tokio::test]
async fn execute_run_with_bad_credentials_aborts_before_mutation() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let mock = MockClickHouse::default();
    let (addr, shutdown, task) = spawn_mock_clickhouse(mock.clone()).await;

    let config = RunnerConfig::from_kv(&execute_env(dir.path(), addr, "wrong"))
        .expect("config should parse");
    let registry = config.registry().expect("registry should build");
    let err = runner::run(&config, registry).await.unwrap_err();

    shutdown.send(()).ok();
    let _ = task.await;

    assert!(matches!(err, JobError::Connection(_)));
    assert!(err.to_string().contains("Authentication failed"));
    assert_eq!(
        mock.authorized
            .lock()
            .expect("lock must not be poisoned")
            .len(),
        1
    );
    assert!(
        mock.bodies
            .lock()
            .expect("lock must not be poisoned")
            .is_empty()
    );
}
