//! End-to-end coverage driven through `osint_client` against a real
//! in-process server bound to ephemeral ports: bind to `127.0.0.1:0`, read
//! the assigned port, drop the listener, then hand the freed port to the
//! real server rather than threading a pre-bound listener through its API.

use std::io::Write;
use std::time::Duration;

use chrono::Utc;
use osint_client::{CollectorClient, DispatcherClient};
use osint_dispatcher_server::{build_stores, AppState, DispatcherConfig};
use osint_source_catalog::SourceCatalog;
use tokio_stream::StreamExt;

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local addr").port()
}

fn write_catalog(json: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().expect("create temp catalog file");
    f.write_all(json.as_bytes()).expect("write temp catalog file");
    f
}

/// Starts a dispatcher on two freshly-freed ports with a short heartbeat
/// timeout and sweeper/poll cadence so failover-driven tests don't need to
/// wait on the defaults (30s / 5s / 5s). Returns the client-facing and
/// collector-facing base URLs plus the catalog tempfile, which must stay
/// alive for as long as the server is expected to see its sources.
async fn spawn_dispatcher(
    catalog_json: &str,
    heartbeat_timeout_secs: u64,
    sweeper_interval_secs: u64,
) -> (String, String, tempfile::NamedTempFile) {
    let catalog_file = write_catalog(catalog_json);

    let config = DispatcherConfig {
        dispatcher_address: "127.0.0.1".to_string(),
        client_port: free_port(),
        collector_port: free_port(),
        sources_path: catalog_file.path().to_string_lossy().to_string(),
        heartbeat_timeout_secs,
        sweeper_interval_secs,
        stream_poll_interval_secs: 1,
        persistent: false,
        ..DispatcherConfig::default()
    };

    let client_base = format!("http://{}", config.client_addr());
    let collector_base = format!("http://{}", config.collector_addr());

    let (tasks, users) = build_stores(&config).await.expect("in-memory stores never fail to build");
    let catalog = SourceCatalog::load(&config.sources_path);
    let state = std::sync::Arc::new(AppState::new(config, tasks, users, catalog));

    tokio::spawn(async move {
        let _ = osint_dispatcher_server::run(state).await;
    });
    // Give the accept loops a moment to bind before the test starts dialing.
    tokio::time::sleep(Duration::from_millis(100)).await;

    (client_base, collector_base, catalog_file)
}

const ONE_SOURCE_CATALOG: &str = r#"[
    {"id":"src-1","name":"Wire One","url":"http://example.com/one","categories":["disaster"],"locations":["international"]}
]"#;

/// S1: a registered, logged-in client starts a task that matches a live
/// collector's source; the collector sees the assignment on its task
/// stream, submits a result, and the client sees it on its result stream.
#[tokio::test]
async fn happy_path_dispatches_and_delivers_a_result() {
    let (client_base, collector_base, _catalog) = spawn_dispatcher(ONE_SOURCE_CATALOG, 30, 5).await;
    let client = DispatcherClient::new(&client_base);
    let collector = CollectorClient::new(&collector_base);

    client.register("alice", "hunter2").await.unwrap();
    let login = client.login("alice", "hunter2").await.unwrap();
    assert!(login.success);

    collector.register_collector("worker-a", "secret").await.unwrap();
    let worker_login = collector.login_collector("worker-a", "secret").await.unwrap();
    assert!(worker_login.success);
    collector.heartbeat(&worker_login.token).await.unwrap();

    let start = Utc::now();
    let end = start + chrono::Duration::minutes(10);
    let outcome = client
        .start_task(&login.token, "flood warning", "disaster", "international", start, end)
        .await
        .unwrap();
    assert!(outcome.success, "expected a match: {}", outcome.message);
    assert!(!outcome.task_id.is_empty());

    let mut task_stream = collector.stream_tasks(&worker_login.token).await.unwrap();
    let assignment = tokio::time::timeout(Duration::from_secs(3), task_stream.next())
        .await
        .expect("stream_tasks should yield promptly")
        .expect("stream not closed")
        .expect("assignment decodes");
    assert_eq!(assignment.task_id, outcome.task_id);
    assert_eq!(assignment.sources, vec!["src-1".to_string()]);
    drop(task_stream);

    let mut result_stream = client.stream_results(&login.token, &outcome.task_id).await.unwrap();
    let submit_ack = collector
        .submit_task_result(
            &worker_login.token,
            &outcome.task_id,
            serde_json::json!({"hits": 3}),
            None,
        )
        .await
        .unwrap();
    assert!(submit_ack.success);

    let envelope = tokio::time::timeout(Duration::from_secs(3), result_stream.next())
        .await
        .expect("stream_results should yield promptly")
        .expect("stream not closed")
        .expect("envelope decodes");
    assert_eq!(envelope.task_id, outcome.task_id);
    assert_eq!(envelope.result, serde_json::json!({"hits": 3}));
}

/// S2: a task whose categories/locations match nothing in the catalog
/// creates no task row and reports failure with an empty task id.
#[tokio::test]
async fn start_task_with_no_matching_sources_fails_cleanly() {
    let (client_base, _collector_base, _catalog) = spawn_dispatcher(ONE_SOURCE_CATALOG, 30, 5).await;
    let client = DispatcherClient::new(&client_base);

    client.register("bob", "swordfish").await.unwrap();
    let login = client.login("bob", "swordfish").await.unwrap();

    let start = Utc::now();
    let end = start + chrono::Duration::minutes(10);
    let outcome = client
        .start_task(&login.token, "nothing relevant", "weather", "local", start, end)
        .await
        .unwrap();

    assert!(!outcome.success);
    assert!(outcome.task_id.is_empty());
}

/// S3: sources match, but no collector is registered at all, so the
/// Assignment Engine can place zero of them and the task still fails.
#[tokio::test]
async fn start_task_with_no_live_collectors_fails() {
    let (client_base, _collector_base, _catalog) = spawn_dispatcher(ONE_SOURCE_CATALOG, 30, 5).await;
    let client = DispatcherClient::new(&client_base);

    client.register("carol", "letmein").await.unwrap();
    let login = client.login("carol", "letmein").await.unwrap();

    let start = Utc::now();
    let end = start + chrono::Duration::minutes(10);
    let outcome = client
        .start_task(&login.token, "flood warning", "disaster", "international", start, end)
        .await
        .unwrap();

    assert!(!outcome.success);
    assert!(outcome.message.contains("placed 0 of"));
    assert!(outcome.task_id.is_empty());
}

/// S4: a worker that stops heartbeating gets failed over onto a live worker
/// once its last heartbeat is older than twice the heartbeat timeout, and
/// the reassigned task shows up on the surviving worker's task stream.
#[tokio::test]
async fn a_dead_collector_is_failed_over_to_a_live_one() {
    // heartbeat_timeout=1s (failover threshold 2s), sweeper runs every 1s,
    // so the whole test completes in a few real seconds.
    let (client_base, collector_base, _catalog) = spawn_dispatcher(ONE_SOURCE_CATALOG, 1, 1).await;
    let client = DispatcherClient::new(&client_base);
    let collector = CollectorClient::new(&collector_base);

    client.register("dana", "passw0rd").await.unwrap();
    let login = client.login("dana", "passw0rd").await.unwrap();

    // "worker-a" logs in first, so it wins the load tie and gets the task.
    collector.register_collector("worker-a", "secret").await.unwrap();
    let worker_a = collector.login_collector("worker-a", "secret").await.unwrap();
    collector.heartbeat(&worker_a.token).await.unwrap();

    collector.register_collector("worker-b", "secret").await.unwrap();
    let worker_b = collector.login_collector("worker-b", "secret").await.unwrap();
    collector.heartbeat(&worker_b.token).await.unwrap();

    let start = Utc::now();
    let end = start + chrono::Duration::minutes(10);
    let outcome = client
        .start_task(&login.token, "flood warning", "disaster", "international", start, end)
        .await
        .unwrap();
    assert!(outcome.success);

    // Confirm worker-a (not worker-b) actually got it before letting it die.
    let mut a_stream = collector.stream_tasks(&worker_a.token).await.unwrap();
    let first = tokio::time::timeout(Duration::from_secs(3), a_stream.next())
        .await
        .expect("worker-a should see the assignment")
        .expect("stream not closed")
        .expect("assignment decodes");
    assert_eq!(first.task_id, outcome.task_id);
    drop(a_stream);

    // Keep worker-b alive while worker-a is starved of heartbeats.
    let keepalive_token = worker_b.token.clone();
    let keepalive_collector = CollectorClient::new(&collector_base);
    let keepalive = tokio::spawn(async move {
        for _ in 0..20 {
            let _ = keepalive_collector.heartbeat(&keepalive_token).await;
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    });

    let mut b_stream = collector.stream_tasks(&worker_b.token).await.unwrap();
    let reassigned = tokio::time::timeout(Duration::from_secs(6), b_stream.next())
        .await
        .expect("worker-b should eventually see the failed-over assignment")
        .expect("stream not closed")
        .expect("assignment decodes");
    assert_eq!(reassigned.task_id, outcome.task_id);

    keepalive.abort();
}

/// Worker metrics are readable over a plain GET, separate from the RPC
/// surface, for operator observability (not a named spec RPC).
#[tokio::test]
async fn metrics_endpoint_reports_worker_counters() {
    let (_client_base, collector_base, _catalog) = spawn_dispatcher(ONE_SOURCE_CATALOG, 30, 5).await;
    let collector = CollectorClient::new(&collector_base);

    collector.register_collector("worker-m", "secret").await.unwrap();
    let login = collector.login_collector("worker-m", "secret").await.unwrap();
    collector.heartbeat(&login.token).await.unwrap();

    let body: serde_json::Value = reqwest::get(format!("{collector_base}/metrics"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let entries = body.as_array().expect("metrics is a JSON array");
    let mine = entries
        .iter()
        .find(|m| m.get("name").and_then(serde_json::Value::as_str) == Some("worker-m"))
        .expect("worker-m present in metrics");
    assert_eq!(mine.get("heartbeat_count").and_then(serde_json::Value::as_u64), Some(1));
}

/// S6: bad credentials and a stale/unknown token are rejected rather than
/// silently treated as the request's owner.
#[tokio::test]
async fn bad_credentials_and_tokens_are_rejected() {
    let (client_base, collector_base, _catalog) = spawn_dispatcher(ONE_SOURCE_CATALOG, 30, 5).await;
    let client = DispatcherClient::new(&client_base);
    let collector = CollectorClient::new(&collector_base);

    client.register("erin", "correct-horse").await.unwrap();
    let bad_login = client.login("erin", "wrong-password").await.unwrap();
    assert!(!bad_login.success);
    assert!(bad_login.token.is_empty());

    let start = Utc::now();
    let end = start + chrono::Duration::minutes(10);
    let outcome = client
        .start_task("not-a-real-token", "flood warning", "disaster", "international", start, end)
        .await
        .unwrap();
    assert!(!outcome.success);
    assert!(outcome.task_id.is_empty());

    collector.register_collector("worker-x", "secret").await.unwrap();
    let bad_worker_login = collector.login_collector("worker-x", "wrong-secret").await.unwrap();
    assert!(!bad_worker_login.success);
    assert!(bad_worker_login.token.is_empty());

    let heartbeat_ack = collector.heartbeat("not-a-real-token").await.unwrap();
    assert!(!heartbeat_ack.success);
}
