//! Connection lifecycle against an in-memory cluster: open, buckets, version
//! probe, teardown, and blocking-call rules.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cluster::operations::GetRequest;
use cluster::{ClusterClient, DocumentId, ErrorCode};
use connection::{Connection, RequestBridge};
use memory_cluster::{MemoryCluster, DEFAULT_VERSION};
use serde_json::{json, Value};
use tokio::sync::oneshot;

const CONNECTION_STRING: &str = "couchbase://127.0.0.1";

fn connect_options() -> Value {
    json!({
        "authenticator": {
            "type": "password",
            "username": "Administrator",
            "password": "password"
        }
    })
}

fn travel_cluster() -> MemoryCluster {
    MemoryCluster::new()
        .with_bucket("travel")
        .with_user("Administrator", "password")
}

#[test]
fn connection_opens_and_closes_cleanly() {
    let cluster = travel_cluster();
    let connection = Connection::create(CONNECTION_STRING, &connect_options(), cluster.connector())
        .expect("connection should open");
    connection.bucket_open("travel").expect("bucket should open");
    connection.bucket_close("travel").expect("bucket should close");

    connection.close().expect("close should succeed");
    assert_eq!(cluster.submissions(), cluster.completions());
}

#[test]
fn dropping_a_connection_tears_it_down() {
    let cluster = travel_cluster();
    {
        let connection =
            Connection::create(CONNECTION_STRING, &connect_options(), cluster.connector())
                .expect("connection should open");
        connection.bucket_open("travel").expect("bucket should open");
    }
    assert_eq!(cluster.submissions(), cluster.completions());
}

#[test]
fn unreachable_cluster_fails_within_bootstrap_timeout() {
    let cluster = MemoryCluster::new().unreachable();
    let mut opts = connect_options();
    opts["bootstrapTimeout"] = json!(200);

    let started = Instant::now();
    let err = Connection::create(CONNECTION_STRING, &opts, cluster.connector())
        .expect_err("open should fail");
    let elapsed = started.elapsed();

    assert!(err.code.is_unavailable(), "unexpected code {:?}", err.code);
    assert!(err.message.starts_with("unable to open connection: 4, "), "{}", err.message);
    assert!(elapsed >= Duration::from_millis(200), "returned after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "returned after {elapsed:?}");
}

#[test]
fn wrong_password_is_an_authentication_failure() {
    let cluster = travel_cluster();
    let mut opts = connect_options();
    opts["authenticator"]["password"] = json!("hunter2");

    let err = Connection::create(CONNECTION_STRING, &opts, cluster.connector())
        .expect_err("open should fail");
    assert_eq!(err.code, ErrorCode::AuthenticationFailure);
}

#[test]
fn invalid_inputs_fail_before_anything_is_submitted() {
    let cluster = travel_cluster();

    let err = Connection::create("gopher://127.0.0.1", &connect_options(), cluster.connector())
        .expect_err("scheme should be rejected");
    assert_eq!(err.code, ErrorCode::ParsingFailure);

    let err = Connection::create(CONNECTION_STRING, &json!({}), cluster.connector())
        .expect_err("authenticator is required");
    assert_eq!(err.code, ErrorCode::InvalidArgument);
    assert_eq!(err.message, "missing authenticator");

    let mut opts = connect_options();
    opts["kvTimeout"] = json!(1);
    opts["keyValueTimeout"] = json!("fast");
    let err = Connection::create(CONNECTION_STRING, &opts, cluster.connector())
        .expect_err("mistyped option should be rejected");
    assert_eq!(err.code, ErrorCode::InvalidArgument);

    assert_eq!(cluster.submissions(), 0);
}

#[test]
fn unknown_bucket_is_reported_by_name() {
    let cluster = travel_cluster();
    let connection = Connection::create(CONNECTION_STRING, &connect_options(), cluster.connector())
        .expect("connection should open");

    let err = connection.bucket_open("beer-sample").expect_err("bucket is unknown");
    assert_eq!(err.code, ErrorCode::BucketNotFound);
    assert!(
        err.message.starts_with(r#"unable to open bucket "beer-sample": 10, "#),
        "{}",
        err.message
    );
}

#[test]
fn cluster_version_reports_first_node() {
    let cluster = travel_cluster();
    let connection = Connection::create(CONNECTION_STRING, &connect_options(), cluster.connector())
        .expect("connection should open");
    assert_eq!(connection.cluster_version(""), DEFAULT_VERSION);
}

#[test]
fn cluster_version_opens_bucket_when_required() {
    let cluster = travel_cluster().describe_requires_bucket();
    let connection = Connection::create(CONNECTION_STRING, &connect_options(), cluster.connector())
        .expect("connection should open");

    assert_eq!(connection.cluster_version(""), "");
    assert_eq!(connection.cluster_version("travel"), DEFAULT_VERSION);
    // The bucket stays open, so the plain probe now succeeds too.
    assert_eq!(connection.cluster_version(""), DEFAULT_VERSION);
}

#[test]
fn cluster_version_is_empty_when_bucket_cannot_open() {
    let cluster = travel_cluster().describe_requires_bucket();
    let connection = Connection::create(CONNECTION_STRING, &connect_options(), cluster.connector())
        .expect("connection should open");
    assert_eq!(connection.cluster_version("beer-sample"), "");
}

#[test]
fn blocking_inside_a_runtime_is_refused() {
    let cluster = travel_cluster();
    let connection = Connection::create(CONNECTION_STRING, &connect_options(), cluster.connector())
        .expect("connection should open");
    let before = cluster.submissions();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let outcome = runtime.block_on(async {
        connection.document_exists(DocumentId::in_default_collection("travel", "k"), None)
    });

    let err = outcome.expect_err("blocking inside a runtime must fail");
    assert_eq!(err.code, ErrorCode::BlockingCallOnWorker);
    assert_eq!(cluster.submissions(), before);
}

#[test]
fn connections_are_independent() {
    let cluster = travel_cluster();
    let first = Connection::create(CONNECTION_STRING, &connect_options(), cluster.connector())
        .expect("first connection");
    let second = Connection::create(CONNECTION_STRING, &connect_options(), cluster.connector())
        .expect("second connection");
    assert_ne!(first.id(), second.id());

    first.close().expect("close first");
    assert_eq!(second.cluster_version(""), DEFAULT_VERSION);
}

#[test]
fn concurrent_callers_share_one_connection() {
    const THREADS: usize = 16;
    const CALLS: usize = 50;

    let cluster = travel_cluster();
    let connection = Connection::create(CONNECTION_STRING, &connect_options(), cluster.connector())
        .expect("connection should open");
    connection.bucket_open("travel").expect("bucket should open");

    thread::scope(|scope| {
        for worker in 0..THREADS {
            let connection = &connection;
            scope.spawn(move || {
                for call in 0..CALLS {
                    let key = format!("worker-{worker}-{call}");
                    let id = DocumentId::in_default_collection("travel", key.as_str());
                    connection
                        .document_upsert(id.clone(), r#"{"n":1}"#, 0, None)
                        .expect("upsert succeeds");
                    let found = connection.document_exists(id, None).expect("exists succeeds");
                    assert!(found.exists(), "{key} should exist");
                }
            });
        }
    });

    connection.close().expect("close should succeed");
    assert!(cluster.submissions() >= THREADS * CALLS * 2);
    assert_eq!(cluster.submissions(), cluster.completions());
}

#[test]
fn close_releases_callers_blocked_on_outstanding_requests() {
    let cluster = travel_cluster();
    cluster.stall("slow");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime");
    let handle = runtime.handle().clone();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let worker = thread::spawn(move || {
        runtime.block_on(async move {
            let _ = stop_rx.await;
        });
    });

    let client: Arc<dyn ClusterClient> = Arc::new(cluster.client(handle));
    let bridge = RequestBridge::new(worker.thread().id());
    let origin = options::cluster_origin(CONNECTION_STRING, &connect_options()).expect("origin");
    let opened = bridge
        .execute(|done| client.open(origin, done))
        .expect("open completes");
    assert_eq!(opened, None);
    let bucket = bridge
        .execute(|done| client.open_bucket("travel".to_owned(), done))
        .expect("bucket open completes");
    assert_eq!(bucket, None);

    let waiter = {
        let client = Arc::clone(&client);
        thread::spawn(move || {
            let request = GetRequest {
                id: DocumentId::in_default_collection("travel", "slow"),
                timeout: None,
            };
            bridge.dispatch(client.as_ref(), request)
        })
    };
    while cluster.submissions() < 3 {
        thread::sleep(Duration::from_millis(5));
    }

    bridge
        .execute(|done| client.close(done))
        .expect("close completes");
    let response = waiter
        .join()
        .expect("waiter thread")
        .expect("stalled request completes");
    assert_eq!(response.ctx.ec, Some(ErrorCode::RequestCanceled));

    let late = bridge
        .dispatch(
            client.as_ref(),
            GetRequest {
                id: DocumentId::in_default_collection("travel", "fast"),
                timeout: None,
            },
        )
        .expect("late request completes");
    assert_eq!(late.ctx.ec, Some(ErrorCode::ClusterClosed));

    let _ = stop_tx.send(());
    worker.join().expect("worker exits");
}
