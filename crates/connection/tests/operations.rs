//! Document, query, view and search operations through a connection.

use cluster::operations::{AnalyticsResponse, QueryMeta, QueryResponse, ViewResponse, ViewRow};
use cluster::{DocumentId, ErrorCode, ErrorContext, RetryReason};
use connection::{Connection, GetResult};
use memory_cluster::{Fault, MemoryCluster};
use serde_json::{json, Value};

const CONNECTION_STRING: &str = "couchbase://127.0.0.1";

fn connect() -> (MemoryCluster, Connection) {
    let cluster = MemoryCluster::new().with_bucket("travel");
    let options = json!({
        "authenticator": { "type": "password", "username": "Administrator", "password": "password" }
    });
    let connection = Connection::create(CONNECTION_STRING, &options, cluster.connector())
        .expect("connection should open");
    connection.bucket_open("travel").expect("bucket should open");
    (cluster, connection)
}

fn doc(key: &str) -> DocumentId {
    DocumentId::in_default_collection("travel", key)
}

fn hex(cas: cluster::Cas) -> Value {
    json!(format!("{:x}", cas.as_u64()))
}

// ---------------------------------------------------------------------------
// Key-value
// ---------------------------------------------------------------------------

#[test]
fn upsert_then_get_returns_the_document() {
    let (_cluster, connection) = connect();
    let stored = connection
        .document_upsert(doc("hotel_1"), r#"{"name":"Inn"}"#, 0x0200_0006, None)
        .expect("upsert");
    assert!(!stored.cas.is_zero());
    assert!(stored.token.is_valid());
    assert_eq!(stored.token.bucket_name, "travel");

    let fetched = connection.document_get(doc("hotel_1"), None).expect("get");
    assert!(matches!(fetched, GetResult::Document(_)));
    assert_eq!(fetched.value(), r#"{"name":"Inn"}"#);
    assert_eq!(fetched.flags(), 0x0200_0006);
    assert_eq!(fetched.cas(), stored.cas);
    assert_eq!(fetched.expiry(), None);
}

#[test]
fn projected_get_trims_the_document() {
    let (_cluster, connection) = connect();
    connection
        .document_upsert(
            doc("hotel_2"),
            r#"{"name":"Inn","geo":{"lat":1.5,"lon":2.5}}"#,
            0,
            Some(&json!({ "expiry": 3600 })),
        )
        .expect("upsert");

    let fetched = connection
        .document_get(
            doc("hotel_2"),
            Some(&json!({ "withExpiry": true, "projections": ["geo.lat"] })),
        )
        .expect("projected get");
    assert!(matches!(fetched, GetResult::Projected(_)));
    assert_eq!(fetched.expiry(), Some(3600));
    let value: Value = serde_json::from_str(fetched.value()).expect("json");
    assert_eq!(value, json!({ "geo": { "lat": 1.5 } }));
}

#[test]
fn missing_document_is_a_failed_get_but_a_negative_exists() {
    let (_cluster, connection) = connect();

    let err = connection.document_get(doc("nope"), None).expect_err("get fails");
    assert_eq!(err.code, ErrorCode::DocumentNotFound);
    assert_eq!(
        err.message,
        format!(
            r#"unable to execute KV operation "document_get": {}, {}"#,
            ErrorCode::DocumentNotFound.value(),
            ErrorCode::DocumentNotFound
        )
    );
    match err.context {
        Some(ErrorContext::KeyValue(ctx)) => {
            assert_eq!(ctx.bucket, "travel");
            assert_eq!(ctx.id, "nope");
        }
        other => panic!("unexpected context {other:?}"),
    }

    let exists = connection.document_exists(doc("nope"), None).expect("exists");
    assert!(!exists.exists());
    assert!(exists.cas.is_zero());
}

#[test]
fn removed_document_no_longer_exists() {
    let (_cluster, connection) = connect();
    connection
        .document_upsert(doc("airline_10"), r#"{"name":"40-Mile Air"}"#, 0, None)
        .expect("upsert");
    let present = connection.document_exists(doc("airline_10"), None).expect("exists");
    assert!(present.exists());
    assert_eq!(present.datatype, 1);

    connection.document_remove(doc("airline_10"), None).expect("remove");
    let removed = connection.document_exists(doc("airline_10"), None).expect("exists");
    assert!(!removed.exists());
    assert!(removed.deleted);
}

#[test]
fn insert_and_replace_respect_document_state() {
    let (_cluster, connection) = connect();
    let inserted = connection
        .document_insert(doc("route_1"), "{}", 0, None)
        .expect("insert");

    let err = connection
        .document_insert(doc("route_1"), "{}", 0, None)
        .expect_err("second insert fails");
    assert_eq!(err.code, ErrorCode::DocumentExists);
    assert!(err.message.contains(r#""document_insert""#), "{}", err.message);

    let stale = json!({ "cas": hex(cluster::Cas::new(inserted.cas.as_u64() + 1)) });
    let err = connection
        .document_replace(doc("route_1"), r#"{"stops":0}"#, 0, Some(&stale))
        .expect_err("stale cas");
    assert_eq!(err.code, ErrorCode::CasMismatch);

    let current = json!({ "cas": hex(inserted.cas) });
    let replaced = connection
        .document_replace(doc("route_1"), r#"{"stops":0}"#, 0, Some(&current))
        .expect("replace");
    assert!(replaced.cas > inserted.cas);
}

#[test]
fn mutation_tokens_can_be_disabled() {
    let cluster = MemoryCluster::new().with_bucket("travel");
    let options = json!({
        "enableMutationTokens": false,
        "authenticator": { "type": "password", "username": "u", "password": "p" }
    });
    let connection = Connection::create(CONNECTION_STRING, &options, cluster.connector())
        .expect("connection should open");
    connection.bucket_open("travel").expect("bucket should open");

    let stored = connection
        .document_upsert(doc("k"), "{}", 0, None)
        .expect("upsert");
    assert!(!stored.token.is_valid());
}

#[test]
fn operations_on_an_unopened_bucket_fail() {
    let (_cluster, connection) = connect();
    let err = connection
        .document_get(DocumentId::in_default_collection("inventory", "k"), None)
        .expect_err("bucket not open");
    assert_eq!(err.code, ErrorCode::BucketNotFound);
}

#[test]
fn malformed_options_are_rejected_before_submission() {
    let (cluster, connection) = connect();
    let before = cluster.submissions();

    let err = connection
        .document_get(doc("k"), Some(&json!({ "timeoutMilliseconds": "soon" })))
        .expect_err("mistyped timeout");
    assert_eq!(err.code, ErrorCode::InvalidArgument);
    assert!(err.context.is_none());

    let err = connection
        .query("SELECT 1", Some(&json!({ "namedParameters": [1, 2] })))
        .expect_err("mistyped parameters");
    assert_eq!(err.code, ErrorCode::InvalidArgument);

    assert_eq!(cluster.submissions(), before);
}

#[test]
fn injected_fault_carries_retry_history() {
    let (cluster, connection) = connect();
    cluster.inject_fault(
        "locked",
        Fault::new(ErrorCode::DocumentLocked)
            .retried([RetryReason::KvLocked, RetryReason::KvLocked])
            .with_status(0x09, "LOCKED", "Requested resource is locked")
            .with_enhanced_info("ref-1", "locked by another actor"),
    );

    let err = connection.document_get(doc("locked"), None).expect_err("fault");
    assert_eq!(err.code, ErrorCode::DocumentLocked);
    match err.context {
        Some(ErrorContext::KeyValue(ctx)) => {
            assert_eq!(ctx.retry_attempts, 2);
            assert!(ctx.retry_reasons.contains("kv_locked"));
            assert_eq!(ctx.status_code, Some(0x09));
            assert_eq!(ctx.error_map_name.as_deref(), Some("LOCKED"));
            assert_eq!(ctx.enhanced_error_context.as_deref(), Some("locked by another actor"));
            assert!(ctx.last_dispatched_to.is_some());
        }
        other => panic!("unexpected context {other:?}"),
    }
}

#[test]
fn stalled_requests_time_out() {
    let (cluster, connection) = connect();
    cluster.stall("slow");
    let options = json!({ "timeoutMilliseconds": 100 });

    let err = connection
        .document_get(doc("slow"), Some(&options))
        .expect_err("read times out");
    assert_eq!(err.code, ErrorCode::UnambiguousTimeout);

    let err = connection
        .document_upsert(doc("slow"), "{}", 0, Some(&options))
        .expect_err("write times out");
    assert_eq!(err.code, ErrorCode::AmbiguousTimeout);
}

// ---------------------------------------------------------------------------
// Query services
// ---------------------------------------------------------------------------

#[test]
fn scripted_query_rows_come_back() {
    let (cluster, connection) = connect();
    cluster.script_query(
        "SELECT name FROM travel",
        QueryResponse {
            rows: vec![r#"{"name":"Inn"}"#.to_owned()],
            meta: QueryMeta {
                status: "success".to_owned(),
                ..QueryMeta::default()
            },
            ..QueryResponse::default()
        },
    );

    let response = connection
        .query(
            "SELECT name FROM travel",
            Some(&json!({ "clientContextId": "ctx-1", "readonly": true })),
        )
        .expect("query");
    assert_eq!(response.rows, vec![r#"{"name":"Inn"}"#.to_owned()]);
    assert_eq!(response.meta.client_context_id, "ctx-1");
    assert!(!response.meta.request_id.is_empty());
}

#[test]
fn failed_query_reports_statement_and_parameters() {
    let (cluster, connection) = connect();
    let mut failing = QueryResponse::default();
    failing.ctx.ec = Some(ErrorCode::PlanningFailure);
    failing.ctx.first_error_code = 4000;
    failing.ctx.first_error_message = "No index available".to_owned();
    cluster.script_query("SELECT * FROM travel WHERE city = $city", failing);

    let err = connection
        .query(
            "SELECT * FROM travel WHERE city = $city",
            Some(&json!({ "namedParameters": { "city": "Paris" } })),
        )
        .expect_err("planning fails");
    assert_eq!(err.code, ErrorCode::PlanningFailure);
    assert!(err.message.starts_with("unable to query: "), "{}", err.message);
    match err.context {
        Some(ErrorContext::Query(ctx)) => {
            assert_eq!(ctx.statement, "SELECT * FROM travel WHERE city = $city");
            assert_eq!(ctx.first_error_code, 4000);
            let parameters: Value =
                serde_json::from_str(ctx.parameters.as_deref().expect("parameters")).expect("json");
            assert_eq!(parameters, json!({ "$city": "Paris" }));
        }
        other => panic!("unexpected context {other:?}"),
    }
}

#[test]
fn failed_analytics_query_uses_query_message() {
    let (cluster, connection) = connect();
    let mut failing = AnalyticsResponse::default();
    failing.ctx.ec = Some(ErrorCode::CompilationFailure);
    cluster.script_analytics("SELECT VALUE 1 FROM nowhere", failing);

    let err = connection
        .analytics_query("SELECT VALUE 1 FROM nowhere", None)
        .expect_err("compilation fails");
    assert_eq!(err.code, ErrorCode::CompilationFailure);
    assert!(err.message.starts_with("unable to query: "), "{}", err.message);
    assert!(matches!(err.context, Some(ErrorContext::Analytics(_))));
}

#[test]
fn view_queries_resolve_namespace() {
    let (cluster, connection) = connect();
    cluster.script_view(
        "dev_routes",
        "by_distance",
        ViewResponse {
            rows: vec![ViewRow {
                id: Some("route_1".to_owned()),
                key: "120".to_owned(),
                value: "null".to_owned(),
            }],
            ..ViewResponse::default()
        },
    );

    let response = connection
        .view_query("travel", "routes", "by_distance", 1, Some(&json!({ "limit": 5 })))
        .expect("development view");
    assert_eq!(response.rows.len(), 1);

    let err = connection
        .view_query("travel", "routes", "by_distance", 2, None)
        .expect_err("production view is missing");
    assert_eq!(err.code, ErrorCode::ViewNotFound);
    assert!(err.message.starts_with("unable to view query: "), "{}", err.message);
    match err.context {
        Some(ErrorContext::View(ctx)) => {
            assert_eq!(ctx.design_document_name, "routes");
            assert_eq!(ctx.http_status, 404);
        }
        other => panic!("unexpected context {other:?}"),
    }
}

#[test]
fn search_needs_an_index() {
    let (cluster, connection) = connect();
    let query = r#"{"match":"Paris","field":"city"}"#;

    let err = connection
        .search_query("hotels", query, None)
        .expect_err("no index yet");
    assert_eq!(err.code, ErrorCode::IndexNotFound);
    assert!(err.message.starts_with("unable to search query: "), "{}", err.message);
    assert!(matches!(err.context, Some(ErrorContext::Search(_))));

    let upserted = connection
        .search_index_upsert(
            &json!({
                "name": "hotels",
                "type": "fulltext-index",
                "sourceName": "travel",
                "sourceType": "couchbase",
                "params": "{}"
            }),
            None,
        )
        .expect("index upsert");
    assert_eq!(upserted.status, "ok");
    let index = cluster.search_index("hotels").expect("index stored");
    assert_eq!(index.source_name, "travel");

    let response = connection
        .search_query("hotels", query, Some(&json!({ "limit": 10 })))
        .expect("search");
    assert_eq!(response.status, "success");
}

#[test]
fn search_index_without_name_is_rejected_by_the_service() {
    let (_cluster, connection) = connect();
    let err = connection
        .search_index_upsert(&json!({ "type": "fulltext-index" }), None)
        .expect_err("name required");
    assert_eq!(err.code, ErrorCode::InvalidArgument);
    assert!(
        err.message.starts_with("unable to upsert search index: "),
        "{}",
        err.message
    );
    assert!(matches!(err.context, Some(ErrorContext::Http(_))));
}
