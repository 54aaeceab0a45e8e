//! `ClusterClient` implementation over [`crate::MemoryCluster`] state.
//!
//! Every entry point returns immediately and completes from a task spawned on
//! the runtime handed to [`MemoryCluster::client`](crate::MemoryCluster::client).
//! In-flight tasks hold a drain guard; `close` flags the client closed, waits
//! for every guard to be released, then completes.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cluster::operations::{
    AnalyticsMeta, AnalyticsRequest, AnalyticsResponse, ClusterDescribeRequest,
    ClusterDescribeResponse, ClusterInfo, DesignDocumentNamespace, ExistsRequest, ExistsResponse,
    GetProjectedRequest, GetProjectedResponse, GetRequest, GetResponse, InsertRequest,
    MutationResponse, QueryMeta, QueryRequest, QueryResponse, RemoveRequest, ReplaceRequest,
    SearchIndexUpsertRequest, SearchIndexUpsertResponse, SearchRequest, SearchResponse,
    UpsertRequest, ViewRequest, ViewResponse, ViewScanConsistency, ViewSortOrder,
};
use cluster::{
    ClusterClient, ClusterOrigin, Completion, Credentials, DocumentId, ErrorCode,
    HttpDiagnostics, KeyValueDiagnostics, Operation, ServiceDiagnostics,
};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::memory::{Fault, Shared};
use crate::store::{project, Mutation, Store, Write};

const KV_PORT: u16 = 11210;
const MANAGEMENT_PORT: u16 = 8091;
const VIEW_PORT: u16 = 8092;
const QUERY_PORT: u16 = 8093;
const SEARCH_PORT: u16 = 8094;
const ANALYTICS_PORT: u16 = 8095;

/// Why a request stopped waiting before it was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupted {
    TimedOut,
    Canceled,
}

impl Interrupted {
    fn code(self, ambiguous: bool) -> ErrorCode {
        match self {
            Interrupted::TimedOut if ambiguous => ErrorCode::AmbiguousTimeout,
            Interrupted::TimedOut => ErrorCode::UnambiguousTimeout,
            Interrupted::Canceled => ErrorCode::RequestCanceled,
        }
    }
}

#[derive(Debug, Default)]
struct Session {
    opened: bool,
    mutation_tokens: bool,
    buckets: BTreeSet<String>,
}

type DrainGuard = mpsc::Sender<()>;

struct Inner {
    shared: Arc<Shared>,
    runtime: Handle,
    session: Mutex<Session>,
    closed: watch::Sender<bool>,
    drain: Mutex<Option<DrainGuard>>,
    drained: Mutex<Option<mpsc::Receiver<()>>>,
    next_opaque: AtomicU32,
    local_port: u16,
}

/// One client of a [`crate::MemoryCluster`].
pub struct MemoryClient {
    inner: Arc<Inner>,
}

macro_rules! reject {
    ($inner:expr, $completion:expr, $response:ty, $code:expr) => {{
        let mut response = <$response>::default();
        response.ctx.ec = Some($code);
        $inner.finish($completion, response);
    }};
}

impl MemoryClient {
    pub(crate) fn new(shared: Arc<Shared>, runtime: Handle) -> Self {
        let (closed, _) = watch::channel(false);
        let (drain, drained) = mpsc::channel(1);
        let local_port = 50_000 + (Uuid::new_v4().as_u128() % 10_000) as u16;
        Self {
            inner: Arc::new(Inner {
                shared,
                runtime,
                session: Mutex::new(Session::default()),
                closed,
                drain: Mutex::new(Some(drain)),
                drained: Mutex::new(Some(drained)),
                next_opaque: AtomicU32::new(1),
                local_port,
            }),
        }
    }

    /// Completes `operation` at once with `code`, without scheduling it.
    fn reject(&self, operation: Operation, code: ErrorCode) {
        let inner = &self.inner;
        match operation {
            Operation::Get(_, c) => reject!(inner, c, GetResponse, code),
            Operation::GetProjected(_, c) => reject!(inner, c, GetProjectedResponse, code),
            Operation::Exists(_, c) => reject!(inner, c, ExistsResponse, code),
            Operation::Upsert(_, c)
            | Operation::Insert(_, c)
            | Operation::Replace(_, c)
            | Operation::Remove(_, c) => reject!(inner, c, MutationResponse, code),
            Operation::Query(_, c) => reject!(inner, c, QueryResponse, code),
            Operation::Analytics(_, c) => reject!(inner, c, AnalyticsResponse, code),
            Operation::View(_, c) => reject!(inner, c, ViewResponse, code),
            Operation::Search(_, c) => reject!(inner, c, SearchResponse, code),
            Operation::SearchIndexUpsert(_, c) => {
                reject!(inner, c, SearchIndexUpsertResponse, code)
            }
            Operation::ClusterDescribe(_, c) => reject!(inner, c, ClusterDescribeResponse, code),
        }
    }
}

impl ClusterClient for MemoryClient {
    fn open(&self, origin: ClusterOrigin, completion: Completion<Option<ErrorCode>>) {
        self.inner.shared.submitted();
        let Some(guard) = self.inner.guard() else {
            self.inner.finish(completion, Some(ErrorCode::ClusterClosed));
            return;
        };
        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(async move {
            let outcome = inner.open(origin).await;
            inner.finish(completion, outcome);
            drop(guard);
        });
    }

    fn open_bucket(&self, name: String, completion: Completion<Option<ErrorCode>>) {
        self.inner.shared.submitted();
        let Some(guard) = self.inner.guard() else {
            self.inner.finish(completion, Some(ErrorCode::ClusterClosed));
            return;
        };
        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(async move {
            let outcome = inner.open_bucket(name).await;
            inner.finish(completion, outcome);
            drop(guard);
        });
    }

    fn close_bucket(&self, name: String, completion: Completion<Option<ErrorCode>>) {
        self.inner.shared.submitted();
        let Some(guard) = self.inner.guard() else {
            self.inner.finish(completion, Some(ErrorCode::ClusterClosed));
            return;
        };
        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(async move {
            let outcome = inner.close_bucket(&name);
            inner.finish(completion, outcome);
            drop(guard);
        });
    }

    fn close(&self, completion: Completion<()>) {
        self.inner.closed.send_replace(true);
        drop(self.inner.drain.lock().take());
        *self.inner.session.lock() = Session::default();

        let drained = self.inner.drained.lock().take();
        match drained {
            Some(mut drained) => {
                debug!("Closing in-memory client");
                self.inner.runtime.spawn(async move {
                    // `None` once every in-flight request released its guard.
                    let _ = drained.recv().await;
                    completion.complete(());
                });
            }
            None => completion.complete(()),
        }
    }

    fn execute(&self, operation: Operation) {
        self.inner.shared.submitted();
        let Some(guard) = self.inner.guard() else {
            trace!(operation = operation.name(), "Rejecting request on closed client");
            self.reject(operation, ErrorCode::ClusterClosed);
            return;
        };
        trace!(operation = operation.name(), "Scheduling request");
        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(async move {
            inner.run(operation).await;
            drop(guard);
        });
    }
}

// ---------------------------------------------------------------------------
// Request handling
// ---------------------------------------------------------------------------

impl Inner {
    fn guard(&self) -> Option<DrainGuard> {
        self.drain.lock().clone()
    }

    fn finish<T>(&self, completion: Completion<T>, value: T) {
        self.shared.completed();
        completion.complete(value);
    }

    fn local_endpoint(&self) -> String {
        format!("127.0.0.1:{}", self.local_port)
    }

    fn endpoint(&self, port: u16) -> String {
        self.shared.state.lock().endpoint(port)
    }

    /// Waits out the configured latency, or forever when `stalled`.
    async fn wait(&self, stalled: bool, timeout: Option<Duration>) -> Result<(), Interrupted> {
        let latency = self.shared.state.lock().latency;
        let mut closed = self.closed.subscribe();

        let work = async move {
            if stalled {
                std::future::pending::<()>().await;
            } else {
                tokio::time::sleep(latency).await;
            }
        };
        let deadline = async move {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            () = work => Ok(()),
            () = deadline => Err(Interrupted::TimedOut),
            _ = closed.wait_for(|closed| *closed) => Err(Interrupted::Canceled),
        }
    }

    async fn open(&self, origin: ClusterOrigin) -> Option<ErrorCode> {
        let (unreachable, authorized) = {
            let state = self.shared.state.lock();
            let authorized = match &origin.credentials {
                _ if state.users.is_empty() => true,
                Credentials::Password {
                    username, password, ..
                } => state.users.get(username) == Some(password),
                Credentials::Certificate { .. } => true,
            };
            (state.unreachable, authorized)
        };

        if unreachable {
            // Bootstrap keeps failing until its deadline.
            let outcome = self
                .wait(true, Some(origin.options.bootstrap_timeout))
                .await;
            debug!(connection_string = %origin.connection_string, "Bootstrap failed");
            return match outcome {
                Err(Interrupted::Canceled) => Some(ErrorCode::RequestCanceled),
                _ => Some(ErrorCode::ServiceNotAvailable),
            };
        }
        if let Err(interrupted) = self.wait(false, Some(origin.options.bootstrap_timeout)).await {
            return Some(interrupted.code(false));
        }
        if !authorized {
            return Some(ErrorCode::AuthenticationFailure);
        }

        let mut session = self.session.lock();
        session.opened = true;
        session.mutation_tokens = origin.options.enable_mutation_tokens;
        debug!(connection_string = %origin.connection_string, "Bootstrap complete");
        None
    }

    async fn open_bucket(&self, name: String) -> Option<ErrorCode> {
        if let Err(interrupted) = self.wait(false, None).await {
            return Some(interrupted.code(false));
        }
        let known = self.shared.state.lock().store.has_bucket(&name);
        let mut session = self.session.lock();
        if !session.opened {
            return Some(ErrorCode::ConfigurationNotAvailable);
        }
        if !known {
            return Some(ErrorCode::BucketNotFound);
        }
        session.buckets.insert(name);
        None
    }

    fn close_bucket(&self, name: &str) -> Option<ErrorCode> {
        if !self.shared.state.lock().store.has_bucket(name) {
            return Some(ErrorCode::BucketNotFound);
        }
        self.session.lock().buckets.remove(name);
        None
    }

    fn bucket_is_open(&self, name: &str) -> bool {
        self.session.lock().buckets.contains(name)
    }

    async fn run(&self, operation: Operation) {
        match operation {
            Operation::Get(request, completion) => {
                let response = self.get(request).await;
                self.finish(completion, response);
            }
            Operation::GetProjected(request, completion) => {
                let response = self.get_projected(request).await;
                self.finish(completion, response);
            }
            Operation::Exists(request, completion) => {
                let response = self.exists(request).await;
                self.finish(completion, response);
            }
            Operation::Upsert(request, completion) => {
                let response = self.upsert(request).await;
                self.finish(completion, response);
            }
            Operation::Insert(request, completion) => {
                let response = self.insert(request).await;
                self.finish(completion, response);
            }
            Operation::Replace(request, completion) => {
                let response = self.replace(request).await;
                self.finish(completion, response);
            }
            Operation::Remove(request, completion) => {
                let response = self.remove(request).await;
                self.finish(completion, response);
            }
            Operation::Query(request, completion) => {
                let response = self.query(request).await;
                self.finish(completion, response);
            }
            Operation::Analytics(request, completion) => {
                let response = self.analytics(request).await;
                self.finish(completion, response);
            }
            Operation::View(request, completion) => {
                let response = self.view(request).await;
                self.finish(completion, response);
            }
            Operation::Search(request, completion) => {
                let response = self.search(request).await;
                self.finish(completion, response);
            }
            Operation::SearchIndexUpsert(request, completion) => {
                let response = self.search_index_upsert(request).await;
                self.finish(completion, response);
            }
            Operation::ClusterDescribe(request, completion) => {
                let response = self.describe(request).await;
                self.finish(completion, response);
            }
        }
    }

    // -- key-value ----------------------------------------------------------

    /// Runs `apply` against the store once the request is due.
    async fn key_value<T>(
        &self,
        id: &DocumentId,
        timeout: Option<Duration>,
        mutation: bool,
        apply: impl FnOnce(&mut Store) -> Result<T, ErrorCode>,
    ) -> (KeyValueDiagnostics, Option<T>) {
        let mut ctx = KeyValueDiagnostics::for_document(id.clone());
        ctx.opaque = self.next_opaque.fetch_add(1, Ordering::SeqCst);
        ctx.last_dispatched_from = Some(self.local_endpoint());
        ctx.last_dispatched_to = Some(self.endpoint(KV_PORT));

        if !self.bucket_is_open(&id.bucket) {
            ctx.ec = Some(ErrorCode::BucketNotFound);
            return (ctx, None);
        }
        let stalled = self.shared.state.lock().stalls.contains(&id.key);
        if let Err(interrupted) = self.wait(stalled, timeout).await {
            ctx.ec = Some(interrupted.code(mutation));
            return (ctx, None);
        }

        let mut state = self.shared.state.lock();
        if let Some(fault) = state.faults.get(&id.key) {
            apply_fault(&mut ctx, fault);
            return (ctx, None);
        }
        match apply(&mut state.store) {
            Ok(value) => (ctx, Some(value)),
            Err(code) => {
                ctx.ec = Some(code);
                (ctx, None)
            }
        }
    }

    async fn get(&self, request: GetRequest) -> GetResponse {
        let (ctx, found) = self
            .key_value(&request.id, request.timeout, false, |store| {
                store
                    .get(&request.id)
                    .map(|doc| (doc.cas, doc.flags, doc.value.clone()))
            })
            .await;
        let mut response = GetResponse {
            ctx,
            ..GetResponse::default()
        };
        if let Some((cas, flags, value)) = found {
            response.ctx.cas = cas;
            response.cas = cas;
            response.flags = flags;
            response.value = value;
        }
        response
    }

    async fn get_projected(&self, request: GetProjectedRequest) -> GetProjectedResponse {
        let (ctx, found) = self
            .key_value(&request.id, request.timeout, false, |store| {
                let doc = store.get(&request.id)?;
                let value = if request.projections.is_empty() {
                    doc.value.clone()
                } else {
                    project(&doc.value, &request.projections)?
                };
                Ok((doc.cas, doc.flags, value, doc.expiry))
            })
            .await;
        let mut response = GetProjectedResponse {
            ctx,
            ..GetProjectedResponse::default()
        };
        if let Some((cas, flags, value, expiry)) = found {
            response.ctx.cas = cas;
            response.cas = cas;
            response.flags = flags;
            response.value = value;
            response.expiry = request.with_expiry.then_some(expiry);
        }
        response
    }

    async fn exists(&self, request: ExistsRequest) -> ExistsResponse {
        let (ctx, found) = self
            .key_value(&request.id, request.timeout, false, |store| {
                store
                    .lookup(&request.id)?
                    .cloned()
                    .ok_or(ErrorCode::DocumentNotFound)
            })
            .await;
        let mut response = ExistsResponse {
            ctx,
            ..ExistsResponse::default()
        };
        if let Some(doc) = found {
            response.ctx.cas = doc.cas;
            response.document_exists = true;
            response.deleted = doc.deleted;
            response.cas = doc.cas;
            response.flags = doc.flags;
            response.datatype = u8::from(serde_json::from_str::<Value>(&doc.value).is_ok());
            response.expiry = doc.expiry;
            response.sequence_number = doc.sequence_number;
        }
        response
    }

    async fn mutate(
        &self,
        id: &DocumentId,
        timeout: Option<Duration>,
        apply: impl FnOnce(&mut Store) -> Result<Mutation, ErrorCode>,
    ) -> MutationResponse {
        let tokens = self.session.lock().mutation_tokens;
        let (ctx, outcome) = self.key_value(id, timeout, true, apply).await;
        let mut response = MutationResponse {
            ctx,
            ..MutationResponse::default()
        };
        if let Some(mutation) = outcome {
            response.ctx.cas = mutation.cas;
            response.cas = mutation.cas;
            if tokens {
                response.token = mutation.token;
            }
        }
        response
    }

    async fn upsert(&self, request: UpsertRequest) -> MutationResponse {
        self.mutate(&request.id, request.timeout, |store| {
            store.upsert(
                &request.id,
                Write {
                    value: &request.value,
                    flags: request.flags,
                    expiry: request.expiry,
                    preserve_expiry: request.preserve_expiry,
                },
            )
        })
        .await
    }

    async fn insert(&self, request: InsertRequest) -> MutationResponse {
        self.mutate(&request.id, request.timeout, |store| {
            store.insert(
                &request.id,
                Write {
                    value: &request.value,
                    flags: request.flags,
                    expiry: request.expiry,
                    preserve_expiry: false,
                },
            )
        })
        .await
    }

    async fn replace(&self, request: ReplaceRequest) -> MutationResponse {
        self.mutate(&request.id, request.timeout, |store| {
            store.replace(
                &request.id,
                Write {
                    value: &request.value,
                    flags: request.flags,
                    expiry: request.expiry,
                    preserve_expiry: request.preserve_expiry,
                },
                request.cas,
            )
        })
        .await
    }

    async fn remove(&self, request: RemoveRequest) -> MutationResponse {
        self.mutate(&request.id, request.timeout, |store| {
            store.remove(&request.id, request.cas)
        })
        .await
    }

    // -- query services -----------------------------------------------------

    async fn query(&self, request: QueryRequest) -> QueryResponse {
        let interrupted = self.wait(false, request.timeout).await.err();
        let (scripted, endpoint) = {
            let state = self.shared.state.lock();
            (state.queries.get(&request.statement).cloned(), state.endpoint(QUERY_PORT))
        };
        let client_context_id = request
            .client_context_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut response = scripted.unwrap_or_else(|| QueryResponse {
            meta: QueryMeta {
                status: "success".to_owned(),
                ..QueryMeta::default()
            },
            ..QueryResponse::default()
        });
        response.ctx.client_context_id = client_context_id.clone();
        response.ctx.statement = request.statement.clone();
        response.ctx.parameters =
            encode_parameters(&request.positional_parameters, &request.named_parameters);
        response.ctx.last_dispatched_to = Some(endpoint.clone());
        response.ctx.last_dispatched_from = Some(self.local_endpoint());
        if let Some(interrupted) = interrupted {
            response.ctx.ec = Some(interrupted.code(!request.readonly));
        }
        response.served_by_node = endpoint;
        response.meta.client_context_id = client_context_id;
        if response.meta.request_id.is_empty() {
            response.meta.request_id = Uuid::new_v4().to_string();
        }
        response
    }

    async fn analytics(&self, request: AnalyticsRequest) -> AnalyticsResponse {
        let interrupted = self.wait(false, request.timeout).await.err();
        let (scripted, endpoint) = {
            let state = self.shared.state.lock();
            (
                state.analytics.get(&request.statement).cloned(),
                state.endpoint(ANALYTICS_PORT),
            )
        };
        let client_context_id = request
            .client_context_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut response = scripted.unwrap_or_else(|| AnalyticsResponse {
            meta: AnalyticsMeta {
                status: "success".to_owned(),
                ..AnalyticsMeta::default()
            },
            ..AnalyticsResponse::default()
        });
        response.ctx.client_context_id = client_context_id.clone();
        response.ctx.statement = request.statement.clone();
        response.ctx.parameters =
            encode_parameters(&request.positional_parameters, &request.named_parameters);
        response.ctx.last_dispatched_to = Some(endpoint);
        response.ctx.last_dispatched_from = Some(self.local_endpoint());
        if let Some(interrupted) = interrupted {
            response.ctx.ec = Some(interrupted.code(!request.readonly));
        }
        response.meta.client_context_id = client_context_id;
        if response.meta.request_id.is_empty() {
            response.meta.request_id = Uuid::new_v4().to_string();
        }
        response
    }

    async fn view(&self, request: ViewRequest) -> ViewResponse {
        let interrupted = self.wait(false, request.timeout).await.err();
        let design_document_name = match request.name_space {
            DesignDocumentNamespace::Development => format!("dev_{}", request.design_document_name),
            DesignDocumentNamespace::Production => request.design_document_name.clone(),
        };
        let (scripted, endpoint) = {
            let state = self.shared.state.lock();
            (
                state
                    .views
                    .get(&(design_document_name.clone(), request.view_name.clone()))
                    .cloned(),
                state.endpoint(VIEW_PORT),
            )
        };

        let mut response = match scripted {
            Some(response) => response,
            None => {
                let mut response = ViewResponse::default();
                response.ctx.ec = Some(ErrorCode::ViewNotFound);
                response.ctx.http_status = 404;
                response.ctx.http_body =
                    json!({ "error": "not_found", "reason": "missing" }).to_string();
                response
            }
        };
        if !self.bucket_is_open(&request.bucket_name) {
            response = ViewResponse::default();
            response.ctx.ec = Some(ErrorCode::BucketNotFound);
        }
        response.ctx.client_context_id = Uuid::new_v4().to_string();
        response.ctx.design_document_name = design_document_name;
        response.ctx.view_name = request.view_name.clone();
        response.ctx.query_string = view_query_string(&request);
        response.ctx.last_dispatched_to = Some(endpoint);
        response.ctx.last_dispatched_from = Some(self.local_endpoint());
        if let Some(interrupted) = interrupted {
            response.ctx.ec = Some(interrupted.code(false));
        }
        response
    }

    async fn search(&self, request: SearchRequest) -> SearchResponse {
        let interrupted = self.wait(false, request.timeout).await.err();
        let (scripted, index_exists, endpoint) = {
            let state = self.shared.state.lock();
            (
                state.searches.get(&request.index_name).cloned(),
                state.search_indexes.contains_key(&request.index_name),
                state.endpoint(SEARCH_PORT),
            )
        };
        let client_context_id = request
            .client_context_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut response = match scripted {
            Some(response) => response,
            None if index_exists => SearchResponse {
                status: "success".to_owned(),
                ..SearchResponse::default()
            },
            None => {
                let mut response = SearchResponse {
                    status: "fail".to_owned(),
                    error: format!("index not found: {}", request.index_name),
                    ..SearchResponse::default()
                };
                response.ctx.ec = Some(ErrorCode::IndexNotFound);
                response.ctx.http_status = 400;
                response.ctx.http_body =
                    json!({ "error": response.error, "status": "fail" }).to_string();
                response
            }
        };
        response.ctx.client_context_id = client_context_id.clone();
        response.ctx.index_name = request.index_name.clone();
        response.ctx.query = request.query.clone();
        response.ctx.parameters = search_parameters(&request);
        response.ctx.last_dispatched_to = Some(endpoint);
        response.ctx.last_dispatched_from = Some(self.local_endpoint());
        if let Some(interrupted) = interrupted {
            response.ctx.ec = Some(interrupted.code(false));
        }
        response.meta.client_context_id = client_context_id;
        response
    }

    // -- management ---------------------------------------------------------

    fn http_context(&self, method: &str, path: String, port: u16) -> HttpDiagnostics {
        HttpDiagnostics {
            client_context_id: Uuid::new_v4().to_string(),
            method: method.to_owned(),
            path,
            last_dispatched_to: Some(self.endpoint(port)),
            last_dispatched_from: Some(self.local_endpoint()),
            ..HttpDiagnostics::default()
        }
    }

    async fn search_index_upsert(
        &self,
        request: SearchIndexUpsertRequest,
    ) -> SearchIndexUpsertResponse {
        let interrupted = self.wait(false, request.timeout).await.err();
        let index = request.index;
        let mut response = SearchIndexUpsertResponse {
            ctx: self.http_context("PUT", format!("/api/index/{}", index.name), SEARCH_PORT),
            ..SearchIndexUpsertResponse::default()
        };
        if let Some(interrupted) = interrupted {
            response.ctx.ec = Some(interrupted.code(true));
            return response;
        }

        let invalid = if index.name.is_empty() {
            Some("index name is required".to_owned())
        } else if !index.params_json.is_empty()
            && serde_json::from_str::<Value>(&index.params_json).is_err()
        {
            Some(format!("params of index {} are not valid JSON", index.name))
        } else {
            None
        };

        match invalid {
            Some(error) => {
                response.ctx.ec = Some(ErrorCode::InvalidArgument);
                response.ctx.http_status = 400;
                response.ctx.http_body = json!({ "error": error, "status": "fail" }).to_string();
                response.status = "fail".to_owned();
                response.error = error;
            }
            None => {
                response.ctx.http_status = 200;
                response.ctx.http_body = json!({ "status": "ok" }).to_string();
                response.status = "ok".to_owned();
                self.shared
                    .state
                    .lock()
                    .search_indexes
                    .insert(index.name.clone(), index);
            }
        }
        response
    }

    async fn describe(&self, request: ClusterDescribeRequest) -> ClusterDescribeResponse {
        let interrupted = self.wait(false, request.timeout).await.err();
        let mut response = ClusterDescribeResponse {
            ctx: self.http_context("GET", "/pools/default".to_owned(), MANAGEMENT_PORT),
            ..ClusterDescribeResponse::default()
        };
        if let Some(interrupted) = interrupted {
            response.ctx.ec = Some(interrupted.code(false));
            return response;
        }

        let no_bucket_open = self.session.lock().buckets.is_empty();
        let state = self.shared.state.lock();
        if state.describe_requires_bucket && no_bucket_open {
            response.ctx.ec = Some(ErrorCode::ServiceNotAvailable);
            response.ctx.http_status = 404;
            return response;
        }
        response.ctx.http_status = 200;
        response.info = ClusterInfo {
            nodes: state.nodes.clone(),
        };
        response
    }
}

fn apply_fault(ctx: &mut KeyValueDiagnostics, fault: &Fault) {
    for reason in &fault.retries {
        ctx.record_retry(*reason);
    }
    ctx.ec = Some(fault.code);
    ctx.status_code = fault.status_code;
    ctx.error_map_info = fault.error_map_info.clone();
    ctx.enhanced_error_info = fault.enhanced_error_info.clone();
}

/// Positional values under `args`, named values under `$name`.
fn encode_parameters(positional: &[Value], named: &BTreeMap<String, Value>) -> Option<String> {
    if positional.is_empty() && named.is_empty() {
        return None;
    }
    let mut body = Map::new();
    if !positional.is_empty() {
        body.insert("args".to_owned(), Value::Array(positional.to_vec()));
    }
    for (name, value) in named {
        let key = if name.starts_with('$') {
            name.clone()
        } else {
            format!("${name}")
        };
        body.insert(key, value.clone());
    }
    Some(Value::Object(body).to_string())
}

fn search_parameters(request: &SearchRequest) -> Option<String> {
    let mut body = Map::new();
    if let Some(limit) = request.limit {
        body.insert("size".to_owned(), json!(limit));
    }
    if let Some(skip) = request.skip {
        body.insert("from".to_owned(), json!(skip));
    }
    if request.explain {
        body.insert("explain".to_owned(), json!(true));
    }
    if !request.facets.is_empty() {
        body.insert("facets".to_owned(), json!(request.facets));
    }
    for (key, value) in &request.raw {
        body.insert(key.clone(), value.clone());
    }
    (!body.is_empty()).then(|| Value::Object(body).to_string())
}

fn view_query_string(request: &ViewRequest) -> Vec<String> {
    let mut query = Vec::new();
    if request.debug {
        query.push("debug=true".to_owned());
    }
    if let Some(consistency) = request.consistency {
        let stale = match consistency {
            ViewScanConsistency::NotBounded => "ok",
            ViewScanConsistency::RequestPlus => "false",
            ViewScanConsistency::UpdateAfter => "update_after",
        };
        query.push(format!("stale={stale}"));
    }
    if let Some(order) = request.order {
        query.push(format!("descending={}", order == ViewSortOrder::Descending));
    }
    let flags = [
        ("reduce", request.reduce),
        ("group", request.group),
        ("inclusive_end", request.inclusive_end),
    ];
    for (name, value) in flags {
        if let Some(value) = value {
            query.push(format!("{name}={value}"));
        }
    }
    let numbers = [
        ("group_level", request.group_level),
        ("limit", request.limit),
        ("skip", request.skip),
    ];
    for (name, value) in numbers {
        if let Some(value) = value {
            query.push(format!("{name}={value}"));
        }
    }
    let strings = [
        ("key", &request.key),
        ("startkey", &request.start_key),
        ("endkey", &request.end_key),
        ("startkey_docid", &request.start_key_doc_id),
        ("endkey_docid", &request.end_key_doc_id),
    ];
    for (name, value) in strings {
        if let Some(value) = value {
            query.push(format!("{name}={value}"));
        }
    }
    if !request.keys.is_empty() {
        query.push(format!("keys=[{}]", request.keys.join(",")));
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameters_prefix_named_values() {
        let mut named = BTreeMap::new();
        named.insert("city".to_owned(), json!("Paris"));
        named.insert("$limit".to_owned(), json!(5));
        let encoded = encode_parameters(&[json!(1)], &named).unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value, json!({ "args": [1], "$city": "Paris", "$limit": 5 }));
        assert_eq!(encode_parameters(&[], &BTreeMap::new()), None);
    }

    #[test]
    fn view_query_string_lists_set_options_only() {
        let request = ViewRequest {
            order: Some(ViewSortOrder::Descending),
            limit: Some(10),
            skip: Some(2),
            start_key: Some("\"a\"".to_owned()),
            ..ViewRequest::default()
        };
        assert_eq!(
            view_query_string(&request),
            vec!["descending=true", "limit=10", "skip=2", "startkey=\"a\""]
        );
        assert!(view_query_string(&ViewRequest::default()).is_empty());
    }

    #[test]
    fn timeouts_are_ambiguous_only_for_writes() {
        assert_eq!(Interrupted::TimedOut.code(true), ErrorCode::AmbiguousTimeout);
        assert_eq!(Interrupted::TimedOut.code(false), ErrorCode::UnambiguousTimeout);
        assert_eq!(Interrupted::Canceled.code(true), ErrorCode::RequestCanceled);
    }
}
