//! Shared cluster state and the handle tests use to shape it.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cluster::operations::{
    AnalyticsResponse, NodeInfo, QueryResponse, SearchIndex, SearchResponse, ViewResponse,
};
use cluster::{
    Cas, ClusterClient, DocumentId, EnhancedErrorInfo, ErrorCode, ErrorMapInfo, RetryReason,
};
use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::client::MemoryClient;
use crate::store::{Store, Write};

/// Version reported by the default node.
pub const DEFAULT_VERSION: &str = "7.1.1-3175-enterprise";

/// Failure injected into every key-value request on one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub code: ErrorCode,
    pub retries: Vec<RetryReason>,
    pub status_code: Option<u16>,
    pub error_map_info: Option<ErrorMapInfo>,
    pub enhanced_error_info: Option<EnhancedErrorInfo>,
}

impl Fault {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            retries: Vec::new(),
            status_code: None,
            error_map_info: None,
            enhanced_error_info: None,
        }
    }

    /// One retry per reason, in order, before giving up.
    #[must_use]
    pub fn retried(mut self, reasons: impl IntoIterator<Item = RetryReason>) -> Self {
        self.retries.extend(reasons);
        self
    }

    #[must_use]
    pub fn with_status(mut self, status_code: u16, name: &str, description: &str) -> Self {
        self.status_code = Some(status_code);
        self.error_map_info = Some(ErrorMapInfo {
            name: name.to_owned(),
            description: description.to_owned(),
        });
        self
    }

    #[must_use]
    pub fn with_enhanced_info(mut self, reference: &str, context: &str) -> Self {
        self.enhanced_error_info = Some(EnhancedErrorInfo {
            reference: reference.to_owned(),
            context: context.to_owned(),
        });
        self
    }
}

#[derive(Debug, Default)]
pub(crate) struct State {
    pub nodes: Vec<NodeInfo>,
    pub users: BTreeMap<String, String>,
    pub unreachable: bool,
    pub describe_requires_bucket: bool,
    pub latency: Duration,
    pub store: Store,
    pub queries: HashMap<String, QueryResponse>,
    pub analytics: HashMap<String, AnalyticsResponse>,
    pub views: HashMap<(String, String), ViewResponse>,
    pub searches: HashMap<String, SearchResponse>,
    pub search_indexes: BTreeMap<String, SearchIndex>,
    pub faults: HashMap<String, Fault>,
    pub stalls: HashSet<String>,
}

impl State {
    /// `host:port` of the first node for `port`.
    pub fn endpoint(&self, port: u16) -> String {
        let host = self
            .nodes
            .first()
            .map_or("127.0.0.1", |node| node.hostname.as_str());
        format!("{host}:{port}")
    }
}

#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub state: Mutex<State>,
    submissions: AtomicUsize,
    completions: AtomicUsize,
}

impl Shared {
    pub fn submitted(&self) {
        self.submissions.fetch_add(1, Ordering::SeqCst);
    }

    pub fn completed(&self) {
        self.completions.fetch_add(1, Ordering::SeqCst);
    }
}

/// An in-process cluster shared by every client connected to it.
///
/// Cloning yields another handle to the same cluster.
#[derive(Debug, Clone)]
pub struct MemoryCluster {
    pub(crate) shared: Arc<Shared>,
}

impl Default for MemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCluster {
    /// One node on `127.0.0.1` running every service, no buckets, no users.
    pub fn new() -> Self {
        let cluster = Self {
            shared: Arc::new(Shared::default()),
        };
        cluster.shared.state.lock().nodes = vec![NodeInfo {
            hostname: "127.0.0.1".to_owned(),
            version: DEFAULT_VERSION.to_owned(),
            services: ["kv", "n1ql", "index", "fts", "cbas", "views"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
        }];
        cluster
    }

    /// Replaces the node list.
    #[must_use]
    pub fn with_nodes(self, nodes: Vec<NodeInfo>) -> Self {
        self.shared.state.lock().nodes = nodes;
        self
    }

    #[must_use]
    pub fn with_bucket(self, name: &str) -> Self {
        self.shared.state.lock().store.add_bucket(name);
        self
    }

    /// Requires password credentials matching one registered user.
    #[must_use]
    pub fn with_user(self, username: &str, password: &str) -> Self {
        self.shared
            .state
            .lock()
            .users
            .insert(username.to_owned(), password.to_owned());
        self
    }

    /// Bootstrap never succeeds; open fails once the bootstrap timeout elapses.
    #[must_use]
    pub fn unreachable(self) -> Self {
        self.shared.state.lock().unreachable = true;
        self
    }

    /// Describe reports `service_not_available` until a bucket is open.
    #[must_use]
    pub fn describe_requires_bucket(self) -> Self {
        self.shared.state.lock().describe_requires_bucket = true;
        self
    }

    /// Delay applied to every request before it completes.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        self.shared.state.lock().latency = latency;
        self
    }

    /// Stores a document directly, bypassing any client.
    pub fn insert_document(
        &self,
        id: &DocumentId,
        value: &str,
        flags: u32,
    ) -> Result<Cas, ErrorCode> {
        let mut state = self.shared.state.lock();
        state
            .store
            .upsert(
                id,
                Write {
                    value,
                    flags,
                    ..Write::default()
                },
            )
            .map(|mutation| mutation.cas)
    }

    /// Result returned for `statement`. Unscripted statements succeed with no rows.
    pub fn script_query(&self, statement: &str, response: QueryResponse) {
        self.shared
            .state
            .lock()
            .queries
            .insert(statement.to_owned(), response);
    }

    /// Result returned for an analytics `statement`.
    pub fn script_analytics(&self, statement: &str, response: AnalyticsResponse) {
        self.shared
            .state
            .lock()
            .analytics
            .insert(statement.to_owned(), response);
    }

    /// Result returned for a view. Unscripted views report `view_not_found`.
    pub fn script_view(&self, design_document: &str, view: &str, response: ViewResponse) {
        self.shared
            .state
            .lock()
            .views
            .insert((design_document.to_owned(), view.to_owned()), response);
    }

    /// Result returned for queries against `index`.
    pub fn script_search(&self, index: &str, response: SearchResponse) {
        self.shared
            .state
            .lock()
            .searches
            .insert(index.to_owned(), response);
    }

    /// Every key-value request on `key` fails with `fault`.
    pub fn inject_fault(&self, key: &str, fault: Fault) {
        self.shared.state.lock().faults.insert(key.to_owned(), fault);
    }

    /// Requests on `key` never finish on their own: only their timeout, or a
    /// client close, ends them.
    pub fn stall(&self, key: &str) {
        self.shared.state.lock().stalls.insert(key.to_owned());
    }

    pub fn search_index(&self, name: &str) -> Option<SearchIndex> {
        self.shared.state.lock().search_indexes.get(name).cloned()
    }

    /// Requests handed to any client of this cluster.
    pub fn submissions(&self) -> usize {
        self.shared.submissions.load(Ordering::SeqCst)
    }

    /// Completions fired by any client of this cluster.
    pub fn completions(&self) -> usize {
        self.shared.completions.load(Ordering::SeqCst)
    }

    /// New client scheduled on `runtime`.
    pub fn client(&self, runtime: Handle) -> MemoryClient {
        MemoryClient::new(Arc::clone(&self.shared), runtime)
    }

    /// Connector for `Connection::start` and `Connection::create`.
    pub fn connector(&self) -> impl FnOnce(Handle) -> Arc<dyn ClusterClient> {
        let cluster = self.clone();
        move |runtime| Arc::new(cluster.client(runtime)) as Arc<dyn ClusterClient>
    }
}
