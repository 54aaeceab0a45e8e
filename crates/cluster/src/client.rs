//! The cluster client port.
//!
//! A [`ClusterClient`] is an asynchronous engine: every entry point takes a
//! [`Completion`] and returns immediately. The client invokes the completion
//! exactly once, from its own execution context, when the request finishes.
//! Dropping a completion without invoking it is how a client signals that the
//! request was abandoned (for example because the client was closed).
//!
//! Request types are tied to their response types through [`ClusterRequest`],
//! and packed into an [`Operation`] for submission so the trait stays object
//! safe (`Arc<dyn ClusterClient>`).

use std::fmt;

use crate::config::ClusterOrigin;
use crate::context::ErrorContext;
use crate::diagnostics::ServiceDiagnostics;
use crate::errors::ErrorCode;
use crate::operations::{
    AnalyticsRequest, AnalyticsResponse, ClusterDescribeRequest, ClusterDescribeResponse,
    ExistsRequest, ExistsResponse, GetProjectedRequest, GetProjectedResponse, GetRequest,
    GetResponse, InsertRequest, MutationResponse, QueryRequest, QueryResponse, RemoveRequest,
    ReplaceRequest, SearchIndexUpsertRequest, SearchIndexUpsertResponse, SearchRequest,
    SearchResponse, UpsertRequest, ViewRequest, ViewResponse,
};

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

/// One-shot callback receiving the final outcome of a submission.
///
/// Consumed by [`complete`](Completion::complete), so it can fire at most once.
pub struct Completion<T> {
    callback: Box<dyn FnOnce(T) + Send + 'static>,
}

impl<T> Completion<T> {
    pub fn new(callback: impl FnOnce(T) + Send + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Delivers the outcome.
    pub fn complete(self, value: T) {
        (self.callback)(value)
    }
}

impl<T> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Completion")
    }
}

// ---------------------------------------------------------------------------
// Request / response pairing
// ---------------------------------------------------------------------------

/// A completed response that embeds its own error code and diagnostics.
pub trait ClusterResponse: Send + 'static {
    type Diagnostics: ServiceDiagnostics;

    fn diagnostics(&self) -> &Self::Diagnostics;

    /// Code the request completed with; `None` on success.
    fn error_code(&self) -> Option<ErrorCode> {
        self.diagnostics().error_code()
    }

    /// Portable context built from the embedded diagnostics.
    fn error_context(&self) -> ErrorContext;
}

/// A request the client can execute.
pub trait ClusterRequest: Send + 'static {
    type Response: ClusterResponse;

    /// Operation name used in logs and failure messages.
    const NAME: &'static str;

    /// Packs the request with its completion for submission.
    fn into_operation(self, completion: Completion<Self::Response>) -> Operation;
}

macro_rules! cluster_responses {
    ($($response:ty => $diagnostics:ty;)+) => {
        $(
            impl ClusterResponse for $response {
                type Diagnostics = $diagnostics;

                fn diagnostics(&self) -> &Self::Diagnostics {
                    &self.ctx
                }

                fn error_context(&self) -> ErrorContext {
                    ErrorContext::from(&self.ctx)
                }
            }
        )+
    };
}

cluster_responses! {
    GetResponse => crate::diagnostics::KeyValueDiagnostics;
    GetProjectedResponse => crate::diagnostics::KeyValueDiagnostics;
    ExistsResponse => crate::diagnostics::KeyValueDiagnostics;
    MutationResponse => crate::diagnostics::KeyValueDiagnostics;
    QueryResponse => crate::diagnostics::QueryDiagnostics;
    AnalyticsResponse => crate::diagnostics::AnalyticsDiagnostics;
    ViewResponse => crate::diagnostics::ViewDiagnostics;
    SearchResponse => crate::diagnostics::SearchDiagnostics;
    SearchIndexUpsertResponse => crate::diagnostics::HttpDiagnostics;
    ClusterDescribeResponse => crate::diagnostics::HttpDiagnostics;
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

macro_rules! operations {
    ($($variant:ident($request:ty => $response:ty) = $name:literal;)+) => {
        /// A request paired with the completion that receives its response.
        #[derive(Debug)]
        pub enum Operation {
            $($variant($request, Completion<$response>),)+
        }

        impl Operation {
            /// Name of the packed request.
            pub fn name(&self) -> &'static str {
                match self {
                    $(Operation::$variant(..) => $name,)+
                }
            }
        }

        $(
            impl ClusterRequest for $request {
                type Response = $response;
                const NAME: &'static str = $name;

                fn into_operation(self, completion: Completion<Self::Response>) -> Operation {
                    Operation::$variant(self, completion)
                }
            }
        )+
    };
}

operations! {
    Get(GetRequest => GetResponse) = "get";
    GetProjected(GetProjectedRequest => GetProjectedResponse) = "get_projected";
    Exists(ExistsRequest => ExistsResponse) = "exists";
    Upsert(UpsertRequest => MutationResponse) = "upsert";
    Insert(InsertRequest => MutationResponse) = "insert";
    Replace(ReplaceRequest => MutationResponse) = "replace";
    Remove(RemoveRequest => MutationResponse) = "remove";
    Query(QueryRequest => QueryResponse) = "query";
    Analytics(AnalyticsRequest => AnalyticsResponse) = "analytics";
    View(ViewRequest => ViewResponse) = "view";
    Search(SearchRequest => SearchResponse) = "search";
    SearchIndexUpsert(SearchIndexUpsertRequest => SearchIndexUpsertResponse)
        = "search_index_upsert";
    ClusterDescribe(ClusterDescribeRequest => ClusterDescribeResponse) = "cluster_describe";
}

// ---------------------------------------------------------------------------
// Port
// ---------------------------------------------------------------------------

/// Asynchronous cluster client driven by a connection's execution context.
///
/// Every method must return without waiting for the request to finish. Each
/// completion is invoked exactly once, or dropped if the client abandons the
/// request. After [`close`](ClusterClient::close) has completed, no further
/// completion may be invoked.
pub trait ClusterClient: Send + Sync + 'static {
    /// Bootstraps against the cluster described by `origin`.
    fn open(&self, origin: ClusterOrigin, completion: Completion<Option<ErrorCode>>);

    fn open_bucket(&self, name: String, completion: Completion<Option<ErrorCode>>);

    fn close_bucket(&self, name: String, completion: Completion<Option<ErrorCode>>);

    /// Shuts the client down. Outstanding requests are completed or dropped
    /// before `completion` fires.
    fn close(&self, completion: Completion<()>);

    /// Submits a request.
    fn execute(&self, operation: Operation);
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::diagnostics::KeyValueDiagnostics;

    #[test]
    fn completion_delivers_value() {
        let seen = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&seen);
        let completion = Completion::new(move |value: usize| {
            sink.fetch_add(value, Ordering::SeqCst);
        });
        completion.complete(5);
        assert_eq!(seen.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn operation_carries_request_name() {
        let op = GetRequest::default().into_operation(Completion::new(|_| {}));
        assert_eq!(op.name(), "get");
        assert_eq!(<UpsertRequest as ClusterRequest>::NAME, "upsert");
    }

    #[test]
    fn response_reports_embedded_code() {
        let resp = GetResponse {
            ctx: KeyValueDiagnostics {
                ec: Some(ErrorCode::DocumentNotFound),
                ..KeyValueDiagnostics::default()
            },
            ..GetResponse::default()
        };
        assert_eq!(resp.error_code(), Some(ErrorCode::DocumentNotFound));
        assert!(matches!(resp.error_context(), ErrorContext::KeyValue(_)));
    }
}
