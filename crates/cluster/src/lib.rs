//! Domain types for the synchronous cluster bridge.
//!
//! This crate holds every value that crosses the boundary between a blocking
//! caller and an asynchronous cluster client: identifiers, error codes and the
//! error envelope, retry reasons, client diagnostics and the portable error
//! contexts built from them, request/response values, and the client port.
//!
//! ## Architectural Layer
//!
//! **Domain + port definitions.** No threads, no I/O. The `connection` crate
//! drives a [`ClusterClient`]; adapter crates implement it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | `Cas`, `SequenceNumber`, `DocumentId`, `ConnectionId` |
//! | [`errors`] | `ErrorCode`, `CoreError`, `Location`, the `location!` macro |
//! | [`retry`] | `RetryReason` and its stable identifiers |
//! | [`diagnostics`] | Per-service diagnostics embedded in responses |
//! | [`context`] | Portable error contexts and their builders |
//! | [`operations`] | Request and response values |
//! | [`client`] | `ClusterClient` port, `Completion`, `Operation` |
//! | [`config`] | `ClusterOrigin`, `ClusterOptions`, `Credentials`, `ConnectionString` |

pub mod client;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod errors;
pub mod identifiers;
pub mod operations;
pub mod retry;

// Re-export the common surface at the crate root.
pub use client::{ClusterClient, ClusterRequest, ClusterResponse, Completion, Operation};
pub use config::{
    ClusterOptions, ClusterOrigin, ConnectionString, ConnectionStringError, Credentials,
    MeterOptions, Node, Scheme, TlsVerifyMode, TracingOptions,
};
pub use context::{
    normalize_retry_reasons, AnalyticsErrorContext, ErrorContext, HttpErrorContext,
    KeyValueErrorContext, QueryErrorContext, SearchErrorContext, ViewErrorContext,
};
pub use diagnostics::{
    AnalyticsDiagnostics, EnhancedErrorInfo, ErrorMapInfo, HttpDiagnostics, KeyValueDiagnostics,
    QueryDiagnostics, SearchDiagnostics, ServiceDiagnostics, ViewDiagnostics,
};
pub use errors::{CoreError, CoreResult, ErrorCategory, ErrorCode, Location};
pub use identifiers::{
    Cas, ConnectionId, DocumentId, PartitionUuid, SequenceNumber, DEFAULT_COLLECTION,
};
pub use operations::{Durability, DurabilityLevel, MutationToken};
pub use retry::{retry_reason_name, RetryReason, UNEXPECTED_RETRY_REASON};
