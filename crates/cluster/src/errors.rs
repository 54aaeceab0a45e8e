//! Error codes and the error envelope returned by every bridge operation.
//!
//! [`ErrorCode`] is the portable taxonomy. Cluster clients report one alongside
//! each completion; validation and lifecycle code raise their own.
//!
//! [`CoreError`] is the envelope: the code, the [`Location`] where the failure
//! was detected, a human-readable message, and (for failures observed after a
//! completion) the typed [`ErrorContext`] built from the client's diagnostics.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::ErrorContext;

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Group an [`ErrorCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Common,
    KeyValue,
    Query,
    Analytics,
    Search,
    View,
    Management,
    Network,
    Lifecycle,
}

/// Portable error kinds.
///
/// Each code has a stable numeric [`value`](ErrorCode::value) (grouped in
/// hundreds by [`ErrorCategory`]) and a `Display` message. Both appear in the
/// formatted failure messages, e.g. `unable to query: 201, planning failure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // ==================== Common ====================
    #[error("request canceled")]
    RequestCanceled,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("service not available")]
    ServiceNotAvailable,
    #[error("internal server failure")]
    InternalServerFailure,
    #[error("authentication failure")]
    AuthenticationFailure,
    #[error("temporary failure")]
    TemporaryFailure,
    #[error("parsing failure")]
    ParsingFailure,
    #[error("cas mismatch")]
    CasMismatch,
    #[error("bucket not found")]
    BucketNotFound,
    #[error("collection not found")]
    CollectionNotFound,
    #[error("unsupported operation")]
    UnsupportedOperation,
    #[error("ambiguous timeout")]
    AmbiguousTimeout,
    #[error("unambiguous timeout")]
    UnambiguousTimeout,
    #[error("feature not available")]
    FeatureNotAvailable,
    #[error("scope not found")]
    ScopeNotFound,
    #[error("index not found")]
    IndexNotFound,
    #[error("index exists")]
    IndexExists,
    #[error("encoding failure")]
    EncodingFailure,
    #[error("decoding failure")]
    DecodingFailure,
    #[error("rate limited")]
    RateLimited,
    #[error("quota limited")]
    QuotaLimited,

    // ==================== Key-value ====================
    #[error("document not found")]
    DocumentNotFound,
    #[error("document irretrievable")]
    DocumentIrretrievable,
    #[error("document locked")]
    DocumentLocked,
    #[error("value too large")]
    ValueTooLarge,
    #[error("document exists")]
    DocumentExists,
    #[error("durability level not available")]
    DurabilityLevelNotAvailable,
    #[error("durability impossible")]
    DurabilityImpossible,
    #[error("durability ambiguous")]
    DurabilityAmbiguous,
    #[error("durable write in progress")]
    DurableWriteInProgress,
    #[error("durable write re-commit in progress")]
    DurableWriteReCommitInProgress,
    #[error("path not found")]
    PathNotFound,
    #[error("path mismatch")]
    PathMismatch,
    #[error("path invalid")]
    PathInvalid,

    // ==================== Query ====================
    #[error("planning failure")]
    PlanningFailure,
    #[error("index failure")]
    IndexFailure,
    #[error("prepared statement failure")]
    PreparedStatementFailure,
    #[error("dml failure")]
    DmlFailure,

    // ==================== Analytics ====================
    #[error("compilation failure")]
    CompilationFailure,
    #[error("job queue full")]
    JobQueueFull,
    #[error("dataset not found")]
    DatasetNotFound,
    #[error("dataverse not found")]
    DataverseNotFound,

    // ==================== Search ====================
    #[error("index not ready")]
    IndexNotReady,
    #[error("consistency mismatch")]
    ConsistencyMismatch,

    // ==================== View ====================
    #[error("view not found")]
    ViewNotFound,
    #[error("design document not found")]
    DesignDocumentNotFound,

    // ==================== Management ====================
    #[error("bucket exists")]
    BucketExists,
    #[error("collection exists")]
    CollectionExists,
    #[error("scope exists")]
    ScopeExists,

    // ==================== Network ====================
    #[error("resolve failure")]
    ResolveFailure,
    #[error("no endpoints left")]
    NoEndpointsLeft,
    #[error("handshake failure")]
    HandshakeFailure,
    #[error("protocol error")]
    ProtocolError,
    #[error("configuration not available")]
    ConfigurationNotAvailable,
    #[error("cluster closed")]
    ClusterClosed,

    // ==================== Lifecycle ====================
    /// The execution context or its worker thread could not be created.
    #[error("execution context unavailable")]
    ExecutionContextUnavailable,
    /// A blocking call was issued from the worker thread that would have to
    /// deliver its completion.
    #[error("blocking call on worker thread")]
    BlockingCallOnWorker,
    /// The worker thread terminated abnormally during teardown.
    #[error("worker thread panicked")]
    WorkerPanicked,
}

impl ErrorCode {
    /// Stable numeric value of the code.
    pub fn value(self) -> u32 {
        use ErrorCode::*;
        match self {
            RequestCanceled => 2,
            InvalidArgument => 3,
            ServiceNotAvailable => 4,
            InternalServerFailure => 5,
            AuthenticationFailure => 6,
            TemporaryFailure => 7,
            ParsingFailure => 8,
            CasMismatch => 9,
            BucketNotFound => 10,
            CollectionNotFound => 11,
            UnsupportedOperation => 12,
            AmbiguousTimeout => 13,
            UnambiguousTimeout => 14,
            FeatureNotAvailable => 15,
            ScopeNotFound => 16,
            IndexNotFound => 17,
            IndexExists => 18,
            EncodingFailure => 19,
            DecodingFailure => 20,
            RateLimited => 21,
            QuotaLimited => 22,

            DocumentNotFound => 101,
            DocumentIrretrievable => 102,
            DocumentLocked => 103,
            ValueTooLarge => 104,
            DocumentExists => 105,
            DurabilityLevelNotAvailable => 107,
            DurabilityImpossible => 108,
            DurabilityAmbiguous => 109,
            DurableWriteInProgress => 110,
            DurableWriteReCommitInProgress => 111,
            PathNotFound => 113,
            PathMismatch => 114,
            PathInvalid => 115,

            PlanningFailure => 201,
            IndexFailure => 202,
            PreparedStatementFailure => 203,
            DmlFailure => 204,

            CompilationFailure => 301,
            JobQueueFull => 302,
            DatasetNotFound => 303,
            DataverseNotFound => 304,

            IndexNotReady => 401,
            ConsistencyMismatch => 402,

            ViewNotFound => 501,
            DesignDocumentNotFound => 502,

            CollectionExists => 601,
            ScopeExists => 602,
            BucketExists => 605,

            ResolveFailure => 1001,
            NoEndpointsLeft => 1002,
            HandshakeFailure => 1003,
            ProtocolError => 1004,
            ConfigurationNotAvailable => 1005,
            ClusterClosed => 1006,

            ExecutionContextUnavailable => 1101,
            BlockingCallOnWorker => 1102,
            WorkerPanicked => 1103,
        }
    }

    /// Category the code belongs to, derived from its numeric range.
    pub fn category(self) -> ErrorCategory {
        match self.value() {
            0..=99 => ErrorCategory::Common,
            100..=199 => ErrorCategory::KeyValue,
            200..=299 => ErrorCategory::Query,
            300..=399 => ErrorCategory::Analytics,
            400..=499 => ErrorCategory::Search,
            500..=599 => ErrorCategory::View,
            600..=699 => ErrorCategory::Management,
            1000..=1099 => ErrorCategory::Network,
            _ => ErrorCategory::Lifecycle,
        }
    }

    /// Returns `true` for codes meaning no node or service could take the request.
    pub fn is_unavailable(self) -> bool {
        matches!(
            self,
            ErrorCode::ServiceNotAvailable
                | ErrorCode::NoEndpointsLeft
                | ErrorCode::ConfigurationNotAvailable
        )
    }
}

// ---------------------------------------------------------------------------
// Source location
// ---------------------------------------------------------------------------

/// Source location at which an error was detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub line: u32,
    pub file: &'static str,
    pub function: &'static str,
}

impl Location {
    pub const fn new(line: u32, file: &'static str, function: &'static str) -> Self {
        Self {
            line,
            file,
            function,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} ({})", self.file, self.line, self.function)
    }
}

/// Captures the [`Location`] of the macro invocation: line, file and the
/// path of the enclosing function.
#[macro_export]
macro_rules! location {
    () => {{
        fn here() {}
        fn name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let path = name_of(here);
        let path = path.strip_suffix("::here").unwrap_or(path);
        $crate::errors::Location::new(
            line!(),
            file!(),
            path.strip_suffix("::{{closure}}").unwrap_or(path),
        )
    }};
}

// ---------------------------------------------------------------------------
// Error envelope
// ---------------------------------------------------------------------------

/// Uniform error carrier returned by every bridge operation.
///
/// Validation errors carry no context; failures observed after a completion
/// carry the typed context of the service that failed.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{message}")]
pub struct CoreError {
    /// Portable error kind.
    pub code: ErrorCode,
    /// Where the failure was detected.
    pub location: Location,
    /// Human-readable description.
    pub message: String,
    /// Service-specific diagnostics, when a completion was observed.
    pub context: Option<ErrorContext>,
}

impl CoreError {
    /// Creates an envelope whose message is the code's own description.
    pub fn new(code: ErrorCode, location: Location) -> Self {
        Self {
            code,
            location,
            message: code.to_string(),
            context: None,
        }
    }

    /// Creates an envelope with an explicit message.
    pub fn with_message(code: ErrorCode, location: Location, message: impl Into<String>) -> Self {
        Self {
            code,
            location,
            message: message.into(),
            context: None,
        }
    }

    /// Shorthand for an [`ErrorCode::InvalidArgument`] envelope.
    pub fn invalid_argument(location: Location, message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidArgument, location, message)
    }

    /// Attaches service diagnostics to the envelope.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<ErrorContext>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Result alias used across the bridge.
pub type CoreResult<T> = Result<T, CoreError>;
