//! Internal diagnostic structures reported by a cluster client.
//!
//! Every response embeds one of these. They mirror what a client knows at the
//! moment it gives up on a request: the error code, who it talked to, how many
//! times it retried and why. Most sub-fields are optional because clients fill
//! in only what they observed. The portable shapes exposed to callers live in
//! [`crate::context`].

use std::collections::BTreeSet;

use crate::errors::ErrorCode;
use crate::identifiers::{Cas, DocumentId};
use crate::retry::RetryReason;

/// Server-supplied error-map entry for a key-value status code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorMapInfo {
    pub name: String,
    pub description: String,
}

/// Enhanced error information attached to some key-value failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnhancedErrorInfo {
    pub reference: String,
    pub context: String,
}

/// Key-value request diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValueDiagnostics {
    pub ec: Option<ErrorCode>,
    pub id: DocumentId,
    pub opaque: u32,
    pub cas: Cas,
    pub status_code: Option<u16>,
    pub error_map_info: Option<ErrorMapInfo>,
    pub enhanced_error_info: Option<EnhancedErrorInfo>,
    pub last_dispatched_to: Option<String>,
    pub last_dispatched_from: Option<String>,
    pub retry_attempts: u32,
    pub retry_reasons: BTreeSet<RetryReason>,
}

impl KeyValueDiagnostics {
    pub fn for_document(id: DocumentId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

/// N1QL query diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDiagnostics {
    pub ec: Option<ErrorCode>,
    pub client_context_id: String,
    pub statement: String,
    pub parameters: Option<String>,
    pub first_error_code: u64,
    pub first_error_message: String,
    pub http_status: u32,
    pub http_body: String,
    pub last_dispatched_to: Option<String>,
    pub last_dispatched_from: Option<String>,
    pub retry_attempts: u32,
    pub retry_reasons: BTreeSet<RetryReason>,
}

/// Analytics query diagnostics. Same shape as [`QueryDiagnostics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyticsDiagnostics {
    pub ec: Option<ErrorCode>,
    pub client_context_id: String,
    pub statement: String,
    pub parameters: Option<String>,
    pub first_error_code: u64,
    pub first_error_message: String,
    pub http_status: u32,
    pub http_body: String,
    pub last_dispatched_to: Option<String>,
    pub last_dispatched_from: Option<String>,
    pub retry_attempts: u32,
    pub retry_reasons: BTreeSet<RetryReason>,
}

/// View query diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewDiagnostics {
    pub ec: Option<ErrorCode>,
    pub client_context_id: String,
    pub design_document_name: String,
    pub view_name: String,
    pub query_string: Vec<String>,
    pub http_status: u32,
    pub http_body: String,
    pub last_dispatched_to: Option<String>,
    pub last_dispatched_from: Option<String>,
    pub retry_attempts: u32,
    pub retry_reasons: BTreeSet<RetryReason>,
}

/// Full-text search diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchDiagnostics {
    pub ec: Option<ErrorCode>,
    pub client_context_id: String,
    pub index_name: String,
    pub query: String,
    pub parameters: Option<String>,
    pub http_status: u32,
    pub http_body: String,
    pub last_dispatched_to: Option<String>,
    pub last_dispatched_from: Option<String>,
    pub retry_attempts: u32,
    pub retry_reasons: BTreeSet<RetryReason>,
}

/// Diagnostics of administrative HTTP requests (index management, describe).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpDiagnostics {
    pub ec: Option<ErrorCode>,
    pub client_context_id: String,
    pub method: String,
    pub path: String,
    pub http_status: u32,
    pub http_body: String,
    pub last_dispatched_to: Option<String>,
    pub last_dispatched_from: Option<String>,
    pub retry_attempts: u32,
    pub retry_reasons: BTreeSet<RetryReason>,
}

/// Shared view over every diagnostics shape.
pub trait ServiceDiagnostics {
    /// Code the client completed the request with; `None` on success.
    fn error_code(&self) -> Option<ErrorCode>;

    /// Records one retry of the request.
    fn record_retry(&mut self, reason: RetryReason);
}

macro_rules! impl_service_diagnostics {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl ServiceDiagnostics for $ty {
                fn error_code(&self) -> Option<ErrorCode> {
                    self.ec
                }

                fn record_retry(&mut self, reason: RetryReason) {
                    self.retry_attempts += 1;
                    self.retry_reasons.insert(reason);
                }
            }
        )+
    };
}

impl_service_diagnostics!(
    KeyValueDiagnostics,
    QueryDiagnostics,
    AnalyticsDiagnostics,
    ViewDiagnostics,
    SearchDiagnostics,
    HttpDiagnostics,
);
