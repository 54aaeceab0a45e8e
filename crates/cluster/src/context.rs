//! Portable per-service error contexts and the builders that produce them.
//!
//! A failed completion carries one of the internal diagnostics structures from
//! [`crate::diagnostics`]. The builders here (`From<&XDiagnostics>`) turn it into
//! the matching context shape. Builders never fail: absent sub-fields become
//! absent output fields, and retry reasons are normalized to their identifiers
//! only when the request actually retried.
//!
//! [`ErrorContext`] is the tagged union attached to a [`crate::CoreError`]. The
//! fields every service shares (correlation id, retry attempts, retry reasons)
//! are reachable without narrowing on the variant.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::diagnostics::{
    AnalyticsDiagnostics, HttpDiagnostics, KeyValueDiagnostics, QueryDiagnostics,
    SearchDiagnostics, ViewDiagnostics,
};
use crate::retry::RetryReason;

/// Normalizes the retry reasons of a request.
///
/// Empty unless `attempts` is non-zero.
pub fn normalize_retry_reasons<'a>(
    attempts: u32,
    reasons: impl IntoIterator<Item = &'a RetryReason>,
) -> BTreeSet<String> {
    if attempts == 0 {
        return BTreeSet::new();
    }
    reasons
        .into_iter()
        .map(|reason| reason.as_str().to_owned())
        .collect()
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_owned())
}

// ---------------------------------------------------------------------------
// Key-value
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValueErrorContext {
    pub bucket: String,
    pub scope: String,
    pub collection: String,
    pub id: String,
    pub opaque: u32,
    pub cas: crate::identifiers::Cas,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_map_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_map_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_error_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_error_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_dispatched_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_dispatched_from: Option<String>,
    pub retry_attempts: u32,
    pub retry_reasons: BTreeSet<String>,
}

impl From<&KeyValueDiagnostics> for KeyValueErrorContext {
    fn from(diag: &KeyValueDiagnostics) -> Self {
        let (error_map_name, error_map_description) = match &diag.error_map_info {
            Some(info) => (Some(info.name.clone()), Some(info.description.clone())),
            None => (None, None),
        };
        let (enhanced_error_reference, enhanced_error_context) = match &diag.enhanced_error_info {
            Some(info) => (non_empty(&info.reference), non_empty(&info.context)),
            None => (None, None),
        };
        Self {
            bucket: diag.id.bucket.clone(),
            scope: diag.id.scope.clone(),
            collection: diag.id.collection.clone(),
            id: diag.id.key.clone(),
            opaque: diag.opaque,
            cas: diag.cas,
            status_code: diag.status_code,
            error_map_name,
            error_map_description,
            enhanced_error_reference,
            enhanced_error_context,
            last_dispatched_to: diag.last_dispatched_to.clone(),
            last_dispatched_from: diag.last_dispatched_from.clone(),
            retry_attempts: diag.retry_attempts,
            retry_reasons: normalize_retry_reasons(diag.retry_attempts, &diag.retry_reasons),
        }
    }
}

// ---------------------------------------------------------------------------
// Query and analytics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryErrorContext {
    pub client_context_id: String,
    pub statement: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,
    pub first_error_code: u64,
    pub first_error_message: String,
    pub http_status: u32,
    pub http_body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_dispatched_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_dispatched_from: Option<String>,
    pub retry_attempts: u32,
    pub retry_reasons: BTreeSet<String>,
}

impl From<&QueryDiagnostics> for QueryErrorContext {
    fn from(diag: &QueryDiagnostics) -> Self {
        Self {
            client_context_id: diag.client_context_id.clone(),
            statement: diag.statement.clone(),
            parameters: diag.parameters.clone(),
            first_error_code: diag.first_error_code,
            first_error_message: diag.first_error_message.clone(),
            http_status: diag.http_status,
            http_body: diag.http_body.clone(),
            last_dispatched_to: diag.last_dispatched_to.clone(),
            last_dispatched_from: diag.last_dispatched_from.clone(),
            retry_attempts: diag.retry_attempts,
            retry_reasons: normalize_retry_reasons(diag.retry_attempts, &diag.retry_reasons),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsErrorContext {
    pub client_context_id: String,
    pub statement: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,
    pub first_error_code: u64,
    pub first_error_message: String,
    pub http_status: u32,
    pub http_body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_dispatched_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_dispatched_from: Option<String>,
    pub retry_attempts: u32,
    pub retry_reasons: BTreeSet<String>,
}

impl From<&AnalyticsDiagnostics> for AnalyticsErrorContext {
    fn from(diag: &AnalyticsDiagnostics) -> Self {
        Self {
            client_context_id: diag.client_context_id.clone(),
            statement: diag.statement.clone(),
            parameters: diag.parameters.clone(),
            first_error_code: diag.first_error_code,
            first_error_message: diag.first_error_message.clone(),
            http_status: diag.http_status,
            http_body: diag.http_body.clone(),
            last_dispatched_to: diag.last_dispatched_to.clone(),
            last_dispatched_from: diag.last_dispatched_from.clone(),
            retry_attempts: diag.retry_attempts,
            retry_reasons: normalize_retry_reasons(diag.retry_attempts, &diag.retry_reasons),
        }
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewErrorContext {
    pub client_context_id: String,
    pub design_document_name: String,
    pub view_name: String,
    pub query_string: Vec<String>,
    pub http_status: u32,
    pub http_body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_dispatched_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_dispatched_from: Option<String>,
    pub retry_attempts: u32,
    pub retry_reasons: BTreeSet<String>,
}

impl From<&ViewDiagnostics> for ViewErrorContext {
    fn from(diag: &ViewDiagnostics) -> Self {
        Self {
            client_context_id: diag.client_context_id.clone(),
            design_document_name: diag.design_document_name.clone(),
            view_name: diag.view_name.clone(),
            query_string: diag.query_string.clone(),
            http_status: diag.http_status,
            http_body: diag.http_body.clone(),
            last_dispatched_to: diag.last_dispatched_to.clone(),
            last_dispatched_from: diag.last_dispatched_from.clone(),
            retry_attempts: diag.retry_attempts,
            retry_reasons: normalize_retry_reasons(diag.retry_attempts, &diag.retry_reasons),
        }
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchErrorContext {
    pub client_context_id: String,
    pub index_name: String,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,
    pub http_status: u32,
    pub http_body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_dispatched_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_dispatched_from: Option<String>,
    pub retry_attempts: u32,
    pub retry_reasons: BTreeSet<String>,
}

impl From<&SearchDiagnostics> for SearchErrorContext {
    fn from(diag: &SearchDiagnostics) -> Self {
        Self {
            client_context_id: diag.client_context_id.clone(),
            index_name: diag.index_name.clone(),
            query: diag.query.clone(),
            parameters: diag.parameters.clone(),
            http_status: diag.http_status,
            http_body: diag.http_body.clone(),
            last_dispatched_to: diag.last_dispatched_to.clone(),
            last_dispatched_from: diag.last_dispatched_from.clone(),
            retry_attempts: diag.retry_attempts,
            retry_reasons: normalize_retry_reasons(diag.retry_attempts, &diag.retry_reasons),
        }
    }
}

// ---------------------------------------------------------------------------
// Administrative HTTP
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpErrorContext {
    pub client_context_id: String,
    pub method: String,
    pub path: String,
    pub http_status: u32,
    pub http_body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_dispatched_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_dispatched_from: Option<String>,
    pub retry_attempts: u32,
    pub retry_reasons: BTreeSet<String>,
}

impl From<&HttpDiagnostics> for HttpErrorContext {
    fn from(diag: &HttpDiagnostics) -> Self {
        Self {
            client_context_id: diag.client_context_id.clone(),
            method: diag.method.clone(),
            path: diag.path.clone(),
            http_status: diag.http_status,
            http_body: diag.http_body.clone(),
            last_dispatched_to: diag.last_dispatched_to.clone(),
            last_dispatched_from: diag.last_dispatched_from.clone(),
            retry_attempts: diag.retry_attempts,
            retry_reasons: normalize_retry_reasons(diag.retry_attempts, &diag.retry_reasons),
        }
    }
}

// ---------------------------------------------------------------------------
// Tagged union
// ---------------------------------------------------------------------------

/// Service error context attached to an error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorContext {
    KeyValue(KeyValueErrorContext),
    Query(QueryErrorContext),
    Analytics(AnalyticsErrorContext),
    View(ViewErrorContext),
    Search(SearchErrorContext),
    Http(HttpErrorContext),
}

impl ErrorContext {
    /// Client-assigned correlation id: the opaque for key-value requests, the
    /// client context id for every HTTP-based service.
    pub fn correlation_id(&self) -> String {
        match self {
            ErrorContext::KeyValue(ctx) => ctx.opaque.to_string(),
            ErrorContext::Query(ctx) => ctx.client_context_id.clone(),
            ErrorContext::Analytics(ctx) => ctx.client_context_id.clone(),
            ErrorContext::View(ctx) => ctx.client_context_id.clone(),
            ErrorContext::Search(ctx) => ctx.client_context_id.clone(),
            ErrorContext::Http(ctx) => ctx.client_context_id.clone(),
        }
    }

    pub fn retry_attempts(&self) -> u32 {
        match self {
            ErrorContext::KeyValue(ctx) => ctx.retry_attempts,
            ErrorContext::Query(ctx) => ctx.retry_attempts,
            ErrorContext::Analytics(ctx) => ctx.retry_attempts,
            ErrorContext::View(ctx) => ctx.retry_attempts,
            ErrorContext::Search(ctx) => ctx.retry_attempts,
            ErrorContext::Http(ctx) => ctx.retry_attempts,
        }
    }

    pub fn retry_reasons(&self) -> &BTreeSet<String> {
        match self {
            ErrorContext::KeyValue(ctx) => &ctx.retry_reasons,
            ErrorContext::Query(ctx) => &ctx.retry_reasons,
            ErrorContext::Analytics(ctx) => &ctx.retry_reasons,
            ErrorContext::View(ctx) => &ctx.retry_reasons,
            ErrorContext::Search(ctx) => &ctx.retry_reasons,
            ErrorContext::Http(ctx) => &ctx.retry_reasons,
        }
    }
}

macro_rules! context_conversions {
    ($($variant:ident => $context:ty, $diagnostics:ty;)+) => {
        $(
            impl From<$context> for ErrorContext {
                fn from(ctx: $context) -> Self {
                    ErrorContext::$variant(ctx)
                }
            }

            impl From<&$diagnostics> for ErrorContext {
                fn from(diag: &$diagnostics) -> Self {
                    ErrorContext::$variant(<$context>::from(diag))
                }
            }
        )+
    };
}

context_conversions! {
    KeyValue => KeyValueErrorContext, KeyValueDiagnostics;
    Query => QueryErrorContext, QueryDiagnostics;
    Analytics => AnalyticsErrorContext, AnalyticsDiagnostics;
    View => ViewErrorContext, ViewDiagnostics;
    Search => SearchErrorContext, SearchDiagnostics;
    Http => HttpErrorContext, HttpDiagnostics;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{EnhancedErrorInfo, ErrorMapInfo, ServiceDiagnostics};
    use crate::errors::ErrorCode;
    use crate::identifiers::{Cas, DocumentId};

    #[test]
    fn key_value_context_copies_identity_and_optional_fields() {
        let mut diag = KeyValueDiagnostics::for_document(DocumentId::in_default_collection(
            "travel", "hotel_1",
        ));
        diag.ec = Some(ErrorCode::DocumentLocked);
        diag.opaque = 42;
        diag.cas = Cas::new(0xabc);
        diag.status_code = Some(0x09);
        diag.error_map_info = Some(ErrorMapInfo {
            name: "LOCKED".into(),
            description: "Requested resource is locked".into(),
        });
        diag.enhanced_error_info = Some(EnhancedErrorInfo {
            reference: "ref-1".into(),
            context: "held by another client".into(),
        });
        diag.record_retry(RetryReason::KvLocked);
        diag.record_retry(RetryReason::KvLocked);

        let ctx = KeyValueErrorContext::from(&diag);
        assert_eq!(ctx.bucket, "travel");
        assert_eq!(ctx.id, "hotel_1");
        assert_eq!(ctx.status_code, Some(9));
        assert_eq!(ctx.error_map_name.as_deref(), Some("LOCKED"));
        assert_eq!(ctx.enhanced_error_reference.as_deref(), Some("ref-1"));
        assert_eq!(ctx.enhanced_error_context.as_deref(), Some("held by another client"));
        assert_eq!(ctx.retry_attempts, 2);
        assert_eq!(ctx.retry_reasons, BTreeSet::from(["kv_locked".to_owned()]));
    }

    #[test]
    fn partial_diagnostics_omit_fields() {
        let ctx = KeyValueErrorContext::from(&KeyValueDiagnostics::default());
        assert!(ctx.status_code.is_none());
        assert!(ctx.error_map_name.is_none());
        assert!(ctx.enhanced_error_context.is_none());

        let json = serde_json::to_value(&ctx).unwrap();
        assert!(json.get("statusCode").is_none());
        assert!(json.get("errorMapName").is_none());
        assert_eq!(json["retryReasons"], serde_json::json!([]));
    }

    #[test]
    fn reasons_ignored_without_attempts() {
        let diag = QueryDiagnostics {
            retry_attempts: 0,
            retry_reasons: BTreeSet::from([RetryReason::QueryIndexNotFound]),
            ..QueryDiagnostics::default()
        };
        assert!(QueryErrorContext::from(&diag).retry_reasons.is_empty());
    }

    #[test]
    fn common_fields_reachable_through_union() {
        let mut diag = SearchDiagnostics {
            client_context_id: "ctx-7".into(),
            index_name: "hotels".into(),
            ..SearchDiagnostics::default()
        };
        diag.record_retry(RetryReason::SearchTooManyRequests);
        diag.record_retry(RetryReason::CircuitBreakerOpen);

        let ctx = ErrorContext::from(&diag);
        assert_eq!(ctx.correlation_id(), "ctx-7");
        assert_eq!(ctx.retry_attempts(), 2);
        assert_eq!(ctx.retry_reasons().len(), 2);
        assert!(ctx.retry_reasons().contains("search_too_many_requests"));

        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["type"], "search");
        assert_eq!(json["indexName"], "hotels");
    }
}
