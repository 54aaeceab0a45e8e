//! Retry causes recorded by cluster clients and their stable identifiers.
//!
//! A client records a [`RetryReason`] every time it re-dispatches a request.
//! Error contexts expose those causes as lower-case snake-case identifiers so
//! host code can match on them without depending on this enum.

use serde::{Deserialize, Serialize};

/// Identifier returned for raw retry codes this crate does not know.
pub const UNEXPECTED_RETRY_REASON: &str = "unexpected";

/// Why a cluster client retried a request before its final completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryReason {
    DoNotRetry,
    SocketNotAvailable,
    ServiceNotAvailable,
    NodeNotAvailable,
    KvNotMyVbucket,
    KvCollectionOutdated,
    KvErrorMapRetryIndicated,
    KvLocked,
    KvTemporaryFailure,
    KvSyncWriteInProgress,
    KvSyncWriteReCommitInProgress,
    ServiceResponseCodeIndicated,
    SocketClosedWhileInFlight,
    CircuitBreakerOpen,
    QueryPreparedStatementFailure,
    QueryIndexNotFound,
    AnalyticsTemporaryFailure,
    SearchTooManyRequests,
    ViewsTemporaryFailure,
    ViewsNoActivePartition,
    Unknown,
}

impl RetryReason {
    /// Every reason, in wire-code order.
    pub const ALL: [RetryReason; 21] = [
        RetryReason::DoNotRetry,
        RetryReason::SocketNotAvailable,
        RetryReason::ServiceNotAvailable,
        RetryReason::NodeNotAvailable,
        RetryReason::KvNotMyVbucket,
        RetryReason::KvCollectionOutdated,
        RetryReason::KvErrorMapRetryIndicated,
        RetryReason::KvLocked,
        RetryReason::KvTemporaryFailure,
        RetryReason::KvSyncWriteInProgress,
        RetryReason::KvSyncWriteReCommitInProgress,
        RetryReason::ServiceResponseCodeIndicated,
        RetryReason::SocketClosedWhileInFlight,
        RetryReason::CircuitBreakerOpen,
        RetryReason::QueryPreparedStatementFailure,
        RetryReason::QueryIndexNotFound,
        RetryReason::AnalyticsTemporaryFailure,
        RetryReason::SearchTooManyRequests,
        RetryReason::ViewsTemporaryFailure,
        RetryReason::ViewsNoActivePartition,
        RetryReason::Unknown,
    ];

    /// Stable identifier of the reason.
    pub fn as_str(self) -> &'static str {
        match self {
            RetryReason::DoNotRetry => "do_not_retry",
            RetryReason::SocketNotAvailable => "socket_not_available",
            RetryReason::ServiceNotAvailable => "service_not_available",
            RetryReason::NodeNotAvailable => "node_not_available",
            RetryReason::KvNotMyVbucket => "kv_not_my_vbucket",
            RetryReason::KvCollectionOutdated => "kv_collection_outdated",
            RetryReason::KvErrorMapRetryIndicated => "kv_error_map_retry_indicated",
            RetryReason::KvLocked => "kv_locked",
            RetryReason::KvTemporaryFailure => "kv_temporary_failure",
            RetryReason::KvSyncWriteInProgress => "kv_sync_write_in_progress",
            RetryReason::KvSyncWriteReCommitInProgress => "kv_sync_write_re_commit_in_progress",
            RetryReason::ServiceResponseCodeIndicated => "service_response_code_indicated",
            RetryReason::SocketClosedWhileInFlight => "socket_closed_while_in_flight",
            RetryReason::CircuitBreakerOpen => "circuit_breaker_open",
            RetryReason::QueryPreparedStatementFailure => "query_prepared_statement_failure",
            RetryReason::QueryIndexNotFound => "query_index_not_found",
            RetryReason::AnalyticsTemporaryFailure => "analytics_temporary_failure",
            RetryReason::SearchTooManyRequests => "search_too_many_requests",
            RetryReason::ViewsTemporaryFailure => "views_temporary_failure",
            RetryReason::ViewsNoActivePartition => "views_no_active_partition",
            RetryReason::Unknown => "unknown",
        }
    }

    /// Maps a raw wire code to a reason, if the code is known.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }
}

impl std::fmt::Display for RetryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier for a raw retry code; never fails.
///
/// Known codes map to [`RetryReason::as_str`]; anything else yields
/// [`UNEXPECTED_RETRY_REASON`].
pub fn retry_reason_name(code: u8) -> &'static str {
    RetryReason::from_code(code).map_or(UNEXPECTED_RETRY_REASON, RetryReason::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_documented_identifier_per_category() {
        assert_eq!(RetryReason::CircuitBreakerOpen.as_str(), "circuit_breaker_open");
        assert_eq!(RetryReason::KvLocked.as_str(), "kv_locked");
        assert_eq!(RetryReason::QueryIndexNotFound.as_str(), "query_index_not_found");
        assert_eq!(RetryReason::NodeNotAvailable.as_str(), "node_not_available");
        assert_eq!(
            RetryReason::AnalyticsTemporaryFailure.as_str(),
            "analytics_temporary_failure"
        );
        assert_eq!(RetryReason::SearchTooManyRequests.as_str(), "search_too_many_requests");
        assert_eq!(RetryReason::ViewsNoActivePartition.as_str(), "views_no_active_partition");
    }

    #[test]
    fn identifiers_match_serde_names() {
        for reason in RetryReason::ALL {
            assert_eq!(
                serde_json::to_value(reason).unwrap(),
                serde_json::Value::String(reason.as_str().to_owned())
            );
        }
    }

    #[test]
    fn unknown_codes_map_to_sentinel() {
        assert_eq!(retry_reason_name(7), "kv_locked");
        assert_eq!(retry_reason_name(20), "unknown");
        assert_eq!(retry_reason_name(21), UNEXPECTED_RETRY_REASON);
        assert_eq!(retry_reason_name(u8::MAX), UNEXPECTED_RETRY_REASON);
    }
}
