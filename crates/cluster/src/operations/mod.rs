//! Request and response values exchanged with a cluster client.
//!
//! Requests are plain data populated by the `options` crate. Responses embed
//! the diagnostics structure of their service in a `ctx` field; a response
//! whose `ctx.ec` is set is a failed completion. Responses serialize to the
//! host representation (camelCase keys, hex CAS values, `ctx` omitted).

pub mod analytics;
pub mod kv;
pub mod management;
pub mod query;
pub mod search;
pub mod view;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::identifiers::{PartitionUuid, SequenceNumber};

pub use analytics::{
    AnalyticsMeta, AnalyticsMetrics, AnalyticsProblem, AnalyticsRequest, AnalyticsResponse,
    AnalyticsScanConsistency,
};
pub use kv::{
    ExistsRequest, ExistsResponse, GetProjectedRequest, GetProjectedResponse, GetRequest,
    GetResponse, InsertRequest, MutationResponse, RemoveRequest, ReplaceRequest, UpsertRequest,
};
pub use management::{
    ClusterDescribeRequest, ClusterDescribeResponse, ClusterInfo, NodeInfo, SearchIndex,
    SearchIndexUpsertRequest, SearchIndexUpsertResponse,
};
pub use query::{
    QueryMeta, QueryMetrics, QueryProblem, QueryProfile, QueryRequest, QueryResponse,
    QueryScanConsistency,
};
pub use search::{
    DateRangeFacet, HighlightStyle, NumericRangeFacet, SearchFacet, SearchLocation, SearchMeta,
    SearchMetrics, SearchRequest, SearchResponse, SearchRow, TermFacet,
};
pub use view::{
    DesignDocumentNamespace, ViewMeta, ViewRequest, ViewResponse, ViewRow, ViewScanConsistency,
    ViewSortOrder,
};

// ---------------------------------------------------------------------------
// Shared request fields
// ---------------------------------------------------------------------------

/// Synchronous-replication requirement of a mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DurabilityLevel {
    #[default]
    None,
    Majority,
    MajorityAndPersistToActive,
    PersistToMajority,
}

impl DurabilityLevel {
    /// Parses the host spelling (`none`, `majority`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "none" => Some(DurabilityLevel::None),
            "majority" => Some(DurabilityLevel::Majority),
            "majorityAndPersistToActive" => Some(DurabilityLevel::MajorityAndPersistToActive),
            "persistToMajority" => Some(DurabilityLevel::PersistToMajority),
            _ => None,
        }
    }
}

/// Durability settings shared by all mutations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Durability {
    pub level: DurabilityLevel,
    /// Server-side durability timeout; only meaningful when `level` is not `None`.
    pub timeout: Option<Duration>,
}

// ---------------------------------------------------------------------------
// Mutation tokens
// ---------------------------------------------------------------------------

/// Identifies one mutation for read-your-own-writes consistency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationToken {
    pub bucket_name: String,
    pub partition_id: u16,
    pub partition_uuid: PartitionUuid,
    pub sequence_number: SequenceNumber,
}

impl MutationToken {
    /// A token is only usable when it names a bucket and a partition history.
    pub fn is_valid(&self) -> bool {
        !self.bucket_name.is_empty() && !self.partition_uuid.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durability_names_round_trip_through_host_spelling() {
        assert_eq!(
            DurabilityLevel::from_name("majorityAndPersistToActive"),
            Some(DurabilityLevel::MajorityAndPersistToActive)
        );
        assert_eq!(DurabilityLevel::from_name("Majority"), None);
    }

    #[test]
    fn token_needs_bucket_and_partition_uuid() {
        let mut token = MutationToken {
            bucket_name: "travel".into(),
            partition_id: 12,
            partition_uuid: PartitionUuid::new(0),
            sequence_number: SequenceNumber::new(7),
        };
        assert!(!token.is_valid());
        token.partition_uuid = PartitionUuid::new(0xfeed);
        assert!(token.is_valid());

        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["partitionUuid"], "feed");
        assert_eq!(json["sequenceNumber"], "7");
    }
}
