//! Cluster contents loaded from JSON.
//!
//! ```json
//! {
//!   "buckets": ["travel"],
//!   "users": { "Administrator": "password" },
//!   "documents": [
//!     { "bucket": "travel", "key": "airline_10", "value": { "name": "40-Mile Air" } }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use cluster::operations::NodeInfo;
use cluster::{DocumentId, ErrorCode, DEFAULT_COLLECTION};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::memory::MemoryCluster;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("fixture is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("document \"{key}\" names bucket \"{bucket}\", which the fixture does not declare")]
    UnknownBucket { bucket: String, key: String },

    #[error("document \"{key}\" could not be stored: {code}")]
    Store { key: String, code: ErrorCode },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FixtureNode {
    pub hostname: String,
    pub version: String,
    pub services: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureDocument {
    pub bucket: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
    pub key: String,
    /// Strings are stored verbatim; anything else is stored as its JSON text.
    pub value: Value,
    #[serde(default)]
    pub flags: u32,
}

impl FixtureDocument {
    fn id(&self) -> DocumentId {
        DocumentId::new(
            self.bucket.as_str(),
            self.scope.as_deref().unwrap_or(DEFAULT_COLLECTION),
            self.collection.as_deref().unwrap_or(DEFAULT_COLLECTION),
            self.key.as_str(),
        )
    }

    fn body(&self) -> String {
        match &self.value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Fixture {
    /// Replaces the default single node when non-empty.
    pub nodes: Vec<FixtureNode>,
    pub buckets: Vec<String>,
    pub users: BTreeMap<String, String>,
    pub documents: Vec<FixtureDocument>,
    pub unreachable: bool,
    pub describe_requires_bucket: bool,
    pub latency_milliseconds: u64,
}

impl Fixture {
    pub fn from_json(text: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(text)?)
    }
}

impl MemoryCluster {
    /// Cluster holding everything `fixture` declares.
    pub fn from_fixture(fixture: &Fixture) -> Result<Self, FixtureError> {
        let mut cluster = MemoryCluster::new();
        if !fixture.nodes.is_empty() {
            cluster = cluster.with_nodes(
                fixture
                    .nodes
                    .iter()
                    .map(|node| NodeInfo {
                        hostname: node.hostname.clone(),
                        version: node.version.clone(),
                        services: node.services.clone(),
                    })
                    .collect(),
            );
        }
        for bucket in &fixture.buckets {
            cluster = cluster.with_bucket(bucket);
        }
        for (username, password) in &fixture.users {
            cluster = cluster.with_user(username, password);
        }
        if fixture.unreachable {
            cluster = cluster.unreachable();
        }
        if fixture.describe_requires_bucket {
            cluster = cluster.describe_requires_bucket();
        }
        if fixture.latency_milliseconds > 0 {
            cluster = cluster.with_latency(Duration::from_millis(fixture.latency_milliseconds));
        }

        for document in &fixture.documents {
            if !fixture.buckets.contains(&document.bucket) {
                return Err(FixtureError::UnknownBucket {
                    bucket: document.bucket.clone(),
                    key: document.key.clone(),
                });
            }
            cluster
                .insert_document(&document.id(), &document.body(), document.flags)
                .map_err(|code| FixtureError::Store {
                    key: document.key.clone(),
                    code,
                })?;
        }
        Ok(cluster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_populates_buckets_users_and_documents() {
        let fixture = Fixture::from_json(
            r#"{
                "buckets": ["travel"],
                "users": { "Administrator": "password" },
                "describeRequiresBucket": true,
                "documents": [
                    {
                        "bucket": "travel",
                        "key": "airline_10",
                        "value": { "name": "40-Mile Air" },
                        "flags": 33554432
                    },
                    {
                        "bucket": "travel",
                        "scope": "inventory",
                        "collection": "hotel",
                        "key": "h1",
                        "value": "plain"
                    }
                ]
            }"#,
        )
        .unwrap();
        let cluster = MemoryCluster::from_fixture(&fixture).unwrap();

        let state = cluster.shared.state.lock();
        let airline = state
            .store
            .get(&DocumentId::in_default_collection("travel", "airline_10"))
            .unwrap();
        assert_eq!(airline.value, r#"{"name":"40-Mile Air"}"#);
        assert_eq!(airline.flags, 33_554_432);
        let hotel = state
            .store
            .get(&DocumentId::new("travel", "inventory", "hotel", "h1"))
            .unwrap();
        assert_eq!(hotel.value, "plain");
        assert!(state.describe_requires_bucket);
        assert_eq!(state.users.get("Administrator").map(String::as_str), Some("password"));
    }

    #[test]
    fn documents_must_name_a_declared_bucket() {
        let fixture = Fixture::from_json(
            r#"{ "documents": [ { "bucket": "beer", "key": "k", "value": {} } ] }"#,
        )
        .unwrap();
        let err = MemoryCluster::from_fixture(&fixture).unwrap_err();
        assert!(matches!(err, FixtureError::UnknownBucket { ref bucket, .. } if bucket == "beer"));
    }

    #[test]
    fn malformed_fixture_is_a_parse_error() {
        assert!(matches!(Fixture::from_json("{"), Err(FixtureError::Parse(_))));
    }
}
