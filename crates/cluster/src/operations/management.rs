//! Administrative requests: search index definitions and cluster description.

use std::time::Duration;

use serde::Serialize;

use crate::diagnostics::HttpDiagnostics;

/// Definition of a full-text search index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchIndex {
    pub uuid: String,
    pub name: String,
    pub type_: String,
    pub params_json: String,
    pub source_uuid: String,
    pub source_name: String,
    pub source_type: String,
    pub source_params_json: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchIndexUpsertRequest {
    pub index: SearchIndex,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchIndexUpsertResponse {
    #[serde(skip)]
    pub ctx: HttpDiagnostics,
    pub status: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterDescribeRequest {
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodeInfo {
    pub hostname: String,
    pub version: String,
    pub services: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterInfo {
    pub nodes: Vec<NodeInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterDescribeResponse {
    #[serde(skip)]
    pub ctx: HttpDiagnostics,
    pub info: ClusterInfo,
}

impl ClusterDescribeResponse {
    /// Version of the first node listed, if any node is known.
    pub fn first_node_version(&self) -> Option<&str> {
        self.info.nodes.first().map(|node| node.version.as_str())
    }
}
