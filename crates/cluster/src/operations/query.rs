//! N1QL query execution.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use super::MutationToken;
use crate::diagnostics::QueryDiagnostics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryScanConsistency {
    NotBounded,
    RequestPlus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryProfile {
    Off,
    Phases,
    Timings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub statement: String,
    pub timeout: Option<Duration>,
    pub scan_consistency: Option<QueryScanConsistency>,
    pub scan_cap: Option<u64>,
    pub pipeline_cap: Option<u64>,
    pub pipeline_batch: Option<u64>,
    pub max_parallelism: Option<u64>,
    pub profile: Option<QueryProfile>,
    pub readonly: bool,
    pub flex_index: bool,
    pub adhoc: bool,
    pub positional_parameters: Vec<Value>,
    pub named_parameters: BTreeMap<String, Value>,
    pub raw: BTreeMap<String, Value>,
    pub mutation_state: Vec<MutationToken>,
    pub client_context_id: Option<String>,
    pub metrics: bool,
    pub preserve_expiry: bool,
    pub scope_name: Option<String>,
    pub bucket_name: Option<String>,
}

impl QueryRequest {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            timeout: None,
            scan_consistency: None,
            scan_cap: None,
            pipeline_cap: None,
            pipeline_batch: None,
            max_parallelism: None,
            profile: None,
            readonly: false,
            flex_index: false,
            adhoc: true,
            positional_parameters: Vec::new(),
            named_parameters: BTreeMap::new(),
            raw: BTreeMap::new(),
            mutation_state: Vec::new(),
            client_context_id: None,
            metrics: false,
            preserve_expiry: false,
            scope_name: None,
            bucket_name: None,
        }
    }
}

/// Error or warning reported by the query service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryProblem {
    pub code: u64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMetrics {
    pub elapsed_time_milliseconds: u64,
    pub execution_time_milliseconds: u64,
    pub result_count: u64,
    pub result_size: u64,
    pub sort_count: u64,
    pub mutation_count: u64,
    pub error_count: u64,
    pub warning_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMeta {
    pub request_id: String,
    pub client_context_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<QueryMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<QueryProblem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<QueryProblem>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(skip)]
    pub ctx: QueryDiagnostics,
    pub served_by_node: String,
    /// Encoded JSON rows, in the order the service returned them.
    pub rows: Vec<String>,
    pub meta: QueryMeta,
}
