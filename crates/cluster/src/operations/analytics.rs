//! Analytics query execution.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::diagnostics::AnalyticsDiagnostics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalyticsScanConsistency {
    NotBounded,
    RequestPlus,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsRequest {
    pub statement: String,
    pub timeout: Option<Duration>,
    pub scan_consistency: Option<AnalyticsScanConsistency>,
    pub readonly: bool,
    pub priority: bool,
    pub positional_parameters: Vec<Value>,
    pub named_parameters: BTreeMap<String, Value>,
    pub raw: BTreeMap<String, Value>,
    pub client_context_id: Option<String>,
    pub scope_name: Option<String>,
    pub bucket_name: Option<String>,
}

impl AnalyticsRequest {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalyticsProblem {
    pub code: u64,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsMetrics {
    pub elapsed_time_milliseconds: u64,
    pub execution_time_milliseconds: u64,
    pub result_count: u64,
    pub result_size: u64,
    pub error_count: u64,
    pub processed_objects: u64,
    pub warning_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsMeta {
    pub request_id: String,
    pub client_context_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    pub metrics: AnalyticsMetrics,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<AnalyticsProblem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalyticsResponse {
    #[serde(skip)]
    pub ctx: AnalyticsDiagnostics,
    pub rows: Vec<String>,
    pub meta: AnalyticsMeta,
}
