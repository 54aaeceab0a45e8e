//! Full-text search queries.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use super::MutationToken;
use crate::diagnostics::SearchDiagnostics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HighlightStyle {
    Ansi,
    Html,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    pub index_name: String,
    /// Encoded JSON query body.
    pub query: String,
    pub timeout: Option<Duration>,
    pub limit: Option<u32>,
    pub skip: Option<u32>,
    pub explain: bool,
    pub disable_scoring: bool,
    pub include_locations: bool,
    pub highlight_style: Option<HighlightStyle>,
    pub highlight_fields: Vec<String>,
    pub fields: Vec<String>,
    pub collections: Vec<String>,
    pub sort_specs: Vec<String>,
    pub mutation_state: Vec<MutationToken>,
    pub raw: BTreeMap<String, Value>,
    pub facets: BTreeMap<String, Value>,
    pub client_context_id: Option<String>,
}

impl SearchRequest {
    pub fn new(index_name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            query: query.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchLocation {
    pub field: String,
    pub term: String,
    pub position: u64,
    pub start_offset: u64,
    pub end_offset: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_positions: Option<Vec<u64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchRow {
    pub index: String,
    pub id: String,
    pub score: f64,
    pub explanation: String,
    pub fields: String,
    pub locations: Vec<SearchLocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMetrics {
    pub took_milliseconds: u64,
    pub total_rows: u64,
    pub max_score: f64,
    pub success_partition_count: u64,
    pub error_partition_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMeta {
    pub client_context_id: String,
    pub metrics: SearchMetrics,
    pub errors: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TermFacet {
    pub term: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DateRangeFacet {
    pub name: String,
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NumericRangeFacet {
    pub name: String,
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFacet {
    pub name: String,
    pub field: String,
    pub total: u64,
    pub missing: u64,
    pub other: u64,
    pub terms: Vec<TermFacet>,
    pub date_ranges: Vec<DateRangeFacet>,
    pub numeric_ranges: Vec<NumericRangeFacet>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResponse {
    #[serde(skip)]
    pub ctx: SearchDiagnostics,
    pub status: String,
    pub error: String,
    pub rows: Vec<SearchRow>,
    pub meta: SearchMeta,
    pub facets: Vec<SearchFacet>,
}
