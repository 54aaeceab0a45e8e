//! Map/reduce view queries.

use std::time::Duration;

use serde::Serialize;

use crate::diagnostics::ViewDiagnostics;

/// Which copy of a design document a view query runs against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DesignDocumentNamespace {
    Development,
    #[default]
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewScanConsistency {
    NotBounded,
    RequestPlus,
    UpdateAfter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewSortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewRequest {
    pub bucket_name: String,
    pub design_document_name: String,
    pub view_name: String,
    pub name_space: DesignDocumentNamespace,
    pub timeout: Option<Duration>,
    pub consistency: Option<ViewScanConsistency>,
    pub keys: Vec<String>,
    pub order: Option<ViewSortOrder>,
    pub reduce: Option<bool>,
    pub group: Option<bool>,
    pub group_level: Option<u32>,
    pub limit: Option<u32>,
    pub skip: Option<u32>,
    pub key: Option<String>,
    pub start_key: Option<String>,
    pub end_key: Option<String>,
    pub start_key_doc_id: Option<String>,
    pub end_key_doc_id: Option<String>,
    pub inclusive_end: Option<bool>,
    pub debug: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewResponse {
    #[serde(skip)]
    pub ctx: ViewDiagnostics,
    pub rows: Vec<ViewRow>,
    pub meta: ViewMeta,
}
