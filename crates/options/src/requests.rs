//! Request builders: identifiers plus an option object in, typed request out.
//!
//! Each builder owns one descriptor table. Tables list keys in the order they
//! are validated; the first invalid key determines the returned error.

use std::collections::BTreeMap;
use std::time::Duration;

use cluster::operations::{
    AnalyticsRequest, AnalyticsScanConsistency, DesignDocumentNamespace, ExistsRequest,
    GetProjectedRequest, GetRequest, HighlightStyle, InsertRequest, QueryProfile, QueryRequest,
    QueryScanConsistency, RemoveRequest, ReplaceRequest, SearchIndex, SearchIndexUpsertRequest,
    SearchRequest, UpsertRequest, ViewRequest, ViewScanConsistency, ViewSortOrder,
};
use cluster::{
    location, Cas, CoreError, CoreResult, DocumentId, Durability, DurabilityLevel, MutationToken,
    PartitionUuid, SequenceNumber,
};
use serde_json::{Map, Value};

use crate::table::{populate, populate_object, OptionField, Setter};

// ---------------------------------------------------------------------------
// Shared setters
// ---------------------------------------------------------------------------

trait Timed {
    fn set_timeout(&mut self, timeout: Duration);
}

trait Durable {
    fn durability_mut(&mut self) -> &mut Durability;
}

macro_rules! timed {
    ($($request:ty),+ $(,)?) => {
        $(impl Timed for $request {
            fn set_timeout(&mut self, timeout: Duration) {
                self.timeout = Some(timeout);
            }
        })+
    };
}

macro_rules! durable {
    ($($request:ty),+ $(,)?) => {
        $(impl Durable for $request {
            fn durability_mut(&mut self) -> &mut Durability {
                &mut self.durability
            }
        })+
    };
}

timed!(
    GetRequest,
    GetProjectedRequest,
    ExistsRequest,
    UpsertRequest,
    InsertRequest,
    ReplaceRequest,
    RemoveRequest,
    QueryRequest,
    AnalyticsRequest,
    SearchRequest,
    ViewRequest,
    SearchIndexUpsertRequest,
);
durable!(UpsertRequest, InsertRequest, ReplaceRequest, RemoveRequest);

const TIMEOUT: &str = "timeoutMilliseconds";

fn timeout<R: Timed>(request: &mut R, value: Duration) {
    request.set_timeout(value);
}

fn durability_level<R: Durable>(request: &mut R, name: &str) -> CoreResult<()> {
    let level = DurabilityLevel::from_name(name).ok_or_else(|| {
        CoreError::invalid_argument(location!(), format!("unknown durabilityLevel: {name}"))
    })?;
    request.durability_mut().level = level;
    Ok(())
}

/// Only read when a durability level other than `none` was requested.
fn durability_timeout<R: Durable>(
    request: &mut R,
    name: &'static str,
    value: &Value,
) -> CoreResult<()> {
    let durability = request.durability_mut();
    if durability.level == DurabilityLevel::None {
        return Ok(());
    }
    let seconds = value.as_u64().ok_or_else(|| {
        CoreError::invalid_argument(
            location!(),
            format!("expected {name} to be a non-negative integer in the options"),
        )
    })?;
    durability.timeout = Some(Duration::from_secs(seconds));
    Ok(())
}

fn parse_cas(text: &str) -> CoreResult<Cas> {
    Cas::from_hex(text).ok_or_else(|| {
        CoreError::invalid_argument(
            location!(),
            format!("expected cas to be a hexadecimal string in the options, got \"{text}\""),
        )
    })
}

fn json_list(values: &[Value]) -> Vec<Value> {
    values.to_vec()
}

fn json_map(values: &Map<String, Value>) -> BTreeMap<String, Value> {
    values.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

fn invalid_code(what: &str, code: i64) -> CoreError {
    CoreError::invalid_argument(location!(), format!("invalid value used for {what}: {code}"))
}

// ---------------------------------------------------------------------------
// Mutation tokens (consistentWith)
// ---------------------------------------------------------------------------

/// Counter given either as a JSON integer or as the hex string this bridge
/// emits in mutation tokens.
fn counter(name: &str, value: &Value) -> CoreResult<u64> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => u64::from_str_radix(s.strip_prefix("0x").unwrap_or(s), 16).ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        CoreError::invalid_argument(
            location!(),
            format!(
                "expected {name} to be a non-negative integer or hexadecimal string \
                 in the mutation token"
            ),
        )
    })
}

const TOKEN_FIELDS: &[OptionField<MutationToken>] = &[
    OptionField::new("partitionId", Setter::U16(|t: &mut MutationToken, v| t.partition_id = v)),
    OptionField::new(
        "partitionUuid",
        Setter::Custom(|t: &mut MutationToken, name, v| {
            t.partition_uuid = PartitionUuid::new(counter(name, v)?);
            Ok(())
        }),
    ),
    OptionField::new(
        "sequenceNumber",
        Setter::Custom(|t: &mut MutationToken, name, v| {
            t.sequence_number = SequenceNumber::new(counter(name, v)?);
            Ok(())
        }),
    ),
    OptionField::new("bucketName", Setter::String(|t: &mut MutationToken, v| t.bucket_name = v)),
];

/// Reads every entry of a `consistentWith` array as its own token object.
fn mutation_state(items: &[Value]) -> CoreResult<Vec<MutationToken>> {
    items
        .iter()
        .map(|item| {
            let object = item.as_object().ok_or_else(|| {
                CoreError::invalid_argument(
                    location!(),
                    "expected consistentWith entries to be mutation token objects",
                )
            })?;
            let mut token = MutationToken::default();
            populate_object(&mut token, object, TOKEN_FIELDS)?;
            Ok(token)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Key-value
// ---------------------------------------------------------------------------

/// A document fetch: plain, or projected when expiry or paths were asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetOperation {
    Plain(GetRequest),
    Projected(GetProjectedRequest),
}

#[derive(Default)]
struct GetSelection {
    with_expiry: bool,
    projections: Vec<String>,
}

const GET_SELECTION_FIELDS: &[OptionField<GetSelection>] = &[
    OptionField::new("withExpiry", Setter::Boolean(|s: &mut GetSelection, v| s.with_expiry = v)),
    OptionField::new(
        "projections",
        Setter::StringList(|s: &mut GetSelection, v| s.projections = v),
    ),
];

const GET_FIELDS: &[OptionField<GetRequest>] =
    &[OptionField::new(TIMEOUT, Setter::Millis(timeout::<GetRequest>))];

const GET_PROJECTED_FIELDS: &[OptionField<GetProjectedRequest>] =
    &[OptionField::new(TIMEOUT, Setter::Millis(timeout::<GetProjectedRequest>))];

pub fn get_request(id: DocumentId, options: Option<&Value>) -> CoreResult<GetOperation> {
    let mut selection = GetSelection::default();
    populate(&mut selection, options, GET_SELECTION_FIELDS)?;

    if !selection.with_expiry && selection.projections.is_empty() {
        let mut request = GetRequest { id, timeout: None };
        populate(&mut request, options, GET_FIELDS)?;
        return Ok(GetOperation::Plain(request));
    }
    let mut request = GetProjectedRequest {
        id,
        with_expiry: selection.with_expiry,
        projections: selection.projections,
        timeout: None,
    };
    populate(&mut request, options, GET_PROJECTED_FIELDS)?;
    Ok(GetOperation::Projected(request))
}

const EXISTS_FIELDS: &[OptionField<ExistsRequest>] =
    &[OptionField::new(TIMEOUT, Setter::Millis(timeout::<ExistsRequest>))];

pub fn exists_request(id: DocumentId, options: Option<&Value>) -> CoreResult<ExistsRequest> {
    let mut request = ExistsRequest { id, timeout: None };
    populate(&mut request, options, EXISTS_FIELDS)?;
    Ok(request)
}

const UPSERT_FIELDS: &[OptionField<UpsertRequest>] = &[
    OptionField::new(TIMEOUT, Setter::Millis(timeout::<UpsertRequest>)),
    OptionField::new("durabilityLevel", Setter::Text(durability_level::<UpsertRequest>)),
    OptionField::new(
        "durabilityTimeoutSeconds",
        Setter::Custom(durability_timeout::<UpsertRequest>),
    ),
    OptionField::new(
        "preserveExpiry",
        Setter::Boolean(|r: &mut UpsertRequest, v| r.preserve_expiry = v),
    ),
    OptionField::new("expiry", Setter::U32(|r: &mut UpsertRequest, v| r.expiry = v)),
];

pub fn upsert_request(
    id: DocumentId,
    value: impl Into<String>,
    flags: u32,
    options: Option<&Value>,
) -> CoreResult<UpsertRequest> {
    let mut request = UpsertRequest {
        id,
        value: value.into(),
        flags,
        ..UpsertRequest::default()
    };
    populate(&mut request, options, UPSERT_FIELDS)?;
    Ok(request)
}

const INSERT_FIELDS: &[OptionField<InsertRequest>] = &[
    OptionField::new(TIMEOUT, Setter::Millis(timeout::<InsertRequest>)),
    OptionField::new("durabilityLevel", Setter::Text(durability_level::<InsertRequest>)),
    OptionField::new(
        "durabilityTimeoutSeconds",
        Setter::Custom(durability_timeout::<InsertRequest>),
    ),
    OptionField::new("expiry", Setter::U32(|r: &mut InsertRequest, v| r.expiry = v)),
];

pub fn insert_request(
    id: DocumentId,
    value: impl Into<String>,
    flags: u32,
    options: Option<&Value>,
) -> CoreResult<InsertRequest> {
    let mut request = InsertRequest {
        id,
        value: value.into(),
        flags,
        ..InsertRequest::default()
    };
    populate(&mut request, options, INSERT_FIELDS)?;
    Ok(request)
}

const REPLACE_FIELDS: &[OptionField<ReplaceRequest>] = &[
    OptionField::new(TIMEOUT, Setter::Millis(timeout::<ReplaceRequest>)),
    OptionField::new("durabilityLevel", Setter::Text(durability_level::<ReplaceRequest>)),
    OptionField::new(
        "durabilityTimeoutSeconds",
        Setter::Custom(durability_timeout::<ReplaceRequest>),
    ),
    OptionField::new(
        "preserveExpiry",
        Setter::Boolean(|r: &mut ReplaceRequest, v| r.preserve_expiry = v),
    ),
    OptionField::new("expiry", Setter::U32(|r: &mut ReplaceRequest, v| r.expiry = v)),
    OptionField::new(
        "cas",
        Setter::Text(|r: &mut ReplaceRequest, v| {
            r.cas = parse_cas(v)?;
            Ok(())
        }),
    ),
];

pub fn replace_request(
    id: DocumentId,
    value: impl Into<String>,
    flags: u32,
    options: Option<&Value>,
) -> CoreResult<ReplaceRequest> {
    let mut request = ReplaceRequest {
        id,
        value: value.into(),
        flags,
        ..ReplaceRequest::default()
    };
    populate(&mut request, options, REPLACE_FIELDS)?;
    Ok(request)
}

const REMOVE_FIELDS: &[OptionField<RemoveRequest>] = &[
    OptionField::new(TIMEOUT, Setter::Millis(timeout::<RemoveRequest>)),
    OptionField::new("durabilityLevel", Setter::Text(durability_level::<RemoveRequest>)),
    OptionField::new(
        "durabilityTimeoutSeconds",
        Setter::Custom(durability_timeout::<RemoveRequest>),
    ),
    OptionField::new(
        "cas",
        Setter::Text(|r: &mut RemoveRequest, v| {
            r.cas = parse_cas(v)?;
            Ok(())
        }),
    ),
];

pub fn remove_request(id: DocumentId, options: Option<&Value>) -> CoreResult<RemoveRequest> {
    let mut request = RemoveRequest {
        id,
        ..RemoveRequest::default()
    };
    populate(&mut request, options, REMOVE_FIELDS)?;
    Ok(request)
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

const QUERY_FIELDS: &[OptionField<QueryRequest>] = &[
    OptionField::new(TIMEOUT, Setter::Millis(timeout::<QueryRequest>)),
    OptionField::new(
        "scanConsistency",
        Setter::Integer(|r: &mut QueryRequest, v| {
            r.scan_consistency = match v {
                0 => None,
                1 => Some(QueryScanConsistency::NotBounded),
                2 => Some(QueryScanConsistency::RequestPlus),
                _ => return Err(invalid_code("scan consistency", v)),
            };
            Ok(())
        }),
    ),
    OptionField::new("scanCap", Setter::Unsigned(|r: &mut QueryRequest, v| r.scan_cap = Some(v))),
    OptionField::new(
        "pipelineCap",
        Setter::Unsigned(|r: &mut QueryRequest, v| r.pipeline_cap = Some(v)),
    ),
    OptionField::new(
        "pipelineBatch",
        Setter::Unsigned(|r: &mut QueryRequest, v| r.pipeline_batch = Some(v)),
    ),
    OptionField::new(
        "maxParallelism",
        Setter::Unsigned(|r: &mut QueryRequest, v| r.max_parallelism = Some(v)),
    ),
    OptionField::new(
        "profile",
        Setter::Integer(|r: &mut QueryRequest, v| {
            r.profile = match v {
                0 => None,
                1 => Some(QueryProfile::Off),
                2 => Some(QueryProfile::Phases),
                3 => Some(QueryProfile::Timings),
                _ => return Err(invalid_code("profile", v)),
            };
            Ok(())
        }),
    ),
    OptionField::new("readonly", Setter::Boolean(|r: &mut QueryRequest, v| r.readonly = v)),
    OptionField::new("flexIndex", Setter::Boolean(|r: &mut QueryRequest, v| r.flex_index = v)),
    OptionField::new("adHoc", Setter::Boolean(|r: &mut QueryRequest, v| r.adhoc = v)),
    OptionField::new(
        "positionalParameters",
        Setter::List(|r: &mut QueryRequest, v| {
            r.positional_parameters = json_list(v);
            Ok(())
        }),
    ),
    OptionField::new(
        "namedParameters",
        Setter::Object(|r: &mut QueryRequest, v| {
            r.named_parameters = json_map(v);
            Ok(())
        }),
    ),
    OptionField::new(
        "raw",
        Setter::Object(|r: &mut QueryRequest, v| {
            r.raw = json_map(v);
            Ok(())
        }),
    ),
    OptionField::new(
        "consistentWith",
        Setter::List(|r: &mut QueryRequest, v| {
            r.mutation_state = mutation_state(v)?;
            Ok(())
        }),
    ),
    OptionField::new(
        "clientContextId",
        Setter::String(|r: &mut QueryRequest, v| r.client_context_id = Some(v)),
    ),
    OptionField::new("metrics", Setter::Boolean(|r: &mut QueryRequest, v| r.metrics = v)),
    OptionField::new(
        "preserveExpiry",
        Setter::Boolean(|r: &mut QueryRequest, v| r.preserve_expiry = v),
    ),
    OptionField::new("scopeName", Setter::String(|r: &mut QueryRequest, v| r.scope_name = Some(v))),
    OptionField::new(
        "bucketName",
        Setter::String(|r: &mut QueryRequest, v| r.bucket_name = Some(v)),
    ),
];

pub fn query_request(
    statement: impl Into<String>,
    options: Option<&Value>,
) -> CoreResult<QueryRequest> {
    let mut request = QueryRequest::new(statement);
    populate(&mut request, options, QUERY_FIELDS)?;
    Ok(request)
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

const ANALYTICS_FIELDS: &[OptionField<AnalyticsRequest>] = &[
    OptionField::new(TIMEOUT, Setter::Millis(timeout::<AnalyticsRequest>)),
    OptionField::new(
        "scanConsistency",
        Setter::Integer(|r: &mut AnalyticsRequest, v| {
            r.scan_consistency = match v {
                0 => None,
                1 => Some(AnalyticsScanConsistency::NotBounded),
                2 => Some(AnalyticsScanConsistency::RequestPlus),
                _ => return Err(invalid_code("scan consistency", v)),
            };
            Ok(())
        }),
    ),
    OptionField::new("readonly", Setter::Boolean(|r: &mut AnalyticsRequest, v| r.readonly = v)),
    OptionField::new("priority", Setter::Boolean(|r: &mut AnalyticsRequest, v| r.priority = v)),
    OptionField::new(
        "positionalParameters",
        Setter::List(|r: &mut AnalyticsRequest, v| {
            r.positional_parameters = json_list(v);
            Ok(())
        }),
    ),
    OptionField::new(
        "namedParameters",
        Setter::Object(|r: &mut AnalyticsRequest, v| {
            r.named_parameters = json_map(v);
            Ok(())
        }),
    ),
    OptionField::new(
        "raw",
        Setter::Object(|r: &mut AnalyticsRequest, v| {
            r.raw = json_map(v);
            Ok(())
        }),
    ),
    OptionField::new(
        "clientContextId",
        Setter::String(|r: &mut AnalyticsRequest, v| r.client_context_id = Some(v)),
    ),
    OptionField::new(
        "scopeName",
        Setter::String(|r: &mut AnalyticsRequest, v| r.scope_name = Some(v)),
    ),
    OptionField::new(
        "bucketName",
        Setter::String(|r: &mut AnalyticsRequest, v| r.bucket_name = Some(v)),
    ),
];

pub fn analytics_request(
    statement: impl Into<String>,
    options: Option<&Value>,
) -> CoreResult<AnalyticsRequest> {
    let mut request = AnalyticsRequest::new(statement);
    populate(&mut request, options, ANALYTICS_FIELDS)?;
    Ok(request)
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

const SEARCH_FIELDS: &[OptionField<SearchRequest>] = &[
    OptionField::new(TIMEOUT, Setter::Millis(timeout::<SearchRequest>)),
    OptionField::new("limit", Setter::U32(|r: &mut SearchRequest, v| r.limit = Some(v))),
    OptionField::new("skip", Setter::U32(|r: &mut SearchRequest, v| r.skip = Some(v))),
    OptionField::new("explain", Setter::Boolean(|r: &mut SearchRequest, v| r.explain = v)),
    OptionField::new(
        "disableScoring",
        Setter::Boolean(|r: &mut SearchRequest, v| r.disable_scoring = v),
    ),
    OptionField::new(
        "includeLocations",
        Setter::Boolean(|r: &mut SearchRequest, v| r.include_locations = v),
    ),
    OptionField::new(
        "highlightFields",
        Setter::StringList(|r: &mut SearchRequest, v| r.highlight_fields = v),
    ),
    OptionField::new("fields", Setter::StringList(|r: &mut SearchRequest, v| r.fields = v)),
    OptionField::new(
        "collections",
        Setter::StringList(|r: &mut SearchRequest, v| r.collections = v),
    ),
    OptionField::new("sortSpecs", Setter::StringList(|r: &mut SearchRequest, v| r.sort_specs = v)),
    OptionField::new(
        "highlightStyle",
        Setter::Integer(|r: &mut SearchRequest, v| {
            r.highlight_style = match v {
                0 => None,
                1 => Some(HighlightStyle::Ansi),
                2 => Some(HighlightStyle::Html),
                _ => return Err(invalid_code("highlight style", v)),
            };
            Ok(())
        }),
    ),
    OptionField::new(
        "consistentWith",
        Setter::List(|r: &mut SearchRequest, v| {
            r.mutation_state = mutation_state(v)?;
            Ok(())
        }),
    ),
    OptionField::new(
        "raw",
        Setter::Object(|r: &mut SearchRequest, v| {
            r.raw = json_map(v);
            Ok(())
        }),
    ),
    OptionField::new(
        "facets",
        Setter::Object(|r: &mut SearchRequest, v| {
            r.facets = json_map(v);
            Ok(())
        }),
    ),
    OptionField::new(
        "clientContextId",
        Setter::String(|r: &mut SearchRequest, v| r.client_context_id = Some(v)),
    ),
];

pub fn search_request(
    index_name: impl Into<String>,
    query: impl Into<String>,
    options: Option<&Value>,
) -> CoreResult<SearchRequest> {
    let mut request = SearchRequest::new(index_name, query);
    populate(&mut request, options, SEARCH_FIELDS)?;
    Ok(request)
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Host code for a design-document namespace: 1 development, 2 production.
pub fn design_document_namespace(code: i64) -> CoreResult<DesignDocumentNamespace> {
    match code {
        1 => Ok(DesignDocumentNamespace::Development),
        2 => Ok(DesignDocumentNamespace::Production),
        _ => Err(invalid_code("namespace", code)),
    }
}

const VIEW_FIELDS: &[OptionField<ViewRequest>] = &[
    OptionField::new(TIMEOUT, Setter::Millis(timeout::<ViewRequest>)),
    OptionField::new(
        "scanConsistency",
        Setter::Integer(|r: &mut ViewRequest, v| {
            r.consistency = match v {
                0 => None,
                1 => Some(ViewScanConsistency::NotBounded),
                2 => Some(ViewScanConsistency::RequestPlus),
                3 => Some(ViewScanConsistency::UpdateAfter),
                _ => return Err(invalid_code("scan consistency", v)),
            };
            Ok(())
        }),
    ),
    OptionField::new("keys", Setter::StringList(|r: &mut ViewRequest, v| r.keys = v)),
    OptionField::new(
        "order",
        Setter::Integer(|r: &mut ViewRequest, v| {
            r.order = match v {
                0 => Some(ViewSortOrder::Ascending),
                1 => Some(ViewSortOrder::Descending),
                _ => return Err(invalid_code("order", v)),
            };
            Ok(())
        }),
    ),
    OptionField::new("reduce", Setter::Boolean(|r: &mut ViewRequest, v| r.reduce = Some(v))),
    OptionField::new("group", Setter::Boolean(|r: &mut ViewRequest, v| r.group = Some(v))),
    OptionField::new("groupLevel", Setter::U32(|r: &mut ViewRequest, v| r.group_level = Some(v))),
    OptionField::new("limit", Setter::U32(|r: &mut ViewRequest, v| r.limit = Some(v))),
    OptionField::new("skip", Setter::U32(|r: &mut ViewRequest, v| r.skip = Some(v))),
    OptionField::new("key", Setter::String(|r: &mut ViewRequest, v| r.key = Some(v))),
    OptionField::new("startKey", Setter::String(|r: &mut ViewRequest, v| r.start_key = Some(v))),
    OptionField::new("endKey", Setter::String(|r: &mut ViewRequest, v| r.end_key = Some(v))),
    OptionField::new(
        "startKeyDocId",
        Setter::String(|r: &mut ViewRequest, v| r.start_key_doc_id = Some(v)),
    ),
    OptionField::new(
        "endKeyDocId",
        Setter::String(|r: &mut ViewRequest, v| r.end_key_doc_id = Some(v)),
    ),
    OptionField::new(
        "inclusiveEnd",
        Setter::Boolean(|r: &mut ViewRequest, v| r.inclusive_end = Some(v)),
    ),
    OptionField::new("debug", Setter::Boolean(|r: &mut ViewRequest, v| r.debug = v)),
];

pub fn view_request(
    bucket_name: impl Into<String>,
    design_document_name: impl Into<String>,
    view_name: impl Into<String>,
    name_space: i64,
    options: Option<&Value>,
) -> CoreResult<ViewRequest> {
    let mut request = ViewRequest {
        bucket_name: bucket_name.into(),
        design_document_name: design_document_name.into(),
        view_name: view_name.into(),
        name_space: design_document_namespace(name_space)?,
        ..ViewRequest::default()
    };
    populate(&mut request, options, VIEW_FIELDS)?;
    Ok(request)
}

// ---------------------------------------------------------------------------
// Search index management
// ---------------------------------------------------------------------------

const SEARCH_INDEX_FIELDS: &[OptionField<SearchIndex>] = &[
    OptionField::new("name", Setter::String(|i: &mut SearchIndex, v| i.name = v)),
    OptionField::new("type", Setter::String(|i: &mut SearchIndex, v| i.type_ = v)),
    OptionField::new("uuid", Setter::String(|i: &mut SearchIndex, v| i.uuid = v)),
    OptionField::new("params", Setter::String(|i: &mut SearchIndex, v| i.params_json = v)),
    OptionField::new("sourceUuid", Setter::String(|i: &mut SearchIndex, v| i.source_uuid = v)),
    OptionField::new("sourceName", Setter::String(|i: &mut SearchIndex, v| i.source_name = v)),
    OptionField::new("sourceType", Setter::String(|i: &mut SearchIndex, v| i.source_type = v)),
    OptionField::new(
        "sourceParams",
        Setter::String(|i: &mut SearchIndex, v| i.source_params_json = v),
    ),
];

const SEARCH_INDEX_UPSERT_FIELDS: &[OptionField<SearchIndexUpsertRequest>] =
    &[OptionField::new(TIMEOUT, Setter::Millis(timeout::<SearchIndexUpsertRequest>))];

pub fn search_index_upsert_request(
    index: &Value,
    options: Option<&Value>,
) -> CoreResult<SearchIndexUpsertRequest> {
    let definition = index.as_object().ok_or_else(|| {
        CoreError::invalid_argument(location!(), "expected object for search index definition")
    })?;
    let mut request = SearchIndexUpsertRequest::default();
    populate_object(&mut request.index, definition, SEARCH_INDEX_FIELDS)?;
    populate(&mut request, options, SEARCH_INDEX_UPSERT_FIELDS)?;
    Ok(request)
}
