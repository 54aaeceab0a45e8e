//! Public operations: populate, submit, translate the embedded code.
//!
//! Every operation follows the same steps. The option map is turned into a
//! typed request (a validation error stops here, before anything reaches the
//! client). The request goes through the bridge. A response carrying an error
//! code becomes a [`CoreError`] with the context of its service; otherwise the
//! response itself is returned.

use cluster::operations::{
    AnalyticsResponse, ExistsResponse, GetProjectedResponse, GetResponse, MutationResponse,
    QueryResponse, SearchIndexUpsertResponse, SearchResponse, ViewResponse,
};
use cluster::{
    location, Cas, ClusterRequest, ClusterResponse, CoreError, CoreResult, DocumentId, ErrorCode,
};
use options::GetOperation;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::handle::Connection;

/// A fetched document, plain or projected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GetResult {
    Document(GetResponse),
    Projected(GetProjectedResponse),
}

impl GetResult {
    pub fn cas(&self) -> Cas {
        match self {
            GetResult::Document(r) => r.cas,
            GetResult::Projected(r) => r.cas,
        }
    }

    pub fn flags(&self) -> u32 {
        match self {
            GetResult::Document(r) => r.flags,
            GetResult::Projected(r) => r.flags,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            GetResult::Document(r) => &r.value,
            GetResult::Projected(r) => &r.value,
        }
    }

    /// Expiry, when it was requested.
    pub fn expiry(&self) -> Option<u32> {
        match self {
            GetResult::Document(_) => None,
            GetResult::Projected(r) => r.expiry,
        }
    }
}

fn key_value_message(operation: &str, code: ErrorCode) -> String {
    format!(
        r#"unable to execute KV operation "{operation}": {}, {}"#,
        code.value(),
        code
    )
}

impl Connection {
    /// Submits `request`; a response with an embedded code becomes an error
    /// whose message is built by `describe`.
    fn execute_checked<R, D>(&self, request: R, describe: D) -> CoreResult<R::Response>
    where
        R: ClusterRequest,
        D: FnOnce(ErrorCode) -> String,
    {
        let response = self.bridge.dispatch(self.client.as_ref(), request)?;
        match response.error_code() {
            None => Ok(response),
            Some(code) => {
                debug!(
                    connection_id = %self.id,
                    operation = R::NAME,
                    error_code = code.value(),
                    "Operation failed"
                );
                Err(CoreError::with_message(code, location!(), describe(code))
                    .with_context(response.error_context()))
            }
        }
    }

    fn key_value<R: ClusterRequest>(&self, operation: &str, request: R) -> CoreResult<R::Response> {
        self.execute_checked(request, |code| key_value_message(operation, code))
    }

    /// Fetches a document. `withExpiry` or `projections` switch to a
    /// projected fetch.
    pub fn document_get(&self, id: DocumentId, options: Option<&Value>) -> CoreResult<GetResult> {
        match options::get_request(id, options)? {
            GetOperation::Plain(request) => self
                .key_value("document_get", request)
                .map(GetResult::Document),
            GetOperation::Projected(request) => self
                .key_value("document_get", request)
                .map(GetResult::Projected),
        }
    }

    /// Looks a document up without fetching it.
    ///
    /// A missing document is an answer, not a failure: the response comes
    /// back with `exists() == false` and default metadata.
    pub fn document_exists(
        &self,
        id: DocumentId,
        options: Option<&Value>,
    ) -> CoreResult<ExistsResponse> {
        let request = options::exists_request(id, options)?;
        let response = self.bridge.dispatch(self.client.as_ref(), request)?;
        match response.error_code() {
            None | Some(ErrorCode::DocumentNotFound) => Ok(response),
            Some(code) => Err(CoreError::with_message(
                code,
                location!(),
                key_value_message("document_exists", code),
            )
            .with_context(response.error_context())),
        }
    }

    pub fn document_upsert(
        &self,
        id: DocumentId,
        value: &str,
        flags: u32,
        options: Option<&Value>,
    ) -> CoreResult<MutationResponse> {
        let request = options::upsert_request(id, value, flags, options)?;
        self.key_value("document_upsert", request)
    }

    pub fn document_insert(
        &self,
        id: DocumentId,
        value: &str,
        flags: u32,
        options: Option<&Value>,
    ) -> CoreResult<MutationResponse> {
        let request = options::insert_request(id, value, flags, options)?;
        self.key_value("document_insert", request)
    }

    pub fn document_replace(
        &self,
        id: DocumentId,
        value: &str,
        flags: u32,
        options: Option<&Value>,
    ) -> CoreResult<MutationResponse> {
        let request = options::replace_request(id, value, flags, options)?;
        self.key_value("document_replace", request)
    }

    pub fn document_remove(
        &self,
        id: DocumentId,
        options: Option<&Value>,
    ) -> CoreResult<MutationResponse> {
        let request = options::remove_request(id, options)?;
        self.key_value("document_remove", request)
    }

    /// Runs a N1QL statement.
    pub fn query(&self, statement: &str, options: Option<&Value>) -> CoreResult<QueryResponse> {
        let request = options::query_request(statement, options)?;
        self.execute_checked(request, |code| {
            format!("unable to query: {}, {}", code.value(), code)
        })
    }

    pub fn analytics_query(
        &self,
        statement: &str,
        options: Option<&Value>,
    ) -> CoreResult<AnalyticsResponse> {
        let request = options::analytics_request(statement, options)?;
        self.execute_checked(request, |code| {
            format!("unable to query: {}, {}", code.value(), code)
        })
    }

    /// Queries a view. `name_space` is the host code of the design-document
    /// namespace (1 development, 2 production).
    pub fn view_query(
        &self,
        bucket_name: &str,
        design_document_name: &str,
        view_name: &str,
        name_space: i64,
        options: Option<&Value>,
    ) -> CoreResult<ViewResponse> {
        let request = options::view_request(
            bucket_name,
            design_document_name,
            view_name,
            name_space,
            options,
        )?;
        self.execute_checked(request, |code| {
            format!("unable to view query: {}, {}", code.value(), code)
        })
    }

    pub fn search_query(
        &self,
        index_name: &str,
        query: &str,
        options: Option<&Value>,
    ) -> CoreResult<SearchResponse> {
        let request = options::search_request(index_name, query, options)?;
        self.execute_checked(request, |code| {
            format!("unable to search query: {}, {}", code.value(), code)
        })
    }

    /// Creates or updates a full-text index from its definition object.
    pub fn search_index_upsert(
        &self,
        index: &Value,
        options: Option<&Value>,
    ) -> CoreResult<SearchIndexUpsertResponse> {
        let request = options::search_index_upsert_request(index, options)?;
        self.execute_checked(request, |code| {
            format!("unable to upsert search index: {}, {}", code.value(), code)
        })
    }
}
