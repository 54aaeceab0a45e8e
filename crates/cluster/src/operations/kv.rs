//! Key-value document operations.

use std::time::Duration;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use super::{Durability, MutationToken};
use crate::diagnostics::KeyValueDiagnostics;
use crate::identifiers::{Cas, DocumentId, SequenceNumber};

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetRequest {
    pub id: DocumentId,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GetResponse {
    #[serde(skip)]
    pub ctx: KeyValueDiagnostics,
    pub cas: Cas,
    pub flags: u32,
    pub value: String,
}

/// Fetch of a subset of paths, or of the document plus its expiry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetProjectedRequest {
    pub id: DocumentId,
    pub with_expiry: bool,
    pub projections: Vec<String>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GetProjectedResponse {
    #[serde(skip)]
    pub ctx: KeyValueDiagnostics,
    pub cas: Cas,
    pub flags: u32,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistsRequest {
    pub id: DocumentId,
    pub timeout: Option<Duration>,
}

/// Metadata of a document, or of its tombstone.
///
/// A missing document completes with `document_not_found` in `ctx` and the
/// default field values; callers treat that as a regular answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistsResponse {
    pub ctx: KeyValueDiagnostics,
    pub document_exists: bool,
    pub deleted: bool,
    pub cas: Cas,
    pub flags: u32,
    pub datatype: u8,
    pub expiry: u32,
    pub sequence_number: SequenceNumber,
}

impl ExistsResponse {
    /// Live document: present and not a tombstone.
    pub fn exists(&self) -> bool {
        self.document_exists && !self.deleted
    }
}

impl Serialize for ExistsResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_struct("ExistsResponse", 7)?;
        out.serialize_field("exists", &self.exists())?;
        out.serialize_field("deleted", &self.deleted)?;
        out.serialize_field("cas", &self.cas)?;
        out.serialize_field("flags", &self.flags)?;
        out.serialize_field("datatype", &self.datatype)?;
        out.serialize_field("expiry", &self.expiry)?;
        out.serialize_field("sequenceNumber", &self.sequence_number)?;
        out.end()
    }
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertRequest {
    pub id: DocumentId,
    pub value: String,
    pub flags: u32,
    pub timeout: Option<Duration>,
    pub durability: Durability,
    pub expiry: u32,
    pub preserve_expiry: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertRequest {
    pub id: DocumentId,
    pub value: String,
    pub flags: u32,
    pub timeout: Option<Duration>,
    pub durability: Durability,
    pub expiry: u32,
}

/// Replacement of an existing document, optionally guarded by its CAS.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceRequest {
    pub id: DocumentId,
    pub value: String,
    pub flags: u32,
    pub timeout: Option<Duration>,
    pub durability: Durability,
    pub expiry: u32,
    pub preserve_expiry: bool,
    pub cas: Cas,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveRequest {
    pub id: DocumentId,
    pub timeout: Option<Duration>,
    pub durability: Durability,
    pub cas: Cas,
}

/// Outcome shared by every mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResponse {
    #[serde(skip)]
    pub ctx: KeyValueDiagnostics,
    pub cas: Cas,
    #[serde(rename = "mutationToken", skip_serializing_if = "invalid_token")]
    pub token: MutationToken,
}

fn invalid_token(token: &MutationToken) -> bool {
    !token.is_valid()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::PartitionUuid;

    #[test]
    fn tombstone_does_not_exist() {
        let resp = ExistsResponse {
            document_exists: true,
            deleted: true,
            ..ExistsResponse::default()
        };
        assert!(!resp.exists());
        assert_eq!(serde_json::to_value(&resp).unwrap()["exists"], false);
    }

    #[test]
    fn missing_document_projects_default_metadata() {
        let json = serde_json::to_value(ExistsResponse::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "exists": false,
                "deleted": false,
                "cas": "0",
                "flags": 0,
                "datatype": 0,
                "expiry": 0,
                "sequenceNumber": "0",
            })
        );
    }

    #[test]
    fn mutation_projection_omits_invalid_token() {
        let mut resp = MutationResponse {
            cas: Cas::new(0x1f),
            ..MutationResponse::default()
        };
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            serde_json::json!({ "cas": "1f" })
        );

        resp.token = MutationToken {
            bucket_name: "travel".into(),
            partition_id: 3,
            partition_uuid: PartitionUuid::new(0xab),
            sequence_number: SequenceNumber::new(2),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["mutationToken"]["partitionId"], 3);
        assert_eq!(json["mutationToken"]["bucketName"], "travel");
    }
}
