//! Buckets and documents, with CAS, sequence numbers and tombstones.

use std::collections::{BTreeMap, HashMap};

use cluster::{Cas, DocumentId, ErrorCode, MutationToken, PartitionUuid, SequenceNumber};
use serde_json::{Map, Value};

/// Partitions per bucket.
pub const PARTITION_COUNT: u16 = 1024;

const FIRST_CAS: u64 = 0x16f0_0000_0000_0000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub value: String,
    pub flags: u32,
    pub cas: Cas,
    pub expiry: u32,
    pub sequence_number: SequenceNumber,
    pub deleted: bool,
}

/// Outcome of a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub cas: Cas,
    pub token: MutationToken,
}

/// Body of a write.
#[derive(Debug, Clone, Default)]
pub struct Write<'a> {
    pub value: &'a str,
    pub flags: u32,
    pub expiry: u32,
    pub preserve_expiry: bool,
}

type CollectionKey = (String, String, String);

#[derive(Debug)]
struct Bucket {
    partition_uuid: PartitionUuid,
    sequence_number: u64,
    documents: HashMap<CollectionKey, StoredDocument>,
}

#[derive(Debug)]
pub struct Store {
    buckets: BTreeMap<String, Bucket>,
    next_cas: u64,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            buckets: BTreeMap::new(),
            next_cas: FIRST_CAS,
        }
    }
}

/// FNV-1a over the key, folded onto the partition range.
pub fn partition_of(key: &str) -> u16 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in key.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    (hash % u32::from(PARTITION_COUNT)) as u16
}

fn collection_key(id: &DocumentId) -> CollectionKey {
    (id.scope.clone(), id.collection.clone(), id.key.clone())
}

impl Store {
    pub fn add_bucket(&mut self, name: &str) {
        let seed = self.buckets.len() as u64 + 1;
        self.buckets.entry(name.to_owned()).or_insert_with(|| Bucket {
            partition_uuid: PartitionUuid::new(0xa1b2_c3d4_0000_0000 | seed),
            sequence_number: 0,
            documents: HashMap::new(),
        });
    }

    pub fn has_bucket(&self, name: &str) -> bool {
        self.buckets.contains_key(name)
    }

    fn bucket(&self, id: &DocumentId) -> Result<&Bucket, ErrorCode> {
        self.buckets.get(&id.bucket).ok_or(ErrorCode::BucketNotFound)
    }

    /// Live document.
    pub fn get(&self, id: &DocumentId) -> Result<&StoredDocument, ErrorCode> {
        match self.bucket(id)?.documents.get(&collection_key(id)) {
            Some(doc) if !doc.deleted => Ok(doc),
            _ => Err(ErrorCode::DocumentNotFound),
        }
    }

    /// Live document or tombstone.
    pub fn lookup(&self, id: &DocumentId) -> Result<Option<&StoredDocument>, ErrorCode> {
        Ok(self.bucket(id)?.documents.get(&collection_key(id)))
    }

    pub fn upsert(&mut self, id: &DocumentId, write: Write<'_>) -> Result<Mutation, ErrorCode> {
        self.bucket(id)?;
        self.store(id, write)
    }

    pub fn insert(&mut self, id: &DocumentId, write: Write<'_>) -> Result<Mutation, ErrorCode> {
        if self.get(id).is_ok() {
            return Err(ErrorCode::DocumentExists);
        }
        self.upsert(id, write)
    }

    pub fn replace(
        &mut self,
        id: &DocumentId,
        write: Write<'_>,
        cas: Cas,
    ) -> Result<Mutation, ErrorCode> {
        let current = self.get(id)?;
        if !cas.is_zero() && current.cas != cas {
            return Err(ErrorCode::CasMismatch);
        }
        self.store(id, write)
    }

    /// Turns a live document into a tombstone.
    pub fn remove(&mut self, id: &DocumentId, cas: Cas) -> Result<Mutation, ErrorCode> {
        let current = self.get(id)?;
        if !cas.is_zero() && current.cas != cas {
            return Err(ErrorCode::CasMismatch);
        }
        let mutation = self.store(
            id,
            Write {
                value: "",
                ..Write::default()
            },
        )?;
        if let Some(doc) = self
            .buckets
            .get_mut(&id.bucket)
            .and_then(|bucket| bucket.documents.get_mut(&collection_key(id)))
        {
            doc.deleted = true;
        }
        Ok(mutation)
    }

    fn store(&mut self, id: &DocumentId, write: Write<'_>) -> Result<Mutation, ErrorCode> {
        self.next_cas += 1;
        let cas = Cas::new(self.next_cas);
        let bucket = self
            .buckets
            .get_mut(&id.bucket)
            .ok_or(ErrorCode::BucketNotFound)?;
        bucket.sequence_number += 1;
        let sequence_number = SequenceNumber::new(bucket.sequence_number);

        let key = collection_key(id);
        let expiry = match bucket.documents.get(&key) {
            Some(previous) if write.preserve_expiry && !previous.deleted => previous.expiry,
            _ => write.expiry,
        };
        bucket.documents.insert(
            key,
            StoredDocument {
                value: write.value.to_owned(),
                flags: write.flags,
                cas,
                expiry,
                sequence_number,
                deleted: false,
            },
        );

        Ok(Mutation {
            cas,
            token: MutationToken {
                bucket_name: id.bucket.clone(),
                partition_id: partition_of(&id.key),
                partition_uuid: bucket.partition_uuid,
                sequence_number,
            },
        })
    }
}

/// Keeps only `paths` (dot-separated) of a JSON document.
///
/// Missing paths are skipped. A document that is not a JSON object cannot be
/// projected.
pub fn project(value: &str, paths: &[String]) -> Result<String, ErrorCode> {
    let document: Value = serde_json::from_str(value).map_err(|_| ErrorCode::PathMismatch)?;
    if !document.is_object() {
        return Err(ErrorCode::PathMismatch);
    }

    let mut projected = Map::new();
    for path in paths {
        let segments: Vec<&str> = path.split('.').collect();
        let mut cursor = &document;
        let mut found = true;
        for segment in &segments {
            match cursor.get(segment) {
                Some(next) => cursor = next,
                None => {
                    found = false;
                    break;
                }
            }
        }
        if found {
            insert_path(&mut projected, &segments, cursor.clone());
        }
    }
    Ok(Value::Object(projected).to_string())
}

fn insert_path(target: &mut Map<String, Value>, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [last] => {
            target.insert((*last).to_owned(), value);
        }
        [head, rest @ ..] => {
            let child = target
                .entry((*head).to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(child) = child {
                insert_path(child, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        let mut store = Store::default();
        store.add_bucket("travel");
        store
    }

    fn write(value: &str) -> Write<'_> {
        Write {
            value,
            ..Write::default()
        }
    }

    #[test]
    fn mutations_advance_cas_and_sequence_numbers() {
        let mut store = store();
        let id = DocumentId::in_default_collection("travel", "airline_10");
        let first = store.upsert(&id, write(r#"{"name":"40-Mile Air"}"#)).unwrap();
        let second = store.upsert(&id, write(r#"{"name":"Texas Wings"}"#)).unwrap();

        assert!(second.cas > first.cas);
        assert!(second.token.sequence_number > first.token.sequence_number);
        assert!(second.token.is_valid());
        assert_eq!(second.token.partition_id, partition_of("airline_10"));
        assert_eq!(store.get(&id).unwrap().value, r#"{"name":"Texas Wings"}"#);
    }

    #[test]
    fn insert_replace_and_remove_follow_document_state() {
        let mut store = store();
        let id = DocumentId::in_default_collection("travel", "hotel_1");

        assert_eq!(
            store.replace(&id, write("{}"), Cas::default()),
            Err(ErrorCode::DocumentNotFound)
        );
        let inserted = store.insert(&id, write("{}")).unwrap();
        assert_eq!(store.insert(&id, write("{}")), Err(ErrorCode::DocumentExists));
        assert_eq!(
            store.replace(&id, write("{}"), Cas::new(inserted.cas.as_u64() + 99)),
            Err(ErrorCode::CasMismatch)
        );
        store.replace(&id, write(r#"{"a":1}"#), inserted.cas).unwrap();

        store.remove(&id, Cas::default()).unwrap();
        assert_eq!(store.get(&id), Err(ErrorCode::DocumentNotFound));
        assert!(store.lookup(&id).unwrap().unwrap().deleted);
        // A tombstone does not block an insert.
        store.insert(&id, write("{}")).unwrap();
    }

    #[test]
    fn unknown_bucket_is_reported() {
        let mut store = store();
        let id = DocumentId::in_default_collection("beer", "k");
        assert_eq!(store.get(&id), Err(ErrorCode::BucketNotFound));
        assert_eq!(store.upsert(&id, write("{}")), Err(ErrorCode::BucketNotFound));
    }

    #[test]
    fn preserve_expiry_keeps_previous_value() {
        let mut store = store();
        let id = DocumentId::in_default_collection("travel", "k");
        store
            .upsert(&id, Write { value: "{}", expiry: 300, ..Write::default() })
            .unwrap();
        store
            .upsert(&id, Write { value: "{}", preserve_expiry: true, ..Write::default() })
            .unwrap();
        assert_eq!(store.get(&id).unwrap().expiry, 300);
    }

    #[test]
    fn projection_keeps_requested_paths() {
        let doc = r#"{"name":"Inn","geo":{"lat":1.5,"lon":2.5},"free":true}"#;
        let projected = project(doc, &["geo.lat".into(), "name".into(), "missing".into()]).unwrap();
        let value: Value = serde_json::from_str(&projected).unwrap();
        assert_eq!(value, serde_json::json!({ "geo": { "lat": 1.5 }, "name": "Inn" }));

        assert_eq!(project("[1,2]", &["a".into()]), Err(ErrorCode::PathMismatch));
    }
}
