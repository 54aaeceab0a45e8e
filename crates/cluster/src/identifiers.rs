//! Newtype identifiers shared by requests, responses and error contexts.
//!
//! Counters assigned by the server (CAS values, partition UUIDs, sequence
//! numbers) are all `u64` under the hood. Wrapping each in its own newtype keeps
//! a CAS from being passed where a sequence number is expected, and gives every
//! one of them the same lower-case hexadecimal textual form the host layer
//! expects.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for u64-wrapped newtypes rendered as lower-case hex.
// Generates: struct (Copy), new(), as_u64(), is_zero(), from_hex(), Display,
// Serialize/Deserialize as a hex string.
// ---------------------------------------------------------------------------
macro_rules! hex_u64_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new value from a raw integer.
            pub fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the underlying integer value.
            pub fn as_u64(self) -> u64 {
                self.0
            }

            /// Returns `true` if the value is zero (unset).
            pub fn is_zero(self) -> bool {
                self.0 == 0
            }

            /// Parses the lower- or upper-case hexadecimal form produced by `Display`.
            pub fn from_hex(text: &str) -> Option<Self> {
                let digits = text.strip_prefix("0x").unwrap_or(text);
                if digits.is_empty() {
                    return None;
                }
                u64::from_str_radix(digits, 16).ok().map(Self)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:x}", self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                Self::from_hex(&text).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        concat!("invalid hexadecimal ", stringify!($name), ": {}"),
                        text
                    ))
                })
            }
        }
    };
}

hex_u64_id! {
    /// Compare-and-swap value the server assigns to every document revision.
    ///
    /// Zero means "no CAS": mutations carrying a zero CAS are unconditional.
    Cas
}

hex_u64_id! {
    /// UUID of a partition (vBucket) history branch, part of a mutation token.
    PartitionUuid
}

hex_u64_id! {
    /// Per-partition sequence number of a mutation.
    SequenceNumber
}

// ---------------------------------------------------------------------------
// Document identity
// ---------------------------------------------------------------------------

/// Name of the scope and collection every bucket carries.
pub const DEFAULT_COLLECTION: &str = "_default";

/// Fully-qualified document identity: bucket, scope, collection and key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId {
    pub bucket: String,
    pub scope: String,
    pub collection: String,
    pub key: String,
}

impl DocumentId {
    pub fn new(
        bucket: impl Into<String>,
        scope: impl Into<String>,
        collection: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            scope: scope.into(),
            collection: collection.into(),
            key: key.into(),
        }
    }

    /// Identity in the default scope and collection of `bucket`.
    pub fn in_default_collection(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(bucket, DEFAULT_COLLECTION, DEFAULT_COLLECTION, key)
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new("", DEFAULT_COLLECTION, DEFAULT_COLLECTION, "")
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.bucket, self.scope, self.collection, self.key
        )
    }
}

// ---------------------------------------------------------------------------
// Connection identity
// ---------------------------------------------------------------------------

/// Identifies one live connection (client handle + execution context + worker).
///
/// Generated fresh when a connection is started; attached to every log event
/// the connection emits so all activity of one connection can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generates a new random connection identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cas_displays_and_serializes_as_lower_hex() {
        let cas = Cas::new(0x16f5_d3a1_b2c4_0000);
        assert_eq!(cas.to_string(), "16f5d3a1b2c40000");
        assert_eq!(
            serde_json::to_value(cas).unwrap(),
            serde_json::json!("16f5d3a1b2c40000")
        );
    }

    #[test]
    fn from_hex_accepts_prefix_and_rejects_garbage() {
        assert_eq!(SequenceNumber::from_hex("0x1f"), Some(SequenceNumber::new(31)));
        assert_eq!(SequenceNumber::from_hex("1F"), Some(SequenceNumber::new(31)));
        assert_eq!(SequenceNumber::from_hex(""), None);
        assert_eq!(SequenceNumber::from_hex("xyz"), None);
    }

    #[test]
    fn default_document_id_lives_in_default_collection() {
        let id = DocumentId::in_default_collection("travel", "airline_10");
        assert_eq!(id.scope, DEFAULT_COLLECTION);
        assert_eq!(id.collection, DEFAULT_COLLECTION);
        assert_eq!(id.to_string(), "travel/_default/_default/airline_10");
    }
}
