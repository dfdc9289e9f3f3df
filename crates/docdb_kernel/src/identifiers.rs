//! Document addressing
//!
//! A document is addressed by its id and, in partitioned collections, by the
//! value of its partition-key field. `DocumentKey` carries both.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a single document within a collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Creates an identifier from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a new random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the identifier, returning the inner string
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DocumentId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<Uuid> for DocumentId {
    fn from(id: Uuid) -> Self {
        Self(id.to_string())
    }
}

macro_rules! document_id_from_integer {
    ($($int:ty),*) => {
        $(
            impl From<$int> for DocumentId {
                fn from(id: $int) -> Self {
                    Self(id.to_string())
                }
            }
        )*
    };
}

document_id_from_integer!(i32, i64, u32, u64);

/// Value of the partition-key field of one document
///
/// Sent to the store as a one-element JSON array. A document without the
/// partition-key field lives in the "undefined" partition, encoded as `{}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionKey(Value);

impl PartitionKey {
    /// Creates a partition key from a JSON value
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    /// The partition of documents that lack the partition-key field
    pub fn undefined() -> Self {
        Self(Value::Object(serde_json::Map::new()))
    }

    /// Reads the partition key of `document` at the JSON-pointer `path` (e.g. `/category`)
    pub fn extract(document: &Value, path: &str) -> Self {
        document
            .pointer(path)
            .cloned()
            .map(Self)
            .unwrap_or_else(Self::undefined)
    }

    /// Returns true for the undefined partition
    pub fn is_undefined(&self) -> bool {
        matches!(&self.0, Value::Object(map) if map.is_empty())
    }

    /// Returns the raw JSON value
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Encodes the key the way the store expects it in request headers
    pub fn header_value(&self) -> String {
        Value::Array(vec![self.0.clone()]).to_string()
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other),
        }
    }
}

impl From<&str> for PartitionKey {
    fn from(value: &str) -> Self {
        Self(Value::String(value.to_string()))
    }
}

impl From<String> for PartitionKey {
    fn from(value: String) -> Self {
        Self(Value::String(value))
    }
}

impl From<i64> for PartitionKey {
    fn from(value: i64) -> Self {
        Self(Value::from(value))
    }
}

impl From<bool> for PartitionKey {
    fn from(value: bool) -> Self {
        Self(Value::Bool(value))
    }
}

/// Full address of a document: its id and, when known, its partition
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentKey {
    id: DocumentId,
    partition_key: Option<PartitionKey>,
}

impl DocumentKey {
    /// Creates a key without partition information
    pub fn new(id: impl Into<DocumentId>) -> Self {
        Self {
            id: id.into(),
            partition_key: None,
        }
    }

    /// Creates a key for a document in a known partition
    pub fn partitioned(id: impl Into<DocumentId>, partition_key: impl Into<PartitionKey>) -> Self {
        Self {
            id: id.into(),
            partition_key: Some(partition_key.into()),
        }
    }

    /// Attaches a partition to this key
    pub fn in_partition(mut self, partition_key: impl Into<PartitionKey>) -> Self {
        self.partition_key = Some(partition_key.into());
        self
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn partition_key(&self) -> Option<&PartitionKey> {
        self.partition_key.as_ref()
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.partition_key {
            Some(pk) => write!(f, "{} (partition {})", self.id, pk),
            None => write!(f, "{}", self.id),
        }
    }
}

impl From<DocumentId> for DocumentKey {
    fn from(id: DocumentId) -> Self {
        Self::new(id)
    }
}

impl From<&str> for DocumentKey {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DocumentKey {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<Uuid> for DocumentKey {
    fn from(id: Uuid) -> Self {
        Self::new(id)
    }
}
