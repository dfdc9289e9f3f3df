//! Resource models and addressing for the document database
//!
//! Databases, collections and documents are addressed by links of the form
//! `dbs/{db}/colls/{coll}/docs/{id}`. The same link (unencoded) is signed in
//! the authorization header; the URL path carries the percent-encoded form.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of resource a request targets, as named in request signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Database,
    Collection,
    Document,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Database => "dbs",
            ResourceType::Collection => "colls",
            ResourceType::Document => "docs",
        }
    }
}

/// Database and collection a repository is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionPath {
    pub database_id: String,
    pub collection_id: String,
}

impl CollectionPath {
    pub fn new(database_id: impl Into<String>, collection_id: impl Into<String>) -> Self {
        Self {
            database_id: database_id.into(),
            collection_id: collection_id.into(),
        }
    }

    /// `dbs/{db}`
    pub fn database_link(&self) -> String {
        database_link(&self.database_id)
    }

    /// `dbs/{db}/colls/{coll}`
    pub fn collection_link(&self) -> String {
        format!("dbs/{}/colls/{}", self.database_id, self.collection_id)
    }

    /// `dbs/{db}/colls/{coll}/docs/{id}`
    pub fn document_link(&self, id: &str) -> String {
        format!("{}/docs/{}", self.collection_link(), id)
    }
}

impl std::fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.database_id, self.collection_id)
    }
}

pub fn database_link(database_id: &str) -> String {
    format!("dbs/{}", database_id)
}

/// Properties of a database as returned by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseProperties {
    pub id: String,
    #[serde(rename = "_rid", default, skip_serializing_if = "Option::is_none")]
    pub rid: Option<String>,
    #[serde(rename = "_etag", default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl DatabaseProperties {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rid: None,
            etag: None,
        }
    }
}

/// Partition-key definition of a collection, fixed at creation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionKeyDefinition {
    pub paths: Vec<String>,
    #[serde(default = "PartitionKeyDefinition::default_kind")]
    pub kind: String,
}

impl PartitionKeyDefinition {
    /// Hash partitioning on a single path
    pub fn hash(path: impl Into<String>) -> Self {
        Self {
            paths: vec![path.into()],
            kind: Self::default_kind(),
        }
    }

    fn default_kind() -> String {
        "Hash".to_string()
    }

    /// The single partition path, if any
    pub fn path(&self) -> Option<&str> {
        self.paths.first().map(String::as_str)
    }
}

/// Properties of a collection as returned by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionProperties {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<PartitionKeyDefinition>,
    #[serde(rename = "_rid", default, skip_serializing_if = "Option::is_none")]
    pub rid: Option<String>,
    #[serde(rename = "_etag", default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl CollectionProperties {
    /// Describes a collection to create, partitioned on `partition_key_path` if given
    pub fn new(id: impl Into<String>, partition_key_path: Option<&str>) -> Self {
        Self {
            id: id.into(),
            partition_key: partition_key_path.map(PartitionKeyDefinition::hash),
            rid: None,
            etag: None,
        }
    }

    /// The partition path the collection was created with
    pub fn partition_key_path(&self) -> Option<&str> {
        self.partition_key
            .as_ref()
            .and_then(PartitionKeyDefinition::path)
    }
}

/// One page of query results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPage {
    pub documents: Vec<Value>,
    /// Token for the next page; `None` once the query is drained
    pub continuation: Option<String>,
}
