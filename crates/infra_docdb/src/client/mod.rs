//! Document database clients
//!
//! `DocumentClient` is the seam between the repository and the wire. It
//! exposes exactly the verbs the repository needs: read/create for databases
//! and collections, and read/create/replace/delete/query for documents.
//!
//! - [`CosmosClient`] talks to the store's REST API over HTTPS
//! - [`InMemoryClient`] (feature `mock`) keeps everything in process memory
//!   and reproduces the store's status codes, for tests and local runs
//!
//! Every method returns the store's native fault on failure; clients never
//! retry and never translate not-found into success.

pub mod cosmos;
#[cfg(any(test, feature = "mock"))]
pub mod memory;

pub use cosmos::CosmosClient;
#[cfg(any(test, feature = "mock"))]
pub use memory::InMemoryClient;

use async_trait::async_trait;
use serde_json::Value;

use docdb_kernel::{DocumentId, PartitionKey, Predicate, StoreResult};

use crate::resources::{CollectionPath, CollectionProperties, DatabaseProperties, QueryPage};

/// Connection to a document database account
///
/// Implementations must be safe for concurrent use; the repository shares
/// one client across all of its in-flight operations without locking.
#[async_trait]
pub trait DocumentClient: Send + Sync + 'static {
    async fn read_database(&self, database_id: &str) -> StoreResult<DatabaseProperties>;

    async fn create_database(&self, database_id: &str) -> StoreResult<DatabaseProperties>;

    async fn read_collection(&self, path: &CollectionPath) -> StoreResult<CollectionProperties>;

    /// Creates a collection; `throughput` is the provisioned request-unit rate
    async fn create_collection(
        &self,
        database_id: &str,
        collection: &CollectionProperties,
        throughput: Option<u32>,
    ) -> StoreResult<CollectionProperties>;

    async fn read_document(
        &self,
        path: &CollectionPath,
        id: &DocumentId,
        partition_key: Option<&PartitionKey>,
    ) -> StoreResult<Value>;

    async fn create_document(
        &self,
        path: &CollectionPath,
        document: &Value,
        partition_key: Option<&PartitionKey>,
    ) -> StoreResult<Value>;

    async fn replace_document(
        &self,
        path: &CollectionPath,
        id: &DocumentId,
        document: &Value,
        partition_key: Option<&PartitionKey>,
    ) -> StoreResult<Value>;

    async fn delete_document(
        &self,
        path: &CollectionPath,
        id: &DocumentId,
        partition_key: Option<&PartitionKey>,
    ) -> StoreResult<()>;

    /// Fetches one page of the documents matching `predicate`, across all
    /// partitions and with no client-side page-size limit
    async fn query_documents(
        &self,
        path: &CollectionPath,
        predicate: &Predicate,
        continuation: Option<&str>,
    ) -> StoreResult<QueryPage>;
}
