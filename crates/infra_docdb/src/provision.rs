//! Idempotent provisioning of the database and collection
//!
//! Each step reads the resource first and creates it only when the store
//! reports it missing. A create that loses a race with another instance
//! (409) counts as success. Every step is bounded by the request timeout.

use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use docdb_kernel::{StoreError, StoreResult};

use crate::client::DocumentClient;
use crate::resources::{CollectionPath, CollectionProperties, DatabaseProperties};
use crate::settings::Settings;

/// Request units per second provisioned for newly created collections
pub const DEFAULT_THROUGHPUT: u32 = 1000;

/// Outcome of provisioning: the collection as it exists in the store
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub path: CollectionPath,
    pub database: DatabaseProperties,
    pub collection: CollectionProperties,
}

impl Provisioned {
    /// Partition path the collection actually uses
    pub fn partition_key_path(&self) -> Option<&str> {
        self.collection.partition_key_path()
    }
}

async fn bounded<T, F>(operation: &str, limit: Duration, step: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    tokio::time::timeout(limit, step)
        .await
        .map_err(|_| StoreError::timeout(operation, limit))?
}

/// Ensures the database exists, creating it if the store reports it missing
pub async fn ensure_database<C: DocumentClient + ?Sized>(
    client: &C,
    database_id: &str,
    limit: Duration,
) -> StoreResult<DatabaseProperties> {
    match bounded("read database", limit, client.read_database(database_id)).await {
        Ok(database) => return Ok(database),
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e),
    }

    info!(database = database_id, "Creating database");
    match bounded("create database", limit, client.create_database(database_id)).await {
        Ok(database) => {
            info!(database = database_id, "Database created successfully");
            Ok(database)
        }
        Err(e) if e.is_conflict() => {
            info!(database = database_id, "Database was created concurrently");
            Ok(DatabaseProperties::new(database_id))
        }
        Err(e) => Err(e),
    }
}

/// Ensures the collection exists, creating it with `partition_key_path` if missing
///
/// A collection's partition key cannot change after creation. If the
/// existing collection was created with a different path, a warning is
/// logged and the existing collection is returned unchanged.
pub async fn ensure_collection<C: DocumentClient + ?Sized>(
    client: &C,
    path: &CollectionPath,
    partition_key_path: Option<&str>,
    limit: Duration,
) -> StoreResult<CollectionProperties> {
    match bounded("read collection", limit, client.read_collection(path)).await {
        Ok(existing) => {
            if existing.partition_key_path() != partition_key_path {
                warn!(
                    collection = %path,
                    requested = ?partition_key_path,
                    existing = ?existing.partition_key_path(),
                    "Collection exists with a different partition key; keeping the existing one"
                );
            }
            return Ok(existing);
        }
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e),
    }

    let definition = CollectionProperties::new(path.collection_id.clone(), partition_key_path);
    info!(
        collection = %path,
        partition_key = ?partition_key_path,
        throughput = DEFAULT_THROUGHPUT,
        "Creating collection"
    );

    let created = bounded(
        "create collection",
        limit,
        client.create_collection(&path.database_id, &definition, Some(DEFAULT_THROUGHPUT)),
    )
    .await;

    match created {
        Ok(collection) => {
            info!(collection = %path, "Collection created successfully");
            Ok(collection)
        }
        Err(e) if e.is_conflict() => {
            info!(collection = %path, "Collection was created concurrently");
            bounded("read collection", limit, client.read_collection(path)).await
        }
        Err(e) => Err(e),
    }
}

/// Runs the full provisioning protocol for `settings`
///
/// # Errors
///
/// Returns `StoreError::Configuration` for invalid settings,
/// `StoreError::Timeout` if a step exceeds the request timeout, and the
/// store's fault for anything other than not-found on read or conflict on
/// create.
pub async fn provision<C: DocumentClient + ?Sized>(
    client: &C,
    settings: &Settings,
) -> StoreResult<Provisioned> {
    settings.validate()?;

    let limit = settings.request_timeout();
    let path = CollectionPath::new(settings.database_id.clone(), settings.collection_id.clone());

    let database = ensure_database(client, &path.database_id, limit).await?;
    let collection = ensure_collection(client, &path, settings.partition_key_path(), limit).await?;

    info!(
        collection = %path,
        partition_key = ?collection.partition_key_path(),
        "Collection ready"
    );

    Ok(Provisioned {
        path,
        database,
        collection,
    })
}
