//! Repository port
//!
//! The `Repository` trait is the only surface application code sees. Storage
//! adapters implement it; services hold it as `Arc<dyn Repository<T>>`.
//!
//! ```rust,ignore
//! pub struct GadgetService {
//!     gadgets: Arc<dyn Repository<Gadget>>,
//! }
//!
//! impl GadgetService {
//!     pub async fn lookup(&self, id: &str) -> StoreResult<Option<Gadget>> {
//!         self.gadgets.get_by_id(id.into()).await
//!     }
//! }
//! ```
//!
//! # Not-found handling
//!
//! `get_by_id` (and `find_by_id`, built on it) report a missing document as
//! `Ok(None)`. Every other operation returns the store's not-found fault
//! unchanged, so updating or deleting a missing document is an error.

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::identifiers::DocumentKey;
use crate::query::Predicate;

/// Typed CRUD and query access to one collection of documents
#[async_trait]
pub trait Repository<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Reads a single document; a missing document yields `Ok(None)`
    async fn get_by_id(&self, key: DocumentKey) -> StoreResult<Option<T>>;

    /// Returns true if the document exists
    async fn find_by_id(&self, key: DocumentKey) -> StoreResult<bool> {
        Ok(self.get_by_id(key).await?.is_some())
    }

    /// Returns every document matching `predicate`, across all partitions
    async fn get_all(&self, predicate: Predicate) -> StoreResult<Vec<T>>;

    /// Listing without a predicate is not supported
    async fn get_all_unfiltered(&self) -> StoreResult<Vec<T>> {
        Err(StoreError::unsupported("get_all without a predicate"))
    }

    /// Inserts a new document and returns its address
    async fn add(&self, entity: &T) -> StoreResult<DocumentKey>;

    /// Replaces the document at `key` with `entity`
    async fn update(&self, entity: &T, key: DocumentKey) -> StoreResult<()>;

    /// Deletes the document at `key`
    async fn delete_by(&self, key: DocumentKey) -> StoreResult<()>;

    /// Deleting by entity is not supported; delete by key instead
    async fn delete_by_entity(&self, _entity: &T) -> StoreResult<()> {
        Err(StoreError::unsupported("delete_by with an entity"))
    }
}
