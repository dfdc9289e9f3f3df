//! Document repository
//!
//! `DocumentRepository<T>` binds one entity type to one collection. It is
//! built by provisioning its database and collection, then serves typed CRUD
//! and predicate queries through a [`DocumentClient`].
//!
//! The only fault it recovers from is not-found on a point read, which
//! becomes `Ok(None)`. Every other fault, including not-found on update or
//! delete, is returned exactly as the store reported it.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use tracing::{debug, info};

use docdb_kernel::{
    DocumentId, DocumentKey, PartitionKey, Predicate, Repository, StoreError, StoreResult,
};

use crate::client::{CosmosClient, DocumentClient};
use crate::provision::provision;
use crate::resources::CollectionPath;
use crate::settings::Settings;

/// Repository over one collection of the document database
///
/// # Example
///
/// ```rust,ignore
/// use docdb_kernel::{Field, Repository};
/// use infra_docdb::{DocumentRepository, Settings};
///
/// let settings = Settings::from_env()?.for_collection("gadgets");
/// let gadgets: DocumentRepository<Gadget> = DocumentRepository::connect(&settings).await?;
///
/// let key = gadgets.add(&gadget).await?;
/// let tools = gadgets.get_all(Field::new("category").eq("tools")).await?;
/// ```
pub struct DocumentRepository<T, C = CosmosClient> {
    client: C,
    path: CollectionPath,
    partition_key_path: Option<String>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> DocumentRepository<T, CosmosClient> {
    /// Opens an HTTP connection and provisions the collection named in `settings`
    ///
    /// # Errors
    ///
    /// Fails with `StoreError::Configuration` for invalid settings,
    /// `StoreError::Timeout` if a provisioning step exceeds the timeout, or
    /// the store's fault if provisioning is rejected.
    pub async fn connect(settings: &Settings) -> StoreResult<Self> {
        let client = CosmosClient::from_settings(settings)?;
        Self::with_client(client, settings).await
    }
}

impl<T, C: DocumentClient> DocumentRepository<T, C> {
    /// Provisions the collection named in `settings` through `client`
    pub async fn with_client(client: C, settings: &Settings) -> StoreResult<Self> {
        let provisioned = provision(&client, settings).await?;

        info!(
            collection = %provisioned.path,
            partition_key = ?provisioned.partition_key_path(),
            "Repository ready"
        );

        Ok(Self {
            partition_key_path: provisioned.partition_key_path().map(str::to_string),
            path: provisioned.path,
            client,
            _entity: PhantomData,
        })
    }

    pub fn path(&self) -> &CollectionPath {
        &self.path
    }

    /// Partition path of the collection as it exists in the store
    pub fn partition_key_path(&self) -> Option<&str> {
        self.partition_key_path.as_deref()
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Partition addressed by `key` for point operations
    ///
    /// Uses the key's own partition; for collections partitioned on the id
    /// the id itself is the partition.
    fn partition_for(&self, key: &DocumentKey) -> Option<PartitionKey> {
        let path = self.partition_key_path.as_deref()?;
        key.partition_key().cloned().or_else(|| {
            (path == "/id").then(|| PartitionKey::from(key.id().as_str()))
        })
    }

    /// Partition a written document belongs to
    fn partition_of(&self, document: &Value) -> Option<PartitionKey> {
        self.partition_key_path
            .as_deref()
            .map(|path| PartitionKey::extract(document, path))
    }
}

/// Assigns a generated id to documents that have none
fn ensure_id(document: &mut Value) {
    if let Value::Object(map) = document {
        if map.get("id").map_or(true, Value::is_null) {
            map.insert("id".to_string(), Value::String(DocumentId::generate().into_inner()));
        }
    }
}

/// Id of a created document, as echoed by the store or as sent
fn stored_id(created: &Value, sent: &Value) -> StoreResult<DocumentId> {
    created
        .get("id")
        .or_else(|| sent.get("id"))
        .and_then(Value::as_str)
        .map(DocumentId::from)
        .ok_or_else(|| StoreError::bad_request("created document has no string id"))
}

#[async_trait]
impl<T, C> Repository<T> for DocumentRepository<T, C>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
    C: DocumentClient,
{
    async fn get_by_id(&self, key: DocumentKey) -> StoreResult<Option<T>> {
        debug!(collection = %self.path, key = %key, "Reading document");
        let partition = self.partition_for(&key);

        match self
            .client
            .read_document(&self.path, key.id(), partition.as_ref())
            .await
        {
            Ok(document) => Ok(Some(serde_json::from_value(document)?)),
            Err(e) if e.is_not_found() => {
                debug!(collection = %self.path, key = %key, "Document not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn get_all(&self, predicate: Predicate) -> StoreResult<Vec<T>> {
        let mut entities = Vec::new();
        let mut continuation: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .client
                .query_documents(&self.path, &predicate, continuation.as_deref())
                .await?;
            pages += 1;

            for document in page.documents {
                entities.push(serde_json::from_value(document)?);
            }

            match page.continuation {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        debug!(
            collection = %self.path,
            pages,
            count = entities.len(),
            "Query drained"
        );
        Ok(entities)
    }

    async fn add(&self, entity: &T) -> StoreResult<DocumentKey> {
        let mut document = serde_json::to_value(entity)?;
        ensure_id(&mut document);
        let partition = self.partition_of(&document);

        let created = self
            .client
            .create_document(&self.path, &document, partition.as_ref())
            .await?;

        let id = stored_id(&created, &document)?;

        let key = match partition {
            Some(pk) => DocumentKey::new(id).in_partition(pk),
            None => DocumentKey::new(id),
        };
        debug!(collection = %self.path, key = %key, "Document created");
        Ok(key)
    }

    async fn update(&self, entity: &T, key: DocumentKey) -> StoreResult<()> {
        let document = serde_json::to_value(entity)?;
        let partition = self
            .partition_for(&key)
            .or_else(|| self.partition_of(&document));

        self.client
            .replace_document(&self.path, key.id(), &document, partition.as_ref())
            .await?;
        debug!(collection = %self.path, key = %key, "Document replaced");
        Ok(())
    }

    async fn delete_by(&self, key: DocumentKey) -> StoreResult<()> {
        let partition = self.partition_for(&key);

        self.client
            .delete_document(&self.path, key.id(), partition.as_ref())
            .await?;
        debug!(collection = %self.path, key = %key, "Document deleted");
        Ok(())
    }
}

impl<T, C: fmt::Debug> fmt::Debug for DocumentRepository<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentRepository")
            .field("client", &self.client)
            .field("path", &self.path)
            .field("partition_key_path", &self.partition_key_path)
            .finish()
    }
}
