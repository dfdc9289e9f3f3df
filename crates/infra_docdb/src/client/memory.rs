//! In-process document store
//!
//! `InMemoryClient` keeps databases, collections and documents in memory
//! and answers with the same status codes the remote store uses: 404 for
//! missing resources, 409 for duplicate ids, 400 for partition-key misuse.
//! Clones share state, so a test can keep one handle for inspection while a
//! repository owns another.
//!
//! Faults and latency can be injected per operation to exercise the error
//! paths of the repository and the provisioning protocol.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use docdb_kernel::{DocumentId, PartitionKey, Predicate, StoreError, StoreResult};

use crate::resources::{CollectionPath, CollectionProperties, DatabaseProperties, QueryPage};

use super::DocumentClient;

/// The client operations, used to address injected faults and call counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    ReadDatabase,
    CreateDatabase,
    ReadCollection,
    CreateCollection,
    ReadDocument,
    CreateDocument,
    ReplaceDocument,
    DeleteDocument,
    QueryDocuments,
}

#[derive(Debug)]
struct StoredDocument {
    partition: Option<PartitionKey>,
    id: String,
    body: Value,
}

#[derive(Debug)]
struct Collection {
    properties: CollectionProperties,
    throughput: Option<u32>,
    documents: Vec<StoredDocument>,
}

impl Collection {
    fn position(&self, partition: Option<&PartitionKey>, id: &str) -> Option<usize> {
        self.documents
            .iter()
            .position(|doc| doc.id == id && doc.partition.as_ref() == partition)
    }
}

#[derive(Debug, Default)]
struct State {
    databases: HashMap<String, DatabaseProperties>,
    collections: HashMap<(String, String), Collection>,
    faults: HashMap<StoreOperation, VecDeque<StoreError>>,
    calls: HashMap<StoreOperation, usize>,
}

/// Document store held in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryClient {
    state: Arc<RwLock<State>>,
    latency: Duration,
    page_size: Option<usize>,
}

impl InMemoryClient {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every operation by `latency` before it touches the store
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Splits query results into pages of at most `page_size` documents
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size.max(1));
        self
    }

    /// Makes the next call of `operation` fail with `status`
    ///
    /// Calls queue up: injecting twice fails the next two calls.
    pub async fn fail_next(&self, operation: StoreOperation, status: u16) {
        let fault = StoreError::remote(status, format!("injected fault for {:?}", operation));
        self.fail_next_with(operation, fault).await;
    }

    /// Makes the next call of `operation` fail with `error`
    pub async fn fail_next_with(&self, operation: StoreOperation, error: StoreError) {
        self.state
            .write()
            .await
            .faults
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Number of times `operation` has been called, including failed calls
    pub async fn calls(&self, operation: StoreOperation) -> usize {
        self.state
            .read()
            .await
            .calls
            .get(&operation)
            .copied()
            .unwrap_or(0)
    }

    /// Returns true if the database exists
    pub async fn has_database(&self, database_id: &str) -> bool {
        self.state.read().await.databases.contains_key(database_id)
    }

    /// Properties of a collection, if it exists
    pub async fn collection(&self, path: &CollectionPath) -> Option<CollectionProperties> {
        self.state
            .read()
            .await
            .collections
            .get(&collection_key(path))
            .map(|c| c.properties.clone())
    }

    /// Throughput a collection was created with
    pub async fn throughput(&self, path: &CollectionPath) -> Option<u32> {
        self.state
            .read()
            .await
            .collections
            .get(&collection_key(path))
            .and_then(|c| c.throughput)
    }

    /// All stored documents of a collection, in insertion order
    pub async fn documents(&self, path: &CollectionPath) -> Vec<Value> {
        self.state
            .read()
            .await
            .collections
            .get(&collection_key(path))
            .map(|c| c.documents.iter().map(|doc| doc.body.clone()).collect())
            .unwrap_or_default()
    }

    /// Creates a database and collection directly, bypassing call accounting
    pub async fn seed_collection(&self, path: &CollectionPath, partition_key_path: Option<&str>) {
        let mut state = self.state.write().await;
        state
            .databases
            .entry(path.database_id.clone())
            .or_insert_with(|| database(&path.database_id));
        state
            .collections
            .entry(collection_key(path))
            .or_insert_with(|| Collection {
                properties: system_collection(CollectionProperties::new(
                    path.collection_id.clone(),
                    partition_key_path,
                )),
                throughput: None,
                documents: Vec::new(),
            });
    }

    /// Counts the call, applies latency and pops an injected fault if one is queued
    async fn enter(&self, operation: StoreOperation) -> StoreResult<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut state = self.state.write().await;
        *state.calls.entry(operation).or_insert(0) += 1;
        match state.faults.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }
}

fn collection_key(path: &CollectionPath) -> (String, String) {
    (path.database_id.clone(), path.collection_id.clone())
}

fn database(id: &str) -> DatabaseProperties {
    DatabaseProperties {
        id: id.to_string(),
        rid: Some(resource_id()),
        etag: Some(etag()),
    }
}

fn system_collection(mut properties: CollectionProperties) -> CollectionProperties {
    properties.rid = Some(resource_id());
    properties.etag = Some(etag());
    properties
}

fn resource_id() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

fn etag() -> String {
    format!("\"{}\"", Uuid::new_v4())
}

fn missing_collection(path: &CollectionPath) -> StoreError {
    StoreError::not_found("Collection", path)
}

fn document_id(document: &Value) -> StoreResult<String> {
    match document.get("id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        _ => Err(StoreError::bad_request(
            "The input content is invalid because the required property 'id' is missing",
        )),
    }
}

/// Resolves the partition a request addresses, enforcing the header rules
fn request_partition(
    collection: &Collection,
    partition_key: Option<&PartitionKey>,
) -> StoreResult<Option<PartitionKey>> {
    match (collection.properties.partition_key_path(), partition_key) {
        (Some(_), Some(pk)) => Ok(Some(pk.clone())),
        (Some(path), None) => Err(StoreError::bad_request(format!(
            "PartitionKey value must be supplied for this operation (collection partitioned on {})",
            path
        ))),
        (None, Some(_)) => Err(StoreError::bad_request(
            "Partition key provided either doesn't correspond to definition in the collection or doesn't match partition key field values specified in the document",
        )),
        (None, None) => Ok(None),
    }
}

/// Checks that a written body belongs to the partition named in the request
fn check_body_partition(
    collection: &Collection,
    document: &Value,
    partition: Option<&PartitionKey>,
) -> StoreResult<()> {
    if let (Some(path), Some(pk)) = (collection.properties.partition_key_path(), partition) {
        if &PartitionKey::extract(document, path) != pk {
            return Err(StoreError::bad_request(
                "PartitionKey extracted from document doesn't match the one specified in the header",
            ));
        }
    }
    Ok(())
}

fn with_system_properties(document: &Value) -> StoreResult<Value> {
    let mut body = match document {
        Value::Object(map) => map.clone(),
        _ => return Err(StoreError::bad_request("The document body must be a JSON object")),
    };
    body.insert("_ts".to_string(), Value::from(Utc::now().timestamp()));
    body.insert("_etag".to_string(), Value::String(etag()));
    Ok(Value::Object(body))
}

#[async_trait]
impl DocumentClient for InMemoryClient {
    async fn read_database(&self, database_id: &str) -> StoreResult<DatabaseProperties> {
        self.enter(StoreOperation::ReadDatabase).await?;
        self.state
            .read()
            .await
            .databases
            .get(database_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Database", database_id))
    }

    async fn create_database(&self, database_id: &str) -> StoreResult<DatabaseProperties> {
        self.enter(StoreOperation::CreateDatabase).await?;
        let mut state = self.state.write().await;
        if state.databases.contains_key(database_id) {
            return Err(StoreError::conflict("Database", database_id));
        }
        let created = database(database_id);
        state.databases.insert(database_id.to_string(), created.clone());
        Ok(created)
    }

    async fn read_collection(&self, path: &CollectionPath) -> StoreResult<CollectionProperties> {
        self.enter(StoreOperation::ReadCollection).await?;
        let state = self.state.read().await;
        if !state.databases.contains_key(&path.database_id) {
            return Err(StoreError::not_found("Database", &path.database_id));
        }
        state
            .collections
            .get(&collection_key(path))
            .map(|c| c.properties.clone())
            .ok_or_else(|| missing_collection(path))
    }

    async fn create_collection(
        &self,
        database_id: &str,
        collection: &CollectionProperties,
        throughput: Option<u32>,
    ) -> StoreResult<CollectionProperties> {
        self.enter(StoreOperation::CreateCollection).await?;
        let mut state = self.state.write().await;
        if !state.databases.contains_key(database_id) {
            return Err(StoreError::not_found("Database", database_id));
        }

        let key = (database_id.to_string(), collection.id.clone());
        if state.collections.contains_key(&key) {
            return Err(StoreError::conflict("Collection", &collection.id));
        }

        let properties = system_collection(collection.clone());
        state.collections.insert(
            key,
            Collection {
                properties: properties.clone(),
                throughput,
                documents: Vec::new(),
            },
        );
        Ok(properties)
    }

    async fn read_document(
        &self,
        path: &CollectionPath,
        id: &DocumentId,
        partition_key: Option<&PartitionKey>,
    ) -> StoreResult<Value> {
        self.enter(StoreOperation::ReadDocument).await?;
        let state = self.state.read().await;
        let collection = state
            .collections
            .get(&collection_key(path))
            .ok_or_else(|| missing_collection(path))?;
        let partition = request_partition(collection, partition_key)?;

        collection
            .position(partition.as_ref(), id.as_str())
            .map(|index| collection.documents[index].body.clone())
            .ok_or_else(|| StoreError::not_found("Document", id))
    }

    async fn create_document(
        &self,
        path: &CollectionPath,
        document: &Value,
        partition_key: Option<&PartitionKey>,
    ) -> StoreResult<Value> {
        self.enter(StoreOperation::CreateDocument).await?;
        let mut state = self.state.write().await;
        let collection = state
            .collections
            .get_mut(&collection_key(path))
            .ok_or_else(|| missing_collection(path))?;
        let partition = request_partition(collection, partition_key)?;
        let id = document_id(document)?;
        check_body_partition(collection, document, partition.as_ref())?;

        if collection.position(partition.as_ref(), &id).is_some() {
            return Err(StoreError::conflict("Document", &id));
        }

        let body = with_system_properties(document)?;
        collection.documents.push(StoredDocument {
            partition,
            id,
            body: body.clone(),
        });
        Ok(body)
    }

    async fn replace_document(
        &self,
        path: &CollectionPath,
        id: &DocumentId,
        document: &Value,
        partition_key: Option<&PartitionKey>,
    ) -> StoreResult<Value> {
        self.enter(StoreOperation::ReplaceDocument).await?;
        let mut state = self.state.write().await;
        let collection = state
            .collections
            .get_mut(&collection_key(path))
            .ok_or_else(|| missing_collection(path))?;
        let partition = request_partition(collection, partition_key)?;

        if document_id(document)? != id.as_str() {
            return Err(StoreError::bad_request(
                "The id in the document body does not match the id in the request",
            ));
        }
        check_body_partition(collection, document, partition.as_ref())?;

        let index = collection
            .position(partition.as_ref(), id.as_str())
            .ok_or_else(|| StoreError::not_found("Document", id))?;
        let body = with_system_properties(document)?;
        collection.documents[index].body = body.clone();
        Ok(body)
    }

    async fn delete_document(
        &self,
        path: &CollectionPath,
        id: &DocumentId,
        partition_key: Option<&PartitionKey>,
    ) -> StoreResult<()> {
        self.enter(StoreOperation::DeleteDocument).await?;
        let mut state = self.state.write().await;
        let collection = state
            .collections
            .get_mut(&collection_key(path))
            .ok_or_else(|| missing_collection(path))?;
        let partition = request_partition(collection, partition_key)?;

        let index = collection
            .position(partition.as_ref(), id.as_str())
            .ok_or_else(|| StoreError::not_found("Document", id))?;
        collection.documents.remove(index);
        Ok(())
    }

    async fn query_documents(
        &self,
        path: &CollectionPath,
        predicate: &Predicate,
        continuation: Option<&str>,
    ) -> StoreResult<QueryPage> {
        self.enter(StoreOperation::QueryDocuments).await?;
        let state = self.state.read().await;
        let collection = state
            .collections
            .get(&collection_key(path))
            .ok_or_else(|| missing_collection(path))?;

        let offset = match continuation {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| StoreError::bad_request(format!("Invalid continuation token '{}'", token)))?,
            None => 0,
        };

        let matches: Vec<&Value> = collection
            .documents
            .iter()
            .map(|doc| &doc.body)
            .filter(|body| predicate.matches(body))
            .collect();

        let end = match self.page_size {
            Some(size) => (offset + size).min(matches.len()),
            None => matches.len(),
        };
        let documents = matches[offset.min(end)..end]
            .iter()
            .map(|body| (*body).clone())
            .collect();
        let continuation = (end < matches.len()).then(|| end.to_string());

        Ok(QueryPage {
            documents,
            continuation,
        })
    }
}
