//! REST client for the document database
//!
//! Requests are signed with the account master key and sent with the
//! configured timeout as the per-request ceiling. Responses with a
//! non-success status are returned as `StoreError::Remote`.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use docdb_kernel::{DocumentId, PartitionKey, Predicate, SqlQuerySpec, StoreError, StoreResult};

use crate::auth::MasterKeyCredential;
use crate::error::{fault_from_response, fault_from_transport};
use crate::resources::{
    database_link, CollectionPath, CollectionProperties, DatabaseProperties, QueryPage,
    ResourceType,
};
use crate::settings::Settings;

use super::DocumentClient;

/// REST API version sent with every request
pub const API_VERSION: &str = "2018-12-31";

const PARTITION_KEY_HEADER: &str = "x-ms-documentdb-partitionkey";
const CONTINUATION_HEADER: &str = "x-ms-continuation";
const THROUGHPUT_HEADER: &str = "x-ms-offer-throughput";

/// Client for the document database REST API
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct CosmosClient {
    http: reqwest::Client,
    endpoint: Url,
    credential: MasterKeyCredential,
    timeout: Duration,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(rename = "Documents", default)]
    documents: Vec<Value>,
}

impl CosmosClient {
    /// Creates a client for the account at `endpoint`
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Account URI, e.g. "https://account.documents.azure.com:443/"
    /// * `key` - Base64 master key
    /// * `timeout` - Ceiling applied to every request
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Configuration` if the endpoint is not a base URL or
    /// the key is not valid base64
    pub fn new(endpoint: &str, key: &str, timeout: Duration) -> StoreResult<Self> {
        let endpoint = Url::parse(endpoint.trim())
            .map_err(|e| StoreError::configuration(format!("invalid endpoint '{}': {}", endpoint, e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(StoreError::configuration(format!(
                "endpoint '{}' cannot address resources",
                endpoint
            )));
        }

        let credential = MasterKeyCredential::from_base64(key)?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Unavailable {
                message: format!("failed to build HTTP client: {}", e),
                source: Some(Box::new(e)),
            })?;

        info!(
            endpoint = %endpoint,
            timeout_ms = timeout.as_millis() as u64,
            "Document database client created"
        );

        Ok(Self {
            http,
            endpoint,
            credential,
            timeout,
        })
    }

    /// Creates a client from validated settings
    pub fn from_settings(settings: &Settings) -> StoreResult<Self> {
        settings.validate()?;
        Self::new(&settings.endpoint, &settings.key, settings.request_timeout())
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, segments: &[&str]) -> StoreResult<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::configuration("endpoint cannot address resources"))?
            .clear()
            .extend(segments);
        Ok(url)
    }

    /// Starts a signed request for the resource at `resource_link`
    fn request(
        &self,
        method: Method,
        resource_type: ResourceType,
        resource_link: &str,
        segments: &[&str],
    ) -> StoreResult<RequestBuilder> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let authorization =
            self.credential
                .authorization(method.as_str(), resource_type, resource_link, &date)?;
        let url = self.url(segments)?;

        Ok(self
            .http
            .request(method, url)
            .header("authorization", authorization)
            .header("x-ms-date", date)
            .header("x-ms-version", API_VERSION)
            .header(ACCEPT, "application/json"))
    }

    async fn execute(&self, request: RequestBuilder, operation: &str) -> StoreResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| fault_from_transport(e, operation, self.timeout))?;

        let status = response.status();
        debug!(operation, status = status.as_u16(), "Store responded");

        if status.is_success() {
            Ok(response)
        } else {
            Err(fault_from_response(response).await)
        }
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        response: Response,
        operation: &str,
    ) -> StoreResult<T> {
        let body = response
            .bytes()
            .await
            .map_err(|e| fault_from_transport(e, operation, self.timeout))?;
        Ok(serde_json::from_slice(&body)?)
    }
}

fn with_partition(request: RequestBuilder, partition_key: Option<&PartitionKey>) -> RequestBuilder {
    match partition_key {
        Some(pk) => request.header(PARTITION_KEY_HEADER, pk.header_value()),
        None => request,
    }
}

#[async_trait]
impl DocumentClient for CosmosClient {
    async fn read_database(&self, database_id: &str) -> StoreResult<DatabaseProperties> {
        let request = self.request(
            Method::GET,
            ResourceType::Database,
            &database_link(database_id),
            &["dbs", database_id],
        )?;
        let response = self.execute(request, "read database").await?;
        self.read_json(response, "read database").await
    }

    async fn create_database(&self, database_id: &str) -> StoreResult<DatabaseProperties> {
        let request = self
            .request(Method::POST, ResourceType::Database, "", &["dbs"])?
            .json(&json!({ "id": database_id }));
        let response = self.execute(request, "create database").await?;
        self.read_json(response, "create database").await
    }

    async fn read_collection(&self, path: &CollectionPath) -> StoreResult<CollectionProperties> {
        let request = self.request(
            Method::GET,
            ResourceType::Collection,
            &path.collection_link(),
            &["dbs", &path.database_id, "colls", &path.collection_id],
        )?;
        let response = self.execute(request, "read collection").await?;
        self.read_json(response, "read collection").await
    }

    async fn create_collection(
        &self,
        database_id: &str,
        collection: &CollectionProperties,
        throughput: Option<u32>,
    ) -> StoreResult<CollectionProperties> {
        let mut request = self
            .request(
                Method::POST,
                ResourceType::Collection,
                &database_link(database_id),
                &["dbs", database_id, "colls"],
            )?
            .json(collection);
        if let Some(throughput) = throughput {
            request = request.header(THROUGHPUT_HEADER, throughput.to_string());
        }
        let response = self.execute(request, "create collection").await?;
        self.read_json(response, "create collection").await
    }

    async fn read_document(
        &self,
        path: &CollectionPath,
        id: &DocumentId,
        partition_key: Option<&PartitionKey>,
    ) -> StoreResult<Value> {
        let request = self.request(
            Method::GET,
            ResourceType::Document,
            &path.document_link(id.as_str()),
            &["dbs", &path.database_id, "colls", &path.collection_id, "docs", id.as_str()],
        )?;
        let response = self
            .execute(with_partition(request, partition_key), "read document")
            .await?;
        self.read_json(response, "read document").await
    }

    async fn create_document(
        &self,
        path: &CollectionPath,
        document: &Value,
        partition_key: Option<&PartitionKey>,
    ) -> StoreResult<Value> {
        let request = self
            .request(
                Method::POST,
                ResourceType::Document,
                &path.collection_link(),
                &["dbs", &path.database_id, "colls", &path.collection_id, "docs"],
            )?
            .json(document);
        let response = self
            .execute(with_partition(request, partition_key), "create document")
            .await?;
        self.read_json(response, "create document").await
    }

    async fn replace_document(
        &self,
        path: &CollectionPath,
        id: &DocumentId,
        document: &Value,
        partition_key: Option<&PartitionKey>,
    ) -> StoreResult<Value> {
        let request = self
            .request(
                Method::PUT,
                ResourceType::Document,
                &path.document_link(id.as_str()),
                &["dbs", &path.database_id, "colls", &path.collection_id, "docs", id.as_str()],
            )?
            .json(document);
        let response = self
            .execute(with_partition(request, partition_key), "replace document")
            .await?;
        self.read_json(response, "replace document").await
    }

    async fn delete_document(
        &self,
        path: &CollectionPath,
        id: &DocumentId,
        partition_key: Option<&PartitionKey>,
    ) -> StoreResult<()> {
        let request = self.request(
            Method::DELETE,
            ResourceType::Document,
            &path.document_link(id.as_str()),
            &["dbs", &path.database_id, "colls", &path.collection_id, "docs", id.as_str()],
        )?;
        self.execute(with_partition(request, partition_key), "delete document")
            .await?;
        Ok(())
    }

    async fn query_documents(
        &self,
        path: &CollectionPath,
        predicate: &Predicate,
        continuation: Option<&str>,
    ) -> StoreResult<QueryPage> {
        let query = SqlQuerySpec::select_where(predicate);
        debug!(collection = %path, query = %query.query, "Querying documents");

        let mut request = self
            .request(
                Method::POST,
                ResourceType::Document,
                &path.collection_link(),
                &["dbs", &path.database_id, "colls", &path.collection_id, "docs"],
            )?
            .header(CONTENT_TYPE, "application/query+json")
            .header("x-ms-documentdb-isquery", "True")
            .header("x-ms-max-item-count", "-1")
            .header("x-ms-documentdb-query-enablecrosspartition", "True")
            .body(serde_json::to_vec(&query)?);
        if let Some(token) = continuation {
            request = request.header(CONTINUATION_HEADER, token);
        }

        let response = self.execute(request, "query documents").await?;
        let continuation = response
            .headers()
            .get(CONTINUATION_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|token| !token.is_empty())
            .map(str::to_string);
        let page: QueryResponse = self.read_json(response, "query documents").await?;

        Ok(QueryPage {
            documents: page.documents,
            continuation,
        })
    }
}
