//! Document Database Infrastructure
//!
//! This crate implements the `Repository<T>` port from `docdb_kernel` on top
//! of a Cosmos-style document database reached over its REST API.
//!
//! # Architecture
//!
//! - [`settings`]: endpoint, key, database/collection ids, partition path, timeout
//! - [`auth`]: master-key request signing
//! - [`client`]: the `DocumentClient` seam, with the HTTP client and an
//!   in-memory client (feature `mock`)
//! - [`provision`]: idempotent database and collection creation
//! - [`repository`]: `DocumentRepository<T>`, typed CRUD and predicate queries
//!
//! # Example
//!
//! ```rust,ignore
//! use docdb_kernel::{Field, Repository};
//! use infra_docdb::{DocumentRepository, Settings};
//!
//! let settings = Settings::from_env()?.for_collection("orders");
//! let orders: DocumentRepository<Order> = DocumentRepository::connect(&settings).await?;
//! let open = orders.get_all(Field::new("status").eq("open")).await?;
//! ```

pub mod auth;
pub mod client;
mod error;
pub mod provision;
pub mod repository;
pub mod resources;
pub mod settings;

pub use client::{CosmosClient, DocumentClient};
#[cfg(any(test, feature = "mock"))]
pub use client::InMemoryClient;
#[cfg(any(test, feature = "mock"))]
pub use client::memory::StoreOperation;
pub use provision::{provision, Provisioned, DEFAULT_THROUGHPUT};
pub use repository::DocumentRepository;
pub use resources::{CollectionPath, CollectionProperties, DatabaseProperties, QueryPage};
pub use settings::{Settings, FALLBACK_TIMEOUT};
