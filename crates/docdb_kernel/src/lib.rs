//! Document Kernel - Foundational types for the document repository
//!
//! This crate provides the building blocks shared by every repository adapter:
//! - The `Repository` port implemented by storage adapters
//! - Document addressing (`DocumentId`, `PartitionKey`, `DocumentKey`)
//! - The `StoreError` taxonomy returned by every operation
//! - A small predicate language rendered to parameterized SQL queries

pub mod error;
pub mod identifiers;
pub mod ports;
pub mod query;

pub use error::{StoreError, StoreResult};
pub use identifiers::{DocumentId, DocumentKey, PartitionKey};
pub use ports::Repository;
pub use query::{CompareOp, Field, Predicate, SqlParameter, SqlQuerySpec};
