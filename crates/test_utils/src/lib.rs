//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! document repository test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built settings and entities
//! - `builders`: Builder patterns for test entities
//! - `store`: In-memory store setup and optional emulator settings
//! - `assertions`: Assertion helpers for store errors and result sets
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod store;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use store::*;
pub use assertions::*;
pub use generators::*;
