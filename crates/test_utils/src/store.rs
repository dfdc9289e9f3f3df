//! Store Test Utilities
//!
//! Helpers for building repositories over the in-memory client, and for
//! pointing tests at a live emulator when one is configured.

use once_cell::sync::Lazy;
use uuid::Uuid;

use docdb_kernel::{Repository, StoreResult};
use infra_docdb::{DocumentRepository, InMemoryClient, Settings};

use crate::fixtures::Gadget;

/// Environment variable naming a live emulator endpoint for opt-in tests
pub const EMULATOR_ENDPOINT_VAR: &str = "DOCDB_TEST_ENDPOINT";

/// Environment variable holding the emulator key; defaults to the well-known key
pub const EMULATOR_KEY_VAR: &str = "DOCDB_TEST_KEY";

/// Suffix shared by every collection created in this test run
static RUN_ID: Lazy<String> = Lazy::new(|| Uuid::new_v4().simple().to_string()[..8].to_string());

/// Repository type used by the in-memory tests
pub type GadgetRepository = DocumentRepository<Gadget, InMemoryClient>;

/// Builds a repository over `client`, provisioning the collection in `settings`
pub async fn gadget_repository(
    client: &InMemoryClient,
    settings: &Settings,
) -> StoreResult<GadgetRepository> {
    DocumentRepository::with_client(client.clone(), settings).await
}

/// Adds every gadget in `gadgets`, panicking on the first failure
pub async fn seed<R: Repository<Gadget> + ?Sized>(repo: &R, gadgets: &[Gadget]) {
    for gadget in gadgets {
        repo.add(gadget)
            .await
            .unwrap_or_else(|e| panic!("Failed to seed gadget {}: {}", gadget.id, e));
    }
}

/// Settings for a live emulator, if `DOCDB_TEST_ENDPOINT` is set
///
/// The collection id carries a per-run suffix so concurrent runs do not
/// share documents.
pub fn emulator_settings(collection: &str) -> Option<Settings> {
    let endpoint = std::env::var(EMULATOR_ENDPOINT_VAR).ok()?;
    let key = std::env::var(EMULATOR_KEY_VAR)
        .unwrap_or_else(|_| crate::fixtures::SettingsFixtures::EMULATOR_KEY.to_string());

    Some(
        Settings::new(endpoint, key, "docdb-tests", format!("{}-{}", collection, *RUN_ID))
            .with_timeout("30000"),
    )
}
