//! Document database provisioning pre-flight
//!
//! Ensures the configured database and collection exist, then exits. Run it
//! before deploying services that open repositories on the same collection.
//!
//! # Usage
//!
//! ```bash
//! # Settings from DOCDB_* environment variables (or .env)
//! cargo run --bin docdb-provision
//!
//! # Settings from a file, with DOCDB_* overrides
//! cargo run --bin docdb-provision -- settings.toml
//! ```
//!
//! # Environment Variables
//!
//! * `DOCDB_ENDPOINT` - Account endpoint URI
//! * `DOCDB_KEY` - Base64 master key
//! * `DOCDB_DATABASE_ID` - Database to provision
//! * `DOCDB_COLLECTION_ID` - Collection to provision
//! * `DOCDB_PARTITION_KEY` - Partition-key path for a new collection (optional)
//! * `DOCDB_TIMEOUT` - Per-step timeout in milliseconds
//! * `DOCDB_LOG_LEVEL` - Log level when `RUST_LOG` is unset (default: info)
//! * `DOCDB_LOG_FORMAT` - `json` for JSON log lines (default: plain text)

use infra_docdb::{provision, CosmosClient, Settings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    init_tracing();

    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::from_file(&path)?,
        None => Settings::from_env()?,
    };

    tracing::info!(
        endpoint = %settings.endpoint,
        database = %settings.database_id,
        collection = %settings.collection_id,
        "Provisioning document collection"
    );

    let client = CosmosClient::from_settings(&settings)?;
    let provisioned = provision(&client, &settings).await.map_err(|e| {
        tracing::error!(error = %e, "Provisioning failed");
        e
    })?;

    tracing::info!(
        collection = %provisioned.path,
        partition_key = ?provisioned.partition_key_path(),
        "Provisioning complete"
    );
    Ok(())
}

/// Installs the global subscriber; `RUST_LOG` wins over `DOCDB_LOG_LEVEL`
fn init_tracing() {
    let log_level = std::env::var("DOCDB_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var("DOCDB_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}
