//! Pre-built Test Fixtures
//!
//! Provides ready-to-use settings and entities for repository tests.
//! These fixtures are designed to be consistent and predictable.

use infra_docdb::Settings;
use serde::{Deserialize, Serialize};

/// Sample entity stored in the test collections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gadget {
    pub id: String,
    pub category: String,
    pub name: String,
    pub x: i64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Gadget {
    pub fn new(id: impl Into<String>, category: impl Into<String>, x: i64) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            name: "gadget".to_string(),
            x,
            tags: Vec::new(),
        }
    }
}

/// Fixture for repository settings
pub struct SettingsFixtures;

impl SettingsFixtures {
    /// Well-known key of the local emulator
    pub const EMULATOR_KEY: &'static str =
        "C2y6yDjf5/R+ob0N8A7Cgv30VRDJIWEHLM+4QDU5DE2nQ9nDuVTqobD4b8mGGyPMbIZnqyMsEcaGQy67XIw/Jw==";

    /// Endpoint of the local emulator
    pub const EMULATOR_ENDPOINT: &'static str = "https://localhost:8081/";

    /// Settings for the `shop/gadgets` collection partitioned on `/category`
    pub fn partitioned() -> Settings {
        Self::unpartitioned().with_partition_key("/category")
    }

    /// Settings for the `shop/gadgets` collection without a partition key
    pub fn unpartitioned() -> Settings {
        Settings::new(Self::EMULATOR_ENDPOINT, Self::EMULATOR_KEY, "shop", "gadgets")
            .with_timeout("5000")
    }

    /// Settings whose timeout is not a number
    pub fn malformed_timeout() -> Settings {
        Self::unpartitioned().with_timeout("five seconds")
    }
}

/// Fixture for entities
pub struct GadgetFixtures;

impl GadgetFixtures {
    pub fn wrench() -> Gadget {
        Gadget {
            id: "g-wrench".to_string(),
            category: "tools".to_string(),
            name: "Wrench".to_string(),
            x: 1,
            tags: vec!["metal".to_string()],
        }
    }

    pub fn hammer() -> Gadget {
        Gadget {
            id: "g-hammer".to_string(),
            category: "tools".to_string(),
            name: "Hammer".to_string(),
            x: 2,
            tags: vec!["metal".to_string(), "heavy".to_string()],
        }
    }

    pub fn kite() -> Gadget {
        Gadget {
            id: "g-kite".to_string(),
            category: "toys".to_string(),
            name: "Kite".to_string(),
            x: 1,
            tags: Vec::new(),
        }
    }

    /// Wrench, hammer and kite
    pub fn catalog() -> Vec<Gadget> {
        vec![Self::wrench(), Self::hammer(), Self::kite()]
    }
}
