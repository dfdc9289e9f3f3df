//! Integration Tests for the document repository
//!
//! These tests drive `DocumentRepository` end to end through the `Repository`
//! port, against the in-memory client unless noted otherwise.

use std::sync::Arc;
use std::time::Duration;

use docdb_kernel::{DocumentKey, Field, Predicate, Repository};
use infra_docdb::{
    CollectionPath, DocumentRepository, InMemoryClient, StoreOperation, FALLBACK_TIMEOUT,
};
use test_utils::{
    assert_remote_status, assert_same_members, assert_timeout, assert_unsupported,
    gadget_repository, seed, Gadget, GadgetFixtures, GadgetRepository, SettingsFixtures,
    TestGadgetBuilder,
};

fn gadgets_path() -> CollectionPath {
    CollectionPath::new("shop", "gadgets")
}

async fn partitioned_repo(client: &InMemoryClient) -> GadgetRepository {
    gadget_repository(client, &SettingsFixtures::partitioned())
        .await
        .expect("Failed to build repository")
}

mod provisioning {
    use super::*;

    /// Two repositories racing on a brand-new database both come up, and the
    /// database and collection exist once
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_construction_is_idempotent() {
        let client = InMemoryClient::new().with_latency(Duration::from_millis(2));
        let settings = SettingsFixtures::partitioned();

        let (first, second) = tokio::join!(
            gadget_repository(&client, &settings),
            gadget_repository(&client, &settings),
        );
        let first = first.expect("first construction failed");
        let second = second.expect("second construction failed");

        assert!(client.has_database("shop").await);
        let collection = client.collection(&gadgets_path()).await.expect("collection missing");
        assert_eq!(collection.partition_key_path(), Some("/category"));

        let key = first.add(&GadgetFixtures::wrench()).await.unwrap();
        assert_eq!(
            second.get_by_id(key).await.unwrap(),
            Some(GadgetFixtures::wrench())
        );
    }

    #[tokio::test]
    async fn test_construction_against_existing_collection_creates_nothing() {
        let client = InMemoryClient::new();
        client.seed_collection(&gadgets_path(), Some("/category")).await;

        partitioned_repo(&client).await;

        assert_eq!(client.calls(StoreOperation::CreateDatabase).await, 0);
        assert_eq!(client.calls(StoreOperation::CreateCollection).await, 0);
    }

    #[tokio::test]
    async fn test_construction_fails_on_rejected_read() {
        let client = InMemoryClient::new();
        client.fail_next(StoreOperation::ReadCollection, 401).await;

        let result = gadget_repository(&client, &SettingsFixtures::partitioned()).await;
        assert_remote_status(result.map(|_| ()), 401);
    }

    /// A malformed timeout does not prevent construction
    #[tokio::test]
    async fn test_malformed_timeout_still_constructs() {
        let settings = SettingsFixtures::malformed_timeout();
        assert_eq!(settings.request_timeout(), FALLBACK_TIMEOUT);

        let client = InMemoryClient::new();
        let repo = gadget_repository(&client, &settings).await;

        assert!(repo.is_ok());
    }

    /// The fallback timeout bounds provisioning once it is in effect
    #[tokio::test(start_paused = true)]
    async fn test_fallback_timeout_bounds_provisioning() {
        let client = InMemoryClient::new().with_latency(Duration::from_millis(50));

        let result = gadget_repository(&client, &SettingsFixtures::malformed_timeout()).await;
        assert_timeout(result.map(|_| ()));
    }
}

mod crud {
    use super::*;

    #[tokio::test]
    async fn test_get_by_id_on_unknown_id_is_absent() {
        let client = InMemoryClient::new();
        let repo = partitioned_repo(&client).await;

        let found = repo
            .get_by_id(DocumentKey::partitioned("never-inserted", "tools"))
            .await
            .unwrap();

        assert_eq!(found, None);
        assert!(!repo
            .find_by_id(DocumentKey::partitioned("never-inserted", "tools"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_add_then_get_round_trips() {
        let client = InMemoryClient::new();
        let repo = partitioned_repo(&client).await;
        let gadget = TestGadgetBuilder::new()
            .with_category("garden")
            .with_x(42)
            .tagged("outdoor")
            .build();

        let key = repo.add(&gadget).await.unwrap();

        assert_eq!(repo.get_by_id(key).await.unwrap(), Some(gadget));
    }

    #[tokio::test]
    async fn test_add_duplicate_id_conflicts() {
        let client = InMemoryClient::new();
        let repo = partitioned_repo(&client).await;
        repo.add(&GadgetFixtures::wrench()).await.unwrap();

        assert_remote_status(repo.add(&GadgetFixtures::wrench()).await, 409);
    }

    /// Update replaces the whole document; fields absent from the new value are gone
    #[tokio::test]
    async fn test_update_fully_replaces() {
        let client = InMemoryClient::new();
        let repo = partitioned_repo(&client).await;
        let key = repo.add(&GadgetFixtures::hammer()).await.unwrap();

        let replacement = Gadget {
            name: "Sledgehammer".to_string(),
            x: 9,
            tags: Vec::new(),
            ..GadgetFixtures::hammer()
        };
        repo.update(&replacement, key.clone()).await.unwrap();

        assert_eq!(repo.get_by_id(key).await.unwrap(), Some(replacement));
        let stored = client.documents(&gadgets_path()).await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["tags"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_update_missing_document_is_a_fault() {
        let client = InMemoryClient::new();
        let repo = partitioned_repo(&client).await;
        let ghost = GadgetFixtures::kite();

        let result = repo
            .update(&ghost, DocumentKey::partitioned(ghost.id.as_str(), "toys"))
            .await;
        assert_remote_status(result, 404);
    }

    #[tokio::test]
    async fn test_delete_then_get_is_absent() {
        let client = InMemoryClient::new();
        let repo = partitioned_repo(&client).await;
        let key = repo.add(&GadgetFixtures::kite()).await.unwrap();

        repo.delete_by(key.clone()).await.unwrap();

        assert_eq!(repo.get_by_id(key).await.unwrap(), None);
    }

    /// Deleting a missing document fails, unlike reading one
    #[tokio::test]
    async fn test_delete_missing_document_is_a_fault() {
        let client = InMemoryClient::new();
        let repo = partitioned_repo(&client).await;

        let result = repo
            .delete_by(DocumentKey::partitioned("never-inserted", "tools"))
            .await;
        assert_remote_status(result, 404);
    }

    #[tokio::test]
    async fn test_unpartitioned_collection_accepts_bare_ids() {
        let client = InMemoryClient::new();
        let repo = gadget_repository(&client, &SettingsFixtures::unpartitioned())
            .await
            .unwrap();
        let key = repo.add(&GadgetFixtures::wrench()).await.unwrap();

        assert_eq!(key, DocumentKey::new("g-wrench"));
        assert!(repo.find_by_id("g-wrench".into()).await.unwrap());
        repo.delete_by("g-wrench".into()).await.unwrap();
        assert!(!repo.find_by_id("g-wrench".into()).await.unwrap());
    }

    #[tokio::test]
    async fn test_repository_is_shareable_as_port() {
        let client = InMemoryClient::new();
        let repo: Arc<dyn Repository<Gadget>> = Arc::new(partitioned_repo(&client).await);

        let handles: Vec<_> = GadgetFixtures::catalog()
            .into_iter()
            .map(|gadget| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move { repo.add(&gadget).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(client.documents(&gadgets_path()).await.len(), 3);
    }
}

mod queries {
    use super::*;

    #[tokio::test]
    async fn test_get_all_returns_exactly_the_matches() {
        let client = InMemoryClient::new();
        let repo = partitioned_repo(&client).await;
        let a = TestGadgetBuilder::new().with_id("a").with_x(1).build();
        let b = TestGadgetBuilder::new().with_id("b").with_x(2).with_category("toys").build();
        let c = TestGadgetBuilder::new().with_id("c").with_x(1).with_category("garden").build();
        seed(&repo, &[a.clone(), b, c.clone()]).await;

        let matches = repo.get_all(Field::new("x").eq(1)).await.unwrap();

        assert_same_members(&matches, &[a, c]);
    }

    #[tokio::test]
    async fn test_get_all_drains_many_pages() {
        let client = InMemoryClient::new().with_page_size(3);
        let repo = partitioned_repo(&client).await;
        seed(&repo, &test_utils::gadget_batch(20, "tools", 4)).await;

        let matches = repo.get_all(Field::new("x").eq(0)).await.unwrap();

        assert_eq!(matches.len(), 5);
        assert!(client.calls(StoreOperation::QueryDocuments).await >= 2);
    }

    #[tokio::test]
    async fn test_get_all_with_no_matches_is_empty() {
        let client = InMemoryClient::new();
        let repo = partitioned_repo(&client).await;
        seed(&repo, &GadgetFixtures::catalog()).await;

        let matches = repo
            .get_all(Field::new("category").eq("tools").and(Field::new("x").gt(5)))
            .await
            .unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn test_match_all_predicate_lists_everything() {
        let client = InMemoryClient::new();
        let repo = partitioned_repo(&client).await;
        seed(&repo, &GadgetFixtures::catalog()).await;

        let everything = repo.get_all(Predicate::all()).await.unwrap();
        assert_same_members(&everything, &GadgetFixtures::catalog());
    }

    /// The unsupported overloads fail the same way whatever the collection holds
    #[tokio::test]
    async fn test_unsupported_overloads() {
        let client = InMemoryClient::new();
        let repo = partitioned_repo(&client).await;

        assert_unsupported(repo.get_all_unfiltered().await);
        assert_unsupported(repo.delete_by_entity(&GadgetFixtures::wrench()).await);

        seed(&repo, &GadgetFixtures::catalog()).await;
        assert_unsupported(repo.get_all_unfiltered().await);
        assert_unsupported(repo.delete_by_entity(&GadgetFixtures::wrench()).await);
        assert_eq!(client.documents(&gadgets_path()).await.len(), 3);
    }
}

mod properties {
    use super::*;
    use proptest::prelude::*;
    use test_utils::{gadget_batch_strategy, predicate_strategy};

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        /// The store returns exactly the gadgets the predicate matches locally
        #[test]
        fn prop_get_all_agrees_with_local_evaluation(
            gadgets in gadget_batch_strategy(12),
            predicate in predicate_strategy(),
        ) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            let (actual, expected) = runtime.block_on(async {
                let client = InMemoryClient::new().with_page_size(4);
                let repo = partitioned_repo(&client).await;
                seed(&repo, &gadgets).await;

                let expected: Vec<Gadget> = gadgets
                    .iter()
                    .filter(|g| predicate.matches(&serde_json::to_value(g).unwrap()))
                    .cloned()
                    .collect();
                (repo.get_all(predicate.clone()).await.unwrap(), expected)
            });

            prop_assert_eq!(actual.len(), expected.len());
            for gadget in &expected {
                prop_assert!(actual.contains(gadget));
            }
        }
    }
}

/// Runs against a live emulator when `DOCDB_TEST_ENDPOINT` is set
mod emulator {
    use super::*;
    use test_utils::emulator_settings;

    #[tokio::test]
    async fn test_round_trip_against_emulator() {
        let Some(settings) = emulator_settings("gadgets") else {
            return;
        };
        let settings = settings.with_partition_key("/category");

        let repo: DocumentRepository<Gadget> = DocumentRepository::connect(&settings)
            .await
            .expect("Failed to connect to emulator");
        let gadget = TestGadgetBuilder::new().with_x(7).build();

        let key = repo.add(&gadget).await.unwrap();
        assert_eq!(repo.get_by_id(key.clone()).await.unwrap(), Some(gadget));

        repo.delete_by(key.clone()).await.unwrap();
        assert_eq!(repo.get_by_id(key.clone()).await.unwrap(), None);
        assert_remote_status(repo.delete_by(key).await, 404);
    }
}
