//! Fetch cache behavior against a fake catalog

mod helpers;

use deckstat::models::ResourceKind;
use deckstat_common::Error;
use helpers::{create_fetch_cache, create_resolver, create_test_store, FakeCatalog};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_store_hit_skips_network() {
    let (_dir, store) = create_test_store().await;
    let catalog = Arc::new(FakeCatalog::new());
    store
        .save(ResourceKind::Card, "01030", &json!({ "code": "01030", "name": "Stored" }))
        .await
        .unwrap();

    let cache = create_fetch_cache(Arc::clone(&store), Arc::clone(&catalog), 3);
    let value = cache.fetch(ResourceKind::Card, "01030").await.unwrap().unwrap();

    assert_eq!(value["name"], "Stored");
    assert_eq!(catalog.total_hits(), 0);
    assert_eq!(cache.remote_fetches(), 0);
}

#[tokio::test]
async fn test_remote_result_persisted_before_return() {
    let (_dir, store) = create_test_store().await;
    let catalog = Arc::new(FakeCatalog::new());
    catalog.add_card("01030", "Magnifying Glass", Some(0));

    let cache = create_fetch_cache(Arc::clone(&store), Arc::clone(&catalog), 3);
    let value = cache.fetch(ResourceKind::Card, "01030").await.unwrap().unwrap();
    assert_eq!(value["name"], "Magnifying Glass");

    let stored = store.load(ResourceKind::Card, "01030").await.unwrap();
    assert_eq!(stored, Some(value));

    // Second fetch is served from the store
    cache.fetch(ResourceKind::Card, "01030").await.unwrap();
    assert_eq!(catalog.hits(ResourceKind::Card, "01030"), 1);
}

#[tokio::test]
async fn test_retry_then_success() {
    let (_dir, store) = create_test_store().await;
    let catalog = Arc::new(FakeCatalog::new());
    catalog.add_deck(42, "01001", &[("01030", 2)]);
    catalog.fail_times(ResourceKind::Decklist, "42", 2);

    let cache = create_fetch_cache(store, Arc::clone(&catalog), 3);
    let value = cache.fetch(ResourceKind::Decklist, "42").await.unwrap();

    assert!(value.is_some());
    assert_eq!(catalog.hits(ResourceKind::Decklist, "42"), 3);
}

#[tokio::test]
async fn test_exhausted_retries_degrade_to_missing() {
    let (_dir, store) = create_test_store().await;
    let catalog = Arc::new(FakeCatalog::new());
    catalog.add_deck(42, "01001", &[("01030", 2)]);
    catalog.fail_times(ResourceKind::Decklist, "42", 5);

    let cache = create_fetch_cache(Arc::clone(&store), Arc::clone(&catalog), 3);
    let value = cache.fetch(ResourceKind::Decklist, "42").await.unwrap();

    assert!(value.is_none());
    assert_eq!(catalog.hits(ResourceKind::Decklist, "42"), 3);
    assert!(store.load(ResourceKind::Decklist, "42").await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_id_is_missing_and_not_cached() {
    let (_dir, store) = create_test_store().await;
    let catalog = Arc::new(FakeCatalog::new());

    let cache = create_fetch_cache(Arc::clone(&store), Arc::clone(&catalog), 2);
    assert!(cache.fetch(ResourceKind::Decklist, "7").await.unwrap().is_none());
    assert!(cache.fetch(ResourceKind::Decklist, "7").await.unwrap().is_none());

    // No negative caching: both calls went to the catalog
    assert_eq!(catalog.hits(ResourceKind::Decklist, "7"), 4);
    assert!(!store.path_for(ResourceKind::Decklist, "7").exists());
}

#[tokio::test]
async fn test_malformed_body_is_missing_and_not_persisted() {
    let (_dir, store) = create_test_store().await;
    let catalog = Arc::new(FakeCatalog::new());
    catalog.add_raw(ResourceKind::Decklist, "1", "<html>maintenance</html>");
    catalog.add_raw(ResourceKind::Decklist, "2", "[1, 2, 3]");

    let cache = create_fetch_cache(Arc::clone(&store), catalog, 1);
    assert!(cache.fetch(ResourceKind::Decklist, "1").await.unwrap().is_none());
    assert!(cache.fetch(ResourceKind::Decklist, "2").await.unwrap().is_none());
    assert!(!store.path_for(ResourceKind::Decklist, "1").exists());
    assert!(!store.path_for(ResourceKind::Decklist, "2").exists());
}

#[tokio::test]
async fn test_corrupt_stored_record_is_refetched() {
    let (_dir, store) = create_test_store().await;
    let catalog = Arc::new(FakeCatalog::new());
    catalog.add_card("01030", "Magnifying Glass", Some(0));
    std::fs::write(store.path_for(ResourceKind::Card, "01030"), "{ truncated").unwrap();

    let cache = create_fetch_cache(Arc::clone(&store), Arc::clone(&catalog), 1);
    let value = cache.fetch(ResourceKind::Card, "01030").await.unwrap().unwrap();

    assert_eq!(value["name"], "Magnifying Glass");
    assert_eq!(catalog.hits(ResourceKind::Card, "01030"), 1);
    assert_eq!(store.load(ResourceKind::Card, "01030").await.unwrap(), Some(value));
}

#[tokio::test]
async fn test_broken_store_is_fatal() {
    let (_dir, store) = create_test_store().await;
    let catalog = Arc::new(FakeCatalog::new());
    catalog.add_deck(1, "01001", &[("01030", 1)]);

    // Replace the decks directory with a plain file
    let decks_dir = store.root().join("decks");
    std::fs::remove_dir_all(&decks_dir).unwrap();
    std::fs::write(&decks_dir, "not a directory").unwrap();

    let cache = create_fetch_cache(store, catalog, 1);
    let result = cache.fetch(ResourceKind::Decklist, "1").await;

    assert!(matches!(result, Err(Error::Storage { .. })));
}

#[tokio::test]
async fn test_malformed_id_is_missing_without_io() {
    let (dir, store) = create_test_store().await;
    let catalog = Arc::new(FakeCatalog::new());
    catalog.add_raw(ResourceKind::Card, "../../x", r#"{"code": "x"}"#);

    let cache = create_fetch_cache(Arc::clone(&store), Arc::clone(&catalog), 2);
    for id in ["../../x", "", "01030/..", "01 030"] {
        assert!(cache.fetch(ResourceKind::Card, id).await.unwrap().is_none());
    }

    assert_eq!(catalog.total_hits(), 0);
    assert_eq!(cache.remote_fetches(), 0);
    assert!(!dir.path().join("x.json").exists());
    assert!(store.list_ids(ResourceKind::Card).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_card_lookup_is_retried_by_next_caller() {
    let (_dir, store) = create_test_store().await;
    let catalog = Arc::new(FakeCatalog::new());
    catalog.add_card("01030", "Magnifying Glass", Some(0));

    // Replace the cards directory with a plain file
    let cards_dir = store.root().join("cards");
    std::fs::remove_dir_all(&cards_dir).unwrap();
    std::fs::write(&cards_dir, "not a directory").unwrap();

    let resolver = create_resolver(Arc::clone(&store), Arc::clone(&catalog));
    let first = resolver.get_card("01030").await;
    assert!(matches!(first, Err(Error::Storage { .. })));
    assert_eq!(resolver.resolved_count().unwrap(), 0);

    std::fs::remove_file(&cards_dir).unwrap();
    std::fs::create_dir_all(&cards_dir).unwrap();

    let card = resolver.get_card("01030").await.unwrap();
    assert_eq!(card.name, "Magnifying Glass");
    assert_eq!(resolver.resolved_count().unwrap(), 1);
    assert_eq!(catalog.hits(ResourceKind::Card, "01030"), 1);
}
