//! File-system tests for the per-postal-code JSON store.

use foodmap_core::{
    Catalog, EstablishmentKind, EstablishmentRecord, MenuItem, StoreProduct,
};
use foodmap_store::{JsonStore, StoreError};

fn restaurant(url: &str, name: &str) -> EstablishmentRecord {
    let mut record = EstablishmentRecord::new(
        url,
        "75011",
        Catalog::Menu(vec![MenuItem::new(
            Some("Bo bun".to_string()),
            Some("Rice noodles, beef, spring rolls and herbs".to_string()),
        )]),
    );
    record.name = Some(name.to_string());
    record
}

fn store(url: &str, name: &str) -> EstablishmentRecord {
    let mut record = EstablishmentRecord::new(
        url,
        "75011",
        Catalog::Products(vec![
            StoreProduct::new("Fresh organic tomatoes from Provence"),
            StoreProduct::new("Semi-skimmed milk bottle 1L"),
        ]),
    );
    record.name = Some(name.to_string());
    record
}

#[test]
fn missing_files_load_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let json_store = JsonStore::new(dir.path());
    assert!(json_store
        .load(EstablishmentKind::Restaurant, "75011")
        .unwrap()
        .is_empty());
    assert!(json_store.load(EstablishmentKind::Store, "75011").unwrap().is_empty());
}

#[test]
fn file_names_follow_postal_code() {
    let json_store = JsonStore::new("/data");
    assert_eq!(
        json_store.path_for(EstablishmentKind::Restaurant, "75011"),
        std::path::PathBuf::from("/data/restaurants_75011.json")
    );
    assert_eq!(
        json_store.path_for(EstablishmentKind::Store, "69001"),
        std::path::PathBuf::from("/data/stores_69001.json")
    );
}

#[test]
fn append_splits_by_kind_and_skips_known_urls() {
    let dir = tempfile::tempdir().unwrap();
    let json_store = JsonStore::new(dir.path());

    let first = json_store
        .append(
            "75011",
            &[
                restaurant("https://m.example/store/pho", "Pho 11"),
                store("https://m.example/store/carrefour-city", "Carrefour City"),
            ],
        )
        .unwrap();
    assert_eq!(first.restaurants_added, 1);
    assert_eq!(first.stores_added, 1);
    assert_eq!(first.skipped, 0);

    let second = json_store
        .append(
            "75011",
            &[
                restaurant("https://m.example/store/pho", "Pho 11"),
                restaurant("https://m.example/store/ramen", "Ramen Bar"),
                restaurant("https://m.example/store/ramen", "Ramen Bar"),
            ],
        )
        .unwrap();
    assert_eq!(second.restaurants_added, 1);
    assert_eq!(second.skipped, 2);

    let restaurants = json_store.load(EstablishmentKind::Restaurant, "75011").unwrap();
    let urls: Vec<_> = restaurants.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        urls,
        vec!["https://m.example/store/pho", "https://m.example/store/ramen"]
    );
    assert_eq!(
        json_store.load(EstablishmentKind::Store, "75011").unwrap().len(),
        1
    );
}

#[test]
fn url_known_as_store_is_not_added_as_restaurant() {
    let dir = tempfile::tempdir().unwrap();
    let json_store = JsonStore::new(dir.path());
    json_store
        .append("75011", &[store("https://m.example/store/market", "Market")])
        .unwrap();
    let outcome = json_store
        .append("75011", &[restaurant("https://m.example/store/market", "Market")])
        .unwrap();
    assert_eq!(outcome.restaurants_added, 0);
    assert_eq!(outcome.skipped, 1);
}

#[test]
fn written_files_use_type_specific_keys() {
    let dir = tempfile::tempdir().unwrap();
    let json_store = JsonStore::new(dir.path());
    let outcome = json_store
        .append(
            "75011",
            &[
                restaurant("https://m.example/store/a", "A"),
                store("https://m.example/store/b", "B"),
            ],
        )
        .unwrap();

    let raw = std::fs::read_to_string(&outcome.stores_file).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value[0]["products_count"], 2);
    assert!(value[0].get("menu_items").is_none());

    let raw = std::fs::read_to_string(&outcome.restaurants_file).unwrap();
    assert!(raw.contains("\"menu_items_count\": 1"));
    assert!(raw.contains("\"email\": \"N/A\""));
}

#[test]
fn save_replaces_file_contents() {
    let dir = tempfile::tempdir().unwrap();
    let json_store = JsonStore::new(dir.path());
    json_store
        .save(
            EstablishmentKind::Store,
            "75011",
            &[store("https://m.example/store/a", "A"), store("https://m.example/store/b", "B")],
        )
        .unwrap();
    json_store
        .save(
            EstablishmentKind::Store,
            "75011",
            &[store("https://m.example/store/b", "B")],
        )
        .unwrap();
    let loaded = json_store.load(EstablishmentKind::Store, "75011").unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].url, "https://m.example/store/b");
}

#[test]
fn corrupt_file_is_a_json_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("restaurants_75011.json"), "{not json").unwrap();
    let json_store = JsonStore::new(dir.path());
    let err = json_store
        .load(EstablishmentKind::Restaurant, "75011")
        .unwrap_err();
    assert!(matches!(err, StoreError::Json { .. }));
}

#[test]
fn summary_counts_items_and_samples_known_names() {
    let dir = tempfile::tempdir().unwrap();
    let json_store = JsonStore::new(dir.path());
    let mut unnamed = restaurant("https://m.example/store/x", "X");
    unnamed.name = None;
    json_store
        .append(
            "75011",
            &[
                unnamed,
                restaurant("https://m.example/store/a", "Pho 11"),
                store("https://m.example/store/b", "Franprix"),
            ],
        )
        .unwrap();

    let summary = json_store.summary("75011").unwrap();
    assert!(summary.restaurants.exists);
    assert_eq!(summary.restaurants.establishments, 2);
    assert_eq!(summary.restaurants.items, 2);
    assert_eq!(summary.restaurants.sample_names, vec!["Pho 11".to_string()]);
    assert_eq!(summary.stores.items, 2);

    let empty = json_store.summary("13001").unwrap();
    assert!(!empty.stores.exists);
    assert_eq!(empty.stores.establishments, 0);
}
