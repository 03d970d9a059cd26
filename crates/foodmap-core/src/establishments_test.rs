use serde_json::json;

use super::*;

fn restaurant() -> EstablishmentRecord {
    let mut record = EstablishmentRecord::new(
        "https://example.com/store/pizza-roma",
        "75011",
        Catalog::Menu(vec![MenuItem::new(
            Some("Margherita".to_string()),
            Some("Tomato, mozzarella and fresh basil".to_string()),
        )]),
    );
    record.name = Some("Pizza Roma".to_string());
    record.contact.phone = Some("+33 1 23 45 67 89".to_string());
    record
}

#[test]
fn restaurant_serializes_menu_keys_and_sentinels() {
    let value = serde_json::to_value(restaurant()).unwrap();
    assert_eq!(value["establishment_type"], "restaurant");
    assert_eq!(value["email"], "N/A");
    assert_eq!(value["registration_number"], "N/A");
    assert_eq!(value["phone"], "+33 1 23 45 67 89");
    assert_eq!(value["menu_items_count"], 1);
    assert_eq!(value["menu_items"][0]["link"], "N/A");
    assert_eq!(value["menu_items"][0]["title"], "Margherita");
    assert!(value.get("products").is_none());
    assert!(value.get("products_count").is_none());
}

#[test]
fn store_serializes_product_keys_only() {
    let record = EstablishmentRecord::new(
        "https://example.com/store/market",
        "75011",
        Catalog::Products(vec![StoreProduct::new("Fresh organic tomatoes")]),
    );
    let value = serde_json::to_value(record).unwrap();
    assert_eq!(value["establishment_type"], "store");
    assert_eq!(value["products_count"], 1);
    assert_eq!(value["products"][0]["description"], "Fresh organic tomatoes");
    assert!(value.get("menu_items").is_none());
    assert!(value.get("menu_items_count").is_none());
    assert_eq!(value["name"], "N/A");
}

#[test]
fn sentinel_and_missing_keys_read_back_as_absent() {
    let raw = json!({
        "url": "https://example.com/store/a",
        "postal_code": "75011",
        "name": "N/A",
        "email": "",
        "phone": null,
        "menu_items": [{"title": "Pho", "description": "N/A", "link": "N/A"}],
        "menu_items_count": 1
    });
    let record: EstablishmentRecord = serde_json::from_value(raw).unwrap();
    assert!(record.name.is_none());
    assert_eq!(record.contact, ContactInfo::default());
    assert_eq!(record.kind(), EstablishmentKind::Restaurant);
    let Catalog::Menu(items) = &record.catalog else {
        panic!("expected menu catalog");
    };
    assert_eq!(items[0].title.as_deref(), Some("Pho"));
    assert!(items[0].description.is_none());
}

#[test]
fn legacy_record_without_type_or_items_defaults_to_restaurant() {
    let raw = json!({"url": "https://example.com/store/b", "postal_code": "75011"});
    let record: EstablishmentRecord = serde_json::from_value(raw).unwrap();
    assert_eq!(record.kind(), EstablishmentKind::Restaurant);
    assert_eq!(record.items_count(), 0);
}

#[test]
fn record_with_both_catalog_keys_is_rejected() {
    let raw = json!({
        "url": "https://example.com/store/c",
        "menu_items": [],
        "products": []
    });
    let err = serde_json::from_value::<EstablishmentRecord>(raw).unwrap_err();
    assert!(err.to_string().contains("both menu_items and products"));
}

#[test]
fn store_type_with_menu_items_is_rejected() {
    let raw = json!({
        "url": "https://example.com/store/d",
        "establishment_type": "store",
        "menu_items": []
    });
    assert!(serde_json::from_value::<EstablishmentRecord>(raw).is_err());
}

#[test]
fn count_is_recomputed_from_items_on_write() {
    let raw = json!({
        "url": "https://example.com/store/e",
        "establishment_type": "store",
        "products": [{"description": "Organic apple juice 1L"}],
        "products_count": 42
    });
    let record: EstablishmentRecord = serde_json::from_value(raw).unwrap();
    let value = serde_json::to_value(record).unwrap();
    assert_eq!(value["products_count"], 1);
}

#[test]
fn reclassify_to_store_drops_titles_and_empty_descriptions() {
    let mut record = EstablishmentRecord::new(
        "https://example.com/store/f",
        "75011",
        Catalog::Menu(vec![
            MenuItem::new(Some("Bananas".to_string()), None),
            MenuItem::new(None, Some("Whole milk from Normandy 1L".to_string())),
            MenuItem::new(
                Some("Bread".to_string()),
                Some("Traditional baguette baked daily".to_string()),
            ),
        ]),
    );
    record.reclassify(EstablishmentKind::Store);
    assert_eq!(record.kind(), EstablishmentKind::Store);
    assert_eq!(
        record.catalog,
        Catalog::Products(vec![
            StoreProduct::new("Whole milk from Normandy 1L"),
            StoreProduct::new("Traditional baguette baked daily"),
        ])
    );
}

#[test]
fn reclassify_to_same_kind_is_a_no_op() {
    let mut record = restaurant();
    let before = record.clone();
    record.reclassify(EstablishmentKind::Restaurant);
    assert_eq!(record, before);
}

#[test]
fn from_items_reshapes_mismatched_items() {
    let items = vec![
        CatalogItem::Menu(MenuItem::new(
            Some("Salad".to_string()),
            Some("Mixed greens with vinaigrette".to_string()),
        )),
        CatalogItem::Menu(MenuItem::new(Some("Soda".to_string()), None)),
        CatalogItem::Product(StoreProduct::new("Sparkling water 6 x 1L")),
    ];
    let catalog = Catalog::from_items(EstablishmentKind::Store, items);
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.kind(), EstablishmentKind::Store);
}

#[test]
fn contact_info_completeness() {
    let mut contact = ContactInfo::default();
    assert!(!contact.is_complete());
    contact.email = Some("contact@example.com".to_string());
    contact.phone = Some("+33 1 00 00 00 00".to_string());
    contact.registration_number = Some("12345678900012".to_string());
    assert!(contact.is_complete());
}
