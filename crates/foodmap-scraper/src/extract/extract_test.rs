use foodmap_core::{CatalogItem, ScrapeTuning};

use super::*;

fn cascade() -> ExtractionCascade {
    ExtractionCascade::new(&ScrapeTuning::default())
}

fn page(html: &str, text: &str) -> PageSnapshot {
    PageSnapshot {
        url: "https://example.test/store/a".to_string(),
        title: "A".to_string(),
        html: html.to_string(),
        visible_text: text.to_string(),
    }
}

struct Fixed(&'static str, Vec<&'static str>);

impl ExtractionStrategy for Fixed {
    fn name(&self) -> &'static str {
        self.0
    }

    fn try_extract(&self, _page: &PageSnapshot, _shape: ItemShape, items: &mut ItemCollector) {
        for d in &self.1 {
            items.push_product((*d).to_string());
        }
    }
}

// -----------------------------------------------------------------------
// cascade order
// -----------------------------------------------------------------------

#[test]
fn first_non_empty_strategy_wins() {
    let cascade = ExtractionCascade::with_strategies(vec![
        Box::new(Fixed("empty", vec![])),
        Box::new(Fixed("second", vec!["Semi-skimmed milk bottle"])),
        Box::new(Fixed("third", vec!["Never reached product"])),
    ]);
    let items = cascade.extract(&page("", ""), ItemShape::Product, None);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].description(), Some("Semi-skimmed milk bottle"));
}

#[test]
fn pattern_data_takes_precedence_over_page_text() {
    let html = r#"{"name":"Margherita","description":"Tomato, mozzarella and basil"}"#;
    let text = "Regina\nHam, mushrooms and tomato sauce";
    let items = cascade().extract(&page(html, text), ItemShape::Menu, None);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title(), Some("Margherita"));
}

#[test]
fn falls_through_to_heuristic_text() {
    let text = "Regina\n13 €\nHam, mushrooms and tomato sauce";
    let items = cascade().extract(&page("<div></div>", text), ItemShape::Menu, None);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title(), Some("Regina"));
}

#[test]
fn nothing_anywhere_is_an_empty_list() {
    let items = cascade().extract(&page("", ""), ItemShape::Menu, Some(10));
    assert!(items.is_empty());
}

#[test]
fn store_page_fragments_yield_single_product() {
    let text = "(4,80 €/kg)\n9 pcs • 23.5 g\nFresh organic tomatoes from Provence";
    let items = cascade().extract(&page("<body></body>", text), ItemShape::Product, None);
    assert_eq!(
        items,
        vec![CatalogItem::Product(StoreProduct::new(
            "Fresh organic tomatoes from Provence"
        ))]
    );
}

// -----------------------------------------------------------------------
// collector
// -----------------------------------------------------------------------

#[test]
fn collector_rejects_repeated_titles() {
    let mut items = ItemCollector::new(None);
    assert!(items.push_menu(Some("Ramen".into()), Some("Pork broth noodles".into())));
    assert!(!items.push_menu(Some("Ramen".into()), Some("Miso broth noodles".into())));
    assert_eq!(items.len(), 1);
}

#[test]
fn collector_drops_repeated_description_but_keeps_new_title() {
    let mut items = ItemCollector::new(None);
    items.push_menu(Some("Ramen".into()), Some("Noodles in broth".into()));
    items.push_menu(Some("Udon".into()), Some("Noodles in broth".into()));
    let items = items.into_items();
    assert_eq!(items[1].title(), Some("Udon"));
    assert_eq!(items[1].description(), None);
}

#[test]
fn collector_rejects_description_only_repeats() {
    let mut items = ItemCollector::new(None);
    assert!(items.push_menu(None, Some("Noodles in broth".into())));
    assert!(!items.push_menu(None, Some("Noodles in broth".into())));
    assert!(!items.push_menu(None, None));
}

#[test]
fn collector_stops_at_limit() {
    let mut items = ItemCollector::new(Some(2));
    assert!(items.push_product("Baguette tradition".into()));
    assert!(items.push_product("Croissant au beurre".into()));
    assert!(items.is_full());
    assert!(!items.push_product("Pain au chocolat".into()));
}

#[test]
fn shape_follows_kind() {
    assert_eq!(ItemShape::from(EstablishmentKind::Restaurant), ItemShape::Menu);
    assert_eq!(ItemShape::from(EstablishmentKind::Store), ItemShape::Product);
}
