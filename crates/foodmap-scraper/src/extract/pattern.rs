use std::sync::LazyLock;

use regex::Regex;

use super::{ExtractionStrategy, ItemCollector, ItemShape};
use crate::snapshot::PageSnapshot;
use crate::text::TextRules;

/// A JSON string body, escapes included.
const STRING_BODY: &str = r#"((?:[^"\\]|\\.)+)"#;

/// Menu variants in priority order: name and description inside one object,
/// then the looser pairing across the page.
static MENU_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(&format!(
            r#"(?i)"(?:name|title)"\s*:\s*"{STRING_BODY}"[^{{}}]*?"description"\s*:\s*"{STRING_BODY}""#
        ))
        .expect("valid regex"),
        Regex::new(&format!(
            r#"(?is)"name"\s*:\s*"{STRING_BODY}".*?"description"\s*:\s*"{STRING_BODY}""#
        ))
        .expect("valid regex"),
    ]
});

static DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r#"(?i)"description"\s*:\s*"{STRING_BODY}""#)).expect("valid regex")
});

static PRODUCT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        DESCRIPTION_RE.clone(),
        Regex::new(&format!(r#"(?i)"(?:name|title)"\s*:\s*"{STRING_BODY}""#))
            .expect("valid regex"),
    ]
});

/// Mines embedded data structures in the page markup.
#[derive(Debug, Clone)]
pub struct PatternStrategy {
    rules: TextRules,
}

impl PatternStrategy {
    #[must_use]
    pub fn new(rules: TextRules) -> Self {
        Self { rules }
    }

    fn extract_menu(&self, source: &str, items: &mut ItemCollector) {
        for (variant, pattern) in MENU_PATTERNS.iter().enumerate() {
            for caps in pattern.captures_iter(source) {
                if items.is_full() {
                    return;
                }
                let Some(title) = self.rules.accept_title(&unescape(&caps[1])) else {
                    continue;
                };
                let description = self.rules.accept_description(&unescape(&caps[2]));
                if description.is_some() {
                    items.push_menu(Some(title), description);
                }
            }
            if !items.is_empty() {
                tracing::debug!(variant, items = items.len(), "menu pattern matched");
                return;
            }
        }

        // Descriptions with no usable name still become (untitled) menu items.
        for caps in DESCRIPTION_RE.captures_iter(source) {
            if items.is_full() {
                return;
            }
            if let Some(description) = self.rules.accept_description(&unescape(&caps[1])) {
                items.push_menu(None, Some(description));
            }
        }
        if !items.is_empty() {
            tracing::debug!(items = items.len(), "untitled menu descriptions matched");
        }
    }

    fn extract_products(&self, source: &str, items: &mut ItemCollector) {
        for (variant, pattern) in PRODUCT_PATTERNS.iter().enumerate() {
            for caps in pattern.captures_iter(source) {
                if items.is_full() {
                    return;
                }
                if let Some(description) = self.rules.accept_product(&unescape(&caps[1])) {
                    items.push_product(description);
                }
            }
            if !items.is_empty() {
                tracing::debug!(variant, items = items.len(), "product pattern matched");
                return;
            }
        }
    }
}

impl ExtractionStrategy for PatternStrategy {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn try_extract(&self, page: &PageSnapshot, shape: ItemShape, items: &mut ItemCollector) {
        match shape {
            ItemShape::Menu => self.extract_menu(&page.html, items),
            ItemShape::Product => self.extract_products(&page.html, items),
        }
    }
}

/// Decodes JSON string escapes (`\"`, `é`, ...). Fragments that are not
/// valid JSON string bodies are returned as they are.
fn unescape(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }
    serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(html: &str) -> PageSnapshot {
        PageSnapshot {
            html: html.to_string(),
            ..PageSnapshot::default()
        }
    }

    fn run(html: &str, shape: ItemShape, limit: Option<usize>) -> Vec<foodmap_core::CatalogItem> {
        let mut items = ItemCollector::new(limit);
        PatternStrategy::new(TextRules::default()).try_extract(&page(html), shape, &mut items);
        items.into_items()
    }

    #[test]
    fn menu_pairs_name_and_description_within_one_object() {
        let html = r#"<script>{"items":[
            {"uuid":"a","name":"Margherita","price":1250,"description":"Tomato, mozzarella and basil"},
            {"uuid":"b","name":"Regina","description":"Ham, mushrooms &amp; tomato sauce"}
        ]}</script>"#;
        let items = run(html, ItemShape::Menu, None);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title(), Some("Margherita"));
        assert_eq!(items[0].description(), Some("Tomato, mozzarella and basil"));
        assert_eq!(items[1].description(), Some("Ham, mushrooms & tomato sauce"));
    }

    #[test]
    fn escaped_unicode_is_decoded() {
        let html = r#"{"name":"Cr\u00eape sucr\u00e9e","description":"Beurre, sucre et citron pressé"}"#;
        let items = run(html, ItemShape::Menu, None);
        assert_eq!(items[0].title(), Some("Crêpe sucrée"));
    }

    #[test]
    fn ui_titles_are_skipped() {
        let html = r#"{"name":"Add to cart","description":"Button label that is long enough"}
            {"name":"Burger maison","description":"Steak haché, cheddar, oignons"}"#;
        let items = run(html, ItemShape::Menu, None);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title(), Some("Burger maison"));
    }

    #[test]
    fn nameless_descriptions_become_untitled_menu_items() {
        let html = r#"{"description":"Organic whole milk, 1 L bottle"},
            {"description":"Free-range eggs, box of six"}"#;
        let items = run(html, ItemShape::Menu, None);
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.title().is_none()));
        assert_eq!(items[1].description(), Some("Free-range eggs, box of six"));
    }

    #[test]
    fn product_descriptions_drop_price_fragments() {
        let html = r#"{"description":"(4,80 €/kg)"},{"description":"9 pcs • 23.5 g"},
            {"description":"Fresh organic tomatoes from Provence"}"#;
        let items = run(html, ItemShape::Product, None);
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].description(),
            Some("Fresh organic tomatoes from Provence")
        );
    }

    #[test]
    fn cap_stops_extraction() {
        let html = r#"{"description":"Semi-skimmed milk bottle"},
            {"description":"Emmental râpé 200 g"},
            {"description":"Baguette tradition"}"#;
        assert_eq!(run(html, ItemShape::Product, Some(2)).len(), 2);
    }

    #[test]
    fn markup_without_data_yields_nothing() {
        assert!(run("<div>Hello</div>", ItemShape::Menu, None).is_empty());
        assert!(run("", ItemShape::Product, None).is_empty());
    }

    #[test]
    fn invalid_escapes_are_kept_verbatim() {
        assert_eq!(unescape(r"bad \q escape"), r"bad \q escape");
        assert_eq!(unescape(r#"say \"hi\""#), r#"say "hi""#);
    }
}
