use foodmap_core::ExtractionTuning;

use super::{ExtractionStrategy, ItemCollector, ItemShape};
use crate::snapshot::PageSnapshot;
use crate::text::TextRules;

/// Last-resort line scan over the rendered page text.
#[derive(Debug, Clone)]
pub struct HeuristicStrategy {
    rules: TextRules,
    title_max_len: usize,
    lookahead: usize,
}

impl HeuristicStrategy {
    #[must_use]
    pub fn new(rules: TextRules, tuning: &ExtractionTuning) -> Self {
        Self {
            rules,
            title_max_len: tuning.heuristic_title_max_len,
            lookahead: tuning.lookahead_lines,
        }
    }

    fn title_candidate(&self, line: &str) -> Option<String> {
        if line.chars().count() > self.title_max_len {
            return None;
        }
        self.rules.accept_title(line)
    }

    /// A description reads like a phrase, not a label.
    fn description_candidate(&self, line: &str, title: &str) -> Option<String> {
        self.rules
            .accept_description(line)
            .filter(|d| d != title && d.split_whitespace().count() >= 3)
    }

    /// Short lines are titles. Each needs a description within the next
    /// `lookahead` lines to become an item; the next title ends the search.
    fn extract_menu(&self, lines: &[&str], items: &mut ItemCollector) {
        let mut i = 0;
        while i < lines.len() && !items.is_full() {
            let Some(title) = self.title_candidate(lines[i]) else {
                i += 1;
                continue;
            };
            let end = (i + 1 + self.lookahead).min(lines.len());
            let mut found = None;
            for (j, line) in lines.iter().enumerate().take(end).skip(i + 1) {
                if let Some(description) = self.description_candidate(line, &title) {
                    found = Some((j, description));
                    break;
                }
                if self.title_candidate(line).is_some() {
                    break;
                }
            }
            match found {
                Some((j, description)) => {
                    items.push_menu(Some(title), Some(description));
                    i = j + 1;
                }
                None => i += 1,
            }
        }
    }

    fn extract_products(&self, lines: &[&str], items: &mut ItemCollector) {
        for line in lines {
            if items.is_full() {
                return;
            }
            if let Some(description) = self.rules.accept_product_line(line) {
                items.push_product(description);
            }
        }
    }
}

impl ExtractionStrategy for HeuristicStrategy {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn try_extract(&self, page: &PageSnapshot, shape: ItemShape, items: &mut ItemCollector) {
        let lines: Vec<&str> = page.lines().collect();
        match shape {
            ItemShape::Menu => self.extract_menu(&lines, items),
            ItemShape::Product => self.extract_products(&lines, items),
        }
    }
}

#[cfg(test)]
mod tests {
    use foodmap_core::CatalogItem;

    use super::*;

    fn run(text: &str, shape: ItemShape, limit: Option<usize>) -> Vec<CatalogItem> {
        let page = PageSnapshot {
            visible_text: text.to_string(),
            ..PageSnapshot::default()
        };
        let mut items = ItemCollector::new(limit);
        HeuristicStrategy::new(TextRules::default(), &ExtractionTuning::default())
            .try_extract(&page, shape, &mut items);
        items.into_items()
    }

    #[test]
    fn titles_pair_with_description_after_price() {
        let text = "Pizzas\nMargherita\n12,50 €\nTomato, mozzarella and basil\nRegina\n13,50 €\nAdd\nHam, mushrooms and tomato sauce\n";
        let items = run(text, ItemShape::Menu, None);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title(), Some("Margherita"));
        assert_eq!(items[0].description(), Some("Tomato, mozzarella and basil"));
        assert_eq!(items[1].title(), Some("Regina"));
        assert_eq!(items[1].description(), Some("Ham, mushrooms and tomato sauce"));
    }

    #[test]
    fn title_without_nearby_description_is_dropped() {
        let text = "Tiramisu\n6 €\nAdd\n7 €\n\nDessert of the day made in house";
        let items = run(text, ItemShape::Menu, None);
        assert!(items.iter().all(|item| item.title() != Some("Tiramisu")));
    }

    #[test]
    fn store_lines_keep_only_real_products() {
        let text = "(4,80 €/kg)\n9 pcs • 23.5 g\nFresh organic tomatoes from Provence\n";
        let items = run(text, ItemShape::Product, None);
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].description(),
            Some("Fresh organic tomatoes from Provence")
        );
    }

    #[test]
    fn repeated_product_lines_are_suppressed() {
        let text = "Baguette tradition\nBaguette tradition\nCroissant au beurre\n";
        let items = run(text, ItemShape::Product, None);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn limit_caps_products() {
        let text = "Baguette tradition\nCroissant au beurre\nPain au chocolat\n";
        assert_eq!(run(text, ItemShape::Product, Some(1)).len(), 1);
    }
}
