use foodmap_core::ExtractionTuning;
use scraper::{ElementRef, Html, Selector};

use super::{ExtractionStrategy, ItemCollector, ItemShape};
use crate::snapshot::PageSnapshot;
use crate::text::TextRules;

/// Words that mark a line as an ingredient list rather than a label.
const FOOD_HINTS: &[&str] = &[
    ",", "sauce", "cheese", "with", "served", "avec", "fromage", "servi",
];

/// Reads item containers matched by structural selectors.
#[derive(Debug, Clone)]
pub struct DomStrategy {
    rules: TextRules,
    selectors: Vec<String>,
    min_elements: usize,
    max_elements: usize,
}

impl DomStrategy {
    #[must_use]
    pub fn new(rules: TextRules, selectors: &[String], tuning: &ExtractionTuning) -> Self {
        Self {
            rules,
            selectors: selectors.to_vec(),
            min_elements: tuning.dom_min_elements,
            max_elements: tuning.dom_max_elements,
        }
    }

    /// Containers matched by the first selector with more than
    /// `min_elements` hits, capped at `max_elements`.
    fn containers<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        for raw in &self.selectors {
            let Ok(selector) = Selector::parse(raw) else {
                tracing::debug!(selector = %raw, "skipping selector the DOM parser cannot read");
                continue;
            };
            let found: Vec<ElementRef<'a>> = document.select(&selector).collect();
            if found.len() > self.min_elements {
                tracing::debug!(selector = %raw, elements = found.len(), "item containers found");
                return found.into_iter().take(self.max_elements).collect();
            }
        }
        Vec::new()
    }

    fn menu_item(&self, lines: &[&str]) -> Option<(String, Option<String>)> {
        let (title_at, title) = lines
            .iter()
            .enumerate()
            .find_map(|(i, line)| self.rules.accept_title(line).map(|t| (i, t)))?;

        let candidates: Vec<String> = lines[title_at + 1..]
            .iter()
            .filter_map(|line| self.rules.accept_description(line))
            .filter(|d| *d != title)
            .collect();
        let description = candidates
            .iter()
            .find(|d| {
                let lower = d.to_lowercase();
                FOOD_HINTS.iter().any(|hint| lower.contains(hint))
            })
            .or_else(|| candidates.first())
            .cloned();

        Some((title, description))
    }

    fn product(&self, lines: &[&str]) -> Option<String> {
        lines
            .iter()
            .filter_map(|line| self.rules.accept_product(line))
            .max_by_key(|text| text.chars().count())
    }
}

impl ExtractionStrategy for DomStrategy {
    fn name(&self) -> &'static str {
        "dom"
    }

    fn try_extract(&self, page: &PageSnapshot, shape: ItemShape, items: &mut ItemCollector) {
        if page.html.is_empty() {
            return;
        }
        let document = Html::parse_document(&page.html);
        for element in self.containers(&document) {
            if items.is_full() {
                return;
            }
            let lines: Vec<&str> = element
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect();
            match shape {
                ItemShape::Menu => {
                    if let Some((title, description)) = self.menu_item(&lines) {
                        items.push_menu(Some(title), description);
                    }
                }
                ItemShape::Product => {
                    if let Some(description) = self.product(&lines) {
                        items.push_product(description);
                    }
                }
            }
        }
    }
}
