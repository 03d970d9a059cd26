//! Catalog item extraction from a captured establishment page.
//!
//! Three strategies run in a fixed order and the first one that yields any
//! item wins:
//!
//! 1. [`PatternStrategy`]: embedded JSON-like `name`/`description` data in the
//!    page markup.
//! 2. [`DomStrategy`]: item containers found by structural selectors.
//! 3. [`HeuristicStrategy`]: line scanning over the rendered page text.
//!
//! Strategies never fail. A strategy that cannot make sense of the page
//! simply adds nothing, and the cascade falls through to the next one.

mod dom;
mod heuristic;
mod pattern;

use std::collections::HashSet;

use foodmap_core::{CatalogItem, EstablishmentKind, MenuItem, ScrapeTuning, StoreProduct};

pub use dom::DomStrategy;
pub use heuristic::HeuristicStrategy;
pub use pattern::PatternStrategy;

use crate::snapshot::PageSnapshot;
use crate::text::TextRules;

/// Which item shape the caller wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemShape {
    /// Title plus optional description.
    Menu,
    /// A single description line.
    Product,
}

impl From<EstablishmentKind> for ItemShape {
    fn from(kind: EstablishmentKind) -> Self {
        match kind {
            EstablishmentKind::Restaurant => ItemShape::Menu,
            EstablishmentKind::Store => ItemShape::Product,
        }
    }
}

pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Adds every item found on `page` to `items`, stopping early once the
    /// collector is full.
    fn try_extract(&self, page: &PageSnapshot, shape: ItemShape, items: &mut ItemCollector);
}

/// Accumulates items for one strategy run, suppressing exact duplicates and
/// enforcing the per-establishment cap.
#[derive(Debug)]
pub struct ItemCollector {
    items: Vec<CatalogItem>,
    titles: HashSet<String>,
    descriptions: HashSet<String>,
    limit: Option<usize>,
}

impl ItemCollector {
    #[must_use]
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            items: Vec::new(),
            titles: HashSet::new(),
            descriptions: HashSet::new(),
            limit,
        }
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.limit.is_some_and(|limit| self.items.len() >= limit)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds a menu item. A repeated title rejects the item; a repeated
    /// description is dropped from an otherwise new item.
    pub fn push_menu(&mut self, title: Option<String>, description: Option<String>) -> bool {
        if self.is_full() {
            return false;
        }
        if title.as_ref().is_some_and(|t| self.titles.contains(t)) {
            return false;
        }
        let description = description.filter(|d| !self.descriptions.contains(d));
        if title.is_none() && description.is_none() {
            return false;
        }
        if let Some(t) = &title {
            self.titles.insert(t.clone());
        }
        if let Some(d) = &description {
            self.descriptions.insert(d.clone());
        }
        self.items
            .push(CatalogItem::Menu(MenuItem::new(title, description)));
        true
    }

    pub fn push_product(&mut self, description: String) -> bool {
        if self.is_full() || self.descriptions.contains(&description) {
            return false;
        }
        self.descriptions.insert(description.clone());
        self.items
            .push(CatalogItem::Product(StoreProduct::new(description)));
        true
    }

    #[must_use]
    pub fn into_items(self) -> Vec<CatalogItem> {
        self.items
    }
}

/// The ordered strategy list.
pub struct ExtractionCascade {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl ExtractionCascade {
    /// Pattern, then DOM, then heuristic extraction.
    #[must_use]
    pub fn new(tuning: &ScrapeTuning) -> Self {
        let rules = TextRules::new(&tuning.extraction);
        Self::with_strategies(vec![
            Box::new(PatternStrategy::new(rules.clone())),
            Box::new(DomStrategy::new(
                rules.clone(),
                &tuning.selectors.item_containers,
                &tuning.extraction,
            )),
            Box::new(HeuristicStrategy::new(rules, &tuning.extraction)),
        ])
    }

    #[must_use]
    pub fn with_strategies(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Items of the first strategy that finds any, or an empty list.
    #[must_use]
    pub fn extract(
        &self,
        page: &PageSnapshot,
        shape: ItemShape,
        max_items: Option<usize>,
    ) -> Vec<CatalogItem> {
        for strategy in &self.strategies {
            let mut items = ItemCollector::new(max_items);
            strategy.try_extract(page, shape, &mut items);
            if !items.is_empty() {
                tracing::debug!(
                    url = %page.url,
                    strategy = strategy.name(),
                    items = items.len(),
                    "items extracted"
                );
                return items.into_items();
            }
            tracing::debug!(url = %page.url, strategy = strategy.name(), "strategy found nothing");
        }
        Vec::new()
    }
}

impl std::fmt::Debug for ExtractionCascade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.strategies.iter().map(|s| s.name()))
            .finish()
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
