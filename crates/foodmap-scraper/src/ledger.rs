//! Per-run memory of establishments already seen.

use std::collections::HashSet;

use foodmap_core::{EstablishmentKind, EstablishmentRecord};

use crate::names::NameNormalizer;

/// Seen URLs and seen normalized store names for one run.
///
/// Seeded from the files already on disk, consulted before and after each
/// visit, and updated only when an establishment is accepted. Restaurants
/// are deduplicated by URL alone.
#[derive(Debug, Clone)]
pub struct DedupLedger {
    normalizer: NameNormalizer,
    seen_urls: HashSet<String>,
    seen_store_names: HashSet<String>,
}

impl DedupLedger {
    #[must_use]
    pub fn new(normalizer: NameNormalizer) -> Self {
        Self {
            normalizer,
            seen_urls: HashSet::new(),
            seen_store_names: HashSet::new(),
        }
    }

    /// Builds a ledger from previously persisted records.
    #[must_use]
    pub fn load(
        restaurants: &[EstablishmentRecord],
        stores: &[EstablishmentRecord],
        normalizer: NameNormalizer,
    ) -> Self {
        let mut ledger = Self::new(normalizer);
        ledger
            .seen_urls
            .extend(restaurants.iter().chain(stores).map(|r| r.url.clone()));
        for store in stores {
            if let Some(name) = store.name.as_deref() {
                ledger.remember_store_name(name);
            }
        }
        tracing::debug!(
            urls = ledger.seen_urls.len(),
            store_names = ledger.seen_store_names.len(),
            "dedup ledger loaded"
        );
        ledger
    }

    #[must_use]
    pub fn is_duplicate_url(&self, url: &str) -> bool {
        self.seen_urls.contains(url)
    }

    /// Whether `name` normalizes to a known store. Names that normalize to
    /// nothing never match.
    #[must_use]
    pub fn is_duplicate_store_name(&self, name: &str) -> bool {
        let normalized = self.normalizer.normalize(name);
        !normalized.is_empty() && self.seen_store_names.contains(&normalized)
    }

    /// Marks an accepted establishment as seen.
    pub fn record(&mut self, url: &str, name: Option<&str>, kind: EstablishmentKind) {
        self.seen_urls.insert(url.to_string());
        if kind == EstablishmentKind::Store {
            if let Some(name) = name {
                self.remember_store_name(name);
            }
        }
    }

    #[must_use]
    pub fn url_count(&self) -> usize {
        self.seen_urls.len()
    }

    fn remember_store_name(&mut self, name: &str) {
        let normalized = self.normalizer.normalize(name);
        if !normalized.is_empty() {
            self.seen_store_names.insert(normalized);
        }
    }
}

#[cfg(test)]
mod tests {
    use foodmap_core::Catalog;

    use super::*;

    fn record(url: &str, name: &str, kind: EstablishmentKind) -> EstablishmentRecord {
        let mut r = EstablishmentRecord::new(url, "75011", Catalog::empty(kind));
        r.name = Some(name.to_string());
        r
    }

    #[test]
    fn load_seeds_urls_from_both_files() {
        let ledger = DedupLedger::load(
            &[record("https://x.test/r1", "Pizza Roma", EstablishmentKind::Restaurant)],
            &[record("https://x.test/s1", "Carrefour City", EstablishmentKind::Store)],
            NameNormalizer::default(),
        );
        assert!(ledger.is_duplicate_url("https://x.test/r1"));
        assert!(ledger.is_duplicate_url("https://x.test/s1"));
        assert!(!ledger.is_duplicate_url("https://x.test/other"));
        assert_eq!(ledger.url_count(), 2);
    }

    #[test]
    fn only_store_names_are_remembered() {
        let ledger = DedupLedger::load(
            &[record("https://x.test/r1", "Pizza Roma", EstablishmentKind::Restaurant)],
            &[record("https://x.test/s1", "Carrefour City", EstablishmentKind::Store)],
            NameNormalizer::default(),
        );
        assert!(ledger.is_duplicate_store_name("Carrefour Express"));
        assert!(ledger.is_duplicate_store_name("carrefour"));
        assert!(!ledger.is_duplicate_store_name("Pizza Roma"));
    }

    #[test]
    fn record_adds_store_names_but_not_restaurant_names() {
        let mut ledger = DedupLedger::new(NameNormalizer::default());
        ledger.record("https://x.test/a", Some("Monoprix Sprint"), EstablishmentKind::Store);
        ledger.record("https://x.test/b", Some("Sushi Shop"), EstablishmentKind::Restaurant);
        assert!(ledger.is_duplicate_store_name("Monoprix"));
        assert!(!ledger.is_duplicate_store_name("Sushi Shop"));
        assert!(ledger.is_duplicate_url("https://x.test/b"));
    }

    #[test]
    fn unknown_names_never_match() {
        let mut ledger = DedupLedger::new(NameNormalizer::default());
        ledger.record("https://x.test/a", None, EstablishmentKind::Store);
        assert!(!ledger.is_duplicate_store_name(""));
        assert!(!ledger.is_duplicate_store_name("N/A"));
    }
}
