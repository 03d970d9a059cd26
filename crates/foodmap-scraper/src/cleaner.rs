//! Post-run cleanup of persisted establishments.
//!
//! Runs after every scrape and on demand. Steps, in order:
//!
//! 1. drop establishments whose URL was already seen (first one wins);
//! 2. re-normalize each store product, drop price/quantity fragments and
//!    repeats within the store.
//!
//! Restaurants only go through step 1. Cleaning is idempotent.

use std::collections::HashSet;

use foodmap_core::{Catalog, EstablishmentKind, EstablishmentRecord, StoreProduct};
use foodmap_store::{JsonStore, StoreError};

use crate::text::{self, TextRules};

/// What one cleaning pass over a postal code removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanSummary {
    pub postal_code: String,
    pub restaurants: usize,
    pub stores: usize,
    pub duplicate_establishments: usize,
    pub products_removed: usize,
}

/// Cleans one list of persisted records.
#[must_use]
pub fn clean_records(records: Vec<EstablishmentRecord>, rules: &TextRules) -> Vec<EstablishmentRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.url.clone()))
        .map(|mut record| {
            if let Catalog::Products(products) = record.catalog {
                record.catalog = Catalog::Products(clean_products(products, rules));
            }
            record
        })
        .collect()
}

fn clean_products(products: Vec<StoreProduct>, rules: &TextRules) -> Vec<StoreProduct> {
    let mut seen = HashSet::new();
    products
        .into_iter()
        .map(|p| text::clean(&p.description))
        .filter(|d| !rules.is_price_or_quantity_only(d))
        .filter(|d| seen.insert(d.clone()))
        .map(StoreProduct::new)
        .collect()
}

/// Loads both files for `postal_code`, cleans them, and writes them back.
///
/// # Errors
///
/// Returns [`StoreError`] when a file cannot be read, parsed, or written.
pub fn clean_postal(
    store: &JsonStore,
    postal_code: &str,
    rules: &TextRules,
) -> Result<CleanSummary, StoreError> {
    let mut summary = CleanSummary {
        postal_code: postal_code.to_string(),
        ..CleanSummary::default()
    };

    for kind in [EstablishmentKind::Restaurant, EstablishmentKind::Store] {
        let path = store.path_for(kind, postal_code);
        if !path.exists() {
            continue;
        }
        let records = store.load(kind, postal_code)?;
        let before = records.len();
        let items_before: usize = records.iter().map(EstablishmentRecord::items_count).sum();

        let cleaned = clean_records(records, rules);
        let items_after: usize = cleaned.iter().map(EstablishmentRecord::items_count).sum();
        summary.duplicate_establishments += before - cleaned.len();
        match kind {
            EstablishmentKind::Restaurant => summary.restaurants = cleaned.len(),
            EstablishmentKind::Store => {
                summary.stores = cleaned.len();
                summary.products_removed = items_before.saturating_sub(items_after);
            }
        }
        store.save(kind, postal_code, &cleaned)?;
    }

    tracing::info!(
        postal_code,
        restaurants = summary.restaurants,
        stores = summary.stores,
        duplicates = summary.duplicate_establishments,
        products_removed = summary.products_removed,
        "cleaned output files"
    );
    Ok(summary)
}
