//! One establishment visit: open, read, classify, extract, close.

use std::sync::Arc;
use std::time::Duration;

use foodmap_core::{
    AppConfig, Catalog, CatalogItem, ClassifierTuning, EstablishmentRecord, ScrapeTuning,
};
use tokio::task::JoinHandle;

use crate::browser::{first_text, scroll_until_stable, BrowserSession, Locator};
use crate::classify::{recategorize, EstablishmentClassifier};
use crate::contact::ContactExtractor;
use crate::error::ScrapeError;
use crate::extract::ExtractionCascade;
use crate::snapshot::PageSnapshot;

/// Names of two characters or fewer are layout fragments, not names.
const MIN_NAME_CHARS: usize = 2;

#[derive(Debug)]
pub struct EstablishmentProcessor {
    classifier: EstablishmentClassifier,
    classifier_tuning: ClassifierTuning,
    cascade: Arc<ExtractionCascade>,
    contact: ContactExtractor,
    name_locators: Vec<Locator>,
    page_load_timeout: Duration,
    extraction_timeout: Duration,
    scroll_pause: Duration,
    max_scroll_attempts: usize,
    max_items: Option<usize>,
}

impl EstablishmentProcessor {
    #[must_use]
    pub fn new(config: &AppConfig, tuning: &ScrapeTuning, max_items: Option<usize>) -> Self {
        Self {
            classifier: EstablishmentClassifier::new(&tuning.classifier, &tuning.selectors),
            classifier_tuning: tuning.classifier.clone(),
            cascade: Arc::new(ExtractionCascade::new(tuning)),
            contact: ContactExtractor::new(tuning, config.page_load_timeout()),
            name_locators: tuning
                .selectors
                .store_name
                .iter()
                .map(|s| Locator::parse(s))
                .collect(),
            page_load_timeout: config.page_load_timeout(),
            extraction_timeout: config.item_extraction_timeout(),
            scroll_pause: Duration::from_millis(tuning.timing.scroll_pause_ms),
            max_scroll_attempts: tuning.timing.max_scroll_attempts,
            max_items,
        }
    }

    /// Visits `url` in a new tab and assembles its record.
    ///
    /// The tab is closed and the listing tab re-activated whatever happens.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Browser`] when the page cannot be opened or
    /// read, or when the listing tab cannot be restored.
    pub async fn process(
        &self,
        session: &dyn BrowserSession,
        url: &str,
        postal_code: &str,
    ) -> Result<EstablishmentRecord, ScrapeError> {
        let listing_tab = session.active_tab().await?;
        let tab = session.open_tab(url).await?;

        let result = self.visit(session, url, postal_code).await;

        if let Err(e) = session.close_tab(tab).await {
            tracing::warn!(url, error = %e, "failed to close establishment tab");
        }
        session.switch_to_tab(listing_tab).await?;
        result
    }

    async fn visit(
        &self,
        session: &dyn BrowserSession,
        url: &str,
        postal_code: &str,
    ) -> Result<EstablishmentRecord, ScrapeError> {
        session.wait_until_ready(self.page_load_timeout).await?;

        let name = first_text(session, &self.name_locators, MIN_NAME_CHARS).await;

        scroll_until_stable(session, self.scroll_pause, self.max_scroll_attempts).await?;
        session.scroll_to_top().await?;

        let snapshot = PageSnapshot::capture(session).await?;
        let classification = self.classifier.classify(&snapshot);
        let kind = classification.kind;
        tracing::debug!(url, %kind, reason = ?classification.reason, "classified");

        let cascade = Arc::clone(&self.cascade);
        let max_items = self.max_items;
        let extraction = tokio::task::spawn_blocking(move || {
            cascade.extract(&snapshot, kind.into(), max_items)
        });

        let contact = self.contact.extract(session).await;
        let items = join_extraction(extraction, self.extraction_timeout, url).await;

        let mut record = EstablishmentRecord::new(url, postal_code, Catalog::from_items(kind, items));
        record.name = name;
        record.contact = contact;
        recategorize(&mut record, &self.classifier_tuning);

        tracing::info!(
            url,
            name = record.name.as_deref().unwrap_or("unknown"),
            kind = %record.kind(),
            items = record.items_count(),
            "establishment processed"
        );
        Ok(record)
    }
}

/// Waits up to `timeout` for the background extraction. On timeout the task
/// is left to finish on its own and its result is ignored.
async fn join_extraction(
    extraction: JoinHandle<Vec<CatalogItem>>,
    timeout: Duration,
    url: &str,
) -> Vec<CatalogItem> {
    match tokio::time::timeout(timeout, extraction).await {
        Ok(Ok(items)) => items,
        Ok(Err(e)) => {
            tracing::warn!(url, error = %e, "item extraction task failed");
            Vec::new()
        }
        Err(_) => {
            let err = ScrapeError::ExtractionTimeout {
                url: url.to_string(),
                secs: timeout.as_secs(),
            };
            tracing::warn!(error = %err, "abandoning item extraction");
            Vec::new()
        }
    }
}
