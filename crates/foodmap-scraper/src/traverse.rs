//! Listing traversal: scroll, enumerate cards, visit, reveal more.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use foodmap_core::{AppConfig, EstablishmentKind, EstablishmentRecord, RunConfig, RunProgress, ScrapeTuning};
use tokio::sync::watch;

use crate::browser::{click_with_fallback, resolve_href, scroll_until_stable, BrowserSession, Locator};
use crate::ledger::DedupLedger;
use crate::process::EstablishmentProcessor;

/// Cooperative stop flag shared between a run and whoever may cancel it.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// An establishment link found on the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingCard {
    pub url: String,
    /// First line of the card text, when the card has any.
    pub preview_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TraversalOutcome {
    /// Accepted records in listing order.
    pub records: Vec<EstablishmentRecord>,
    pub pages_processed: usize,
    pub stopped: bool,
}

impl TraversalOutcome {
    #[must_use]
    pub fn count(&self, kind: EstablishmentKind) -> usize {
        self.records.iter().filter(|r| r.kind() == kind).count()
    }
}

#[derive(Debug)]
pub struct ListingTraversal<'a> {
    processor: &'a EstablishmentProcessor,
    card: Locator,
    show_more: Vec<Locator>,
    scroll_pause: Duration,
    max_scroll_attempts: usize,
    load_more_wait: Duration,
    visit_pause_ms: u64,
    visit_jitter_ms: u64,
    max_pages: usize,
}

enum Verdict {
    Accepted(Box<EstablishmentRecord>),
    Skipped,
}

impl<'a> ListingTraversal<'a> {
    #[must_use]
    pub fn new(config: &AppConfig, tuning: &ScrapeTuning, processor: &'a EstablishmentProcessor) -> Self {
        Self {
            processor,
            card: Locator::parse(&tuning.selectors.store_card),
            show_more: tuning.selectors.show_more.iter().map(|s| Locator::parse(s)).collect(),
            scroll_pause: Duration::from_millis(tuning.timing.scroll_pause_ms),
            max_scroll_attempts: tuning.timing.max_scroll_attempts,
            load_more_wait: Duration::from_millis(tuning.timing.load_more_wait_ms),
            visit_pause_ms: tuning.timing.visit_pause_ms,
            visit_jitter_ms: tuning.timing.visit_jitter_ms,
            max_pages: config.max_listing_pages,
        }
    }

    /// Walks the listing currently open in `session` until the cap is
    /// reached, nothing more can be revealed, a page brings no new cards, or
    /// `stop` is raised. Per-establishment failures are logged and skipped.
    pub async fn traverse(
        &self,
        session: &dyn BrowserSession,
        ledger: &mut DedupLedger,
        run: &RunConfig,
        stop: &StopSignal,
        progress: &watch::Sender<RunProgress>,
    ) -> TraversalOutcome {
        let mut outcome = TraversalOutcome {
            pages_processed: 1,
            ..TraversalOutcome::default()
        };
        let mut seen_cards: HashSet<String> = HashSet::new();
        progress.send_modify(|p| p.pages_processed = 1);

        'pages: loop {
            if let Err(e) = scroll_until_stable(session, self.scroll_pause, self.max_scroll_attempts).await {
                tracing::warn!(page = outcome.pages_processed, error = %e, "listing scroll failed");
            }

            let cards: Vec<ListingCard> = self
                .cards(session)
                .await
                .into_iter()
                .filter(|c| !seen_cards.contains(&c.url))
                .collect();
            seen_cards.extend(cards.iter().map(|c| c.url.clone()));
            tracing::info!(page = outcome.pages_processed, cards = cards.len(), "listing page scanned");
            if cards.is_empty() {
                break;
            }

            for card in cards {
                if stop.is_stopped() {
                    tracing::info!(postal_code = %run.postal_code, "stop requested, ending traversal");
                    outcome.stopped = true;
                    break 'pages;
                }
                if run.cap_reached(outcome.records.len()) {
                    break 'pages;
                }

                progress.send_modify(|p| p.current_establishment = Some(card.url.clone()));
                if let Verdict::Accepted(record) = self.visit(session, ledger, &card, &run.postal_code).await {
                    outcome.records.push(*record);
                    let accepted = outcome.records.len();
                    progress.send_modify(|p| p.establishments_scraped = accepted);
                }
                self.pace().await;
            }

            if run.cap_reached(outcome.records.len()) {
                tracing::info!(accepted = outcome.records.len(), "establishment cap reached");
                break;
            }
            if stop.is_stopped() {
                outcome.stopped = true;
                break;
            }
            if outcome.pages_processed >= self.max_pages {
                tracing::info!(pages = outcome.pages_processed, "listing page limit reached");
                break;
            }
            if !self.reveal_more(session).await {
                tracing::info!(pages = outcome.pages_processed, "no more listing pages");
                break;
            }
            outcome.pages_processed += 1;
            let pages = outcome.pages_processed;
            progress.send_modify(|p| p.pages_processed = pages);
        }

        progress.send_modify(|p| p.current_establishment = None);
        outcome
    }

    /// Applies the duplicate checks around one processor visit. The ledger
    /// changes only when the establishment is accepted.
    async fn visit(
        &self,
        session: &dyn BrowserSession,
        ledger: &mut DedupLedger,
        card: &ListingCard,
        postal_code: &str,
    ) -> Verdict {
        if ledger.is_duplicate_url(&card.url) {
            tracing::debug!(url = %card.url, "already scraped, skipping");
            return Verdict::Skipped;
        }
        if let Some(preview) = card.preview_name.as_deref() {
            if ledger.is_duplicate_store_name(preview) {
                tracing::debug!(url = %card.url, name = preview, "known store name, skipping");
                return Verdict::Skipped;
            }
        }

        let record = match self.processor.process(session, &card.url, postal_code).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(url = %card.url, error = %e, "establishment skipped");
                return Verdict::Skipped;
            }
        };

        let kind = record.kind();
        if kind == EstablishmentKind::Store {
            if let Some(name) = record.name.as_deref() {
                if ledger.is_duplicate_store_name(name) {
                    tracing::info!(url = %card.url, name, "duplicate store after visit, skipping");
                    return Verdict::Skipped;
                }
            }
        }

        ledger.record(&record.url, record.name.as_deref(), kind);
        Verdict::Accepted(Box::new(record))
    }

    async fn cards(&self, session: &dyn BrowserSession) -> Vec<ListingCard> {
        let handles = match session.find_all(&self.card).await {
            Ok(handles) => handles,
            Err(e) => {
                tracing::warn!(error = %e, "failed to enumerate listing cards");
                return Vec::new();
            }
        };
        let base = session.current_url().await.unwrap_or_default();

        let mut cards = Vec::with_capacity(handles.len());
        for handle in handles {
            let Ok(Some(href)) = session.attribute(handle, "href").await else {
                continue;
            };
            if href.trim().is_empty() {
                continue;
            }
            let preview_name = session.text(handle).await.ok().and_then(|text| {
                text.lines()
                    .map(str::trim)
                    .find(|l| !l.is_empty())
                    .map(String::from)
            });
            cards.push(ListingCard {
                url: resolve_href(&base, href.trim()),
                preview_name,
            });
        }
        cards
    }

    /// Clicks the first visible "show more" control. False when there is
    /// none or it cannot be clicked.
    async fn reveal_more(&self, session: &dyn BrowserSession) -> bool {
        for locator in &self.show_more {
            let Ok(handles) = session.find_all(locator).await else {
                continue;
            };
            for handle in handles {
                if !session.is_displayed(handle).await.unwrap_or(false) {
                    continue;
                }
                match click_with_fallback(session, handle).await {
                    Ok(_) => {
                        tokio::time::sleep(self.load_more_wait).await;
                        return true;
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "show more control not clickable");
                        return false;
                    }
                }
            }
        }
        false
    }

    async fn pace(&self) {
        let jitter = if self.visit_jitter_ms == 0 {
            0
        } else {
            rand::random_range(0..=self.visit_jitter_ms)
        };
        let pause = self.visit_pause_ms + jitter;
        if pause > 0 {
            tokio::time::sleep(Duration::from_millis(pause)).await;
        }
    }
}

#[cfg(test)]
#[path = "traverse_test.rs"]
mod tests;
