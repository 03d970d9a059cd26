//! End-to-end run: search, traverse, persist, clean.

use chrono::Utc;
use foodmap_core::{
    elapsed_since, load_tuning, AppConfig, ConfigError, EstablishmentKind, RunConfig, RunProgress,
    RunReport, ScrapeTuning, SearchReport,
};
use foodmap_store::{JsonStore, StoreError};
use tokio::sync::watch;

use crate::browser::chromium::{ChromiumSession, LaunchOptions};
use crate::browser::BrowserSession;
use crate::cleaner::{clean_postal, CleanSummary};
use crate::ledger::DedupLedger;
use crate::names::NameNormalizer;
use crate::process::EstablishmentProcessor;
use crate::search::{perform_search, search_postal_code};
use crate::text::TextRules;
use crate::traverse::{ListingTraversal, StopSignal};

/// Runs scrapes for one configuration. Holds no per-run state, so one value
/// can serve concurrent runs for different postal codes.
#[derive(Debug, Clone)]
pub struct Scraper {
    config: AppConfig,
    tuning: ScrapeTuning,
    store: JsonStore,
}

impl Scraper {
    #[must_use]
    pub fn new(config: AppConfig, tuning: ScrapeTuning) -> Self {
        let store = JsonStore::new(config.output_dir.clone());
        Self {
            config,
            tuning,
            store,
        }
    }

    /// Builds a scraper with the tuning file named by `config`, or the
    /// built-in tuning when there is none.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the tuning file cannot be read or is
    /// invalid.
    pub fn from_config(config: AppConfig) -> Result<Self, ConfigError> {
        let tuning = match &config.tuning_path {
            Some(path) => {
                let tuning = load_tuning(path)?;
                tracing::info!(path = %path.display(), "loaded scrape tuning");
                tuning
            }
            None => ScrapeTuning::default(),
        };
        Ok(Self::new(config, tuning))
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &JsonStore {
        &self.store
    }

    /// Scrapes `run.postal_code` with `session`, which stays open afterwards.
    ///
    /// Never fails: every problem ends up in the report. A raised `stop`
    /// still persists what was accepted so far.
    pub async fn scrape(
        &self,
        session: &dyn BrowserSession,
        run: &RunConfig,
        stop: &StopSignal,
        progress: &watch::Sender<RunProgress>,
    ) -> RunReport {
        let started_at = Utc::now();
        let postal_code = run.postal_code.as_str();

        if let Err(e) = run.validate() {
            return RunReport::failed(postal_code, e.to_string(), started_at);
        }
        tracing::info!(
            postal_code,
            max_establishments = ?run.max_establishments,
            max_items = ?run.max_items_per_establishment,
            "scrape started"
        );

        if let Err(e) = search_postal_code(session, &self.config, &self.tuning, postal_code).await {
            tracing::error!(postal_code, error = %e, "scrape aborted");
            return RunReport::failed(postal_code, e.to_string(), started_at);
        }
        tokio::time::sleep(std::time::Duration::from_millis(self.tuning.timing.page_settle_ms))
            .await;

        let mut ledger = match self.load_ledger(postal_code) {
            Ok(ledger) => ledger,
            Err(e) => {
                tracing::error!(postal_code, error = %e, "cannot read existing output");
                return RunReport::failed(postal_code, e.to_string(), started_at);
            }
        };

        let processor =
            EstablishmentProcessor::new(&self.config, &self.tuning, run.max_items_per_establishment);
        let traversal = ListingTraversal::new(&self.config, &self.tuning, &processor);
        let outcome = traversal
            .traverse(session, &mut ledger, run, stop, progress)
            .await;

        let mut report = RunReport {
            success: true,
            error: None,
            postal_code: postal_code.to_string(),
            pages_processed: outcome.pages_processed,
            establishments_scraped: outcome.records.len(),
            restaurants_scraped: outcome.count(EstablishmentKind::Restaurant),
            stores_scraped: outcome.count(EstablishmentKind::Store),
            stopped: outcome.stopped,
            restaurants_file: None,
            stores_file: None,
            started_at,
            elapsed_ms: 0,
        };

        match self.store.append(postal_code, &outcome.records) {
            Ok(saved) => {
                report.restaurants_file = Some(saved.restaurants_file);
                report.stores_file = Some(saved.stores_file);
            }
            Err(e) => {
                tracing::error!(postal_code, error = %e, "failed to save establishments");
                report.success = false;
                report.error = Some(e.to_string());
                report.elapsed_ms = elapsed_since(started_at);
                return report;
            }
        }

        if let Err(e) = self.clean(postal_code) {
            tracing::warn!(postal_code, error = %e, "post-processing failed, output left as saved");
        }

        report.elapsed_ms = elapsed_since(started_at);
        tracing::info!(
            postal_code,
            pages = report.pages_processed,
            restaurants = report.restaurants_scraped,
            stores = report.stores_scraped,
            stopped = report.stopped,
            elapsed_ms = report.elapsed_ms,
            "scrape finished"
        );
        report
    }

    /// Runs the search step only.
    pub async fn search(&self, session: &dyn BrowserSession, postal_code: &str) -> SearchReport {
        perform_search(session, &self.config, &self.tuning, postal_code).await
    }

    /// Runs the post-processing cleaner over the files of `postal_code`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when an output file cannot be read or written.
    pub fn clean(&self, postal_code: &str) -> Result<CleanSummary, StoreError> {
        let rules = TextRules::new(&self.tuning.extraction);
        clean_postal(&self.store, postal_code, &rules)
    }

    /// Launches a dedicated Chromium session, scrapes, and closes it.
    pub async fn scrape_with_chromium(
        &self,
        run: &RunConfig,
        stop: &StopSignal,
        progress: &watch::Sender<RunProgress>,
    ) -> RunReport {
        let started_at = Utc::now();
        let session = match ChromiumSession::launch(&self.launch_options(run.visible_mode)).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(postal_code = %run.postal_code, error = %e, "browser launch failed");
                return RunReport::failed(&run.postal_code, e.to_string(), started_at);
            }
        };

        let report = self.scrape(&session, run, stop, progress).await;
        if let Err(e) = session.close().await {
            tracing::warn!(error = %e, "failed to close browser");
        }
        report
    }

    /// Launches a dedicated Chromium session for a search-only run.
    pub async fn search_with_chromium(&self, postal_code: &str, visible: bool) -> SearchReport {
        let session = match ChromiumSession::launch(&self.launch_options(visible)).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(postal_code, error = %e, "browser launch failed");
                return SearchReport {
                    success: false,
                    postal_code: postal_code.to_string(),
                    dialog_closed: false,
                    page_load_ms: 0,
                    search_ms: 0,
                    total_ms: 0,
                    error: Some(e.to_string()),
                };
            }
        };

        let report = self.search(&session, postal_code).await;
        if let Err(e) = session.close().await {
            tracing::warn!(error = %e, "failed to close browser");
        }
        report
    }

    fn launch_options(&self, visible: bool) -> LaunchOptions {
        LaunchOptions {
            visible,
            chrome_path: self.config.chrome_path.clone(),
            request_timeout: self.config.page_load_timeout(),
        }
    }

    fn load_ledger(&self, postal_code: &str) -> Result<DedupLedger, StoreError> {
        let restaurants = self.store.load(EstablishmentKind::Restaurant, postal_code)?;
        let stores = self.store.load(EstablishmentKind::Store, postal_code)?;
        Ok(DedupLedger::load(
            &restaurants,
            &stores,
            NameNormalizer::new(&self.tuning.names),
        ))
    }
}
