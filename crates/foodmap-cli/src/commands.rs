//! Command handlers. Each returns whether the command succeeded so `main`
//! can pick the exit code.

use std::fmt::Write as _;

use foodmap_core::{validate_postal_code, RunConfig, RunProgress, RunReport, SearchReport};
use foodmap_scraper::{CleanSummary, Scraper, StopSignal};
use foodmap_store::{FileSummary, PostalSummary};
use tokio::sync::watch;

/// Runs a full scrape in a fresh browser. Ctrl-C stops the run after the
/// current establishment; what was accepted so far is still saved.
pub(crate) async fn run_scrape(scraper: &Scraper, run: &RunConfig) -> anyhow::Result<bool> {
    run.validate()?;

    let stop = StopSignal::new();
    let interrupt = {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, stopping after the current establishment");
                stop.stop();
            }
        })
    };

    let (progress, _) = watch::channel(RunProgress::default());
    let report = scraper.scrape_with_chromium(run, &stop, &progress).await;
    interrupt.abort();

    print!("{}", render_report(&report));
    Ok(report.success)
}

pub(crate) async fn run_search(scraper: &Scraper, postal_code: &str, visible: bool) -> bool {
    let report = scraper.search_with_chromium(postal_code, visible).await;
    print!("{}", render_search(&report));
    report.success
}

/// # Errors
///
/// Returns an error if the postal code is invalid or an output file cannot be
/// read or written.
pub(crate) fn run_clean(scraper: &Scraper, postal_code: &str) -> anyhow::Result<bool> {
    validate_postal_code(postal_code)?;
    let summary = scraper.clean(postal_code)?;
    print!("{}", render_clean(&summary));
    Ok(true)
}

/// # Errors
///
/// Returns an error if the postal code is invalid or an existing output file
/// cannot be read.
pub(crate) fn run_status(scraper: &Scraper, postal_code: &str) -> anyhow::Result<bool> {
    validate_postal_code(postal_code)?;
    let summary = scraper.store().summary(postal_code)?;
    print!("{}", render_status(&summary));
    Ok(true)
}

pub(crate) fn render_report(report: &RunReport) -> String {
    let mut out = String::new();
    if report.success {
        let outcome = if report.stopped { "stopped" } else { "completed" };
        let _ = writeln!(out, "scrape {outcome} for {}", report.postal_code);
    } else {
        let _ = writeln!(
            out,
            "error: scrape failed for {}: {}",
            report.postal_code,
            report.error.as_deref().unwrap_or("unknown error")
        );
    }
    let _ = writeln!(out, "  pages processed:  {}", report.pages_processed);
    let _ = writeln!(out, "  restaurants:      {}", report.restaurants_scraped);
    let _ = writeln!(out, "  stores:           {}", report.stores_scraped);
    for file in [&report.restaurants_file, &report.stores_file]
        .into_iter()
        .flatten()
    {
        let _ = writeln!(out, "  saved to:         {}", file.display());
    }
    let _ = writeln!(out, "  elapsed:          {:.1}s", millis_to_secs(report.elapsed_ms));
    out
}

pub(crate) fn render_search(report: &SearchReport) -> String {
    let mut out = String::new();
    if report.success {
        let _ = writeln!(out, "search succeeded for {}", report.postal_code);
        let _ = writeln!(out, "  dialog closed:  {}", report.dialog_closed);
        let _ = writeln!(out, "  page load:      {} ms", report.page_load_ms);
        let _ = writeln!(out, "  search:         {} ms", report.search_ms);
    } else {
        let _ = writeln!(
            out,
            "error: search failed for {}: {}",
            report.postal_code,
            report.error.as_deref().unwrap_or("unknown error")
        );
    }
    let _ = writeln!(out, "  total:          {} ms", report.total_ms);
    out
}

pub(crate) fn render_clean(summary: &CleanSummary) -> String {
    format!(
        "cleaned {}: {} restaurants, {} stores kept; {} duplicate establishments and {} products removed\n",
        summary.postal_code,
        summary.restaurants,
        summary.stores,
        summary.duplicate_establishments,
        summary.products_removed
    )
}

pub(crate) fn render_status(summary: &PostalSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "postal code {}", summary.postal_code);
    let _ = writeln!(out, "{:<13}{:<8}{:<16}{:<8}SAMPLE", "TYPE", "FILE", "ESTABLISHMENTS", "ITEMS");
    for (label, file) in [("restaurants", &summary.restaurants), ("stores", &summary.stores)] {
        let _ = writeln!(out, "{}", status_row(label, file));
    }
    out
}

fn status_row(label: &str, file: &FileSummary) -> String {
    let exists = if file.exists { "yes" } else { "no" };
    format!(
        "{label:<13}{exists:<8}{:<16}{:<8}{}",
        file.establishments,
        file.items,
        file.sample_names.join(", ")
    )
}

#[allow(clippy::cast_precision_loss)]
fn millis_to_secs(ms: u64) -> f64 {
    ms as f64 / 1000.0
}
