//! Postal-code search on the marketplace entry page.

use std::time::{Duration, Instant};

use foodmap_core::{AppConfig, ScrapeTuning, SearchReport};

use crate::browser::{click_with_fallback, BrowserSession, Locator};
use crate::error::{BrowserError, ScrapeError};
use crate::retry::retry_with_backoff;

/// What the search step observed along the way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    pub dialog_closed: bool,
    pub page_load_ms: u64,
    pub search_ms: u64,
}

/// Loads the entry page, dismisses a blocking dialog if one shows up, and
/// submits `postal_code`.
///
/// # Errors
///
/// Returns [`ScrapeError::Search`] when the entry page cannot be loaded or
/// the postal code cannot be submitted within the configured retries.
pub async fn search_postal_code(
    session: &dyn BrowserSession,
    config: &AppConfig,
    tuning: &ScrapeTuning,
    postal_code: &str,
) -> Result<SearchOutcome, ScrapeError> {
    let search_failed = |attempts: u32, err: &BrowserError| ScrapeError::Search {
        postal_code: postal_code.to_string(),
        attempts,
        reason: err.to_string(),
    };

    let load_started = Instant::now();
    session
        .navigate(&config.base_url)
        .await
        .map_err(|e| search_failed(1, &e))?;
    session
        .wait_until_ready(config.page_load_timeout())
        .await
        .map_err(|e| search_failed(1, &e))?;
    tokio::time::sleep(Duration::from_millis(tuning.timing.page_settle_ms)).await;
    let page_load_ms = millis(load_started);

    let dialog_closed = close_dialog_if_present(session, tuning).await;

    let search_started = Instant::now();
    let input = Locator::parse(&tuning.selectors.search_input);
    let suggestion = Locator::parse(&tuning.selectors.search_suggestion);
    let suggestion_wait = Duration::from_millis(tuning.timing.suggestion_wait_ms);
    let input_wait = config.page_load_timeout();

    retry_with_backoff(config.search_max_retries, config.retry_backoff_base_ms, || {
        submit_once(
            session,
            &input,
            &suggestion,
            postal_code,
            input_wait,
            suggestion_wait,
        )
    })
    .await
    .map_err(|e| search_failed(config.search_max_retries + 1, &e))?;

    let outcome = SearchOutcome {
        dialog_closed,
        page_load_ms,
        search_ms: millis(search_started),
    };
    tracing::info!(
        postal_code,
        dialog_closed,
        search_ms = outcome.search_ms,
        "postal code submitted"
    );
    Ok(outcome)
}

/// Runs only the search step and reports how it went.
pub async fn perform_search(
    session: &dyn BrowserSession,
    config: &AppConfig,
    tuning: &ScrapeTuning,
    postal_code: &str,
) -> SearchReport {
    let started = Instant::now();
    match search_postal_code(session, config, tuning, postal_code).await {
        Ok(outcome) => SearchReport {
            success: true,
            postal_code: postal_code.to_string(),
            dialog_closed: outcome.dialog_closed,
            page_load_ms: outcome.page_load_ms,
            search_ms: outcome.search_ms,
            total_ms: millis(started),
            error: None,
        },
        Err(e) => {
            tracing::error!(postal_code, error = %e, "search failed");
            SearchReport {
                success: false,
                postal_code: postal_code.to_string(),
                dialog_closed: false,
                page_load_ms: 0,
                search_ms: 0,
                total_ms: millis(started),
                error: Some(e.to_string()),
            }
        }
    }
}

/// Clicks the dialog close button when it appears within the dialog wait.
async fn close_dialog_if_present(session: &dyn BrowserSession, tuning: &ScrapeTuning) -> bool {
    let locator = Locator::parse(&tuning.selectors.close_dialog);
    let wait = Duration::from_millis(tuning.timing.dialog_wait_ms);
    let Ok(button) = session.wait_for(&locator, wait).await else {
        return false;
    };
    match click_with_fallback(session, button).await {
        Ok(_) => {
            tracing::debug!("dialog closed");
            true
        }
        Err(e) => {
            tracing::debug!(error = %e, "dialog close button could not be clicked");
            false
        }
    }
}

async fn submit_once(
    session: &dyn BrowserSession,
    input: &Locator,
    suggestion: &Locator,
    postal_code: &str,
    input_wait: Duration,
    suggestion_wait: Duration,
) -> Result<(), BrowserError> {
    let field = session.wait_for(input, input_wait).await?;
    click_with_fallback(session, field).await?;
    session.fill(field, postal_code).await?;

    match session.wait_for(suggestion, suggestion_wait).await {
        Ok(option) => {
            click_with_fallback(session, option).await?;
        }
        Err(e) if e.is_transient() => {
            tracing::debug!("no suggestion offered, submitting with Enter");
            session.press_enter(field).await?;
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

fn millis(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{instant_tuning, test_config, ClickEffect, FakeElement, FakePage, FakeSession};
    use crate::browser::ClickStrategy;

    const FEED: &str = "https://market.test/feed";
    const LISTING: &str = "https://market.test/feed?pl=75011";

    fn entry_page() -> FakeSession {
        FakeSession::new()
            .with_page(FEED, FakePage::new("Market"))
            .with_page(LISTING, FakePage::new("Market - 75011"))
    }

    fn input() -> FakeElement {
        FakeElement::new("").on_enter(ClickEffect::Navigate(LISTING.to_string()))
    }

    #[tokio::test]
    async fn suggestion_is_clicked_when_offered() {
        let dir = tempfile::tempdir().unwrap();
        let session = entry_page()
            .with_elements(FEED, "#location-typeahead-home-input", vec![input()])
            .with_elements(
                FEED,
                r#"[role="option"]"#,
                vec![FakeElement::new("75011 Paris")
                    .on_click(ClickEffect::Navigate(LISTING.to_string()))],
            );

        let outcome = search_postal_code(&session, &test_config(dir.path()), &instant_tuning(), "75011")
            .await
            .unwrap();

        assert!(!outcome.dialog_closed);
        assert_eq!(session.typed(), vec!["75011".to_string()]);
        assert_eq!(session.enter_presses(), 0);
        assert_eq!(session.current_url().await.unwrap(), LISTING);
    }

    #[tokio::test]
    async fn enter_is_pressed_without_suggestion() {
        let dir = tempfile::tempdir().unwrap();
        let session =
            entry_page().with_elements(FEED, "#location-typeahead-home-input", vec![input()]);

        search_postal_code(&session, &test_config(dir.path()), &instant_tuning(), "75011")
            .await
            .unwrap();

        assert_eq!(session.enter_presses(), 1);
        assert_eq!(session.current_url().await.unwrap(), LISTING);
    }

    #[tokio::test]
    async fn dialog_is_dismissed_and_blocked_input_escalates() {
        let dir = tempfile::tempdir().unwrap();
        let session = entry_page()
            .with_elements(
                FEED,
                r#"button[data-testid="close-button"]"#,
                vec![FakeElement::new("×").once()],
            )
            .with_elements(
                FEED,
                "#location-typeahead-home-input",
                vec![input().blocked(&[ClickStrategy::Native])],
            );

        let outcome = search_postal_code(&session, &test_config(dir.path()), &instant_tuning(), "75011")
            .await
            .unwrap();

        assert!(outcome.dialog_closed);
        assert!(session
            .clicks()
            .contains(&("#location-typeahead-home-input".to_string(), ClickStrategy::Script)));
    }

    #[tokio::test]
    async fn missing_input_fails_after_retries() {
        let dir = tempfile::tempdir().unwrap();
        let session = entry_page();

        let err = search_postal_code(&session, &test_config(dir.path()), &instant_tuning(), "75011")
            .await
            .unwrap_err();

        match err {
            ScrapeError::Search {
                postal_code,
                attempts,
                ..
            } => {
                assert_eq!(postal_code, "75011");
                assert_eq!(attempts, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unreachable_entry_page_is_a_search_failure() {
        let dir = tempfile::tempdir().unwrap();
        let session = FakeSession::new();
        let report = perform_search(&session, &test_config(dir.path()), &instant_tuning(), "75011").await;
        assert!(!report.success);
        assert!(report.error.unwrap().contains("75011"));
    }
}
