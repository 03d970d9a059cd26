//! The browser capability the scraper drives.
//!
//! [`BrowserSession`] is deliberately small: navigation, element lookup,
//! reading, clicking, typing, scrolling, script execution and tabs. The
//! Chromium implementation lives in [`chromium`]; tests use the scripted
//! session in [`fake`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::BrowserError;

pub mod chromium;
#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use chromium::{ChromiumSession, LaunchOptions};

/// How to find elements: a CSS selector or an XPath expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    #[must_use]
    pub fn xpath(expression: impl Into<String>) -> Self {
        Locator::XPath(expression.into())
    }

    /// Reads a configured selector: XPath when it starts with `/` or `(`,
    /// CSS otherwise.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('/') || trimmed.starts_with('(') {
            Locator::XPath(trimmed.to_string())
        } else {
            Locator::Css(trimmed.to_string())
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Locator::Css(s) | Locator::XPath(s) => s,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css:{s}"),
            Locator::XPath(s) => write!(f, "xpath:{s}"),
        }
    }
}

/// Opaque reference to an element found in the active tab. Handles go stale
/// when their tab navigates or closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TabId(pub u64);

/// Ways to click an element, cheapest first. Overlays regularly intercept
/// native clicks, so callers escalate through the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClickStrategy {
    Native,
    Script,
    PointerSequence,
    DispatchedEvent,
}

impl ClickStrategy {
    pub const ESCALATION: [ClickStrategy; 4] = [
        ClickStrategy::Native,
        ClickStrategy::Script,
        ClickStrategy::PointerSequence,
        ClickStrategy::DispatchedEvent,
    ];
}

impl fmt::Display for ClickStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClickStrategy::Native => "native",
            ClickStrategy::Script => "script",
            ClickStrategy::PointerSequence => "pointer-sequence",
            ClickStrategy::DispatchedEvent => "dispatched-event",
        };
        f.write_str(name)
    }
}

#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Waits until the document reports `complete` or `timeout` elapses.
    async fn wait_until_ready(&self, timeout: Duration) -> Result<(), BrowserError>;

    async fn current_url(&self) -> Result<String, BrowserError>;

    async fn title(&self) -> Result<String, BrowserError>;

    /// Serialized DOM of the active tab, including embedded scripts.
    async fn page_source(&self) -> Result<String, BrowserError>;

    /// Rendered text of the document body, one visual line per line.
    async fn visible_text(&self) -> Result<String, BrowserError>;

    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementHandle>, BrowserError>;

    async fn find_one(&self, locator: &Locator) -> Result<ElementHandle, BrowserError> {
        self.find_all(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BrowserError::ElementNotFound {
                locator: locator.to_string(),
            })
    }

    /// Polls for `locator` until it matches or `timeout` elapses.
    async fn wait_for(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<ElementHandle, BrowserError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.find_one(locator).await {
                Ok(handle) => return Ok(handle),
                Err(err) if !err.is_transient() => return Err(err),
                Err(_) => {}
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::Timeout {
                    what: locator.to_string(),
                    millis: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    async fn text(&self, element: ElementHandle) -> Result<String, BrowserError>;

    async fn inner_html(&self, element: ElementHandle) -> Result<String, BrowserError>;

    async fn attribute(
        &self,
        element: ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError>;

    async fn is_displayed(&self, element: ElementHandle) -> Result<bool, BrowserError>;

    async fn click(
        &self,
        element: ElementHandle,
        strategy: ClickStrategy,
    ) -> Result<(), BrowserError>;

    /// Clears the field, then types `text` into it.
    async fn fill(&self, element: ElementHandle, text: &str) -> Result<(), BrowserError>;

    async fn press_enter(&self, element: ElementHandle) -> Result<(), BrowserError>;

    async fn scroll_by(&self, pixels: i64) -> Result<(), BrowserError>;

    async fn scroll_to_bottom(&self) -> Result<(), BrowserError>;

    async fn scroll_to_top(&self) -> Result<(), BrowserError>;

    async fn scroll_into_view(&self, element: ElementHandle) -> Result<(), BrowserError>;

    async fn page_height(&self) -> Result<i64, BrowserError>;

    /// Evaluates `script` in the page and returns its JSON result.
    async fn execute(&self, script: &str) -> Result<serde_json::Value, BrowserError>;

    /// Opens `url` in a new tab and makes it the active one.
    async fn open_tab(&self, url: &str) -> Result<TabId, BrowserError>;

    async fn active_tab(&self) -> Result<TabId, BrowserError>;

    async fn switch_to_tab(&self, tab: TabId) -> Result<(), BrowserError>;

    async fn close_tab(&self, tab: TabId) -> Result<(), BrowserError>;

    /// Shuts the browser down. The session is unusable afterwards.
    async fn close(&self) -> Result<(), BrowserError>;
}

/// Clicks `element`, escalating through [`ClickStrategy::ESCALATION`] while
/// failures are transient. Returns the strategy that worked.
///
/// # Errors
///
/// Returns the last error once every strategy failed, or the first
/// non-transient error.
pub async fn click_with_fallback(
    session: &dyn BrowserSession,
    element: ElementHandle,
) -> Result<ClickStrategy, BrowserError> {
    let mut last_err = None;
    for strategy in ClickStrategy::ESCALATION {
        match session.click(element, strategy).await {
            Ok(()) => {
                if strategy != ClickStrategy::Native {
                    tracing::debug!(%strategy, "click succeeded after escalation");
                }
                return Ok(strategy);
            }
            Err(err) if err.is_transient() => {
                tracing::debug!(%strategy, error = %err, "click strategy failed");
                last_err = Some(err);
            }
            Err(err) => return Err(err),
        }
    }
    Err(last_err.unwrap_or(BrowserError::NotInteractable {
        reason: "no click strategy available".to_string(),
    }))
}

/// Scrolls to the bottom until the page height stops growing, at most
/// `max_attempts` times. Returns the number of scrolls performed.
///
/// # Errors
///
/// Propagates browser errors from scrolling or reading the height.
pub async fn scroll_until_stable(
    session: &dyn BrowserSession,
    pause: Duration,
    max_attempts: usize,
) -> Result<usize, BrowserError> {
    let mut last_height = session.page_height().await?;
    let mut scrolls = 0;
    while scrolls < max_attempts {
        session.scroll_to_bottom().await?;
        scrolls += 1;
        tokio::time::sleep(pause).await;
        let height = session.page_height().await?;
        if height == last_height {
            break;
        }
        last_height = height;
    }
    Ok(scrolls)
}

/// First match among `candidates` whose text is longer than `min_chars`.
pub(crate) async fn first_text(
    session: &dyn BrowserSession,
    candidates: &[Locator],
    min_chars: usize,
) -> Option<String> {
    for locator in candidates {
        let Ok(handle) = session.find_one(locator).await else {
            continue;
        };
        if let Ok(text) = session.text(handle).await {
            let text = text.trim();
            if text.chars().count() > min_chars {
                return Some(text.to_string());
            }
        }
    }
    None
}

/// Resolves a possibly relative link against the page it was found on.
pub(crate) fn resolve_href(base: &str, href: &str) -> String {
    url::Url::parse(base)
        .and_then(|b| b.join(href))
        .map_or_else(|_| href.to_string(), String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_detects_xpath() {
        assert_eq!(
            Locator::parse("//a[contains(@href, 'info')]"),
            Locator::XPath("//a[contains(@href, 'info')]".to_string())
        );
        assert_eq!(
            Locator::parse("(//button)[1]"),
            Locator::XPath("(//button)[1]".to_string())
        );
        assert_eq!(Locator::parse(" h1 "), Locator::Css("h1".to_string()));
    }

    #[test]
    fn display_names_the_kind() {
        assert_eq!(Locator::css("h1").to_string(), "css:h1");
        assert_eq!(Locator::xpath("//h1").to_string(), "xpath://h1");
    }

    #[test]
    fn relative_links_resolve_against_page() {
        assert_eq!(
            resolve_href("https://x.test/fr/store/a/b", "/fr/store/a/b/info"),
            "https://x.test/fr/store/a/b/info"
        );
        assert_eq!(
            resolve_href("https://x.test/fr/feed", "https://y.test/info"),
            "https://y.test/info"
        );
        assert_eq!(resolve_href("", "/relative"), "/relative");
    }
}
