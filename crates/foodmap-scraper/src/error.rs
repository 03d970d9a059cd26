use thiserror::Error;

/// Failures of a single browser interaction.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("no element matches {locator}")]
    ElementNotFound { locator: String },

    #[error("element is not interactable: {reason}")]
    NotInteractable { reason: String },

    #[error("element handle {0} is stale")]
    StaleElement(u64),

    #[error("timed out after {millis}ms waiting for {what}")]
    Timeout { what: String, millis: u64 },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("unknown tab {0}")]
    UnknownTab(u64),

    #[error("browser protocol error: {0}")]
    Protocol(String),

    #[error("browser launch failed: {0}")]
    Launch(String),
}

impl BrowserError {
    /// Overlays, late rendering and re-rendered nodes cause these; the same
    /// call usually succeeds a moment later.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BrowserError::ElementNotFound { .. }
                | BrowserError::NotInteractable { .. }
                | BrowserError::StaleElement(_)
                | BrowserError::Timeout { .. }
        )
    }
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        BrowserError::Protocol(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("search for postal code {postal_code} failed after {attempts} attempts: {reason}")]
    Search {
        postal_code: String,
        attempts: u32,
        reason: String,
    },

    #[error("item extraction for {url} did not finish within {secs}s")]
    ExtractionTimeout { url: String, secs: u64 },

    #[error(transparent)]
    Store(#[from] foodmap_store::StoreError),

    #[error(transparent)]
    Config(#[from] foodmap_core::ConfigError),
}
