use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Parameters for one scraping run over a single postal code.
///
/// The HTTP API historically named the limits `max_restaurants` and
/// `max_menu_items`; both spellings are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub postal_code: String,
    #[serde(default, alias = "visible")]
    pub visible_mode: bool,
    #[serde(default, alias = "max_restaurants")]
    pub max_establishments: Option<usize>,
    #[serde(default, alias = "max_menu_items")]
    pub max_items_per_establishment: Option<usize>,
}

impl RunConfig {
    #[must_use]
    pub fn new(postal_code: impl Into<String>) -> Self {
        Self {
            postal_code: postal_code.into(),
            visible_mode: false,
            max_establishments: None,
            max_items_per_establishment: None,
        }
    }

    /// Checks the postal code with [`validate_postal_code`] and that any limit
    /// is positive.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRunConfig`] naming the offending field.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_postal_code(&self.postal_code)?;
        if self.max_establishments == Some(0) {
            return Err(CoreError::InvalidRunConfig(
                "max_establishments must be a positive integer".to_string(),
            ));
        }
        if self.max_items_per_establishment == Some(0) {
            return Err(CoreError::InvalidRunConfig(
                "max_items_per_establishment must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }

    /// True once `accepted` establishments satisfy the configured cap.
    #[must_use]
    pub fn cap_reached(&self, accepted: usize) -> bool {
        self.max_establishments.is_some_and(|max| accepted >= max)
    }
}

/// Postal codes name the output files, so only ASCII letters, digits and
/// `-` are accepted.
///
/// # Errors
///
/// Returns [`CoreError::InvalidRunConfig`] when `postal_code` is blank or
/// holds any other character.
pub fn validate_postal_code(postal_code: &str) -> Result<(), CoreError> {
    if postal_code.trim().is_empty() {
        return Err(CoreError::InvalidRunConfig(
            "postal_code is required".to_string(),
        ));
    }
    if !postal_code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(CoreError::InvalidRunConfig(format!(
            "postal_code {postal_code:?} may only contain letters, digits and '-'"
        )));
    }
    Ok(())
}

/// Live counters published while a run is in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunProgress {
    pub pages_processed: usize,
    pub establishments_scraped: usize,
    pub current_establishment: Option<String>,
}

/// Outcome of a full scraping run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub postal_code: String,
    pub pages_processed: usize,
    pub establishments_scraped: usize,
    pub restaurants_scraped: usize,
    pub stores_scraped: usize,
    /// True when the run ended early on an external stop request.
    pub stopped: bool,
    pub restaurants_file: Option<PathBuf>,
    pub stores_file: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl RunReport {
    #[must_use]
    pub fn failed(
        postal_code: impl Into<String>,
        error: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            postal_code: postal_code.into(),
            pages_processed: 0,
            establishments_scraped: 0,
            restaurants_scraped: 0,
            stores_scraped: 0,
            stopped: false,
            restaurants_file: None,
            stores_file: None,
            started_at,
            elapsed_ms: elapsed_since(started_at),
        }
    }
}

/// Outcome of a search-only run: the postal code was entered and submitted,
/// nothing was scraped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchReport {
    pub success: bool,
    pub postal_code: String,
    pub dialog_closed: bool,
    pub page_load_ms: u64,
    pub search_ms: u64,
    pub total_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Milliseconds elapsed since `started_at`, clamped at zero.
#[must_use]
pub fn elapsed_since(started_at: DateTime<Utc>) -> u64 {
    u64::try_from((Utc::now() - started_at).num_milliseconds()).unwrap_or(0)
}
