//! Marketplace-specific tuning data.
//!
//! Selectors, keyword lists and numeric thresholds are empirical: they were
//! fitted against one marketplace's markup. They live here as data so a YAML
//! file can override any of them without touching the extraction code. Every
//! field has a default, so a tuning file only needs the keys it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeTuning {
    pub selectors: SelectorTuning,
    pub classifier: ClassifierTuning,
    pub extraction: ExtractionTuning,
    pub names: NameTuning,
    pub timing: TimingTuning,
}

/// CSS selectors, or XPath expressions when the value starts with `/` or `(`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorTuning {
    pub search_input: String,
    pub search_suggestion: String,
    pub close_dialog: String,
    pub store_card: String,
    /// Tried in order until one matches a visible, enabled control.
    pub show_more: Vec<String>,
    /// Tried in order; the first match with more than two characters wins.
    pub store_name: Vec<String>,
    pub info_link: Vec<String>,
    pub contact_blocks: String,
    /// DOM extraction strategy priority list.
    pub item_containers: Vec<String>,
    pub carousel_next: Vec<String>,
}

impl Default for SelectorTuning {
    fn default() -> Self {
        Self {
            search_input: "#location-typeahead-home-input".to_string(),
            search_suggestion: r#"[role="option"]"#.to_string(),
            close_dialog: r#"button[data-testid="close-button"]"#.to_string(),
            store_card: r#"a[data-testid="store-card"]"#.to_string(),
            show_more: strings(&[
                r#"//button[contains(., "Afficher plus") or contains(., "Show more")]"#,
                r#"button[data-testid*="show-more"]"#,
            ]),
            store_name: strings(&[
                r#"h1[class*="hn"][class*="ho"]"#,
                "h1",
                r#"[data-testid*="store-name"]"#,
                r#"[class*="store-name"]"#,
            ]),
            info_link: strings(&[
                r#"//a[contains(text(), "Informations") or contains(text(), "informations")]"#,
                r#"//a[contains(@href, "storeInfo") or contains(@href, "info")]"#,
            ]),
            contact_blocks: "div span".to_string(),
            item_containers: strings(&[
                r#"div[data-testid*="store-item"]"#,
                r#"[data-testid*="menu-item"]"#,
                r#"[data-testid*="product"]"#,
                r#"li[data-testid*="item"]"#,
            ]),
            carousel_next: strings(&[
                r#"button[aria-label*="Next"]"#,
                r#"button[aria-label*="next"]"#,
                r#"button[aria-label*="Suivant"]"#,
                r#"button[aria-label*="suivant"]"#,
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierTuning {
    /// Grocery/retail chain fragments matched against the lowercased URL.
    pub store_url_keywords: Vec<String>,
    pub store_title_keywords: Vec<String>,
    /// Phrases that essentially only appear on grocery pages.
    pub strong_keywords: Vec<String>,
    pub carousel_high_threshold: usize,
    /// Lower bound of the middle band `[mid, high)` that also needs one
    /// strong keyword.
    pub carousel_mid_threshold: usize,
    pub min_keyword_hits: usize,
    /// Re-categorization flips a restaurant whose titled items make up less
    /// than this fraction of its described items.
    pub recategorize_title_ratio: f64,
    pub recategorize_min_items: usize,
}

impl Default for ClassifierTuning {
    fn default() -> Self {
        Self {
            store_url_keywords: strings(&[
                "carrefour",
                "monoprix",
                "franprix",
                "auchan",
                "casino",
                "lidl",
                "intermarche",
                "leclerc",
                "picard",
                "naturalia",
                "biocoop",
                "g20",
                "spar",
                "supermarche",
                "epicerie",
                "grocery",
            ]),
            store_title_keywords: strings(&[
                "supermarché",
                "supermarche",
                "hypermarché",
                "épicerie",
                "epicerie",
                "grocery",
                "supermarket",
                "carrefour",
                "monoprix",
                "franprix",
                "courses",
            ]),
            strong_keywords: strings(&[
                "fruits et légumes",
                "produits laitiers",
                "produits frais",
                "épicerie salée",
                "épicerie sucrée",
                "surgelés",
                "hygiène",
                "entretien",
                "€/kg",
                "€/l",
                "fruits & vegetables",
                "dairy",
                "frozen food",
                "household",
                "personal care",
            ]),
            carousel_high_threshold: 8,
            carousel_mid_threshold: 5,
            min_keyword_hits: 2,
            recategorize_title_ratio: 0.30,
            recategorize_min_items: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionTuning {
    pub title_min_len: usize,
    pub title_max_len: usize,
    pub description_min_len: usize,
    pub description_max_len: usize,
    /// Products and descriptions shorter than this are metadata, not text.
    pub product_min_len: usize,
    pub product_max_len: usize,
    /// Lines up to this length are title candidates in the full-page fallback.
    pub heuristic_title_max_len: usize,
    pub dom_min_elements: usize,
    pub dom_max_elements: usize,
    pub lookahead_lines: usize,
    /// Lowercased UI vocabulary (buttons, labels) rejected as item text.
    pub ui_noise: Vec<String>,
    /// Text shorter than this is rejected when it merely contains a UI token.
    pub ui_noise_containment_max_len: usize,
}

impl Default for ExtractionTuning {
    fn default() -> Self {
        Self {
            title_min_len: 3,
            title_max_len: 80,
            description_min_len: 10,
            description_max_len: 400,
            product_min_len: 8,
            product_max_len: 200,
            heuristic_title_max_len: 60,
            dom_min_elements: 3,
            dom_max_elements: 50,
            lookahead_lines: 3,
            ui_noise: strings(&[
                "add",
                "add to cart",
                "order now",
                "select",
                "select options",
                "customize",
                "see more",
                "show more",
                "view all",
                "popular",
                "sold out",
                "ajouter",
                "ajouter au panier",
                "commander",
                "sélectionner",
                "personnaliser",
                "voir plus",
                "afficher plus",
                "tout afficher",
                "populaire",
                "épuisé",
                "informations",
            ]),
            ui_noise_containment_max_len: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameTuning {
    /// Format-variant words stripped from the start or end of store names.
    pub chain_tokens: Vec<String>,
}

impl Default for NameTuning {
    fn default() -> Self {
        Self {
            chain_tokens: strings(&[
                "sprint",
                "express",
                "city",
                "market",
                "super",
                "hyper",
                "supermarché",
                "hypermarché",
                "marché",
                "proxi",
                "contact",
                "mini",
            ]),
        }
    }
}

/// Pauses in milliseconds unless noted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingTuning {
    pub scroll_pause_ms: u64,
    pub max_scroll_attempts: usize,
    pub load_more_wait_ms: u64,
    pub visit_pause_ms: u64,
    /// Upper bound of the random extra pause added to `visit_pause_ms`.
    pub visit_jitter_ms: u64,
    pub page_settle_ms: u64,
    pub dialog_wait_ms: u64,
    pub suggestion_wait_ms: u64,
    pub info_link_attempts: usize,
    pub info_scroll_px: i64,
}

impl Default for TimingTuning {
    fn default() -> Self {
        Self {
            scroll_pause_ms: 800,
            max_scroll_attempts: 20,
            load_more_wait_ms: 1500,
            visit_pause_ms: 300,
            visit_jitter_ms: 200,
            page_settle_ms: 1000,
            dialog_wait_ms: 2000,
            suggestion_wait_ms: 5000,
            info_link_attempts: 3,
            info_scroll_px: 300,
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

/// Load and validate a tuning file. Missing keys keep their defaults.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_tuning(path: &Path) -> Result<ScrapeTuning, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::TuningFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let tuning: ScrapeTuning =
        serde_yaml::from_str(&content).map_err(ConfigError::TuningFileParse)?;

    tuning.validate()?;

    Ok(tuning)
}

impl ScrapeTuning {
    /// Rejects settings the extraction code cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ex = &self.extraction;
        for (name, min, max) in [
            ("title", ex.title_min_len, ex.title_max_len),
            ("description", ex.description_min_len, ex.description_max_len),
            ("product", ex.product_min_len, ex.product_max_len),
        ] {
            if min > max {
                return Err(ConfigError::Validation(format!(
                    "{name} length bounds are inverted: min {min} > max {max}"
                )));
            }
        }

        if ex.dom_min_elements > ex.dom_max_elements {
            return Err(ConfigError::Validation(format!(
                "dom_min_elements {} exceeds dom_max_elements {}",
                ex.dom_min_elements, ex.dom_max_elements
            )));
        }

        let cl = &self.classifier;
        if !(cl.recategorize_title_ratio > 0.0 && cl.recategorize_title_ratio < 1.0) {
            return Err(ConfigError::Validation(format!(
                "recategorize_title_ratio must be between 0 and 1, got {}",
                cl.recategorize_title_ratio
            )));
        }

        if cl.carousel_mid_threshold > cl.carousel_high_threshold {
            return Err(ConfigError::Validation(format!(
                "carousel_mid_threshold {} exceeds carousel_high_threshold {}",
                cl.carousel_mid_threshold, cl.carousel_high_threshold
            )));
        }

        let sel = &self.selectors;
        for (name, list) in [
            ("show_more", &sel.show_more),
            ("store_name", &sel.store_name),
            ("info_link", &sel.info_link),
            ("item_containers", &sel.item_containers),
            ("carousel_next", &sel.carousel_next),
        ] {
            if list.iter().all(|s| s.trim().is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "selector list '{name}' must contain at least one selector"
                )));
            }
        }

        for (name, value) in [
            ("search_input", &sel.search_input),
            ("store_card", &sel.store_card),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "selector '{name}' must be non-empty"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "tuning_test.rs"]
mod tests;
