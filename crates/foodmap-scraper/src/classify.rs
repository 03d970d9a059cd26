//! Restaurant/store classification.
//!
//! [`EstablishmentClassifier`] decides from the live page, checking in order
//! and stopping at the first hit:
//!
//! 1. a grocery chain keyword in the URL,
//! 2. a grocery keyword in the page title,
//! 3. the number of carousel "next" controls (high count, or middle band with
//!    one strong grocery keyword),
//! 4. at least `min_keyword_hits` distinct strong grocery keywords in the text,
//!
//! and otherwise answers restaurant. [`recategorize`] gives a second opinion
//! from the shape of the items that were actually extracted.

use std::collections::HashSet;

use foodmap_core::{
    Catalog, ClassifierTuning, EstablishmentKind, EstablishmentRecord, SelectorTuning,
};
use scraper::{Html, Selector};

use crate::snapshot::PageSnapshot;

/// Which rule decided the classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationReason {
    UrlKeyword(String),
    TitleKeyword(String),
    CarouselControls(usize),
    CarouselWithKeyword { controls: usize, keyword: String },
    KeywordDensity(Vec<String>),
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: EstablishmentKind,
    pub reason: ClassificationReason,
}

impl Classification {
    fn store(reason: ClassificationReason) -> Self {
        Self {
            kind: EstablishmentKind::Store,
            reason,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EstablishmentClassifier {
    tuning: ClassifierTuning,
    carousel_selectors: Vec<String>,
}

impl EstablishmentClassifier {
    #[must_use]
    pub fn new(tuning: &ClassifierTuning, selectors: &SelectorTuning) -> Self {
        Self {
            tuning: tuning.clone(),
            carousel_selectors: selectors.carousel_next.clone(),
        }
    }

    #[must_use]
    pub fn classify(&self, page: &PageSnapshot) -> Classification {
        let url = page.url.to_lowercase();
        if let Some(keyword) = first_contained(&url, &self.tuning.store_url_keywords) {
            return Classification::store(ClassificationReason::UrlKeyword(keyword));
        }

        let title = page.title.to_lowercase();
        if let Some(keyword) = first_contained(&title, &self.tuning.store_title_keywords) {
            return Classification::store(ClassificationReason::TitleKeyword(keyword));
        }

        let text = page.visible_text.to_lowercase();
        let hits = self.strong_keyword_hits(&text);

        let controls = self.count_carousel_controls(&page.html);
        if controls >= self.tuning.carousel_high_threshold {
            return Classification::store(ClassificationReason::CarouselControls(controls));
        }
        if controls >= self.tuning.carousel_mid_threshold {
            if let Some(keyword) = hits.first() {
                return Classification::store(ClassificationReason::CarouselWithKeyword {
                    controls,
                    keyword: keyword.clone(),
                });
            }
        }

        if hits.len() >= self.tuning.min_keyword_hits {
            return Classification::store(ClassificationReason::KeywordDensity(hits));
        }

        Classification {
            kind: EstablishmentKind::Restaurant,
            reason: ClassificationReason::Default,
        }
    }

    /// Distinct elements matched by any carousel selector. Selectors the
    /// HTML parser cannot read (XPath) are skipped.
    #[must_use]
    pub fn count_carousel_controls(&self, html: &str) -> usize {
        if html.is_empty() {
            return 0;
        }
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        for raw in &self.carousel_selectors {
            let Ok(selector) = Selector::parse(raw) else {
                continue;
            };
            for element in document.select(&selector) {
                seen.insert(element.id());
            }
        }
        seen.len()
    }

    /// Strong keywords present in already-lowercased `text`, in tuning order.
    fn strong_keyword_hits(&self, text: &str) -> Vec<String> {
        let mut hits: Vec<String> = Vec::new();
        for keyword in &self.tuning.strong_keywords {
            let keyword = keyword.to_lowercase();
            if !keyword.is_empty() && text.contains(&keyword) && !hits.contains(&keyword) {
                hits.push(keyword);
            }
        }
        hits
    }
}

fn first_contained(haystack: &str, keywords: &[String]) -> Option<String> {
    keywords
        .iter()
        .map(|k| k.to_lowercase())
        .find(|k| !k.is_empty() && haystack.contains(k.as_str()))
}

/// Flips a restaurant to a store when its items are mostly description-only.
///
/// Triggers when at least `recategorize_min_items` items carry a description
/// and titled items are fewer than `recategorize_title_ratio` of those, and
/// the description-only items outnumber the titled ones. Items are reshaped
/// in the same step. Returns whether the record changed.
pub fn recategorize(record: &mut EstablishmentRecord, tuning: &ClassifierTuning) -> bool {
    let Catalog::Menu(items) = &record.catalog else {
        return false;
    };

    let titled = items.iter().filter(|i| i.has_title()).count();
    let described = items.iter().filter(|i| i.has_description()).count();
    if described < tuning.recategorize_min_items {
        return false;
    }

    #[allow(clippy::cast_precision_loss)]
    let mostly_untitled = (titled as f64) < tuning.recategorize_title_ratio * described as f64;
    if !mostly_untitled {
        return false;
    }

    let description_only = items
        .iter()
        .filter(|i| i.has_description() && !i.has_title())
        .count();
    if description_only <= titled {
        return false;
    }

    tracing::info!(
        url = %record.url,
        titled,
        described,
        "re-categorizing restaurant as store from extracted item shape"
    );
    record.reclassify(EstablishmentKind::Store);
    true
}

#[cfg(test)]
#[path = "classify_test.rs"]
mod tests;
