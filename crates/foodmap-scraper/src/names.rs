//! Establishment name canonicalization for duplicate detection.

use foodmap_core::{NameTuning, NOT_AVAILABLE};

/// Collapses format variants of one chain ("Chain Sprint", "Express Chain")
/// to a single identity.
#[derive(Debug, Clone)]
pub struct NameNormalizer {
    chain_tokens: Vec<String>,
}

impl NameNormalizer {
    #[must_use]
    pub fn new(tuning: &NameTuning) -> Self {
        Self {
            chain_tokens: tuning
                .chain_tokens
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// Lowercases, trims and strips chain-variant words from either end.
    ///
    /// At least one word always survives, so a name made only of variant
    /// words ("City Market") still normalizes to something non-empty.
    /// Unknown names normalize to the empty string.
    #[must_use]
    pub fn normalize(&self, name: &str) -> String {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed == NOT_AVAILABLE {
            return String::new();
        }

        let lower = trimmed.to_lowercase();
        let mut words: Vec<&str> = lower.split_whitespace().collect();

        while words.len() > 1 && self.is_chain_token(words[0]) {
            words.remove(0);
        }
        while words.len() > 1 && words.last().is_some_and(|w| self.is_chain_token(w)) {
            words.pop();
        }

        words.join(" ")
    }

    fn is_chain_token(&self, word: &str) -> bool {
        self.chain_tokens.iter().any(|t| t == word)
    }
}

impl Default for NameNormalizer {
    fn default() -> Self {
        Self::new(&NameTuning::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_and_leading_variants_collapse() {
        let n = NameNormalizer::default();
        assert_eq!(n.normalize("Chain Sprint"), n.normalize("Chain"));
        assert_eq!(n.normalize("Express Chain"), n.normalize("Chain"));
        assert_eq!(n.normalize("Carrefour City"), "carrefour");
        assert_eq!(n.normalize("Carrefour Express"), "carrefour");
    }

    #[test]
    fn stacked_variants_are_all_stripped() {
        let n = NameNormalizer::default();
        assert_eq!(n.normalize("Super Casino Express"), "casino");
    }

    #[test]
    fn internal_variant_words_are_kept() {
        let n = NameNormalizer::default();
        assert_eq!(n.normalize("Le Super Bistrot de Paris"), "le super bistrot de paris");
    }

    #[test]
    fn whitespace_is_collapsed_and_case_folded() {
        let n = NameNormalizer::default();
        assert_eq!(n.normalize("  Monoprix    Saint-Maur  "), "monoprix saint-maur");
    }

    #[test]
    fn unknown_names_are_empty() {
        let n = NameNormalizer::default();
        assert_eq!(n.normalize(""), "");
        assert_eq!(n.normalize("   "), "");
        assert_eq!(n.normalize("N/A"), "");
    }

    #[test]
    fn name_made_only_of_variant_words_keeps_one_word() {
        let n = NameNormalizer::default();
        assert_eq!(n.normalize("City Market"), "market");
    }
}
