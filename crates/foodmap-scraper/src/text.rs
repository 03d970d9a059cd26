//! Text normalization and the noise filters every extraction path shares.
//!
//! [`clean`] turns a raw fragment (markup, entities, stray quotes) into plain
//! text. [`TextRules`] decides whether cleaned text is worth keeping: UI
//! vocabulary and price/quantity metadata are rejected the same way during
//! extraction and during post-processing.

use std::sync::LazyLock;

use foodmap_core::ExtractionTuning;
use regex::Regex;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("valid regex"));

/// Shapes of text that carry only price or quantity metadata.
static PRICE_QUANTITY_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // (4,80 €/kg), 3.20€/L
        r"^\(?\s*\d+(?:[.,]\d+)?\s*(?:€|\$|£|eur)\s*/\s*\p{L}{1,5}\s*\)?$",
        // 9 pcs • 23.5 g, 12 pièces
        r"^\d+\s*(?:pcs?|pièces?|pieces?|unités?|units?)\.?\s*(?:[•·|/-]\s*\d+(?:[.,]\d+)?\s*(?:mg|g|kg|ml|cl|l))?$",
        // 4 x 500ml, 6×33 cl
        r"^\d+\s*[x×]\s*\d+(?:[.,]\d+)?\s*(?:mg|g|kg|ml|cl|l)$",
        // 500 g, 1,5 L
        r"^\d+(?:[.,]\d+)?\s*(?:mg|g|kg|ml|cl|l)$",
        // 12,50 €, € 3.99, 3,99 € • 250 g
        r"^(?:€|\$|£)?\s*\d+(?:[.,]\d+)?\s*(?:€|\$|£)?(?:\s*[•·|/-]\s*\d+(?:[.,]\d+)?\s*(?:mg|g|kg|ml|cl|l))?$",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).expect("valid regex"))
    .collect()
});

const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&nbsp;", " "),
    ("&euro;", "€"),
    ("&pound;", "£"),
    ("&rsquo;", "\u{2019}"),
    ("&lsquo;", "\u{2018}"),
    ("&ldquo;", "\u{201c}"),
    ("&rdquo;", "\u{201d}"),
    ("&laquo;", "«"),
    ("&raquo;", "»"),
    ("&hellip;", "…"),
    ("&ndash;", "–"),
    ("&mdash;", "—"),
    ("&bull;", "•"),
    ("&middot;", "·"),
    ("&deg;", "°"),
];

/// Characters trimmed from both ends after whitespace is collapsed.
const EDGE_CHARS: &[char] = &[
    '"', '\'', '\u{2018}', '\u{2019}', '\u{201c}', '\u{201d}', '«', '»', ',', ';', ':', '|', '•',
    '·',
];

/// Decodes entities and strips tags until neither changes the text, then
/// collapses whitespace and trims surrounding quotes and separators.
///
/// Escaped markup (`&lt;b&gt;`) and double-escaped entities (`&amp;amp;`)
/// therefore come out as plain text, and cleaning twice changes nothing.
#[must_use]
pub fn clean(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    // Every change shortens the text, so this terminates.
    let mut text = raw.to_string();
    loop {
        let next = strip_tags(&decode_entities(&text));
        if next == text {
            break;
        }
        text = next;
    }

    let collapsed = text
        .replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    collapsed
        .trim_matches(|c: char| c.is_whitespace() || EDGE_CHARS.contains(&c))
        .to_string()
}

fn decode_entities(text: &str) -> String {
    let mut text = text.to_string();
    for (entity, replacement) in NAMED_ENTITIES {
        if text.contains(entity) {
            text = text.replace(entity, replacement);
        }
    }
    NUMERIC_ENTITY_RE
        .replace_all(&text, |caps: &regex::Captures<'_>| {
            let code = &caps[1];
            let value = match code.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => code.parse::<u32>().ok(),
            };
            value
                .and_then(char::from_u32)
                .map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

fn strip_tags(text: &str) -> String {
    TAG_RE.replace_all(text, " ").into_owned()
}

/// True when `text` has one of the price/quantity shapes or no letter at all,
/// regardless of length. Titles are checked with this.
#[must_use]
pub fn has_price_or_quantity_shape(text: &str) -> bool {
    let trimmed = text.trim();
    if !trimmed.chars().any(char::is_alphabetic) {
        return true;
    }
    if PRICE_QUANTITY_RES.iter().any(|re| re.is_match(trimmed)) {
        return true;
    }
    mostly_symbols(trimmed)
}

/// Letters make up less than a quarter of the non-space characters.
fn mostly_symbols(text: &str) -> bool {
    let mut letters = 0usize;
    let mut visible = 0usize;
    for c in text.chars().filter(|c| !c.is_whitespace()) {
        visible += 1;
        if c.is_alphabetic() {
            letters += 1;
        }
    }
    visible > 0 && letters * 4 < visible
}

/// Acceptance rules for extracted text, built from the extraction tuning.
#[derive(Debug, Clone)]
pub struct TextRules {
    ui_noise: Vec<String>,
    containment_max_len: usize,
    title_len: (usize, usize),
    description_len: (usize, usize),
    product_min_len: usize,
    product_max_len: usize,
}

impl TextRules {
    #[must_use]
    pub fn new(tuning: &ExtractionTuning) -> Self {
        Self {
            ui_noise: tuning
                .ui_noise
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            containment_max_len: tuning.ui_noise_containment_max_len,
            title_len: (tuning.title_min_len, tuning.title_max_len),
            description_len: (tuning.description_min_len, tuning.description_max_len),
            product_min_len: tuning.product_min_len,
            product_max_len: tuning.product_max_len,
        }
    }

    /// Button and label text: an exact UI token, or short text containing one
    /// anywhere.
    #[must_use]
    pub fn is_ui_noise(&self, text: &str) -> bool {
        let lower = text.trim().to_lowercase();
        if lower.is_empty() {
            return true;
        }
        if self.ui_noise.iter().any(|token| *token == lower) {
            return true;
        }
        lower.chars().count() < self.containment_max_len
            && self.ui_noise.iter().any(|token| lower.contains(token.as_str()))
    }

    /// Structured metadata rather than a human-readable description: too
    /// short, no letters, or one of the price/quantity shapes.
    #[must_use]
    pub fn is_price_or_quantity_only(&self, text: &str) -> bool {
        text.trim().chars().count() < self.product_min_len || has_price_or_quantity_shape(text)
    }

    /// Cleans `raw` and returns it when it can serve as a menu item title.
    #[must_use]
    pub fn accept_title(&self, raw: &str) -> Option<String> {
        let text = clean(raw);
        let len = text.chars().count();
        (len >= self.title_len.0
            && len <= self.title_len.1
            && !self.is_ui_noise(&text)
            && !has_price_or_quantity_shape(&text))
        .then_some(text)
    }

    /// Cleans `raw` and returns it when it can serve as a menu item description.
    #[must_use]
    pub fn accept_description(&self, raw: &str) -> Option<String> {
        let text = clean(raw);
        let len = text.chars().count();
        (len >= self.description_len.0
            && len <= self.description_len.1
            && !self.is_ui_noise(&text)
            && !self.is_price_or_quantity_only(&text))
        .then_some(text)
    }

    /// Cleans `raw` and returns it when it can stand alone as a store product.
    #[must_use]
    pub fn accept_product(&self, raw: &str) -> Option<String> {
        let text = clean(raw);
        let len = text.chars().count();
        (len <= self.description_len.1
            && !self.is_ui_noise(&text)
            && !self.is_price_or_quantity_only(&text))
        .then_some(text)
    }

    /// Like [`accept_product`](Self::accept_product) but within the narrower
    /// band used when scanning whole-page text line by line.
    #[must_use]
    pub fn accept_product_line(&self, raw: &str) -> Option<String> {
        self.accept_product(raw)
            .filter(|text| text.chars().count() <= self.product_max_len)
    }

    #[must_use]
    pub fn title_max_len(&self) -> usize {
        self.title_len.1
    }
}

impl Default for TextRules {
    fn default() -> Self {
        Self::new(&ExtractionTuning::default())
    }
}

#[cfg(test)]
#[path = "text_test.rs"]
mod tests;
