pub mod browser;
pub mod classify;
pub mod cleaner;
pub mod contact;
pub mod error;
pub mod extract;
pub mod ledger;
pub mod names;
pub mod process;
mod retry;
pub mod run;
pub mod search;
pub mod snapshot;
pub mod text;
pub mod traverse;

pub use browser::chromium::{ChromiumSession, LaunchOptions};
pub use browser::{BrowserSession, Locator};
pub use classify::{recategorize, Classification, EstablishmentClassifier};
pub use cleaner::{clean_postal, clean_records, CleanSummary};
pub use error::{BrowserError, ScrapeError};
pub use extract::{ExtractionCascade, ItemShape};
pub use ledger::DedupLedger;
pub use names::NameNormalizer;
pub use process::EstablishmentProcessor;
pub use run::Scraper;
pub use search::{perform_search, search_postal_code, SearchOutcome};
pub use snapshot::PageSnapshot;
pub use text::TextRules;
pub use traverse::{ListingTraversal, StopSignal, TraversalOutcome};
