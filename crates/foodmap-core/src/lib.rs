pub mod app_config;
pub mod config;
pub mod establishments;
pub mod runs;
pub mod tuning;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use establishments::{
    Catalog, CatalogItem, ContactInfo, EstablishmentKind, EstablishmentRecord, MenuItem,
    StoreProduct, NOT_AVAILABLE,
};
pub use runs::{
    elapsed_since, validate_postal_code, RunConfig, RunProgress, RunReport, SearchReport,
};
pub use tuning::{
    load_tuning, ClassifierTuning, ExtractionTuning, NameTuning, ScrapeTuning, SelectorTuning,
    TimingTuning,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read tuning file {path}: {source}")]
    TuningFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse tuning file: {0}")]
    TuningFileParse(#[source] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid establishment record {url}: {reason}")]
    InvalidRecord { url: String, reason: String },

    #[error("invalid run configuration: {0}")]
    InvalidRunConfig(String),
}
