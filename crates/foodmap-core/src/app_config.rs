use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Directory holding `restaurants_{postal}.json` and `stores_{postal}.json`.
    pub output_dir: PathBuf,
    /// Optional YAML file overriding selectors, keyword lists and thresholds.
    pub tuning_path: Option<PathBuf>,
    /// Marketplace entry page where the postal-code search starts.
    pub base_url: String,
    pub chrome_path: Option<PathBuf>,
    pub page_load_timeout_secs: u64,
    /// Bounded wait for the background item extraction of one establishment.
    pub item_extraction_timeout_secs: u64,
    pub max_listing_pages: usize,
    pub search_max_retries: u32,
    pub retry_backoff_base_ms: u64,
    /// How long finished jobs stay queryable through the job API.
    pub job_retention_secs: u64,
}

impl AppConfig {
    #[must_use]
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    #[must_use]
    pub fn item_extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.item_extraction_timeout_secs)
    }
}
