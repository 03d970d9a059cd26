use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional_path = |var: &str| -> Option<PathBuf> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let env = parse_environment(&or_default("FOODMAP_ENV", "development"))?;

    let bind_addr = parse_addr("FOODMAP_BIND_ADDR", "0.0.0.0:5000")?;
    let log_level = or_default("FOODMAP_LOG_LEVEL", "info");
    let output_dir = PathBuf::from(or_default("FOODMAP_OUTPUT_DIR", "."));
    let tuning_path = optional_path("FOODMAP_TUNING_PATH");
    let base_url = or_default("FOODMAP_BASE_URL", "https://www.ubereats.com/fr/feed");
    let chrome_path = optional_path("FOODMAP_CHROME_PATH");

    let page_load_timeout_secs = parse_u64("FOODMAP_PAGE_LOAD_TIMEOUT_SECS", "20")?;
    let item_extraction_timeout_secs = parse_u64("FOODMAP_ITEM_EXTRACTION_TIMEOUT_SECS", "30")?;
    let max_listing_pages = parse_usize("FOODMAP_MAX_LISTING_PAGES", "50")?;
    let search_max_retries = parse_u32("FOODMAP_SEARCH_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_u64("FOODMAP_RETRY_BACKOFF_BASE_MS", "500")?;
    let job_retention_secs = parse_u64("FOODMAP_JOB_RETENTION_SECS", "3600")?;

    if max_listing_pages == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "FOODMAP_MAX_LISTING_PAGES".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    if item_extraction_timeout_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "FOODMAP_ITEM_EXTRACTION_TIMEOUT_SECS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        output_dir,
        tuning_path,
        base_url,
        chrome_path,
        page_load_timeout_secs,
        item_extraction_timeout_secs,
        max_listing_pages,
        search_max_retries,
        retry_backoff_base_ms,
        job_retention_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "FOODMAP_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
