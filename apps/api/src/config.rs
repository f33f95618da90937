use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, ensure, Context, Result};

use crate::catalog::CatalogSource;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    /// Directory of partitioned `<Department>.json` files.
    pub departments_dir: PathBuf,
    /// `CATALOG_SOURCE` (`builtin`, `file` or `corpus`). Defaults to `file` when
    /// `CATALOG_PATH` is set, `builtin` otherwise.
    pub catalog_source: CatalogSource,
    pub port: u16,
    pub rust_log: String,
    pub llm_timeout: Duration,
    pub llm_max_attempts: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let llm_max_attempts = parse_or(&lookup, "LLM_MAX_ATTEMPTS", 3)
            .context("LLM_MAX_ATTEMPTS must be a positive integer")?;
        ensure!(
            llm_max_attempts >= 1,
            "LLM_MAX_ATTEMPTS must be a positive integer, got 0"
        );

        Ok(Config {
            anthropic_api_key: lookup("ANTHROPIC_API_KEY")
                .context("Required environment variable 'ANTHROPIC_API_KEY' is not set")?,
            departments_dir: lookup("DEPARTMENTS_DIR")
                .unwrap_or_else(|| "departments".to_string())
                .into(),
            catalog_source: catalog_source(&lookup)?,
            port: parse_or(&lookup, "PORT", 8080).context("PORT must be a valid port number")?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            llm_timeout: Duration::from_secs(
                parse_or(&lookup, "LLM_TIMEOUT_SECS", 120)
                    .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            llm_max_attempts,
        })
    }
}

fn catalog_source(lookup: &impl Fn(&str) -> Option<String>) -> Result<CatalogSource> {
    let path = lookup("CATALOG_PATH")
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);
    let source = lookup("CATALOG_SOURCE").map(|s| s.trim().to_lowercase());

    match (source.as_deref(), path) {
        (None | Some("") | Some("file"), Some(path)) => Ok(CatalogSource::File(path)),
        (None | Some("") | Some("builtin"), _) => Ok(CatalogSource::Builtin),
        (Some("corpus"), _) => Ok(CatalogSource::Corpus),
        (Some("file"), None) => bail!("CATALOG_SOURCE=file requires CATALOG_PATH"),
        (Some(other), _) => {
            bail!("CATALOG_SOURCE must be one of builtin, file or corpus, got '{other}'")
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => Ok(raw.trim().parse::<T>()?),
        None => Ok(default),
    }
}
