//! Configuration loading and resolution
//!
//! Every setting is resolved field by field in this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`DECKSTAT_*`)
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing TOML file is never fatal: a warning is logged and the
//! remaining tiers apply. A TOML file that exists but cannot be parsed is a
//! configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_API_BASE_URL: &str = "https://arkhamdb.com/api/public";
pub const DEFAULT_WORKER_COUNT: usize = 4;
pub const DEFAULT_RELEVANCE_THRESHOLD: f64 = 0.10;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const ENV_API_BASE_URL: &str = "DECKSTAT_API_BASE_URL";
const ENV_STORE_ROOT: &str = "DECKSTAT_STORE_ROOT";
const ENV_OUTPUT_DIR: &str = "DECKSTAT_OUTPUT_DIR";
const ENV_WORKERS: &str = "DECKSTAT_WORKERS";
const ENV_RELEVANCE: &str = "DECKSTAT_RELEVANCE";
const ENV_FIRST_DECK_ID: &str = "DECKSTAT_FIRST_DECK_ID";
const ENV_LAST_DECK_ID: &str = "DECKSTAT_LAST_DECK_ID";
const ENV_MAX_ATTEMPTS: &str = "DECKSTAT_MAX_ATTEMPTS";
const ENV_RETRY_DELAY_MS: &str = "DECKSTAT_RETRY_DELAY_MS";
const ENV_BACKOFF: &str = "DECKSTAT_BACKOFF";
const ENV_REQUEST_INTERVAL_MS: &str = "DECKSTAT_REQUEST_INTERVAL_MS";
const ENV_REQUEST_TIMEOUT_SECS: &str = "DECKSTAT_REQUEST_TIMEOUT_SECS";
const ENV_WRITE_REPORTS: &str = "DECKSTAT_WRITE_REPORTS";
/// Read by the binary before the config is resolved, to seed the log filter
pub const ENV_LOG_LEVEL: &str = "DECKSTAT_LOG_LEVEL";

/// Logging section of the TOML file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing level when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// How the delay between fetch attempts grows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Same delay after every failed attempt
    Fixed,
    /// Delay grows by the base delay after every failed attempt
    #[default]
    Incremental,
}

impl std::str::FromStr for BackoffKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(BackoffKind::Fixed),
            "incremental" => Ok(BackoffKind::Incremental),
            other => Err(format!("unknown backoff '{}' (expected fixed or incremental)", other)),
        }
    }
}

/// Retry section of the TOML file (all fields optional)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryToml {
    pub max_attempts: Option<u32>,
    pub delay_ms: Option<u64>,
    pub backoff: Option<BackoffKind>,
}

/// On-disk TOML configuration
///
/// Every field is optional so partial files are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    pub api_base_url: Option<String>,
    pub store_root: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub worker_count: Option<usize>,
    /// First deck id of the range to process (inclusive)
    pub first_deck_id: Option<u64>,
    /// Last deck id of the range to process (inclusive)
    pub last_deck_id: Option<u64>,
    pub relevance_threshold: Option<f64>,
    pub request_interval_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub write_reports: Option<bool>,
    #[serde(default)]
    pub retry: RetryToml,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }
}

/// Where the deck ids to process come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdSource {
    /// Inclusive id range queried against the remote catalog
    Range { first: u64, last: u64 },
    /// Every decklist already present in the durable store
    LocalStore,
}

/// Resolved retry settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub delay_ms: u64,
    pub backoff: BackoffKind,
}

/// OS-dependent compiled defaults
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub api_base_url: String,
    pub store_root: PathBuf,
    pub output_dir: PathBuf,
    pub worker_count: usize,
    pub relevance_threshold: f64,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let store_root = dirs::data_local_dir()
            .map(|d| d.join("deckstat").join("db"))
            .unwrap_or_else(|| PathBuf::from("./deckstat_data/db"));

        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            store_root,
            output_dir: PathBuf::from("./deckstat-output"),
            worker_count: DEFAULT_WORKER_COUNT,
            relevance_threshold: DEFAULT_RELEVANCE_THRESHOLD,
            log_level: default_log_level(),
        }
    }
}

/// Values supplied on the command line
///
/// `None` means "not given"; lower tiers then apply.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_base_url: Option<String>,
    pub store_root: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub worker_count: Option<usize>,
    pub first_deck_id: Option<u64>,
    pub last_deck_id: Option<u64>,
    /// Force `IdSource::LocalStore` even if a range is configured
    pub from_store: bool,
    pub relevance_threshold: Option<f64>,
    pub max_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub backoff: Option<BackoffKind>,
    pub request_interval_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub write_reports: Option<bool>,
    pub log_level: Option<String>,
}

/// Fully resolved pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub api_base_url: String,
    pub store_root: PathBuf,
    pub output_dir: PathBuf,
    pub worker_count: usize,
    pub id_source: IdSource,
    pub relevance_threshold: f64,
    pub retry: RetrySettings,
    /// Minimum spacing between remote requests (0 disables spacing)
    pub request_interval_ms: u64,
    pub request_timeout_secs: u64,
    pub write_reports: bool,
    pub log_level: String,
}

impl PipelineConfig {
    /// Configuration built purely from compiled defaults
    pub fn with_defaults(store_root: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        let defaults = CompiledDefaults::for_current_platform();
        Self {
            api_base_url: defaults.api_base_url,
            store_root: store_root.into(),
            output_dir: output_dir.into(),
            worker_count: defaults.worker_count,
            id_source: IdSource::LocalStore,
            relevance_threshold: defaults.relevance_threshold,
            retry: RetrySettings {
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                delay_ms: DEFAULT_RETRY_DELAY_MS,
                backoff: BackoffKind::Incremental,
            },
            request_interval_ms: 0,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            write_reports: true,
            log_level: defaults.log_level,
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(Error::Config("api_base_url must not be empty".to_string()));
        }
        if self.worker_count == 0 {
            return Err(Error::Config("worker_count must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.relevance_threshold) {
            return Err(Error::Config(format!(
                "relevance_threshold must be within [0, 1], got {}",
                self.relevance_threshold
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".to_string()));
        }
        if let IdSource::Range { first, last } = self.id_source {
            if first > last {
                return Err(Error::Config(format!(
                    "deck id range is empty: first {} > last {}",
                    first, last
                )));
            }
        }
        Ok(())
    }

    /// Directory holding the static duplicates table
    pub fn duplicates_path(&self) -> PathBuf {
        self.store_root.join("all").join("duplicates.json")
    }
}

/// Resolves a `PipelineConfig` from CLI, environment, TOML and defaults
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    config_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Resolver using an explicit TOML path, or the platform search path when `None`
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self { config_path }
    }

    /// Locate and parse the TOML file
    ///
    /// An explicit path that does not exist is an error; a missing file on
    /// the search path only produces a warning and an empty config.
    pub fn load_toml(&self) -> Result<TomlConfig> {
        if let Some(path) = &self.config_path {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return TomlConfig::from_file(path);
        }

        match default_config_file() {
            Some(path) => {
                debug!("Loading config from {}", path.display());
                TomlConfig::from_file(&path)
            }
            None => {
                warn!("No config file found, using defaults");
                Ok(TomlConfig::default())
            }
        }
    }

    /// Resolve every field through the four tiers
    pub fn resolve(&self, cli: &ConfigOverrides) -> Result<PipelineConfig> {
        let file = self.load_toml()?;
        let defaults = CompiledDefaults::for_current_platform();

        let api_base_url = cli
            .api_base_url
            .clone()
            .or(env_string(ENV_API_BASE_URL))
            .or(file.api_base_url.clone())
            .unwrap_or(defaults.api_base_url);

        let store_root = cli
            .store_root
            .clone()
            .or(env_string(ENV_STORE_ROOT).map(PathBuf::from))
            .or(file.store_root.clone())
            .unwrap_or(defaults.store_root);

        let output_dir = cli
            .output_dir
            .clone()
            .or(env_string(ENV_OUTPUT_DIR).map(PathBuf::from))
            .or(file.output_dir.clone())
            .unwrap_or(defaults.output_dir);

        let worker_count = match cli.worker_count {
            Some(n) => n,
            None => env_parsed::<usize>(ENV_WORKERS)?
                .or(file.worker_count)
                .unwrap_or(defaults.worker_count),
        };

        let relevance_threshold = match cli.relevance_threshold {
            Some(r) => r,
            None => env_parsed::<f64>(ENV_RELEVANCE)?
                .or(file.relevance_threshold)
                .unwrap_or(defaults.relevance_threshold),
        };

        let log_level = cli
            .log_level
            .clone()
            .or(env_string(ENV_LOG_LEVEL))
            .unwrap_or(file.logging.level.clone());

        let first = match cli.first_deck_id {
            Some(id) => Some(id),
            None => env_parsed::<u64>(ENV_FIRST_DECK_ID)?.or(file.first_deck_id),
        };
        let last = match cli.last_deck_id {
            Some(id) => Some(id),
            None => env_parsed::<u64>(ENV_LAST_DECK_ID)?.or(file.last_deck_id),
        };
        let id_source = if cli.from_store {
            IdSource::LocalStore
        } else {
            match (first, last) {
                (Some(first), Some(last)) => IdSource::Range { first, last },
                (None, None) => IdSource::LocalStore,
                _ => {
                    return Err(Error::Config(
                        "first_deck_id and last_deck_id must be given together".to_string(),
                    ))
                }
            }
        };

        let retry = RetrySettings {
            max_attempts: match cli.max_attempts {
                Some(n) => n,
                None => env_parsed::<u32>(ENV_MAX_ATTEMPTS)?
                    .or(file.retry.max_attempts)
                    .unwrap_or(DEFAULT_MAX_ATTEMPTS),
            },
            delay_ms: match cli.retry_delay_ms {
                Some(ms) => ms,
                None => env_parsed::<u64>(ENV_RETRY_DELAY_MS)?
                    .or(file.retry.delay_ms)
                    .unwrap_or(DEFAULT_RETRY_DELAY_MS),
            },
            backoff: match cli.backoff {
                Some(kind) => kind,
                None => env_parsed::<BackoffKind>(ENV_BACKOFF)?
                    .or(file.retry.backoff)
                    .unwrap_or_default(),
            },
        };

        let request_interval_ms = match cli.request_interval_ms {
            Some(ms) => ms,
            None => env_parsed::<u64>(ENV_REQUEST_INTERVAL_MS)?
                .or(file.request_interval_ms)
                .unwrap_or(0),
        };

        let request_timeout_secs = match cli.request_timeout_secs {
            Some(secs) => secs,
            None => env_parsed::<u64>(ENV_REQUEST_TIMEOUT_SECS)?
                .or(file.request_timeout_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        let write_reports = match cli.write_reports {
            Some(write) => write,
            None => env_parsed::<bool>(ENV_WRITE_REPORTS)?
                .or(file.write_reports)
                .unwrap_or(true),
        };

        let config = PipelineConfig {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            store_root,
            output_dir,
            worker_count,
            id_source,
            relevance_threshold,
            retry,
            request_interval_ms,
            request_timeout_secs,
            write_reports,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }
}

/// Platform config file search path
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("deckstat").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/deckstat/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env_string(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} has an invalid value: {}", name, raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = PipelineConfig::with_defaults("/tmp/store", "/tmp/out");
        assert!(config.validate().is_ok());
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = PipelineConfig::with_defaults("/tmp/store", "/tmp/out");
        config.worker_count = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let mut config = PipelineConfig::with_defaults("/tmp/store", "/tmp/out");
        config.id_source = IdSource::Range { first: 10, last: 2 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_relevance_out_of_bounds() {
        let mut config = PipelineConfig::with_defaults("/tmp/store", "/tmp/out");
        config.relevance_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_parses() {
        let config: TomlConfig = toml::from_str(
            r#"
            worker_count = 8

            [retry]
            backoff = "fixed"
            "#,
        )
        .unwrap();

        assert_eq!(config.worker_count, Some(8));
        assert_eq!(config.retry.backoff, Some(BackoffKind::Fixed));
        assert_eq!(config.logging.level, "info");
        assert!(config.api_base_url.is_none());
    }

    #[test]
    fn test_backoff_kind_from_str() {
        assert_eq!("fixed".parse::<BackoffKind>(), Ok(BackoffKind::Fixed));
        assert_eq!(" Incremental ".parse::<BackoffKind>(), Ok(BackoffKind::Incremental));
        assert!("exponential".parse::<BackoffKind>().is_err());
    }
}
