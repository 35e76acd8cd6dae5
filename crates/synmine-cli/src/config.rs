//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use synmine_core::{DEFAULT_CONTEXT_SIZE, HttpConfig};
use synmine_pmc::ScanConfig;
use synmine_pmc::config::{DEFAULT_BASE_URL, DEFAULT_BATCH_SIZE};
use synmine_pmc::tracking::DEFAULT_TRACKING_FILE;

/// Global configuration for synmine
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub scan: ScanSection,
    pub http: HttpSection,
    pub tracking: TrackingConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Cumulative corpus CSV; batches are written beside it
    pub results: PathBuf,
    /// Context characters for local document mining
    pub context_size: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results: PathBuf::from("results.csv"),
            context_size: DEFAULT_CONTEXT_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanSection {
    pub workers: usize,
    pub batch_size: usize,
    pub chunk_size_mb: usize,
}

impl Default for ScanSection {
    fn default() -> Self {
        let defaults = ScanConfig::default();
        Self {
            workers: defaults.workers,
            batch_size: DEFAULT_BATCH_SIZE,
            chunk_size_mb: defaults.chunk_size / (1024 * 1024),
        }
    }
}

impl ScanSection {
    pub fn to_scan_config(&self, workers: Option<usize>) -> ScanConfig {
        ScanConfig {
            workers: workers.unwrap_or(self.workers).max(1),
            batch_size: self.batch_size.max(1),
            chunk_size: self.chunk_size_mb.max(1) * 1024 * 1024,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub base_url: String,
    /// Seconds
    pub connect_timeout: u64,
    /// Seconds without body data before a download counts as stalled
    pub read_timeout: u64,
    /// Seconds for small requests such as the listing
    pub request_timeout: u64,
    pub max_retries: u32,
    /// Seconds between attempts
    pub retry_delay: u64,
    pub user_agent: Option<String>,
}

impl Default for HttpSection {
    fn default() -> Self {
        let defaults = HttpConfig::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: defaults.connect_timeout.as_secs(),
            read_timeout: defaults.read_timeout.as_secs(),
            request_timeout: defaults.request_timeout.as_secs(),
            max_retries: defaults.max_attempts,
            retry_delay: defaults.retry_delay.as_secs(),
            user_agent: None,
        }
    }
}

impl HttpSection {
    pub fn to_http_config(&self, read_timeout: Option<u64>, max_retries: Option<u32>) -> HttpConfig {
        let defaults = HttpConfig::default();
        HttpConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout),
            read_timeout: Duration::from_secs(read_timeout.unwrap_or(self.read_timeout)),
            request_timeout: Duration::from_secs(self.request_timeout),
            max_attempts: max_retries.unwrap_or(self.max_retries).max(1),
            retry_delay: Duration::from_secs(self.retry_delay),
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub file: PathBuf,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_TRACKING_FILE),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Store root; uploads are disabled when unset
    #[serde(deserialize_with = "deserialize_env_var")]
    pub dir: Option<String>,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub folder: Option<String>,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub table: Option<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: std::env::var("SYNMINE_UPLOAD_DIR").ok(),
            folder: None,
            table: None,
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./synmine.toml (current directory)
    /// 2. ~/.config/synmine/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("synmine.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "synmine") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
