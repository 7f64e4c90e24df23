// src/config.rs
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{InspectError, Result};
use crate::presenter::DisplayLimits;
use crate::transfer::DEFAULT_TIMEOUT;
use crate::validator::{DEFAULT_MAX_FILE_SIZE, MAX_CONFIGURABLE_FILE_SIZE};

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:5000";
pub const DEFAULT_ENDPOINT: &str = "/api/analyze";
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

const MIB: u64 = 1024 * 1024;

/// High-level application configuration.
///
/// Built from defaults, then an optional TOML file, then `INSPECTOR_*`
/// environment variables, each layer overriding the previous one.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_base: String,
    pub endpoint_path: String,
    /// Largest accepted upload in bytes. Never above [`MAX_CONFIGURABLE_FILE_SIZE`].
    pub max_file_size: u64,
    pub timeout: Duration,
    /// Address for the local `serve` workbench.
    pub bind: String,
    pub display: DisplayLimits,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            endpoint_path: DEFAULT_ENDPOINT.to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            timeout: DEFAULT_TIMEOUT,
            bind: DEFAULT_BIND.to_string(),
            display: DisplayLimits::default(),
        }
    }
}

/// On-disk shape of `config.toml`. Every key is optional.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    api_base: Option<String>,
    endpoint: Option<String>,
    max_file_mb: Option<u64>,
    timeout_secs: Option<u64>,
    bind: Option<String>,
    display: Option<DisplayLimits>,
}

impl AppConfig {
    /// Load configuration from the config file (if any) and the environment.
    pub fn load() -> Result<Self> {
        let lookup = |key: &str| std::env::var(key).ok();
        let mut config = Self::default();

        if let Some(path) = config_path(&lookup) {
            if path.exists() {
                log::info!("📄 Loading config from {}", path.display());
                config.apply_file(&path)?;
            } else if lookup("INSPECTOR_CONFIG").is_some() {
                return Err(InspectError::Config(format!(
                    "Config file {} does not exist",
                    path.display()
                )));
            }
        }

        config.apply_env(lookup)?;
        Ok(config)
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from defaults plus whatever `lookup` returns for each
    /// `INSPECTOR_*` key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(lookup)?;
        Ok(config)
    }

    /// Reads a TOML config file on top of the defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        config.apply_file(path.as_ref())?;
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        let file: FileConfig = toml::from_str(&content)?;

        if let Some(api_base) = file.api_base {
            self.set_api_base(api_base)?;
        }
        if let Some(endpoint) = file.endpoint {
            self.endpoint_path = endpoint;
        }
        if let Some(mb) = file.max_file_mb {
            self.set_max_file_size(mb)?;
        }
        if let Some(secs) = file.timeout_secs {
            self.set_timeout(secs)?;
        }
        if let Some(bind) = file.bind {
            self.bind = bind;
        }
        if let Some(display) = file.display {
            self.display = display;
        }
        Ok(())
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(api_base) = lookup("INSPECTOR_API_BASE") {
            self.set_api_base(api_base)?;
        }
        if let Some(endpoint) = lookup("INSPECTOR_ENDPOINT") {
            self.endpoint_path = endpoint;
        }
        if let Some(raw) = lookup("INSPECTOR_MAX_FILE_MB") {
            self.set_max_file_size(parse_number("INSPECTOR_MAX_FILE_MB", &raw)?)?;
        }
        if let Some(raw) = lookup("INSPECTOR_TIMEOUT_SECS") {
            self.set_timeout(parse_number("INSPECTOR_TIMEOUT_SECS", &raw)?)?;
        }
        if let Some(bind) = lookup("INSPECTOR_BIND") {
            self.bind = bind;
        }
        Ok(())
    }

    fn set_api_base(&mut self, api_base: String) -> Result<()> {
        reqwest::Url::parse(&api_base).map_err(|e| {
            InspectError::Config(format!("Invalid API base URL '{}': {}", api_base, e))
        })?;
        self.api_base = api_base;
        Ok(())
    }

    fn set_max_file_size(&mut self, mb: u64) -> Result<()> {
        if mb == 0 {
            return Err(InspectError::Config(
                "Maximum file size must be at least 1 MB".to_string(),
            ));
        }
        let requested = mb.saturating_mul(MIB);
        if requested > MAX_CONFIGURABLE_FILE_SIZE {
            log::warn!(
                "⚠️  Maximum file size {} MB is too close to the transport limit, using {} MB",
                mb,
                MAX_CONFIGURABLE_FILE_SIZE / MIB
            );
            self.max_file_size = MAX_CONFIGURABLE_FILE_SIZE;
        } else {
            self.max_file_size = requested;
        }
        Ok(())
    }

    fn set_timeout(&mut self, secs: u64) -> Result<()> {
        if secs == 0 {
            return Err(InspectError::Config(
                "Timeout must be at least one second".to_string(),
            ));
        }
        self.timeout = Duration::from_secs(secs);
        Ok(())
    }
}

fn parse_number(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| InspectError::Config(format!("{} must be a whole number, got '{}'", key, raw)))
}

/// `INSPECTOR_CONFIG`, or `<config dir>/inspector/config.toml`.
fn config_path(lookup: &impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    lookup("INSPECTOR_CONFIG")
        .map(PathBuf::from)
        .or_else(|| dirs::config_dir().map(|dir| dir.join("inspector").join("config.toml")))
}
