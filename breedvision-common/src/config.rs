//! Bootstrap configuration loading and root folder resolution
//!
//! Configuration is a single TOML file. Every field has a compiled default,
//! so a missing or partial file never prevents startup.
//!
//! # Root folder priority
//!
//! 1. Command-line argument (highest priority)
//! 2. `BREEDVISION_ROOT_FOLDER` environment variable
//! 3. `root_folder` in the TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::time::millis_to_duration;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "BREEDVISION_ROOT_FOLDER";

/// Environment variable overriding the config file location
pub const CONFIG_FILE_ENV: &str = "BREEDVISION_CONFIG";

/// File (inside the root folder) holding persisted user preferences
pub const PREFERENCES_FILE: &str = "preferences.toml";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Data folder for persisted preferences (optional)
    pub root_folder: Option<PathBuf>,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Locale selection defaults
    pub locale: LocaleConfig,

    /// Breed analysis collaborator settings
    pub analysis: AnalysisConfig,

    /// Identity provider settings
    pub auth: AuthConfig,

    /// Number of events buffered per subscriber before it lags
    pub event_capacity: usize,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            logging: LoggingConfig::default(),
            locale: LocaleConfig::default(),
            analysis: AnalysisConfig::default(),
            auth: AuthConfig::default(),
            event_capacity: 256,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocaleConfig {
    /// Locale used on first run and as the fallback bundle
    #[serde(rename = "default")]
    pub default_locale: String,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            default_locale: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Deadline for one inference call before the job fails with `Timeout`
    pub timeout_ms: u64,

    /// Latency of the built-in simulated inference service
    pub simulated_delay_ms: u64,

    /// HTTP inference endpoint; the simulated service is used when absent
    pub endpoint: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            simulated_delay_ms: 3_000,
            endpoint: None,
        }
    }
}

impl AnalysisConfig {
    pub fn timeout(&self) -> Duration {
        millis_to_duration(self.timeout_ms)
    }

    pub fn simulated_delay(&self) -> Duration {
        millis_to_duration(self.simulated_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Minimum password length checked before contacting the provider
    pub min_password_length: usize,

    /// Firebase Web API key; the in-memory provider is used when absent
    pub firebase_api_key: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            min_password_length: 6,
            firebase_api_key: None,
        }
    }
}

/// Parse a TOML config file
///
/// Unknown keys are ignored, missing keys take their compiled defaults.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Load the config file, degrading to compiled defaults on any failure
///
/// A missing file is logged at info level, an unreadable or invalid file
/// at warn level. Startup always proceeds.
pub fn load_or_default(path: Option<&Path>) -> TomlConfig {
    let resolved = path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from))
        .or_else(default_config_path);

    let Some(path) = resolved else {
        info!("No config file location available, using compiled defaults");
        return TomlConfig::default();
    };

    if !path.exists() {
        info!(path = %path.display(), "Config file not found, using compiled defaults");
        return TomlConfig::default();
    }

    match load_toml_config(&path) {
        Ok(config) => {
            info!(path = %path.display(), "Loaded config file");
            config
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Invalid config file, using compiled defaults");
            TomlConfig::default()
        }
    }
}

/// Write a config file, creating parent directories as needed
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

fn validate(config: &TomlConfig) -> Result<()> {
    if config.event_capacity == 0 {
        return Err(Error::Config("event_capacity must be at least 1".to_string()));
    }
    if config.analysis.timeout_ms == 0 {
        return Err(Error::Config("analysis.timeout_ms must be at least 1".to_string()));
    }
    if config.locale.default_locale.trim().is_empty() {
        return Err(Error::Config("locale.default must not be empty".to_string()));
    }
    Ok(())
}

/// Default config file path for the platform (`<config dir>/breedvision/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("breedvision").join("config.toml"))
}

/// Resolve the root folder following the documented priority order
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("breedvision"))
        .unwrap_or_else(|| PathBuf::from("./breedvision_data"))
}
