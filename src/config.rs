/// Service configuration.
///
/// Read from a TOML file with `[renderer]`, `[store]` and `[logging]`
/// sections, every key optional. `.env` is loaded first, and the
/// `DATABASE_URL` and `AQHI_URL` environment variables override the file.
///
/// ```toml
/// [renderer]
/// kind = "browser"
/// browser_path = "/usr/bin/chromium"
///
/// [store]
/// table = "aqhi.observations"
/// write_mode = "upsert"
///
/// [logging]
/// level = "info"
/// file = "/var/log/aqhi_service.log"
/// ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::ingest::RendererConfig;
use crate::logging::LogLevel;
use crate::store::StoreConfig;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: None,
            timestamps: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub renderer: RendererConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The config file could not be read.
    Io(String),
    /// The config file is not valid TOML for `AppConfig`.
    Parse(String),
    /// A value was read but cannot be used.
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Config unreadable: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Config parse error: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Config invalid: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Parse TOML text without consulting the environment.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.store.database_url = Some(url);
        }
        if let Some(url) = lookup("AQHI_URL") {
            self.renderer.url = url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_table_identifier(&self.store.table) {
            return Err(ConfigError::Invalid(format!(
                "store.table '{}' is not a plain [schema.]table identifier",
                self.store.table
            )));
        }
        if self.renderer.url.trim().is_empty() {
            return Err(ConfigError::Invalid("renderer.url is empty".to_string()));
        }
        Ok(())
    }
}

/// Load configuration: `.env`, then the optional TOML file, then
/// environment overrides.
pub fn load(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    dotenv::dotenv().ok();

    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
            AppConfig::from_toml_str(&text)?
        }
        None => AppConfig::default(),
    };

    config.apply_overrides(|name| std::env::var(name).ok());
    config.validate()?;
    Ok(config)
}

/// Table names are interpolated into SQL, so only `name` or `schema.name`
/// made of ASCII letters, digits and underscores is accepted.
fn is_table_identifier(table: &str) -> bool {
    let part_ok = |part: &str| {
        !part.is_empty()
            && !part.starts_with(|c: char| c.is_ascii_digit())
            && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    };
    let parts: Vec<&str> = table.split('.').collect();
    parts.len() <= 2 && parts.iter().all(|p| part_ok(p))
}
