//! Configuration types for GrantDesk components.
//!
//! Runtime settings come from the environment (see the server and CLI
//! crates). Settings that describe local tooling rather than deployment,
//! such as the summary template and the office converter, may also live in
//! an optional `grantdesk.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::AppError;

/// Database connection pool configuration.
pub struct DbConfig {
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
        }
    }
}

/// HTTP client configuration for the bibliographic APIs.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

/// Publication import configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Number of concurrent upserts per user.
    #[serde(default = "default_import_concurrency")]
    pub concurrency: usize,
}

fn default_import_concurrency() -> usize {
    4
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            concurrency: default_import_concurrency(),
        }
    }
}

impl ImportConfig {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// Summary document generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// DOCX template containing `{{placeholder}}` fields.
    pub template_path: PathBuf,

    /// LibreOffice binary used for the PDF conversion.
    #[serde(default = "default_soffice_bin")]
    pub soffice_bin: String,

    /// Upper bound for a single conversion, in seconds.
    #[serde(default = "default_summary_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_soffice_bin() -> String {
    "soffice".to_string()
}

fn default_summary_timeout_secs() -> u64 {
    60
}

impl SummaryConfig {
    pub fn new(template_path: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
            soffice_bin: default_soffice_bin(),
            timeout_secs: default_summary_timeout_secs(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// grantdesk.toml
// =============================================================================

/// Root structure of `grantdesk.toml`.
///
/// ```toml
/// [summary]
/// template_path = "/srv/grantdesk/templates/summary.docx"
/// soffice_bin = "/usr/bin/soffice"
/// timeout_secs = 90
///
/// [import]
/// concurrency = 8
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    pub summary: Option<SummaryConfig>,
    #[serde(default)]
    pub import: ImportConfig,
}

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "grantdesk.toml";

/// Returns the default configuration directory: `~/.config/grantdesk/`.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("grantdesk"))
}

/// Returns the default configuration file path.
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join(CONFIG_FILE_NAME))
}

/// Loads `grantdesk.toml`.
///
/// * `Ok(Some(config))` - file found and parsed
/// * `Ok(None)` - no path given and no file at the default location
/// * `Err(_)` - an explicit path is missing, or the file is invalid
pub fn load_file_config(path: Option<PathBuf>) -> Result<Option<FileConfig>, AppError> {
    let explicit = path.is_some();
    let config_path = match path.or_else(default_config_path) {
        Some(p) => p,
        None => return Ok(None),
    };

    if !config_path.exists() {
        if explicit {
            return Err(AppError::ConfigError(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }
        tracing::debug!("No config file at {}", config_path.display());
        return Ok(None);
    }

    read_config(&config_path).map(Some)
}

fn read_config(path: &Path) -> Result<FileConfig, AppError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AppError::ConfigError(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    toml::from_str(&content).map_err(|e| {
        AppError::ConfigError(format!("Invalid TOML in '{}': {}", path.display(), e))
    })
}
