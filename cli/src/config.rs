//! Configuration file management
//!
//! Settings live in `~/.cloudsite/config.toml`; command-line flags override
//! whatever the file says.
//!
//! # Configuration Format
//!
//! ```toml
//! [site]
//! url = "https://api.example.com"
//! customer_id = "0f4b1c52-2d3e-4a5b-9c6d-7e8f9a0b1c2d"
//! site_id = "1a2b3c4d-5e6f-4a7b-8c9d-0e1f2a3b4c5d"
//! timeout = 30                # request timeout in seconds, 0 = none
//!
//! [auth]
//! api_key = "site-secret"
//! email = "ann@example.com"   # used by LOGIN
//! password = "..."
//!
//! [ui]
//! format = "table"            # table, json, csv
//! color = true
//! truncate = true             # shorten wide cells in table output
//!
//! [pool]
//! max_workers = 4
//! ```

use cloudsite_link::LinkTimeouts;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CLIError, Result};

const DEFAULT_CONFIG_PATH: &str = "~/.cloudsite/config.toml";

/// CLI configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CLIConfiguration {
    /// Site connection settings
    pub site: Option<SiteConfig>,

    /// Credentials
    pub auth: Option<AuthConfig>,

    /// UI preferences
    pub ui: Option<UIConfig>,

    /// Async execution pool
    pub pool: Option<PoolConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Service base URL (e.g., https://api.example.com)
    pub url: Option<String>,

    pub customer_id: Option<String>,

    pub site_id: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Site api key sent with every statement
    pub api_key: Option<String>,

    /// Account used by LOGIN
    pub email: Option<String>,

    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UIConfig {
    /// Output format: table, json, csv
    #[serde(default = "default_format")]
    pub format: String,

    /// Enable colored output
    #[serde(default = "default_color")]
    pub color: bool,

    /// Truncate wide values in table output
    #[serde(default = "default_truncate")]
    pub truncate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

fn default_timeout() -> u64 {
    30
}

fn default_format() -> String {
    "table".to_string()
}

fn default_color() -> bool {
    true
}

fn default_truncate() -> bool {
    true
}

fn default_max_workers() -> usize {
    4
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: None,
            customer_id: None,
            site_id: None,
            timeout: default_timeout(),
        }
    }
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            color: default_color(),
            truncate: default_truncate(),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
        }
    }
}

pub fn expand_config_path(path: &Path) -> PathBuf {
    let path_str = path.to_str().unwrap_or(DEFAULT_CONFIG_PATH);
    if let Some(rest) = path_str.strip_prefix("~/") {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(rest);
        }
    }
    path.to_path_buf()
}

pub fn default_config_path() -> PathBuf {
    expand_config_path(Path::new(DEFAULT_CONFIG_PATH))
}

impl CLIConfiguration {
    /// Load configuration from file
    ///
    /// Returns default configuration if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        let expanded_path = expand_config_path(path);
        let path = &expanded_path;

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            CLIError::ConfigurationError(format!("Failed to read config file: {}", e))
        })?;

        let config: CLIConfiguration = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let expanded_path = expand_config_path(path);
        let path = &expanded_path;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CLIError::ConfigurationError(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Request timeout taken from `site.timeout`; the other limits keep
    /// their library defaults.
    pub fn to_timeouts(&self) -> LinkTimeouts {
        let site = self.resolved_site();
        LinkTimeouts::builder()
            .request_timeout(Duration::from_secs(site.timeout))
            .build()
    }

    pub fn resolved_site(&self) -> SiteConfig {
        self.site.clone().unwrap_or_default()
    }

    pub fn resolved_auth(&self) -> AuthConfig {
        self.auth.clone().unwrap_or_default()
    }

    pub fn resolved_ui(&self) -> UIConfig {
        self.ui.clone().unwrap_or_default()
    }

    pub fn resolved_pool(&self) -> PoolConfig {
        self.pool.clone().unwrap_or_default()
    }
}
