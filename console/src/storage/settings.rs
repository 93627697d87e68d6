//! Settings file management

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ConsoleError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Overrides `backend.base_url`
pub const API_URL_ENV: &str = "BUILDZY_API_URL";

/// Overrides `backend.log_service_url`
pub const LOG_SERVICE_URL_ENV: &str = "BUILDZY_LOG_SERVICE_URL";

/// Console settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(default)]
    pub backend: BackendSettings,

    #[serde(default)]
    pub polling: PollingSettings,

    #[serde(default)]
    pub product: ProductSettings,
}

impl Settings {
    /// Read the settings file. A missing file yields the defaults.
    pub async fn load(file: &File) -> Result<Self, ConsoleError> {
        match file.read_string_opt().await? {
            Some(contents) => Ok(serde_json::from_str(&contents)?),
            None => {
                debug!("No settings at {}, using defaults", file.path().display());
                Ok(Self::default())
            }
        }
    }

    /// Apply environment overrides. Blank values are ignored.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_blank(API_URL_ENV) {
            self.backend.base_url = url;
        }
        if let Some(url) = non_blank(LOG_SERVICE_URL_ENV) {
            self.backend.log_service_url = Some(url);
        }
        self
    }
}

/// Backend API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Separate origin for deployment logs; the API base when absent
    #[serde(default)]
    pub log_service_url: Option<String>,
}

fn default_backend_url() -> String {
    "https://api.wareality.tech".to_string()
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            log_service_url: None,
        }
    }
}

/// Poll cadence and tail size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingSettings {
    #[serde(default = "default_log_interval")]
    pub log_interval_secs: u64,

    #[serde(default = "default_status_interval")]
    pub status_interval_secs: u64,

    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
}

fn default_log_interval() -> u64 {
    3
}

fn default_status_interval() -> u64 {
    5
}

fn default_buffer_capacity() -> usize {
    crate::tail::buffer::DEFAULT_CAPACITY
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            log_interval_secs: default_log_interval(),
            status_interval_secs: default_status_interval(),
            buffer_capacity: default_buffer_capacity(),
        }
    }
}

/// Branding shown by the console
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSettings {
    #[serde(default = "default_product_name")]
    pub name: String,

    #[serde(default = "default_product_domain")]
    pub domain: String,
}

fn default_product_name() -> String {
    "Buildzy".to_string()
}

fn default_product_domain() -> String {
    "wareality.tech".to_string()
}

impl Default for ProductSettings {
    fn default() -> Self {
        Self {
            name: default_product_name(),
            domain: default_product_domain(),
        }
    }
}
