//! Application configuration options

use std::time::Duration;

use crate::storage::layout::StorageLayout;
use crate::storage::settings::{ProductSettings, Settings};
use crate::workers::{log_tail, status};

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Backend API base URL
    pub backend_base_url: String,

    /// Log service base URL, the API base when absent
    pub log_service_url: Option<String>,

    /// Storage layout paths
    pub layout: StorageLayout,

    /// Lines kept by the log tail
    pub buffer_capacity: usize,

    pub log_tail_worker: log_tail::Options,

    pub status_worker: status::Options,

    pub product: ProductSettings,

    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl AppOptions {
    pub fn from_settings(settings: &Settings, layout: StorageLayout) -> Self {
        Self {
            backend_base_url: settings.backend.base_url.clone(),
            log_service_url: settings.backend.log_service_url.clone(),
            layout,
            buffer_capacity: settings.polling.buffer_capacity,
            log_tail_worker: log_tail::Options {
                interval: Duration::from_secs(settings.polling.log_interval_secs),
            },
            status_worker: status::Options {
                interval: Duration::from_secs(settings.polling.status_interval_secs),
            },
            product: settings.product.clone(),
            ..Default::default()
        }
    }
}

impl Default for AppOptions {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            backend_base_url: settings.backend.base_url,
            log_service_url: None,
            layout: StorageLayout::default(),
            buffer_capacity: settings.polling.buffer_capacity,
            log_tail_worker: log_tail::Options::default(),
            status_worker: status::Options::default(),
            product: settings.product,
            max_shutdown_delay: Duration::from_secs(5),
        }
    }
}
