//! Utility functions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version information for the console
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Render an RFC 3339 timestamp as "5m ago", "yesterday" and so on.
/// Unparseable input comes back unchanged.
pub fn format_relative_date(raw: &str, now: DateTime<Utc>) -> String {
    let Ok(then) = DateTime::parse_from_rfc3339(raw) else {
        return raw.to_string();
    };
    let diff = (now - then.with_timezone(&Utc)).num_seconds().max(0);

    const MINUTE: i64 = 60;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;
    const WEEK: i64 = 7 * DAY;
    const MONTH: i64 = 30 * DAY;
    const YEAR: i64 = 365 * DAY;

    match diff {
        d if d < MINUTE => "just now".to_string(),
        d if d < HOUR => format!("{}m ago", d / MINUTE),
        d if d < DAY => format!("{}h ago", d / HOUR),
        d if d < 2 * DAY => "yesterday".to_string(),
        d if d < WEEK => format!("{}d ago", d / DAY),
        d if d < MONTH => format!("{}w ago", d / WEEK),
        d if d < YEAR => format!("{}mo ago", d / MONTH),
        d => format!("{}y ago", d / YEAR),
    }
}
