use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::str::FromStr;

/// Reference timezone used when system detection fails.
pub const DEFAULT_TIMEZONE: &str = "America/New_York";

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite task database.
    pub database_path: String,
    /// IANA name of the reference timezone for date-key evaluation.
    pub timezone: String,
    /// Skip instances whose target falls past the series end date.
    pub enforce_end_date: bool,
    /// Step bound when walking a dormant series forward.
    pub max_catchup_steps: u32,
    /// Listen address for the admin HTTP trigger.
    pub listen_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "cadence.db".to_string(),
            timezone: detect_system_timezone(),
            enforce_end_date: false,
            max_catchup_steps: 400,
            listen_addr: "127.0.0.1:8700".to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("cadence.toml"))
            .merge(Env::prefixed("CADENCE_"))
            .extract()
    }
}

/// Validates that a timezone string is a valid IANA timezone name
pub fn validate_timezone(timezone: &str) -> Result<Tz, String> {
    Tz::from_str(timezone).map_err(|_| {
        format!(
            "Invalid timezone: '{}'. Use IANA timezone names like 'America/New_York'",
            timezone
        )
    })
}

/// Detects the system timezone, falling back to the reference default.
pub fn detect_system_timezone() -> String {
    // Method 1: Check TZ environment variable
    if let Ok(tz) = std::env::var("TZ") {
        if validate_timezone(&tz).is_ok() {
            return tz;
        }
    }

    // Method 2: Try to read from /etc/timezone (Linux)
    #[cfg(target_os = "linux")]
    {
        if let Ok(tz) = std::fs::read_to_string("/etc/timezone") {
            let tz = tz.trim();
            if validate_timezone(tz).is_ok() {
                return tz.to_string();
            }
        }
    }

    // Method 3: Platform-neutral detection
    if let Ok(local_tz) = iana_time_zone::get_timezone() {
        if validate_timezone(&local_tz).is_ok() {
            return local_tz;
        }
    }

    DEFAULT_TIMEZONE.to_string()
}
