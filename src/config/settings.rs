//! Application settings loaded from config.toml
//!
//! Every field carries a serde default, so a partial (or empty) file still
//! yields a usable configuration. The scheduler defaults here are the values
//! used when the `scheduler_config` rows are absent.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Bot identity settings
    pub bot: BotSettings,
    /// Contribution defaults
    pub collection: CollectionSettings,
    /// Scheduler fallbacks and pacing
    pub scheduler: SchedulerSettings,
    /// Fan-out task group bounds
    pub fanout: FanOutSettings,
    /// AI collaborator settings
    pub ai: AiSettings,
}

/// Bot identity settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BotSettings {
    /// Discord id of the operator who always passes admin and super checks
    pub operator_id: i64,
}

/// Contribution defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectionSettings {
    /// Amount asked from each participant unless the admin overrides it
    pub default_amount: i64,
    /// Contribution requests go out only this many days (or fewer) before a birthday
    pub near_term_days: u32,
    /// Window size of the paginated "manage chats" list
    pub page_size: usize,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            default_amount: 500,
            near_term_days: 7,
            page_size: 10,
        }
    }
}

/// Scheduler fallbacks and pacing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Sleep between idle ticks
    pub poll_interval_secs: u64,
    /// Extra sleep after a task ran
    pub cushion_secs: u64,
    /// Birthday check trigger time (`HH:MM`)
    pub birthday_time: String,
    /// Report check trigger time (`HH:MM`)
    pub report_time: String,
    /// Days-to-birthday horizon
    pub lookahead_days: u32,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 25,
            cushion_secs: 60,
            birthday_time: "08:00".to_string(),
            report_time: "15:00".to_string(),
            lookahead_days: 10,
        }
    }
}

/// Fan-out task group bounds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FanOutSettings {
    /// Maximum notification jobs running at once
    pub max_concurrent: usize,
    /// A job still running after this many seconds is abandoned as failed
    pub job_timeout_secs: u64,
}

impl Default for FanOutSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            job_timeout_secs: 120,
        }
    }
}

/// AI collaborator settings. The API key comes from `OPENAI_API_KEY`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    /// Whether to call the AI at all
    pub enabled: bool,
    /// Base URL of an OpenAI-compatible API
    pub api_url: String,
    /// Chat completion model
    pub text_model: String,
    /// Image generation model
    pub image_model: String,
    /// Per-request HTTP timeout
    pub timeout_secs: u64,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: "https://api.openai.com".to_string(),
            text_model: "gpt-4o-mini".to_string(),
            image_model: "dall-e-3".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Loads application settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads settings from `GIFT_BUDDY_CONFIG` (default `./config.toml`).
///
/// A missing file is not fatal: the defaults are used and a warning is logged.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var("GIFT_BUDDY_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    if Path::new(&path).exists() {
        load_config(&path)
    } else {
        tracing::warn!("Config file {path} not found, using built-in defaults");
        Ok(AppConfig::default())
    }
}
