//! Configuration Management
//!
//! Loads pipeline configuration from TOML files. Configuration covers:
//! - LMS access (base URL, credential, page size, timeout)
//! - Topic-naming model settings (endpoint, model, key)
//! - Video lookup settings (endpoint, key)
//! - Retry behavior for upstream calls
//! - The tracked course list and sweep cadence for daemon mode
//! - Store location (JSON snapshot file, or in-memory when unset)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub lms: LmsConfig,

    #[serde(default)]
    pub topics: TopicConfig,

    #[serde(default)]
    pub videos: VideoConfig,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub sweep: SweepConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmsConfig {
    #[serde(default = "default_lms_url")]
    pub base_url: String,
    /// Default access credential; individual tracked courses may override.
    pub token: Option<String>,
    #[serde(default = "default_per_page")]
    pub per_page: usize,
    #[serde(default = "default_lms_timeout")]
    pub timeout_secs: u64,
}

impl Default for LmsConfig {
    fn default() -> Self {
        Self {
            base_url: default_lms_url(),
            token: None,
            per_page: default_per_page(),
            timeout_secs: default_lms_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicConfig {
    #[serde(default = "default_topic_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_topic_model")]
    pub model: String,
    pub api_key: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_topic_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_topic_timeout")]
    pub timeout_secs: u64,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            endpoint: default_topic_endpoint(),
            model: default_topic_model(),
            api_key: None,
            temperature: default_temperature(),
            max_tokens: default_topic_max_tokens(),
            timeout_secs: default_topic_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    #[serde(default = "default_video_endpoint")]
    pub endpoint: String,
    pub api_key: Option<String>,
    #[serde(default = "default_video_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_video_max_results")]
    pub max_results: usize,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            endpoint: default_video_endpoint(),
            api_key: None,
            timeout_secs: default_video_timeout(),
            max_results: default_video_max_results(),
        }
    }
}

/// Retry configuration for upstream HTTP calls (exponential backoff).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// A course/credential pair the daemon sweeps on every cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedCourse {
    pub id: String,
    /// Human-readable name passed to the topic namer; falls back to the id.
    pub name: Option<String>,
    /// Per-course credential override.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Delay between full-fleet sweep cycles.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default)]
    pub courses: Vec<TrackedCourse>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            courses: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON snapshot file. When unset the store is in-memory only.
    pub path: Option<PathBuf>,
}

fn default_lms_url() -> String {
    "https://canvas.instructure.com/api/v1".to_string()
}
fn default_per_page() -> usize {
    100
}
fn default_lms_timeout() -> u64 {
    30
}
fn default_topic_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_topic_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_topic_max_tokens() -> usize {
    64
}
fn default_topic_timeout() -> u64 {
    60
}
fn default_video_endpoint() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}
fn default_video_timeout() -> u64 {
    30
}
fn default_video_max_results() -> usize {
    1
}
fn default_max_retries() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    30000
}
fn default_interval_secs() -> u64 {
    3600
}

impl Config {
    /// Load configuration from an explicit path, or try `remedia.toml` in
    /// the working directory and `~/.config/remedia/config.toml`, falling
    /// back to defaults. Secrets can always come from the environment.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read config from {}", p))?;
                toml::from_str::<Self>(&content).context("Failed to parse config")?
            }
            None => {
                let home_config = dirs::home_dir()
                    .map(|h| h.join(".config/remedia/config.toml"))
                    .and_then(|p| p.to_str().map(String::from));

                let mut default_paths: Vec<&str> = vec!["remedia.toml"];
                let home_config_str: String;
                if let Some(ref hc) = home_config {
                    home_config_str = hc.clone();
                    default_paths.push(&home_config_str);
                }

                let mut loaded = None;
                for p in &default_paths {
                    if let Ok(content) = std::fs::read_to_string(p) {
                        loaded = Some(toml::from_str(&content).context("Failed to parse config")?);
                        break;
                    }
                }
                loaded.unwrap_or_default()
            }
        };

        // Environment overrides, primarily for secrets.
        if let Ok(url) = std::env::var("REMEDIA_LMS_URL") {
            config.lms.base_url = url;
        }
        if let Ok(token) = std::env::var("REMEDIA_LMS_TOKEN") {
            config.lms.token = Some(token);
        }
        if let Ok(key) = std::env::var("REMEDIA_TOPIC_API_KEY") {
            config.topics.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("REMEDIA_VIDEO_API_KEY") {
            config.videos.api_key = Some(key);
        }

        Ok(config)
    }
}
