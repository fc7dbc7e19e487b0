//! Run configuration loaded from TOML.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;
use crate::retry::RetryPolicy;
use crate::scrapers::types::{Location, SearchProfile};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Marketplace API settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Message stream settings
    #[serde(default)]
    pub kafka: KafkaConfig,

    /// Driver pacing and output
    #[serde(default)]
    pub run: RunConfig,

    /// Searches to run, in order
    #[serde(default = "SearchProfile::builtin")]
    pub profiles: Vec<SearchProfile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            kafka: KafkaConfig::default(),
            run: RunConfig::default(),
            profiles: SearchProfile::builtin(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.base_url.trim().is_empty() {
            return Err(ConfigError::validation("source.base_url is empty"));
        }
        if self.source.timeout_secs == 0 {
            return Err(ConfigError::validation("source.timeout_secs must be > 0"));
        }
        if self.kafka.bootstrap_servers.is_empty()
            || self.kafka.bootstrap_servers.iter().any(|s| s.trim().is_empty())
        {
            return Err(ConfigError::validation(
                "kafka.bootstrap_servers must list at least one address",
            ));
        }
        if self.kafka.topic.trim().is_empty() {
            return Err(ConfigError::validation("kafka.topic is empty"));
        }
        if self.kafka.connect_attempts == 0 {
            return Err(ConfigError::validation("kafka.connect_attempts must be > 0"));
        }
        if self.kafka.send_timeout_secs == 0 {
            return Err(ConfigError::validation("kafka.send_timeout_secs must be > 0"));
        }
        if self.profiles.is_empty() {
            return Err(ConfigError::validation("No search profiles defined"));
        }
        for profile in &self.profiles {
            profile.validate().map_err(ConfigError::Validation)?;
        }
        Ok(())
    }
}

/// Marketplace API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// API root, without trailing slash
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Region searched when a profile lists none
    #[serde(default = "defaults::home_location")]
    pub home_location: Location,

    /// Report a failed search as zero results instead of an error
    #[serde(default)]
    pub empty_on_error: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            timeout_secs: defaults::timeout(),
            user_agent: defaults::user_agent(),
            home_location: defaults::home_location(),
            empty_on_error: false,
        }
    }
}

/// Message stream producer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaConfig {
    #[serde(default = "defaults::bootstrap_servers")]
    pub bootstrap_servers: Vec<String>,

    #[serde(default = "defaults::topic")]
    pub topic: String,

    /// Broker acknowledgment level
    #[serde(default = "defaults::acks")]
    pub acks: String,

    /// Send retries performed inside the producer
    #[serde(default = "defaults::send_retries")]
    pub retries: u32,

    /// Keep at 1 so resends cannot reorder records
    #[serde(default = "defaults::max_in_flight")]
    pub max_in_flight: u32,

    /// Per-record acknowledgment wait
    #[serde(default = "defaults::send_timeout")]
    pub send_timeout_secs: u64,

    #[serde(default = "defaults::connect_attempts")]
    pub connect_attempts: u32,

    /// Delay between connection attempts
    #[serde(default = "defaults::connect_delay")]
    pub connect_delay_secs: u64,

    #[serde(default = "defaults::flush_timeout")]
    pub flush_timeout_secs: u64,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: defaults::bootstrap_servers(),
            topic: defaults::topic(),
            acks: defaults::acks(),
            retries: defaults::send_retries(),
            max_in_flight: defaults::max_in_flight(),
            send_timeout_secs: defaults::send_timeout(),
            connect_attempts: defaults::connect_attempts(),
            connect_delay_secs: defaults::connect_delay(),
            flush_timeout_secs: defaults::flush_timeout(),
        }
    }
}

impl KafkaConfig {
    /// Comma-separated bootstrap list as the client expects it
    pub fn bootstrap(&self) -> String {
        self.bootstrap_servers.join(",")
    }

    pub fn connect_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.connect_attempts,
            Duration::from_secs(self.connect_delay_secs),
        )
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_secs(self.flush_timeout_secs)
    }
}

/// Driver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Pause between profiles in seconds
    #[serde(default = "defaults::pacing")]
    pub pacing_secs: u64,

    /// Records logged per profile in dry-run mode
    #[serde(default = "defaults::preview_count")]
    pub preview_count: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            pacing_secs: defaults::pacing(),
            preview_count: defaults::preview_count(),
        }
    }
}

impl RunConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_secs(self.pacing_secs)
    }
}

mod defaults {
    use crate::scrapers::types::Location;

    // Source defaults
    pub fn base_url() -> String {
        "https://api.blocket.se/motor-search-service/v4".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; car-scout/0.1)".into()
    }
    pub fn home_location() -> Location {
        Location::Stockholm
    }

    // Kafka defaults
    pub fn bootstrap_servers() -> Vec<String> {
        vec!["localhost:9092".into()]
    }
    pub fn topic() -> String {
        "raw-car-listings".into()
    }
    pub fn acks() -> String {
        "all".into()
    }
    pub fn send_retries() -> u32 {
        3
    }
    pub fn max_in_flight() -> u32 {
        1
    }
    pub fn send_timeout() -> u64 {
        10
    }
    pub fn connect_attempts() -> u32 {
        3
    }
    pub fn connect_delay() -> u64 {
        5
    }
    pub fn flush_timeout() -> u64 {
        30
    }

    // Run defaults
    pub fn pacing() -> u64 {
        2
    }
    pub fn preview_count() -> usize {
        3
    }
}
