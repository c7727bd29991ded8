//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{Result, SpectroError};
use crate::frame::TokenPolicy;
use crate::mqtt::BrokerAddress;
use crate::render::DEFAULT_RENDER_INTERVAL;
use crate::spectrum::{Band, BandSet};

/// Environment variable overriding `mqtt.password`
pub const MQTT_PASSWORD_ENV: &str = "MQTT_PASSWORD";

/// Main configuration structure
///
/// Every table and field is optional; an empty file yields the defaults.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub mqtt: MqttConfig,

    #[serde(default)]
    pub bands: BandsConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// MQTT broker and subscription configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MqttConfig {
    #[serde(default = "default_broker_url")]
    pub broker_url: String,

    #[serde(default = "default_client_id_prefix")]
    pub client_id_prefix: String,

    #[serde(default = "default_topic")]
    pub topic: String,

    #[serde(default)]
    pub qos: u8,

    #[serde(default = "default_clean_session")]
    pub clean_session: bool,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_keep_alive_s")]
    pub keep_alive_s: u64,

    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

/// Spectrometer band configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BandsConfig {
    #[serde(default = "default_label")]
    pub label: String,

    #[serde(default = "default_wavelengths")]
    pub wavelengths: Vec<Band>,

    #[serde(default)]
    pub strict_token_count: bool,
}

/// Chart output selection
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Full-screen terminal bar chart
    Terminal,
    /// Headless, dataset written to the log
    Log,
}

/// Render loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    #[serde(default = "default_render_mode")]
    pub mode: RenderMode,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_dir")]
    pub dir: String,
}

// Default value functions
fn default_broker_url() -> String { "mqtt://public.cloud.shiftr.io:1883".to_string() }
fn default_client_id_prefix() -> String { "spectro-viewer".to_string() }
fn default_topic() -> String { "spectrometer".to_string() }
fn default_clean_session() -> bool { true }
fn default_connect_timeout_ms() -> u64 { 10000 }
fn default_keep_alive_s() -> u64 { 30 }
fn default_reconnect_delay_ms() -> u64 { 1000 }
fn default_event_capacity() -> usize { 64 }

fn default_label() -> String { "AS7341 Spectrometer".to_string() }
fn default_wavelengths() -> Vec<Band> {
    let mut bands: Vec<Band> = [415.0, 445.0, 480.0, 515.0, 555.0, 590.0, 630.0, 680.0, 910.0]
        .into_iter()
        .map(Band::Wavelength)
        .collect();
    bands.push(Band::Tag("clear".to_string()));
    bands
}

fn default_render_mode() -> RenderMode { RenderMode::Terminal }
fn default_interval_ms() -> u64 { DEFAULT_RENDER_INTERVAL.as_millis() as u64 }

fn default_log_level() -> String { "info".to_string() }
fn default_log_dir() -> String { "./logs".to_string() }

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_url: default_broker_url(),
            client_id_prefix: default_client_id_prefix(),
            topic: default_topic(),
            qos: 0,
            clean_session: default_clean_session(),
            connect_timeout_ms: default_connect_timeout_ms(),
            keep_alive_s: default_keep_alive_s(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            event_capacity: default_event_capacity(),
            username: None,
            password: None,
        }
    }
}

impl Default for BandsConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
            wavelengths: default_wavelengths(),
            strict_token_count: false,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            mode: default_render_mode(),
            interval_ms: default_interval_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: default_log_dir(),
        }
    }
}

impl BandsConfig {
    /// Band set in wire order
    pub fn band_set(&self) -> BandSet {
        BandSet::new(self.wavelengths.iter().cloned())
    }

    pub fn token_policy(&self) -> TokenPolicy {
        if self.strict_token_count {
            TokenPolicy::Strict
        } else {
            TokenPolicy::Lenient
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> SpectroError {
    SpectroError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use spectro_viewer::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(password) = std::env::var(MQTT_PASSWORD_ENV) {
            info!("Using {} from environment", MQTT_PASSWORD_ENV);
            config.mqtt.password = Some(password);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        let mqtt = &self.mqtt;

        if let Err(e) = BrokerAddress::parse(&mqtt.broker_url) {
            return Err(invalid(e));
        }

        if mqtt.qos > 2 {
            return Err(invalid(format!("qos must be 0, 1 or 2 (got {})", mqtt.qos)));
        }

        if mqtt.topic.is_empty() {
            return Err(invalid("topic cannot be empty"));
        }

        if mqtt.client_id_prefix.is_empty() {
            return Err(invalid("client_id_prefix cannot be empty"));
        }

        if mqtt.connect_timeout_ms == 0 || mqtt.connect_timeout_ms > 60000 {
            return Err(invalid("connect_timeout_ms must be between 1 and 60000"));
        }

        if mqtt.reconnect_delay_ms == 0 || mqtt.reconnect_delay_ms > 60000 {
            return Err(invalid("reconnect_delay_ms must be between 1 and 60000"));
        }

        // rumqttc rejects keep-alives shorter than 5 seconds
        if mqtt.keep_alive_s < 5 || mqtt.keep_alive_s > 3600 {
            return Err(invalid("keep_alive_s must be between 5 and 3600"));
        }

        if mqtt.event_capacity == 0 {
            return Err(invalid("event_capacity must be greater than 0"));
        }

        if mqtt.password.is_some() && mqtt.username.is_none() {
            return Err(invalid("password requires a username"));
        }

        if self.bands.wavelengths.is_empty() {
            return Err(invalid("at least one band must be configured"));
        }

        for (index, band) in self.bands.wavelengths.iter().enumerate() {
            match band {
                Band::Wavelength(nm) if !nm.is_finite() || *nm <= 0.0 => {
                    return Err(invalid(format!(
                        "band {} wavelength must be a positive number (got {})",
                        index, nm
                    )));
                }
                Band::Tag(tag) if tag.trim().is_empty() => {
                    return Err(invalid(format!("band {} tag cannot be empty", index)));
                }
                _ => {}
            }
        }

        if self.render.interval_ms == 0 || self.render.interval_ms > 60000 {
            return Err(invalid("render interval_ms must be between 1 and 60000"));
        }

        if self.render.mode == RenderMode::Terminal && self.logging.dir.is_empty() {
            return Err(invalid("logging dir cannot be empty in terminal mode"));
        }

        Ok(())
    }
}
