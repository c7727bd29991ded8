//! # Status Surface
//!
//! Plain-text status lines shown next to the chart: the connection state,
//! the arrival time of the last reading and the last dropped-frame diagnostic.

use chrono::{DateTime, Local};
use tracing::{info, warn};

/// Shown before the transport reports anything
pub const WAITING_TEXT: &str = "Waiting for client connection";

/// Prefix of the last-reading line
pub const LAST_READING_PREFIX: &str = "last reading at: ";

/// Text fields of the status surface
#[derive(Debug, Clone, PartialEq)]
pub struct StatusBoard {
    connection: String,
    last_reading: String,
    diagnostic: Option<String>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self {
            connection: WAITING_TEXT.to_string(),
            last_reading: LAST_READING_PREFIX.to_string(),
            diagnostic: None,
        }
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection(&self) -> &str {
        &self.connection
    }

    pub fn last_reading(&self) -> &str {
        &self.last_reading
    }

    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }

    pub fn set_connection(&mut self, text: impl Into<String>) {
        self.connection = text.into();
        info!(status = %self.connection, "Connection status");
    }

    /// Record the arrival time of the newest frame
    pub fn set_last_reading(&mut self, received_at: DateTime<Local>) {
        self.last_reading = format!(
            "{}{}",
            LAST_READING_PREFIX,
            received_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    pub fn set_diagnostic(&mut self, text: impl Into<String>) {
        let text = text.into();
        warn!(diagnostic = %text, "Frame dropped");
        self.diagnostic = Some(text);
    }

    pub fn clear_diagnostic(&mut self) {
        self.diagnostic = None;
    }
}
