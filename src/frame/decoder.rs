//! # Frame Decoder
//!
//! Decodes comma-separated spectrometer frames into per-band readings.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Token delimiter on the wire
pub const FRAME_DELIMITER: char = ',';

/// Frame decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Token count does not satisfy the configured policy
    #[error("malformed frame: expected {expected} tokens, found {found}")]
    MalformedFrame { expected: usize, found: usize },
}

/// How strictly the token count is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenPolicy {
    /// At least N tokens; extras are ignored
    #[default]
    Lenient,
    /// Exactly N tokens
    Strict,
}

/// One band reading as it appeared on the wire
///
/// Tokens that do not parse as finite numbers are kept verbatim instead of
/// failing the whole frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reading {
    Value(f64),
    Raw(String),
}

impl Reading {
    /// Parse a single trimmed token
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        match token.parse::<f64>() {
            Ok(value) if value.is_finite() => Reading::Value(value),
            _ => Reading::Raw(token.to_string()),
        }
    }

    /// Numeric value, if the token was numeric
    pub fn value(&self) -> Option<f64> {
        match self {
            Reading::Value(value) => Some(*value),
            Reading::Raw(_) => None,
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Value(value) => write!(f, "{}", value),
            Reading::Raw(raw) => f.write_str(raw),
        }
    }
}

/// One decoded set of per-band readings
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    readings: Vec<Reading>,
    received_at: DateTime<Local>,
}

impl Frame {
    pub fn new(readings: Vec<Reading>, received_at: DateTime<Local>) -> Self {
        Self { readings, received_at }
    }

    /// Readings in band order
    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    /// Wall-clock arrival time
    pub fn received_at(&self) -> DateTime<Local> {
        self.received_at
    }
}

/// Decoder for a fixed number of bands
#[derive(Debug, Clone, Copy)]
pub struct FrameDecoder {
    expected_bands: usize,
    policy: TokenPolicy,
}

impl FrameDecoder {
    /// Create a decoder
    ///
    /// # Arguments
    ///
    /// * `expected_bands` - Number of configured bands (N)
    /// * `policy` - Token count policy
    pub fn new(expected_bands: usize, policy: TokenPolicy) -> Self {
        Self { expected_bands, policy }
    }

    /// Decode a raw payload, stamping it with the current time
    ///
    /// # Arguments
    ///
    /// * `raw` - Message payload bytes (UTF-8 text, invalid sequences replaced)
    ///
    /// # Returns
    ///
    /// * `Result<Frame, DecodeError>` - Frame holding the first N readings
    ///
    /// # Errors
    ///
    /// Returns `MalformedFrame` if the payload has fewer than N tokens, or
    /// more than N under `TokenPolicy::Strict`
    ///
    /// # Examples
    ///
    /// ```
    /// use spectro_viewer::frame::{FrameDecoder, Reading, TokenPolicy};
    ///
    /// let decoder = FrameDecoder::new(3, TokenPolicy::Lenient);
    /// let frame = decoder.decode(b"120,340,60").unwrap();
    /// assert_eq!(frame.readings()[1], Reading::Value(340.0));
    /// ```
    pub fn decode(&self, raw: &[u8]) -> Result<Frame, DecodeError> {
        self.decode_at(raw, Local::now())
    }

    /// Decode a raw payload with an explicit arrival time
    pub fn decode_at(
        &self,
        raw: &[u8],
        received_at: DateTime<Local>,
    ) -> Result<Frame, DecodeError> {
        let text = String::from_utf8_lossy(raw);
        let tokens: Vec<&str> = text.trim().split(FRAME_DELIMITER).collect();

        let found = tokens.len();
        let acceptable = match self.policy {
            TokenPolicy::Lenient => found >= self.expected_bands,
            TokenPolicy::Strict => found == self.expected_bands,
        };
        if !acceptable {
            return Err(DecodeError::MalformedFrame {
                expected: self.expected_bands,
                found,
            });
        }

        let readings = tokens
            .into_iter()
            .take(self.expected_bands)
            .map(Reading::parse)
            .collect();

        Ok(Frame::new(readings, received_at))
    }
}
