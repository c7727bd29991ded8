//! # Telemetry Store
//!
//! Holds the most recently decoded frame. No history is kept: every update
//! replaces the previous frame, so frames arriving between two render ticks
//! are never drawn.

use super::decoder::Frame;

/// Latest-frame slot with a single writer (message handler) and a single
/// reader (render tick)
#[derive(Debug, Default)]
pub struct TelemetryStore {
    latest: Option<Frame>,
    frames_received: u64,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored frame
    pub fn update(&mut self, frame: Frame) {
        self.latest = Some(frame);
        self.frames_received += 1;
    }

    /// Most recent frame, if any has arrived yet
    pub fn latest(&self) -> Option<&Frame> {
        self.latest.as_ref()
    }

    /// Total frames accepted since startup
    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }
}
