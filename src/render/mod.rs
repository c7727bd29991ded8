//! # Render Module
//!
//! Fixed-cadence chart redraws, decoupled from message arrival.
//!
//! This module handles:
//! - The declarative chart model (labels, dataset, per-band colors)
//! - Pushing the latest stored frame into the model on every tick
//! - Chart backends: a ratatui terminal bar chart and a headless log chart

pub mod log;
pub mod terminal;

use serde::Serialize;
use std::time::Duration;
use tracing::trace;

use crate::error::Result;
use crate::frame::{Reading, TelemetryStore};
use crate::spectrum::{BandSet, ColorTable};
use crate::status::StatusBoard;

pub use self::log::LogChart;
pub use terminal::TerminalChart;

/// Default redraw period
pub const DEFAULT_RENDER_INTERVAL: Duration = Duration::from_millis(2000);

/// Chart collaborator
///
/// `redraw` is called on every render tick and must be safe to call with an
/// unchanged model.
#[cfg_attr(test, mockall::automock)]
pub trait Chart {
    fn redraw(&mut self, model: &ChartModel, status: &StatusBoard) -> Result<()>;
}

/// The single bar series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<Reading>,
    pub background_color: ColorTable,
}

/// Declarative bar chart model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartModel {
    pub labels: Vec<String>,
    pub dataset: Dataset,
}

impl ChartModel {
    /// Build the model with its colors; data starts empty
    pub fn new(bands: &BandSet, label: impl Into<String>) -> Self {
        Self {
            labels: bands.labels(),
            dataset: Dataset {
                label: label.into(),
                data: Vec::new(),
                background_color: ColorTable::from_bands(bands),
            },
        }
    }
}

/// Pushes the telemetry store into the chart on a timer
pub struct RenderLoop<C: Chart> {
    chart: C,
    model: ChartModel,
    interval: Duration,
    ticks: u64,
}

impl<C: Chart> RenderLoop<C> {
    /// Create the render loop
    ///
    /// The color table is computed here, once; ticks only replace the data.
    ///
    /// # Arguments
    ///
    /// * `chart` - Chart backend
    /// * `bands` - Configured bands (labels and colors)
    /// * `label` - Dataset label
    /// * `interval` - Redraw period
    pub fn new(chart: C, bands: &BandSet, label: impl Into<String>, interval: Duration) -> Self {
        Self {
            chart,
            model: ChartModel::new(bands, label),
            interval,
            ticks: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn model(&self) -> &ChartModel {
        &self.model
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// One render tick
    ///
    /// Copies the latest frame (if any) into the dataset and redraws. With
    /// no frame yet the chart is redrawn with whatever it already holds.
    pub fn tick(&mut self, store: &TelemetryStore, status: &StatusBoard) -> Result<()> {
        if let Some(frame) = store.latest() {
            self.model.dataset.data = frame.readings().to_vec();
        }

        self.ticks += 1;
        trace!(tick = self.ticks, "Render tick");
        self.chart.redraw(&self.model, status)
    }
}
