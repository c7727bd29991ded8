//! Headless chart that writes the dataset to the log as JSON

use tracing::{debug, info};

use super::{Chart, ChartModel};
use crate::error::Result;
use crate::status::StatusBoard;

/// Logs the dataset whenever it changes
///
/// Redraws with an unchanged dataset are a no-op apart from a debug line.
#[derive(Debug, Default)]
pub struct LogChart {
    colors_logged: bool,
    last_data: Option<String>,
}

impl LogChart {
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON of the most recently logged dataset
    pub fn last_data(&self) -> Option<&str> {
        self.last_data.as_deref()
    }
}

impl Chart for LogChart {
    fn redraw(&mut self, model: &ChartModel, status: &StatusBoard) -> Result<()> {
        if !self.colors_logged {
            let colors = serde_json::to_string(&model.dataset.background_color)?;
            info!(labels = ?model.labels, colors = %colors, "Chart initialized");
            self.colors_logged = true;
        }

        let data = serde_json::to_string(&model.dataset.data)?;
        if self.last_data.as_deref() == Some(data.as_str()) {
            debug!("Chart unchanged");
            return Ok(());
        }

        info!(
            label = %model.dataset.label,
            data = %data,
            connection = %status.connection(),
            "{}",
            status.last_reading()
        );
        self.last_data = Some(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Reading;
    use crate::spectrum::{Band, BandSet};

    #[test]
    fn test_logs_dataset_changes() {
        let bands = BandSet::new(vec![Band::from(415.0), Band::from("clear")]);
        let mut model = ChartModel::new(&bands, "AS7341");
        let status = StatusBoard::new();
        let mut chart = LogChart::new();

        chart.redraw(&model, &status).unwrap();
        assert_eq!(chart.last_data(), Some("[]"));

        model.dataset.data = vec![Reading::Value(120.0), Reading::Raw("x".to_string())];
        chart.redraw(&model, &status).unwrap();
        assert_eq!(chart.last_data(), Some(r#"[120.0,"x"]"#));

        // Unchanged redraw keeps the same state
        chart.redraw(&model, &status).unwrap();
        assert_eq!(chart.last_data(), Some(r#"[120.0,"x"]"#));
    }
}
