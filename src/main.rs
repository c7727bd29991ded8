//! # Spectro Viewer
//!
//! Subscribe to a spectrometer topic and chart its readings live.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (first argument, default `config/default.toml`)
//!    - Set up logging (rolling file in terminal mode, stdout otherwise)
//!    - Start connecting to the MQTT broker
//!
//! 2. **Main Loop**
//!    - Decode every message on the topic into the latest-frame store
//!    - Redraw the bar chart every `render.interval_ms`
//!
//! 3. **Graceful Shutdown**
//!    - `q`, `Esc` or Ctrl+C in terminal mode, Ctrl+C in log mode
//!    - Terminal restored before exit
//!
//! # Examples
//!
//! ```bash
//! cargo run --release -- config/default.toml
//! ```

use anyhow::{Context, Result};
use tracing::{error, info};

use spectro_viewer::config::{Config, RenderMode};
use spectro_viewer::logging;
use spectro_viewer::mqtt::MqttTransport;
use spectro_viewer::render::{terminal, LogChart, TerminalChart};
use spectro_viewer::viewer::Viewer;

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path))?;

    let _log_guard = logging::init(&config.logging, config.render.mode)
        .context("Failed to initialize logging")?;

    info!("Spectro Viewer v{} starting...", env!("CARGO_PKG_VERSION"));

    let transport = MqttTransport::connect(&config.mqtt).context("Failed to create MQTT client")?;
    info!(client_id = transport.client_id(), topic = %config.mqtt.topic, "MQTT client created");

    // Each arm drops its viewer (and with it the terminal) before returning
    let result = match config.render.mode {
        RenderMode::Terminal => {
            let chart = TerminalChart::stdout().context("Failed to set up terminal")?;
            let mut viewer = Viewer::new(&config, transport, chart);
            viewer.run(quit_requested()).await
        }
        RenderMode::Log => {
            let mut viewer = Viewer::new(&config, transport, LogChart::new());
            viewer.run(ctrl_c()).await
        }
    };

    result.context("Viewer stopped with an error")?;
    info!("Spectro Viewer stopped");
    Ok(())
}

/// Resolves on Ctrl+C
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down...");
}

/// Resolves on a quit key or Ctrl+C
async fn quit_requested() {
    tokio::select! {
        _ = terminal::wait_for_quit() => info!("Quit key pressed, shutting down..."),
        _ = ctrl_c() => {}
    }
}
