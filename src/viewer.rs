//! # Viewer
//!
//! Process-scoped context tying the pipeline together: connection manager,
//! telemetry store, render loop and status surface. One instance is built at
//! startup and driven by a single `select!` loop, so message handling and
//! render ticks never run concurrently and the store needs no locking.

use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Result, SpectroError};
use crate::frame::{FrameDecoder, TelemetryStore};
use crate::mqtt::{ConnectionManager, ConnectionState, EventOutcome, Transport, TransportEvent};
use crate::render::{Chart, RenderLoop};
use crate::status::StatusBoard;

/// Live spectrometer viewer
pub struct Viewer<T: Transport, C: Chart> {
    connection: ConnectionManager<T>,
    store: TelemetryStore,
    render: RenderLoop<C>,
    status: StatusBoard,
}

impl<T: Transport, C: Chart> Viewer<T, C> {
    /// Build the viewer from configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `transport` - Pub/sub transport (already connecting)
    /// * `chart` - Chart backend
    pub fn new(config: &Config, transport: T, chart: C) -> Self {
        let bands = config.bands.band_set();
        let decoder = FrameDecoder::new(bands.len(), config.bands.token_policy());

        Self {
            connection: ConnectionManager::new(transport, config.mqtt.topic.clone(), decoder),
            store: TelemetryStore::new(),
            render: RenderLoop::new(
                chart,
                &bands,
                config.bands.label.clone(),
                Duration::from_millis(config.render.interval_ms),
            ),
            status: StatusBoard::new(),
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn store(&self) -> &TelemetryStore {
        &self.store
    }

    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    pub fn render_loop(&self) -> &RenderLoop<C> {
        &self.render
    }

    /// Apply one transport event and reflect it on the status surface
    pub async fn handle_event(&mut self, event: TransportEvent) {
        let outcome = self.connection.handle_event(event, &mut self.store).await;

        match outcome {
            EventOutcome::Subscribed { topic } => {
                self.status
                    .set_connection(format!("client is connected, subscribed to {}", topic));
            }
            EventOutcome::SubscribeFailed(reason) => {
                self.status.set_connection(format!("subscribe failed: {}", reason));
            }
            EventOutcome::Closed(reason) => {
                self.status.set_connection(format!("connection lost: {}", reason));
            }
            EventOutcome::Failed(reason) => {
                self.status.set_connection(format!("error: {}", reason));
            }
            EventOutcome::FrameStored(received_at) => {
                self.status.set_last_reading(received_at);
                self.status.clear_diagnostic();
            }
            EventOutcome::FrameDropped(e) => {
                self.status.set_diagnostic(format!("dropped frame: {}", e));
            }
            EventOutcome::Ignored { topic } => {
                debug!(topic = %topic, "Message ignored");
            }
        }
    }

    /// Redraw the chart from the latest stored frame
    pub fn render_tick(&mut self) -> Result<()> {
        self.render.tick(&self.store, &self.status)
    }

    /// Run until `shutdown` resolves
    ///
    /// Render failures are logged and the loop keeps going.
    ///
    /// # Errors
    ///
    /// Returns `SpectroError::Transport` if the transport event stream ends
    pub async fn run<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.render.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        self.connection.start();
        info!(
            topic = %self.connection.topic(),
            interval_ms = self.render.interval().as_millis() as u64,
            "Viewer running"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }

                event = self.connection.next_event() => {
                    match event {
                        Some(event) => self.handle_event(event).await,
                        None => {
                            return Err(SpectroError::Transport(
                                "transport event stream ended".to_string(),
                            ));
                        }
                    }
                }

                _ = ticker.tick() => {
                    if let Err(e) = self.render_tick() {
                        warn!(error = %e, "Redraw failed");
                    }
                }
            }
        }

        info!(
            frames_received = self.store.frames_received(),
            redraws = self.render.ticks(),
            "Viewer stopped"
        );
        Ok(())
    }
}
