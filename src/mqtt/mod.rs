//! # MQTT Module
//!
//! Pub/sub connection lifecycle for the spectrometer topic.
//!
//! This module handles:
//! - Tracking the connection state from transport lifecycle events
//! - Subscribing to the configured topic on every (re)connect
//! - Decoding matching messages into the telemetry store
//! - The rumqttc-backed production transport

pub mod client;
pub mod transport;

use chrono::{DateTime, Local};
use std::fmt;
use tracing::{debug, info, warn};

use crate::frame::{DecodeError, FrameDecoder, TelemetryStore};
pub use client::{BrokerAddress, MqttTransport};
pub use transport::{topic_matches, Transport, TransportEvent};

/// Connection state as seen by the status surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
        };
        f.write_str(name)
    }
}

/// What handling a single transport event did
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// Connected and subscribed to the topic
    Subscribed { topic: String },
    /// Connected, but the subscribe request failed
    SubscribeFailed(String),
    /// Connection closed
    Closed(String),
    /// Transport error
    Failed(String),
    /// Frame decoded and stored
    FrameStored(DateTime<Local>),
    /// Frame rejected by the decoder and dropped
    FrameDropped(DecodeError),
    /// Message on a topic we did not subscribe to
    Ignored { topic: String },
}

/// Owns the transport and applies its events
pub struct ConnectionManager<T: Transport> {
    transport: T,
    topic: String,
    decoder: FrameDecoder,
    state: ConnectionState,
}

impl<T: Transport> ConnectionManager<T> {
    /// Create a manager in the `Disconnected` state
    ///
    /// # Arguments
    ///
    /// * `transport` - Pub/sub transport
    /// * `topic` - Topic filter subscribed on every connect
    /// * `decoder` - Decoder for matching messages
    pub fn new(transport: T, topic: impl Into<String>, decoder: FrameDecoder) -> Self {
        Self {
            transport,
            topic: topic.into(),
            decoder,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Mark the connection attempt as started
    pub fn start(&mut self) {
        if self.state == ConnectionState::Disconnected {
            self.state = ConnectionState::Connecting;
            info!(topic = %self.topic, "Waiting for client connection");
        }
    }

    /// Wait for the next transport event
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        self.transport.next_event().await
    }

    /// Apply one transport event
    ///
    /// Close and error events never touch the store, so the last good frame
    /// stays visible while the transport reconnects.
    pub async fn handle_event(
        &mut self,
        event: TransportEvent,
        store: &mut TelemetryStore,
    ) -> EventOutcome {
        match event {
            TransportEvent::Connected => {
                self.state = ConnectionState::Connected;
                match self.transport.subscribe(&self.topic).await {
                    Ok(()) => {
                        info!(topic = %self.topic, "Client connected, subscribed");
                        EventOutcome::Subscribed { topic: self.topic.clone() }
                    }
                    Err(e) => {
                        warn!(topic = %self.topic, error = %e, "Subscribe failed");
                        self.state = ConnectionState::Error;
                        EventOutcome::SubscribeFailed(e.to_string())
                    }
                }
            }
            TransportEvent::Closed(reason) => {
                warn!(reason = %reason, "Connection lost");
                self.state = ConnectionState::Disconnected;
                EventOutcome::Closed(reason)
            }
            TransportEvent::Error(reason) => {
                warn!(reason = %reason, "Transport error");
                self.state = ConnectionState::Error;
                EventOutcome::Failed(reason)
            }
            TransportEvent::Message { topic, payload } => {
                if !topic_matches(&self.topic, &topic) {
                    debug!(topic = %topic, "Ignoring message on unsubscribed topic");
                    return EventOutcome::Ignored { topic };
                }

                match self.decoder.decode(&payload) {
                    Ok(frame) => {
                        let received_at = frame.received_at();
                        debug!(topic = %topic, bands = frame.readings().len(), "Frame received");
                        store.update(frame);
                        EventOutcome::FrameStored(received_at)
                    }
                    Err(e) => EventOutcome::FrameDropped(e),
                }
            }
        }
    }
}
