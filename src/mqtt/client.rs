//! MQTT transport backed by `rumqttc`
//!
//! The rumqttc event loop runs in its own task and forwards lifecycle and
//! publish events over a bounded channel. Reconnection is left to rumqttc:
//! after a failure the task waits `reconnect_delay_ms` and polls again.

use async_trait::async_trait;
use rand::Rng;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, NetworkOptions, Packet, QoS,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use super::transport::{Transport, TransportEvent};
use crate::config::MqttConfig;
use crate::error::{Result, SpectroError};

/// Default port for `mqtt://` URLs without one
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Default port for `ws://` URLs without one
pub const DEFAULT_WS_PORT: u16 = 80;

/// Default port for `wss://` URLs without one
pub const DEFAULT_WSS_PORT: u16 = 443;

/// Capacity of rumqttc's outgoing request queue
const REQUEST_CAPACITY: usize = 10;

/// Broker endpoint parsed from `mqtt.broker_url`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerAddress {
    /// Plain TCP (`mqtt://host[:port]`)
    Tcp { host: String, port: u16 },
    /// WebSocket (`ws://host[:port][/path]`); rumqttc dials the whole URL
    Ws { url: String, port: u16 },
    /// WebSocket over TLS with the platform root certificates
    Wss { url: String, port: u16 },
}

impl BrokerAddress {
    /// Parse a broker URL
    ///
    /// Supports:
    /// - mqtt://localhost:1883
    /// - mqtt://public.cloud.shiftr.io:1883/
    /// - ws://broker.emqx.io:8083/mqtt
    /// - wss://public.cloud.shiftr.io
    ///
    /// # Errors
    ///
    /// Returns `SpectroError::BrokerUrl` for unknown schemes, a missing host
    /// or an invalid port
    pub fn parse(url: &str) -> Result<Self> {
        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| SpectroError::BrokerUrl(format!("{} (missing scheme)", url)))?;

        let default_port = match scheme {
            "mqtt" => DEFAULT_MQTT_PORT,
            "ws" => DEFAULT_WS_PORT,
            "wss" => DEFAULT_WSS_PORT,
            other => {
                return Err(SpectroError::BrokerUrl(format!(
                    "{} (unsupported scheme {}, expected mqtt, ws or wss)",
                    url, other
                )))
            }
        };

        let authority = rest.split('/').next().unwrap_or_default();
        if authority.is_empty() {
            return Err(SpectroError::BrokerUrl(format!("{} (missing host)", url)));
        }

        let (host, port) = match authority.split_once(':') {
            Some((host, port_str)) => {
                let port = port_str.parse::<u16>().map_err(|_| {
                    SpectroError::BrokerUrl(format!("{} (invalid port {})", url, port_str))
                })?;
                (host, port)
            }
            None => (authority, default_port),
        };

        if host.is_empty() {
            return Err(SpectroError::BrokerUrl(format!("{} (missing host)", url)));
        }

        Ok(match scheme {
            "mqtt" => Self::Tcp {
                host: host.to_string(),
                port,
            },
            "ws" => Self::Ws {
                url: url.to_string(),
                port,
            },
            _ => Self::Wss {
                url: url.to_string(),
                port,
            },
        })
    }

    fn mqtt_options(&self, client_id: String) -> MqttOptions {
        match self {
            Self::Tcp { host, port } => MqttOptions::new(client_id, host.clone(), *port),
            Self::Ws { url, port } => {
                let mut options = MqttOptions::new(client_id, url.clone(), *port);
                options.set_transport(rumqttc::Transport::Ws);
                options
            }
            Self::Wss { url, port } => {
                let mut options = MqttOptions::new(client_id, url.clone(), *port);
                options.set_transport(rumqttc::Transport::wss_with_default_config());
                options
            }
        }
    }
}

/// MQTT transport
pub struct MqttTransport {
    client: AsyncClient,
    client_id: String,
    qos: QoS,
    events: mpsc::Receiver<TransportEvent>,
    _event_loop_handle: JoinHandle<()>,
}

impl std::fmt::Debug for MqttTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttTransport")
            .field("client_id", &self.client_id)
            .field("qos", &self.qos)
            .finish_non_exhaustive()
    }
}

impl MqttTransport {
    /// Start connecting to the configured broker
    ///
    /// Returns immediately; the outcome arrives as a `Connected` or `Error`
    /// event. Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the broker URL cannot be parsed
    pub fn connect(config: &MqttConfig) -> Result<Self> {
        let address = BrokerAddress::parse(&config.broker_url)?;
        let client_id = unique_client_id(&config.client_id_prefix);

        info!(
            broker = %config.broker_url,
            client_id = %client_id,
            clean_session = config.clean_session,
            "Connecting to MQTT broker"
        );

        let mut options = address.mqtt_options(client_id.clone());
        options.set_keep_alive(Duration::from_secs(config.keep_alive_s));
        options.set_clean_session(config.clean_session);
        if let Some(username) = &config.username {
            options.set_credentials(username.clone(), config.password.clone().unwrap_or_default());
        }

        let (client, mut event_loop) = AsyncClient::new(options, REQUEST_CAPACITY);
        event_loop.set_network_options(network_options(config));
        let (tx, rx) = mpsc::channel(config.event_capacity);

        let pump = EventPump {
            event_loop,
            events: tx,
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
            connected: false,
        };
        let event_loop_handle = tokio::spawn(pump.run());

        Ok(Self {
            client,
            client_id,
            qos: qos_from_level(config.qos),
            events: rx,
            _event_loop_handle: event_loop_handle,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

#[async_trait]
impl Transport for MqttTransport {
    async fn subscribe(&mut self, topic: &str) -> Result<()> {
        self.client
            .subscribe(topic, self.qos)
            .await
            .map_err(|e| SpectroError::Transport(format!("Failed to subscribe to {}: {}", topic, e)))?;

        debug!(topic = topic, qos = ?self.qos, "Subscription requested");
        Ok(())
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }
}

/// Drives the rumqttc event loop and translates notifications
struct EventPump {
    event_loop: EventLoop,
    events: mpsc::Sender<TransportEvent>,
    reconnect_delay: Duration,
    connected: bool,
}

impl EventPump {
    async fn run(mut self) {
        info!("MQTT event loop started");

        loop {
            let event = self.poll_event().await;
            let failed = matches!(event, TransportEvent::Closed(_) | TransportEvent::Error(_));

            if self.events.send(event).await.is_err() {
                debug!("Event receiver dropped, stopping MQTT event loop");
                break;
            }

            if failed {
                sleep(self.reconnect_delay).await;
            }
        }
    }

    /// Poll until something worth reporting happens
    ///
    /// Connect attempts are bounded by the network options' connection
    /// timeout and fail with `NetworkTimeout`.
    async fn poll_event(&mut self) -> TransportEvent {
        loop {
            match self.event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        self.connected = true;
                        return TransportEvent::Connected;
                    }
                    return TransportEvent::Error(format!("broker refused connection: {:?}", ack.code));
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    return TransportEvent::Message {
                        topic: publish.topic,
                        payload: publish.payload,
                    };
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    self.connected = false;
                    return TransportEvent::Closed("broker sent disconnect".to_string());
                }
                Ok(notification) => {
                    debug!("MQTT notification: {:?}", notification);
                }
                Err(e) => {
                    error!("MQTT connection error: {}", e);
                    if std::mem::take(&mut self.connected) {
                        return TransportEvent::Closed(e.to_string());
                    }
                    return TransportEvent::Error(e.to_string());
                }
            }
        }
    }
}

/// rumqttc network options carrying the configured connect timeout
fn network_options(config: &MqttConfig) -> NetworkOptions {
    let mut options = NetworkOptions::new();
    options.set_connection_timeout(connection_timeout_secs(config.connect_timeout_ms));
    options
}

/// rumqttc counts the connect timeout in whole seconds; round up
fn connection_timeout_secs(timeout_ms: u64) -> u64 {
    timeout_ms.div_ceil(1000).max(1)
}

/// Map a numeric QoS level (validated to 0..=2) to rumqttc's enum
fn qos_from_level(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        _ => QoS::ExactlyOnce,
    }
}

/// Client id with a random numeric suffix so several viewers can share a broker
fn unique_client_id(prefix: &str) -> String {
    let suffix: u32 = rand::rng().random_range(0..1_000_000);
    format!("{}-{}", prefix, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// CONNACK, session not present, return code 0 (accepted)
    const CONNACK_ACCEPTED: [u8; 4] = [0x20, 0x02, 0x00, 0x00];

    /// CONNACK, return code 5 (not authorized)
    const CONNACK_NOT_AUTHORIZED: [u8; 4] = [0x20, 0x02, 0x00, 0x05];

    /// DISCONNECT
    const DISCONNECT: [u8; 2] = [0xE0, 0x00];

    fn local_config(port: u16) -> MqttConfig {
        MqttConfig {
            broker_url: format!("mqtt://127.0.0.1:{}", port),
            client_id_prefix: "spectro-viewer-test".to_string(),
            topic: "spectrometer".to_string(),
            qos: 0,
            clean_session: true,
            connect_timeout_ms: 1000,
            keep_alive_s: 30,
            reconnect_delay_ms: 300,
            event_capacity: 8,
            username: None,
            password: None,
        }
    }

    async fn local_broker() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    /// Accept one client and consume its CONNECT packet
    async fn accept_client(listener: &TcpListener) -> TcpStream {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 256];
        let n = socket.read(&mut buf).await.unwrap();
        assert!(n > 0);
        assert_eq!(buf[0] >> 4, 1, "expected CONNECT");
        socket
    }

    async fn next_event(transport: &mut MqttTransport) -> TransportEvent {
        tokio::time::timeout(Duration::from_secs(5), transport.next_event())
            .await
            .expect("no transport event within 5 s")
            .expect("event stream ended")
    }

    #[test]
    fn test_parse_tcp_url() {
        assert_eq!(
            BrokerAddress::parse("mqtt://localhost:1883").unwrap(),
            BrokerAddress::Tcp { host: "localhost".to_string(), port: 1883 }
        );
        assert_eq!(
            BrokerAddress::parse("mqtt://192.168.1.100:8883").unwrap(),
            BrokerAddress::Tcp { host: "192.168.1.100".to_string(), port: 8883 }
        );

        // Default port
        assert_eq!(
            BrokerAddress::parse("mqtt://broker.local").unwrap(),
            BrokerAddress::Tcp { host: "broker.local".to_string(), port: DEFAULT_MQTT_PORT }
        );

        // Trailing slash
        assert_eq!(
            BrokerAddress::parse("mqtt://public.cloud.shiftr.io:1883/").unwrap(),
            BrokerAddress::Tcp { host: "public.cloud.shiftr.io".to_string(), port: 1883 }
        );
    }

    #[test]
    fn test_parse_websocket_urls() {
        assert_eq!(
            BrokerAddress::parse("ws://broker.emqx.io:8083/mqtt").unwrap(),
            BrokerAddress::Ws { url: "ws://broker.emqx.io:8083/mqtt".to_string(), port: 8083 }
        );
        assert_eq!(
            BrokerAddress::parse("ws://test.mosquitto.org").unwrap(),
            BrokerAddress::Ws { url: "ws://test.mosquitto.org".to_string(), port: DEFAULT_WS_PORT }
        );
        assert_eq!(
            BrokerAddress::parse("wss://public.cloud.shiftr.io").unwrap(),
            BrokerAddress::Wss {
                url: "wss://public.cloud.shiftr.io".to_string(),
                port: DEFAULT_WSS_PORT
            }
        );
    }

    #[test]
    fn test_ws_options_keep_whole_url() {
        let address = BrokerAddress::parse("ws://broker.emqx.io:8083/mqtt").unwrap();
        let options = address.mqtt_options("viewer-1".to_string());
        assert_eq!(
            options.broker_address(),
            ("ws://broker.emqx.io:8083/mqtt".to_string(), 8083)
        );
        assert!(matches!(options.transport(), rumqttc::Transport::Ws));
    }

    #[test]
    fn test_parse_broker_url_errors() {
        for url in [
            "localhost:1883",
            "http://localhost",
            "mqtts://localhost",
            "mqtt://localhost:notaport",
            "mqtt://",
            "mqtt://:1883",
            "ws:///mqtt",
        ] {
            assert!(
                matches!(BrokerAddress::parse(url), Err(SpectroError::BrokerUrl(_))),
                "{} should be rejected",
                url
            );
        }
    }

    #[test]
    fn test_connection_timeout_rounds_up() {
        assert_eq!(connection_timeout_secs(1), 1);
        assert_eq!(connection_timeout_secs(1000), 1);
        assert_eq!(connection_timeout_secs(1500), 2);
        assert_eq!(connection_timeout_secs(10000), 10);

        let mut config = local_config(1883);
        config.connect_timeout_ms = 10000;
        assert_eq!(network_options(&config).connection_timeout(), 10);
    }

    #[test]
    fn test_qos_from_level() {
        assert_eq!(qos_from_level(0), QoS::AtMostOnce);
        assert_eq!(qos_from_level(1), QoS::AtLeastOnce);
        assert_eq!(qos_from_level(2), QoS::ExactlyOnce);
    }

    #[test]
    fn test_unique_client_id() {
        let id = unique_client_id("spectro-viewer");
        let suffix = id.strip_prefix("spectro-viewer-").unwrap();
        let value: u64 = suffix.parse().unwrap();
        assert!(value < 1_000_000);
    }

    #[tokio::test]
    async fn test_silent_broker_hits_configured_timeout() {
        let (listener, port) = local_broker().await;
        let mut transport = MqttTransport::connect(&local_config(port)).unwrap();

        let started = Instant::now();
        // Accept but never answer the CONNECT
        let _socket = accept_client(&listener).await;
        let event = next_event(&mut transport).await;
        let elapsed = started.elapsed();

        assert!(matches!(event, TransportEvent::Error(_)), "got {:?}", event);
        assert!(elapsed >= Duration::from_millis(900), "gave up after {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(3000), "gave up after {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_close_before_connack_is_error() {
        let (listener, port) = local_broker().await;
        let mut transport = MqttTransport::connect(&local_config(port)).unwrap();

        let (socket, _) = listener.accept().await.unwrap();
        drop(socket);

        let event = next_event(&mut transport).await;
        assert!(matches!(event, TransportEvent::Error(_)), "got {:?}", event);
    }

    #[tokio::test]
    async fn test_refused_connack_is_error() {
        let (listener, port) = local_broker().await;
        let mut transport = MqttTransport::connect(&local_config(port)).unwrap();

        let mut socket = accept_client(&listener).await;
        socket.write_all(&CONNACK_NOT_AUTHORIZED).await.unwrap();

        let event = next_event(&mut transport).await;
        assert!(matches!(event, TransportEvent::Error(_)), "got {:?}", event);
    }

    #[tokio::test]
    async fn test_connack_then_publish() {
        let (listener, port) = local_broker().await;
        let mut transport = MqttTransport::connect(&local_config(port)).unwrap();

        let mut socket = accept_client(&listener).await;
        socket.write_all(&CONNACK_ACCEPTED).await.unwrap();
        assert!(matches!(next_event(&mut transport).await, TransportEvent::Connected));

        // QoS 0 PUBLISH "spectrometer" -> "1,2,3"
        let mut publish = vec![0x30, 19, 0x00, 12];
        publish.extend_from_slice(b"spectrometer");
        publish.extend_from_slice(b"1,2,3");
        socket.write_all(&publish).await.unwrap();

        match next_event(&mut transport).await {
            TransportEvent::Message { topic, payload } => {
                assert_eq!(topic, "spectrometer");
                assert_eq!(&payload[..], b"1,2,3");
            }
            other => panic!("expected message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_broker_disconnect_is_closed() {
        let (listener, port) = local_broker().await;
        let mut transport = MqttTransport::connect(&local_config(port)).unwrap();

        let mut socket = accept_client(&listener).await;
        socket.write_all(&CONNACK_ACCEPTED).await.unwrap();
        assert!(matches!(next_event(&mut transport).await, TransportEvent::Connected));

        socket.write_all(&DISCONNECT).await.unwrap();
        let event = next_event(&mut transport).await;
        assert!(matches!(event, TransportEvent::Closed(_)), "got {:?}", event);
    }

    #[tokio::test]
    async fn test_lost_connection_is_closed_then_retried_after_delay() {
        let (listener, port) = local_broker().await;
        let mut transport = MqttTransport::connect(&local_config(port)).unwrap();

        let mut socket = accept_client(&listener).await;
        socket.write_all(&CONNACK_ACCEPTED).await.unwrap();
        assert!(matches!(next_event(&mut transport).await, TransportEvent::Connected));

        drop(socket);
        let event = next_event(&mut transport).await;
        assert!(matches!(event, TransportEvent::Closed(_)), "got {:?}", event);
        let closed_at = Instant::now();

        // rumqttc reconnects once the reconnect delay has passed
        let mut socket = accept_client(&listener).await;
        assert!(closed_at.elapsed() >= Duration::from_millis(250));

        socket.write_all(&CONNACK_ACCEPTED).await.unwrap();
        assert!(matches!(next_event(&mut transport).await, TransportEvent::Connected));
    }

    // Integration test - needs a broker listening on localhost:1883
    #[tokio::test]
    #[ignore] // Run with: cargo test -- --ignored
    async fn test_connect_to_local_broker() {
        let mut config = local_config(DEFAULT_MQTT_PORT);
        config.connect_timeout_ms = 2000;

        let mut transport = MqttTransport::connect(&config).unwrap();
        match transport.next_event().await {
            Some(TransportEvent::Connected) => {
                assert!(transport.subscribe("spectrometer").await.is_ok());
            }
            other => println!("No local broker available ({:?})", other),
        }
    }
}
