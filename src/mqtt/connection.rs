//! Connection lifecycle management on top of the rumqttc client.
//!
//! The synchronous rumqttc client has no reconnect support of its own when
//! driven one poll at a time, so this module adds it: the link state is
//! tracked from broker events only, reconnect attempts are gated by a short
//! lag window to avoid racing the broker acknowledgement, and failure
//! reporting is throttled so a sustained outage does not flood the log.

use std::time::{Duration, Instant};

use rumqttc::{
    Client, ConnectReturnCode, Connection, Event, MqttOptions, Packet, QoS, SubscribeFilter,
};
use tracing::{debug, info, warn};

use super::config::BrokerConfig;

/// Lag before reconnect attempts resume after a failed one. Testing the
/// connection again too early races the asynchronous broker acknowledgement
/// and can jam the connection process.
pub const RACE_LAG: Duration = Duration::from_millis(500);

/// Minimum interval between two reconnect-failure warnings.
pub const WARN_COOLDOWN: Duration = Duration::from_secs(60);

/// Explicit reconnect timer state, evaluated on every poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// The broker acknowledged the connection.
    Connected,
    /// A connect attempt just failed, hold off until the lag elapses.
    AwaitingLag { until: Instant },
    /// Down, and the next poll may attempt a reconnect.
    ReadyToRetry,
}

impl LinkState {
    pub fn new() -> Self {
        Self::ReadyToRetry
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Records a failed connect or reconnect attempt, shutting the gate for
    /// [`RACE_LAG`].
    pub fn on_attempt_failed(&mut self, now: Instant) {
        *self = Self::AwaitingLag {
            until: now + RACE_LAG,
        };
    }

    /// Records the broker acknowledgement of a successful connection.
    pub fn on_connected(&mut self) {
        *self = Self::Connected;
    }

    /// Records a broker-notified disconnection. The gate stays open, the
    /// next poll may retry immediately.
    pub fn on_disconnected(&mut self) {
        *self = Self::ReadyToRetry;
    }

    /// Whether the network may be polled now.
    ///
    /// Polling while disconnected doubles as the reconnect attempt, so this
    /// is the reconnect gate: it is shut only during the lag window, and once
    /// the window elapses it stays open until the next failed attempt.
    pub fn may_poll(&mut self, now: Instant) -> bool {
        match *self {
            Self::Connected | Self::ReadyToRetry => true,
            Self::AwaitingLag { until } => {
                if now >= until {
                    *self = Self::ReadyToRetry;
                    true
                } else {
                    false
                }
            }
        }
    }
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new()
    }
}

/// Rate limiter for failure warnings during a sustained outage.
#[derive(Debug)]
pub struct WarnThrottle {
    cooldown: Duration,
    last: Option<Instant>,
}

impl WarnThrottle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last: None,
        }
    }

    /// True when a warning may be emitted now; records the emission.
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.duration_since(last) < self.cooldown => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// A message received from the broker, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Wraps the rumqttc client and connection with state tracking, automatic
/// reconnection and subscription management.
///
/// All state lives with the owner of this value; broker events arrive over
/// the rumqttc event channel and are consumed here, never through callbacks
/// mutating shared fields.
pub struct ConnectionManager {
    client: Client,
    connection: Connection,
    topics: Vec<String>,
    state: LinkState,
    throttle: WarnThrottle,
}

impl ConnectionManager {
    /// Builds the client and starts the connection state machine. The actual
    /// network connection is established by the first poll.
    pub fn new(cfg: &BrokerConfig, client_id: &str, topics: Vec<String>) -> Self {
        debug!(
            "Broker client for {}:{}, keepalive {}s, client id <{}>",
            cfg.host, cfg.port, cfg.keepalive, client_id
        );
        let mut options = MqttOptions::new(client_id, &cfg.host, cfg.port);
        options.set_keep_alive(Duration::from_secs(cfg.keepalive));
        if let (Some(username), Some(password)) = (&cfg.username, &cfg.password) {
            options.set_credentials(username, password);
        }
        let (client, connection) = Client::new(options, 100);
        Self {
            client,
            connection,
            topics,
            state: LinkState::new(),
            throttle: WarnThrottle::new(WARN_COOLDOWN),
        }
    }

    /// A cloned client handle for publishing from other tasks.
    pub fn handle(&self) -> Client {
        self.client.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Drives the connection for one cycle, handling at most one broker
    /// event, and returns a received message if that is what arrived.
    ///
    /// While the link is down, polling is what attempts the reconnect; while
    /// the lag gate is shut the call sleeps out the timeout instead, so the
    /// calling loop keeps its pacing without hammering the broker.
    pub fn poll(&mut self, timeout: Duration) -> Option<Inbound> {
        if !self.state.may_poll(Instant::now()) {
            std::thread::sleep(timeout);
            return None;
        }
        match self.connection.recv_timeout(timeout) {
            Ok(Ok(Event::Incoming(Packet::ConnAck(ack)))) => {
                if ack.code == ConnectReturnCode::Success {
                    info!("Connected to broker");
                    self.state.on_connected();
                    self.subscribe_all();
                } else {
                    info!("Connection refused by broker: {:?}", ack.code);
                }
                None
            }
            Ok(Ok(Event::Incoming(Packet::Publish(publish)))) => Some(Inbound {
                topic: publish.topic,
                payload: publish.payload.to_vec(),
            }),
            Ok(Ok(Event::Incoming(Packet::Disconnect))) => {
                info!("Broker closed the connection");
                self.state.on_disconnected();
                None
            }
            Ok(Ok(_)) => None,
            Ok(Err(err)) => {
                self.state.on_attempt_failed(Instant::now());
                if self.throttle.ready(Instant::now()) {
                    warn!("Cannot reach broker: {}", err);
                } else {
                    debug!("Cannot reach broker (throttled): {}", err);
                }
                None
            }
            // No event within the timeout.
            Err(_) => None,
        }
    }

    /// Re-subscribes the configured topic list. Called on every successful
    /// connection; a lost session is recovered by the next reconnect cycle
    /// passing through here again.
    fn subscribe_all(&mut self) {
        if self.topics.is_empty() {
            debug!("No topics to subscribe to");
            return;
        }
        let filters: Vec<SubscribeFilter> = self
            .topics
            .iter()
            .map(|topic| SubscribeFilter::new(topic.clone(), QoS::AtMostOnce))
            .collect();
        match self.client.subscribe_many(filters) {
            Ok(()) => debug!("Subscribed to {:?}", self.topics),
            Err(err) => info!("Topic subscription error: {}", err),
        }
    }

    /// Asks the broker client to disconnect, unblocking the network loop.
    pub fn disconnect(&self) {
        if let Err(err) = self.client.disconnect() {
            debug!("Disconnect request failed: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_starts_down_and_pollable() {
        let mut state = LinkState::new();
        assert!(!state.is_connected());
        assert!(state.may_poll(Instant::now()));
    }

    #[test]
    fn failed_attempt_shuts_the_gate_for_the_lag() {
        let mut state = LinkState::new();
        let start = Instant::now();
        state.on_attempt_failed(start);
        assert!(!state.may_poll(start));
        assert!(!state.may_poll(start + RACE_LAG / 2));
        assert!(state.may_poll(start + RACE_LAG));
        // Once open the gate stays open.
        assert!(state.may_poll(start + RACE_LAG));
        assert_eq!(state, LinkState::ReadyToRetry);
    }

    #[test]
    fn connection_ack_opens_the_gate_permanently() {
        let mut state = LinkState::new();
        state.on_attempt_failed(Instant::now());
        state.on_connected();
        assert!(state.is_connected());
        assert!(state.may_poll(Instant::now()));
    }

    #[test]
    fn broker_disconnect_allows_immediate_retry() {
        let mut state = LinkState::new();
        state.on_connected();
        state.on_disconnected();
        assert!(!state.is_connected());
        assert!(state.may_poll(Instant::now()));
    }

    #[test]
    fn throttle_lets_first_warning_through() {
        let mut throttle = WarnThrottle::new(WARN_COOLDOWN);
        assert!(throttle.ready(Instant::now()));
    }

    #[test]
    fn throttle_suppresses_within_cooldown() {
        let mut throttle = WarnThrottle::new(WARN_COOLDOWN);
        let start = Instant::now();
        assert!(throttle.ready(start));
        assert!(!throttle.ready(start + Duration::from_secs(1)));
        assert!(!throttle.ready(start + WARN_COOLDOWN - Duration::from_millis(1)));
        assert!(throttle.ready(start + WARN_COOLDOWN));
    }
}
