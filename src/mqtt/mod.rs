//! # MQTT Connection Module
//!
//! Resilient connection to the MQTT broker, built on rumqttc's synchronous
//! client.
//!
//! ## Why This Module Exists
//!
//! The broker client library offers no reconnect support when driven one
//! poll at a time. This module wraps it with:
//! - a link-state machine fed exclusively by broker events (connection
//!   acknowledgement and disconnect), never by publish or subscribe results
//! - automatic reconnection with a short lag window after failed attempts,
//!   avoiding a race against the out-of-band broker acknowledgement
//! - throttled failure logging so a broker outage of hours does not produce
//!   a log line per poll cycle
//! - re-subscription of the configured topic list on every successful
//!   connection
//!
//! All traffic is QoS 0, fire and forget; delivery guarantees beyond that
//! are out of scope.

pub mod config;
pub mod connection;

pub use config::BrokerConfig;
pub use connection::{ConnectionManager, Inbound, LinkState, WarnThrottle};
