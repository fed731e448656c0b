//! mqttbridge: a gateway core between an MQTT broker and a device interface.
//!
//! Messages on the broker side are a 7-token topic plus a text payload;
//! internally they are [`mapping::InternalMessage`] values. The crate maps
//! between the two representations, keeps the broker connection alive, and
//! shuttles messages between the broker and an interface adapter through two
//! queues.

pub mod adapters;
pub mod config;
pub mod dispatch;
pub mod mapping;
pub mod mqtt;
pub mod queue;

/// The application name, used as default client identifier and as the
/// default sender identity for echo suppression.
pub const APP_NAME: &str = "mqttbridge";
