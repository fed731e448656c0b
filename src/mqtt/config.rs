//! Broker connection parameters.

use serde::Deserialize;

/// Connection parameters for the MQTT broker, the `[broker]` section of the
/// configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    /// Keep-alive interval in seconds.
    pub keepalive: u64,
    /// Client identifier sent to the broker. Empty means "use the
    /// application name".
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Upper bound of a single network poll, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 1883,
            keepalive: 60,
            client_id: String::new(),
            username: None,
            password: None,
            timeout_ms: 500,
        }
    }
}

impl BrokerConfig {
    /// The client identifier to use, falling back to the application name.
    pub fn effective_client_id(&self, app_name: &str) -> String {
        if self.client_id.is_empty() {
            app_name.to_owned()
        } else {
            self.client_id.clone()
        }
    }
}
