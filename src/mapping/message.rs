//! Canonical, broker-agnostic representation of a command or status event.

use std::collections::HashMap;
use std::fmt;

/// A message in its internal representation.
///
/// A value is either a command (`is_command == true`) or a status event. All
/// characteristics are plain strings; a missing characteristic and an empty
/// string mean the same thing, so constructors normalize to empty strings and
/// there is no `Option` anywhere in this type.
///
/// Ownership is exclusive: a message sits in at most one queue at a time and
/// is consumed by whichever side pulls it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InternalMessage {
    pub is_command: bool,
    pub function: String,
    pub gateway: String,
    pub location: String,
    pub device: String,
    pub sender: String,
    pub action: String,
    /// Extra key/value pairs carried with the action. Values are strings.
    pub arguments: HashMap<String, String>,
}

impl InternalMessage {
    /// New command message with everything else empty.
    pub fn command() -> Self {
        Self {
            is_command: true,
            ..Self::default()
        }
    }

    /// New status message with everything else empty.
    pub fn status() -> Self {
        Self::default()
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = function.into();
        self
    }

    pub fn with_gateway(mut self, gateway: impl Into<String>) -> Self {
        self.gateway = gateway.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// Looks up an argument by key.
    pub fn argument(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).map(String::as_str)
    }

    /// Turns a received command into its reply.
    ///
    /// Flips the message to a status and records the outcome in the
    /// `response` and `reason` arguments. Using this for all replies keeps
    /// the reply syntax consistent across interfaces.
    pub fn reply(mut self, response: impl Into<String>, reason: impl Into<String>) -> Self {
        self.is_command = false;
        self.arguments.insert("response".to_owned(), response.into());
        self.arguments.insert("reason".to_owned(), reason.into());
        self
    }
}

impl fmt::Display for InternalMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type={} - function={} - gateway={} - location={} - device={} - sender={} - action={} - arguments={:?}",
            if self.is_command { "C" } else { "S" },
            self.function,
            self.gateway,
            self.location,
            self.device,
            self.sender,
            self.action,
            self.arguments
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_fields() {
        let msg = InternalMessage::command()
            .with_function("lighting")
            .with_location("office")
            .with_action("light_on");
        assert!(msg.is_command);
        assert_eq!(msg.function, "lighting");
        assert_eq!(msg.location, "office");
        assert_eq!(msg.action, "light_on");
        assert_eq!(msg.gateway, "");
        assert!(msg.arguments.is_empty());
    }

    #[test]
    fn reply_flips_command_and_records_outcome() {
        let cmd = InternalMessage::command()
            .with_action("set_level")
            .with_argument("level", "40");
        let reply = cmd.reply("OK", "level applied");
        assert!(!reply.is_command);
        assert_eq!(reply.argument("response"), Some("OK"));
        assert_eq!(reply.argument("reason"), Some("level applied"));
        assert_eq!(reply.argument("level"), Some("40"));
    }

    #[test]
    fn argument_lookup_misses_return_none() {
        let msg = InternalMessage::status();
        assert_eq!(msg.argument("missing"), None);
    }
}
