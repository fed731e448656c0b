//! Whole-message conversion between broker wire format and [`InternalMessage`].

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::mapping::error::MapError;
use crate::mapping::message::InternalMessage;
use crate::mapping::token_map::{MapKind, TokenMap};

/// The 8 mapped fields, in topic order followed by the payload fields.
const FIELDS: [&str; 8] = [
    "function", "gateway", "location", "device", "sender", "action", "argkey", "argvalue",
];

/// Raw map data as read from a JSON map file.
///
/// Every field is optional at the serde level so that construction of a
/// [`MessageMap`] can report exactly which key is missing instead of failing
/// with a generic parse error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapData {
    pub root: Option<String>,
    pub topics: Option<Vec<String>>,
    pub function: Option<FieldSpec>,
    pub gateway: Option<FieldSpec>,
    pub location: Option<FieldSpec>,
    pub device: Option<FieldSpec>,
    pub sender: Option<FieldSpec>,
    pub action: Option<FieldSpec>,
    pub argkey: Option<FieldSpec>,
    pub argvalue: Option<FieldSpec>,
}

/// Mapping declaration for a single field.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    pub maptype: MapKind,
    #[serde(default)]
    pub map: Option<HashMap<String, Vec<String>>>,
}

impl FieldSpec {
    /// A field declared as pass-through.
    pub fn none() -> Self {
        Self {
            maptype: MapKind::None,
            map: None,
        }
    }
}

impl MapData {
    /// Map data that translates nothing, with root and topics taken from the
    /// configuration instead of a map file.
    pub fn no_map(root: impl Into<String>, topics: Vec<String>) -> Self {
        Self {
            root: Some(root.into()),
            topics: Some(topics),
            function: Some(FieldSpec::none()),
            gateway: Some(FieldSpec::none()),
            location: Some(FieldSpec::none()),
            device: Some(FieldSpec::none()),
            sender: Some(FieldSpec::none()),
            action: Some(FieldSpec::none()),
            argkey: Some(FieldSpec::none()),
            argvalue: Some(FieldSpec::none()),
        }
    }

    /// Parses map data from JSON text.
    pub fn from_json(text: &str) -> Result<Self, MapError> {
        serde_json::from_str(text).map_err(|err| MapError::InvalidMap(err.to_string()))
    }

    fn field(&self, name: &str) -> Option<&FieldSpec> {
        match name {
            "function" => self.function.as_ref(),
            "gateway" => self.gateway.as_ref(),
            "location" => self.location.as_ref(),
            "device" => self.device.as_ref(),
            "sender" => self.sender.as_ref(),
            "action" => self.action.as_ref(),
            "argkey" => self.argkey.as_ref(),
            "argvalue" => self.argvalue.as_ref(),
            _ => None,
        }
    }
}

/// Owns one [`TokenMap`] per field plus the topic root and subscription list.
///
/// Built once at startup and read-only afterwards, so it can be shared across
/// threads behind an `Arc` without locking. Construction is the only place
/// where the map data is validated; a constructed map is internally
/// consistent.
#[derive(Debug)]
pub struct MessageMap {
    root: String,
    topics: Vec<String>,
    own_sender: String,
    function: TokenMap,
    gateway: TokenMap,
    location: TokenMap,
    device: TokenMap,
    sender: TokenMap,
    action: TokenMap,
    argkey: TokenMap,
    argvalue: TokenMap,
}

impl MessageMap {
    /// Validates the map data and builds the translator.
    ///
    /// `own_sender` is the identity this gateway publishes under; it is
    /// substituted for empty senders on encode and used for echo suppression.
    pub fn new(data: MapData, own_sender: impl Into<String>) -> Result<Self, MapError> {
        let root = data
            .root
            .clone()
            .ok_or_else(|| MapError::InvalidMap("no key <root>".to_owned()))?;
        let topics = data
            .topics
            .clone()
            .ok_or_else(|| MapError::InvalidMap("no key <topics>".to_owned()))?;

        let mut maps = Vec::with_capacity(FIELDS.len());
        for name in FIELDS {
            let spec = data
                .field(name)
                .ok_or_else(|| MapError::InvalidMap(format!("no key <{name}>")))?;
            let map = match (spec.maptype, &spec.map) {
                (MapKind::None, _) => TokenMap::passthrough(),
                (kind, Some(aliases)) => TokenMap::new(kind, aliases),
                (_, None) => {
                    return Err(MapError::InvalidMap(format!(
                        "<{name}> object has no child <map>"
                    )))
                }
            };
            maps.push(map);
        }
        // Order matches FIELDS.
        let mut maps = maps.into_iter();
        Ok(Self {
            root,
            topics,
            own_sender: own_sender.into(),
            function: maps.next().unwrap_or_default(),
            gateway: maps.next().unwrap_or_default(),
            location: maps.next().unwrap_or_default(),
            device: maps.next().unwrap_or_default(),
            sender: maps.next().unwrap_or_default(),
            action: maps.next().unwrap_or_default(),
            argkey: maps.next().unwrap_or_default(),
            argvalue: maps.next().unwrap_or_default(),
        })
    }

    /// The topic root used when encoding.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// The subscription patterns the connection should subscribe to.
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// The identity used for echo suppression and as default sender.
    pub fn own_sender(&self) -> &str {
        &self.own_sender
    }

    /// Converts a broker message into an internal one.
    pub fn decode(&self, topic: &str, payload: &[u8]) -> Result<InternalMessage, MapError> {
        let tokens: Vec<&str> = topic.split('/').collect();
        if tokens.len() != 7 {
            return Err(MapError::MalformedTopic(topic.to_owned()));
        }

        let text = std::str::from_utf8(payload)
            .map_err(|err| MapError::MalformedPayload(err.to_string()))?;

        // A payload opening with a brace is a JSON object holding the action
        // and extra arguments, anything else is a bare action string.
        let (raw_action, raw_args) = if text.starts_with('{') {
            let mut object: serde_json::Map<String, Value> = serde_json::from_str(text)
                .map_err(|err| MapError::MalformedPayload(format!("<{text}>: {err}")))?;
            let action = object
                .remove("action")
                .ok_or_else(|| MapError::MissingAction(text.to_owned()))?;
            (value_to_string(&action), object)
        } else {
            (text.to_owned(), serde_json::Map::new())
        };

        let function = self.function.to_internal(tokens[1])?;
        let gateway = self.gateway.to_internal(tokens[2])?;
        let location = self.location.to_internal(tokens[3])?;
        let device = self.device.to_internal(tokens[4])?;
        let sender = self.sender.to_internal(tokens[5])?;
        let action = self.action.to_internal(&raw_action)?;
        let mut arguments = HashMap::new();
        for (key, value) in &raw_args {
            arguments.insert(
                self.argkey.to_internal(key)?,
                self.argvalue.to_internal(&value_to_string(value))?,
            );
        }

        let is_command = match tokens[6] {
            "C" => true,
            "S" => false,
            _ => return Err(MapError::UnknownMessageType(topic.to_owned())),
        };

        debug!("Decoded message from topic <{}>", topic);
        Ok(InternalMessage {
            is_command,
            function,
            gateway,
            location,
            device,
            sender,
            action,
            arguments,
        })
    }

    /// Converts an internal message into a broker topic and payload.
    pub fn encode(&self, msg: &InternalMessage) -> Result<(String, Vec<u8>), MapError> {
        let function = self.function.to_broker(&msg.function)?;
        let gateway = self.gateway.to_broker(&msg.gateway)?;
        let location = self.location.to_broker(&msg.location)?;
        let device = self.device.to_broker(&msg.device)?;
        let mut sender = self.sender.to_broker(&msg.sender)?;
        if sender.is_empty() {
            sender = self.own_sender.clone();
        }
        let action = self.action.to_broker(&msg.action)?;
        let mut arguments = serde_json::Map::new();
        for (key, value) in &msg.arguments {
            arguments.insert(
                self.argkey.to_broker(key)?,
                Value::String(self.argvalue.to_broker(value)?),
            );
        }

        let topic = format!(
            "{}/{}/{}/{}/{}/{}/{}",
            self.root,
            function,
            gateway,
            location,
            device,
            sender,
            if msg.is_command { "C" } else { "S" }
        );

        let payload = if arguments.is_empty() {
            action.into_bytes()
        } else {
            if !action.is_empty() {
                arguments.insert("action".to_owned(), Value::String(action));
            }
            serde_json::to_vec(&arguments)
                .map_err(|err| MapError::PayloadEncode(err.to_string()))?
        };

        Ok((topic, payload))
    }
}

/// Renders a JSON value as the argument string it stands for.
///
/// Arguments are strings by contract, but a sender may legally write bare
/// numbers or booleans in the payload, so scalars are rendered rather than
/// rejected.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
