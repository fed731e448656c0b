//! # Message Mapping Module
//!
//! Bridge between the MQTT representation of messages and the internal one.
//!
//! The MQTT syntax handled here is:
//!
//! ```text
//! topic:   root/function/gateway/location/device/sender/type-{C or S}
//! payload: action string, or a JSON object {"action": ..., "key": "value", ...}
//! ```
//!
//! ## Module Architecture
//!
//! ```text
//! mapping/
//! ├── message.rs      - InternalMessage, the canonical message type
//! ├── token_map.rs    - per-field keyword translation (none/loose/strict)
//! ├── message_map.rs  - whole message decode/encode plus map file loading
//! └── error.rs        - MapError
//! ```
//!
//! ## Design Philosophy
//!
//! - **Validate once**: all map data checks happen when the [`MessageMap`] is
//!   built; translation afterwards can only fail on per-message input.
//! - **Explicit failure paths**: every lookup that can miss returns a
//!   `Result` so callers decide whether a message is dropped or fatal.
//! - **Read-only sharing**: a built map never changes, both translation
//!   directions and all threads read the same instance.

pub mod error;
pub mod message;
pub mod message_map;
pub mod token_map;

pub use error::MapError;
pub use message::InternalMessage;
pub use message_map::{FieldSpec, MapData, MessageMap};
pub use token_map::{MapKind, TokenMap};
