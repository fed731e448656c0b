//! Error definitions for the mapping module.

use thiserror::Error;

/// Failure modes of map construction and message translation.
///
/// `InvalidMap` is only produced while building a [`super::MessageMap`] and is
/// fatal for the application. All other variants occur per message during
/// `decode`/`encode` and are recovered by the dispatch loop, which drops the
/// offending message.
#[derive(Debug, Error)]
pub enum MapError {
    /// The map data is missing a required key or is otherwise unusable.
    #[error("invalid map data: {0}")]
    InvalidMap(String),

    /// A strict token map was asked to translate a token it does not know.
    #[error("token <{0}> not found in map")]
    UnknownToken(String),

    /// The topic does not split into exactly 7 tokens.
    #[error("topic <{0}> has not the right number of tokens")]
    MalformedTopic(String),

    /// The payload is not valid UTF-8 or not a valid JSON object.
    #[error("bad format for payload: {0}")]
    MalformedPayload(String),

    /// A JSON payload carries no `action` key.
    #[error("no action found in payload <{0}>")]
    MissingAction(String),

    /// The type token of the topic is neither `C` nor `S`.
    #[error("type in topic <{0}> not recognised")]
    UnknownMessageType(String),

    /// The outgoing argument table could not be serialised.
    #[error("error serialising arguments: {0}")]
    PayloadEncode(String),
}
