//! Per-field keyword translation between broker and internal representation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::mapping::error::MapError;

/// How a token map treats tokens that are not in its dictionary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapKind {
    /// Pass every token through unchanged.
    #[default]
    None,
    /// Translate known tokens, pass unknown ones through unchanged.
    Loose,
    /// Translate known tokens, fail on unknown ones.
    Strict,
}

/// Bidirectional keyword translator for a single message field.
///
/// Built from a dictionary mapping each internal keyword to a list of broker
/// keywords. The first broker keyword of the list is the canonical one used
/// for the internal-to-broker direction; every keyword of the list resolves
/// back to the internal one, so the remaining entries act as aliases.
#[derive(Debug, Clone, Default)]
pub struct TokenMap {
    kind: MapKind,
    to_broker: HashMap<String, String>,
    to_internal: HashMap<String, String>,
}

impl TokenMap {
    /// A map that leaves every token unchanged in both directions.
    pub fn passthrough() -> Self {
        Self::default()
    }

    /// Builds a map of the given kind from an alias dictionary.
    ///
    /// An empty dictionary degrades to a pass-through map whatever the kind,
    /// since there is nothing to translate. Entries with an empty alias list
    /// are skipped.
    pub fn new(kind: MapKind, aliases: &HashMap<String, Vec<String>>) -> Self {
        if kind == MapKind::None || aliases.is_empty() {
            return Self::passthrough();
        }
        let mut to_broker = HashMap::new();
        let mut to_internal = HashMap::new();
        for (internal, broker_words) in aliases {
            let Some(canonical) = broker_words.first() else {
                continue;
            };
            to_broker.insert(internal.clone(), canonical.clone());
            for word in broker_words {
                to_internal.insert(word.clone(), internal.clone());
            }
        }
        Self {
            kind,
            to_broker,
            to_internal,
        }
    }

    pub fn kind(&self) -> MapKind {
        self.kind
    }

    /// Converts a broker keyword into its internal representation.
    pub fn to_internal(&self, token: &str) -> Result<String, MapError> {
        self.translate(token, &self.to_internal)
    }

    /// Converts an internal keyword into its broker representation.
    pub fn to_broker(&self, token: &str) -> Result<String, MapError> {
        self.translate(token, &self.to_broker)
    }

    fn translate(&self, token: &str, dict: &HashMap<String, String>) -> Result<String, MapError> {
        match self.kind {
            MapKind::None => Ok(token.to_owned()),
            MapKind::Loose => Ok(dict
                .get(token)
                .cloned()
                .unwrap_or_else(|| token.to_owned())),
            MapKind::Strict => {
                // An empty token means "no value" and is kept as such, it is
                // not an unknown keyword.
                if token.is_empty() {
                    return Ok(String::new());
                }
                dict.get(token)
                    .cloned()
                    .ok_or_else(|| MapError::UnknownToken(token.to_owned()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aliases() -> HashMap<String, Vec<String>> {
        let mut dict = HashMap::new();
        dict.insert(
            "office".to_owned(),
            vec!["study".to_owned(), "den".to_owned()],
        );
        dict.insert("kitchen".to_owned(), vec!["kitchen".to_owned()]);
        dict
    }

    #[test]
    fn none_passes_everything_through() {
        let map = TokenMap::passthrough();
        assert_eq!(map.to_internal("anything").unwrap(), "anything");
        assert_eq!(map.to_broker("anything").unwrap(), "anything");
        assert_eq!(map.to_internal("").unwrap(), "");
    }

    #[test]
    fn loose_translates_known_and_keeps_unknown() {
        let map = TokenMap::new(MapKind::Loose, &aliases());
        assert_eq!(map.to_broker("office").unwrap(), "study");
        assert_eq!(map.to_internal("den").unwrap(), "office");
        assert_eq!(map.to_internal("garage").unwrap(), "garage");
        assert_eq!(map.to_broker("").unwrap(), "");
    }

    #[test]
    fn strict_translates_known_and_fails_unknown() {
        let map = TokenMap::new(MapKind::Strict, &aliases());
        assert_eq!(map.to_broker("office").unwrap(), "study");
        assert_eq!(map.to_internal("study").unwrap(), "office");
        let err = map.to_internal("garage").unwrap_err();
        assert!(matches!(err, MapError::UnknownToken(t) if t == "garage"));
    }

    #[test]
    fn strict_keeps_empty_token_without_lookup() {
        let map = TokenMap::new(MapKind::Strict, &aliases());
        assert_eq!(map.to_internal("").unwrap(), "");
        assert_eq!(map.to_broker("").unwrap(), "");
    }

    #[test]
    fn all_aliases_resolve_but_first_is_canonical() {
        let map = TokenMap::new(MapKind::Strict, &aliases());
        assert_eq!(map.to_internal("study").unwrap(), "office");
        assert_eq!(map.to_internal("den").unwrap(), "office");
        assert_eq!(map.to_broker("office").unwrap(), "study");
    }

    #[test]
    fn empty_dictionary_degrades_to_passthrough() {
        let map = TokenMap::new(MapKind::Strict, &HashMap::new());
        assert_eq!(map.kind(), MapKind::None);
        assert_eq!(map.to_internal("anything").unwrap(), "anything");
    }
}
