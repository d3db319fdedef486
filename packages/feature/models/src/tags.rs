//! Free-form tag collections in their serialized `"key"=>"value"` form.
//!
//! The feature tables store every tag that has no dedicated column in a
//! single `other_tags` text column, written as comma-separated quoted pairs:
//!
//! ```text
//! "amenity"=>"parking","access"=>"yes"
//! ```
//!
//! Parsing relies on the exact delimiter grammar rather than general CSV
//! rules: the outer quotes are stripped, pairs are split on `","` and each
//! pair is split on `"=>"`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Separator between two quoted pairs, once the outer quotes are stripped.
const PAIR_SEPARATOR: &str = "\",\"";

/// Separator between a quoted key and its quoted value.
const KEY_VALUE_SEPARATOR: &str = "\"=>\"";

/// Errors produced when tag text does not follow the serialized grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagParseError {
    /// The text does not start and end with a double quote.
    #[error("tag text is not quoted: {text}")]
    Unquoted {
        /// The offending text.
        text: String,
    },

    /// A pair did not split into exactly one key and one value.
    #[error("malformed tag pair: {pair}")]
    MalformedPair {
        /// The offending pair, with surrounding quotes removed.
        pair: String,
    },
}

/// A mapping from tag key to tag value.
///
/// Absent tags are represented by key absence, never by a null value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TagCollection(BTreeMap<String, String>);

impl TagCollection {
    /// Creates an empty tag collection.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Parses serialized tag text.
    ///
    /// Empty text yields an empty collection.
    ///
    /// # Errors
    ///
    /// Returns [`TagParseError`] if the text is not wrapped in quotes or any
    /// pair does not contain exactly one key/value separator.
    pub fn parse(text: &str) -> Result<Self, TagParseError> {
        if text.is_empty() {
            return Ok(Self::new());
        }

        let inner = text
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .ok_or_else(|| TagParseError::Unquoted {
                text: text.to_string(),
            })?;

        let mut tags = BTreeMap::new();

        for pair in inner.split(PAIR_SEPARATOR) {
            let mut parts = pair.split(KEY_VALUE_SEPARATOR);
            match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) => {
                    tags.insert(key.to_string(), value.to_string());
                }
                _ => {
                    return Err(TagParseError::MalformedPair {
                        pair: pair.to_string(),
                    });
                }
            }
        }

        Ok(Self(tags))
    }

    /// Parses optional tag text, treating `None` as an empty collection.
    ///
    /// # Errors
    ///
    /// Returns [`TagParseError`] if the text is present but malformed.
    pub fn parse_optional(text: Option<&str>) -> Result<Self, TagParseError> {
        text.map_or_else(|| Ok(Self::new()), Self::parse)
    }

    /// Serializes the collection back into `"key"=>"value"` text.
    #[must_use]
    pub fn to_tag_text(&self) -> String {
        self.0
            .iter()
            .map(|(key, value)| quoted_pair(key, value))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Returns the value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Number of tags in the collection.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the collection holds no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagCollection {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Renders a single `"key"=>"value"` pair exactly as it appears in tag text.
///
/// Tag predicates match this literal text inside the serialized column, so
/// `"shop"=>"mall"` does not match a feature tagged `"shop"=>"mall_annex"`.
#[must_use]
pub fn quoted_pair(key: &str, value: &str) -> String {
    format!("\"{key}{KEY_VALUE_SEPARATOR}{value}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiple_pairs() {
        let tags = TagCollection::parse(r#""amenity"=>"parking","access"=>"yes""#).unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags.get("amenity"), Some("parking"));
        assert_eq!(tags.get("access"), Some("yes"));
    }

    #[test]
    fn parses_single_pair() {
        let tags = TagCollection::parse(r#""shop"=>"mall""#).unwrap();
        assert_eq!(tags.get("shop"), Some("mall"));
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn keeps_commas_inside_values() {
        let tags = TagCollection::parse(r#""opening_hours"=>"Mo,Tu 08:00-12:00","name:en"=>"X""#)
            .unwrap();
        assert_eq!(tags.get("opening_hours"), Some("Mo,Tu 08:00-12:00"));
        assert_eq!(tags.get("name:en"), Some("X"));
    }

    #[test]
    fn allows_empty_values() {
        let tags = TagCollection::parse(r#""note"=>"""#).unwrap();
        assert_eq!(tags.get("note"), Some(""));
    }

    #[test]
    fn absent_text_is_empty() {
        assert!(TagCollection::parse_optional(None).unwrap().is_empty());
        assert!(TagCollection::parse("").unwrap().is_empty());
    }

    #[test]
    fn round_trips_through_tag_text() {
        let tags: TagCollection = [("amenity", "parking"), ("access", "yes")]
            .into_iter()
            .collect();
        let text = tags.to_tag_text();
        assert_eq!(text, r#""access"=>"yes","amenity"=>"parking""#);
        assert_eq!(TagCollection::parse(&text).unwrap(), tags);
    }

    #[test]
    fn rejects_unquoted_text() {
        let err = TagCollection::parse("amenity=>parking").unwrap_err();
        assert!(matches!(err, TagParseError::Unquoted { .. }));
    }

    #[test]
    fn rejects_pair_without_separator() {
        let err = TagCollection::parse(r#""amenity"=>"parking","broken""#).unwrap_err();
        assert_eq!(
            err,
            TagParseError::MalformedPair {
                pair: "broken".to_string()
            }
        );
    }

    #[test]
    fn rejects_lone_quote() {
        assert!(TagCollection::parse("\"").is_err());
    }

    #[test]
    fn quoted_pair_matches_serialized_form() {
        assert_eq!(quoted_pair("railway", "tram_stop"), r#""railway"=>"tram_stop""#);
        let text = r#""shop"=>"mall_annex""#;
        assert!(!text.contains(&quoted_pair("shop", "mall")));
    }
}
