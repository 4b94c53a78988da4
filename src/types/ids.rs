use super::ValidationError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use uuid::Uuid;

/// Strong typing for IDs with phantom types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Id<T> {
    value: String,
    _phantom: PhantomData<T>,
}

/// Marker types for different ID kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentMarker;

/// Type aliases for specific ID types
pub type PageId = Id<PageMarker>;
pub type DatabaseId = Id<DatabaseMarker>;
pub type UserId = Id<UserMarker>;
pub type CommentId = Id<CommentMarker>;

impl<T> Id<T> {
    /// Parse various Notion ID formats into a normalized ID
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = NotionId::parse(input)?;
        Ok(Self {
            value: normalized.as_str().to_string(),
            _phantom: PhantomData,
        })
    }

    /// Get the ID as a string reference
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Get the ID with dashes for API calls
    pub fn to_hyphenated(&self) -> String {
        hyphenate(&self.value)
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.value.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Id::parse(&value).map_err(serde::de::Error::custom)
    }
}

/// NotionId - A general-purpose Notion ID that can represent any object
///
/// Stored internally in the non-hyphenated 32-hex-character form; the
/// hyphenated UUID form is produced on demand for API paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotionId(String);

impl NotionId {
    /// Returns the canonical non-hyphenated ID.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the hyphenated UUID format for API compatibility.
    pub fn to_hyphenated(&self) -> String {
        hyphenate(&self.0)
    }

    /// Creates a NotionId from a validated hex string.
    fn from_hex(hex: &str) -> Result<Self, ValidationError> {
        if hex.len() == 32 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(NotionId(hex.to_lowercase()))
        } else {
            Err(ValidationError::InvalidId(format!(
                "Invalid Notion ID format: {}",
                hex
            )))
        }
    }

    /// Parses various Notion ID formats.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let cleaned = input.trim().trim_end_matches('/');

        // 1. UUID format with dashes
        if let Ok(uuid) = Uuid::parse_str(cleaned) {
            return Ok(NotionId(uuid.as_simple().to_string()));
        }

        // 2. Direct 32-char hex ID
        if cleaned.len() == 32 && cleaned.chars().all(|c| c.is_ascii_hexdigit()) {
            return Self::from_hex(cleaned);
        }

        // 3. Extract from URLs
        if cleaned.contains("notion") {
            return Self::extract_from_url(cleaned);
        }

        Err(ValidationError::InvalidId(format!(
            "Could not parse Notion ID from: {}",
            input
        )))
    }

    /// Extracts ID from Notion URLs.
    fn extract_from_url(url: &str) -> Result<Self, ValidationError> {
        lazy_static::lazy_static! {
            static ref ID_REGEX: Regex = Regex::new(
                r"(?:[/-])([a-fA-F0-9]{32}|[a-fA-F0-9]{8}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{12})(?:[/?#]|$)"
            ).expect("Notion ID regex is statically valid");
        }

        if let Some(captures) = ID_REGEX.captures(url) {
            if let Some(id_match) = captures.get(1) {
                let id = id_match.as_str().replace('-', "");
                return Self::from_hex(&id);
            }
        }

        Err(ValidationError::InvalidId(format!(
            "No valid ID found in URL: {}",
            url
        )))
    }
}

impl fmt::Display for NotionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for NotionId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NotionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NotionId::parse(&s).map_err(serde::de::Error::custom)
    }
}

// Conversions from specific ID types to NotionId
impl<T> From<Id<T>> for NotionId {
    fn from(id: Id<T>) -> Self {
        NotionId(id.as_str().to_string())
    }
}

impl<T> From<&Id<T>> for NotionId {
    fn from(id: &Id<T>) -> Self {
        NotionId(id.as_str().to_string())
    }
}

fn hyphenate(value: &str) -> String {
    if value.len() == 32 && !value.contains('-') {
        format!(
            "{}-{}-{}-{}-{}",
            &value[0..8],
            &value[8..12],
            &value[12..16],
            &value[16..20],
            &value[20..32]
        )
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_parsing() {
        // Direct ID
        let id = NotionId::parse("550e8400e29b41d4a716446655440000").unwrap();
        assert_eq!(id.as_str(), "550e8400e29b41d4a716446655440000");

        // Dashed UUID
        let id = NotionId::parse("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(id.as_str(), "550e8400e29b41d4a716446655440000");

        // URL
        let id =
            NotionId::parse("https://www.notion.so/Test-Page-550e8400e29b41d4a716446655440000")
                .unwrap();
        assert_eq!(id.as_str(), "550e8400e29b41d4a716446655440000");
    }

    #[test]
    fn test_invalid_ids() {
        assert!(NotionId::parse("too-short").is_err());
        assert!(NotionId::parse("not-hex-chars-00000000000000000").is_err());
        assert!(NotionId::parse("").is_err());
    }

    #[test]
    fn test_to_hyphenated() {
        let id = PageId::parse("550e8400e29b41d4a716446655440000").unwrap();
        assert_eq!(id.to_hyphenated(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn test_typed_id_conversion() {
        let page = PageId::parse("550e8400e29b41d4a716446655440000").unwrap();
        let general: NotionId = (&page).into();
        assert_eq!(general.as_str(), page.as_str());
    }
}
