use super::{NotionId, PropertyKind, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A date or date-range value.
///
/// Start and end are kept as the service's ISO-8601 strings (date or
/// datetime) rather than parsed `chrono` values, so a decode→encode round
/// trip is byte-faithful; [`DateRange::validate`] still insists the strings
/// parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl DateRange {
    /// A single date with no end and no explicit zone.
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: None,
            time_zone: None,
        }
    }

    /// Checks that start (and end, when present) are ISO-8601 dates or
    /// datetimes.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_iso_date(&self.start)?;
        if let Some(end) = &self.end {
            validate_iso_date(end)?;
        }
        Ok(())
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 datetime.
fn validate_iso_date(value: &str) -> Result<(), ValidationError> {
    if chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
        return Ok(());
    }
    if chrono::DateTime::parse_from_rfc3339(value).is_ok() {
        return Ok(());
    }
    Err(ValidationError::InvalidDate {
        value: value.to_string(),
        reason: "expected YYYY-MM-DD or an RFC 3339 datetime".to_string(),
    })
}

/// Reference to a workspace user.
///
/// Identity is the `id`; the display `name` is service-derived metadata
/// that is dropped on encode and therefore does not survive a
/// decode→encode round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRef {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl fmt::Display for PersonRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "User {}", self.id),
        }
    }
}

/// Reference to an attached file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub name: String,
    pub url: String,
}

/// Result of a read-only computed property (formula, rollup, timestamps,
/// authorship). Decoded for display, never encoded back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ComputedValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Date(DateRange),
    People(Vec<PersonRef>),
    /// The computation produced no value (e.g. an empty rollup).
    Empty,
}

/// The simplified internal property value model.
///
/// Every variant carries enough type information to be re-encoded without
/// loss. Remote metadata the simplified model discards — select option
/// colors and ids, rich-text annotations, file expiry times — does NOT
/// survive a decode→encode round trip; that loss is intentional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// The page title. Plain text; annotations are flattened on decode.
    Title(String),
    /// A rich_text property, flattened to plain text.
    Text(String),
    Number(Option<f64>),
    Checkbox(bool),
    Date(Option<DateRange>),
    /// Single-choice select, by option label.
    Select(Option<String>),
    /// Single-choice status, by option label.
    Status(Option<String>),
    /// Multi-choice, ordered by the remote sequence.
    MultiSelect(Vec<String>),
    People(Vec<PersonRef>),
    /// Related page ids, ordered.
    Relation(Vec<NotionId>),
    Url(Option<String>),
    Email(Option<String>),
    PhoneNumber(Option<String>),
    Files(Vec<FileRef>),
    /// Read-only result of a computed property. `origin` preserves which
    /// remote type produced it so `kind()` stays faithful.
    Computed {
        origin: PropertyKind,
        value: ComputedValue,
    },
}

impl PropertyValue {
    /// The property kind this value encodes as.
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::Title(_) => PropertyKind::Title,
            PropertyValue::Text(_) => PropertyKind::RichText,
            PropertyValue::Number(_) => PropertyKind::Number,
            PropertyValue::Checkbox(_) => PropertyKind::Checkbox,
            PropertyValue::Date(_) => PropertyKind::Date,
            PropertyValue::Select(_) => PropertyKind::Select,
            PropertyValue::Status(_) => PropertyKind::Status,
            PropertyValue::MultiSelect(_) => PropertyKind::MultiSelect,
            PropertyValue::People(_) => PropertyKind::People,
            PropertyValue::Relation(_) => PropertyKind::Relation,
            PropertyValue::Url(_) => PropertyKind::Url,
            PropertyValue::Email(_) => PropertyKind::Email,
            PropertyValue::PhoneNumber(_) => PropertyKind::PhoneNumber,
            PropertyValue::Files(_) => PropertyKind::Files,
            PropertyValue::Computed { origin, .. } => *origin,
        }
    }

    /// Whether this value is read-only (cannot be sent in a write).
    pub fn is_computed(&self) -> bool {
        matches!(self, PropertyValue::Computed { .. })
    }

    /// Flattens the value to display text. Multi-valued kinds join with
    /// `", "`; empty values flatten to the empty string.
    pub fn as_plain_text(&self) -> String {
        match self {
            PropertyValue::Title(s) | PropertyValue::Text(s) => s.clone(),
            PropertyValue::Number(Some(n)) => format_number(*n),
            PropertyValue::Number(None) => String::new(),
            PropertyValue::Checkbox(b) => b.to_string(),
            PropertyValue::Date(Some(d)) => match &d.end {
                Some(end) => format!("{} → {}", d.start, end),
                None => d.start.clone(),
            },
            PropertyValue::Date(None) => String::new(),
            PropertyValue::Select(v) | PropertyValue::Status(v) => {
                v.clone().unwrap_or_default()
            }
            PropertyValue::MultiSelect(labels) => labels.join(", "),
            PropertyValue::People(people) => people
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            PropertyValue::Relation(ids) => ids
                .iter()
                .map(|id| id.to_hyphenated())
                .collect::<Vec<_>>()
                .join(", "),
            PropertyValue::Url(v)
            | PropertyValue::Email(v)
            | PropertyValue::PhoneNumber(v) => v.clone().unwrap_or_default(),
            PropertyValue::Files(files) => files
                .iter()
                .map(|f| f.url.clone())
                .collect::<Vec<_>>()
                .join(", "),
            PropertyValue::Computed { value, .. } => match value {
                ComputedValue::Text(s) => s.clone(),
                ComputedValue::Number(n) => format_number(*n),
                ComputedValue::Bool(b) => b.to_string(),
                ComputedValue::Date(d) => d.start.clone(),
                ComputedValue::People(people) => people
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                ComputedValue::Empty => String::new(),
            },
        }
    }
}

/// Integral numbers print without a trailing `.0` so exported cells read
/// like the spreadsheet they came from.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
