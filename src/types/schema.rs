use super::PropertyValue;
use crate::error::ClientError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// The closed table of property types this client understands.
///
/// Adding support for a new remote type means adding a variant here and a
/// row in the codec's decode/encode tables — a table edit, not a new
/// conditional scattered through the codebase. A remote type without a
/// variant is a `SchemaError` at decode time, never a silent drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    Title,
    RichText,
    Number,
    Select,
    MultiSelect,
    Status,
    Date,
    People,
    Relation,
    Url,
    Email,
    PhoneNumber,
    Files,
    Checkbox,
    Formula,
    Rollup,
    CreatedTime,
    CreatedBy,
    LastEditedTime,
    LastEditedBy,
}

impl PropertyKind {
    /// Every supported kind, in table order.
    pub const ALL: &'static [PropertyKind] = &[
        PropertyKind::Title,
        PropertyKind::RichText,
        PropertyKind::Number,
        PropertyKind::Select,
        PropertyKind::MultiSelect,
        PropertyKind::Status,
        PropertyKind::Date,
        PropertyKind::People,
        PropertyKind::Relation,
        PropertyKind::Url,
        PropertyKind::Email,
        PropertyKind::PhoneNumber,
        PropertyKind::Files,
        PropertyKind::Checkbox,
        PropertyKind::Formula,
        PropertyKind::Rollup,
        PropertyKind::CreatedTime,
        PropertyKind::CreatedBy,
        PropertyKind::LastEditedTime,
        PropertyKind::LastEditedBy,
    ];

    /// Look up a remote type tag in the table.
    pub fn from_remote(tag: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_remote() == tag)
    }

    /// The remote type tag for this kind.
    pub fn as_remote(&self) -> &'static str {
        match self {
            PropertyKind::Title => "title",
            PropertyKind::RichText => "rich_text",
            PropertyKind::Number => "number",
            PropertyKind::Select => "select",
            PropertyKind::MultiSelect => "multi_select",
            PropertyKind::Status => "status",
            PropertyKind::Date => "date",
            PropertyKind::People => "people",
            PropertyKind::Relation => "relation",
            PropertyKind::Url => "url",
            PropertyKind::Email => "email",
            PropertyKind::PhoneNumber => "phone_number",
            PropertyKind::Files => "files",
            PropertyKind::Checkbox => "checkbox",
            PropertyKind::Formula => "formula",
            PropertyKind::Rollup => "rollup",
            PropertyKind::CreatedTime => "created_time",
            PropertyKind::CreatedBy => "created_by",
            PropertyKind::LastEditedTime => "last_edited_time",
            PropertyKind::LastEditedBy => "last_edited_by",
        }
    }

    /// Choice kinds carry an enumerated option set in the schema.
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            PropertyKind::Select | PropertyKind::MultiSelect | PropertyKind::Status
        )
    }

    /// Read-only kinds: the service computes these, writes are rejected.
    pub fn is_computed(&self) -> bool {
        matches!(
            self,
            PropertyKind::Formula
                | PropertyKind::Rollup
                | PropertyKind::CreatedTime
                | PropertyKind::CreatedBy
                | PropertyKind::LastEditedTime
                | PropertyKind::LastEditedBy
        )
    }

    /// Kinds whose values are ordered sequences.
    pub fn is_multi_valued(&self) -> bool {
        matches!(
            self,
            PropertyKind::MultiSelect
                | PropertyKind::People
                | PropertyKind::Relation
                | PropertyKind::Files
        )
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_remote())
    }
}

/// Declared type of a single schema property, plus the enumerated option
/// labels for choice kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySpec {
    pub kind: PropertyKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl PropertySpec {
    pub fn new(kind: PropertyKind) -> Self {
        Self {
            kind,
            options: Vec::new(),
        }
    }

    pub fn with_options(kind: PropertyKind, options: Vec<String>) -> Self {
        Self { kind, options }
    }
}

/// A database's declared property schema.
///
/// Property names are unique and case-sensitive; insertion order is
/// preserved so exports keep the column order the database shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSchema {
    properties: IndexMap<String, PropertySpec>,
}

impl RecordSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion for tests and schema construction.
    pub fn with(mut self, name: impl Into<String>, kind: PropertyKind) -> Self {
        self.properties.insert(name.into(), PropertySpec::new(kind));
        self
    }

    /// Builder-style insertion with an option set for choice kinds.
    pub fn with_options(
        mut self,
        name: impl Into<String>,
        kind: PropertyKind,
        options: Vec<String>,
    ) -> Self {
        self.properties
            .insert(name.into(), PropertySpec::with_options(kind, options));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, spec: PropertySpec) {
        self.properties.insert(name.into(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&PropertySpec> {
        self.properties.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertySpec)> {
        self.properties.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.properties.keys()
    }

    /// The name of the title property, if the schema declares one.
    pub fn title_property(&self) -> Option<&str> {
        self.properties
            .iter()
            .find(|(_, spec)| spec.kind == PropertyKind::Title)
            .map(|(name, _)| name.as_str())
    }

    /// Parse a database's `properties` object into a schema.
    ///
    /// Unknown property types surface as `SchemaError` naming the type;
    /// a schema with an unreadable property is worse than no schema.
    pub fn from_remote(properties: &Value) -> Result<Self, ClientError> {
        let map = properties.as_object().ok_or_else(|| {
            ClientError::Malformed("database 'properties' is not an object".to_string())
        })?;

        let mut schema = RecordSchema::new();
        for (name, config) in map {
            let tag = config
                .get("type")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ClientError::Malformed(format!(
                        "property '{}' has no type tag",
                        name
                    ))
                })?;

            let kind = PropertyKind::from_remote(tag).ok_or_else(|| ClientError::Schema {
                property_type: tag.to_string(),
            })?;

            let options = if kind.is_choice() {
                config
                    .get(tag)
                    .and_then(|c| c.get("options"))
                    .and_then(Value::as_array)
                    .map(|opts| {
                        opts.iter()
                            .filter_map(|o| o.get("name").and_then(Value::as_str))
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default()
            } else {
                Vec::new()
            };

            schema.insert(name.clone(), PropertySpec { kind, options });
        }
        Ok(schema)
    }

    /// Render the schema as the service's database `properties` payload,
    /// used when creating a database.
    pub fn to_remote(&self) -> Value {
        let mut out = serde_json::Map::new();
        for (name, spec) in &self.properties {
            let tag = spec.kind.as_remote();
            let config = if spec.kind.is_choice() {
                let options: Vec<Value> = spec
                    .options
                    .iter()
                    .map(|label| json!({ "name": label, "color": "default" }))
                    .collect();
                json!({ (tag): { "options": options } })
            } else {
                json!({ (tag): {} })
            };
            out.insert(name.clone(), config);
        }
        Value::Object(out)
    }

    /// Check that a value is writable under this schema: the property must
    /// exist, must not be computed, and the value's kind must match the
    /// declared kind. Choice membership is the codec's job.
    pub fn validate_value(
        &self,
        name: &str,
        value: &PropertyValue,
    ) -> Result<(), ClientError> {
        let spec = self.get(name).ok_or_else(|| {
            ClientError::validation(format!(
                "property '{}' does not exist in the target schema",
                name
            ))
        })?;

        if spec.kind.is_computed() {
            return Err(ClientError::validation(format!(
                "property '{}' is computed ({}) and cannot be written",
                name, spec.kind
            )));
        }

        if value.kind() != spec.kind {
            return Err(ClientError::validation(format!(
                "property '{}' is declared as {} but the value is {}",
                name,
                spec.kind,
                value.kind()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_table_is_closed_and_bijective() {
        for kind in PropertyKind::ALL {
            assert_eq!(PropertyKind::from_remote(kind.as_remote()), Some(*kind));
        }
        assert_eq!(PropertyKind::from_remote("button"), None);
        assert_eq!(PropertyKind::from_remote("verification"), None);
    }

    #[test]
    fn schema_from_remote_parses_options() {
        let raw = serde_json::json!({
            "Status": {
                "id": "a1b2",
                "type": "select",
                "select": { "options": [
                    { "name": "Geplant", "color": "blue" },
                    { "name": "Fertig", "color": "green" }
                ]}
            },
            "Name": { "id": "title", "type": "title", "title": {} }
        });

        let schema = RecordSchema::from_remote(&raw).unwrap();
        assert_eq!(schema.len(), 2);
        let status = schema.get("Status").unwrap();
        assert_eq!(status.kind, PropertyKind::Select);
        assert_eq!(status.options, vec!["Geplant", "Fertig"]);
        assert_eq!(schema.title_property(), Some("Name"));
    }

    #[test]
    fn schema_from_remote_rejects_unknown_type() {
        let raw = serde_json::json!({
            "Magic": { "id": "x", "type": "button", "button": {} }
        });
        let err = RecordSchema::from_remote(&raw).unwrap_err();
        match err {
            ClientError::Schema { property_type } => assert_eq!(property_type, "button"),
            other => panic!("expected SchemaError, got {:?}", other),
        }
    }

    #[test]
    fn validate_value_enforces_kind_and_mutability() {
        let schema = RecordSchema::new()
            .with("Name", PropertyKind::Title)
            .with("Total", PropertyKind::Formula);

        assert!(schema
            .validate_value("Name", &PropertyValue::Title("ok".into()))
            .is_ok());
        assert!(schema
            .validate_value("Name", &PropertyValue::Number(Some(1.0)))
            .is_err());
        assert!(schema
            .validate_value("Missing", &PropertyValue::Title("x".into()))
            .is_err());
        assert!(schema
            .validate_value(
                "Total",
                &PropertyValue::Computed {
                    origin: PropertyKind::Formula,
                    value: crate::types::ComputedValue::Number(1.0),
                }
            )
            .is_err());
    }
}
