// src/codec/mod.rs
//! Bidirectional property codec between the service's richly-typed
//! property model and the simplified internal [`PropertyValue`] model.
//!
//! The mapping is a closed table keyed by [`PropertyKind`]: each supported
//! remote type has exactly one decode row and (for writable kinds) one
//! encode row. A remote type missing from the table is a `SchemaError`
//! naming the type — properties are never silently dropped.
//!
//! Intentionally lossy on decode: select option colors and ids, rich-text
//! annotations, and file expiry times are discarded and do not survive a
//! decode→encode round trip. Everything else round-trips exactly,
//! including non-ASCII text.

use crate::error::ClientError;
use crate::types::{
    ComputedValue, DateRange, FileRef, NotionId, PersonRef, PropertyKind, PropertyValue,
    RecordSchema,
};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use std::collections::HashSet;

/// Write-time behavior toggles.
///
/// The service auto-creates unknown select/status options on write. That
/// is surprising enough to be opt-in: by default an unknown option label
/// is a validation failure, and nothing is sent.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeOptions {
    /// Allow labels not present in the schema's option set, letting the
    /// service create them.
    pub allow_new_options: bool,
}

// ---------------------------------------------------------------------------
// Decoding: remote property JSON → PropertyValue
// ---------------------------------------------------------------------------

/// Decode one property object, reading its `type` tag.
///
/// This is the entry point for decoding records returned by the service,
/// where each property value carries its own tag.
pub fn decode_property(raw: &Value) -> Result<(PropertyKind, PropertyValue), ClientError> {
    let tag = raw
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ClientError::Malformed("property value has no type tag".to_string()))?;

    let kind = PropertyKind::from_remote(tag).ok_or_else(|| ClientError::Schema {
        property_type: tag.to_string(),
    })?;

    Ok((kind, decode(kind, raw)?))
}

/// Decode a full `properties` object into an ordered name → value map.
pub fn decode_record(properties: &Value) -> Result<IndexMap<String, PropertyValue>, ClientError> {
    let map = properties
        .as_object()
        .ok_or_else(|| ClientError::Malformed("'properties' is not an object".to_string()))?;

    let mut record = IndexMap::with_capacity(map.len());
    for (name, raw) in map {
        let (_, value) = decode_property(raw)?;
        record.insert(name.clone(), value);
    }
    Ok(record)
}

/// Decode a property payload of a known kind. The table's decode half.
pub fn decode(kind: PropertyKind, raw: &Value) -> Result<PropertyValue, ClientError> {
    let null = Value::Null;
    let payload = raw.get(kind.as_remote()).unwrap_or(&null);

    let value = match kind {
        PropertyKind::Title => PropertyValue::Title(rich_text_to_plain(payload)),
        PropertyKind::RichText => PropertyValue::Text(rich_text_to_plain(payload)),
        PropertyKind::Number => PropertyValue::Number(payload.as_f64()),
        PropertyKind::Checkbox => PropertyValue::Checkbox(payload.as_bool().unwrap_or(false)),
        PropertyKind::Date => PropertyValue::Date(decode_date(payload)?),
        PropertyKind::Select => PropertyValue::Select(decode_option_name(payload)),
        PropertyKind::Status => PropertyValue::Status(decode_option_name(payload)),
        PropertyKind::MultiSelect => PropertyValue::MultiSelect(
            payload
                .as_array()
                .map(|opts| {
                    opts.iter()
                        .filter_map(|o| o.get("name").and_then(Value::as_str))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        ),
        PropertyKind::People => PropertyValue::People(decode_people(payload)),
        PropertyKind::Relation => {
            let mut ids = Vec::new();
            if let Some(entries) = payload.as_array() {
                for entry in entries {
                    let id = entry
                        .get("id")
                        .and_then(Value::as_str)
                        .ok_or_else(|| {
                            ClientError::Malformed(
                                "relation entry has no id".to_string(),
                            )
                        })?;
                    ids.push(NotionId::parse(id)?);
                }
            }
            PropertyValue::Relation(ids)
        }
        PropertyKind::Url => PropertyValue::Url(decode_opt_string(payload)),
        PropertyKind::Email => PropertyValue::Email(decode_opt_string(payload)),
        PropertyKind::PhoneNumber => PropertyValue::PhoneNumber(decode_opt_string(payload)),
        PropertyKind::Files => PropertyValue::Files(decode_files(payload)),
        PropertyKind::Formula => PropertyValue::Computed {
            origin: kind,
            value: decode_formula(payload)?,
        },
        PropertyKind::Rollup => PropertyValue::Computed {
            origin: kind,
            value: decode_rollup(payload)?,
        },
        PropertyKind::CreatedTime | PropertyKind::LastEditedTime => PropertyValue::Computed {
            origin: kind,
            value: match payload.as_str() {
                Some(ts) => ComputedValue::Date(DateRange::new(ts)),
                None => ComputedValue::Empty,
            },
        },
        PropertyKind::CreatedBy | PropertyKind::LastEditedBy => PropertyValue::Computed {
            origin: kind,
            value: match decode_person(payload) {
                Some(person) => ComputedValue::People(vec![person]),
                None => ComputedValue::Empty,
            },
        },
    };

    Ok(value)
}

/// Concatenate a rich-text array to plain text.
///
/// `plain_text` is preferred; the raw `text.content` is the fallback for
/// hand-built payloads that skipped it. Annotations are dropped here —
/// that is the documented lossy edge of the simplified model.
fn rich_text_to_plain(payload: &Value) -> String {
    payload
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    item.get("plain_text")
                        .and_then(Value::as_str)
                        .or_else(|| {
                            item.get("text")
                                .and_then(|t| t.get("content"))
                                .and_then(Value::as_str)
                        })
                        .unwrap_or("")
                })
                .collect::<Vec<_>>()
                .concat()
        })
        .unwrap_or_default()
}

fn decode_opt_string(payload: &Value) -> Option<String> {
    payload.as_str().map(str::to_string)
}

fn decode_option_name(payload: &Value) -> Option<String> {
    payload
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn decode_date(payload: &Value) -> Result<Option<DateRange>, ClientError> {
    if payload.is_null() {
        return Ok(None);
    }
    let start = payload
        .get("start")
        .and_then(Value::as_str)
        .ok_or_else(|| ClientError::Malformed("date value has no start".to_string()))?;

    let range = DateRange {
        start: start.to_string(),
        end: payload
            .get("end")
            .and_then(Value::as_str)
            .map(str::to_string),
        time_zone: payload
            .get("time_zone")
            .and_then(Value::as_str)
            .map(str::to_string),
    };
    range.validate()?;
    Ok(Some(range))
}

fn decode_person(payload: &Value) -> Option<PersonRef> {
    let id = payload.get("id").and_then(Value::as_str)?;
    Some(PersonRef {
        id: id.to_string(),
        name: payload
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

fn decode_people(payload: &Value) -> Vec<PersonRef> {
    payload
        .as_array()
        .map(|users| users.iter().filter_map(decode_person).collect())
        .unwrap_or_default()
}

fn decode_files(payload: &Value) -> Vec<FileRef> {
    payload
        .as_array()
        .map(|files| {
            files
                .iter()
                .filter_map(|file| {
                    let name = file.get("name").and_then(Value::as_str).unwrap_or("");
                    // External files carry the URL directly; service-hosted
                    // files nest it (with an expiry we discard).
                    let url = file
                        .get("external")
                        .or_else(|| file.get("file"))
                        .and_then(|f| f.get("url"))
                        .and_then(Value::as_str)?;
                    Some(FileRef {
                        name: name.to_string(),
                        url: url.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn decode_formula(payload: &Value) -> Result<ComputedValue, ClientError> {
    let tag = payload
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ClientError::Malformed("formula value has no type tag".to_string()))?;

    Ok(match tag {
        "string" => match payload.get("string").and_then(Value::as_str) {
            Some(s) => ComputedValue::Text(s.to_string()),
            None => ComputedValue::Empty,
        },
        "number" => match payload.get("number").and_then(Value::as_f64) {
            Some(n) => ComputedValue::Number(n),
            None => ComputedValue::Empty,
        },
        "boolean" => match payload.get("boolean").and_then(Value::as_bool) {
            Some(b) => ComputedValue::Bool(b),
            None => ComputedValue::Empty,
        },
        "date" => match decode_date(payload.get("date").unwrap_or(&Value::Null))? {
            Some(d) => ComputedValue::Date(d),
            None => ComputedValue::Empty,
        },
        other => {
            return Err(ClientError::Schema {
                property_type: format!("formula.{}", other),
            })
        }
    })
}

fn decode_rollup(payload: &Value) -> Result<ComputedValue, ClientError> {
    let tag = payload
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ClientError::Malformed("rollup value has no type tag".to_string()))?;

    Ok(match tag {
        "number" => match payload.get("number").and_then(Value::as_f64) {
            Some(n) => ComputedValue::Number(n),
            None => ComputedValue::Empty,
        },
        "date" => match decode_date(payload.get("date").unwrap_or(&Value::Null))? {
            Some(d) => ComputedValue::Date(d),
            None => ComputedValue::Empty,
        },
        // Rollup arrays flatten to display text; the aggregate is what
        // callers read, not the element structure.
        "array" => {
            let parts: Vec<String> = payload
                .get("array")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| {
                            decode_property(item).ok().map(|(_, v)| v.as_plain_text())
                        })
                        .collect()
                })
                .unwrap_or_default();
            if parts.is_empty() {
                ComputedValue::Empty
            } else {
                ComputedValue::Text(parts.join(", "))
            }
        }
        other => {
            return Err(ClientError::Schema {
                property_type: format!("rollup.{}", other),
            })
        }
    })
}

// ---------------------------------------------------------------------------
// Encoding: PropertyValue → remote property JSON
// ---------------------------------------------------------------------------

/// Encode a value as the service's write payload. The table's encode half.
///
/// Multi-valued kinds are de-duplicated by value identity, preserving
/// first-seen order. Computed values are rejected: the service owns them.
pub fn encode(value: &PropertyValue) -> Result<Value, ClientError> {
    let payload = match value {
        PropertyValue::Title(text) => json!({ "title": plain_to_rich_text(text) }),
        PropertyValue::Text(text) => json!({ "rich_text": plain_to_rich_text(text) }),
        PropertyValue::Number(n) => json!({ "number": n }),
        PropertyValue::Checkbox(b) => json!({ "checkbox": b }),
        PropertyValue::Date(range) => match range {
            Some(range) => {
                range.validate()?;
                json!({ "date": range })
            }
            None => json!({ "date": null }),
        },
        PropertyValue::Select(label) => match label {
            Some(label) => json!({ "select": { "name": label } }),
            None => json!({ "select": null }),
        },
        PropertyValue::Status(label) => match label {
            Some(label) => json!({ "status": { "name": label } }),
            None => json!({ "status": null }),
        },
        PropertyValue::MultiSelect(labels) => {
            let unique: Vec<Value> = dedup_preserving_order(labels.iter().cloned())
                .into_iter()
                .map(|label| json!({ "name": label }))
                .collect();
            json!({ "multi_select": unique })
        }
        PropertyValue::People(people) => {
            let unique: Vec<Value> =
                dedup_preserving_order(people.iter().map(|p| p.id.clone()))
                    .into_iter()
                    .map(|id| json!({ "object": "user", "id": id }))
                    .collect();
            json!({ "people": unique })
        }
        PropertyValue::Relation(ids) => {
            let unique: Vec<Value> =
                dedup_preserving_order(ids.iter().map(|id| id.to_hyphenated()))
                    .into_iter()
                    .map(|id| json!({ "id": id }))
                    .collect();
            json!({ "relation": unique })
        }
        PropertyValue::Url(v) => json!({ "url": v }),
        PropertyValue::Email(v) => json!({ "email": v }),
        PropertyValue::PhoneNumber(v) => json!({ "phone_number": v }),
        PropertyValue::Files(files) => {
            let mut seen = HashSet::new();
            let unique: Vec<Value> = files
                .iter()
                .filter(|file| seen.insert(file.url.clone()))
                .map(|file| {
                    json!({
                        "type": "external",
                        "name": file.name,
                        "external": { "url": file.url }
                    })
                })
                .collect();
            json!({ "files": unique })
        }
        PropertyValue::Computed { origin, .. } => {
            return Err(ClientError::validation(format!(
                "{} properties are computed by the service and cannot be written",
                origin
            )))
        }
    };

    Ok(payload)
}

/// Encode a named value against a schema: kind and mutability are checked,
/// and choice labels are validated against the enumerated option set.
pub fn encode_for_schema(
    name: &str,
    value: &PropertyValue,
    schema: &RecordSchema,
    options: &EncodeOptions,
) -> Result<Value, ClientError> {
    schema.validate_value(name, value)?;

    if !options.allow_new_options {
        let spec = schema.get(name).expect("validated above");
        if spec.kind.is_choice() && !spec.options.is_empty() {
            let check = |label: &str| -> Result<(), ClientError> {
                if spec.options.iter().any(|o| o == label) {
                    Ok(())
                } else {
                    Err(ClientError::validation(format!(
                        "'{}' is not an option of property '{}' (allowed: {})",
                        label,
                        name,
                        spec.options.join(", ")
                    )))
                }
            };
            match value {
                PropertyValue::Select(Some(label)) | PropertyValue::Status(Some(label)) => {
                    check(label)?
                }
                PropertyValue::MultiSelect(labels) => {
                    for label in labels {
                        check(label)?;
                    }
                }
                _ => {}
            }
        }
    }

    encode(value)
}

/// Encode a whole record for a write, validating every property first so
/// an invalid value fails before anything is sent.
pub fn encode_record(
    values: &IndexMap<String, PropertyValue>,
    schema: &RecordSchema,
    options: &EncodeOptions,
) -> Result<Value, ClientError> {
    let mut out = Map::with_capacity(values.len());
    for (name, value) in values {
        out.insert(
            name.clone(),
            encode_for_schema(name, value, schema, options)?,
        );
    }
    Ok(Value::Object(out))
}

fn plain_to_rich_text(text: &str) -> Value {
    json!([{ "type": "text", "text": { "content": text } }])
}

fn dedup_preserving_order<I: IntoIterator<Item = String>>(items: I) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
