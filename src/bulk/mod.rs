// src/bulk/mod.rs
//! Bulk import/export between flat external records and the internal
//! value model.
//!
//! Import is a pure pass: parse rows, apply the caller's field mapping,
//! coerce each cell through the codec's encode path, and report row
//! failures per the chosen merge strategy. No network calls happen here —
//! the operations layer decides what to do with the validated records.

use crate::codec::{self, EncodeOptions};
use crate::error::ClientError;
use crate::types::{DateRange, NotionId, PersonRef, PropertyKind, PropertyValue, RecordSchema};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::io::Cursor;

/// Flat source rows for an import.
///
/// CSV text is parsed with headers; JSON must be an array of objects.
/// Pre-parsed rows pass through untouched.
#[derive(Debug, Clone)]
pub enum BulkSource {
    Csv(String),
    Json(String),
    Rows(Vec<IndexMap<String, Value>>),
}

impl BulkSource {
    /// Parse the source into uniform rows.
    pub fn into_rows(self) -> Result<Vec<IndexMap<String, Value>>, ClientError> {
        match self {
            BulkSource::Rows(rows) => Ok(rows),
            BulkSource::Json(text) => {
                let parsed: Value = serde_json::from_str(&text)
                    .map_err(|e| ClientError::validation(format!("import JSON is invalid: {}", e)))?;
                let array = parsed.as_array().ok_or_else(|| {
                    ClientError::validation("import JSON must be an array of objects")
                })?;
                array
                    .iter()
                    .map(|row| {
                        row.as_object()
                            .map(|obj| {
                                obj.iter()
                                    .map(|(k, v)| (k.clone(), v.clone()))
                                    .collect::<IndexMap<_, _>>()
                            })
                            .ok_or_else(|| {
                                ClientError::validation(
                                    "import JSON rows must be objects",
                                )
                            })
                    })
                    .collect()
            }
            BulkSource::Csv(text) => {
                let mut reader = csv::Reader::from_reader(Cursor::new(text));
                let headers = reader
                    .headers()
                    .map_err(|e| ClientError::validation(format!("import CSV is invalid: {}", e)))?
                    .clone();

                let mut rows = Vec::new();
                for result in reader.records() {
                    let record = result.map_err(|e| {
                        ClientError::validation(format!("import CSV is invalid: {}", e))
                    })?;
                    let row: IndexMap<String, Value> = headers
                        .iter()
                        .zip(record.iter())
                        .map(|(header, cell)| {
                            (header.to_string(), Value::String(cell.to_string()))
                        })
                        .collect();
                    rows.push(row);
                }
                Ok(rows)
            }
        }
    }
}

/// Source field name → target property name.
///
/// Source fields absent from the mapping are dropped silently — partial
/// mapping is how callers import a slice of a wide spreadsheet. Mapping
/// *targets* missing from the schema fail the whole import up front.
#[derive(Debug, Clone, Default)]
pub struct FieldMapping(IndexMap<String, String>);

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.0.insert(source.into(), target.into());
        self
    }

    /// Identity mapping over the schema's own property names, for sources
    /// whose columns already match.
    pub fn identity(schema: &RecordSchema) -> Self {
        let mut mapping = Self::new();
        for name in schema.names() {
            mapping.0.insert(name.clone(), name.clone());
        }
        mapping
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    fn validate_targets(&self, schema: &RecordSchema) -> Result<(), ClientError> {
        for (source, target) in &self.0 {
            if !schema.contains(target) {
                return Err(ClientError::validation(format!(
                    "mapping target '{}' (from source field '{}') does not exist in the target schema",
                    target, source
                )));
            }
        }
        Ok(())
    }
}

/// What to do when a row fails coercion.
///
/// There is no default on purpose: silently dropping data is the one
/// behavior this layer must never pick on the caller's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// First bad row aborts the batch; nothing is imported.
    Strict,
    /// Bad rows are skipped and reported; good rows go through.
    BestEffort,
}

/// One failed row in a best-effort import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    pub index: usize,
    pub field: String,
    pub message: String,
}

/// Result of the pure import pass.
#[derive(Debug)]
pub struct ImportOutcome {
    /// Schema-conformant records, in source order, bad rows excluded.
    pub records: Vec<IndexMap<String, PropertyValue>>,
    /// Source row index of each entry in `records`.
    pub source_rows: Vec<usize>,
    /// Row failures (empty under `Strict`, which aborts instead).
    pub failures: Vec<RowFailure>,
    /// Total source rows seen, including failed ones.
    pub total_rows: usize,
}

/// Translate flat rows into schema-conformant property maps.
///
/// Pure: validates the mapping against the schema (all-or-nothing, before
/// any row is touched), then coerces row by row through the codec's
/// encode path.
pub fn import_records(
    source: BulkSource,
    mapping: &FieldMapping,
    schema: &RecordSchema,
    strategy: MergeStrategy,
) -> Result<ImportOutcome, ClientError> {
    mapping.validate_targets(schema)?;

    let rows = source.into_rows()?;
    let total_rows = rows.len();
    let mut records = Vec::with_capacity(total_rows);
    let mut source_rows = Vec::with_capacity(total_rows);
    let mut failures = Vec::new();

    for (index, row) in rows.into_iter().enumerate() {
        match coerce_row(index, &row, mapping, schema) {
            Ok(record) => {
                if !record.is_empty() {
                    records.push(record);
                    source_rows.push(index);
                }
            }
            Err(error) => match strategy {
                MergeStrategy::Strict => return Err(error),
                MergeStrategy::BestEffort => {
                    if let ClientError::Row {
                        index,
                        field,
                        message,
                    } = error
                    {
                        log::warn!("skipping row {}: field '{}': {}", index, field, message);
                        failures.push(RowFailure {
                            index,
                            field,
                            message,
                        });
                    } else {
                        // Non-row errors are structural; they abort even
                        // under best-effort.
                        return Err(error);
                    }
                }
            },
        }
    }

    Ok(ImportOutcome {
        records,
        source_rows,
        failures,
        total_rows,
    })
}

/// Coerce one source row through the mapping. Empty cells are skipped, not
/// written as nulls.
fn coerce_row(
    index: usize,
    row: &IndexMap<String, Value>,
    mapping: &FieldMapping,
    schema: &RecordSchema,
) -> Result<IndexMap<String, PropertyValue>, ClientError> {
    let mut record = IndexMap::new();

    for (source, target) in mapping.iter() {
        let Some(raw) = row.get(source) else {
            continue;
        };
        if raw.is_null() {
            continue;
        }
        if let Value::String(s) = raw {
            if s.trim().is_empty() {
                continue;
            }
        }

        let spec = schema.get(target).expect("mapping targets validated");
        let value = coerce_value(spec.kind, raw).map_err(|message| ClientError::Row {
            index,
            field: source.clone(),
            message,
        })?;

        // The codec's encode path is the arbiter of validity: option
        // membership, date shape, mutability.
        codec::encode_for_schema(target, &value, schema, &EncodeOptions::default()).map_err(
            |e| ClientError::Row {
                index,
                field: source.clone(),
                message: e.to_string(),
            },
        )?;

        record.insert(target.clone(), value);
    }

    Ok(record)
}

/// Coerce a flat cell into a typed property value.
///
/// CSV cells arrive as strings, JSON cells keep their scalar types; both
/// routes end at the same `PropertyValue`.
fn coerce_value(kind: PropertyKind, raw: &Value) -> Result<PropertyValue, String> {
    let as_text = || -> String {
        match raw {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    };

    let value = match kind {
        PropertyKind::Title => PropertyValue::Title(as_text()),
        PropertyKind::RichText => PropertyValue::Text(as_text()),
        PropertyKind::Number => {
            let number = match raw {
                Value::Number(n) => n
                    .as_f64()
                    .ok_or_else(|| format!("'{}' is not a representable number", raw))?,
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| format!("'{}' is not a number", s))?,
                other => return Err(format!("'{}' is not a number", other)),
            };
            PropertyValue::Number(Some(number))
        }
        PropertyKind::Checkbox => {
            let flag = match raw {
                Value::Bool(b) => *b,
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "yes" | "1" | "x" => true,
                    "false" | "no" | "0" | "" => false,
                    other => return Err(format!("'{}' is not a boolean", other)),
                },
                other => return Err(format!("'{}' is not a boolean", other)),
            };
            PropertyValue::Checkbox(flag)
        }
        PropertyKind::Date => {
            let range = DateRange::new(as_text());
            range
                .validate()
                .map_err(|e| e.to_string())?;
            PropertyValue::Date(Some(range))
        }
        PropertyKind::Select => PropertyValue::Select(Some(as_text())),
        PropertyKind::Status => PropertyValue::Status(Some(as_text())),
        PropertyKind::MultiSelect => PropertyValue::MultiSelect(split_multi(raw)),
        PropertyKind::People => PropertyValue::People(
            split_multi(raw)
                .into_iter()
                .map(|id| PersonRef { id, name: None })
                .collect(),
        ),
        PropertyKind::Relation => {
            let mut ids = Vec::new();
            for part in split_multi(raw) {
                let id = NotionId::parse(&part).map_err(|e| e.to_string())?;
                ids.push(id);
            }
            PropertyValue::Relation(ids)
        }
        PropertyKind::Url => PropertyValue::Url(Some(as_text())),
        PropertyKind::Email => PropertyValue::Email(Some(as_text())),
        PropertyKind::PhoneNumber => PropertyValue::PhoneNumber(Some(as_text())),
        PropertyKind::Files => {
            return Err("file properties cannot be imported from flat rows".to_string())
        }
        computed => {
            return Err(format!(
                "property type {} is computed and cannot be imported",
                computed
            ))
        }
    };

    Ok(value)
}

/// Split a multi-valued cell: JSON arrays element-wise, strings on commas.
fn split_multi(raw: &Value) -> Vec<String> {
    match raw {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.trim().to_string(),
                other => other.to_string(),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        other => vec![other.to_string()],
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Output format for an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

/// Serialize decoded records as a flat byte sequence.
///
/// Column order is the schema's property order. Multi-valued properties
/// are comma-joined in CSV (the csv writer quotes cells whose content
/// collides with the delimiter — content is escaped, never truncated) and
/// arrays in JSON.
pub fn export_records(
    records: &[IndexMap<String, PropertyValue>],
    schema: &RecordSchema,
    format: ExportFormat,
) -> Result<Vec<u8>, ClientError> {
    match format {
        ExportFormat::Csv => export_csv(records, schema),
        ExportFormat::Json => export_json(records, schema),
    }
}

fn export_csv(
    records: &[IndexMap<String, PropertyValue>],
    schema: &RecordSchema,
) -> Result<Vec<u8>, ClientError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let columns: Vec<&String> = schema.names().collect();

    writer
        .write_record(&columns)
        .map_err(|e| ClientError::Malformed(format!("CSV export failed: {}", e)))?;

    for record in records {
        let row: Vec<String> = columns
            .iter()
            .map(|name| {
                record
                    .get(name.as_str())
                    .map(PropertyValue::as_plain_text)
                    .unwrap_or_default()
            })
            .collect();
        writer
            .write_record(&row)
            .map_err(|e| ClientError::Malformed(format!("CSV export failed: {}", e)))?;
    }

    writer
        .into_inner()
        .map_err(|e| ClientError::Malformed(format!("CSV export failed: {}", e)))
}

fn export_json(
    records: &[IndexMap<String, PropertyValue>],
    schema: &RecordSchema,
) -> Result<Vec<u8>, ClientError> {
    let flattened: Vec<Value> = records
        .iter()
        .map(|record| {
            let mut row = serde_json::Map::new();
            for name in schema.names() {
                let cell = match record.get(name.as_str()) {
                    Some(value) => flatten_json_cell(value),
                    None => Value::Null,
                };
                row.insert(name.clone(), cell);
            }
            Value::Object(row)
        })
        .collect();

    serde_json::to_vec_pretty(&flattened)
        .map_err(|e| ClientError::Malformed(format!("JSON export failed: {}", e)))
}

/// Flatten one property value to a JSON cell: scalars stay scalars,
/// multi-valued kinds become arrays.
fn flatten_json_cell(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Number(n) => match n {
            Some(n) => Value::from(*n),
            None => Value::Null,
        },
        PropertyValue::Checkbox(b) => Value::Bool(*b),
        PropertyValue::MultiSelect(labels) => {
            Value::Array(labels.iter().map(|l| Value::String(l.clone())).collect())
        }
        PropertyValue::People(people) => Value::Array(
            people
                .iter()
                .map(|p| Value::String(p.to_string()))
                .collect(),
        ),
        PropertyValue::Relation(ids) => Value::Array(
            ids.iter()
                .map(|id| Value::String(id.to_hyphenated()))
                .collect(),
        ),
        PropertyValue::Files(files) => Value::Array(
            files
                .iter()
                .map(|f| Value::String(f.url.clone()))
                .collect(),
        ),
        PropertyValue::Select(v) | PropertyValue::Status(v) => match v {
            Some(label) => Value::String(label.clone()),
            None => Value::Null,
        },
        PropertyValue::Date(None) => Value::Null,
        PropertyValue::Url(v) | PropertyValue::Email(v) | PropertyValue::PhoneNumber(v) => {
            match v {
                Some(s) => Value::String(s.clone()),
                None => Value::Null,
            }
        }
        other => Value::String(other.as_plain_text()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn schema() -> RecordSchema {
        RecordSchema::new()
            .with("Name", PropertyKind::Title)
            .with("Score", PropertyKind::Number)
            .with_options(
                "Tags",
                PropertyKind::MultiSelect,
                vec!["anime".to_string(), "thesis".to_string(), "lab".to_string()],
            )
    }

    #[test]
    fn csv_source_parses_with_headers() {
        let source = BulkSource::Csv(
            "Name,Score\n\"Müller, Hans\",92\nTanaka,87\n".to_string(),
        );
        let rows = source.into_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Name"], Value::String("Müller, Hans".to_string()));
        assert_eq!(rows[1]["Score"], Value::String("87".to_string()));
    }

    #[test]
    fn mapping_target_missing_from_schema_fails_before_rows() {
        let source = BulkSource::Rows(vec![IndexMap::from([(
            "title".to_string(),
            Value::String("x".to_string()),
        )])]);
        let mapping = FieldMapping::new().map("title", "DoesNotExist");

        let err =
            import_records(source, &mapping, &schema(), MergeStrategy::BestEffort).unwrap_err();
        assert!(matches!(err, ClientError::Validation { .. }));
    }

    #[test]
    fn unmapped_source_fields_are_dropped() {
        let source = BulkSource::Rows(vec![IndexMap::from([
            ("title".to_string(), Value::String("Thesis".to_string())),
            ("ignored".to_string(), Value::String("junk".to_string())),
        ])]);
        let mapping = FieldMapping::new().map("title", "Name");

        let outcome =
            import_records(source, &mapping, &schema(), MergeStrategy::Strict).unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].len(), 1);
        assert_eq!(
            outcome.records[0]["Name"],
            PropertyValue::Title("Thesis".to_string())
        );
    }

    #[test]
    fn strict_aborts_on_first_bad_row() {
        let rows: Vec<IndexMap<String, Value>> = (0..10)
            .map(|i| {
                IndexMap::from([
                    ("name".to_string(), Value::String(format!("Row {}", i))),
                    (
                        "score".to_string(),
                        Value::String(if i == 5 {
                            "not-a-number".to_string()
                        } else {
                            i.to_string()
                        }),
                    ),
                ])
            })
            .collect();
        let mapping = FieldMapping::new().map("name", "Name").map("score", "Score");

        let err = import_records(
            BulkSource::Rows(rows.clone()),
            &mapping,
            &schema(),
            MergeStrategy::Strict,
        )
        .unwrap_err();
        match err {
            ClientError::Row { index, field, .. } => {
                assert_eq!(index, 5);
                assert_eq!(field, "score");
            }
            other => panic!("expected RowError, got {:?}", other),
        }

        let outcome = import_records(
            BulkSource::Rows(rows),
            &mapping,
            &schema(),
            MergeStrategy::BestEffort,
        )
        .unwrap();
        assert_eq!(outcome.records.len(), 9);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].index, 5);
        assert_eq!(outcome.total_rows, 10);
    }

    #[test]
    fn choice_membership_is_checked_per_row() {
        let source = BulkSource::Rows(vec![IndexMap::from([
            ("name".to_string(), Value::String("Entry".to_string())),
            ("tags".to_string(), Value::String("anime, unknown".to_string())),
        ])]);
        let mapping = FieldMapping::new().map("name", "Name").map("tags", "Tags");

        let err =
            import_records(source, &mapping, &schema(), MergeStrategy::Strict).unwrap_err();
        assert!(matches!(err, ClientError::Row { index: 0, .. }));
    }

    #[test]
    fn export_csv_quotes_delimiter_collisions() {
        let records = vec![IndexMap::from([
            (
                "Name".to_string(),
                PropertyValue::Title("Müller, Hans".to_string()),
            ),
            ("Score".to_string(), PropertyValue::Number(Some(92.0))),
            (
                "Tags".to_string(),
                PropertyValue::MultiSelect(vec!["anime".to_string(), "thesis".to_string()]),
            ),
        ])];

        let bytes = export_records(&records, &schema(), ExportFormat::Csv).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "Name,Score,Tags\n\"Müller, Hans\",92,\"anime, thesis\"\n"
        );
    }

    #[test]
    fn export_json_uses_arrays_for_multi_values() {
        let records = vec![IndexMap::from([
            ("Name".to_string(), PropertyValue::Title("Labor".to_string())),
            ("Score".to_string(), PropertyValue::Number(None)),
            (
                "Tags".to_string(),
                PropertyValue::MultiSelect(vec!["lab".to_string()]),
            ),
        ])];

        let bytes = export_records(&records, &schema(), ExportFormat::Json).unwrap();
        let parsed: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            parsed,
            serde_json::json!([
                { "Name": "Labor", "Score": null, "Tags": ["lab"] }
            ])
        );
    }

    #[test]
    fn round_trip_import_then_export() {
        let csv_in = "Name,Score,Tags\nForschung – 日本語,88,\"anime, thesis\"\n";
        let outcome = import_records(
            BulkSource::Csv(csv_in.to_string()),
            &FieldMapping::identity(&schema()),
            &schema(),
            MergeStrategy::Strict,
        )
        .unwrap();

        let bytes = export_records(&outcome.records, &schema(), ExportFormat::Csv).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "Name,Score,Tags\nForschung – 日本語,88,\"anime, thesis\"\n");
    }
}
