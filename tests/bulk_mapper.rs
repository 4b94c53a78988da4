// tests/bulk_mapper.rs
//! Bulk import/export behavior at the crate surface.

use indexmap::IndexMap;
use notion_workspace::{
    export_records, import_records, BulkSource, ClientError, ExportFormat, FieldMapping,
    MergeStrategy, PropertyKind, PropertyValue, RecordSchema,
};
use pretty_assertions::assert_eq;
use serde_json::Value;

fn target_schema() -> RecordSchema {
    RecordSchema::new()
        .with("Name", PropertyKind::Title)
        .with("Score", PropertyKind::Number)
        .with("Due", PropertyKind::Date)
        .with_options(
            "Tags",
            PropertyKind::MultiSelect,
            vec!["lecture".to_string(), "lab".to_string(), "thesis".to_string()],
        )
}

/// Ten rows, row index 5 malformed (bad number).
fn ten_rows_with_bad_fifth() -> Vec<IndexMap<String, Value>> {
    (0..10)
        .map(|i| {
            IndexMap::from([
                ("name".to_string(), Value::String(format!("Eintrag {}", i))),
                (
                    "score".to_string(),
                    Value::String(if i == 5 {
                        "zweiundneunzig".to_string()
                    } else {
                        format!("{}", 80 + i)
                    }),
                ),
            ])
        })
        .collect()
}

fn mapping() -> FieldMapping {
    FieldMapping::new().map("name", "Name").map("score", "Score")
}

#[test]
fn strict_import_aborts_with_zero_rows() {
    let err = import_records(
        BulkSource::Rows(ten_rows_with_bad_fifth()),
        &mapping(),
        &target_schema(),
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
}

#[test]
fn best_effort_import_keeps_nine_and_reports_the_fifth() {
    let outcome = import_records(
        BulkSource::Rows(ten_rows_with_bad_fifth()),
        &mapping(),
        &target_schema(),
        MergeStrategy::BestEffort,
    )
    .unwrap();

    assert_eq!(outcome.total_rows, 10);
    assert_eq!(outcome.records.len(), 9);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].index, 5);
    assert_eq!(outcome.failures[0].field, "score");
    // The skipped row's neighbors made it through.
    assert!(outcome.source_rows.contains(&4));
    assert!(outcome.source_rows.contains(&6));
    assert!(!outcome.source_rows.contains(&5));
}

#[test]
fn mapping_validation_is_all_or_nothing() {
    // One bad target sinks the import before any row is coerced, even
    // under best-effort.
    let bad_mapping = FieldMapping::new()
        .map("name", "Name")
        .map("score", "Punkte");

    let err = import_records(
        BulkSource::Rows(ten_rows_with_bad_fifth()),
        &bad_mapping,
        &target_schema(),
        MergeStrategy::BestEffort,
    )
    .unwrap_err();

    assert_eq!(err.kind(), "validation_error");
    assert!(err.to_string().contains("Punkte"));
}

#[test]
fn csv_and_json_sources_converge() {
    let csv = BulkSource::Csv("name,score\nKurs A,90\n".to_string());
    let json = BulkSource::Json(r#"[{"name": "Kurs A", "score": 90}]"#.to_string());

    let from_csv = import_records(csv, &mapping(), &target_schema(), MergeStrategy::Strict)
        .unwrap()
        .records;
    let from_json = import_records(json, &mapping(), &target_schema(), MergeStrategy::Strict)
        .unwrap()
        .records;

    assert_eq!(from_csv, from_json);
    assert_eq!(
        from_csv[0]["Score"],
        PropertyValue::Number(Some(90.0))
    );
}

#[test]
fn unknown_choice_label_is_a_row_error_not_a_write() {
    let source = BulkSource::Csv("name,tags\nKurs B,\"lecture, privat\"\n".to_string());
    let mapping = FieldMapping::new().map("name", "Name").map("tags", "Tags");

    let err = import_records(source, &mapping, &target_schema(), MergeStrategy::Strict)
        .unwrap_err();
    match err {
        ClientError::Row { index, field, message } => {
            assert_eq!(index, 0);
            assert_eq!(field, "tags");
            assert!(message.contains("privat"));
        }
        other => panic!("expected RowError, got {:?}", other),
    }
}

#[test]
fn csv_export_escapes_delimiter_collisions() {
    let schema = target_schema();
    let records = vec![IndexMap::from([
        (
            "Name".to_string(),
            PropertyValue::Title("Müller, Hans; und Co".to_string()),
        ),
        ("Score".to_string(), PropertyValue::Number(Some(91.0))),
        ("Due".to_string(), PropertyValue::Date(None)),
        (
            "Tags".to_string(),
            PropertyValue::MultiSelect(vec!["lecture".to_string(), "lab".to_string()]),
        ),
    ])];

    let bytes = export_records(&records, &schema, ExportFormat::Csv).unwrap();
    let text = String::from_utf8(bytes).unwrap();

    // The comma-bearing cells are quoted, never truncated.
    assert_eq!(
        text,
        "Name,Score,Due,Tags\n\"Müller, Hans; und Co\",91,,\"lecture, lab\"\n"
    );
}

#[test]
fn json_export_keeps_multi_values_as_arrays() {
    let schema = target_schema();
    let records = vec![IndexMap::from([
        ("Name".to_string(), PropertyValue::Title("Labor".to_string())),
        ("Score".to_string(), PropertyValue::Number(Some(77.5))),
        (
            "Due".to_string(),
            PropertyValue::Date(Some(notion_workspace::DateRange::new("2025-08-01"))),
        ),
        (
            "Tags".to_string(),
            PropertyValue::MultiSelect(vec!["lab".to_string()]),
        ),
    ])];

    let bytes = export_records(&records, &schema, ExportFormat::Json).unwrap();
    let parsed: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        parsed,
        serde_json::json!([{
            "Name": "Labor",
            "Score": 77.5,
            "Due": "2025-08-01",
            "Tags": ["lab"]
        }])
    );
}
