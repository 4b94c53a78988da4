// tests/codec_roundtrip.rs
//! Round-trip tests for the property codec.
//!
//! For every writable property kind, decoding what encode produced must
//! yield the original value. The documented exceptions are metadata the
//! simplified model discards: select option colors/ids, rich-text
//! annotations, person display names, file expiry times.

use notion_workspace::{
    decode, decode_property, encode, ClientError, ComputedValue, DateRange, FileRef, NotionId,
    PersonRef, PropertyKind, PropertyValue,
};
use pretty_assertions::assert_eq;

fn assert_round_trip(value: PropertyValue) {
    let encoded = encode(&value).expect("encode should succeed");
    let decoded = decode(value.kind(), &encoded).expect("decode should succeed");
    assert_eq!(decoded, value);
}

#[test]
fn every_writable_kind_round_trips() {
    assert_round_trip(PropertyValue::Title("Semesterplan".to_string()));
    assert_round_trip(PropertyValue::Text("Notizen zur Vorlesung".to_string()));
    assert_round_trip(PropertyValue::Number(Some(42.5)));
    assert_round_trip(PropertyValue::Number(None));
    assert_round_trip(PropertyValue::Checkbox(true));
    assert_round_trip(PropertyValue::Checkbox(false));
    assert_round_trip(PropertyValue::Date(Some(DateRange {
        start: "2025-07-22".to_string(),
        end: Some("2025-07-29".to_string()),
        time_zone: Some("Europe/Vienna".to_string()),
    })));
    assert_round_trip(PropertyValue::Date(None));
    assert_round_trip(PropertyValue::Select(Some("Wichtig".to_string())));
    assert_round_trip(PropertyValue::Select(None));
    assert_round_trip(PropertyValue::Status(Some("In Arbeit".to_string())));
    assert_round_trip(PropertyValue::MultiSelect(vec![
        "anime".to_string(),
        "thesis".to_string(),
    ]));
    assert_round_trip(PropertyValue::People(vec![PersonRef {
        id: "8c1f1c9a-0000-0000-0000-000000000001".to_string(),
        name: None,
    }]));
    assert_round_trip(PropertyValue::Relation(vec![
        NotionId::parse("550e8400e29b41d4a716446655440000").unwrap(),
        NotionId::parse("660e8400e29b41d4a716446655440111").unwrap(),
    ]));
    assert_round_trip(PropertyValue::Url(Some("https://example.at/kurs".to_string())));
    assert_round_trip(PropertyValue::Email(Some("sandra@example.at".to_string())));
    assert_round_trip(PropertyValue::PhoneNumber(Some("+43 1 4277".to_string())));
    assert_round_trip(PropertyValue::Files(vec![FileRef {
        name: "skript.pdf".to_string(),
        url: "https://example.at/skript.pdf".to_string(),
    }]));
}

#[test]
fn unicode_text_round_trips_byte_for_byte() {
    let original = "Größe: Müller – 日本語";
    let value = PropertyValue::Text(original.to_string());

    let encoded = encode(&value).unwrap();
    let decoded = decode(PropertyKind::RichText, &encoded).unwrap();

    match decoded {
        PropertyValue::Text(text) => {
            assert_eq!(text, original);
            assert_eq!(text.as_bytes(), original.as_bytes());
        }
        other => panic!("expected text, got {:?}", other),
    }
}

#[test]
fn unsupported_remote_type_fails_naming_the_type() {
    let raw = serde_json::json!({
        "id": "prop-1",
        "type": "button",
        "button": {}
    });

    match decode_property(&raw) {
        Err(ClientError::Schema { property_type }) => assert_eq!(property_type, "button"),
        other => panic!("expected SchemaError naming 'button', got {:?}", other),
    }
}

#[test]
fn computed_values_decode_but_do_not_encode() {
    let raw = serde_json::json!({
        "type": "formula",
        "formula": { "type": "string", "string": "ergebnis" }
    });
    let (kind, value) = decode_property(&raw).unwrap();
    assert_eq!(kind, PropertyKind::Formula);
    assert_eq!(
        value,
        PropertyValue::Computed {
            origin: PropertyKind::Formula,
            value: ComputedValue::Text("ergebnis".to_string()),
        }
    );

    let err = encode(&value).unwrap_err();
    assert_eq!(err.kind(), "validation_error");
}

#[test]
fn select_color_metadata_is_intentionally_lossy() {
    let raw = serde_json::json!({
        "type": "select",
        "select": { "id": "opt-9", "name": "Rot", "color": "red" }
    });
    let (_, value) = decode_property(&raw).unwrap();

    // The simplified model keeps only the label...
    assert_eq!(value, PropertyValue::Select(Some("Rot".to_string())));

    // ...so the re-encoded payload has no color or id.
    let encoded = encode(&value).unwrap();
    assert_eq!(
        encoded,
        serde_json::json!({ "select": { "name": "Rot" } })
    );
}

#[test]
fn multi_valued_encode_deduplicates_preserving_first_seen_order() {
    let value = PropertyValue::MultiSelect(vec![
        "rust".to_string(),
        "python".to_string(),
        "rust".to_string(),
    ]);
    let encoded = encode(&value).unwrap();
    assert_eq!(
        encoded,
        serde_json::json!({ "multi_select": [{ "name": "rust" }, { "name": "python" }] })
    );

    let id = NotionId::parse("550e8400e29b41d4a716446655440000").unwrap();
    let value = PropertyValue::Relation(vec![id.clone(), id.clone()]);
    let encoded = encode(&value).unwrap();
    assert_eq!(
        encoded,
        serde_json::json!({ "relation": [{ "id": "550e8400-e29b-41d4-a716-446655440000" }] })
    );
}
