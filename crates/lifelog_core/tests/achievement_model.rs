use lifelog_core::{decode_collection, encode_collection, Achievement, AchievementId};
use lifelog_core::AchievementValidationError;

#[test]
fn new_trims_and_normalizes_input() {
    let record = Achievement::new(" Foo ", Some(" Bar "), Some(" 2024-06-15 ")).unwrap();

    assert!(!record.id.as_str().is_empty());
    assert_eq!(record.title, "Foo");
    assert_eq!(record.description.as_deref(), Some("Bar"));
    assert_eq!(record.date, "2024-06-15");
}

#[test]
fn new_rejects_blank_title() {
    let err = Achievement::new("  ", None, None).unwrap_err();
    assert_eq!(err, AchievementValidationError::EmptyTitle);
}

#[test]
fn blank_date_falls_back_to_today() {
    let record = Achievement::new("t", None, Some("   ")).unwrap();
    assert_eq!(record.date, lifelog_core::model::achievement::today_local());
}

#[test]
fn serialization_uses_expected_wire_fields() {
    let record = Achievement::with_id(
        AchievementId::from_raw("1700000000000_abc123"),
        "Marathon",
        Some("ran 42km"),
        Some("2022-10-09"),
    )
    .unwrap();

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "id": "1700000000000_abc123",
            "title": "Marathon",
            "description": "ran 42km",
            "date": "2022-10-09"
        })
    );

    let decoded: Achievement = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, record);
}

#[test]
fn collection_round_trip_preserves_order_and_fields() {
    let records = vec![
        Achievement::new("second", None, Some("2020-01-01")).unwrap(),
        Achievement::new("first", Some("note"), Some("2024-01-01")).unwrap(),
    ];

    let decoded = decode_collection(&encode_collection(&records).unwrap()).unwrap();
    assert_eq!(decoded, records);
}

#[test]
fn missing_description_field_decodes_as_none() {
    let decoded =
        decode_collection(br#"[{"id":"1_a","title":"t","date":"2024-01-01"}]"#).unwrap();
    assert_eq!(decoded[0].description, None);
}
