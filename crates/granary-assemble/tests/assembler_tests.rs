use granary_assemble::Assembler;
use granary_config::{BadRecordPolicy, Policies};
use granary_core::{
    AssemblyError, AttributeMap, AttributeValue, ChangeEvent, EventKind,
    FieldMode, FieldType, StreamRecord, StreamViewType,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn keys(pk: &str, sk: &str) -> AttributeMap {
    AttributeMap::from([
        ("pk".to_string(), AttributeValue::String(pk.into())),
        ("sk".to_string(), AttributeValue::String(sk.into())),
    ])
}

fn event(
    id: &str,
    pk: &str,
    sk: &str,
    image: AttributeMap,
) -> ChangeEvent {
    let record = StreamRecord::new(
        keys(pk, sk),
        StreamViewType::NewImage,
        1700000000.0,
    )
    .with_new_image(image)
    .with_sequence_number(id);
    ChangeEvent::new(id, EventKind::Insert, record)
}

fn result_image(score: &str) -> AttributeMap {
    AttributeMap::from([
        (
            "score".to_string(),
            AttributeValue::Number(score.to_string()),
        ),
        (
            "tags".to_string(),
            AttributeValue::List(vec![
                AttributeValue::String("x".into()),
                AttributeValue::String("y".into()),
            ]),
        ),
    ])
}

// ============================================================================
// Routing + schema seeding
// ============================================================================

#[test]
fn buckets_by_destination_and_seeds_schema_from_first_record() {
    let events = vec![
        event(
            "e-1",
            "patient#01ABC",
            "assessment#adhd#999#result",
            result_image("7"),
        ),
        event(
            "e-2",
            "patient#01ABC",
            "assessment#adhd#1000#result",
            result_image("9"),
        ),
        event(
            "e-3",
            "userProfile#u1",
            "userProfile#u1",
            AttributeMap::from([(
                "name".to_string(),
                AttributeValue::String("Alice".into()),
            )]),
        ),
    ];

    let assembled = Assembler::new(Policies::default())
        .assemble(&events)
        .unwrap();

    assert_eq!(assembled.total_rows, 3);
    assert_eq!(assembled.skipped, 0);
    assert_eq!(assembled.tables.len(), 2);

    let results = &assembled.tables["assessment_adhd_results"];
    assert_eq!(results.rows.len(), 2);

    // Schema comes from the first record's shape: keys, metadata, image.
    let names: Vec<&str> =
        results.schema.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Keys", "Metadata", "NewImage"]);

    let image = results
        .schema
        .iter()
        .find(|f| f.name == "NewImage")
        .unwrap();
    assert_eq!(image.field_type, FieldType::Record);
    assert_eq!(image.fields[0].name, "score");
    assert_eq!(image.fields[0].field_type, FieldType::Integer);
    assert_eq!(image.fields[1].name, "tags");
    assert_eq!(image.fields[1].field_type, FieldType::String);
    assert_eq!(image.fields[1].mode, FieldMode::Repeated);

    let profiles = &assembled.tables["userprofiles"];
    assert_eq!(profiles.rows.len(), 1);
    assert!(!profiles.fingerprint.is_empty());
}

#[test]
fn first_record_schema_is_not_revised_by_later_shapes() {
    // Second record adds a field; the bucket schema stays as seeded.
    let events = vec![
        event(
            "e-1",
            "patient#1",
            "journey#a",
            AttributeMap::from([(
                "stage".to_string(),
                AttributeValue::String("intro".into()),
            )]),
        ),
        event(
            "e-2",
            "patient#2",
            "journey#b",
            AttributeMap::from([
                (
                    "stage".to_string(),
                    AttributeValue::String("outro".into()),
                ),
                ("extra".to_string(), AttributeValue::Boolean(true)),
            ]),
        ),
    ];

    let assembled = Assembler::new(Policies::default())
        .assemble(&events)
        .unwrap();

    let journeys = &assembled.tables["journeys"];
    assert_eq!(journeys.rows.len(), 2);

    let image = journeys
        .schema
        .iter()
        .find(|f| f.name == "NewImage")
        .unwrap();
    let names: Vec<&str> =
        image.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["stage"]);

    // The extra field still rides along in the queued row.
    assert_eq!(journeys.rows[1]["NewImage"]["extra"], json!(true));
}

#[test]
fn rows_keep_arrival_order_within_a_bucket() {
    let events: Vec<ChangeEvent> = (0..5)
        .map(|i| {
            event(
                &format!("e-{i}"),
                "patient#1",
                "journey#x",
                AttributeMap::from([(
                    "n".to_string(),
                    AttributeValue::Number(i.to_string()),
                )]),
            )
        })
        .collect();

    let assembled = Assembler::new(Policies::default())
        .assemble(&events)
        .unwrap();

    let rows = &assembled.tables["journeys"].rows;
    let order: Vec<i64> = rows
        .iter()
        .map(|r| r["NewImage"]["n"].as_i64().unwrap())
        .collect();
    assert_eq!(order, vec![0, 1, 2, 3, 4]);
}

#[test]
fn materialized_rows_attach_event_metadata() {
    let events = vec![event(
        "e-1",
        "patient#1",
        "appointment#2023",
        AttributeMap::from([(
            "status".to_string(),
            AttributeValue::String("booked".into()),
        )]),
    )];

    let assembled = Assembler::new(Policies::default())
        .assemble(&events)
        .unwrap();

    let row = &assembled.tables["appointments"].rows[0];
    assert_eq!(row["Metadata"]["eventKind"], json!("INSERT"));
    assert_eq!(row["Metadata"]["timestamp"], json!(1700000000_i64));
    assert_eq!(row["Keys"]["pk"], json!("patient#1"));
}

// ============================================================================
// Bad-record policy
// ============================================================================

#[test]
fn error_policy_aborts_with_batch_position() {
    let events = vec![
        event(
            "e-1",
            "patient#1",
            "journey#a",
            AttributeMap::from([(
                "ok".to_string(),
                AttributeValue::Boolean(true),
            )]),
        ),
        event("e-2", "patient#1", "unknownType#foo", AttributeMap::new()),
    ];

    let err = Assembler::new(Policies::default())
        .assemble(&events)
        .unwrap_err();

    match err {
        AssemblyError::Classification { position, .. } => {
            assert_eq!(position, 1);
        }
        other => panic!("expected classification error, got {other:?}"),
    }
}

#[test]
fn skip_policy_omits_unroutable_records() {
    let events = vec![
        event("e-1", "patient#1", "unknownType#foo", AttributeMap::new()),
        event(
            "e-2",
            "patient#1",
            "journey#a",
            AttributeMap::from([(
                "ok".to_string(),
                AttributeValue::Boolean(true),
            )]),
        ),
    ];

    let assembled = Assembler::new(Policies::lenient())
        .assemble(&events)
        .unwrap();

    assert_eq!(assembled.skipped, 1);
    assert_eq!(assembled.total_rows, 1);
    assert_eq!(assembled.tables.len(), 1);
    assert!(assembled.tables.contains_key("journeys"));
}

#[test]
fn schema_failure_respects_policy() {
    // A null field fails inference under the default reject policy.
    let bad_image = AttributeMap::from([(
        "broken".to_string(),
        AttributeValue::null(),
    )]);

    let events =
        vec![event("e-1", "patient#1", "journey#a", bad_image.clone())];

    let err = Assembler::new(Policies::default())
        .assemble(&events)
        .unwrap_err();
    match err {
        AssemblyError::Schema {
            position, table, ..
        } => {
            assert_eq!(position, 0);
            assert_eq!(table, "journeys");
        }
        other => panic!("expected schema error, got {other:?}"),
    }

    let assembled = Assembler::new(Policies {
        bad_records: BadRecordPolicy::Skip,
        ..Default::default()
    })
    .assemble(&events)
    .unwrap();
    assert_eq!(assembled.skipped, 1);
    assert!(assembled.tables.is_empty());
}

#[test]
fn skipped_schema_failure_lets_a_later_record_seed_the_bucket() {
    let events = vec![
        event(
            "e-1",
            "patient#1",
            "journey#a",
            AttributeMap::from([(
                "broken".to_string(),
                AttributeValue::null(),
            )]),
        ),
        event(
            "e-2",
            "patient#2",
            "journey#b",
            AttributeMap::from([(
                "stage".to_string(),
                AttributeValue::String("intro".into()),
            )]),
        ),
    ];

    let assembled = Assembler::new(Policies::lenient())
        .assemble(&events)
        .unwrap();

    assert_eq!(assembled.skipped, 1);
    let journeys = &assembled.tables["journeys"];
    assert_eq!(journeys.rows.len(), 1);
    assert_eq!(journeys.rows[0]["NewImage"]["stage"], json!("intro"));
}

// ============================================================================
// End-to-end spec scenarios
// ============================================================================

#[test]
fn assessment_result_scenario() {
    let events = vec![event(
        "e-1",
        "patient#01ABC",
        "assessment#adhd#999#result",
        result_image("7"),
    )];

    let assembled = Assembler::new(Policies::default())
        .assemble(&events)
        .unwrap();
    assert!(assembled.tables.contains_key("assessment_adhd_results"));
}

#[test]
fn empty_history_scenario_uses_placeholder_policy() {
    let events = vec![event(
        "e-1",
        "userProfile#u1",
        "userProfile#u1",
        AttributeMap::from([(
            "history".to_string(),
            AttributeValue::List(vec![]),
        )]),
    )];

    let assembled = Assembler::new(Policies::default())
        .assemble(&events)
        .unwrap();

    let profiles = &assembled.tables["userprofiles"];
    let image = profiles
        .schema
        .iter()
        .find(|f| f.name == "NewImage")
        .unwrap();
    assert_eq!(image.fields[0].name, "history");
    assert_eq!(image.fields[0].field_type, FieldType::Boolean);
    assert_eq!(image.fields[0].mode, FieldMode::Repeated);
}
