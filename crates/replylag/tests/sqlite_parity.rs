use std::path::{Path, PathBuf};

use replylag::config::{ReportSettings, resolve_report_settings};
use replylag::ingest::{read_managers_jsonl, read_messages_jsonl, read_supervisors_jsonl};
use replylag::models::{Manager, Message, Supervisor};
use replylag::pipeline::run_report;
use replylag::sqlite::{
    ReportInputs, ensure_source_schema, load_report_inputs, run_sql_report, verify_report_parity,
    write_report_inputs,
};
use rusqlite::Connection;

fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn fixture_inputs() -> ReportInputs {
    ReportInputs {
        messages: read_messages_jsonl(&fixture_path("messages.jsonl"))
            .expect("messages fixture loads"),
        managers: read_managers_jsonl(&fixture_path("managers.jsonl"))
            .expect("managers fixture loads"),
        supervisors: read_supervisors_jsonl(&fixture_path("supervisors.jsonl"))
            .expect("supervisors fixture loads"),
    }
}

fn seeded_connection(inputs: &ReportInputs) -> Connection {
    let mut connection = Connection::open_in_memory().expect("in-memory sqlite should open");
    ensure_source_schema(&connection).expect("schema should apply");
    write_report_inputs(&mut connection, inputs, 4).expect("rows should write");
    connection
}

fn message(conversation_id: i64, sender_id: i64, created_at: i64) -> Message {
    Message {
        conversation_id,
        sender_id,
        created_at,
    }
}

#[test]
fn sql_query_reproduces_fixture_report() {
    let inputs = fixture_inputs();
    let connection = seeded_connection(&inputs);

    let sql_rows =
        run_sql_report(&connection, &ReportSettings::default()).expect("sql report should run");
    let pipeline = run_report(
        &inputs.messages,
        &inputs.managers,
        &inputs.supervisors,
        &ReportSettings::default(),
    )
    .expect("pipeline should run");

    assert_eq!(sql_rows, pipeline.rows);
    let names = sql_rows
        .iter()
        .map(|row| row.manager_name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Ilya", "Pavel", "Daria"]);
}

#[test]
fn parity_holds_for_fixture_under_alternate_settings() {
    let connection = seeded_connection(&fixture_inputs());

    for (business_start, offset) in [
        (None, None),
        (Some("08:00"), None),
        (Some("10:15:30"), Some("+03:00")),
        (None, Some("-05:00")),
    ] {
        let settings =
            resolve_report_settings(business_start, offset).expect("settings should resolve");
        let parity = verify_report_parity(&connection, &settings).expect("parity should run");
        assert!(
            parity.is_match(),
            "mismatch for {business_start:?}/{offset:?}: {:?}",
            parity.mismatches
        );
    }
}

#[test]
fn loaded_inputs_round_trip_through_sqlite_in_insert_order() {
    let inputs = fixture_inputs();
    let connection = seeded_connection(&inputs);

    let loaded = load_report_inputs(&connection).expect("inputs should load");
    assert_eq!(loaded.messages, inputs.messages);
    assert_eq!(loaded.managers, inputs.managers);
    assert_eq!(loaded.supervisors, inputs.supervisors);
}

#[test]
fn equal_timestamps_keep_insert_order_in_both_renditions() {
    let inputs = ReportInputs {
        messages: vec![
            message(1, 0, 1_709_290_800),
            message(1, 7, 1_709_290_800),
            message(1, 8, 1_709_291_400),
        ],
        managers: vec![
            Manager {
                manager_id: 7,
                manager_name: "Anna".to_string(),
                supervisor_id: Some(1),
            },
            Manager {
                manager_id: 8,
                manager_name: "Boris".to_string(),
                supervisor_id: Some(1),
            },
        ],
        supervisors: vec![Supervisor {
            supervisor_id: 1,
            supervisor_name: "Vera".to_string(),
        }],
    };
    let connection = seeded_connection(&inputs);

    let sql_rows =
        run_sql_report(&connection, &ReportSettings::default()).expect("sql report should run");
    let averages = sql_rows
        .iter()
        .map(|row| (row.manager_name.as_str(), row.avg_minutes))
        .collect::<Vec<_>>();
    assert_eq!(averages, vec![("Anna", 0.0), ("Boris", 10.0)]);

    let parity = verify_report_parity(&connection, &ReportSettings::default())
        .expect("parity should run");
    assert!(parity.is_match(), "{:?}", parity.mismatches);
}

#[test]
fn string_encoded_reference_ids_join_in_sql() {
    let connection = Connection::open_in_memory().expect("in-memory sqlite should open");
    ensure_source_schema(&connection).expect("schema should apply");
    connection
        .execute_batch(
            "INSERT INTO messages VALUES (1, 0, 1709290800);
             INSERT INTO messages VALUES (1, 5, 1709291100);
             INSERT INTO managers VALUES ('5', 'Oleg', '2.0');
             INSERT INTO supervisors VALUES ('2', 'Irina');",
        )
        .expect("seed rows should insert");

    let sql_rows =
        run_sql_report(&connection, &ReportSettings::default()).expect("sql report should run");
    assert_eq!(sql_rows.len(), 1);
    assert_eq!(sql_rows[0].manager_id, 5);
    assert_eq!(sql_rows[0].supervisor_id, 2);
    assert_eq!(sql_rows[0].avg_minutes, 5.0);

    let parity = verify_report_parity(&connection, &ReportSettings::default())
        .expect("parity should run");
    assert!(parity.is_match(), "{:?}", parity.mismatches);
}

#[test]
fn empty_database_yields_empty_matching_reports() {
    let connection = Connection::open_in_memory().expect("in-memory sqlite should open");
    ensure_source_schema(&connection).expect("schema should apply");

    let parity =
        verify_report_parity(&connection, &ReportSettings::default()).expect("parity should run");
    assert!(parity.is_match());
    assert_eq!(parity.pipeline_rows, 0);
    assert_eq!(parity.sql_rows, 0);
}

#[test]
fn averages_near_decimal_midpoints_round_the_same_in_both_renditions() {
    // 2024-03-01T11:00:00Z
    let opened_at = 1_709_290_800;
    let mut messages = Vec::new();
    let mut managers = Vec::new();
    for (manager_id, reply_seconds) in [
        (11, vec![9]),
        (12, vec![21]),
        (13, vec![51]),
        (14, vec![57]),
        (15, vec![135]),
        (16, vec![45]),
        (17, vec![18, 24]),
    ] {
        for (index, seconds) in reply_seconds.into_iter().enumerate() {
            let conversation_id = manager_id * 10 + index as i64;
            messages.push(message(conversation_id, 0, opened_at));
            messages.push(message(conversation_id, manager_id, opened_at + seconds));
        }
        managers.push(Manager {
            manager_id,
            manager_name: format!("m{manager_id}"),
            supervisor_id: Some(1),
        });
    }
    let inputs = ReportInputs {
        messages,
        managers,
        supervisors: vec![Supervisor {
            supervisor_id: 1,
            supervisor_name: "Vera".to_string(),
        }],
    };
    let connection = seeded_connection(&inputs);

    let sql_rows =
        run_sql_report(&connection, &ReportSettings::default()).expect("sql report should run");
    let averages = sql_rows
        .iter()
        .map(|row| (row.manager_name.as_str(), row.avg_minutes))
        .collect::<Vec<_>>();
    assert_eq!(
        averages,
        vec![
            ("m11", 0.1),
            ("m12", 0.3),
            ("m17", 0.3),
            ("m13", 0.8),
            ("m16", 0.8),
            ("m14", 0.9),
            ("m15", 2.3),
        ]
    );

    let pipeline = run_report(
        &inputs.messages,
        &inputs.managers,
        &inputs.supervisors,
        &ReportSettings::default(),
    )
    .expect("pipeline should run");
    assert_eq!(pipeline.rows, sql_rows);

    let parity = verify_report_parity(&connection, &ReportSettings::default())
        .expect("parity should run");
    assert!(parity.is_match(), "{:?}", parity.mismatches);
}
