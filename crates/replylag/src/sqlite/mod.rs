use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use log::warn;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags, Row, Transaction, named_params, params};
use serde::Serialize;

use crate::config::ReportSettings;
use crate::models::{Manager, Message, ReportRow, Supervisor, parse_reference_id};
use crate::models::reference::float_to_id;
use crate::pipeline::{round_to_tenth, sort_report_rows};

pub const MESSAGES_TABLE: &str = "messages";
pub const MANAGERS_TABLE: &str = "managers";
pub const SUPERVISORS_TABLE: &str = "supervisors";
pub const DEFAULT_INSERT_BATCH_SIZE: usize = 500;
pub const AVERAGE_TOLERANCE: f64 = 1e-6;

const CREATE_MESSAGES_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    conversation_id INTEGER NOT NULL,
    sender_id INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);
"#;

const CREATE_INDEX_MESSAGES_CONVERSATION_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_messages_conversation_time
ON messages (conversation_id, created_at);
"#;

// Reference ids are declared without a type so string-encoded ids survive as
// written and are normalized on read.
const CREATE_MANAGERS_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS managers (
    manager_id NOT NULL,
    manager_name TEXT NOT NULL,
    supervisor_id
);
"#;

const CREATE_SUPERVISORS_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS supervisors (
    supervisor_id NOT NULL,
    supervisor_name TEXT NOT NULL
);
"#;

/// The whole report as one statement. Parameters: `:utc_offset` (seconds),
/// `:business_start` and `:day_end` (seconds of day). Averages come back
/// unrounded; [`run_sql_report`] rounds them with the pipeline's rule.
pub const SQL_REPORT_QUERY: &str = r#"
WITH linked AS (
    SELECT
        conversation_id,
        sender_id,
        created_at + :utc_offset AS local_at,
        LAG(sender_id) OVER conversation_order AS preceding_sender_id,
        LAG(created_at + :utc_offset) OVER conversation_order AS preceding_local_at
    FROM messages
    WINDOW conversation_order AS (PARTITION BY conversation_id ORDER BY created_at, rowid)
),
client_replies AS (
    SELECT sender_id, local_at, preceding_local_at
    FROM linked
    WHERE preceding_sender_id <> sender_id
      AND sender_id <> 0
),
reply_days AS (
    SELECT
        sender_id,
        local_at,
        preceding_local_at,
        CAST(strftime('%s', local_at, 'unixepoch', 'start of day') AS INTEGER) AS reply_day,
        CAST(strftime('%s', preceding_local_at, 'unixepoch', 'start of day') AS INTEGER)
            AS preceding_day
    FROM client_replies
),
normalized AS (
    SELECT
        sender_id,
        reply_day,
        preceding_day,
        CASE
            WHEN local_at - reply_day > 0 AND local_at - reply_day < :business_start
                THEN reply_day + :business_start
            ELSE local_at
        END AS reply_at,
        CASE
            WHEN preceding_local_at - preceding_day > 0
                AND preceding_local_at - preceding_day < :business_start
                THEN preceding_day + :business_start
            ELSE preceding_local_at
        END AS preceding_at
    FROM reply_days
),
latencies AS (
    SELECT
        sender_id,
        CASE
            WHEN reply_day = preceding_day THEN (reply_at - preceding_at) / 60.0
            ELSE (preceding_day + :day_end - preceding_at) / 60.0
                + (reply_at - reply_day - :business_start) / 60.0
        END AS minutes
    FROM normalized
),
averages AS (
    SELECT
        sender_id AS manager_id,
        AVG(minutes) AS avg_minutes,
        COUNT(*) AS reply_count
    FROM latencies
    GROUP BY sender_id
)
SELECT
    s.supervisor_name,
    m.manager_name,
    a.avg_minutes,
    a.manager_id,
    CAST(s.supervisor_id AS INTEGER) AS supervisor_id,
    a.reply_count
FROM averages AS a
JOIN managers AS m ON CAST(m.manager_id AS INTEGER) = a.manager_id
JOIN supervisors AS s ON CAST(s.supervisor_id AS INTEGER) = CAST(m.supervisor_id AS INTEGER)
ORDER BY a.avg_minutes, s.supervisor_name, m.manager_name, a.manager_id
"#;

#[must_use]
pub fn schema_statements() -> &'static [&'static str] {
    &[
        CREATE_MESSAGES_TABLE_SQL,
        CREATE_INDEX_MESSAGES_CONVERSATION_SQL,
        CREATE_MANAGERS_TABLE_SQL,
        CREATE_SUPERVISORS_TABLE_SQL,
    ]
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportInputs {
    pub messages: Vec<Message>,
    pub managers: Vec<Manager>,
    pub supervisors: Vec<Supervisor>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SqliteWriteStats {
    pub messages_written: usize,
    pub managers_written: usize,
    pub supervisors_written: usize,
    pub batches_committed: usize,
}

pub fn open_sqlite_connection(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!(
                "failed to create sqlite parent directory: {}",
                parent.display()
            )
        })?;
    }

    Connection::open(path)
        .with_context(|| format!("failed to open sqlite database: {}", path.display()))
}

/// Opens an existing database without creating it.
pub fn open_sqlite_read_only(path: &Path) -> Result<Connection> {
    if !path.is_file() {
        bail!("sqlite database does not exist: {}", path.display());
    }

    Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("failed to open sqlite database: {}", path.display()))
}

pub fn ensure_source_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(&schema_statements().concat())
        .context("failed to create sqlite source tables")
}

pub fn clear_source_tables(connection: &Connection) -> Result<()> {
    for table in [MESSAGES_TABLE, MANAGERS_TABLE, SUPERVISORS_TABLE] {
        connection
            .execute(&format!("DELETE FROM {table}"), [])
            .with_context(|| format!("failed to clear sqlite table {table}"))?;
    }
    Ok(())
}

pub fn load_report_inputs(connection: &Connection) -> Result<ReportInputs> {
    Ok(ReportInputs {
        messages: load_messages(connection)?,
        managers: load_managers(connection)?,
        supervisors: load_supervisors(connection)?,
    })
}

/// Rows come back in insertion order, which fixes the order of messages
/// sharing a timestamp.
pub fn load_messages(connection: &Connection) -> Result<Vec<Message>> {
    let query =
        format!("SELECT conversation_id, sender_id, created_at FROM {MESSAGES_TABLE} ORDER BY rowid");
    let mut statement = connection
        .prepare(&query)
        .context("failed to prepare messages query")?;
    let rows = statement
        .query_map([], |row| {
            Ok(Message {
                conversation_id: row.get(0)?,
                sender_id: row.get(1)?,
                created_at: row.get(2)?,
            })
        })
        .context("failed to query messages")?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to decode message row")
}

pub fn load_managers(connection: &Connection) -> Result<Vec<Manager>> {
    let query = format!(
        "SELECT manager_id, manager_name, supervisor_id FROM {MANAGERS_TABLE} ORDER BY rowid"
    );
    let raw_rows = query_raw_rows(connection, &query, 3)?;

    let mut managers = Vec::with_capacity(raw_rows.len());
    for (index, mut row) in raw_rows.into_iter().enumerate() {
        let supervisor_id = sql_value_to_id(&row[2], MANAGERS_TABLE, "supervisor_id")?;
        let manager_name = sql_value_to_text(std::mem::replace(&mut row[1], SqlValue::Null))
            .with_context(|| format!("{MANAGERS_TABLE} row {}: invalid manager_name", index + 1))?;
        let Some(manager_id) = sql_value_to_id(&row[0], MANAGERS_TABLE, "manager_id")? else {
            warn!("sqlite: skipping {MANAGERS_TABLE} row {} with null manager_id", index + 1);
            continue;
        };

        managers.push(Manager {
            manager_id,
            manager_name,
            supervisor_id,
        });
    }

    Ok(managers)
}

pub fn load_supervisors(connection: &Connection) -> Result<Vec<Supervisor>> {
    let query =
        format!("SELECT supervisor_id, supervisor_name FROM {SUPERVISORS_TABLE} ORDER BY rowid");
    let raw_rows = query_raw_rows(connection, &query, 2)?;

    let mut supervisors = Vec::with_capacity(raw_rows.len());
    for (index, mut row) in raw_rows.into_iter().enumerate() {
        let supervisor_name = sql_value_to_text(std::mem::replace(&mut row[1], SqlValue::Null))
            .with_context(|| {
                format!("{SUPERVISORS_TABLE} row {}: invalid supervisor_name", index + 1)
            })?;
        let Some(supervisor_id) = sql_value_to_id(&row[0], SUPERVISORS_TABLE, "supervisor_id")?
        else {
            warn!("sqlite: skipping {SUPERVISORS_TABLE} row {} with null supervisor_id", index + 1);
            continue;
        };

        supervisors.push(Supervisor {
            supervisor_id,
            supervisor_name,
        });
    }

    Ok(supervisors)
}

pub fn write_report_inputs(
    connection: &mut Connection,
    inputs: &ReportInputs,
    batch_size: usize,
) -> Result<SqliteWriteStats> {
    let batch_size = batch_size.max(1);
    let mut stats = SqliteWriteStats::default();

    for batch in inputs.messages.chunks(batch_size) {
        let tx = connection
            .transaction()
            .context("failed to open sqlite transaction")?;
        insert_messages(&tx, batch, &mut stats)?;
        tx.commit().context("failed to commit message batch")?;
        stats.batches_committed += 1;
    }

    let tx = connection
        .transaction()
        .context("failed to open sqlite transaction")?;
    insert_references(&tx, inputs, &mut stats)?;
    tx.commit().context("failed to commit reference rows")?;
    stats.batches_committed += 1;

    Ok(stats)
}

/// Empties the source tables and writes `inputs` in a single transaction; on
/// failure the previous contents stay in place.
pub fn replace_report_inputs(
    connection: &mut Connection,
    inputs: &ReportInputs,
) -> Result<SqliteWriteStats> {
    let mut stats = SqliteWriteStats::default();

    let tx = connection
        .transaction()
        .context("failed to open sqlite transaction")?;
    clear_source_tables(&tx)?;
    insert_messages(&tx, &inputs.messages, &mut stats)?;
    insert_references(&tx, inputs, &mut stats)?;
    tx.commit().context("failed to commit replacement rows")?;
    stats.batches_committed += 1;

    Ok(stats)
}

fn insert_messages(
    tx: &Transaction<'_>,
    messages: &[Message],
    stats: &mut SqliteWriteStats,
) -> Result<()> {
    let mut statement = tx
        .prepare_cached(&format!(
            "INSERT INTO {MESSAGES_TABLE} (conversation_id, sender_id, created_at) VALUES (?1, ?2, ?3)"
        ))
        .context("failed to prepare message insert")?;
    for message in messages {
        statement
            .execute(params![
                message.conversation_id,
                message.sender_id,
                message.created_at
            ])
            .with_context(|| {
                format!(
                    "failed to insert message in conversation {}",
                    message.conversation_id
                )
            })?;
        stats.messages_written += 1;
    }
    Ok(())
}

fn insert_references(
    tx: &Transaction<'_>,
    inputs: &ReportInputs,
    stats: &mut SqliteWriteStats,
) -> Result<()> {
    let mut statement = tx
        .prepare_cached(&format!(
            "INSERT INTO {MANAGERS_TABLE} (manager_id, manager_name, supervisor_id) VALUES (?1, ?2, ?3)"
        ))
        .context("failed to prepare manager insert")?;
    for manager in &inputs.managers {
        statement
            .execute(params![
                manager.manager_id,
                manager.manager_name,
                manager.supervisor_id
            ])
            .with_context(|| format!("failed to insert manager {}", manager.manager_id))?;
        stats.managers_written += 1;
    }

    let mut statement = tx
        .prepare_cached(&format!(
            "INSERT INTO {SUPERVISORS_TABLE} (supervisor_id, supervisor_name) VALUES (?1, ?2)"
        ))
        .context("failed to prepare supervisor insert")?;
    for supervisor in &inputs.supervisors {
        statement
            .execute(params![supervisor.supervisor_id, supervisor.supervisor_name])
            .with_context(|| format!("failed to insert supervisor {}", supervisor.supervisor_id))?;
        stats.supervisors_written += 1;
    }
    Ok(())
}

/// Runs [`SQL_REPORT_QUERY`] directly against the database. Rows are
/// re-sorted after rounding so equal averages order as in the pipeline.
pub fn run_sql_report(connection: &Connection, settings: &ReportSettings) -> Result<Vec<ReportRow>> {
    let mut statement = connection
        .prepare(SQL_REPORT_QUERY)
        .context("failed to prepare sql report query")?;
    let rows = statement
        .query_map(
            named_params! {
                ":utc_offset": i64::from(settings.utc_offset.whole_seconds()),
                ":business_start": i64::from(settings.window.business_start.seconds_of_day()),
                ":day_end": i64::from(settings.window.day_end.seconds_of_day()),
            },
            sql_report_row,
        )
        .context("failed to execute sql report query")?;

    let mut rows = rows
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to decode sql report row")?;
    sort_report_rows(&mut rows);
    Ok(rows)
}

fn sql_report_row(row: &Row<'_>) -> rusqlite::Result<ReportRow> {
    let reply_count: i64 = row.get(5)?;
    Ok(ReportRow {
        supervisor_name: row.get(0)?,
        manager_name: row.get(1)?,
        avg_minutes: round_to_tenth(row.get(2)?),
        manager_id: row.get(3)?,
        supervisor_id: row.get(4)?,
        reply_count: usize::try_from(reply_count).unwrap_or_default(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParityMismatch {
    MissingFromSql {
        manager_id: i64,
        supervisor_id: i64,
        avg_minutes: f64,
    },
    MissingFromPipeline {
        manager_id: i64,
        supervisor_id: i64,
        avg_minutes: f64,
    },
    AverageDiffers {
        manager_id: i64,
        supervisor_id: i64,
        pipeline_avg_minutes: f64,
        sql_avg_minutes: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParityReport {
    pub pipeline_rows: usize,
    pub sql_rows: usize,
    pub mismatches: Vec<ParityMismatch>,
}

impl ParityReport {
    #[must_use]
    pub fn is_match(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Compares the in-process pipeline against the SQL rendition, row by row on
/// `(manager_id, supervisor_id, manager_name, supervisor_name)`.
pub fn verify_report_parity(
    connection: &Connection,
    settings: &ReportSettings,
) -> Result<ParityReport> {
    let inputs = load_report_inputs(connection)?;
    let pipeline = crate::pipeline::run_report(
        &inputs.messages,
        &inputs.managers,
        &inputs.supervisors,
        settings,
    )?;
    let sql_rows = run_sql_report(connection, settings)?;

    Ok(compare_report_rows(&pipeline.rows, &sql_rows))
}

#[must_use]
pub fn compare_report_rows(pipeline_rows: &[ReportRow], sql_rows: &[ReportRow]) -> ParityReport {
    let pipeline_by_key = index_rows(pipeline_rows);
    let mut sql_by_key = index_rows(sql_rows);
    let mut mismatches = Vec::new();

    for (key, pipeline_avg) in pipeline_by_key {
        match sql_by_key.remove(&key) {
            Some(sql_avg) if (sql_avg - pipeline_avg).abs() <= AVERAGE_TOLERANCE => {}
            Some(sql_avg) => mismatches.push(ParityMismatch::AverageDiffers {
                manager_id: key.0,
                supervisor_id: key.1,
                pipeline_avg_minutes: pipeline_avg,
                sql_avg_minutes: sql_avg,
            }),
            None => mismatches.push(ParityMismatch::MissingFromSql {
                manager_id: key.0,
                supervisor_id: key.1,
                avg_minutes: pipeline_avg,
            }),
        }
    }
    for (key, sql_avg) in sql_by_key {
        mismatches.push(ParityMismatch::MissingFromPipeline {
            manager_id: key.0,
            supervisor_id: key.1,
            avg_minutes: sql_avg,
        });
    }

    ParityReport {
        pipeline_rows: pipeline_rows.len(),
        sql_rows: sql_rows.len(),
        mismatches,
    }
}

type RowKey = (i64, i64, String, String);

fn index_rows(rows: &[ReportRow]) -> BTreeMap<RowKey, f64> {
    rows.iter()
        .map(|row| {
            (
                (
                    row.manager_id,
                    row.supervisor_id,
                    row.manager_name.clone(),
                    row.supervisor_name.clone(),
                ),
                row.avg_minutes,
            )
        })
        .collect()
}

fn query_raw_rows(connection: &Connection, query: &str, width: usize) -> Result<Vec<Vec<SqlValue>>> {
    let mut statement = connection
        .prepare(query)
        .with_context(|| format!("failed to prepare query: {query}"))?;
    let rows = statement
        .query_map([], |row| {
            (0..width)
                .map(|index| row.get::<usize, SqlValue>(index))
                .collect::<rusqlite::Result<Vec<_>>>()
        })
        .with_context(|| format!("failed to execute query: {query}"))?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to fetch reference row")
}

/// `NULL` maps to `None`; integers, numeric text and integral reals map to
/// an id; anything else is a conversion error.
fn sql_value_to_id(value: &SqlValue, table: &str, field: &str) -> Result<Option<i64>> {
    let label = format!("{table}.{field}");
    match value {
        SqlValue::Null => Ok(None),
        SqlValue::Integer(id) => Ok(Some(*id)),
        SqlValue::Text(raw) => parse_reference_id(raw, &label).map(Some),
        SqlValue::Real(raw) => float_to_id(*raw, &label).map(Some),
        SqlValue::Blob(_) => Err(anyhow!("{label} is a blob and cannot be used as an id")),
    }
}

fn sql_value_to_text(value: SqlValue) -> Result<String> {
    match value {
        SqlValue::Text(text) => Ok(text),
        SqlValue::Integer(number) => Ok(number.to_string()),
        SqlValue::Real(number) => Ok(number.to_string()),
        SqlValue::Null => bail!("value is null"),
        SqlValue::Blob(_) => bail!("value is a blob"),
    }
}
