use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::models::{
    Manager, ManagerRecord, Message, MessageRecord, Supervisor, SupervisorRecord,
};
use crate::sqlite::{
    DEFAULT_INSERT_BATCH_SIZE, ReportInputs, SqliteWriteStats, ensure_source_schema,
    open_sqlite_connection, replace_report_inputs, write_report_inputs,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestPlan {
    pub messages_path: Option<PathBuf>,
    pub managers_path: Option<PathBuf>,
    pub supervisors_path: Option<PathBuf>,
    pub database_path: PathBuf,
    pub replace: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub database_path: String,
    pub replaced: bool,
    pub messages_read: usize,
    pub managers_read: usize,
    pub supervisors_read: usize,
    pub write: SqliteWriteStats,
}

/// Parses every input first, then writes; a bad line leaves the database
/// untouched. With `replace`, clearing and writing commit together.
pub fn run_ingest(plan: &IngestPlan) -> Result<IngestReport> {
    if plan.messages_path.is_none()
        && plan.managers_path.is_none()
        && plan.supervisors_path.is_none()
    {
        bail!("nothing to ingest: pass at least one of --messages, --managers, --supervisors");
    }

    let inputs = ReportInputs {
        messages: read_optional(plan.messages_path.as_deref(), read_messages_jsonl)?,
        managers: read_optional(plan.managers_path.as_deref(), read_managers_jsonl)?,
        supervisors: read_optional(plan.supervisors_path.as_deref(), read_supervisors_jsonl)?,
    };

    let mut connection = open_sqlite_connection(&plan.database_path)?;
    ensure_source_schema(&connection)?;
    let write = if plan.replace {
        replace_report_inputs(&mut connection, &inputs)
    } else {
        write_report_inputs(&mut connection, &inputs, DEFAULT_INSERT_BATCH_SIZE)
    }
    .context("failed to write ingested rows to sqlite")?;

    Ok(IngestReport {
        database_path: plan.database_path.display().to_string(),
        replaced: plan.replace,
        messages_read: inputs.messages.len(),
        managers_read: inputs.managers.len(),
        supervisors_read: inputs.supervisors.len(),
        write,
    })
}

pub fn read_messages_jsonl(path: &Path) -> Result<Vec<Message>> {
    read_jsonl_file::<MessageRecord>(path)?
        .into_iter()
        .map(|(line, record)| {
            record
                .into_message()
                .with_context(|| format!("{}:{line}: invalid message", path.display()))
        })
        .collect()
}

pub fn read_managers_jsonl(path: &Path) -> Result<Vec<Manager>> {
    read_jsonl_file::<ManagerRecord>(path)?
        .into_iter()
        .map(|(line, record)| {
            record
                .into_manager()
                .with_context(|| format!("{}:{line}: invalid manager", path.display()))
        })
        .collect()
}

pub fn read_supervisors_jsonl(path: &Path) -> Result<Vec<Supervisor>> {
    read_jsonl_file::<SupervisorRecord>(path)?
        .into_iter()
        .map(|(line, record)| {
            record
                .into_supervisor()
                .with_context(|| format!("{}:{line}: invalid supervisor", path.display()))
        })
        .collect()
}

/// Decoded records paired with their 1-based line numbers. Blank lines are
/// skipped.
pub fn parse_jsonl_records<T: DeserializeOwned>(input: &str) -> Result<Vec<(usize, T)>> {
    let mut records = Vec::new();
    for (index, raw_line) in input.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        let record = serde_json::from_str::<T>(line)
            .with_context(|| format!("invalid jsonl row at line {}", index + 1))?;
        records.push((index + 1, record));
    }
    Ok(records)
}

fn read_jsonl_file<T: DeserializeOwned>(path: &Path) -> Result<Vec<(usize, T)>> {
    let input = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read jsonl input: {}", path.display()))?;
    parse_jsonl_records(&input).with_context(|| format!("failed to parse {}", path.display()))
}

fn read_optional<T>(path: Option<&Path>, reader: fn(&Path) -> Result<Vec<T>>) -> Result<Vec<T>> {
    match path {
        Some(path) => reader(path),
        None => Ok(Vec::new()),
    }
}
