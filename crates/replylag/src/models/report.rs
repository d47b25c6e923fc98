use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::chat::SenderId;
use super::reference::SupervisorId;

pub const REPORT_SCHEMA_VERSION: &str = "replylag.report.v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportRow {
    pub supervisor_name: String,
    pub manager_name: String,
    pub avg_minutes: f64,

    pub manager_id: SenderId,
    pub supervisor_id: SupervisorId,
    pub reply_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PipelineStats {
    pub messages: usize,
    pub linked_messages: usize,
    pub client_replies: usize,
    pub latency_records: usize,
    pub managers_averaged: usize,
    pub rows_emitted: usize,
    pub averages_without_reference: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportArtifact {
    pub schema_version: String,
    pub generated_at_utc: String,
    pub business_start: String,
    pub day_end: String,
    pub utc_offset: String,
    pub stats: PipelineStats,
    pub rows: Vec<ReportRow>,
}
