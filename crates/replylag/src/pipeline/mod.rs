//! The response-latency computation, one module per stage:
//! link → filter → night window → latency → aggregate → join.

pub mod aggregate;
pub mod filter;
pub mod join;
pub mod latency;
pub mod linker;
pub mod night_window;

use anyhow::Result;
use log::debug;
use serde::Serialize;

use crate::config::ReportSettings;
use crate::models::{
    ClientReply, ConversationId, LatencyRecord, LinkedMessage, Manager, Message, NormalizedReply,
    PipelineStats, ReportRow, Supervisor,
};

pub use aggregate::{average_by_manager, round_to_tenth};
pub use filter::select_client_replies;
pub use join::{JoinOutcome, join_references, sort_report_rows};
pub use latency::{compute_latencies, response_minutes};
pub use linker::link_preceding_messages;
pub use night_window::{normalize_instant, normalize_replies};

#[derive(Debug, Clone, PartialEq)]
pub struct ReportOutcome {
    pub rows: Vec<ReportRow>,
    pub stats: PipelineStats,
}

pub fn run_report(
    messages: &[Message],
    managers: &[Manager],
    supervisors: &[Supervisor],
    settings: &ReportSettings,
) -> Result<ReportOutcome> {
    let linked = link_preceding_messages(messages);
    debug!(
        "pipeline: linked messages={} linked={}",
        messages.len(),
        linked.len()
    );

    let replies = select_client_replies(&linked);
    debug!("pipeline: filtered client_replies={}", replies.len());

    let normalized = normalize_replies(&replies, settings)?;
    let latencies = compute_latencies(&normalized, settings)?;
    debug!("pipeline: latency records={}", latencies.len());

    let averages = average_by_manager(&latencies);
    let joined = join_references(&averages, managers, supervisors);
    debug!(
        "pipeline: joined managers_averaged={} rows={} unresolved={}",
        averages.len(),
        joined.rows.len(),
        joined.unresolved
    );

    let stats = PipelineStats {
        messages: messages.len(),
        linked_messages: linked.len(),
        client_replies: replies.len(),
        latency_records: latencies.len(),
        managers_averaged: averages.len(),
        rows_emitted: joined.rows.len(),
        averages_without_reference: joined.unresolved,
    };

    Ok(ReportOutcome {
        rows: joined.rows,
        stats,
    })
}

/// Intermediate rows of every per-message stage for one conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationTrace {
    pub conversation_id: ConversationId,
    pub linked: Vec<LinkedMessage>,
    pub replies: Vec<ClientReply>,
    pub normalized: Vec<NormalizedReply>,
    pub latencies: Vec<LatencyRecord>,
}

pub fn trace_conversation(
    messages: &[Message],
    conversation_id: ConversationId,
    settings: &ReportSettings,
) -> Result<ConversationTrace> {
    let thread = messages
        .iter()
        .filter(|message| message.conversation_id == conversation_id)
        .copied()
        .collect::<Vec<_>>();

    let linked = link_preceding_messages(&thread);
    let replies = select_client_replies(&linked);
    let normalized = normalize_replies(&replies, settings)?;
    let latencies = compute_latencies(&normalized, settings)?;

    Ok(ConversationTrace {
        conversation_id,
        linked,
        replies,
        normalized,
        latencies,
    })
}
