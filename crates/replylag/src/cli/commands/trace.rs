use anyhow::Result;
use clap::Args;
use serde::Serialize;
use serde_json::json;
use time::UtcOffset;

use crate::cli::app::SettingsArgs;
use crate::config::RuntimePaths;
use crate::models::{CommandEnvelope, ConversationId, LatencyRecord, NormalizedReply};
use crate::pipeline::trace_conversation;
use crate::sqlite::{load_messages, open_sqlite_read_only};
use crate::utils::time::{format_local, format_utc_offset};

#[derive(Debug, Clone, Args)]
pub struct TraceArgs {
    #[arg(value_name = "CONVERSATION_ID", allow_hyphen_values = true)]
    pub conversation_id: ConversationId,

    #[command(flatten)]
    pub settings: SettingsArgs,
}

/// Latency row with its normalized instants rendered at the report offset.
#[derive(Debug, Clone, PartialEq, Serialize)]
struct TracedLatency {
    sender_id: i64,
    preceding_local: String,
    replied_local: String,
    minutes: f64,
}

pub fn run(args: &TraceArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let settings = args.settings.resolve()?;
    eprintln!(
        "trace: start conversation_id={} db={}",
        args.conversation_id,
        runtime_paths.database_path.display()
    );

    let connection = open_sqlite_read_only(&runtime_paths.database_path)?;
    let messages = load_messages(&connection)?;
    let trace = trace_conversation(&messages, args.conversation_id, &settings)?;

    let latencies = trace
        .normalized
        .iter()
        .zip(&trace.latencies)
        .map(|(reply, latency)| traced_latency(reply, latency, settings.utc_offset))
        .collect::<Result<Vec<_>>>()?;

    let envelope = CommandEnvelope::ok(
        "trace",
        json!({
            "conversation_id": trace.conversation_id,
            "linked": trace.linked,
            "replies": trace.replies,
            "normalized": trace.normalized,
            "latencies": latencies,
        }),
    )
    .with_meta("utc_offset", json!(format_utc_offset(settings.utc_offset)))
    .with_meta(
        "business_start",
        json!(settings.window.business_start.to_string()),
    );
    let envelope = if trace.linked.is_empty() {
        envelope.with_warning(
            "conversation_not_found",
            "no messages for this conversation id",
            None,
        )
    } else {
        envelope
    };
    println!("{}", envelope.to_json_line()?);

    eprintln!(
        "trace: complete messages={} replies={}",
        trace.linked.len(),
        trace.replies.len()
    );
    Ok(())
}

fn traced_latency(
    reply: &NormalizedReply,
    latency: &LatencyRecord,
    offset: UtcOffset,
) -> Result<TracedLatency> {
    Ok(TracedLatency {
        sender_id: latency.sender_id,
        preceding_local: format_local(reply.preceding_at, offset)?,
        replied_local: format_local(reply.replied_at, offset)?,
        minutes: latency.minutes,
    })
}
