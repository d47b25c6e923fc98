use anyhow::{Context, Result};

use crate::config::ReportSettings;
use crate::models::{ClientReply, NormalizedReply};
use crate::utils::time::{LocalInstant, local_instant};

/// Moves an instant inside the off-hours window to business start of the same
/// calendar day. Window boundaries themselves are left alone.
pub fn normalize_instant(unix_seconds: i64, settings: &ReportSettings) -> Result<LocalInstant> {
    let instant = local_instant(unix_seconds, settings.utc_offset)?;
    if settings.window.contains(instant.time_of_day) {
        return Ok(instant.with_time_of_day(settings.window.business_start));
    }
    Ok(instant)
}

pub fn normalize_reply(reply: &ClientReply, settings: &ReportSettings) -> Result<NormalizedReply> {
    let preceding = normalize_instant(reply.preceding_at, settings)?;
    let replied = normalize_instant(reply.replied_at, settings)?;

    Ok(NormalizedReply {
        conversation_id: reply.conversation_id,
        sender_id: reply.sender_id,
        preceding_at: preceding.unix_seconds,
        replied_at: replied.unix_seconds,
    })
}

pub fn normalize_replies(
    replies: &[ClientReply],
    settings: &ReportSettings,
) -> Result<Vec<NormalizedReply>> {
    replies
        .iter()
        .map(|reply| {
            normalize_reply(reply, settings).with_context(|| {
                format!(
                    "failed to normalize reply by sender {} in conversation {}",
                    reply.sender_id, reply.conversation_id
                )
            })
        })
        .collect()
}
