use anyhow::{Context, Result};

use crate::config::{OffHoursWindow, ReportSettings};
use crate::models::{LatencyRecord, NormalizedReply};
use crate::utils::time::{LocalInstant, local_instant};

/// Minutes between a message and its reply.
///
/// On the same calendar day this is the plain difference. Across days it is
/// the time left until `day_end` on the first day plus the time since
/// `business_start` on the reply's day. Only one day boundary is counted:
/// whole days in between contribute nothing. The result is never clamped.
#[must_use]
pub fn response_minutes(
    preceding: LocalInstant,
    replied: LocalInstant,
    window: &OffHoursWindow,
) -> f64 {
    if preceding.date == replied.date {
        return seconds_to_minutes(replied.unix_seconds - preceding.unix_seconds);
    }

    let until_day_end = i64::from(window.day_end.seconds_of_day())
        - i64::from(preceding.time_of_day.seconds_of_day());
    let since_business_start = i64::from(replied.time_of_day.seconds_of_day())
        - i64::from(window.business_start.seconds_of_day());

    seconds_to_minutes(until_day_end) + seconds_to_minutes(since_business_start)
}

pub fn compute_latency(reply: &NormalizedReply, settings: &ReportSettings) -> Result<LatencyRecord> {
    let preceding = local_instant(reply.preceding_at, settings.utc_offset)?;
    let replied = local_instant(reply.replied_at, settings.utc_offset)?;

    Ok(LatencyRecord {
        conversation_id: reply.conversation_id,
        sender_id: reply.sender_id,
        minutes: response_minutes(preceding, replied, &settings.window),
    })
}

pub fn compute_latencies(
    replies: &[NormalizedReply],
    settings: &ReportSettings,
) -> Result<Vec<LatencyRecord>> {
    replies
        .iter()
        .map(|reply| {
            compute_latency(reply, settings).with_context(|| {
                format!(
                    "failed to compute latency for sender {} in conversation {}",
                    reply.sender_id, reply.conversation_id
                )
            })
        })
        .collect()
}

fn seconds_to_minutes(seconds: i64) -> f64 {
    seconds as f64 / 60.0
}
