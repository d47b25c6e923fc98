use std::collections::BTreeMap;

use crate::models::{LatencyRecord, ManagerAverage, SenderId};

/// One average per sender present in `records`, ordered by sender id.
#[must_use]
pub fn average_by_manager(records: &[LatencyRecord]) -> Vec<ManagerAverage> {
    let mut totals: BTreeMap<SenderId, CompensatedSum> = BTreeMap::new();
    for record in records {
        totals.entry(record.sender_id).or_default().add(record.minutes);
    }

    totals
        .into_iter()
        .map(|(manager_id, total)| ManagerAverage {
            manager_id,
            avg_minutes: round_to_tenth(total.mean()),
            reply_count: total.count,
        })
        .collect()
}

/// Kahan-Babuska-Neumaier running sum, the same accumulation SQLite's `AVG`
/// performs over real values.
#[derive(Debug, Clone, Copy, Default)]
struct CompensatedSum {
    sum: f64,
    error: f64,
    count: usize,
}

impl CompensatedSum {
    fn add(&mut self, value: f64) {
        let total = self.sum + value;
        if self.sum.abs() > value.abs() {
            self.error += (self.sum - total) + value;
        } else {
            self.error += (value - total) + self.sum;
        }
        self.sum = total;
        self.count += 1;
    }

    fn mean(&self) -> f64 {
        (self.sum + self.error) / self.count as f64
    }
}

/// Rounds the exact value held by the double to one decimal place. `0.35`
/// is stored just below the midpoint and becomes `0.3`; exact midpoints such
/// as `2.25` go away from zero. Negative zero collapses to zero.
#[must_use]
pub fn round_to_tenth(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }

    // Only multiples of 0.25 with an odd quarter count sit exactly on a
    // one-decimal midpoint.
    let quarters = value * 4.0;
    let rounded = if quarters.fract() == 0.0 && quarters.rem_euclid(2.0) == 1.0 {
        (value * 10.0).round() / 10.0
    } else {
        format!("{value:.1}").parse::<f64>().unwrap_or(value)
    };
    rounded + 0.0
}
