use std::fmt::{Display, Formatter};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime, Time, UtcOffset};

const EPOCH_SECONDS_CUTOFF: i128 = 100_000_000_000;
const EPOCH_MILLIS_CUTOFF: i128 = 100_000_000_000_000;
const EPOCH_MICROS_CUTOFF: i128 = 100_000_000_000_000_000;

/// Wall-clock time of day with whole-second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime {
    seconds_of_day: u32,
}

impl ClockTime {
    pub const MIDNIGHT: Self = Self::at(0, 0, 0);

    pub(crate) const fn at(hour: u32, minute: u32, second: u32) -> Self {
        Self {
            seconds_of_day: hour * 3_600 + minute * 60 + second,
        }
    }

    #[must_use]
    pub const fn from_hms(hour: u8, minute: u8, second: u8) -> Option<Self> {
        if hour < 24 && minute < 60 && second < 60 {
            Some(Self::at(hour as u32, minute as u32, second as u32))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn seconds_of_day(self) -> u32 {
        self.seconds_of_day
    }

    /// Accepts `HH:MM` or `HH:MM:SS`.
    pub fn parse(raw: &str) -> Result<Self> {
        let candidate = raw.trim();
        let captures = clock_time_regex()
            .captures(candidate)
            .ok_or_else(|| anyhow!("unsupported clock time (expected HH:MM[:SS]): {candidate}"))?;

        let hour = parse_clock_component(captures.get(1).map(|m| m.as_str()), "hour")?;
        let minute = parse_clock_component(captures.get(2).map(|m| m.as_str()), "minute")?;
        let second = match captures.get(3) {
            Some(value) => parse_clock_component(Some(value.as_str()), "second")?,
            None => 0,
        };

        Self::from_hms(hour, minute, second)
            .ok_or_else(|| anyhow!("clock time out of range: {candidate}"))
    }
}

impl Display for ClockTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let hours = self.seconds_of_day / 3_600;
        let minutes = (self.seconds_of_day % 3_600) / 60;
        let seconds = self.seconds_of_day % 60;
        write!(f, "{hours:02}:{minutes:02}:{seconds:02}")
    }
}

/// A unix instant viewed at a fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalInstant {
    pub unix_seconds: i64,
    pub date: Date,
    pub time_of_day: ClockTime,
    pub day_start_unix_seconds: i64,
}

impl LocalInstant {
    /// Same calendar day, different wall-clock time.
    #[must_use]
    pub fn with_time_of_day(self, time_of_day: ClockTime) -> Self {
        Self {
            unix_seconds: self.day_start_unix_seconds + i64::from(time_of_day.seconds_of_day()),
            time_of_day,
            ..self
        }
    }
}

pub fn local_instant(unix_seconds: i64, offset: UtcOffset) -> Result<LocalInstant> {
    let local = OffsetDateTime::from_unix_timestamp(unix_seconds)
        .with_context(|| format!("timestamp outside the supported range: {unix_seconds}"))?
        .to_offset(offset);
    let (hour, minute, second) = local.to_hms();

    Ok(LocalInstant {
        unix_seconds,
        date: local.date(),
        time_of_day: ClockTime::at(u32::from(hour), u32::from(minute), u32::from(second)),
        day_start_unix_seconds: local.replace_time(Time::MIDNIGHT).unix_timestamp(),
    })
}

/// Accepts `Z`, `UTC`, `+HH:MM`, `-HH:MM` or `+HHMM`.
pub fn parse_utc_offset(raw: &str) -> Result<UtcOffset> {
    let candidate = raw.trim();
    if candidate.eq_ignore_ascii_case("z") || candidate.eq_ignore_ascii_case("utc") {
        return Ok(UtcOffset::UTC);
    }

    let captures = utc_offset_regex()
        .captures(candidate)
        .ok_or_else(|| anyhow!("unsupported utc offset (expected +HH:MM): {candidate}"))?;
    let sign: i8 = if &captures[1] == "-" { -1 } else { 1 };
    let hours = captures[2]
        .parse::<i8>()
        .with_context(|| format!("invalid utc offset hours: {candidate}"))?;
    let minutes = captures[3]
        .parse::<i8>()
        .with_context(|| format!("invalid utc offset minutes: {candidate}"))?;

    UtcOffset::from_hms(sign * hours, sign * minutes, 0)
        .with_context(|| format!("utc offset out of range: {candidate}"))
}

#[must_use]
pub fn format_utc_offset(offset: UtcOffset) -> String {
    let (hours, minutes, _) = offset.as_hms();
    let sign = if offset.is_negative() { '-' } else { '+' };
    format!("{sign}{:02}:{:02}", hours.unsigned_abs(), minutes.unsigned_abs())
}

pub fn format_local(unix_seconds: i64, offset: UtcOffset) -> Result<String> {
    OffsetDateTime::from_unix_timestamp(unix_seconds)
        .with_context(|| format!("timestamp outside the supported range: {unix_seconds}"))?
        .to_offset(offset)
        .format(&Rfc3339)
        .context("failed to format timestamp")
}

#[must_use]
pub fn unix_timestamp_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}

#[must_use]
pub fn format_unix_seconds_utc(unix_seconds: u64) -> String {
    i64::try_from(unix_seconds)
        .ok()
        .and_then(|seconds| OffsetDateTime::from_unix_timestamp(seconds).ok())
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| "1970-01-01T00:00:00Z".to_string())
}

/// Epoch integers are scaled down to seconds by magnitude; RFC 3339 strings
/// are accepted as well.
pub fn parse_timestamp_to_unix_seconds(raw: &str) -> Result<i64> {
    let candidate = raw.trim();
    if candidate.is_empty() {
        bail!("timestamp input is empty");
    }

    if let Ok(epoch_raw) = candidate.parse::<i128>() {
        return epoch_to_unix_seconds(epoch_raw);
    }

    if let Ok(parsed) = OffsetDateTime::parse(candidate, &Rfc3339) {
        return Ok(parsed.unix_timestamp());
    }

    bail!("unsupported timestamp format: {candidate}");
}

pub fn epoch_to_unix_seconds(epoch_raw: i128) -> Result<i64> {
    if epoch_raw < 0 {
        bail!("negative epoch values are not supported");
    }

    let epoch_seconds = if epoch_raw < EPOCH_SECONDS_CUTOFF {
        epoch_raw
    } else if epoch_raw < EPOCH_MILLIS_CUTOFF {
        epoch_raw / 1_000
    } else if epoch_raw < EPOCH_MICROS_CUTOFF {
        epoch_raw / 1_000_000
    } else {
        epoch_raw / 1_000_000_000
    };

    i64::try_from(epoch_seconds)
        .map_err(|_| anyhow!("timestamp exceeds supported unix second range"))
}

fn parse_clock_component(value: Option<&str>, label: &str) -> Result<u8> {
    value
        .ok_or_else(|| anyhow!("missing {label} in clock time"))?
        .parse::<u8>()
        .with_context(|| format!("invalid {label} in clock time"))
}

fn clock_time_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^(\d{1,2}):(\d{2})(?::(\d{2}))?$").expect("clock time regex should compile")
    })
}

fn utc_offset_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^([+-])(\d{2}):?(\d{2})$").expect("utc offset regex should compile")
    })
}
