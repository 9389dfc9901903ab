//! Age threshold parsing and eligibility checks.

use anyhow::{bail, Context, Result};
use std::time::{Duration, SystemTime};

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;

/// Unit suffixes, longest first so that "minutes" is never read as "m".
const UNIT_SUFFIXES: &[(&str, u64)] = &[
    ("minutes", SECS_PER_MINUTE),
    ("hours", SECS_PER_HOUR),
    ("days", SECS_PER_DAY),
    ("m", SECS_PER_MINUTE),
    ("h", SECS_PER_HOUR),
    ("d", SECS_PER_DAY),
];

/// Maximum number of fractional-second digits accepted in a clock literal
const MAX_FRACTION_DIGITS: usize = 7;

/// Decides whether a file is old enough to delete.
///
/// The reference instant is captured once, so every entry in a run is
/// measured against the same clock.
#[derive(Debug, Clone, Copy)]
pub struct AgeFilter {
    max_age: Duration,
    now: SystemTime,
}

impl AgeFilter {
    /// Create a filter measuring ages against a fixed instant
    pub fn with_now(max_age: Duration, now: SystemTime) -> Self {
        AgeFilter { max_age, now }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// True when `modified + max_age` lies strictly before the reference instant.
    /// A file exactly `max_age` old is kept.
    pub fn is_expired(&self, modified: SystemTime) -> bool {
        modified
            .checked_add(self.max_age)
            .is_some_and(|keep_until| keep_until < self.now)
    }
}

/// Parse a human-readable maximum age.
///
/// Accepted forms (case-insensitive):
/// - a number with a unit suffix: `7d`, `7days`, `12h`, `12hours`, `30m`, `30minutes`.
///   The number may be fractional, so `1.5d` is 36 hours.
/// - a clock literal `[days.]hours:minutes[:seconds[.fraction]]`, e.g. `1.02:30:00`.
/// - a bare whole number, read as days.
///
/// Any other input is an error; callers must treat it as "no threshold", never as zero.
pub fn parse_duration(duration_str: &str) -> Result<Duration> {
    let trimmed = duration_str.trim();
    if trimmed.is_empty() {
        bail!("Invalid duration: value is empty");
    }

    let lowered = trimmed.to_ascii_lowercase();
    for (suffix, unit_secs) in UNIT_SUFFIXES {
        if let Some(num_str) = lowered.strip_suffix(suffix) {
            let value: f64 = num_str.trim().parse().with_context(|| {
                format!(
                    "Invalid duration format. Expected a number before '{}', got: {}",
                    suffix, trimmed
                )
            })?;
            return Duration::try_from_secs_f64(value * *unit_secs as f64)
                .with_context(|| format!("Duration out of range: {}", trimmed));
        }
    }

    parse_clock_literal(&lowered).with_context(|| {
        format!(
            "Invalid duration '{}'. Use e.g. 7d, 12h, 30minutes or d.hh:mm:ss",
            trimmed
        )
    })
}

/// Parse `[days.]hours:minutes[:seconds[.fraction]]`, or a bare number of days
fn parse_clock_literal(literal: &str) -> Result<Duration> {
    if is_digits(literal) {
        let days = numeric_field(literal, "days", u64::MAX)?;
        return days
            .checked_mul(SECS_PER_DAY)
            .map(Duration::from_secs)
            .context("Duration out of range");
    }

    let fields: Vec<&str> = literal.split(':').collect();
    if !(2..=3).contains(&fields.len()) {
        bail!("Expected hours:minutes or hours:minutes:seconds");
    }

    let (days, hours) = match fields[0].split_once('.') {
        Some((days, hours)) => (numeric_field(days, "days", u64::MAX)?, hours),
        None => (0, fields[0]),
    };
    let hours = numeric_field(hours, "hours", 23)?;
    let minutes = numeric_field(fields[1], "minutes", 59)?;

    let (seconds, nanos) = match fields.get(2) {
        Some(field) => match field.split_once('.') {
            Some((seconds, fraction)) => {
                (numeric_field(seconds, "seconds", 59)?, fraction_nanos(fraction)?)
            }
            None => (numeric_field(field, "seconds", 59)?, 0),
        },
        None => (0, 0),
    };

    let total_secs = days
        .checked_mul(SECS_PER_DAY)
        .and_then(|secs| secs.checked_add(hours * SECS_PER_HOUR + minutes * SECS_PER_MINUTE + seconds))
        .context("Duration out of range")?;

    Ok(Duration::new(total_secs, nanos))
}

fn is_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

fn numeric_field(text: &str, name: &str, max: u64) -> Result<u64> {
    if !is_digits(text) {
        bail!("Expected digits for {}, got: '{}'", name, text);
    }
    let value: u64 = text
        .parse()
        .with_context(|| format!("Value for {} is too large: {}", name, text))?;
    if value > max {
        bail!("{} must be at most {}, got: {}", name, max, value);
    }
    Ok(value)
}

fn fraction_nanos(fraction: &str) -> Result<u32> {
    if !is_digits(fraction) || fraction.len() > MAX_FRACTION_DIGITS {
        bail!(
            "Expected 1 to {} digits of fractional seconds, got: '{}'",
            MAX_FRACTION_DIGITS,
            fraction
        );
    }
    // Right-pad to nanosecond precision: ".5" is 500_000_000ns
    let padded = format!("{:0<9}", fraction);
    padded
        .parse()
        .with_context(|| format!("Invalid fractional seconds: {}", fraction))
}
