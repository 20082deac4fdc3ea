//! Time zone parsing and local wall-clock conversion helpers.
//!
//! What this module provides:
//! - [`parse_tz`]: Parse an IANA time zone name, erroring with [`RollupError::Timezone`].
//! - [`from_local_naive_with_policy`]: Convert a naive local timestamp to UTC, choosing how
//!   DST gaps (spring-forward) and ambiguities (fall-back) resolve via [`DstPolicy`].
//! - [`local_midnight_utc`]: The UTC instant at which a local calendar day begins.
//! - [`local_date`]: The local calendar day an instant falls on.
//! - [`resolve_effective_tz`]: Walk the habit → owner → default chain of zone names.
//!
//! Notes:
//! - Ambiguous local times happen during “fall back” when a wall time occurs twice.
//! - Nonexistent local times happen during “spring forward” when a wall time is skipped.
//! - Bucket boundaries always use [`DstPolicy::Boundary`], so a local day may span 23 or 25
//!   hours of elapsed time. That is intended: habit days follow the user's wall clock.
//!
//! Examples
//! - Toronto 2024-03-10 starts at 05:00Z and ends at 04:00Z the next day (23 hours).
//! - New York “fall back” ambiguity (2024-11-03 01:30 occurs twice):
//!   PreferEarliest -> 05:30Z, PreferLatest -> 06:30Z.

use anyhow::Context;
use chrono::{
    DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RollupError};

/// Longest DST gap we step across when shifting forward (some zones have skipped whole days).
const MAX_GAP_MINUTES: i64 = 26 * 60;

/// RFC-3339 with offset -> UTC.
///
/// Example:
/// - "2024-03-10T09:30:00-05:00" -> "2024-03-10T14:30:00Z"
pub fn parse_ts_to_utc(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let dt = DateTime::parse_from_rfc3339(s).with_context(|| format!("bad rfc3339: {s}"))?;
    Ok(dt.with_timezone(&Utc))
}

/// Parse an IANA time zone name (e.g. "America/Toronto").
pub fn parse_tz(name: &str) -> Result<Tz> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RollupError::Timezone("empty timezone identifier".into()));
    }
    trimmed
        .parse::<Tz>()
        .map_err(|e| RollupError::Timezone(format!("unknown timezone {trimmed:?}: {e}")))
}

/// Policy for handling DST edge cases when converting local naive timestamps to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DstPolicy {
    /// Error on ambiguous (fall-back) or nonexistent (spring-forward) local times.
    Strict,
    /// For ambiguous local times, pick the earliest instant (typically the DST occurrence).
    PreferEarliest,
    /// For ambiguous local times, pick the latest instant (typically the standard-time occurrence).
    PreferLatest,
    /// For nonexistent local times, shift forward in one-minute increments until the
    /// first valid instant is found.
    ShiftForward,
    /// Earliest instant on ambiguity, shift forward across gaps. Never errors for
    /// real zones; used for every bucket boundary.
    Boundary,
}

/// Convert a naive local timestamp to UTC using a specific IANA time zone and DST policy.
///
/// Behavior:
/// - If the local time maps to a single instant, that instant is returned.
/// - Ambiguous local time: PreferEarliest/Boundary pick the earlier instant, PreferLatest
///   the later one, Strict/ShiftForward error.
/// - Nonexistent local time: ShiftForward/Boundary step forward minute by minute until a
///   valid instant is found (max 26 hours), the others error.
pub fn from_local_naive_with_policy(
    naive: NaiveDateTime,
    tz: Tz,
    policy: DstPolicy,
) -> Result<DateTime<Utc>> {
    let zone = tz.name();
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(a, b) => match policy {
            DstPolicy::PreferEarliest | DstPolicy::Boundary => Ok(a.with_timezone(&Utc)),
            DstPolicy::PreferLatest => Ok(b.with_timezone(&Utc)),
            DstPolicy::Strict | DstPolicy::ShiftForward => Err(RollupError::Timezone(format!(
                "ambiguous local time {naive} in {zone}"
            ))),
        },
        LocalResult::None => match policy {
            DstPolicy::ShiftForward | DstPolicy::Boundary => {
                let mut t = naive;
                for _ in 0..MAX_GAP_MINUTES {
                    t += chrono::Duration::minutes(1);
                    match tz.from_local_datetime(&t) {
                        LocalResult::Single(dt) => return Ok(dt.with_timezone(&Utc)),
                        LocalResult::Ambiguous(a, _) => return Ok(a.with_timezone(&Utc)),
                        LocalResult::None => {}
                    }
                }
                Err(RollupError::Timezone(format!(
                    "nonexistent local time {naive} in {zone}"
                )))
            }
            _ => Err(RollupError::Timezone(format!(
                "nonexistent local time {naive} in {zone}"
            ))),
        },
    }
}

/// UTC instant at which `date` begins on the wall clock of `tz`.
pub fn local_midnight_utc(date: NaiveDate, tz: Tz) -> Result<DateTime<Utc>> {
    from_local_naive_with_policy(date.and_time(NaiveTime::MIN), tz, DstPolicy::Boundary)
}

/// Local calendar day of `instant` in `tz`.
///
/// `None` when the local wall-clock time falls outside the representable calendar
/// (e.g. [`DateTime::<Utc>::MIN_UTC`] in a zone west of Greenwich).
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> Option<NaiveDate> {
    let utc = instant.naive_utc();
    let offset_secs = tz.offset_from_utc_datetime(&utc).fix().local_minus_utc();
    utc.checked_add_signed(TimeDelta::seconds(i64::from(offset_secs)))
        .map(|local| local.date())
}

/// How the effective-timezone chain treats names that fail to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TzFallback {
    /// The first present name must resolve.
    Strict,
    /// Skip unresolvable names (with a warning) and try the next link, so a broken
    /// owner timezone lands on the server default.
    #[default]
    Lenient,
}

/// Resolve the effective timezone from an ordered chain of optional names
/// (habit override, owner timezone, server default).
///
/// Blank names count as absent. Returns the chosen name and the parsed zone.
pub fn resolve_effective_tz(chain: &[Option<&str>], fallback: TzFallback) -> Result<(String, Tz)> {
    let mut last_err = None;
    for name in chain.iter().flatten().map(|n| n.trim()) {
        if name.is_empty() {
            continue;
        }
        match parse_tz(name) {
            Ok(tz) => return Ok((name.to_string(), tz)),
            Err(err) => match fallback {
                TzFallback::Strict => return Err(err),
                TzFallback::Lenient => {
                    tracing::warn!(timezone = name, error = %err, "skipping unresolvable timezone");
                    last_err = Some(err);
                }
            },
        }
    }
    Err(last_err.unwrap_or_else(|| RollupError::Timezone("no timezone configured".into())))
}
