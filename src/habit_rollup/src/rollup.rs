//! Rollup engine: calendar boundaries + per-bucket aggregation + progress.
//!
//! [`rollup`] is the pure entry point. It validates the config, asks the calendar for
//! boundaries, partitions the (already time-ordered) logs with one forward scan, and
//! emits one [`Bucket`] per boundary, including empty ones.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    aggregate::aggregate,
    calendar::{Boundary, generate_buckets},
    error::Result,
    habit::{HabitConfig, LogEntry},
    progress::ratio,
};

/// One period instance with its aggregated value and progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Inclusive start (UTC).
    pub start: DateTime<Utc>,
    /// Exclusive end (UTC).
    pub end: DateTime<Utc>,
    /// Aggregated value; zero when no log falls in the bucket.
    pub value: Decimal,
    /// Copied from the habit config.
    pub target: Decimal,
    /// `value / target`; `None` iff the target is zero.
    pub progress_ratio: Option<Decimal>,
}

/// Roll `logs` up into the buckets covering `[range_start, range_end]`.
///
/// `logs` must be sorted by `occurred_at` ascending; they are not re-sorted. Logs
/// outside every bucket are ignored. Fails before looking at any log if the config
/// or its timezone is invalid.
pub fn rollup(
    config: &HabitConfig,
    logs: &[LogEntry],
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
) -> Result<Vec<Bucket>> {
    let boundaries = generate_buckets(config, range_start, range_end)?;
    Ok(rollup_over(config, &boundaries, logs))
}

/// Assemble buckets for precomputed, contiguous `boundaries`.
///
/// Single pass over `logs`: a cursor skips logs before each bucket and consumes the
/// ones before its end, so the work is O(buckets + logs).
pub fn rollup_over(
    config: &HabitConfig,
    boundaries: &[Boundary],
    logs: &[LogEntry],
) -> Vec<Bucket> {
    debug_assert!(
        logs.windows(2).all(|w| w[0].occurred_at <= w[1].occurred_at),
        "logs must be ordered by occurred_at"
    );

    let target = config.target_per_period;
    let mut out = Vec::with_capacity(boundaries.len());
    let mut cursor = 0;
    for b in boundaries {
        while cursor < logs.len() && logs[cursor].occurred_at < b.start {
            cursor += 1;
        }
        let first = cursor;
        while cursor < logs.len() && logs[cursor].occurred_at < b.end {
            cursor += 1;
        }

        let value = aggregate(config.aggregation_kind, &logs[first..cursor]);
        out.push(Bucket {
            start: b.start,
            end: b.end,
            value,
            target,
            progress_ratio: ratio(value, target),
        });
    }

    tracing::debug!(
        habit_id = %config.id,
        period = %config.period_kind,
        buckets = out.len(),
        logs = logs.len(),
        "rollup assembled"
    );
    out
}
