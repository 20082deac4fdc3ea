//! calendar.rs — period boundaries in a habit's local time
//!
//! - Every boundary is a local midnight converted to UTC (see [`crate::tz::local_midnight_utc`]).
//! - Daily: one local calendar day.
//! - Weekly: seven local days starting on the habit's `week_start_day`.
//! - Monthly: first of month to first of next month (28–31 days).
//! - Rolling: `rolling_length_days`-day cycles counted from `anchor_date`, in either direction.
//!
//! Buckets are never truncated to the request: the first one starts at or before the
//! range start, the last one ends after the range end (the range end is inclusive).

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, TimeDelta, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, RollupError},
    habit::{HabitConfig, PeriodKind},
    tz::{local_date, local_midnight_utc, parse_tz},
};

/// Half-open UTC interval `[start, end)` of one period instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boundary {
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Exclusive end.
    pub end: DateTime<Utc>,
}

impl Boundary {
    /// `true` if `t` falls in `[start, end)`.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }
}

/// Period arithmetic on local calendar days, with parameters already validated.
#[derive(Debug, Clone, Copy)]
enum Period {
    Daily,
    Weekly(Weekday),
    Monthly,
    Rolling { anchor: NaiveDate, len: i64 },
}

impl Period {
    fn from_config(config: &HabitConfig) -> Result<Self> {
        Ok(match config.period_kind {
            PeriodKind::Daily => Period::Daily,
            PeriodKind::Weekly => Period::Weekly(config.week_start()),
            PeriodKind::Monthly => Period::Monthly,
            PeriodKind::Rolling => {
                let len = config
                    .rolling_length_days
                    .filter(|n| *n >= 1)
                    .ok_or_else(|| {
                        RollupError::Configuration(format!(
                            "habit {}: rolling period requires rolling_length_days >= 1",
                            config.id
                        ))
                    })?;
                Period::Rolling {
                    anchor: config.anchor_date,
                    len: i64::from(len),
                }
            }
        })
    }

    /// First local day of the period containing `day`.
    fn start_of(self, day: NaiveDate) -> Option<NaiveDate> {
        match self {
            Period::Daily => Some(day),
            Period::Weekly(first) => {
                let back = (day.weekday().num_days_from_sunday() + 7
                    - first.num_days_from_sunday())
                    % 7;
                day.checked_sub_days(Days::new(u64::from(back)))
            }
            Period::Monthly => NaiveDate::from_ymd_opt(day.year(), day.month(), 1),
            Period::Rolling { anchor, len } => {
                let cycle = (day - anchor).num_days().div_euclid(len);
                anchor.checked_add_signed(TimeDelta::try_days(cycle.checked_mul(len)?)?)
            }
        }
    }

    /// First local day of the period after the one starting at `start`.
    fn next(self, start: NaiveDate) -> Option<NaiveDate> {
        match self {
            Period::Daily => start.checked_add_days(Days::new(1)),
            Period::Weekly(_) => start.checked_add_days(Days::new(7)),
            Period::Monthly => start.checked_add_months(Months::new(1)),
            Period::Rolling { len, .. } => start.checked_add_days(Days::new(len as u64)),
        }
    }
}

/// Resolve the zone stored on a config. The engine never falls back to a default.
pub fn config_tz(config: &HabitConfig) -> Result<Tz> {
    match config.timezone.as_deref() {
        Some(name) => parse_tz(name),
        None => Err(RollupError::Timezone(format!(
            "habit {} has no effective timezone",
            config.id
        ))),
    }
}

/// Produce the ordered, contiguous boundaries covering `[range_start, range_end]`.
///
/// Errors:
/// - [`RollupError::Configuration`] for invalid period parameters
/// - [`RollupError::Timezone`] if the config's timezone is absent or unknown
/// - [`RollupError::InvalidRange`] if `range_start > range_end` or the dates overflow
pub fn generate_buckets(
    config: &HabitConfig,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
) -> Result<Vec<Boundary>> {
    config.validate()?;
    let period = Period::from_config(config)?;
    let tz = config_tz(config)?;

    let out_of_range = || RollupError::InvalidRange {
        start: range_start,
        end: range_end,
    };
    if range_start > range_end {
        return Err(out_of_range());
    }

    let mut start_day = period
        .start_of(local_date(range_start, tz).ok_or_else(out_of_range)?)
        .ok_or_else(out_of_range)?;
    let mut start = local_midnight_utc(start_day, tz)?;
    let mut out = Vec::new();
    loop {
        let end_day = period.next(start_day).ok_or_else(out_of_range)?;
        let end = local_midnight_utc(end_day, tz)?;
        out.push(Boundary { start, end });
        if end > range_end {
            break;
        }
        start_day = end_day;
        start = end;
    }
    Ok(out)
}

/// The single period instance containing `instant`.
pub fn bucket_containing(config: &HabitConfig, instant: DateTime<Utc>) -> Result<Boundary> {
    let buckets = generate_buckets(config, instant, instant)?;
    buckets
        .into_iter()
        .find(|b| b.contains(instant))
        .ok_or(RollupError::InvalidRange {
            start: instant,
            end: instant,
        })
}
