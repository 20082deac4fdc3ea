//! Habit descriptors consumed by the rollup engine.
//!
//! A [`HabitConfig`] is an immutable snapshot of one habit's period and
//! aggregation settings, taken fresh for each rollup call. [`LogEntry`] is the
//! engine's view of one logged fact. Both enums round-trip through the
//! lowercase codes used by the storage layer (`"sum"`, `"weekly"`, ...).
//!
//! ```
//! use habit_rollup::habit::{AggregationKind, PeriodKind};
//!
//! let kind: AggregationKind = "count".parse().unwrap();
//! assert_eq!(kind, AggregationKind::Count);
//! assert_eq!(PeriodKind::Rolling.to_string(), "rolling");
//! ```

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RollupError};

/// Opaque habit identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitId(pub i64);

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reduction applied to the logs that fall in one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationKind {
    /// Decimal sum of quantities.
    Sum,
    /// Number of logs.
    Count,
    /// 1 if any log exists, else 0.
    Boolean,
}

/// Recurrence pattern governing bucket boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    /// Local calendar days.
    Daily,
    /// Seven local days starting on `week_start_day`.
    Weekly,
    /// Local calendar months.
    Monthly,
    /// Fixed-length cycles counted from `anchor_date`.
    Rolling,
}

impl AggregationKind {
    /// Storage code for this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            AggregationKind::Sum => "sum",
            AggregationKind::Count => "count",
            AggregationKind::Boolean => "boolean",
        }
    }
}

impl PeriodKind {
    /// Storage code for this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            PeriodKind::Daily => "daily",
            PeriodKind::Weekly => "weekly",
            PeriodKind::Monthly => "monthly",
            PeriodKind::Rolling => "rolling",
        }
    }
}

impl fmt::Display for AggregationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationKind {
    type Err = RollupError;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "sum" => Ok(AggregationKind::Sum),
            "count" => Ok(AggregationKind::Count),
            "boolean" => Ok(AggregationKind::Boolean),
            other => Err(RollupError::Configuration(format!(
                "unrecognized aggregation kind {other:?}"
            ))),
        }
    }
}

impl FromStr for PeriodKind {
    type Err = RollupError;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "daily" => Ok(PeriodKind::Daily),
            "weekly" => Ok(PeriodKind::Weekly),
            "monthly" => Ok(PeriodKind::Monthly),
            "rolling" => Ok(PeriodKind::Rolling),
            other => Err(RollupError::Configuration(format!(
                "unrecognized period kind {other:?}"
            ))),
        }
    }
}

/// Fractional digits allowed in `target_per_period`.
pub const TARGET_SCALE: u32 = 2;

/// Immutable snapshot of one habit's rollup settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitConfig {
    /// Habit identifier.
    pub id: HabitId,
    /// Reduction applied per bucket.
    pub aggregation_kind: AggregationKind,
    /// Target per period (2 fractional digits, non-negative).
    pub target_per_period: Decimal,
    /// Recurrence pattern.
    pub period_kind: PeriodKind,
    /// 0 = Sunday .. 6 = Saturday. Only read for weekly habits.
    pub week_start_day: u8,
    /// 1..=28. Reserved; monthly buckets are plain calendar months.
    pub month_anchor_day: u8,
    /// Cycle length in days; required for rolling habits.
    pub rolling_length_days: Option<i32>,
    /// Origin of rolling cycle counting.
    pub anchor_date: NaiveDate,
    /// Effective IANA timezone. Resolved by the service before the engine runs.
    pub timezone: Option<String>,
}

impl HabitConfig {
    /// Config with Monday week start, anchor day 1, anchor date 1970-01-01 and no timezone.
    pub fn new(
        id: HabitId,
        aggregation_kind: AggregationKind,
        target_per_period: Decimal,
        period_kind: PeriodKind,
    ) -> Self {
        Self {
            id,
            aggregation_kind,
            target_per_period,
            period_kind,
            week_start_day: 1,
            month_anchor_day: 1,
            rolling_length_days: None,
            anchor_date: NaiveDate::default(),
            timezone: None,
        }
    }

    /// Set the effective timezone.
    pub fn with_timezone(mut self, tz: impl Into<String>) -> Self {
        self.timezone = Some(tz.into());
        self
    }

    /// Set the first day of the week (0 = Sunday).
    pub fn with_week_start_day(mut self, day: u8) -> Self {
        self.week_start_day = day;
        self
    }

    /// Set the rolling cycle length and its anchor date.
    pub fn with_rolling(mut self, length_days: i32, anchor_date: NaiveDate) -> Self {
        self.rolling_length_days = Some(length_days);
        self.anchor_date = anchor_date;
        self
    }

    /// Check period parameters.
    ///
    /// Errors with [`RollupError::Configuration`] when:
    /// - a rolling habit has no length or a length < 1
    /// - `week_start_day` is outside 0..=6
    /// - `month_anchor_day` is outside 1..=28
    /// - `target_per_period` is negative or has more than [`TARGET_SCALE`] significant
    ///   fractional digits (trailing zeros don't count)
    pub fn validate(&self) -> Result<()> {
        if self.period_kind == PeriodKind::Rolling {
            match self.rolling_length_days {
                None => {
                    return Err(RollupError::Configuration(format!(
                        "habit {}: rolling period requires rolling_length_days",
                        self.id
                    )));
                }
                Some(n) if n < 1 => {
                    return Err(RollupError::Configuration(format!(
                        "habit {}: rolling_length_days must be >= 1, got {n}",
                        self.id
                    )));
                }
                Some(_) => {}
            }
        }
        if self.week_start_day > 6 {
            return Err(RollupError::Configuration(format!(
                "habit {}: week_start_day must be 0..=6, got {}",
                self.id, self.week_start_day
            )));
        }
        if !(1..=28).contains(&self.month_anchor_day) {
            return Err(RollupError::Configuration(format!(
                "habit {}: month_anchor_day must be 1..=28, got {}",
                self.id, self.month_anchor_day
            )));
        }
        if self.target_per_period < Decimal::ZERO {
            return Err(RollupError::Configuration(format!(
                "habit {}: target_per_period must be >= 0, got {}",
                self.id, self.target_per_period
            )));
        }
        if self.target_per_period.normalize().scale() > TARGET_SCALE {
            return Err(RollupError::Configuration(format!(
                "habit {}: target_per_period has more than {TARGET_SCALE} decimals: {}",
                self.id, self.target_per_period
            )));
        }
        Ok(())
    }

    /// First day of the week as a [`Weekday`]. Assumes a validated config.
    pub fn week_start(&self) -> Weekday {
        match self.week_start_day {
            0 => Weekday::Sun,
            1 => Weekday::Mon,
            2 => Weekday::Tue,
            3 => Weekday::Wed,
            4 => Weekday::Thu,
            5 => Weekday::Fri,
            _ => Weekday::Sat,
        }
    }
}

/// One logged fact, as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// When it happened (UTC).
    pub occurred_at: DateTime<Utc>,
    /// Logged quantity (non-negative).
    pub quantity: Decimal,
}

impl LogEntry {
    /// Create a new log entry.
    pub const fn new(occurred_at: DateTime<Utc>, quantity: Decimal) -> Self {
        Self {
            occurred_at,
            quantity,
        }
    }
}
