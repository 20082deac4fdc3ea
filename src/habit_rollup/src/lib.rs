//! Period bucketing and progress aggregation for habits.
//!
//! Given a habit's period configuration, its timezone, and a time range, the engine
//! produces a gap-free sequence of buckets, each holding the aggregated value of the
//! habit's logs and the progress ratio against the habit's target.
//!
//! - [`rollup::rollup`] is the pure engine (config + sorted logs in, buckets out).
//! - [`service::RollupService`] wraps it with a [`store::HabitStore`] and the
//!   effective-timezone fallback chain.

#![deny(missing_docs)]

pub mod aggregate;
pub mod calendar;
pub mod error;
pub mod fixture;
pub mod habit;
pub mod progress;
pub mod rollup;
pub mod service;
pub mod settings;
pub mod store;
pub mod tz;

pub use error::{Result, RollupError};
pub use habit::{AggregationKind, HabitConfig, HabitId, LogEntry, PeriodKind};
pub use rollup::{Bucket, rollup};
pub use service::RollupService;
