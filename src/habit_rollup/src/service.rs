//! Rollup service: the storage-backed entry point.
//!
//! Per call it fetches the habit config, resolves the effective timezone
//! (habit override → owner timezone → [`Settings::default_timezone`]), computes the
//! bucket boundaries, fetches the logs covering the full bucket span (not just the
//! requested range, since buckets are never truncated), and hands everything to the
//! pure engine. Nothing is cached between calls.

use chrono::{DateTime, Utc};

use crate::{
    calendar::{bucket_containing, generate_buckets},
    error::{Result, RollupError},
    habit::{HabitConfig, HabitId},
    rollup::{Bucket, rollup_over},
    settings::Settings,
    store::HabitStore,
    tz::{TzFallback, resolve_effective_tz},
};

/// Storage-backed rollups for any [`HabitStore`].
#[derive(Debug, Clone)]
pub struct RollupService<S> {
    store: S,
    settings: Settings,
}

impl<S: HabitStore> RollupService<S> {
    /// Create a service over `store`.
    pub fn new(store: S, settings: Settings) -> Self {
        Self { store, settings }
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Active settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Fetch the habit's config, validate it, and pin its effective timezone.
    pub fn effective_config(&self, habit_id: HabitId) -> Result<HabitConfig> {
        let mut config = self.store.get_habit_config(habit_id)?;
        config.validate()?;

        let fallback = self.settings.timezone_fallback;
        let owner_tz = match (&config.timezone, fallback) {
            (Some(_), TzFallback::Strict) => None,
            _ => self.store.get_owner_timezone(habit_id)?,
        };
        let (name, _) = resolve_effective_tz(
            &[
                config.timezone.as_deref(),
                owner_tz.as_deref(),
                Some(self.settings.default_timezone.as_str()),
            ],
            fallback,
        )?;
        config.timezone = Some(name);
        Ok(config)
    }

    /// Buckets covering `[range_start, range_end]` for one habit.
    ///
    /// Errors: [`RollupError::NotFound`], [`RollupError::Configuration`],
    /// [`RollupError::Timezone`], [`RollupError::InvalidRange`], or a store failure.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn rollup(
        &self,
        habit_id: HabitId,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<Bucket>> {
        let config = self.effective_config(habit_id)?;
        let boundaries = generate_buckets(&config, range_start, range_end)?;
        let (Some(first), Some(last)) = (boundaries.first(), boundaries.last()) else {
            return Ok(Vec::new());
        };
        let logs = self
            .store
            .list_logs_within(habit_id, first.start, last.end)?;
        tracing::debug!(
            timezone = config.timezone.as_deref().unwrap_or_default(),
            span_start = %first.start,
            span_end = %last.end,
            "fetched logs for bucket span"
        );
        Ok(rollup_over(&config, &boundaries, &logs))
    }

    /// The bucket containing `now`, i.e. progress in the current period.
    pub fn current_period(&self, habit_id: HabitId, now: DateTime<Utc>) -> Result<Bucket> {
        let config = self.effective_config(habit_id)?;
        let boundary = bucket_containing(&config, now)?;
        let logs = self
            .store
            .list_logs_within(habit_id, boundary.start, boundary.end)?;
        rollup_over(&config, &[boundary], &logs)
            .pop()
            .ok_or(RollupError::InvalidRange {
                start: now,
                end: now,
            })
    }
}
