#![allow(dead_code)]

use std::cell::Cell;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use habit_rollup::{
    HabitConfig, HabitId, LogEntry, Result,
    store::{HabitStore, InMemoryStore},
};

pub const TORONTO: &str = "America/Toronto";

/// Local wall-clock time in Toronto as a UTC instant.
pub fn toronto(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    chrono_tz::America::Toronto
        .with_ymd_and_hms(y, m, d, h, 0, 0)
        .single()
        .expect("unambiguous local time")
        .with_timezone(&Utc)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Store wrapper that counts log fetches, to prove validation happens first.
pub struct CountingStore {
    pub inner: InMemoryStore,
    pub log_fetches: Cell<usize>,
}

impl CountingStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            log_fetches: Cell::new(0),
        }
    }
}

impl HabitStore for CountingStore {
    fn get_habit_config(&self, habit_id: HabitId) -> Result<HabitConfig> {
        self.inner.get_habit_config(habit_id)
    }

    fn list_logs_within(
        &self,
        habit_id: HabitId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LogEntry>> {
        self.log_fetches.set(self.log_fetches.get() + 1);
        self.inner.list_logs_within(habit_id, start, end)
    }

    fn get_owner_timezone(&self, habit_id: HabitId) -> Result<Option<String>> {
        self.inner.get_owner_timezone(habit_id)
    }
}
