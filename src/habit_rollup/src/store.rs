//! Storage collaborator surface and an in-memory implementation.
//!
//! The engine never talks to storage; [`crate::service::RollupService`] does, through
//! [`HabitStore`]. Record types mirror the stored rows (habit, owner, log) so a real
//! backend can map its rows one-to-one.

use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, RollupError},
    habit::{AggregationKind, HabitConfig, HabitId, LogEntry, PeriodKind},
};

/// Timezone given to users created without one.
pub const DEFAULT_USER_TZ: &str = "America/Toronto";

/// Portable surface consumed by the rollup service.
pub trait HabitStore {
    /// Fetch the habit's config snapshot. `timezone` holds the habit override, if any.
    ///
    /// Errors with [`RollupError::NotFound`] for unknown habits.
    fn get_habit_config(&self, habit_id: HabitId) -> Result<HabitConfig>;

    /// Logs with `occurred_at` in `[start, end)`, ordered by `occurred_at` ascending.
    fn list_logs_within(
        &self,
        habit_id: HabitId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LogEntry>>;

    /// Timezone of the habit's owner, if set.
    fn get_owner_timezone(&self, habit_id: HabitId) -> Result<Option<String>>;
}

impl<T: HabitStore + ?Sized> HabitStore for &T {
    fn get_habit_config(&self, habit_id: HabitId) -> Result<HabitConfig> {
        (**self).get_habit_config(habit_id)
    }

    fn list_logs_within(
        &self,
        habit_id: HabitId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LogEntry>> {
        (**self).list_logs_within(habit_id, start, end)
    }

    fn get_owner_timezone(&self, habit_id: HabitId) -> Result<Option<String>> {
        (**self).get_owner_timezone(habit_id)
    }
}

/// Stored user row (only what rollups need).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// User id.
    pub id: i64,
    /// Login name.
    pub username: String,
    /// IANA timezone; empty means [`DEFAULT_USER_TZ`].
    #[serde(default)]
    pub tz: String,
}

fn default_week_start() -> u8 {
    1
}

fn default_one_u8() -> u8 {
    1
}

fn default_qty() -> Decimal {
    Decimal::ONE
}

fn default_true() -> bool {
    true
}

/// Stored habit row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitRecord {
    /// Habit id.
    pub id: HabitId,
    /// Owning user.
    pub user_id: i64,
    /// Display name.
    pub name: String,
    /// Unit shown next to quantities ("minutes", "liters").
    #[serde(default)]
    pub unit_label: Option<String>,
    /// Aggregation kind.
    #[serde(default = "default_agg")]
    pub agg: AggregationKind,
    /// Target per period.
    #[serde(default)]
    pub target_per_period: Decimal,
    /// Quantity pre-filled when logging.
    #[serde(default = "default_qty")]
    pub per_log_default_qty: Decimal,
    /// Period kind.
    #[serde(default = "default_period")]
    pub period: PeriodKind,
    /// 0 = Sunday .. 6 = Saturday.
    #[serde(default = "default_week_start")]
    pub week_start_dow: u8,
    /// 1..=28.
    #[serde(default = "default_one_u8")]
    pub month_anchor_day: u8,
    /// Rolling cycle length.
    #[serde(default)]
    pub rolling_len_days: Option<i32>,
    /// Rolling origin.
    #[serde(default)]
    pub anchor_date: NaiveDate,
    /// Timezone override.
    #[serde(default)]
    pub tz: Option<String>,
    /// Inactive habits are kept but hidden from listings.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_agg() -> AggregationKind {
    AggregationKind::Sum
}

fn default_period() -> PeriodKind {
    PeriodKind::Daily
}

impl HabitRecord {
    /// Project the row into the engine's config snapshot.
    pub fn config(&self) -> HabitConfig {
        HabitConfig {
            id: self.id,
            aggregation_kind: self.agg,
            target_per_period: self.target_per_period,
            period_kind: self.period,
            week_start_day: self.week_start_dow,
            month_anchor_day: self.month_anchor_day,
            rolling_length_days: self.rolling_len_days,
            anchor_date: self.anchor_date,
            timezone: self.tz.clone().filter(|t| !t.trim().is_empty()),
        }
    }
}

/// Stored log row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Log id (assigned on insert).
    pub id: i64,
    /// Habit the log belongs to.
    pub habit_id: HabitId,
    /// When it happened (UTC).
    pub occurred_at: DateTime<Utc>,
    /// Logged quantity, >= 0.
    pub quantity: Decimal,
    /// Free-form note.
    pub note: Option<String>,
}

impl LogRecord {
    /// The engine's view of this row.
    pub fn entry(&self) -> LogEntry {
        LogEntry::new(self.occurred_at, self.quantity)
    }
}

/// Process-local store. Logs stay ordered by `(occurred_at, id)`.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    users: IndexMap<i64, UserRecord>,
    habits: IndexMap<HabitId, HabitRecord>,
    logs: Vec<LogRecord>,
    next_log_id: i64,
}

impl InMemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user. An empty `tz` becomes [`DEFAULT_USER_TZ`].
    pub fn insert_user(&mut self, mut user: UserRecord) {
        if user.tz.trim().is_empty() {
            user.tz = DEFAULT_USER_TZ.to_string();
        }
        self.users.insert(user.id, user);
    }

    /// Insert or replace a habit. Its owner must exist.
    pub fn insert_habit(&mut self, habit: HabitRecord) -> Result<()> {
        if !self.users.contains_key(&habit.user_id) {
            return Err(RollupError::Store(format!(
                "habit {} references unknown user {}",
                habit.id, habit.user_id
            )));
        }
        self.habits.insert(habit.id, habit);
        Ok(())
    }

    /// Append a log and return the stored row.
    pub fn insert_log(
        &mut self,
        habit_id: HabitId,
        occurred_at: DateTime<Utc>,
        quantity: Decimal,
        note: Option<String>,
    ) -> Result<LogRecord> {
        if !self.habits.contains_key(&habit_id) {
            return Err(RollupError::NotFound { habit_id });
        }
        check_quantity(habit_id, quantity)?;
        self.next_log_id += 1;
        let row = LogRecord {
            id: self.next_log_id,
            habit_id,
            occurred_at,
            quantity,
            note,
        };
        self.place_log(row.clone());
        Ok(row)
    }

    /// Rewrite a log's time, quantity, and note, keeping the ordering intact.
    pub fn update_log(
        &mut self,
        log_id: i64,
        occurred_at: DateTime<Utc>,
        quantity: Decimal,
        note: Option<String>,
    ) -> Result<LogRecord> {
        let idx = self.log_index(log_id)?;
        check_quantity(self.logs[idx].habit_id, quantity)?;
        let mut row = self.logs.remove(idx);
        row.occurred_at = occurred_at;
        row.quantity = quantity;
        row.note = note;
        self.place_log(row.clone());
        Ok(row)
    }

    /// Remove one log.
    pub fn delete_log(&mut self, log_id: i64) -> Result<LogRecord> {
        let idx = self.log_index(log_id)?;
        Ok(self.logs.remove(idx))
    }

    /// Remove a habit together with its logs.
    pub fn delete_habit(&mut self, habit_id: HabitId) -> Result<HabitRecord> {
        let habit = self
            .habits
            .shift_remove(&habit_id)
            .ok_or(RollupError::NotFound { habit_id })?;
        self.logs.retain(|l| l.habit_id != habit_id);
        Ok(habit)
    }

    /// All logs of a habit, ordered by `(occurred_at, id)`.
    pub fn list_logs(&self, habit_id: HabitId) -> Vec<&LogRecord> {
        self.logs.iter().filter(|l| l.habit_id == habit_id).collect()
    }

    /// Habits in insertion order, optionally only active ones.
    pub fn habits(&self, active_only: bool) -> impl Iterator<Item = &HabitRecord> {
        self.habits
            .values()
            .filter(move |h| !active_only || h.is_active)
    }

    /// One user's habits in insertion order, optionally only active ones.
    pub fn habits_by_user(
        &self,
        user_id: i64,
        active_only: bool,
    ) -> impl Iterator<Item = &HabitRecord> {
        self.habits(active_only).filter(move |h| h.user_id == user_id)
    }

    /// Mark a habit inactive.
    pub fn deactivate_habit(&mut self, habit_id: HabitId) -> Result<()> {
        let habit = self
            .habits
            .get_mut(&habit_id)
            .ok_or(RollupError::NotFound { habit_id })?;
        habit.is_active = false;
        Ok(())
    }

    fn habit(&self, habit_id: HabitId) -> Result<&HabitRecord> {
        self.habits
            .get(&habit_id)
            .ok_or(RollupError::NotFound { habit_id })
    }

    fn log_index(&self, log_id: i64) -> Result<usize> {
        self.logs
            .iter()
            .position(|l| l.id == log_id)
            .ok_or_else(|| RollupError::Store(format!("unknown log {log_id}")))
    }

    // Equal timestamps are ordered by id.
    fn place_log(&mut self, row: LogRecord) {
        let key = (row.occurred_at, row.id);
        let at = self.logs.partition_point(|l| (l.occurred_at, l.id) < key);
        self.logs.insert(at, row);
    }
}

fn check_quantity(habit_id: HabitId, quantity: Decimal) -> Result<()> {
    if quantity < Decimal::ZERO {
        return Err(RollupError::Store(format!(
            "habit {habit_id}: log quantity must be >= 0, got {quantity}"
        )));
    }
    Ok(())
}

impl HabitStore for InMemoryStore {
    fn get_habit_config(&self, habit_id: HabitId) -> Result<HabitConfig> {
        Ok(self.habit(habit_id)?.config())
    }

    fn list_logs_within(
        &self,
        habit_id: HabitId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LogEntry>> {
        self.habit(habit_id)?;
        let from = self.logs.partition_point(|l| l.occurred_at < start);
        Ok(self.logs[from..]
            .iter()
            .take_while(|l| l.occurred_at < end)
            .filter(|l| l.habit_id == habit_id)
            .map(LogRecord::entry)
            .collect())
    }

    fn get_owner_timezone(&self, habit_id: HabitId) -> Result<Option<String>> {
        let habit = self.habit(habit_id)?;
        Ok(self
            .users
            .get(&habit.user_id)
            .map(|u| u.tz.clone())
            .filter(|tz| !tz.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn habit(id: i64, user_id: i64) -> HabitRecord {
        HabitRecord {
            id: HabitId(id),
            user_id,
            name: "Read".into(),
            unit_label: Some("minutes".into()),
            agg: AggregationKind::Sum,
            target_per_period: dec!(60),
            per_log_default_qty: dec!(15),
            period: PeriodKind::Daily,
            week_start_dow: 1,
            month_anchor_day: 1,
            rolling_len_days: None,
            anchor_date: NaiveDate::default(),
            tz: None,
            is_active: true,
        }
    }

    fn seeded() -> InMemoryStore {
        let mut s = InMemoryStore::new();
        s.insert_user(UserRecord {
            id: 1,
            username: "ada".into(),
            tz: String::new(),
        });
        s.insert_habit(habit(10, 1)).unwrap();
        s.insert_habit(habit(11, 1)).unwrap();
        s
    }

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn logs_are_listed_in_time_order_regardless_of_insert_order() {
        let mut s = seeded();
        s.insert_log(HabitId(10), at(9), dec!(3), None).unwrap();
        s.insert_log(HabitId(10), at(7), dec!(1), None).unwrap();
        s.insert_log(HabitId(11), at(8), dec!(9), None).unwrap();
        s.insert_log(HabitId(10), at(7), dec!(2), Some("again".into())).unwrap();

        let qty: Vec<Decimal> = s.list_logs(HabitId(10)).iter().map(|l| l.quantity).collect();
        assert_eq!(qty, vec![dec!(1), dec!(2), dec!(3)]);
    }

    #[test]
    fn list_logs_within_is_half_open() {
        let mut s = seeded();
        for h in [6, 7, 8] {
            s.insert_log(HabitId(10), at(h), dec!(1), None).unwrap();
        }
        let got = s.list_logs_within(HabitId(10), at(7), at(8)).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].occurred_at, at(7));
    }

    #[test]
    fn unknown_habit_is_not_found() {
        let s = seeded();
        assert_eq!(
            s.get_habit_config(HabitId(99)).unwrap_err(),
            RollupError::NotFound {
                habit_id: HabitId(99)
            }
        );
        assert!(s.get_owner_timezone(HabitId(99)).is_err());
    }

    #[test]
    fn owner_timezone_defaults_when_user_has_none() {
        let s = seeded();
        assert_eq!(
            s.get_owner_timezone(HabitId(10)).unwrap().as_deref(),
            Some(DEFAULT_USER_TZ)
        );
    }

    #[test]
    fn rejects_orphan_habits_and_negative_logs() {
        let mut s = seeded();
        assert!(matches!(
            s.insert_habit(habit(12, 42)),
            Err(RollupError::Store(_))
        ));
        assert!(matches!(
            s.insert_log(HabitId(10), at(1), dec!(-1), None),
            Err(RollupError::Store(_))
        ));
    }

    #[test]
    fn deactivated_habits_drop_out_of_active_listing() {
        let mut s = seeded();
        s.deactivate_habit(HabitId(10)).unwrap();
        let active: Vec<HabitId> = s.habits(true).map(|h| h.id).collect();
        assert_eq!(active, vec![HabitId(11)]);
        assert_eq!(s.habits(false).count(), 2);
    }

    #[test]
    fn habits_are_listed_per_user() {
        let mut s = seeded();
        s.insert_user(UserRecord {
            id: 2,
            username: "grace".into(),
            tz: "Europe/Paris".into(),
        });
        s.insert_habit(habit(20, 2)).unwrap();
        s.deactivate_habit(HabitId(11)).unwrap();

        let ada: Vec<HabitId> = s.habits_by_user(1, false).map(|h| h.id).collect();
        assert_eq!(ada, vec![HabitId(10), HabitId(11)]);
        let ada_active: Vec<HabitId> = s.habits_by_user(1, true).map(|h| h.id).collect();
        assert_eq!(ada_active, vec![HabitId(10)]);
        let grace: Vec<HabitId> = s.habits_by_user(2, true).map(|h| h.id).collect();
        assert_eq!(grace, vec![HabitId(20)]);
        assert_eq!(s.habits_by_user(3, false).count(), 0);
    }

    #[test]
    fn updated_log_moves_to_its_new_time() {
        let mut s = seeded();
        let first = s.insert_log(HabitId(10), at(7), dec!(1), None).unwrap();
        s.insert_log(HabitId(10), at(8), dec!(2), None).unwrap();

        let moved = s
            .update_log(first.id, at(9), dec!(5), Some("late".into()))
            .unwrap();
        assert_eq!(moved.id, first.id);
        assert_eq!(moved.note.as_deref(), Some("late"));

        let qty: Vec<Decimal> = s.list_logs(HabitId(10)).iter().map(|l| l.quantity).collect();
        assert_eq!(qty, vec![dec!(2), dec!(5)]);
        assert!(s.list_logs_within(HabitId(10), at(7), at(8)).unwrap().is_empty());

        assert!(matches!(
            s.update_log(first.id, at(9), dec!(-1), None),
            Err(RollupError::Store(_))
        ));
        assert!(matches!(
            s.update_log(999, at(9), dec!(1), None),
            Err(RollupError::Store(_))
        ));
    }

    #[test]
    fn deleted_logs_disappear() {
        let mut s = seeded();
        let gone = s.insert_log(HabitId(10), at(7), dec!(1), None).unwrap();
        s.insert_log(HabitId(10), at(8), dec!(2), None).unwrap();

        assert_eq!(s.delete_log(gone.id).unwrap(), gone);
        assert_eq!(s.list_logs(HabitId(10)).len(), 1);
        assert!(matches!(s.delete_log(gone.id), Err(RollupError::Store(_))));
    }

    #[test]
    fn deleting_a_habit_removes_its_logs() {
        let mut s = seeded();
        s.insert_log(HabitId(10), at(7), dec!(1), None).unwrap();
        s.insert_log(HabitId(11), at(7), dec!(4), None).unwrap();

        assert_eq!(s.delete_habit(HabitId(10)).unwrap().id, HabitId(10));
        assert!(s.list_logs(HabitId(10)).is_empty());
        assert_eq!(s.list_logs(HabitId(11)).len(), 1);
        assert!(matches!(
            s.get_habit_config(HabitId(10)),
            Err(RollupError::NotFound { .. })
        ));
        assert!(matches!(
            s.delete_habit(HabitId(10)),
            Err(RollupError::NotFound { .. })
        ));
    }

    #[test]
    fn blank_override_is_treated_as_unset() {
        let mut h = habit(1, 1);
        h.tz = Some("  ".into());
        assert_eq!(h.config().timezone, None);
    }
}
