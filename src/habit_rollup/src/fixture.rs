//! TOML fixtures that seed an [`InMemoryStore`].
//!
//! ```toml
//! [[users]]
//! id = 1
//! username = "ada"
//! tz = "America/Toronto"
//!
//! [[habits]]
//! id = 10
//! user_id = 1
//! name = "Read"
//! agg = "sum"
//! target_per_period = "60"
//! period = "daily"
//!
//! [[logs]]
//! habit_id = 10
//! occurred_at = "2024-03-01T14:00:00Z"
//! quantity = "45"
//! ```
//!
//! Logs may appear in any order; the store keeps them time-ordered.

use anyhow::Context;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{
    habit::HabitId,
    store::{HabitRecord, InMemoryStore, UserRecord},
};

/// Raw fixture document.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Fixture {
    /// Users (owners of habits).
    pub users: Vec<UserRecord>,
    /// Habit rows.
    pub habits: Vec<HabitRecord>,
    /// Log rows; ids are assigned on load.
    pub logs: Vec<FixtureLog>,
}

/// One log line in a fixture.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureLog {
    /// Habit the log belongs to.
    pub habit_id: HabitId,
    /// RFC-3339 instant.
    pub occurred_at: DateTime<Utc>,
    /// Quantity; defaults to the habit's `per_log_default_qty`.
    pub quantity: Option<Decimal>,
    /// Optional note.
    pub note: Option<String>,
}

impl Fixture {
    /// Load users, then habits, then logs into a fresh store.
    pub fn into_store(self) -> anyhow::Result<InMemoryStore> {
        let mut store = InMemoryStore::new();
        for user in self.users {
            store.insert_user(user);
        }
        for habit in self.habits {
            let id = habit.id;
            store
                .insert_habit(habit)
                .with_context(|| format!("load habit {id}"))?;
        }
        for log in self.logs {
            let quantity = match log.quantity {
                Some(q) => q,
                None => store
                    .habits(false)
                    .find(|h| h.id == log.habit_id)
                    .map(|h| h.per_log_default_qty)
                    .with_context(|| format!("log references unknown habit {}", log.habit_id))?,
            };
            store
                .insert_log(log.habit_id, log.occurred_at, quantity, log.note)
                .with_context(|| format!("load log for habit {}", log.habit_id))?;
        }
        Ok(store)
    }
}

/// Parse a fixture from a TOML string into a store.
pub fn load_fixture_str(toml_str: &str) -> anyhow::Result<InMemoryStore> {
    let fixture: Fixture = toml::from_str(toml_str).context("failed to parse fixture TOML")?;
    fixture.into_store()
}

/// Read a fixture TOML file from disk into a store.
pub fn load_fixture_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<InMemoryStore> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read fixture file {}", path.as_ref().display()))?;
    load_fixture_str(&text)
}
