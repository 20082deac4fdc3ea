use std::io::Write;

use chrono::{TimeZone, Utc};
use habit_rollup::{
    HabitId, RollupError, RollupService,
    fixture::{load_fixture_path, load_fixture_str},
    settings::{Settings, load_settings_str},
    tz::TzFallback,
};
use rust_decimal_macros::dec;

mod common;
use common::{CountingStore, toronto};

const FIXTURE: &str = r#"
    [[users]]
    id = 1
    username = "ada"
    tz = "America/Toronto"

    [[users]]
    id = 2
    username = "kai"
    tz = "Not/AZone"

    [[habits]]
    id = 10
    user_id = 1
    name = "Read"
    unit_label = "minutes"
    agg = "sum"
    target_per_period = "60"
    period = "daily"

    [[habits]]
    id = 11
    user_id = 1
    name = "Water"
    agg = "sum"
    target_per_period = "14"
    period = "rolling"

    [[habits]]
    id = 12
    user_id = 2
    name = "Stretch"
    agg = "boolean"
    target_per_period = "1"
    period = "weekly"
    week_start_dow = 0

    [[habits]]
    id = 13
    user_id = 1
    name = "Journal"
    agg = "count"
    target_per_period = "0"
    period = "daily"
    tz = "Asia/Tokyo"

    [[logs]]
    habit_id = 10
    occurred_at = "2024-03-02T01:00:00Z"
    quantity = "65"

    [[logs]]
    habit_id = 10
    occurred_at = "2024-03-01T14:00:00Z"
    quantity = "45"

    [[logs]]
    habit_id = 10
    occurred_at = "2024-02-29T12:00:00Z"
    quantity = "999"

    [[logs]]
    habit_id = 13
    occurred_at = "2024-03-01T16:00:00Z"
"#;

#[test]
fn service_rollup_uses_owner_timezone_and_full_bucket_span() {
    let svc = RollupService::new(load_fixture_str(FIXTURE).unwrap(), Settings::default());

    // 2024-03-02T01:00Z is still March 1 in Toronto.
    let b = svc
        .rollup(HabitId(10), toronto(2024, 3, 1, 10), toronto(2024, 3, 2, 10))
        .unwrap();

    assert_eq!(b.len(), 2);
    assert_eq!(b[0].start, toronto(2024, 3, 1, 0));
    assert_eq!(b[0].value, dec!(110));
    assert_eq!(b[1].value, dec!(0));
}

#[test]
fn habit_override_shifts_boundaries() {
    let svc = RollupService::new(load_fixture_str(FIXTURE).unwrap(), Settings::default());
    let day = Utc.with_ymd_and_hms(2024, 3, 1, 16, 0, 0).unwrap();

    let b = svc.rollup(HabitId(13), day, day).unwrap();

    // 16:00Z is 01:00 on March 2 in Tokyo.
    assert_eq!(b.len(), 1);
    assert_eq!(b[0].start, Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap());
    assert_eq!(b[0].value, dec!(1));
    assert_eq!(b[0].progress_ratio, None);
}

#[test]
fn unknown_habit_is_not_found() {
    let svc = RollupService::new(load_fixture_str(FIXTURE).unwrap(), Settings::default());
    let t = toronto(2024, 3, 1, 0);
    assert_eq!(
        svc.rollup(HabitId(404), t, t).unwrap_err(),
        RollupError::NotFound {
            habit_id: HabitId(404)
        }
    );
}

#[test]
fn configuration_error_is_raised_before_any_log_fetch() {
    let store = CountingStore::new(load_fixture_str(FIXTURE).unwrap());
    let svc = RollupService::new(&store, Settings::default());
    let t = toronto(2024, 3, 1, 0);

    let err = svc.rollup(HabitId(11), t, t).unwrap_err();

    assert!(matches!(err, RollupError::Configuration(_)));
    assert_eq!(store.log_fetches.get(), 0);
}

#[test]
fn unresolvable_owner_timezone_depends_on_fallback_policy() {
    let t = toronto(2024, 3, 6, 12);

    // Default settings fall back to the server timezone.
    assert_eq!(Settings::default().timezone_fallback, TzFallback::Lenient);
    let lenient = RollupService::new(load_fixture_str(FIXTURE).unwrap(), Settings::default());
    let b = lenient.rollup(HabitId(12), t, t).unwrap();

    // Toronto; week starts Sunday 2024-03-03.
    assert_eq!(b.len(), 1);
    assert_eq!(b[0].start, toronto(2024, 3, 3, 0));
    assert_eq!(b[0].end, toronto(2024, 3, 10, 0));

    let strict_settings = load_settings_str(
        r#"
        default_timezone = "America/Toronto"
        timezone_fallback = "strict"
    "#,
    )
    .unwrap();
    let strict = RollupService::new(load_fixture_str(FIXTURE).unwrap(), strict_settings);
    assert!(matches!(
        strict.rollup(HabitId(12), t, t),
        Err(RollupError::Timezone(_))
    ));
}

#[test]
fn identical_calls_give_identical_results() {
    let svc = RollupService::new(load_fixture_str(FIXTURE).unwrap(), Settings::default());
    let (s, e) = (toronto(2024, 2, 25, 0), toronto(2024, 3, 5, 0));
    assert_eq!(
        svc.rollup(HabitId(10), s, e).unwrap(),
        svc.rollup(HabitId(10), s, e).unwrap()
    );
}

#[test]
fn fixture_loads_from_disk() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(FIXTURE.as_bytes()).unwrap();
    let store = load_fixture_path(f.path()).unwrap();
    assert_eq!(store.habits(false).count(), 4);
    assert_eq!(store.list_logs(HabitId(10)).len(), 3);
}
