use crate::due::{compute_due_windows, DUE_SOON_LIMIT};
use crate::materialize::materialize_today;
use crate::recurrence::{applies, due_instant, RecurrencePattern, ScheduleRule};
use crate::thresholds::{classify, DEFAULT_FOOD_STANDARD_CELSIUS};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use foodsafe_common::types::{
    CheckStatus, ExpectationTarget, MonitoringExpectation, OccurrenceStatus, Reading, ReadingKind,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn make_rule(pattern: RecurrencePattern, valid_from: NaiveDate) -> ScheduleRule {
    ScheduleRule {
        id: "rule-1".to_string(),
        tenant_id: "tenant-1".to_string(),
        location_id: "site-1".to_string(),
        template_id: "tmpl-1".to_string(),
        pattern,
        due_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
        timezone_label: "Europe/London".to_string(),
        valid_from,
        valid_until: None,
        active: true,
    }
}

fn make_expectation(id: &str, target: ExpectationTarget, interval_minutes: i64) -> MonitoringExpectation {
    MonitoringExpectation {
        id: id.to_string(),
        tenant_id: "tenant-1".to_string(),
        location_id: "site-1".to_string(),
        target,
        label: None,
        interval_minutes,
        active: true,
    }
}

fn make_reading(kind: ReadingKind, target_ref: Option<&str>, recorded_at: DateTime<Utc>) -> Reading {
    Reading {
        id: "reading-1".to_string(),
        tenant_id: "tenant-1".to_string(),
        location_id: "site-1".to_string(),
        kind,
        target_ref: target_ref.map(str::to_string),
        value_celsius: 3.5,
        recorded_at,
    }
}

// ---- Threshold classifier -------------------------------------------------

#[test]
fn fridge_boundaries() {
    assert_eq!(classify(ReadingKind::Fridge, 5.0, None).status, CheckStatus::Ok);
    assert_eq!(classify(ReadingKind::Fridge, 5.1, None).status, CheckStatus::Warn);
    assert_eq!(classify(ReadingKind::Fridge, 8.0, None).status, CheckStatus::Warn);

    let fail = classify(ReadingKind::Fridge, 8.1, None);
    assert_eq!(fail.status, CheckStatus::Fail);
    assert!(fail.requires_action);
}

#[test]
fn freezer_boundaries() {
    assert_eq!(classify(ReadingKind::Freezer, -18.0, None).status, CheckStatus::Ok);
    assert_eq!(classify(ReadingKind::Freezer, -17.9, None).status, CheckStatus::Warn);
    assert_eq!(classify(ReadingKind::Freezer, -15.0, None).status, CheckStatus::Warn);

    let fail = classify(ReadingKind::Freezer, -14.9, None);
    assert_eq!(fail.status, CheckStatus::Fail);
    assert!(fail.requires_action);
}

#[test]
fn food_has_no_warn_tier() {
    assert_eq!(classify(ReadingKind::Food, 75.0, None).status, CheckStatus::Ok);

    let fail = classify(ReadingKind::Food, 74.9, None);
    assert_eq!(fail.status, CheckStatus::Fail);
    assert!(fail.requires_action);
}

#[test]
fn food_standard_can_be_overridden() {
    // Stricter regional standard: 82°C. 80°C passes the default but not this.
    assert_eq!(
        classify(ReadingKind::Food, 80.0, Some(82.0)).status,
        CheckStatus::Fail
    );
    assert_eq!(
        classify(ReadingKind::Food, 82.0, Some(82.0)).status,
        CheckStatus::Ok
    );
    assert!(DEFAULT_FOOD_STANDARD_CELSIUS < 82.0);
}

#[test]
fn delivery_reuses_fridge_bands() {
    for value in [5.0, 5.1, 8.0, 8.1, -3.0, 20.0] {
        let delivery = classify(ReadingKind::Delivery, value, None);
        let fridge = classify(ReadingKind::Fridge, value, None);
        assert_eq!(delivery.status, fridge.status, "value {value}");
        assert_eq!(delivery.requires_action, fridge.requires_action, "value {value}");
    }
}

#[test]
fn classify_is_deterministic() {
    let first = classify(ReadingKind::Fridge, 6.3, None);
    let second = classify(ReadingKind::Fridge, 6.3, None);
    assert_eq!(first, second);
}

// ---- Recurrence evaluator -------------------------------------------------

#[test]
fn daily_rule_applies_every_day_within_window() {
    let rule = make_rule(RecurrencePattern::Daily, date(2024, 3, 1));
    assert!(applies(&rule, date(2024, 3, 1)));
    assert!(applies(&rule, date(2024, 3, 15)));
    assert!(applies(&rule, date(2025, 1, 1)));
}

#[test]
fn rule_never_fires_before_valid_from() {
    let rule = make_rule(RecurrencePattern::Daily, date(2024, 3, 10));
    assert!(!applies(&rule, date(2024, 3, 9)));
    assert!(applies(&rule, date(2024, 3, 10)));
}

#[test]
fn validity_window_is_inclusive_on_both_ends() {
    // Single-day window: applies on exactly that date and no other.
    let mut rule = make_rule(RecurrencePattern::Daily, date(2024, 3, 10));
    rule.valid_until = Some(date(2024, 3, 10));
    assert!(!applies(&rule, date(2024, 3, 9)));
    assert!(applies(&rule, date(2024, 3, 10)));
    assert!(!applies(&rule, date(2024, 3, 11)));
}

#[test]
fn weekly_rule_matches_iso_weekdays_across_month_boundary() {
    // Mon/Wed/Fri across 2024-02-26 (Monday) .. 2024-03-03 (Sunday).
    let rule = make_rule(RecurrencePattern::Weekly(vec![1, 3, 5]), date(2024, 1, 1));
    assert!(applies(&rule, date(2024, 2, 26))); // Monday
    assert!(!applies(&rule, date(2024, 2, 27))); // Tuesday
    assert!(applies(&rule, date(2024, 2, 28))); // Wednesday
    assert!(!applies(&rule, date(2024, 2, 29))); // Thursday (leap day)
    assert!(applies(&rule, date(2024, 3, 1))); // Friday
    assert!(!applies(&rule, date(2024, 3, 2))); // Saturday
    assert!(!applies(&rule, date(2024, 3, 3))); // Sunday
}

#[test]
fn weekly_rule_with_empty_weekday_set_never_applies() {
    let rule = make_rule(RecurrencePattern::Weekly(vec![]), date(2024, 1, 1));
    for day in 1..=7 {
        assert!(!applies(&rule, date(2024, 4, day)));
    }
}

#[test]
fn weekly_rule_ignores_out_of_range_weekdays() {
    let rule = make_rule(RecurrencePattern::Weekly(vec![0, 8, 200]), date(2024, 1, 1));
    for day in 1..=7 {
        assert!(!applies(&rule, date(2024, 4, day)));
    }
}

#[test]
fn monthly_rule_fires_only_on_its_day() {
    let rule = make_rule(RecurrencePattern::Monthly(15), date(2024, 1, 1));
    assert!(applies(&rule, date(2024, 3, 15)));
    assert!(!applies(&rule, date(2024, 3, 14)));
    assert!(!applies(&rule, date(2024, 3, 16)));
}

#[test]
fn monthly_31_never_fires_in_shorter_months() {
    // No clamping: April (30 days) and February get no occurrence at all.
    let rule = make_rule(RecurrencePattern::Monthly(31), date(2023, 1, 1));
    for day in 1..=30 {
        assert!(!applies(&rule, date(2024, 4, day)));
    }
    for day in 1..=29 {
        assert!(!applies(&rule, date(2024, 2, day)));
    }
    assert!(applies(&rule, date(2024, 1, 31)));
    assert!(applies(&rule, date(2024, 3, 31)));
}

#[test]
fn monthly_rule_with_out_of_range_day_never_applies() {
    let rule = make_rule(RecurrencePattern::Monthly(0), date(2024, 1, 1));
    assert!(!applies(&rule, date(2024, 3, 1)));
    let rule = make_rule(RecurrencePattern::Monthly(32), date(2024, 1, 1));
    assert!(!applies(&rule, date(2024, 3, 1)));
}

#[test]
fn due_instant_is_today_at_due_time_in_utc() {
    let rule = make_rule(RecurrencePattern::Daily, date(2024, 3, 1));
    let due = due_instant(&rule, date(2024, 3, 10));
    assert_eq!(due, Utc.with_ymd_and_hms(2024, 3, 10, 14, 0, 0).unwrap());
}

#[test]
fn evaluation_is_deterministic_across_calls() {
    let rule = make_rule(RecurrencePattern::Weekly(vec![1, 3, 5]), date(2024, 1, 1));
    let day = date(2024, 2, 28);
    for _ in 0..10 {
        assert!(applies(&rule, day));
        assert_eq!(due_instant(&rule, day), due_instant(&rule, day));
    }
}

// ---- Occurrence materializer ----------------------------------------------

#[test]
fn materialize_emits_drafts_for_applying_rules_only() {
    let today = date(2024, 3, 11); // a Monday
    let mut daily = make_rule(RecurrencePattern::Daily, date(2024, 1, 1));
    daily.id = "daily".to_string();
    let mut tuesday_only = make_rule(RecurrencePattern::Weekly(vec![2]), date(2024, 1, 1));
    tuesday_only.id = "tuesday".to_string();
    let mut disabled = make_rule(RecurrencePattern::Daily, date(2024, 1, 1));
    disabled.id = "disabled".to_string();
    disabled.active = false;

    let drafts = materialize_today(&[daily, tuesday_only, disabled], today);
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].rule_id, "daily");
    assert_eq!(drafts[0].status, OccurrenceStatus::Open);
    assert_eq!(
        drafts[0].due_at,
        Utc.with_ymd_and_hms(2024, 3, 11, 14, 0, 0).unwrap()
    );
}

#[test]
fn materialize_is_pure_and_repeatable() {
    // Two runs over the same input produce identical batches; dedup of the
    // second batch is the storage layer's job, not the materializer's.
    let rules = vec![make_rule(RecurrencePattern::Daily, date(2024, 1, 1))];
    let today = date(2024, 3, 11);
    let first = materialize_today(&rules, today);
    let second = materialize_today(&rules, today);
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
}

#[test]
fn materialize_carries_rule_scope_into_draft() {
    let mut rule = make_rule(RecurrencePattern::Daily, date(2024, 1, 1));
    rule.tenant_id = "tenant-9".to_string();
    rule.location_id = "site-9".to_string();
    rule.template_id = "tmpl-9".to_string();

    let drafts = materialize_today(&[rule], date(2024, 3, 11));
    assert_eq!(drafts[0].tenant_id, "tenant-9");
    assert_eq!(drafts[0].location_id, "site-9");
    assert_eq!(drafts[0].template_id, "tmpl-9");
}

// ---- Due-window aggregator ------------------------------------------------

#[test]
fn never_recorded_expectation_is_always_overdue() {
    let expectation = make_expectation("exp-1", ExpectationTarget::Asset("fridge-1".into()), 240);
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();

    let windows = compute_due_windows(&[expectation], &[], now);
    assert_eq!(windows.overdue.len(), 1);
    assert!(windows.due_soon.is_empty());
    let row = &windows.overdue[0];
    assert_eq!(row.last_recorded_at, None);
    assert_eq!(row.due_at, None);
    assert_eq!(row.minutes_overdue, None);
}

#[test]
fn recent_reading_classifies_due_soon() {
    let expectation = make_expectation("exp-1", ExpectationTarget::Asset("fridge-1".into()), 240);
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    let reading = make_reading(ReadingKind::Fridge, Some("fridge-1"), now - Duration::minutes(30));

    let windows = compute_due_windows(&[expectation], &[reading], now);
    assert!(windows.overdue.is_empty());
    assert_eq!(windows.due_soon.len(), 1);
    let row = &windows.due_soon[0];
    assert_eq!(row.due_at, Some(now + Duration::minutes(210)));
    assert_eq!(row.minutes_overdue, None);
}

#[test]
fn elapsed_interval_classifies_overdue_with_minutes() {
    let expectation = make_expectation("exp-1", ExpectationTarget::Asset("fridge-1".into()), 60);
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    // Recorded 95 minutes ago, interval 60 → due 35 minutes ago.
    let reading = make_reading(ReadingKind::Fridge, Some("fridge-1"), now - Duration::minutes(95));

    let windows = compute_due_windows(&[expectation], &[reading], now);
    assert_eq!(windows.overdue.len(), 1);
    assert_eq!(windows.overdue[0].minutes_overdue, Some(35));
}

#[test]
fn due_exactly_now_is_still_due_soon() {
    let expectation = make_expectation("exp-1", ExpectationTarget::Asset("fridge-1".into()), 60);
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    let reading = make_reading(ReadingKind::Fridge, Some("fridge-1"), now - Duration::minutes(60));

    let windows = compute_due_windows(&[expectation], &[reading], now);
    assert!(windows.overdue.is_empty());
    assert_eq!(windows.due_soon.len(), 1);
}

#[test]
fn first_seen_reading_wins_for_presorted_input() {
    // Input arrives newest-first from storage; the aggregator must keep the
    // first entry per key, not re-sort.
    let expectation = make_expectation("exp-1", ExpectationTarget::Asset("fridge-1".into()), 240);
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let newest = make_reading(ReadingKind::Fridge, Some("fridge-1"), now - Duration::minutes(10));
    let older = make_reading(ReadingKind::Fridge, Some("fridge-1"), now - Duration::minutes(300));

    let windows = compute_due_windows(&[expectation], &[newest.clone(), older], now);
    assert_eq!(windows.due_soon.len(), 1);
    assert_eq!(windows.due_soon[0].last_recorded_at, Some(newest.recorded_at));
}

#[test]
fn freezer_readings_correlate_to_asset_key() {
    let expectation = make_expectation("exp-1", ExpectationTarget::Asset("freezer-2".into()), 240);
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let reading = make_reading(ReadingKind::Freezer, Some("freezer-2"), now - Duration::minutes(5));

    let windows = compute_due_windows(&[expectation], &[reading], now);
    assert_eq!(windows.due_soon.len(), 1);
    assert_eq!(windows.due_soon[0].correlation_key, "asset:freezer-2");
}

#[test]
fn delivery_expectation_correlates_without_target() {
    let expectation = make_expectation("exp-1", ExpectationTarget::Delivery, 480);
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let reading = make_reading(ReadingKind::Delivery, None, now - Duration::minutes(15));

    let windows = compute_due_windows(&[expectation], &[reading], now);
    assert_eq!(windows.due_soon.len(), 1);
    assert_eq!(windows.due_soon[0].correlation_key, "delivery");
}

#[test]
fn inactive_expectations_are_not_classified() {
    let mut expectation = make_expectation("exp-1", ExpectationTarget::Delivery, 480);
    expectation.active = false;
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

    let windows = compute_due_windows(&[expectation], &[], now);
    assert!(windows.overdue.is_empty());
    assert!(windows.due_soon.is_empty());
}

#[test]
fn unlabeled_target_falls_back_to_correlation_key() {
    // An expectation whose target was deleted keeps surfacing, labeled by
    // its key, instead of vanishing from the dashboard.
    let expectation = make_expectation("exp-1", ExpectationTarget::FoodItem("soup-7".into()), 120);
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

    let windows = compute_due_windows(&[expectation], &[], now);
    assert_eq!(windows.overdue[0].label, "food:soup-7");
}

#[test]
fn due_soon_is_sorted_ascending_and_capped() {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let mut expectations = Vec::new();
    let mut readings = Vec::new();
    // 25 expectations, all due soon, with distinct due times. Reading i was
    // recorded i minutes ago with a 60-minute interval, so expectation i is
    // due in (60 - i) minutes — higher i is due sooner.
    for i in 0..25i64 {
        let asset = format!("fridge-{i}");
        expectations.push(make_expectation(
            &format!("exp-{i}"),
            ExpectationTarget::Asset(asset.clone()),
            60,
        ));
        let mut reading =
            make_reading(ReadingKind::Fridge, Some(&asset), now - Duration::minutes(i));
        reading.id = format!("reading-{i}");
        readings.push(reading);
    }

    let windows = compute_due_windows(&expectations, &readings, now);
    assert!(windows.overdue.is_empty());
    assert_eq!(windows.due_soon.len(), DUE_SOON_LIMIT);

    // Soonest due first: the reading recorded 24 minutes ago is due in 36.
    assert_eq!(windows.due_soon[0].expectation_id, "exp-24");
    assert_eq!(
        windows.due_soon[0].due_at,
        Some(now + Duration::minutes(36))
    );
    for pair in windows.due_soon.windows(2) {
        assert!(pair[0].due_at <= pair[1].due_at);
    }
    // The 5 latest-due expectations (0..=4) fell over the cap.
    assert!(windows
        .due_soon
        .iter()
        .all(|row| row.expectation_id != "exp-0"));
}

#[test]
fn aggregation_is_deterministic_for_identical_input() {
    let expectations = vec![
        make_expectation("exp-1", ExpectationTarget::Asset("fridge-1".into()), 240),
        make_expectation("exp-2", ExpectationTarget::Delivery, 480),
    ];
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let readings = vec![make_reading(
        ReadingKind::Fridge,
        Some("fridge-1"),
        now - Duration::minutes(10),
    )];

    let first = compute_due_windows(&expectations, &readings, now);
    let second = compute_due_windows(&expectations, &readings, now);
    assert_eq!(first, second);
}
