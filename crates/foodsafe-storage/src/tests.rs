use crate::store::{
    ChecklistTemplateRow, ComplianceStore, CorrectiveActionRow, ExpectationRow, OccurrenceFilter,
    ReadingRow, RecurrenceRuleRow,
};
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use foodsafe_common::types::{OccurrenceDraft, OccurrenceStatus};
use tempfile::TempDir;

async fn setup() -> (TempDir, ComplianceStore) {
    foodsafe_common::id::init(1, 1);
    let dir = TempDir::new().unwrap();
    let url = format!(
        "sqlite://{}/foodsafe-test.db?mode=rwc",
        dir.path().display()
    );
    let store = ComplianceStore::new(&url).await.unwrap();
    (dir, store)
}

fn make_rule_row(id: &str, tenant: &str) -> RecurrenceRuleRow {
    let now = Utc::now();
    RecurrenceRuleRow {
        id: id.to_string(),
        tenant_id: tenant.to_string(),
        location_id: "site-1".to_string(),
        template_id: "tmpl-1".to_string(),
        recurrence_kind: "daily".to_string(),
        due_time: "14:00".to_string(),
        timezone_label: "Europe/London".to_string(),
        weekdays: None,
        month_day: None,
        valid_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        valid_until: None,
        active: true,
        created_at: now,
        updated_at: now,
    }
}

fn make_draft(rule_id: &str, due_hour: u32) -> OccurrenceDraft {
    OccurrenceDraft {
        rule_id: rule_id.to_string(),
        tenant_id: "tenant-1".to_string(),
        location_id: "site-1".to_string(),
        template_id: "tmpl-1".to_string(),
        due_at: Utc.with_ymd_and_hms(2024, 5, 1, due_hour, 0, 0).unwrap(),
        status: OccurrenceStatus::Open,
    }
}

#[tokio::test]
async fn insert_and_list_recurrence_rules() {
    let (_dir, store) = setup().await;

    store
        .insert_recurrence_rule(&make_rule_row("rule-1", "tenant-1"))
        .await
        .unwrap();
    store
        .insert_recurrence_rule(&make_rule_row("rule-2", "tenant-2"))
        .await
        .unwrap();

    let rows = store
        .list_recurrence_rules("tenant-1", "site-1", None, 100, 0)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "rule-1");

    let enabled = store.list_enabled_recurrence_rules().await.unwrap();
    assert_eq!(enabled.len(), 2, "enabled listing spans tenants");
}

#[tokio::test]
async fn disabled_rules_are_excluded_from_enabled_listing() {
    let (_dir, store) = setup().await;

    store
        .insert_recurrence_rule(&make_rule_row("rule-1", "tenant-1"))
        .await
        .unwrap();
    store
        .set_recurrence_rule_enabled("rule-1", false)
        .await
        .unwrap();

    assert!(store
        .list_enabled_recurrence_rules()
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn duplicate_occurrence_batch_is_silently_ignored() {
    let (_dir, store) = setup().await;

    let drafts = vec![make_draft("rule-1", 14), make_draft("rule-2", 9)];
    let first = store
        .insert_occurrences_ignoring_conflicts(&drafts)
        .await
        .unwrap();
    assert_eq!(first, 2);

    // Re-running the materializer for the same day is routine, not an error.
    let second = store
        .insert_occurrences_ignoring_conflicts(&drafts)
        .await
        .unwrap();
    assert_eq!(second, 0);

    let rows = store
        .list_occurrences("tenant-1", "site-1", &OccurrenceFilter::default(), 100, 0)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn same_rule_different_due_at_both_insert() {
    let (_dir, store) = setup().await;

    let inserted = store
        .insert_occurrences_ignoring_conflicts(&[make_draft("rule-1", 9), make_draft("rule-1", 14)])
        .await
        .unwrap();
    assert_eq!(inserted, 2);
}

#[tokio::test]
async fn empty_draft_batch_inserts_nothing() {
    let (_dir, store) = setup().await;
    let inserted = store
        .insert_occurrences_ignoring_conflicts(&[])
        .await
        .unwrap();
    assert_eq!(inserted, 0);
}

#[tokio::test]
async fn occurrence_status_filter_and_completion() {
    let (_dir, store) = setup().await;

    store
        .insert_occurrences_ignoring_conflicts(&[make_draft("rule-1", 14)])
        .await
        .unwrap();
    let rows = store
        .list_occurrences("tenant-1", "site-1", &OccurrenceFilter::default(), 100, 0)
        .await
        .unwrap();
    let id = rows[0].id.clone();

    let completed_at = Utc::now();
    let updated = store
        .set_occurrence_status(&id, OccurrenceStatus::Completed, Some(completed_at))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, "completed");
    assert!(updated.completed_at.is_some());

    let open = store
        .list_occurrences(
            "tenant-1",
            "site-1",
            &OccurrenceFilter {
                status_eq: Some("open".to_string()),
                ..Default::default()
            },
            100,
            0,
        )
        .await
        .unwrap();
    assert!(open.is_empty());
}

#[tokio::test]
async fn readings_in_range_are_newest_first() {
    let (_dir, store) = setup().await;

    let now = Utc::now();
    for (id, mins_ago) in [("r-old", 120i64), ("r-new", 5), ("r-mid", 60)] {
        store
            .insert_reading(&ReadingRow {
                id: id.to_string(),
                tenant_id: "tenant-1".to_string(),
                location_id: "site-1".to_string(),
                kind: "fridge".to_string(),
                target_ref: Some("fridge-1".to_string()),
                value_celsius: 3.0,
                recorded_at: now - Duration::minutes(mins_ago),
                created_at: now,
            })
            .await
            .unwrap();
    }

    let rows = store
        .list_readings_in_range("tenant-1", "site-1", now - Duration::hours(3), now)
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].id, "r-new");
    assert_eq!(rows[2].id, "r-old");
}

#[tokio::test]
async fn expectation_round_trip_and_toggle() {
    let (_dir, store) = setup().await;

    let now = Utc::now();
    store
        .insert_expectation(&ExpectationRow {
            id: "exp-1".to_string(),
            tenant_id: "tenant-1".to_string(),
            location_id: "site-1".to_string(),
            target_kind: "asset".to_string(),
            target_ref: Some("fridge-1".to_string()),
            target_label: Some("后厨冷藏柜 1 号".to_string()),
            interval_minutes: 240,
            active: true,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

    let active = store
        .list_active_expectations("tenant-1", "site-1")
        .await
        .unwrap();
    assert_eq!(active.len(), 1);

    store
        .set_expectation_enabled("exp-1", false)
        .await
        .unwrap();
    assert!(store
        .list_active_expectations("tenant-1", "site-1")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn corrective_action_resolution() {
    let (_dir, store) = setup().await;

    let now = Utc::now();
    let inserted = store
        .insert_corrective_action(&CorrectiveActionRow {
            id: "action-1".to_string(),
            tenant_id: "tenant-1".to_string(),
            location_id: "site-1".to_string(),
            reading_id: Some("reading-1".to_string()),
            status: "open".to_string(),
            severity: "fail".to_string(),
            description: "Fridge at 9.5°C exceeds the 8.0°C limit".to_string(),
            resolved_at: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();
    assert_eq!(inserted.status, "open");

    let resolved = store
        .resolve_corrective_action("action-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resolved.status, "resolved");
    assert!(resolved.resolved_at.is_some());

    let open = store
        .list_corrective_actions("tenant-1", "site-1", Some("open"), 100, 0)
        .await
        .unwrap();
    assert!(open.is_empty());
}

#[tokio::test]
async fn template_ids_listing_covers_all_tenants() {
    let (_dir, store) = setup().await;

    let now = Utc::now();
    for (id, tenant) in [("tmpl-1", "tenant-1"), ("tmpl-2", "tenant-2")] {
        store
            .insert_checklist_template(&ChecklistTemplateRow {
                id: id.to_string(),
                tenant_id: tenant.to_string(),
                location_id: "site-1".to_string(),
                name: format!("开店检查表 {id}"),
                description: None,
                active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }

    let mut ids = store.list_checklist_template_ids().await.unwrap();
    ids.sort();
    assert_eq!(ids, vec!["tmpl-1".to_string(), "tmpl-2".to_string()]);
}
