mod common;

use chrono::{Duration, Utc};
use common::{build_test_context, request_json};
use foodsafe_storage::ReadingRow;
use serde_json::json;

const SCOPE: &str = "tenant_id=tenant-1&location_id=site-1";

async fn create_template(ctx: &common::TestContext, name: &str) -> String {
    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/v1/templates",
        Some(json!({
            "tenant_id": "tenant-1",
            "location_id": "site-1",
            "name": name,
        })),
    )
    .await
    .unwrap();
    assert_eq!(status, 201, "template creation failed: {body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_returns_ok() {
    let ctx = build_test_context().await.unwrap();
    let (status, body) = request_json(&ctx.app, "GET", "/v1/health", None)
        .await
        .unwrap();
    assert_eq!(status, 200);
    assert_eq!(body["err_code"], 0);
    assert_eq!(body["data"]["storage_status"], "ok");
}

#[tokio::test]
async fn daily_rule_materializes_once_per_day() {
    let ctx = build_test_context().await.unwrap();
    let template_id = create_template(&ctx, "闭店清洁检查表").await;

    let yesterday = (Utc::now() - Duration::days(1)).date_naive();
    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/v1/rules",
        Some(json!({
            "tenant_id": "tenant-1",
            "location_id": "site-1",
            "template_id": template_id,
            "recurrence_kind": "daily",
            "due_time": "14:00",
            "valid_from": yesterday,
        })),
    )
    .await
    .unwrap();
    assert_eq!(status, 201, "rule creation failed: {body}");

    // First run inserts the occurrence.
    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/v1/occurrences/materialize",
        Some(json!({})),
    )
    .await
    .unwrap();
    assert_eq!(status, 200);
    assert_eq!(body["data"]["emitted"], 1);
    assert_eq!(body["data"]["inserted"], 1);

    // Re-running the same day emits the same draft but inserts nothing.
    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/v1/occurrences/materialize",
        Some(json!({})),
    )
    .await
    .unwrap();
    assert_eq!(status, 200);
    assert_eq!(body["data"]["emitted"], 1);
    assert_eq!(body["data"]["inserted"], 0);

    let (status, body) = request_json(
        &ctx.app,
        "GET",
        &format!("/v1/occurrences?{SCOPE}"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(status, 200);
    assert_eq!(body["data"]["total"], 1);
    let occurrence = &body["data"]["items"][0];
    assert_eq!(occurrence["status"], "open");

    // Complete the run.
    let id = occurrence["id"].as_str().unwrap();
    let (status, body) = request_json(
        &ctx.app,
        "POST",
        &format!("/v1/occurrences/{id}/complete"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "completed");
    assert!(body["data"]["completed_at"].is_string());
}

#[tokio::test]
async fn weekly_rule_without_weekdays_is_rejected() {
    let ctx = build_test_context().await.unwrap();
    let template_id = create_template(&ctx, "周打扫检查表").await;

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/v1/rules",
        Some(json!({
            "tenant_id": "tenant-1",
            "location_id": "site-1",
            "template_id": template_id,
            "recurrence_kind": "weekly",
            "due_time": "09:00",
            "valid_from": "2024-01-01",
        })),
    )
    .await
    .unwrap();
    assert_eq!(status, 400);
    assert_eq!(body["err_code"], 1101);
}

#[tokio::test]
async fn rule_referencing_unknown_template_is_rejected() {
    let ctx = build_test_context().await.unwrap();

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/v1/rules",
        Some(json!({
            "tenant_id": "tenant-1",
            "location_id": "site-1",
            "template_id": "no-such-template",
            "recurrence_kind": "daily",
            "due_time": "09:00",
            "valid_from": "2024-01-01",
        })),
    )
    .await
    .unwrap();
    assert_eq!(status, 400);
    assert_eq!(body["err_code"], 1104);
}

#[tokio::test]
async fn materializer_skips_rules_with_deleted_template() {
    let ctx = build_test_context().await.unwrap();
    let template_id = create_template(&ctx, "开店检查表").await;

    let yesterday = (Utc::now() - Duration::days(1)).date_naive();
    let (status, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/rules",
        Some(json!({
            "tenant_id": "tenant-1",
            "location_id": "site-1",
            "template_id": template_id,
            "recurrence_kind": "daily",
            "due_time": "08:00",
            "valid_from": yesterday,
        })),
    )
    .await
    .unwrap();
    assert_eq!(status, 201);

    let (status, _) = request_json(
        &ctx.app,
        "DELETE",
        &format!("/v1/templates/{template_id}"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(status, 200);

    // The orphaned rule is skipped with a warning, not a failure.
    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/v1/occurrences/materialize",
        Some(json!({})),
    )
    .await
    .unwrap();
    assert_eq!(status, 200);
    assert_eq!(body["data"]["rules_considered"], 1);
    assert_eq!(body["data"]["skipped"], 1);
    assert_eq!(body["data"]["emitted"], 0);
    assert_eq!(body["data"]["inserted"], 0);
}

#[tokio::test]
async fn failing_reading_raises_corrective_action() {
    let ctx = build_test_context().await.unwrap();

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/v1/readings",
        Some(json!({
            "tenant_id": "tenant-1",
            "location_id": "site-1",
            "kind": "fridge",
            "target_ref": "fridge-1",
            "value_celsius": 9.5,
        })),
    )
    .await
    .unwrap();
    assert_eq!(status, 201, "reading submission failed: {body}");
    assert_eq!(body["data"]["verdict"]["status"], "fail");
    assert_eq!(body["data"]["verdict"]["requires_action"], true);
    let action_id = body["data"]["corrective_action_id"]
        .as_str()
        .expect("failing reading should raise a corrective action")
        .to_string();

    let (status, body) = request_json(
        &ctx.app,
        "GET",
        &format!("/v1/actions?{SCOPE}&status__eq=open"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(status, 200);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["id"], action_id.as_str());

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        &format!("/v1/actions/{action_id}/resolve"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "resolved");
}

#[tokio::test]
async fn compliant_reading_raises_nothing() {
    let ctx = build_test_context().await.unwrap();

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/v1/readings",
        Some(json!({
            "tenant_id": "tenant-1",
            "location_id": "site-1",
            "kind": "fridge",
            "target_ref": "fridge-1",
            "value_celsius": 3.0,
        })),
    )
    .await
    .unwrap();
    assert_eq!(status, 201);
    assert_eq!(body["data"]["verdict"]["status"], "ok");
    assert!(body["data"]["corrective_action_id"].is_null());

    let (_, body) = request_json(&ctx.app, "GET", &format!("/v1/actions?{SCOPE}"), None)
        .await
        .unwrap();
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn targeted_reading_without_target_is_rejected() {
    let ctx = build_test_context().await.unwrap();

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/v1/readings",
        Some(json!({
            "tenant_id": "tenant-1",
            "location_id": "site-1",
            "kind": "food",
            "value_celsius": 80.0,
        })),
    )
    .await
    .unwrap();
    assert_eq!(status, 400);
    assert_eq!(body["err_code"], 1103);
}

#[tokio::test]
async fn due_windows_move_from_overdue_to_due_soon() {
    let ctx = build_test_context().await.unwrap();

    let (status, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/expectations",
        Some(json!({
            "tenant_id": "tenant-1",
            "location_id": "site-1",
            "target_kind": "asset",
            "target_ref": "fridge-1",
            "target_label": "后厨冷藏柜 1 号",
            "interval_minutes": 240,
        })),
    )
    .await
    .unwrap();
    assert_eq!(status, 201);

    // Never recorded: unconditionally overdue.
    let (status, body) = request_json(
        &ctx.app,
        "GET",
        &format!("/v1/dashboard/due-windows?{SCOPE}"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(status, 200);
    assert_eq!(body["data"]["overdue"].as_array().unwrap().len(), 1);
    assert!(body["data"]["overdue"][0]["last_recorded_at"].is_null());
    assert!(body["data"]["due_soon"].as_array().unwrap().is_empty());

    // A fresh reading moves the expectation to due-soon.
    let (status, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/readings",
        Some(json!({
            "tenant_id": "tenant-1",
            "location_id": "site-1",
            "kind": "fridge",
            "target_ref": "fridge-1",
            "value_celsius": 3.2,
        })),
    )
    .await
    .unwrap();
    assert_eq!(status, 201);

    let (status, body) = request_json(
        &ctx.app,
        "GET",
        &format!("/v1/dashboard/due-windows?{SCOPE}"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(status, 200);
    assert!(body["data"]["overdue"].as_array().unwrap().is_empty());
    let due_soon = body["data"]["due_soon"].as_array().unwrap();
    assert_eq!(due_soon.len(), 1);
    assert_eq!(due_soon[0]["label"], "后厨冷藏柜 1 号");
    assert_eq!(due_soon[0]["correlation_key"], "asset:fridge-1");
}

#[tokio::test]
async fn yesterdays_reading_is_not_counted_for_due_windows() {
    // The lookup window is deliberately "today's readings": a reading from
    // yesterday leaves the expectation overdue even when it would still
    // satisfy the interval.
    let ctx = build_test_context().await.unwrap();

    let (status, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/expectations",
        Some(json!({
            "tenant_id": "tenant-1",
            "location_id": "site-1",
            "target_kind": "asset",
            "target_ref": "fridge-1",
            "interval_minutes": 2880,
        })),
    )
    .await
    .unwrap();
    assert_eq!(status, 201);

    let now = Utc::now();
    ctx.state
        .store
        .insert_reading(&ReadingRow {
            id: "reading-yesterday".to_string(),
            tenant_id: "tenant-1".to_string(),
            location_id: "site-1".to_string(),
            kind: "fridge".to_string(),
            target_ref: Some("fridge-1".to_string()),
            value_celsius: 4.0,
            recorded_at: now - Duration::hours(26),
            created_at: now,
        })
        .await
        .unwrap();

    let (status, body) = request_json(
        &ctx.app,
        "GET",
        &format!("/v1/dashboard/due-windows?{SCOPE}"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(status, 200);
    let overdue = body["data"]["overdue"].as_array().unwrap();
    assert_eq!(overdue.len(), 1);
    assert!(overdue[0]["last_recorded_at"].is_null());
}

#[tokio::test]
async fn dashboard_overview_counts() {
    let ctx = build_test_context().await.unwrap();
    let template_id = create_template(&ctx, "闭店清洁检查表").await;

    let yesterday = (Utc::now() - Duration::days(1)).date_naive();
    request_json(
        &ctx.app,
        "POST",
        "/v1/rules",
        Some(json!({
            "tenant_id": "tenant-1",
            "location_id": "site-1",
            "template_id": template_id,
            "recurrence_kind": "daily",
            "due_time": "23:00",
            "valid_from": yesterday,
        })),
    )
    .await
    .unwrap();
    request_json(
        &ctx.app,
        "POST",
        "/v1/occurrences/materialize",
        Some(json!({})),
    )
    .await
    .unwrap();
    request_json(
        &ctx.app,
        "POST",
        "/v1/readings",
        Some(json!({
            "tenant_id": "tenant-1",
            "location_id": "site-1",
            "kind": "freezer",
            "target_ref": "freezer-1",
            "value_celsius": -12.0,
        })),
    )
    .await
    .unwrap();

    let (status, body) = request_json(
        &ctx.app,
        "GET",
        &format!("/v1/dashboard/overview?{SCOPE}"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(status, 200);
    assert_eq!(body["data"]["open_occurrences"], 1);
    assert_eq!(body["data"]["readings_today"], 1);
    // -12°C in a freezer fails and raises an open corrective action.
    assert_eq!(body["data"]["open_actions"], 1);
}
