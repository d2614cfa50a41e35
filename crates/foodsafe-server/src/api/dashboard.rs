use crate::api::{error_response, success_response, ScopeParams};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use foodsafe_common::types::{ExpectationTarget, MonitoringExpectation, Reading};
use foodsafe_engine::due::{self, DueRow, DueWindows};
use foodsafe_storage::{ExpectationRow, OccurrenceFilter, ReadingRow};
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// 单条到期窗口
#[derive(Serialize, ToSchema)]
struct DueRowResponse {
    /// 预期 ID
    expectation_id: String,
    /// 目标展示名称（目标缺失时回退为关联键）
    label: String,
    /// 关联键（asset:<id> / food:<id> / delivery）
    correlation_key: String,
    /// 记录间隔（分钟）
    interval_minutes: i64,
    /// 当天最近一次记录时间（从未记录为空）
    last_recorded_at: Option<DateTime<Utc>>,
    /// 下次到期时间（从未记录为空）
    due_at: Option<DateTime<Utc>>,
    /// 已逾期分钟数（仅逾期且有到期时间时返回）
    minutes_overdue: Option<i64>,
}

/// 到期窗口汇总
#[derive(Serialize, ToSchema)]
struct DueWindowsResponse {
    /// 计算时刻
    generated_at: DateTime<Utc>,
    /// 已逾期（含从未记录）
    overdue: Vec<DueRowResponse>,
    /// 即将到期（按到期时间正序，最多 20 条）
    due_soon: Vec<DueRowResponse>,
}

fn to_row_response(row: DueRow) -> DueRowResponse {
    DueRowResponse {
        expectation_id: row.expectation_id,
        label: row.label,
        correlation_key: row.correlation_key,
        interval_minutes: row.interval_minutes,
        last_recorded_at: row.last_recorded_at,
        due_at: row.due_at,
        minutes_overdue: row.minutes_overdue,
    }
}

/// Map an expectation row into the engine's typed form. Rows with an
/// unparseable target are skipped with a warning — the dashboard keeps
/// rendering the rest.
fn expectation_from_row(row: ExpectationRow) -> Option<MonitoringExpectation> {
    let target = match (row.target_kind.as_str(), row.target_ref.clone()) {
        ("asset", Some(target_ref)) => ExpectationTarget::Asset(target_ref),
        ("food", Some(target_ref)) => ExpectationTarget::FoodItem(target_ref),
        ("delivery", _) => ExpectationTarget::Delivery,
        (kind, target_ref) => {
            tracing::warn!(
                expectation_id = %row.id,
                target_kind = %kind,
                target_ref = ?target_ref,
                "Skipping expectation with unresolvable target"
            );
            return None;
        }
    };
    Some(MonitoringExpectation {
        id: row.id,
        tenant_id: row.tenant_id,
        location_id: row.location_id,
        target,
        label: row.target_label,
        interval_minutes: row.interval_minutes,
        active: row.active,
    })
}

fn reading_from_row(row: ReadingRow) -> Option<Reading> {
    let kind = match row.kind.parse() {
        Ok(kind) => kind,
        Err(e) => {
            tracing::warn!(reading_id = %row.id, error = %e, "Skipping reading of unknown kind");
            return None;
        }
    };
    Some(Reading {
        id: row.id,
        tenant_id: row.tenant_id,
        location_id: row.location_id,
        kind,
        target_ref: row.target_ref,
        value_celsius: row.value_celsius,
        recorded_at: row.recorded_at,
    })
}

/// Load expectations and today's readings for a scope and run the
/// due-window aggregation. Only readings recorded since UTC midnight are
/// considered; a reading from yesterday never satisfies an expectation,
/// even when it would still be within the interval.
async fn aggregate_due_windows(
    state: &AppState,
    tenant_id: &str,
    location_id: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<DueWindows> {
    let expectation_rows = state
        .store
        .list_active_expectations(tenant_id, location_id)
        .await?;
    let expectations: Vec<MonitoringExpectation> = expectation_rows
        .into_iter()
        .filter_map(expectation_from_row)
        .collect();

    let day_start = Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN));
    let reading_rows = state
        .store
        .list_readings_in_range(tenant_id, location_id, day_start, now)
        .await?;
    let readings: Vec<Reading> = reading_rows.into_iter().filter_map(reading_from_row).collect();

    Ok(due::compute_due_windows(&expectations, &readings, now))
}

/// 获取当前到期窗口（逾期 / 即将到期）。
/// 只统计当天（UTC）内的记录。
#[utoipa::path(
    get,
    path = "/v1/dashboard/due-windows",
    tag = "Dashboard",
    params(ScopeParams),
    responses(
        (status = 200, description = "到期窗口汇总", body = DueWindowsResponse)
    )
)]
async fn due_windows(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(scope): Query<ScopeParams>,
) -> impl IntoResponse {
    let now = Utc::now();
    match aggregate_due_windows(&state, &scope.tenant_id, &scope.location_id, now).await {
        Ok(windows) => success_response(
            StatusCode::OK,
            &trace_id,
            DueWindowsResponse {
                generated_at: now,
                overdue: windows.overdue.into_iter().map(to_row_response).collect(),
                due_soon: windows.due_soon.into_iter().map(to_row_response).collect(),
            },
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to aggregate due windows");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Internal query error",
            )
        }
    }
}

/// 仪表盘概览数据
#[derive(Serialize, ToSchema)]
struct DashboardOverview {
    /// 待完成执行实例数
    open_occurrences: u64,
    /// 逾期预期数（含从未记录）
    overdue: usize,
    /// 即将到期预期数
    due_soon: usize,
    /// 当天温度记录数
    readings_today: u64,
    /// 待处理纠正措施数
    open_actions: u64,
    /// 服务运行时长（秒）
    uptime_secs: i64,
}

/// 获取仪表盘概览数据。
#[utoipa::path(
    get,
    path = "/v1/dashboard/overview",
    tag = "Dashboard",
    params(ScopeParams),
    responses(
        (status = 200, description = "仪表盘概览", body = DashboardOverview)
    )
)]
async fn dashboard_overview(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(scope): Query<ScopeParams>,
) -> impl IntoResponse {
    let now = Utc::now();

    let windows =
        match aggregate_due_windows(&state, &scope.tenant_id, &scope.location_id, now).await {
            Ok(w) => w,
            Err(e) => {
                tracing::error!(error = %e, "Failed to aggregate due windows for overview");
                DueWindows::default()
            }
        };

    let open_filter = OccurrenceFilter {
        status_eq: Some("open".to_string()),
        ..Default::default()
    };
    let open_occurrences = state
        .store
        .count_occurrences(&scope.tenant_id, &scope.location_id, &open_filter)
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to count open occurrences");
            0
        });

    let day_start = Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN));
    let readings_today = state
        .store
        .count_readings(&scope.tenant_id, &scope.location_id, None, day_start, now)
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to count readings");
            0
        });

    let open_actions = state
        .store
        .count_corrective_actions(&scope.tenant_id, &scope.location_id, Some("open"))
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to count corrective actions");
            0
        });

    let uptime = (now - state.start_time).num_seconds();

    success_response(
        StatusCode::OK,
        &trace_id,
        DashboardOverview {
            open_occurrences,
            overdue: windows.overdue.len(),
            due_soon: windows.due_soon.len(),
            readings_today,
            open_actions,
            uptime_secs: uptime,
        },
    )
}

pub fn dashboard_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(due_windows))
        .routes(routes!(dashboard_overview))
}
