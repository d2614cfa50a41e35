use crate::api::pagination::PaginationParams;
use crate::api::{
    error_response, success_empty_response, success_paginated_response, success_response, ApiError,
    ScopeParams,
};
use crate::logging::TraceId;
use crate::rule_builder;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use foodsafe_storage::RecurrenceRuleRow;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// 周期规则
#[derive(Serialize, ToSchema)]
struct RuleResponse {
    /// 规则唯一标识
    id: String,
    /// 租户 ID
    tenant_id: String,
    /// 门店 ID
    location_id: String,
    /// 检查表模板 ID
    template_id: String,
    /// 周期类型（daily / weekly / monthly）
    recurrence_kind: String,
    /// 到期时间（HH:MM）
    due_time: String,
    /// 时区标签（仅展示；到期时间按 UTC 计算）
    timezone_label: String,
    /// ISO 周几编号列表（周一 = 1；仅 weekly）
    weekdays: Option<Vec<u8>>,
    /// 每月第几天（1-31；仅 monthly。短月无此日则当月不触发）
    month_day: Option<i32>,
    /// 生效起始日（含）
    valid_from: NaiveDate,
    /// 生效结束日（含；空表示长期有效）
    valid_until: Option<NaiveDate>,
    /// 是否启用
    active: bool,
    /// 创建时间
    created_at: DateTime<Utc>,
    /// 更新时间
    updated_at: DateTime<Utc>,
}

fn to_response(row: RecurrenceRuleRow) -> RuleResponse {
    let weekdays = row
        .weekdays
        .as_deref()
        .and_then(|csv| rule_builder::parse_weekdays(csv).ok());
    RuleResponse {
        id: row.id,
        tenant_id: row.tenant_id,
        location_id: row.location_id,
        template_id: row.template_id,
        recurrence_kind: row.recurrence_kind,
        due_time: row.due_time,
        timezone_label: row.timezone_label,
        weekdays,
        month_day: row.month_day,
        valid_from: row.valid_from,
        valid_until: row.valid_until,
        active: row.active,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

/// 创建 / 更新周期规则请求
#[derive(Debug, Deserialize, ToSchema)]
struct RuleRequest {
    /// 租户 ID（必填）
    tenant_id: String,
    /// 门店 ID（必填）
    location_id: String,
    /// 检查表模板 ID（必填）
    template_id: String,
    /// 周期类型（daily / weekly / monthly，必填）
    recurrence_kind: String,
    /// 到期时间（HH:MM，必填）
    due_time: String,
    /// 时区标签（可选，默认 UTC）
    #[serde(default)]
    timezone_label: Option<String>,
    /// ISO 周几编号列表（weekly 必填且非空，周一 = 1）
    #[serde(default)]
    weekdays: Vec<u8>,
    /// 每月第几天（monthly 必填，1-31）
    #[serde(default)]
    month_day: Option<i32>,
    /// 生效起始日（含，必填）
    valid_from: NaiveDate,
    /// 生效结束日（含，可选）
    #[serde(default)]
    valid_until: Option<NaiveDate>,
    /// 是否启用（可选，默认 true）
    #[serde(default)]
    active: Option<bool>,
}

/// Validate the request shape and turn it into a storable row.
/// Returns an error response on invalid input.
fn validate_into_row(req: &RuleRequest, trace_id: &str, id: String) -> Result<RecurrenceRuleRow, Response> {
    if NaiveTime::parse_from_str(&req.due_time, "%H:%M").is_err() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            trace_id,
            "invalid_recurrence",
            &format!("due_time must be HH:MM, got '{}'", req.due_time),
        ));
    }

    let (weekdays, month_day) = match req.recurrence_kind.as_str() {
        "daily" => (None, None),
        "weekly" => {
            if req.weekdays.is_empty() || req.weekdays.iter().any(|d| !(1..=7).contains(d)) {
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    trace_id,
                    "invalid_recurrence",
                    "weekly rules require a non-empty weekdays list with entries in 1..=7",
                ));
            }
            (Some(rule_builder::format_weekdays(&req.weekdays)), None)
        }
        "monthly" => match req.month_day {
            Some(day) if (1..=31).contains(&day) => (None, Some(day)),
            _ => {
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    trace_id,
                    "invalid_recurrence",
                    "monthly rules require month_day in 1..=31",
                ));
            }
        },
        other => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                trace_id,
                "invalid_recurrence",
                &format!("unknown recurrence kind: {other}"),
            ));
        }
    };

    if let Some(until) = req.valid_until {
        if until < req.valid_from {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                trace_id,
                "invalid_recurrence",
                "valid_until must not precede valid_from",
            ));
        }
    }

    let now = Utc::now();
    Ok(RecurrenceRuleRow {
        id,
        tenant_id: req.tenant_id.clone(),
        location_id: req.location_id.clone(),
        template_id: req.template_id.clone(),
        recurrence_kind: req.recurrence_kind.clone(),
        due_time: req.due_time.clone(),
        timezone_label: req
            .timezone_label
            .clone()
            .unwrap_or_else(|| "UTC".to_string()),
        weekdays,
        month_day,
        valid_from: req.valid_from,
        valid_until: req.valid_until,
        active: req.active.unwrap_or(true),
        created_at: now,
        updated_at: now,
    })
}

/// 创建周期规则。
#[utoipa::path(
    post,
    path = "/v1/rules",
    tag = "Rules",
    request_body = RuleRequest,
    responses(
        (status = 201, description = "规则已创建", body = RuleResponse),
        (status = 400, description = "规则形状非法", body = ApiError)
    )
)]
async fn create_rule(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<RuleRequest>,
) -> impl IntoResponse {
    let row = match validate_into_row(&req, &trace_id, foodsafe_common::id::next_id()) {
        Ok(row) => row,
        Err(resp) => return resp,
    };

    // 模板必须存在，避免创建即失效的规则
    match state.store.get_checklist_template_by_id(&row.template_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &trace_id,
                "unknown_template",
                &format!("Template '{}' not found", row.template_id),
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to look up template");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Internal query error",
            );
        }
    }

    match state.store.insert_recurrence_rule(&row).await {
        Ok(inserted) => success_response(StatusCode::CREATED, &trace_id, to_response(inserted)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create recurrence rule");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to create rule",
            )
        }
    }
}

// GET /v1/rules
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
struct RuleListParams {
    /// 是否启用（active__eq，可选）
    #[param(required = false)]
    #[serde(rename = "active__eq")]
    active_eq: Option<bool>,
}

/// 分页查询周期规则列表。
/// 默认排序：`created_at` 倒序；默认分页：`limit=20&offset=0`。
#[utoipa::path(
    get,
    path = "/v1/rules",
    tag = "Rules",
    params(ScopeParams, RuleListParams, PaginationParams),
    responses(
        (status = 200, description = "规则分页列表", body = Vec<RuleResponse>)
    )
)]
async fn list_rules(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(scope): Query<ScopeParams>,
    Query(params): Query<RuleListParams>,
    Query(pagination): Query<PaginationParams>,
) -> impl IntoResponse {
    let limit = pagination.limit();
    let offset = pagination.offset();

    let total = match state
        .store
        .count_recurrence_rules(&scope.tenant_id, &scope.location_id, params.active_eq)
        .await
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count rules");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Internal query error",
            );
        }
    };

    match state
        .store
        .list_recurrence_rules(
            &scope.tenant_id,
            &scope.location_id,
            params.active_eq,
            limit,
            offset,
        )
        .await
    {
        Ok(rows) => {
            let items: Vec<RuleResponse> = rows.into_iter().map(to_response).collect();
            success_paginated_response(StatusCode::OK, &trace_id, items, total, limit, offset)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list rules");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Internal query error",
            )
        }
    }
}

/// 获取指定周期规则。
#[utoipa::path(
    get,
    path = "/v1/rules/{id}",
    tag = "Rules",
    params(("id" = String, Path, description = "规则 ID")),
    responses(
        (status = 200, description = "规则详情", body = RuleResponse),
        (status = 404, description = "规则不存在", body = ApiError)
    )
)]
async fn get_rule(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_recurrence_rule_by_id(&id).await {
        Ok(Some(row)) => success_response(StatusCode::OK, &trace_id, to_response(row)),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            &format!("Rule '{id}' not found"),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to get rule");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Internal query error",
            )
        }
    }
}

/// 更新周期规则（整体替换）。
#[utoipa::path(
    put,
    path = "/v1/rules/{id}",
    tag = "Rules",
    params(("id" = String, Path, description = "规则 ID")),
    request_body = RuleRequest,
    responses(
        (status = 200, description = "规则已更新", body = RuleResponse),
        (status = 400, description = "规则形状非法", body = ApiError),
        (status = 404, description = "规则不存在", body = ApiError)
    )
)]
async fn update_rule(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RuleRequest>,
) -> impl IntoResponse {
    let row = match validate_into_row(&req, &trace_id, id.clone()) {
        Ok(row) => row,
        Err(resp) => return resp,
    };

    match state.store.update_recurrence_rule(&id, &row).await {
        Ok(Some(updated)) => success_response(StatusCode::OK, &trace_id, to_response(updated)),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            &format!("Rule '{id}' not found"),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to update rule");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to update rule",
            )
        }
    }
}

/// 启用 / 停用请求
#[derive(Debug, Deserialize, ToSchema)]
struct SetEnabledRequest {
    /// 是否启用（必填）
    active: bool,
}

/// 启用或停用规则（不删除）。
#[utoipa::path(
    post,
    path = "/v1/rules/{id}/active",
    tag = "Rules",
    params(("id" = String, Path, description = "规则 ID")),
    request_body = SetEnabledRequest,
    responses(
        (status = 200, description = "规则已更新", body = RuleResponse),
        (status = 404, description = "规则不存在", body = ApiError)
    )
)]
async fn set_rule_enabled(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SetEnabledRequest>,
) -> impl IntoResponse {
    match state.store.set_recurrence_rule_enabled(&id, req.active).await {
        Ok(Some(row)) => success_response(StatusCode::OK, &trace_id, to_response(row)),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            &format!("Rule '{id}' not found"),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to toggle rule");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to update rule",
            )
        }
    }
}

/// 删除规则。已物化的执行实例不受影响。
#[utoipa::path(
    delete,
    path = "/v1/rules/{id}",
    tag = "Rules",
    params(("id" = String, Path, description = "规则 ID")),
    responses(
        (status = 200, description = "规则已删除"),
        (status = 404, description = "规则不存在", body = ApiError)
    )
)]
async fn delete_rule(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_recurrence_rule(&id).await {
        Ok(true) => success_empty_response(StatusCode::OK, &trace_id, "Rule deleted"),
        Ok(false) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            &format!("Rule '{id}' not found"),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to delete rule");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to delete rule",
            )
        }
    }
}

pub fn rule_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(create_rule, list_rules))
        .routes(routes!(get_rule, update_rule, delete_rule))
        .routes(routes!(set_rule_enabled))
}
