use crate::api::pagination::PaginationParams;
use crate::api::{
    error_response, success_empty_response, success_paginated_response, success_response, ApiError,
    ScopeParams,
};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use foodsafe_storage::ExpectationRow;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// 监测预期
#[derive(Serialize, ToSchema)]
struct ExpectationResponse {
    /// 预期唯一标识
    id: String,
    /// 租户 ID
    tenant_id: String,
    /// 门店 ID
    location_id: String,
    /// 目标类型（asset / food / delivery）
    target_kind: String,
    /// 目标 ID（delivery 无目标，为空）
    target_ref: Option<String>,
    /// 目标展示名称
    target_label: Option<String>,
    /// 记录间隔（分钟）
    interval_minutes: i64,
    /// 是否启用
    active: bool,
    /// 创建时间
    created_at: DateTime<Utc>,
    /// 更新时间
    updated_at: DateTime<Utc>,
}

fn to_response(row: ExpectationRow) -> ExpectationResponse {
    ExpectationResponse {
        id: row.id,
        tenant_id: row.tenant_id,
        location_id: row.location_id,
        target_kind: row.target_kind,
        target_ref: row.target_ref,
        target_label: row.target_label,
        interval_minutes: row.interval_minutes,
        active: row.active,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

/// 创建 / 更新监测预期请求
#[derive(Debug, Deserialize, ToSchema)]
struct ExpectationRequest {
    /// 租户 ID（必填）
    tenant_id: String,
    /// 门店 ID（必填）
    location_id: String,
    /// 目标类型（asset / food / delivery，必填）
    target_kind: String,
    /// 目标 ID（asset / food 必填；delivery 忽略）
    #[serde(default)]
    target_ref: Option<String>,
    /// 目标展示名称（可选）
    #[serde(default)]
    target_label: Option<String>,
    /// 记录间隔（分钟，必须为正数）
    interval_minutes: i64,
    /// 是否启用（可选，默认 true）
    #[serde(default)]
    active: Option<bool>,
}

fn validate_into_row(
    req: &ExpectationRequest,
    trace_id: &str,
    id: String,
) -> Result<ExpectationRow, Response> {
    let target_ref = match req.target_kind.as_str() {
        "asset" | "food" => match &req.target_ref {
            Some(r) if !r.trim().is_empty() => Some(r.clone()),
            _ => {
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    trace_id,
                    "invalid_target",
                    &format!("target_kind '{}' requires target_ref", req.target_kind),
                ));
            }
        },
        // delivery 预期没有具体目标
        "delivery" => None,
        other => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                trace_id,
                "invalid_target",
                &format!("unknown target kind: {other}"),
            ));
        }
    };

    if req.interval_minutes < 1 {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            trace_id,
            "bad_request",
            "interval_minutes must be a positive integer",
        ));
    }

    let now = Utc::now();
    Ok(ExpectationRow {
        id,
        tenant_id: req.tenant_id.clone(),
        location_id: req.location_id.clone(),
        target_kind: req.target_kind.clone(),
        target_ref,
        target_label: req.target_label.clone(),
        interval_minutes: req.interval_minutes,
        active: req.active.unwrap_or(true),
        created_at: now,
        updated_at: now,
    })
}

/// 创建监测预期。
#[utoipa::path(
    post,
    path = "/v1/expectations",
    tag = "Expectations",
    request_body = ExpectationRequest,
    responses(
        (status = 201, description = "预期已创建", body = ExpectationResponse),
        (status = 400, description = "参数错误", body = ApiError)
    )
)]
async fn create_expectation(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<ExpectationRequest>,
) -> impl IntoResponse {
    let row = match validate_into_row(&req, &trace_id, foodsafe_common::id::next_id()) {
        Ok(row) => row,
        Err(resp) => return resp,
    };

    match state.store.insert_expectation(&row).await {
        Ok(inserted) => success_response(StatusCode::CREATED, &trace_id, to_response(inserted)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create expectation");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to create expectation",
            )
        }
    }
}

// GET /v1/expectations
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
struct ExpectationListParams {
    /// 是否启用（active__eq，可选）
    #[param(required = false)]
    #[serde(rename = "active__eq")]
    active_eq: Option<bool>,
}

/// 分页查询监测预期列表。
/// 默认排序：`created_at` 倒序；默认分页：`limit=20&offset=0`。
#[utoipa::path(
    get,
    path = "/v1/expectations",
    tag = "Expectations",
    params(ScopeParams, ExpectationListParams, PaginationParams),
    responses(
        (status = 200, description = "预期分页列表", body = Vec<ExpectationResponse>)
    )
)]
async fn list_expectations(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(scope): Query<ScopeParams>,
    Query(params): Query<ExpectationListParams>,
    Query(pagination): Query<PaginationParams>,
) -> impl IntoResponse {
    let limit = pagination.limit();
    let offset = pagination.offset();

    let total = match state
        .store
        .count_expectations(&scope.tenant_id, &scope.location_id, params.active_eq)
        .await
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count expectations");
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
        .list_expectations(
            &scope.tenant_id,
            &scope.location_id,
            params.active_eq,
            limit,
            offset,
        )
        .await
    {
        Ok(rows) => {
            let items: Vec<ExpectationResponse> = rows.into_iter().map(to_response).collect();
            success_paginated_response(StatusCode::OK, &trace_id, items, total, limit, offset)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list expectations");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Internal query error",
            )
        }
    }
}

/// 更新监测预期（整体替换）。
#[utoipa::path(
    put,
    path = "/v1/expectations/{id}",
    tag = "Expectations",
    params(("id" = String, Path, description = "预期 ID")),
    request_body = ExpectationRequest,
    responses(
        (status = 200, description = "预期已更新", body = ExpectationResponse),
        (status = 404, description = "预期不存在", body = ApiError)
    )
)]
async fn update_expectation(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ExpectationRequest>,
) -> impl IntoResponse {
    let row = match validate_into_row(&req, &trace_id, id.clone()) {
        Ok(row) => row,
        Err(resp) => return resp,
    };

    match state.store.update_expectation(&id, &row).await {
        Ok(Some(updated)) => success_response(StatusCode::OK, &trace_id, to_response(updated)),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            &format!("Expectation '{id}' not found"),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to update expectation");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to update expectation",
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

/// 启用或停用监测预期。
#[utoipa::path(
    post,
    path = "/v1/expectations/{id}/active",
    tag = "Expectations",
    params(("id" = String, Path, description = "预期 ID")),
    request_body = SetEnabledRequest,
    responses(
        (status = 200, description = "预期已更新", body = ExpectationResponse),
        (status = 404, description = "预期不存在", body = ApiError)
    )
)]
async fn set_expectation_enabled(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SetEnabledRequest>,
) -> impl IntoResponse {
    match state.store.set_expectation_enabled(&id, req.active).await {
        Ok(Some(row)) => success_response(StatusCode::OK, &trace_id, to_response(row)),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            &format!("Expectation '{id}' not found"),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to toggle expectation");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to update expectation",
            )
        }
    }
}

/// 删除监测预期。
#[utoipa::path(
    delete,
    path = "/v1/expectations/{id}",
    tag = "Expectations",
    params(("id" = String, Path, description = "预期 ID")),
    responses(
        (status = 200, description = "预期已删除"),
        (status = 404, description = "预期不存在", body = ApiError)
    )
)]
async fn delete_expectation(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_expectation(&id).await {
        Ok(true) => success_empty_response(StatusCode::OK, &trace_id, "Expectation deleted"),
        Ok(false) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            &format!("Expectation '{id}' not found"),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to delete expectation");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to delete expectation",
            )
        }
    }
}

pub fn expectation_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(create_expectation, list_expectations))
        .routes(routes!(update_expectation, delete_expectation))
        .routes(routes!(set_expectation_enabled))
}
