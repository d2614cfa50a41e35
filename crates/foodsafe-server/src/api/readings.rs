use crate::api::pagination::PaginationParams;
use crate::api::{
    error_response, success_paginated_response, success_response, ApiError, ScopeParams,
};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use foodsafe_common::types::{ComplianceVerdict, ReadingKind};
use foodsafe_engine::thresholds;
use foodsafe_storage::{CorrectiveActionRow, ReadingRow};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// 温度记录
#[derive(Serialize, ToSchema)]
struct ReadingResponse {
    /// 记录唯一标识
    id: String,
    /// 租户 ID
    tenant_id: String,
    /// 门店 ID
    location_id: String,
    /// 记录类型（fridge / freezer / food / delivery）
    kind: String,
    /// 目标 ID（delivery 无目标）
    target_ref: Option<String>,
    /// 温度值（°C）
    value_celsius: f64,
    /// 记录时间
    recorded_at: DateTime<Utc>,
}

fn to_response(row: ReadingRow) -> ReadingResponse {
    ReadingResponse {
        id: row.id,
        tenant_id: row.tenant_id,
        location_id: row.location_id,
        kind: row.kind,
        target_ref: row.target_ref,
        value_celsius: row.value_celsius,
        recorded_at: row.recorded_at,
    }
}

/// 提交温度记录请求
#[derive(Debug, Deserialize, ToSchema)]
struct SubmitReadingRequest {
    /// 租户 ID（必填）
    tenant_id: String,
    /// 门店 ID（必填）
    location_id: String,
    /// 记录类型（fridge / freezer / food / delivery，必填）
    kind: String,
    /// 目标 ID（fridge / freezer / food 必填；delivery 忽略）
    #[serde(default)]
    target_ref: Option<String>,
    /// 温度值（°C，必填，必须为有限数值）
    value_celsius: f64,
    /// 记录时间（可选，默认当前时间）
    #[serde(default)]
    recorded_at: Option<DateTime<Utc>>,
    /// 食品判定标准覆盖值（°C，可选，仅 food 生效）
    #[serde(default)]
    food_standard_celsius: Option<f64>,
}

/// 提交结果：记录本身、即时判定，以及自动创建的纠正措施（如有）
#[derive(Serialize, ToSchema)]
struct SubmitReadingResponse {
    /// 已持久化的温度记录
    reading: ReadingResponse,
    /// 即时合规判定（每次重新计算，不作为权威状态存储）
    verdict: ComplianceVerdict,
    /// 自动创建的纠正措施 ID（判定需要处理时）
    corrective_action_id: Option<String>,
}

/// 提交一条温度记录。
/// 记录持久化后立即判定；判定为需要处理时自动创建纠正措施。
#[utoipa::path(
    post,
    path = "/v1/readings",
    tag = "Readings",
    request_body = SubmitReadingRequest,
    responses(
        (status = 201, description = "记录已创建并判定", body = SubmitReadingResponse),
        (status = 400, description = "参数错误", body = ApiError)
    )
)]
async fn submit_reading(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<SubmitReadingRequest>,
) -> impl IntoResponse {
    let kind: ReadingKind = match req.kind.parse() {
        Ok(kind) => kind,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "invalid_reading", &e);
        }
    };

    // 分类器以有限数值为前提，非法数值必须挡在入口
    if !req.value_celsius.is_finite() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "invalid_reading",
            "value_celsius must be a finite number",
        );
    }

    let target_ref = match kind {
        ReadingKind::Fridge | ReadingKind::Freezer | ReadingKind::Food => match &req.target_ref {
            Some(r) if !r.trim().is_empty() => Some(r.clone()),
            _ => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    &trace_id,
                    "invalid_reading",
                    &format!("kind '{kind}' requires target_ref"),
                );
            }
        },
        ReadingKind::Delivery => None,
    };

    let row = ReadingRow {
        id: foodsafe_common::id::next_id(),
        tenant_id: req.tenant_id.clone(),
        location_id: req.location_id.clone(),
        kind: kind.to_string(),
        target_ref,
        value_celsius: req.value_celsius,
        recorded_at: req.recorded_at.unwrap_or_else(Utc::now),
        created_at: Utc::now(),
    };

    let inserted = match state.store.insert_reading(&row).await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = %e, "Failed to persist reading");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to persist reading",
            );
        }
    };

    let food_standard = req
        .food_standard_celsius
        .or(Some(state.config.food_standard_celsius));
    let verdict = thresholds::classify(kind, inserted.value_celsius, food_standard);

    let corrective_action_id = if verdict.requires_action {
        let action = CorrectiveActionRow {
            id: foodsafe_common::id::next_id(),
            tenant_id: inserted.tenant_id.clone(),
            location_id: inserted.location_id.clone(),
            reading_id: Some(inserted.id.clone()),
            status: "open".to_string(),
            severity: verdict.status.to_string(),
            description: verdict.message.clone(),
            resolved_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        match state.store.insert_corrective_action(&action).await {
            Ok(created) => {
                tracing::info!(
                    reading_id = %inserted.id,
                    action_id = %created.id,
                    "Corrective action raised for failing reading"
                );
                Some(created.id)
            }
            Err(e) => {
                // 记录已落库，措施创建失败不吞掉判定结果
                tracing::error!(error = %e, reading_id = %inserted.id, "Failed to raise corrective action");
                None
            }
        }
    } else {
        None
    };

    success_response(
        StatusCode::CREATED,
        &trace_id,
        SubmitReadingResponse {
            reading: to_response(inserted),
            verdict,
            corrective_action_id,
        },
    )
}

// GET /v1/readings
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
struct ReadingListParams {
    /// 记录类型精确匹配（kind__eq，可选）
    #[param(required = false)]
    #[serde(rename = "kind__eq")]
    kind_eq: Option<String>,
    /// 记录时间下界（recorded__gte，默认当前时间前 24 小时）
    #[param(required = false)]
    #[serde(rename = "recorded__gte")]
    recorded_gte: Option<DateTime<Utc>>,
    /// 记录时间上界（recorded__lte，默认当前时间）
    #[param(required = false)]
    #[serde(rename = "recorded__lte")]
    recorded_lte: Option<DateTime<Utc>>,
}

/// 分页查询温度记录列表。
/// 默认排序：`recorded_at` 倒序；默认分页：`limit=20&offset=0`。
#[utoipa::path(
    get,
    path = "/v1/readings",
    tag = "Readings",
    params(ScopeParams, ReadingListParams, PaginationParams),
    responses(
        (status = 200, description = "温度记录分页列表", body = Vec<ReadingResponse>)
    )
)]
async fn list_readings(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(scope): Query<ScopeParams>,
    Query(params): Query<ReadingListParams>,
    Query(pagination): Query<PaginationParams>,
) -> impl IntoResponse {
    let to = params.recorded_lte.unwrap_or_else(Utc::now);
    let from = params
        .recorded_gte
        .unwrap_or_else(|| to - chrono::Duration::days(1));
    let limit = pagination.limit();
    let offset = pagination.offset();

    let total = match state
        .store
        .count_readings(
            &scope.tenant_id,
            &scope.location_id,
            params.kind_eq.as_deref(),
            from,
            to,
        )
        .await
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count readings");
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
        .list_readings(
            &scope.tenant_id,
            &scope.location_id,
            params.kind_eq.as_deref(),
            from,
            to,
            limit,
            offset,
        )
        .await
    {
        Ok(rows) => {
            let items: Vec<ReadingResponse> = rows.into_iter().map(to_response).collect();
            success_paginated_response(StatusCode::OK, &trace_id, items, total, limit, offset)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list readings");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Internal query error",
            )
        }
    }
}

pub fn reading_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(submit_reading, list_readings))
}
