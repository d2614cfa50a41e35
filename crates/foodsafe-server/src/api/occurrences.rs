use crate::api::pagination::PaginationParams;
use crate::api::{
    error_response, success_paginated_response, success_response, ApiError, ScopeParams,
};
use crate::logging::TraceId;
use crate::materializer;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use foodsafe_common::types::OccurrenceStatus;
use foodsafe_storage::{OccurrenceFilter, OccurrenceRow};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// 检查表执行实例
#[derive(Serialize, ToSchema)]
struct OccurrenceResponse {
    /// 实例唯一标识
    id: String,
    /// 产生该实例的规则；手工创建时为空
    rule_id: Option<String>,
    /// 租户 ID
    tenant_id: String,
    /// 门店 ID
    location_id: String,
    /// 检查表模板 ID
    template_id: String,
    /// 到期时间
    due_at: DateTime<Utc>,
    /// 状态（open / completed）
    status: String,
    /// 完成时间
    completed_at: Option<DateTime<Utc>>,
    /// 创建时间
    created_at: DateTime<Utc>,
}

fn to_response(row: OccurrenceRow) -> OccurrenceResponse {
    OccurrenceResponse {
        id: row.id,
        rule_id: row.rule_id,
        tenant_id: row.tenant_id,
        location_id: row.location_id,
        template_id: row.template_id,
        due_at: row.due_at,
        status: row.status,
        completed_at: row.completed_at,
        created_at: row.created_at,
    }
}

// GET /v1/occurrences
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
struct OccurrenceListParams {
    /// 状态精确匹配（status__eq，可选：open / completed）
    #[param(required = false)]
    #[serde(rename = "status__eq")]
    status_eq: Option<String>,
    /// 到期时间下界（due__gte，可选）
    #[param(required = false)]
    #[serde(rename = "due__gte")]
    due_gte: Option<DateTime<Utc>>,
    /// 到期时间上界（due__lte，可选）
    #[param(required = false)]
    #[serde(rename = "due__lte")]
    due_lte: Option<DateTime<Utc>>,
}

/// 分页查询执行实例列表。
/// 默认排序：`due_at` 正序；默认分页：`limit=20&offset=0`。
#[utoipa::path(
    get,
    path = "/v1/occurrences",
    tag = "Occurrences",
    params(ScopeParams, OccurrenceListParams, PaginationParams),
    responses(
        (status = 200, description = "执行实例分页列表", body = Vec<OccurrenceResponse>)
    )
)]
async fn list_occurrences(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(scope): Query<ScopeParams>,
    Query(params): Query<OccurrenceListParams>,
    Query(pagination): Query<PaginationParams>,
) -> impl IntoResponse {
    let limit = pagination.limit();
    let offset = pagination.offset();
    let filter = OccurrenceFilter {
        status_eq: params.status_eq,
        due_gte: params.due_gte,
        due_lte: params.due_lte,
    };

    let total = match state
        .store
        .count_occurrences(&scope.tenant_id, &scope.location_id, &filter)
        .await
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count occurrences");
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
        .list_occurrences(&scope.tenant_id, &scope.location_id, &filter, limit, offset)
        .await
    {
        Ok(rows) => {
            let items: Vec<OccurrenceResponse> = rows.into_iter().map(to_response).collect();
            success_paginated_response(StatusCode::OK, &trace_id, items, total, limit, offset)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list occurrences");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Internal query error",
            )
        }
    }
}

/// 标记执行实例为已完成。
#[utoipa::path(
    post,
    path = "/v1/occurrences/{id}/complete",
    tag = "Occurrences",
    params(("id" = String, Path, description = "实例 ID")),
    responses(
        (status = 200, description = "实例已完成", body = OccurrenceResponse),
        (status = 404, description = "实例不存在", body = ApiError)
    )
)]
async fn complete_occurrence(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state
        .store
        .set_occurrence_status(&id, OccurrenceStatus::Completed, Some(Utc::now()))
        .await
    {
        Ok(Some(row)) => success_response(StatusCode::OK, &trace_id, to_response(row)),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            &format!("Occurrence '{id}' not found"),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to complete occurrence");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to complete occurrence",
            )
        }
    }
}

/// 手动物化请求
#[derive(Debug, Default, Deserialize, ToSchema)]
struct MaterializeRequest {
    /// 物化目标日期（UTC，可选，默认当天）
    #[serde(default)]
    date: Option<NaiveDate>,
}

/// 物化结果
#[derive(Serialize, ToSchema)]
struct MaterializeResponse {
    /// 物化目标日期
    date: NaiveDate,
    /// 参与评估的启用规则数
    rules_considered: usize,
    /// 因形状非法或模板缺失被跳过的规则数
    skipped: usize,
    /// 产出的草稿数
    emitted: usize,
    /// 实际新增行数（重复执行时小于草稿数）
    inserted: u64,
}

/// 手动触发一次物化。与调度器走同一条路径，重复调用是安全的：
/// 冲突行由存储层静默忽略。
#[utoipa::path(
    post,
    path = "/v1/occurrences/materialize",
    tag = "Occurrences",
    request_body = MaterializeRequest,
    responses(
        (status = 200, description = "物化结果", body = MaterializeResponse)
    )
)]
async fn materialize_occurrences(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    body: Option<Json<MaterializeRequest>>,
) -> impl IntoResponse {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let date = req.date.unwrap_or_else(|| Utc::now().date_naive());

    match materializer::materialize_for_date(&state.store, date).await {
        Ok(outcome) => success_response(
            StatusCode::OK,
            &trace_id,
            MaterializeResponse {
                date,
                rules_considered: outcome.rules_considered,
                skipped: outcome.skipped,
                emitted: outcome.emitted,
                inserted: outcome.inserted,
            },
        ),
        Err(e) => {
            tracing::error!(error = %e, "Manual materialization failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "internal_error",
                "Materialization failed",
            )
        }
    }
}

pub fn occurrence_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_occurrences))
        .routes(routes!(complete_occurrence))
        .routes(routes!(materialize_occurrences))
}
