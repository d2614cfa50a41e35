use crate::api::pagination::PaginationParams;
use crate::api::{
    error_response, success_paginated_response, success_response, ApiError, ScopeParams,
};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use foodsafe_storage::CorrectiveActionRow;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// 纠正措施
#[derive(Serialize, ToSchema)]
struct ActionResponse {
    /// 措施唯一标识
    id: String,
    /// 租户 ID
    tenant_id: String,
    /// 门店 ID
    location_id: String,
    /// 触发该措施的温度记录
    reading_id: Option<String>,
    /// 状态（open / resolved）
    status: String,
    /// 触发时的判定等级
    severity: String,
    /// 描述
    description: String,
    /// 处理完成时间
    resolved_at: Option<DateTime<Utc>>,
    /// 创建时间
    created_at: DateTime<Utc>,
}

fn to_response(row: CorrectiveActionRow) -> ActionResponse {
    ActionResponse {
        id: row.id,
        tenant_id: row.tenant_id,
        location_id: row.location_id,
        reading_id: row.reading_id,
        status: row.status,
        severity: row.severity,
        description: row.description,
        resolved_at: row.resolved_at,
        created_at: row.created_at,
    }
}

// GET /v1/actions
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
struct ActionListParams {
    /// 状态精确匹配（status__eq，可选：open / resolved）
    #[param(required = false)]
    #[serde(rename = "status__eq")]
    status_eq: Option<String>,
}

/// 分页查询纠正措施列表。
/// 默认排序：`created_at` 倒序；默认分页：`limit=20&offset=0`。
#[utoipa::path(
    get,
    path = "/v1/actions",
    tag = "Actions",
    params(ScopeParams, ActionListParams, PaginationParams),
    responses(
        (status = 200, description = "纠正措施分页列表", body = Vec<ActionResponse>)
    )
)]
async fn list_actions(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(scope): Query<ScopeParams>,
    Query(params): Query<ActionListParams>,
    Query(pagination): Query<PaginationParams>,
) -> impl IntoResponse {
    let limit = pagination.limit();
    let offset = pagination.offset();

    let total = match state
        .store
        .count_corrective_actions(
            &scope.tenant_id,
            &scope.location_id,
            params.status_eq.as_deref(),
        )
        .await
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count corrective actions");
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
        .list_corrective_actions(
            &scope.tenant_id,
            &scope.location_id,
            params.status_eq.as_deref(),
            limit,
            offset,
        )
        .await
    {
        Ok(rows) => {
            let items: Vec<ActionResponse> = rows.into_iter().map(to_response).collect();
            success_paginated_response(StatusCode::OK, &trace_id, items, total, limit, offset)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list corrective actions");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Internal query error",
            )
        }
    }
}

/// 处理完成纠正措施。
#[utoipa::path(
    post,
    path = "/v1/actions/{id}/resolve",
    tag = "Actions",
    params(("id" = String, Path, description = "措施 ID")),
    responses(
        (status = 200, description = "措施已处理", body = ActionResponse),
        (status = 404, description = "措施不存在", body = ApiError)
    )
)]
async fn resolve_action(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.resolve_corrective_action(&id).await {
        Ok(Some(row)) => success_response(StatusCode::OK, &trace_id, to_response(row)),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            &format!("Corrective action '{id}' not found"),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to resolve corrective action");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to resolve action",
            )
        }
    }
}

pub fn action_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_actions))
        .routes(routes!(resolve_action))
}
