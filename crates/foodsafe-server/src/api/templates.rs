use crate::api::pagination::PaginationParams;
use crate::api::{
    error_response, success_empty_response, success_paginated_response, success_response, ApiError,
    ScopeParams,
};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use foodsafe_storage::ChecklistTemplateRow;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// 检查表模板
#[derive(Serialize, ToSchema)]
struct TemplateResponse {
    /// 模板唯一标识
    id: String,
    /// 租户 ID
    tenant_id: String,
    /// 门店 ID
    location_id: String,
    /// 模板名称
    name: String,
    /// 描述信息
    description: Option<String>,
    /// 是否启用
    active: bool,
    /// 创建时间
    created_at: DateTime<Utc>,
    /// 更新时间
    updated_at: DateTime<Utc>,
}

fn to_response(row: ChecklistTemplateRow) -> TemplateResponse {
    TemplateResponse {
        id: row.id,
        tenant_id: row.tenant_id,
        location_id: row.location_id,
        name: row.name,
        description: row.description,
        active: row.active,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

/// 创建模板请求
#[derive(Debug, Deserialize, ToSchema)]
struct CreateTemplateRequest {
    /// 租户 ID（必填）
    tenant_id: String,
    /// 门店 ID（必填）
    location_id: String,
    /// 模板名称（必填）
    name: String,
    /// 描述信息（可选）
    #[serde(default)]
    description: Option<String>,
    /// 是否启用（可选，默认 true）
    #[serde(default)]
    active: Option<bool>,
}

/// 创建检查表模板。
#[utoipa::path(
    post,
    path = "/v1/templates",
    tag = "Templates",
    request_body = CreateTemplateRequest,
    responses(
        (status = 201, description = "模板已创建", body = TemplateResponse),
        (status = 400, description = "参数错误", body = ApiError)
    )
)]
async fn create_template(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<CreateTemplateRequest>,
) -> impl IntoResponse {
    if req.name.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "Template name must not be empty",
        );
    }

    let now = Utc::now();
    let row = ChecklistTemplateRow {
        id: foodsafe_common::id::next_id(),
        tenant_id: req.tenant_id,
        location_id: req.location_id,
        name: req.name,
        description: req.description,
        active: req.active.unwrap_or(true),
        created_at: now,
        updated_at: now,
    };

    match state.store.insert_checklist_template(&row).await {
        Ok(inserted) => {
            success_response(StatusCode::CREATED, &trace_id, to_response(inserted))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to create checklist template");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to create template",
            )
        }
    }
}

/// 分页查询模板列表。
/// 默认排序：`created_at` 倒序；默认分页：`limit=20&offset=0`。
#[utoipa::path(
    get,
    path = "/v1/templates",
    tag = "Templates",
    params(ScopeParams, PaginationParams),
    responses(
        (status = 200, description = "模板分页列表", body = Vec<TemplateResponse>)
    )
)]
async fn list_templates(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(scope): Query<ScopeParams>,
    Query(pagination): Query<PaginationParams>,
) -> impl IntoResponse {
    let limit = pagination.limit();
    let offset = pagination.offset();

    let total = match state
        .store
        .count_checklist_templates(&scope.tenant_id, &scope.location_id, None)
        .await
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count templates");
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
        .list_checklist_templates(&scope.tenant_id, &scope.location_id, None, limit, offset)
        .await
    {
        Ok(rows) => {
            let items: Vec<TemplateResponse> = rows.into_iter().map(to_response).collect();
            success_paginated_response(StatusCode::OK, &trace_id, items, total, limit, offset)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list templates");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Internal query error",
            )
        }
    }
}

/// 启用 / 停用请求
#[derive(Debug, Deserialize, ToSchema)]
struct SetActiveRequest {
    /// 是否启用（必填）
    active: bool,
}

/// 启用或停用模板。
#[utoipa::path(
    post,
    path = "/v1/templates/{id}/active",
    tag = "Templates",
    params(("id" = String, Path, description = "模板 ID")),
    request_body = SetActiveRequest,
    responses(
        (status = 200, description = "模板已更新", body = TemplateResponse),
        (status = 404, description = "模板不存在", body = ApiError)
    )
)]
async fn set_template_active(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SetActiveRequest>,
) -> impl IntoResponse {
    match state
        .store
        .set_checklist_template_active(&id, req.active)
        .await
    {
        Ok(Some(row)) => success_response(StatusCode::OK, &trace_id, to_response(row)),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            &format!("Template '{id}' not found"),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to update template");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to update template",
            )
        }
    }
}

/// 删除模板。已物化的执行实例保留；指向该模板的规则会在
/// 下次物化时被跳过并记录警告。
#[utoipa::path(
    delete,
    path = "/v1/templates/{id}",
    tag = "Templates",
    params(("id" = String, Path, description = "模板 ID")),
    responses(
        (status = 200, description = "模板已删除"),
        (status = 404, description = "模板不存在", body = ApiError)
    )
)]
async fn delete_template(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_checklist_template(&id).await {
        Ok(true) => success_empty_response(StatusCode::OK, &trace_id, "Template deleted"),
        Ok(false) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            &format!("Template '{id}' not found"),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to delete template");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Failed to delete template",
            )
        }
    }
}

pub fn template_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(create_template, list_templates))
        .routes(routes!(set_template_active))
        .routes(routes!(delete_template))
}
