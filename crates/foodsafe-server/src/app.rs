use crate::state::AppState;
use crate::{api, logging};
use axum::middleware;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "foodsafe API",
        description = "foodsafe 餐饮食品安全合规 REST API",
    ),
    tags(
        (name = "Health", description = "服务健康检查"),
        (name = "Templates", description = "检查表模板管理"),
        (name = "Rules", description = "周期规则管理"),
        (name = "Expectations", description = "监测预期管理"),
        (name = "Occurrences", description = "检查表执行实例与物化"),
        (name = "Readings", description = "温度记录与合规判定"),
        (name = "Actions", description = "纠正措施管理"),
        (name = "Dashboard", description = "仪表盘概览")
    )
)]
struct ApiDoc;

pub fn build_http_app(state: AppState) -> Router {
    let (router, spec) = api::api_routes().split_for_parts();

    let mut merged_spec = ApiDoc::openapi();
    merged_spec.merge(spec);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/v1/openapi.json", merged_spec))
        .layer(cors)
        .layer(middleware::from_fn(logging::request_logging))
}
