use crate::{
    controller::{health_check_controller, root_controller, workflow_controller},
    middleware::cors,
    AppState,
};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use domain::workflow::{HomeWorkflowParams, RunWorkflowParams};
use utoipa::OpenApi;

// This is the global definition of our OpenAPI document. To be a part
// of the rendered document, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Coze Relay API"
        ),
        paths(
            health_check_controller::health_check,
            workflow_controller::run_workflow_stream,
            workflow_controller::home_workflow_stream,
        ),
        components(
            schemas(
                health_check_controller::HealthStatus,
                RunWorkflowParams,
                HomeWorkflowParams,
            )
        ),
        tags(
            (name = "coze_relay", description = "Streaming relay for Coze workflow runs")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    let cors = cors::layer(&app_state.config);

    Router::new()
        .merge(root_routes())
        .merge(health_routes())
        .merge(workflow_routes(app_state))
        .merge(openapi_routes())
        .layer(cors)
}

fn root_routes() -> Router {
    Router::new().route("/", get(root_controller::index))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn workflow_routes(app_state: AppState) -> Router {
    let body_limit = app_state.config.max_request_body_bytes;

    Router::new()
        .route(
            "/api/coze/run-workflow/stream",
            post(workflow_controller::run_workflow_stream),
        )
        .route(
            "/api/coze/home/stream",
            post(workflow_controller::home_workflow_stream),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(app_state)
}

fn openapi_routes() -> Router {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}
