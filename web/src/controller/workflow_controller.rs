use crate::error::Error;
use crate::extractors::workflow_payload::WorkflowPayload;
use crate::AppState;
use axum::extract::State;
use axum::response::Response;
use domain::workflow::{self, HomeWorkflowParams, RunWorkflowParams};

/// POST run the configured workflow and relay its event stream
///
/// A request without a JSON body is treated as an empty payload. A malformed or
/// oversized JSON body is rejected before the workflow is started.
#[utoipa::path(
    post,
    path = "/api/coze/run-workflow/stream",
    request_body = RunWorkflowParams,
    responses(
        (status = 200, description = "Relayed workflow event stream. Failures are delivered as `event: error` frames", content_type = "text/event-stream", body = String),
        (status = 400, description = "Malformed JSON body"),
        (status = 413, description = "Request body exceeds the configured limit"),
        (status = 422, description = "JSON body fields have the wrong type"),
    )
)]
pub async fn run_workflow_stream(
    State(app_state): State<AppState>,
    WorkflowPayload(params): WorkflowPayload<RunWorkflowParams>,
) -> Result<Response, Error> {
    let run = workflow::run_workflow(&params, &app_state.config)?;
    let request = run.upstream_request(app_state.config.coze_base_url())?;

    Ok(app_state.relay.stream(run.tag, request))
}

/// POST run the home-page workflow and relay its event stream
///
/// The body's `workflow_id` takes precedence over the configured default.
#[utoipa::path(
    post,
    path = "/api/coze/home/stream",
    request_body = HomeWorkflowParams,
    responses(
        (status = 200, description = "Relayed workflow event stream. Failures are delivered as `event: error` frames", content_type = "text/event-stream", body = String),
        (status = 400, description = "Malformed JSON body"),
        (status = 413, description = "Request body exceeds the configured limit"),
        (status = 422, description = "JSON body fields have the wrong type"),
    )
)]
pub async fn home_workflow_stream(
    State(app_state): State<AppState>,
    WorkflowPayload(params): WorkflowPayload<HomeWorkflowParams>,
) -> Result<Response, Error> {
    let run = workflow::home_workflow(&params, &app_state.config)?;
    let request = run.upstream_request(app_state.config.coze_base_url())?;

    Ok(app_state.relay.stream(run.tag, request))
}

#[cfg(test)]
mod tests {
    use crate::router::define_routes;
    use crate::test_support::test_config;
    use crate::AppState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use service::config::Config;
    use tower::ServiceExt;

    fn test_app(config: Config) -> Router {
        define_routes(AppState::new(config).unwrap())
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// Splits an event-stream body into frames, dropping the relay's own comment frames.
    async fn data_frames(app: Router, request: Request<Body>) -> Vec<String> {
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/event-stream; charset=utf-8"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec())
            .unwrap()
            .split("\n\n")
            .filter(|frame| !frame.is_empty() && !frame.starts_with(": "))
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn test_run_workflow_without_input_or_parameters_yields_validation_frame() {
        let app = test_app(test_config("http://127.0.0.1:9"));
        let request = Request::builder()
            .method("POST")
            .uri("/api/coze/run-workflow/stream")
            .body(Body::empty())
            .unwrap();

        let frames = data_frames(app, request).await;

        assert_eq!(
            frames,
            vec![
                "event: error\ndata: {\"message\":\"missing input or parameters: provide at least one\"}"
            ]
        );
    }

    #[tokio::test]
    async fn test_run_workflow_without_token_yields_configuration_frame() {
        let app = test_app(test_config("http://127.0.0.1:9").set_coze_token(None));

        let frames = data_frames(
            app,
            post_json("/api/coze/run-workflow/stream", json!({"input": "x"})),
        )
        .await;

        assert_eq!(
            frames,
            vec!["event: error\ndata: {\"message\":\"server is not configured with COZE_TOKEN\"}"]
        );
    }

    #[tokio::test]
    async fn test_run_workflow_upstream_401_yields_status_frame() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/workflow/stream_run")
            .match_header("authorization", "Bearer pat_test")
            .match_header("accept", "text/event-stream")
            .with_status(401)
            .with_body(r#"{"code":4100}"#)
            .create_async()
            .await;
        let app = test_app(test_config(&server.url()));

        let frames = data_frames(
            app,
            post_json(
                "/api/coze/run-workflow/stream",
                json!({"input": "https://example.com"}),
            ),
        )
        .await;

        mock.assert_async().await;
        assert_eq!(
            frames,
            vec!["event: error\ndata: {\"status\":401,\"body\":\"{\\\"code\\\":4100}\"}"]
        );
    }

    #[tokio::test]
    async fn test_run_workflow_relays_upstream_events() {
        let mut server = Server::new_async().await;
        let upstream_body = "id: 0\nevent: Message\ndata: {\"content\":\"hi\"}\n\nid: 1\nevent: Done\ndata: {}\n\n";
        let mock = server
            .mock("POST", "/v1/workflow/stream_run")
            .match_body(Matcher::Json(json!({
                "workflow_id": "wf_run",
                "parameters": {"input": "https://example.com", "lang": "en"},
                "bot_id": "bot_1"
            })))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(upstream_body)
            .create_async()
            .await;
        let app = test_app(test_config(&server.url()));

        let frames = data_frames(
            app,
            post_json(
                "/api/coze/run-workflow/stream",
                json!({
                    "input": "https://example.com",
                    "parameters": {"lang": "en"},
                    "bot_id": "bot_1"
                }),
            ),
        )
        .await;

        mock.assert_async().await;
        assert_eq!(
            frames,
            vec![
                "id: 0\nevent: Message\ndata: {\"content\":\"hi\"}",
                "id: 1\nevent: Done\ndata: {}"
            ]
        );
    }

    #[tokio::test]
    async fn test_home_workflow_request_workflow_id_overrides_default() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/workflow/stream_run")
            .match_body(Matcher::PartialJson(json!({
                "workflow_id": "wf_from_request",
                "parameters": {"home_url": "https://example.com"}
            })))
            .with_status(200)
            .with_body("event: Done\ndata: {}\n\n")
            .create_async()
            .await;
        let app = test_app(test_config(&server.url()));

        let frames = data_frames(
            app,
            post_json(
                "/api/coze/home/stream",
                json!({"workflow_id": "wf_from_request", "home_url": "https://example.com"}),
            ),
        )
        .await;

        mock.assert_async().await;
        assert_eq!(frames, vec!["event: Done\ndata: {}"]);
    }

    #[tokio::test]
    async fn test_home_workflow_without_any_workflow_id_yields_configuration_frame() {
        let app = test_app(test_config("http://127.0.0.1:9").set_coze_workflow_id_home(None));

        let frames = data_frames(
            app,
            post_json("/api/coze/home/stream", json!({"home_url": "https://example.com"})),
        )
        .await;

        assert_eq!(
            frames,
            vec!["event: error\ndata: {\"message\":\"no workflow_id supplied and COZE_WORKFLOW_ID_HOME is not configured\"}"]
        );
    }

    #[tokio::test]
    async fn test_run_workflow_empty_json_body_yields_validation_frame() {
        let app = test_app(test_config("http://127.0.0.1:9"));
        let request = Request::builder()
            .method("POST")
            .uri("/api/coze/run-workflow/stream")
            .header("content-type", "application/json")
            .body(Body::empty())
            .unwrap();

        let frames = data_frames(app, request).await;

        assert_eq!(
            frames,
            vec![
                "event: error\ndata: {\"message\":\"missing input or parameters: provide at least one\"}"
            ]
        );
    }

    #[tokio::test]
    async fn test_home_workflow_malformed_body_is_rejected_without_upstream_call() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/workflow/stream_run")
            .with_status(200)
            .with_body("event: Done\ndata: {}\n\n")
            .expect(0)
            .create_async()
            .await;
        let app = test_app(test_config(&server.url()));
        let request = Request::builder()
            .method("POST")
            .uri("/api/coze/home/stream")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"home_url": "https://x.example","#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_home_workflow_oversized_body_is_rejected_without_upstream_call() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/workflow/stream_run")
            .with_status(200)
            .with_body("event: Done\ndata: {}\n\n")
            .expect(0)
            .create_async()
            .await;
        let mut config = test_config(&server.url());
        config.max_request_body_bytes = 1024;
        let app = test_app(config);

        let response = app
            .oneshot(post_json(
                "/api/coze/home/stream",
                json!({"home_url": "x".repeat(4096)}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_run_workflow_mistyped_parameters_are_rejected_without_upstream_call() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/workflow/stream_run")
            .expect(0)
            .create_async()
            .await;
        let app = test_app(test_config(&server.url()));

        let response = app
            .oneshot(post_json(
                "/api/coze/run-workflow/stream",
                json!({"input": "https://example.com", "parameters": "x"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        mock.assert_async().await;
    }
}
