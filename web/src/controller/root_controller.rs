use axum::response::{Html, IntoResponse};

const INDEX: &str = r#"<h3>Coze streaming relay is running</h3>
<p>Health check: <a href="/health">/health</a></p>
<p>Run workflow: POST <code>/api/coze/run-workflow/stream</code></p>
<p>Home page workflow: POST <code>/api/coze/home/stream</code></p>
<p>API description: <a href="/api-docs/openapi.json">/api-docs/openapi.json</a></p>
"#;

/// GET static page listing the relay endpoints
pub async fn index() -> impl IntoResponse {
    Html(INDEX)
}
