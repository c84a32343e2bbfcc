use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::{HeaderValue, Method};
use log::*;
use service::config::Config;
use std::collections::HashSet;
use tower_http::cors::{AllowOrigin, CorsLayer};

const LOCAL_ORIGIN_PREFIXES: [&str; 2] = ["http://localhost:", "http://127.0.0.1:"];

/// CORS policy for browser clients: the configured origins plus any local
/// development origin. Requests without an `Origin` header pass through untouched.
pub fn layer(config: &Config) -> CorsLayer {
    let allowed: HashSet<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid allowed origin {origin:?}: {e}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _request: &Parts| {
                allowed.contains(origin) || is_local_origin(origin)
            },
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, ACCEPT])
}

/// `http://localhost:<port>` or `http://127.0.0.1:<port>`.
fn is_local_origin(origin: &HeaderValue) -> bool {
    let Ok(origin) = origin.to_str() else {
        return false;
    };
    LOCAL_ORIGIN_PREFIXES.iter().any(|prefix| {
        origin.strip_prefix(prefix).is_some_and(|port| {
            !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use clap::Parser;
    use tower::ServiceExt;

    fn app() -> Router {
        let config = Config::parse_from([
            "coze_relay",
            "--allowed-origins",
            "https://app.example.com",
        ]);
        Router::new()
            .route("/health", get(|| async { "ok" }))
            .layer(layer(&config))
    }

    async fn allow_origin_for(origin: &str) -> Option<HeaderValue> {
        let request = Request::builder()
            .uri("/health")
            .header("origin", origin)
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        response
            .headers()
            .get("access-control-allow-origin")
            .cloned()
    }

    #[test]
    fn test_is_local_origin() {
        assert!(is_local_origin(&HeaderValue::from_static("http://localhost:5173")));
        assert!(is_local_origin(&HeaderValue::from_static("http://127.0.0.1:8080")));
        assert!(!is_local_origin(&HeaderValue::from_static("http://localhost:")));
        assert!(!is_local_origin(&HeaderValue::from_static("http://localhost:80.evil.com")));
        assert!(!is_local_origin(&HeaderValue::from_static("https://localhost:3000")));
    }

    #[tokio::test]
    async fn test_configured_and_local_origins_are_allowed() {
        assert_eq!(
            allow_origin_for("https://app.example.com").await.unwrap(),
            "https://app.example.com"
        );
        assert_eq!(
            allow_origin_for("http://localhost:4321").await.unwrap(),
            "http://localhost:4321"
        );
    }

    #[tokio::test]
    async fn test_foreign_origin_is_not_allowed() {
        assert!(allow_origin_for("https://evil.example.com").await.is_none());
    }

    #[tokio::test]
    async fn test_preflight_is_answered_by_the_layer() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/health")
            .header("origin", "http://localhost:3000")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert!(response.status().is_success());
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "http://localhost:3000"
        );
    }
}
