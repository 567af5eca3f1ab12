//! Main axum router and HTTP request handlers.
//!
//! Routes:
//! - `GET  /example/{*example}` - Rendered example page
//! - `GET  /css/*`              - Stylesheets
//! - `GET  /gist-realtime`      - Live viewer websocket
//! - `POST /users/`, `GET /users/{id}/posts`, `POST /posts/`, `GET /posts/{id}` - Blog API
//! - `GET  /healthz`            - Health check
//! - `GET  /metrics`            - Prometheus metrics

use std::sync::Arc;

use anyhow::Context as _;
use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, instrument, warn};

use crate::AppState;
use crate::blog::StoreError;
use crate::gist::GistError;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the axum [`Router`] with all HTTP routes and shared state.
pub fn create_router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let blog = crate::blog::handlers::routes().context("invalid blog path expressions")?;
    let assets = ServeDir::new(&state.config.server.assets_dir);

    Ok(Router::new()
        // Gist viewer
        .route("/example/{*example}", get(handle_example))
        .nest_service("/css", assets)
        .route(
            "/gist-realtime",
            get(crate::realtime::socket::handle_gist_realtime),
        )
        // Blog API
        .merge(blog)
        // Health, metrics
        .route("/healthz", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /example/{*example}`
///
/// Serves the cached page for the example, rendering it first on a miss.
#[instrument(skip(state))]
async fn handle_example(
    State(state): State<Arc<AppState>>,
    Path(example): Path<String>,
) -> Result<Response, AppError> {
    let body = state.gist.build(&example).await?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        body,
    )
        .into_response())
}

/// `GET /healthz`
async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health_state = crate::health::HealthState {
        config: Arc::clone(&state.config),
        http_client: state.http_client.clone(),
        cache: Arc::clone(&state.cache),
        views: Arc::clone(&state.views),
    };
    crate::health::health_handler(axum::extract::State(health_state)).await
}

/// `GET /metrics`
async fn handle_metrics(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let buf = state
        .metrics
        .encode()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("metrics encoding failed: {e}")))?;

    Ok((
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )],
        buf,
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Application-level error type that maps cleanly to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// The request names something we could not fetch or parse, or is malformed.
    BadRequest(String),
    /// The requested object does not exist.
    NotFound(String),
    /// An unexpected internal error.
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(msg) => {
                warn!(error = %msg, "bad request");
                (StatusCode::BAD_REQUEST, msg).into_response()
            }
            AppError::NotFound(msg) => {
                warn!(error = %msg, "not found");
                (StatusCode::NOT_FOUND, msg).into_response()
            }
            AppError::Internal(err) => {
                error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Internal server error: {err:#}"),
                )
                    .into_response()
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<GistError> for AppError {
    fn from(err: GistError) -> Self {
        if err.is_client_error() {
            AppError::BadRequest(err.to_string())
        } else {
            AppError::Internal(err.into())
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::NotFound(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::Config;
    use crate::gist::builder::test_support::{config_for, mount_example};

    fn app_with(mut config: Config) -> Router {
        config.server.assets_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/css").into();
        let state = AppState::build(Arc::new(config)).unwrap();
        create_router(Arc::new(state)).unwrap()
    }

    fn app(server: &MockServer) -> Router {
        app_with(config_for(server))
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn example_page_is_rendered_once_then_cached() {
        let server = MockServer::start().await;
        mount_example(&server, "hello", 1).await;
        let app = app(&server);

        let first = app.clone().oneshot(get("/example/hello")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(
            first.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
        let first = to_bytes(first.into_body(), usize::MAX).await.unwrap();

        let (status, second) = send(&app, get("/example/hello/main.go")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first.to_vec(), second);
        server.verify().await;
    }

    #[tokio::test]
    async fn missing_example_is_a_bad_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (status, body) = send(&app(&server), get("/example/nope")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(String::from_utf8(body).unwrap().contains("404"));
    }

    #[tokio::test]
    async fn highlight_failure_is_an_internal_error() {
        let server = MockServer::start().await;
        mount_example(&server, "hello", 1).await;
        let mut config = config_for(&server);
        config.gist.theme = "no-such-theme".into();

        let (status, body) = send(&app_with(config), get("/example/hello")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(String::from_utf8(body).unwrap().contains("unknown theme \"no-such-theme\""));
    }

    #[tokio::test]
    async fn stylesheet_is_served() {
        let server = MockServer::start().await;
        let (status, _) = send(&app(&server), get("/css/gist.css")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn blog_flow() {
        let server = MockServer::start().await;
        let app = app(&server);

        let (status, body) = send(
            &app,
            post_json(
                "/users/",
                json!({"username": "kataras", "password": "pw", "mail": "k@example.com"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let user: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(user["avatar"], "https://github.com/kataras.png");
        assert!(user.get("password").is_none());
        let user_id = user["user_id"].as_u64().unwrap();

        let (status, body) = send(
            &app,
            post_json("/posts/", json!({"user_id": user_id, "body": "first"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let post: Value = serde_json::from_slice(&body).unwrap();
        let post_id = post["post_id"].as_u64().unwrap();

        let (status, body) = send(&app, get(&format!("/users/{user_id}/posts"))).await;
        assert_eq!(status, StatusCode::OK);
        let posts: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(posts.as_array().unwrap().len(), 1);
        assert_eq!(posts[0]["body"], "first");

        let (status, body) = send(&app, get(&format!("/posts/{post_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), post);
    }

    #[tokio::test]
    async fn blog_not_found_cases() {
        let server = MockServer::start().await;
        let app = app(&server);

        let (status, _) = send(&app, get("/posts/99")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, get("/posts/abc")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, get("/posts/99999999999999999999999")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, get("/users/18446744073709551616/posts")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, get("/users/x1/posts")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            post_json("/posts/", json!({"user_id": 42, "body": "orphan"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_username_is_rejected() {
        let server = MockServer::start().await;
        let (status, _) = send(
            &app(&server),
            post_json("/users/", json!({"username": " ", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn metrics_are_exposed() {
        let server = MockServer::start().await;
        let app = app(&server);
        send(
            &app,
            post_json("/users/", json!({"username": "a", "password": "pw"})),
        )
        .await;

        let (status, body) = send(&app, get("/metrics")).await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("gistview_blog_created_total{object=\"User\"} 1"));
    }
}
