//! Regular-expression guards for named path parameters.
//!
//! Attach with `route_layer(middleware::from_fn_with_state(expr, guard_params))`
//! so the parameters are already matched.  A value that fails its expression
//! answers 404 before the handler runs; parameters without a rule pass.

use std::sync::Arc;

use axum::extract::{RawPathParams, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use regex::Regex;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ParamExpr {
    rules: Arc<Vec<(String, Regex)>>,
}

impl ParamExpr {
    /// Compile `(parameter name, expression)` pairs.
    pub fn new<'a>(
        rules: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, regex::Error> {
        let rules = rules
            .into_iter()
            .map(|(name, expr)| Ok((name.to_owned(), Regex::new(expr)?)))
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self {
            rules: Arc::new(rules),
        })
    }

    pub fn allows(&self, name: &str, value: &str) -> bool {
        self.rules
            .iter()
            .filter(|(rule, _)| rule == name)
            .all(|(_, expr)| expr.is_match(value))
    }
}

pub async fn guard_params(
    State(expr): State<ParamExpr>,
    params: RawPathParams,
    req: Request,
    next: Next,
) -> Response {
    if let Some((name, value)) = params.iter().find(|(n, v)| !expr.allows(n, v)) {
        debug!(param = name, value, path = %req.uri().path(), "path parameter rejected");
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::body::Body;
    use axum::http::Request;
    use axum::middleware;
    use axum::routing::get;
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        let expr = ParamExpr::new([("id", r"^[0-9]+$")]).unwrap();
        Router::new()
            .route("/items/{id}/{name}", get(|| async { "ok" }))
            .route_layer(middleware::from_fn_with_state(expr, guard_params))
    }

    async fn status(uri: &str) -> StatusCode {
        app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[test]
    fn unmatched_names_pass() {
        let expr = ParamExpr::new([("id", r"^[0-9]+$")]).unwrap();
        assert!(expr.allows("id", "42"));
        assert!(!expr.allows("id", "4x2"));
        assert!(expr.allows("name", "anything"));
    }

    #[test]
    fn invalid_expression_is_rejected() {
        assert!(ParamExpr::new([("id", "(")]).is_err());
    }

    #[tokio::test]
    async fn matching_params_reach_handler() {
        assert_eq!(status("/items/42/anything").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn mismatch_answers_not_found() {
        assert_eq!(status("/items/abc/anything").await, StatusCode::NOT_FOUND);
    }
}
