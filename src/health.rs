use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::cache::{KeyedCache, ViewCounter};
use crate::config::Config;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checks: HealthChecks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub upstream: CheckResult,
    pub page_cache: CheckResult,
    pub viewers: CheckResult,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CheckResult {
    fn healthy(detail: impl Into<String>) -> Self {
        Self {
            ok: true,
            detail: Some(detail.into()),
        }
    }

    fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            detail: Some(detail.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared state expected by the handler
// ---------------------------------------------------------------------------

/// The parts of `AppState` the health check reads.
#[derive(Clone)]
pub struct HealthState {
    pub config: Arc<Config>,
    pub http_client: reqwest::Client,
    pub cache: Arc<KeyedCache>,
    pub views: Arc<ViewCounter>,
}

// ---------------------------------------------------------------------------
// Individual checks
// ---------------------------------------------------------------------------

async fn check_upstream(client: &reqwest::Client, root_repo: &str) -> CheckResult {
    match client.head(root_repo).send().await {
        Ok(resp) if resp.status().is_success() || resp.status().is_redirection() => {
            CheckResult::healthy(format!("HEAD {root_repo} returned {}", resp.status()))
        }
        Ok(resp) => CheckResult::unhealthy(format!(
            "HEAD {root_repo} returned {}",
            resp.status()
        )),
        Err(e) => CheckResult::unhealthy(format!("HEAD {root_repo} failed: {e}")),
    }
}

fn check_page_cache(cache: &KeyedCache) -> CheckResult {
    CheckResult::healthy(format!(
        "{} pages cached (capacity {})",
        cache.len(),
        cache.capacity()
    ))
}

fn check_viewers(views: &ViewCounter) -> CheckResult {
    if views.is_empty() {
        return CheckResult::healthy("no pages watched");
    }
    CheckResult::healthy(format!(
        "{} viewers across {} pages",
        views.total(),
        views.len()
    ))
}

// ---------------------------------------------------------------------------
// Aggregate status
// ---------------------------------------------------------------------------

/// Cached pages keep being served while upstream is down, so a failing
/// upstream only makes the service unhealthy when nothing is cached.
fn aggregate_status(checks: &HealthChecks, cache_empty: bool) -> HealthStatus {
    if checks.upstream.ok && checks.page_cache.ok && checks.viewers.ok {
        HealthStatus::Ok
    } else if cache_empty {
        HealthStatus::Unhealthy
    } else {
        HealthStatus::Degraded
    }
}

// ---------------------------------------------------------------------------
// Axum handler
// ---------------------------------------------------------------------------

/// `GET /healthz` handler.  Returns 200 on Ok/Degraded, 503 on Unhealthy.
pub async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let upstream = check_upstream(&state.http_client, &state.config.upstream.root_repo).await;
    let checks = HealthChecks {
        upstream,
        page_cache: check_page_cache(&state.cache),
        viewers: check_viewers(&state.views),
    };
    let status = aggregate_status(&checks, state.cache.is_empty());
    let body = HealthResponse { status, checks };

    let http_status = match status {
        HealthStatus::Ok | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (http_status, Json(body))
}
