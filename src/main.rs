mod blog;
mod cache;
mod config;
mod forge;
mod gist;
mod health;
mod http;
mod metrics;
mod realtime;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::blog::{BlogStore, MemoryStore};
use crate::cache::{KeyedCache, ViewCounter};
use crate::config::Config;
use crate::gist::{GistPageBuilder, GistRenderer, GistSettings};
use crate::metrics::MetricsRegistry;
use crate::realtime::ViewerHub;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "gistview",
    about = "Tutorial viewer for GitHub-hosted examples, with live viewer counts and a blog API"
)]
struct Cli {
    /// Path to the YAML configuration file.  Built-in defaults apply when omitted.
    #[arg(short, long)]
    config: Option<String>,

    /// Override `server.http_listen`.
    #[arg(short, long)]
    listen: Option<String>,
}

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// Global state shared across all request handlers and background tasks.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub metrics: MetricsRegistry,
    pub http_client: reqwest::Client,
    /// Rendered example pages keyed by source URL.
    pub cache: Arc<KeyedCache>,
    /// Live viewer counts keyed by source URL.
    pub views: Arc<ViewCounter>,
    pub gist: Arc<GistPageBuilder>,
    pub hub: Arc<ViewerHub>,
    pub blog: Arc<dyn BlogStore>,
}

impl AppState {
    pub fn build(config: Arc<Config>) -> Result<Self> {
        let metrics = MetricsRegistry::new();
        let http_client = forge::github::build_http_client(&config.upstream)?;

        let forge: Arc<dyn forge::ForgeBackend> = Arc::new(forge::github::GitHubBackend::new(
            http_client.clone(),
            metrics.clone(),
        ));
        let renderer = GistRenderer::new(
            config.server.templates_dir.as_deref().map(Path::new),
            config.server.template_reload,
        )?;

        let cache = Arc::new(KeyedCache::new());
        let views = Arc::new(ViewCounter::new());

        let gist = GistPageBuilder::new(
            forge,
            Arc::clone(&cache),
            Arc::new(renderer),
            GistSettings::from_config(&config),
            metrics.clone(),
        );
        let hub = ViewerHub::new(
            Arc::clone(&views),
            &config.upstream.root_repo,
            Duration::from_millis(config.realtime.leave_broadcast_delay_ms),
            metrics.clone(),
        );

        Ok(Self {
            config,
            metrics,
            http_client,
            cache,
            views,
            gist: Arc::new(gist),
            hub: Arc::new(hub),
            blog: Arc::new(MemoryStore::new()),
        })
    }
}

// ---------------------------------------------------------------------------
// HTTP server (axum)
// ---------------------------------------------------------------------------

async fn run_http_server(state: AppState) -> Result<()> {
    let app = http::handler::create_router(Arc::new(state.clone()))?;

    let listen_addr: std::net::SocketAddr = state
        .config
        .server
        .http_listen
        .parse()
        .context("invalid http_listen address")?;

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {listen_addr}"))?;

    tracing::info!(%listen_addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

/// Drop every rendered page on SIGHUP so the next request re-renders it.
#[cfg(unix)]
async fn run_cache_reset_on_hangup(state: AppState) -> Result<()> {
    let mut hangup = signal::unix::signal(signal::unix::SignalKind::hangup())
        .context("failed to install SIGHUP handler")?;
    while hangup.recv().await.is_some() {
        let dropped = state.cache.len();
        state.cache.reset();
        state.metrics.metrics.page_cache_entries.set(0);
        tracing::info!(dropped, "received SIGHUP, page cache reset");
    }
    Ok(())
}

#[cfg(not(unix))]
async fn run_cache_reset_on_hangup(_state: AppState) -> Result<()> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Graceful shutdown
// ---------------------------------------------------------------------------

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // ---- CLI ----
    let cli = Cli::parse();

    // ---- Config ----
    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => {
            let config = Config::default();
            config::validate_config(&config)?;
            config
        }
    };
    if let Some(listen) = cli.listen {
        config.server.http_listen = listen;
    }
    let config = Arc::new(config);

    // ---- Tracing ----
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!(
        config_path = cli.config.as_deref().unwrap_or("<defaults>"),
        root_repo = %config.upstream.root_repo,
        "starting gistview"
    );

    // ---- App state ----
    let state = AppState::build(Arc::clone(&config))?;

    // ---- Spawn services ----
    let http_handle = tokio::spawn({
        let s = state.clone();
        async move {
            if let Err(e) = run_http_server(s).await {
                tracing::error!(error = %e, "HTTP server failed");
            }
        }
    });

    let reset_handle = tokio::spawn({
        let s = state.clone();
        async move {
            if let Err(e) = run_cache_reset_on_hangup(s).await {
                tracing::error!(error = %e, "page cache reset handler failed");
            }
        }
    });

    // ---- Await shutdown ----
    // The HTTP server owns the shutdown signal; the reset handler has nothing
    // to flush and is dropped with it.
    let _ = http_handle.await;
    reset_handle.abort();

    tracing::info!("gistview shut down cleanly");
    Ok(())
}
