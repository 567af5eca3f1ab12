//! The cache-first page pipeline.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use super::description::{Extracted, extract_description};
use super::render::{GistRenderer, GistView};
use super::{GistError, highlight, path, scrape, timeline, transcript};
use crate::cache::KeyedCache;
use crate::config::Config;
use crate::forge::ForgeBackend;
use crate::metrics::{MetricsRegistry, RenderLabels, RenderOutcome};

/// Repository layout and presentation settings of the pipeline.
#[derive(Debug, Clone)]
pub struct GistSettings {
    pub root_repo: String,
    pub web_host: String,
    pub raw_host: String,
    pub branch: String,
    pub default_entry_file: String,
    pub workspace_prefix: String,
    pub run_command: String,
    pub theme: String,
}

impl GistSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            root_repo: config.upstream.root_repo.clone(),
            web_host: config.upstream.web_host.clone(),
            raw_host: config.upstream.raw_host.clone(),
            branch: config.upstream.branch.clone(),
            default_entry_file: config.gist.default_entry_file.clone(),
            workspace_prefix: config.gist.workspace_prefix.clone(),
            run_command: config.gist.run_command.clone(),
            theme: config.gist.theme.clone(),
        }
    }
}

/// Builds example pages, memoizing each rendered body by its source URL.
pub struct GistPageBuilder {
    forge: Arc<dyn ForgeBackend>,
    cache: Arc<KeyedCache>,
    renderer: Arc<GistRenderer>,
    settings: GistSettings,
    metrics: MetricsRegistry,
}

impl GistPageBuilder {
    pub fn new(
        forge: Arc<dyn ForgeBackend>,
        cache: Arc<KeyedCache>,
        renderer: Arc<GistRenderer>,
        settings: GistSettings,
        metrics: MetricsRegistry,
    ) -> Self {
        Self {
            forge,
            cache,
            renderer,
            settings,
            metrics,
        }
    }

    #[cfg(test)]
    pub fn cache(&self) -> &Arc<KeyedCache> {
        &self.cache
    }

    /// Canonical page URL for a request path; also the cache key and the
    /// realtime room name.
    pub fn source_url(&self, example_path: &str) -> String {
        let rel = path::normalize_example_path(example_path, &self.settings.default_entry_file);
        path::canonical_url(&self.settings.root_repo, &self.settings.branch, &rel)
    }

    /// Serve the page for `example_path`, rendering it on a cache miss.
    pub async fn build(&self, example_path: &str) -> Result<Bytes, GistError> {
        self.build_at(example_path, Utc::now()).await
    }

    /// [`build`](Self::build) with the "time since last commit" measured against `now`.
    #[instrument(skip(self, now), fields(source = tracing::field::Empty))]
    pub async fn build_at(
        &self,
        example_path: &str,
        now: DateTime<Utc>,
    ) -> Result<Bytes, GistError> {
        let source = self.source_url(example_path);
        tracing::Span::current().record("source", source.as_str());

        let metrics = &self.metrics.metrics;
        if let Some(body) = self.cache.get(&source).filter(|b| !b.is_empty()) {
            metrics.page_cache_hits.inc();
            debug!("page cache hit");
            return Ok(body);
        }
        metrics.page_cache_misses.inc();

        let started = Instant::now();
        let result = self.render_page(&source, now).await;
        metrics
            .page_render_duration_seconds
            .observe(started.elapsed().as_secs_f64());

        match &result {
            Ok(body) => {
                self.cache.set(&source, body.clone());
                metrics.page_cache_entries.set(self.cache.len() as i64);
                metrics
                    .page_renders
                    .get_or_create(&RenderLabels {
                        outcome: RenderOutcome::Rendered,
                    })
                    .inc();
                info!(bytes = body.len(), "rendered example page");
            }
            Err(e) => {
                metrics
                    .page_renders
                    .get_or_create(&RenderLabels {
                        outcome: e.outcome(),
                    })
                    .inc();
                warn!(error = %e, "example page pipeline failed");
            }
        }
        result
    }

    async fn render_page(&self, source: &str, now: DateTime<Utc>) -> Result<Bytes, GistError> {
        let settings = &self.settings;
        let raw = path::raw_url(source, &settings.web_host, &settings.raw_host);
        let file = path::file_name(source).to_owned();

        // 1. Commit metadata from the file page.
        let page = self.forge.fetch_page(source).await?;
        let meta = scrape::page_meta(&page)?;
        let last_update = meta
            .last_commit
            .map(|t| timeline::diff(t, now))
            .unwrap_or_default();

        // 2. Raw contents and their package description.
        let body = self.forge.fetch_raw(&raw).await?;
        let Extracted {
            description,
            content,
        } = extract_description(&body);

        // 3. Run transcript from the parent directory listing.
        let listing = self.forge.fetch_page(path::parent_url(source)).await?;
        let names = scrape::listing_names(&listing)?;
        let workspace = path::workspace_path(source, &settings.branch, &settings.workspace_prefix);
        let run_tutorial =
            transcript::run_transcript(source, &workspace, &file, &settings.run_command, &names);

        // 4. Banner + highlighting.
        let mut annotated = format!(
            "// file {file}\n// author {}\n// edited {} days ago\n",
            meta.author.username, last_update.days
        )
        .into_bytes();
        annotated.extend_from_slice(&content);

        let theme = settings.theme.clone();
        let highlight_file = file.clone();
        let content = tokio::task::spawn_blocking(move || {
            highlight::highlight(&annotated, &highlight_file, &theme)
        })
        .await
        .map_err(|e| GistError::Highlight(format!("highlighter task failed: {e}")))??;

        // 5. Render.
        let view = GistView {
            last_update,
            author: meta.author,
            content,
            run_tutorial,
            description,
            source: source.to_owned(),
            chapter: path::chapter_label(source),
        };
        let html = self.renderer.render(&view)?;
        Ok(Bytes::from(html))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::forge::github::{GitHubBackend, build_http_client};
    use crate::gist::scrape::fixtures::{file_page, listing_page};

    pub const EXAMPLE_SOURCE: &str =
        "// Package main does the thing.\npackage main\n\nfunc main() {\n\tprintln(\"hi\")\n}\n";

    /// Config pointing every upstream host at `server`.
    pub fn config_for(server: &MockServer) -> Config {
        let mut config = Config::default();
        config.upstream.web_host = server.uri();
        config.upstream.raw_host = format!("{}/raw", server.uri());
        config.upstream.root_repo = format!("{}/iris-contrib/examples", server.uri());
        config
    }

    pub fn builder_for(server: &MockServer, metrics: MetricsRegistry) -> GistPageBuilder {
        let config = config_for(server);
        let client = build_http_client(&config.upstream).unwrap();
        GistPageBuilder::new(
            Arc::new(GitHubBackend::new(client, metrics.clone())),
            Arc::new(KeyedCache::new()),
            Arc::new(GistRenderer::new(None, false).unwrap()),
            GistSettings::from_config(&config),
            metrics,
        )
    }

    /// Mount the file page, raw file and directory listing of `dir/main.go`,
    /// each expected exactly `times` times.
    pub async fn mount_example(server: &MockServer, dir: &str, times: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/iris-contrib/examples/blob/master/{dir}/main.go")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(file_page("2020-01-15T00:00:00Z", "kataras")),
            )
            .expect(times)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/raw/iris-contrib/examples/master/{dir}/main.go")))
            .respond_with(ResponseTemplate::new(200).set_body_string(EXAMPLE_SOURCE))
            .expect(times)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/iris-contrib/examples/blob/master/{dir}/")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(listing_page(&["README.md", "templates/index.html", "main.go"])),
            )
            .expect(times)
            .mount(server)
            .await;
    }
}
