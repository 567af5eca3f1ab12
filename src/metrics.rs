use std::sync::Arc;

use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;

// ---------------------------------------------------------------------------
// Label types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RenderLabels {
    pub outcome: RenderOutcome,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum RenderOutcome {
    Rendered,
    UpstreamError,
    ParseError,
    RenderError,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct FetchLabels {
    pub kind: FetchKind,
    pub outcome: FetchOutcome,
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum FetchKind {
    Page,
    Raw,
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum FetchOutcome {
    Ok,
    Error,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct BlogLabels {
    pub object: BlogObject,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum BlogObject {
    User,
    Post,
}

// ---------------------------------------------------------------------------
// Metrics struct
// ---------------------------------------------------------------------------

/// Central container for every Prometheus metric exposed by the service.
pub struct Metrics {
    // -- page cache --
    pub page_cache_hits: Counter,
    pub page_cache_misses: Counter,
    pub page_cache_entries: Gauge,

    // -- rendering --
    pub page_renders: Family<RenderLabels, Counter>,
    pub page_render_duration_seconds: Histogram,

    // -- upstream --
    pub upstream_fetches: Family<FetchLabels, Counter>,

    // -- realtime --
    pub realtime_connections: Gauge,
    pub realtime_broadcasts: Counter,

    // -- blog --
    pub blog_created: Family<BlogLabels, Counter>,
}

impl Metrics {
    /// Create a new [`Metrics`] instance and register every metric with the
    /// supplied `registry`.
    pub fn new(registry: &mut Registry) -> Self {
        let page_cache_hits = Counter::default();
        registry.register(
            "gistview_page_cache_hits",
            "Example pages served from the page cache",
            page_cache_hits.clone(),
        );

        let page_cache_misses = Counter::default();
        registry.register(
            "gistview_page_cache_misses",
            "Example pages that had to be rendered",
            page_cache_misses.clone(),
        );

        let page_cache_entries: Gauge = Gauge::default();
        registry.register(
            "gistview_page_cache_entries",
            "Rendered pages currently held in the page cache",
            page_cache_entries.clone(),
        );

        let page_renders = Family::<RenderLabels, Counter>::default();
        registry.register(
            "gistview_page_renders",
            "Page pipeline runs by outcome",
            page_renders.clone(),
        );

        let page_render_duration_seconds = Histogram::new(exponential_buckets(0.01, 2.0, 12));
        registry.register(
            "gistview_page_render_duration_seconds",
            "Page pipeline latency on cache miss in seconds",
            page_render_duration_seconds.clone(),
        );

        let upstream_fetches = Family::<FetchLabels, Counter>::default();
        registry.register(
            "gistview_upstream_fetches",
            "Upstream HTTP fetches by kind and outcome",
            upstream_fetches.clone(),
        );

        let realtime_connections: Gauge = Gauge::default();
        registry.register(
            "gistview_realtime_connections",
            "Currently open viewer websocket connections",
            realtime_connections.clone(),
        );

        let realtime_broadcasts = Counter::default();
        registry.register(
            "gistview_realtime_broadcasts",
            "Viewer count messages queued to websocket clients",
            realtime_broadcasts.clone(),
        );

        let blog_created = Family::<BlogLabels, Counter>::default();
        registry.register(
            "gistview_blog_created",
            "Blog objects created by kind",
            blog_created.clone(),
        );

        Self {
            page_cache_hits,
            page_cache_misses,
            page_cache_entries,
            page_renders,
            page_render_duration_seconds,
            upstream_fetches,
            realtime_connections,
            realtime_broadcasts,
            blog_created,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared handle
// ---------------------------------------------------------------------------

/// Thread-safe wrapper for the metrics registry, used in [`AppState`].
///
/// [`AppState`]: crate::AppState
#[derive(Clone)]
pub struct MetricsRegistry {
    pub registry: Arc<Registry>,
    pub metrics: Arc<Metrics>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    /// Build a fresh registry and pre-register all service metrics.
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let metrics = Metrics::new(&mut registry);
        Self {
            registry: Arc::new(registry),
            metrics: Arc::new(metrics),
        }
    }

    /// Encode the registry in the OpenMetrics text format.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buf = String::new();
        prometheus_client::encoding::text::encode(&mut buf, &self.registry)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_registered_metrics() {
        let metrics = MetricsRegistry::new();
        metrics.metrics.page_cache_hits.inc();
        metrics
            .metrics
            .upstream_fetches
            .get_or_create(&FetchLabels {
                kind: FetchKind::Raw,
                outcome: FetchOutcome::Ok,
            })
            .inc();

        let text = metrics.encode().unwrap();
        assert!(text.contains("gistview_page_cache_hits_total 1"));
        assert!(text.contains("gistview_upstream_fetches_total{kind=\"Raw\",outcome=\"Ok\"} 1"));
        assert!(text.ends_with("# EOF\n"));
    }
}
