//! Example page pipeline.
//!
//! Turns a repository-relative example path into a rendered HTML page:
//! scrape the file's GitHub page for commit metadata, fetch the raw file,
//! pull out its package description, list the sibling files, highlight the
//! source and render the `gist` template.  Rendered pages are memoized in the
//! shared [`KeyedCache`](crate::cache::KeyedCache).

pub mod builder;
pub mod description;
pub mod highlight;
pub mod path;
pub mod render;
pub mod scrape;
pub mod timeline;
pub mod transcript;

pub use builder::{GistPageBuilder, GistSettings};
pub use render::GistRenderer;

use crate::metrics::RenderOutcome;

/// Failure of the page pipeline.  Never cached.
#[derive(Debug, thiserror::Error)]
pub enum GistError {
    #[error("failed to fetch {url}: {source}")]
    UpstreamFetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    UpstreamStatus { url: String, status: u16 },

    #[error("malformed page: {0}")]
    Parse(String),

    #[error("malformed commit timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("highlighting failed: {0}")]
    Highlight(String),

    #[error("template rendering failed: {0}")]
    Render(#[from] handlebars::RenderError),
}

impl GistError {
    /// Whether the failure lies with the requested page rather than with us.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, GistError::Highlight(_) | GistError::Render(_))
    }

    pub(crate) fn outcome(&self) -> RenderOutcome {
        match self {
            GistError::UpstreamFetch { .. } | GistError::UpstreamStatus { .. } => {
                RenderOutcome::UpstreamError
            }
            GistError::Parse(_) | GistError::Timestamp(_) => RenderOutcome::ParseError,
            GistError::Highlight(_) | GistError::Render(_) => RenderOutcome::RenderError,
        }
    }
}
