//! Upstream forge access.
//!
//! Provides the [`ForgeBackend`] trait through which the page pipeline reads
//! browsable HTML pages and raw file contents.  No URL construction happens
//! here; callers hand in fully derived URLs.

pub mod github;

use bytes::Bytes;

use crate::gist::GistError;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Abstraction over the HTTP reads the page pipeline performs.
#[async_trait::async_trait]
pub trait ForgeBackend: Send + Sync {
    /// Fetch a browsable HTML page (file view or directory listing).
    async fn fetch_page(&self, url: &str) -> Result<String, GistError>;

    /// Fetch the raw bytes of a file.
    async fn fetch_raw(&self, url: &str) -> Result<Bytes, GistError>;
}
