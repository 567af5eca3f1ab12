//! Extraction of commit metadata and directory listings from GitHub pages.
//!
//! These selectors follow GitHub's server-rendered markup and break whenever
//! that markup changes.  Missing elements degrade to empty values; only a
//! malformed timestamp is an error.

use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use serde::Serialize;

use super::GistError;

const LAST_COMMIT_TIME: &str = "div.commit-tease .float-right relative-time";
const AUTHOR_AVATAR: &str = "img.avatar";
const LISTING_ROW: &str = "table.js-navigation-container tr.js-navigation-item";
const LISTING_NAME: &str = ".content a";

/// Author of the last commit touching a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Author {
    pub username: String,
    pub avatar_uri: String,
}

/// Metadata scraped from a file's page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMeta {
    pub last_commit: Option<DateTime<Utc>>,
    pub author: Author,
}

fn selector(css: &str) -> Result<Selector, GistError> {
    Selector::parse(css).map_err(|e| GistError::Parse(format!("selector {css:?}: {e}")))
}

/// Extract the last-commit timestamp and author from a file page.
pub fn page_meta(html: &str) -> Result<PageMeta, GistError> {
    let doc = Html::parse_document(html);

    let last_commit = doc
        .select(&selector(LAST_COMMIT_TIME)?)
        .find_map(|el| el.value().attr("datetime"))
        .map(|raw| DateTime::parse_from_rfc3339(raw).map(|t| t.with_timezone(&Utc)))
        .transpose()?;

    let author = doc
        .select(&selector(AUTHOR_AVATAR)?)
        .next()
        .map(|el| Author {
            username: el.value().attr("alt").unwrap_or_default().to_owned(),
            avatar_uri: el.value().attr("src").unwrap_or_default().to_owned(),
        })
        .unwrap_or_default();

    Ok(PageMeta {
        last_commit,
        author,
    })
}

/// Entry names listed on a directory page, in page order.
pub fn listing_names(html: &str) -> Result<Vec<String>, GistError> {
    let doc = Html::parse_document(html);
    let row_sel = selector(LISTING_ROW)?;
    let name_sel = selector(LISTING_NAME)?;

    let names = doc
        .select(&row_sel)
        .map(|row| {
            row.select(&name_sel)
                .flat_map(|a| a.text())
                .collect::<String>()
                .trim()
                .to_owned()
        })
        .filter(|name| !name.is_empty())
        .collect();
    Ok(names)
}
