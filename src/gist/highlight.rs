//! Source-to-HTML syntax highlighting.

use std::sync::LazyLock;

use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use super::GistError;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

/// Highlight `content` as HTML using the syntax matching `file_name`'s
/// extension, falling back to plain text.
pub fn highlight(content: &[u8], file_name: &str, theme: &str) -> Result<String, GistError> {
    let theme = THEME_SET
        .themes
        .get(theme)
        .ok_or_else(|| GistError::Highlight(format!("unknown theme {theme:?}")))?;

    let syntax = file_name
        .rsplit_once('.')
        .and_then(|(_, ext)| SYNTAX_SET.find_syntax_by_extension(ext))
        .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());

    let text = String::from_utf8_lossy(content);
    highlighted_html_for_string(&text, &SYNTAX_SET, syntax, theme)
        .map_err(|e| GistError::Highlight(e.to_string()))
}
