//! Leading package-comment extraction.
//!
//! Example files open with a `// Package main <text>` comment followed by the
//! `package main` clause.  The comment becomes the page description and is
//! cut out of the highlighted source.

const MARKERS: [&[u8]; 2] = [b"// Package main ", b"// package main "];
const CLAUSE: &[u8] = b"package main";

/// Result of [`extract_description`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub description: String,
    pub content: Vec<u8>,
}

/// Pull the package description out of `body`.
///
/// The span from the first marker up to the last `package main` clause after
/// it is removed from the content.  No marker, or no clause after it, leaves
/// the content untouched and yields an empty description.
pub fn extract_description(body: &[u8]) -> Extracted {
    for marker in MARKERS {
        let Some(start) = find(body, marker) else {
            continue;
        };
        let text_start = start + marker.len();
        let Some(end) = rfind(&body[text_start..], CLAUSE).map(|i| text_start + i) else {
            continue;
        };

        let mut content = Vec::with_capacity(body.len() - (end - start));
        content.extend_from_slice(&body[..start]);
        content.extend_from_slice(&body[end..]);

        let text = String::from_utf8_lossy(&body[text_start..end]);
        return Extracted {
            description: capitalize_first(&join_comment_lines(&text)),
            content,
        };
    }

    Extracted {
        description: String::new(),
        content: body.to_vec(),
    }
}

/// Join a multi-line `//` comment into a single sentence.
fn join_comment_lines(text: &str) -> String {
    text.lines()
        .map(|line| line.trim().trim_start_matches("//").trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Upper-case the first character of `s`.
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_description() {
        let body = b"// Package main does the thing.\npackage main\n\nfunc main() {}\n";
        let out = extract_description(body);
        assert_eq!(out.description, "Does the thing.");
        assert_eq!(out.content, b"package main\n\nfunc main() {}\n");
    }

    #[test]
    fn lowercase_marker_is_accepted() {
        let body = b"// package main shows how to serve static files.\npackage main\n";
        let out = extract_description(body);
        assert_eq!(out.description, "Shows how to serve static files.");
        assert_eq!(out.content, b"package main\n");
    }

    #[test]
    fn multi_line_comment_is_joined() {
        let body = b"// Package main registers two subdomains\n// and a wildcard one.\npackage main\n";
        let out = extract_description(body);
        assert_eq!(
            out.description,
            "Registers two subdomains and a wildcard one."
        );
        assert_eq!(out.content, b"package main\n");
    }

    #[test]
    fn missing_marker_leaves_content_unchanged() {
        let body = b"package main\n\nimport \"fmt\"\n";
        let out = extract_description(body);
        assert_eq!(out.description, "");
        assert_eq!(out.content, body.to_vec());
    }

    #[test]
    fn marker_without_clause_is_ignored() {
        let body = b"// package main \nfunc main() {}\n";
        let out = extract_description(body);
        assert_eq!(out.description, "");
        assert_eq!(out.content, body.to_vec());
    }

    #[test]
    fn capitalize_handles_empty_and_unicode() {
        assert_eq!(capitalize_first(""), "");
        assert_eq!(capitalize_first("élan"), "Élan");
        assert_eq!(capitalize_first("subdomains 1"), "Subdomains 1");
    }
}
