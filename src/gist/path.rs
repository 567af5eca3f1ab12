//! URL and path derivations for example pages.
//!
//! Every page is identified by its canonical `/blob/<branch>/` URL; the raw
//! content URL, the parent directory listing, sibling links and the chapter
//! label are all derived from it textually.

use super::description::capitalize_first;

/// Normalize the example path taken from the request.
///
/// A path whose last segment has no extension names a directory, so the
/// default entry file is appended.  Leading and doubled separators are removed.
pub fn normalize_example_path(rel_path: &str, default_entry_file: &str) -> String {
    let trimmed = rel_path.trim_start_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or_default();

    let joined = if last.contains('.') {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/{default_entry_file}")
    };

    collapse_separators(joined.trim_start_matches('/'))
}

fn collapse_separators(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for c in path.chars() {
        if c == '/' && prev_slash {
            continue;
        }
        prev_slash = c == '/';
        out.push(c);
    }
    out
}

/// `root + "/blob/" + branch + "/" + rel_path`.
pub fn canonical_url(root_repo: &str, branch: &str, rel_path: &str) -> String {
    format!("{}/blob/{branch}/{rel_path}", root_repo.trim_end_matches('/'))
}

/// Raw-content URL: the web host is swapped for the raw host and `/blob` dropped.
pub fn raw_url(source: &str, web_host: &str, raw_host: &str) -> String {
    source.replacen(web_host, raw_host, 1).replacen("/blob", "", 1)
}

/// Last path segment of `source`.
pub fn file_name(source: &str) -> &str {
    source.rsplit('/').next().unwrap_or(source)
}

/// URL of the directory containing `source`, with a trailing slash.
pub fn parent_url(source: &str) -> &str {
    match source.rfind('/') {
        Some(idx) => &source[..=idx],
        None => "",
    }
}

/// Canonical URL of a file living next to `source`.
pub fn sibling_url(source: &str, name: &str) -> String {
    format!("{}{name}", parent_url(source))
}

/// Human readable chapter label: the parent directory name with `_` and `-`
/// turned into spaces and the first letter upper-cased.
pub fn chapter_label(source: &str) -> String {
    let parent = parent_url(source).trim_end_matches('/');
    let dir = parent.rsplit('/').next().unwrap_or_default();
    capitalize_first(&dir.replace(['_', '-'], " "))
}

/// Directory shown in the `$ cd` line of the run transcript.
///
/// Scheme, `blob/`, `tree/`, the branch segment and the `v6/` version prefix
/// are each removed once; the file name is stripped.
pub fn workspace_path(source: &str, branch: &str, prefix: &str) -> String {
    let file = file_name(source);
    let mut path = source.strip_suffix(file).unwrap_or(source).to_owned();
    let branch_segment = format!("{branch}/");
    for segment in ["https://", "http://", "blob/", "tree/", branch_segment.as_str(), "v6/"] {
        path = path.replacen(segment, "", 1);
    }
    format!("{prefix}{path}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "https://github.com/iris-contrib/examples";

    #[test]
    fn directory_path_gets_entry_file() {
        assert_eq!(
            normalize_example_path("subdomains_1", "main.go"),
            "subdomains_1/main.go"
        );
        assert_eq!(
            normalize_example_path("/subdomains_1/", "main.go"),
            "subdomains_1/main.go"
        );
    }

    #[test]
    fn file_path_is_unchanged() {
        assert_eq!(
            normalize_example_path("subdomains_1/main.go", "main.go"),
            "subdomains_1/main.go"
        );
        assert_eq!(
            normalize_example_path("/routing//basic/main_test.go", "main.go"),
            "routing/basic/main_test.go"
        );
    }

    #[test]
    fn dotted_directory_still_gets_entry_file() {
        assert_eq!(
            normalize_example_path("v1.2/hello", "main.go"),
            "v1.2/hello/main.go"
        );
    }

    #[test]
    fn derived_urls() {
        let source = canonical_url(ROOT, "master", "subdomains_1/main.go");
        assert_eq!(
            source,
            "https://github.com/iris-contrib/examples/blob/master/subdomains_1/main.go"
        );
        assert_eq!(
            raw_url(&source, "https://github.com", "https://raw.githubusercontent.com"),
            "https://raw.githubusercontent.com/iris-contrib/examples/master/subdomains_1/main.go"
        );
        assert_eq!(file_name(&source), "main.go");
        assert_eq!(
            parent_url(&source),
            "https://github.com/iris-contrib/examples/blob/master/subdomains_1/"
        );
        assert_eq!(
            sibling_url(&source, "hosts"),
            "https://github.com/iris-contrib/examples/blob/master/subdomains_1/hosts"
        );
    }

    #[test]
    fn chapter_label_from_parent_dir() {
        let source = canonical_url(ROOT, "master", "subdomains_1/main.go");
        assert_eq!(chapter_label(&source), "Subdomains 1");
        let source = canonical_url(ROOT, "master", "http-listening/listen_tls/main.go");
        assert_eq!(chapter_label(&source), "Listen tls");
    }

    #[test]
    fn workspace_path_strips_url_noise() {
        let source = canonical_url(ROOT, "master", "subdomains_1/main.go");
        assert_eq!(
            workspace_path(&source, "master", "$GOPATH/src/"),
            "$GOPATH/src/github.com/iris-contrib/examples/subdomains_1/"
        );
        let source = canonical_url(
            "https://github.com/kataras/iris",
            "master",
            "_examples/v6/hello/main.go",
        );
        assert_eq!(
            workspace_path(&source, "master", "$GOPATH/src/"),
            "$GOPATH/src/github.com/kataras/iris/_examples/hello/"
        );
    }
}
