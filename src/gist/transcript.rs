//! The synthetic "how to run" shell transcript shown under each example.

use handlebars::html_escape;

use super::path::sibling_url;

/// One line of the `tree` output.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TreeEntry {
    File { name: String, href: String },
    Dir { name: String, child: String },
}

impl TreeEntry {
    fn render(&self) -> String {
        match self {
            TreeEntry::File { name, href } => format!(
                "<a target='_blank' href='{}'>{}</a>",
                html_escape(href),
                html_escape(name)
            ),
            TreeEntry::Dir { name, child } => format!(
                "{}<br/>&nbsp;&nbsp;  └── {}",
                html_escape(name),
                html_escape(child)
            ),
        }
    }
}

/// Turn the directory listing of `source`'s parent into tree entries.
///
/// `README.md` is skipped.  Names containing `/` are collapsed directory
/// chains and render as a directory with one nested child.  Files come
/// before directories; page order is otherwise kept.
fn tree_entries(source: &str, names: &[String]) -> Vec<TreeEntry> {
    let mut entries: Vec<TreeEntry> = names
        .iter()
        .filter(|name| !name.is_empty() && name.as_str() != "README.md")
        .map(|name| match name.split_once('/') {
            Some((dir, child)) => TreeEntry::Dir {
                name: dir.to_owned(),
                child: child.to_owned(),
            },
            None => TreeEntry::File {
                name: name.clone(),
                href: sibling_url(source, name),
            },
        })
        .collect();
    entries.sort_by_key(|e| matches!(e, TreeEntry::Dir { .. }));
    entries
}

/// Build the HTML transcript: `cd` into the workspace, `tree`, run the file.
pub fn run_transcript(
    source: &str,
    workspace: &str,
    file: &str,
    run_command: &str,
    names: &[String],
) -> String {
    let mut out = format!("$ cd {}<br/>$ tree<br/>", html_escape(workspace));
    for entry in tree_entries(source, names) {
        out.push_str("> ");
        out.push_str(&entry.render());
        out.push_str("<br/>");
    }
    out.push_str(&format!("$ {run_command} {}", html_escape(file)));
    out
}
