use crate::workspace::{ContentKind, StoreError, WorkspacePath, WorkspaceStore};
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// Stylesheet injected into every HTML preview when present.
pub const DEFAULT_STYLESHEET: &str = "style.css";

/// React previews compile JSX in the browser and carry their own styles.
const REACT_CDN_MARKER: &str = "https://unpkg.com/@babel/standalone";

static STYLESHEET_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<link\b[^>]*?\bhref\s*=\s*["']([^"']+)["'][^>]*>"#)
        .expect("invalid stylesheet link regex")
});

static HEAD_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</head\s*>").expect("invalid head regex"));

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("preview is available for HTML files only: {0}")]
    NotHtml(String),

    #[error("failed to write preview file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewDocument {
    pub source: WorkspacePath,
    pub html: String,
    pub injected: Vec<WorkspacePath>,
    pub react_cdn: bool,
}

impl PreviewDocument {
    pub fn data_uri(&self) -> String {
        format!(
            "data:text/html;charset=utf-8,{}",
            urlencoding::encode(&self.html)
        )
    }

    /// Writes the combined markup to `dir/<file name>` so a browser can open it.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, PreviewError> {
        fs::create_dir_all(dir).map_err(|source| PreviewError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let target = dir.join(self.source.file_name());
        fs::write(&target, &self.html).map_err(|source| PreviewError::Io {
            path: target.clone(),
            source,
        })?;
        Ok(target)
    }

    pub fn summary(&self) -> String {
        if self.react_cdn {
            return "React CDN preview (in-browser transpiling, no stylesheet injection)".to_string();
        }
        if self.injected.is_empty() {
            return "Basic HTML preview".to_string();
        }
        let names: Vec<&str> = self.injected.iter().map(WorkspacePath::as_str).collect();
        format!("Basic HTML preview, injected {}", names.join(", "))
    }
}

/// Builds the markup for previewing `path`: the HTML file with the content of
/// its stylesheets inlined in a single `<style>` block.
///
/// Stylesheets are the `<link href="*.css">` targets that exist in the store,
/// followed by `style.css` next to the page and at the workspace root.
/// Missing or empty stylesheets are skipped.
pub fn render_preview(store: &WorkspaceStore, path: &str) -> Result<PreviewDocument, PreviewError> {
    let source = WorkspacePath::parse(path)?;
    if !source.kind().is_previewable() {
        return Err(PreviewError::NotHtml(source.to_string()));
    }
    let html = store.read(source.as_str())?;

    if html.contains(REACT_CDN_MARKER) {
        return Ok(PreviewDocument {
            source,
            html: html.to_string(),
            injected: Vec::new(),
            react_cdn: true,
        });
    }

    let mut styles = Vec::new();
    let mut injected = Vec::new();
    for stylesheet in stylesheet_candidates(&source, html) {
        if injected.contains(&stylesheet) {
            continue;
        }
        let Ok(css) = store.read(stylesheet.as_str()) else {
            continue;
        };
        if css.trim().is_empty() {
            continue;
        }
        styles.push(format!("/* {stylesheet} */\n{}", css.trim_end()));
        injected.push(stylesheet);
    }

    let rendered = if styles.is_empty() {
        html.to_string()
    } else {
        inject_style(html, &styles.join("\n"))
    };

    tracing::debug!(
        source = %source,
        injected = injected.len(),
        "preview rendered"
    );

    Ok(PreviewDocument {
        source,
        html: rendered,
        injected,
        react_cdn: false,
    })
}

fn stylesheet_candidates(source: &WorkspacePath, html: &str) -> Vec<WorkspacePath> {
    let base = source.parent();
    let mut candidates: Vec<WorkspacePath> = STYLESHEET_LINK
        .captures_iter(html)
        .filter_map(|captures| captures.get(1))
        .map(|href| href.as_str())
        .filter(|href| ContentKind::from_path(strip_query(href)) == ContentKind::Css)
        .filter_map(|href| resolve_href(base, strip_query(href)))
        .collect();

    let sibling = if base.is_empty() {
        DEFAULT_STYLESHEET.to_string()
    } else {
        format!("{base}/{DEFAULT_STYLESHEET}")
    };
    for fallback in [sibling.as_str(), DEFAULT_STYLESHEET] {
        if let Ok(path) = WorkspacePath::parse(fallback) {
            candidates.push(path);
        }
    }
    candidates
}

fn strip_query(href: &str) -> &str {
    href.split(['?', '#']).next().unwrap_or(href)
}

/// Resolves a link target against the page's directory. Remote URLs and
/// targets outside the workspace yield `None`.
fn resolve_href(base: &str, href: &str) -> Option<WorkspacePath> {
    if href.contains("://") || href.starts_with("//") || href.starts_with("data:") {
        return None;
    }

    let (mut segments, rest): (Vec<&str>, &str) = match href.strip_prefix('/') {
        Some(rest) => (Vec::new(), rest),
        None => (base.split('/').filter(|s| !s.is_empty()).collect(), href),
    };
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            segment => segments.push(segment),
        }
    }
    WorkspacePath::parse(&segments.join("/")).ok()
}

fn inject_style(html: &str, css: &str) -> String {
    let block = format!("\n<style>\n{css}\n</style>\n");
    match HEAD_CLOSE.find(html) {
        Some(head_close) => {
            let at = head_close.start();
            format!("{}{block}{}", &html[..at], &html[at..])
        }
        None => format!("{}{html}", block.trim_start()),
    }
}

#[cfg(test)]
mod tests {
    use super::{render_preview, resolve_href, PreviewError};
    use crate::workspace::{StoreError, WorkspaceStore};

    const PAGE: &str = "<html><head><title>t</title></head><body><h1>Hi</h1></body></html>";

    #[test]
    fn default_stylesheet_is_injected_before_head_close() {
        let mut store = WorkspaceStore::in_memory();
        store.write("index.html", PAGE).unwrap();
        store.write("style.css", "h1 { color: teal; }").unwrap();

        let preview = render_preview(&store, "index.html").expect("preview should render");
        let style_at = preview.html.find("h1 { color: teal; }").expect("css embedded");
        let head_close = preview.html.find("</head>").expect("head kept");
        assert!(style_at < head_close);
        assert_eq!(preview.injected.len(), 1);
        assert!(preview.summary().contains("style.css"));
    }

    #[test]
    fn linked_stylesheets_are_resolved_relative_to_the_page() {
        let mut store = WorkspaceStore::in_memory();
        store
            .write(
                "pages/about.html",
                r#"<HTML><HEAD><link rel="stylesheet" href="../css/site.css?v=2"></HEAD><body></body></HTML>"#,
            )
            .unwrap();
        store.write("css/site.css", "body { margin: 0; }").unwrap();

        let preview = render_preview(&store, "pages/about.html").expect("preview should render");
        assert!(preview.html.contains("body { margin: 0; }"));
        assert!(preview.html.find("<style>").unwrap() < preview.html.find("</HEAD>").unwrap());
        assert_eq!(preview.injected[0].as_str(), "css/site.css");
    }

    #[test]
    fn missing_and_empty_stylesheets_are_tolerated() {
        let mut store = WorkspaceStore::in_memory();
        store
            .write(
                "index.html",
                r#"<html><head><link rel="stylesheet" href="nowhere.css"></head></html>"#,
            )
            .unwrap();
        store.write("style.css", "   ").unwrap();

        let preview = render_preview(&store, "index.html").expect("preview should render");
        assert!(preview.injected.is_empty());
        assert!(!preview.html.contains("<style>"));
    }

    #[test]
    fn stylesheet_is_injected_once_even_when_linked_and_colocated() {
        let mut store = WorkspaceStore::in_memory();
        store
            .write(
                "index.html",
                r#"<html><head><link href="style.css" rel="stylesheet"></head></html>"#,
            )
            .unwrap();
        store.write("style.css", "p { color: red; }").unwrap();

        let preview = render_preview(&store, "index.html").expect("preview should render");
        assert_eq!(preview.html.matches("p { color: red; }").count(), 1);
    }

    #[test]
    fn document_without_head_gets_style_prepended() {
        let mut store = WorkspaceStore::in_memory();
        store.write("frag.html", "<h1>Hi</h1>").unwrap();
        store.write("style.css", "h1 { font-weight: 300; }").unwrap();

        let preview = render_preview(&store, "frag.html").expect("preview should render");
        assert!(preview.html.starts_with("<style>"));
        assert!(preview.html.ends_with("<h1>Hi</h1>"));
    }

    #[test]
    fn react_cdn_pages_pass_through_untouched() {
        let mut store = WorkspaceStore::in_memory();
        let page = r#"<html><head><script src="https://unpkg.com/@babel/standalone/babel.min.js"></script></head></html>"#;
        store.write("react_preview.html", page).unwrap();
        store.write("style.css", "body { color: red; }").unwrap();

        let preview = render_preview(&store, "react_preview.html").expect("preview should render");
        assert!(preview.react_cdn);
        assert_eq!(preview.html, page);
    }

    #[test]
    fn deleted_and_non_html_files_are_errors() {
        let mut store = WorkspaceStore::in_memory();
        store.write("style.css", "x").unwrap();

        assert!(matches!(
            render_preview(&store, "index.html"),
            Err(PreviewError::Store(StoreError::NotFound(_)))
        ));
        assert!(matches!(
            render_preview(&store, "style.css"),
            Err(PreviewError::NotHtml(_))
        ));
    }

    #[test]
    fn resolve_href_rejects_remote_and_escaping_targets() {
        assert_eq!(resolve_href("", "./a.css").unwrap().as_str(), "a.css");
        assert_eq!(resolve_href("x/y", "/root.css").unwrap().as_str(), "root.css");
        assert!(resolve_href("", "https://cdn.example/site.css").is_none());
        assert!(resolve_href("", "//cdn.example/site.css").is_none());
        assert!(resolve_href("", "../up.css").is_none());
    }

    #[test]
    fn data_uri_and_written_file_carry_the_rendered_markup() {
        let mut store = WorkspaceStore::in_memory();
        store.write("index.html", "<p>a b</p>").unwrap();
        let preview = render_preview(&store, "index.html").expect("preview should render");

        assert_eq!(
            preview.data_uri(),
            "data:text/html;charset=utf-8,%3Cp%3Ea%20b%3C%2Fp%3E"
        );

        let dir = tempfile::tempdir().expect("tempdir should be created");
        let written = preview.write_to(dir.path()).expect("preview should be written");
        assert_eq!(std::fs::read_to_string(written).unwrap(), "<p>a b</p>");
    }
}
