use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

pub mod store;

pub use store::{StoreError, WorkspaceStore};

/// Relative, forward-slash path identifying a file inside the workspace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkspacePath(String);

impl WorkspacePath {
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(StoreError::InvalidPath {
                path: raw.to_string(),
                reason: "path is empty",
            });
        }
        if trimmed.starts_with('/') || trimmed.starts_with('\\') || Path::new(trimmed).is_absolute()
        {
            return Err(StoreError::InvalidPath {
                path: raw.to_string(),
                reason: "path must be relative",
            });
        }

        let normalized = trimmed.replace('\\', "/");
        let mut segments = Vec::new();
        for component in Path::new(&normalized).components() {
            match component {
                Component::Normal(segment) => match segment.to_str() {
                    Some(segment) if segment.starts_with('.') => {
                        return Err(StoreError::InvalidPath {
                            path: raw.to_string(),
                            reason: "hidden files are not part of the workspace",
                        })
                    }
                    Some(segment) => segments.push(segment),
                    None => {
                        return Err(StoreError::InvalidPath {
                            path: raw.to_string(),
                            reason: "path is not valid UTF-8",
                        })
                    }
                },
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(StoreError::InvalidPath {
                        path: raw.to_string(),
                        reason: "path escapes the workspace",
                    })
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(StoreError::InvalidPath {
                        path: raw.to_string(),
                        reason: "path must be relative",
                    })
                }
            }
        }

        if segments.is_empty() {
            return Err(StoreError::InvalidPath {
                path: raw.to_string(),
                reason: "path is empty",
            });
        }

        Ok(Self(segments.join("/")))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(self.0.as_str())
    }

    /// Directory part of the path, empty for files at the workspace root.
    pub fn parent(&self) -> &str {
        match self.0.rfind('/') {
            Some(index) => &self.0[..index],
            None => "",
        }
    }

    pub fn kind(&self) -> ContentKind {
        ContentKind::from_path(self.as_str())
    }

    pub fn to_fs_path(&self, root: &Path) -> PathBuf {
        self.0
            .split('/')
            .fold(root.to_path_buf(), |path, segment| path.join(segment))
    }
}

impl fmt::Display for WorkspacePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for WorkspacePath {
    type Error = StoreError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<WorkspacePath> for String {
    fn from(path: WorkspacePath) -> Self {
        path.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Html,
    Css,
    JavaScript,
    Json,
    Markdown,
    Python,
    Text,
    Other,
}

impl ContentKind {
    pub fn from_path(path: &str) -> Self {
        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("html") | Some("htm") => Self::Html,
            Some("css") => Self::Css,
            Some("js") | Some("jsx") | Some("mjs") => Self::JavaScript,
            Some("json") => Self::Json,
            Some("md") => Self::Markdown,
            Some("py") => Self::Python,
            Some("txt") => Self::Text,
            _ => Self::Other,
        }
    }

    /// Syntax label shown next to the editor.
    pub fn language(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Css => "css",
            Self::JavaScript => "javascript",
            Self::Json => "json",
            Self::Markdown => "markdown",
            Self::Python => "python",
            Self::Text | Self::Other => "text",
        }
    }

    pub fn is_previewable(&self) -> bool {
        matches!(self, Self::Html)
    }
}

#[cfg(test)]
mod tests {
    use super::{ContentKind, WorkspacePath};
    use std::path::Path;

    #[test]
    fn parse_normalizes_separators_and_current_dir() {
        let path = WorkspacePath::parse("./assets\\css/site.css").expect("path should parse");
        assert_eq!(path.as_str(), "assets/css/site.css");
        assert_eq!(path.file_name(), "site.css");
        assert_eq!(path.parent(), "assets/css");
    }

    #[test]
    fn parse_rejects_escaping_and_absolute_paths() {
        for raw in [
            "",
            "   ",
            "../secret.txt",
            "a/../../b",
            "/etc/passwd",
            "\\windows",
            ".",
            ".nojekyll",
            "assets/.cache/x.css",
        ] {
            assert!(
                WorkspacePath::parse(raw).is_err(),
                "expected {raw:?} to be rejected"
            );
        }
    }

    #[test]
    fn kind_is_inferred_from_extension() {
        assert_eq!(ContentKind::from_path("index.HTML"), ContentKind::Html);
        assert_eq!(ContentKind::from_path("page.htm"), ContentKind::Html);
        assert_eq!(ContentKind::from_path("style.css"), ContentKind::Css);
        assert_eq!(ContentKind::from_path("app.jsx"), ContentKind::JavaScript);
        assert_eq!(ContentKind::from_path("Makefile"), ContentKind::Other);
        assert!(ContentKind::Html.is_previewable());
        assert!(!ContentKind::Css.is_previewable());
    }

    #[test]
    fn to_fs_path_joins_every_segment() {
        let path = WorkspacePath::parse("a/b/c.txt").expect("path should parse");
        assert_eq!(
            path.to_fs_path(Path::new("/root")),
            Path::new("/root").join("a").join("b").join("c.txt")
        );
    }

    #[test]
    fn deserializes_through_validation() {
        let path: WorkspacePath = serde_json::from_str("\"pages/about.html\"").expect("valid path");
        assert_eq!(path.as_str(), "pages/about.html");
        assert!(serde_json::from_str::<WorkspacePath>("\"../x\"").is_err());
    }
}
