use crate::workspace::WorkspacePath;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Created,
    Replaced,
}

/// Path → content map for the session, optionally mirrored to a directory.
///
/// Every mutation reaches the disk before the in-memory map is touched, so a
/// failed write leaves both views unchanged.
#[derive(Debug, Default)]
pub struct WorkspaceStore {
    root: Option<PathBuf>,
    files: BTreeMap<WorkspacePath, String>,
}

impl WorkspaceStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens (creating if needed) a disk-backed workspace and loads its text
    /// files. Unreadable entries are skipped and reported as warnings.
    pub fn open(root: impl Into<PathBuf>) -> Result<(Self, Vec<String>), StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|err| StoreError::io(&root, err))?;

        let mut files = BTreeMap::new();
        let mut warnings = Vec::new();
        let mut stack = vec![root.clone()];
        while let Some(dir) = stack.pop() {
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(err) => {
                    warnings.push(format!("failed to read {}: {err}", dir.display()));
                    continue;
                }
            };

            for entry in entries.flatten() {
                let path = entry.path();
                let hidden = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .map_or(true, |name| name.starts_with('.'));
                if hidden {
                    continue;
                }
                let Ok(file_type) = entry.file_type() else {
                    warnings.push(format!("skipped {}: unreadable entry", path.display()));
                    continue;
                };
                if file_type.is_symlink() {
                    warnings.push(format!("skipped symlink {}", path.display()));
                    continue;
                }
                if file_type.is_dir() {
                    stack.push(path);
                    continue;
                }

                let relative = path
                    .strip_prefix(&root)
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .to_string();
                let key = match WorkspacePath::parse(&relative) {
                    Ok(key) => key,
                    Err(err) => {
                        warnings.push(err.to_string());
                        continue;
                    }
                };
                match fs::read_to_string(&path) {
                    Ok(content) => {
                        files.insert(key, content);
                    }
                    Err(err) => warnings.push(format!("skipped {}: {err}", path.display())),
                }
            }
        }

        tracing::info!(
            root = %root.display(),
            files = files.len(),
            warnings = warnings.len(),
            "workspace loaded"
        );

        Ok((
            Self {
                root: Some(root),
                files,
            },
            warnings,
        ))
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        WorkspacePath::parse(path)
            .map(|key| self.files.contains_key(&key))
            .unwrap_or(false)
    }

    /// Sorted snapshot of the current paths.
    pub fn list(&self) -> Vec<WorkspacePath> {
        self.files.keys().cloned().collect()
    }

    pub fn read(&self, path: &str) -> Result<&str, StoreError> {
        let key = WorkspacePath::parse(path)?;
        self.files
            .get(&key)
            .map(String::as_str)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    pub fn write(&mut self, path: &str, content: &str) -> Result<WriteKind, StoreError> {
        let key = WorkspacePath::parse(path)?;

        if let Some(root) = &self.root {
            let target = key.to_fs_path(root);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;
            }
            fs::write(&target, content).map_err(|err| StoreError::io(&target, err))?;
        }

        let kind = match self.files.insert(key, content.to_string()) {
            Some(_) => WriteKind::Replaced,
            None => WriteKind::Created,
        };
        Ok(kind)
    }

    /// Removes `path`; returns whether anything was there. Absent paths are
    /// not an error. Files on disk the store never loaded are left alone.
    pub fn delete(&mut self, path: &str) -> Result<bool, StoreError> {
        let key = WorkspacePath::parse(path)?;
        if !self.files.contains_key(&key) {
            return Ok(false);
        }

        if let Some(root) = &self.root {
            let target = key.to_fs_path(root);
            match fs::remove_file(&target) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(StoreError::io(&target, err)),
            }
        }

        self.files.remove(&key);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::{StoreError, WorkspaceStore, WriteKind};
    use std::fs;

    #[test]
    fn write_is_an_upsert() {
        let mut store = WorkspaceStore::in_memory();
        assert_eq!(store.write("index.html", "a").unwrap(), WriteKind::Created);
        assert_eq!(store.write("index.html", "b").unwrap(), WriteKind::Replaced);
        assert_eq!(store.read("index.html").unwrap(), "b");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn delete_is_idempotent() {
        let mut store = WorkspaceStore::in_memory();
        store.write("a.txt", "x").unwrap();
        assert!(store.delete("a.txt").unwrap());
        assert!(!store.delete("a.txt").unwrap());
        assert!(!store.delete("never.txt").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn read_missing_path_is_not_found() {
        let store = WorkspaceStore::in_memory();
        let error = store.read("missing.html").expect_err("read should fail");
        assert!(matches!(error, StoreError::NotFound(path) if path == "missing.html"));
    }

    #[test]
    fn list_is_a_sorted_snapshot() {
        let mut store = WorkspaceStore::in_memory();
        store.write("style.css", "").unwrap();
        store.write("index.html", "").unwrap();
        let snapshot = store.list();
        store.delete("index.html").unwrap();

        let names: Vec<&str> = snapshot.iter().map(|path| path.as_str()).collect();
        assert_eq!(names, vec!["index.html", "style.css"]);
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn invalid_paths_never_touch_the_map() {
        let mut store = WorkspaceStore::in_memory();
        let error = store.write("../escape.html", "x").expect_err("write should fail");
        assert!(matches!(error, StoreError::InvalidPath { .. }));
        assert!(store.delete("/abs").is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn disk_backed_store_writes_through_and_reloads() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let root = dir.path().join("workspace");

        let (mut store, warnings) = WorkspaceStore::open(&root).expect("store should open");
        assert!(warnings.is_empty());
        store.write("pages/about.html", "<h1>About</h1>").unwrap();
        store.write("style.css", "h1 { color: red; }").unwrap();
        assert_eq!(
            fs::read_to_string(root.join("pages").join("about.html")).unwrap(),
            "<h1>About</h1>"
        );

        store.delete("style.css").unwrap();
        assert!(!root.join("style.css").exists());

        let (reloaded, _) = WorkspaceStore::open(&root).expect("store should reopen");
        let paths: Vec<String> = reloaded.list().into_iter().map(String::from).collect();
        assert_eq!(paths, vec!["pages/about.html".to_string()]);
        assert_eq!(reloaded.read("pages/about.html").unwrap(), "<h1>About</h1>");
    }

    #[test]
    fn open_skips_hidden_and_non_utf8_files() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git").join("HEAD"), "ref").unwrap();
        fs::write(dir.path().join(".env"), "KEY=1").unwrap();
        fs::write(dir.path().join("logo.bin"), [0xff, 0xfe, 0x00]).unwrap();
        fs::write(dir.path().join("index.html"), "ok").unwrap();

        let (store, warnings) = WorkspaceStore::open(dir.path()).expect("store should open");
        assert_eq!(store.len(), 1);
        assert!(store.contains("index.html"));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("logo.bin"));
    }

    #[test]
    fn deleting_a_file_missing_on_disk_still_succeeds() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let (mut store, _) = WorkspaceStore::open(dir.path()).expect("store should open");
        store.write("gone.txt", "x").unwrap();
        fs::remove_file(dir.path().join("gone.txt")).unwrap();

        assert!(store.delete("gone.txt").unwrap());
        assert!(!store.contains("gone.txt"));
    }

    #[test]
    fn delete_leaves_files_the_store_skipped() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        fs::write(dir.path().join("logo.bin"), [0xff, 0xfe, 0x00]).unwrap();

        let (mut store, _) = WorkspaceStore::open(dir.path()).expect("store should open");
        assert!(!store.contains("logo.bin"));
        assert!(!store.delete("logo.bin").unwrap());
        assert!(dir.path().join("logo.bin").exists());
    }

    #[test]
    fn hidden_paths_are_rejected_so_reloads_match() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let (mut store, _) = WorkspaceStore::open(dir.path()).expect("store should open");

        let error = store.write(".nojekyll", "").expect_err("hidden write should fail");
        assert!(matches!(error, StoreError::InvalidPath { .. }));
        assert!(!dir.path().join(".nojekyll").exists());
        store.write("index.html", "ok").unwrap();

        let (reloaded, _) = WorkspaceStore::open(dir.path()).expect("store should reopen");
        assert_eq!(reloaded.list(), store.list());
    }

    #[cfg(unix)]
    #[test]
    fn open_does_not_follow_symlinks() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let root = dir.path().join("workspace");
        fs::create_dir_all(&root).unwrap();
        fs::write(dir.path().join("outside.txt"), "secret").unwrap();
        fs::write(root.join("index.html"), "ok").unwrap();
        std::os::unix::fs::symlink(dir.path(), root.join("up")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("outside.txt"), root.join("link.txt")).unwrap();

        let (store, warnings) = WorkspaceStore::open(&root).expect("store should open");
        let paths: Vec<String> = store.list().into_iter().map(String::from).collect();
        assert_eq!(paths, vec!["index.html".to_string()]);
        assert_eq!(warnings.len(), 2);
    }
}
