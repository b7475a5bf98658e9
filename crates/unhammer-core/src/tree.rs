//! Virtual file tree.
//!
//! The engine never touches the real file system while analyzing or mutating:
//! it works against an in-memory [`FileTree`] keyed by normalized relative
//! paths. Mutation goes through per-path [`UpdateRecorder`]s obtained from
//! [`FileTree::edit`]; [`FileTree::commit_edits`] applies every recorder once
//! and retains the displacement ledgers so diagnostics can be remapped to
//! post-edit positions.
//!
//! There is no partial-apply mode: either `commit_edits` runs, or the caller
//! drops the whole tree and nothing was changed.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::TreeError;
use crate::recorder::UpdateRecorder;

/// File extensions loaded from disk.
const SOURCE_EXTENSIONS: &[&str] = &["ts", "html"];

/// In-memory file tree with deferred, per-file edit recorders.
#[derive(Debug, Default)]
pub struct FileTree {
    files: BTreeMap<String, String>,
    dirty: BTreeSet<String>,
    recorders: BTreeMap<String, UpdateRecorder>,
    committed: BTreeMap<String, UpdateRecorder>,
}

impl FileTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        FileTree::default()
    }

    /// Load `.ts`/`.html` sources and `package.json` files under `root`.
    ///
    /// Non-UTF-8 files are skipped with a warning; they cannot be migrated
    /// safely and are better left untouched.
    pub fn load(root: &Path) -> Result<Self, TreeError> {
        let mut tree = FileTree::new();
        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let wanted = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| SOURCE_EXTENSIONS.contains(&e))
                .unwrap_or(false)
                || path.file_name().and_then(|n| n.to_str()) == Some("package.json");
            if !wanted {
                continue;
            }
            let relative = path
                .strip_prefix(root)
                .unwrap_or(path)
                .to_string_lossy()
                .into_owned();
            match fs::read_to_string(path) {
                Ok(content) => {
                    tree.files.insert(normalize_path(&relative), content);
                }
                Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
                    warn!(path = %relative, "skipping non-UTF-8 file");
                }
                Err(err) => {
                    return Err(TreeError::Io {
                        path: relative,
                        source: err,
                    });
                }
            }
        }
        debug!(files = tree.files.len(), "loaded file tree");
        Ok(tree)
    }

    /// Insert a file directly (used by tests and fixtures).
    pub fn insert(&mut self, path: &str, content: impl Into<String>) {
        self.files.insert(normalize_path(path), content.into());
    }

    /// Read a file's current content.
    pub fn read(&self, path: &str) -> Option<&str> {
        self.files.get(&normalize_path(path)).map(String::as_str)
    }

    /// Check whether a file exists.
    pub fn exists(&self, path: &str) -> bool {
        self.files.contains_key(&normalize_path(path))
    }

    /// Create a new file. Marks it dirty so `write_back` persists it.
    pub fn create(&mut self, path: &str, content: impl Into<String>) {
        let path = normalize_path(path);
        self.files.insert(path.clone(), content.into());
        self.dirty.insert(path);
    }

    /// Replace a file's content wholesale.
    pub fn overwrite(&mut self, path: &str, content: impl Into<String>) {
        let path = normalize_path(path);
        self.files.insert(path.clone(), content.into());
        self.dirty.insert(path);
    }

    /// Get (or create) the edit recorder for a path.
    pub fn edit(&mut self, path: &str) -> &mut UpdateRecorder {
        self.recorders.entry(normalize_path(path)).or_default()
    }

    /// All paths currently in the tree.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Paths with the given extension, in sorted order.
    pub fn paths_with_extension(&self, ext: &str) -> Vec<String> {
        let suffix = format!(".{}", ext);
        self.files
            .keys()
            .filter(|p| p.ends_with(&suffix))
            .cloned()
            .collect()
    }

    /// Paths that have been created or modified since load.
    pub fn dirty_paths(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    /// Apply every pending recorder exactly once.
    ///
    /// Returns the list of patched paths. The recorders are retained (moved
    /// to a committed set) so [`FileTree::displacement`] keeps working for
    /// diagnostics remapping.
    pub fn commit_edits(&mut self) -> Result<Vec<String>, TreeError> {
        let mut changed = Vec::new();
        let pending = std::mem::take(&mut self.recorders);
        for (path, recorder) in pending {
            if recorder.is_empty() {
                continue;
            }
            let source = self
                .files
                .get(&path)
                .cloned()
                .ok_or_else(|| TreeError::FileNotFound { path: path.clone() })?;
            let patched = recorder.apply(&source).map_err(|source| TreeError::Recorder {
                path: path.clone(),
                source,
            })?;
            debug!(path = %path, ops = recorder.len(), "committed edits");
            self.files.insert(path.clone(), patched);
            self.dirty.insert(path.clone());
            self.committed.insert(path.clone(), recorder);
            changed.push(path);
        }
        Ok(changed)
    }

    /// Map a pre-edit offset in `path` to its post-edit position.
    ///
    /// Falls back to the identity mapping when no edits were recorded.
    pub fn displacement(&self, path: &str, offset: usize) -> usize {
        let path = normalize_path(path);
        if let Some(rec) = self.committed.get(&path) {
            return rec.adjusted_offset(offset);
        }
        if let Some(rec) = self.recorders.get(&path) {
            return rec.adjusted_offset(offset);
        }
        offset
    }

    /// Forget committed ledgers and dirty markers, e.g. between independent
    /// runs against the same tree.
    pub fn clear_edit_state(&mut self) {
        self.recorders.clear();
        self.committed.clear();
        self.dirty.clear();
    }

    /// Persist dirty files under `root`. Returns the number written.
    pub fn write_back(&self, root: &Path) -> Result<usize, TreeError> {
        let mut written = 0;
        for path in &self.dirty {
            let content = match self.files.get(path) {
                Some(c) => c,
                None => continue,
            };
            let dest = root.join(path);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|source| TreeError::Io {
                    path: path.clone(),
                    source,
                })?;
            }
            fs::write(&dest, content).map_err(|source| TreeError::Io {
                path: path.clone(),
                source,
            })?;
            written += 1;
        }
        Ok(written)
    }
}

/// Normalize to forward slashes and strip a leading `./`.
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.strip_prefix("./").unwrap_or(&path).to_string()
}
