//! File-tree access: discovery of JSON files and the bulk read phase.
//!
//! Discovery is a breadth-first walk over an explicit queue with a depth cap,
//! which also bounds symlink cycles. Reading happens in parallel and finishes
//! before any classification starts. Per-file failures are returned as
//! [`SkippedFile`] diagnostics rather than errors.

use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Default maximum directory depth below the root.
pub const DEFAULT_MAX_DEPTH: usize = 20;

/// UTF-8 byte order mark, written by some Windows exports.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Per-file errors. These never abort an aggregation.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// An entry returned by [`FileTree::list_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Read-only access to a tree of files addressed by relative paths.
///
/// The empty path is the root. Implementations must be shareable across the
/// reader threads.
pub trait FileTree: Sync {
    /// Display name of the root, used as the event ID for root-level files.
    fn root_name(&self) -> String;

    /// Whether the root itself is present.
    fn root_exists(&self) -> bool;

    /// Lists the entries of a directory.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<TreeEntry>>;

    /// Reads a file's bytes.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// A [`FileTree`] backed by a directory on disk.
#[derive(Debug, Clone)]
pub struct FsTree {
    root: PathBuf,
}

impl FsTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileTree for FsTree {
    fn root_name(&self) -> String {
        self.root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("root")
            .to_string()
    }

    fn root_exists(&self) -> bool {
        self.root.is_dir()
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<TreeEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.root.join(path))? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(String::from) else {
                tracing::warn!(path = ?entry.path(), "skipping entry with non UTF-8 name");
                continue;
            };
            // Follows symlinks; the depth cap bounds any cycles.
            let is_dir = entry.path().is_dir();
            entries.push(TreeEntry { name, is_dir });
        }
        Ok(entries)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(self.root.join(path))
    }
}

/// An in-memory [`FileTree`], keyed by relative path.
#[derive(Debug, Clone, Default)]
pub struct MemoryTree {
    name: String,
    files: BTreeMap<PathBuf, Vec<u8>>,
}

impl MemoryTree {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: BTreeMap::new(),
        }
    }

    /// Adds a file, replacing any previous content at that path.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }
}

impl FileTree for MemoryTree {
    fn root_name(&self) -> String {
        self.name.clone()
    }

    fn root_exists(&self) -> bool {
        true
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<TreeEntry>> {
        let mut children: BTreeMap<String, bool> = BTreeMap::new();
        for file in self.files.keys() {
            let Ok(rest) = file.strip_prefix(path) else {
                continue;
            };
            let mut components = rest.components();
            let Some(first) = components.next() else {
                continue;
            };
            let name = first.as_os_str().to_string_lossy().into_owned();
            let is_dir = components.next().is_some();
            *children.entry(name).or_insert(false) |= is_dir;
        }

        if children.is_empty() && !path.as_os_str().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such directory: {}", path.display()),
            ));
        }

        Ok(children
            .into_iter()
            .map(|(name, is_dir)| TreeEntry { name, is_dir })
            .collect())
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )
        })
    }
}

/// A parsed JSON file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the tree root.
    pub path: PathBuf,
    pub value: Value,
}

impl SourceFile {
    /// The file name component, e.g. `Race.json`.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// The containing directory, relative to the root.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}

/// A file that could not be read or parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

fn is_json_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Finds every `.json` file reachable from the root, sorted by path.
///
/// The root is depth 0. Directories deeper than `max_depth` are not listed.
pub fn discover_json_files(tree: &dyn FileTree, max_depth: usize) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut queue: VecDeque<(PathBuf, usize)> = VecDeque::from([(PathBuf::new(), 0)]);

    while let Some((dir, depth)) = queue.pop_front() {
        let entries = match tree.list_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(path = ?dir, error = %err, "failed to list directory");
                continue;
            }
        };

        for entry in entries {
            let path = dir.join(&entry.name);
            if entry.is_dir {
                if depth + 1 > max_depth {
                    tracing::debug!(path = ?path, max_depth, "not descending past depth limit");
                    continue;
                }
                queue.push_back((path, depth + 1));
            } else if is_json_file(&entry.name) {
                files.push(path);
            }
        }
    }

    files.sort();
    files
}

/// Reads and parses a single file.
pub fn read_source(tree: &dyn FileTree, path: &Path) -> Result<Value, SourceError> {
    let bytes = tree.read(path)?;
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);
    Ok(serde_json::from_slice(body)?)
}

/// Reads every path in parallel, preserving input order.
pub fn read_sources(tree: &dyn FileTree, paths: &[PathBuf]) -> (Vec<SourceFile>, Vec<SkippedFile>) {
    let outcomes: Vec<Result<SourceFile, SkippedFile>> = paths
        .par_iter()
        .map(|path| match read_source(tree, path) {
            Ok(value) => Ok(SourceFile {
                path: path.clone(),
                value,
            }),
            Err(err) => {
                tracing::warn!(path = ?path, error = %err, "skipping unreadable JSON file");
                Err(SkippedFile {
                    path: path.clone(),
                    reason: err.to_string(),
                })
            }
        })
        .collect();

    let mut sources = Vec::with_capacity(outcomes.len());
    let mut skipped = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(source) => sources.push(source),
            Err(skip) => skipped.push(skip),
        }
    }
    (sources, skipped)
}
