//! ``src/fs/mem_lister.rs``
//!
//! # In-Memory Directory Lister
//!
//! A virtual filesystem behind the [`DirectoryLister`] seam. Embedders use it
//! to mirror non-local sources; the test suites use it to simulate deletions
//! and permission failures and to count listing calls.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use compact_str::CompactString;
use parking_lot::Mutex;

use crate::fs::dir_lister::{DirectoryLister, ListOutcome};
use crate::fs::entry::{DirEntryInfo, EntryKind, is_hidden_name, is_markdown_name, sort_entries};

#[derive(Debug, Clone)]
enum MemDir {
    Entries(Vec<(CompactString, EntryKind)>),
    Denied,
    Broken(String),
}

#[derive(Debug, Default)]
pub struct MemLister {
    dirs: Mutex<HashMap<PathBuf, MemDir>>,
    calls: AtomicUsize,
    calls_by_path: Mutex<HashMap<PathBuf, usize>>,
}

impl MemLister {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `path` and every missing ancestor as directories.
    pub fn add_dir(&self, path: impl AsRef<Path>) -> &Self {
        let mut dirs = self.dirs.lock();
        Self::ensure_dir(&mut dirs, path.as_ref());
        self
    }

    /// Create a file at `path`, creating missing ancestors.
    pub fn add_file(&self, path: impl AsRef<Path>) -> &Self {
        let path = path.as_ref();
        let mut dirs = self.dirs.lock();

        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            Self::ensure_dir(&mut dirs, parent);
            Self::insert_entry(&mut dirs, parent, &name.to_string_lossy(), EntryKind::File);
        }
        self
    }

    /// Remove a file or a directory subtree.
    pub fn remove(&self, path: impl AsRef<Path>) -> &Self {
        let path = path.as_ref();
        let mut dirs = self.dirs.lock();

        dirs.retain(|key: &PathBuf, _| -> bool { !key.starts_with(path) });

        if let (Some(parent), Some(name)) = (path.parent(), path.file_name())
            && let Some(MemDir::Entries(entries)) = dirs.get_mut(parent)
        {
            let name = name.to_string_lossy();
            entries.retain(|(entry, _)| entry.as_str() != name);
        }
        self
    }

    /// Make listing `path` report a permission failure.
    pub fn deny(&self, path: impl AsRef<Path>) -> &Self {
        self.dirs
            .lock()
            .insert(path.as_ref().to_path_buf(), MemDir::Denied);
        self
    }

    /// Make listing `path` report an I/O failure.
    pub fn break_dir(&self, path: impl AsRef<Path>, reason: &str) -> &Self {
        self.dirs
            .lock()
            .insert(path.as_ref().to_path_buf(), MemDir::Broken(reason.to_string()));
        self
    }

    /// Total number of `list` calls served.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Number of `list` calls served for one path.
    #[must_use]
    pub fn calls_for(&self, path: impl AsRef<Path>) -> usize {
        self.calls_by_path
            .lock()
            .get(path.as_ref())
            .copied()
            .unwrap_or(0)
    }

    fn ensure_dir(dirs: &mut HashMap<PathBuf, MemDir>, path: &Path) {
        if !dirs.contains_key(path) {
            dirs.insert(path.to_path_buf(), MemDir::Entries(Vec::new()));
        }

        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            Self::ensure_dir(dirs, parent);
            Self::insert_entry(dirs, parent, &name.to_string_lossy(), EntryKind::Directory);
        }
    }

    fn insert_entry(
        dirs: &mut HashMap<PathBuf, MemDir>,
        parent: &Path,
        name: &str,
        kind: EntryKind,
    ) {
        if let Some(MemDir::Entries(entries)) = dirs.get_mut(parent)
            && !entries.iter().any(|(entry, _)| entry.as_str() == name)
        {
            entries.push((CompactString::new(name), kind));
        }
    }
}

impl DirectoryLister for MemLister {
    fn list(&self, path: &Path) -> ListOutcome {
        self.calls.fetch_add(1, Ordering::Relaxed);
        *self
            .calls_by_path
            .lock()
            .entry(path.to_path_buf())
            .or_insert(0) += 1;

        let dir = self.dirs.lock().get(path).cloned();

        match dir {
            Some(MemDir::Entries(raw)) => {
                let mut entries: Vec<DirEntryInfo> = raw
                    .iter()
                    .filter(|(name, kind)| {
                        !is_hidden_name(name) && (kind.is_dir() || is_markdown_name(name))
                    })
                    .map(|(name, kind)| DirEntryInfo::new(path, name, *kind))
                    .collect();

                sort_entries(&mut entries);
                ListOutcome::listed(entries)
            }

            Some(MemDir::Denied) => ListOutcome::AccessDenied,

            Some(MemDir::Broken(reason)) => ListOutcome::Failed(reason),

            None => ListOutcome::Failed(format!("{} does not exist", path.display())),
        }
    }
}
