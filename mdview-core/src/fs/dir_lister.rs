//! ``src/fs/dir_lister.rs``
//!
//! # `Directory Lister`: One-Level Markdown Listing
//!
//! Reads a single directory level and returns classified, tree-ordered
//! entries. Failures are typed outcomes rather than empty lists so the tree
//! can tell "empty" from "unreadable".

use std::fs::{self, DirEntry, ReadDir};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use compact_str::CompactString;
use tracing::{debug, info, warn};

use crate::fs::entry::{DirEntryInfo, sort_entries};

/// Result of listing one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOutcome {
    /// The directory was read. `errors` holds entries that could not be
    /// classified (dangling links, racing deletes); they are left out of
    /// `entries`.
    Listed {
        entries: Vec<DirEntryInfo>,
        errors: Vec<EntryError>,
    },

    /// The directory itself is unreadable for permission reasons.
    AccessDenied,

    /// Any other failure reading the directory.
    Failed(String),
}

impl ListOutcome {
    #[must_use]
    pub const fn listed(entries: Vec<DirEntryInfo>) -> Self {
        Self::Listed {
            entries,
            errors: Vec::new(),
        }
    }

    /// Entries of a successful listing, empty otherwise.
    #[must_use]
    pub fn entries(&self) -> &[DirEntryInfo] {
        match self {
            Self::Listed { entries, .. } => entries,
            Self::AccessDenied | Self::Failed(_) => &[],
        }
    }
}

/// An individual entry that could not be classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryError {
    pub name: CompactString,
    pub path: PathBuf,
    pub reason: String,
}

/// Seam between the tree and the filesystem.
pub trait DirectoryLister: Send + Sync {
    /// List the immediate children of `path`.
    fn list(&self, path: &Path) -> ListOutcome;
}

/// Lister backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLister;

impl DirectoryLister for FsLister {
    fn list(&self, path: &Path) -> ListOutcome {
        list_dir(path)
    }
}

impl<L: DirectoryLister + ?Sized> DirectoryLister for std::sync::Arc<L> {
    fn list(&self, path: &Path) -> ListOutcome {
        (**self).list(path)
    }
}

/// Lists `path` non-recursively, keeping directories and Markdown files.
pub fn list_dir(path: &Path) -> ListOutcome {
    let start_time: Instant = Instant::now();

    let read_dir: ReadDir = match fs::read_dir(path) {
        Ok(read_dir) => read_dir,

        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            info!(
                marker = "DIRECTORY_LIST",
                path = %path.display(),
                "Access denied"
            );
            return ListOutcome::AccessDenied;
        }

        Err(e) => {
            warn!(
                marker = "DIRECTORY_LIST",
                path = %path.display(),
                error = %e,
                "Failed to read directory"
            );
            return ListOutcome::Failed(e.to_string());
        }
    };

    let mut entries: Vec<DirEntryInfo> = Vec::new();
    let mut errors: Vec<EntryError> = Vec::new();

    for entry_result in read_dir {
        let entry: DirEntry = match entry_result {
            Ok(entry) => entry,

            Err(e) => {
                debug!("Skipping unreadable entry in {:?}: {}", path, e);
                errors.push(EntryError {
                    name: CompactString::const_new(""),
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let os_name = entry.file_name();
        let Some(name) = os_name.to_str() else {
            errors.push(EntryError {
                name: CompactString::new(os_name.to_string_lossy()),
                path: entry.path(),
                reason: "name is not valid UTF-8".to_string(),
            });
            continue;
        };

        // Cheap rejection before touching metadata.
        if crate::fs::entry::is_hidden_name(name) {
            continue;
        }

        // Follows symlinks: a link is whatever it points at.
        match fs::metadata(entry.path()) {
            Ok(meta) => {
                if let Some(info) = DirEntryInfo::classify(path, name, &meta) {
                    entries.push(info);
                }
            }

            Err(e) => {
                debug!("Failed to stat {:?}: {}", entry.path(), e);
                errors.push(EntryError {
                    name: CompactString::new(name),
                    path: entry.path(),
                    reason: e.to_string(),
                });
            }
        }
    }

    sort_entries(&mut entries);

    let duration: Duration = start_time.elapsed();
    info!(
        marker = "DIRECTORY_LIST",
        path = %path.display(),
        entries = entries.len(),
        entry_errors = errors.len(),
        duration_us = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX),
        "Directory listed in {:?}",
        duration
    );

    ListOutcome::Listed { entries, errors }
}

/// One root per mounted volume.
#[cfg(windows)]
#[must_use]
pub fn mounted_roots() -> Vec<PathBuf> {
    (b'A'..=b'Z')
        .map(|letter: u8| -> PathBuf { PathBuf::from(format!("{}:\\", letter as char)) })
        .filter(|root: &PathBuf| -> bool { fs::read_dir(root).is_ok() })
        .collect()
}

/// One root per mounted volume.
#[cfg(not(windows))]
#[must_use]
pub fn mounted_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("/")]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::entry::EntryKind;
    use std::fs::File;
    use tempfile::TempDir;

    fn create_test_directory() -> io::Result<TempDir> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path();

        File::create(path.join("b.md"))?;
        File::create(path.join("A.MD"))?;
        File::create(path.join("guide.markdown"))?;
        File::create(path.join("notes.txt"))?;
        File::create(path.join(".hidden.md"))?;
        File::create(path.join("$draft.md"))?;
        fs::create_dir(path.join("zeta"))?;
        fs::create_dir(path.join("Alpha"))?;
        fs::create_dir(path.join(".git"))?;

        Ok(temp_dir)
    }

    #[test]
    fn test_listing_filters_and_sorts() {
        let temp_dir = create_test_directory().unwrap();

        let outcome = list_dir(temp_dir.path());
        let names: Vec<(&str, EntryKind)> = outcome
            .entries()
            .iter()
            .map(|e| (e.name.as_str(), e.kind))
            .collect();

        assert_eq!(
            names,
            [
                ("Alpha", EntryKind::Directory),
                ("zeta", EntryKind::Directory),
                ("A.MD", EntryKind::File),
                ("b.md", EntryKind::File),
                ("guide.markdown", EntryKind::File),
            ]
        );
    }

    #[test]
    fn test_child_paths_join_parent() {
        let temp_dir = create_test_directory().unwrap();

        for entry in list_dir(temp_dir.path()).entries() {
            assert_eq!(entry.path, temp_dir.path().join(entry.name.as_str()));
        }
    }

    #[test]
    fn test_empty_directory_is_listed_not_failed() {
        let temp_dir = TempDir::new().unwrap();

        assert_eq!(list_dir(temp_dir.path()), ListOutcome::listed(Vec::new()));
    }

    #[test]
    fn test_missing_directory_is_failure() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");

        assert!(matches!(list_dir(&missing), ListOutcome::Failed(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_is_entry_error() {
        let temp_dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink(
            temp_dir.path().join("gone"),
            temp_dir.path().join("link.md"),
        )
        .unwrap();
        File::create(temp_dir.path().join("kept.md")).unwrap();

        match list_dir(temp_dir.path()) {
            ListOutcome::Listed { entries, errors } => {
                assert_eq!(entries.len(), 1);
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].name.as_str(), "link.md");
            }
            other => panic!("Expected listing, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_is_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("real")).unwrap();
        std::os::unix::fs::symlink(temp_dir.path().join("real"), temp_dir.path().join("alias"))
            .unwrap();

        let outcome = list_dir(temp_dir.path());
        assert!(outcome.entries().iter().all(DirEntryInfo::is_dir));
        assert_eq!(outcome.entries().len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_access_denied() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let locked = temp_dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        File::create(locked.join("secret.md")).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users read through mode bits.
        let privileged = fs::read_dir(&locked).is_ok();
        let outcome = list_dir(&locked);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        if privileged {
            return;
        }
        assert!(matches!(outcome, ListOutcome::AccessDenied));
        assert!(outcome.entries().is_empty());
    }

    #[test]
    fn test_mounted_roots_not_empty() {
        assert!(!mounted_roots().is_empty());
    }
}
