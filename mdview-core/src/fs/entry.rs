//! `src/fs/entry.rs`
//! ============================================================
//! Directory entry descriptors and the file naming rules that
//! decide what may appear in the tree.
//!
//! Rules (bit-exact, shared by the lister, the open dialog filter
//! and the command-line scan):
//!   • files must end in `.md` or `.markdown`, compared case-insensitively;
//!   • names starting with `.` or `$` are hidden;
//!   • entries carrying the OS hidden attribute are hidden.

use std::cmp::Ordering;
use std::ffi::OsStr;
use std::fs::Metadata;
use std::path::{Path, PathBuf};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Extensions accepted as Markdown, lower-case, without the dot.
pub const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];

// ------------------------------------------------------------
// EntryKind: directory or Markdown file.
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    Directory,
    File,
}

impl EntryKind {
    #[inline]
    #[must_use]
    pub const fn is_dir(self) -> bool {
        matches!(self, Self::Directory)
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Directory => write!(f, "Dir"),
            Self::File => write!(f, "File"),
        }
    }
}

// ------------------------------------------------------------
// DirEntryInfo: one classified listing row.
// ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    /// Base name shown in the tree.
    pub name: CompactString,

    /// Parent path joined with `name`.
    pub path: PathBuf,

    pub kind: EntryKind,
}

impl DirEntryInfo {
    #[must_use]
    pub fn new(parent: &Path, name: &str, kind: EntryKind) -> Self {
        Self {
            name: CompactString::new(name),
            path: parent.join(name),
            kind,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Classify an entry from its (link-followed) metadata.
    ///
    /// Returns `None` for entries that never belong in the tree: hidden
    /// entries, non-Markdown files and special files (sockets, devices).
    #[must_use]
    pub fn classify(parent: &Path, name: &str, meta: &Metadata) -> Option<Self> {
        if is_hidden_name(name) || has_hidden_attribute(meta) {
            return None;
        }

        if meta.is_dir() {
            Some(Self::new(parent, name, EntryKind::Directory))
        } else if meta.is_file() && is_markdown_name(name) {
            Some(Self::new(parent, name, EntryKind::File))
        } else {
            None
        }
    }
}

/// Directories first, then files; each group case-insensitive ascending.
/// Names equal ignoring case fall back to byte order so the result is total.
#[must_use]
pub fn tree_order(a_kind: EntryKind, a_name: &str, b_kind: EntryKind, b_name: &str) -> Ordering {
    match (a_kind.is_dir(), b_kind.is_dir()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => cmp_ignore_case(a_name, b_name).then_with(|| a_name.cmp(b_name)),
    }
}

/// Sort listing rows into tree order in place.
pub fn sort_entries(entries: &mut [DirEntryInfo]) {
    entries.sort_by(|a: &DirEntryInfo, b: &DirEntryInfo| -> Ordering {
        tree_order(a.kind, &a.name, b.kind, &b.name)
    });
}

/// Case-insensitive comparison without allocating per character pair.
#[must_use]
pub fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Case-insensitive equality for names and path segments.
#[must_use]
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.eq_ignore_ascii_case(b) || cmp_ignore_case(a, b) == Ordering::Equal
}

#[must_use]
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('$')
}

#[must_use]
pub fn is_markdown_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext: &str| -> bool {
            MARKDOWN_EXTENSIONS
                .iter()
                .any(|md: &&str| -> bool { ext.eq_ignore_ascii_case(md) })
        })
}

/// Markdown rule applied to a full path (command line, file association,
/// open dialog).
#[must_use]
pub fn is_markdown_path(path: &Path) -> bool {
    path.file_name()
        .and_then(OsStr::to_str)
        .is_some_and(is_markdown_name)
}

#[cfg(windows)]
fn has_hidden_attribute(meta: &Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;

    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    meta.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0
}

#[cfg(not(windows))]
const fn has_hidden_attribute(_meta: &Metadata) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_rule() {
        assert!(is_markdown_name("notes.md"));
        assert!(is_markdown_name("README.MD"));
        assert!(is_markdown_name("guide.Markdown"));
        assert!(!is_markdown_name("notes.txt"));
        assert!(!is_markdown_name("md"));
        assert!(!is_markdown_name("archive.md.bak"));
        assert!(is_markdown_path(Path::new("/docs/a.md")));
        assert!(!is_markdown_path(Path::new("/docs/")));
    }

    #[test]
    fn test_hidden_rule() {
        assert!(is_hidden_name(".git"));
        assert!(is_hidden_name("$RECYCLE.BIN"));
        assert!(!is_hidden_name("notes.md"));
        assert!(!is_hidden_name("a.$md"));
    }

    #[test]
    fn test_tree_order_dirs_first_case_insensitive() {
        let parent = Path::new("/p");
        let mut entries = vec![
            DirEntryInfo::new(parent, "b.md", EntryKind::File),
            DirEntryInfo::new(parent, "Zeta", EntryKind::Directory),
            DirEntryInfo::new(parent, "A.md", EntryKind::File),
            DirEntryInfo::new(parent, "alpha", EntryKind::Directory),
        ];

        sort_entries(&mut entries);

        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["alpha", "Zeta", "A.md", "b.md"]);
    }

    #[test]
    fn test_case_insensitive_equality() {
        assert!(eq_ignore_case("Notes.md", "notes.md"));
        assert!(eq_ignore_case("ÄRGER", "ärger"));
        assert!(!eq_ignore_case("notes.md", "notes.mdx"));
    }

    #[test]
    fn test_child_path_round_trip() {
        let parent = Path::new("/docs/guides");
        let entry = DirEntryInfo::new(parent, "intro.md", EntryKind::File);

        assert_eq!(entry.path.parent(), Some(parent));
        assert_eq!(
            entry.path.file_name().and_then(OsStr::to_str),
            Some("intro.md")
        );
    }
}
