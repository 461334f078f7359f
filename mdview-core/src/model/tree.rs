//! ``src/model/tree.rs``
//! ============================================================================
//! # `TreeStore`: Lazy Markdown File Tree
//!
//! Owns every node of the file browser in a slab arena. Directories are listed
//! only when first expanded; a refresh replaces a directory's children
//! wholesale and frees the discarded subtree. At most one node is selected.
//!
//! Nodes never point at their parents; every walk starts at a root.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use compact_str::CompactString;
use slab::Slab;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::fs::dir_lister::{DirectoryLister, FsLister, ListOutcome, mounted_roots};
use crate::fs::entry::{DirEntryInfo, EntryKind, eq_ignore_case};

/// Arena key of a tree node.
pub type NodeId = usize;

/// Load state of a node's children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Children {
    /// Never listed.
    #[default]
    NotLoaded,

    /// Listed; may be empty.
    Loaded(Vec<NodeId>),

    /// Listing was refused. Rendered as a disabled placeholder row.
    AccessDenied,
}

impl Children {
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        !matches!(self, Self::NotLoaded)
    }

    #[must_use]
    pub fn ids(&self) -> &[NodeId] {
        match self {
            Self::Loaded(ids) => ids,
            Self::NotLoaded | Self::AccessDenied => &[],
        }
    }
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Display label: base name, or the full path for roots.
    pub name: CompactString,

    pub path: PathBuf,

    pub kind: EntryKind,

    pub children: Children,

    pub expanded: bool,

    pub selected: bool,

    /// A background listing for this node is in flight.
    pub loading: bool,

    /// Distance from the root this node hangs under.
    pub depth: usize,
}

impl TreeNode {
    fn root(path: PathBuf) -> Self {
        let name = root_label(&path);

        Self {
            name,
            path,
            kind: EntryKind::Directory,
            children: Children::NotLoaded,
            expanded: false,
            selected: false,
            loading: false,
            depth: 0,
        }
    }

    fn child(info: DirEntryInfo, depth: usize) -> Self {
        Self {
            name: info.name,
            path: info.path,
            kind: info.kind,
            children: Children::NotLoaded,
            expanded: false,
            selected: false,
            loading: false,
            depth,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// What the tree is rooted at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootMode {
    /// One root per mounted volume.
    Volumes,

    /// A single explicitly opened folder.
    Folder(PathBuf),
}

/// Result of an expand, toggle or refresh request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpandOutcome {
    /// Children were listed from disk.
    Loaded { children: usize },

    /// Children were already present; no listing happened.
    AlreadyLoaded,

    /// The directory is unreadable; the node shows a placeholder.
    AccessDenied,

    /// Listing failed; the node is treated as empty.
    Failed(String),

    /// A background listing is already in flight for this node.
    Pending,

    /// File nodes cannot expand.
    NotExpandable,

    /// The node was collapsed (toggle only).
    Collapsed,

    /// A background result arrived for a node that no longer matches.
    Discarded,
}

/// One rendered line of the flattened tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibleRow {
    Node { id: NodeId, depth: usize },

    /// "(access denied)" placeholder under an unreadable directory.
    AccessDenied { parent: NodeId, depth: usize },
}

#[derive(Debug)]
pub struct TreeStore<L: DirectoryLister = FsLister> {
    nodes: Slab<TreeNode>,
    roots: Vec<NodeId>,
    selected: Option<NodeId>,
    lister: L,
}

impl TreeStore<FsLister> {
    /// Tree backed by the local filesystem.
    #[must_use]
    pub fn with_fs() -> Self {
        Self::new(FsLister)
    }
}

impl<L: DirectoryLister> TreeStore<L> {
    #[must_use]
    pub fn new(lister: L) -> Self {
        Self {
            nodes: Slab::with_capacity(256),
            roots: Vec::new(),
            selected: None,
            lister,
        }
    }

    #[must_use]
    pub const fn lister(&self) -> &L {
        &self.lister
    }

    /// Replace the root set. Every previous node is discarded.
    pub fn load_roots(&mut self, mode: &RootMode) -> &[NodeId] {
        let paths: Vec<PathBuf> = match mode {
            RootMode::Volumes => mounted_roots(),
            RootMode::Folder(path) => vec![path.clone()],
        };

        self.set_roots(paths)
    }

    /// Replace the root set with explicit root paths.
    pub fn set_roots(&mut self, paths: Vec<PathBuf>) -> &[NodeId] {
        self.nodes.clear();
        self.roots.clear();
        self.selected = None;

        for path in paths {
            let id = self.nodes.insert(TreeNode::root(path));
            self.roots.push(id);
        }

        info!(roots = self.roots.len(), "Tree roots loaded");
        &self.roots
    }

    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    fn node_mut(&mut self, id: NodeId) -> AppResult<&mut TreeNode> {
        self.nodes.get_mut(id).ok_or(AppError::UnknownNode(id))
    }

    /// Loaded children of `id`; empty when not loaded or unknown.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.nodes.get(id) {
            Some(node) => node.children.ids(),
            None => &[],
        }
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub const fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    /// Load children if needed and mark the node expanded.
    ///
    /// Calling this again without a [`refresh`](Self::refresh) never lists
    /// the directory a second time.
    pub fn expand(&mut self, id: NodeId) -> AppResult<ExpandOutcome> {
        let node = self.node_mut(id)?;

        if !node.is_dir() {
            return Ok(ExpandOutcome::NotExpandable);
        }

        node.expanded = true;

        if node.loading {
            return Ok(ExpandOutcome::Pending);
        }

        match node.children {
            Children::NotLoaded => {}
            Children::AccessDenied => return Ok(ExpandOutcome::AccessDenied),
            Children::Loaded(_) => return Ok(ExpandOutcome::AlreadyLoaded),
        }

        let path = node.path.clone();
        let outcome = self.lister.list(&path);
        Ok(self.apply_listing(id, outcome))
    }

    pub fn collapse(&mut self, id: NodeId) -> AppResult<()> {
        self.node_mut(id)?.expanded = false;
        Ok(())
    }

    /// Click on a directory row: expand when collapsed, collapse otherwise.
    pub fn toggle(&mut self, id: NodeId) -> AppResult<ExpandOutcome> {
        let node = self.node_mut(id)?;

        if node.is_dir() && node.expanded {
            node.expanded = false;
            return Ok(ExpandOutcome::Collapsed);
        }

        self.expand(id)
    }

    /// Re-list a directory from disk, replacing its children.
    ///
    /// The expanded flag is kept as it was. Any selection inside the
    /// discarded subtree is cleared.
    pub fn refresh(&mut self, id: NodeId) -> AppResult<ExpandOutcome> {
        let node = self.node_mut(id)?;

        if !node.is_dir() {
            return Ok(ExpandOutcome::NotExpandable);
        }

        node.loading = false;
        let path = node.path.clone();

        debug!("Refreshing {}", path.display());
        let outcome = self.lister.list(&path);
        Ok(self.apply_listing(id, outcome))
    }

    /// Claim a node for a background listing.
    ///
    /// Returns the path to list, or `None` when the node is already loaded,
    /// already loading, or not a directory. Concurrent expansion requests
    /// thus collapse into a single filesystem call.
    pub fn begin_load(&mut self, id: NodeId) -> AppResult<Option<PathBuf>> {
        let node = self.node_mut(id)?;

        if !node.is_dir() {
            return Ok(None);
        }

        node.expanded = true;

        if node.loading || node.children.is_loaded() {
            return Ok(None);
        }

        node.loading = true;
        Ok(Some(node.path.clone()))
    }

    /// Apply a listing produced off-thread for `path`.
    ///
    /// Results for nodes that were removed, reused for another path, or
    /// are no longer waiting are dropped.
    pub fn complete_load(&mut self, id: NodeId, path: &Path, outcome: ListOutcome) -> ExpandOutcome {
        let waiting = self
            .nodes
            .get(id)
            .is_some_and(|node: &TreeNode| -> bool { node.loading && node.path.as_path() == path });

        if !waiting {
            debug!("Dropping stale listing for {}", path.display());
            return ExpandOutcome::Discarded;
        }

        self.apply_listing(id, outcome)
    }

    fn apply_listing(&mut self, id: NodeId, outcome: ListOutcome) -> ExpandOutcome {
        self.discard_children(id);

        let Some(node) = self.nodes.get_mut(id) else {
            return ExpandOutcome::Discarded;
        };
        node.loading = false;
        let depth = node.depth + 1;

        match outcome {
            ListOutcome::Listed { entries, errors } => {
                for error in &errors {
                    debug!(
                        "Entry {:?} left out of {}: {}",
                        error.name,
                        node.path.display(),
                        error.reason
                    );
                }

                let ids: Vec<NodeId> = entries
                    .into_iter()
                    .map(|info: DirEntryInfo| -> NodeId {
                        self.nodes.insert(TreeNode::child(info, depth))
                    })
                    .collect();
                let count = ids.len();

                if let Some(node) = self.nodes.get_mut(id) {
                    node.children = Children::Loaded(ids);
                }

                ExpandOutcome::Loaded { children: count }
            }

            ListOutcome::AccessDenied => {
                node.children = Children::AccessDenied;
                ExpandOutcome::AccessDenied
            }

            ListOutcome::Failed(reason) => {
                warn!(
                    path = %node.path.display(),
                    reason = %reason,
                    "Listing failed, showing directory as empty"
                );
                node.children = Children::Loaded(Vec::new());
                ExpandOutcome::Failed(reason)
            }
        }
    }

    /// Free every descendant of `id` and reset its children to `NotLoaded`.
    fn discard_children(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };

        let mut stack: Vec<NodeId> = std::mem::take(&mut node.children).ids().to_vec();

        while let Some(child) = stack.pop() {
            if self.selected == Some(child) {
                self.selected = None;
            }

            if self.nodes.contains(child) {
                let removed = self.nodes.remove(child);
                stack.extend_from_slice(removed.children.ids());
            }
        }
    }

    /// Select `id`, deselecting the previous node. Returns the previous one.
    pub fn select(&mut self, id: NodeId) -> AppResult<Option<NodeId>> {
        if !self.nodes.contains(id) {
            return Err(AppError::UnknownNode(id));
        }

        let previous = self.selected.take();
        if let Some(prev) = previous
            && let Some(node) = self.nodes.get_mut(prev)
        {
            node.selected = false;
        }

        self.node_mut(id)?.selected = true;
        self.selected = Some(id);
        Ok(previous)
    }

    /// Leave no node selected.
    pub fn clear_selection(&mut self) -> Option<NodeId> {
        let previous = self.selected.take();

        if let Some(prev) = previous
            && let Some(node) = self.nodes.get_mut(prev)
        {
            node.selected = false;
        }

        previous
    }

    /// Look a child up by name among loaded children.
    ///
    /// Case-insensitive; an exact match wins when two children differ only
    /// in case.
    #[must_use]
    pub fn find_child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        let children = self.children(id);

        children
            .iter()
            .copied()
            .find(|child: &NodeId| -> bool {
                self.nodes
                    .get(*child)
                    .is_some_and(|node: &TreeNode| -> bool { node.name.as_str() == name })
            })
            .or_else(|| -> Option<NodeId> {
                children.iter().copied().find(|child: &NodeId| -> bool {
                    self.nodes
                        .get(*child)
                        .is_some_and(|node: &TreeNode| -> bool { eq_ignore_case(&node.name, name) })
                })
            })
    }

    /// Find an already-materialized node by path. Never touches the disk.
    #[must_use]
    pub fn find_by_path(&self, path: &Path) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| paths_equal(&node.path, path))
            .map(|(id, _)| id)
    }

    /// Depth-first rows of every expanded branch, in display order.
    #[must_use]
    pub fn visible_rows(&self) -> Vec<VisibleRow> {
        let mut rows: Vec<VisibleRow> = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };

            rows.push(VisibleRow::Node {
                id,
                depth: node.depth,
            });

            if !node.expanded {
                continue;
            }

            match &node.children {
                Children::Loaded(ids) => stack.extend(ids.iter().rev().copied()),
                Children::AccessDenied => rows.push(VisibleRow::AccessDenied {
                    parent: id,
                    depth: node.depth + 1,
                }),
                Children::NotLoaded => {}
            }
        }

        rows
    }
}

/// Display label for a root: the full path, so `C:\` and `/` stay readable.
fn root_label(path: &Path) -> CompactString {
    let display = path.display().to_string();

    if display.is_empty() {
        path.file_name()
            .and_then(OsStr::to_str)
            .map_or_else(CompactString::default, CompactString::new)
    } else {
        CompactString::new(display)
    }
}

/// Component-wise, case-insensitive path equality. Separators and trailing
/// slashes do not matter.
#[must_use]
pub fn paths_equal(a: &Path, b: &Path) -> bool {
    let mut left = a.components();
    let mut right = b.components();

    loop {
        match (left.next(), right.next()) {
            (None, None) => return true,
            (Some(x), Some(y)) if components_equal(x, y) => {}
            _ => return false,
        }
    }
}

pub(crate) fn components_equal(a: Component<'_>, b: Component<'_>) -> bool {
    match (a, b) {
        (Component::Normal(x), Component::Normal(y)) => {
            eq_ignore_case(&x.to_string_lossy(), &y.to_string_lossy())
        }
        (Component::Prefix(x), Component::Prefix(y)) => {
            eq_ignore_case(&x.as_os_str().to_string_lossy(), &y.as_os_str().to_string_lossy())
        }
        (x, y) => x == y,
    }
}
