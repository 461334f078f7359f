//! ``src/model/navigator.rs``
//! ============================================================================
//! # `PathNavigator`: Expand-To-Path
//!
//! Walks an absolute path down from the matching root, loading each missing
//! level through the tree's lister, and selects the terminal node. Used by
//! the "sync to current file" action, by file opens from any source and by
//! restoring the last expanded path at startup.
//!
//! A miss is an outcome, not an error: the tree stays expanded as far as the
//! path could be followed and the selection is left untouched.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::fs::dir_lister::DirectoryLister;
use crate::model::tree::{NodeId, TreeNode, TreeStore, components_equal};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavOutcome {
    /// Every segment was found; `node` is now selected.
    Synced { node: NodeId, depth: usize },

    /// Segment number `depth` (0-based, below the root) could not be
    /// followed. `deepest` is the last node reached.
    PartialSync {
        deepest: NodeId,
        depth: usize,
        missing: String,
    },

    /// No root is a prefix of the target.
    RootNotFound,
}

/// Outcome of one navigation plus the row the view should scroll to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub target: PathBuf,
    pub outcome: NavOutcome,
    pub scroll_to: Option<NodeId>,
}

impl Navigation {
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        matches!(self.outcome, NavOutcome::Synced { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingNavigation {
    ticket: u64,
    path: PathBuf,
}

/// Expand-to-path driver with a single "latest request" slot.
#[derive(Debug, Default)]
pub struct PathNavigator {
    pending: Option<PendingNavigation>,
    next_ticket: u64,
}

impl PathNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a navigation request that will be carried out later, replacing
    /// any earlier one. Returns the ticket to pass to [`finish`](Self::finish).
    pub fn request(&mut self, path: impl Into<PathBuf>) -> u64 {
        self.next_ticket += 1;
        let path = path.into();

        if let Some(old) = self.pending.as_ref() {
            debug!(
                "Navigation to {} superseded by {}",
                old.path.display(),
                path.display()
            );
        }

        self.pending = Some(PendingNavigation {
            ticket: self.next_ticket,
            path,
        });
        self.next_ticket
    }

    /// Target of the most recent unfinished request.
    #[must_use]
    pub fn pending(&self) -> Option<&Path> {
        self.pending
            .as_ref()
            .map(|pending: &PendingNavigation| -> &Path { pending.path.as_path() })
    }

    /// Clear the pending slot if `ticket` is still the latest request.
    ///
    /// Returns the path it held; a superseded or already-finished ticket
    /// yields `None`.
    pub fn finish(&mut self, ticket: u64) -> Option<PathBuf> {
        match self.pending.take() {
            Some(pending) if pending.ticket == ticket => Some(pending.path),
            other => {
                self.pending = other;
                None
            }
        }
    }

    /// Expand every ancestor of `target` and select it.
    ///
    /// `target` must be rooted. Directory targets are expanded as well as
    /// selected.
    pub fn navigate<L: DirectoryLister>(
        &self,
        tree: &mut TreeStore<L>,
        target: &Path,
    ) -> AppResult<Navigation> {
        if !target.has_root() {
            return Err(AppError::navigation_failed(target, "path is not absolute"));
        }

        let Some((root, consumed)) = match_root(tree, target) else {
            info!(target_path = %target.display(), "No root contains navigation target");
            return Ok(Navigation {
                target: target.to_path_buf(),
                outcome: NavOutcome::RootNotFound,
                scroll_to: None,
            });
        };

        let segments = segments_after(target, consumed)?;
        let mut current = root;

        for (depth, segment) in segments.iter().enumerate() {
            tree.expand(current)?;

            let next = tree
                .find_child(current, segment)
                .and_then(|id: NodeId| -> Option<(NodeId, bool)> {
                    tree.node(id).map(|node: &TreeNode| -> (NodeId, bool) { (id, node.is_dir()) })
                });

            match next {
                Some((child, true)) => current = child,

                Some((child, false)) if depth + 1 == segments.len() => {
                    return Self::synced(tree, target, child, depth + 1);
                }

                Some(_) | None => {
                    debug!(
                        target_path = %target.display(),
                        depth,
                        missing = %segment,
                        "Navigation stopped early"
                    );
                    return Ok(Navigation {
                        target: target.to_path_buf(),
                        outcome: NavOutcome::PartialSync {
                            deepest: current,
                            depth,
                            missing: segment.clone(),
                        },
                        scroll_to: Some(current),
                    });
                }
            }
        }

        tree.expand(current)?;
        Self::synced(tree, target, current, segments.len())
    }

    fn synced<L: DirectoryLister>(
        tree: &mut TreeStore<L>,
        target: &Path,
        node: NodeId,
        depth: usize,
    ) -> AppResult<Navigation> {
        tree.select(node)?;
        debug!(target_path = %target.display(), node, depth, "Navigation synced");

        Ok(Navigation {
            target: target.to_path_buf(),
            outcome: NavOutcome::Synced { node, depth },
            scroll_to: Some(node),
        })
    }
}

/// Root whose path is the longest component prefix of `target`, with the
/// number of target components it covers.
fn match_root<L: DirectoryLister>(tree: &TreeStore<L>, target: &Path) -> Option<(NodeId, usize)> {
    tree.roots()
        .iter()
        .filter_map(|id: &NodeId| -> Option<(NodeId, usize)> {
            let node = tree.node(*id)?;
            prefix_len(&node.path, target).map(|len: usize| -> (NodeId, usize) { (*id, len) })
        })
        .max_by_key(|(_, len)| *len)
}

/// Number of components of `prefix` when it is a case-insensitive component
/// prefix of `path`.
fn prefix_len(prefix: &Path, path: &Path) -> Option<usize> {
    let mut len = 0;
    let mut rest = path.components();

    for component in prefix.components() {
        let other = rest.next()?;
        if !components_equal(component, other) {
            return None;
        }
        len += 1;
    }

    Some(len)
}

fn segments_after(target: &Path, skip: usize) -> AppResult<Vec<String>> {
    let mut segments: Vec<String> = Vec::new();

    for component in target.components().skip(skip) {
        match component {
            Component::Normal(name) => segments.push(name.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(AppError::navigation_failed(
                    target,
                    "path must be normalized",
                ));
            }
        }
    }

    Ok(segments)
}
