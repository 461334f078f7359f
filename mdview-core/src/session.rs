//! ``src/session.rs``
//! ============================================================================
//! # `ViewerSession`: Tree, Tabs and Settings Wired Together
//!
//! The single owner of all viewer state. User actions, file opens delivered
//! by other instances of the program and background task results all end up
//! here as method calls, applied one at a time.

use std::io;
use std::path::{Component, Path, PathBuf};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{Config, SettingsStore};
use crate::error::{AppError, AppResult};
use crate::fs::dir_lister::{DirectoryLister, FsLister};
use crate::fs::entry::is_markdown_path;
use crate::model::navigator::{Navigation, PathNavigator};
use crate::model::tree::{ExpandOutcome, NodeId, RootMode, TreeNode, TreeStore};
use crate::preview::coordinator::{
    CloseOutcome, DocumentHandle, DocumentSource, FsSource, PreviewCoordinator,
};
use crate::preview::render::{CmarkRenderer, Heading};
use crate::tasks::listing_task::{TaskResult, spawn_document_read, spawn_listing};

/// A document that was opened (or re-activated) and the tree sync it caused.
#[derive(Debug, Clone)]
pub struct OpenReport {
    pub document: DocumentHandle,
    pub navigation: Navigation,
}

#[derive(Debug, Clone)]
pub enum StartupOutcome {
    /// The file passed on the command line was opened.
    OpenedArgument(OpenReport),

    /// The last document of the previous run was reopened.
    RestoredFile(OpenReport),

    /// The last selected tree path was re-selected.
    RestoredPath(Navigation),

    Empty,
}

#[derive(Debug, Clone)]
pub enum SelectOutcome {
    /// A file row was clicked and its document is now active.
    Opened(DocumentHandle),

    /// A directory row was clicked.
    Toggled(ExpandOutcome),
}

#[derive(Debug, Clone)]
pub enum TaskApplied {
    Listing { node: NodeId, outcome: ExpandOutcome },
    Opened(OpenReport),
}

pub struct ViewerSession<
    L: DirectoryLister = FsLister,
    S: DocumentSource = FsSource,
    C: SettingsStore = Config,
> {
    tree: TreeStore<L>,
    navigator: PathNavigator,
    preview: PreviewCoordinator<CmarkRenderer, S>,
    settings: C,
    root_mode: RootMode,
}

impl ViewerSession {
    /// Session over the local filesystem.
    #[must_use]
    pub fn with_fs(settings: Config) -> Self {
        Self::new(FsLister, FsSource, settings)
    }
}

impl<L: DirectoryLister, S: DocumentSource, C: SettingsStore> ViewerSession<L, S, C> {
    #[must_use]
    pub fn new(lister: L, source: S, settings: C) -> Self {
        Self {
            tree: TreeStore::new(lister),
            navigator: PathNavigator::new(),
            preview: PreviewCoordinator::new(CmarkRenderer::new(), source),
            settings,
            root_mode: RootMode::Volumes,
        }
    }

    #[must_use]
    pub const fn tree(&self) -> &TreeStore<L> {
        &self.tree
    }

    #[must_use]
    pub const fn preview(&self) -> &PreviewCoordinator<CmarkRenderer, S> {
        &self.preview
    }

    #[must_use]
    pub const fn navigator(&self) -> &PathNavigator {
        &self.navigator
    }

    #[must_use]
    pub const fn settings(&self) -> &C {
        &self.settings
    }

    #[must_use]
    pub const fn root_mode(&self) -> &RootMode {
        &self.root_mode
    }

    pub fn into_settings(self) -> C {
        self.settings
    }

    /// Build the roots and restore what the user was looking at.
    ///
    /// A Markdown file given on the command line wins, then the last opened
    /// document, then the last selected tree path. A candidate that cannot
    /// be opened is logged and the next one is tried.
    pub fn startup(&mut self, mode: RootMode, startup_file: Option<&Path>) -> AppResult<StartupOutcome> {
        self.tree.load_roots(&mode);
        self.root_mode = mode;

        if let Some(file) = startup_file {
            if is_markdown_path(file) {
                match self.open_path(file) {
                    Ok(report) => return Ok(StartupOutcome::OpenedArgument(report)),
                    Err(e) if is_open_error(&e) => {
                        warn!(path = %file.display(), error = %e, "Cannot open startup file");
                    }
                    Err(e) => return Err(e),
                }
            } else {
                info!(path = %file.display(), "Ignoring non-Markdown startup argument");
            }
        }

        if let Some(last) = self.settings.last_file().map(Path::to_path_buf) {
            match self.open_path(&last) {
                Ok(report) => return Ok(StartupOutcome::RestoredFile(report)),
                Err(e) if is_open_error(&e) => {
                    info!(path = %last.display(), error = %e, "Last file no longer available");
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(last) = self.settings.last_expanded_path().map(Path::to_path_buf) {
            let last = normalize_path(&last)
                .map_err(|e| AppError::navigation_failed(&last, e.to_string()))?;
            let navigation = self.navigate(&last)?;
            return Ok(StartupOutcome::RestoredPath(navigation));
        }

        Ok(StartupOutcome::Empty)
    }

    /// Open a document and reveal it in the tree.
    pub fn open_path(&mut self, path: &Path) -> AppResult<OpenReport> {
        let path = normalize_path(path).map_err(|e| AppError::open_io(path, &e))?;
        let rollback = self.rollback_point(&path);
        let document = self.preview.open(&path)?;
        self.after_open(document, rollback)
    }

    /// A path delivered by another launch of the program. Handled exactly
    /// like a user open.
    pub fn handle_external_open(&mut self, path: &Path) -> AppResult<OpenReport> {
        info!(path = %path.display(), "Open request from another instance");
        self.open_path(path)
    }

    fn rollback_point(&self, path: &Path) -> OpenRollback {
        OpenRollback {
            fresh: self.preview.get(path).is_none(),
            previous_active: self.preview.active_path().map(Path::to_path_buf),
        }
    }

    /// Reveal a just-opened document. A failed reveal undoes the open, so an
    /// error never leaves a tab or a recorded file behind.
    fn after_open(
        &mut self,
        document: DocumentHandle,
        rollback: OpenRollback,
    ) -> AppResult<OpenReport> {
        let navigation = match self.navigate(&document.path) {
            Ok(navigation) => navigation,
            Err(e) => {
                warn!(path = %document.path.display(), error = %e, "Reveal failed, undoing open");
                if rollback.fresh {
                    self.preview.close(&document.path);
                }
                if let Some(previous) = &rollback.previous_active {
                    self.preview.activate(previous);
                }
                return Err(e);
            }
        };
        self.settings.record_current_file(&document.path);

        Ok(OpenReport {
            document,
            navigation,
        })
    }

    fn navigate(&mut self, target: &Path) -> AppResult<Navigation> {
        let ticket = self.navigator.request(target);
        let result = self.navigator.navigate(&mut self.tree, target);
        self.navigator.finish(ticket);
        result
    }

    /// A click on a tree row.
    pub fn select_node(&mut self, id: NodeId) -> AppResult<SelectOutcome> {
        let node: &TreeNode = self.tree.node(id).ok_or(AppError::UnknownNode(id))?;
        let path = node.path.clone();

        if node.is_dir() {
            let outcome = self.tree.toggle(id)?;
            self.tree.select(id)?;
            self.settings.record_selected_path(&path);
            return Ok(SelectOutcome::Toggled(outcome));
        }

        let document = self.preview.open(&path)?;
        self.tree.select(id)?;
        self.settings.record_current_file(&path);
        Ok(SelectOutcome::Opened(document))
    }

    /// Switch tabs. Returns `false` when `path` is not open.
    pub fn activate_document(&mut self, path: &Path) -> bool {
        if !self.preview.activate(path) {
            return false;
        }

        if let Some(active) = self.preview.active_path().map(Path::to_path_buf) {
            self.settings.record_current_file(&active);
            self.highlight(&active);
        }
        true
    }

    /// Close a tab. The tree highlight follows the tab that becomes active
    /// and is cleared when the last tab closes.
    pub fn close_document(&mut self, path: &Path) -> CloseOutcome {
        let outcome = self.preview.close(path);

        match &outcome {
            CloseOutcome::Closed {
                new_active: Some(active),
            } => {
                self.settings.record_current_file(active);
                self.highlight(active);
            }
            CloseOutcome::Closed { new_active: None } => {
                self.tree.clear_selection();
            }
            CloseOutcome::NotOpen => {}
        }
        outcome
    }

    /// Select `path` when its node is already in the tree. Never lists.
    fn highlight(&mut self, path: &Path) {
        if let Some(id) = self.tree.find_by_path(path)
            && let Err(e) = self.tree.select(id)
        {
            warn!(path = %path.display(), error = %e, "Cannot highlight document");
        }
    }

    /// Re-read the active document from disk.
    pub fn reload_active(&mut self) -> AppResult<Option<DocumentHandle>> {
        let Some(path) = self.preview.active_path().map(Path::to_path_buf) else {
            return Ok(None);
        };

        self.preview.reload(&path)
    }

    /// Reveal the active document in the tree.
    pub fn sync_to_active(&mut self) -> AppResult<Option<Navigation>> {
        let Some(path) = self.preview.active_path().map(Path::to_path_buf) else {
            debug!("Sync requested with no active document");
            return Ok(None);
        };

        self.navigate(&path).map(Some)
    }

    pub fn refresh_node(&mut self, id: NodeId) -> AppResult<ExpandOutcome> {
        self.tree.refresh(id)
    }

    /// Re-root the tree at a single folder and list it.
    pub fn open_folder(&mut self, path: &Path) -> AppResult<ExpandOutcome> {
        let path = normalize_path(path).map_err(|e| AppError::from_io(path, &e))?;
        let mode = RootMode::Folder(path);

        self.tree.load_roots(&mode);
        self.root_mode = mode;

        let root = *self
            .tree
            .roots()
            .first()
            .ok_or_else(|| AppError::Other("folder root missing".to_string()))?;
        let outcome = self.tree.expand(root)?;
        self.tree.select(root)?;
        Ok(outcome)
    }

    #[must_use]
    pub fn active_html(&self) -> Option<&str> {
        self.preview.rendered(self.preview.active_path()?)
    }

    #[must_use]
    pub fn active_outline(&self) -> Option<&[Heading]> {
        self.preview.outline(self.preview.active_path()?)
    }

    pub fn zoom_in(&mut self) -> u16 {
        self.settings.appearance_mut().zoom_in()
    }

    pub fn zoom_out(&mut self) -> u16 {
        self.settings.appearance_mut().zoom_out()
    }

    pub fn reset_zoom(&mut self) -> u16 {
        self.settings.appearance_mut().reset_zoom()
    }

    pub fn set_font(&mut self, family: &str) -> AppResult<()> {
        self.settings.appearance_mut().font_family = validate_font(family)?;
        Ok(())
    }

    pub fn set_code_font(&mut self, family: &str) -> AppResult<()> {
        self.settings.appearance_mut().code_font_family = validate_font(family)?;
        Ok(())
    }
}

impl<L, S, C> ViewerSession<L, S, C>
where
    L: DirectoryLister + Clone + 'static,
    S: DocumentSource + Clone + 'static,
    C: SettingsStore,
{
    /// Start listing `id` on the blocking pool.
    ///
    /// `None` when no listing is needed: already loaded, already in flight,
    /// or a file.
    pub fn request_expand(
        &mut self,
        id: NodeId,
        result_tx: &mpsc::UnboundedSender<TaskResult>,
    ) -> AppResult<Option<JoinHandle<()>>> {
        let Some(path) = self.tree.begin_load(id)? else {
            return Ok(None);
        };

        Ok(Some(spawn_listing(
            self.tree.lister().clone(),
            id,
            path,
            result_tx.clone(),
        )))
    }

    /// Read a document on the blocking pool. An already open document is
    /// activated directly and no task is spawned.
    pub fn request_open(
        &mut self,
        path: &Path,
        result_tx: &mpsc::UnboundedSender<TaskResult>,
    ) -> AppResult<Option<JoinHandle<()>>> {
        let path = normalize_path(path).map_err(|e| AppError::open_io(path, &e))?;
        if self.preview.get(&path).is_some() {
            self.open_path(&path)?;
            return Ok(None);
        }

        Ok(Some(spawn_document_read(
            self.preview.source().clone(),
            path,
            result_tx.clone(),
        )))
    }

    /// Apply a background result on the owning side.
    pub fn apply_task_result(&mut self, result: TaskResult) -> AppResult<TaskApplied> {
        match result {
            TaskResult::Listing {
                node,
                path,
                outcome,
                elapsed,
            } => {
                debug!(
                    node,
                    elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
                    "Applying listing"
                );
                let outcome = self.tree.complete_load(node, &path, outcome);
                Ok(TaskApplied::Listing { node, outcome })
            }

            TaskResult::Document { path, result } => {
                let content = result?;
                let rollback = self.rollback_point(&path);
                let document = self.preview.open_with_content(&path, content);
                self.after_open(document, rollback).map(TaskApplied::Opened)
            }
        }
    }
}

/// Tab state captured before an open, restored when the open is undone.
struct OpenRollback {
    fresh: bool,
    previous_active: Option<PathBuf>,
}

/// Absolute form of `path` with `.` and `..` resolved lexically.
fn normalize_path(path: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut normalized = PathBuf::new();

    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }

    Ok(normalized)
}

fn is_open_error(err: &AppError) -> bool {
    matches!(
        err,
        AppError::OpenFailed { .. } | AppError::NotFound(_) | AppError::PermissionDenied(_)
    )
}

fn validate_font(family: &str) -> AppResult<String> {
    let family = family.trim();

    if family.is_empty() {
        return Err(AppError::invalid_input("font_family", "must not be empty"));
    }

    Ok(family.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mem_lister::MemLister;
    use crate::model::navigator::NavOutcome;
    use crate::preview::coordinator::MemSource;
    use std::sync::Arc;

    type TestSession = ViewerSession<Arc<MemLister>, Arc<MemSource>, Config>;

    const FILES: [&str; 4] = [
        "/vol/Docs/a.md",
        "/vol/Docs/b.md",
        "/vol/Docs/Guides/intro.md",
        "/vol/Readme.md",
    ];

    fn session_with(config: Config) -> (Arc<MemLister>, Arc<MemSource>, TestSession) {
        let lister = Arc::new(MemLister::new());
        let source = Arc::new(MemSource::new());
        for file in FILES {
            lister.add_file(file);
            source.put(file, format!("# {file}\n\n## Section\n"));
        }

        let session = ViewerSession::new(Arc::clone(&lister), Arc::clone(&source), config);
        (lister, source, session)
    }

    fn session() -> (Arc<MemLister>, Arc<MemSource>, TestSession) {
        session_with(Config::default())
    }

    fn vol() -> RootMode {
        RootMode::Folder(PathBuf::from("/vol"))
    }

    fn selected_name(session: &TestSession) -> String {
        let id = session.tree().selected().unwrap();
        session.tree().node(id).unwrap().name.to_string()
    }

    #[test]
    fn test_startup_opens_markdown_argument() {
        let (_lister, _source, mut session) = session();

        let outcome = session
            .startup(vol(), Some(Path::new("/vol/Docs/b.md")))
            .unwrap();

        let StartupOutcome::OpenedArgument(report) = outcome else {
            panic!("Expected argument to open, got {outcome:?}");
        };
        assert!(report.navigation.is_synced());
        assert_eq!(selected_name(&session), "b.md");
        assert_eq!(
            session.settings().last_file(),
            Some(Path::new("/vol/Docs/b.md"))
        );
    }

    #[test]
    fn test_startup_restores_last_file_when_argument_unusable() {
        let mut config = Config::default();
        config.record_current_file(Path::new("/vol/Readme.md"));
        let (_lister, _source, mut session) = session_with(config);

        let outcome = session
            .startup(vol(), Some(Path::new("/vol/notes.txt")))
            .unwrap();

        assert!(matches!(outcome, StartupOutcome::RestoredFile(_)));
        assert_eq!(selected_name(&session), "Readme.md");
    }

    #[test]
    fn test_startup_falls_back_to_last_path() {
        let mut config = Config::default();
        config.record_current_file(Path::new("/vol/Docs/deleted.md"));
        config.record_selected_path(Path::new("/vol/Docs/Guides"));
        let (_lister, source, mut session) = session_with(config);

        let outcome = session.startup(vol(), None).unwrap();

        let StartupOutcome::RestoredPath(navigation) = outcome else {
            panic!("Expected path restore, got {outcome:?}");
        };
        assert!(navigation.is_synced());
        assert_eq!(selected_name(&session), "Guides");
        assert!(session.preview().is_empty());
        assert_eq!(source.reads(), 1);
    }

    #[test]
    fn test_startup_with_nothing_to_restore() {
        let (_lister, _source, mut session) = session();

        assert!(matches!(
            session.startup(vol(), None).unwrap(),
            StartupOutcome::Empty
        ));
        assert_eq!(session.tree().roots().len(), 1);
    }

    #[test]
    fn test_external_open_matches_user_open() {
        let (_lister, source, mut session) = session();
        session.startup(vol(), None).unwrap();

        let first = session.open_path(Path::new("/vol/Docs/a.md")).unwrap();
        let second = session
            .handle_external_open(Path::new("/vol/Docs/a.md"))
            .unwrap();

        assert!(Arc::ptr_eq(&first.document, &second.document));
        assert_eq!(first.navigation.outcome, second.navigation.outcome);
        assert_eq!(source.reads(), 1);
        assert_eq!(session.navigator().pending(), None);
    }

    #[test]
    fn test_open_outside_roots_still_opens() {
        let (_lister, source, mut session) = session();
        source.put("/elsewhere/x.md", "# X");
        session.startup(vol(), None).unwrap();

        let report = session.open_path(Path::new("/elsewhere/x.md")).unwrap();

        assert_eq!(report.navigation.outcome, NavOutcome::RootNotFound);
        assert_eq!(session.preview().len(), 1);
    }

    #[test]
    fn test_failed_open_changes_nothing() {
        let (_lister, _source, mut session) = session();
        session.startup(vol(), None).unwrap();

        let err = session.open_path(Path::new("/vol/missing.md")).unwrap_err();

        assert!(err.is_not_found());
        assert!(session.preview().is_empty());
        assert_eq!(session.settings().last_file(), None);
    }

    #[test]
    fn test_select_node_opens_files_and_toggles_dirs() {
        let (lister, _source, mut session) = session();
        session.startup(vol(), None).unwrap();
        let root = session.tree().roots()[0];

        let outcome = session.select_node(root).unwrap();
        assert!(matches!(
            outcome,
            SelectOutcome::Toggled(ExpandOutcome::Loaded { children: 2 })
        ));

        let readme = session.tree().find_child(root, "Readme.md").unwrap();
        let SelectOutcome::Opened(doc) = session.select_node(readme).unwrap() else {
            panic!("Expected file open");
        };
        assert_eq!(doc.title.as_str(), "Readme.md");
        assert_eq!(session.tree().selected(), Some(readme));

        assert!(matches!(
            session.select_node(root).unwrap(),
            SelectOutcome::Toggled(ExpandOutcome::Collapsed)
        ));
        assert_eq!(lister.calls(), 1);
    }

    #[test]
    fn test_close_and_sync_follow_active_tab() {
        let (_lister, _source, mut session) = session();
        session.startup(vol(), None).unwrap();
        session.open_path(Path::new("/vol/Docs/a.md")).unwrap();
        session.open_path(Path::new("/vol/Readme.md")).unwrap();

        assert!(session.activate_document(Path::new("/vol/Docs/a.md")));
        assert_eq!(
            session.settings().last_file(),
            Some(Path::new("/vol/Docs/a.md"))
        );
        assert_eq!(selected_name(&session), "a.md");

        session.close_document(Path::new("/vol/Docs/a.md"));
        assert_eq!(
            session.settings().last_file(),
            Some(Path::new("/vol/Readme.md"))
        );
        assert_eq!(selected_name(&session), "Readme.md");

        let navigation = session.sync_to_active().unwrap().unwrap();
        assert!(navigation.is_synced());
        assert_eq!(selected_name(&session), "Readme.md");

        assert_eq!(
            session.close_document(Path::new("/vol/Readme.md")),
            CloseOutcome::Closed { new_active: None }
        );
        assert_eq!(session.tree().selected(), None);
        assert!(session.sync_to_active().unwrap().is_none());
        assert!(session.active_html().is_none());
    }

    #[test]
    fn test_open_resolves_parent_components() {
        let (_lister, source, mut session) = session();
        session.startup(vol(), None).unwrap();

        let report = session
            .open_path(Path::new("/vol/Docs/./../Readme.md"))
            .unwrap();

        assert_eq!(report.document.path, PathBuf::from("/vol/Readme.md"));
        assert!(report.navigation.is_synced());
        assert_eq!(selected_name(&session), "Readme.md");
        assert_eq!(
            session.settings().last_file(),
            Some(Path::new("/vol/Readme.md"))
        );

        session.open_path(Path::new("/vol/Readme.md")).unwrap();
        assert_eq!(session.preview().len(), 1);
        assert_eq!(source.reads(), 1);
    }

    #[test]
    fn test_startup_argument_with_parent_components() {
        let (_lister, _source, mut session) = session();

        let outcome = session
            .startup(vol(), Some(Path::new("/vol/Docs/Guides/../b.md")))
            .unwrap();

        let StartupOutcome::OpenedArgument(report) = outcome else {
            panic!("Expected the argument to open");
        };
        assert_eq!(report.document.path, PathBuf::from("/vol/Docs/b.md"));
        assert_eq!(selected_name(&session), "b.md");
    }

    #[test]
    fn test_unrevealable_document_is_not_kept() {
        let (_lister, _source, mut session) = session();
        session.startup(vol(), None).unwrap();
        session.open_path(Path::new("/vol/Readme.md")).unwrap();

        let result = session.apply_task_result(TaskResult::Document {
            path: PathBuf::from("relative/notes.md"),
            result: Ok("# Notes".to_string()),
        });

        assert!(matches!(result, Err(AppError::NavigationFailed { .. })));
        assert_eq!(session.preview().len(), 1);
        assert_eq!(
            session.preview().active_path(),
            Some(Path::new("/vol/Readme.md"))
        );
        assert_eq!(
            session.settings().last_file(),
            Some(Path::new("/vol/Readme.md"))
        );
    }

    #[test]
    fn test_reload_active_picks_up_changes() {
        let (_lister, source, mut session) = session();
        session.startup(vol(), None).unwrap();
        session.open_path(Path::new("/vol/Readme.md")).unwrap();
        assert_eq!(session.active_outline().unwrap().len(), 2);

        source.put("/vol/Readme.md", "# Only");
        let doc = session.reload_active().unwrap().unwrap();

        assert_eq!(doc.version, 2);
        assert_eq!(session.active_outline().unwrap().len(), 1);
        assert!(session.active_html().unwrap().contains("id=\"only\""));
    }

    #[test]
    fn test_refresh_node_sees_new_files() {
        let (lister, _source, mut session) = session();
        session.startup(vol(), None).unwrap();
        session.open_path(Path::new("/vol/Docs/a.md")).unwrap();
        let root = session.tree().roots()[0];
        let docs = session.tree().find_child(root, "Docs").unwrap();

        lister.add_file("/vol/Docs/c.md");
        session.refresh_node(docs).unwrap();

        assert!(session.tree().find_child(docs, "c.md").is_some());
        assert_eq!(session.tree().selected(), None);
    }

    #[test]
    fn test_open_folder_reroots_tree() {
        let (_lister, _source, mut session) = session();
        session.startup(vol(), None).unwrap();

        let outcome = session.open_folder(Path::new("/vol/Docs")).unwrap();

        assert_eq!(outcome, ExpandOutcome::Loaded { children: 3 });
        assert_eq!(
            session.root_mode(),
            &RootMode::Folder(PathBuf::from("/vol/Docs"))
        );
        assert_eq!(selected_name(&session), "/vol/Docs");
    }

    #[test]
    fn test_settings_updates() {
        let (_lister, _source, mut session) = session();

        assert_eq!(session.zoom_in(), 110);
        assert_eq!(session.zoom_out(), 100);
        assert_eq!(session.zoom_out(), 90);
        assert_eq!(session.reset_zoom(), 100);

        session.set_font("  Inter ").unwrap();
        session.set_code_font("Fira Code").unwrap();
        assert!(session.set_font("   ").is_err());

        let config = session.into_settings();
        assert_eq!(config.appearance.font_family, "Inter");
        assert_eq!(config.appearance.code_font_family, "Fira Code");
    }

    #[tokio::test]
    async fn test_background_expand_and_open() {
        let (lister, source, mut session) = session();
        session.startup(vol(), None).unwrap();
        let root = session.tree().roots()[0];
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = session.request_expand(root, &tx).unwrap().unwrap();
        assert!(session.request_expand(root, &tx).unwrap().is_none());
        handle.await.unwrap();

        let applied = session.apply_task_result(rx.recv().await.unwrap()).unwrap();
        assert!(matches!(
            applied,
            TaskApplied::Listing {
                outcome: ExpandOutcome::Loaded { children: 2 },
                ..
            }
        ));
        assert_eq!(lister.calls(), 1);

        session
            .request_open(Path::new("/vol/Docs/b.md"), &tx)
            .unwrap()
            .unwrap()
            .await
            .unwrap();
        let TaskApplied::Opened(report) =
            session.apply_task_result(rx.recv().await.unwrap()).unwrap()
        else {
            panic!("Expected an opened document");
        };
        assert!(report.navigation.is_synced());
        assert_eq!(selected_name(&session), "b.md");

        assert!(
            session
                .request_open(Path::new("/vol/Docs/b.md"), &tx)
                .unwrap()
                .is_none()
        );
        assert_eq!(source.reads(), 1);
    }
}
