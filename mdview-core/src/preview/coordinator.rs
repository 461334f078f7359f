//! ``src/preview/coordinator.rs``
//! ============================================================================
//! # `PreviewCoordinator`: Open Documents and the Active Tab
//!
//! Keeps the open documents in tab order, tracks which one is active and
//! caches the rendered HTML and outline of each content version. Opening a
//! path that is already open re-activates its tab without touching the disk.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use compact_str::CompactString;
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::model::tree::paths_equal;
use crate::preview::render::{CmarkRenderer, Heading, MarkdownRenderer};

/// Where document text comes from.
pub trait DocumentSource: Send + Sync {
    fn read(&self, path: &Path) -> io::Result<String>;
}

/// Reads documents from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

impl DocumentSource for FsSource {
    fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

impl<S: DocumentSource + ?Sized> DocumentSource for Arc<S> {
    fn read(&self, path: &Path) -> io::Result<String> {
        (**self).read(path)
    }
}

/// In-memory document source with a read counter.
#[derive(Debug, Default)]
pub struct MemSource {
    files: Mutex<HashMap<PathBuf, String>>,
    reads: AtomicUsize,
}

impl MemSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, path: impl Into<PathBuf>, content: impl Into<String>) -> &Self {
        self.files.lock().insert(path.into(), content.into());
        self
    }

    pub fn delete(&self, path: impl AsRef<Path>) -> &Self {
        self.files.lock().remove(path.as_ref());
        self
    }

    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

impl DocumentSource for MemSource {
    fn read(&self, path: &Path) -> io::Result<String> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.files.lock().get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display()))
        })
    }
}

/// One open tab. Immutable; a reload produces a new version.
#[derive(Debug)]
pub struct Document {
    /// Stable for the lifetime of the tab, across reloads.
    pub id: u64,
    pub path: PathBuf,
    pub title: CompactString,
    pub content: Arc<str>,
    pub version: u32,
    rendered: OnceCell<String>,
    headings: OnceCell<Vec<Heading>>,
}

impl Document {
    fn new(id: u64, path: PathBuf, content: String, version: u32) -> Self {
        let title = path
            .file_name()
            .and_then(OsStr::to_str)
            .map_or_else(|| CompactString::new(path.display().to_string()), CompactString::new);

        Self {
            id,
            path,
            title,
            content: Arc::from(content),
            version,
            rendered: OnceCell::new(),
            headings: OnceCell::new(),
        }
    }
}

/// Shared handle to an open document. Re-opening an open path hands out a
/// clone of the same handle.
pub type DocumentHandle = Arc<Document>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    NotOpen,

    /// The tab is gone. `new_active` is the tab now active (unchanged when
    /// an inactive tab was closed).
    Closed { new_active: Option<PathBuf> },
}

#[derive(Debug)]
pub struct PreviewCoordinator<R: MarkdownRenderer = CmarkRenderer, S: DocumentSource = FsSource> {
    renderer: R,
    source: S,
    documents: IndexMap<PathBuf, DocumentHandle>,
    active: Option<PathBuf>,
    next_id: u64,
}

impl PreviewCoordinator {
    /// Filesystem-backed coordinator with the default renderer.
    #[must_use]
    pub fn with_fs() -> Self {
        Self::new(CmarkRenderer::new(), FsSource)
    }
}

impl<R: MarkdownRenderer, S: DocumentSource> PreviewCoordinator<R, S> {
    #[must_use]
    pub fn new(renderer: R, source: S) -> Self {
        Self {
            renderer,
            source,
            documents: IndexMap::new(),
            active: None,
            next_id: 1,
        }
    }

    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Key under which `path` is stored, tolerating case differences.
    fn key_of(&self, path: &Path) -> Option<usize> {
        self.documents.get_index_of(path).or_else(|| -> Option<usize> {
            self.documents
                .keys()
                .position(|key: &PathBuf| -> bool { paths_equal(key, path) })
        })
    }

    /// Open `path` as a tab and make it active.
    ///
    /// An already open document is returned as is, without re-reading it.
    /// A read failure leaves the tab list unchanged.
    pub fn open(&mut self, path: &Path) -> AppResult<DocumentHandle> {
        if let Some(index) = self.key_of(path) {
            let (key, handle) = self
                .documents
                .get_index(index)
                .ok_or_else(|| AppError::Other(format!("tab index {index} vanished")))?;
            debug!("Document already open: {}", key.display());

            let handle = Arc::clone(handle);
            self.active = Some(key.clone());
            return Ok(handle);
        }

        let content = self
            .source
            .read(path)
            .map_err(|e: io::Error| -> AppError { AppError::open_io(path, &e) })?;

        Ok(self.insert(path, content))
    }

    /// Store content read elsewhere (background read) as an open tab.
    ///
    /// When the path is already open the existing handle wins.
    pub fn open_with_content(&mut self, path: &Path, content: String) -> DocumentHandle {
        if let Some(index) = self.key_of(path)
            && let Some((key, handle)) = self.documents.get_index(index)
        {
            let handle = Arc::clone(handle);
            self.active = Some(key.clone());
            return handle;
        }

        self.insert(path, content)
    }

    fn insert(&mut self, path: &Path, content: String) -> DocumentHandle {
        let id = self.next_id;
        self.next_id += 1;

        let handle: DocumentHandle = Arc::new(Document::new(id, path.to_path_buf(), content, 1));
        info!(
            marker = "DOCUMENT_OPEN",
            path = %path.display(),
            bytes = handle.content.len(),
            tabs = self.documents.len() + 1,
            "Document opened"
        );

        self.documents.insert(path.to_path_buf(), Arc::clone(&handle));
        self.active = Some(path.to_path_buf());
        handle
    }

    /// Re-read an open document, dropping its cached render.
    ///
    /// `Ok(None)` when the path is not open. On a read failure the previous
    /// content stays.
    pub fn reload(&mut self, path: &Path) -> AppResult<Option<DocumentHandle>> {
        let Some(index) = self.key_of(path) else {
            return Ok(None);
        };

        let Some((key, old)) = self.documents.get_index(index) else {
            return Ok(None);
        };
        let key = key.clone();
        let (id, version) = (old.id, old.version);

        let content = self
            .source
            .read(&key)
            .map_err(|e: io::Error| -> AppError { AppError::open_io(&key, &e) })?;

        let handle: DocumentHandle = Arc::new(Document::new(id, key.clone(), content, version + 1));
        debug!(
            path = %key.display(),
            version = handle.version,
            "Document reloaded"
        );

        if let Some(slot) = self.documents.get_index_mut(index) {
            *slot.1 = Arc::clone(&handle);
        }
        Ok(Some(handle))
    }

    /// Close a tab. When the active tab closes, the tab now at its index (or
    /// the new last tab) becomes active.
    pub fn close(&mut self, path: &Path) -> CloseOutcome {
        let Some(index) = self.key_of(path) else {
            return CloseOutcome::NotOpen;
        };

        let Some((key, _)) = self.documents.shift_remove_index(index) else {
            return CloseOutcome::NotOpen;
        };

        let was_active = self
            .active
            .as_deref()
            .is_some_and(|active: &Path| -> bool { active == key.as_path() });

        if was_active {
            self.active = if self.documents.is_empty() {
                None
            } else {
                let next = index.min(self.documents.len() - 1);
                self.documents.get_index(next).map(|(p, _)| p.clone())
            };
        }

        info!(
            marker = "DOCUMENT_CLOSE",
            path = %key.display(),
            tabs = self.documents.len(),
            "Document closed"
        );

        CloseOutcome::Closed {
            new_active: self.active.clone(),
        }
    }

    /// Make an open document active. Returns `false` when it is not open.
    pub fn activate(&mut self, path: &Path) -> bool {
        match self.key_of(path).and_then(|i| self.documents.get_index(i)) {
            Some((key, _)) => {
                self.active = Some(key.clone());
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn active(&self) -> Option<&DocumentHandle> {
        self.active
            .as_ref()
            .and_then(|path: &PathBuf| -> Option<&DocumentHandle> { self.documents.get(path) })
    }

    #[must_use]
    pub fn active_path(&self) -> Option<&Path> {
        self.active.as_deref()
    }

    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&DocumentHandle> {
        self.key_of(path)
            .and_then(|i| self.documents.get_index(i))
            .map(|(_, handle)| handle)
    }

    /// Open documents in tab order.
    pub fn documents(&self) -> impl ExactSizeIterator<Item = &DocumentHandle> + '_ {
        self.documents.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Rendered HTML of an open document, computed once per version.
    #[must_use]
    pub fn rendered(&self, path: &Path) -> Option<&str> {
        let doc = self.get(path)?;

        Some(
            doc.rendered
                .get_or_init(|| self.renderer.render_to_html(&doc.content))
                .as_str(),
        )
    }

    /// Outline of an open document, computed once per version.
    #[must_use]
    pub fn outline(&self, path: &Path) -> Option<&[Heading]> {
        let doc = self.get(path)?;

        Some(
            doc.headings
                .get_or_init(|| self.renderer.headings(&doc.content))
                .as_slice(),
        )
    }

    /// Outline of arbitrary Markdown, using the same anchors as rendering.
    #[must_use]
    pub fn extract_headings(&self, source: &str) -> Vec<Heading> {
        self.renderer.headings(source)
    }
}
