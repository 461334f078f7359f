pub mod error;

pub mod config;
pub use config::{Config, SettingsStore};

pub mod fs {
    pub mod entry;
    pub use entry::{DirEntryInfo, EntryKind, is_hidden_name, is_markdown_name, is_markdown_path};

    pub mod dir_lister;
    pub use dir_lister::{DirectoryLister, EntryError, FsLister, ListOutcome, list_dir, mounted_roots};

    pub mod mem_lister;
    pub use mem_lister::MemLister;
}

pub mod model {
    pub mod tree;
    pub use tree::{Children, ExpandOutcome, NodeId, RootMode, TreeNode, TreeStore, VisibleRow};

    pub mod navigator;
    pub use navigator::{NavOutcome, Navigation, PathNavigator};
}

pub mod preview {
    pub mod render;
    pub use render::{CmarkRenderer, Heading, MarkdownRenderer};

    pub mod coordinator;
    pub use coordinator::{
        CloseOutcome, Document, DocumentHandle, DocumentSource, FsSource, MemSource,
        PreviewCoordinator,
    };
}

pub mod tasks {
    pub mod listing_task;
    pub use listing_task::{TaskResult, spawn_document_read, spawn_listing};
}

pub mod session;
pub use session::ViewerSession;

pub mod logging;

pub use error::{AppError, AppResult};
