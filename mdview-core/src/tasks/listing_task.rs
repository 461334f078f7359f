//! ``src/tasks/listing_task.rs``
//! ============================================================================
//! # Listing Task: Off-Thread Directory Listings and Document Reads
//!
//! Filesystem calls run on tokio's blocking pool; results come back to the
//! owner of the tree and the tabs as [`TaskResult`] values over an unbounded
//! channel. The owner applies them with `TreeStore::complete_load` or
//! `PreviewCoordinator::open_with_content`, so no state is shared across
//! threads.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::{self as TokioScheduler, JoinError, JoinHandle};
use tracing::{Instrument, info, warn};

use crate::error::AppError;
use crate::fs::dir_lister::{DirectoryLister, ListOutcome};
use crate::model::tree::NodeId;
use crate::preview::coordinator::DocumentSource;

/// Result of a background task, applied by the state owner.
#[derive(Debug)]
pub enum TaskResult {
    /// A directory listing for `node`, requested via `TreeStore::begin_load`.
    Listing {
        node: NodeId,
        path: PathBuf,
        outcome: ListOutcome,
        elapsed: Duration,
    },

    /// Text of a document requested for opening.
    Document {
        path: PathBuf,
        result: Result<String, AppError>,
    },
}

/// List `path` on the blocking pool and report it for `node`.
///
/// A worker panic is reported as a failed listing so the node's loading
/// flag is always cleared.
pub fn spawn_listing<L>(
    lister: L,
    node: NodeId,
    path: PathBuf,
    result_tx: mpsc::UnboundedSender<TaskResult>,
) -> JoinHandle<()>
where
    L: DirectoryLister + Clone + 'static,
{
    let path_display: String = path.display().to_string();

    tokio::spawn(
        async move {
            let task_start: Instant = Instant::now();
            let path_for_list: PathBuf = path.clone();

            let result: Result<ListOutcome, JoinError> =
                TokioScheduler::spawn_blocking(move || -> ListOutcome {
                    lister.list(&path_for_list)
                })
                .await;

            let outcome: ListOutcome = result.unwrap_or_else(|e: JoinError| -> ListOutcome {
                warn!(
                    marker = "LISTING_TASK",
                    path = %path.display(),
                    error = %e,
                    "Listing worker failed"
                );
                ListOutcome::Failed(e.to_string())
            });

            let elapsed: Duration = task_start.elapsed();
            info!(
                marker = "LISTING_TASK",
                node,
                entries = outcome.entries().len(),
                duration_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
                "Background listing finished"
            );

            if result_tx
                .send(TaskResult::Listing {
                    node,
                    path,
                    outcome,
                    elapsed,
                })
                .is_err()
            {
                warn!(marker = "LISTING_TASK", node, "Result receiver dropped");
            }
        }
        .instrument(tracing::info_span!(
            "directory_listing",
            operation_type = "directory_listing",
            path = %path_display
        )),
    )
}

/// Read a document on the blocking pool.
pub fn spawn_document_read<S>(
    source: S,
    path: PathBuf,
    result_tx: mpsc::UnboundedSender<TaskResult>,
) -> JoinHandle<()>
where
    S: DocumentSource + Clone + 'static,
{
    let path_display: String = path.display().to_string();

    tokio::spawn(
        async move {
            let path_for_read: PathBuf = path.clone();

            let joined = TokioScheduler::spawn_blocking(move || source.read(&path_for_read)).await;

            let result: Result<String, AppError> = match joined {
                Ok(Ok(content)) => Ok(content),
                Ok(Err(e)) => Err(AppError::open_io(&path, &e)),
                Err(e) => Err(AppError::open_failed(&path, e.to_string())),
            };

            if let Err(e) = &result {
                warn!(marker = "DOCUMENT_READ", error = %e, "Document read failed");
            }

            if result_tx.send(TaskResult::Document { path, result }).is_err() {
                warn!(marker = "DOCUMENT_READ", "Result receiver dropped");
            }
        }
        .instrument(tracing::info_span!(
            "document_read",
            operation_type = "document_read",
            path = %path_display
        )),
    )
}
