//! Tool directory watcher
//!
//! Observes the tools directory with `notify-debouncer-full` and reports
//! settled changes.
//!
//! ```text
//! debouncer thread ──batch of paths──▶ mpsc ──▶ settle task ──▶ on_change(ToolChange)
//! ```
//!
//! The debouncer only says which paths went quiet. Each path's
//! [`ChangeKind`] is decided from the filesystem as it is *now* and from
//! whether the watcher already knew the file. A delete followed by a
//! re-create inside the window therefore surfaces as a single `Modified`,
//! never as a lost `Removed`.

use crate::tools::is_ignored;
use notify::{EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{DebounceEventResult, Debouncer, RecommendedCache, new_debouncer};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default debounce window
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Removed => "removed",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A settled change to one file of the tools directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("Tool directory does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("Failed to create file watcher: {0}")]
    Init(#[source] notify::Error),

    #[error("Failed to watch {}: {source}", path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Running observation of a tools directory.
///
/// Dropping the watcher stops observation; [`stop`](Self::stop) additionally
/// waits until the settle task has exited, after which no callback fires.
pub struct ToolWatcher {
    directory: PathBuf,
    debouncer: Option<Debouncer<RecommendedWatcher, RecommendedCache>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ToolWatcher {
    /// Start watching `directory`, treating the files already in it as known.
    ///
    /// Must be called within a tokio runtime. `on_change` runs on the settle
    /// task, one change at a time.
    pub fn start<F>(
        directory: impl AsRef<Path>,
        debounce: Duration,
        on_change: F,
    ) -> Result<Self, WatcherError>
    where
        F: Fn(ToolChange) + Send + Sync + 'static,
    {
        let directory = watched_directory(directory.as_ref())?;
        let known = existing_files(&directory);
        Self::spawn(directory, debounce, known, on_change)
    }

    /// Start watching `directory` from the files a consumer already holds.
    ///
    /// Once observation is armed, files on disk missing from `known` are
    /// reported as `Added` and known files gone from disk as `Removed`, so
    /// nothing written between the consumer's scan and this call is lost.
    pub fn start_from<F>(
        directory: impl AsRef<Path>,
        debounce: Duration,
        known: impl IntoIterator<Item = PathBuf>,
        on_change: F,
    ) -> Result<Self, WatcherError>
    where
        F: Fn(ToolChange) + Send + Sync + 'static,
    {
        let directory = watched_directory(directory.as_ref())?;
        Self::spawn(directory, debounce, known.into_iter().collect(), on_change)
    }

    fn spawn<F>(
        directory: PathBuf,
        debounce: Duration,
        known: HashSet<PathBuf>,
        on_change: F,
    ) -> Result<Self, WatcherError>
    where
        F: Fn(ToolChange) + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<Vec<PathBuf>>();
        let watched = directory.clone();
        let forward = tx.clone();
        let mut debouncer = new_debouncer(debounce, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    let paths: BTreeSet<PathBuf> = events
                        .iter()
                        .filter(|event| !matches!(event.kind, EventKind::Access(_)))
                        .flat_map(|event| event.paths.iter())
                        .filter(|path| path.parent() == Some(watched.as_path()) && !is_ignored(path))
                        .cloned()
                        .collect();
                    if !paths.is_empty() {
                        // Receiver gone means the watcher is shutting down
                        let _ = forward.send(paths.into_iter().collect());
                    }
                }
                Err(errors) => {
                    for error in errors {
                        warn!(error = %error, "File watcher error");
                    }
                }
            }
        })
        .map_err(WatcherError::Init)?;

        debouncer
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(|source| WatcherError::Watch {
                path: directory.clone(),
                source,
            })?;

        // Armed: anything that differs from `known` from here on is either
        // in this batch or in a later debounced one.
        let on_disk = existing_files(&directory);
        let mut drift: Vec<PathBuf> = on_disk.symmetric_difference(&known).cloned().collect();
        if !drift.is_empty() {
            drift.sort();
            debug!(path = %directory.display(), files = drift.len(), "Reconciling tool files changed before watch");
            let _ = tx.send(drift);
        }
        drop(tx);

        let cancel = CancellationToken::new();
        let task = tokio::spawn(settle_loop(rx, cancel.clone(), known, on_change));

        info!(path = %directory.display(), debounce_ms = debounce.as_millis() as u64, "Watching tool directory");

        Ok(Self {
            directory,
            debouncer: Some(debouncer),
            cancel,
            task: Some(task),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Stop observing and wait for the settle task to finish.
    pub async fn stop(mut self) {
        self.debouncer.take();
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
            && e.is_panic()
        {
            warn!("Tool watcher task panicked");
        }
        debug!(path = %self.directory.display(), "Tool watcher stopped");
    }
}

impl Drop for ToolWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn watched_directory(directory: &Path) -> Result<PathBuf, WatcherError> {
    let canonical = directory
        .canonicalize()
        .map_err(|_| WatcherError::MissingDirectory(directory.to_path_buf()))?;
    if !canonical.is_dir() {
        return Err(WatcherError::MissingDirectory(canonical));
    }
    Ok(canonical)
}

fn existing_files(directory: &Path) -> HashSet<PathBuf> {
    std::fs::read_dir(directory)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file() && !is_ignored(p))
                .collect()
        })
        .unwrap_or_default()
}

/// Decide what a settled path means, from what is on disk now and whether
/// the watcher already knew the file.
fn classify(exists: bool, known: bool) -> Option<ChangeKind> {
    match (exists, known) {
        (true, true) => Some(ChangeKind::Modified),
        (true, false) => Some(ChangeKind::Added),
        (false, true) => Some(ChangeKind::Removed),
        (false, false) => None,
    }
}

async fn settle_loop<F>(
    mut rx: mpsc::UnboundedReceiver<Vec<PathBuf>>,
    cancel: CancellationToken,
    mut known: HashSet<PathBuf>,
    on_change: F,
) where
    F: Fn(ToolChange) + Send + Sync + 'static,
{
    loop {
        let batch = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            received = rx.recv() => match received {
                Some(batch) => batch,
                None => break,
            },
        };

        for path in batch {
            if cancel.is_cancelled() {
                return;
            }
            // Subdirectories are not tool units
            if path.is_dir() {
                continue;
            }
            let exists = path.is_file();
            let Some(kind) = classify(exists, known.contains(&path)) else {
                continue;
            };
            if exists {
                known.insert(path.clone());
            } else {
                known.remove(&path);
            }
            debug!(path = %path.display(), kind = %kind, "Tool file settled");
            on_change(ToolChange { path, kind });
        }
    }
}
