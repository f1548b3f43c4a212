//! Sequential download orchestrator
//!
//! The [`DownloadQueue`] owns the download list and at most one active
//! transfer. It is driven by the event loop: user commands, metadata loads,
//! transfer completions and progress ticks each call one method, and every
//! state change happens inside that call.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::QueueConfig;
use super::ordering::sort_tasks;
use super::progress::RateCalculator;
use super::transfer::{TransferControl, Transferer};
use super::types::{DownloadTask, TaskStatus};
use crate::app::catalog::CatalogSource;
use crate::app::events::{send, AppEvent, EventSender};
use crate::app::models::CatalogItem;
use crate::app::session::Session;
use crate::errors::{
    CatalogResult, QueueError, QueueResult, Result, StoreResult, TransferError, TransferResult,
};

/// Tokens are unique per process, so results addressed to an earlier queue
/// or an earlier attempt can never match a current one.
static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

fn next_token() -> u64 {
    NEXT_TOKEN.fetch_add(1, AtomicOrdering::Relaxed)
}

struct ActiveTransfer {
    item_id: String,
    attempt: u64,
    control: TransferControl,
    rate: RateCalculator,
    waiter: JoinHandle<()>,
}

/// Counts of tasks per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueSummary {
    pub total: usize,
    pub waiting: usize,
    pub downloading: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Ordered worklist with a single active transfer
pub struct DownloadQueue {
    tasks: Vec<DownloadTask>,
    active: Option<ActiveTransfer>,
    generation: u64,
    loaded: bool,
    auto_advance: bool,
    source: Arc<dyn CatalogSource>,
    transferer: Arc<dyn Transferer>,
    config: QueueConfig,
    events: EventSender,
}

impl DownloadQueue {
    pub fn new(
        source: Arc<dyn CatalogSource>,
        transferer: Arc<dyn Transferer>,
        config: QueueConfig,
        events: EventSender,
    ) -> Self {
        Self {
            tasks: Vec::new(),
            active: None,
            generation: next_token(),
            loaded: false,
            auto_advance: true,
            source,
            transferer,
            config,
            events,
        }
    }

    /// Tasks in display order
    pub fn tasks(&self) -> &[DownloadTask] {
        &self.tasks
    }

    pub fn task(&self, item_id: &str) -> Option<&DownloadTask> {
        self.tasks.iter().find(|task| task.item_id() == item_id)
    }

    /// Item with the active transfer
    pub fn active_item(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.item_id.as_str())
    }

    /// Whether the task list has been built
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Whether tasks are picked automatically
    pub fn auto_advance(&self) -> bool {
        self.auto_advance
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn summary(&self) -> QueueSummary {
        self.tasks
            .iter()
            .fold(QueueSummary::default(), |mut summary, task| {
                summary.total += 1;
                match task.status {
                    TaskStatus::NotStarted => summary.waiting += 1,
                    TaskStatus::Downloading { .. } => summary.downloading += 1,
                    TaskStatus::Completed { .. } => summary.completed += 1,
                    TaskStatus::Failed { .. } => summary.failed += 1,
                }
                summary
            })
    }

    /// Whether nothing is running and nothing more will start on its own
    ///
    /// Failed tasks that still have automatic retries left keep the queue
    /// unsettled.
    pub fn is_settled(&self) -> bool {
        if !self.loaded || self.active.is_some() {
            return false;
        }
        if !self.auto_advance {
            return true;
        }
        !self.tasks.iter().any(|task| {
            task.status.is_not_started()
                || (task.status.is_failed() && task.failures <= self.config.max_retries)
        })
    }

    /// Build the task list from the session
    ///
    /// Metadata for the selected and the downloaded ids is fetched in the
    /// background and arrives as [`AppEvent::QueueLoaded`]. With nothing
    /// selected or downloaded the list is empty at once and nothing is
    /// fetched.
    pub fn activate(&mut self, session: &Session) {
        let mut ids = session.selection().values();
        ids.extend(session.downloaded().ids());
        let mut seen = HashSet::new();
        ids.retain(|id| seen.insert(id.clone()));

        if ids.is_empty() {
            info!("Nothing selected, download list is empty");
            self.tasks.clear();
            self.loaded = true;
            return;
        }

        let generation = self.generation;
        let source = Arc::clone(&self.source);
        let events = self.events.clone();
        debug!("Fetching metadata for {} items", ids.len());
        tokio::spawn(async move {
            let result = source.fetch_metadata(&ids).await;
            send(&events, AppEvent::QueueLoaded { generation, result });
        });
    }

    /// Apply fetched metadata and start the first task
    pub fn load(
        &mut self,
        generation: u64,
        result: CatalogResult<Vec<CatalogItem>>,
        session: &Session,
    ) -> CatalogResult<()> {
        if generation != self.generation {
            debug!("Ignoring metadata for an earlier download list");
            return Ok(());
        }
        let items = result?;

        let mut seen = HashSet::new();
        self.tasks = items
            .into_iter()
            .filter(|item| !item.is_folder)
            .filter(|item| seen.insert(item.id.clone()))
            .map(|item| match session.downloaded().get(&item.id) {
                Some(path) => DownloadTask::completed(item, path.to_path_buf()),
                None => DownloadTask::new(item),
            })
            .collect();
        sort_tasks(&mut self.tasks);
        self.loaded = true;

        let summary = self.summary();
        info!(
            "Download list ready: {} items, {} already downloaded",
            summary.total, summary.completed
        );

        self.advance(session);
        Ok(())
    }

    /// Start a transfer for `item_id`
    ///
    /// A different active transfer is cancelled first. Starting by hand also
    /// resumes automatic advance after a cancel.
    pub fn start(&mut self, item_id: &str, session: &Session) -> QueueResult<()> {
        if !self.loaded {
            return Err(QueueError::NotLoaded);
        }
        if self.active_item() == Some(item_id) {
            return Err(QueueError::AlreadyActive {
                item_id: item_id.to_string(),
            });
        }
        let task = self.task(item_id).ok_or_else(|| QueueError::TaskNotFound {
            item_id: item_id.to_string(),
        })?;
        if task.status.is_completed() {
            debug!("{} is already downloaded", item_id);
            return Ok(());
        }

        self.cancel_active();
        self.auto_advance = true;
        self.launch(item_id, &session.download_root())
    }

    /// Start the next task if nothing is active
    ///
    /// Waiting tasks come first, in display order. A failed task is retried
    /// only once no task is waiting, while it has retries left and after its
    /// backoff.
    pub fn advance(&mut self, session: &Session) {
        if self.active.is_some() || !self.auto_advance || !self.loaded {
            return;
        }

        let root = session.download_root();
        while let Some(item_id) = self.next_candidate(Instant::now()) {
            match self.launch(&item_id, &root) {
                Ok(()) => return,
                Err(e) => warn!("Could not start {}: {}", item_id, e),
            }
        }
    }

    fn next_candidate(&self, now: Instant) -> Option<String> {
        self.tasks
            .iter()
            .find(|task| task.status.is_not_started())
            .or_else(|| {
                self.tasks
                    .iter()
                    .find(|task| task.retry_due(self.config.max_retries, now))
            })
            .map(|task| task.item_id().to_string())
    }

    fn launch(&mut self, item_id: &str, root: &Path) -> QueueResult<()> {
        let index = self.index_of(item_id)?;
        let destination = root.join(&self.tasks[index].destination);

        if let Err(e) = std::fs::create_dir_all(&destination) {
            let error = QueueError::Destination {
                path: destination,
                reason: e.to_string(),
            };
            self.mark_failed(index, error.to_string());
            sort_tasks(&mut self.tasks);
            return Err(error);
        }

        let handle = self
            .transferer
            .begin_transfer(&self.tasks[index].item, &destination);
        let (control, completion) = handle.split();
        let attempt = next_token();

        let events = self.events.clone();
        let finished_id = item_id.to_string();
        let waiter = tokio::spawn(async move {
            let outcome = completion.await.unwrap_or(Err(TransferError::Aborted));
            send(
                &events,
                AppEvent::TransferFinished {
                    item_id: finished_id,
                    attempt,
                    outcome,
                },
            );
        });

        let task = &mut self.tasks[index];
        info!(
            "Downloading {} to {}",
            task.item.display_title(),
            destination.display()
        );
        task.clear_progress();
        task.status = TaskStatus::Downloading {
            started_at: Utc::now(),
        };

        self.active = Some(ActiveTransfer {
            item_id: item_id.to_string(),
            attempt,
            control,
            rate: RateCalculator::new(self.config.rate_window),
            waiter,
        });
        sort_tasks(&mut self.tasks);
        Ok(())
    }

    /// Apply the outcome of a transfer
    ///
    /// Outcomes of cancelled or superseded attempts are ignored. A completed
    /// download is recorded in the session, which is persisted before the
    /// next task starts.
    pub fn handle_finished(
        &mut self,
        item_id: &str,
        attempt: u64,
        outcome: TransferResult<PathBuf>,
        session: &mut Session,
    ) -> StoreResult<()> {
        match &self.active {
            Some(active) if active.attempt == attempt => {}
            _ => {
                debug!("Ignoring outcome of superseded attempt for {}", item_id);
                return Ok(());
            }
        }
        self.active = None;

        let Ok(index) = self.index_of(item_id) else {
            warn!("Transfer finished for unknown item {}", item_id);
            return Ok(());
        };

        match outcome {
            Ok(path) => {
                info!("Downloaded {}", path.display());
                let task = &mut self.tasks[index];
                task.transferred_bytes = task.total_bytes;
                task.bytes_per_second = 0.0;
                task.status = TaskStatus::Completed { path: path.clone() };
                session.record_download(item_id, &path)?;
            }
            Err(e) if e.is_cancellation() => {
                debug!("Transfer of {} cancelled", item_id);
                let task = &mut self.tasks[index];
                task.clear_progress();
                task.status = TaskStatus::NotStarted;
            }
            Err(e) => {
                warn!("Download of {} failed: {}", item_id, e);
                self.mark_failed(index, e.to_string());
            }
        }

        sort_tasks(&mut self.tasks);
        self.advance(session);
        Ok(())
    }

    /// Refresh progress of the active transfer, or look for work when idle
    pub fn tick(&mut self, session: &Session) {
        let Some(active) = self.active.as_mut() else {
            self.advance(session);
            return;
        };

        let (transferred, total) = active.control.progress_snapshot();
        let rate = active.rate.add_sample(transferred);
        let item_id = active.item_id.clone();

        if let Some(task) = self.tasks.iter_mut().find(|t| t.item_id() == item_id) {
            task.transferred_bytes = transferred;
            task.total_bytes = total;
            task.bytes_per_second = rate;
        }
    }

    /// Cancel the transfer of `item_id`
    ///
    /// The task goes back to waiting and automatic advance pauses until the
    /// next manual start.
    pub fn cancel(&mut self, item_id: &str) -> QueueResult<()> {
        self.index_of(item_id)?;
        if self.active_item() == Some(item_id) {
            self.cancel_active();
            self.auto_advance = false;
        }
        Ok(())
    }

    /// Cancel whatever is running and stop advancing
    pub fn cancel_all(&mut self) {
        self.cancel_active();
        self.auto_advance = false;
    }

    /// Delete the local file of a completed task so it can be fetched again
    ///
    /// Returns whether anything was deleted; tasks that are not completed
    /// are left alone.
    pub fn retry_or_delete(&mut self, item_id: &str, session: &mut Session) -> Result<bool> {
        let index = self.index_of(item_id)?;
        if !self.tasks[index].status.is_completed() {
            return Ok(false);
        }

        session.delete_download(item_id)?;
        let task = &mut self.tasks[index];
        task.clear_progress();
        task.failures = 0;
        task.retry_at = None;
        task.status = TaskStatus::NotStarted;
        sort_tasks(&mut self.tasks);
        Ok(true)
    }

    fn cancel_active(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        info!("Cancelling download of {}", active.item_id);
        active.control.cancel();

        if let Ok(index) = self.index_of(&active.item_id) {
            let task = &mut self.tasks[index];
            task.clear_progress();
            task.status = TaskStatus::NotStarted;
            sort_tasks(&mut self.tasks);
        }
    }

    fn mark_failed(&mut self, index: usize, reason: String) {
        let task = &mut self.tasks[index];
        task.failures += 1;
        task.retry_at = Some(Instant::now() + self.config.jittered_backoff_for(task.failures));
        task.clear_progress();
        task.status = TaskStatus::Failed { reason };
    }

    fn index_of(&self, item_id: &str) -> QueueResult<usize> {
        self.tasks
            .iter()
            .position(|task| task.item_id() == item_id)
            .ok_or_else(|| QueueError::TaskNotFound {
                item_id: item_id.to_string(),
            })
    }
}

impl Drop for DownloadQueue {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.control.cancel();
            // The waiter only forwards the outcome nobody will read now
            active.waiter.abort();
        }
    }
}

impl std::fmt::Debug for DownloadQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadQueue")
            .field("tasks", &self.tasks.len())
            .field("active", &self.active_item())
            .field("loaded", &self.loaded)
            .field("auto_advance", &self.auto_advance)
            .finish()
    }
}
