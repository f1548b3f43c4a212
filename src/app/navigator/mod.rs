//! Hierarchical catalog browser
//!
//! The navigator shows one [`NavigationColumn`] per depth level, lazily filled
//! through the [`CatalogCache`]. Column derivation and folder selection run as
//! background tasks that report back through the event inbox. The navigator
//! itself is only touched by the event loop.
//!
//! Derivations are tagged with a monotonically increasing request id, and a
//! result carrying an older id is dropped. Only one folder propagation runs at
//! a time; toggles issued meanwhile wait in FIFO order.

use std::collections::VecDeque;
use std::path::PathBuf;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::app::catalog::CatalogCache;
use crate::app::events::{send, AppEvent, EventSender};
use crate::app::models::CatalogItem;
use crate::app::session::Session;
use crate::constants::navigator as limits;
use crate::errors::{AppError, CatalogResult, Result, StoreResult};

pub mod columns;
pub mod propagation;

pub use columns::{derive_columns, CursorMemory, NavigationColumn};
pub use propagation::{collect_descendants, WalkLimits};

/// Tunables for the navigator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigatorConfig {
    /// Maximum number of columns
    pub max_depth: usize,
    /// Bounds on one folder selection walk
    pub walk: WalkLimits,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            max_depth: limits::MAX_COLUMN_DEPTH,
            walk: WalkLimits {
                max_nodes: limits::PROPAGATION_NODE_LIMIT,
                max_depth: limits::PROPAGATION_DEPTH_LIMIT,
                concurrency: limits::PROPAGATION_FETCH_CONCURRENCY,
            },
        }
    }
}

/// What a toggle request did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Applied immediately; carries the new membership
    Applied { selected: bool },
    /// Folder toggled, descendants being collected
    Propagating { selected: bool },
    /// Another propagation is running; this toggle waits its turn
    Queued,
}

#[derive(Debug, Clone)]
struct PendingToggle {
    item_id: String,
    is_folder: bool,
}

struct RunningPropagation {
    job_id: u64,
    item_id: String,
    handle: JoinHandle<()>,
}

/// Column browser with recursive selection
pub struct HierarchicalNavigator {
    cache: CatalogCache,
    config: NavigatorConfig,
    columns: Vec<NavigationColumn>,
    focused_column: usize,
    request_id: u64,
    derivation: Option<JoinHandle<()>>,
    propagation: Option<RunningPropagation>,
    pending: VecDeque<PendingToggle>,
    next_job_id: u64,
}

impl HierarchicalNavigator {
    pub fn new(cache: CatalogCache, config: NavigatorConfig) -> Self {
        Self {
            cache,
            config,
            columns: Vec::new(),
            focused_column: 0,
            request_id: 0,
            derivation: None,
            propagation: None,
            pending: VecDeque::new(),
            next_job_id: 0,
        }
    }

    pub fn columns(&self) -> &[NavigationColumn] {
        &self.columns
    }

    pub fn focused_column(&self) -> usize {
        self.focused_column
    }

    /// Id of the most recently scheduled derivation
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }

    /// The item under the cursor of the focused column
    pub fn focused_item(&self) -> Option<&CatalogItem> {
        self.columns
            .get(self.focused_column)
            .and_then(NavigationColumn::focused)
    }

    /// Whether a derivation result is outstanding
    pub fn is_loading(&self) -> bool {
        self.derivation
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Item whose descendants are currently being collected
    pub fn propagating_item(&self) -> Option<&str> {
        self.propagation.as_ref().map(|p| p.item_id.as_str())
    }

    /// Toggles waiting for the running propagation
    pub fn pending_toggles(&self) -> usize {
        self.pending.len()
    }

    /// Move column focus by `delta`, wrapping at both ends
    pub fn move_focus(&mut self, delta: i32) {
        let count = self.columns.len() as i64;
        if count == 0 {
            return;
        }
        let target = (self.focused_column as i64 + delta as i64).rem_euclid(count);
        self.focused_column = target as usize;
    }

    /// Move the cursor of one column and re-derive the columns right of it
    pub fn move_cursor(&mut self, column_index: usize, delta: i32, events: &EventSender) {
        let Some(column) = self.columns.get_mut(column_index) else {
            return;
        };
        if !column.move_cursor(delta) {
            return;
        }

        self.columns.truncate(column_index + 1);
        self.focused_column = self.focused_column.min(column_index);
        self.refresh(events);
    }

    /// Schedule a derivation of every column, keeping cursors where possible
    pub fn refresh(&mut self, events: &EventSender) {
        self.request_id += 1;
        let request_id = self.request_id;
        let memory = CursorMemory::from_columns(&self.columns);
        let cache = self.cache.clone();
        let max_depth = self.config.max_depth;
        let events = events.clone();

        if let Some(previous) = self.derivation.take() {
            previous.abort();
        }

        debug!("Scheduling column derivation #{}", request_id);
        self.derivation = Some(tokio::spawn(async move {
            let result = derive_columns(&cache, &memory, max_depth).await;
            send(&events, AppEvent::ColumnsDerived { request_id, result });
        }));
    }

    /// Drop the cache and every column, then derive from scratch
    ///
    /// Used after credentials or the endpoint change. A running propagation
    /// is cancelled; whatever it already applied stays applied.
    pub fn reload(&mut self, events: &EventSender) {
        info!("Reloading catalog");
        self.cancel_propagation();
        self.pending.clear();
        self.columns.clear();
        self.focused_column = 0;

        if let Some(previous) = self.derivation.take() {
            previous.abort();
        }

        self.request_id += 1;
        let request_id = self.request_id;
        let cache = self.cache.clone();
        let max_depth = self.config.max_depth;
        let events = events.clone();

        self.derivation = Some(tokio::spawn(async move {
            cache.clear().await;
            let result = derive_columns(&cache, &CursorMemory::default(), max_depth).await;
            send(&events, AppEvent::ColumnsDerived { request_id, result });
        }));
    }

    /// Apply a derivation result
    ///
    /// Returns `Ok(false)` when the result is stale and was discarded.
    pub fn apply_derived(
        &mut self,
        request_id: u64,
        result: CatalogResult<Vec<NavigationColumn>>,
    ) -> CatalogResult<bool> {
        if request_id != self.request_id {
            debug!(
                "Discarding stale derivation #{} (current #{})",
                request_id, self.request_id
            );
            return Ok(false);
        }
        self.derivation = None;

        let columns = result?;
        self.columns = columns;
        self.focused_column = self
            .focused_column
            .min(self.columns.len().saturating_sub(1));
        Ok(true)
    }

    /// Toggle selection of an item
    ///
    /// A leaf flips at once. A folder flips at once and its descendants
    /// follow when the background walk reports back. While a walk is running,
    /// every toggle waits in issue order.
    pub fn toggle_selection(
        &mut self,
        item_id: &str,
        is_folder: bool,
        session: &mut Session,
        events: &EventSender,
    ) -> StoreResult<ToggleOutcome> {
        let toggle = PendingToggle {
            item_id: item_id.to_string(),
            is_folder,
        };

        if self.propagation.is_some() {
            debug!("Queueing toggle of {} behind running propagation", item_id);
            self.pending.push_back(toggle);
            return Ok(ToggleOutcome::Queued);
        }

        self.run_toggle(toggle, session, events)
    }

    fn run_toggle(
        &mut self,
        toggle: PendingToggle,
        session: &mut Session,
        events: &EventSender,
    ) -> StoreResult<ToggleOutcome> {
        let selected = session.toggle_selected(&toggle.item_id)?;
        if !toggle.is_folder {
            return Ok(ToggleOutcome::Applied { selected });
        }

        self.next_job_id += 1;
        let job_id = self.next_job_id;
        let cache = self.cache.clone();
        let walk = self.config.walk;
        let events = events.clone();
        let item_id = toggle.item_id.clone();

        debug!(
            "Propagating {} of folder {} (job #{})",
            if selected { "selection" } else { "deselection" },
            item_id,
            job_id
        );
        let handle = tokio::spawn(async move {
            let result = collect_descendants(&cache, &item_id, walk).await;
            send(
                &events,
                AppEvent::SelectionPropagated {
                    job_id,
                    item_id,
                    add: selected,
                    result,
                },
            );
        });

        self.propagation = Some(RunningPropagation {
            job_id,
            item_id: toggle.item_id,
            handle,
        });
        Ok(ToggleOutcome::Propagating { selected })
    }

    /// Apply the descendants collected by a propagation, then start the next
    /// queued toggle
    ///
    /// A catalog failure of the walk is returned after the queue has moved on.
    pub fn apply_propagation(
        &mut self,
        job_id: u64,
        add: bool,
        result: CatalogResult<Vec<String>>,
        session: &mut Session,
        events: &EventSender,
    ) -> Result<()> {
        if self.propagation.as_ref().map(|p| p.job_id) != Some(job_id) {
            debug!("Ignoring result of cancelled propagation #{}", job_id);
            return Ok(());
        }
        let finished = self.propagation.take();

        let failure = match result {
            Ok(ids) => {
                let changed = session.apply_selection(&ids, add)?;
                debug!(
                    "Propagation #{} for {} changed {} of {} descendants",
                    job_id,
                    finished.map(|p| p.item_id).unwrap_or_default(),
                    changed,
                    ids.len()
                );
                None
            }
            Err(e) => Some(e),
        };

        while let Some(toggle) = self.pending.pop_front() {
            if let ToggleOutcome::Propagating { .. } = self.run_toggle(toggle, session, events)? {
                break;
            }
        }

        match failure {
            Some(e) => Err(AppError::Catalog(e)),
            None => Ok(()),
        }
    }

    /// Delete the local file of a downloaded item and refresh the columns
    pub fn delete_downloaded(
        &mut self,
        item_id: &str,
        session: &mut Session,
        events: &EventSender,
    ) -> StoreResult<Option<PathBuf>> {
        let removed = session.delete_download(item_id)?;
        if removed.is_some() {
            self.refresh(events);
        }
        Ok(removed)
    }

    fn cancel_propagation(&mut self) {
        if let Some(running) = self.propagation.take() {
            info!("Cancelling propagation for {}", running.item_id);
            running.handle.abort();
        }
    }
}

impl Drop for HierarchicalNavigator {
    fn drop(&mut self) {
        self.cancel_propagation();
        if let Some(handle) = self.derivation.take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for HierarchicalNavigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HierarchicalNavigator")
            .field("columns", &self.columns.len())
            .field("focused_column", &self.focused_column)
            .field("request_id", &self.request_id)
            .field("pending", &self.pending.len())
            .finish()
    }
}
