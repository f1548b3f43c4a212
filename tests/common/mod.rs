//! Shared fakes for the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use jellyfin_fetcher::app::events::{AppEvent, EventReceiver};
use jellyfin_fetcher::app::models::CatalogItem;
use jellyfin_fetcher::app::queue::{TransferHandle, TransferReporter, Transferer};
use jellyfin_fetcher::app::session::{MemoryStore, Session, SessionRecord};
use jellyfin_fetcher::app::CatalogSource;
use jellyfin_fetcher::errors::{CatalogError, CatalogResult};

/// In-memory catalog tree
#[derive(Default)]
pub struct FakeCatalog {
    children: Mutex<HashMap<String, Vec<CatalogItem>>>,
    failing: Mutex<Option<CatalogError>>,
    pub children_calls: AtomicUsize,
    pub metadata_calls: AtomicUsize,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the children of `parent_id`; the root is `""`
    pub fn with_children(self, parent_id: &str, items: Vec<CatalogItem>) -> Self {
        self.children
            .lock()
            .unwrap()
            .insert(parent_id.to_string(), items);
        self
    }

    /// Replace the children of `parent_id` on a shared catalog
    pub fn set_children(&self, parent_id: &str, items: Vec<CatalogItem>) {
        self.children
            .lock()
            .unwrap()
            .insert(parent_id.to_string(), items);
    }

    /// Make every request fail with `error`
    pub fn fail_with(&self, error: CatalogError) {
        *self.failing.lock().unwrap() = Some(error);
    }

    fn all_items(&self) -> Vec<CatalogItem> {
        self.children
            .lock()
            .unwrap()
            .values()
            .flatten()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn fetch_children(&self, parent_id: &str) -> CatalogResult<Vec<CatalogItem>> {
        self.children_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.failing.lock().unwrap().clone() {
            return Err(e);
        }
        Ok(self
            .children
            .lock()
            .unwrap()
            .get(parent_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_metadata(&self, ids: &[String]) -> CatalogResult<Vec<CatalogItem>> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.failing.lock().unwrap().clone() {
            return Err(e);
        }
        let all = self.all_items();
        Ok(ids
            .iter()
            .filter_map(|id| all.iter().find(|item| &item.id == id).cloned())
            .collect())
    }
}

/// Transferer that hands every transfer to the test
#[derive(Default)]
pub struct FakeTransferer {
    reporters: Mutex<Vec<(String, PathBuf, TransferReporter)>>,
    pub started: Mutex<Vec<String>>,
}

impl FakeTransferer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids in the order transfers were started
    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    /// Take the reporter of the most recent transfer of `item_id`
    pub fn take(&self, item_id: &str) -> (PathBuf, TransferReporter) {
        let mut reporters = self.reporters.lock().unwrap();
        let index = reporters
            .iter()
            .rposition(|(id, _, _)| id == item_id)
            .unwrap_or_else(|| panic!("no transfer started for {}", item_id));
        let (_, dir, reporter) = reporters.remove(index);
        (dir, reporter)
    }

    /// Write a file for `item_id` and report success
    pub fn complete(&self, item_id: &str) -> PathBuf {
        let (dir, reporter) = self.take(item_id);
        let path = dir.join(format!("{}.mkv", item_id));
        std::fs::write(&path, b"video").unwrap();
        reporter.finish(Ok(path.clone()));
        path
    }
}

impl Transferer for FakeTransferer {
    fn begin_transfer(&self, item: &CatalogItem, destination_dir: &Path) -> TransferHandle {
        let (handle, reporter) = TransferHandle::channel();
        self.started.lock().unwrap().push(item.id.clone());
        self.reporters.lock().unwrap().push((
            item.id.clone(),
            destination_dir.to_path_buf(),
            reporter,
        ));
        handle
    }
}

/// Session in memory with downloads under `root`
pub fn session_in(root: &Path) -> (Session, MemoryStore) {
    let record = SessionRecord {
        api_key: "key".to_string(),
        api_endpoint: "http://jellyfin.local".to_string(),
        download_location: root.display().to_string(),
        ..Default::default()
    };
    let store = MemoryStore::with_record(record);
    let session = Session::load(Box::new(store.clone())).unwrap();
    (session, store)
}

/// Next event from the inbox, failing the test after five seconds
pub async fn next_event(inbox: &mut EventReceiver) -> AppEvent {
    tokio::time::timeout(Duration::from_secs(5), inbox.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("inbox closed")
}
