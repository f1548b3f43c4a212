//! Integration tests for the sequential download list

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use jellyfin_fetcher::app::events::{inbox, AppEvent, EventReceiver};
use jellyfin_fetcher::app::models::CatalogItem;
use jellyfin_fetcher::app::queue::{ConfigPresets, DownloadQueue, QueueConfig, TaskStatus};
use jellyfin_fetcher::app::session::{MemoryStore, Session};
use jellyfin_fetcher::errors::{AppError, CatalogError, QueueError, StoreError, TransferError};
use tempfile::TempDir;

use common::{next_event, session_in, FakeCatalog, FakeTransferer};

fn catalog() -> FakeCatalog {
    FakeCatalog::new().with_children(
        "",
        vec![
            CatalogItem::folder("lib-movies", "Movies"),
            CatalogItem::film("m2", "Heat"),
            CatalogItem::film("m1", "Alien"),
            CatalogItem::film("m3", "Brazil"),
            CatalogItem::episode("e21", "Bushwhacked", "Firefly", 2, 1),
            CatalogItem::episode("e12", "The Train Job", "Firefly", 1, 2),
        ],
    )
}

struct Harness {
    queue: DownloadQueue,
    catalog: Arc<FakeCatalog>,
    transferer: Arc<FakeTransferer>,
    inbox: EventReceiver,
    session: Session,
    store: MemoryStore,
    dir: TempDir,
}

impl Harness {
    fn new(selected: &[&str]) -> Self {
        Self::with_config(selected, ConfigPresets::testing())
    }

    fn with_config(selected: &[&str], config: QueueConfig) -> Self {
        let dir = TempDir::new().unwrap();
        let (mut session, store) = session_in(dir.path());
        for id in selected {
            session.toggle_selected(id).unwrap();
        }

        let catalog = Arc::new(catalog());
        let transferer = Arc::new(FakeTransferer::new());
        let (events, inbox) = inbox();
        let queue = DownloadQueue::new(catalog.clone(), transferer.clone(), config, events);

        Self {
            queue,
            catalog,
            transferer,
            inbox,
            session,
            store,
            dir,
        }
    }

    async fn load(&mut self) {
        self.queue.activate(&self.session);
        loop {
            if let AppEvent::QueueLoaded { generation, result } = next_event(&mut self.inbox).await {
                self.queue.load(generation, result, &self.session).unwrap();
                return;
            }
        }
    }

    /// Apply the next transfer outcome
    async fn settle_transfer(&mut self) {
        loop {
            if let AppEvent::TransferFinished {
                item_id,
                attempt,
                outcome,
            } = next_event(&mut self.inbox).await
            {
                self.queue
                    .handle_finished(&item_id, attempt, outcome, &mut self.session)
                    .unwrap();
                return;
            }
        }
    }

    fn ids(&self) -> Vec<&str> {
        self.queue.tasks().iter().map(|task| task.item_id()).collect()
    }

    fn status(&self, id: &str) -> TaskStatus {
        self.queue.task(id).unwrap().status.clone()
    }

    fn downloading_count(&self) -> usize {
        self.queue
            .tasks()
            .iter()
            .filter(|task| task.status.is_downloading())
            .count()
    }
}

#[tokio::test]
async fn test_empty_selection_makes_no_requests() {
    let mut harness = Harness::new(&[]);
    harness.queue.activate(&harness.session);

    assert!(harness.queue.is_loaded());
    assert!(harness.queue.tasks().is_empty());
    assert!(harness.queue.is_settled());
    assert_eq!(harness.catalog.metadata_calls.load(Ordering::SeqCst), 0);
    assert!(harness.transferer.started().is_empty());
}

#[tokio::test]
async fn test_list_order_and_first_pick() {
    let mut harness = Harness::new(&["lib-movies", "m2", "m1", "e21", "e12"]);
    let brazil = harness.dir.path().join("brazil.mkv");
    std::fs::write(&brazil, b"video").unwrap();
    harness.session.record_download("m3", &brazil).unwrap();

    harness.load().await;

    // Folders are dropped; films before episodes; downloaded items last
    assert_eq!(harness.ids(), vec!["m1", "m2", "e12", "e21", "m3"]);
    assert_eq!(harness.transferer.started(), vec!["m1"]);
    assert!(harness.status("m1").is_downloading());
    assert_eq!(harness.status("m3"), TaskStatus::Completed { path: brazil });
    assert_eq!(harness.catalog.metadata_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_downloads_run_one_at_a_time() {
    let mut harness = Harness::new(&["m2", "m1", "e21", "e12"]);
    harness.load().await;

    for expected in ["m1", "m2", "e12", "e21"] {
        assert_eq!(harness.queue.active_item(), Some(expected));
        assert_eq!(harness.downloading_count(), 1);

        let path = harness.transferer.complete(expected);
        harness.settle_transfer().await;

        assert!(harness.status(expected).is_completed());
        assert_eq!(harness.session.downloaded().get(expected), Some(path.as_path()));
        // Persisted before the next task was picked
        assert!(harness
            .store
            .last_persisted()
            .unwrap()
            .downloaded
            .contains(expected));
    }

    assert_eq!(harness.transferer.started(), vec!["m1", "m2", "e12", "e21"]);
    assert!(harness.queue.active_item().is_none());
    assert!(harness.queue.is_settled());
    assert!(harness.dir.path().join("Film").join("m1.mkv").exists());
    assert!(harness
        .dir
        .path()
        .join("Series")
        .join("Firefly")
        .join("Season 2")
        .join("e21.mkv")
        .exists());
}

#[tokio::test]
async fn test_failure_moves_on_to_next_task() {
    let mut harness = Harness::new(&["m1", "m2"]);
    harness.load().await;

    let (_, reporter) = harness.transferer.take("m1");
    reporter.finish(Err(TransferError::ServerError { status: 500 }));
    harness.settle_transfer().await;

    assert!(harness.status("m1").is_failed());
    assert_eq!(harness.queue.task("m1").unwrap().failures, 1);
    assert_eq!(harness.queue.active_item(), Some("m2"));
    // Failed tasks are listed first
    assert_eq!(harness.ids(), vec!["m1", "m2"]);
    assert!(!harness.session.downloaded().contains("m1"));
}

#[tokio::test]
async fn test_failed_task_retried_after_backoff() {
    let mut harness = Harness::new(&["m1"]);
    harness.load().await;

    for attempt in 1..=3 {
        assert_eq!(harness.queue.active_item(), Some("m1"));
        let (_, reporter) = harness.transferer.take("m1");
        reporter.finish(Err(TransferError::ServerError { status: 503 }));
        harness.settle_transfer().await;
        assert_eq!(harness.queue.task("m1").unwrap().failures, attempt);

        // Not before the backoff has passed
        harness.queue.tick(&harness.session);
        assert!(harness.queue.active_item().is_none());

        tokio::time::sleep(Duration::from_millis(200)).await;
        harness.queue.tick(&harness.session);
    }

    // Two retries after the first failure, then it stays failed
    assert_eq!(harness.transferer.started().len(), 3);
    assert!(harness.queue.active_item().is_none());
    assert!(harness.queue.is_settled());
}

#[tokio::test]
async fn test_cancel_returns_task_to_waiting() {
    let mut harness = Harness::new(&["m1", "m2"]);
    harness.load().await;

    harness.queue.cancel("m1").unwrap();
    assert_eq!(harness.status("m1"), TaskStatus::NotStarted);
    assert!(harness.queue.active_item().is_none());
    assert!(!harness.queue.auto_advance());

    let (_, reporter) = harness.transferer.take("m1");
    assert!(reporter.is_cancelled());
    reporter.finish(Err(TransferError::Cancelled));
    harness.settle_transfer().await;

    // Nothing else starts until the user starts something
    assert_eq!(harness.transferer.started(), vec!["m1"]);
    assert!(harness.queue.is_settled());

    harness.queue.start("m2", &harness.session).unwrap();
    assert_eq!(harness.queue.active_item(), Some("m2"));
    assert!(harness.queue.auto_advance());
}

#[tokio::test]
async fn test_manual_start_supersedes_active_transfer() {
    let mut harness = Harness::new(&["m1", "m2"]);
    harness.load().await;

    harness.queue.start("m2", &harness.session).unwrap();
    assert_eq!(harness.queue.active_item(), Some("m2"));
    assert_eq!(harness.status("m1"), TaskStatus::NotStarted);
    assert_eq!(harness.downloading_count(), 1);

    // A late success of the superseded attempt changes nothing
    harness.transferer.complete("m1");
    harness.settle_transfer().await;
    assert_eq!(harness.status("m1"), TaskStatus::NotStarted);
    assert!(!harness.session.downloaded().contains("m1"));
    assert_eq!(harness.queue.active_item(), Some("m2"));

    let starting_again = harness.queue.start("m2", &harness.session);
    assert!(matches!(starting_again, Err(QueueError::AlreadyActive { .. })));
}

#[tokio::test]
async fn test_start_requires_loaded_list() {
    let mut harness = Harness::new(&["m1"]);
    let result = harness.queue.start("m1", &harness.session);
    assert!(matches!(result, Err(QueueError::NotLoaded)));

    harness.load().await;
    let missing = harness.queue.start("nope", &harness.session);
    assert!(matches!(missing, Err(QueueError::TaskNotFound { .. })));
}

#[tokio::test]
async fn test_retry_or_delete_resets_completed_task() {
    let mut harness = Harness::with_config(&["m1", "m2"], ConfigPresets::testing());
    harness.load().await;
    let path = harness.transferer.complete("m1");
    harness.settle_transfer().await;
    assert_eq!(harness.queue.active_item(), Some("m2"));

    // Only completed tasks are affected
    assert!(!harness
        .queue
        .retry_or_delete("m2", &mut harness.session)
        .unwrap());

    assert!(harness
        .queue
        .retry_or_delete("m1", &mut harness.session)
        .unwrap());
    assert!(!path.exists());
    assert!(!harness.session.downloaded().contains("m1"));
    assert_eq!(harness.status("m1"), TaskStatus::NotStarted);

    // Completed tasks cannot be started again until deleted
    harness.transferer.complete("m2");
    harness.settle_transfer().await;
    assert_eq!(harness.queue.active_item(), Some("m1"));
    harness.queue.start("m2", &harness.session).unwrap();
    assert_eq!(harness.queue.active_item(), Some("m1"));
}

#[tokio::test]
async fn test_failed_delete_keeps_task_completed() {
    let mut harness = Harness::with_config(&["m1", "m2"], ConfigPresets::testing());
    harness.load().await;
    let path = harness.transferer.complete("m1");
    harness.settle_transfer().await;

    // Something the process cannot remove now sits at the recorded path
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();
    std::fs::write(path.join("inner"), b"x").unwrap();

    let result = harness.queue.retry_or_delete("m1", &mut harness.session);
    assert!(matches!(
        result,
        Err(AppError::Store(StoreError::DeleteFailed { .. }))
    ));
    assert!(harness.status("m1").is_completed());
    assert!(harness.session.downloaded().contains("m1"));
    assert!(path.exists());
}

#[tokio::test]
async fn test_metadata_failure_leaves_list_unloaded() {
    let mut harness = Harness::new(&["m1"]);
    harness.catalog.fail_with(CatalogError::InvalidCredentials);
    harness.queue.activate(&harness.session);

    let AppEvent::QueueLoaded { generation, result } = next_event(&mut harness.inbox).await else {
        panic!("expected metadata");
    };
    let error = harness
        .queue
        .load(generation, result, &harness.session)
        .unwrap_err();

    assert_eq!(error, CatalogError::InvalidCredentials);
    assert!(!harness.queue.is_loaded());
    assert!(harness.transferer.started().is_empty());
}
