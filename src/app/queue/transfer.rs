//! Transfer collaborator seam
//!
//! A [`Transferer`] starts one background file transfer and hands back a
//! [`TransferHandle`]. The queue keeps the handle to poll progress and to
//! cancel, while the transfer task keeps the matching [`TransferReporter`]
//! to publish byte counts, watch for cancellation, and report the outcome.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{oneshot, watch};

use crate::app::models::CatalogItem;
use crate::errors::{TransferError, TransferResult};

/// Starts background transfers
pub trait Transferer: Send + Sync {
    /// Fetch `item` into `destination_dir`, which already exists
    fn begin_transfer(&self, item: &CatalogItem, destination_dir: &Path) -> TransferHandle;
}

/// Byte counters shared between a transfer and its observer
#[derive(Debug, Default)]
pub struct TransferProgress {
    transferred: AtomicU64,
    total: AtomicU64,
}

impl TransferProgress {
    /// `(transferred_bytes, total_bytes)`, total 0 when unknown
    pub fn snapshot(&self) -> (u64, u64) {
        (
            self.transferred.load(Ordering::Relaxed),
            self.total.load(Ordering::Relaxed),
        )
    }
}

/// Observer side of one transfer
#[derive(Debug)]
pub struct TransferHandle {
    progress: Arc<TransferProgress>,
    cancel: watch::Sender<bool>,
    completion: oneshot::Receiver<TransferResult<PathBuf>>,
}

impl TransferHandle {
    /// Create a connected handle and reporter pair
    pub fn channel() -> (TransferHandle, TransferReporter) {
        let progress = Arc::new(TransferProgress::default());
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (done_tx, done_rx) = oneshot::channel();

        (
            TransferHandle {
                progress: Arc::clone(&progress),
                cancel: cancel_tx,
                completion: done_rx,
            },
            TransferReporter {
                progress,
                cancel: CancelSignal { rx: cancel_rx },
                completion: Some(done_tx),
            },
        )
    }

    /// Handle of a transfer that already ended with `result`
    pub fn finished(result: TransferResult<PathBuf>) -> TransferHandle {
        let (handle, reporter) = Self::channel();
        reporter.finish(result);
        handle
    }

    /// Ask the transfer to stop
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// `(transferred_bytes, total_bytes)`
    pub fn progress_snapshot(&self) -> (u64, u64) {
        self.progress.snapshot()
    }

    /// Wait for the outcome
    ///
    /// A reporter dropped without a result yields [`TransferError::Aborted`].
    pub async fn completion(self) -> TransferResult<PathBuf> {
        let (control, completion) = self.split();
        let outcome = completion.await.unwrap_or(Err(TransferError::Aborted));
        drop(control);
        outcome
    }

    /// Separate the control half from the completion
    pub fn split(self) -> (TransferControl, oneshot::Receiver<TransferResult<PathBuf>>) {
        (
            TransferControl {
                progress: self.progress,
                cancel: self.cancel,
            },
            self.completion,
        )
    }
}

/// Progress and cancel half of a [`TransferHandle`]
#[derive(Debug)]
pub struct TransferControl {
    progress: Arc<TransferProgress>,
    cancel: watch::Sender<bool>,
}

impl TransferControl {
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn progress_snapshot(&self) -> (u64, u64) {
        self.progress.snapshot()
    }
}

/// Cancellation signal observed by a running transfer
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// Whether cancellation was requested, or the observer went away
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolve once cancellation is requested or the observer is dropped
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Transfer side of one transfer
#[derive(Debug)]
pub struct TransferReporter {
    progress: Arc<TransferProgress>,
    cancel: CancelSignal,
    completion: Option<oneshot::Sender<TransferResult<PathBuf>>>,
}

impl TransferReporter {
    /// Announce the expected size
    pub fn set_total(&self, total: u64) {
        self.progress.total.store(total, Ordering::Relaxed);
    }

    /// Count freshly written bytes
    pub fn add_transferred(&self, bytes: u64) {
        self.progress.transferred.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Forget progress of a previous attempt
    pub fn reset(&self) {
        self.progress.transferred.store(0, Ordering::Relaxed);
        self.progress.total.store(0, Ordering::Relaxed);
    }

    /// Whether cancellation was requested, or the observer went away
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolve once cancellation is requested or the observer is dropped
    pub async fn cancelled(&mut self) {
        self.cancel.cancelled().await
    }

    /// A separate handle on the cancellation signal
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Report the outcome; later calls are ignored
    pub fn finish(mut self, result: TransferResult<PathBuf>) {
        if let Some(sender) = self.completion.take() {
            // The observer may already be gone
            let _ = sender.send(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_progress_is_shared() {
        let (handle, reporter) = TransferHandle::channel();
        reporter.set_total(1000);
        reporter.add_transferred(250);
        reporter.add_transferred(250);

        assert_eq!(handle.progress_snapshot(), (500, 1000));
    }

    #[tokio::test]
    async fn test_cancel_reaches_reporter() {
        let (handle, mut reporter) = TransferHandle::channel();
        assert!(!reporter.is_cancelled());

        handle.cancel();
        reporter.cancelled().await;
        assert!(reporter.is_cancelled());
    }

    #[test]
    fn test_cancel_signal_pending_until_cancel() {
        use tokio_test::{assert_pending, assert_ready, task};

        let (handle, reporter) = TransferHandle::channel();
        let mut signal = reporter.cancel_signal();
        let mut cancelled = task::spawn(async move { signal.cancelled().await });

        assert_pending!(cancelled.poll());
        handle.cancel();
        assert!(cancelled.is_woken());
        assert_ready!(cancelled.poll());
    }

    #[tokio::test]
    async fn test_dropped_reporter_is_aborted() {
        let (handle, reporter) = TransferHandle::channel();
        drop(reporter);

        let outcome = handle.completion().await;
        assert!(matches!(outcome, Err(TransferError::Aborted)));
    }

    #[tokio::test]
    async fn test_finished_handle() {
        let handle = TransferHandle::finished(Ok(PathBuf::from("/tmp/x")));
        assert_eq!(handle.completion().await.unwrap(), PathBuf::from("/tmp/x"));
    }
}
