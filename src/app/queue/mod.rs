//! Sequential download queue
//!
//! This module turns the selection into an ordered list of leaf items and
//! fetches them one at a time, with progress and failure tracking.
//!
//! # Features
//!
//! - **One transfer at a time**: starting a task cancels any other one
//! - **Automatic advance**: when a transfer ends the next waiting task starts
//! - **Retry with backoff**: failed tasks are retried once nothing is waiting
//! - **Stable display order**: failed, downloading, waiting, then completed
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use jellyfin_fetcher::app::events::{inbox, AppEvent};
//! use jellyfin_fetcher::app::queue::{DownloadQueue, QueueConfig};
//! use jellyfin_fetcher::app::session::{MemoryStore, Session};
//! use jellyfin_fetcher::app::JellyfinClient;
//! use jellyfin_fetcher::auth::Credentials;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = Session::load(Box::new(MemoryStore::new()))?;
//! let client = JellyfinClient::new(Credentials::new("key", "", "http://localhost:8096"))?;
//! let client = Arc::new(client);
//! let (events, mut inbox) = inbox();
//!
//! let mut queue = DownloadQueue::new(client.clone(), client, QueueConfig::default(), events);
//! queue.activate(&session);
//!
//! while let Some(event) = inbox.recv().await {
//!     match event {
//!         AppEvent::QueueLoaded { generation, result } => {
//!             queue.load(generation, result, &session)?
//!         }
//!         AppEvent::TransferFinished { item_id, attempt, outcome } => {
//!             queue.handle_finished(&item_id, attempt, outcome, &mut session)?
//!         }
//!         _ => {}
//!     }
//!     if queue.is_settled() {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod ordering;
pub mod progress;
pub mod transfer;
pub mod types;

// Re-export main public API
pub use config::{ConfigPresets, QueueConfig, QueueConfigBuilder};
pub use self::core::{DownloadQueue, QueueSummary};
pub use ordering::{display_order, sort_tasks};
pub use progress::{estimate_eta, format_bytes_si, format_eta, RateCalculator};
pub use transfer::{
    CancelSignal, TransferControl, TransferHandle, TransferProgress, TransferReporter, Transferer,
};
pub use types::{DownloadTask, TaskStatus};
