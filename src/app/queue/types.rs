//! Core data structures of the download list

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use super::progress::{estimate_eta, format_bytes_si, format_eta};
use crate::app::models::{CatalogItem, DisplayRow};

/// Status of one download task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Waiting to be picked
    NotStarted,
    /// The active transfer belongs to this task
    Downloading { started_at: DateTime<Utc> },
    /// On disk at `path`
    Completed { path: PathBuf },
    /// Last attempt failed
    Failed { reason: String },
}

impl TaskStatus {
    pub fn is_not_started(&self) -> bool {
        matches!(self, TaskStatus::NotStarted)
    }

    pub fn is_downloading(&self) -> bool {
        matches!(self, TaskStatus::Downloading { .. })
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TaskStatus::Completed { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TaskStatus::Failed { .. })
    }

    /// Short label for plain-text output
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "waiting",
            TaskStatus::Downloading { .. } => "downloading",
            TaskStatus::Completed { .. } => "done",
            TaskStatus::Failed { .. } => "failed",
        }
    }
}

/// One leaf item of the download list
#[derive(Debug, Clone)]
pub struct DownloadTask {
    /// Catalog entry being fetched
    pub item: CatalogItem,
    /// Destination directory relative to the download root
    pub destination: PathBuf,
    pub status: TaskStatus,
    /// Throughput of the active transfer
    pub bytes_per_second: f64,
    /// Size announced by the server, 0 when unknown
    pub total_bytes: u64,
    pub transferred_bytes: u64,
    /// Failed attempts so far
    pub failures: u32,
    /// Earliest moment an automatic retry may start
    pub retry_at: Option<Instant>,
}

impl DownloadTask {
    /// Task for an item that still has to be fetched
    pub fn new(item: CatalogItem) -> Self {
        let destination = item.relative_destination();
        Self {
            item,
            destination,
            status: TaskStatus::NotStarted,
            bytes_per_second: 0.0,
            total_bytes: 0,
            transferred_bytes: 0,
            failures: 0,
            retry_at: None,
        }
    }

    /// Task for an item already on disk
    pub fn completed(item: CatalogItem, path: PathBuf) -> Self {
        let mut task = Self::new(item);
        task.status = TaskStatus::Completed { path };
        task
    }

    pub fn item_id(&self) -> &str {
        &self.item.id
    }

    /// Forget any progress of a previous attempt
    pub fn clear_progress(&mut self) {
        self.bytes_per_second = 0.0;
        self.total_bytes = 0;
        self.transferred_bytes = 0;
    }

    /// Fraction done, 0.0 when the size is unknown
    pub fn ratio(&self) -> f64 {
        if self.total_bytes == 0 {
            0.0
        } else {
            (self.transferred_bytes as f64 / self.total_bytes as f64).clamp(0.0, 1.0)
        }
    }

    /// Remaining time at the current throughput
    pub fn eta(&self) -> Option<Duration> {
        estimate_eta(self.total_bytes, self.transferred_bytes, self.bytes_per_second)
    }

    /// Whether the retry policy allows an automatic pick now
    pub fn retry_due(&self, max_retries: u32, now: Instant) -> bool {
        self.status.is_failed()
            && self.failures <= max_retries
            && self.retry_at.is_some_and(|at| now >= at)
    }
}

impl DisplayRow for DownloadTask {
    fn title(&self) -> String {
        self.item.display_title()
    }

    fn description(&self) -> String {
        match &self.status {
            TaskStatus::NotStarted => "Waiting....".to_string(),
            TaskStatus::Completed { .. } => "Downloaded".to_string(),
            TaskStatus::Failed { reason } => format!("Failed: {}", reason),
            TaskStatus::Downloading { .. } if self.total_bytes == 0 => "Starting...".to_string(),
            TaskStatus::Downloading { .. } => format!(
                "{:>3.0}% {}/s {}",
                self.ratio() * 100.0,
                format_bytes_si(self.bytes_per_second as u64),
                format_eta(self.eta())
            ),
        }
    }
}
