//! Progress display for headless downloads
//!
//! Two indicatif bars follow the queue: one counting finished items and one
//! showing bytes of the active transfer. When stderr is not a terminal the
//! display falls back to a plain line per finished item plus a periodic
//! summary.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::debug;

use crate::app::queue::{format_bytes_si, format_eta, DownloadQueue, QueueSummary, TaskStatus};
use crate::errors::{AppError, Result};

/// Configuration for progress display
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Enable visual progress bars
    pub enable_progress_bars: bool,
    /// How often text mode prints a summary
    pub text_report_interval: Duration,
    /// Maximum width for item titles in the display
    pub max_title_width: usize,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enable_progress_bars: true,
            text_report_interval: Duration::from_secs(10),
            max_title_width: 50,
        }
    }
}

struct Bars {
    _multi: MultiProgress,
    overall: ProgressBar,
    current: ProgressBar,
}

/// Progress display driven from the event loop
pub struct ProgressDisplay {
    config: ProgressConfig,
    bars: Option<Bars>,
    announced: HashSet<(String, bool)>,
    last_report: Instant,
    started_at: Instant,
}

impl ProgressDisplay {
    /// Create a display; bars are used only when stderr is a terminal
    pub fn new(config: ProgressConfig) -> Self {
        Self {
            config,
            bars: None,
            announced: HashSet::new(),
            last_report: Instant::now(),
            started_at: Instant::now(),
        }
    }

    /// Show the display for a loaded queue
    ///
    /// # Errors
    ///
    /// Returns an error if a progress bar template is invalid
    pub fn start(&mut self, queue: &DownloadQueue) -> Result<()> {
        let summary = queue.summary();
        self.started_at = Instant::now();

        // Items finished before this run are not announced again
        self.announced = queue
            .tasks()
            .iter()
            .filter(|task| task.status.is_completed())
            .map(|task| (task.item_id().to_string(), true))
            .collect();

        let is_terminal = atty::is(atty::Stream::Stderr);
        if !self.config.enable_progress_bars || !is_terminal {
            eprintln!(
                "Starting download of {} items ({} already downloaded)...",
                summary.total, summary.completed
            );
            return Ok(());
        }

        let multi = MultiProgress::with_draw_target(ProgressDrawTarget::stderr());

        let overall = multi.add(ProgressBar::new(summary.total as u64));
        overall.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} items {msg}")
                .map_err(|e| AppError::generic(format!("Progress bar template error: {}", e)))?
                .progress_chars("##-"),
        );
        overall.set_position(summary.completed as u64);

        let current = multi.add(ProgressBar::new(0));
        current.set_style(
            ProgressStyle::default_bar()
                .template("  {msg}")
                .map_err(|e| AppError::generic(format!("Progress bar template error: {}", e)))?,
        );

        self.bars = Some(Bars {
            _multi: multi,
            overall,
            current,
        });
        debug!("Progress display started for {} items", summary.total);
        Ok(())
    }

    /// Refresh from the queue state
    pub fn update(&mut self, queue: &DownloadQueue) {
        let summary = queue.summary();
        let mut newly_finished = Vec::new();
        for task in queue.tasks() {
            let line = match &task.status {
                TaskStatus::Completed { .. } => {
                    format!("Downloaded: {}", task.item.display_title())
                }
                TaskStatus::Failed { reason } => {
                    format!("Failed: {} ({})", task.item.display_title(), reason)
                }
                _ => continue,
            };
            let key = (task.item_id().to_string(), task.status.is_completed());
            if self.announced.insert(key) {
                newly_finished.push(line);
            }
        }

        let active = queue
            .active_item()
            .and_then(|id| queue.task(id))
            .map(|task| {
                format!(
                    "{} {} {}/s ETA {}",
                    self.truncate(&task.item.display_title()),
                    format_bytes_si(task.transferred_bytes),
                    format_bytes_si(task.bytes_per_second as u64),
                    format_eta(task.eta())
                )
            });

        match &self.bars {
            Some(bars) => {
                for line in &newly_finished {
                    bars.overall.println(line);
                }
                bars.overall
                    .set_position((summary.completed + summary.failed) as u64);
                bars.overall
                    .set_message(format!("({} failed)", summary.failed));
                bars.overall.tick();
                bars.current.set_message(active.unwrap_or_default());
            }
            None => {
                for line in &newly_finished {
                    eprintln!("{}", line);
                }
                if self.last_report.elapsed() >= self.config.text_report_interval {
                    eprintln!("{}", progress_line(&summary));
                    self.last_report = Instant::now();
                }
            }
        }
    }

    /// Clear the bars and print a summary
    pub fn finish(&mut self, queue: &DownloadQueue) {
        self.update(queue);
        if let Some(bars) = self.bars.take() {
            bars.current.finish_and_clear();
            bars.overall.finish_with_message("done");
        }

        let summary = queue.summary();
        eprintln!("\nDownload Summary:");
        eprintln!("   Total items: {}", summary.total);
        eprintln!("   Completed: {}", summary.completed);
        eprintln!("   Failed: {}", summary.failed);
        eprintln!("   Not started: {}", summary.waiting);
        eprintln!("   Duration: {:?}", self.started_at.elapsed());

        if summary.failed > 0 {
            eprintln!("Some items failed to download. Check logs for details.");
        }
    }

    fn truncate(&self, title: &str) -> String {
        let width = self.config.max_title_width;
        let count = title.chars().count();
        if count <= width {
            return title.to_string();
        }
        let tail: String = title.chars().skip(count - width + 3).collect();
        format!("...{}", tail)
    }
}

/// One-line summary used by text mode
pub fn progress_line(summary: &QueueSummary) -> String {
    let done = summary.completed + summary.failed;
    let percent = if summary.total == 0 {
        100.0
    } else {
        done as f64 / summary.total as f64 * 100.0
    };
    format!(
        "Progress: {}/{} items ({:.1}%), {} failed",
        done, summary.total, percent, summary.failed
    )
}
