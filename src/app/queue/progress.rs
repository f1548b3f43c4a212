//! Throughput and ETA of the active transfer

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Rate calculator over a sliding window of `(time, cumulative bytes)` samples
#[derive(Debug, Clone)]
pub struct RateCalculator {
    window: VecDeque<(Instant, u64)>,
    window_size: usize,
}

impl RateCalculator {
    /// Create a new rate calculator with the specified window size
    pub fn new(window_size: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(window_size),
            window_size: window_size.max(2),
        }
    }

    /// Add a sample taken now and return the current rate
    pub fn add_sample(&mut self, bytes: u64) -> f64 {
        self.add_sample_at(Instant::now(), bytes)
    }

    /// Add a sample taken at `at` and return the current rate
    pub fn add_sample_at(&mut self, at: Instant, bytes: u64) -> f64 {
        self.window.push_back((at, bytes));
        while self.window.len() > self.window_size {
            self.window.pop_front();
        }
        self.calculate_rate()
    }

    /// Calculate the current rate in bytes per second
    pub fn calculate_rate(&self) -> f64 {
        let (Some(oldest), Some(newest)) = (self.window.front(), self.window.back()) else {
            return 0.0;
        };
        if self.window.len() < 2 {
            return 0.0;
        }

        let time_diff = newest.0.saturating_duration_since(oldest.0).as_secs_f64();
        let bytes_diff = newest.1.saturating_sub(oldest.1);

        if time_diff > 0.0 {
            bytes_diff as f64 / time_diff
        } else {
            0.0
        }
    }

    pub fn sample_count(&self) -> usize {
        self.window.len()
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}

/// Remaining time at `bytes_per_second`
///
/// `None` when the throughput is zero or the size is unknown.
pub fn estimate_eta(total_bytes: u64, transferred_bytes: u64, bytes_per_second: f64) -> Option<Duration> {
    if bytes_per_second <= 0.0 || !bytes_per_second.is_finite() || total_bytes == 0 {
        return None;
    }
    let remaining = total_bytes.saturating_sub(transferred_bytes);
    // Estimates past what a Duration can hold are shown as unknown
    Duration::try_from_secs_f64(remaining as f64 / bytes_per_second).ok()
}

/// Format an ETA rounded to the second, `∞` when unknown
pub fn format_eta(eta: Option<Duration>) -> String {
    let Some(eta) = eta else {
        return "∞".to_string();
    };

    let total = eta.as_secs_f64().round() as u64;
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Format a byte count with SI (powers of 1000) units
pub fn format_bytes_si(bytes: u64) -> String {
    const UNIT: u64 = 1000;
    if bytes < UNIT {
        return format!("{} B", bytes);
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT && exp < 5 {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let prefix = ['k', 'M', 'G', 'T', 'P', 'E'][exp];
    format!("{:.1} {}B", bytes as f64 / div as f64, prefix)
}
