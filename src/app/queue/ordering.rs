//! Display and iteration order of the download list
//!
//! Highest first: failed tasks, then unfinished ones, downloading before
//! waiting, standalone works before episodes, episodes of one series by
//! season and episode number, everything else alphabetically by title.

use std::cmp::Ordering;

use super::types::DownloadTask;

/// Compare two tasks by display order
pub fn display_order(a: &DownloadTask, b: &DownloadTask) -> Ordering {
    // `false < true`, so each flag is arranged to sort the preferred side first
    (!a.status.is_failed())
        .cmp(&!b.status.is_failed())
        .then_with(|| a.status.is_completed().cmp(&b.status.is_completed()))
        .then_with(|| (!a.status.is_downloading()).cmp(&!b.status.is_downloading()))
        .then_with(|| a.item.is_episodic().cmp(&b.item.is_episodic()))
        .then_with(|| {
            if a.item.is_episodic() && a.item.series_name == b.item.series_name {
                (a.item.season_number, a.item.episode_number)
                    .cmp(&(b.item.season_number, b.item.episode_number))
            } else {
                Ordering::Equal
            }
        })
        .then_with(|| a.item.display_title().cmp(&b.item.display_title()))
}

/// Sort tasks in place, keeping the relative order of equal tasks
pub fn sort_tasks(tasks: &mut [DownloadTask]) {
    tasks.sort_by(display_order);
}
