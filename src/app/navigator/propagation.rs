//! Subtree walk behind folder selection
//!
//! Toggling a folder applies the same add or remove to every descendant. The
//! walk goes level by level through the [`CatalogCache`], fetching the children
//! of one frontier level concurrently, so toggling the same folder twice sees
//! the same snapshot and removes exactly what it added.

use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::app::catalog::CatalogCache;
use crate::errors::CatalogResult;

/// Bounds on one subtree walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkLimits {
    /// Stop after collecting this many descendants
    pub max_nodes: usize,
    /// Do not descend below this many levels
    pub max_depth: usize,
    /// Children listings fetched at once
    pub concurrency: usize,
}

/// Collect the ids of every descendant of `root_id`
///
/// The root itself is not included. Hitting a limit truncates the result
/// with a warning instead of failing.
pub async fn collect_descendants(
    cache: &CatalogCache,
    root_id: &str,
    limits: WalkLimits,
) -> CatalogResult<Vec<String>> {
    let mut collected = Vec::new();
    let mut seen: HashSet<String> = HashSet::from([root_id.to_string()]);
    let mut frontier = vec![root_id.to_string()];
    let mut depth = 0;

    while !frontier.is_empty() {
        if depth >= limits.max_depth {
            warn!(
                "Selection of {} stopped at depth {}, {} folders not walked",
                root_id,
                depth,
                frontier.len()
            );
            break;
        }

        let listings: Vec<_> = stream::iter(std::mem::take(&mut frontier))
            .map(|parent_id| {
                let cache = cache.clone();
                async move { cache.children_of(&parent_id).await }
            })
            .buffered(limits.concurrency.max(1))
            .collect()
            .await;

        let mut next = Vec::new();
        for listing in listings {
            for child in listing?.iter() {
                if !seen.insert(child.id.clone()) {
                    continue;
                }
                if collected.len() >= limits.max_nodes {
                    warn!(
                        "Selection of {} truncated at {} items",
                        root_id, limits.max_nodes
                    );
                    return Ok(collected);
                }
                collected.push(child.id.clone());
                if child.is_folder {
                    next.push(child.id.clone());
                }
            }
        }

        frontier = next;
        depth += 1;
    }

    debug!(
        "Collected {} descendants of {} over {} levels",
        collected.len(),
        root_id,
        depth
    );
    Ok(collected)
}
