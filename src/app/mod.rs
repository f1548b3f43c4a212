//! Core application logic for Jellyfin Fetcher
//!
//! This module contains the catalog browser, the selection and download
//! state, the sequential download queue, the HTTP client that talks to the
//! Jellyfin server, and the coordinator that drives them all from one event
//! inbox.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use jellyfin_fetcher::app::{CatalogCache, CatalogSource, JellyfinClient};
//! use jellyfin_fetcher::auth::Credentials;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = JellyfinClient::new(Credentials::new("key", "", "http://localhost:8096"))?;
//! let cache = CatalogCache::new(Arc::new(client));
//!
//! // The first call fetches, the second is served from memory
//! let libraries = cache.children_of("").await?;
//! let again = cache.children_of("").await?;
//! assert_eq!(libraries.len(), again.len());
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod client;
pub mod coordinator;
pub mod events;
pub mod models;
pub mod navigator;
pub mod queue;
pub mod session;

// Re-export main public API
pub use catalog::{CatalogCache, CatalogSource};
pub use client::{ClientConfig, JellyfinClient};
pub use coordinator::{Coordinator, Flow, Prompt, Screen};
pub use events::{inbox, AppEvent, Command, EventReceiver, EventSender};
pub use models::{CatalogItem, DisplayRow};
pub use navigator::{HierarchicalNavigator, NavigationColumn, NavigatorConfig, ToggleOutcome};
pub use queue::{DownloadQueue, DownloadTask, QueueConfig, TaskStatus, Transferer};
pub use session::{DownloadedIndex, JsonFileStore, SelectionSet, Session, Setting};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        // Ensure public API is accessible
        let config = ClientConfig::default();
        assert!(config.tcp_nodelay);
        assert_eq!(NavigatorConfig::default().max_depth, 10);
    }
}
