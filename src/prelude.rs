//! Prelude module for Jellyfin Fetcher Library
//!
//! This module re-exports the most commonly used items from the library,
//! providing a convenient way to import everything needed for typical usage
//! with a single `use jellyfin_fetcher::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use jellyfin_fetcher::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let session = Session::load(Box::new(JsonFileStore::default_location()?))?
//!         .with_overrides(EnvOverrides::from_env());
//!     let client = Arc::new(JellyfinClient::new(session.credentials())?);
//!     let cache = CatalogCache::new(client);
//!
//!     for library in cache.children_of("").await?.iter() {
//!         println!("{}", library.name);
//!     }
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, CatalogError, Result};

// Essential app components that are used in most integrations
pub use crate::app::{
    inbox,
    AppEvent,
    // Catalog access
    CatalogCache,
    CatalogItem,
    CatalogSource,
    ClientConfig,
    Command,
    // Core orchestration
    Coordinator,
    DownloadQueue,
    DownloadTask,
    DownloadedIndex,
    Flow,
    HierarchicalNavigator,
    JellyfinClient,
    JsonFileStore,
    NavigatorConfig,
    QueueConfig,
    // Persistent state
    SelectionSet,
    Session,
    Setting,
    TaskStatus,
};

// Credentials
pub use crate::auth::{Credentials, EnvOverrides};

// Commonly used constants
pub use crate::constants::env::{API_KEY as ENV_API_KEY, ENDPOINT as ENV_ENDPOINT};
pub use crate::constants::http::USER_AGENT;

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

pub use tokio;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_imports() {
        let _client_config = ClientConfig::default();
        let _navigator_config = NavigatorConfig::default();
        let queue_config = QueueConfig::default();

        assert_eq!(queue_config.max_retries, 2);
        assert_eq!(ENV_API_KEY, "JELLYFIN_API_KEY");
        assert!(USER_AGENT.contains("Jellyfin-Fetcher"));
    }

    #[test]
    fn test_prelude_integration_pattern() {
        use crate::app::session::MemoryStore;

        let mut session = Session::load(Box::new(MemoryStore::new())).unwrap();
        assert!(session.toggle_selected("m1").unwrap());
        assert!(session.selection().contains("m1"));
        assert!(!session.credentials().is_complete());
    }

    #[test]
    fn test_std_reexports() {
        let _path = PathBuf::from("/tmp/test");
        let data = Arc::new(42);
        assert_eq!(*data, 42);
    }
}
