//! Jellyfin Fetcher Library
//!
//! A Rust library for browsing a Jellyfin media catalog and downloading
//! selected items one at a time. The selection and the index of downloaded
//! files persist between runs.

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};

#[cfg(test)]
mod tests {
    use super::*;
    use constants::*;

    #[test]
    fn test_constants_accessible() {
        assert_eq!(env::API_KEY, "JELLYFIN_API_KEY");
        assert_eq!(queue::MAX_RETRIES, 2);
        assert!(http::USER_AGENT.contains("Jellyfin-Fetcher"));
    }

    #[test]
    fn test_error_types() {
        let catalog_error = errors::CatalogError::InvalidCredentials;
        let app_error = AppError::Catalog(catalog_error);

        assert_eq!(app_error.category(), "catalog");
        assert!(app_error.is_recoverable());
    }
}
