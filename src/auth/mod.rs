//! Credential management for the Jellyfin server
//!
//! This module provides the credential type shared by the HTTP client and the
//! session, environment overrides, and interactive prompts.
//!
//! # Examples
//!
//! ```rust
//! use jellyfin_fetcher::auth::{Credentials, EnvOverrides};
//!
//! let stored = Credentials::new("key", "", "https://media.example.org/");
//! let effective = EnvOverrides::default().apply(&stored);
//! assert_eq!(effective.endpoint, "https://media.example.org");
//! ```

pub mod credentials;

// Re-export main public API
pub use credentials::{mask, normalize_endpoint, prompt_setting, Credentials, EnvOverrides};
