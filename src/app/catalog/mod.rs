//! Catalog access
//!
//! [`CatalogSource`] is the collaborator that talks to the remote catalog.
//! [`CatalogCache`] memoizes its children listings for the whole session.

use async_trait::async_trait;

use crate::app::models::CatalogItem;
use crate::auth::Credentials;
use crate::errors::CatalogResult;

pub mod cache;

pub use cache::CatalogCache;

/// Remote catalog operations
///
/// Implementations return structured items or a [`CatalogError`]
/// classification, never raw transport errors.
///
/// [`CatalogError`]: crate::errors::CatalogError
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// List the children of `parent_id`, an empty id meaning the root
    async fn fetch_children(&self, parent_id: &str) -> CatalogResult<Vec<CatalogItem>>;

    /// Fetch metadata for the given ids
    ///
    /// An empty id list yields an empty result without a request.
    async fn fetch_metadata(&self, ids: &[String]) -> CatalogResult<Vec<CatalogItem>>;

    /// Swap the credentials used by later requests
    fn update_credentials(&self, _credentials: &Credentials) {}
}
