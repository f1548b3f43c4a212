//! HTTP client for the Jellyfin REST API
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `http`: Rate-limited catalog requests and failure classification
//! - `download`: File download operations with atomic writes
//!
//! [`JellyfinClient`] implements both collaborator seams: [`CatalogSource`]
//! for the navigator and the download queue, and [`Transferer`] for file
//! transfers.
//!
//! # Examples
//!
//! ```rust,no_run
//! use jellyfin_fetcher::app::catalog::CatalogSource;
//! use jellyfin_fetcher::app::JellyfinClient;
//! use jellyfin_fetcher::auth::Credentials;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = JellyfinClient::new(Credentials::new("key", "", "http://localhost:8096"))?;
//! for item in client.fetch_children("").await? {
//!     println!("{}", item.name);
//! }
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::app::catalog::CatalogSource;
use crate::app::models::{CatalogItem, ItemsResponse};
use crate::app::queue::{TransferHandle, Transferer};
use crate::auth::Credentials;
use crate::constants::jellyfin;
use crate::errors::{CatalogError, CatalogResult, Result, TransferError};

pub mod config;
pub mod download;
pub mod http;

pub use config::ClientConfig;
pub use http::{authorization_header, classify_status};

use download::DownloadHandler;
use http::HttpHandler;

struct ClientInner {
    http: HttpHandler,
    download_client: Client,
    credentials: RwLock<Credentials>,
    config: ClientConfig,
}

/// Jellyfin API client
///
/// Cheap to clone; clones share the rate limiter, connection pools and
/// credentials.
#[derive(Clone)]
pub struct JellyfinClient {
    inner: Arc<ClientInner>,
}

impl JellyfinClient {
    /// Creates a client with the default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP clients cannot be built
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_config(credentials, ClientConfig::default())
    }

    /// Creates a client with custom configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP clients cannot be built or the rate
    /// limit is zero
    pub fn with_config(credentials: Credentials, config: ClientConfig) -> Result<Self> {
        let http = HttpHandler::new(config.build_http_client()?, config.rate_limit_rps)?;
        let download_client = config.build_download_client()?;

        tracing::info!("Created Jellyfin client for {}", credentials.endpoint);

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                download_client,
                credentials: RwLock::new(credentials),
                config,
            }),
        })
    }

    /// Current credentials
    pub fn credentials(&self) -> Credentials {
        match self.inner.credentials.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Items listing URL for the current user
    fn items_url(&self, credentials: &Credentials) -> CatalogResult<Url> {
        let user_id = if credentials.user_id.is_empty() {
            jellyfin::DEFAULT_USER_ID
        } else {
            credentials.user_id.as_str()
        };
        endpoint_url(
            &credentials.endpoint,
            &[jellyfin::USERS_SEGMENT, user_id, jellyfin::ITEMS_SEGMENT],
        )
    }

    /// Download URL of one item
    pub fn download_url(&self, item_id: &str) -> CatalogResult<Url> {
        endpoint_url(
            &self.credentials().endpoint,
            &[jellyfin::ITEMS_SEGMENT, item_id, jellyfin::DOWNLOAD_SEGMENT],
        )
    }

    async fn query_items(&self, query: Option<(&str, &str)>) -> CatalogResult<Vec<CatalogItem>> {
        let credentials = self.credentials();
        let mut url = self.items_url(&credentials)?;
        if let Some((key, value)) = query {
            url.query_pairs_mut().append_pair(key, value);
        }

        let response: ItemsResponse = self
            .inner
            .http
            .get_json(&url, &authorization_header(&credentials.api_key))
            .await?;
        Ok(response.items)
    }
}

/// `endpoint` with `segments` appended, each one percent-encoded
fn endpoint_url(endpoint: &str, segments: &[&str]) -> CatalogResult<Url> {
    let mut url = Url::parse(endpoint).map_err(|e| {
        tracing::warn!("Invalid endpoint {:?}: {}", endpoint, e);
        CatalogError::InvalidEndpoint
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CatalogError::InvalidEndpoint);
    }
    url.path_segments_mut()
        .map_err(|_| CatalogError::InvalidEndpoint)?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[async_trait]
impl CatalogSource for JellyfinClient {
    async fn fetch_children(&self, parent_id: &str) -> CatalogResult<Vec<CatalogItem>> {
        if parent_id.is_empty() {
            self.query_items(None).await
        } else {
            self.query_items(Some(("parentId", parent_id))).await
        }
    }

    async fn fetch_metadata(&self, ids: &[String]) -> CatalogResult<Vec<CatalogItem>> {
        let chunk_size = self.inner.config.metadata_chunk_size.max(1);
        let mut items = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(chunk_size) {
            let joined = chunk.join(",");
            items.extend(self.query_items(Some(("ids", &joined))).await?);
        }

        Ok(items)
    }

    fn update_credentials(&self, credentials: &Credentials) {
        tracing::info!("Using endpoint {}", credentials.endpoint);
        match self.inner.credentials.write() {
            Ok(mut guard) => *guard = credentials.clone(),
            Err(poisoned) => *poisoned.into_inner() = credentials.clone(),
        }
    }
}

impl Transferer for JellyfinClient {
    fn begin_transfer(&self, item: &CatalogItem, destination_dir: &Path) -> TransferHandle {
        let url = match self.download_url(&item.id) {
            Ok(url) => url,
            Err(e) => {
                return TransferHandle::finished(Err(TransferError::InvalidUrl {
                    url: self.credentials().endpoint,
                    error: e.to_string(),
                }))
            }
        };

        let (handle, reporter) = TransferHandle::channel();
        let handler = DownloadHandler::new(
            self.inner.download_client.clone(),
            authorization_header(&self.credentials().api_key),
        );
        tokio::spawn(handler.run(
            url,
            item.id.clone(),
            destination_dir.to_path_buf(),
            reporter,
        ));
        handle
    }
}

impl std::fmt::Debug for JellyfinClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JellyfinClient")
            .field("credentials", &self.credentials())
            .finish()
    }
}
