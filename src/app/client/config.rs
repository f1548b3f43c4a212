//! HTTP client configuration and building logic
//!
//! Two clients are built from one configuration: the catalog client with a
//! whole-request timeout, and the download client that only bounds connection
//! setup so long transfers are not cut off.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::constants::http;
use crate::errors::{TransferError, TransferResult};

/// Configuration for the Jellyfin HTTP clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// TCP keep-alive settings
    pub tcp_keepalive: Option<Duration>,
    /// TCP nodelay (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout
    pub pool_idle_timeout: Option<Duration>,
    /// Timeout of one catalog request
    pub request_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Catalog requests per second
    pub rate_limit_rps: u32,
    /// Maximum ids per metadata request
    pub metadata_chunk_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tcp_keepalive: Some(Duration::from_secs(30)),
            tcp_nodelay: true,
            pool_idle_timeout: Some(http::POOL_IDLE_TIMEOUT),
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            rate_limit_rps: http::DEFAULT_RATE_LIMIT_RPS,
            metadata_chunk_size: http::METADATA_CHUNK_SIZE,
        }
    }
}

impl ClientConfig {
    /// Builds the catalog client
    pub fn build_http_client(&self) -> TransferResult<Client> {
        self.builder()
            .timeout(self.request_timeout)
            .build()
            .map_err(TransferError::Http)
    }

    /// Builds the download client, which has no overall timeout
    pub fn build_download_client(&self) -> TransferResult<Client> {
        self.builder().build().map_err(TransferError::Http)
    }

    fn builder(&self) -> reqwest::ClientBuilder {
        let mut client_builder = Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(http::USER_AGENT)
            .tcp_nodelay(self.tcp_nodelay);

        // Configure TCP keep-alive if specified
        if let Some(keepalive) = self.tcp_keepalive {
            client_builder = client_builder.tcp_keepalive(keepalive);
        }

        // Configure connection pool idle timeout
        if let Some(idle_timeout) = self.pool_idle_timeout {
            client_builder = client_builder.pool_idle_timeout(idle_timeout);
        }

        client_builder
    }
}
