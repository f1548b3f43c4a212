//! Core HTTP operations with rate limiting and failure classification
//!
//! Every catalog request goes through the rate limiter and ends up either as
//! a decoded body or as one of the [`CatalogError`] classifications the UI
//! knows how to act on.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::constants::jellyfin;
use crate::errors::{CatalogError, CatalogResult, ConfigError, ConfigResult};

/// HTTP operations handler with rate limiting
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpHandler {
    /// Creates a new HttpHandler with the given client and rate limiting
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the rate limit is zero
    pub fn new(client: Client, rate_limit_rps: u32) -> ConfigResult<Self> {
        let rate_limiter = Self::build_rate_limiter(rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
        })
    }

    /// Builds the rate limiter with the specified rate limit
    fn build_rate_limiter(
        rate_limit_rps: u32,
    ) -> ConfigResult<RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>> {
        let quota = Quota::per_second(NonZeroU32::new(rate_limit_rps).ok_or_else(|| {
            ConfigError::InvalidValue {
                field: "client.rate_limit_rps".to_string(),
                value: rate_limit_rps.to_string(),
                reason: "Rate limit must be non-zero".to_string(),
            }
        })?);
        Ok(RateLimiter::direct(quota))
    }

    /// Fetch `url` and decode its JSON body
    ///
    /// Transport failures map to `InvalidEndpoint`, 401 to
    /// `InvalidCredentials`, 400 to `InvalidUser`, and any other non-2xx
    /// status or undecodable body to `Other`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        authorization: &str,
    ) -> CatalogResult<T> {
        // Apply rate limiting with jitter to avoid bursts
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
            .await;

        tracing::debug!("Fetching {}", url);
        let response = self
            .client
            .get(url.as_str())
            .header(jellyfin::AUTH_HEADER, authorization)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Request to {} failed: {}", url, e);
                CatalogError::InvalidEndpoint
            })?;

        let status = response.status();
        if let Some(error) = classify_status(status) {
            tracing::warn!("{} answered HTTP {}", url, status.as_u16());
            return Err(error);
        }

        let body = response.bytes().await.map_err(|e| {
            tracing::warn!("Reading response from {} failed: {}", url, e);
            CatalogError::InvalidEndpoint
        })?;

        serde_json::from_slice(&body)
            .map_err(|e| CatalogError::other(format!("Invalid response from server: {}", e)))
    }

    /// Get a reference to the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Classify a response status, `None` for success
pub fn classify_status(status: StatusCode) -> Option<CatalogError> {
    match status {
        s if s.is_success() => None,
        StatusCode::UNAUTHORIZED => Some(CatalogError::InvalidCredentials),
        StatusCode::BAD_REQUEST => Some(CatalogError::InvalidUser),
        s => Some(CatalogError::other(format!(
            "Server responded with error code {}",
            s.as_u16()
        ))),
    }
}

/// Value of the `X-Emby-Authorization` header for `token`
pub fn authorization_header(token: &str) -> String {
    format!(
        "MediaBrowser Client=\"{}\", Device=\"{}\", DeviceId=\"{}\", Version=\"{}\", Token=\"{}\"",
        jellyfin::CLIENT_NAME,
        jellyfin::DEVICE_NAME,
        jellyfin::DEVICE_ID,
        jellyfin::CLIENT_VERSION,
        token
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::config::ClientConfig;

    #[tokio::test]
    async fn test_rate_limiter_creation() {
        let rate_limiter = HttpHandler::build_rate_limiter(5).unwrap();
        rate_limiter.until_ready().await;
    }

    #[test]
    fn test_rate_limiter_zero_fails() {
        let result = HttpHandler::build_rate_limiter(0);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_http_handler_creation() {
        let config = ClientConfig::default();
        let client = config.build_http_client().unwrap();
        let handler = HttpHandler::new(client, 5);
        assert!(handler.is_ok());
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(classify_status(StatusCode::OK), None);
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED),
            Some(CatalogError::InvalidCredentials)
        );
        assert_eq!(
            classify_status(StatusCode::BAD_REQUEST),
            Some(CatalogError::InvalidUser)
        );
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            Some(CatalogError::Other(_))
        ));
    }

    #[test]
    fn test_authorization_header() {
        let header = authorization_header("abc123");
        assert!(header.starts_with("MediaBrowser Client=\"Download Client\""));
        assert!(header.contains("DeviceId=\"PlRvNOqV9GYvBBUssdhY\""));
        assert!(header.ends_with("Token=\"abc123\""));
    }
}
