//! File download operations with atomic writes and streaming
//!
//! The body is streamed into a hidden temporary file next to the destination,
//! which is renamed into place once complete. Cancellation or any failure
//! removes the temporary file. The final name comes from the
//! `Content-Disposition` header, falling back to the item id.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION};
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::app::models::sanitize_component;
use crate::app::queue::{CancelSignal, TransferReporter};
use crate::constants::{files, jellyfin};
use crate::errors::{TransferError, TransferResult};

/// One file transfer
pub struct DownloadHandler {
    client: Client,
    authorization: String,
}

impl DownloadHandler {
    /// Creates a new DownloadHandler sending `authorization` with each request
    pub fn new(client: Client, authorization: String) -> Self {
        Self {
            client,
            authorization,
        }
    }

    /// Run a transfer to completion and report its outcome
    pub async fn run(
        self,
        url: Url,
        item_id: String,
        destination_dir: PathBuf,
        reporter: TransferReporter,
    ) {
        let result = self
            .download_file(&url, &item_id, &destination_dir, &reporter)
            .await;
        match &result {
            Ok(path) => tracing::info!("Successfully downloaded: {}", path.display()),
            Err(TransferError::Cancelled) => tracing::debug!("Download of {} cancelled", item_id),
            Err(e) => tracing::warn!("Download of {} failed: {}", item_id, e),
        }
        reporter.finish(result);
    }

    /// Downloads `url` into `destination_dir`
    ///
    /// # Errors
    ///
    /// Returns `TransferError` if:
    /// - The request fails or the server answers with an error status
    /// - File I/O operations fail
    /// - The transfer is cancelled
    pub async fn download_file(
        &self,
        url: &Url,
        item_id: &str,
        destination_dir: &Path,
        reporter: &TransferReporter,
    ) -> TransferResult<PathBuf> {
        let mut cancel = reporter.cancel_signal();

        let response = tokio::select! {
            response = self
                .client
                .get(url.as_str())
                .header(jellyfin::AUTH_HEADER, &self.authorization)
                .send() => response?,
            _ = cancel.cancelled() => return Err(TransferError::Cancelled),
        };

        if !response.status().is_success() {
            return Err(TransferError::ServerError {
                status: response.status().as_u16(),
            });
        }

        if let Some(total) = response.content_length() {
            reporter.set_total(total);
        }

        let file_name = file_name_from_headers(response.headers())
            .unwrap_or_else(|| sanitize_component(item_id));
        let destination = destination_dir.join(file_name);
        let temp_path = temp_path_for(destination_dir, item_id);

        let mut file = File::create(&temp_path).await?;
        let streamed = stream_body(response, &mut file, reporter, &mut cancel).await;
        drop(file);

        if let Err(e) = streamed {
            remove_partial(&temp_path).await;
            return Err(e);
        }

        // Atomic move from temp file to final destination
        if let Err(e) = tokio::fs::rename(&temp_path, &destination).await {
            tracing::warn!(
                "Could not move {} to {}: {}",
                temp_path.display(),
                destination.display(),
                e
            );
            remove_partial(&temp_path).await;
            return Err(TransferError::AtomicOperationFailed {
                temp_path,
                final_path: destination,
            });
        }

        Ok(destination)
    }
}

/// Remove a partial file left by a failed or cancelled transfer
async fn remove_partial(temp_path: &Path) {
    if let Err(e) = tokio::fs::remove_file(temp_path).await {
        tracing::debug!("Could not remove {}: {}", temp_path.display(), e);
    }
}

async fn stream_body(
    response: reqwest::Response,
    file: &mut File,
    reporter: &TransferReporter,
    cancel: &mut CancelSignal,
) -> TransferResult<()> {
    let mut stream = response.bytes_stream();

    loop {
        tokio::select! {
            chunk = stream.next() => match chunk {
                Some(Ok(bytes)) => {
                    file.write_all(&bytes).await?;
                    reporter.add_transferred(bytes.len() as u64);
                }
                Some(Err(e)) => return Err(TransferError::Http(e)),
                None => break,
            },
            _ = cancel.cancelled() => return Err(TransferError::Cancelled),
        }
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}

/// Hidden, per-attempt temporary path inside `destination_dir`
fn temp_path_for(destination_dir: &Path, item_id: &str) -> PathBuf {
    destination_dir.join(format!(
        ".{}-{:08x}{}",
        sanitize_component(item_id),
        fastrand::u32(..),
        files::TEMP_FILE_SUFFIX
    ))
}

/// File name announced by `Content-Disposition`, sanitized
///
/// `filename*` (RFC 5987) wins over `filename`.
pub fn file_name_from_headers(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;
    parse_content_disposition(value)
        .map(|name| sanitize_component(&name))
        .filter(|name| name != "_")
}

fn parse_content_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for part in value.split(';').map(str::trim) {
        let Some((key, raw)) = part.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = raw.trim().trim_matches('"');
                // charset'language'percent-encoded-value
                let encoded = encoded.splitn(3, '\'').nth(2).unwrap_or(encoded);
                extended = Some(percent_decode(encoded));
            }
            "filename" => plain = Some(raw.trim().trim_matches('"').to_string()),
            _ => {}
        }
    }

    extended.or(plain).filter(|name| !name.trim().is_empty())
}

fn percent_decode(encoded: &str) -> String {
    // form_urlencoded also maps '+' to a space, which RFC 5987 never emits
    let query = format!("v={}", encoded.replace('+', "%2B"));
    url::form_urlencoded::parse(query.as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .unwrap_or_else(|| encoded.to_string())
}
