//! Camp image uploads through the presigned-URL proxy.
//!
//! The browser-facing backend issues short-lived scoped write URLs; the
//! coordinator performs the direct binary transfer and reports
//! fractional progress. Storage credentials never reach this crate.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::{header, Body, Client, StatusCode};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Chunk size for the streamed binary transfer.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Upload timeout in seconds. Longer than the API timeout to allow
/// multi-megabyte images on slow links.
const UPLOAD_TIMEOUT_SECS: u64 = 300;

/// Channel used to report fractional upload progress (0-100).
pub type ProgressSender = mpsc::UnboundedSender<u8>;

/// A reserved slot in object storage: a short-lived write URL plus the
/// storage key the object will live under.
///
/// The key is only valid for attachment to a camp record after the
/// binary transfer completed successfully.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadSlot {
    #[serde(rename = "presignedUrl")]
    pub presigned_url: String,
    pub key: String,
}

/// Coordinates image uploads against the upload proxy.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct UploadCoordinator {
    client: Client,
    base_url: Arc<String>,
}

impl UploadCoordinator {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(UPLOAD_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: Arc::new(base_url.into()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Ask the proxy for a short-lived write URL and storage key.
    pub async fn request_upload_slot(
        &self,
        file_name: &str,
        file_type: &str,
    ) -> Result<UploadSlot, ApiError> {
        if file_name.trim().is_empty() || file_type.trim().is_empty() {
            return Err(ApiError::Validation(
                "fileName and fileType are required".to_string(),
            ));
        }

        let body = serde_json::json!({ "fileName": file_name, "fileType": file_type });
        let response = self
            .client
            .post(self.url("/api/upload/presigned"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ApiError::Upload(ApiError::extract_message(&text)));
        }

        let slot: UploadSlot = serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to decode upload slot: {}", e))
        })?;
        debug!(key = %slot.key, "Upload slot reserved");
        Ok(slot)
    }

    /// PUT the bytes to the slot's presigned URL, reporting progress.
    ///
    /// Resolves with the storage key only after the transfer's terminal
    /// status is known; progress reaches 100 when the last byte is
    /// handed to the transport.
    pub async fn upload_bytes(
        &self,
        slot: &UploadSlot,
        data: Vec<u8>,
        content_type: &str,
        progress: Option<ProgressSender>,
    ) -> Result<String, ApiError> {
        let total = data.len();
        debug!(key = %slot.key, total, "Starting binary upload");

        let body = Body::wrap_stream(progress_stream(data, progress));
        let response = self
            .client
            .put(&slot.presigned_url)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, total as u64)
            .body(body)
            .send()
            .await
            .map_err(|e| ApiError::Upload(format!("Binary transfer failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(key = %slot.key, %status, "Binary upload rejected");
            return Err(ApiError::Upload(format!(
                "Status {}: {}",
                status,
                ApiError::extract_message(&text)
            )));
        }

        debug!(key = %slot.key, "Binary upload complete");
        Ok(slot.key.clone())
    }

    /// Read a file and upload it to the slot.
    pub async fn upload_file(
        &self,
        slot: &UploadSlot,
        path: &Path,
        content_type: &str,
        progress: Option<ProgressSender>,
    ) -> Result<String, ApiError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::Upload(format!("Failed to read {}: {}", path.display(), e)))?;
        self.upload_bytes(slot, data, content_type, progress).await
    }

    /// Delete a previously reserved object, e.g. when the user swaps
    /// the image before submitting the form.
    ///
    /// Safe to call on a key that never finished uploading; a missing
    /// object is treated as released.
    pub async fn release_slot(&self, key: &str) -> Result<(), ApiError> {
        if key.trim().is_empty() {
            return Ok(());
        }

        let body = serde_json::json!({ "fileKey": key });
        let response = self
            .client
            .delete(self.url("/api/upload/delete"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if release_status_ok(status) {
            debug!(key, "Storage object released");
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(ApiError::Upload(format!(
                "Status {}: {}",
                status,
                ApiError::extract_message(&text)
            )))
        }
    }
}

/// A delete against an object that never finished uploading comes back
/// 404; that still counts as released.
fn release_status_ok(status: StatusCode) -> bool {
    status.is_success() || status == StatusCode::NOT_FOUND
}

fn progress_percent(sent: usize, total: usize) -> u8 {
    if total == 0 {
        100
    } else {
        ((sent as u128 * 100) / total as u128) as u8
    }
}

/// Chunk `data` into a byte stream, reporting cumulative percentages
/// through `progress`. Duplicate percentages are coalesced, so the
/// reported sequence is strictly increasing and ends at 100.
fn progress_stream(
    data: Vec<u8>,
    progress: Option<ProgressSender>,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
    let total = data.len();
    let chunks: Vec<Bytes> = data
        .chunks(UPLOAD_CHUNK_SIZE)
        .map(Bytes::copy_from_slice)
        .collect();

    if let Some(progress) = &progress {
        // Empty bodies have nothing to stream; report completion up front
        let _ = progress.send(if total == 0 { 100 } else { 0 });
    }

    let mut sent = 0usize;
    let mut last_percent = 0u8;
    futures::stream::iter(chunks).map(move |chunk| {
        sent += chunk.len();
        if let Some(progress) = &progress {
            let percent = progress_percent(sent, total);
            if percent != last_percent {
                last_percent = percent;
                let _ = progress.send(percent);
            }
        }
        Ok(chunk)
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<u8>) -> Vec<u8> {
        let mut values = Vec::new();
        while let Ok(value) = rx.try_recv() {
            values.push(value);
        }
        values
    }

    #[tokio::test]
    async fn test_progress_monotone_and_complete_for_2mb() {
        let data = vec![0u8; 2 * 1024 * 1024];
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut stream = progress_stream(data, Some(tx));
        let mut transferred = 0usize;
        while let Some(chunk) = stream.next().await {
            transferred += chunk.expect("chunks never fail").len();
        }
        drop(stream);

        assert_eq!(transferred, 2 * 1024 * 1024);

        let values = drain(&mut rx);
        assert!(!values.is_empty());
        assert_eq!(*values.first().unwrap(), 0);
        assert_eq!(*values.last().unwrap(), 100);
        assert!(
            values.windows(2).all(|w| w[0] <= w[1]),
            "progress must be monotonically non-decreasing: {:?}",
            values
        );
    }

    #[tokio::test]
    async fn test_progress_for_empty_body_reports_completion() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut stream = progress_stream(Vec::new(), Some(tx));
        assert!(stream.next().await.is_none());
        drop(stream);

        assert_eq!(drain(&mut rx), vec![100]);
    }

    #[tokio::test]
    async fn test_progress_for_tiny_body_jumps_to_100() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut stream = progress_stream(vec![1, 2, 3], Some(tx));
        while stream.next().await.is_some() {}
        drop(stream);

        assert_eq!(drain(&mut rx), vec![0, 100]);
    }

    #[test]
    fn test_progress_percent_bounds() {
        assert_eq!(progress_percent(0, 0), 100);
        assert_eq!(progress_percent(0, 10), 0);
        assert_eq!(progress_percent(5, 10), 50);
        assert_eq!(progress_percent(10, 10), 100);
    }

    #[test]
    fn test_release_tolerates_missing_objects() {
        assert!(release_status_ok(StatusCode::OK));
        assert!(release_status_ok(StatusCode::NO_CONTENT));
        assert!(release_status_ok(StatusCode::NOT_FOUND));
        assert!(!release_status_ok(StatusCode::FORBIDDEN));
        assert!(!release_status_ok(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_slot_request_requires_name_and_type() {
        let coordinator = UploadCoordinator::new("http://localhost:9").unwrap();

        let result = coordinator.request_upload_slot("", "image/png").await;
        assert!(matches!(result, Err(ApiError::Validation(_))));

        let result = coordinator.request_upload_slot("camp.png", " ").await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_release_on_unreserved_key_is_noop() {
        let coordinator = UploadCoordinator::new("http://localhost:9").unwrap();
        // An empty key means nothing was ever reserved; no network call
        assert!(coordinator.release_slot("").await.is_ok());
    }

    #[test]
    fn test_parse_upload_slot() {
        let json = r#"{"presignedUrl": "https://storage.example.com/put?sig=abc", "key": "uploads/1717000000000-camp.png"}"#;
        let slot: UploadSlot = serde_json::from_str(json).expect("slot should parse");
        assert_eq!(slot.key, "uploads/1717000000000-camp.png");
    }
}
