//! Panel image loading: data URIs, remote URLs and bare base64 payloads.

use super::Transport;
use crate::error::SubmitError;
use crate::model::{ImageSlot, LoadedImage, SourceKind};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use bytes::Bytes;
use std::time::Duration;

/// Standard alphabet, padding optional on decode (browsers accept unpadded data URIs).
const FORGIVING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Classify a source string without touching its payload.
pub fn source_kind(src: &str) -> SourceKind {
    let lower = src.trim_start().get(..8).unwrap_or(src).to_ascii_lowercase();
    if lower.starts_with("data:") {
        SourceKind::DataUri
    } else if lower.starts_with("http://") || lower.starts_with("https://") {
        SourceKind::Url
    } else {
        SourceKind::Base64
    }
}

fn decode_base64(payload: &str) -> Result<Vec<u8>, String> {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    FORGIVING.decode(compact).map_err(|e| e.to_string())
}

fn decode_data_uri(src: &str) -> Result<Vec<u8>, String> {
    let rest = src.trim().get(5..).ok_or("truncated data URI")?;
    let (header, payload) = rest.split_once(',').ok_or("data URI has no payload")?;
    if !header.to_ascii_lowercase().ends_with(";base64") {
        return Err(format!("unsupported data URI encoding: {header:?}"));
    }
    decode_base64(payload)
}

/// Decode bytes into an image and capture its format and dimensions.
pub fn inspect(bytes: Bytes, source: SourceKind) -> Result<LoadedImage, String> {
    let format = image::guess_format(&bytes).map_err(|e| e.to_string())?;
    let decoded = image::load_from_memory_with_format(&bytes, format).map_err(|e| e.to_string())?;
    Ok(LoadedImage {
        mime: format.to_mime_type().to_string(),
        width: decoded.width(),
        height: decoded.height(),
        bytes,
        source,
    })
}

/// Run CPU-bound work on the blocking pool instead of a runtime worker.
async fn off_runtime<F, R>(work: F) -> Result<R, String>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| format!("decoder task failed: {e}"))
}

/// Resolve and decode one panel source. Remote fetches are bounded by `timeout`.
pub async fn load_panel<T>(
    transport: &T,
    slot: ImageSlot,
    src: &str,
    timeout: Duration,
) -> Result<LoadedImage, SubmitError>
where
    T: Transport + ?Sized,
{
    let fail = |reason: String| SubmitError::ImageLoadFailure { slot, reason };
    let kind = source_kind(src);

    let bytes = match kind {
        SourceKind::DataUri => Bytes::from(decode_data_uri(src).map_err(fail)?),
        SourceKind::Base64 => Bytes::from(decode_base64(src).map_err(fail)?),
        SourceKind::Url => {
            match tokio::time::timeout(timeout, transport.fetch_image(src.trim())).await {
                Ok(Ok(b)) => b,
                Ok(Err(e)) => return Err(fail(e.to_string())),
                Err(_) => return Err(fail(format!("fetch timed out after {timeout:?}"))),
            }
        }
    };

    off_runtime(move || inspect(bytes, kind))
        .await
        .and_then(|decoded| decoded)
        .map_err(fail)
}
