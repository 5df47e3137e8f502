use std::path::{Component, Path};

use base64::Engine;
use bytes::Bytes;
use dealerlink_api_client::ImageUpload;
use dealerlink_core::models::image::{is_supported_image_type, mime_from_extension, normalize_mime};
use dealerlink_core::{ImageDescriptor, ItemError};

/// Turn a descriptor into something the upload endpoint accepts.
///
/// Inline payloads are checked for media type before they are decoded, so a
/// PDF with a broken payload reports `UnsupportedMediaType`.
pub async fn normalize(
    descriptor: &ImageDescriptor,
    filename: &str,
    main: bool,
) -> Result<ImageUpload, ItemError> {
    match descriptor {
        ImageDescriptor::Url { url, mime_type, .. } => {
            let parsed = reqwest::Url::parse(url.trim()).map_err(|e| {
                ItemError::UnreadableSource(format!("invalid URL '{}': {}", url, e))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ItemError::UnreadableSource(format!(
                    "unsupported URL scheme '{}'",
                    parsed.scheme()
                )));
            }
            if let Some(mime_type) = mime_type {
                ensure_supported(mime_type)?;
            }
            Ok(ImageUpload::Url {
                url: url.trim().to_string(),
                main,
            })
        }
        ImageDescriptor::LocalPath { path, .. } => {
            let (data, mime_type) = read_local(path).await?;
            Ok(ImageUpload::File {
                data,
                mime_type: mime_type.to_string(),
                filename: filename.to_string(),
                main,
            })
        }
        ImageDescriptor::Inline {
            data, mime_type, ..
        } => {
            ensure_supported(mime_type)?;
            let decoded = decode_inline(data)?;
            Ok(ImageUpload::Encoded {
                data: Bytes::from(decoded),
                mime_type: normalize_mime(mime_type),
                filename: filename.to_string(),
                main,
            })
        }
    }
}

fn ensure_supported(mime_type: &str) -> Result<(), ItemError> {
    if is_supported_image_type(mime_type) {
        Ok(())
    } else {
        Err(ItemError::UnsupportedMediaType(mime_type.to_string()))
    }
}

/// Decode an inline base64 payload, with or without a `data:` URL prefix.
pub fn decode_inline(data: &str) -> Result<Vec<u8>, ItemError> {
    let trimmed = data.trim();
    let payload = match trimmed.strip_prefix("data:") {
        Some(rest) => match rest.split_once(',') {
            Some((_, encoded)) => encoded,
            None => {
                return Err(ItemError::InvalidEncoding(
                    "data URL has no payload".to_string(),
                ))
            }
        },
        None => trimmed,
    };
    // Line-wrapped base64 is common in pasted payloads.
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| ItemError::InvalidEncoding(format!("payload is not valid base64: {}", e)))?;
    if decoded.is_empty() {
        return Err(ItemError::InvalidEncoding(
            "payload decodes to zero bytes".to_string(),
        ));
    }
    Ok(decoded)
}

async fn read_local(path: &Path) -> Result<(Bytes, &'static str), ItemError> {
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(ItemError::UnreadableSource(format!(
            "{}: parent directory components are not allowed",
            path.display()
        )));
    }
    let mime_type = mime_from_extension(path).ok_or_else(|| {
        ItemError::UnsupportedMediaType(format!(
            "{}: unrecognized file extension",
            path.display()
        ))
    })?;
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| ItemError::UnreadableSource(format!("{}: {}", path.display(), e)))?;
    if data.is_empty() {
        return Err(ItemError::UnreadableSource(format!(
            "{}: file is empty",
            path.display()
        )));
    }
    Ok((Bytes::from(data), mime_type))
}
