use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::constants::SUPPORTED_IMAGE_TYPES;
use crate::error::{ErrorMetadata, ItemError};

/// One requested image, tagged by where its bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageDescriptor {
    /// Remote reference; the dealer API fetches the URL itself.
    Url {
        url: String,
        mime_type: Option<String>,
        filename: Option<String>,
    },
    /// File on the local filesystem, read before upload.
    LocalPath {
        path: PathBuf,
        filename: Option<String>,
    },
    /// Base64 payload supplied inline by the caller.
    Inline {
        data: String,
        mime_type: String,
        filename: Option<String>,
    },
}

impl ImageDescriptor {
    pub fn url(url: impl Into<String>) -> Self {
        ImageDescriptor::Url {
            url: url.into(),
            mime_type: None,
            filename: None,
        }
    }

    pub fn local_path(path: impl Into<PathBuf>) -> Self {
        ImageDescriptor::LocalPath {
            path: path.into(),
            filename: None,
        }
    }

    pub fn inline(
        data: impl Into<String>,
        mime_type: impl Into<String>,
        filename: Option<String>,
    ) -> Self {
        ImageDescriptor::Inline {
            data: data.into(),
            mime_type: mime_type.into(),
            filename,
        }
    }

    /// Classify a free-form reference: `http(s)://` is a URL, anything else a path.
    pub fn from_reference(reference: &str) -> Self {
        let trimmed = reference.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::url(trimmed)
        } else {
            Self::local_path(trimmed)
        }
    }

    pub fn source_kind(&self) -> &'static str {
        match self {
            ImageDescriptor::Url { .. } => "url",
            ImageDescriptor::LocalPath { .. } => "path",
            ImageDescriptor::Inline { .. } => "inline",
        }
    }

    /// Name reported back to the caller for the item at `index`.
    pub fn display_name(&self, index: usize) -> String {
        match self {
            ImageDescriptor::Url { filename, url, .. } => filename
                .clone()
                .or_else(|| last_url_segment(url))
                .unwrap_or_else(|| format!("image_{}", index + 1)),
            ImageDescriptor::LocalPath { filename, path } => filename
                .clone()
                .or_else(|| {
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .map(|s| s.to_string())
                })
                .unwrap_or_else(|| format!("image_{}", index + 1)),
            ImageDescriptor::Inline {
                filename,
                mime_type,
                ..
            } => filename.clone().unwrap_or_else(|| {
                format!(
                    "image_{}.{}",
                    index + 1,
                    extension_for_mime(mime_type).unwrap_or("jpg")
                )
            }),
        }
    }
}

fn last_url_segment(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let after_scheme = without_query
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(without_query);
    // Host only, no path segment to use as a name.
    let (_, path) = after_scheme.split_once('/')?;
    path.rsplit('/')
        .find(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Lowercase a declared media type and drop any parameters (`; charset=...`).
pub fn normalize_mime(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

pub fn is_supported_image_type(mime_type: &str) -> bool {
    let normalized = normalize_mime(mime_type);
    SUPPORTED_IMAGE_TYPES.contains(&normalized.as_str())
}

pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

pub fn extension_for_mime(mime_type: &str) -> Option<&'static str> {
    match normalize_mime(mime_type).as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Result of one descriptor in a batch. Exactly one of image id or error is set.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub index: usize,
    pub filename: String,
    pub main: bool,
    pub result: Result<String, ItemError>,
}

impl UploadOutcome {
    pub fn succeeded(index: usize, filename: String, main: bool, image_id: String) -> Self {
        Self {
            index,
            filename,
            main,
            result: Ok(image_id),
        }
    }

    pub fn failed(index: usize, filename: String, main: bool, error: ItemError) -> Self {
        Self {
            index,
            filename,
            main,
            result: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub index: usize,
    pub filename: String,
    pub image_id: String,
    pub main: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFailure {
    pub index: usize,
    pub filename: String,
    pub kind: &'static str,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Batch-level result returned to the tool caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReport {
    pub success: bool,
    pub uploaded_count: usize,
    pub uploaded_images: Vec<UploadedImage>,
    pub errors: Vec<UploadFailure>,
    /// Set when the batch was cancelled before every item completed.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,
    #[serde(skip)]
    pub outcomes: Vec<UploadOutcome>,
}

impl UploadReport {
    /// Assemble a report from outcomes in any order.
    ///
    /// Success requires at least one uploaded image and, when `main_index` is
    /// set, that the main image itself was uploaded.
    pub fn from_outcomes(
        mut outcomes: Vec<UploadOutcome>,
        main_index: Option<usize>,
        partial: bool,
    ) -> Self {
        outcomes.sort_by_key(|o| o.index);

        let mut uploaded_images = Vec::new();
        let mut errors = Vec::new();
        for outcome in &outcomes {
            match &outcome.result {
                Ok(image_id) => uploaded_images.push(UploadedImage {
                    index: outcome.index,
                    filename: outcome.filename.clone(),
                    image_id: image_id.clone(),
                    main: outcome.main,
                }),
                Err(e) => errors.push(UploadFailure {
                    index: outcome.index,
                    filename: outcome.filename.clone(),
                    kind: e.error_code(),
                    error: e.to_string(),
                    status: e.status(),
                    details: e.body().cloned(),
                }),
            }
        }

        let uploaded_count = uploaded_images.len();
        let main_ok = match main_index {
            Some(main) => outcomes.iter().any(|o| o.index == main && o.is_success()),
            None => true,
        };

        Self {
            success: uploaded_count > 0 && main_ok,
            uploaded_count,
            uploaded_images,
            errors,
            partial,
            outcomes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    fn ok(index: usize, main: bool) -> UploadOutcome {
        UploadOutcome::succeeded(index, format!("img{}.jpg", index), main, format!("id-{}", index))
    }

    fn bad(index: usize, main: bool) -> UploadOutcome {
        UploadOutcome::failed(
            index,
            format!("img{}.jpg", index),
            main,
            ItemError::InvalidEncoding("not base64".into()),
        )
    }

    #[test]
    fn from_reference_classifies_by_scheme() {
        assert_eq!(
            ImageDescriptor::from_reference("https://cdn.example.com/a.jpg").source_kind(),
            "url"
        );
        assert_eq!(
            ImageDescriptor::from_reference("HTTP://cdn.example.com/a.jpg").source_kind(),
            "url"
        );
        assert_eq!(
            ImageDescriptor::from_reference("/tmp/photos/a.jpg").source_kind(),
            "path"
        );
    }

    #[test]
    fn display_name_fallbacks() {
        let url = ImageDescriptor::url("https://cdn.example.com/cars/front.jpg?w=800");
        assert_eq!(url.display_name(0), "front.jpg");

        let bare_host = ImageDescriptor::url("https://cdn.example.com");
        assert_eq!(bare_host.display_name(2), "image_3");

        let path = ImageDescriptor::local_path("/tmp/photos/rear.png");
        assert_eq!(path.display_name(0), "rear.png");

        let inline = ImageDescriptor::inline("AAAA", "image/png", None);
        assert_eq!(inline.display_name(1), "image_2.png");

        let named = ImageDescriptor::inline("AAAA", "image/png", Some("dash.png".into()));
        assert_eq!(named.display_name(1), "dash.png");
    }

    #[test]
    fn mime_helpers() {
        assert!(is_supported_image_type("image/PNG"));
        assert!(is_supported_image_type("image/jpeg; charset=binary"));
        assert!(!is_supported_image_type("application/pdf"));
        assert_eq!(mime_from_extension(Path::new("a.JPEG")), Some("image/jpeg"));
        assert_eq!(mime_from_extension(Path::new("a.pdf")), None);
        assert_eq!(extension_for_mime("image/webp"), Some("webp"));
    }

    #[test]
    fn report_preserves_request_order() {
        let report = UploadReport::from_outcomes(
            vec![ok(2, false), bad(1, false), ok(0, true), bad(3, false)],
            Some(0),
            false,
        );
        let indices: Vec<usize> = report.outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(
            report
                .uploaded_images
                .iter()
                .map(|i| i.index)
                .collect::<Vec<_>>(),
            vec![0, 2]
        );
        assert_eq!(
            report.errors.iter().map(|e| e.index).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert!(report.success);
        assert_eq!(report.uploaded_count, 2);
    }

    #[test]
    fn report_fails_when_main_image_fails() {
        let report = UploadReport::from_outcomes(vec![bad(0, true), ok(1, false)], Some(0), false);
        assert!(!report.success);
        assert_eq!(report.uploaded_count, 1);
    }

    #[test]
    fn report_fails_with_zero_uploads() {
        let report = UploadReport::from_outcomes(vec![bad(0, false)], None, false);
        assert!(!report.success);
        assert_eq!(report.uploaded_count, 0);
    }

    #[test]
    fn report_serializes_wire_shape() {
        let remote = UploadOutcome::failed(
            1,
            "b.jpg".into(),
            false,
            ItemError::Upload(ApiError::Remote {
                status: 422,
                message: "too large".into(),
                body: Some(serde_json::json!({ "error": "too large" })),
            }),
        );
        let report = UploadReport::from_outcomes(vec![ok(0, true), remote], Some(0), false);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["uploadedCount"], 1);
        assert_eq!(json["uploadedImages"][0]["imageId"], "id-0");
        assert_eq!(json["uploadedImages"][0]["main"], true);
        assert_eq!(json["errors"][0]["kind"], "RemoteRequestFailure");
        assert_eq!(json["errors"][0]["status"], 422);
        assert_eq!(json["errors"][0]["details"]["error"], "too large");
        assert!(json.get("partial").is_none());
        assert!(json.get("outcomes").is_none());
    }
}
