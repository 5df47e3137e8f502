//! Domain methods for the dealer-management API client.
//!
//! Vehicle payloads are passed through as `serde_json::Value`; translating a
//! simplified vehicle description into the remote schema happens elsewhere.

use base64::Engine;
use bytes::Bytes;
use dealerlink_core::models::{PublishRequest, VehicleSearch};
use dealerlink_core::ApiError;

use crate::{ApiClient, ApiRequest, RequestBody};

/// One image to attach to a vehicle record.
#[derive(Clone, Debug)]
pub enum ImageUpload {
    /// The remote service fetches the URL itself.
    Url { url: String, main: bool },
    /// Sent as JSON with base64 content and a declared media type.
    Encoded {
        data: Bytes,
        mime_type: String,
        filename: String,
        main: bool,
    },
    /// Sent as a multipart file part.
    File {
        data: Bytes,
        mime_type: String,
        filename: String,
        main: bool,
    },
}

impl ImageUpload {
    fn into_body(self) -> RequestBody {
        match self {
            ImageUpload::Url { url, main } => RequestBody::Json(serde_json::json!({
                "url": url,
                "main": main,
            })),
            ImageUpload::Encoded {
                data,
                mime_type,
                filename,
                main,
            } => RequestBody::Json(serde_json::json!({
                "data": base64::engine::general_purpose::STANDARD.encode(&data),
                "mimeType": mime_type,
                "filename": filename,
                "main": main,
            })),
            ImageUpload::File {
                data,
                mime_type,
                filename,
                main,
            } => RequestBody::Multipart {
                file_field: "file".to_string(),
                data,
                filename,
                content_type: mime_type,
                fields: vec![("main".to_string(), main.to_string())],
            },
        }
    }
}

/// Image id from an upload response: `id`, `imageId` or `image_id`, possibly
/// wrapped in an `image` or `data` object. Numeric ids are stringified.
pub fn extract_image_id(value: &serde_json::Value) -> Option<String> {
    for key in ["id", "imageId", "image_id"] {
        match value.get(key) {
            Some(serde_json::Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(serde_json::Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    ["image", "data"]
        .iter()
        .filter_map(|key| value.get(*key))
        .find_map(extract_image_id)
}

impl ApiClient {
    fn company_path(&self, suffix: &str) -> String {
        format!(
            "/companies/{}{}",
            urlencoding::encode(self.company_id()),
            suffix
        )
    }

    pub fn vehicle_path(&self, vehicle_id: &str) -> String {
        self.company_path(&format!("/vehicles/{}", urlencoding::encode(vehicle_id)))
    }

    pub async fn get_vehicle(&self, vehicle_id: &str) -> Result<serde_json::Value, ApiError> {
        self.get(&self.vehicle_path(vehicle_id), &[]).await
    }

    /// Search vehicles. The configured dealer id applies when the search has none.
    pub async fn search_vehicles(
        &self,
        search: &VehicleSearch,
    ) -> Result<serde_json::Value, ApiError> {
        let mut search = search.clone();
        if search.dealer_id.is_none() {
            search.dealer_id = self.dealer_id().map(String::from);
        }
        self.get(&self.company_path("/vehicles"), &search.to_query())
            .await
    }

    pub async fn create_vehicle(
        &self,
        vehicle: serde_json::Value,
    ) -> Result<serde_json::Value, ApiError> {
        self.post_json(&self.company_path("/vehicles"), vehicle).await
    }

    pub async fn update_vehicle(
        &self,
        vehicle_id: &str,
        changes: serde_json::Value,
    ) -> Result<serde_json::Value, ApiError> {
        self.patch_json(&self.vehicle_path(vehicle_id), changes)
            .await
    }

    pub async fn list_vehicle_images(
        &self,
        vehicle_id: &str,
    ) -> Result<serde_json::Value, ApiError> {
        self.get(&format!("{}/images", self.vehicle_path(vehicle_id)), &[])
            .await
    }

    pub async fn delete_vehicle_image(
        &self,
        vehicle_id: &str,
        image_id: &str,
    ) -> Result<(), ApiError> {
        self.delete(&format!(
            "{}/images/{}",
            self.vehicle_path(vehicle_id),
            urlencoding::encode(image_id)
        ))
        .await
    }

    pub async fn publish_vehicle(
        &self,
        vehicle_id: &str,
        request: &PublishRequest,
    ) -> Result<serde_json::Value, ApiError> {
        let body = serde_json::to_value(request)
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid publish request: {}", e)))?;
        self.post_json(
            &format!("{}/publications", self.vehicle_path(vehicle_id)),
            body,
        )
        .await
    }

    /// Attach one image to a vehicle and return the id the remote assigned.
    ///
    /// Not retried on transport failure: the remote may already have created
    /// the image.
    pub async fn upload_vehicle_image(
        &self,
        vehicle_id: &str,
        upload: ImageUpload,
    ) -> Result<String, ApiError> {
        let request = ApiRequest::post(format!("{}/images", self.vehicle_path(vehicle_id)))
            .body(upload.into_body());
        let response = self.send(&request).await?;
        extract_image_id(&response).ok_or_else(|| {
            ApiError::InvalidResponse("Upload response did not include an image id".to_string())
        })
    }
}
