//! MCP tool request types with JSON Schema for AI parameter generation

use dealerlink_core::models::{PublishRequest, VehicleSearch};
use dealerlink_core::ImageDescriptor;
use schemars::JsonSchema;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadVehicleImagesRequest {
    #[schemars(description = "ID of the vehicle to attach the images to")]
    pub vehicle_id: String,
    #[schemars(description = "Publicly reachable http(s) image URLs")]
    pub image_urls: Option<Vec<String>>,
    #[schemars(description = "Image URLs or local file paths, in upload order after imageUrls")]
    pub images: Option<Vec<String>>,
    #[schemars(
        description = "Zero-based index of the main image across imageUrls then images; -1 or omitted for none"
    )]
    pub main_image_index: Option<i64>,
}

impl UploadVehicleImagesRequest {
    pub fn descriptors(&self) -> Vec<ImageDescriptor> {
        let urls = self
            .image_urls
            .iter()
            .flatten()
            .map(|url| ImageDescriptor::url(url.trim()));
        let references = self
            .images
            .iter()
            .flatten()
            .map(|reference| ImageDescriptor::from_reference(reference));
        urls.chain(references).collect()
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InlineImageParam {
    #[schemars(description = "Base64-encoded image bytes, optionally as a data: URL")]
    pub data: String,
    #[schemars(description = "Image media type: image/jpeg, image/png, image/gif or image/webp")]
    pub mime_type: String,
    #[schemars(description = "File name reported back in the result")]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadVehicleImagesFromDataRequest {
    #[schemars(description = "ID of the vehicle to attach the images to")]
    pub vehicle_id: String,
    #[schemars(description = "Inline images to upload")]
    pub image_data: Vec<InlineImageParam>,
    #[schemars(description = "Zero-based index of the main image; -1 or omitted for none")]
    pub main_image_index: Option<i64>,
}

impl UploadVehicleImagesFromDataRequest {
    pub fn descriptors(&self) -> Vec<ImageDescriptor> {
        self.image_data
            .iter()
            .map(|img| ImageDescriptor::inline(&img.data, &img.mime_type, img.filename.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetVehicleRequest {
    #[schemars(description = "ID of the vehicle")]
    pub vehicle_id: String,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchVehiclesRequest {
    #[schemars(description = "Dealer (site) ID; defaults to the configured dealer")]
    pub dealer_id: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<u16>,
    #[schemars(description = "Vehicle identification number")]
    pub vin: Option<String>,
    pub stock_number: Option<String>,
    #[schemars(description = "Maximum number of results to return")]
    pub limit: Option<u32>,
    #[schemars(description = "Number of results to skip")]
    pub offset: Option<u32>,
}

impl From<SearchVehiclesRequest> for VehicleSearch {
    fn from(req: SearchVehiclesRequest) -> Self {
        VehicleSearch {
            dealer_id: req.dealer_id,
            make: req.make,
            model: req.model,
            year: req.year,
            vin: req.vin,
            stock_number: req.stock_number,
            limit: req.limit,
            offset: req.offset,
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateVehicleRequest {
    #[schemars(description = "Vehicle record in the dealer API's schema")]
    pub vehicle: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVehicleRequest {
    #[schemars(description = "ID of the vehicle to update")]
    pub vehicle_id: String,
    #[schemars(description = "Fields to change, in the dealer API's schema")]
    pub changes: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListVehicleImagesRequest {
    #[schemars(description = "ID of the vehicle")]
    pub vehicle_id: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteVehicleImageRequest {
    #[schemars(description = "ID of the vehicle")]
    pub vehicle_id: String,
    #[schemars(description = "ID of the image to delete")]
    pub image_id: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishVehicleRequest {
    #[schemars(description = "ID of the vehicle to publish")]
    pub vehicle_id: String,
    #[schemars(description = "Listing portal identifier")]
    pub portal: String,
    #[schemars(description = "Portal-specific publishing options")]
    pub options: Option<serde_json::Value>,
}

impl PublishVehicleRequest {
    pub fn to_publish_request(&self) -> PublishRequest {
        PublishRequest {
            portal: self.portal.clone(),
            options: self.options.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upload_request_accepts_camel_case() {
        let req: UploadVehicleImagesRequest = serde_json::from_value(json!({
            "vehicleId": "v1",
            "imageUrls": ["https://cdn.example.com/a.jpg"],
            "images": ["/tmp/b.png", "http://cdn.example.com/c.jpg"],
            "mainImageIndex": 1
        }))
        .unwrap();

        let kinds: Vec<&str> = req.descriptors().iter().map(|d| d.source_kind()).collect();
        assert_eq!(kinds, vec!["url", "path", "url"]);
        assert_eq!(req.main_image_index, Some(1));
    }

    #[test]
    fn upload_request_without_sources_is_empty() {
        let req: UploadVehicleImagesRequest =
            serde_json::from_value(json!({ "vehicleId": "v1" })).unwrap();
        assert!(req.descriptors().is_empty());
        assert_eq!(req.main_image_index, None);
    }

    #[test]
    fn inline_request_maps_to_descriptors() {
        let req: UploadVehicleImagesFromDataRequest = serde_json::from_value(json!({
            "vehicleId": "v1",
            "imageData": [
                { "data": "AAAA", "mimeType": "image/png", "filename": "front.png" },
                { "data": "BBBB", "mimeType": "image/jpeg" }
            ]
        }))
        .unwrap();

        let descriptors = req.descriptors();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].display_name(0), "front.png");
        assert_eq!(descriptors[1].display_name(1), "image_2.jpg");
    }

    #[test]
    fn search_request_converts() {
        let req: SearchVehiclesRequest = serde_json::from_value(json!({
            "make": "Volvo",
            "stockNumber": "S-12",
            "limit": 5
        }))
        .unwrap();
        let search = VehicleSearch::from(req);
        assert_eq!(search.make.as_deref(), Some("Volvo"));
        assert_eq!(search.stock_number.as_deref(), Some("S-12"));
        assert_eq!(search.limit, Some(5));
        assert!(search.dealer_id.is_none());
    }
}
