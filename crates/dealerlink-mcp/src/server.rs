//! MCP server using rmcp SDK
//!
//! Exposes dealer inventory operations as MCP tools over stdio.

use crate::tools::*;
use dealerlink_api_client::ApiClient;
use dealerlink_core::models::VehicleSearch;
use dealerlink_core::{ApiError, AuthError, BatchError, ErrorMetadata, ImageDescriptor};
use dealerlink_services::MediaIngestionPipeline;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::tool::Parameters;
use rmcp::model::*;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use serde::Serialize;
use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

const INVALID_PARAMS: ErrorCode = ErrorCode(-32602);
const INTERNAL_ERROR: ErrorCode = ErrorCode(-32603);

fn text_content(s: impl Into<String>) -> Content {
    Content {
        raw: RawContent::Text(RawTextContent { text: s.into() }),
        annotations: None,
    }
}

fn to_json_text(value: &impl Serialize) -> Result<String, ErrorData> {
    serde_json::to_string(value).map_err(|e| ErrorData {
        code: INTERNAL_ERROR,
        message: Cow::from(e.to_string()),
        data: None,
    })
}

fn json_result(value: &impl Serialize) -> Result<CallToolResult, ErrorData> {
    Ok(CallToolResult::success(vec![text_content(to_json_text(value)?)]))
}

fn auth_error_data(e: &AuthError) -> ErrorData {
    ErrorData {
        code: INTERNAL_ERROR,
        message: Cow::from(e.to_string()),
        data: Some(serde_json::json!({ "kind": e.error_code() })),
    }
}

fn api_error_data(e: &ApiError) -> ErrorData {
    let code = match e {
        ApiError::InvalidRequest(_) => INVALID_PARAMS,
        _ => INTERNAL_ERROR,
    };
    let mut data = serde_json::json!({ "kind": e.error_code() });
    if let Some(status) = e.status() {
        data["status"] = status.into();
    }
    if let Some(body) = e.body() {
        data["details"] = body.clone();
    }
    ErrorData {
        code,
        message: Cow::from(e.to_string()),
        data: Some(data),
    }
}

fn batch_error_data(e: &BatchError) -> ErrorData {
    match e {
        BatchError::InvalidRequest(_) => invalid_request(e.to_string()),
        BatchError::Auth(auth) => auth_error_data(auth),
    }
}

fn invalid_request(message: impl Into<String>) -> ErrorData {
    ErrorData {
        code: INVALID_PARAMS,
        message: Cow::from(message.into()),
        data: Some(serde_json::json!({ "kind": "InvalidRequest" })),
    }
}

/// `None` and `-1` both mean "no main image". Upper bound is checked by the pipeline.
fn main_index(raw: Option<i64>) -> Result<Option<usize>, ErrorData> {
    match raw {
        None | Some(-1) => Ok(None),
        Some(n) if n >= 0 => usize::try_from(n)
            .map(Some)
            .map_err(|_| invalid_request(format!("mainImageIndex {} is out of range", n))),
        Some(n) => Err(invalid_request(format!(
            "mainImageIndex must be -1 or a non-negative index, got {}",
            n
        ))),
    }
}

#[derive(Debug, Clone)]
pub struct DealerService {
    api_client: Arc<ApiClient>,
    pipeline: MediaIngestionPipeline,
    tool_router: ToolRouter<DealerService>,
}

#[tool_router]
impl DealerService {
    pub fn new(api_client: ApiClient, max_concurrent_uploads: usize) -> Self {
        let api_client = Arc::new(api_client);
        Self {
            pipeline: MediaIngestionPipeline::new(api_client.clone(), max_concurrent_uploads),
            api_client,
            tool_router: Self::tool_router(),
        }
    }

    async fn run_batch(
        &self,
        vehicle_id: &str,
        descriptors: Vec<ImageDescriptor>,
        main_image_index: Option<i64>,
    ) -> Result<CallToolResult, ErrorData> {
        let main = main_index(main_image_index)?;
        let report = self
            .pipeline
            .upload_batch(vehicle_id, descriptors, main)
            .await
            .map_err(|e| batch_error_data(&e))?;

        let text = to_json_text(&report)?;
        if report.success {
            Ok(CallToolResult::success(vec![text_content(text)]))
        } else {
            Ok(CallToolResult::error(vec![text_content(text)]))
        }
    }

    #[tool(
        description = "Upload images to a vehicle from URLs or local file paths. Each image succeeds or fails independently; the result lists uploaded image IDs and per-image errors in request order."
    )]
    async fn upload_vehicle_images(
        &self,
        Parameters(req): Parameters<UploadVehicleImagesRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let descriptors = req.descriptors();
        self.run_batch(&req.vehicle_id, descriptors, req.main_image_index)
            .await
    }

    #[tool(
        description = "Upload base64-encoded images to a vehicle. Supported types: image/jpeg, image/png, image/gif, image/webp."
    )]
    async fn upload_vehicle_images_from_data(
        &self,
        Parameters(req): Parameters<UploadVehicleImagesFromDataRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let descriptors = req.descriptors();
        self.run_batch(&req.vehicle_id, descriptors, req.main_image_index)
            .await
    }

    #[tool(description = "Get a vehicle record by ID")]
    async fn get_vehicle(
        &self,
        Parameters(req): Parameters<GetVehicleRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let vehicle = self
            .api_client
            .get_vehicle(&req.vehicle_id)
            .await
            .map_err(|e| api_error_data(&e))?;
        json_result(&vehicle)
    }

    #[tool(description = "Search vehicles by make, model, year, VIN or stock number")]
    async fn search_vehicles(
        &self,
        Parameters(req): Parameters<SearchVehiclesRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let search = VehicleSearch::from(req);
        let result = self
            .api_client
            .search_vehicles(&search)
            .await
            .map_err(|e| api_error_data(&e))?;
        json_result(&result)
    }

    #[tool(description = "Create a vehicle record")]
    async fn create_vehicle(
        &self,
        Parameters(req): Parameters<CreateVehicleRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let created = self
            .api_client
            .create_vehicle(req.vehicle)
            .await
            .map_err(|e| api_error_data(&e))?;
        json_result(&created)
    }

    #[tool(description = "Update fields of an existing vehicle record")]
    async fn update_vehicle(
        &self,
        Parameters(req): Parameters<UpdateVehicleRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let updated = self
            .api_client
            .update_vehicle(&req.vehicle_id, req.changes)
            .await
            .map_err(|e| api_error_data(&e))?;
        json_result(&updated)
    }

    #[tool(description = "List the images attached to a vehicle")]
    async fn list_vehicle_images(
        &self,
        Parameters(req): Parameters<ListVehicleImagesRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let images = self
            .api_client
            .list_vehicle_images(&req.vehicle_id)
            .await
            .map_err(|e| api_error_data(&e))?;
        json_result(&images)
    }

    #[tool(description = "Delete an image from a vehicle")]
    async fn delete_vehicle_image(
        &self,
        Parameters(req): Parameters<DeleteVehicleImageRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        self.api_client
            .delete_vehicle_image(&req.vehicle_id, &req.image_id)
            .await
            .map_err(|e| api_error_data(&e))?;
        json_result(&serde_json::json!({
            "success": true,
            "message": format!("Image {} deleted from vehicle {}", req.image_id, req.vehicle_id)
        }))
    }

    #[tool(description = "Publish a vehicle to a listing portal")]
    async fn publish_vehicle(
        &self,
        Parameters(req): Parameters<PublishVehicleRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let result = self
            .api_client
            .publish_vehicle(&req.vehicle_id, &req.to_publish_request())
            .await
            .map_err(|e| api_error_data(&e))?;
        json_result(&result)
    }

    #[tool(description = "Verify the configured dealer credentials by requesting a fresh access token")]
    async fn check_auth(&self) -> Result<CallToolResult, ErrorData> {
        let credentials = self.api_client.credentials();
        credentials.invalidate();
        let credential = credentials
            .get_credential()
            .await
            .map_err(|e| auth_error_data(&e))?;
        json_result(&serde_json::json!({
            "authenticated": true,
            "companyId": self.api_client.company_id(),
            "expiresAt": credential.expires_at().to_rfc3339(),
        }))
    }
}

#[tool_handler]
impl ServerHandler for DealerService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "dealerlink-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
            instructions: Some(
                "Dealerlink MCP: look up, create and update dealership vehicles; upload, list and \
                 delete vehicle images; publish to portals. Set DEALER_USERNAME, DEALER_PASSWORD \
                 and DEALER_COMPANY_ID."
                    .to_string(),
            ),
        }
    }
}
