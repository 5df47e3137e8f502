use std::sync::{Arc, OnceLock};

use dealerlink_api_client::ApiClient;
use dealerlink_core::{
    ApiError, AuthError, BatchError, ErrorMetadata, ImageDescriptor, ItemError, LogLevel,
    UploadOutcome, UploadReport,
};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use super::normalize::normalize;

/// Uploads a batch of images to one vehicle with bounded concurrency.
///
/// Per-item failures are collected into the report; only a missing
/// credential or an invalid request fails the batch as a whole.
#[derive(Debug, Clone)]
pub struct MediaIngestionPipeline {
    client: Arc<ApiClient>,
    max_concurrent_uploads: usize,
}

impl MediaIngestionPipeline {
    pub fn new(client: Arc<ApiClient>, max_concurrent_uploads: usize) -> Self {
        Self {
            client,
            max_concurrent_uploads: max_concurrent_uploads.max(1),
        }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn max_concurrent_uploads(&self) -> usize {
        self.max_concurrent_uploads
    }

    pub async fn upload_batch(
        &self,
        vehicle_id: &str,
        descriptors: Vec<ImageDescriptor>,
        main_index: Option<usize>,
    ) -> Result<UploadReport, BatchError> {
        self.upload_batch_with_cancel(vehicle_id, descriptors, main_index, CancellationToken::new())
            .await
    }

    /// Like [`upload_batch`](Self::upload_batch), but stops issuing uploads once
    /// `cancel` fires. Finished items are kept and the report is marked partial.
    pub async fn upload_batch_with_cancel(
        &self,
        vehicle_id: &str,
        descriptors: Vec<ImageDescriptor>,
        main_index: Option<usize>,
        cancel: CancellationToken,
    ) -> Result<UploadReport, BatchError> {
        if vehicle_id.trim().is_empty() {
            return Err(BatchError::InvalidRequest(
                "vehicle id must not be empty".to_string(),
            ));
        }
        if descriptors.is_empty() {
            return Err(BatchError::InvalidRequest(
                "at least one image is required".to_string(),
            ));
        }
        if let Some(main) = main_index {
            if main >= descriptors.len() {
                return Err(BatchError::InvalidRequest(format!(
                    "main image index {} is out of range for {} image(s)",
                    main,
                    descriptors.len()
                )));
            }
        }

        // No credential, no uploads.
        if let Err(e) = self.client.credentials().get_credential().await {
            tracing::warn!(
                vehicle_id = %vehicle_id,
                error = %e,
                "Batch upload aborted: unable to obtain credential"
            );
            return Err(BatchError::Auth(e));
        }

        let total = descriptors.len();
        tracing::info!(
            vehicle_id = %vehicle_id,
            images = total,
            main_index = ?main_index,
            concurrency = self.max_concurrent_uploads,
            "Starting batch image upload"
        );

        let auth_failure = OnceLock::new();
        let mut pending = stream::iter(descriptors.into_iter().enumerate())
            .map(|(index, descriptor)| {
                self.process_item(
                    vehicle_id,
                    index,
                    descriptor,
                    main_index == Some(index),
                    &auth_failure,
                )
            })
            .buffer_unordered(self.max_concurrent_uploads);

        let mut outcomes = Vec::with_capacity(total);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = pending.next() => match next {
                    Some(outcome) => outcomes.push(outcome),
                    None => break,
                },
            }
        }
        drop(pending);

        let partial = outcomes.len() < total;
        if partial {
            tracing::warn!(
                vehicle_id = %vehicle_id,
                completed = outcomes.len(),
                images = total,
                "Batch upload cancelled before all images completed"
            );
        }

        let report = UploadReport::from_outcomes(outcomes, main_index, partial);
        tracing::info!(
            vehicle_id = %vehicle_id,
            uploaded = report.uploaded_count,
            failed = report.errors.len(),
            success = report.success,
            "Batch image upload finished"
        );
        Ok(report)
    }

    async fn process_item(
        &self,
        vehicle_id: &str,
        index: usize,
        descriptor: ImageDescriptor,
        main: bool,
        auth_failure: &OnceLock<AuthError>,
    ) -> UploadOutcome {
        let filename = descriptor.display_name(index);

        let upload = match normalize(&descriptor, &filename, main).await {
            Ok(upload) => upload,
            Err(e) => {
                log_item_error(vehicle_id, index, &filename, &e);
                return UploadOutcome::failed(index, filename, main, e);
            }
        };

        // Credentials were rejected twice earlier in this batch.
        if let Some(auth) = auth_failure.get() {
            return UploadOutcome::failed(
                index,
                filename,
                main,
                ItemError::Upload(ApiError::Auth(auth.clone())),
            );
        }

        match self.client.upload_vehicle_image(vehicle_id, upload).await {
            Ok(image_id) => {
                tracing::debug!(
                    vehicle_id = %vehicle_id,
                    index,
                    filename = %filename,
                    image_id = %image_id,
                    main,
                    "Image uploaded"
                );
                UploadOutcome::succeeded(index, filename, main, image_id)
            }
            Err(e) => {
                if let ApiError::Auth(auth) = &e {
                    let _ = auth_failure.set(auth.clone());
                }
                let e = ItemError::Upload(e);
                log_item_error(vehicle_id, index, &filename, &e);
                UploadOutcome::failed(index, filename, main, e)
            }
        }
    }
}

fn log_item_error(vehicle_id: &str, index: usize, filename: &str, error: &ItemError) {
    match error.log_level() {
        LogLevel::Error => tracing::error!(
            vehicle_id = %vehicle_id,
            index,
            filename = %filename,
            kind = error.error_code(),
            error = %error,
            "Image upload failed"
        ),
        LogLevel::Warn => tracing::warn!(
            vehicle_id = %vehicle_id,
            index,
            filename = %filename,
            kind = error.error_code(),
            error = %error,
            "Image upload failed"
        ),
        LogLevel::Debug => tracing::debug!(
            vehicle_id = %vehicle_id,
            index,
            filename = %filename,
            kind = error.error_code(),
            error = %error,
            "Image rejected"
        ),
    }
}
