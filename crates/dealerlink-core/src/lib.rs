//! Dealerlink Core Library
//!
//! This crate provides the domain models, error types, configuration and
//! constants shared by the API client, the upload services and the MCP server.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::DealerConfig;
pub use error::{ApiError, AuthError, BatchError, ErrorMetadata, ItemError, LogLevel};
pub use models::{
    Credential, ImageDescriptor, UploadFailure, UploadOutcome, UploadReport, UploadedImage,
};
