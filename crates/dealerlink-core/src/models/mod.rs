//! Data models for the application
//!
//! Each sub-module represents a specific feature area.

mod credential;
pub mod image;
mod vehicle;

// Re-export all models for convenient imports
pub use credential::*;
pub use image::{ImageDescriptor, UploadFailure, UploadOutcome, UploadReport, UploadedImage};
pub use vehicle::*;
