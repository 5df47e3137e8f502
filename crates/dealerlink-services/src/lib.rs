//! Dealerlink Services
//!
//! Business workflows built on top of the authenticated API client.

pub mod upload;

pub use upload::MediaIngestionPipeline;
