//! Batch image ingestion for vehicle records
//!
//! Workflow per batch: validate request → obtain credential → normalize each
//! descriptor → upload with bounded concurrency → reassemble report in
//! request order.

mod normalize;
mod pipeline;

pub use normalize::{decode_inline, normalize};
pub use pipeline::MediaIngestionPipeline;
