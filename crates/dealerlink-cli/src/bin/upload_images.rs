use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dealerlink_api_client::ApiClient;
use dealerlink_cli::{init_tracing, render_report_table, OutputFormat};
use dealerlink_core::{DealerConfig, ImageDescriptor};
use dealerlink_services::MediaIngestionPipeline;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "upload_images")]
#[command(about = "Upload images from URLs or local files to a vehicle")]
struct Args {
    /// Vehicle to attach the images to
    #[arg(long)]
    vehicle_id: String,

    /// Image URLs (http/https) or local file paths
    #[arg(required = true, value_name = "SOURCE")]
    sources: Vec<String>,

    /// Zero-based index of the main image
    #[arg(long)]
    main_index: Option<usize>,

    /// Maximum concurrent uploads (default: DEALER_MAX_CONCURRENT_UPLOADS)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Output format: json or table
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = DealerConfig::from_env().context("Failed to load dealer configuration")?;
    let client = Arc::new(ApiClient::new(&config)?);
    let concurrency = args.concurrency.unwrap_or(config.max_concurrent_uploads);
    let pipeline = MediaIngestionPipeline::new(client, concurrency);

    // Ctrl-C stops issuing uploads; finished ones are still reported.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling remaining uploads");
            on_signal.cancel();
        }
    });

    let descriptors: Vec<ImageDescriptor> = args
        .sources
        .iter()
        .map(|s| ImageDescriptor::from_reference(s))
        .collect();
    let requested = descriptors.len();

    let report = pipeline
        .upload_batch_with_cancel(&args.vehicle_id, descriptors, args.main_index, cancel)
        .await?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => print!(
            "{}",
            render_report_table(&args.vehicle_id, requested, &report)
        ),
    }

    if !report.success {
        anyhow::bail!("Image upload failed for vehicle {}", args.vehicle_id);
    }
    Ok(())
}
