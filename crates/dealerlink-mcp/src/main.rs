//! Dealerlink MCP Server
//!
//! Run with: DEALER_USERNAME=xxx DEALER_PASSWORD=xxx DEALER_COMPANY_ID=xxx dealerlink-mcp

use anyhow::Context;
use dealerlink_core::DealerConfig;
use dealerlink_mcp::{ApiClient, DealerService};
use rmcp::service::ServiceExt;
use rmcp::transport::io::stdio;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the protocol
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("dealerlink=info")),
        )
        .init();

    let config = DealerConfig::from_env().context(
        "Failed to load configuration. Set DEALER_USERNAME, DEALER_PASSWORD and DEALER_COMPANY_ID",
    )?;
    let api_client = ApiClient::new(&config).context("Failed to create API client")?;

    tracing::info!(
        api_url = %config.api_base_url,
        company_id = %config.company_id,
        max_concurrent_uploads = config.max_concurrent_uploads,
        "Starting dealerlink MCP server"
    );

    let service = DealerService::new(api_client, config.max_concurrent_uploads);
    let running = service.serve(stdio()).await.context("MCP transport failed")?;
    running.waiting().await.context("MCP server error")?;

    Ok(())
}
