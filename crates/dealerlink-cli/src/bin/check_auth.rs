use anyhow::{Context, Result};
use clap::Parser;
use dealerlink_api_client::ApiClient;
use dealerlink_cli::{init_tracing, OutputFormat};
use dealerlink_core::DealerConfig;

#[derive(Parser, Debug)]
#[command(name = "check_auth")]
#[command(about = "Verify dealer credentials by requesting an access token")]
struct Args {
    /// Output format: json or table
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = DealerConfig::from_env().context("Failed to load dealer configuration")?;
    let client = ApiClient::new(&config)?;

    let credential = client
        .credentials()
        .get_credential()
        .await
        .context("Authentication failed")?;

    match args.format {
        OutputFormat::Json => {
            let body = serde_json::json!({
                "authenticated": true,
                "username": config.username,
                "companyId": config.company_id,
                "tokenUrl": config.token_url,
                "expiresAt": credential.expires_at().to_rfc3339(),
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Table => {
            println!("\n=== Authentication ===\n");
            println!("User:       {}", config.username);
            println!("Company:    {}", config.company_id);
            println!("Token URL:  {}", config.token_url);
            println!(
                "Expires at: {}",
                credential.expires_at().format("%Y-%m-%d %H:%M:%S UTC")
            );
            println!("\nCredentials OK\n");
        }
    }

    Ok(())
}
