/// Coverfetch - Main Entry Point
///
/// Validates a Spotify track or album URI, resolves its cover images via the
/// metadata service, then downloads and saves every available size.
mod config;
mod metadata;
mod orchestrator;
mod target;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use coverfetch_downloader::{Fetcher, Persister};

use config::Config;
use metadata::{Credentials, HttpMetadataService};
use target::TargetUri;

#[tokio::main]
async fn main() {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coverfetch_cli=info,coverfetch_downloader=info".into()),
        )
        .init();

    let config = Config::parse();

    if let Err(e) = run(config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let target = TargetUri::parse(&config.target_uri)?;
    let credentials = Credentials::new(&config.username, &config.password)?;

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("Failed to create output directory {}", config.output_dir.display())
    })?;

    let client = reqwest::Client::builder()
        .user_agent(concat!("coverfetch/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let service = HttpMetadataService::new(
        client.clone(),
        &config.metadata_url,
        &config.image_base_url,
    );
    let fetcher = Fetcher::new(client).with_max_concurrent(config.max_concurrent);
    let persister = Persister::new(&config.output_dir).with_max_concurrent(config.max_concurrent);

    info!("Fetching covers for {}", target);
    let report =
        orchestrator::download_covers(&service, &credentials, &target, &fetcher, &persister)
            .await?;

    for path in &report.written {
        info!("Saved {}", path.display());
    }
    Ok(())
}
