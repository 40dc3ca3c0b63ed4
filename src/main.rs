use clap::Parser;
use datanet_relay::app::routes;
use datanet_relay::utils::{logger, validation::Validate};
use datanet_relay::{CliConfig, GithubContentStore, RelayService, Settings};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();
    let settings = Settings::load(cli)?;

    if settings.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(settings.verbose);
    }

    tracing::info!("Starting datanet-relay");
    if settings.verbose {
        tracing::debug!(
            "Relay target: {}/{} under {}",
            settings.owner,
            settings.repo,
            settings.base_path
        );
    }

    if let Err(e) = settings.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let store = GithubContentStore::new(
        settings.api_base.clone(),
        settings.owner.clone(),
        settings.repo.clone(),
        settings.base_path.clone(),
        settings.github_token.clone(),
    )?;
    let relay = Arc::new(RelayService::new(
        store,
        Duration::from_millis(settings.write_interval_ms),
        settings.retry_limit,
        settings.outbound_timeout_secs.map(Duration::from_secs),
    ));

    let app = routes::router(relay);
    let listener = tokio::net::TcpListener::bind(&settings.bind).await?;
    tracing::info!("🚀 Server running on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
