use wave_portal::api::server;
use wave_portal::PortalConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env first so RUST_LOG set there reaches the logger
    dotenv::dotenv().ok();

    // Initialize logger (set RUST_LOG=debug for verbose output, RUST_LOG=info for normal)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = PortalConfig::from_env()?;

    log::info!("Starting Wave Portal on {}", config.bind_address);
    server::start_server(config).await?;
    Ok(())
}
