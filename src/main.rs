use custody_validator::{api::Server, config::Config};
use tracing::info;

/// The main entry point for the validator service.
///
/// This function loads the configuration, initializes logging at the
/// configured level, and starts the JSON-RPC server that answers
/// spend validation requests.
#[tokio::main] // Marks the async main function to be run by the Tokio runtime.
async fn main() -> anyhow::Result<()> {
    // Load the service configuration from the TOML file.
    // The `?` operator propagates read and parse errors.
    let config = Config::load("config/default.toml")?;

    // Initialize logging; the level comes from the `[logging]` section.
    tracing_subscriber::fmt()
        .with_max_level(config.logging.max_level()?)
        .init();
    info!("Validator starting with config: {:?}", config);

    // Create the API server; it owns the validator shared by all requests.
    let server = Server::new(config);

    // Bind to the configured address and serve until the listener fails.
    server.start().await?;

    Ok(())
}
