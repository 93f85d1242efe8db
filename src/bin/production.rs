#![cfg(not(tarpaulin_include))]

use factorylog::app;
use factorylog::config::Config;

/// Entry point for the production (mixing) log web application.
///
/// Reads its configuration from the environment and serves the production
/// router until the process is stopped.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Config::from_env();
    app::run_production(config).await
}
