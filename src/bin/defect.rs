#![cfg(not(tarpaulin_include))]

use factorylog::app;
use factorylog::config::Config;

/// Entry point for the defect check log web application.
///
/// Identical wiring to the production log; only the router differs.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Config::from_env();
    app::run_defect(config).await
}
