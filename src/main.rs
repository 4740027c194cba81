use anyhow::Result;
use log::info;
use std::sync::Arc;

use parkwatch::alerts::create_alert_hub;
use parkwatch::api::RestApi;
use parkwatch::config;
use parkwatch::db::DatabaseService;

async fn run_app() -> Result<()> {
    // Initialize logging
    env_logger::init();
    info!("Starting violation monitoring backend");

    // Load configuration
    let config = config::load_config(None)?;
    info!("Configuration loaded");

    // Connect to the database and run migrations
    let db = DatabaseService::new(&config.database).await?;
    info!("Database connection established");

    // Create the alert hub for live WebSocket fan-out
    let hub = create_alert_hub(&config.alerts);
    info!(
        "Alert hub created, max sessions: {}",
        config.alerts.max_sessions
    );

    // Setup image storage directory from config
    std::fs::create_dir_all(&config.storage.images_dir)?;

    // Start the REST API
    let http_server = RestApi::new(
        &config.api,
        Arc::clone(&db.pool),
        Arc::clone(&hub),
        config.storage.images_dir.clone(),
    )?;

    tokio::spawn(async move {
        if let Err(e) = http_server.run().await {
            log::error!("HTTP server error: {}", e);
        }
    });
    info!("API server started");

    // Wait for termination signals
    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    Ok(())
}

fn main() {
    // Create a tokio runtime in the current thread
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    // Run our async main function
    if let Err(e) = runtime.block_on(run_app()) {
        eprintln!("Application error: {}", e);
        std::process::exit(1);
    }
}
