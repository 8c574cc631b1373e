//! rollcall-ar - Attendance Resolution service
//!
//! Turns classroom photo batches into per-student attendance decisions using
//! the portal's face gallery, without permanently altering it. Part of the
//! Rollcall school operations portal; talks HTTP to the portal frontend and
//! to the cloud face recognition API.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rollcall_ar::config::ServiceConfig;
use rollcall_ar::recognition::CloudFaceClient;
use rollcall_ar::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting rollcall-ar (Attendance Resolution) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Resolve configuration: ROLLCALL_CONFIG > platform config dir > defaults
    let toml_config = rollcall_common::config::load_config("attendance")?;
    let config = ServiceConfig::resolve(&toml_config)?;

    // Open or create the shared portal database
    info!("Database: {}", config.database_path.display());
    let db_pool = rollcall_ar::db::init_database_pool(&config.database_path).await?;
    info!("Database connection established");

    // Cloud face recognition client
    let recognition = Arc::new(CloudFaceClient::new(&config.face_api)?);

    let bind_address = format!("{}:{}", config.host, config.port);
    let state = AppState::new(db_pool, config, recognition);
    let app = rollcall_ar::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
