//! rollcall-ar library interface
//!
//! Attendance Resolution service for the Rollcall school operations portal.
//! Exposes public APIs for integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod recognition;
pub mod roster;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::ServiceConfig;
use crate::recognition::FaceRecognitionPort;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (shared portal database)
    pub db: SqlitePool,
    /// Resolved service configuration
    pub config: Arc<ServiceConfig>,
    /// Face Recognition Port; swapped for a fake in tests
    pub recognition: Arc<dyn FaceRecognitionPort>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        config: ServiceConfig,
        recognition: Arc<dyn FaceRecognitionPort>,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            recognition,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::attendance_routes())
        .merge(api::health_routes())
        .with_state(state)
}
