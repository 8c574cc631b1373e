//! Service configuration resolution for rollcall-ar
//!
//! Face API credentials resolve with ENV -> TOML priority so deployments
//! can inject the key without writing it to disk.

use rollcall_common::config::TomlConfig;
use rollcall_common::{Error, Result};
use std::path::PathBuf;
use tracing::{info, warn};

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub face_api: FaceApiConfig,
    pub engine: EngineConfig,
}

/// Cloud face recognition API access
#[derive(Debug, Clone)]
pub struct FaceApiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub collection_id: String,
}

/// Attendance resolution engine limits and thresholds
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum photos accepted per attendance session
    pub max_photos_per_session: usize,
    /// Default accept threshold (percent similarity)
    pub match_threshold: f32,
    /// Low search threshold so the trace can show near-misses
    pub search_floor: f32,
    /// Maximum candidates requested per similarity search
    pub search_max_results: u32,
    /// Bound on photos processed in flight
    pub max_concurrent_photos: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let section = rollcall_common::config::EngineSection::default();
        Self::from(&section)
    }
}

impl From<&rollcall_common::config::EngineSection> for EngineConfig {
    fn from(section: &rollcall_common::config::EngineSection) -> Self {
        Self {
            max_photos_per_session: section.max_photos_per_session,
            match_threshold: section.match_threshold,
            search_floor: section.search_floor,
            search_max_results: section.search_max_results,
            max_concurrent_photos: section.max_concurrent_photos,
        }
    }
}

impl ServiceConfig {
    /// Resolve the full service configuration from TOML + environment
    pub fn resolve(toml_config: &TomlConfig) -> Result<Self> {
        let face_api = resolve_face_api(toml_config)?;

        let database_path = toml_config
            .service
            .database_path
            .clone()
            .unwrap_or_else(rollcall_common::config::default_database_path);

        Ok(Self {
            host: toml_config.service.host.clone(),
            port: toml_config.service.port,
            database_path,
            face_api,
            engine: EngineConfig::from(&toml_config.engine),
        })
    }
}

/// Resolve face API endpoint and key with ENV -> TOML priority
fn resolve_face_api(toml_config: &TomlConfig) -> Result<FaceApiConfig> {
    let env_key = std::env::var("ROLLCALL_FACE_API_KEY").ok();
    let toml_key = toml_config.face_api.api_key.clone();

    if env_key.is_some() && toml_key.is_some() {
        warn!("Face API key found in both environment and TOML. Using environment (highest priority).");
    }

    let api_key = env_key
        .or(toml_key)
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            Error::Config(
                "Face API key not configured. Set ROLLCALL_FACE_API_KEY or \
                 face_api.api_key in the service TOML config."
                    .to_string(),
            )
        })?;

    let endpoint = std::env::var("ROLLCALL_FACE_API_ENDPOINT")
        .ok()
        .or_else(|| toml_config.face_api.endpoint.clone())
        .ok_or_else(|| {
            Error::Config(
                "Face API endpoint not configured. Set ROLLCALL_FACE_API_ENDPOINT or \
                 face_api.endpoint in the service TOML config."
                    .to_string(),
            )
        })?;

    info!(endpoint = %endpoint, "Face API configured");

    Ok(FaceApiConfig {
        endpoint,
        api_key,
        collection_id: toml_config.face_api.collection_id.clone(),
    })
}
