//! Configuration loading and path resolution for Rollcall services
//!
//! Resolution priority for the config file location:
//! 1. `ROLLCALL_CONFIG` environment variable (highest priority)
//! 2. Platform config directory (`~/.config/rollcall/<service>.toml`)
//! 3. Compiled defaults (no file)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level TOML configuration shared by Rollcall services
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub service: ServiceSection,
    #[serde(default)]
    pub face_api: FaceApiSection,
    #[serde(default)]
    pub engine: EngineSection,
}

/// HTTP service binding and storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path to the shared portal database; platform default when absent
    pub database_path: Option<PathBuf>,
}

/// Cloud face recognition API access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceApiSection {
    /// Base URL of the face recognition API
    pub endpoint: Option<String>,
    /// API key; `ROLLCALL_FACE_API_KEY` takes priority over this value
    pub api_key: Option<String>,
    #[serde(default = "default_collection")]
    pub collection_id: String,
}

/// Attendance resolution engine tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSection {
    /// Maximum photos accepted per attendance session
    #[serde(default = "default_max_photos")]
    pub max_photos_per_session: usize,
    /// Default accept threshold (percent) when the caller does not override
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f32,
    /// Low search threshold (percent) so the trace can show near-misses
    #[serde(default = "default_search_floor")]
    pub search_floor: f32,
    /// Maximum candidates requested per similarity search
    #[serde(default = "default_search_max_results")]
    pub search_max_results: u32,
    /// Bound on photos processed in flight
    #[serde(default = "default_max_concurrent_photos")]
    pub max_concurrent_photos: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5731
}

fn default_collection() -> String {
    "rollcall-gallery".to_string()
}

fn default_max_photos() -> usize {
    10
}

fn default_match_threshold() -> f32 {
    95.0
}

fn default_search_floor() -> f32 {
    50.0
}

fn default_search_max_results() -> u32 {
    5
}

fn default_max_concurrent_photos() -> usize {
    4
}

impl Default for FaceApiSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            collection_id: default_collection(),
        }
    }
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_path: None,
        }
    }
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            max_photos_per_session: default_max_photos(),
            match_threshold: default_match_threshold(),
            search_floor: default_search_floor(),
            search_max_results: default_search_max_results(),
            max_concurrent_photos: default_max_concurrent_photos(),
        }
    }
}

/// Resolve the config file path for a service (e.g. "attendance")
pub fn resolve_config_path(service_name: &str) -> Option<PathBuf> {
    // Priority 1: environment variable
    if let Ok(path) = std::env::var("ROLLCALL_CONFIG") {
        return Some(PathBuf::from(path));
    }

    // Priority 2: platform config directory
    dirs::config_dir().map(|d| d.join("rollcall").join(format!("{}.toml", service_name)))
}

/// Load configuration for a service, falling back to compiled defaults
/// when no config file exists
pub fn load_config(service_name: &str) -> Result<TomlConfig> {
    let Some(path) = resolve_config_path(service_name) else {
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config file found, using defaults");
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

    tracing::info!(path = %path.display(), "Configuration loaded");
    Ok(config)
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("rollcall").join("rollcall.db"))
        .unwrap_or_else(|| PathBuf::from("./rollcall_data/rollcall.db"))
}
