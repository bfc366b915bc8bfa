//! Configuration module
//!
//! Settings for the storage connection, the configured buckets, and image
//! optimization. Hosts with their own configuration format can construct
//! these directly (everything derives serde); `from_env` loaders are
//! provided for environment-driven deployments.

use std::env;

use serde::{Deserialize, Serialize};

/// Folder used for generated object keys when a bucket has none configured.
pub const DEFAULT_UPLOAD_FOLDER: &str = "uploads";

const DEFAULT_QUALITY: u8 = 85;
const DEFAULT_MAX_WIDTH: u32 = 2560;
const DEFAULT_MAX_HEIGHT: u32 = 1440;

/// One configured bucket.
///
/// Exactly one of the two default flags must be set; the bucket registry
/// enforces this when the configuration is loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BucketConfig {
    pub name: String,
    #[serde(default)]
    pub is_default_public: bool,
    #[serde(default)]
    pub is_default_private: bool,
    /// Size limit in KB for files with a recognized image extension.
    pub max_image_size_kb: u64,
    /// Size limit in KB for everything else.
    pub max_file_size_kb: u64,
    /// Top-level folder for generated keys; `None` falls back to "uploads".
    #[serde(default)]
    pub default_folder: Option<String>,
}

/// Object-storage connection and bucket settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    /// Custom endpoint for S3-compatible providers (MinIO, DigitalOcean Spaces, etc.)
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Kill switch: when set, background migration batches are skipped.
    #[serde(default)]
    pub disable_operations: bool,
    #[serde(default)]
    pub buckets: Vec<BucketConfig>,
}

impl StorageSettings {
    /// Load settings from `OFFSITE_*` environment variables.
    ///
    /// Missing credentials are not an error here; they become a fatal
    /// configuration error when the S3 backend is constructed.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let buckets = match env::var("OFFSITE_BUCKETS") {
            Ok(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)
                .map_err(|e| anyhow::anyhow!("OFFSITE_BUCKETS is not a valid JSON array: {}", e))?,
            _ => Vec::new(),
        };

        Ok(StorageSettings {
            access_key_id: env::var("OFFSITE_ACCESS_KEY_ID").unwrap_or_default(),
            secret_access_key: env::var("OFFSITE_SECRET_ACCESS_KEY").unwrap_or_default(),
            region: env::var("OFFSITE_REGION").unwrap_or_default(),
            endpoint: env::var("OFFSITE_ENDPOINT").ok().filter(|v| !v.is_empty()),
            disable_operations: env::var("OFFSITE_DISABLE_OPERATIONS")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            buckets,
        })
    }
}

/// Image optimization behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OptimizationSettings {
    /// When false, the optimization pipeline skips its batches entirely.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Lossy encode quality (JPEG/WebP), 0-100.
    #[serde(default = "default_quality")]
    pub quality: u8,
    /// Bounding box for downscale-only resizing.
    #[serde(default = "default_max_width")]
    pub max_width: u32,
    #[serde(default = "default_max_height")]
    pub max_height: u32,
}

fn default_enabled() -> bool {
    true
}

fn default_quality() -> u8 {
    DEFAULT_QUALITY
}

fn default_max_width() -> u32 {
    DEFAULT_MAX_WIDTH
}

fn default_max_height() -> u32 {
    DEFAULT_MAX_HEIGHT
}

impl Default for OptimizationSettings {
    fn default() -> Self {
        OptimizationSettings {
            enabled: true,
            quality: DEFAULT_QUALITY,
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
        }
    }
}

impl OptimizationSettings {
    /// Load settings from `OFFSITE_OPTIMIZE_*` environment variables,
    /// falling back to the defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        OptimizationSettings {
            enabled: env::var("OFFSITE_OPTIMIZE_IMAGES")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true),
            quality: env::var("OFFSITE_OPTIMIZE_QUALITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_QUALITY),
            max_width: env::var("OFFSITE_OPTIMIZE_MAX_WIDTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_WIDTH),
            max_height: env::var("OFFSITE_OPTIMIZE_MAX_HEIGHT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_HEIGHT),
        }
    }
}
