/// Configuration management for rendition-service
///
/// Loads configuration from environment variables with sensible defaults.
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppConfig,
    pub storage: StorageConfig,
    pub limits: LimitsConfig,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub env: String,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    /// Directory where uploaded originals are spooled before processing
    pub upload_dir: PathBuf,
    /// Flat output store holding the produced renditions
    pub output_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct LimitsConfig {
    /// Maximum number of files in one upload batch
    pub max_batch_size: usize,
    /// Maximum size of a single uploaded file in bytes
    pub max_file_bytes: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Config {
            app: AppConfig {
                host: std::env::var("RENDITION_SERVICE_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("RENDITION_SERVICE_PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .unwrap_or(8080),
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            },
            storage: StorageConfig {
                upload_dir: std::env::var("UPLOAD_DIR")
                    .unwrap_or_else(|_| "uploads".to_string())
                    .into(),
                output_dir: std::env::var("OUTPUT_DIR")
                    .unwrap_or_else(|_| "processed".to_string())
                    .into(),
            },
            limits: LimitsConfig {
                max_batch_size: std::env::var("MAX_BATCH_SIZE")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                max_file_bytes: std::env::var("MAX_FILE_BYTES")
                    .unwrap_or_else(|_| (20 * 1024 * 1024).to_string())
                    .parse()
                    .unwrap_or(20 * 1024 * 1024),
            },
        })
    }
}
