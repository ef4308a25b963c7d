//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILINGEST_CONFIG` (environment variable)
//! 2. `~/.config/mailingest/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailingest\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Message parser settings.
    pub parser: ParserConfig,
    /// Object store and catalog locations.
    pub storage: StorageConfig,
    /// Resource limits.
    pub performance: PerformanceConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// What to do when an attachment payload cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecodeFailurePolicy {
    /// Drop the offending attachment and keep the rest of the message.
    #[default]
    SkipAttachment,
    /// Discard the whole parse result for the message.
    AbortMessage,
}

/// Message parser settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// `encoding_rs` label used to decode the raw message and to re-encode
    /// non-base64 attachment payloads.
    pub default_charset: String,
    /// Maximum number of characters in the preview text.
    pub preview_chars: usize,
    /// Header names extracted in addition to CC, BCC and Reply-To.
    pub extra_headers: Vec<String>,
    /// Behavior on malformed base64 payloads.
    pub on_decode_error: DecodeFailurePolicy,
}

/// Object store and catalog locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the object store holding raw messages and attachment blobs.
    pub store_dir: Option<PathBuf>,
    /// Directory holding the `emails` and `attachments` tables.
    pub catalog_dir: Option<PathBuf>,
}

/// Resource limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Maximum message size in bytes (default: 268435456 = 256 MB).
    pub max_message_size: u64,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            default_charset: "utf-8".to_string(),
            preview_chars: 100,
            extra_headers: Vec::new(),
            on_decode_error: DecodeFailurePolicy::default(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_message_size: 256 * 1024 * 1024, // 256 MB
        }
    }
}

impl ParserConfig {
    /// Resolve [`Self::default_charset`] to an encoding.
    pub fn charset(&self) -> Result<&'static Encoding> {
        Encoding::for_label(self.default_charset.trim().as_bytes())
            .ok_or_else(|| IngestError::UnsupportedEncoding(self.default_charset.clone()))
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILINGEST_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mailingest").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailingest")
}

/// Return the log file path (inside [`cache_dir`]).
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("mailingest.log")
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailingest")
}

/// Root directory of the object store.
pub fn store_dir(config: &Config) -> PathBuf {
    config
        .storage
        .store_dir
        .clone()
        .unwrap_or_else(|| data_dir().join("store"))
}

/// Directory of the catalog tables.
pub fn catalog_dir(config: &Config) -> PathBuf {
    config
        .storage
        .catalog_dir
        .clone()
        .unwrap_or_else(|| data_dir().join("catalog"))
}
