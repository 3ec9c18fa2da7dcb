//! Service configuration loader.
//!
//! Reads `config.toml` from the working directory when present and falls
//! back to defaults when the file is missing or malformed. The provider API
//! key is never stored in the file; it comes from the environment and is
//! wrapped in [`SecretString`] so it cannot leak through Debug output or
//! logs.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;

/// Environment variables consulted for the provider API key, in order.
const API_KEY_ENV_VARS: &[&str] = &["SLIDESMITH_API_KEY", "GEMINI_API_KEY"];

/// Process-wide service configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the generateContent endpoint family.
    pub api_base: String,
    /// Model used for outline/style/refinement text generation.
    pub text_model: String,
    /// Model used for page image generation.
    pub image_model: String,
    /// Maximum attempts per logical generation request.
    pub max_attempts: u32,
    /// Fixed delay between attempts, in seconds.
    pub retry_delay_secs: u64,
    /// Per-attempt timeout for text generation, in seconds.
    pub text_timeout_secs: u64,
    /// Per-attempt timeout for image generation, in seconds.
    pub image_timeout_secs: u64,
    /// Timeout for the single-shot template analysis call, in seconds.
    pub analyze_timeout_secs: u64,
    /// Directory generated page images are written to.
    pub output_dir: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            text_model: "gemini-3-pro-preview".to_string(),
            image_model: "gemini-3-pro-image-preview".to_string(),
            max_attempts: 3,
            retry_delay_secs: 5,
            text_timeout_secs: 120,
            image_timeout_secs: 180,
            analyze_timeout_secs: 300,
            output_dir: PathBuf::from("outputs"),
        }
    }
}

/// Load configuration from `{dir}/config.toml`.
///
/// - Missing file: defaults.
/// - Unreadable or malformed file: warn and fall back to defaults.
pub async fn load_config(dir: &Path) -> ServiceConfig {
    let config_path = dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(
                "no config.toml at {}, using defaults",
                config_path.display()
            );
            return ServiceConfig::default();
        }
        Err(err) => {
            tracing::warn!(
                "failed to read {}: {err}, using defaults",
                config_path.display()
            );
            return ServiceConfig::default();
        }
    };

    match toml::from_str::<ServiceConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            ServiceConfig::default()
        }
    }
}

/// Resolve the provider API key from the environment.
pub fn api_key_from_env() -> Option<SecretString> {
    API_KEY_ENV_VARS
        .iter()
        .find_map(|var| std::env::var(var).ok())
        .filter(|key| !key.is_empty())
        .map(SecretString::from)
}
