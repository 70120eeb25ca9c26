//! Gateway configuration loader.
//!
//! Reads `config.toml` from the data directory and deserializes it into
//! [`GatewayConfig`]. Falls back to defaults when the file is missing or
//! malformed. The API key itself never lives in the file; it comes from
//! the `GEMINI_API_KEY` environment variable.

use std::path::Path;

use serde::Deserialize;

/// Model gateway settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Model identifier sent to the Gemini API.
    pub model: String,
    /// Base URL override (testing/proxies).
    pub base_url: Option<String>,
    /// Sampling temperature for relayed completions.
    pub temperature: f64,
    /// Output token cap for relayed completions.
    pub max_tokens: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            base_url: None,
            temperature: 0.7,
            max_tokens: 4096,
        }
    }
}

/// Load gateway configuration from `{data_dir}/config.toml`.
///
/// - Missing file: defaults.
/// - Unparseable file: logs a warning, returns defaults.
pub async fn load_gateway_config(data_dir: &Path) -> GatewayConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(
                "No config.toml found at {}, using defaults",
                config_path.display()
            );
            return GatewayConfig::default();
        }
        Err(err) => {
            tracing::warn!(
                "Failed to read {}: {err}, using defaults",
                config_path.display()
            );
            return GatewayConfig::default();
        }
    };

    match toml::from_str::<GatewayConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GatewayConfig::default()
        }
    }
}
