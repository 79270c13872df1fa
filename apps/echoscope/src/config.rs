//! # Configuration
//!
//! Optional `echoscope.toml` settings for the binary.
//!
//! ```toml
//! [louvain]
//! max_passes = 100
//! max_levels = 32
//! min_gain = 1e-12
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! cors_origins = ["http://localhost:3000"]
//! ```
//!
//! Precedence, lowest first: built-in defaults, the config file, environment
//! (`ECHOSCOPE_CORS_ORIGINS`), CLI flags.

use echoscope_core::{EchoError, LouvainConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "echoscope.toml";

/// Environment variable overriding `server.cors_origins` (comma-separated, or `*`).
pub const CORS_ORIGINS_ENV: &str = "ECHOSCOPE_CORS_ORIGINS";

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// CONFIG TYPES
// =============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EchoscopeConfig {
    pub louvain: LouvainConfig,
    pub server: ServerConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins. Empty means localhost only, `["*"]` allows all.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// LOADING
// =============================================================================

impl EchoscopeConfig {
    /// Parse configuration from TOML text and validate it.
    pub fn from_toml_str(text: &str) -> Result<Self, EchoError> {
        let config: Self =
            toml::from_str(text).map_err(|e| EchoError::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self, EchoError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            EchoError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(EchoError::Config(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            EchoError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Resolve the effective configuration.
    ///
    /// An explicit `path` must exist. Without one, `echoscope.toml` in the
    /// working directory is used if present, otherwise defaults. Environment
    /// overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, EchoError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_cors_override(std::env::var(CORS_ORIGINS_ENV).ok().as_deref());
        tracing::debug!(?config, "configuration resolved");
        Ok(config)
    }

    /// Replace the CORS origins with a comma-separated override, if given.
    pub fn apply_cors_override(&mut self, origins: Option<&str>) {
        if let Some(origins) = origins {
            self.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    fn validate(&self) -> Result<(), EchoError> {
        let gain = self.louvain.min_gain;
        if !gain.is_finite() || gain < 0.0 {
            return Err(EchoError::Config(format!(
                "louvain.min_gain must be a finite non-negative number, got {}",
                gain
            )));
        }
        if self.louvain.max_passes == 0 {
            return Err(EchoError::Config(
                "louvain.max_passes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_default() {
        let config = EchoscopeConfig::from_toml_str("").expect("parse");
        assert_eq!(config, EchoscopeConfig::default());
        assert_eq!(config.server.bind_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config = EchoscopeConfig::from_toml_str("[louvain]\nmax_levels = 4\n").expect("parse");
        assert_eq!(config.louvain.max_levels, 4);
        assert_eq!(
            config.louvain.max_passes,
            LouvainConfig::default().max_passes
        );
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn negative_gain_rejected() {
        let result = EchoscopeConfig::from_toml_str("[louvain]\nmin_gain = -0.5\n");
        assert!(matches!(result, Err(EchoError::Config(_))));
    }

    #[test]
    fn unknown_key_rejected() {
        let result = EchoscopeConfig::from_toml_str("[server]\nhots = \"x\"\n");
        assert!(matches!(result, Err(EchoError::Config(_))));
    }

    #[test]
    fn cors_override_splits_list() {
        let mut config = EchoscopeConfig::default();
        config.apply_cors_override(Some("http://a.test, http://b.test,,"));
        assert_eq!(
            config.server.cors_origins,
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );

        config.apply_cors_override(None);
        assert_eq!(config.server.cors_origins.len(), 2);
    }
}
