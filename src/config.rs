//! # Print Service Configuration
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [service]
//! url = "https://mapea.example/geoprint/pdf"
//! timeout_ms = 20000
//!
//! [service.params]
//! mapeaop = "geoprint"
//!
//! [print]
//! legend = true
//! fit_mode = "closest"
//! base_url = "https://mapea.example/viewer/"
//!
//! [print.layout_params]
//! author = "cartography"
//!
//! [[print.pages]]
//! footer = "page one"
//!
//! [cache.parcels]
//! name = "parcels_tiled"
//! url = "https://cache.example/wms"
//! ```
//!
//! - `[service.params]` are appended to the capabilities and create URLs.
//! - `[cache]` maps a dynamic WMS layer name to a pre-tiled substitute.

// src/config.rs - Single configuration file
use crate::error::ConfigError;
use crate::layer::StaticLayerRegistry;
use crate::page::FitMode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PrintConfig {
    pub service: ServiceConfig,
    #[serde(default)]
    pub print: PrintOptions,
    #[serde(default)]
    pub cache: StaticLayerRegistry,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_ms: default_timeout_ms(),
            encoding: default_encoding(),
            params: BTreeMap::new(),
        }
    }
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PrintOptions {
    #[serde(default)]
    pub legend: bool,
    /// Fit bbox pages to the advertised scales instead of printing the raw extent.
    #[serde(default)]
    pub fit_mode: Option<FitMode>,
    /// Base for absolutizing relative URLs found in layers.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Request-level params sent with every print.
    #[serde(default)]
    pub layout_params: Map<String, Value>,
    /// One entry per page; an empty list prints a single page.
    #[serde(default)]
    pub pages: Vec<Map<String, Value>>,
}

impl PrintOptions {
    pub fn base_url(&self) -> Result<Option<Url>, ConfigError> {
        Ok(self.base_url.as_deref().map(Url::parse).transpose()?)
    }
}

fn default_timeout_ms() -> u64 { 30000 }
fn default_encoding() -> String { "UTF-8".to_string() }

pub fn load_config(path: &str) -> Result<PrintConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                Err(ConfigError::Toml(e))
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            Err(ConfigError::Io(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerRegistry;
    use std::io::Write;

    const SAMPLE: &str = r#"
[service]
url = "http://print/pdf"

[service.params]
mapeaop = "geoprint"

[print]
legend = true
fit_mode = "screen"
base_url = "http://viewer/app/"

[print.layout_params]
author = "me"

[[print.pages]]
footer = "one"

[[print.pages]]
footer = "two"

[cache.parcels]
name = "parcels_tiled"
url = "http://cache/wms"
"#;

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.service.url, "http://print/pdf");
        assert_eq!(config.service.timeout(), Duration::from_millis(30000));
        assert_eq!(config.service.encoding, "UTF-8");
        assert_eq!(config.service.params["mapeaop"], "geoprint");
        assert!(config.print.legend);
        assert_eq!(config.print.fit_mode, Some(FitMode::Screen));
        assert_eq!(config.print.pages.len(), 2);
        assert_eq!(config.print.layout_params["author"], "me");
        assert_eq!(
            config.print.base_url().unwrap().map(String::from),
            Some("http://viewer/app/".to_string())
        );
        let cached = config.cache.cached_counterpart("parcels").unwrap();
        assert_eq!(cached.name, "parcels_tiled");
    }

    #[test]
    fn test_missing_file_and_bad_toml() {
        assert!(matches!(load_config("/nonexistent/geoprint.toml"), Err(ConfigError::Io(_))));
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[service\nurl = ").unwrap();
        assert!(matches!(load_config(file.path().to_str().unwrap()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config: PrintConfig = toml::from_str("[service]\nurl = \"http://p\"").unwrap();
        assert!(!config.print.legend);
        assert!(config.print.fit_mode.is_none());
        assert!(config.print.base_url().unwrap().is_none());
        assert!(config.cache.cached_counterpart("x").is_none());
    }
}
