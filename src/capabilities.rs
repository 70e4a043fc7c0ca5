// src/capabilities.rs - Print service capabilities (info.json) and their one-time store
use crate::error::PrintError;
use crate::geometry::Size;
use crate::transport::PrintTransport;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub layouts: Vec<Layout>,
    pub dpis: Vec<Dpi>,
    #[serde(default)]
    pub output_formats: Vec<OutputFormat>,
    #[serde(default)]
    pub scales: Vec<Scale>,
    #[serde(default, rename = "createURL")]
    pub create_url: Option<String>,
    #[serde(default, rename = "printURL")]
    pub print_url: Option<String>,
}

impl Capabilities {
    pub fn layout(&self, name: &str) -> Option<&Layout> {
        self.layouts.iter().find(|l| l.name == name)
    }

    /// Looks a DPI up by its name or by its numeric value.
    pub fn dpi(&self, name_or_value: &str) -> Option<&Dpi> {
        let numeric = name_or_value.parse::<f64>().ok();
        self.dpis
            .iter()
            .find(|d| d.name == name_or_value || numeric == Some(d.value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub name: String,
    /// Page map area in points (1/72 inch).
    #[serde(alias = "map")]
    pub page_size: Size,
    #[serde(default, alias = "rotation")]
    pub supports_rotation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dpi {
    pub name: String,
    #[serde(deserialize_with = "number_or_string")]
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub name: String,
    #[serde(deserialize_with = "number_or_string")]
    pub value: f64,
}

impl Scale {
    pub fn new(value: f64) -> Self {
        Self { name: format!("1:{}", value), value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputFormat {
    pub name: String,
}

/// MapFish sends numeric values as strings (`"value": "254"`).
fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom),
    }
}

/// Parses an `info.json` document.
pub fn parse_capabilities(body: &str) -> Result<Capabilities, PrintError> {
    let caps: Capabilities =
        serde_json::from_str(body).map_err(|e| PrintError::Capabilities(e.to_string()))?;
    if caps.layouts.is_empty() {
        return Err(PrintError::Capabilities("no layouts advertised".to_string()));
    }
    if caps.dpis.is_empty() {
        return Err(PrintError::Capabilities("no dpis advertised".to_string()));
    }
    Ok(caps)
}

/// Ensures a trailing slash, appends `endpoint` and the extra query params.
pub fn service_endpoint(
    service_url: &str,
    endpoint: &str,
    extra_params: &BTreeMap<String, String>,
) -> Result<Url, PrintError> {
    let mut base = service_url.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    let mut url = Url::parse(&base)
        .and_then(|b| b.join(endpoint))
        .map_err(|e| PrintError::Transport(format!("invalid service url '{}': {}", service_url, e)))?;
    append_params(&mut url, extra_params);
    Ok(url)
}

pub(crate) fn append_params(url: &mut Url, params: &BTreeMap<String, String>) {
    if params.is_empty() {
        return;
    }
    let mut pairs = url.query_pairs_mut();
    for (k, v) in params {
        pairs.append_pair(k, v);
    }
}

/// Holds the capabilities of one print service. Loaded once, read by everyone after.
#[derive(Debug, Default)]
pub struct CapabilityStore {
    capabilities: OnceLock<Arc<Capabilities>>,
    service_url: OnceLock<String>,
    extra_params: BTreeMap<String, String>,
}

impl CapabilityStore {
    pub fn new(extra_params: BTreeMap<String, String>) -> Self {
        Self {
            capabilities: OnceLock::new(),
            service_url: OnceLock::new(),
            extra_params,
        }
    }

    /// A store that is ready without a round-trip.
    pub fn from_capabilities(service_url: &str, capabilities: Capabilities) -> Self {
        let store = Self::default();
        let _ = store.service_url.set(service_url.to_string());
        let _ = store.capabilities.set(Arc::new(capabilities));
        store
    }

    pub fn is_loaded(&self) -> bool {
        self.capabilities.get().is_some()
    }

    pub fn get(&self) -> Result<Arc<Capabilities>, PrintError> {
        self.capabilities.get().cloned().ok_or(PrintError::NotReady)
    }

    /// Fetches `<service>/info.json`. A store that is already loaded returns
    /// its capabilities without contacting the service.
    pub async fn load(
        &self,
        transport: &dyn PrintTransport,
        service_url: &str,
    ) -> Result<Arc<Capabilities>, PrintError> {
        if let Some(caps) = self.capabilities.get() {
            return Ok(caps.clone());
        }
        let url = service_endpoint(service_url, "info.json", &self.extra_params)?;
        tracing::info!("Loading print capabilities from {}", url);
        let body = transport.get(url.as_str()).await?;
        let caps = parse_capabilities(&body)?;
        tracing::info!(
            "Print capabilities loaded: {} layouts, {} dpis, {} formats",
            caps.layouts.len(),
            caps.dpis.len(),
            caps.output_formats.len()
        );
        let _ = self.service_url.set(service_url.to_string());
        Ok(self.capabilities.get_or_init(|| Arc::new(caps)).clone())
    }

    /// Where print requests are posted.
    pub fn create_url(&self) -> Result<Url, PrintError> {
        let caps = self.get()?;
        let service = self.service_url.get().ok_or(PrintError::NotReady)?;
        match &caps.create_url {
            Some(create) => {
                let mut url = Url::parse(create)
                    .or_else(|_| Url::parse(&format!("{}/", service.trim_end_matches('/'))).and_then(|b| b.join(create)))
                    .map_err(|e| PrintError::Capabilities(format!("invalid createURL '{}': {}", create, e)))?;
                append_params(&mut url, &self.extra_params);
                Ok(url)
            }
            None => service_endpoint(service, "create.json", &self.extra_params),
        }
    }
}
