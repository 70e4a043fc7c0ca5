//! Print request document.
//!
//! [`PrintRequestBuilder`] turns a map snapshot, its pages and the user's
//! selections into the JSON document the print service's `create.json`
//! endpoint expects. A request is built fresh for every submission.

use crate::capabilities::{CapabilityStore, Dpi, Layout};
use crate::encoder::{encode_layer, encode_legend, EncodeContext, EncodedLayer, EncodedLegend};
use crate::error::PrintError;
use crate::geometry::Units;
use crate::layer::{LayerRegistry, MapState};
use crate::page::PrintPage;
use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

/// Top-level keys owned by the request itself; custom params cannot replace them.
const RESERVED_REQUEST_KEYS: [&str; 7] = ["units", "srs", "layout", "dpi", "layers", "pages", "legends"];
/// Page keys owned by the page geometry.
const RESERVED_PAGE_KEYS: [&str; 4] = ["rotation", "center", "scale", "bbox"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrintRequest {
    pub units: Units,
    pub srs: String,
    pub layout: String,
    pub dpi: f64,
    #[serde(flatten)]
    pub custom_params: Map<String, Value>,
    pub layers: Vec<EncodedLayer>,
    pub pages: Vec<EncodedPage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legends: Option<Vec<EncodedLegend>>,
}

impl PrintRequest {
    pub fn to_json(&self) -> Result<String, PrintError> {
        serde_json::to_string(self).map_err(|e| PrintError::Submission(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedPage {
    pub rotation: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
    #[serde(flatten)]
    pub custom_params: Map<String, Value>,
}

/// What the user picked for this print.
#[derive(Debug, Clone, PartialEq)]
pub struct Selections {
    pub layout: Layout,
    pub dpi: Dpi,
    pub output_format: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Embed layer legends in the document.
    pub legend: bool,
}

impl Selections {
    pub fn new(layout: Layout, dpi: Dpi) -> Self {
        Self { layout, dpi, output_format: None, title: None, description: None, legend: false }
    }
}

fn without_reserved(params: &Map<String, Value>, reserved: &[&str]) -> Map<String, Value> {
    params
        .iter()
        .filter(|(k, _)| !reserved.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn encode_page(index: usize, page: &PrintPage, selections: &Selections) -> Result<EncodedPage, PrintError> {
    let mut custom_params = without_reserved(page.custom_params(), &RESERVED_PAGE_KEYS);
    if let Some(title) = &selections.title {
        custom_params.insert("title".to_string(), Value::from(title.clone()));
        custom_params.insert("printTitle".to_string(), Value::from(title.clone()));
    }
    if let Some(description) = &selections.description {
        custom_params.insert("printDescription".to_string(), Value::from(description.clone()));
    }

    let mut encoded = EncodedPage {
        rotation: page.rotation(),
        center: None,
        scale: None,
        bbox: None,
        custom_params,
    };
    match (page.center(), page.scale(), page.bbox()) {
        (Some(center), Some(scale), _) => {
            encoded.center = Some(center.into());
            encoded.scale = Some(scale.value);
        }
        (_, _, Some(bbox)) => encoded.bbox = Some(bbox.to_array()),
        _ => return Err(PrintError::InvalidPage(index)),
    }
    Ok(encoded)
}

pub struct PrintRequestBuilder<'a> {
    store: &'a CapabilityStore,
    registry: &'a dyn LayerRegistry,
    base_url: Option<&'a Url>,
}

impl<'a> PrintRequestBuilder<'a> {
    pub fn new(store: &'a CapabilityStore, registry: &'a dyn LayerRegistry) -> Self {
        Self { store, registry, base_url: None }
    }

    /// Base for absolutizing relative image, icon and legend URLs.
    pub fn with_base_url(mut self, base_url: Option<&'a Url>) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn build(
        &self,
        map: &MapState,
        pages: &[PrintPage],
        selections: &Selections,
        custom_params: &Map<String, Value>,
    ) -> Result<PrintRequest, PrintError> {
        self.store.get()?;
        if pages.is_empty() {
            return Err(PrintError::InvalidPage(0));
        }

        let ctx = EncodeContext {
            extent: map.extent,
            base_url: self.base_url,
            registry: self.registry,
        };

        let printable: Vec<_> = map
            .print_order()
            .into_iter()
            .filter(|layer| layer.is_printable())
            .collect();

        let layers: Vec<EncodedLayer> = printable
            .iter()
            .filter_map(|layer| encode_layer(layer, &ctx))
            .collect();

        let pages = pages
            .iter()
            .enumerate()
            .map(|(i, page)| encode_page(i, page, selections))
            .collect::<Result<Vec<_>, _>>()?;

        let legends = selections.legend.then(|| {
            printable
                .iter()
                .filter(|layer| !layer.control)
                .filter_map(|layer| encode_legend(layer, &ctx))
                .collect::<Vec<_>>()
        });

        let mut params = without_reserved(custom_params, &RESERVED_REQUEST_KEYS);
        if let Some(format) = &selections.output_format {
            params.insert("outputFormat".to_string(), Value::from(format.clone()));
        }

        tracing::info!(
            "Built print request: layout '{}', {} dpi, {} layers, {} pages",
            selections.layout.name,
            selections.dpi.value,
            layers.len(),
            pages.len()
        );

        Ok(PrintRequest {
            units: map.units,
            srs: map.projection.clone(),
            layout: selections.layout.name.clone(),
            dpi: selections.dpi.value,
            custom_params: params,
            layers,
            pages,
            legends,
        })
    }
}
