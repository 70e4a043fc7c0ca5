// src/encoder/legend.rs - Legend entries for the printed document
use super::EncodeContext;
use crate::layer::{Layer, LayerSource, WmsSource};
use serde::Serialize;
use url::Url;

const LEGEND_WIDTH: &str = "150";
const LEGEND_FORMAT: &str = "image/png";
const BLANK_EXCEPTIONS: &str = "application/vnd.ogc.se_blank";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedLegend {
    pub name: String,
    pub classes: Vec<LegendClass>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendClass {
    pub name: String,
    pub icons: Vec<String>,
}

/// GetLegendGraphic against the layer's service, or its cached substitute.
fn get_legend_graphic_url(layer: &Layer, src: &WmsSource, ctx: &EncodeContext) -> Option<Url> {
    let (base, layer_param) = match ctx.registry.cached_counterpart(&layer.name) {
        Some(cached) => (cached.url, cached.name),
        None => (src.http.base_url(), src.param("LAYERS").unwrap_or_default().to_string()),
    };
    let mut url = ctx.resolve_url(&base)?;

    const OVERRIDES: [&str; 5] = ["REQUEST", "LAYER", "FORMAT", "EXCEPTIONS", "WIDTH"];
    {
        let mut pairs = url.query_pairs_mut();
        if src.param("SERVICE").is_none() {
            pairs.append_pair("SERVICE", "WMS");
        }
        for (k, v) in &src.params {
            if !OVERRIDES.iter().any(|o| o.eq_ignore_ascii_case(k)) {
                pairs.append_pair(k, v);
            }
        }
        pairs
            .append_pair("REQUEST", "GetLegendGraphic")
            .append_pair("LAYER", &layer_param)
            .append_pair("FORMAT", LEGEND_FORMAT)
            .append_pair("EXCEPTIONS", BLANK_EXCEPTIONS)
            .append_pair("WIDTH", LEGEND_WIDTH);
    }
    Some(url)
}

fn legend_url(layer: &Layer, ctx: &EncodeContext) -> Option<String> {
    let LayerSource::Wms(src) = &layer.source else {
        return None;
    };
    if let Some(href) = &src.wmc_legend_url {
        return Some(ctx.absolute_url(href));
    }
    get_legend_graphic_url(layer, src, ctx).map(String::from)
}

/// Legend entry for `layer`; `None` for layers hidden from the layer switcher.
///
/// Layers without a resolvable legend graphic (WFS, vector, tiles) still get
/// an entry, with no classes.
pub fn encode_legend(layer: &Layer, ctx: &EncodeContext) -> Option<EncodedLegend> {
    if !layer.display_in_layer_switcher {
        return None;
    }
    let classes = legend_url(layer, ctx)
        .map(|url| vec![LegendClass { name: String::new(), icons: vec![url] }])
        .unwrap_or_default();
    Some(EncodedLegend { name: layer.name.clone(), classes })
}
