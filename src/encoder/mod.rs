//! Layer encoders.
//!
//! Each printable [`LayerSource`] kind implements [`LayerEncoder`] and
//! produces a fresh [`EncodedLayer`] describing how the print service should
//! render it. Encoders never touch the layer they read from.

pub mod image;
pub mod legend;
pub mod tile;
pub mod vector;
pub mod wms;

use crate::geometry::Bounds;
use crate::layer::{Layer, LayerRegistry, LayerSource};
use serde::Serialize;
use url::Url;

pub use image::EncodedImage;
pub use legend::{encode_legend, EncodedLegend, LegendClass};
pub use tile::{EncodedKaMap, EncodedKaMapCache, EncodedOsm, EncodedTileCache, EncodedTms, EncodedWmts};
pub use vector::{EncodedFeature, EncodedVector, FeatureCollection, STYLE_PROPERTY};
pub use wms::EncodedWms;

/// What an encoder may consult besides the layer itself.
pub struct EncodeContext<'a> {
    /// Current map extent; vector features outside it are not printed.
    pub extent: Option<Bounds>,
    /// Base for turning relative resource URLs into absolute ones.
    pub base_url: Option<&'a Url>,
    pub registry: &'a dyn LayerRegistry,
}

impl<'a> EncodeContext<'a> {
    pub fn resolve_url(&self, url: &str) -> Option<Url> {
        match Url::parse(url) {
            Ok(u) => Some(u),
            Err(url::ParseError::RelativeUrlWithoutBase) => self.base_url?.join(url).ok(),
            Err(_) => None,
        }
    }

    /// The absolute form of `url`, or `url` unchanged when it cannot be resolved.
    pub fn absolute_url(&self, url: &str) -> String {
        self.resolve_url(url)
            .map(String::from)
            .unwrap_or_else(|| url.to_string())
    }
}

pub trait LayerEncoder {
    fn encode(&self, layer: &Layer, ctx: &EncodeContext) -> Option<EncodedLayer>;
}

/// Fields shared by every layer fetched over HTTP.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpFields {
    #[serde(rename = "baseURL")]
    pub base_url: String,
    pub opacity: f64,
    pub single_tile: bool,
}

impl HttpFields {
    pub(crate) fn from_layer(layer: &Layer, http: &crate::layer::HttpSource) -> Self {
        Self {
            base_url: http.base_url(),
            opacity: layer.effective_opacity(),
            single_tile: http.single_tile,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum EncodedLayer {
    #[serde(rename = "WMS")]
    Wms(EncodedWms),
    Image(EncodedImage),
    Vector(EncodedVector),
    TileCache(EncodedTileCache),
    #[serde(rename = "OSM")]
    Osm(EncodedOsm),
    #[serde(rename = "TMS")]
    Tms(EncodedTms),
    #[serde(rename = "WMTS")]
    Wmts(EncodedWmts),
    KaMap(EncodedKaMap),
    KaMapCache(EncodedKaMapCache),
}

impl EncodedLayer {
    pub fn type_name(&self) -> &'static str {
        match self {
            EncodedLayer::Wms(_) => "WMS",
            EncodedLayer::Image(_) => "Image",
            EncodedLayer::Vector(_) => "Vector",
            EncodedLayer::TileCache(_) => "TileCache",
            EncodedLayer::Osm(_) => "OSM",
            EncodedLayer::Tms(_) => "TMS",
            EncodedLayer::Wmts(_) => "WMTS",
            EncodedLayer::KaMap(_) => "KaMap",
            EncodedLayer::KaMapCache(_) => "KaMapCache",
        }
    }
}

impl LayerEncoder for LayerSource {
    fn encode(&self, layer: &Layer, ctx: &EncodeContext) -> Option<EncodedLayer> {
        match self {
            LayerSource::Wms(src) => src.encode(layer, ctx),
            LayerSource::TileCache(src) => src.encode(layer, ctx),
            LayerSource::Osm(src) => src.encode(layer, ctx),
            LayerSource::Tms(src) => src.encode(layer, ctx),
            LayerSource::Wmts(src) => src.encode(layer, ctx),
            LayerSource::KaMap(src) => src.encode(layer, ctx),
            LayerSource::KaMapCache(src) => src.encode(layer, ctx),
            LayerSource::Image(src) => src.encode(layer, ctx),
            LayerSource::Vector(src) => src.encode(layer, ctx),
            LayerSource::Markers(src) => src.encode(layer, ctx),
            LayerSource::Other => None,
        }
    }
}

/// Encodes `layer`, or `None` when the print service cannot render it.
pub fn encode_layer(layer: &Layer, ctx: &EncodeContext) -> Option<EncodedLayer> {
    let encoded = layer.source.encode(layer, ctx);
    match &encoded {
        Some(enc) => tracing::debug!("Encoded layer '{}' as {}", layer.name, enc.type_name()),
        None => tracing::debug!("Layer '{}' is not printable, skipped", layer.name),
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::StaticLayerRegistry;

    #[test]
    fn test_absolute_url_resolution() {
        let registry = StaticLayerRegistry::new();
        let base = Url::parse("http://viewer.example/app/index.html").unwrap();
        let ctx = EncodeContext { extent: None, base_url: Some(&base), registry: &registry };
        assert_eq!(ctx.absolute_url("img/pin.png"), "http://viewer.example/app/img/pin.png");
        assert_eq!(ctx.absolute_url("/img/pin.png"), "http://viewer.example/img/pin.png");
        assert_eq!(ctx.absolute_url("http://cdn/pin.png"), "http://cdn/pin.png");

        let no_base = EncodeContext { extent: None, base_url: None, registry: &registry };
        assert_eq!(no_base.absolute_url("img/pin.png"), "img/pin.png");
    }

    #[test]
    fn test_other_layers_are_not_printable() {
        let registry = StaticLayerRegistry::new();
        let ctx = EncodeContext { extent: None, base_url: None, registry: &registry };
        let layer = Layer::new("g", "Google", LayerSource::Other);
        assert!(encode_layer(&layer, &ctx).is_none());
    }
}
