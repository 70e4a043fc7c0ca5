// src/encoder/wms.rs - WMS layer encoding with cached-layer substitution
use super::{EncodeContext, EncodedLayer, HttpFields, LayerEncoder};
use crate::layer::{Layer, WmsSource};
use serde::Serialize;
use std::collections::BTreeMap;

/// Params the WMS client fills in itself; never forwarded as custom params.
const SERVER_DEFAULT_PARAMS: [&str; 4] = ["service", "version", "request", "format"];
/// Params already carried by dedicated fields of the encoded layer.
const STANDARD_PARAMS: [&str; 5] = ["layers", "styles", "width", "height", "srs"];

const DEFAULT_FORMAT: &str = "image/jpeg";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedWms {
    #[serde(flatten)]
    pub http: HttpFields,
    pub layers: Vec<String>,
    pub format: String,
    pub styles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_params: Option<BTreeMap<String, String>>,
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value.unwrap_or("").split(',').map(str::to_string).collect()
}

/// Vendor-specific params (`TRANSPARENT`, `CQL_FILTER`, `TILED`, ...).
fn custom_params(src: &WmsSource) -> Option<BTreeMap<String, String>> {
    let extra: BTreeMap<String, String> = src
        .params
        .iter()
        .filter(|(k, _)| {
            let key = k.to_ascii_lowercase();
            !SERVER_DEFAULT_PARAMS.contains(&key.as_str()) && !STANDARD_PARAMS.contains(&key.as_str())
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    (!extra.is_empty()).then_some(extra)
}

impl LayerEncoder for WmsSource {
    fn encode(&self, layer: &Layer, ctx: &EncodeContext) -> Option<EncodedLayer> {
        let mut http = HttpFields::from_layer(layer, &self.http);
        let mut layers = split_list(self.param("LAYERS"));

        if let Some(cached) = ctx.registry.cached_counterpart(&layer.name) {
            tracing::debug!("Printing '{}' from cached layer '{}'", layer.name, cached.name);
            layers = vec![cached.name];
            http.base_url = cached.url;
        }

        Some(EncodedLayer::Wms(EncodedWms {
            http,
            layers,
            format: self.param("FORMAT").unwrap_or(DEFAULT_FORMAT).to_string(),
            styles: split_list(self.param("STYLES")),
            custom_params: custom_params(self),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{CachedLayer, HttpSource, LayerSource, Params, StaticLayerRegistry};

    fn roads() -> Layer {
        let mut params = Params::new();
        for (k, v) in [
            ("LAYERS", "roads,rivers"),
            ("STYLES", "thin,"),
            ("FORMAT", "image/png"),
            ("SERVICE", "WMS"),
            ("VERSION", "1.1.1"),
            ("REQUEST", "GetMap"),
            ("SRS", "EPSG:4326"),
            ("TRANSPARENT", "true"),
            ("CQL_FILTER", "type='primary'"),
        ] {
            params.insert(k.to_string(), v.to_string());
        }
        let mut layer = Layer::new("roads", "roads", LayerSource::Wms(WmsSource {
            http: HttpSource { urls: vec!["http://a/wms".into(), "http://b/wms".into()], single_tile: true },
            params,
            wmc_legend_url: None,
        }));
        layer.opacity = Some(0.5);
        layer
    }

    #[test]
    fn test_wms_fields_and_custom_params() {
        let registry = StaticLayerRegistry::new();
        let ctx = EncodeContext { extent: None, base_url: None, registry: &registry };
        let enc = roads().source.encode(&roads(), &ctx).unwrap();
        let json = serde_json::to_value(&enc).unwrap();
        assert_eq!(json["type"], "WMS");
        assert_eq!(json["baseURL"], "http://a/wms");
        assert_eq!(json["opacity"], 0.5);
        assert_eq!(json["singleTile"], true);
        assert_eq!(json["layers"], serde_json::json!(["roads", "rivers"]));
        assert_eq!(json["styles"], serde_json::json!(["thin", ""]));
        assert_eq!(json["format"], "image/png");
        assert_eq!(
            json["customParams"],
            serde_json::json!({"CQL_FILTER": "type='primary'", "TRANSPARENT": "true"})
        );
    }

    #[test]
    fn test_wms_cache_substitution() {
        let mut registry = StaticLayerRegistry::new();
        registry.insert("roads", CachedLayer { name: "roads_cached".into(), url: "http://cache/tms".into() });
        let ctx = EncodeContext { extent: None, base_url: None, registry: &registry };
        let layer = roads();
        match layer.source.encode(&layer, &ctx) {
            Some(EncodedLayer::Wms(enc)) => {
                assert_eq!(enc.layers, vec!["roads_cached".to_string()]);
                assert_eq!(enc.http.base_url, "http://cache/tms");
            }
            other => panic!("expected WMS, got {:?}", other),
        }
    }

    #[test]
    fn test_wms_without_extras_omits_custom_params() {
        let mut params = Params::new();
        params.insert("LAYERS".into(), "base".into());
        let layer = Layer::new("base", "base", LayerSource::Wms(WmsSource {
            http: HttpSource::new("http://a/wms"),
            params,
            wmc_legend_url: None,
        }));
        let registry = StaticLayerRegistry::new();
        let ctx = EncodeContext { extent: None, base_url: None, registry: &registry };
        let json = serde_json::to_value(layer.source.encode(&layer, &ctx).unwrap()).unwrap();
        assert!(json.get("customParams").is_none());
        assert_eq!(json["styles"], serde_json::json!([""]));
        assert_eq!(json["format"], DEFAULT_FORMAT);
    }
}
