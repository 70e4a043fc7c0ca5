//! Vector and marker layers.
//!
//! Features are sent inline as GeoJSON. Their symbolizers go into a style
//! dictionary shared by all features of the layer, so a style used by many
//! features is sent once and referenced through [`STYLE_PROPERTY`].

use super::{EncodeContext, EncodedLayer, LayerEncoder};
use crate::layer::{Feature, Geometry, Layer, MarkersSource, Style, VectorSource};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// Feature property naming the feature's entry in the style dictionary.
pub const STYLE_PROPERTY: &str = "_gx_style";

const DEFAULT_INTENT: &str = "default";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedVector {
    pub styles: BTreeMap<String, Style>,
    pub style_property: String,
    pub geo_json: FeatureCollection,
    pub name: String,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<EncodedFeature>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedFeature {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub geometry: Geometry,
    pub properties: Map<String, Value>,
}

fn resolve_style(feature: &Feature, source: &VectorSource) -> Style {
    if let Some(style) = feature.style.as_ref().or(source.style.as_ref()) {
        return style.clone();
    }
    let intent = feature.render_intent.as_deref().unwrap_or(DEFAULT_INTENT);
    source
        .style_map
        .get(intent)
        .or_else(|| source.style_map.get(DEFAULT_INTENT))
        .cloned()
        .unwrap_or_default()
}

/// Serialization with sorted keys, whatever the map's own ordering.
fn canonical_key(style: &Style) -> String {
    let sorted: BTreeMap<&String, &Value> = style.iter().collect();
    serde_json::to_string(&sorted).unwrap_or_default()
}

fn externalize_graphic(mut style: Style, ctx: &EncodeContext) -> Style {
    let absolute = match style.get("externalGraphic") {
        Some(Value::String(graphic)) => ctx.absolute_url(graphic),
        _ => return style,
    };
    style.insert("externalGraphic".to_string(), Value::String(absolute));
    style
}

/// Encodes `source` under `name`. `None` when the source has no features at all.
pub(crate) fn encode_features(
    name: &str,
    opacity: f64,
    source: &VectorSource,
    ctx: &EncodeContext,
) -> Option<EncodedLayer> {
    if source.features.is_empty() {
        return None;
    }

    let mut styles = BTreeMap::new();
    let mut style_ids: HashMap<String, u64> = HashMap::new();
    let mut next_id = 1u64;
    let mut features = Vec::new();

    for feature in &source.features {
        let Some(geometry) = feature.geometry.as_ref() else {
            continue;
        };
        if let Some(extent) = ctx.extent {
            match geometry.bounds() {
                Some(b) if extent.intersects(&b) => {}
                _ => continue,
            }
        }

        let style = resolve_style(feature, source);
        let key = canonical_key(&style);
        let style_id = match style_ids.get(&key) {
            Some(id) => *id,
            None => {
                let id = next_id;
                next_id += 1;
                style_ids.insert(key, id);
                styles.insert(id.to_string(), externalize_graphic(style, ctx));
                id
            }
        };

        // Attributes stay behind; the print service only needs geometry and style.
        let mut properties = Map::new();
        properties.insert(STYLE_PROPERTY.to_string(), Value::from(style_id));
        features.push(EncodedFeature {
            kind: "Feature",
            geometry: geometry.clone(),
            properties,
        });
    }

    tracing::debug!(
        "Vector layer '{}': {} of {} features, {} styles",
        name,
        features.len(),
        source.features.len(),
        styles.len()
    );

    Some(EncodedLayer::Vector(EncodedVector {
        styles,
        style_property: STYLE_PROPERTY.to_string(),
        geo_json: FeatureCollection { kind: "FeatureCollection", features },
        name: name.to_string(),
        opacity,
    }))
}

impl LayerEncoder for VectorSource {
    fn encode(&self, layer: &Layer, ctx: &EncodeContext) -> Option<EncodedLayer> {
        encode_features(&layer.name, layer.effective_opacity(), self, ctx)
    }
}

impl MarkersSource {
    /// Point features styled with each marker's icon.
    pub fn to_vector(&self) -> VectorSource {
        let features = self
            .markers
            .iter()
            .map(|marker| {
                let mut style = Style::new();
                style.insert("externalGraphic".into(), Value::from(marker.icon.url.clone()));
                style.insert("graphicWidth".into(), Value::from(marker.icon.size.width));
                style.insert("graphicHeight".into(), Value::from(marker.icon.size.height));
                style.insert("graphicXOffset".into(), Value::from(marker.icon.offset.x));
                style.insert("graphicYOffset".into(), Value::from(marker.icon.offset.y));
                Feature::new(Geometry::Point(marker.lonlat)).with_style(style)
            })
            .collect();
        VectorSource { features, ..VectorSource::default() }
    }
}

impl LayerEncoder for MarkersSource {
    fn encode(&self, layer: &Layer, ctx: &EncodeContext) -> Option<EncodedLayer> {
        encode_features(&layer.name, layer.effective_opacity(), &self.to_vector(), ctx)
    }
}
