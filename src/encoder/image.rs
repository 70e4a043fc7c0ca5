// src/encoder/image.rs - Single georeferenced image layers
use super::{EncodeContext, EncodedLayer, LayerEncoder};
use crate::layer::{ImageSource, Layer};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedImage {
    #[serde(rename = "baseURL")]
    pub base_url: String,
    pub opacity: f64,
    pub extent: [f64; 4],
    pub pixel_size: [f64; 2],
    pub name: String,
}

impl LayerEncoder for ImageSource {
    fn encode(&self, layer: &Layer, ctx: &EncodeContext) -> Option<EncodedLayer> {
        Some(EncodedLayer::Image(EncodedImage {
            base_url: ctx.absolute_url(&self.url),
            opacity: layer.effective_opacity(),
            extent: self.extent.to_array(),
            pixel_size: self.size.into(),
            name: layer.name.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Bounds, Size};
    use crate::layer::{LayerSource, StaticLayerRegistry};
    use url::Url;

    #[test]
    fn test_image_url_is_made_absolute() {
        let registry = StaticLayerRegistry::new();
        let base = Url::parse("http://viewer/maps/").unwrap();
        let ctx = EncodeContext { extent: None, base_url: Some(&base), registry: &registry };
        let layer = Layer::new("img", "Scan", LayerSource::Image(ImageSource {
            url: "scans/1956.png".into(),
            extent: Bounds::new(0.0, 0.0, 100.0, 50.0),
            size: Size::new(800.0, 400.0),
        }));
        let json = serde_json::to_value(layer.source.encode(&layer, &ctx).unwrap()).unwrap();
        assert_eq!(json["type"], "Image");
        assert_eq!(json["baseURL"], "http://viewer/maps/scans/1956.png");
        assert_eq!(json["pixelSize"], serde_json::json!([800.0, 400.0]));
        assert_eq!(json["opacity"], 1.0);
        assert_eq!(json["name"], "Scan");
    }
}
