// src/encoder/tile.rs - Tile-cache family: TileCache, OSM, TMS, WMTS, KaMap, KaMapCache
use super::{EncodeContext, EncodedLayer, HttpFields, LayerEncoder};
use crate::layer::{
    HttpSource, KaMapCacheSource, KaMapSource, Layer, OsmSource, Params, TileCacheSource, TileGrid,
    TmsSource, WmtsSource,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridFields {
    pub max_extent: [f64; 4],
    pub tile_size: [f64; 2],
    pub resolutions: Vec<f64>,
}

impl From<&TileGrid> for GridFields {
    fn from(grid: &TileGrid) -> Self {
        Self {
            max_extent: grid.max_extent.to_array(),
            tile_size: grid.tile_size.into(),
            resolutions: grid.effective_resolutions(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedTileCache {
    #[serde(flatten)]
    pub http: HttpFields,
    #[serde(flatten)]
    pub grid: GridFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedOsm {
    #[serde(flatten)]
    pub http: HttpFields,
    #[serde(flatten)]
    pub grid: GridFields,
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedTms {
    #[serde(flatten)]
    pub tile_cache: EncodedTileCache,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedWmts {
    #[serde(flatten)]
    pub http: HttpFields,
    pub layer: String,
    pub version: String,
    pub request_encoding: String,
    pub tile_origin: [f64; 2],
    pub tile_size: [f64; 2],
    pub style: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_suffix: Option<String>,
    pub dimensions: Vec<String>,
    pub params: Params,
    pub max_extent: [f64; 4],
    pub matrix_set: String,
    pub zoom_offset: i32,
    pub resolutions: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedKaMap {
    #[serde(flatten)]
    pub http: HttpFields,
    #[serde(flatten)]
    pub grid: GridFields,
    pub map: String,
    pub extension: String,
    pub group: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedKaMapCache {
    #[serde(flatten)]
    pub ka_map: EncodedKaMap,
    pub meta_tile_width: f64,
    pub meta_tile_height: f64,
}

fn tile_cache_fields(
    layer: &Layer,
    http: &HttpSource,
    grid: &TileGrid,
    layer_name: Option<&str>,
    extension: Option<&str>,
) -> EncodedTileCache {
    EncodedTileCache {
        http: HttpFields::from_layer(layer, http),
        grid: grid.into(),
        layer: layer_name.map(str::to_string),
        extension: extension.map(str::to_string),
    }
}

impl LayerEncoder for TileCacheSource {
    fn encode(&self, layer: &Layer, _ctx: &EncodeContext) -> Option<EncodedLayer> {
        Some(EncodedLayer::TileCache(tile_cache_fields(
            layer,
            &self.http,
            &self.grid,
            Some(&self.layer_name),
            Some(&self.extension),
        )))
    }
}

impl LayerEncoder for OsmSource {
    fn encode(&self, layer: &Layer, _ctx: &EncodeContext) -> Option<EncodedLayer> {
        let mut http = HttpFields::from_layer(layer, &self.http);
        // Templated URL: keep everything before the first `${z}` style placeholder.
        if let Some(idx) = http.base_url.find('$') {
            http.base_url.truncate(idx);
        }
        Some(EncodedLayer::Osm(EncodedOsm {
            http,
            grid: (&self.grid).into(),
            extension: "png".to_string(),
        }))
    }
}

impl LayerEncoder for TmsSource {
    fn encode(&self, layer: &Layer, _ctx: &EncodeContext) -> Option<EncodedLayer> {
        Some(EncodedLayer::Tms(EncodedTms {
            tile_cache: tile_cache_fields(layer, &self.http, &self.grid, Some(&self.layer_name), None),
            format: self.image_type.clone(),
        }))
    }
}

impl LayerEncoder for WmtsSource {
    fn encode(&self, layer: &Layer, _ctx: &EncodeContext) -> Option<EncodedLayer> {
        Some(EncodedLayer::Wmts(EncodedWmts {
            http: HttpFields::from_layer(layer, &self.http),
            layer: self.layer.clone(),
            version: self.version.clone(),
            request_encoding: self.request_encoding.clone(),
            tile_origin: self.tile_origin.into(),
            tile_size: self.grid.tile_size.into(),
            style: self.style.clone(),
            format_suffix: self.format_suffix.clone(),
            dimensions: self.dimensions.clone(),
            params: self.params.clone(),
            max_extent: self.tile_full_extent.unwrap_or(self.grid.max_extent).to_array(),
            matrix_set: self.matrix_set.clone(),
            zoom_offset: self.zoom_offset,
            resolutions: self.grid.effective_resolutions(),
        }))
    }
}

impl LayerEncoder for KaMapSource {
    fn encode(&self, layer: &Layer, _ctx: &EncodeContext) -> Option<EncodedLayer> {
        Some(EncodedLayer::KaMap(EncodedKaMap {
            http: HttpFields::from_layer(layer, &self.http),
            grid: (&self.grid).into(),
            map: self.map.clone(),
            extension: self.extension.clone(),
            group: self.group.clone().unwrap_or_default(),
        }))
    }
}

impl LayerEncoder for KaMapCacheSource {
    fn encode(&self, layer: &Layer, _ctx: &EncodeContext) -> Option<EncodedLayer> {
        Some(EncodedLayer::KaMapCache(EncodedKaMapCache {
            ka_map: EncodedKaMap {
                http: HttpFields::from_layer(layer, &self.http),
                grid: (&self.grid).into(),
                map: self.map.clone(),
                extension: self.extension.clone(),
                group: self.group.clone(),
            },
            meta_tile_width: self.meta_tile_size.width,
            meta_tile_height: self.meta_tile_size.height,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Bounds, LonLat, Size};
    use crate::layer::{LayerSource, StaticLayerRegistry};
    use serde_json::json;

    fn grid() -> TileGrid {
        TileGrid {
            max_extent: Bounds::new(-180.0, -90.0, 180.0, 90.0),
            tile_size: Size::new(256.0, 256.0),
            resolutions: vec![1.0, 0.5],
            server_resolutions: None,
        }
    }

    fn encode_json(source: LayerSource) -> serde_json::Value {
        let registry = StaticLayerRegistry::new();
        let ctx = EncodeContext { extent: None, base_url: None, registry: &registry };
        let layer = Layer::new("t", "tiles", source);
        serde_json::to_value(layer.source.encode(&layer, &ctx).unwrap()).unwrap()
    }

    #[test]
    fn test_osm_truncates_templated_url() {
        let json = encode_json(LayerSource::Osm(OsmSource {
            http: HttpSource::new("http://tile.osm.org/${z}/${x}/${y}.png"),
            grid: grid(),
        }));
        assert_eq!(json["type"], "OSM");
        assert_eq!(json["baseURL"], "http://tile.osm.org/");
        assert_eq!(json["extension"], "png");
        assert_eq!(json["tileSize"], json!([256.0, 256.0]));
    }

    #[test]
    fn test_tms_carries_format_and_layer() {
        let json = encode_json(LayerSource::Tms(TmsSource {
            http: HttpSource::new("http://tms/"),
            grid: grid(),
            layer_name: "basic".into(),
            image_type: "png".into(),
        }));
        assert_eq!(json["type"], "TMS");
        assert_eq!(json["layer"], "basic");
        assert_eq!(json["format"], "png");
        assert!(json.get("extension").is_none());
        assert_eq!(json["maxExtent"], json!([-180.0, -90.0, 180.0, 90.0]));
    }

    #[test]
    fn test_tile_cache_prefers_server_resolutions() {
        let mut g = grid();
        g.server_resolutions = Some(vec![4.0, 2.0, 1.0]);
        let json = encode_json(LayerSource::TileCache(TileCacheSource {
            http: HttpSource::new("http://tc/"),
            grid: g,
            layer_name: "basic".into(),
            extension: "jpg".into(),
        }));
        assert_eq!(json["resolutions"], json!([4.0, 2.0, 1.0]));
        assert_eq!(json["extension"], "jpg");
    }

    #[test]
    fn test_wmts_prefers_tile_full_extent() {
        let json = encode_json(LayerSource::Wmts(WmtsSource {
            http: HttpSource::new("http://wmts/"),
            grid: grid(),
            layer: "ortho".into(),
            version: "1.0.0".into(),
            request_encoding: "REST".into(),
            tile_origin: LonLat::new(-180.0, 90.0),
            style: "default".into(),
            format_suffix: Some("jpeg".into()),
            dimensions: vec![],
            params: Params::new(),
            tile_full_extent: Some(Bounds::new(0.0, 0.0, 10.0, 10.0)),
            matrix_set: "EPSG:4326".into(),
            zoom_offset: 1,
        }));
        assert_eq!(json["type"], "WMTS");
        assert_eq!(json["maxExtent"], json!([0.0, 0.0, 10.0, 10.0]));
        assert_eq!(json["tileOrigin"], json!([-180.0, 90.0]));
        assert_eq!(json["requestEncoding"], "REST");
        assert_eq!(json["zoomOffset"], 1);
    }

    #[test]
    fn test_kamap_group_defaults_and_cache_meta_tiles() {
        let json = encode_json(LayerSource::KaMap(KaMapSource {
            http: HttpSource::new("http://kamap/tile.php"),
            grid: grid(),
            map: "world".into(),
            extension: "png".into(),
            group: None,
        }));
        assert_eq!(json["group"], "");

        let json = encode_json(LayerSource::KaMapCache(KaMapCacheSource {
            http: HttpSource::new("http://kamap/cache"),
            grid: grid(),
            map: "world".into(),
            extension: "png".into(),
            group: "roads".into(),
            meta_tile_size: Size::new(5.0, 5.0),
        }));
        assert_eq!(json["type"], "KaMapCache");
        assert_eq!(json["group"], "roads");
        assert_eq!(json["metaTileWidth"], 5.0);
    }
}
