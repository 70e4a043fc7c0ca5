//! Map-side collaborator model.
//!
//! The rendering engine is not part of this crate; a print only needs a
//! snapshot of the map (its layers, extent and view state), which is what
//! [`MapState`] captures. Snapshots deserialize from JSON so the CLI can
//! print a map exported by a viewer.

use crate::geometry::{Bounds, LonLat, Size, Units};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// Request parameters of a layer (WMS `LAYERS`, `FORMAT`, ...), key order preserved by name.
pub type Params = BTreeMap<String, String>;

/// A symbolizer. `serde_json::Map` keeps keys sorted, which makes its
/// serialization canonical.
pub type Style = Map<String, Value>;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapState {
    pub layers: Vec<Layer>,
    /// Id of the base layer.
    #[serde(default)]
    pub base_layer: Option<String>,
    #[serde(default)]
    pub extent: Option<Bounds>,
    #[serde(default)]
    pub center: Option<LonLat>,
    #[serde(default)]
    pub scale: Option<f64>,
    #[serde(default)]
    pub units: Units,
    pub projection: String,
    #[serde(default)]
    pub size: Option<Size>,
}

impl MapState {
    pub fn base_layer(&self) -> Option<&Layer> {
        let id = self.base_layer.as_deref()?;
        self.layers.iter().find(|l| l.id == id)
    }

    /// Layers in print order: the base layer first, then the remaining
    /// layers in stack order.
    pub fn print_order(&self) -> Vec<&Layer> {
        let base = self.base_layer();
        let mut ordered: Vec<&Layer> = Vec::with_capacity(self.layers.len());
        if let Some(base) = base {
            ordered.push(base);
        }
        ordered.extend(
            self.layers
                .iter()
                .filter(|l| base.map_or(true, |b| b.id != l.id)),
        );
        ordered
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Whether the current map resolution is inside the layer's valid range.
    #[serde(default = "default_true")]
    pub in_range: bool,
    #[serde(default)]
    pub opacity: Option<f64>,
    #[serde(default = "default_true")]
    pub display_in_layer_switcher: bool,
    /// Internal layers owned by map controls (sketches, highlights).
    #[serde(default)]
    pub control: bool,
    pub source: LayerSource,
}

impl Layer {
    pub fn new(id: impl Into<String>, name: impl Into<String>, source: LayerSource) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            visible: true,
            in_range: true,
            opacity: None,
            display_in_layer_switcher: true,
            control: false,
            source,
        }
    }

    pub fn is_printable(&self) -> bool {
        self.visible && self.in_range
    }

    pub fn effective_opacity(&self) -> f64 {
        self.opacity.unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum LayerSource {
    #[serde(rename = "WMS")]
    Wms(WmsSource),
    TileCache(TileCacheSource),
    #[serde(rename = "OSM")]
    Osm(OsmSource),
    #[serde(rename = "TMS")]
    Tms(TmsSource),
    #[serde(rename = "WMTS")]
    Wmts(WmtsSource),
    KaMap(KaMapSource),
    KaMapCache(KaMapCacheSource),
    Image(ImageSource),
    Vector(VectorSource),
    Markers(MarkersSource),
    /// Anything the print service cannot render (commercial tiles, overlays).
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpSource {
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub single_tile: bool,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { urls: vec![url.into()], single_tile: false }
    }

    pub fn base_url(&self) -> String {
        self.urls.first().cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileGrid {
    pub max_extent: Bounds,
    pub tile_size: Size,
    #[serde(default)]
    pub resolutions: Vec<f64>,
    #[serde(default)]
    pub server_resolutions: Option<Vec<f64>>,
}

impl TileGrid {
    pub fn effective_resolutions(&self) -> Vec<f64> {
        self.server_resolutions
            .clone()
            .unwrap_or_else(|| self.resolutions.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WmsSource {
    #[serde(flatten)]
    pub http: HttpSource,
    pub params: Params,
    /// Legend graphic advertised by the WMC document this layer came from.
    #[serde(default)]
    pub wmc_legend_url: Option<String>,
}

impl WmsSource {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileCacheSource {
    #[serde(flatten)]
    pub http: HttpSource,
    #[serde(flatten)]
    pub grid: TileGrid,
    pub layer_name: String,
    pub extension: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsmSource {
    #[serde(flatten)]
    pub http: HttpSource,
    #[serde(flatten)]
    pub grid: TileGrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmsSource {
    #[serde(flatten)]
    pub http: HttpSource,
    #[serde(flatten)]
    pub grid: TileGrid,
    pub layer_name: String,
    /// Image type of the tiles (`png`, `jpg`).
    pub image_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WmtsSource {
    #[serde(flatten)]
    pub http: HttpSource,
    #[serde(flatten)]
    pub grid: TileGrid,
    pub layer: String,
    #[serde(default = "default_wmts_version")]
    pub version: String,
    #[serde(default = "default_request_encoding")]
    pub request_encoding: String,
    pub tile_origin: LonLat,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub format_suffix: Option<String>,
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub tile_full_extent: Option<Bounds>,
    pub matrix_set: String,
    #[serde(default)]
    pub zoom_offset: i32,
}

fn default_wmts_version() -> String {
    "1.0.0".to_string()
}

fn default_request_encoding() -> String {
    "KVP".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KaMapSource {
    #[serde(flatten)]
    pub http: HttpSource,
    #[serde(flatten)]
    pub grid: TileGrid,
    pub map: String,
    pub extension: String,
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KaMapCacheSource {
    #[serde(flatten)]
    pub http: HttpSource,
    #[serde(flatten)]
    pub grid: TileGrid,
    pub map: String,
    pub extension: String,
    pub group: String,
    pub meta_tile_size: Size,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSource {
    pub url: String,
    pub extent: Bounds,
    pub size: Size,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VectorSource {
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub style: Option<Style>,
    /// Styles by render intent (`default`, `select`, ...).
    #[serde(default)]
    pub style_map: BTreeMap<String, Style>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub style: Option<Style>,
    #[serde(default)]
    pub render_intent: Option<String>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self { geometry: Some(geometry), attributes: Map::new(), style: None, render_intent: None }
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }
}

/// GeoJSON geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(LonLat),
    LineString(Vec<LonLat>),
    Polygon(Vec<Vec<LonLat>>),
    MultiPoint(Vec<LonLat>),
    MultiLineString(Vec<Vec<LonLat>>),
    MultiPolygon(Vec<Vec<Vec<LonLat>>>),
}

impl Geometry {
    pub fn bounds(&self) -> Option<Bounds> {
        match self {
            Geometry::Point(p) => Bounds::from_points([p]),
            Geometry::LineString(ps) | Geometry::MultiPoint(ps) => Bounds::from_points(ps),
            Geometry::Polygon(rings) | Geometry::MultiLineString(rings) => {
                Bounds::from_points(rings.iter().flatten())
            }
            Geometry::MultiPolygon(polys) => Bounds::from_points(polys.iter().flatten().flatten()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkersSource {
    #[serde(default)]
    pub markers: Vec<Marker>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Marker {
    pub lonlat: LonLat,
    pub icon: Icon,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Icon {
    pub url: String,
    pub size: Size,
    #[serde(default)]
    pub offset: Offset,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

/// A pre-tiled service that can stand in for a dynamic WMS layer at print time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedLayer {
    pub name: String,
    pub url: String,
}

/// Maps a dynamic layer to its cached counterpart.
pub trait LayerRegistry: Send + Sync {
    fn cached_counterpart(&self, layer_name: &str) -> Option<CachedLayer>;
}

/// Registry backed by a fixed table, typically read from configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticLayerRegistry {
    layers: HashMap<String, CachedLayer>,
}

impl StaticLayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, layer_name: impl Into<String>, cached: CachedLayer) {
        self.layers.insert(layer_name.into(), cached);
    }
}

impl LayerRegistry for StaticLayerRegistry {
    fn cached_counterpart(&self, layer_name: &str) -> Option<CachedLayer> {
        self.layers.get(layer_name).cloned()
    }
}
