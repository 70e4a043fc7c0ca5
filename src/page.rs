//! Printable page geometry.
//!
//! A [`PrintPage`] is either anchored by a center and a scale, in which case
//! its footprint on the map follows from the layout's physical size, or by
//! an explicit bbox that the print service fits onto the page.

use crate::capabilities::{Layout, Scale};
use crate::geometry::{Bounds, LonLat, Polygon, Units};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Points per inch.
const POINTS_PER_INCH: f64 = 72.0;

/// How [`PrintPage::fit`] picks a scale for a target extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Page bounds closest in size to the extent.
    Closest,
    /// Smallest scale whose page shows the whole extent.
    #[default]
    Printer,
    /// Largest scale whose page lies entirely inside the extent.
    Screen,
}

impl FromStr for FitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "closest" => Ok(FitMode::Closest),
            "printer" => Ok(FitMode::Printer),
            "screen" => Ok(FitMode::Screen),
            other => Err(format!("unknown fit mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrintPage {
    center: Option<LonLat>,
    scale: Option<Scale>,
    bbox: Option<Bounds>,
    rotation: f64,
    custom_params: Map<String, Value>,
    geometry: Polygon,
}

impl Default for PrintPage {
    fn default() -> Self {
        Self::new()
    }
}

impl PrintPage {
    pub fn new() -> Self {
        Self {
            center: None,
            scale: None,
            bbox: None,
            rotation: 0.0,
            custom_params: Map::new(),
            geometry: Bounds::new(-1.0, -1.0, 1.0, 1.0).to_polygon(),
        }
    }

    /// A page that prints exactly `bbox`.
    pub fn with_bbox(bbox: Bounds) -> Self {
        let mut page = Self::new();
        page.bbox = Some(bbox);
        page
    }

    /// A page centered on `center` at `scale`. The geometry is moved to the
    /// center; call [`set_scale`](Self::set_scale) to size it.
    pub fn with_center_scale(center: LonLat, scale: Scale) -> Self {
        let mut page = Self::new();
        page.set_center(center);
        page.scale = Some(scale);
        page
    }

    pub fn with_custom_params(mut self, params: Map<String, Value>) -> Self {
        self.custom_params = params;
        self
    }

    pub fn center(&self) -> Option<LonLat> {
        self.center
    }

    pub fn scale(&self) -> Option<&Scale> {
        self.scale.as_ref()
    }

    pub fn bbox(&self) -> Option<Bounds> {
        self.bbox
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn custom_params(&self) -> &Map<String, Value> {
        &self.custom_params
    }

    pub fn custom_params_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.custom_params
    }

    pub fn geometry(&self) -> &Polygon {
        &self.geometry
    }

    fn geometry_center(&self) -> LonLat {
        self.geometry
            .bounds()
            .map(|b| b.center())
            .unwrap_or(LonLat::new(0.0, 0.0))
    }

    /// Page footprint at `scale` around the current center, unrotated.
    pub fn calculate_page_bounds(&self, scale: &Scale, units: Units, layout: &Layout) -> Bounds {
        let center = self.geometry_center();
        let ratio = units.inches_per_unit();
        let w = layout.page_size.width / POINTS_PER_INCH / ratio * scale.value / 2.0;
        let h = layout.page_size.height / POINTS_PER_INCH / ratio * scale.value / 2.0;
        Bounds::new(center.lon - w, center.lat - h, center.lon + w, center.lat + h)
    }

    /// The map extent printed at the current scale.
    pub fn print_extent(&self, units: Units, layout: &Layout) -> Option<Bounds> {
        if let Some(bbox) = self.bbox {
            return Some(bbox);
        }
        self.scale
            .as_ref()
            .map(|s| self.calculate_page_bounds(s, units, layout))
    }

    pub fn set_scale(&mut self, scale: Scale, units: Units, layout: &Layout) {
        let mut geometry = self.calculate_page_bounds(&scale, units, layout).to_polygon();
        if self.rotation != 0.0 && layout.supports_rotation {
            if let Some(centroid) = geometry.centroid() {
                geometry.rotate(-self.rotation, centroid);
            }
        }
        self.geometry = geometry;
        self.scale = Some(scale);
    }

    pub fn set_center(&mut self, center: LonLat) {
        let old = self.geometry_center();
        self.geometry.translate(center.lon - old.lon, center.lat - old.lat);
        self.center = Some(center);
    }

    /// Ignored unless the layout supports rotation or `force` is set.
    pub fn set_rotation(&mut self, rotation: f64, layout: &Layout, force: bool) {
        if !(force || layout.supports_rotation) {
            return;
        }
        if let Some(centroid) = self.geometry.centroid() {
            self.geometry.rotate(self.rotation - rotation, centroid);
        }
        self.rotation = rotation;
    }

    /// Centers the page on `extent` and picks a scale from `scales` per `mode`.
    ///
    /// Does nothing when there is no extent (the map has not been centered
    /// yet) or no scale to choose from. Candidates are scanned in ascending
    /// denominator order; `Screen` relies on that ordering to stop at the
    /// first page that no longer fits.
    pub fn fit(
        &mut self,
        extent: Option<Bounds>,
        scales: &[Scale],
        units: Units,
        layout: &Layout,
        mode: FitMode,
    ) {
        let Some(extent) = extent else {
            return;
        };
        if scales.is_empty() {
            return;
        }
        self.set_center(extent.center());

        let mut candidates: Vec<&Scale> = scales.iter().collect();
        candidates.sort_by(|a, b| a.value.total_cmp(&b.value));

        let chosen = match mode {
            FitMode::Closest => {
                let mut best = candidates[0];
                let mut closest = f64::INFINITY;
                for candidate in &candidates {
                    let bounds = self.calculate_page_bounds(candidate, units, layout);
                    let diff = (bounds.width() - extent.width()).abs()
                        + (bounds.height() - extent.height()).abs();
                    if diff < closest {
                        closest = diff;
                        best = candidate;
                    }
                }
                best
            }
            FitMode::Printer => candidates
                .iter()
                .find(|c| self.calculate_page_bounds(c, units, layout).contains_bounds(&extent))
                .copied()
                .unwrap_or(candidates[candidates.len() - 1]),
            FitMode::Screen => {
                let mut best = candidates[0];
                for candidate in &candidates {
                    if extent.contains_bounds(&self.calculate_page_bounds(candidate, units, layout)) {
                        best = candidate;
                    } else {
                        break;
                    }
                }
                best
            }
        };
        tracing::debug!("Fit ({:?}) picked scale {}", mode, chosen.value);
        self.set_scale(chosen.clone(), units, layout);
    }
}
