// src/geometry.rs - Planar geometry primitives used by pages and encoders
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl From<[f64; 2]> for LonLat {
    fn from(v: [f64; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

impl From<LonLat> for [f64; 2] {
    fn from(p: LonLat) -> Self {
        [p.lon, p.lat]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl From<Size> for [f64; 2] {
    fn from(s: Size) -> Self {
        [s.width, s.height]
    }
}

/// Axis-aligned extent, serialized as `[left, bottom, right, top]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Bounds {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl Bounds {
    pub fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self { left, bottom, right, top }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    pub fn center(&self) -> LonLat {
        LonLat::new((self.left + self.right) / 2.0, (self.bottom + self.top) / 2.0)
    }

    /// Edge-inclusive containment of `other`.
    pub fn contains_bounds(&self, other: &Bounds) -> bool {
        other.left >= self.left
            && other.right <= self.right
            && other.bottom >= self.bottom
            && other.top <= self.top
    }

    /// Edge-inclusive intersection test.
    pub fn intersects(&self, other: &Bounds) -> bool {
        !(other.left > self.right
            || other.right < self.left
            || other.bottom > self.top
            || other.top < self.bottom)
    }

    pub fn extend(&mut self, p: LonLat) {
        self.left = self.left.min(p.lon);
        self.bottom = self.bottom.min(p.lat);
        self.right = self.right.max(p.lon);
        self.top = self.top.max(p.lat);
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a LonLat>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Bounds::new(first.lon, first.lat, first.lon, first.lat);
        for p in iter {
            bounds.extend(*p);
        }
        Some(bounds)
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.left, self.bottom, self.right, self.top]
    }

    pub fn to_polygon(&self) -> Polygon {
        Polygon::new(vec![
            LonLat::new(self.left, self.bottom),
            LonLat::new(self.right, self.bottom),
            LonLat::new(self.right, self.top),
            LonLat::new(self.left, self.top),
        ])
    }
}

impl From<[f64; 4]> for Bounds {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Bounds> for [f64; 4] {
    fn from(b: Bounds) -> Self {
        b.to_array()
    }
}

/// A single open ring. Page geometries are (possibly rotated) rectangles.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<LonLat>,
}

impl Polygon {
    pub fn new(vertices: Vec<LonLat>) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[LonLat] {
        &self.vertices
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.vertices)
    }

    /// Vertex average; equal to the area centroid for parallelograms.
    pub fn centroid(&self) -> Option<LonLat> {
        if self.vertices.is_empty() {
            return None;
        }
        let n = self.vertices.len() as f64;
        let (sx, sy) = self
            .vertices
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.lon, sy + p.lat));
        Some(LonLat::new(sx / n, sy / n))
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        for p in &mut self.vertices {
            p.lon += dx;
            p.lat += dy;
        }
    }

    /// Rotates counter-clockwise by `degrees` around `origin`.
    pub fn rotate(&mut self, degrees: f64, origin: LonLat) {
        let (sin, cos) = degrees.to_radians().sin_cos();
        for p in &mut self.vertices {
            let x = p.lon - origin.lon;
            let y = p.lat - origin.lat;
            p.lon = origin.lon + x * cos - y * sin;
            p.lat = origin.lat + x * sin + y * cos;
        }
    }
}

/// Map units, serialized with the short codes print services expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Units {
    #[default]
    #[serde(rename = "dd", alias = "degrees")]
    Degrees,
    #[serde(rename = "m")]
    Meters,
    #[serde(rename = "km")]
    Kilometers,
    #[serde(rename = "ft")]
    Feet,
    #[serde(rename = "mi")]
    Miles,
    #[serde(rename = "yd")]
    Yards,
    #[serde(rename = "inches", alias = "in")]
    Inches,
    #[serde(rename = "nmi")]
    NauticalMiles,
}

impl Units {
    pub fn inches_per_unit(self) -> f64 {
        match self {
            Units::Inches => 1.0,
            Units::Feet => 12.0,
            Units::Yards => 36.0,
            Units::Miles => 63360.0,
            Units::Meters => 39.37,
            Units::Kilometers => 39370.0,
            Units::NauticalMiles => 1852.0 * 39.37,
            Units::Degrees => 4374754.0,
        }
    }
}
