use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length below which two points are treated as coincident, metres.
pub const DEGENERATE_EPSILON: f32 = 1e-4;

/// Recoverable drawing failures, surfaced to callers as `DrawErrorEvent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum DrawError {
    /// The shape cannot be closed with the committed vertices. Covers both
    /// too-few clicks and a degenerate (zero-length) rectangle base edge.
    #[error("need more points")]
    NeedMorePoints,
}

/// A plane in Hessian normal form: `normal . x + distance = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipPlane {
    pub normal: Vec3,
    pub distance: f32,
}

impl ClipPlane {
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        Self {
            normal,
            distance: -normal.dot(point),
        }
    }

    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }

    /// Flips which half-space is kept.
    pub fn negated(&self) -> Self {
        Self {
            normal: -self.normal,
            distance: -self.distance,
        }
    }

    /// Re-expresses the plane under the coordinate change that maps points
    /// through `matrix`. Plane coefficients transform by the
    /// inverse-transpose; the result is renormalized so `distance` stays a
    /// metric offset.
    pub fn transformed_by(&self, matrix: &Mat4) -> Self {
        let coeffs = Vec4::new(self.normal.x, self.normal.y, self.normal.z, self.distance);
        let transformed = matrix.inverse().transpose() * coeffs;
        let normal = transformed.truncate();
        let scale = normal.length();
        if scale <= f32::EPSILON {
            return *self;
        }
        Self {
            normal: normal / scale,
            distance: transformed.w / scale,
        }
    }
}

/// Vertical plane containing the two surface points and the world up
/// direction. `negate` flips which side is kept. Returns `None` for a
/// degenerate segment (coincident or vertically stacked points) instead of
/// producing a NaN normal.
pub fn plane_from_two_points(p1: Vec3, p2: Vec3, negate: bool) -> Option<ClipPlane> {
    let span = p2 - p1;
    let normal = span.cross(Vec3::Y);
    if normal.length_squared() < DEGENERATE_EPSILON * DEGENERATE_EPSILON {
        return None;
    }
    let mut normal = normal.normalize();
    if negate {
        normal = -normal;
    }
    Some(ClipPlane::from_point_normal(p1, normal))
}

/// 3-point rectangle completion.
///
/// `A` and `B` are the fixed base edge, `C` the point under the pointer.
/// The far edge is found by projecting `C-A` onto `B-A`:
///
/// ```text
/// A -- AP
/// |\
/// | \
/// M  C
/// |
/// B -- BP
/// ```
///
/// Returns the corners `[A, B, BP, AP]`. Fewer or more than 3 input points
/// pass through untouched (already-complete rectangles re-enter here during
/// editing). A zero-length base edge is reported as `NeedMorePoints` rather
/// than letting the projection emit NaNs.
pub fn rectanglify(coordinates: &[Vec3]) -> Result<Vec<Vec3>, DrawError> {
    if coordinates.len() != 3 {
        return Ok(coordinates.to_vec());
    }
    let a = coordinates[0];
    let b = coordinates[1];
    let c = coordinates[2];

    let ab = b - a;
    if ab.length_squared() < DEGENERATE_EPSILON * DEGENERATE_EPSILON {
        return Err(DrawError::NeedMorePoints);
    }
    let ac = c - a;
    let am = ac.project_onto(ab);
    let ap = a + (ac - am);
    let bp = ap + ab;
    Ok(vec![a, b, bp, ap])
}

/// Projection of `point` onto the infinite line through `a` and `b`.
pub fn project_point_onto_vector(a: Vec3, b: Vec3, point: Vec3) -> Vec3 {
    let axis = b - a;
    if axis.length_squared() <= f32::EPSILON {
        return a;
    }
    a + (point - a).project_onto(axis)
}

/// Ray-casting point-in-polygon test on the ground (X/Z) projection.
pub fn point_in_polygon(point: Vec2, ring: &[Vec2]) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = (ring[i].x, ring[i].y);
        let (xj, yj) = (ring[j].x, ring[j].y);
        let crosses = (yi > point.y) != (yj > point.y)
            && point.x < (xj - xi) * (point.y - yi) / (yj - yi) + xi;
        if crosses {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// The geometry kinds the drawing tool can author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    Point,
    #[default]
    Line,
    Polygon,
    Rectangle,
}

/// Measurements attached to a finished shape. Lengths in km, areas in km².
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeometryMeasurements {
    pub area_km2: Option<f32>,
    pub perimeter_km: Option<f32>,
    pub segment_lengths_km: Vec<f32>,
    pub segment_count: usize,
    /// Rectangle base and side length.
    pub side_lengths_km: Option<[f32; 2]>,
}

/// Consecutive pairwise distances in km. `closed` appends the wrap-around
/// segment from the last vertex back to the first.
pub fn segment_lengths_km(positions: &[Vec3], closed: bool) -> Vec<f32> {
    let mut lengths: Vec<f32> = positions
        .windows(2)
        .map(|pair| pair[0].distance(pair[1]) / 1000.0)
        .collect();
    if closed && positions.len() > 2 {
        lengths.push(positions[positions.len() - 1].distance(positions[0]) / 1000.0);
    }
    lengths
}

/// Area of a simple polygon in km²: earcut triangulation on the ground
/// projection, Heron's formula per triangle on the 3D vertices.
pub fn polygon_area_km2(positions: &[Vec3]) -> Option<f32> {
    if positions.len() < 3 {
        return None;
    }
    let mut coords = Vec::with_capacity(positions.len() * 2);
    for p in positions {
        coords.push(p.x as f64);
        coords.push(p.z as f64);
    }
    let indices = earcutr::earcut(&coords, &[], 2).ok()?;

    let mut area_m2 = 0.0f32;
    for tri in indices.chunks_exact(3) {
        let (v1, v2, v3) = (positions[tri[0]], positions[tri[1]], positions[tri[2]]);
        let a = v3.distance(v2);
        let b = v1.distance(v3);
        let c = v1.distance(v2);
        let p = (a + b + c) / 2.0;
        let squared = p * (p - a) * (p - b) * (p - c);
        if squared > 0.0 {
            area_m2 += squared.sqrt();
        }
    }
    Some(area_m2 * 1e-6)
}

/// Full measurement set for a finished shape. Lines report their total
/// length as the perimeter; closed shapes include the wrap-around segment;
/// rectangles additionally report their two side lengths and a perimeter of
/// `2 * (base + side)`.
pub fn measurements_for(shape_type: ShapeType, positions: &[Vec3]) -> GeometryMeasurements {
    let closed = matches!(shape_type, ShapeType::Polygon | ShapeType::Rectangle);
    let segment_lengths = segment_lengths_km(positions, closed);
    let mut measurements = GeometryMeasurements {
        segment_count: segment_lengths.len(),
        segment_lengths_km: segment_lengths,
        ..Default::default()
    };

    match shape_type {
        ShapeType::Line if !measurements.segment_lengths_km.is_empty() => {
            measurements.perimeter_km = Some(measurements.segment_lengths_km.iter().sum());
        }
        ShapeType::Polygon => {
            measurements.perimeter_km = Some(measurements.segment_lengths_km.iter().sum());
            measurements.area_km2 = polygon_area_km2(positions);
        }
        ShapeType::Rectangle if positions.len() == 4 => {
            let base = positions[0].distance(positions[1]) / 1000.0;
            let side = positions[1].distance(positions[2]) / 1000.0;
            measurements.side_lengths_km = Some([base, side]);
            measurements.perimeter_km = Some(2.0 * (base + side));
            measurements.area_km2 = polygon_area_km2(positions);
        }
        _ => {}
    }
    measurements
}
