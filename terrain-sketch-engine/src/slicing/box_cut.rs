//! Box cuts: four vertical side planes plus two horizontal limit planes.
//!
//! The box interior is the removed region, revealing whatever the terrain
//! and objects hide inside it.

use crate::engine::geometry::{ClipPlane, plane_from_two_points};
use crate::slicing::SlicingError;
use bevy::prelude::*;
use constants::slicing::SLICING_BOX_MIN_SIZE;

/// A slicing box normalised from four drawn corner points.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceBox {
    /// Corners in ring order at the lower limit height.
    pub corners: [Vec3; 4],
    pub center: Vec3,
    pub width: f32,
    pub length: f32,
    pub lower_limit: f32,
    pub height: f32,
}

/// Normalises four corner points into a slicing box. Corners may arrive in
/// any order; they are re-ordered into a ring around their centroid.
pub fn bbox_from_corners(
    corners: &[Vec3],
    lower_limit: f32,
    height: f32,
) -> Result<SliceBox, SlicingError> {
    if corners.len() != 4 {
        return Err(SlicingError::InvalidBox {
            reason: "exactly four corners required".into(),
        });
    }
    if height <= 0.0 {
        return Err(SlicingError::InvalidBox {
            reason: "height must be positive".into(),
        });
    }

    let centroid_2d = corners
        .iter()
        .fold(Vec2::ZERO, |acc, c| acc + Vec2::new(c.x, c.z))
        / 4.0;

    let mut ring: Vec<Vec3> = corners
        .iter()
        .map(|c| Vec3::new(c.x, lower_limit, c.z))
        .collect();
    ring.sort_by(|a, b| {
        let angle_a = (a.z - centroid_2d.y).atan2(a.x - centroid_2d.x);
        let angle_b = (b.z - centroid_2d.y).atan2(b.x - centroid_2d.x);
        angle_a.total_cmp(&angle_b)
    });
    let mut ring: [Vec3; 4] = [ring[0], ring[1], ring[2], ring[3]];

    let width = ring[0].distance(ring[1]);
    let length = ring[1].distance(ring[2]);
    if width <= 0.0 || length <= 0.0 {
        return Err(SlicingError::InvalidBox {
            reason: "degenerate footprint".into(),
        });
    }
    if !width.is_finite() || !length.is_finite() {
        return Err(SlicingError::InvalidBox {
            reason: "non-finite footprint".into(),
        });
    }

    // Too-small footprints grow symmetrically to the minimum usable size
    let width = grow_edge_pair(&mut ring, 0, width);
    let length = grow_edge_pair(&mut ring, 1, length);

    Ok(SliceBox {
        corners: ring,
        center: Vec3::new(centroid_2d.x, lower_limit + height * 0.5, centroid_2d.y),
        width,
        length,
        lower_limit,
        height,
    })
}

/// Widens one footprint axis to `SLICING_BOX_MIN_SIZE`, pushing both edge
/// pairs symmetrically away from the center. `axis` 0 grows the 0-1/3-2
/// edge, 1 the 1-2/0-3 edge.
fn grow_edge_pair(ring: &mut [Vec3; 4], axis: usize, current: f32) -> f32 {
    if current >= SLICING_BOX_MIN_SIZE {
        return current;
    }
    let dir = match axis {
        0 => (ring[1] - ring[0]).normalize(),
        _ => (ring[2] - ring[1]).normalize(),
    };
    let pad = dir * ((SLICING_BOX_MIN_SIZE - current) * 0.5);
    match axis {
        0 => {
            ring[0] -= pad;
            ring[3] -= pad;
            ring[1] += pad;
            ring[2] += pad;
        }
        _ => {
            ring[0] -= pad;
            ring[1] -= pad;
            ring[2] += pad;
            ring[3] += pad;
        }
    }
    SLICING_BOX_MIN_SIZE
}

/// World-space planes for the box: one vertical plane per footprint edge,
/// oriented away from the center, plus the upper and lower limit planes.
/// The interior ends up on the negative side of all six.
pub fn box_cut_planes(slice_box: &SliceBox) -> Result<Vec<ClipPlane>, SlicingError> {
    let mut planes = Vec::with_capacity(6);

    for i in 0..4 {
        let a = slice_box.corners[i];
        let b = slice_box.corners[(i + 1) % 4];
        let mut plane =
            plane_from_two_points(a, b, false).ok_or(SlicingError::DegenerateCut)?;
        if plane.signed_distance(slice_box.center) > 0.0 {
            plane = plane.negated();
        }
        planes.push(plane);
    }

    let top = slice_box.lower_limit + slice_box.height;
    planes.push(ClipPlane::new(Vec3::Y, -top));
    planes.push(ClipPlane::new(Vec3::NEG_Y, slice_box.lower_limit));

    Ok(planes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use constants::slicing::{SLICING_BOX_HEIGHT, SLICING_BOX_LOWER_LIMIT};

    fn square() -> Vec<Vec3> {
        // Deliberately shuffled corner order
        vec![
            Vec3::new(500.0, 0.0, 500.0),
            Vec3::new(-500.0, 0.0, -500.0),
            Vec3::new(500.0, 0.0, -500.0),
            Vec3::new(-500.0, 0.0, 500.0),
        ]
    }

    #[test]
    fn corners_are_ring_ordered() {
        let b = bbox_from_corners(&square(), -10.0, 20.0).unwrap();
        assert_eq!(b.width, 1000.0);
        assert_eq!(b.length, 1000.0);
        assert_eq!(b.center, Vec3::new(0.0, 0.0, 0.0));
        // Consecutive corners share an edge, not a diagonal
        for i in 0..4 {
            let edge = b.corners[i].distance(b.corners[(i + 1) % 4]);
            assert!((edge - 1000.0).abs() < 1e-3);
        }
    }

    #[test]
    fn undersized_footprint_grows_to_minimum() {
        let small = vec![
            Vec3::new(10.0, 0.0, 10.0),
            Vec3::new(-10.0, 0.0, -10.0),
            Vec3::new(10.0, 0.0, -10.0),
            Vec3::new(-10.0, 0.0, 10.0),
        ];
        let b = bbox_from_corners(&small, -10.0, 20.0).unwrap();
        assert_eq!(b.width, SLICING_BOX_MIN_SIZE);
        assert_eq!(b.length, SLICING_BOX_MIN_SIZE);
        // Growth is symmetric about the centroid
        assert_eq!(b.center, Vec3::new(0.0, 0.0, 0.0));
        for i in 0..4 {
            let edge = b.corners[i].distance(b.corners[(i + 1) % 4]);
            assert!((edge - SLICING_BOX_MIN_SIZE).abs() < 1e-2);
        }
    }

    #[test]
    fn box_produces_six_planes_interior_negative() {
        let b = bbox_from_corners(&square(), -10.0, 20.0).unwrap();
        let planes = box_cut_planes(&b).unwrap();
        assert_eq!(planes.len(), 6);

        // Interior points sit on the negative side of every plane
        for point in [Vec3::ZERO, Vec3::new(50.0, 5.0, -50.0)] {
            assert!(planes.iter().all(|p| p.signed_distance(point) < 0.0));
        }
        // Points outside the footprint or above the top escape at least one
        for point in [
            Vec3::new(1300.0, 0.0, 0.0),
            Vec3::new(0.0, 15.0, 0.0),
            Vec3::new(0.0, -30.0, 0.0),
        ] {
            assert!(planes.iter().any(|p| p.signed_distance(point) > 0.0));
        }
    }

    #[test]
    fn default_limits_cover_underground() {
        let b = bbox_from_corners(&square(), SLICING_BOX_LOWER_LIMIT, SLICING_BOX_HEIGHT).unwrap();
        assert_eq!(b.center.y, SLICING_BOX_LOWER_LIMIT + SLICING_BOX_HEIGHT * 0.5);
        assert_eq!(b.corners[0].y, SLICING_BOX_LOWER_LIMIT);
    }

    #[test]
    fn wrong_corner_count_is_invalid() {
        let err = bbox_from_corners(&square()[..3], -10.0, 20.0).unwrap_err();
        assert!(matches!(err, SlicingError::InvalidBox { .. }));
    }

    #[test]
    fn non_positive_height_is_invalid() {
        let err = bbox_from_corners(&square(), -10.0, 0.0).unwrap_err();
        assert!(matches!(err, SlicingError::InvalidBox { .. }));
    }
}
