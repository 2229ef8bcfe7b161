//! Single-plane cuts derived from a drawn line segment.

use crate::engine::geometry::{ClipPlane, plane_from_two_points};
use crate::slicing::SlicingError;
use bevy::prelude::*;

/// Builds the world-space cutting plane for a line cut. The plane is
/// vertical, contains both points, and `negate` flips which side of the
/// scene is removed.
pub fn line_cut_plane(points: [Vec3; 2], negate: bool) -> Result<ClipPlane, SlicingError> {
    plane_from_two_points(points[0], points[1], negate).ok_or(SlicingError::DegenerateCut)
}
