//! Per-target clipping plane frames.
//!
//! A cut is authored once in world space but each renderable interprets its
//! clipping planes in its own frame. The kind recorded on the target decides
//! how world planes are re-expressed for it.

use crate::engine::geometry::ClipPlane;
use bevy::prelude::*;
use constants::slicing::DEFAULT_MIN_TERRAIN_HEIGHT;

/// How a renderable anchors its clipping plane frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SliceTargetKind {
    /// Terrain layers take planes in world space directly.
    Terrain,
    /// Content with a meaningful root transform; planes are carried in the
    /// root's local frame so they follow the object.
    TransformedObject { root_transform: Mat4 },
    /// Content with an identity root transform; anchored at its bounding
    /// sphere center instead.
    SphereAnchoredObject { center: Vec3, model_matrix: Mat4 },
    /// Voxel content keeps the opposite side of every cut.
    Volumetric,
}

/// Marks an entity as participating in scene slicing.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct SliceTarget {
    pub kind: SliceTargetKind,
}

impl SliceTarget {
    pub fn new(kind: SliceTargetKind) -> Self {
        Self { kind }
    }
}

/// The derived clipping plane set for one renderable, replaced wholesale on
/// every cut change.
///
/// Planes are expressed in the frame `model_matrix` maps into world space.
/// With `union_clipping_regions` false the removed region is where every
/// plane's signed distance is negative; true removes where any is negative.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct ObjectClippingPlanes {
    pub planes: Vec<ClipPlane>,
    pub model_matrix: Mat4,
    pub union_clipping_regions: bool,
}

/// Picks the anchoring frame for sphere-anchored content. Centers below the
/// minimum terrain height belong to underground content whose own matrix
/// orientation must be kept; everything else is anchored by translation at
/// the bounding sphere center.
pub fn sphere_anchor_frame(center: Vec3, model_matrix: &Mat4) -> Mat4 {
    if center.y > DEFAULT_MIN_TERRAIN_HEIGHT {
        Mat4::from_translation(center)
    } else {
        *model_matrix
    }
}

/// Derives the slicing kind for a freshly registered tileset from its root
/// transform and bounding sphere.
pub fn classify_tileset(root_transform: &Mat4, bounding_center: Vec3, model_matrix: &Mat4) -> SliceTargetKind {
    if !root_transform.abs_diff_eq(Mat4::IDENTITY, 1e-6) {
        SliceTargetKind::TransformedObject {
            root_transform: *root_transform,
        }
    } else {
        SliceTargetKind::SphereAnchoredObject {
            center: bounding_center,
            model_matrix: *model_matrix,
        }
    }
}

/// Re-expresses world-space planes for one target and pairs them with the
/// frame the renderer must apply them in.
pub fn frame_planes_for(kind: &SliceTargetKind, world_planes: &[ClipPlane]) -> ObjectClippingPlanes {
    match kind {
        SliceTargetKind::Terrain => ObjectClippingPlanes {
            planes: world_planes.to_vec(),
            model_matrix: Mat4::IDENTITY,
            union_clipping_regions: false,
        },
        SliceTargetKind::TransformedObject { root_transform } => {
            let to_local = root_transform.inverse();
            ObjectClippingPlanes {
                planes: world_planes
                    .iter()
                    .map(|p| p.transformed_by(&to_local))
                    .collect(),
                model_matrix: *root_transform,
                union_clipping_regions: false,
            }
        }
        SliceTargetKind::SphereAnchoredObject {
            center,
            model_matrix,
        } => {
            let frame = sphere_anchor_frame(*center, model_matrix);
            let to_frame = frame.inverse();
            ObjectClippingPlanes {
                planes: world_planes
                    .iter()
                    .map(|p| p.transformed_by(&to_frame))
                    .collect(),
                model_matrix: frame,
                union_clipping_regions: false,
            }
        }
        // Complement of an intersection is the union of the complements
        SliceTargetKind::Volumetric => ObjectClippingPlanes {
            planes: world_planes.iter().map(|p| p.negated()).collect(),
            model_matrix: Mat4::IDENTITY,
            union_clipping_regions: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_anchor_above_ground_uses_translation_frame() {
        let center = Vec3::new(100.0, 50.0, -20.0);
        let model = Mat4::from_rotation_y(0.7);
        let frame = sphere_anchor_frame(center, &model);
        assert_eq!(frame, Mat4::from_translation(center));
    }

    #[test]
    fn sphere_anchor_below_ground_keeps_model_matrix() {
        let center = Vec3::new(0.0, DEFAULT_MIN_TERRAIN_HEIGHT - 1.0, 0.0);
        let model = Mat4::from_rotation_y(0.7);
        let frame = sphere_anchor_frame(center, &model);
        assert_eq!(frame, model);
    }

    #[test]
    fn classify_prefers_root_transform() {
        let root = Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0));
        let kind = classify_tileset(&root, Vec3::ZERO, &Mat4::IDENTITY);
        assert_eq!(kind, SliceTargetKind::TransformedObject { root_transform: root });

        let kind = classify_tileset(&Mat4::IDENTITY, Vec3::new(1.0, 2.0, 3.0), &Mat4::IDENTITY);
        assert!(matches!(kind, SliceTargetKind::SphereAnchoredObject { .. }));
    }

    #[test]
    fn transformed_object_planes_follow_the_root() {
        // A plane through world x = 10, object rooted at x = 10
        let world_plane = ClipPlane::from_point_normal(Vec3::new(10.0, 0.0, 0.0), Vec3::X);
        let root = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0));
        let framed = frame_planes_for(
            &SliceTargetKind::TransformedObject { root_transform: root },
            &[world_plane],
        );
        // In the object's local frame the plane passes through its origin
        assert!(framed.planes[0].signed_distance(Vec3::ZERO).abs() < 1e-4);
        assert_eq!(framed.model_matrix, root);
        assert!(!framed.union_clipping_regions);
    }

    #[test]
    fn volumetric_planes_are_inverted() {
        let world_plane = ClipPlane::from_point_normal(Vec3::new(1.0, 0.0, 0.0), Vec3::X);
        let framed = frame_planes_for(&SliceTargetKind::Volumetric, &[world_plane]);
        assert_eq!(framed.planes[0], world_plane.negated());
        assert!(framed.union_clipping_regions);
    }
}
