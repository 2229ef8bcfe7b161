//! Spatial clipping of the scene by drawn geometry.
//!
//! One cut is active at a time, authored in world space and re-derived per
//! renderable according to its anchoring kind. Changing or clearing the cut
//! replaces every target's plane set wholesale; targets registered or
//! re-anchored while a cut is active pick it up on the next frame.

pub mod box_cut;
pub mod line;
pub mod planes;

use crate::engine::geometry::{ClipPlane, ShapeType};
use crate::engine::scene::terrain::BackgroundRegistry;
use crate::tools::draw::DrawEnded;
use crate::tools::tool_manager::{ToolManager, ToolType};
use bevy::prelude::*;
use constants::slicing::{SLICING_BOX_HEIGHT, SLICING_BOX_LOWER_LIMIT};
use thiserror::Error;

use box_cut::{bbox_from_corners, box_cut_planes};
use line::line_cut_plane;
use planes::{ObjectClippingPlanes, SliceTarget, frame_planes_for};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SlicingError {
    /// The cut geometry spans no horizontal extent.
    #[error("degenerate cut geometry")]
    DegenerateCut,
    #[error("invalid slicing box: {reason}")]
    InvalidBox { reason: String },
    /// A named background layer that is not registered.
    #[error("unknown background layer: {id}")]
    UnknownBackground { id: String },
}

/// The active cut, in world space.
#[derive(Debug, Clone, PartialEq)]
pub enum ClippingRequest {
    Line {
        points: [Vec3; 2],
        negate: bool,
    },
    Box {
        corners: Vec<Vec3>,
        lower_limit: f32,
        height: f32,
    },
}

/// Holds the active cut. Mutations go through `activate`/`deactivate` so
/// change detection drives re-derivation.
#[derive(Resource, Default)]
pub struct Slicer {
    request: Option<ClippingRequest>,
}

impl Slicer {
    /// Stores the cut after validating it. Degenerate or non-finite cut
    /// geometry is a caller error and is rejected here, at configuration
    /// time, before any per-target derivation runs.
    pub fn activate(&mut self, request: ClippingRequest) -> Result<(), SlicingError> {
        world_planes_for(&request)?;
        info!("slicing activated: {request:?}");
        self.request = Some(request);
        Ok(())
    }

    pub fn deactivate(&mut self) {
        if self.request.take().is_some() {
            info!("slicing deactivated");
        }
    }

    pub fn request(&self) -> Option<&ClippingRequest> {
        self.request.as_ref()
    }
}

/// Resolves a background layer id to its entity.
pub fn resolve_background(
    registry: &BackgroundRegistry,
    id: &str,
) -> Result<Entity, SlicingError> {
    registry.get(id).ok_or_else(|| SlicingError::UnknownBackground {
        id: id.to_string(),
    })
}

/// World-space planes for a request, before per-target framing.
pub fn world_planes_for(request: &ClippingRequest) -> Result<Vec<ClipPlane>, SlicingError> {
    match request {
        ClippingRequest::Line { points, negate } => Ok(vec![line_cut_plane(*points, *negate)?]),
        ClippingRequest::Box {
            corners,
            lower_limit,
            height,
        } => {
            let slice_box = bbox_from_corners(corners, *lower_limit, *height)?;
            box_cut_planes(&slice_box)
        }
    }
}

/// The full derivation for one target.
pub fn derive_for_target(
    request: &ClippingRequest,
    target: &SliceTarget,
) -> Result<ObjectClippingPlanes, SlicingError> {
    let world_planes = world_planes_for(request)?;
    Ok(frame_planes_for(&target.kind, &world_planes))
}

pub struct SlicingPlugin;

impl Plugin for SlicingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Slicer>()
            .add_systems(Update, slice_on_drawend)
            .add_systems(PostUpdate, apply_slicing);
    }
}

/// Turns a finished drawing into a cut while the slice tool is active. Lines
/// cut along their end points; rectangles become boxes with the default
/// vertical extent.
pub fn slice_on_drawend(
    tool_manager: Res<ToolManager>,
    mut slicer: ResMut<Slicer>,
    mut ended: EventReader<DrawEnded>,
) {
    for event in ended.read() {
        if !tool_manager.is_tool_active(ToolType::Slice) {
            continue;
        }
        let request = match event.shape.shape_type {
            ShapeType::Line if event.shape.positions.len() >= 2 => {
                let first = event.shape.positions[0];
                let last = event.shape.positions[event.shape.positions.len() - 1];
                ClippingRequest::Line {
                    points: [first, last],
                    negate: false,
                }
            }
            ShapeType::Rectangle => ClippingRequest::Box {
                corners: event.shape.positions.clone(),
                lower_limit: SLICING_BOX_LOWER_LIMIT,
                height: SLICING_BOX_HEIGHT,
            },
            _ => continue,
        };
        if let Err(error) = slicer.activate(request) {
            warn!("rejected slicing cut: {error}");
        }
    }
}

/// Keeps every target's plane set in sync with the active cut. Each change
/// replaces the component wholesale; no incremental plane edits. A target
/// whose anchoring changed (new arrival or a moved root transform) is
/// re-derived even while the cut itself is unchanged.
pub fn apply_slicing(
    mut commands: Commands,
    slicer: Res<Slicer>,
    targets: Query<(Entity, &SliceTarget)>,
    changed: Query<Entity, Changed<SliceTarget>>,
) {
    let request_changed = slicer.is_changed();
    if !request_changed && changed.is_empty() {
        return;
    }

    let Some(request) = slicer.request() else {
        if request_changed {
            for (entity, _) in targets.iter() {
                commands.entity(entity).remove::<ObjectClippingPlanes>();
            }
        }
        return;
    };

    for (entity, target) in targets.iter() {
        if !request_changed && changed.get(entity).is_err() {
            continue;
        }
        match derive_for_target(request, target) {
            Ok(planes) => {
                commands.entity(entity).insert(planes);
            }
            Err(error) => {
                warn!("cannot derive clipping planes for {entity}: {error}");
                commands.entity(entity).remove::<ObjectClippingPlanes>();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::planes::SliceTargetKind;
    use super::*;

    fn line_request() -> ClippingRequest {
        ClippingRequest::Line {
            points: [Vec3::ZERO, Vec3::new(1000.0, 0.0, 0.0)],
            negate: false,
        }
    }

    #[test]
    fn terrain_line_cut_is_one_world_plane() {
        let target = SliceTarget::new(SliceTargetKind::Terrain);
        let derived = derive_for_target(&line_request(), &target).unwrap();
        assert_eq!(derived.planes.len(), 1);
        assert_eq!(derived.model_matrix, Mat4::IDENTITY);
        // The plane splits the two sides of the segment
        let left = derived.planes[0].signed_distance(Vec3::new(500.0, 0.0, -100.0));
        let right = derived.planes[0].signed_distance(Vec3::new(500.0, 0.0, 100.0));
        assert!(left * right < 0.0);
    }

    #[test]
    fn new_request_fully_replaces_derived_planes() {
        let target = SliceTarget::new(SliceTargetKind::Terrain);
        let from_line = derive_for_target(&line_request(), &target).unwrap();
        assert_eq!(from_line.planes.len(), 1);

        let box_request = ClippingRequest::Box {
            corners: vec![
                Vec3::new(-50.0, 0.0, -50.0),
                Vec3::new(50.0, 0.0, -50.0),
                Vec3::new(50.0, 0.0, 50.0),
                Vec3::new(-50.0, 0.0, 50.0),
            ],
            lower_limit: -10.0,
            height: 20.0,
        };
        let from_box = derive_for_target(&box_request, &target).unwrap();
        assert_eq!(from_box.planes.len(), 6);
    }

    #[test]
    fn degenerate_line_is_rejected() {
        let p = Vec3::new(3.0, 0.0, 3.0);
        let request = ClippingRequest::Line {
            points: [p, p],
            negate: false,
        };
        let target = SliceTarget::new(SliceTargetKind::Terrain);
        assert_eq!(
            derive_for_target(&request, &target),
            Err(SlicingError::DegenerateCut)
        );
    }

    #[test]
    fn volumetric_box_removes_the_exterior() {
        let request = ClippingRequest::Box {
            corners: vec![
                Vec3::new(-50.0, 0.0, -50.0),
                Vec3::new(50.0, 0.0, -50.0),
                Vec3::new(50.0, 0.0, 50.0),
                Vec3::new(-50.0, 0.0, 50.0),
            ],
            lower_limit: -10.0,
            height: 20.0,
        };
        let derived =
            derive_for_target(&request, &SliceTarget::new(SliceTargetKind::Volumetric)).unwrap();
        assert!(derived.union_clipping_regions);
        // Interior now sits on the positive side of every inverted plane
        assert!(
            derived
                .planes
                .iter()
                .all(|p| p.signed_distance(Vec3::ZERO) > 0.0)
        );
    }

    #[test]
    fn degenerate_request_is_rejected_at_activation() {
        let mut slicer = Slicer::default();
        let p = Vec3::new(1.0, 0.0, 1.0);
        let err = slicer
            .activate(ClippingRequest::Line {
                points: [p, p],
                negate: false,
            })
            .unwrap_err();
        assert_eq!(err, SlicingError::DegenerateCut);
        assert!(slicer.request().is_none());

        slicer.activate(line_request()).unwrap();
        assert!(slicer.request().is_some());
    }

    fn slicing_app() -> App {
        let mut app = App::new();
        app.init_resource::<Slicer>();
        app.add_systems(Update, apply_slicing);
        app
    }

    #[test]
    fn deactivate_then_reactivate_replaces_planes_on_every_target() {
        let mut app = slicing_app();
        let target = app
            .world_mut()
            .spawn(SliceTarget::new(SliceTargetKind::Terrain))
            .id();

        app.world_mut()
            .resource_mut::<Slicer>()
            .activate(line_request())
            .unwrap();
        app.update();
        let derived = app.world().get::<ObjectClippingPlanes>(target).unwrap();
        assert_eq!(derived.planes.len(), 1);

        // Deactivation strips every derived plane set
        app.world_mut().resource_mut::<Slicer>().deactivate();
        app.update();
        assert!(app.world().get::<ObjectClippingPlanes>(target).is_none());

        // A new cut fully replaces, never accumulates
        app.world_mut()
            .resource_mut::<Slicer>()
            .activate(ClippingRequest::Box {
                corners: vec![
                    Vec3::new(-50.0, 0.0, -50.0),
                    Vec3::new(50.0, 0.0, -50.0),
                    Vec3::new(50.0, 0.0, 50.0),
                    Vec3::new(-50.0, 0.0, 50.0),
                ],
                lower_limit: -10.0,
                height: 20.0,
            })
            .unwrap();
        app.update();
        let derived = app.world().get::<ObjectClippingPlanes>(target).unwrap();
        assert_eq!(derived.planes.len(), 6);
    }

    #[test]
    fn reanchored_target_is_rederived_under_unchanged_cut() {
        let mut app = slicing_app();
        let target = app
            .world_mut()
            .spawn(SliceTarget::new(SliceTargetKind::Terrain))
            .id();
        app.world_mut()
            .resource_mut::<Slicer>()
            .activate(line_request())
            .unwrap();
        app.update();
        assert_eq!(
            app.world()
                .get::<ObjectClippingPlanes>(target)
                .unwrap()
                .model_matrix,
            Mat4::IDENTITY
        );

        // The object moves; its plane set follows without touching the cut
        let root = Mat4::from_translation(Vec3::new(100.0, 0.0, 0.0));
        app.world_mut()
            .entity_mut(target)
            .insert(SliceTarget::new(SliceTargetKind::TransformedObject {
                root_transform: root,
            }));
        app.update();
        assert_eq!(
            app.world()
                .get::<ObjectClippingPlanes>(target)
                .unwrap()
                .model_matrix,
            root
        );
    }

    #[test]
    fn unknown_background_is_an_error() {
        let registry = BackgroundRegistry::default();
        let err = resolve_background(&registry, "aerial-2024").unwrap_err();
        assert_eq!(
            err,
            SlicingError::UnknownBackground {
                id: "aerial-2024".into()
            }
        );
    }

    #[test]
    fn registered_background_resolves() {
        let mut registry = BackgroundRegistry::default();
        let entity = Entity::from_raw(7);
        registry.register("relief", entity);
        assert_eq!(resolve_background(&registry, "relief"), Ok(entity));
    }
}
