//! Distance measurement built on top of the drawing tool.
//!
//! Arms the drawing tool in line mode, then turns the finished polyline into
//! persistent overlay geometry. Individual segments can be highlighted from
//! outside (a results list hover, typically); at most one segment is
//! highlighted at a time.

use crate::engine::geometry::ShapeType;
use crate::engine::scene::renderables::PickIgnore;
use crate::tools::draw::{DimensionLabel, DrawEnded, DrawRequest, DrawTool};
use bevy::prelude::*;
use bevy::render::view::RenderLayers;
use constants::render_settings::{
    DRAW_LINE_WIDTH, DRAW_VERTEX_SIZE, MEASURE_HIGHLIGHT_COLOR, MEASURE_HIGHLIGHT_POINT_SCALE,
    MEASURE_HIGHLIGHT_WIDTH_FACTOR, MEASURE_LINE_COLOR, MEASURE_POINT_COLOR,
};

/// Highlight the n-th measured segment. A new request replaces any previous
/// highlight.
#[derive(Event, Debug, Clone, Copy)]
pub struct HighlightSegmentRequest {
    pub index: usize,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct ClearSegmentHighlightRequest;

/// Cleanup tag for all persistent measurement geometry.
#[derive(Component)]
pub struct MeasureElement;

#[derive(Component)]
pub struct MeasurePoint {
    pub index: usize,
}

#[derive(Component)]
pub struct MeasureSegment {
    pub index: usize,
}

/// Transient overlay spawned for the highlighted segment.
#[derive(Component)]
pub struct MeasureHighlight;

#[derive(Resource, Default)]
pub struct MeasureTool {
    active: bool,
    positions: Vec<Vec3>,
    highlighted: Option<usize>,
}

impl MeasureTool {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn segment_count(&self) -> usize {
        self.positions.len().saturating_sub(1)
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    /// Last-wins highlight selection; out-of-range indices clear instead.
    pub fn set_highlight(&mut self, index: Option<usize>) {
        self.highlighted = index.filter(|&i| i < self.segment_count());
    }

    pub fn set_measurement(&mut self, positions: Vec<Vec3>) {
        self.positions = positions;
        self.highlighted = None;
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.highlighted = None;
    }
}

pub struct MeasureToolPlugin;

impl Plugin for MeasureToolPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MeasureTool>()
            .add_event::<HighlightSegmentRequest>()
            .add_event::<ClearSegmentHighlightRequest>()
            .add_systems(Update, (capture_measurement, process_highlight_requests))
            .add_systems(PostUpdate, update_highlight_render);
    }
}

/// Adopts a finished line as the current measurement and disarms drawing.
/// Starting a new line replaces the previous overlay.
pub fn capture_measurement(
    mut commands: Commands,
    mut measure: ResMut<MeasureTool>,
    mut draw_ended: EventReader<DrawEnded>,
    mut draw_requests: EventWriter<DrawRequest>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    existing: Query<Entity, With<MeasureElement>>,
) {
    for event in draw_ended.read() {
        if !measure.is_active() || event.shape.shape_type != ShapeType::Line {
            continue;
        }

        for entity in existing.iter() {
            commands.entity(entity).despawn();
        }
        measure.set_measurement(event.shape.positions.clone());
        draw_requests.write(DrawRequest::Deactivate);

        let total: f32 = event.shape.measurements.segment_lengths_km.iter().sum();
        info!(
            "measurement captured: {} segments, {:.3}km",
            event.shape.measurements.segment_count, total
        );

        for (index, point) in measure.positions().iter().enumerate() {
            commands.spawn((
                Mesh3d(meshes.add(Sphere::new(DRAW_VERTEX_SIZE))),
                MeshMaterial3d(materials.add(overlay_material(MEASURE_POINT_COLOR))),
                Transform::from_translation(*point),
                MeasureElement,
                MeasurePoint { index },
                PickIgnore,
                RenderLayers::layer(1),
            ));
        }
        let positions: Vec<Vec3> = measure.positions().to_vec();
        for (index, pair) in positions.windows(2).enumerate() {
            spawn_measure_segment(
                &mut commands,
                &mut meshes,
                &mut materials,
                pair[0],
                pair[1],
                index,
            );
        }
        if let Some(last) = positions.last() {
            commands.spawn((
                Transform::from_translation(*last),
                DimensionLabel {
                    text: format!("Length: {total:.3}km"),
                },
                MeasureElement,
                PickIgnore,
            ));
        }
    }
}

/// Applies highlight requests, last request wins within a frame. Requests
/// arriving while a new line is being drawn refer to a stale overlay and are
/// ignored.
pub fn process_highlight_requests(
    mut measure: ResMut<MeasureTool>,
    draw: Res<DrawTool>,
    mut highlights: EventReader<HighlightSegmentRequest>,
    mut clears: EventReader<ClearSegmentHighlightRequest>,
) {
    let cleared = clears.read().count() > 0;
    let last_request = highlights.read().last().copied();

    if draw.is_active() {
        return;
    }
    if let Some(request) = last_request {
        measure.set_highlight(Some(request.index));
    } else if cleared {
        measure.set_highlight(None);
    }
}

/// Rebuilds the highlight overlay and endpoint emphasis from state.
pub fn update_highlight_render(
    mut commands: Commands,
    measure: Res<MeasureTool>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    existing_highlight: Query<Entity, With<MeasureHighlight>>,
    mut points: Query<(
        &MeasurePoint,
        &mut Transform,
        &MeshMaterial3d<StandardMaterial>,
    )>,
) {
    if !measure.is_changed() {
        return;
    }
    for entity in existing_highlight.iter() {
        commands.entity(entity).despawn();
    }

    // Endpoints revert to the configured look first, then the highlighted
    // segment's pair is emphasised
    for (point, mut transform, material) in points.iter_mut() {
        let emphasised = measure
            .highlighted()
            .is_some_and(|i| point.index == i || point.index == i + 1);
        transform.scale = if emphasised {
            Vec3::splat(MEASURE_HIGHLIGHT_POINT_SCALE)
        } else {
            Vec3::ONE
        };
        if let Some(material) = materials.get_mut(&material.0) {
            let color = if emphasised {
                MEASURE_HIGHLIGHT_COLOR
            } else {
                MEASURE_POINT_COLOR
            };
            material.base_color = color;
            material.emissive = color.to_linear();
        }
    }

    let Some(index) = measure.highlighted() else {
        return;
    };
    let positions = measure.positions();
    let (start, end) = (positions[index], positions[index + 1]);
    let direction = end - start;
    let distance = direction.length();
    if distance < 0.1 {
        return;
    }
    let width = DRAW_LINE_WIDTH * MEASURE_HIGHLIGHT_WIDTH_FACTOR;
    commands.spawn((
        Mesh3d(meshes.add(Cuboid::new(distance, width, width))),
        MeshMaterial3d(materials.add(overlay_material(MEASURE_HIGHLIGHT_COLOR))),
        Transform::from_translation((start + end) * 0.5)
            .with_rotation(Quat::from_rotation_arc(Vec3::X, direction.normalize())),
        MeasureElement,
        MeasureHighlight,
        PickIgnore,
        RenderLayers::layer(1),
    ));
}

/// Removes all measurement geometry. Safe to call when nothing is measured.
pub fn clear_measurement(
    commands: &mut Commands,
    measure: &mut MeasureTool,
    existing: &Query<Entity, With<MeasureElement>>,
) {
    for entity in existing.iter() {
        commands.entity(entity).despawn();
    }
    measure.clear();
}

fn overlay_material(color: Color) -> StandardMaterial {
    StandardMaterial {
        base_color: color,
        emissive: color.to_linear(),
        depth_bias: 0.0,
        unlit: true,
        alpha_mode: AlphaMode::Blend,
        ..default()
    }
}

fn spawn_measure_segment(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    start: Vec3,
    end: Vec3,
    index: usize,
) {
    let direction = end - start;
    let distance = direction.length();
    if distance < 0.1 {
        return;
    }
    commands.spawn((
        Mesh3d(meshes.add(Cuboid::new(distance, DRAW_LINE_WIDTH, DRAW_LINE_WIDTH))),
        MeshMaterial3d(materials.add(overlay_material(MEASURE_LINE_COLOR))),
        Transform::from_translation((start + end) * 0.5)
            .with_rotation(Quat::from_rotation_arc(Vec3::X, direction.normalize())),
        MeasureElement,
        MeasureSegment { index },
        PickIgnore,
        RenderLayers::layer(1),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlight_is_last_wins() {
        let mut measure = MeasureTool::default();
        measure.set_measurement(vec![
            Vec3::ZERO,
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(20.0, 0.0, 0.0),
        ]);
        measure.set_highlight(Some(0));
        measure.set_highlight(Some(1));
        assert_eq!(measure.highlighted(), Some(1));
        measure.set_highlight(None);
        assert_eq!(measure.highlighted(), None);
    }

    #[test]
    fn out_of_range_highlight_clears() {
        let mut measure = MeasureTool::default();
        measure.set_measurement(vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]);
        measure.set_highlight(Some(0));
        measure.set_highlight(Some(5));
        assert_eq!(measure.highlighted(), None);
    }

    #[test]
    fn new_measurement_drops_stale_highlight() {
        let mut measure = MeasureTool::default();
        measure.set_measurement(vec![
            Vec3::ZERO,
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(20.0, 0.0, 0.0),
        ]);
        measure.set_highlight(Some(1));
        measure.set_measurement(vec![Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0)]);
        assert_eq!(measure.highlighted(), None);
        assert_eq!(measure.segment_count(), 1);
    }

    #[test]
    fn clear_is_idempotent() {
        let mut measure = MeasureTool::default();
        measure.clear();
        measure.set_measurement(vec![Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)]);
        measure.clear();
        measure.clear();
        assert!(measure.positions().is_empty());
        assert_eq!(measure.highlighted(), None);
    }
}
