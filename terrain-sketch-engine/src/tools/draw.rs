//! Interactive shape authoring on the terrain surface.
//!
//! A click-driven state machine for points, lines, polygons and rectangles.
//! Sketch visuals are rebuilt from state every frame; the finished shape is
//! published as a `DrawEnded` event carrying its measurements.

use crate::engine::camera::CameraInputLock;
use crate::engine::camera::viewport_camera::{ViewportCamera, cursor_terrain_hit};
use crate::engine::geometry::{
    DEGENERATE_EPSILON, DrawError, GeometryMeasurements, ShapeType, measurements_for, rectanglify,
};
use crate::engine::scene::renderables::PickIgnore;
use crate::engine::scene::terrain::{TerrainBounds, TerrainHeightmap};
use crate::tools::ray::{ray_point_distance, ray_segment_distance};
use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::view::RenderLayers;
use bevy::window::PrimaryWindow;
use constants::render_settings::{
    DOUBLE_CLICK_SECS, DRAW_LINE_WIDTH, DRAW_VERTEX_SIZE, EDIT_VERTEX_SIZE,
    MOUSE_RAYCAST_INTERSECTION_SPHERE_SIZE, SKETCH_FILL_COLOR, SKETCH_PICK_RADIUS,
    SKETCH_STROKE_COLOR, SKETCH_VERTEX_COLOR,
};
/// A completed shape together with its measurements.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedShape {
    pub shape_type: ShapeType,
    pub positions: Vec<Vec3>,
    pub measurements: GeometryMeasurements,
}

/// What a committed click did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// More clicks expected.
    Continue,
    /// The shape completed itself (point, or third rectangle corner).
    Finish,
}

/// Which part of an edited sketch is being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Vertex(usize),
    /// The whole sketch follows the pointer.
    Body,
}

/// External control of the drawing tool.
#[derive(Event, Debug, Clone)]
pub enum DrawRequest {
    Activate(ShapeType),
    /// Re-enter an already finished shape for vertex and body dragging.
    ActivateEdit(FinishedShape),
    Deactivate,
    Finish,
    Cancel,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct DrawStateChanged {
    pub active: bool,
    pub editing: bool,
}

/// First vertex of a session was committed.
#[derive(Event, Debug, Clone, Copy)]
pub struct DrawStarted;

#[derive(Event, Debug, Clone)]
pub struct DrawEnded {
    pub shape: FinishedShape,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct DrawErrorEvent {
    pub error: DrawError,
}

/// A sketch drag grabbed the pointer.
#[derive(Event, Debug, Clone, Copy)]
pub struct SketchPointerDown;

#[derive(Event, Debug, Clone, Copy)]
pub struct SketchPointerUp;

/// Cleanup tag shared by every sketch visual.
#[derive(Component)]
pub struct SketchElement;

#[derive(Component)]
pub struct SketchVertex {
    pub index: usize,
}

#[derive(Component)]
pub struct SketchSegment;

/// Cursor-following marker shown while drawing.
#[derive(Component)]
pub struct SketchPreview;

/// Running dimension text anchored to the live vertex. Rendering of the text
/// itself is left to the embedding UI.
#[derive(Component, Debug, Clone)]
pub struct DimensionLabel {
    pub text: String,
}

/// Drawing session state machine.
///
/// All mutation goes through the methods below; the input systems are thin
/// wrappers that translate pointer events into method calls.
#[derive(Resource, Default)]
pub struct DrawTool {
    shape_type: ShapeType,
    active: bool,
    started: bool,
    active_vertices: Vec<Vec3>,
    live_vertex: Option<Vec3>,
    segment_distances_km: Vec<f32>,
    live_distance_km: f32,
    edit_target: Option<FinishedShape>,
    drag: Option<DragKind>,
    drag_anchor: Option<Vec3>,
}

impl DrawTool {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn shape_type(&self) -> ShapeType {
        self.shape_type
    }

    pub fn is_editing(&self) -> bool {
        self.active && self.edit_target.is_some()
    }

    pub fn has_started(&self) -> bool {
        self.started
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.active_vertices
    }

    pub fn live_vertex(&self) -> Option<Vec3> {
        self.live_vertex
    }

    pub fn segment_distances_km(&self) -> &[f32] {
        &self.segment_distances_km
    }

    pub fn live_distance_km(&self) -> f32 {
        self.live_distance_km
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Switching the shape kind discards the in-progress session.
    pub fn set_shape_type(&mut self, shape_type: ShapeType) {
        if self.shape_type != shape_type {
            self.shape_type = shape_type;
            self.reset_session();
        }
    }

    /// Stores a shape to re-enter in edit mode. Takes effect on the next
    /// activation.
    pub fn set_edit_target(&mut self, target: Option<FinishedShape>) {
        self.edit_target = target;
    }

    /// Returns true when the active flag actually changed. Activation starts
    /// a fresh session, seeded from the edit target when one is set;
    /// deactivation tears the session down.
    pub fn set_active(&mut self, active: bool) -> bool {
        if active == self.active {
            return false;
        }
        self.active = active;
        self.reset_session();
        if active {
            if let Some(target) = self.edit_target.clone() {
                self.shape_type = target.shape_type;
                let mut seed = target.positions;
                if target.shape_type == ShapeType::Rectangle {
                    // A rectangle is re-derived from its first three corners
                    seed.truncate(3);
                }
                self.segment_distances_km = seed
                    .windows(2)
                    .map(|pair| pair[0].distance(pair[1]) / 1000.0)
                    .collect();
                self.active_vertices = seed;
                self.started = true;
            }
        } else {
            self.edit_target = None;
        }
        true
    }

    /// Commits the vertex under the pointer.
    pub fn commit_point(&mut self, point: Vec3) -> CommitOutcome {
        if !self.active {
            return CommitOutcome::Continue;
        }
        self.started = true;
        if let Some(last) = self.active_vertices.last() {
            // Rectangles resolve from exactly three distinct corners, so a
            // re-click on the last corner is dropped instead of committed
            if self.shape_type == ShapeType::Rectangle
                && last.distance(point) < DEGENERATE_EPSILON
            {
                return CommitOutcome::Continue;
            }
            let d = last.distance(point) / 1000.0;
            // A re-click on the same spot adds no segment
            if d > f32::EPSILON {
                self.segment_distances_km.push(d);
            }
        }
        self.active_vertices.push(point);
        self.live_distance_km = 0.0;

        match self.shape_type {
            ShapeType::Point => CommitOutcome::Finish,
            ShapeType::Rectangle if self.active_vertices.len() == 3 => CommitOutcome::Finish,
            _ => CommitOutcome::Continue,
        }
    }

    /// Tracks the pointer between clicks and keeps the running dimension
    /// current. For rectangles past the base edge the live value is the side
    /// length of the completed rectangle rather than the raw cursor distance.
    pub fn update_live(&mut self, point: Vec3) {
        if !self.active {
            return;
        }
        self.live_distance_km = match self.shape_type {
            ShapeType::Rectangle if self.active_vertices.len() >= 2 => {
                match rectanglify(&[self.active_vertices[0], self.active_vertices[1], point]) {
                    Ok(corners) => corners[1].distance(corners[2]) / 1000.0,
                    Err(_) => 0.0,
                }
            }
            _ => self
                .active_vertices
                .last()
                .map(|last| last.distance(point) / 1000.0)
                .unwrap_or(0.0),
        };
        self.live_vertex = Some(point);
    }

    fn min_vertices(&self) -> usize {
        match self.shape_type {
            ShapeType::Point => 1,
            // A short line finishes fine, it just measures nothing
            ShapeType::Line => 0,
            ShapeType::Polygon | ShapeType::Rectangle => 3,
        }
    }

    /// Closes the session into a finished shape. On `NeedMorePoints` the
    /// session is left untouched so drawing can simply continue.
    pub fn finish(&mut self) -> Result<FinishedShape, DrawError> {
        if self.active_vertices.len() < self.min_vertices() {
            return Err(DrawError::NeedMorePoints);
        }
        let positions = match self.shape_type {
            ShapeType::Rectangle => rectanglify(&self.active_vertices)?,
            _ => self.active_vertices.clone(),
        };
        let measurements = measurements_for(self.shape_type, &positions);
        let shape = FinishedShape {
            shape_type: self.shape_type,
            positions,
            measurements,
        };
        self.reset_session();
        Ok(shape)
    }

    /// Finish triggered by a double click. The second click of the pair has
    /// already been committed as a duplicate vertex; drop it before closing.
    pub fn finish_from_double_click(&mut self) -> Result<FinishedShape, DrawError> {
        if let [.., a, b] = self.active_vertices[..] {
            if a.distance(b) < SKETCH_PICK_RADIUS {
                self.active_vertices.pop();
            }
        }
        self.finish()
    }

    /// Closes an edit session, yielding the shape with its dragged vertices.
    pub fn take_edited_shape(&mut self) -> Option<Result<FinishedShape, DrawError>> {
        if !self.is_editing() {
            return None;
        }
        Some(self.finish())
    }

    /// Discards the in-progress shape but keeps the tool armed.
    pub fn cancel(&mut self) {
        self.reset_session();
    }

    pub fn begin_drag(&mut self, kind: DragKind, anchor: Vec3) {
        self.drag = Some(kind);
        self.drag_anchor = Some(anchor);
    }

    pub fn drag_to(&mut self, point: Vec3) {
        let (Some(kind), Some(anchor)) = (self.drag, self.drag_anchor) else {
            return;
        };
        match kind {
            DragKind::Vertex(index) => {
                if let Some(vertex) = self.active_vertices.get_mut(index) {
                    *vertex = point;
                }
            }
            DragKind::Body => {
                let delta = point - anchor;
                for vertex in &mut self.active_vertices {
                    *vertex += delta;
                }
            }
        }
        self.drag_anchor = Some(point);
    }

    pub fn end_drag(&mut self) -> bool {
        self.drag_anchor = None;
        self.drag.take().is_some()
    }

    /// Text for the cursor-anchored dimension label.
    pub fn dimension_label_text(&self) -> String {
        match self.shape_type {
            ShapeType::Rectangle if self.active_vertices.len() >= 2 => {
                let base = self.active_vertices[0].distance(self.active_vertices[1]) / 1000.0;
                format!("{:.3}km x {:.3}km", base, self.live_distance_km)
            }
            _ => {
                let total: f32 =
                    self.segment_distances_km.iter().sum::<f32>() + self.live_distance_km;
                format!("Length: {total:.3}km")
            }
        }
    }

    fn reset_session(&mut self) {
        self.started = false;
        self.active_vertices.clear();
        self.live_vertex = None;
        self.segment_distances_km.clear();
        self.live_distance_km = 0.0;
        self.drag = None;
        self.drag_anchor = None;
    }
}

pub struct DrawToolPlugin;

impl Plugin for DrawToolPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DrawTool>()
            .add_event::<DrawRequest>()
            .add_event::<DrawStateChanged>()
            .add_event::<DrawStarted>()
            .add_event::<DrawEnded>()
            .add_event::<DrawErrorEvent>()
            .add_event::<SketchPointerDown>()
            .add_event::<SketchPointerUp>()
            .add_systems(
                Update,
                (process_draw_requests, draw_input_system, edit_drag_system).chain(),
            )
            .add_systems(PostUpdate, update_sketch_render);
    }
}

/// Applies external tool control and publishes the resulting state changes.
pub fn process_draw_requests(
    mut requests: EventReader<DrawRequest>,
    mut tool: ResMut<DrawTool>,
    mut state_changed: EventWriter<DrawStateChanged>,
    mut ended: EventWriter<DrawEnded>,
    mut errors: EventWriter<DrawErrorEvent>,
) {
    for request in requests.read() {
        match request {
            DrawRequest::Activate(shape_type) => {
                tool.set_active(false);
                tool.set_edit_target(None);
                tool.set_shape_type(*shape_type);
                if tool.set_active(true) {
                    info!("drawing activated: {:?}", shape_type);
                    state_changed.write(DrawStateChanged {
                        active: true,
                        editing: false,
                    });
                }
            }
            DrawRequest::ActivateEdit(shape) => {
                tool.set_active(false);
                tool.set_edit_target(Some(shape.clone()));
                if tool.set_active(true) {
                    info!("editing activated: {:?}", shape.shape_type);
                    state_changed.write(DrawStateChanged {
                        active: true,
                        editing: true,
                    });
                }
            }
            DrawRequest::Deactivate => {
                if let Some(result) = tool.take_edited_shape() {
                    match result {
                        Ok(shape) => {
                            ended.write(DrawEnded { shape });
                        }
                        Err(error) => {
                            errors.write(DrawErrorEvent { error });
                        }
                    }
                }
                if tool.set_active(false) {
                    state_changed.write(DrawStateChanged {
                        active: false,
                        editing: false,
                    });
                }
            }
            DrawRequest::Finish => match tool.finish() {
                Ok(shape) => {
                    ended.write(DrawEnded { shape });
                }
                Err(error) => {
                    warn!("cannot finish shape: {error}");
                    errors.write(DrawErrorEvent { error });
                }
            },
            DrawRequest::Cancel => tool.cancel(),
        }
    }
}

/// Click and cursor handling for a fresh (non-edit) drawing session.
pub fn draw_input_system(
    mut tool: ResMut<DrawTool>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    time: Res<Time>,
    mut last_click: Local<f32>,
    camera_query: Query<(&GlobalTransform, &Camera), With<Camera3d>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut viewport_camera: ResMut<ViewportCamera>,
    heightmap: Res<TerrainHeightmap>,
    images: Res<Assets<Image>>,
    bounds: Res<TerrainBounds>,
    mut started: EventWriter<DrawStarted>,
    mut ended: EventWriter<DrawEnded>,
    mut errors: EventWriter<DrawErrorEvent>,
) {
    if !tool.is_active() || tool.is_editing() {
        return;
    }
    let (Ok((camera_transform, camera)), Ok(window)) = (camera_query.single(), windows.single())
    else {
        return;
    };

    let hit = cursor_terrain_hit(
        &mut viewport_camera,
        window,
        camera,
        camera_transform,
        &heightmap,
        &images,
        &bounds,
    );
    if let Some(point) = hit {
        tool.update_live(point);
    }

    if mouse_button.just_pressed(MouseButton::Left) {
        let now = time.elapsed_secs();
        let double_click = now - *last_click < DOUBLE_CLICK_SECS;
        *last_click = now;

        let Some(point) = hit else {
            return;
        };

        if double_click
            && tool.has_started()
            && matches!(tool.shape_type(), ShapeType::Line | ShapeType::Polygon)
        {
            match tool.finish_from_double_click() {
                Ok(shape) => {
                    info!(
                        "shape finished: {:?} with {} vertices",
                        shape.shape_type,
                        shape.positions.len()
                    );
                    ended.write(DrawEnded { shape });
                }
                Err(error) => {
                    warn!("cannot finish shape: {error}");
                    errors.write(DrawErrorEvent { error });
                }
            }
            return;
        }

        let first = !tool.has_started();
        let outcome = tool.commit_point(point);
        if first {
            started.write(DrawStarted);
        }
        if outcome == CommitOutcome::Finish {
            match tool.finish() {
                Ok(shape) => {
                    ended.write(DrawEnded { shape });
                }
                Err(error) => {
                    warn!("cannot finish shape: {error}");
                    errors.write(DrawErrorEvent { error });
                }
            }
        }
    }
}

/// Vertex and body dragging for an edit session. A drag locks camera input
/// until the button is released.
pub fn edit_drag_system(
    mut tool: ResMut<DrawTool>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    camera_query: Query<(&GlobalTransform, &Camera), With<Camera3d>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut viewport_camera: ResMut<ViewportCamera>,
    heightmap: Res<TerrainHeightmap>,
    images: Res<Assets<Image>>,
    bounds: Res<TerrainBounds>,
    mut input_lock: ResMut<CameraInputLock>,
    mut pointer_down: EventWriter<SketchPointerDown>,
    mut pointer_up: EventWriter<SketchPointerUp>,
) {
    if !tool.is_editing() {
        return;
    }
    let (Ok((camera_transform, camera)), Ok(window)) = (camera_query.single(), windows.single())
    else {
        return;
    };

    let hit = cursor_terrain_hit(
        &mut viewport_camera,
        window,
        camera,
        camera_transform,
        &heightmap,
        &images,
        &bounds,
    );

    if mouse_button.just_pressed(MouseButton::Left) {
        let Some(cursor) = window.cursor_position() else {
            return;
        };
        let Ok(ray) = camera.viewport_to_world(camera_transform, cursor) else {
            return;
        };
        let dir = ray.direction.as_vec3();

        // Vertices win over the body; nearest along the ray wins overall
        let mut best: Option<(DragKind, f32)> = None;
        for (index, vertex) in tool.vertices().iter().enumerate() {
            if let Some((distance, t)) = ray_point_distance(ray.origin, dir, *vertex) {
                if distance < SKETCH_PICK_RADIUS && best.is_none_or(|(_, bt)| t < bt) {
                    best = Some((DragKind::Vertex(index), t));
                }
            }
        }
        if best.is_none() && matches!(tool.shape_type(), ShapeType::Line) {
            for pair in tool.vertices().windows(2) {
                if let Some((distance, t)) = ray_segment_distance(ray.origin, dir, pair[0], pair[1])
                {
                    if distance < SKETCH_PICK_RADIUS {
                        best = Some((DragKind::Body, t));
                        break;
                    }
                }
            }
        }

        if let (Some((kind, _)), Some(anchor)) = (best, hit) {
            tool.begin_drag(kind, anchor);
            input_lock.locked = true;
            pointer_down.write(SketchPointerDown);
        }
    } else if mouse_button.pressed(MouseButton::Left) && tool.is_dragging() {
        if let Some(point) = hit {
            tool.drag_to(point);
        }
    } else if mouse_button.just_released(MouseButton::Left) && tool.end_drag() {
        input_lock.locked = false;
        pointer_up.write(SketchPointerUp);
    }
}

fn sketch_material(color: Color) -> StandardMaterial {
    StandardMaterial {
        base_color: color,
        emissive: color.to_linear(),
        depth_bias: 0.0,
        unlit: true,
        alpha_mode: AlphaMode::Blend,
        ..default()
    }
}

fn spawn_segment(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    start: Vec3,
    end: Vec3,
) {
    let direction = end - start;
    let distance = direction.length();
    if distance < 0.1 {
        return;
    }
    let midpoint = (start + end) * 0.5;
    let rotation = Quat::from_rotation_arc(Vec3::X, direction.normalize());

    commands.spawn((
        Mesh3d(meshes.add(Cuboid::new(distance, DRAW_LINE_WIDTH, DRAW_LINE_WIDTH))),
        MeshMaterial3d(materials.add(sketch_material(SKETCH_STROKE_COLOR))),
        Transform::from_translation(midpoint).with_rotation(rotation),
        SketchElement,
        SketchSegment,
        PickIgnore,
        RenderLayers::layer(1),
    ));
}

/// Triangulated fill for a closed outline, lifted slightly so it does not
/// z-fight the terrain.
fn fill_mesh(outline: &[Vec3]) -> Option<Mesh> {
    let mut coords = Vec::with_capacity(outline.len() * 2);
    for p in outline {
        coords.push(p.x as f64);
        coords.push(p.z as f64);
    }
    let indices: Vec<u32> = earcutr::earcut(&coords, &[], 2)
        .ok()?
        .into_iter()
        .map(|i| i as u32)
        .collect();
    if indices.is_empty() {
        return None;
    }

    let positions: Vec<[f32; 3]> = outline.iter().map(|p| [p.x, p.y + 0.02, p.z]).collect();
    let normals: Vec<[f32; 3]> = vec![[0.0, 1.0, 0.0]; outline.len()];

    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::default(),
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_indices(Indices::U32(indices));
    Some(mesh)
}

/// Rebuilds the sketch visuals from tool state every frame. Rebuilding from
/// scratch keeps the visuals trivially consistent through commits, live
/// updates and drags.
pub fn update_sketch_render(
    mut commands: Commands,
    tool: Res<DrawTool>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    existing: Query<Entity, With<SketchElement>>,
) {
    for entity in existing.iter() {
        commands.entity(entity).despawn();
    }
    if !tool.is_active() {
        return;
    }

    let vertex_size = if tool.is_editing() {
        EDIT_VERTEX_SIZE
    } else {
        DRAW_VERTEX_SIZE
    };
    for (index, point) in tool.vertices().iter().enumerate() {
        commands.spawn((
            Mesh3d(meshes.add(Sphere::new(vertex_size))),
            MeshMaterial3d(materials.add(sketch_material(SKETCH_VERTEX_COLOR))),
            Transform::from_translation(*point),
            SketchElement,
            SketchVertex { index },
            PickIgnore,
            RenderLayers::layer(1),
        ));
    }

    // Outline from committed vertices plus the cursor while drawing
    let mut outline: Vec<Vec3> = tool.vertices().to_vec();
    if !tool.is_editing() && tool.has_started() {
        if let Some(live) = tool.live_vertex() {
            outline.push(live);
        }
    }
    if tool.shape_type() == ShapeType::Rectangle && outline.len() >= 3 {
        if let Ok(corners) = rectanglify(&outline[..3]) {
            outline = corners;
        }
    }
    let closed = matches!(tool.shape_type(), ShapeType::Polygon | ShapeType::Rectangle);

    if outline.len() >= 2 {
        let edge_count = if closed && outline.len() > 2 {
            outline.len()
        } else {
            outline.len() - 1
        };
        for i in 0..edge_count {
            let start = outline[i];
            let end = outline[(i + 1) % outline.len()];
            spawn_segment(&mut commands, &mut meshes, &mut materials, start, end);
        }
    }

    if closed && outline.len() >= 3 {
        if let Some(mesh) = fill_mesh(&outline) {
            let mut material = sketch_material(SKETCH_FILL_COLOR);
            material.double_sided = true;
            material.cull_mode = None;
            commands.spawn((
                Mesh3d(meshes.add(mesh)),
                MeshMaterial3d(materials.add(material)),
                Transform::IDENTITY,
                SketchElement,
                PickIgnore,
                RenderLayers::layer(1),
            ));
        }
    }

    if !tool.is_editing() {
        if let Some(live) = tool.live_vertex() {
            commands.spawn((
                Mesh3d(meshes.add(Sphere::new(MOUSE_RAYCAST_INTERSECTION_SPHERE_SIZE))),
                MeshMaterial3d(materials.add(sketch_material(SKETCH_VERTEX_COLOR))),
                Transform::from_translation(live),
                SketchElement,
                SketchPreview,
                DimensionLabel {
                    text: tool.dimension_label_text(),
                },
                PickIgnore,
                RenderLayers::layer(1),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_tool(shape_type: ShapeType) -> DrawTool {
        let mut tool = DrawTool::default();
        tool.set_shape_type(shape_type);
        assert!(tool.set_active(true));
        tool
    }

    #[test]
    fn point_finishes_on_first_click() {
        let mut tool = active_tool(ShapeType::Point);
        let outcome = tool.commit_point(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(outcome, CommitOutcome::Finish);
        let shape = tool.finish().unwrap();
        assert_eq!(shape.positions, vec![Vec3::new(1.0, 2.0, 3.0)]);
        assert!(tool.vertices().is_empty());
    }

    #[test]
    fn rectangle_finishes_on_third_click() {
        let mut tool = active_tool(ShapeType::Rectangle);
        assert_eq!(tool.commit_point(Vec3::ZERO), CommitOutcome::Continue);
        assert_eq!(
            tool.commit_point(Vec3::new(100.0, 0.0, 0.0)),
            CommitOutcome::Continue
        );
        assert_eq!(
            tool.commit_point(Vec3::new(50.0, 0.0, 40.0)),
            CommitOutcome::Finish
        );
        let shape = tool.finish().unwrap();
        assert_eq!(shape.positions.len(), 4);
        assert!(shape.measurements.side_lengths_km.is_some());
    }

    #[test]
    fn rectangle_recovers_from_base_corner_reclick() {
        let mut tool = active_tool(ShapeType::Rectangle);
        let base = Vec3::new(10.0, 0.0, 10.0);
        assert_eq!(tool.commit_point(base), CommitOutcome::Continue);
        // Re-clicking the same corner is dropped, not committed
        assert_eq!(tool.commit_point(base), CommitOutcome::Continue);
        assert_eq!(tool.vertices().len(), 1);
        assert_eq!(
            tool.commit_point(Vec3::new(110.0, 0.0, 10.0)),
            CommitOutcome::Continue
        );
        // The third distinct corner still auto-finishes the session
        assert_eq!(
            tool.commit_point(Vec3::new(60.0, 0.0, 50.0)),
            CommitOutcome::Finish
        );
        let shape = tool.finish().unwrap();
        assert_eq!(shape.positions.len(), 4);
    }

    #[test]
    fn polygon_needs_three_points_and_stays_active() {
        let mut tool = active_tool(ShapeType::Polygon);
        tool.commit_point(Vec3::ZERO);
        tool.commit_point(Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(tool.finish(), Err(DrawError::NeedMorePoints));
        // Session untouched, drawing continues
        assert!(tool.is_active());
        assert_eq!(tool.vertices().len(), 2);
        tool.commit_point(Vec3::new(10.0, 0.0, 10.0));
        assert!(tool.finish().is_ok());
    }

    #[test]
    fn line_session_accumulates_distances() {
        let mut tool = active_tool(ShapeType::Line);
        tool.commit_point(Vec3::ZERO);
        tool.commit_point(Vec3::new(0.0, 0.0, 1000.0));
        assert_eq!(tool.segment_distances_km(), &[1.0]);
        // Re-click on the same spot adds a vertex but no segment
        tool.commit_point(Vec3::new(0.0, 0.0, 1000.0));
        assert_eq!(tool.segment_distances_km(), &[1.0]);
    }

    #[test]
    fn one_km_line_round_trip() {
        let mut tool = active_tool(ShapeType::Line);
        tool.commit_point(Vec3::ZERO);
        tool.commit_point(Vec3::new(1000.0, 0.0, 0.0));
        let shape = tool.finish().unwrap();
        assert_eq!(shape.measurements.segment_lengths_km, vec![1.0]);
        assert_eq!(shape.measurements.segment_count, 1);
        assert_eq!(shape.measurements.perimeter_km, Some(1.0));
    }

    #[test]
    fn short_line_finishes_without_distance() {
        let mut tool = active_tool(ShapeType::Line);
        tool.commit_point(Vec3::new(3.0, 0.0, 4.0));
        let shape = tool.finish().unwrap();
        assert_eq!(shape.positions.len(), 1);
        assert!(shape.measurements.segment_lengths_km.is_empty());
        assert_eq!(shape.measurements.segment_count, 0);
    }

    #[test]
    fn double_click_drops_duplicate_vertex() {
        let mut tool = active_tool(ShapeType::Line);
        tool.commit_point(Vec3::ZERO);
        tool.commit_point(Vec3::new(500.0, 0.0, 0.0));
        // Second click of the double-click pair lands on the same spot
        tool.commit_point(Vec3::new(500.0, 0.0, 0.0));
        let shape = tool.finish_from_double_click().unwrap();
        assert_eq!(shape.positions.len(), 2);
    }

    #[test]
    fn live_update_tracks_cursor() {
        let mut tool = active_tool(ShapeType::Line);
        tool.commit_point(Vec3::ZERO);
        tool.update_live(Vec3::new(0.0, 0.0, 250.0));
        assert!((tool.live_distance_km() - 0.25).abs() < 1e-6);
        assert_eq!(tool.live_vertex(), Some(Vec3::new(0.0, 0.0, 250.0)));
    }

    #[test]
    fn rectangle_live_distance_is_side_length() {
        let mut tool = active_tool(ShapeType::Rectangle);
        tool.commit_point(Vec3::ZERO);
        tool.commit_point(Vec3::new(1000.0, 0.0, 0.0));
        // Cursor off-axis; the side is the perpendicular component
        tool.update_live(Vec3::new(300.0, 0.0, 2000.0));
        assert!((tool.live_distance_km() - 2.0).abs() < 1e-3);
    }

    #[test]
    fn deactivate_clears_session() {
        let mut tool = active_tool(ShapeType::Polygon);
        tool.commit_point(Vec3::ZERO);
        assert!(tool.set_active(false));
        assert!(!tool.is_active());
        assert!(tool.vertices().is_empty());
        assert!(!tool.has_started());
    }

    #[test]
    fn switching_shape_type_resets_session() {
        let mut tool = active_tool(ShapeType::Line);
        tool.commit_point(Vec3::ZERO);
        tool.set_shape_type(ShapeType::Polygon);
        assert!(tool.vertices().is_empty());
        // Same type again is a no-op
        tool.commit_point(Vec3::ZERO);
        tool.set_shape_type(ShapeType::Polygon);
        assert_eq!(tool.vertices().len(), 1);
    }

    #[test]
    fn edit_seed_truncates_rectangle_to_three_corners() {
        let corners = vec![
            Vec3::ZERO,
            Vec3::new(100.0, 0.0, 0.0),
            Vec3::new(100.0, 0.0, 50.0),
            Vec3::new(0.0, 0.0, 50.0),
        ];
        let shape = FinishedShape {
            shape_type: ShapeType::Rectangle,
            positions: corners,
            measurements: GeometryMeasurements::default(),
        };
        let mut tool = DrawTool::default();
        tool.set_edit_target(Some(shape));
        tool.set_active(true);
        assert!(tool.is_editing());
        assert_eq!(tool.vertices().len(), 3);
        assert!(tool.has_started());
    }

    #[test]
    fn vertex_drag_moves_one_vertex() {
        let shape = FinishedShape {
            shape_type: ShapeType::Line,
            positions: vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)],
            measurements: GeometryMeasurements::default(),
        };
        let mut tool = DrawTool::default();
        tool.set_edit_target(Some(shape));
        tool.set_active(true);
        tool.begin_drag(DragKind::Vertex(1), Vec3::new(10.0, 0.0, 0.0));
        tool.drag_to(Vec3::new(20.0, 0.0, 5.0));
        assert!(tool.end_drag());
        assert_eq!(tool.vertices()[0], Vec3::ZERO);
        assert_eq!(tool.vertices()[1], Vec3::new(20.0, 0.0, 5.0));
    }

    #[test]
    fn body_drag_translates_all_vertices() {
        let shape = FinishedShape {
            shape_type: ShapeType::Line,
            positions: vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)],
            measurements: GeometryMeasurements::default(),
        };
        let mut tool = DrawTool::default();
        tool.set_edit_target(Some(shape));
        tool.set_active(true);
        tool.begin_drag(DragKind::Body, Vec3::new(5.0, 0.0, 0.0));
        tool.drag_to(Vec3::new(5.0, 0.0, 3.0));
        tool.end_drag();
        assert_eq!(tool.vertices()[0], Vec3::new(0.0, 0.0, 3.0));
        assert_eq!(tool.vertices()[1], Vec3::new(10.0, 0.0, 3.0));
    }

    #[test]
    fn edited_shape_is_returned_on_close() {
        let shape = FinishedShape {
            shape_type: ShapeType::Line,
            positions: vec![Vec3::ZERO, Vec3::new(1000.0, 0.0, 0.0)],
            measurements: GeometryMeasurements::default(),
        };
        let mut tool = DrawTool::default();
        tool.set_edit_target(Some(shape));
        tool.set_active(true);
        tool.begin_drag(DragKind::Vertex(1), Vec3::new(1000.0, 0.0, 0.0));
        tool.drag_to(Vec3::new(2000.0, 0.0, 0.0));
        tool.end_drag();
        let edited = tool.take_edited_shape().unwrap().unwrap();
        assert_eq!(edited.positions[1], Vec3::new(2000.0, 0.0, 0.0));
        assert_eq!(edited.measurements.segment_lengths_km, vec![2.0]);
        tool.set_active(false);
        assert!(!tool.is_editing());
    }

    #[test]
    fn cancel_keeps_tool_armed() {
        let mut tool = active_tool(ShapeType::Line);
        tool.commit_point(Vec3::ZERO);
        tool.cancel();
        assert!(tool.is_active());
        assert!(tool.vertices().is_empty());
    }
}
