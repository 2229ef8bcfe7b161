use bevy::prelude::*;

/// Sketch visual sizing, in world units.
pub const DRAW_LINE_WIDTH: f32 = 0.076;
pub const DRAW_VERTEX_SIZE: f32 = 0.08;
pub const EDIT_VERTEX_SIZE: f32 = 0.14;
pub const MOUSE_RAYCAST_INTERSECTION_SPHERE_SIZE: f32 = 0.125;

/// Two clicks closer together than this finish a line/polygon session.
pub const DOUBLE_CLICK_SECS: f32 = 0.25;
/// World-space radius used when drill-picking sketch vertex markers.
pub const SKETCH_PICK_RADIUS: f32 = 0.5;

pub const SKETCH_STROKE_COLOR: Color = Color::srgba(0.0, 0.6, 1.0, 0.75);
pub const SKETCH_FILL_COLOR: Color = Color::srgba(0.0, 0.6, 1.0, 0.3);
pub const SKETCH_VERTEX_COLOR: Color = Color::WHITE;

pub const MEASURE_LINE_COLOR: Color = Color::srgba(0.0, 0.0, 1.0, 0.8);
pub const MEASURE_POINT_COLOR: Color = Color::WHITE;
pub const MEASURE_HIGHLIGHT_COLOR: Color = Color::srgb(1.0, 1.0, 0.0);
pub const MEASURE_HIGHLIGHT_WIDTH_FACTOR: f32 = 2.0;
pub const MEASURE_HIGHLIGHT_POINT_SCALE: f32 = 14.0 / 9.0;

pub const OBJECT_HIGHLIGHT_COLOR: Color = Color::srgb(1.0, 0.6, 0.0);
