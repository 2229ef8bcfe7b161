use crate::engine::camera::CameraInputLock;
use crate::engine::scene::heightmap::sample_heightmap_bilinear;
use crate::engine::scene::terrain::{TerrainBounds, TerrainHeightmap};
use bevy::input::mouse::MouseScrollUnit;
use bevy::math::EulerRot;
use bevy::{
    input::mouse::{MouseMotion, MouseWheel},
    prelude::*,
};

#[derive(Resource)]
pub struct ViewportCamera {
    pub focus_point: Vec3,
    pub height: f32,
    pub rotation: Quat,
    pub last_mouse_pos: Vec2,
    pub ground_height: f32,
    pub pitch: f32,
    pub yaw: f32,
    // Smoothing for terrain intersection
    pub last_intersection: Option<Vec3>,
    pub intersection_smooth_factor: f32,
}

impl ViewportCamera {
    pub fn with_bounds(bounds: &TerrainBounds) -> Self {
        let center = bounds.center();
        let size = bounds.size();
        let ground_height = bounds.ground_height();

        Self {
            focus_point: center,
            height: size.length() * 0.2,
            rotation: Quat::from_rotation_x(-0.6),
            last_mouse_pos: Vec2::ZERO,
            ground_height,
            pitch: -0.6,
            yaw: 0.0,
            last_intersection: None,
            intersection_smooth_factor: 0.15,
        }
    }

    /// Intersect the cursor ray with the terrain surface. Marches the
    /// heightmap when one is loaded, otherwise falls back to a flat plane at
    /// ground height. The result is temporally smoothed to reduce jitter.
    pub fn mouse_to_ground_plane(
        &mut self,
        cursor_pos: Vec2,
        camera: &Camera,
        camera_transform: &GlobalTransform,
        heightmap_image: Option<&Image>,
        bounds: &TerrainBounds,
    ) -> Option<Vec3> {
        let ray = camera
            .viewport_to_world(camera_transform, cursor_pos)
            .ok()?;

        let intersection = if let Some(heightmap) = heightmap_image {
            self.precise_heightmap_intersection(&ray, heightmap, bounds)
        } else {
            self.flat_plane_intersection(&ray)
        };

        match (intersection, self.last_intersection) {
            (Some(new_pos), Some(last_pos)) => {
                let smoothed = last_pos.lerp(new_pos, self.intersection_smooth_factor);
                self.last_intersection = Some(smoothed);
                Some(smoothed)
            }
            (Some(new_pos), None) => {
                self.last_intersection = Some(new_pos);
                Some(new_pos)
            }
            _ => None,
        }
    }

    fn precise_heightmap_intersection(
        &self,
        ray: &Ray3d,
        heightmap_image: &Image,
        bounds: &TerrainBounds,
    ) -> Option<Vec3> {
        // Adaptive step size based on camera height for better precision
        let base_step = (self.height * 0.01).clamp(0.1, 2.0);
        let mut t = 0.0;
        let max_distance = self.height * 3.0;
        let mut last_height_diff = f32::INFINITY;

        while t < max_distance {
            let test_point = ray.origin + ray.direction * t;

            let norm_x = (test_point.x - bounds.min_x() as f32)
                / (bounds.max_x() - bounds.min_x()) as f32;
            let norm_z = (test_point.z - bounds.min_z() as f32)
                / (bounds.max_z() - bounds.min_z()) as f32;

            if norm_x >= 0.0 && norm_x <= 1.0 && norm_z >= 0.0 && norm_z <= 1.0 {
                let terrain_height =
                    sample_heightmap_bilinear(heightmap_image, norm_x, norm_z, bounds);
                let height_diff = test_point.y - terrain_height;

                // Ray crossed the terrain; refine with binary search
                if height_diff <= 0.0 {
                    if last_height_diff != f32::INFINITY && last_height_diff > 0.0 {
                        let refined_t = self.binary_search_intersection(
                            ray,
                            t - base_step,
                            t,
                            heightmap_image,
                            bounds,
                            5,
                        );
                        let final_point = ray.origin + ray.direction * refined_t;
                        let final_norm_x = (final_point.x - bounds.min_x() as f32)
                            / (bounds.max_x() - bounds.min_x()) as f32;
                        let final_norm_z = (final_point.z - bounds.min_z() as f32)
                            / (bounds.max_z() - bounds.min_z()) as f32;
                        let final_height = sample_heightmap_bilinear(
                            heightmap_image,
                            final_norm_x,
                            final_norm_z,
                            bounds,
                        );

                        return Some(Vec3::new(final_point.x, final_height, final_point.z));
                    } else {
                        return Some(Vec3::new(test_point.x, terrain_height, test_point.z));
                    }
                }
                last_height_diff = height_diff;
            }

            // Smaller steps when close to intersection
            let step_size =
                if last_height_diff != f32::INFINITY && last_height_diff < base_step * 2.0 {
                    base_step * 0.1
                } else {
                    base_step
                };

            t += step_size;
        }

        None
    }

    fn binary_search_intersection(
        &self,
        ray: &Ray3d,
        t_start: f32,
        t_end: f32,
        heightmap_image: &Image,
        bounds: &TerrainBounds,
        iterations: usize,
    ) -> f32 {
        let mut low = t_start;
        let mut high = t_end;

        for _ in 0..iterations {
            let mid = (low + high) * 0.5;
            let test_point = ray.origin + ray.direction * mid;

            let norm_x = (test_point.x - bounds.min_x() as f32)
                / (bounds.max_x() - bounds.min_x()) as f32;
            let norm_z = (test_point.z - bounds.min_z() as f32)
                / (bounds.max_z() - bounds.min_z()) as f32;

            if norm_x >= 0.0 && norm_x <= 1.0 && norm_z >= 0.0 && norm_z <= 1.0 {
                let terrain_height =
                    sample_heightmap_bilinear(heightmap_image, norm_x, norm_z, bounds);

                if test_point.y > terrain_height {
                    low = mid;
                } else {
                    high = mid;
                }
            }
        }

        (low + high) * 0.5
    }

    fn flat_plane_intersection(&self, ray: &Ray3d) -> Option<Vec3> {
        let plane_y = self.ground_height;
        if ray.direction.y.abs() < 0.001 {
            return None;
        }
        let t = (plane_y - ray.origin.y) / ray.direction.y;
        if t > 0.0 {
            Some(ray.origin + ray.direction * t)
        } else {
            None
        }
    }
}

impl Default for ViewportCamera {
    fn default() -> Self {
        Self {
            focus_point: Vec3::ZERO,
            height: 100.0,
            rotation: Quat::default(),
            last_mouse_pos: Vec2::ZERO,
            ground_height: 0.0,
            pitch: -0.6,
            yaw: 0.0,
            last_intersection: None,
            intersection_smooth_factor: 0.15,
        }
    }
}

pub fn camera_controller(
    mut camera_query: Query<&mut Transform, With<Camera3d>>,
    mut viewport_camera: ResMut<ViewportCamera>,
    input_lock: Res<CameraInputLock>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut mouse_motion: EventReader<MouseMotion>,
    mut scroll_events: EventReader<MouseWheel>,
    mut cursor_moved: EventReader<CursorMoved>,
    keyboard: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
) {
    let Ok(mut camera_transform) = camera_query.single_mut() else {
        return;
    };

    for cursor in cursor_moved.read() {
        viewport_camera.last_mouse_pos = cursor.position;
    }

    let mouse_delta: Vec2 = mouse_motion.read().map(|m| m.delta).sum();
    let mut scroll_accum = 0.0;
    for ev in scroll_events.read() {
        scroll_accum += match ev.unit {
            MouseScrollUnit::Line => ev.y * 1.0,
            MouseScrollUnit::Pixel => ev.y * 0.05,
        };
    }

    // A sketch drag owns the pointer; keep the camera still until released
    if !input_lock.locked {
        // Right drag looks around
        if mouse_button.pressed(MouseButton::Right) && mouse_delta != Vec2::ZERO {
            let yaw_sens = 0.0035;
            let pitch_sens = 0.0030;
            viewport_camera.yaw += -mouse_delta.x * yaw_sens;
            viewport_camera.pitch += -mouse_delta.y * pitch_sens;
            viewport_camera.pitch = viewport_camera.pitch.clamp(-1.55, 1.55);
        }

        // Scroll dollies along the view direction
        if scroll_accum.abs() > f32::EPSILON {
            let dolly_speed = (viewport_camera.height * 0.2).clamp(0.5, 500.0);
            let view_rot =
                Quat::from_euler(EulerRot::YXZ, viewport_camera.yaw, viewport_camera.pitch, 0.0);
            let forward = (view_rot * Vec3::Z).normalize();
            viewport_camera.focus_point -= forward * (scroll_accum * dolly_speed);
        }

        let mut move_input = Vec3::ZERO;
        if keyboard.pressed(KeyCode::KeyW) {
            move_input.z -= 1.0;
        }
        if keyboard.pressed(KeyCode::KeyS) {
            move_input.z += 1.0;
        }
        if keyboard.pressed(KeyCode::KeyD) {
            move_input.x += 1.0;
        }
        if keyboard.pressed(KeyCode::KeyA) {
            move_input.x -= 1.0;
        }
        if keyboard.pressed(KeyCode::KeyE) {
            move_input.y += 1.0;
        }
        if keyboard.pressed(KeyCode::KeyQ) {
            move_input.y -= 1.0;
        }

        if move_input != Vec3::ZERO {
            let view_rot =
                Quat::from_euler(EulerRot::YXZ, viewport_camera.yaw, viewport_camera.pitch, 0.0);
            let forward = (view_rot * Vec3::Z).normalize();
            let right = (view_rot * Vec3::X).normalize();
            let up = Vec3::Y;

            // Shift = faster, ctrl = slower
            let mut speed = (viewport_camera.height * 1.0).clamp(2.0, 200.0);
            if keyboard.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]) {
                speed *= 3.5;
            }
            if keyboard.any_pressed([KeyCode::ControlLeft, KeyCode::ControlRight]) {
                speed *= 0.25;
            }

            let world_delta = right * move_input.x + up * move_input.y + forward * move_input.z;
            viewport_camera.focus_point += world_delta.normalize() * speed * time.delta_secs();
        }
    }

    let target_rot =
        Quat::from_euler(EulerRot::YXZ, viewport_camera.yaw, viewport_camera.pitch, 0.0);
    let target_pos = viewport_camera.focus_point;

    let lerp_speed = 12.0 * time.delta_secs();
    camera_transform.translation = camera_transform
        .translation
        .lerp(target_pos, lerp_speed.min(1.0));
    camera_transform.rotation = camera_transform
        .rotation
        .slerp(target_rot, lerp_speed.min(1.0));
}

/// Shared cursor-to-terrain helper for the pointer tools.
pub fn cursor_terrain_hit(
    viewport_camera: &mut ViewportCamera,
    window: &Window,
    camera: &Camera,
    camera_transform: &GlobalTransform,
    heightmap: &TerrainHeightmap,
    images: &Assets<Image>,
    bounds: &TerrainBounds,
) -> Option<Vec3> {
    let cursor = window.cursor_position()?;
    let image = heightmap.handle.as_ref().and_then(|h| images.get(h));
    viewport_camera.mouse_to_ground_plane(cursor, camera, camera_transform, image, bounds)
}
