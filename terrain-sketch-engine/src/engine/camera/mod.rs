//! Viewport camera system for terrain scene navigation.
//!
//! Provides fly camera controls with heightmap-aware ground plane
//! intersection, smooth interpolation, and keyboard/mouse input handling.

/// Viewport camera resource and controller system for scene navigation.
pub mod viewport_camera;

use bevy::prelude::*;

/// Set while a sketch drag is in progress so camera input does not fight the
/// pointer over the same mouse events.
#[derive(Resource, Default)]
pub struct CameraInputLock {
    pub locked: bool,
}
