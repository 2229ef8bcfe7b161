use bevy::prelude::*;

/// Axis-aligned pick volume, in the entity's local frame. Objects carrying
/// this participate in click selection.
#[derive(Component, Debug, Clone, Copy)]
pub struct Pickable {
    pub size: Vec3,
}

impl Pickable {
    pub fn new(size: Vec3) -> Self {
        Self { size }
    }
}

/// Excluded from drill picking. Carried by sketch visuals, measurement
/// geometry and other tool-owned entities so picking falls through to the
/// scene content beneath them.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct PickIgnore;
