use bevy::platform::collections::HashMap;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// 3D spatial bounds defining scene extents in world coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundsData {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
}

/// Extents of the loaded terrain tile. Drives camera framing, pointer
/// raycasting and heightmap denormalisation.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct TerrainBounds {
    pub bounds: BoundsData,
}

impl TerrainBounds {
    pub fn new(bounds: BoundsData) -> Self {
        Self { bounds }
    }

    /// Center point for camera positioning and scene navigation.
    pub fn center(&self) -> Vec3 {
        Vec3::new(
            ((self.bounds.max_x + self.bounds.min_x) * 0.5) as f32,
            ((self.bounds.max_y + self.bounds.min_y) * 0.5) as f32,
            ((self.bounds.max_z + self.bounds.min_z) * 0.5) as f32,
        )
    }

    pub fn size(&self) -> Vec3 {
        Vec3::new(
            (self.bounds.max_x - self.bounds.min_x) as f32,
            (self.bounds.max_y - self.bounds.min_y) as f32,
            (self.bounds.max_z - self.bounds.min_z) as f32,
        )
    }

    pub fn ground_height(&self) -> f32 {
        self.bounds.min_y as f32
    }

    pub fn min_x(&self) -> f64 {
        self.bounds.min_x
    }
    pub fn max_x(&self) -> f64 {
        self.bounds.max_x
    }
    pub fn min_y(&self) -> f64 {
        self.bounds.min_y
    }
    pub fn max_y(&self) -> f64 {
        self.bounds.max_y
    }
    pub fn min_z(&self) -> f64 {
        self.bounds.min_z
    }
    pub fn max_z(&self) -> f64 {
        self.bounds.max_z
    }
}

impl Default for TerrainBounds {
    fn default() -> Self {
        Self {
            bounds: BoundsData {
                min_x: -500.0,
                max_x: 500.0,
                min_y: 0.0,
                max_y: 100.0,
                min_z: -500.0,
                max_z: 500.0,
            },
        }
    }
}

/// Optional elevation texture for the terrain tile. When absent the pointer
/// falls back to a flat plane at ground height.
#[derive(Resource, Default)]
pub struct TerrainHeightmap {
    pub handle: Option<Handle<Image>>,
}

/// Named background layers (terrain tilesets) that slicing can be scoped to.
#[derive(Resource, Default)]
pub struct BackgroundRegistry {
    layers: HashMap<String, Entity>,
}

impl BackgroundRegistry {
    pub fn register(&mut self, id: impl Into<String>, entity: Entity) {
        self.layers.insert(id.into(), entity);
    }

    pub fn get(&self, id: &str) -> Option<Entity> {
        self.layers.get(id).copied()
    }
}
