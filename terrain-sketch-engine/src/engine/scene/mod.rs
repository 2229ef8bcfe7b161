//! Scene content and terrain interaction utilities.
//!
//! Provides terrain bounds and heightmap sampling for pointer raycasting,
//! plus the marker components scene objects need to take part in picking.

/// Bilinear heightmap sampling for terrain intersection queries.
pub mod heightmap;

/// Pickability markers for scene objects.
pub mod renderables;

/// Terrain bounds, heightmap handle and named background layers.
pub mod terrain;
