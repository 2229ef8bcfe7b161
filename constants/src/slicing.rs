/// Default vertical extent of a slicing box, metres.
pub const SLICING_BOX_HEIGHT: f32 = 10_000.0;
/// Default lower bound of a slicing box relative to the terrain, metres.
pub const SLICING_BOX_LOWER_LIMIT: f32 = -5_000.0;
/// A box side may not shrink below this, metres.
pub const SLICING_BOX_MIN_SIZE: f32 = 450.0;

/// Ground reference separating the two sphere-anchor orientation cases.
/// Bounding-sphere centers below this height are treated as below-ground
/// content and keep their own model-matrix orientation.
pub const DEFAULT_MIN_TERRAIN_HEIGHT: f32 = -100_000.0;
