/// Shared tuning constants for the terrain sketch engine.
pub mod render_settings;
pub mod slicing;
pub mod texture;
