/// Resolution of the terrain heightmap texture.
pub const TEXTURE_SIZE: usize = 2048;
