use bevy::asset::AssetMetaCheck;
use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use bevy::render::view::RenderLayers;
use bevy::window::PresentMode;
use constants::texture::TEXTURE_SIZE;

mod engine;
mod slicing;
mod tools;

use engine::camera::CameraInputLock;
use engine::camera::viewport_camera::{ViewportCamera, camera_controller};
use engine::scene::renderables::Pickable;
use engine::scene::terrain::{BackgroundRegistry, TerrainBounds, TerrainHeightmap};
use slicing::SlicingPlugin;
use slicing::planes::{SliceTarget, SliceTargetKind, classify_tileset};
use tools::draw::DrawToolPlugin;
use tools::measure::MeasureToolPlugin;
use tools::selection::SelectionPlugin;
use tools::tool_manager::ToolManagerPlugin;

fn main() {
    App::new()
        .add_plugins(create_default_plugins())
        .add_plugins((
            DrawToolPlugin,
            MeasureToolPlugin,
            SelectionPlugin,
            SlicingPlugin,
            ToolManagerPlugin,
        ))
        .init_resource::<TerrainHeightmap>()
        .init_resource::<BackgroundRegistry>()
        .init_resource::<CameraInputLock>()
        .insert_resource(TerrainBounds::default())
        .add_systems(Startup, setup)
        .add_systems(Update, camera_controller)
        .run();
}

fn create_default_plugins() -> impl PluginGroup {
    let window_config = WindowPlugin {
        primary_window: Some(Window {
            present_mode: PresentMode::AutoVsync,
            title: "terrain sketch engine".into(),
            ..default()
        }),
        ..default()
    };

    let asset_config = AssetPlugin {
        meta_check: AssetMetaCheck::Never,
        ..default()
    };

    DefaultPlugins.set(window_config).set(asset_config)
}

fn setup(
    mut commands: Commands,
    bounds: Res<TerrainBounds>,
    mut registry: ResMut<BackgroundRegistry>,
    mut images: ResMut<Assets<Image>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.insert_resource(TerrainHeightmap {
        handle: Some(images.add(generate_heightmap_image())),
    });
    spawn_lighting(&mut commands);
    spawn_camera(&mut commands, &bounds);
    spawn_terrain(&mut commands, &bounds, &mut registry, &mut meshes, &mut materials);
    spawn_demo_objects(&mut commands, &mut meshes, &mut materials);
}

fn spawn_lighting(commands: &mut Commands) {
    commands.spawn((
        DirectionalLight {
            shadows_enabled: false,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(
            EulerRot::ZYX,
            0.0,
            1.0,
            -std::f32::consts::FRAC_PI_4,
        )),
    ));
}

fn spawn_camera(commands: &mut Commands, bounds: &TerrainBounds) {
    let center = bounds.center();
    commands.spawn((
        Camera3d::default(),
        Transform::from_translation(center + Vec3::new(0.0, 200.0, 300.0))
            .looking_at(center, Vec3::Y),
        // Sketch and overlay geometry lives on layer 1
        RenderLayers::from_layers(&[0, 1]),
    ));
    commands.insert_resource(ViewportCamera::with_bounds(bounds));
}

/// Rolling-hill elevation over the unit square, normalised to 0..1. The
/// heightmap texture and the rendered terrain mesh both sample it so the
/// pointer raymarch lands on the surface the user sees.
fn terrain_height_norm(nx: f32, nz: f32) -> f32 {
    use std::f32::consts::TAU;
    0.5 + 0.25 * (nx * TAU * 1.5).sin() * (nz * TAU * 1.5).cos()
}

/// Single-channel f32 elevation texture, kept CPU-side for sampling.
fn generate_heightmap_image() -> Image {
    let mut data = Vec::with_capacity(TEXTURE_SIZE * TEXTURE_SIZE * 4);
    for z in 0..TEXTURE_SIZE {
        for x in 0..TEXTURE_SIZE {
            let nx = x as f32 / (TEXTURE_SIZE - 1) as f32;
            let nz = z as f32 / (TEXTURE_SIZE - 1) as f32;
            data.extend_from_slice(&terrain_height_norm(nx, nz).to_le_bytes());
        }
    }
    Image::new(
        Extent3d {
            width: TEXTURE_SIZE as u32,
            height: TEXTURE_SIZE as u32,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        data,
        TextureFormat::R32Float,
        RenderAssetUsages::MAIN_WORLD,
    )
}

/// Grid mesh displaced by the same elevation function the heightmap stores.
fn terrain_mesh(bounds: &TerrainBounds) -> Mesh {
    const GRID: usize = 64;
    let min_x = bounds.min_x() as f32;
    let min_z = bounds.min_z() as f32;
    let size = bounds.size();
    let y_min = bounds.min_y() as f32;
    let y_span = (bounds.max_y() - bounds.min_y()) as f32;

    let mut positions = Vec::with_capacity((GRID + 1) * (GRID + 1));
    let mut normals = Vec::with_capacity((GRID + 1) * (GRID + 1));
    for z in 0..=GRID {
        for x in 0..=GRID {
            let nx = x as f32 / GRID as f32;
            let nz = z as f32 / GRID as f32;
            let y = y_min + terrain_height_norm(nx, nz) * y_span;
            positions.push([min_x + nx * size.x, y, min_z + nz * size.z]);
            normals.push([0.0, 1.0, 0.0]);
        }
    }
    let mut indices = Vec::with_capacity(GRID * GRID * 6);
    let row = (GRID + 1) as u32;
    for z in 0..GRID as u32 {
        for x in 0..GRID as u32 {
            let i = z * row + x;
            indices.extend_from_slice(&[i, i + row, i + 1, i + 1, i + row, i + row + 1]);
        }
    }

    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::default(),
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_indices(Indices::U32(indices));
    mesh
}

fn spawn_terrain(
    commands: &mut Commands,
    bounds: &TerrainBounds,
    registry: &mut BackgroundRegistry,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
) {
    let terrain = commands
        .spawn((
            Mesh3d(meshes.add(terrain_mesh(bounds))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: Color::srgb(0.35, 0.42, 0.3),
                perceptual_roughness: 1.0,
                ..default()
            })),
            Transform::IDENTITY,
            SliceTarget::new(SliceTargetKind::Terrain),
        ))
        .id();
    registry.register("terrain", terrain);
}

/// A few pickable objects exercising each slicing anchor kind.
fn spawn_demo_objects(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
) {
    // Object carrying a real root transform
    let root = Transform::from_xyz(-120.0, 10.0, 60.0).with_rotation(Quat::from_rotation_y(0.4));
    commands.spawn((
        Mesh3d(meshes.add(Cuboid::new(40.0, 20.0, 30.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.7, 0.3, 0.2),
            ..default()
        })),
        root,
        Pickable::new(Vec3::new(40.0, 20.0, 30.0)),
        SliceTarget::new(classify_tileset(
            &root.compute_matrix(),
            root.translation,
            &Mat4::IDENTITY,
        )),
    ));

    // Identity-rooted object, anchored by its bounding sphere center
    let center = Vec3::new(150.0, 15.0, -80.0);
    commands.spawn((
        Mesh3d(meshes.add(Cuboid::new(30.0, 30.0, 30.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.2, 0.4, 0.7),
            ..default()
        })),
        Transform::from_translation(center),
        Pickable::new(Vec3::splat(30.0)),
        SliceTarget::new(classify_tileset(&Mat4::IDENTITY, center, &Mat4::IDENTITY)),
    ));

    // Volumetric content keeps the opposite side of cuts
    commands.spawn((
        Mesh3d(meshes.add(Cuboid::new(60.0, 40.0, 60.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgba(0.8, 0.8, 0.3, 0.4),
            alpha_mode: AlphaMode::Blend,
            ..default()
        })),
        Transform::from_xyz(0.0, -20.0, 150.0),
        Pickable::new(Vec3::new(60.0, 40.0, 60.0)),
        SliceTarget::new(SliceTargetKind::Volumetric),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::scene::heightmap::sample_heightmap_bilinear;

    #[test]
    fn generated_heightmap_tracks_the_elevation_function() {
        let bounds = TerrainBounds::default();
        let image = generate_heightmap_image();
        for (nx, nz) in [(0.0, 0.0), (0.25, 0.75), (0.5, 0.5), (1.0, 1.0)] {
            let sampled = sample_heightmap_bilinear(&image, nx, nz, &bounds);
            let expected = bounds.min_y() as f32
                + terrain_height_norm(nx, nz) * (bounds.max_y() - bounds.min_y()) as f32;
            assert!((sampled - expected).abs() < 0.5);
            assert!(sampled >= bounds.min_y() as f32 && sampled <= bounds.max_y() as f32);
        }
    }

    #[test]
    fn terrain_mesh_covers_the_full_grid() {
        let mesh = terrain_mesh(&TerrainBounds::default());
        assert_eq!(mesh.count_vertices(), 65 * 65);
    }
}
