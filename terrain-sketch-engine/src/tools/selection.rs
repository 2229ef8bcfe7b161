//! Click selection with exact-restore highlighting.
//!
//! Drill picks through tool-owned geometry to the scene object underneath,
//! stashes the object's material colour and swaps in the highlight colour.
//! Selecting something else (or empty space) restores the stashed colour
//! exactly, so repeated select/deselect cycles never drift the palette.

use crate::engine::scene::renderables::{PickIgnore, Pickable};
use crate::tools::draw::DrawTool;
use crate::tools::measure::MeasureTool;
use crate::tools::ray::ray_hits_obb;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use constants::render_settings::OBJECT_HIGHLIGHT_COLOR;

/// What a pick decision asks the material layer to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightTransition {
    /// Clicked the already selected object, or empty space with nothing
    /// selected.
    NoOp,
    Select {
        apply: Entity,
    },
    Replace {
        restore: Entity,
        apply: Entity,
    },
    Clear {
        restore: Entity,
    },
}

/// At most one object is highlighted at a time.
#[derive(Resource, Default)]
pub struct Highlighter {
    selected: Option<Entity>,
    saved_color: Option<Color>,
}

impl Highlighter {
    pub fn selected(&self) -> Option<Entity> {
        self.selected
    }

    pub fn saved_color(&self) -> Option<Color> {
        self.saved_color
    }

    /// Decides the transition for a pick result. The caller applies the
    /// material changes and reports the stashed colour back through
    /// `store_color`.
    pub fn transition(&mut self, hit: Option<Entity>) -> HighlightTransition {
        match (self.selected, hit) {
            (None, None) => HighlightTransition::NoOp,
            (Some(current), Some(new)) if current == new => HighlightTransition::NoOp,
            (None, Some(new)) => {
                self.selected = Some(new);
                self.saved_color = None;
                HighlightTransition::Select { apply: new }
            }
            (Some(current), Some(new)) => {
                self.selected = Some(new);
                self.saved_color = None;
                HighlightTransition::Replace {
                    restore: current,
                    apply: new,
                }
            }
            (Some(current), None) => {
                self.selected = None;
                HighlightTransition::Clear { restore: current }
            }
        }
    }

    pub fn store_color(&mut self, color: Color) {
        self.saved_color = Some(color);
    }

    pub fn take_saved_color(&mut self) -> Option<Color> {
        self.saved_color.take()
    }
}

pub struct SelectionPlugin;

impl Plugin for SelectionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Highlighter>()
            .add_systems(Update, pick_on_click);
    }
}

/// Left-click drill pick. Inactive while a drawing or measuring session owns
/// the pointer.
pub fn pick_on_click(
    buttons: Res<ButtonInput<MouseButton>>,
    draw: Res<DrawTool>,
    measure: Res<MeasureTool>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&GlobalTransform, &Camera), With<Camera3d>>,
    targets: Query<(Entity, &GlobalTransform, &Pickable, Option<&PickIgnore>)>,
    mut highlighter: ResMut<Highlighter>,
    material_handles: Query<&MeshMaterial3d<StandardMaterial>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if !buttons.just_pressed(MouseButton::Left) {
        return;
    }
    if draw.is_active() || measure.is_active() {
        return;
    }

    let Ok(window) = windows.single() else {
        return;
    };
    let Some(cursor_pos) = window.cursor_position() else {
        return;
    };
    let Ok((cam_xf, camera)) = cameras.single() else {
        return;
    };
    let Ok(ray) = camera.viewport_to_world(cam_xf, cursor_pos) else {
        return;
    };

    let hit = drill_pick(ray.origin, ray.direction.as_vec3(), &targets);
    apply_transition(hit, &mut highlighter, &material_handles, &mut materials);
}

/// Front-to-back pick that ignores tool-owned entities.
pub fn drill_pick(
    origin: Vec3,
    dir: Vec3,
    targets: &Query<(Entity, &GlobalTransform, &Pickable, Option<&PickIgnore>)>,
) -> Option<Entity> {
    let mut hits: Vec<(Entity, f32, bool)> = targets
        .iter()
        .filter_map(|(entity, xf, pickable, ignore)| {
            ray_hits_obb(origin, dir, xf, pickable.size)
                .filter(|&t| t > 0.0)
                .map(|t| (entity, t, ignore.is_some()))
        })
        .collect();
    hits.sort_by(|a, b| a.1.total_cmp(&b.1));
    hits.into_iter()
        .find(|(_, _, ignored)| !ignored)
        .map(|(entity, _, _)| entity)
}

fn apply_transition(
    hit: Option<Entity>,
    highlighter: &mut Highlighter,
    material_handles: &Query<&MeshMaterial3d<StandardMaterial>>,
    materials: &mut Assets<StandardMaterial>,
) {
    let saved = highlighter.saved_color();
    match highlighter.transition(hit) {
        HighlightTransition::NoOp => {}
        HighlightTransition::Select { apply } => {
            stash_and_highlight(apply, highlighter, material_handles, materials);
        }
        HighlightTransition::Replace { restore, apply } => {
            restore_color(restore, saved, material_handles, materials);
            stash_and_highlight(apply, highlighter, material_handles, materials);
        }
        HighlightTransition::Clear { restore } => {
            restore_color(restore, saved, material_handles, materials);
            highlighter.take_saved_color();
        }
    }
}

fn stash_and_highlight(
    entity: Entity,
    highlighter: &mut Highlighter,
    material_handles: &Query<&MeshMaterial3d<StandardMaterial>>,
    materials: &mut Assets<StandardMaterial>,
) {
    let Ok(handle) = material_handles.get(entity) else {
        return;
    };
    let Some(material) = materials.get_mut(&handle.0) else {
        return;
    };
    highlighter.store_color(material.base_color);
    // Preserve the object's own transparency
    let alpha = material.base_color.alpha();
    material.base_color = OBJECT_HIGHLIGHT_COLOR.with_alpha(alpha);
    info!("selected {entity}");
}

fn restore_color(
    entity: Entity,
    saved: Option<Color>,
    material_handles: &Query<&MeshMaterial3d<StandardMaterial>>,
    materials: &mut Assets<StandardMaterial>,
) {
    let Some(color) = saved else {
        return;
    };
    let Ok(handle) = material_handles.get(entity) else {
        return;
    };
    if let Some(material) = materials.get_mut(&handle.0) {
        material.base_color = color;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(index: u32) -> Entity {
        Entity::from_raw(index)
    }

    #[test]
    fn select_then_reselect_is_noop() {
        let mut h = Highlighter::default();
        let a = entity(1);
        assert_eq!(h.transition(Some(a)), HighlightTransition::Select { apply: a });
        assert_eq!(h.transition(Some(a)), HighlightTransition::NoOp);
        assert_eq!(h.selected(), Some(a));
    }

    #[test]
    fn selection_is_exclusive() {
        let mut h = Highlighter::default();
        let a = entity(1);
        let b = entity(2);
        h.transition(Some(a));
        h.store_color(Color::srgb(0.1, 0.2, 0.3));
        assert_eq!(
            h.transition(Some(b)),
            HighlightTransition::Replace { restore: a, apply: b }
        );
        assert_eq!(h.selected(), Some(b));
        // The stash slot was handed over to the new selection
        assert_eq!(h.saved_color(), None);
    }

    #[test]
    fn empty_space_clears_selection() {
        let mut h = Highlighter::default();
        let a = entity(1);
        h.transition(Some(a));
        h.store_color(Color::srgb(0.5, 0.5, 0.5));
        assert_eq!(h.transition(None), HighlightTransition::Clear { restore: a });
        assert_eq!(h.selected(), None);
        // Clicking empty space again does nothing
        assert_eq!(h.transition(None), HighlightTransition::NoOp);
    }

    #[test]
    fn stashed_color_round_trips_exactly() {
        let mut h = Highlighter::default();
        let a = entity(1);
        h.transition(Some(a));
        let original = Color::srgba(0.12, 0.34, 0.56, 0.78);
        h.store_color(original);
        assert_eq!(h.saved_color(), Some(original));
        h.transition(None);
        // The caller restores with the saved colour before it is dropped
    }
}
