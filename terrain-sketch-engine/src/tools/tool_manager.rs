use crate::engine::geometry::ShapeType;
use crate::engine::scene::terrain::BackgroundRegistry;
use crate::slicing::{Slicer, resolve_background};
use crate::tools::draw::DrawRequest;
use crate::tools::measure::{MeasureElement, MeasureTool, clear_measurement};
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Enumeration of available tools in the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolType {
    Draw,
    Measure,
    Slice,
}

impl ToolType {
    /// Convert string identifier to tool type for frontend compatibility.
    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draw" => Some(Self::Draw),
            "measure" => Some(Self::Measure),
            "slice" => Some(Self::Slice),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draw => "draw",
            Self::Measure => "measure",
            Self::Slice => "slice",
        }
    }
}

/// Resource tracking the currently active tool. At most one tool owns the
/// pointer at a time.
#[derive(Resource, Default)]
pub struct ToolManager {
    active_tool: Option<ToolType>,
}

impl ToolManager {
    /// Activate specified tool, deactivating the previous tool if necessary.
    /// Returns false when the tool was already active.
    pub fn activate_tool(&mut self, tool_type: ToolType) -> bool {
        if self.active_tool == Some(tool_type) {
            return false;
        }
        self.active_tool = Some(tool_type);
        info!("tool activated: {}", tool_type.as_str());
        true
    }

    pub fn deactivate_current_tool(&mut self) -> Option<ToolType> {
        let previous = self.active_tool.take();
        if let Some(tool) = previous {
            info!("tool deactivated: {}", tool.as_str());
        }
        previous
    }

    pub fn active_tool(&self) -> Option<ToolType> {
        self.active_tool
    }

    pub fn is_tool_active(&self, tool_type: ToolType) -> bool {
        self.active_tool == Some(tool_type)
    }
}

/// Tool selection from keyboard shortcuts or the embedding frontend.
#[derive(Event)]
pub struct ToolSelectionEvent {
    pub tool_type: ToolType,
    pub source: ToolSelectionSource,
}

/// Drop the current tool without picking a new one.
#[derive(Event)]
pub struct ToolDeselectionEvent;

#[derive(Debug, Clone, Copy)]
pub enum ToolSelectionSource {
    Api,
    Keyboard,
}

pub struct ToolManagerPlugin;

impl Plugin for ToolManagerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ToolManager>()
            .add_event::<ToolSelectionEvent>()
            .add_event::<ToolDeselectionEvent>()
            .add_systems(
                Update,
                (
                    handle_tool_keyboard_shortcuts,
                    handle_tool_selection_events,
                    handle_tool_deselection_events,
                )
                    .chain(),
            );
    }
}

/// Switches the active tool, tearing the previous one down first. The
/// previous tool's cut is cleared along with its sketches, so no clipping
/// outlives the tool that authored it.
pub fn handle_tool_selection_events(
    mut commands: Commands,
    mut events: EventReader<ToolSelectionEvent>,
    mut tool_manager: ResMut<ToolManager>,
    mut measure: ResMut<MeasureTool>,
    mut slicer: ResMut<Slicer>,
    registry: Res<BackgroundRegistry>,
    mut draw_requests: EventWriter<DrawRequest>,
    measure_elements: Query<Entity, With<MeasureElement>>,
) {
    for event in events.read() {
        if !tool_manager.activate_tool(event.tool_type) {
            continue;
        }

        // Clean slate before arming the requested tool
        draw_requests.write(DrawRequest::Deactivate);
        measure.set_active(false);
        clear_measurement(&mut commands, &mut measure, &measure_elements);
        slicer.deactivate();

        match event.tool_type {
            ToolType::Draw => {
                draw_requests.write(DrawRequest::Activate(ShapeType::Line));
                info!("draw tool armed via {:?}", event.source);
            }
            ToolType::Measure => {
                measure.set_active(true);
                draw_requests.write(DrawRequest::Activate(ShapeType::Line));
                info!("measure tool armed via {:?}", event.source);
            }
            ToolType::Slice => {
                // Slicing needs the terrain layer it will cut through
                if let Err(error) = resolve_background(&registry, "terrain") {
                    warn!("cannot arm slice tool: {error}");
                    tool_manager.deactivate_current_tool();
                    continue;
                }
                // Slicing consumes finished shapes; arm drawing in line mode
                draw_requests.write(DrawRequest::Activate(ShapeType::Line));
                info!("slice tool armed via {:?}", event.source);
            }
        }
    }
}

pub fn handle_tool_deselection_events(
    mut commands: Commands,
    mut events: EventReader<ToolDeselectionEvent>,
    mut tool_manager: ResMut<ToolManager>,
    mut measure: ResMut<MeasureTool>,
    mut slicer: ResMut<Slicer>,
    mut draw_requests: EventWriter<DrawRequest>,
    measure_elements: Query<Entity, With<MeasureElement>>,
) {
    if events.read().count() == 0 {
        return;
    }
    if tool_manager.deactivate_current_tool().is_some() {
        draw_requests.write(DrawRequest::Deactivate);
        measure.set_active(false);
        clear_measurement(&mut commands, &mut measure, &measure_elements);
        slicer.deactivate();
    }
}

/// Shape kind bound to a number key. Measuring stays fixed to lines, so the
/// digits only apply while drawing or slicing.
pub fn shape_type_for_key(key: KeyCode) -> Option<ShapeType> {
    match key {
        KeyCode::Digit1 => Some(ShapeType::Point),
        KeyCode::Digit2 => Some(ShapeType::Line),
        KeyCode::Digit3 => Some(ShapeType::Polygon),
        KeyCode::Digit4 => Some(ShapeType::Rectangle),
        _ => None,
    }
}

/// Keyboard shortcuts for tool selection and shape kind.
pub fn handle_tool_keyboard_shortcuts(
    keyboard: Res<ButtonInput<KeyCode>>,
    tool_manager: Res<ToolManager>,
    mut tool_events: EventWriter<ToolSelectionEvent>,
    mut deselect_events: EventWriter<ToolDeselectionEvent>,
    mut draw_requests: EventWriter<DrawRequest>,
) {
    for (key, tool_type) in [
        (KeyCode::KeyD, ToolType::Draw),
        (KeyCode::KeyK, ToolType::Measure),
        (KeyCode::KeyC, ToolType::Slice),
    ] {
        if keyboard.just_pressed(key) {
            tool_events.write(ToolSelectionEvent {
                tool_type,
                source: ToolSelectionSource::Keyboard,
            });
        }
    }

    if matches!(
        tool_manager.active_tool(),
        Some(ToolType::Draw) | Some(ToolType::Slice)
    ) {
        for key in keyboard.get_just_pressed() {
            if let Some(shape_type) = shape_type_for_key(*key) {
                // A slice session only understands line and box cuts
                if tool_manager.is_tool_active(ToolType::Slice)
                    && !matches!(shape_type, ShapeType::Line | ShapeType::Rectangle)
                {
                    continue;
                }
                draw_requests.write(DrawRequest::Activate(shape_type));
            }
        }
    }

    if keyboard.just_pressed(KeyCode::Escape) {
        deselect_events.write(ToolDeselectionEvent);
    }
}
