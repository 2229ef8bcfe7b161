//! Interactive tools for terrain geometry authoring and measurement.
//!
//! All tools share a click-to-terrain raycast and coordinate through the
//! unified tool manager: only one tool owns the pointer at a time.
//!
//! ```text
//! Keyboard/frontend input
//!   └─> ToolSelectionEvent
//!       └─> handle_tool_selection_events()
//!           ├─> Deactivate all tools
//!           └─> Arm the requested tool
//! ```
//!
//! The drawing tool is the workhorse: measurement and slicing both arm it
//! and consume the `DrawEnded` events it publishes.

/// Click-driven shape authoring with live preview and edit mode.
pub mod draw;

/// Distance measurement overlay built on finished line drawings.
pub mod measure;

/// Ray intersection helpers shared by picking and sketch dragging.
pub mod ray;

/// Click selection of scene objects with exact-restore highlighting.
pub mod selection;

/// Unified tool manager coordinating exclusive tool activation and state.
pub mod tool_manager;
