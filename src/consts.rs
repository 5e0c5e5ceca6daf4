//! Shared constants for the editor crate.

use uuid::Uuid;

use crate::tree::NodeId;

// ── Identity ────────────────────────────────────────────────────

/// Id of the page root. The canvas node and its drop zone share it.
pub const CANVAS_ID: NodeId = Uuid::nil();

// ── Gestures ────────────────────────────────────────────────────

/// Travel in pixels below which a node gesture counts as a click, not a drag.
pub const DRAG_THRESHOLD: f64 = 4.0;

// ── Cursors ─────────────────────────────────────────────────────

/// Cursor shown while a gesture is active.
pub const CURSOR_GRABBING: &str = "grabbing";

/// Cursor restored when a gesture ends.
pub const CURSOR_DEFAULT: &str = "default";

// ── DOM binding ─────────────────────────────────────────────────

/// Attribute marking elements that start a drag on pointer-down.
pub const ATTR_DRAGGABLE: &str = "data-draggable";

/// Attribute carrying a palette entry's HTML tag.
pub const ATTR_COMPONENT_TYPE: &str = "data-component-type";

/// Attribute carrying a rendered element's node id.
pub const ATTR_NODE_ID: &str = "data-node-id";

/// Class added to the resolved drop zone while hovering.
pub const CLASS_ZONE_ACTIVE: &str = "pagecraft-drop-zone-active";

/// Opacity of the ghost proxy.
pub const GHOST_OPACITY: &str = "0.6";

/// Stacking order of the ghost proxy; above all editor chrome.
pub const GHOST_Z_INDEX: &str = "10000";
