//! Input model: pointer identity, keys, drag sources, and the gesture state.
//!
//! `GestureState` is the single active drag tracked between pointer-down and
//! pointer-up. It is owned by the drag engine and dropped back to `Idle` when
//! the gesture ends, whether by drop or cancellation.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::{Deserialize, Serialize};

use crate::drag::ZoneId;
use crate::geom::Point;
use crate::kind::ElementKind;
use crate::tree::NodeId;

/// Identifier of a pointer device as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointerId(pub i32);

/// A keyboard key.
///
/// The inner string holds the key name as reported by the browser (e.g. `"Delete"`, `"Escape"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn is_delete(&self) -> bool {
        matches!(self.0.as_str(), "Delete" | "Backspace")
    }

    #[must_use]
    pub fn is_escape(&self) -> bool {
        self.0 == "Escape"
    }

    /// Whether the editor acts on this key while focus is in a text field.
    /// Deletion keys belong to the field there.
    #[must_use]
    pub fn applies_in_text_entry(&self) -> bool {
        !self.is_delete()
    }
}

/// What a drag gesture carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceRef {
    /// A palette template; dropping creates a new element.
    Template,
    /// An element already on the canvas; dropping relocates it.
    Node { id: NodeId },
}

/// The dragged source: what it is and which kind it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragSource {
    pub source: SourceRef,
    pub kind: ElementKind,
}

impl DragSource {
    #[must_use]
    pub fn template(kind: ElementKind) -> Self {
        Self { source: SourceRef::Template, kind }
    }

    #[must_use]
    pub fn node(id: NodeId, kind: ElementKind) -> Self {
        Self { source: SourceRef::Node { id }, kind }
    }

    /// Id of the existing element being dragged, if any.
    #[must_use]
    pub fn node_id(&self) -> Option<NodeId> {
        match self.source {
            SourceRef::Template => None,
            SourceRef::Node { id } => Some(id),
        }
    }
}

/// Coarse phase of the gesture state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Dragging,
}

/// The gesture being tracked.
#[derive(Debug, Clone, Default)]
pub enum GestureState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// A source is being dragged.
    Dragging {
        /// Device that owns the gesture; events from other pointers are ignored.
        pointer: PointerId,
        source: DragSource,
        pointer_start: Point,
        pointer_current: Point,
        /// Whether the pointer ever left `pointer_start` by more than the drag threshold.
        travelled: bool,
        /// Best-matching zone at `pointer_current`, if any.
        resolved_zone: Option<ZoneId>,
    },
}

impl GestureState {
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            Self::Idle => Phase::Idle,
            Self::Dragging { .. } => Phase::Dragging,
        }
    }

    #[must_use]
    pub fn resolved_zone(&self) -> Option<ZoneId> {
        match self {
            Self::Idle => None,
            Self::Dragging { resolved_zone, .. } => *resolved_zone,
        }
    }

    #[must_use]
    pub fn source(&self) -> Option<DragSource> {
        match self {
            Self::Idle => None,
            Self::Dragging { source, .. } => Some(*source),
        }
    }
}
