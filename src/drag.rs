//! Drag-drop engine: drop zone registry and the per-gesture state machine.
//!
//! The engine consumes pointer input and nothing else. During a gesture it
//! finds every registered zone whose current bounds contain the pointer and
//! resolves the smallest one (the innermost container), subject to each
//! zone's kind filter. On release over a resolved zone it sends a
//! [`DropDecision`] on the channel handed to it at construction.
//!
//! Handlers return the visual [`Effect`]s the host must apply (ghost proxy,
//! highlights, pointer capture, cursor). The engine never touches the document
//! tree; the session reacts to decisions.

#[cfg(test)]
#[path = "drag_test.rs"]
mod drag_test;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::consts::{CURSOR_DEFAULT, CURSOR_GRABBING, DRAG_THRESHOLD};
use crate::error::EditorError;
use crate::geom::{Point, Rect, Region};
use crate::input::{DragSource, GestureState, Phase, PointerId};
use crate::kind::ElementKind;

/// Zone identifier. Equals the owning container's node id.
pub type ZoneId = Uuid;

/// How a zone whose kind filter rejects the dragged source is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectPolicy {
    /// Skip the rejecting zone; the next smallest accepting zone wins.
    #[default]
    FallThrough,
    /// The innermost geometric zone decides; if it rejects, nothing resolves.
    Cancel,
}

/// A registered candidate drop target.
pub struct DropZone {
    pub id: ZoneId,
    /// Allow-list of kinds; empty accepts everything.
    pub accepted_kinds: Vec<ElementKind>,
    /// Bounds observed on the last resolution pass.
    pub bounds: Rect,
    region: Box<dyn Region>,
    seq: u64,
}

impl DropZone {
    #[must_use]
    pub fn accepts(&self, kind: ElementKind) -> bool {
        self.accepted_kinds.is_empty() || self.accepted_kinds.contains(&kind)
    }
}

/// Outcome of a completed gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropDecision {
    pub source: DragSource,
    pub zone: ZoneId,
    /// False when the pointer stayed within the drag threshold (a click).
    pub travelled: bool,
}

/// Visual side effects for the host to apply, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    CapturePointer(PointerId),
    ReleasePointer(PointerId),
    ShowGhost { source: DragSource, at: Point },
    MoveGhost { at: Point },
    RemoveGhost,
    Highlight(ZoneId),
    ClearHighlight(ZoneId),
    SetCursor(String),
}

/// Drop zone registry plus the single active gesture.
pub struct DragDropEngine {
    zones: HashMap<ZoneId, DropZone>,
    next_seq: u64,
    state: GestureState,
    /// Zones the active gesture may not resolve to.
    excluded: HashSet<ZoneId>,
    highlighted: Option<ZoneId>,
    ghost: Option<Point>,
    policy: RejectPolicy,
    decisions: UnboundedSender<DropDecision>,
}

impl DragDropEngine {
    /// Create an idle engine that reports drops on `decisions`.
    #[must_use]
    pub fn new(policy: RejectPolicy, decisions: UnboundedSender<DropDecision>) -> Self {
        Self {
            zones: HashMap::new(),
            next_seq: 0,
            state: GestureState::Idle,
            excluded: HashSet::new(),
            highlighted: None,
            ghost: None,
            policy,
            decisions,
        }
    }

    // --- Registry ---

    /// Register a zone, replacing any existing entry with the same id.
    pub fn register(&mut self, id: ZoneId, region: Box<dyn Region>, accepted_kinds: Vec<ElementKind>) {
        let bounds = region.bounds();
        self.next_seq += 1;
        let seq = self.next_seq;
        self.zones.insert(id, DropZone { id, accepted_kinds, bounds, region, seq });
        tracing::debug!(%id, "drop zone registered");
    }

    /// Remove a zone. Unknown ids are ignored.
    ///
    /// If the zone is the current target of an active gesture, the gesture
    /// loses its target and the highlight is cleared.
    pub fn unregister(&mut self, id: &ZoneId) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.zones.remove(id).is_none() {
            return effects;
        }
        tracing::debug!(%id, "drop zone unregistered");
        if let GestureState::Dragging { resolved_zone, .. } = &mut self.state {
            if *resolved_zone == Some(*id) {
                *resolved_zone = None;
            }
        }
        if self.highlighted == Some(*id) {
            self.set_highlight(None, &mut effects);
        }
        effects
    }

    #[must_use]
    pub fn zone(&self, id: &ZoneId) -> Option<&DropZone> {
        self.zones.get(id)
    }

    #[must_use]
    pub fn is_registered(&self, id: &ZoneId) -> bool {
        self.zones.contains_key(id)
    }

    #[must_use]
    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// Ids of all registered zones, in no particular order.
    #[must_use]
    pub fn zone_ids(&self) -> Vec<ZoneId> {
        self.zones.keys().copied().collect()
    }

    // --- Queries ---

    #[must_use]
    pub fn state(&self) -> &GestureState {
        &self.state
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// The zone currently carrying the hover highlight.
    #[must_use]
    pub fn highlighted(&self) -> Option<ZoneId> {
        self.highlighted
    }

    /// Where the ghost proxy is drawn, if one exists.
    #[must_use]
    pub fn ghost(&self) -> Option<Point> {
        self.ghost
    }

    #[must_use]
    pub fn policy(&self) -> RejectPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: RejectPolicy) {
        self.policy = policy;
    }

    // --- Gesture ---

    /// Begin a gesture on pointer-down over a draggable source.
    ///
    /// A dragged node never resolves to its own zone.
    ///
    /// # Errors
    ///
    /// `GestureConflict` if a gesture is already active; the running gesture is
    /// left untouched.
    pub fn on_pointer_down(
        &mut self,
        pointer: PointerId,
        at: Point,
        source: DragSource,
    ) -> Result<Vec<Effect>, EditorError> {
        self.on_pointer_down_excluding(pointer, at, source, HashSet::new())
    }

    /// Like [`Self::on_pointer_down`], but the gesture also skips every zone in
    /// `excluded` (e.g. the containers nested inside a dragged node).
    ///
    /// # Errors
    ///
    /// `GestureConflict` if a gesture is already active.
    pub fn on_pointer_down_excluding(
        &mut self,
        pointer: PointerId,
        at: Point,
        source: DragSource,
        mut excluded: HashSet<ZoneId>,
    ) -> Result<Vec<Effect>, EditorError> {
        if self.state.phase() == Phase::Dragging {
            return Err(EditorError::GestureConflict);
        }
        excluded.extend(source.node_id());
        self.state = GestureState::Dragging {
            pointer,
            source,
            pointer_start: at,
            pointer_current: at,
            travelled: false,
            resolved_zone: None,
        };
        self.excluded = excluded;
        self.ghost = Some(at);
        tracing::debug!(pointer = pointer.0, kind = ?source.kind, excluded = self.excluded.len(), "drag started");
        Ok(vec![
            Effect::CapturePointer(pointer),
            Effect::ShowGhost { source, at },
            Effect::SetCursor(CURSOR_GRABBING.to_string()),
        ])
    }

    /// Track the pointer and re-resolve the target zone.
    pub fn on_pointer_move(&mut self, pointer: PointerId, at: Point) -> Vec<Effect> {
        let GestureState::Dragging { pointer: owner, source, .. } = self.state else {
            return Vec::new();
        };
        if owner != pointer {
            return Vec::new();
        }

        let target = self.resolve(at, source);
        if let GestureState::Dragging { pointer_start, pointer_current, travelled, resolved_zone, .. } =
            &mut self.state
        {
            *pointer_current = at;
            *travelled |= pointer_start.distance(at) > DRAG_THRESHOLD;
            *resolved_zone = target;
        }
        self.ghost = Some(at);

        let mut effects = vec![Effect::MoveGhost { at }];
        self.set_highlight(target, &mut effects);
        effects
    }

    /// Finish the gesture on pointer-up.
    ///
    /// The target is resolved once more at the release point. If a zone
    /// matches, a [`DropDecision`] is sent; otherwise the gesture is cancelled.
    pub fn on_pointer_up(&mut self, pointer: PointerId, at: Point) -> Vec<Effect> {
        let GestureState::Dragging { pointer: owner, source, pointer_start, travelled, .. } = self.state else {
            return Vec::new();
        };
        if owner != pointer {
            return Vec::new();
        }

        let travelled = travelled || pointer_start.distance(at) > DRAG_THRESHOLD;
        match self.resolve(at, source) {
            Some(zone) => {
                tracing::debug!(%zone, travelled, "drop decided");
                if let Err(err) = self.decisions.send(DropDecision { source, zone, travelled }) {
                    tracing::warn!(error = %err, "drop decision has no subscriber");
                }
            }
            None => tracing::debug!(x = at.x, y = at.y, "drop released outside every zone"),
        }
        self.finish()
    }

    /// The host lost pointer capture (interruption, window blur, etc.).
    pub fn on_lost_pointer_capture(&mut self, pointer: PointerId) -> Vec<Effect> {
        match self.state {
            GestureState::Dragging { pointer: owner, .. } if owner == pointer => self.cancel(),
            _ => Vec::new(),
        }
    }

    /// Abort the active gesture without a decision. No-op when idle.
    pub fn cancel(&mut self) -> Vec<Effect> {
        if self.state.phase() == Phase::Idle {
            return Vec::new();
        }
        tracing::debug!("drag cancelled");
        self.finish()
    }

    // --- Internals ---

    /// Refresh every zone's bounds and pick the target at `at`.
    fn resolve(&mut self, at: Point, source: DragSource) -> Option<ZoneId> {
        let excluded = &self.excluded;
        let mut hits: Vec<&mut DropZone> = self
            .zones
            .values_mut()
            .filter_map(|zone| {
                zone.bounds = zone.region.bounds();
                (!excluded.contains(&zone.id) && zone.bounds.contains(at)).then_some(zone)
            })
            .collect();

        hits.sort_by(|a, b| a.bounds.area().total_cmp(&b.bounds.area()).then_with(|| b.seq.cmp(&a.seq)));

        match self.policy {
            RejectPolicy::FallThrough => hits.iter().find(|z| z.accepts(source.kind)).map(|z| z.id),
            RejectPolicy::Cancel => hits.first().filter(|z| z.accepts(source.kind)).map(|z| z.id),
        }
    }

    fn set_highlight(&mut self, target: Option<ZoneId>, effects: &mut Vec<Effect>) {
        if self.highlighted == target {
            return;
        }
        if let Some(old) = self.highlighted.take() {
            effects.push(Effect::ClearHighlight(old));
        }
        if let Some(new) = target {
            effects.push(Effect::Highlight(new));
        }
        self.highlighted = target;
    }

    fn finish(&mut self) -> Vec<Effect> {
        let pointer = match self.state {
            GestureState::Dragging { pointer, .. } => Some(pointer),
            GestureState::Idle => None,
        };
        let mut effects = Vec::new();
        self.set_highlight(None, &mut effects);
        if self.ghost.take().is_some() {
            effects.push(Effect::RemoveGhost);
        }
        if let Some(pointer) = pointer {
            effects.push(Effect::ReleasePointer(pointer));
        }
        effects.push(Effect::SetCursor(CURSOR_DEFAULT.to_string()));
        self.state = GestureState::Idle;
        self.excluded.clear();
        effects
    }
}
