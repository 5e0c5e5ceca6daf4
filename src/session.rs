//! Editor session: wires the drag engine to the document tree.
//!
//! The session owns one [`DocumentTree`] and one [`DragDropEngine`] and
//! subscribes to the engine's drop decisions at construction. Pointer and
//! keyboard handlers return [`Action`]s for the host: structural changes to
//! render, selection changes for the property panel, and the engine's visual
//! effects passed through as [`Action::Feedback`].
//!
//! Every tree mutation is checked; a failed mutation skips the dependent
//! registry or UI update and leaves prior state intact.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

use crate::config::EditorConfig;
use crate::consts::CANVAS_ID;
use crate::drag::{DragDropEngine, DropDecision, Effect};
use crate::error::EditorError;
use crate::geom::{Point, Rect, Region, SharedRect};
use crate::input::{DragSource, Key, PointerId, SourceRef};
use crate::kind::{ElementKind, PropertyField};
use crate::tree::{DocumentTree, ElementNode, NodeId, NodeSnapshot};

/// Supplies on-screen regions for container nodes as they are created.
pub trait Layout {
    fn region_for(&mut self, node: &ElementNode) -> Box<dyn Region>;
}

/// Layout that hands out pre-planned rectangles in container creation order.
///
/// Once the plan runs out, containers get an empty region that never matches.
#[derive(Debug, Default)]
pub struct PlannedLayout {
    plan: VecDeque<SharedRect>,
}

impl PlannedLayout {
    #[must_use]
    pub fn new(plan: impl IntoIterator<Item = SharedRect>) -> Self {
        Self { plan: plan.into_iter().collect() }
    }

    pub fn push(&mut self, rect: SharedRect) {
        self.plan.push_back(rect);
    }
}

impl Layout for PlannedLayout {
    fn region_for(&mut self, _node: &ElementNode) -> Box<dyn Region> {
        let rect = self.plan.pop_front().unwrap_or_else(|| SharedRect::new(Rect::default()));
        Box::new(rect)
    }
}

/// Outcomes for the host to render or forward.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    NodeCreated { id: NodeId, parent: NodeId, kind: ElementKind },
    NodeMoved { id: NodeId, parent: NodeId, index: usize },
    /// A node and its whole subtree left the document.
    NodeDeleted { id: NodeId },
    /// Properties after an update was merged.
    NodeUpdated { id: NodeId, properties: Map<String, Value> },
    SelectionChanged(Option<NodeId>),
    /// Deletion awaits user confirmation; answer with `confirm_delete` or `cancel_delete`.
    ConfirmDeleteRequested { id: NodeId },
    /// The canvas gained its first element or lost its last one.
    EmptyStateChanged { empty: bool },
    Feedback(Effect),
}

/// What the property panel needs to render the selected node.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub id: NodeId,
    pub kind: ElementKind,
    pub properties: Map<String, Value>,
    pub fields: Vec<PropertyField>,
}

/// Property panel callback payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyUpdate {
    pub node_id: NodeId,
    pub updates: Map<String, Value>,
}

pub struct EditorSession {
    config: EditorConfig,
    tree: DocumentTree,
    engine: DragDropEngine,
    decisions: UnboundedReceiver<DropDecision>,
    layout: Box<dyn Layout>,
    selection: Option<NodeId>,
    pending_delete: Option<NodeId>,
}

impl EditorSession {
    /// Create a session with an empty canvas whose drop zone is `canvas`.
    #[must_use]
    pub fn new(config: EditorConfig, canvas: Box<dyn Region>, layout: Box<dyn Layout>) -> Self {
        let (tx, rx) = unbounded_channel();
        let mut engine = DragDropEngine::new(config.reject_policy, tx);
        engine.register(CANVAS_ID, canvas, Vec::new());
        Self {
            config,
            tree: DocumentTree::with_root(CANVAS_ID, ElementKind::Canvas),
            engine,
            decisions: rx,
            layout,
            selection: None,
            pending_delete: None,
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    #[must_use]
    pub fn engine(&self) -> &DragDropEngine {
        &self.engine
    }

    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    #[must_use]
    pub fn selection(&self) -> Option<NodeId> {
        self.selection
    }

    /// Whether the canvas holds no elements (the empty-state placeholder shows).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree
            .root()
            .and_then(|r| self.tree.lookup(&r))
            .is_none_or(|root| root.children.is_empty())
    }

    /// Panel view of the current selection.
    #[must_use]
    pub fn panel(&self) -> Option<PanelView> {
        self.selection.and_then(|id| self.panel_for(&id))
    }

    /// Drag source for an element already on the canvas.
    #[must_use]
    pub fn drag_source_for(&self, id: &NodeId) -> Option<DragSource> {
        self.tree.lookup(id).map(|n| DragSource::node(n.id, n.kind))
    }

    /// Nested snapshot of the document.
    #[must_use]
    pub fn snapshot(&self) -> Option<NodeSnapshot> {
        self.tree.serialize()
    }

    // --- Pointer input ---

    /// Begin a drag. A placed node is dragged together with its subtree, so
    /// none of the containers inside it can be a target.
    pub fn on_pointer_down(&mut self, pointer: PointerId, at: Point, source: DragSource) -> Vec<Action> {
        let subtree: HashSet<NodeId> =
            source.node_id().map(|id| self.tree.descendants(&id).into_iter().collect()).unwrap_or_default();
        match self.engine.on_pointer_down_excluding(pointer, at, source, subtree) {
            Ok(effects) => feedback(effects),
            Err(err) => {
                tracing::debug!(error = %err, pointer = pointer.0, "pointer-down ignored");
                Vec::new()
            }
        }
    }

    pub fn on_pointer_move(&mut self, pointer: PointerId, at: Point) -> Vec<Action> {
        feedback(self.engine.on_pointer_move(pointer, at))
    }

    /// End the gesture and apply any drop decision it produced.
    pub fn on_pointer_up(&mut self, pointer: PointerId, at: Point) -> Vec<Action> {
        let mut actions = feedback(self.engine.on_pointer_up(pointer, at));
        actions.extend(self.drain_decisions());
        actions
    }

    pub fn on_lost_pointer_capture(&mut self, pointer: PointerId) -> Vec<Action> {
        feedback(self.engine.on_lost_pointer_capture(pointer))
    }

    // --- Keyboard ---

    /// Escape cancels an active drag; Delete/Backspace requests deletion of the selection.
    pub fn on_key_down(&mut self, key: &Key) -> Vec<Action> {
        if key.is_escape() {
            return feedback(self.engine.cancel());
        }
        if key.is_delete() {
            if let Some(id) = self.selection {
                return match self.request_delete(&id) {
                    Ok(actions) => actions,
                    Err(err) => {
                        tracing::debug!(error = %err, %id, "keyboard delete skipped");
                        Vec::new()
                    }
                };
            }
        }
        Vec::new()
    }

    // --- Selection and properties ---

    /// Select a rendered node and return what the property panel shows.
    ///
    /// # Errors
    ///
    /// `NotFound` if `id` is unknown; the selection is left unchanged.
    pub fn select(&mut self, id: &NodeId) -> Result<(PanelView, Action), EditorError> {
        let view = self.panel_for(id).ok_or(EditorError::NotFound(*id))?;
        self.selection = Some(*id);
        Ok((view, Action::SelectionChanged(Some(*id))))
    }

    pub fn clear_selection(&mut self) -> Option<Action> {
        self.selection.take().map(|_| Action::SelectionChanged(None))
    }

    /// Merge a property panel update into the node.
    ///
    /// # Errors
    ///
    /// `NotFound` if the node is unknown.
    pub fn update_properties(&mut self, update: PropertyUpdate) -> Result<Action, EditorError> {
        self.tree.update_properties(&update.node_id, &update.updates)?;
        let properties = self.tree.lookup(&update.node_id).map(|n| n.properties.clone()).unwrap_or_default();
        Ok(Action::NodeUpdated { id: update.node_id, properties })
    }

    // --- Deletion ---

    /// Start deleting `id`, asking for confirmation first when configured to.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown ids; `InvalidOperation` for the canvas root.
    pub fn request_delete(&mut self, id: &NodeId) -> Result<Vec<Action>, EditorError> {
        let node = self.tree.lookup(id).ok_or(EditorError::NotFound(*id))?;
        if node.parent.is_none() {
            return Err(EditorError::InvalidOperation("the canvas cannot be deleted".into()));
        }
        if self.config.confirm_delete {
            self.pending_delete = Some(*id);
            return Ok(vec![Action::ConfirmDeleteRequested { id: *id }]);
        }
        self.delete(id)
    }

    /// Complete a deletion previously requested with `request_delete`.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if `id` is not the pending deletion; otherwise as [`Self::delete`].
    pub fn confirm_delete(&mut self, id: &NodeId) -> Result<Vec<Action>, EditorError> {
        if self.pending_delete != Some(*id) {
            return Err(EditorError::InvalidOperation(format!("no pending deletion for {id}")));
        }
        self.pending_delete = None;
        self.delete(id)
    }

    /// Drop a pending deletion request.
    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Remove `id` and its subtree, unregister their zones, and clear the
    /// selection if it was inside the removed subtree.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown ids; `InvalidOperation` for the canvas root.
    pub fn delete(&mut self, id: &NodeId) -> Result<Vec<Action>, EditorError> {
        let removed = self.tree.remove(id)?;
        let mut actions = Vec::new();

        let mut removed_ids = Vec::new();
        removed.walk(&mut |n| removed_ids.push((n.id, n.kind.is_container())));
        for (rid, _) in removed_ids.iter().filter(|(_, container)| *container) {
            actions.extend(feedback(self.engine.unregister(rid)));
        }
        tracing::info!(%id, nodes = removed_ids.len(), "element deleted");
        actions.push(Action::NodeDeleted { id: *id });

        let was_removed = |target: NodeId| removed_ids.iter().any(|(rid, _)| *rid == target);
        if self.selection.is_some_and(was_removed) {
            self.selection = None;
            actions.push(Action::SelectionChanged(None));
        }
        if self.pending_delete.is_some_and(was_removed) {
            self.pending_delete = None;
        }
        if self.is_empty() {
            actions.push(Action::EmptyStateChanged { empty: true });
        }
        Ok(actions)
    }

    // --- Render surface ---

    /// Bind the session to a different render surface.
    ///
    /// Any active gesture is cancelled, the canvas zone is re-registered with
    /// `canvas`, and every container gets a fresh region from `layout`.
    pub fn retarget(&mut self, canvas: Box<dyn Region>, layout: Box<dyn Layout>) -> Vec<Action> {
        let mut actions = feedback(self.engine.cancel());
        self.layout = layout;
        self.engine.register(CANVAS_ID, canvas, Vec::new());
        self.reregister_containers(&mut actions);
        tracing::info!(zones = self.engine.zone_count(), "render surface retargeted");
        actions
    }

    // --- Snapshots ---

    /// Replace the document and re-register one zone per container.
    ///
    /// # Errors
    ///
    /// `InvalidSnapshot` when the snapshot is inconsistent or its root is not
    /// a canvas; the current document is kept.
    pub fn load(&mut self, snapshot: NodeSnapshot) -> Result<Vec<Action>, EditorError> {
        if snapshot.kind != ElementKind::Canvas {
            return Err(EditorError::InvalidSnapshot(format!("root must be a canvas, got {:?}", snapshot.kind)));
        }
        self.tree.load(snapshot)?;

        let mut actions = Vec::new();
        self.reregister_containers(&mut actions);

        self.pending_delete = None;
        if let Some(action) = self.clear_selection() {
            actions.push(action);
        }
        actions.push(Action::EmptyStateChanged { empty: self.is_empty() });
        tracing::info!(nodes = self.tree.len(), "document loaded");
        Ok(actions)
    }

    // --- Internals ---

    fn drain_decisions(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        while let Ok(decision) = self.decisions.try_recv() {
            actions.extend(self.apply_drop(decision));
        }
        actions
    }

    fn apply_drop(&mut self, decision: DropDecision) -> Vec<Action> {
        let parent = if decision.zone == CANVAS_ID { self.tree.root() } else { Some(decision.zone) };
        let Some(parent) = parent else {
            tracing::warn!(zone = %decision.zone, "drop onto a document without a root");
            return Vec::new();
        };

        match decision.source.source {
            SourceRef::Template => self.create_from_template(decision.source.kind, parent),
            SourceRef::Node { id } => self.relocate(id, parent, decision.travelled),
        }
    }

    fn create_from_template(&mut self, kind: ElementKind, parent: NodeId) -> Vec<Action> {
        let was_empty = self.is_empty();
        let id = match self.tree.insert(NodeSnapshot::new(kind), Some(parent)) {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(error = %err, %parent, "drop skipped");
                return Vec::new();
            }
        };
        self.register_if_container(&id);
        tracing::info!(%id, %parent, ?kind, "element created");

        let mut actions = vec![Action::NodeCreated { id, parent, kind }];
        if was_empty {
            actions.push(Action::EmptyStateChanged { empty: false });
        }
        actions
    }

    fn relocate(&mut self, id: NodeId, parent: NodeId, travelled: bool) -> Vec<Action> {
        // A click on a placed element is a selection, not a reorder.
        if !travelled && self.tree.lookup(&id).and_then(|n| n.parent) == Some(parent) {
            tracing::debug!(%id, "node released in place");
            return Vec::new();
        }
        if let Err(err) = self.tree.move_node(&id, &parent, None) {
            tracing::warn!(error = %err, %id, %parent, "move skipped");
            return Vec::new();
        }
        let index = self.tree.lookup(&parent).map_or(0, |p| p.children.len().saturating_sub(1));
        tracing::info!(%id, %parent, index, "element moved");
        vec![Action::NodeMoved { id, parent, index }]
    }

    /// Drop every container zone and register one per container in the current tree.
    fn reregister_containers(&mut self, actions: &mut Vec<Action>) {
        for zone in self.engine.zone_ids() {
            if zone != CANVAS_ID {
                actions.extend(feedback(self.engine.unregister(&zone)));
            }
        }
        let root = self.tree.root();
        let placed: Vec<NodeId> = root
            .map(|r| self.tree.descendants(&r))
            .unwrap_or_default()
            .into_iter()
            .filter(|id| Some(*id) != root)
            .collect();
        for id in placed {
            self.register_if_container(&id);
        }
    }

    fn register_if_container(&mut self, id: &NodeId) {
        let Some(node) = self.tree.lookup(id) else {
            return;
        };
        if !node.kind.is_container() {
            return;
        }
        let region = self.layout.region_for(node);
        self.engine.register(*id, region, self.config.container_accepts.clone());
    }

    fn panel_for(&self, id: &NodeId) -> Option<PanelView> {
        self.tree.lookup(id).map(|n| PanelView {
            id: n.id,
            kind: n.kind,
            properties: n.properties.clone(),
            fields: n.kind.panel_fields(),
        })
    }
}

fn feedback(effects: Vec<Effect>) -> Vec<Action> {
    effects.into_iter().map(Action::Feedback).collect()
}
