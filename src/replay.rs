//! Headless replay of editor sessions from a JSON script.
//!
//! A script fixes the layout up front (canvas rectangle plus one rectangle per
//! container, handed out in creation order) and then lists input steps. Steps
//! that name existing elements refer to them either by id or by creation
//! order (`{"created": 0}` is the first element a drop created).
//!
//! ```json
//! {
//!   "canvas": {"x": 0, "y": 0, "width": 800, "height": 600},
//!   "containers": [{"x": 100, "y": 100, "width": 200, "height": 200}],
//!   "steps": [
//!     {"op": "drop", "kind": "container", "x": 150, "y": 150},
//!     {"op": "drop", "kind": "text", "x": 150, "y": 150}
//!   ]
//! }
//! ```

#[cfg(test)]
#[path = "replay_test.rs"]
mod replay_test;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::EditorConfig;
use crate::error::EditorError;
use crate::geom::{Point, Rect, SharedRect};
use crate::input::{DragSource, Key, PointerId};
use crate::kind::ElementKind;
use crate::session::{Action, EditorSession, PlannedLayout, PropertyUpdate};
use crate::tree::{NodeId, NodeSnapshot};

/// Pointer used by the `drop` and `drag` shorthands.
const SCRIPT_POINTER: PointerId = PointerId(1);

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("malformed script: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("step {step}: no element was created at position {index}")]
    UnknownReference { step: usize, index: usize },
    #[error("step {step}: no container layout at position {index}")]
    UnknownContainer { step: usize, index: usize },
    #[error("step {step}: {source}")]
    Editor { step: usize, source: EditorError },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub config: EditorConfig,
    #[serde(default = "default_canvas")]
    pub canvas: Rect,
    #[serde(default)]
    pub containers: Vec<Rect>,
    /// Document loaded before the first step.
    #[serde(default)]
    pub document: Option<NodeSnapshot>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_canvas() -> Rect {
    Rect::new(0.0, 0.0, 800.0, 600.0)
}

/// Reference to an element placed on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum NodeRef {
    Id(NodeId),
    Created { created: usize },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Pointer-down carrying a palette template.
    Down { pointer: i32, kind: ElementKind, x: f64, y: f64 },
    /// Pointer-down on an existing element.
    Grab { pointer: i32, node: NodeRef, x: f64, y: f64 },
    Move { pointer: i32, x: f64, y: f64 },
    Up { pointer: i32, x: f64, y: f64 },
    LostCapture { pointer: i32 },
    Key { key: String },
    /// Palette drag released at `(x, y)`.
    Drop { kind: ElementKind, x: f64, y: f64 },
    /// Existing element dragged and released at `(x, y)`.
    Drag { node: NodeRef, x: f64, y: f64 },
    /// Shift a container's layout rectangle, by position in `containers`.
    Scroll { container: usize, dx: f64, dy: f64 },
    Select { node: NodeRef },
    Deselect,
    Update { node: NodeRef, updates: Map<String, Value> },
    Delete { node: NodeRef },
    Confirm { node: NodeRef },
    CancelDelete,
}

/// Result of a replay: the final document and everything the host was told.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub document: Option<NodeSnapshot>,
    pub selection: Option<NodeId>,
    pub created: Vec<NodeId>,
    pub actions: Vec<Action>,
}

/// Parse and run a script.
///
/// # Errors
///
/// `Parse` for malformed JSON; otherwise as [`run`].
pub fn run_json(raw: &str) -> Result<Outcome, ReplayError> {
    let script: Script = serde_json::from_str(raw)?;
    run(script)
}

/// Run every step of `script` against a fresh session.
///
/// # Errors
///
/// The first step that references something missing or that the session rejects.
pub fn run(script: Script) -> Result<Outcome, ReplayError> {
    let layouts: Vec<SharedRect> = script.containers.iter().copied().map(SharedRect::new).collect();
    let mut session = EditorSession::new(
        script.config,
        Box::new(script.canvas),
        Box::new(PlannedLayout::new(layouts.clone())),
    );
    let mut replay = Replay { session: &mut session, layouts, created: Vec::new(), actions: Vec::new() };

    if let Some(document) = script.document {
        let actions = replay.session.load(document).map_err(|source| ReplayError::Editor { step: 0, source })?;
        replay.actions.extend(actions);
    }
    for (step, op) in script.steps.into_iter().enumerate() {
        replay.apply(step, op)?;
    }

    tracing::info!(actions = replay.actions.len(), created = replay.created.len(), "replay finished");
    let Replay { created, actions, .. } = replay;
    Ok(Outcome { document: session.snapshot(), selection: session.selection(), created, actions })
}

struct Replay<'a> {
    session: &'a mut EditorSession,
    layouts: Vec<SharedRect>,
    created: Vec<NodeId>,
    actions: Vec<Action>,
}

impl Replay<'_> {
    fn apply(&mut self, step: usize, op: Step) -> Result<(), ReplayError> {
        tracing::debug!(step, ?op, "replay step");
        let editor = |source| ReplayError::Editor { step, source };
        let actions = match op {
            Step::Down { pointer, kind, x, y } => {
                self.session.on_pointer_down(PointerId(pointer), Point::new(x, y), DragSource::template(kind))
            }
            Step::Grab { pointer, node, x, y } => {
                let source = self.drag_source(step, node)?;
                self.session.on_pointer_down(PointerId(pointer), Point::new(x, y), source)
            }
            Step::Move { pointer, x, y } => self.session.on_pointer_move(PointerId(pointer), Point::new(x, y)),
            Step::Up { pointer, x, y } => self.session.on_pointer_up(PointerId(pointer), Point::new(x, y)),
            Step::LostCapture { pointer } => self.session.on_lost_pointer_capture(PointerId(pointer)),
            Step::Key { key } => self.session.on_key_down(&Key(key)),
            Step::Drop { kind, x, y } => self.gesture(DragSource::template(kind), Point::new(x, y)),
            Step::Drag { node, x, y } => {
                let source = self.drag_source(step, node)?;
                self.gesture(source, Point::new(x, y))
            }
            Step::Scroll { container, dx, dy } => {
                let rect = self.layouts.get(container).ok_or(ReplayError::UnknownContainer { step, index: container })?;
                rect.translate(dx, dy);
                Vec::new()
            }
            Step::Select { node } => {
                let id = self.resolve(step, node)?;
                let (_, action) = self.session.select(&id).map_err(editor)?;
                vec![action]
            }
            Step::Deselect => self.session.clear_selection().into_iter().collect(),
            Step::Update { node, updates } => {
                let node_id = self.resolve(step, node)?;
                vec![self.session.update_properties(PropertyUpdate { node_id, updates }).map_err(editor)?]
            }
            Step::Delete { node } => {
                let id = self.resolve(step, node)?;
                self.session.request_delete(&id).map_err(editor)?
            }
            Step::Confirm { node } => {
                let id = self.resolve(step, node)?;
                self.session.confirm_delete(&id).map_err(editor)?
            }
            Step::CancelDelete => {
                self.session.cancel_delete();
                Vec::new()
            }
        };
        self.record(actions);
        Ok(())
    }

    fn gesture(&mut self, source: DragSource, at: Point) -> Vec<Action> {
        let mut actions = self.session.on_pointer_down(SCRIPT_POINTER, at, source);
        actions.extend(self.session.on_pointer_move(SCRIPT_POINTER, at));
        actions.extend(self.session.on_pointer_up(SCRIPT_POINTER, at));
        actions
    }

    fn drag_source(&self, step: usize, node: NodeRef) -> Result<DragSource, ReplayError> {
        let id = self.resolve(step, node)?;
        self.session.drag_source_for(&id).ok_or(ReplayError::Editor { step, source: EditorError::NotFound(id) })
    }

    fn resolve(&self, step: usize, node: NodeRef) -> Result<NodeId, ReplayError> {
        match node {
            NodeRef::Id(id) => Ok(id),
            NodeRef::Created { created } => {
                self.created.get(created).copied().ok_or(ReplayError::UnknownReference { step, index: created })
            }
        }
    }

    fn record(&mut self, actions: Vec<Action>) {
        for action in &actions {
            if let Action::NodeCreated { id, .. } = action {
                self.created.push(*id);
            }
        }
        self.actions.extend(actions);
    }
}
