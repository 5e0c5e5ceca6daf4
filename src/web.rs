//! Browser binding: DOM regions, event wiring, and effect application.
//!
//! The page owns rendering. [`WebEditor`] listens for pointer and key events on
//! an attach target, feeds them to an [`EditorSession`], applies visual
//! [`Effect`]s itself (ghost proxy, highlight class, pointer capture, cursor),
//! and forwards every other [`Action`] to a JavaScript callback as JSON so the
//! page can render the change.
//!
//! Palette entries carry `data-draggable` and `data-component-type="<tag>"`;
//! rendered elements carry `data-draggable` and `data-node-id="<uuid>"`.

use std::cell::RefCell;
use std::rc::Rc;

use uuid::Uuid;
use wasm_bindgen::prelude::*;
use wasm_bindgen::{JsCast, closure::Closure};
use web_sys::{Element, HtmlElement, HtmlInputElement, HtmlTextAreaElement, KeyboardEvent, MouseEvent, PointerEvent};

use crate::config::EditorConfig;
use crate::consts::{
    ATTR_COMPONENT_TYPE, ATTR_DRAGGABLE, ATTR_NODE_ID, CANVAS_ID, CLASS_ZONE_ACTIVE, GHOST_OPACITY, GHOST_Z_INDEX,
};
use crate::drag::{Effect, ZoneId};
use crate::geom::{Point, Rect, Region};
use crate::input::{DragSource, Key, Phase, PointerId};
use crate::kind::ElementKind;
use crate::session::{Action, EditorSession, Layout, PropertyUpdate};
use crate::tree::{ElementNode, NodeId};

// =============================================================
// Regions
// =============================================================

/// Live bounds of a fixed DOM element.
pub struct ElementRegion(Element);

impl Region for ElementRegion {
    fn bounds(&self) -> Rect {
        dom_rect(&self.0)
    }
}

/// Live bounds of whichever element currently renders `id` under `root`.
///
/// The page may re-render a node at any time, so the element is looked up on
/// every call. A node with no rendered element has empty bounds.
pub struct NodeRegion {
    root: Element,
    id: NodeId,
}

impl Region for NodeRegion {
    fn bounds(&self) -> Rect {
        node_element(&self.root, &self.id).map_or_else(Rect::default, |el| dom_rect(&el))
    }
}

/// Layout backed by the rendered page.
pub struct DomLayout {
    root: Element,
}

impl Layout for DomLayout {
    fn region_for(&mut self, node: &ElementNode) -> Box<dyn Region> {
        Box::new(NodeRegion { root: self.root.clone(), id: node.id })
    }
}

fn dom_rect(el: &Element) -> Rect {
    let r = el.get_bounding_client_rect();
    Rect::new(r.left(), r.top(), r.width(), r.height())
}

fn node_element(root: &Element, id: &NodeId) -> Option<Element> {
    if *id == CANVAS_ID {
        return Some(root.clone());
    }
    match root.query_selector(&format!("[{ATTR_NODE_ID}=\"{id}\"]")) {
        Ok(found) => found,
        Err(err) => {
            tracing::warn!(?err, %id, "node lookup failed");
            None
        }
    }
}

fn parse_node_id(raw: &str) -> Option<NodeId> {
    match Uuid::parse_str(raw) {
        Ok(id) => Some(id),
        Err(err) => {
            tracing::warn!(error = %err, raw, "malformed node id attribute");
            None
        }
    }
}

fn pointer_point(ev: &MouseEvent) -> Point {
    Point::new(f64::from(ev.client_x()), f64::from(ev.client_y()))
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

// =============================================================
// Host state
// =============================================================

struct Host {
    session: EditorSession,
    root: Element,
    /// Element the active gesture started on; owns pointer capture.
    drag_element: Option<Element>,
    ghost: Option<HtmlElement>,
    on_action: Option<js_sys::Function>,
}

/// Structural actions waiting for the page callback.
///
/// The callback may call straight back into [`WebEditor`], so an outbox is
/// delivered only after the host borrow has been released.
#[must_use]
struct Outbox {
    callback: Option<js_sys::Function>,
    actions: Vec<Action>,
}

impl Outbox {
    fn deliver(self) {
        let Some(callback) = self.callback else {
            return;
        };
        for action in &self.actions {
            let json = match serde_json::to_string(action) {
                Ok(json) => json,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to encode action");
                    continue;
                }
            };
            if let Err(err) = callback.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
                tracing::warn!(?err, "action callback threw");
            }
        }
    }
}

/// Run `f` against the host, apply its effects, then deliver the rest once
/// the borrow is released.
fn dispatch(host: &RefCell<Host>, f: impl FnOnce(&mut Host) -> Vec<Action>) {
    let outbox = {
        let mut host = host.borrow_mut();
        let actions = f(&mut *host);
        host.apply(actions)
    };
    outbox.deliver();
}

impl Host {
    /// Apply visual effects now and collect everything else for the page.
    fn apply(&mut self, actions: Vec<Action>) -> Outbox {
        let mut pending = Vec::new();
        for action in actions {
            match action {
                Action::Feedback(effect) => self.apply_effect(effect),
                other => pending.push(other),
            }
        }
        Outbox { callback: self.on_action.clone(), actions: pending }
    }

    fn apply_effect(&mut self, effect: Effect) {
        match effect {
            Effect::CapturePointer(pointer) => {
                if let Some(el) = &self.drag_element {
                    if let Err(err) = el.set_pointer_capture(pointer.0) {
                        tracing::warn!(?err, "pointer capture failed");
                    }
                }
            }
            Effect::ReleasePointer(pointer) => {
                if let Some(el) = self.drag_element.take() {
                    if el.has_pointer_capture(pointer.0) {
                        if let Err(err) = el.release_pointer_capture(pointer.0) {
                            tracing::warn!(?err, "pointer release failed");
                        }
                    }
                }
            }
            Effect::ShowGhost { at, .. } => self.show_ghost(at),
            Effect::MoveGhost { at } => {
                if let Some(ghost) = &self.ghost {
                    place_ghost(ghost, at);
                }
            }
            Effect::RemoveGhost => {
                if let Some(ghost) = self.ghost.take() {
                    ghost.remove();
                }
            }
            Effect::Highlight(zone) => self.toggle_highlight(&zone, true),
            Effect::ClearHighlight(zone) => self.toggle_highlight(&zone, false),
            Effect::SetCursor(cursor) => {
                if let Some(body) = web_sys::window().and_then(|w| w.document()).and_then(|d| d.body()) {
                    set_style(&body, "cursor", &cursor);
                }
            }
        }
    }

    fn show_ghost(&mut self, at: Point) {
        let Some(source) = &self.drag_element else {
            return;
        };
        let Some(body) = web_sys::window().and_then(|w| w.document()).and_then(|d| d.body()) else {
            return;
        };
        let clone = match source.clone_node_with_deep(true) {
            Ok(node) => node,
            Err(err) => {
                tracing::warn!(?err, "ghost clone failed");
                return;
            }
        };
        let Ok(ghost) = clone.dyn_into::<HtmlElement>() else {
            return;
        };
        for (prop, value) in [
            ("position", "fixed"),
            ("pointer-events", "none"),
            ("opacity", GHOST_OPACITY),
            ("z-index", GHOST_Z_INDEX),
            ("transform", "translate(-50%, -50%)"),
        ] {
            set_style(&ghost, prop, value);
        }
        place_ghost(&ghost, at);
        if let Err(err) = body.append_child(&ghost) {
            tracing::warn!(?err, "ghost insert failed");
            return;
        }
        self.ghost = Some(ghost);
    }

    fn toggle_highlight(&self, zone: &ZoneId, on: bool) {
        let Some(el) = node_element(&self.root, zone) else {
            return;
        };
        let classes = el.class_list();
        let result = if on { classes.add_1(CLASS_ZONE_ACTIVE) } else { classes.remove_1(CLASS_ZONE_ACTIVE) };
        if let Err(err) = result {
            tracing::warn!(?err, %zone, "highlight toggle failed");
        }
    }

    /// Work out what a pointer-down on `target` would drag.
    fn drag_source_at(&self, target: &Element) -> Option<(Element, DragSource)> {
        let el = match target.closest(&format!("[{ATTR_DRAGGABLE}]")) {
            Ok(Some(el)) => el,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(?err, "draggable lookup failed");
                return None;
            }
        };
        if let Some(raw) = el.get_attribute(ATTR_NODE_ID) {
            let id = parse_node_id(&raw)?;
            return self.session.drag_source_for(&id).map(|source| (el, source));
        }
        let tag = el.get_attribute(ATTR_COMPONENT_TYPE)?;
        let Some(kind) = ElementKind::from_tag(&tag) else {
            tracing::warn!(%tag, "palette entry has an unknown component type");
            return None;
        };
        Some((el, DragSource::template(kind)))
    }
}

fn set_style(el: &HtmlElement, prop: &str, value: &str) {
    if let Err(err) = el.style().set_property(prop, value) {
        tracing::warn!(?err, prop, "style update failed");
    }
}

fn place_ghost(ghost: &HtmlElement, at: Point) {
    set_style(ghost, "left", &format!("{}px", at.x));
    set_style(ghost, "top", &format!("{}px", at.y));
}

fn event_element(ev: &web_sys::Event) -> Option<Element> {
    ev.target().and_then(|t| t.dyn_ref::<Element>().cloned())
}

/// Whether the event came from a field the user is typing into.
fn is_text_entry(ev: &web_sys::Event) -> bool {
    let Some(el) = event_element(ev) else {
        return false;
    };
    el.is_instance_of::<HtmlInputElement>()
        || el.is_instance_of::<HtmlTextAreaElement>()
        || el.dyn_ref::<HtmlElement>().is_some_and(HtmlElement::is_content_editable)
}

// =============================================================
// Exported editor
// =============================================================

#[wasm_bindgen]
pub struct WebEditor {
    host: Rc<RefCell<Host>>,
}

#[wasm_bindgen]
impl WebEditor {
    /// Create an editor over the canvas element `root`.
    ///
    /// `config` is optional JSON in the shape of [`EditorConfig`].
    #[wasm_bindgen(constructor)]
    pub fn new(root: Element, config: Option<String>) -> Result<WebEditor, JsValue> {
        let config = match config {
            Some(raw) => serde_json::from_str::<EditorConfig>(&raw).map_err(js_error)?,
            None => EditorConfig::default(),
        };
        let session = EditorSession::new(
            config,
            Box::new(ElementRegion(root.clone())),
            Box::new(DomLayout { root: root.clone() }),
        );
        let host = Host { session, root, drag_element: None, ghost: None, on_action: None };
        Ok(Self { host: Rc::new(RefCell::new(host)) })
    }

    /// Register the callback that receives every structural action as JSON.
    pub fn on_action(&self, callback: js_sys::Function) {
        self.host.borrow_mut().on_action = Some(callback);
    }

    /// Install listeners on `target`, normally the document or an editor shell
    /// that contains both the palette and the canvas. Call once.
    pub fn attach(&self, target: &web_sys::EventTarget) -> Result<(), JsValue> {
        let host = Rc::clone(&self.host);
        let down = Closure::<dyn FnMut(PointerEvent)>::wrap(Box::new(move |ev: PointerEvent| {
            let Some(target) = event_element(&ev) else {
                return;
            };
            dispatch(&host, |host| {
                if host.session.engine().phase() == Phase::Dragging {
                    return Vec::new();
                }
                let Some((el, source)) = host.drag_source_at(&target) else {
                    return Vec::new();
                };
                ev.prevent_default();
                host.drag_element = Some(el);
                host.session.on_pointer_down(PointerId(ev.pointer_id()), pointer_point(&ev), source)
            });
        }));
        target.add_event_listener_with_callback("pointerdown", down.as_ref().unchecked_ref())?;
        down.forget();

        let host = Rc::clone(&self.host);
        let moved = Closure::<dyn FnMut(PointerEvent)>::wrap(Box::new(move |ev: PointerEvent| {
            dispatch(&host, |host| host.session.on_pointer_move(PointerId(ev.pointer_id()), pointer_point(&ev)));
        }));
        target.add_event_listener_with_callback("pointermove", moved.as_ref().unchecked_ref())?;
        moved.forget();

        let host = Rc::clone(&self.host);
        let up = Closure::<dyn FnMut(PointerEvent)>::wrap(Box::new(move |ev: PointerEvent| {
            dispatch(&host, |host| host.session.on_pointer_up(PointerId(ev.pointer_id()), pointer_point(&ev)));
        }));
        target.add_event_listener_with_callback("pointerup", up.as_ref().unchecked_ref())?;
        up.forget();

        let host = Rc::clone(&self.host);
        let lost = Closure::<dyn FnMut(PointerEvent)>::wrap(Box::new(move |ev: PointerEvent| {
            let Ok(mut host) = host.try_borrow_mut() else {
                // Fired synchronously by our own release while effects are applied.
                return;
            };
            let actions = host.session.on_lost_pointer_capture(PointerId(ev.pointer_id()));
            let outbox = host.apply(actions);
            drop(host);
            outbox.deliver();
        }));
        target.add_event_listener_with_callback("lostpointercapture", lost.as_ref().unchecked_ref())?;
        lost.forget();

        let host = Rc::clone(&self.host);
        let key = Closure::<dyn FnMut(KeyboardEvent)>::wrap(Box::new(move |ev: KeyboardEvent| {
            let key = Key(ev.key());
            if !key.applies_in_text_entry() && is_text_entry(&ev) {
                return;
            }
            dispatch(&host, |host| host.session.on_key_down(&key));
        }));
        target.add_event_listener_with_callback("keydown", key.as_ref().unchecked_ref())?;
        key.forget();

        let host = Rc::clone(&self.host);
        let click = Closure::<dyn FnMut(MouseEvent)>::wrap(Box::new(move |ev: MouseEvent| {
            let Some(target) = event_element(&ev) else {
                return;
            };
            dispatch(&host, |host| {
                let node: &web_sys::Node = &target;
                if !host.root.contains(Some(node)) {
                    return Vec::new();
                }
                let selected = match target.closest(&format!("[{ATTR_NODE_ID}]")) {
                    Ok(found) => {
                        found.and_then(|el| el.get_attribute(ATTR_NODE_ID)).and_then(|raw| parse_node_id(&raw))
                    }
                    Err(err) => {
                        tracing::warn!(?err, "selection lookup failed");
                        None
                    }
                };
                let action = match selected {
                    Some(id) => match host.session.select(&id) {
                        Ok((_, action)) => Some(action),
                        Err(err) => {
                            tracing::warn!(error = %err, "selection skipped");
                            None
                        }
                    },
                    None => host.session.clear_selection(),
                };
                action.into_iter().collect()
            });
        }));
        target.add_event_listener_with_callback("click", click.as_ref().unchecked_ref())?;
        click.forget();

        tracing::info!("editor attached");
        Ok(())
    }

    /// Move the canvas to a different element. Containers are re-bound to
    /// their rendered elements under the new root.
    pub fn retarget(&self, root: Element) {
        dispatch(&self.host, |host| {
            let actions = host.session.retarget(
                Box::new(ElementRegion(root.clone())),
                Box::new(DomLayout { root: root.clone() }),
            );
            host.root = root;
            actions
        });
    }

    /// Apply a property panel update (`{"node_id": .., "updates": {..}}`).
    pub fn update_properties(&self, update: &str) -> Result<(), JsValue> {
        let update: PropertyUpdate = serde_json::from_str(update).map_err(js_error)?;
        let outbox = {
            let mut host = self.host.borrow_mut();
            let action = host.session.update_properties(update).map_err(js_error)?;
            host.apply(vec![action])
        };
        outbox.deliver();
        Ok(())
    }

    /// Property panel view of the current selection as JSON, or `None`.
    pub fn panel(&self) -> Option<String> {
        let host = self.host.borrow();
        let view = host.session.panel()?;
        let fields: Vec<serde_json::Value> = view
            .fields
            .iter()
            .map(|f| serde_json::json!({"key": f.key, "label": f.label, "input": format!("{:?}", f.input)}))
            .collect();
        Some(
            serde_json::json!({
                "id": view.id,
                "kind": view.kind,
                "properties": view.properties,
                "fields": fields,
            })
            .to_string(),
        )
    }

    pub fn request_delete(&self, id: &str) -> Result<(), JsValue> {
        let id = Uuid::parse_str(id).map_err(js_error)?;
        let outbox = {
            let mut host = self.host.borrow_mut();
            let actions = host.session.request_delete(&id).map_err(js_error)?;
            host.apply(actions)
        };
        outbox.deliver();
        Ok(())
    }

    pub fn confirm_delete(&self, id: &str) -> Result<(), JsValue> {
        let id = Uuid::parse_str(id).map_err(js_error)?;
        let outbox = {
            let mut host = self.host.borrow_mut();
            let actions = host.session.confirm_delete(&id).map_err(js_error)?;
            host.apply(actions)
        };
        outbox.deliver();
        Ok(())
    }

    pub fn cancel_delete(&self) {
        self.host.borrow_mut().session.cancel_delete();
    }

    pub fn is_empty(&self) -> bool {
        self.host.borrow().session.is_empty()
    }

    /// Current document as JSON.
    pub fn snapshot(&self) -> Result<String, JsValue> {
        let host = self.host.borrow();
        serde_json::to_string(&host.session.snapshot()).map_err(js_error)
    }

    /// Replace the document with a JSON snapshot.
    pub fn load(&self, snapshot: &str) -> Result<(), JsValue> {
        let snapshot = serde_json::from_str(snapshot).map_err(js_error)?;
        let outbox = {
            let mut host = self.host.borrow_mut();
            let actions = host.session.load(snapshot).map_err(js_error)?;
            host.apply(actions)
        };
        outbox.deliver();
        Ok(())
    }
}
