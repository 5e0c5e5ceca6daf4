#![allow(clippy::float_cmp)]

use std::collections::HashSet;

use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use uuid::Uuid;

use super::*;
use crate::geom::SharedRect;

// =============================================================
// Helpers
// =============================================================

const P: PointerId = PointerId(1);

fn engine() -> (DragDropEngine, UnboundedReceiver<DropDecision>) {
    let (tx, rx) = unbounded_channel();
    (DragDropEngine::new(RejectPolicy::FallThrough, tx), rx)
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn rect(x: f64, y: f64, w: f64, h: f64) -> Box<dyn Region> {
    Box::new(Rect::new(x, y, w, h))
}

fn text() -> DragSource {
    DragSource::template(ElementKind::Text)
}

/// Canvas (0,0,800,600) plus box1 (100,100,200,200).
fn canvas_and_box() -> (DragDropEngine, UnboundedReceiver<DropDecision>, ZoneId, ZoneId) {
    let (mut eng, rx) = engine();
    let canvas = Uuid::nil();
    let box1 = Uuid::new_v4();
    eng.register(canvas, rect(0.0, 0.0, 800.0, 600.0), vec![]);
    eng.register(box1, rect(100.0, 100.0, 200.0, 200.0), vec![]);
    (eng, rx, canvas, box1)
}

fn begin(eng: &mut DragDropEngine, at: Point) -> Vec<Effect> {
    eng.on_pointer_down(P, at, text()).unwrap()
}

fn has(effects: &[Effect], wanted: &Effect) -> bool {
    effects.iter().any(|e| e == wanted)
}

// =============================================================
// Registry
// =============================================================

#[test]
fn register_records_initial_bounds() {
    let (mut eng, _rx) = engine();
    let id = Uuid::new_v4();
    eng.register(id, rect(1.0, 2.0, 3.0, 4.0), vec![ElementKind::Text]);
    let zone = eng.zone(&id).unwrap();
    assert_eq!(zone.bounds, Rect::new(1.0, 2.0, 3.0, 4.0));
    assert_eq!(zone.accepted_kinds, vec![ElementKind::Text]);
}

#[test]
fn register_same_id_replaces_entry() {
    let (mut eng, _rx) = engine();
    let id = Uuid::new_v4();
    eng.register(id, rect(0.0, 0.0, 10.0, 10.0), vec![]);
    eng.register(id, rect(50.0, 50.0, 10.0, 10.0), vec![ElementKind::Button]);
    assert_eq!(eng.zone_count(), 1);
    assert_eq!(eng.zone(&id).unwrap().bounds.x, 50.0);
    assert_eq!(eng.zone(&id).unwrap().accepted_kinds, vec![ElementKind::Button]);
}

#[test]
fn unregister_unknown_is_silent() {
    let (mut eng, _rx) = engine();
    assert!(eng.unregister(&Uuid::new_v4()).is_empty());
    assert_eq!(eng.zone_count(), 0);
}

#[test]
fn unregister_removes_zone() {
    let (mut eng, _rx, _canvas, box1) = canvas_and_box();
    eng.unregister(&box1);
    assert!(!eng.is_registered(&box1));
    assert_eq!(eng.zone_count(), 1);
}

#[test]
fn zone_accepts_everything_when_filter_empty() {
    let (mut eng, _rx) = engine();
    let id = Uuid::new_v4();
    eng.register(id, rect(0.0, 0.0, 1.0, 1.0), vec![]);
    for kind in ElementKind::PALETTE {
        assert!(eng.zone(&id).unwrap().accepts(kind));
    }
}

// =============================================================
// Begin
// =============================================================

#[test]
fn pointer_down_enters_dragging_with_ghost_and_capture() {
    let (mut eng, _rx) = engine();
    let effects = begin(&mut eng, pt(10.0, 20.0));

    assert_eq!(eng.phase(), Phase::Dragging);
    assert_eq!(eng.ghost(), Some(pt(10.0, 20.0)));
    assert!(has(&effects, &Effect::CapturePointer(P)));
    assert!(has(&effects, &Effect::ShowGhost { source: text(), at: pt(10.0, 20.0) }));
    assert!(has(&effects, &Effect::SetCursor("grabbing".into())));
    match eng.state() {
        GestureState::Dragging { pointer_start, pointer_current, resolved_zone, .. } => {
            assert_eq!(*pointer_start, pt(10.0, 20.0));
            assert_eq!(*pointer_current, pt(10.0, 20.0));
            assert!(resolved_zone.is_none());
        }
        GestureState::Idle => panic!("expected dragging"),
    }
}

#[test]
fn pointer_down_while_dragging_is_a_conflict_and_is_ignored() {
    let (mut eng, _rx, _canvas, box1) = canvas_and_box();
    begin(&mut eng, pt(150.0, 150.0));
    eng.on_pointer_move(P, pt(150.0, 150.0));

    let err = eng.on_pointer_down(PointerId(2), pt(5.0, 5.0), DragSource::template(ElementKind::Image)).unwrap_err();

    assert_eq!(err, EditorError::GestureConflict);
    assert_eq!(eng.state().source(), Some(text()));
    assert_eq!(eng.state().resolved_zone(), Some(box1));
}

// =============================================================
// Update / resolution
// =============================================================

#[test]
fn move_resolves_innermost_zone() {
    let (mut eng, _rx, _canvas, box1) = canvas_and_box();
    begin(&mut eng, pt(0.0, 0.0));
    let effects = eng.on_pointer_move(P, pt(150.0, 150.0));

    assert_eq!(eng.state().resolved_zone(), Some(box1));
    assert_eq!(eng.highlighted(), Some(box1));
    assert!(has(&effects, &Effect::Highlight(box1)));
    assert!(has(&effects, &Effect::MoveGhost { at: pt(150.0, 150.0) }));
}

#[test]
fn nested_zone_with_smaller_area_always_wins() {
    let (mut eng, _rx) = engine();
    let outer = Uuid::new_v4();
    let inner = Uuid::new_v4();
    // Register inner first so registration order cannot be what decides.
    eng.register(inner, rect(40.0, 40.0, 20.0, 20.0), vec![]);
    eng.register(outer, rect(0.0, 0.0, 100.0, 100.0), vec![]);
    begin(&mut eng, pt(0.0, 0.0));
    eng.on_pointer_move(P, pt(50.0, 50.0));
    assert_eq!(eng.state().resolved_zone(), Some(inner));
}

#[test]
fn move_outside_inner_falls_back_to_outer() {
    let (mut eng, _rx, canvas, _box1) = canvas_and_box();
    begin(&mut eng, pt(0.0, 0.0));
    eng.on_pointer_move(P, pt(500.0, 500.0));
    assert_eq!(eng.state().resolved_zone(), Some(canvas));
}

#[test]
fn equal_areas_prefer_latest_registration() {
    let (mut eng, _rx) = engine();
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    eng.register(first, rect(0.0, 0.0, 100.0, 100.0), vec![]);
    eng.register(second, rect(0.0, 0.0, 100.0, 100.0), vec![]);
    begin(&mut eng, pt(0.0, 0.0));
    eng.on_pointer_move(P, pt(50.0, 50.0));
    assert_eq!(eng.state().resolved_zone(), Some(second));
}

#[test]
fn highlight_moves_from_ancestor_to_descendant() {
    let (mut eng, _rx, canvas, box1) = canvas_and_box();
    begin(&mut eng, pt(0.0, 0.0));
    eng.on_pointer_move(P, pt(50.0, 50.0));
    assert_eq!(eng.highlighted(), Some(canvas));

    let effects = eng.on_pointer_move(P, pt(150.0, 150.0));

    assert_eq!(effects[1..], [Effect::ClearHighlight(canvas), Effect::Highlight(box1)]);
    assert_eq!(eng.highlighted(), Some(box1));
}

#[test]
fn unchanged_target_emits_no_highlight_churn() {
    let (mut eng, _rx, _canvas, _box1) = canvas_and_box();
    begin(&mut eng, pt(0.0, 0.0));
    eng.on_pointer_move(P, pt(150.0, 150.0));
    let effects = eng.on_pointer_move(P, pt(160.0, 160.0));
    assert_eq!(effects, vec![Effect::MoveGhost { at: pt(160.0, 160.0) }]);
}

#[test]
fn move_outside_all_zones_clears_highlight() {
    let (mut eng, _rx, _canvas, box1) = canvas_and_box();
    begin(&mut eng, pt(0.0, 0.0));
    eng.on_pointer_move(P, pt(150.0, 150.0));
    let effects = eng.on_pointer_move(P, pt(900.0, 900.0));
    assert!(has(&effects, &Effect::ClearHighlight(box1)));
    assert_eq!(eng.highlighted(), None);
    assert_eq!(eng.state().resolved_zone(), None);
}

#[test]
fn move_while_idle_is_ignored() {
    let (mut eng, _rx, _canvas, _box1) = canvas_and_box();
    assert!(eng.on_pointer_move(P, pt(150.0, 150.0)).is_empty());
    assert_eq!(eng.highlighted(), None);
}

#[test]
fn move_from_other_pointer_is_ignored() {
    let (mut eng, _rx, _canvas, _box1) = canvas_and_box();
    begin(&mut eng, pt(0.0, 0.0));
    assert!(eng.on_pointer_move(PointerId(7), pt(150.0, 150.0)).is_empty());
    assert_eq!(eng.state().resolved_zone(), None);
}

#[test]
fn bounds_are_refreshed_on_every_resolution() {
    let (mut eng, _rx) = engine();
    let canvas = Uuid::nil();
    let scrolled = SharedRect::new(Rect::new(100.0, 100.0, 200.0, 200.0));
    let box1 = Uuid::new_v4();
    eng.register(canvas, rect(0.0, 0.0, 800.0, 600.0), vec![]);
    eng.register(box1, Box::new(scrolled.clone()), vec![]);

    begin(&mut eng, pt(0.0, 0.0));
    eng.on_pointer_move(P, pt(150.0, 150.0));
    assert_eq!(eng.state().resolved_zone(), Some(box1));

    // Content scrolls up by 300px: the box is no longer under the pointer.
    scrolled.translate(0.0, -300.0);
    eng.on_pointer_move(P, pt(150.0, 150.0));
    assert_eq!(eng.state().resolved_zone(), Some(canvas));
    assert_eq!(eng.zone(&box1).unwrap().bounds, Rect::new(100.0, -200.0, 200.0, 200.0));
}

// =============================================================
// Acceptance filtering
// =============================================================

#[test]
fn rejecting_zone_falls_through_to_accepting_ancestor() {
    let (mut eng, _rx) = engine();
    let outer = Uuid::new_v4();
    let inner = Uuid::new_v4();
    eng.register(outer, rect(0.0, 0.0, 100.0, 100.0), vec![]);
    eng.register(inner, rect(40.0, 40.0, 20.0, 20.0), vec![ElementKind::Image]);
    begin(&mut eng, pt(0.0, 0.0));
    eng.on_pointer_move(P, pt(50.0, 50.0));
    assert_eq!(eng.state().resolved_zone(), Some(outer));
}

#[test]
fn accepting_filter_keeps_inner_zone() {
    let (mut eng, _rx) = engine();
    let outer = Uuid::new_v4();
    let inner = Uuid::new_v4();
    eng.register(outer, rect(0.0, 0.0, 100.0, 100.0), vec![]);
    eng.register(inner, rect(40.0, 40.0, 20.0, 20.0), vec![ElementKind::Text, ElementKind::Heading]);
    begin(&mut eng, pt(0.0, 0.0));
    eng.on_pointer_move(P, pt(50.0, 50.0));
    assert_eq!(eng.state().resolved_zone(), Some(inner));
}

#[test]
fn no_accepting_zone_resolves_none() {
    let (mut eng, _rx) = engine();
    let only = Uuid::new_v4();
    eng.register(only, rect(0.0, 0.0, 100.0, 100.0), vec![ElementKind::Button]);
    begin(&mut eng, pt(0.0, 0.0));
    eng.on_pointer_move(P, pt(50.0, 50.0));
    assert_eq!(eng.state().resolved_zone(), None);
}

#[test]
fn cancel_policy_does_not_fall_through() {
    let (tx, _rx) = unbounded_channel();
    let mut eng = DragDropEngine::new(RejectPolicy::Cancel, tx);
    let outer = Uuid::new_v4();
    let inner = Uuid::new_v4();
    eng.register(outer, rect(0.0, 0.0, 100.0, 100.0), vec![]);
    eng.register(inner, rect(40.0, 40.0, 20.0, 20.0), vec![ElementKind::Image]);
    begin(&mut eng, pt(0.0, 0.0));

    eng.on_pointer_move(P, pt(50.0, 50.0));
    assert_eq!(eng.state().resolved_zone(), None);

    eng.on_pointer_move(P, pt(10.0, 10.0));
    assert_eq!(eng.state().resolved_zone(), Some(outer));
}

#[test]
fn dragged_node_never_resolves_to_its_own_zone() {
    let (mut eng, _rx) = engine();
    let outer = Uuid::new_v4();
    let dragged = Uuid::new_v4();
    eng.register(outer, rect(0.0, 0.0, 100.0, 100.0), vec![]);
    eng.register(dragged, rect(40.0, 40.0, 20.0, 20.0), vec![]);
    eng.on_pointer_down(P, pt(50.0, 50.0), DragSource::node(dragged, ElementKind::Container)).unwrap();
    eng.on_pointer_move(P, pt(50.0, 50.0));
    assert_eq!(eng.state().resolved_zone(), Some(outer));
}

#[test]
fn excluded_zones_are_skipped_for_the_whole_gesture() {
    let (mut eng, mut rx) = engine();
    let canvas = Uuid::nil();
    let dragged = Uuid::new_v4();
    let nested = Uuid::new_v4();
    eng.register(canvas, rect(0.0, 0.0, 800.0, 600.0), vec![]);
    eng.register(dragged, rect(100.0, 100.0, 300.0, 300.0), vec![]);
    eng.register(nested, rect(150.0, 150.0, 50.0, 50.0), vec![]);

    let source = DragSource::node(dragged, ElementKind::Container);
    eng.on_pointer_down_excluding(P, pt(120.0, 120.0), source, HashSet::from([nested])).unwrap();
    let effects = eng.on_pointer_move(P, pt(160.0, 160.0));

    assert!(!has(&effects, &Effect::Highlight(nested)));
    assert_eq!(eng.state().resolved_zone(), Some(canvas));
    eng.on_pointer_up(P, pt(160.0, 160.0));
    assert_eq!(rx.try_recv().unwrap().zone, canvas);
}

#[test]
fn exclusions_end_with_the_gesture() {
    let (mut eng, _rx, _canvas, box1) = canvas_and_box();
    let source = DragSource::node(Uuid::new_v4(), ElementKind::Text);
    eng.on_pointer_down_excluding(P, pt(0.0, 0.0), source, HashSet::from([box1])).unwrap();
    eng.on_pointer_up(P, pt(900.0, 900.0));

    begin(&mut eng, pt(0.0, 0.0));
    eng.on_pointer_move(P, pt(150.0, 150.0));
    assert_eq!(eng.state().resolved_zone(), Some(box1));
}

// =============================================================
// End
// =============================================================

#[test]
fn release_over_zone_emits_single_decision() {
    let (mut eng, mut rx, _canvas, box1) = canvas_and_box();
    begin(&mut eng, pt(0.0, 0.0));
    eng.on_pointer_move(P, pt(150.0, 150.0));
    eng.on_pointer_up(P, pt(150.0, 150.0));

    assert_eq!(rx.try_recv().unwrap(), DropDecision { source: text(), zone: box1, travelled: true });
    assert!(rx.try_recv().is_err());
    assert_eq!(eng.phase(), Phase::Idle);
}

#[test]
fn release_outside_all_zones_emits_nothing_and_cleans_up() {
    let (mut eng, mut rx, _canvas, box1) = canvas_and_box();
    begin(&mut eng, pt(0.0, 0.0));
    eng.on_pointer_move(P, pt(150.0, 150.0));
    let effects = eng.on_pointer_up(P, pt(900.0, 900.0));

    assert!(rx.try_recv().is_err());
    assert_eq!(eng.phase(), Phase::Idle);
    assert_eq!(eng.ghost(), None);
    assert_eq!(eng.highlighted(), None);
    assert!(has(&effects, &Effect::ClearHighlight(box1)));
    assert!(has(&effects, &Effect::RemoveGhost));
    assert!(has(&effects, &Effect::ReleasePointer(P)));
    assert!(has(&effects, &Effect::SetCursor("default".into())));
}

#[test]
fn release_resolves_at_release_point_without_prior_move() {
    let (mut eng, mut rx, _canvas, box1) = canvas_and_box();
    begin(&mut eng, pt(0.0, 0.0));
    eng.on_pointer_up(P, pt(150.0, 150.0));
    assert_eq!(rx.try_recv().unwrap().zone, box1);
}

#[test]
fn release_near_start_is_not_travelled() {
    let (mut eng, mut rx, _canvas, box1) = canvas_and_box();
    begin(&mut eng, pt(150.0, 150.0));
    eng.on_pointer_move(P, pt(151.0, 151.0));
    eng.on_pointer_up(P, pt(152.0, 150.0));
    assert_eq!(rx.try_recv().unwrap(), DropDecision { source: text(), zone: box1, travelled: false });
}

#[test]
fn travel_is_remembered_after_returning_to_start() {
    let (mut eng, mut rx, _canvas, _box1) = canvas_and_box();
    begin(&mut eng, pt(150.0, 150.0));
    eng.on_pointer_move(P, pt(250.0, 250.0));
    eng.on_pointer_move(P, pt(150.0, 150.0));
    eng.on_pointer_up(P, pt(150.0, 150.0));
    assert!(rx.try_recv().unwrap().travelled);
}

#[test]
fn release_from_other_pointer_is_ignored() {
    let (mut eng, mut rx, _canvas, _box1) = canvas_and_box();
    begin(&mut eng, pt(0.0, 0.0));
    assert!(eng.on_pointer_up(PointerId(9), pt(150.0, 150.0)).is_empty());
    assert_eq!(eng.phase(), Phase::Dragging);
    assert!(rx.try_recv().is_err());
}

#[test]
fn release_while_idle_is_ignored() {
    let (mut eng, mut rx, _canvas, _box1) = canvas_and_box();
    assert!(eng.on_pointer_up(P, pt(150.0, 150.0)).is_empty());
    assert!(rx.try_recv().is_err());
}

#[test]
fn dropped_receiver_does_not_break_the_gesture() {
    let (mut eng, rx, _canvas, _box1) = canvas_and_box();
    drop(rx);
    begin(&mut eng, pt(0.0, 0.0));
    eng.on_pointer_up(P, pt(150.0, 150.0));
    assert_eq!(eng.phase(), Phase::Idle);
}

#[test]
fn new_gesture_can_start_after_previous_ends() {
    let (mut eng, mut rx, canvas, _box1) = canvas_and_box();
    begin(&mut eng, pt(0.0, 0.0));
    eng.on_pointer_up(P, pt(900.0, 900.0));
    begin(&mut eng, pt(0.0, 0.0));
    eng.on_pointer_up(P, pt(10.0, 10.0));
    assert_eq!(rx.try_recv().unwrap().zone, canvas);
}

// =============================================================
// Cancellation
// =============================================================

#[test]
fn lost_capture_forces_idle_without_decision() {
    let (mut eng, mut rx, _canvas, box1) = canvas_and_box();
    begin(&mut eng, pt(0.0, 0.0));
    eng.on_pointer_move(P, pt(150.0, 150.0));
    let effects = eng.on_lost_pointer_capture(P);

    assert_eq!(eng.phase(), Phase::Idle);
    assert!(has(&effects, &Effect::ClearHighlight(box1)));
    assert!(has(&effects, &Effect::RemoveGhost));
    assert!(rx.try_recv().is_err());
}

#[test]
fn lost_capture_of_other_pointer_is_ignored() {
    let (mut eng, _rx, _canvas, _box1) = canvas_and_box();
    begin(&mut eng, pt(0.0, 0.0));
    assert!(eng.on_lost_pointer_capture(PointerId(3)).is_empty());
    assert_eq!(eng.phase(), Phase::Dragging);
}

#[test]
fn cancel_while_idle_is_noop() {
    let (mut eng, _rx) = engine();
    assert!(eng.cancel().is_empty());
}

#[test]
fn unregistering_resolved_zone_mid_drag_clears_target() {
    let (mut eng, mut rx, _canvas, box1) = canvas_and_box();
    begin(&mut eng, pt(0.0, 0.0));
    eng.on_pointer_move(P, pt(150.0, 150.0));

    let effects = eng.unregister(&box1);

    assert_eq!(effects, vec![Effect::ClearHighlight(box1)]);
    assert_eq!(eng.state().resolved_zone(), None);
    eng.on_pointer_up(P, pt(150.0, 150.0));
    assert_ne!(rx.try_recv().unwrap().zone, box1);
}
