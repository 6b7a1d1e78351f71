// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end arbitration scenarios driven through the arbiter.

use kurbo::{Point, Rect};
use understory_gesture::{
    Arbiter, BuiltinGestures, Composition, Directions, DragRequest, GestureAction,
    GestureDeclaration, GestureEvent, GestureKind, GestureListener, GestureMask, GestureNode,
    GesturePriority, HitTestMode, NodeId, PlainTarget, RecognizerSource, RecognizerState,
    SourceDevice, TouchEvent, TouchId, TouchPhase,
};

#[derive(Default)]
struct Recorder {
    gestures: Vec<(GestureKind, RecognizerSource, GestureAction)>,
    infos: Vec<GestureEvent>,
    touches: Vec<(NodeId, TouchPhase)>,
    drags: Vec<DragRequest>,
}

impl Recorder {
    fn record(&mut self, event: &GestureEvent) {
        self.gestures.push((event.kind, event.source, event.action));
        self.infos.push(event.clone());
    }

    fn starts(&self, kind: GestureKind) -> usize {
        self.gestures
            .iter()
            .filter(|(k, _, a)| *k == kind && *a == GestureAction::Start)
            .count()
    }
}

impl GestureListener for Recorder {
    fn on_action_start(&mut self, event: &GestureEvent) {
        self.record(event);
    }
    fn on_action_update(&mut self, event: &GestureEvent) {
        self.record(event);
    }
    fn on_action_end(&mut self, event: &GestureEvent) {
        self.record(event);
    }
    fn on_action_cancel(&mut self, event: &GestureEvent) {
        self.record(event);
    }
    fn on_touch(&mut self, target: &PlainTarget, event: &TouchEvent) {
        self.touches.push((target.node, event.phase));
    }
    fn begin_drag(&mut self, request: &DragRequest) {
        self.drags.push(request.clone());
    }
}

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> GestureNode {
    GestureNode::new(Rect::new(x0, y0, x1, y1))
}

fn p(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

/// Built-in click `C` plus `[LongPress:Parallel, Pan:High]`.
fn scenario() -> (Arbiter, NodeId) {
    let mut arbiter = Arbiter::new();
    let tree = arbiter.tree_mut();
    let node = tree.insert(None, rect(0.0, 0.0, 200.0, 200.0)).unwrap();
    tree.set_builtins(node, BuiltinGestures::default().with_click())
        .unwrap();
    tree.set_gestures(
        node,
        vec![
            GestureDeclaration::new(GestureKind::LongPress)
                .with_priority(GesturePriority::Parallel),
            GestureDeclaration::new(GestureKind::Pan).with_priority(GesturePriority::High),
        ],
    )
    .unwrap();
    (arbiter, node)
}

fn state_of(arbiter: &Arbiter, node: NodeId, source: RecognizerSource) -> Option<RecognizerState> {
    let tree = arbiter.tree();
    let key = match source {
        RecognizerSource::Declared(i) => tree.declared_recognizers(node).nth(usize::from(i)),
        other => tree.builtin_recognizer(node, other),
    }?;
    tree.recognizer(key).map(|r| r.state())
}

#[test]
fn pan_beats_long_press_and_click() {
    let (mut arbiter, node) = scenario();
    let mut rec = Recorder::default();

    arbiter.handle(&TouchEvent::down(1, p(50.0, 50.0), 0), &mut rec);
    let top = arbiter
        .touch_result(TouchId(1))
        .and_then(|r| r.participants().next())
        .unwrap();
    assert_eq!(
        arbiter.tree().composition(top),
        Some(Composition::exclusive(vec![
            Composition::leaf(GestureKind::Pan, RecognizerSource::Declared(1)),
            Composition::parallel(vec![
                Composition::leaf(GestureKind::LongPress, RecognizerSource::Declared(0)),
                Composition::leaf(GestureKind::Tap, RecognizerSource::Click),
            ]),
        ]))
    );

    arbiter.handle(&TouchEvent::moved(1, p(80.0, 50.0), 100), &mut rec);
    assert_eq!(rec.starts(GestureKind::Pan), 1);
    assert_eq!(
        state_of(&arbiter, node, RecognizerSource::Declared(0)),
        Some(RecognizerState::Rejected)
    );
    assert_eq!(
        state_of(&arbiter, node, RecognizerSource::Click),
        Some(RecognizerState::Rejected)
    );

    // The long-press timer fires after the pan won; nothing happens.
    arbiter.advance(600, &mut rec);
    arbiter.handle(&TouchEvent::moved(1, p(90.0, 50.0), 650), &mut rec);
    arbiter.handle(&TouchEvent::up(1, p(90.0, 50.0), 700), &mut rec);

    assert_eq!(
        rec.gestures,
        vec![
            (GestureKind::Pan, RecognizerSource::Declared(1), GestureAction::Start),
            (GestureKind::Pan, RecognizerSource::Declared(1), GestureAction::Update),
            (GestureKind::Pan, RecognizerSource::Declared(1), GestureAction::End),
        ]
    );
    assert_eq!(rec.starts(GestureKind::Pan), 1, "pan starts exactly once");
    assert!(arbiter.referee().is_empty());
}

#[test]
fn holding_still_lets_long_press_and_click_share_the_touch() {
    let (mut arbiter, node) = scenario();
    let mut rec = Recorder::default();

    arbiter.handle(&TouchEvent::down(1, p(50.0, 50.0), 0), &mut rec);
    arbiter.advance(500, &mut rec);
    assert_eq!(rec.starts(GestureKind::LongPress), 1);
    assert_eq!(
        state_of(&arbiter, node, RecognizerSource::Declared(1)),
        Some(RecognizerState::Rejected),
        "the exclusive pan loses to the parallel group"
    );

    arbiter.handle(&TouchEvent::up(1, p(50.0, 50.0), 800), &mut rec);
    assert_eq!(rec.starts(GestureKind::Tap), 1, "click is not excluded by the long press");
    assert_eq!(
        state_of(&arbiter, node, RecognizerSource::Declared(0)),
        Some(RecognizerState::Accepted)
    );
}

#[test]
fn tap_only_accepts_on_up() {
    let mut arbiter = Arbiter::new();
    let node = arbiter
        .tree_mut()
        .insert(None, rect(0.0, 0.0, 100.0, 100.0))
        .unwrap();
    arbiter
        .tree_mut()
        .set_gestures(node, vec![GestureDeclaration::new(GestureKind::Tap)])
        .unwrap();
    let mut rec = Recorder::default();

    arbiter.handle(&TouchEvent::down(1, p(10.0, 10.0), 0), &mut rec);
    arbiter.handle(&TouchEvent::moved(1, p(12.0, 10.0), 20), &mut rec);
    assert!(rec.gestures.is_empty());
    arbiter.handle(&TouchEvent::up(1, p(12.0, 10.0), 40), &mut rec);
    assert_eq!(
        rec.gestures,
        vec![
            (GestureKind::Tap, RecognizerSource::Declared(0), GestureAction::Start),
            (GestureKind::Tap, RecognizerSource::Declared(0), GestureAction::End),
        ]
    );
    let info = &rec.infos[0].info;
    assert_eq!(info.local_point, p(12.0, 10.0));
    assert_eq!(info.touch, TouchId(1));
}

#[test]
fn double_tap_spans_two_touches() {
    let mut arbiter = Arbiter::new();
    let node = arbiter
        .tree_mut()
        .insert(None, rect(0.0, 0.0, 100.0, 100.0))
        .unwrap();
    arbiter
        .tree_mut()
        .set_gestures(
            node,
            vec![GestureDeclaration::new(GestureKind::Tap).with_count(2)],
        )
        .unwrap();
    let mut rec = Recorder::default();

    arbiter.handle(&TouchEvent::down(1, p(10.0, 10.0), 0), &mut rec);
    arbiter.handle(&TouchEvent::up(1, p(10.0, 10.0), 50), &mut rec);
    assert!(rec.gestures.is_empty());
    arbiter.handle(&TouchEvent::down(2, p(11.0, 10.0), 150), &mut rec);
    arbiter.handle(&TouchEvent::up(2, p(11.0, 10.0), 200), &mut rec);
    assert_eq!(rec.starts(GestureKind::Tap), 1);

    // A lone tap times out.
    arbiter.handle(&TouchEvent::down(3, p(10.0, 10.0), 1000), &mut rec);
    arbiter.handle(&TouchEvent::up(3, p(10.0, 10.0), 1050), &mut rec);
    arbiter.advance(1400, &mut rec);
    assert_eq!(rec.starts(GestureKind::Tap), 1);
    assert_eq!(
        state_of(&arbiter, node, RecognizerSource::Declared(0)),
        Some(RecognizerState::Rejected)
    );
}

#[test]
fn nested_child_wins_ties_against_parent() {
    let mut arbiter = Arbiter::new();
    let tree = arbiter.tree_mut();
    let parent = tree.insert(None, rect(0.0, 0.0, 200.0, 200.0)).unwrap();
    let child = tree.insert(Some(parent), rect(20.0, 20.0, 120.0, 120.0)).unwrap();
    tree.set_builtins(parent, BuiltinGestures::default().with_click())
        .unwrap();
    tree.set_builtins(child, BuiltinGestures::default().with_click())
        .unwrap();
    let mut rec = Recorder::default();

    arbiter.handle(&TouchEvent::down(1, p(50.0, 50.0), 0), &mut rec);
    arbiter.handle(&TouchEvent::up(1, p(50.0, 50.0), 30), &mut rec);
    assert_eq!(rec.starts(GestureKind::Tap), 1);
    assert_eq!(rec.infos[0].target.map(|t| t.node), Some(child));
    assert_eq!(rec.infos[0].info.coordinate_offset, kurbo::Vec2::new(20.0, 20.0));
    assert_eq!(
        state_of(&arbiter, parent, RecognizerSource::Click),
        Some(RecognizerState::Rejected)
    );

    // Outside the child only the parent is hit.
    arbiter.handle(&TouchEvent::down(2, p(150.0, 150.0), 100), &mut rec);
    arbiter.handle(&TouchEvent::up(2, p(150.0, 150.0), 130), &mut rec);
    assert_eq!(rec.infos.last().and_then(|e| e.target).map(|t| t.node), Some(parent));
}

#[test]
fn high_priority_parent_gesture_beats_child() {
    let mut arbiter = Arbiter::new();
    let tree = arbiter.tree_mut();
    let parent = tree.insert(None, rect(0.0, 0.0, 200.0, 200.0)).unwrap();
    let child = tree.insert(Some(parent), rect(0.0, 0.0, 200.0, 200.0)).unwrap();
    tree.set_builtins(child, BuiltinGestures::default().with_pan())
        .unwrap();
    tree.set_gestures(
        parent,
        vec![GestureDeclaration::new(GestureKind::Pan).with_priority(GesturePriority::High)],
    )
    .unwrap();
    let mut rec = Recorder::default();

    arbiter.handle(&TouchEvent::down(1, p(50.0, 50.0), 0), &mut rec);
    arbiter.handle(&TouchEvent::moved(1, p(80.0, 50.0), 10), &mut rec);
    assert_eq!(
        rec.gestures,
        vec![(GestureKind::Pan, RecognizerSource::Declared(0), GestureAction::Start)]
    );
    assert_eq!(rec.infos[0].target.map(|t| t.node), Some(parent));
    assert_eq!(
        state_of(&arbiter, child, RecognizerSource::Pan),
        Some(RecognizerState::Rejected)
    );
}

#[test]
fn mask_replaces_builtins() {
    let mut arbiter = Arbiter::new();
    let tree = arbiter.tree_mut();
    let node = tree.insert(None, rect(0.0, 0.0, 100.0, 100.0)).unwrap();
    tree.set_builtins(node, BuiltinGestures::default().with_click().with_pan())
        .unwrap();
    tree.set_gestures(
        node,
        vec![GestureDeclaration::new(GestureKind::Tap).with_mask(GestureMask::IgnoreSelfBuiltins)],
    )
    .unwrap();
    let mut rec = Recorder::default();

    arbiter.handle(&TouchEvent::down(1, p(10.0, 10.0), 0), &mut rec);
    let top = arbiter
        .touch_result(TouchId(1))
        .and_then(|r| r.participants().next())
        .unwrap();
    assert_eq!(
        arbiter.tree().composition(top),
        Some(Composition::leaf(GestureKind::Tap, RecognizerSource::Declared(0)))
    );
    arbiter.handle(&TouchEvent::up(1, p(10.0, 10.0), 30), &mut rec);
    assert_eq!(
        rec.gestures.first().map(|g| g.1),
        Some(RecognizerSource::Declared(0))
    );
    let click = arbiter
        .tree()
        .builtin_recognizer(node, RecognizerSource::Click)
        .unwrap();
    assert!(
        arbiter
            .tree()
            .recognizer(click)
            .is_some_and(|r| r.touch_ids().is_empty()),
        "masked built-ins do not hold the touch"
    );
}

#[test]
fn reconciliation_waits_for_the_touch_to_end() {
    let mut arbiter = Arbiter::new();
    let tree = arbiter.tree_mut();
    let node = tree.insert(None, rect(0.0, 0.0, 100.0, 100.0)).unwrap();
    tree.set_gestures(node, vec![GestureDeclaration::new(GestureKind::Pan)])
        .unwrap();
    let mut rec = Recorder::default();

    arbiter.handle(&TouchEvent::down(1, p(10.0, 10.0), 0), &mut rec);
    let pan = arbiter.tree().declared_recognizers(node).next().unwrap();
    arbiter.handle(&TouchEvent::moved(1, p(30.0, 10.0), 10), &mut rec);

    // Incompatible change mid-gesture.
    arbiter
        .tree_mut()
        .set_gestures(node, vec![GestureDeclaration::new(GestureKind::Swipe)])
        .unwrap();
    // A second finger lands while the first is still down: still no rebuild.
    arbiter.handle(&TouchEvent::down(2, p(50.0, 50.0), 20), &mut rec);
    assert!(arbiter.tree().has_pending(node));
    assert_eq!(arbiter.tree().declared_recognizers(node).next(), Some(pan));

    arbiter.handle(&TouchEvent::moved(1, p(40.0, 10.0), 30), &mut rec);
    arbiter.handle(&TouchEvent::up(1, p(40.0, 10.0), 40), &mut rec);
    arbiter.handle(&TouchEvent::up(2, p(50.0, 50.0), 40), &mut rec);
    assert_eq!(
        rec.gestures
            .iter()
            .map(|g| g.2)
            .collect::<Vec<_>>(),
        vec![GestureAction::Start, GestureAction::Update, GestureAction::End]
    );

    // Next idle hit test applies the change.
    arbiter.handle(&TouchEvent::down(3, p(10.0, 10.0), 100), &mut rec);
    assert!(!arbiter.tree().has_pending(node));
    assert!(arbiter.tree().recognizer(pan).is_none());
    let swipe = arbiter.tree().declared_recognizers(node).next().unwrap();
    assert_eq!(
        arbiter.tree().recognizer(swipe).map(|r| r.kind()),
        Some(GestureKind::Swipe)
    );
}

#[test]
fn compatible_redeclaration_keeps_the_instance() {
    let mut arbiter = Arbiter::new();
    let tree = arbiter.tree_mut();
    let node = tree.insert(None, rect(0.0, 0.0, 100.0, 100.0)).unwrap();
    tree.set_gestures(node, vec![GestureDeclaration::new(GestureKind::Pan)])
        .unwrap();
    let mut rec = Recorder::default();
    arbiter.handle(&TouchEvent::down(1, p(10.0, 10.0), 0), &mut rec);
    arbiter.handle(&TouchEvent::up(1, p(10.0, 10.0), 10), &mut rec);
    let pan = arbiter.tree().declared_recognizers(node).next().unwrap();

    arbiter
        .tree_mut()
        .set_gestures(
            node,
            vec![GestureDeclaration::new(GestureKind::Pan).with_distance(50.0)],
        )
        .unwrap();
    arbiter.handle(&TouchEvent::down(2, p(10.0, 10.0), 100), &mut rec);
    assert_eq!(arbiter.tree().declared_recognizers(node).next(), Some(pan));

    arbiter.handle(&TouchEvent::moved(2, p(40.0, 10.0), 110), &mut rec);
    assert!(rec.gestures.is_empty(), "new threshold applies");
    arbiter.handle(&TouchEvent::moved(2, p(70.0, 10.0), 120), &mut rec);
    assert_eq!(rec.starts(GestureKind::Pan), 1);
}

#[test]
fn removing_a_node_mid_gesture_silences_it() {
    let mut arbiter = Arbiter::new();
    let tree = arbiter.tree_mut();
    let parent = tree.insert(None, rect(0.0, 0.0, 200.0, 200.0)).unwrap();
    let child = tree.insert(Some(parent), rect(0.0, 0.0, 100.0, 100.0)).unwrap();
    tree.set_builtins(parent, BuiltinGestures::default().with_touch_listener())
        .unwrap();
    tree.set_builtins(
        child,
        BuiltinGestures::default()
            .with_pan()
            .with_long_press()
            .with_touch_listener(),
    )
    .unwrap();
    let mut rec = Recorder::default();

    arbiter.handle(&TouchEvent::down(1, p(10.0, 10.0), 0), &mut rec);
    let pan = arbiter
        .tree()
        .builtin_recognizer(child, RecognizerSource::Pan)
        .unwrap();
    assert_eq!(arbiter.remove_node(child), Ok(vec![child]));
    assert!(arbiter.tree().recognizer(pan).is_none());

    arbiter.handle(&TouchEvent::moved(1, p(60.0, 10.0), 10), &mut rec);
    arbiter.advance(1000, &mut rec);
    arbiter.handle(&TouchEvent::up(1, p(60.0, 10.0), 1100), &mut rec);
    assert!(rec.gestures.is_empty());
    assert_eq!(
        rec.touches,
        vec![
            (child, TouchPhase::Down),
            (parent, TouchPhase::Down),
            (parent, TouchPhase::Move),
            (parent, TouchPhase::Up),
        ]
    );
    assert!(arbiter.remove_node(child).is_err());
}

#[test]
fn drag_and_long_press_race() {
    let mut arbiter = Arbiter::new();
    let tree = arbiter.tree_mut();
    let node = tree.insert(None, rect(0.0, 0.0, 100.0, 100.0)).unwrap();
    tree.set_builtins(
        node,
        BuiltinGestures::default()
            .with_long_press()
            .with_drag(b"payload".to_vec()),
    )
    .unwrap();
    let mut rec = Recorder::default();

    arbiter.handle(&TouchEvent::down(4, p(10.0, 10.0), 0), &mut rec);
    arbiter.handle(&TouchEvent::moved(4, p(40.0, 10.0), 50), &mut rec);
    assert_eq!(rec.starts(GestureKind::Drag), 1);
    assert_eq!(rec.drags.len(), 1);
    assert_eq!(rec.drags[0].pointer, TouchId(4));
    assert_eq!(rec.drags[0].extra_info, b"payload".to_vec());
    assert_eq!(
        state_of(&arbiter, node, RecognizerSource::LongPress),
        Some(RecognizerState::Rejected),
        "long press fails its slop"
    );
}

#[test]
fn pinch_needs_both_fingers() {
    let mut arbiter = Arbiter::new();
    let node = arbiter
        .tree_mut()
        .insert(None, rect(0.0, 0.0, 300.0, 300.0))
        .unwrap();
    arbiter
        .tree_mut()
        .set_gestures(node, vec![GestureDeclaration::new(GestureKind::Pinch)])
        .unwrap();
    let mut rec = Recorder::default();

    arbiter.handle(&TouchEvent::down(1, p(100.0, 100.0), 0), &mut rec);
    arbiter.handle(&TouchEvent::down(2, p(200.0, 100.0), 10), &mut rec);
    arbiter.handle(&TouchEvent::moved(2, p(240.0, 100.0), 20), &mut rec);
    assert_eq!(rec.starts(GestureKind::Pinch), 1);
    let scale = rec.infos[0].info.scale;
    assert!(scale > 1.3 && scale < 1.5, "scale was {scale}");

    arbiter.handle(&TouchEvent::moved(2, p(260.0, 100.0), 30), &mut rec);
    arbiter.handle(&TouchEvent::up(2, p(260.0, 100.0), 40), &mut rec);
    arbiter.handle(&TouchEvent::up(1, p(100.0, 100.0), 50), &mut rec);
    let actions: Vec<_> = rec.gestures.iter().map(|g| g.2).collect();
    assert_eq!(
        actions,
        vec![GestureAction::Start, GestureAction::Update, GestureAction::End]
    );
    assert!(arbiter.referee().is_empty());
}

#[test]
fn scrollable_pans_only_along_its_axis() {
    let mut arbiter = Arbiter::new();
    let node = arbiter
        .tree_mut()
        .insert(None, rect(0.0, 0.0, 100.0, 300.0))
        .unwrap();
    arbiter
        .tree_mut()
        .set_builtins(
            node,
            BuiltinGestures::default().with_scrollable(Directions::VERTICAL),
        )
        .unwrap();
    let mut rec = Recorder::default();

    arbiter.handle(&TouchEvent::down(1, p(50.0, 50.0), 0), &mut rec);
    arbiter.handle(&TouchEvent::moved(1, p(80.0, 52.0), 10), &mut rec);
    arbiter.handle(&TouchEvent::up(1, p(80.0, 52.0), 20), &mut rec);
    assert!(rec.gestures.is_empty());

    arbiter.handle(&TouchEvent::down(2, p(50.0, 50.0), 100), &mut rec);
    arbiter.handle(&TouchEvent::moved(2, p(51.0, 90.0), 110), &mut rec);
    assert_eq!(
        rec.gestures,
        vec![(GestureKind::Pan, RecognizerSource::Scrollable, GestureAction::Start)]
    );
}

#[test]
fn cancel_ends_an_accepted_gesture() {
    let mut arbiter = Arbiter::new();
    let node = arbiter
        .tree_mut()
        .insert(None, rect(0.0, 0.0, 100.0, 100.0))
        .unwrap();
    arbiter
        .tree_mut()
        .set_builtins(node, BuiltinGestures::default().with_pan())
        .unwrap();
    let mut rec = Recorder::default();

    let down = TouchEvent::down(1, p(10.0, 10.0), 0).with_device(SourceDevice::Pen);
    arbiter.handle(&down, &mut rec);
    arbiter.handle(&TouchEvent::moved(1, p(40.0, 10.0), 10), &mut rec);
    arbiter.handle(&TouchEvent::cancel(1, p(40.0, 10.0), 20), &mut rec);
    let actions: Vec<_> = rec.gestures.iter().map(|g| g.2).collect();
    assert_eq!(actions, vec![GestureAction::Start, GestureAction::Cancel]);
    assert!(arbiter.touch_result(TouchId(1)).is_none());
}

#[test]
fn transparent_overlay_lets_lower_sibling_compete() {
    let mut arbiter = Arbiter::new();
    let tree = arbiter.tree_mut();
    let root = tree.insert(None, rect(0.0, 0.0, 200.0, 200.0)).unwrap();
    let lower = tree.insert(Some(root), rect(0.0, 0.0, 200.0, 200.0)).unwrap();
    let overlay = tree
        .insert(
            Some(root),
            rect(0.0, 0.0, 200.0, 200.0).with_mode(HitTestMode::Transparent),
        )
        .unwrap();
    tree.set_builtins(lower, BuiltinGestures::default().with_click())
        .unwrap();
    tree.set_builtins(
        overlay,
        BuiltinGestures::default().with_pan().with_touch_listener(),
    )
    .unwrap();
    let mut rec = Recorder::default();

    arbiter.handle(&TouchEvent::down(1, p(10.0, 10.0), 0), &mut rec);
    arbiter.handle(&TouchEvent::up(1, p(10.0, 10.0), 30), &mut rec);
    assert_eq!(rec.starts(GestureKind::Tap), 1);
    assert_eq!(rec.infos[0].target.map(|t| t.node), Some(lower));
    assert_eq!(
        rec.touches,
        vec![(overlay, TouchPhase::Down), (overlay, TouchPhase::Up)]
    );
}

#[test]
fn second_finger_on_the_parent_leaves_the_first_touch_intact() {
    let mut arbiter = Arbiter::new();
    let tree = arbiter.tree_mut();
    let parent = tree.insert(None, rect(0.0, 0.0, 400.0, 400.0)).unwrap();
    let child = tree.insert(Some(parent), rect(0.0, 0.0, 100.0, 100.0)).unwrap();
    tree.set_builtins(child, BuiltinGestures::default().with_click())
        .unwrap();
    tree.set_gestures(
        parent,
        vec![
            GestureDeclaration::new(GestureKind::Pan),
            GestureDeclaration::new(GestureKind::Tap).with_priority(GesturePriority::Parallel),
        ],
    )
    .unwrap();
    let click = tree
        .builtin_recognizer(child, RecognizerSource::Click)
        .unwrap();
    let mut rec = Recorder::default();

    let first_shape = Some(Composition::parallel(vec![
        Composition::leaf(GestureKind::Tap, RecognizerSource::Declared(1)),
        Composition::exclusive(vec![
            Composition::leaf(GestureKind::Tap, RecognizerSource::Click),
            Composition::leaf(GestureKind::Pan, RecognizerSource::Declared(0)),
        ]),
    ]));
    let root_of = |arbiter: &Arbiter, touch: u32| {
        arbiter
            .touch_result(TouchId(touch))
            .and_then(|r| r.participants().next())
    };

    arbiter.handle(&TouchEvent::down(1, p(50.0, 50.0), 0), &mut rec);
    let first = root_of(&arbiter, 1).unwrap();
    assert_eq!(arbiter.tree().composition(first), first_shape);

    arbiter.handle(&TouchEvent::down(2, p(300.0, 300.0), 10), &mut rec);
    let second = root_of(&arbiter, 2).unwrap();
    assert_ne!(first, second);
    assert_eq!(
        arbiter.tree().composition(second),
        Some(Composition::parallel(vec![
            Composition::leaf(GestureKind::Tap, RecognizerSource::Declared(1)),
            Composition::leaf(GestureKind::Pan, RecognizerSource::Declared(0)),
        ]))
    );
    assert_eq!(arbiter.tree().composition(first), first_shape);
    assert_eq!(
        arbiter.referee().entry(TouchId(1)).map(|e| e.roots().to_vec()),
        Some(vec![first])
    );

    arbiter.handle(&TouchEvent::up(1, p(50.0, 50.0), 40), &mut rec);
    let clicks: Vec<_> = rec
        .infos
        .iter()
        .filter(|e| e.source == RecognizerSource::Click)
        .map(|e| (e.action, e.target.map(|t| t.node)))
        .collect();
    assert_eq!(
        clicks,
        vec![
            (GestureAction::Start, Some(child)),
            (GestureAction::End, Some(child)),
        ]
    );
    assert!(
        arbiter
            .tree()
            .recognizer(click)
            .is_some_and(|r| r.touch_ids().is_empty())
    );

    // The child is idle again, so a change to it applies on the next hit test even though
    // the second finger is still down on the parent.
    arbiter
        .tree_mut()
        .set_builtins(child, BuiltinGestures::default().with_click().with_pan())
        .unwrap();
    arbiter.handle(&TouchEvent::down(3, p(60.0, 60.0), 60), &mut rec);
    assert!(!arbiter.tree().has_pending(child));
    assert!(
        arbiter
            .tree()
            .builtin_recognizer(child, RecognizerSource::Pan)
            .is_some()
    );

    arbiter.handle(&TouchEvent::up(3, p(60.0, 60.0), 80), &mut rec);
    arbiter.handle(&TouchEvent::up(2, p(300.0, 300.0), 90), &mut rec);
    arbiter.advance(1000, &mut rec);
    assert!(arbiter.referee().is_empty());
}

#[test]
fn two_fingers_drive_two_sliders() {
    let mut arbiter = Arbiter::new();
    let tree = arbiter.tree_mut();
    let parent = tree.insert(None, rect(0.0, 0.0, 400.0, 200.0)).unwrap();
    let left = tree.insert(Some(parent), rect(0.0, 0.0, 200.0, 200.0)).unwrap();
    let right = tree.insert(Some(parent), rect(200.0, 0.0, 400.0, 200.0)).unwrap();
    tree.set_builtins(parent, BuiltinGestures::default().with_click())
        .unwrap();
    for slider in [left, right] {
        tree.set_builtins(slider, BuiltinGestures::default().with_pan())
            .unwrap();
    }
    let mut rec = Recorder::default();

    arbiter.handle(&TouchEvent::down(1, p(50.0, 100.0), 0), &mut rec);
    arbiter.handle(&TouchEvent::moved(1, p(100.0, 100.0), 20), &mut rec);
    arbiter.handle(&TouchEvent::down(2, p(250.0, 100.0), 30), &mut rec);
    arbiter.handle(&TouchEvent::moved(2, p(300.0, 100.0), 50), &mut rec);
    arbiter.handle(&TouchEvent::moved(1, p(120.0, 100.0), 60), &mut rec);
    arbiter.handle(&TouchEvent::moved(2, p(320.0, 100.0), 70), &mut rec);

    let pan_targets = |action: GestureAction, rec: &Recorder| -> Vec<Option<NodeId>> {
        rec.infos
            .iter()
            .filter(|e| e.kind == GestureKind::Pan && e.action == action)
            .map(|e| e.target.map(|t| t.node))
            .collect()
    };
    assert_eq!(
        pan_targets(GestureAction::Start, &rec),
        vec![Some(left), Some(right)]
    );
    assert_eq!(
        state_of(&arbiter, left, RecognizerSource::Pan),
        Some(RecognizerState::Accepted)
    );
    assert_eq!(
        state_of(&arbiter, right, RecognizerSource::Pan),
        Some(RecognizerState::Accepted)
    );
    assert_eq!(
        state_of(&arbiter, parent, RecognizerSource::Click),
        Some(RecognizerState::Rejected)
    );

    arbiter.handle(&TouchEvent::up(1, p(120.0, 100.0), 80), &mut rec);
    arbiter.handle(&TouchEvent::up(2, p(320.0, 100.0), 90), &mut rec);
    assert_eq!(
        pan_targets(GestureAction::End, &rec),
        vec![Some(left), Some(right)]
    );
    assert_eq!(rec.starts(GestureKind::Tap), 0);
    assert!(arbiter.referee().is_empty());
}
