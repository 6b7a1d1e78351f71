// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Leaf recognizers: one gesture detector with its own state machine.
//!
//! ## States
//!
//! `Ready → Detecting → Pending → {Accepted | Rejected}`, and back to `Ready` on the next
//! down once the previous sequence has ended.
//!
//! - `Ready`: waiting until the required number of fingers are down.
//! - `Detecting`: all fingers are down; no progress towards the criterion yet.
//! - `Pending`: the criterion has become satisfiable (travel started, long-press timer armed,
//!   tap waiting for its follow-up tap).
//! - `Accepted` / `Rejected`: terminal until the next sequence.
//!
//! A recognizer never accepts on its own. It proposes an accept and the
//! [`Referee`](crate::Referee) decides. Rejections are immediate.

use smallvec::SmallVec;

use kurbo::{Point, Size, Vec2};

use crate::arena::SlotKey;
use crate::config::GestureConfig;
use crate::declaration::{
    Directions, GestureDeclaration, GestureKind, GestureMask, GesturePriority,
};
use crate::event::{GestureAction, GestureEventInfo};
use crate::types::{GestureTarget, NodeId, SourceDevice, TouchEvent, TouchId, TouchPhase};

/// Handle to a recognizer owned by a node of a [`GestureTree`](crate::GestureTree).
///
/// The handle carries the node's generation and the recognizer slot's generation, so it
/// resolves to `None` once the node is removed or the slot is rebuilt by reconciliation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct RecognizerKey {
    pub(crate) node: NodeId,
    pub(crate) slot: SlotKey,
}

impl RecognizerKey {
    /// The owning node.
    pub const fn node(self) -> NodeId {
        self.node
    }
}

/// Where a recognizer comes from.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RecognizerSource {
    /// Built-in pan of a scrollable node.
    Scrollable,
    /// Built-in click.
    Click,
    /// Built-in pan.
    Pan,
    /// Built-in long press.
    LongPress,
    /// Built-in drag initiator.
    Drag,
    /// Entry of the node's declared gesture list, by index.
    Declared(u16),
}

/// Arbitration state of a recognizer.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum RecognizerState {
    /// Waiting for the required fingers.
    #[default]
    Ready,
    /// All fingers down, no progress yet.
    Detecting,
    /// Criterion satisfiable, not yet met.
    Pending,
    /// Won arbitration.
    Accepted,
    /// Lost arbitration or failed its criterion.
    Rejected,
}

impl RecognizerState {
    /// `Accepted` or `Rejected`.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }
}

/// Deferred check a recognizer asks for.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TimerKind {
    /// The long-press hold time elapsed.
    LongPress,
    /// The window for the next tap of a multi-tap closed.
    TapTimeout,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Verdict {
    Accept,
    Reject,
}

/// What a recognizer wants after handling one input.
#[derive(Clone, Debug, Default)]
pub(crate) struct Outcome {
    pub(crate) vote: Option<Verdict>,
    pub(crate) actions: SmallVec<[GestureAction; 2]>,
    pub(crate) timer: Option<(u64, TimerKind)>,
}

#[derive(Copy, Clone, Debug)]
struct Tracked {
    id: TouchId,
    down: Point,
    point: Point,
}

/// A single gesture detector.
#[derive(Clone, Debug)]
pub struct Recognizer {
    decl: GestureDeclaration,
    source: RecognizerSource,
    valid: bool,
    multi_tap_timeout: u64,
    state: RecognizerState,
    registered: SmallVec<[TouchId; 2]>,
    tracked: SmallVec<[Tracked; 2]>,
    target: Option<GestureTarget>,
    coordinate_offset: Vec2,
    size: Size,
    session: u32,
    start_centroid: Point,
    start_span: f64,
    start_angle: f64,
    start_time: u64,
    centroid: Point,
    offset: Vec2,
    scale: f64,
    rotation: f64,
    speed: f64,
    taps: u8,
    last_up: Option<u64>,
    ended: bool,
    device: SourceDevice,
    last_touch: TouchId,
    last_time: u64,
}

impl Recognizer {
    pub(crate) fn new(
        decl: GestureDeclaration,
        source: RecognizerSource,
        config: &GestureConfig,
    ) -> Self {
        Self {
            valid: decl.validate().is_ok(),
            decl,
            source,
            multi_tap_timeout: config.multi_tap_timeout,
            state: RecognizerState::Ready,
            registered: SmallVec::new(),
            tracked: SmallVec::new(),
            target: None,
            coordinate_offset: Vec2::ZERO,
            size: Size::ZERO,
            session: 0,
            start_centroid: Point::ZERO,
            start_span: 0.0,
            start_angle: 0.0,
            start_time: 0,
            centroid: Point::ZERO,
            offset: Vec2::ZERO,
            scale: 1.0,
            rotation: 0.0,
            speed: 0.0,
            taps: 0,
            last_up: None,
            ended: false,
            device: SourceDevice::Touch,
            last_touch: TouchId(0),
            last_time: 0,
        }
    }

    /// The declaration this recognizer currently follows.
    pub fn declaration(&self) -> &GestureDeclaration {
        &self.decl
    }

    /// Gesture kind.
    pub fn kind(&self) -> GestureKind {
        self.decl.kind
    }

    /// Built-in role or declaration index.
    pub fn source(&self) -> RecognizerSource {
        self.source
    }

    /// Current state.
    pub fn state(&self) -> RecognizerState {
        self.state
    }

    /// Combination priority.
    pub fn priority(&self) -> GesturePriority {
        self.decl.priority
    }

    /// Combination mask.
    pub fn mask(&self) -> GestureMask {
        self.decl.mask
    }

    /// Touch ids registered with the referee and not yet ended.
    pub fn touch_ids(&self) -> &[TouchId] {
        &self.registered
    }

    /// Node and component attached by the last hit test.
    pub fn target(&self) -> Option<GestureTarget> {
        self.target
    }

    /// Global offset of the attached node.
    pub fn coordinate_offset(&self) -> Vec2 {
        self.coordinate_offset
    }

    /// Size of the attached node.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Whether the declaration passed validation.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Whether this instance can absorb `decl` in place without losing its state.
    ///
    /// The kind and finger count must match; taps must also keep their count. All other
    /// thresholds, priority and mask are absorbed.
    pub fn can_reconcile(&self, decl: &GestureDeclaration) -> bool {
        decl.kind == self.decl.kind
            && decl.fingers == self.decl.fingers
            && (decl.kind != GestureKind::Tap || decl.count == self.decl.count)
            && decl.validate().is_ok() == self.valid
    }

    /// Absorb `decl` in place if compatible. Returns `false` (and changes nothing) otherwise.
    pub(crate) fn reconcile_from(&mut self, decl: &GestureDeclaration) -> bool {
        if !self.can_reconcile(decl) {
            return false;
        }
        if self.decl != *decl {
            self.decl = decl.clone();
        }
        true
    }

    pub(crate) fn session(&self) -> u32 {
        self.session
    }

    pub(crate) fn attach(&mut self, target: GestureTarget, offset: Vec2, size: Size) {
        self.target = Some(target);
        self.coordinate_offset = offset;
        self.size = size;
    }

    /// Register `touch` for this recognizer. Starts a fresh sequence if the last one ended.
    pub(crate) fn begin_referee(&mut self, touch: TouchId) {
        if self.registered.is_empty() && self.state.is_terminal() {
            self.reset();
        }
        if !self.registered.contains(&touch) {
            self.registered.push(touch);
        }
    }

    fn reset(&mut self) {
        self.state = RecognizerState::Ready;
        self.tracked.clear();
        self.offset = Vec2::ZERO;
        self.scale = 1.0;
        self.rotation = 0.0;
        self.speed = 0.0;
        self.taps = 0;
        self.last_up = None;
        self.ended = false;
        self.session = self.session.wrapping_add(1);
    }

    pub(crate) fn handle(&mut self, event: &TouchEvent) -> Outcome {
        let mut out = Outcome::default();
        if !self.registered.contains(&event.id) {
            return out;
        }
        self.device = event.device;
        self.last_touch = event.id;
        self.last_time = event.time;
        match self.state {
            RecognizerState::Rejected => {}
            RecognizerState::Accepted => self.handle_accepted(event, &mut out),
            _ => match event.phase {
                TouchPhase::Down => self.on_down(event, &mut out),
                TouchPhase::Move => self.on_move(event, &mut out),
                TouchPhase::Up => self.on_up(event, &mut out),
                TouchPhase::Cancel => self.reject(&mut out),
            },
        }
        out
    }

    fn handle_accepted(&mut self, event: &TouchEvent, out: &mut Outcome) {
        if self.ended || !self.decl.kind.is_continuous() {
            return;
        }
        match event.phase {
            TouchPhase::Down => self.track(event),
            TouchPhase::Move => {
                if self.update_point(event) {
                    self.measure();
                    out.actions.push(GestureAction::Update);
                }
            }
            TouchPhase::Up => {
                self.update_point(event);
                self.measure();
                self.untrack(event.id);
                self.ended = true;
                out.actions.push(GestureAction::End);
            }
            TouchPhase::Cancel => {
                self.ended = true;
                out.actions.push(GestureAction::Cancel);
            }
        }
    }

    fn on_down(&mut self, event: &TouchEvent, out: &mut Outcome) {
        if !self.valid {
            self.reject(out);
            return;
        }
        if self.decl.kind == GestureKind::Tap && self.tracked.is_empty() {
            let expired = self
                .last_up
                .is_some_and(|up| event.time.saturating_sub(up) > self.multi_tap_timeout);
            if expired {
                self.taps = 0;
            }
        }
        self.track(event);
        let down = self.tracked.len();
        let fingers = usize::from(self.decl.fingers);
        if down > fingers {
            self.reject(out);
            return;
        }
        if down < fingers {
            return;
        }
        self.start_time = event.time;
        self.start_centroid = self.current_centroid();
        self.centroid = self.start_centroid;
        self.start_span = self.current_span();
        self.start_angle = self.current_angle();
        self.state = match self.decl.kind {
            GestureKind::LongPress => {
                let due = event.time.saturating_add(self.decl.duration);
                out.timer = Some((due, TimerKind::LongPress));
                RecognizerState::Pending
            }
            GestureKind::Tap if self.taps > 0 => RecognizerState::Pending,
            _ => RecognizerState::Detecting,
        };
    }

    fn on_move(&mut self, event: &TouchEvent, out: &mut Outcome) {
        if !self.update_point(event) {
            return;
        }
        let kind = self.decl.kind;
        if matches!(kind, GestureKind::Tap | GestureKind::LongPress) {
            if self.max_travel() > self.decl.distance {
                self.reject(out);
            }
            return;
        }
        if self.state == RecognizerState::Ready {
            return;
        }
        self.measure();
        match kind {
            GestureKind::Pan | GestureKind::Drag => {
                let travel = self.offset.hypot();
                if travel > 0.0 && travel >= self.decl.distance {
                    if self.decl.directions.contains(direction_of(self.offset)) {
                        out.vote = Some(Verdict::Accept);
                    } else {
                        self.reject(out);
                    }
                } else if travel > 0.0 {
                    self.state = RecognizerState::Pending;
                }
            }
            GestureKind::Pinch => {
                let change = self.current_span() - self.start_span;
                if change != 0.0 && magnitude(change) >= self.decl.distance {
                    out.vote = Some(Verdict::Accept);
                } else if change != 0.0 {
                    self.state = RecognizerState::Pending;
                }
            }
            GestureKind::Rotate => {
                if self.rotation != 0.0 && magnitude(self.rotation) >= self.decl.angle {
                    out.vote = Some(Verdict::Accept);
                } else if self.rotation != 0.0 {
                    self.state = RecognizerState::Pending;
                }
            }
            GestureKind::Swipe => {
                if self.offset != Vec2::ZERO {
                    self.state = RecognizerState::Pending;
                }
            }
            GestureKind::Tap | GestureKind::LongPress => {}
        }
    }

    fn on_up(&mut self, event: &TouchEvent, out: &mut Outcome) {
        self.update_point(event);
        if self.state == RecognizerState::Ready {
            // Lifted before the required fingers were down.
            self.reject(out);
            return;
        }
        match self.decl.kind {
            GestureKind::Tap => {
                if self.max_travel() > self.decl.distance {
                    self.reject(out);
                    return;
                }
                self.measure();
                self.untrack(event.id);
                if !self.tracked.is_empty() {
                    return;
                }
                self.taps = self.taps.saturating_add(1);
                self.last_up = Some(event.time);
                if self.taps >= self.decl.count {
                    out.vote = Some(Verdict::Accept);
                } else {
                    self.state = RecognizerState::Pending;
                    let due = event.time.saturating_add(self.multi_tap_timeout);
                    out.timer = Some((due, TimerKind::TapTimeout));
                }
            }
            GestureKind::Swipe => {
                self.measure();
                let travel = self.offset.hypot();
                let elapsed = event.time.saturating_sub(self.start_time).max(1);
                self.speed = travel * 1000.0 / elapsed as f64;
                let allowed = self.decl.directions.contains(direction_of(self.offset));
                if travel > 0.0 && allowed && self.speed >= self.decl.speed {
                    out.vote = Some(Verdict::Accept);
                } else {
                    self.reject(out);
                }
            }
            // Lifted before the criterion was met.
            _ => self.reject(out),
        }
    }

    pub(crate) fn on_timer(&mut self, timer: TimerKind, now: u64) -> Outcome {
        let mut out = Outcome::default();
        self.last_time = now;
        match (timer, self.decl.kind, self.state) {
            (TimerKind::LongPress, GestureKind::LongPress, RecognizerState::Pending)
                if self.tracked.len() == usize::from(self.decl.fingers) =>
            {
                out.vote = Some(Verdict::Accept);
            }
            (TimerKind::TapTimeout, GestureKind::Tap, RecognizerState::Pending)
                if self.tracked.is_empty() && self.taps < self.decl.count =>
            {
                self.reject(&mut out);
            }
            _ => {}
        }
        out
    }

    pub(crate) fn mark_accepted(&mut self) {
        self.state = RecognizerState::Accepted;
        if !self.decl.kind.is_continuous() {
            self.ended = true;
        }
    }

    /// Force `Rejected` unless already terminal. Returns whether the state changed.
    pub(crate) fn force_reject(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = RecognizerState::Rejected;
        true
    }

    /// Drop `touch` after its up/cancel. Returns whether the recognizer was rejected by it.
    pub(crate) fn end_touch(&mut self, touch: TouchId) -> bool {
        self.registered.retain(|t| *t != touch);
        self.untrack(touch);
        let awaiting_tap = self.decl.kind == GestureKind::Tap
            && self.state == RecognizerState::Pending
            && self.taps > 0;
        if self.registered.is_empty() && !self.state.is_terminal() && !awaiting_tap {
            self.state = RecognizerState::Rejected;
            return true;
        }
        false
    }

    pub(crate) fn event_info(&self) -> GestureEventInfo {
        GestureEventInfo {
            touch: self.last_touch,
            device: self.device,
            time: self.last_time,
            global_point: self.centroid,
            local_point: self.centroid - self.coordinate_offset,
            fingers: u8::try_from(self.tracked.len()).unwrap_or(u8::MAX),
            offset: self.offset,
            scale: self.scale,
            angle: self.rotation,
            speed: self.speed,
            coordinate_offset: self.coordinate_offset,
            size: self.size,
        }
    }

    fn reject(&mut self, out: &mut Outcome) {
        self.state = RecognizerState::Rejected;
        out.vote = Some(Verdict::Reject);
    }

    fn track(&mut self, event: &TouchEvent) {
        if let Some(t) = self.tracked.iter_mut().find(|t| t.id == event.id) {
            t.point = event.point;
            return;
        }
        self.tracked.push(Tracked {
            id: event.id,
            down: event.point,
            point: event.point,
        });
    }

    fn untrack(&mut self, touch: TouchId) {
        self.tracked.retain(|t| t.id != touch);
    }

    fn update_point(&mut self, event: &TouchEvent) -> bool {
        match self.tracked.iter_mut().find(|t| t.id == event.id) {
            Some(t) => {
                t.point = event.point;
                true
            }
            None => false,
        }
    }

    fn measure(&mut self) {
        if self.tracked.is_empty() {
            return;
        }
        self.centroid = self.current_centroid();
        self.offset = self.centroid - self.start_centroid;
        if self.tracked.len() >= 2 {
            let span = self.current_span();
            if self.start_span > 0.0 {
                self.scale = span / self.start_span;
            }
            self.rotation = normalize_degrees(self.current_angle() - self.start_angle);
        }
    }

    fn max_travel(&self) -> f64 {
        self.tracked
            .iter()
            .map(|t| (t.point - t.down).hypot())
            .fold(0.0, f64::max)
    }

    fn current_centroid(&self) -> Point {
        if self.tracked.is_empty() {
            return self.centroid;
        }
        let sum = self
            .tracked
            .iter()
            .fold(Vec2::ZERO, |acc, t| acc + t.point.to_vec2());
        (sum / self.tracked.len() as f64).to_point()
    }

    fn current_span(&self) -> f64 {
        if self.tracked.len() < 2 {
            return 0.0;
        }
        let c = self.current_centroid();
        let total: f64 = self.tracked.iter().map(|t| (t.point - c).hypot()).sum();
        total / self.tracked.len() as f64
    }

    fn current_angle(&self) -> f64 {
        match (self.tracked.first(), self.tracked.get(1)) {
            (Some(a), Some(b)) => (b.point - a.point).atan2() * (180.0 / core::f64::consts::PI),
            _ => 0.0,
        }
    }
}

/// Dominant screen direction of `v`.
fn direction_of(v: Vec2) -> Directions {
    if magnitude(v.x) >= magnitude(v.y) {
        if v.x < 0.0 {
            Directions::LEFT
        } else {
            Directions::RIGHT
        }
    } else if v.y < 0.0 {
        Directions::UP
    } else {
        Directions::DOWN
    }
}

fn magnitude(x: f64) -> f64 {
    if x < 0.0 { -x } else { x }
}

fn normalize_degrees(mut deg: f64) -> f64 {
    if deg > 180.0 {
        deg -= 360.0;
    } else if deg <= -180.0 {
        deg += 360.0;
    }
    deg
}
