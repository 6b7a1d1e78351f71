// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Consumer-facing callbacks: gesture actions, event payloads, and the listener trait.
//!
//! Only recognizers that reach `Accepted` produce gesture callbacks. Plain targets receive
//! raw touch events independently of arbitration.

use alloc::vec::Vec;

use kurbo::{Point, Size, Vec2};

use crate::declaration::GestureKind;
use crate::recognizer::{RecognizerKey, RecognizerSource};
use crate::result::PlainTarget;
use crate::types::{ComponentId, GestureTarget, NodeId, SourceDevice, TouchEvent, TouchId};

/// Lifecycle step of an accepted gesture.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum GestureAction {
    /// The gesture was accepted.
    Start,
    /// An accepted continuous gesture moved.
    Update,
    /// The gesture finished.
    End,
    /// The platform cancelled an accepted gesture.
    Cancel,
}

/// Measurements attached to a gesture callback.
#[derive(Clone, Debug, PartialEq)]
pub struct GestureEventInfo {
    /// Touch whose event produced the callback.
    pub touch: TouchId,
    /// Producing device.
    pub device: SourceDevice,
    /// Timestamp in milliseconds.
    pub time: u64,
    /// Centroid of the recognizer's fingers, in global coordinates.
    pub global_point: Point,
    /// Centroid relative to the recognizer's node.
    pub local_point: Point,
    /// Fingers currently down on the recognizer.
    pub fingers: u8,
    /// Travel of the centroid since the gesture began.
    pub offset: Vec2,
    /// Span ratio for pinch (1.0 otherwise).
    pub scale: f64,
    /// Rotation in degrees for rotate (0.0 otherwise).
    pub angle: f64,
    /// Release speed in pixels per second for swipe (0.0 otherwise).
    pub speed: f64,
    /// Global offset of the recognizer's node.
    pub coordinate_offset: Vec2,
    /// Size of the recognizer's node.
    pub size: Size,
}

/// One gesture callback.
#[derive(Clone, Debug, PartialEq)]
pub struct GestureEvent {
    /// Node/component the recognizer is attached to.
    pub target: Option<GestureTarget>,
    /// Recognizer that produced the callback.
    pub recognizer: RecognizerKey,
    /// Whether the recognizer is a built-in or a declared gesture.
    pub source: RecognizerSource,
    /// Gesture kind.
    pub kind: GestureKind,
    /// Lifecycle step.
    pub action: GestureAction,
    /// Measurements.
    pub info: GestureEventInfo,
}

/// Request handed to the external drag subsystem when a drag recognizer is accepted.
///
/// Delivered after the dispatch pass that accepted the drag has completed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DragRequest {
    /// Node the drag starts on.
    pub node: NodeId,
    /// Component of that node.
    pub component: Option<ComponentId>,
    /// Pointer driving the drag.
    pub pointer: TouchId,
    /// Caller-supplied blob from [`BuiltinGestures::drag_info`](crate::BuiltinGestures::drag_info).
    pub extra_info: Vec<u8>,
}

/// Receiver of gesture callbacks, raw touches for plain targets, and drag starts.
///
/// Every method has an empty default, so implementors only override what they need.
pub trait GestureListener {
    /// A recognizer was accepted.
    fn on_action_start(&mut self, event: &GestureEvent) {
        let _ = event;
    }

    /// An accepted continuous gesture moved.
    fn on_action_update(&mut self, event: &GestureEvent) {
        let _ = event;
    }

    /// A gesture finished.
    fn on_action_end(&mut self, event: &GestureEvent) {
        let _ = event;
    }

    /// An accepted gesture was cancelled by the platform.
    fn on_action_cancel(&mut self, event: &GestureEvent) {
        let _ = event;
    }

    /// A raw touch event reached a plain target.
    fn on_touch(&mut self, target: &PlainTarget, event: &TouchEvent) {
        let _ = (target, event);
    }

    /// A drag recognizer was accepted; begin a drag session.
    fn begin_drag(&mut self, request: &DragRequest) {
        let _ = request;
    }
}

/// Ignores everything.
impl GestureListener for () {}

/// Records every gesture callback in order.
impl GestureListener for Vec<GestureEvent> {
    fn on_action_start(&mut self, event: &GestureEvent) {
        self.push(event.clone());
    }

    fn on_action_update(&mut self, event: &GestureEvent) {
        self.push(event.clone());
    }

    fn on_action_end(&mut self, event: &GestureEvent) {
        self.push(event.clone());
    }

    fn on_action_cancel(&mut self, event: &GestureEvent) {
        self.push(event.clone());
    }
}

pub(crate) fn notify(listener: &mut impl GestureListener, event: &GestureEvent) {
    match event.action {
        GestureAction::Start => listener.on_action_start(event),
        GestureAction::Update => listener.on_action_update(event),
        GestureAction::End => listener.on_action_end(event),
        GestureAction::Cancel => listener.on_action_cancel(event),
    }
}
