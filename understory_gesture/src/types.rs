// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types: node and touch identifiers, raw touch input, hit-test controls.

use kurbo::{Point, Rect};

use crate::arena::SlotKey;
use crate::declaration::GestureKinds;

/// Identifier for a node in a [`GestureTree`](crate::GestureTree).
///
/// This is a small, copyable handle that stays stable across updates but becomes
/// invalid when the underlying slot is reused.
/// It consists of a slot index and a generation counter.
///
/// ## Semantics
///
/// - On insert, a fresh slot is allocated with generation `1`.
/// - On remove, the slot is freed; any existing `NodeId` that pointed to that slot is now stale.
/// - On reuse of a freed slot, its generation is incremented, producing a new, distinct `NodeId`.
///
/// ### Liveness
///
/// Use [`GestureTree::is_alive`](crate::GestureTree::is_alive) to check whether a `NodeId`
/// still refers to a live node. Every accessor taking a stale `NodeId` returns `None`/`false`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn from_slot(key: SlotKey) -> Self {
        Self(key.index, key.generation)
    }

    pub(crate) const fn slot(self) -> SlotKey {
        SlotKey {
            index: self.0,
            generation: self.1,
        }
    }
}

/// Platform pointer identifier for one touch sequence (down, move*, up or cancel).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TouchId(pub u32);

/// Opaque identity of the component that declared a node's gestures.
///
/// Hosts use this to map gesture callbacks back to their own widget objects.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ComponentId(pub u64);

/// Node and component a recognizer is attached to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct GestureTarget {
    /// The node whose hit test produced the recognizer.
    pub node: NodeId,
    /// The node's component, if the host assigned one.
    pub component: Option<ComponentId>,
}

/// Phase of a raw touch event.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TouchPhase {
    /// A pointer went down. Triggers a hit test.
    Down,
    /// A pointer moved.
    Move,
    /// A pointer went up, ending its sequence.
    Up,
    /// The platform cancelled the sequence.
    Cancel,
}

/// Kind of device that produced a touch event.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum SourceDevice {
    /// Finger on a touch screen.
    #[default]
    Touch,
    /// Mouse button.
    Mouse,
    /// Stylus.
    Pen,
}

/// One raw input event delivered by the platform.
///
/// `point` is in root (global) coordinates; node-local points are derived during the
/// hit test. `time` is a monotonic timestamp in milliseconds.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TouchEvent {
    /// Touch sequence this event belongs to.
    pub id: TouchId,
    /// Event phase.
    pub phase: TouchPhase,
    /// Global position.
    pub point: Point,
    /// Producing device.
    pub device: SourceDevice,
    /// Timestamp in milliseconds.
    pub time: u64,
}

impl TouchEvent {
    /// Build an event from a touch device.
    pub const fn new(id: TouchId, phase: TouchPhase, point: Point, time: u64) -> Self {
        Self {
            id,
            phase,
            point,
            device: SourceDevice::Touch,
            time,
        }
    }

    /// A `Down` event.
    pub const fn down(id: u32, point: Point, time: u64) -> Self {
        Self::new(TouchId(id), TouchPhase::Down, point, time)
    }

    /// A `Move` event.
    pub const fn moved(id: u32, point: Point, time: u64) -> Self {
        Self::new(TouchId(id), TouchPhase::Move, point, time)
    }

    /// An `Up` event.
    pub const fn up(id: u32, point: Point, time: u64) -> Self {
        Self::new(TouchId(id), TouchPhase::Up, point, time)
    }

    /// A `Cancel` event.
    pub const fn cancel(id: u32, point: Point, time: u64) -> Self {
        Self::new(TouchId(id), TouchPhase::Cancel, point, time)
    }

    /// Replace the source device.
    #[must_use]
    pub const fn with_device(mut self, device: SourceDevice) -> Self {
        self.device = device;
        self
    }
}

/// How a node takes part in hit testing.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum HitTestMode {
    /// The node and its children collect targets; later siblings are not tested.
    #[default]
    Default,
    /// The node collects targets, its children are not tested, later siblings are not tested.
    Block,
    /// The node and its children collect targets; later siblings are still tested.
    Transparent,
    /// The node contributes nothing itself and forwards its children's results unchanged.
    None,
}

/// Per-hit-test restrictions on which recognizers may be collected.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TouchRestrict {
    /// Gesture kinds that must not be collected.
    pub forbidden: GestureKinds,
    /// Device the touch sequence comes from.
    pub device: SourceDevice,
}

impl TouchRestrict {
    /// No restriction.
    pub const NONE: Self = Self {
        forbidden: GestureKinds::empty(),
        device: SourceDevice::Touch,
    };
}

/// Per-node geometry and hit-test configuration.
#[derive(Clone, Debug)]
pub struct GestureNode {
    /// Frame in the parent's coordinate space (global space for roots).
    pub frame: Rect,
    /// Hit-test participation.
    pub hit_test_mode: HitTestMode,
    /// Host component identity, forwarded to gesture callbacks.
    pub component: Option<ComponentId>,
}

impl GestureNode {
    /// A node covering `frame` with default hit-test behavior.
    pub const fn new(frame: Rect) -> Self {
        Self {
            frame,
            hit_test_mode: HitTestMode::Default,
            component: None,
        }
    }

    /// Set the hit-test mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: HitTestMode) -> Self {
        self.hit_test_mode = mode;
        self
    }

    /// Set the component identity.
    #[must_use]
    pub const fn with_component(mut self, component: ComponentId) -> Self {
        self.component = Some(component);
        self
    }
}

impl Default for GestureNode {
    fn default() -> Self {
        Self::new(Rect::ZERO)
    }
}
