// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Author-facing gesture declarations and built-in node behaviors.
//!
//! A [`GestureDeclaration`] is plain data: which kind of gesture, how it combines with
//! whatever a node has accumulated so far ([`GesturePriority`], [`GestureMask`]), and the
//! thresholds of its state machine. Declarations are ordered; a node's list is folded in
//! order by the hierarchy composer, so order is significant.

use crate::config::GestureConfig;
use crate::error::DeclarationError;

/// Maximum number of fingers a gesture may require.
pub const MAX_FINGERS: u8 = 10;

/// Kind of gesture a recognizer detects.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum GestureKind {
    /// One or more quick taps without travel.
    Tap,
    /// A stationary hold.
    LongPress,
    /// Travel past a distance threshold in an allowed direction.
    Pan,
    /// Change of the span between fingers.
    Pinch,
    /// Change of the angle between two fingers.
    Rotate,
    /// A fast release in an allowed direction.
    Swipe,
    /// Travel that starts a drag-and-drop session.
    Drag,
}

impl GestureKind {
    /// Whether the gesture reports `Update`/`End` after it starts.
    ///
    /// Discrete gestures (tap, swipe) report `Start` and `End` in the pass that accepts them.
    pub const fn is_continuous(self) -> bool {
        !matches!(self, Self::Tap | Self::Swipe)
    }

    /// The single-kind flag for this kind.
    pub const fn as_flag(self) -> GestureKinds {
        match self {
            Self::Tap => GestureKinds::TAP,
            Self::LongPress => GestureKinds::LONG_PRESS,
            Self::Pan => GestureKinds::PAN,
            Self::Pinch => GestureKinds::PINCH,
            Self::Rotate => GestureKinds::ROTATE,
            Self::Swipe => GestureKinds::SWIPE,
            Self::Drag => GestureKinds::DRAG,
        }
    }

    const fn default_fingers(self) -> u8 {
        match self {
            Self::Pinch | Self::Rotate => 2,
            _ => 1,
        }
    }
}

bitflags::bitflags! {
    /// A set of [`GestureKind`]s, used to forbid kinds for a hit test.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct GestureKinds: u8 {
        /// [`GestureKind::Tap`].
        const TAP        = 0b0000_0001;
        /// [`GestureKind::LongPress`].
        const LONG_PRESS = 0b0000_0010;
        /// [`GestureKind::Pan`].
        const PAN        = 0b0000_0100;
        /// [`GestureKind::Pinch`].
        const PINCH      = 0b0000_1000;
        /// [`GestureKind::Rotate`].
        const ROTATE     = 0b0001_0000;
        /// [`GestureKind::Swipe`].
        const SWIPE      = 0b0010_0000;
        /// [`GestureKind::Drag`].
        const DRAG       = 0b0100_0000;
    }
}

impl Default for GestureKinds {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags::bitflags! {
    /// Allowed travel directions in screen space (y grows downwards).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Directions: u8 {
        /// Towards negative x.
        const LEFT  = 0b0001;
        /// Towards positive x.
        const RIGHT = 0b0010;
        /// Towards negative y.
        const UP    = 0b0100;
        /// Towards positive y.
        const DOWN  = 0b1000;
        /// Left or right.
        const HORIZONTAL = Self::LEFT.bits() | Self::RIGHT.bits();
        /// Up or down.
        const VERTICAL = Self::UP.bits() | Self::DOWN.bits();
        /// Any direction.
        const ALL = Self::HORIZONTAL.bits() | Self::VERTICAL.bits();
    }
}

impl Default for Directions {
    fn default() -> Self {
        Self::ALL
    }
}

/// How a declared recognizer combines with what a node has accumulated before it.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum GesturePriority {
    /// Exclusive with the accumulated participant, which keeps precedence.
    #[default]
    Low,
    /// Exclusive with the accumulated participant, taking precedence over it.
    High,
    /// Races the accumulated participant in parallel.
    Parallel,
}

/// Whether a declared recognizer keeps or discards what a node has accumulated.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum GestureMask {
    /// Combine according to [`GesturePriority`].
    #[default]
    Normal,
    /// Discard everything accumulated so far (built-ins, children, earlier declarations).
    IgnoreSelfBuiltins,
}

/// Description of one gesture a node responds to.
///
/// Fields that do not apply to `kind` are ignored by its recognizer.
#[derive(Clone, Debug, PartialEq)]
pub struct GestureDeclaration {
    /// Gesture kind.
    pub kind: GestureKind,
    /// Combination with previously accumulated participants.
    pub priority: GesturePriority,
    /// Whether accumulated participants are discarded.
    pub mask: GestureMask,
    /// Number of fingers the gesture requires.
    pub fingers: u8,
    /// Distance threshold: travel for pan/drag, span change for pinch, slop for tap/long-press.
    pub distance: f64,
    /// Allowed directions for pan, drag and swipe.
    pub directions: Directions,
    /// Number of taps (tap only).
    pub count: u8,
    /// Hold time in milliseconds (long-press only).
    pub duration: u64,
    /// Rotation threshold in degrees (rotate only).
    pub angle: f64,
    /// Release speed threshold in pixels per second (swipe only).
    pub speed: f64,
}

impl GestureDeclaration {
    /// A declaration of `kind` with thresholds from [`GestureConfig::default`].
    pub fn new(kind: GestureKind) -> Self {
        Self::from_config(kind, &GestureConfig::default())
    }

    /// A declaration of `kind` with thresholds from `config`.
    pub fn from_config(kind: GestureKind, config: &GestureConfig) -> Self {
        let distance = match kind {
            GestureKind::Tap | GestureKind::LongPress => config.tap_slop,
            GestureKind::Pan | GestureKind::Swipe => config.pan_distance,
            GestureKind::Drag => config.drag_distance,
            GestureKind::Pinch => config.pinch_distance,
            GestureKind::Rotate => 0.0,
        };
        Self {
            kind,
            priority: GesturePriority::Low,
            mask: GestureMask::Normal,
            fingers: kind.default_fingers(),
            distance,
            directions: Directions::ALL,
            count: 1,
            duration: config.long_press_duration,
            angle: config.rotate_angle,
            speed: config.swipe_speed,
        }
    }

    /// Set the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: GesturePriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the mask.
    #[must_use]
    pub fn with_mask(mut self, mask: GestureMask) -> Self {
        self.mask = mask;
        self
    }

    /// Set the required finger count.
    #[must_use]
    pub fn with_fingers(mut self, fingers: u8) -> Self {
        self.fingers = fingers;
        self
    }

    /// Set the distance threshold.
    #[must_use]
    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = distance;
        self
    }

    /// Set the allowed directions.
    #[must_use]
    pub fn with_directions(mut self, directions: Directions) -> Self {
        self.directions = directions;
        self
    }

    /// Set the tap count.
    #[must_use]
    pub fn with_count(mut self, count: u8) -> Self {
        self.count = count;
        self
    }

    /// Set the long-press duration in milliseconds.
    #[must_use]
    pub fn with_duration(mut self, duration: u64) -> Self {
        self.duration = duration;
        self
    }

    /// Set the rotation threshold in degrees.
    #[must_use]
    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
    }

    /// Set the swipe speed threshold in pixels per second.
    #[must_use]
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    /// Check the declaration for inconsistent parameters.
    ///
    /// Malformed declarations are still accepted by the tree; their recognizer rejects on
    /// its first down.
    pub fn validate(&self) -> Result<(), DeclarationError> {
        if self.fingers == 0 {
            return Err(DeclarationError::ZeroFingers);
        }
        if self.fingers > MAX_FINGERS {
            return Err(DeclarationError::TooManyFingers(self.fingers));
        }
        let valid = |x: f64| x.is_finite() && x >= 0.0;
        if !valid(self.distance) {
            return Err(DeclarationError::InvalidThreshold);
        }
        match self.kind {
            GestureKind::Tap if self.count == 0 => Err(DeclarationError::ZeroCount),
            GestureKind::Pan | GestureKind::Drag | GestureKind::Swipe
                if self.directions.is_empty() =>
            {
                Err(DeclarationError::EmptyDirections)
            }
            GestureKind::Rotate if !valid(self.angle) => Err(DeclarationError::InvalidThreshold),
            GestureKind::Swipe if !valid(self.speed) => Err(DeclarationError::InvalidThreshold),
            _ => Ok(()),
        }
    }
}

/// Behaviors a node has intrinsically, independent of its declared gesture list.
///
/// The hit-test collector gathers these in a fixed category order: scrollable, raw touch,
/// click, pan; then long-press and drag together.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BuiltinGestures {
    /// Scroll axis of a scrollable node; contributes a pan recognizer restricted to it.
    pub scrollable: Option<Directions>,
    /// Whether raw touch events are delivered to the node as a plain target.
    pub touch_listener: bool,
    /// Built-in click (a single-finger, single tap unless configured otherwise).
    pub click: Option<GestureDeclaration>,
    /// Built-in pan.
    pub pan: Option<GestureDeclaration>,
    /// Built-in long press.
    pub long_press: Option<GestureDeclaration>,
    /// Built-in drag initiator.
    pub drag: Option<GestureDeclaration>,
    /// Opaque blob handed to the drag subsystem when a drag starts on this node.
    pub drag_info: alloc::vec::Vec<u8>,
}

impl BuiltinGestures {
    /// Enable a default click.
    #[must_use]
    pub fn with_click(mut self) -> Self {
        self.click = Some(GestureDeclaration::new(GestureKind::Tap));
        self
    }

    /// Enable a default long press.
    #[must_use]
    pub fn with_long_press(mut self) -> Self {
        self.long_press = Some(GestureDeclaration::new(GestureKind::LongPress));
        self
    }

    /// Enable a default pan.
    #[must_use]
    pub fn with_pan(mut self) -> Self {
        self.pan = Some(GestureDeclaration::new(GestureKind::Pan));
        self
    }

    /// Enable a default drag initiator carrying `info`.
    #[must_use]
    pub fn with_drag(mut self, info: alloc::vec::Vec<u8>) -> Self {
        self.drag = Some(GestureDeclaration::new(GestureKind::Drag));
        self.drag_info = info;
        self
    }

    /// Make the node scrollable along `axis`.
    #[must_use]
    pub fn with_scrollable(mut self, axis: Directions) -> Self {
        self.scrollable = Some(axis);
        self
    }

    /// Deliver raw touch events to the node.
    #[must_use]
    pub fn with_touch_listener(mut self) -> Self {
        self.touch_listener = true;
        self
    }
}
