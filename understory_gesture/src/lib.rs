// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_gesture --heading-base-level=0

//! Understory Gesture: arbitration between overlapping gesture recognizers.
//!
//! When several interactive nodes are stacked under one pointer, each with its own taps,
//! long presses, pans, pinches, rotations, swipes and drags, something has to decide which
//! of them actually gets the touch sequence. This crate is that something:
//!
//! - A [`GestureTree`] mirrors the interactive part of a UI tree: frames, hit-test modes,
//!   built-in behaviors ([`BuiltinGestures`]) and declared gesture lists
//!   ([`GestureDeclaration`]).
//! - On every touch down, the hit test collects the nodes under the point and composes,
//!   per node, a single participant: a leaf [`Recognizer`] or a [`RecognizerGroup`] whose
//!   children are combined exclusively or in parallel.
//! - The [`Referee`] keeps a per-touch ledger and resolves accept proposals according to
//!   the enclosing groups: in an exclusive group the first accepted child wins and its
//!   siblings are rejected; in a parallel group children win independently.
//! - The [`Arbiter`] ties it together: feed it [`TouchEvent`]s, and it calls back a
//!   [`GestureListener`] for accepted gestures, raw touches and drag starts.
//!
//! ## Composition
//!
//! A node's participant is built in two steps. First its hit children's participants and
//! its built-ins are gathered (built-ins in the order scrollable, raw touch, click, pan,
//! then long press and drag racing in parallel). Then each declared gesture is folded over
//! the accumulated participant according to its [`GesturePriority`] and [`GestureMask`]:
//!
//! - `Low`: `Exclusive(current, r)`.
//! - `High`: `Exclusive(r, current)`.
//! - `Parallel`: `Parallel(r, current)`.
//! - `IgnoreSelfBuiltins`: `r` alone; everything accumulated is dropped.
//!
//! Group child order is precedence order.
//!
//! ## Reconciliation
//!
//! Declaration changes are applied lazily, just before the node's next hit test, and only
//! when no touch is in progress on it. When the new list has the same length and every
//! recognizer can absorb its new declaration ([`Recognizer::can_reconcile`]), live
//! recognizers keep their state; otherwise the hierarchy is rebuilt.
//!
//! ## Handles
//!
//! Nodes own their recognizers and groups. Everyone else refers to them through
//! generational keys ([`NodeId`], [`RecognizerKey`], [`GroupKey`]) that resolve to `None`
//! once the node is removed. Deferred work ([`Task`]) carries such a key and is skipped
//! when the key no longer resolves.
//!
//! ## Example
//!
//! A node with a built-in click declares a long press racing in parallel and a
//! high-priority pan. Moving past the pan threshold wins the touch for the pan.
//!
//! ```rust
//! use kurbo::{Point, Rect};
//! use understory_gesture::{
//!     Arbiter, BuiltinGestures, GestureAction, GestureDeclaration, GestureEvent, GestureKind,
//!     GestureNode, GesturePriority, TouchEvent,
//! };
//!
//! let mut arbiter = Arbiter::new();
//! let tree = arbiter.tree_mut();
//! let node = tree
//!     .insert(None, GestureNode::new(Rect::new(0.0, 0.0, 200.0, 200.0)))
//!     .unwrap();
//! tree.set_builtins(node, BuiltinGestures::default().with_click()).unwrap();
//! tree.set_gestures(
//!     node,
//!     vec![
//!         GestureDeclaration::new(GestureKind::LongPress).with_priority(GesturePriority::Parallel),
//!         GestureDeclaration::new(GestureKind::Pan).with_priority(GesturePriority::High),
//!     ],
//! )
//! .unwrap();
//!
//! let mut events: Vec<GestureEvent> = Vec::new();
//! arbiter.handle(&TouchEvent::down(1, Point::new(10.0, 10.0), 0), &mut events);
//! arbiter.handle(&TouchEvent::moved(1, Point::new(30.0, 10.0), 50), &mut events);
//!
//! assert_eq!(events.len(), 1);
//! assert_eq!(events[0].kind, GestureKind::Pan);
//! assert_eq!(events[0].action, GestureAction::Start);
//! ```
//!
//! ## Features
//!
//! - `std` (default) / `libm`: float math backend, forwarded to Kurbo.
//! - `tracing`: structured logging of hit tests, reconciliation, votes and node removal.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod arbiter;
mod arena;
mod collector;
mod composer;
mod config;
mod declaration;
mod error;
mod event;
mod group;
mod hierarchy;
mod recognizer;
mod referee;
mod result;
mod task;
mod tree;
mod types;

pub use arbiter::Arbiter;
pub use config::GestureConfig;
pub use declaration::{
    BuiltinGestures, Directions, GestureDeclaration, GestureKind, GestureKinds, GestureMask,
    GesturePriority, MAX_FINGERS,
};
pub use error::{DeclarationError, TreeError};
pub use event::{DragRequest, GestureAction, GestureEvent, GestureEventInfo, GestureListener};
pub use group::{CombinationPolicy, Composition, GroupKey, Participant, RecognizerGroup};
pub use hierarchy::GestureHierarchy;
pub use recognizer::{Recognizer, RecognizerKey, RecognizerSource, RecognizerState, TimerKind};
pub use referee::{LedgerEntry, Referee, Resolution};
pub use result::{PlainTarget, TouchTarget, TouchTestResult};
pub use task::{Task, TaskPayload, TaskQueue};
pub use tree::GestureTree;
pub use types::{
    ComponentId, GestureNode, GestureTarget, HitTestMode, NodeId, SourceDevice, TouchEvent,
    TouchId, TouchPhase, TouchRestrict,
};
