// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recognizer groups: composite participants with an exclusive or parallel policy.
//!
//! A group has no gesture logic of its own. It orders its children and tells the
//! [`Referee`](crate::Referee) how their accepts interact:
//!
//! - [`CombinationPolicy::Exclusive`]: at most one child may be accepted; when one is, the
//!   remaining children are rejected. Child order is precedence: when two children propose
//!   an accept in the same dispatch pass, the earlier one wins.
//! - [`CombinationPolicy::Parallel`]: any number of children may be accepted.
//!
//! A group's state is derived from its children; see
//! [`GestureTree::participant_state`](crate::GestureTree::participant_state).

use alloc::vec::Vec;

use smallvec::SmallVec;

use crate::arena::SlotKey;
use crate::declaration::GestureKind;
use crate::recognizer::{RecognizerKey, RecognizerSource};
use crate::types::{NodeId, TouchId};

/// How the children of a group interact.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CombinationPolicy {
    /// At most one child is accepted.
    Exclusive,
    /// Children are accepted independently.
    Parallel,
}

/// Handle to a group owned by a node of a [`GestureTree`](crate::GestureTree).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct GroupKey {
    pub(crate) node: NodeId,
    pub(crate) slot: SlotKey,
}

impl GroupKey {
    /// The owning node.
    pub const fn node(self) -> NodeId {
        self.node
    }
}

/// Anything that takes part in arbitration: a leaf recognizer or a group.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Participant {
    /// A leaf recognizer.
    Recognizer(RecognizerKey),
    /// A group of participants.
    Group(GroupKey),
}

impl Participant {
    /// The node that owns the participant.
    pub const fn node(self) -> NodeId {
        match self {
            Self::Recognizer(k) => k.node,
            Self::Group(k) => k.node,
        }
    }
}

impl From<RecognizerKey> for Participant {
    fn from(key: RecognizerKey) -> Self {
        Self::Recognizer(key)
    }
}

impl From<GroupKey> for Participant {
    fn from(key: GroupKey) -> Self {
        Self::Group(key)
    }
}

/// An ordered set of participants combined under one policy.
#[derive(Clone, Debug)]
pub struct RecognizerGroup {
    policy: CombinationPolicy,
    children: SmallVec<[Participant; 4]>,
    touches: SmallVec<[TouchId; 2]>,
}

impl RecognizerGroup {
    pub(crate) fn new(policy: CombinationPolicy) -> Self {
        Self {
            policy,
            children: SmallVec::new(),
            touches: SmallVec::new(),
        }
    }

    /// Combination policy.
    pub fn policy(&self) -> CombinationPolicy {
        self.policy
    }

    /// Children in precedence order.
    pub fn children(&self) -> &[Participant] {
        &self.children
    }

    /// Touch ids the group is registered for.
    pub fn touch_ids(&self) -> &[TouchId] {
        &self.touches
    }

    /// Replace the children.
    ///
    /// Callers only hand a group in progress the children it already has.
    pub(crate) fn set_children(&mut self, children: &[Participant]) {
        self.children.clear();
        self.children.extend_from_slice(children);
    }

    pub(crate) fn begin_referee(&mut self, touch: TouchId) {
        if !self.touches.contains(&touch) {
            self.touches.push(touch);
        }
    }

    pub(crate) fn end_touch(&mut self, touch: TouchId) {
        self.touches.retain(|t| *t != touch);
    }

    pub(crate) fn drop_children_of(&mut self, node: NodeId) {
        self.children.retain(|c| c.node() != node);
    }
}

/// Structural snapshot of a participant, for inspection and tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Composition {
    /// A leaf recognizer.
    Leaf {
        /// Gesture kind.
        kind: GestureKind,
        /// Built-in role or declaration index.
        source: RecognizerSource,
    },
    /// A group and its children in order.
    Group {
        /// Combination policy.
        policy: CombinationPolicy,
        /// Children in precedence order.
        children: Vec<Composition>,
    },
}

impl Composition {
    /// A leaf.
    pub fn leaf(kind: GestureKind, source: RecognizerSource) -> Self {
        Self::Leaf { kind, source }
    }

    /// An exclusive group of `children`.
    pub fn exclusive(children: Vec<Self>) -> Self {
        Self::Group {
            policy: CombinationPolicy::Exclusive,
            children,
        }
    }

    /// A parallel group of `children`.
    pub fn parallel(children: Vec<Self>) -> Self {
        Self::Group {
            policy: CombinationPolicy::Parallel,
            children,
        }
    }
}
