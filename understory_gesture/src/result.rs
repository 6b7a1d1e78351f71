// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The ordered output of a hit test.

use alloc::vec::Vec;

use kurbo::Vec2;

use crate::group::Participant;
use crate::types::{ComponentId, NodeId};

/// A node that receives raw touch events without taking part in arbitration.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlainTarget {
    /// Node that asked for raw touches.
    pub node: NodeId,
    /// Its component, if any.
    pub component: Option<ComponentId>,
    /// Global offset of the node.
    pub offset: Vec2,
}

/// One entry of a [`TouchTestResult`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TouchTarget {
    /// A raw touch receiver.
    Plain(PlainTarget),
    /// A recognizer or group that joins arbitration.
    Participant(Participant),
}

/// Ordered list of targets produced by a hit test, deepest first.
///
/// Arbitration participants and plain targets are interleaved in the order the collector
/// produced them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TouchTestResult {
    targets: Vec<TouchTarget>,
}

impl TouchTestResult {
    /// An empty result.
    pub const fn new() -> Self {
        Self {
            targets: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, target: TouchTarget) {
        self.targets.push(target);
    }

    pub(crate) fn extend(&mut self, other: Self) {
        self.targets.extend(other.targets);
    }

    /// Number of targets.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether nothing was hit.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// All targets in order.
    pub fn iter(&self) -> impl Iterator<Item = &TouchTarget> + '_ {
        self.targets.iter()
    }

    /// Arbitration participants in order.
    pub fn participants(&self) -> impl Iterator<Item = Participant> + '_ {
        self.targets.iter().filter_map(|t| match t {
            TouchTarget::Participant(p) => Some(*p),
            TouchTarget::Plain(_) => None,
        })
    }

    /// Plain targets in order.
    pub fn plain_targets(&self) -> impl Iterator<Item = &PlainTarget> + '_ {
        self.targets.iter().filter_map(|t| match t {
            TouchTarget::Plain(p) => Some(p),
            TouchTarget::Participant(_) => None,
        })
    }

    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&TouchTarget) -> bool) {
        self.targets.retain(|t| keep(t));
    }
}
