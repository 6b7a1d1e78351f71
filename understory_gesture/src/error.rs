// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for structural misuse of the gesture tree and for malformed declarations.
//!
//! Arbitration itself never fails: expired handles resolve to `None` and invalid
//! declarations produce recognizers that reject on their first down.

use core::fmt;

use crate::types::NodeId;

/// Returned by [`GestureTree`](crate::GestureTree) mutations that reference a stale node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TreeError {
    /// The parent passed to [`insert`](crate::GestureTree::insert) is not alive.
    StaleParent(NodeId),
    /// The node passed to a mutation is not alive.
    StaleNode(NodeId),
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaleParent(id) => write!(f, "parent {id:?} is not alive"),
            Self::StaleNode(id) => write!(f, "node {id:?} is not alive"),
        }
    }
}

impl core::error::Error for TreeError {}

/// Reason a [`GestureDeclaration`](crate::GestureDeclaration) is malformed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DeclarationError {
    /// `fingers` is zero.
    ZeroFingers,
    /// `fingers` exceeds [`MAX_FINGERS`](crate::MAX_FINGERS).
    TooManyFingers(u8),
    /// A tap declares a `count` of zero.
    ZeroCount,
    /// A distance, angle or speed threshold is negative or not finite.
    InvalidThreshold,
    /// A directional gesture allows no direction.
    EmptyDirections,
}

impl fmt::Display for DeclarationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroFingers => f.write_str("gesture requires at least one finger"),
            Self::TooManyFingers(n) => write!(f, "gesture requires {n} fingers, too many"),
            Self::ZeroCount => f.write_str("tap count must be at least one"),
            Self::InvalidThreshold => f.write_str("threshold must be finite and non-negative"),
            Self::EmptyDirections => f.write_str("directional gesture allows no direction"),
        }
    }
}

impl core::error::Error for DeclarationError {}
