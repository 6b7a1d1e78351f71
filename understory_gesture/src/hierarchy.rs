// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node cache of the recognizers built from the node's declared gesture list.

use alloc::vec::Vec;

use crate::arena::{SlotKey, Slots};
use crate::config::GestureConfig;
use crate::declaration::GestureDeclaration;
use crate::recognizer::{Recognizer, RecognizerSource};

/// The recognizers built from a node's declarations, in declaration order.
///
/// The owning node's recognizer slots hold the instances; the hierarchy only orders them.
#[derive(Clone, Debug, Default)]
pub struct GestureHierarchy {
    entries: Vec<SlotKey>,
}

impl GestureHierarchy {
    pub(crate) const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of declared recognizers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the node declares no gestures.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn slots(&self) -> &[SlotKey] {
        &self.entries
    }

    /// Bring the hierarchy in line with `decls`. Returns whether instances were rebuilt.
    ///
    /// With equal lengths and every old instance able to absorb its new declaration, all
    /// instances are kept and updated in place. Otherwise every old instance is dropped and
    /// a fresh one is built per declaration.
    pub(crate) fn reconcile(
        &mut self,
        arena: &mut Slots<Recognizer>,
        decls: &[GestureDeclaration],
        config: &GestureConfig,
    ) -> bool {
        if self.entries.len() == decls.len() {
            let compatible = self
                .entries
                .iter()
                .zip(decls)
                .all(|(key, decl)| arena.get(*key).is_some_and(|r| r.can_reconcile(decl)));
            if compatible {
                for (key, decl) in self.entries.iter().zip(decls) {
                    if let Some(r) = arena.get_mut(*key) {
                        r.reconcile_from(decl);
                    }
                }
                return false;
            }
        }
        for key in self.entries.drain(..) {
            arena.remove(key);
        }
        for (i, decl) in decls.iter().enumerate() {
            let source = RecognizerSource::Declared(u16::try_from(i).unwrap_or(u16::MAX));
            let key = arena.insert(Recognizer::new(decl.clone(), source, config));
            self.entries.push(key);
        }
        true
    }
}
