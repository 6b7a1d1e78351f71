// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The referee: per-touch arbitration ledger and the accept/reject resolution rules.
//!
//! Each touch id gets a [`LedgerEntry`] holding the top-level participants of its hit test.
//! The top-level participants compete like the children of an exclusive group.
//!
//! When a leaf proposes an accept, the referee walks from every ledger root that reaches
//! the leaf down to it. The accept is granted unless some exclusive group on one of those
//! paths (or the top level) already has a different accepted child; otherwise the leaf is
//! rejected. A granted accept forces every competing sibling subtree on those paths to
//! `Rejected`. Parallel groups on the path do not reject their other children.
//!
//! A competitor only takes part through the leaves registered for the touch whose entry
//! holds it, so recognizers shared with another finger neither block nor lose to it.

use alloc::vec::Vec;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::group::{CombinationPolicy, Participant};
use crate::recognizer::{RecognizerKey, RecognizerState};
use crate::tree::GestureTree;
use crate::types::TouchId;

/// Arbitration record of one touch id.
#[derive(Clone, Debug, Default)]
pub struct LedgerEntry {
    roots: SmallVec<[Participant; 4]>,
    winners: SmallVec<[RecognizerKey; 2]>,
}

impl LedgerEntry {
    /// Top-level participants from the hit test, in precedence order.
    pub fn roots(&self) -> &[Participant] {
        &self.roots
    }

    /// Leaves accepted for this touch, in acceptance order.
    pub fn winners(&self) -> &[RecognizerKey] {
        &self.winners
    }
}

/// How an accept proposal was resolved.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Resolution {
    /// The leaf is now `Accepted`.
    Accepted,
    /// A competitor was accepted first; the leaf is now `Rejected`.
    Conflict,
    /// No ledger entry holds the leaf; the vote was ignored.
    Dropped,
}

/// Per-touch arbitration authority.
#[derive(Clone, Debug, Default)]
pub struct Referee {
    ledger: HashMap<TouchId, LedgerEntry>,
}

impl Referee {
    /// An empty referee.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the ledger entry of `touch` with the hit test's participants.
    ///
    /// Participants are appended when the entry already exists.
    pub fn open(&mut self, touch: TouchId, roots: impl IntoIterator<Item = Participant>) {
        let entry = self.ledger.entry(touch).or_default();
        for root in roots {
            if !entry.roots.contains(&root) {
                entry.roots.push(root);
            }
        }
    }

    /// Ledger entry of `touch`, while it is open.
    pub fn entry(&self, touch: TouchId) -> Option<&LedgerEntry> {
        self.ledger.get(&touch)
    }

    /// Whether `touch` has an open entry.
    pub fn is_open(&self, touch: TouchId) -> bool {
        self.ledger.contains_key(&touch)
    }

    /// Number of open entries.
    pub fn len(&self) -> usize {
        self.ledger.len()
    }

    /// Whether no entry is open.
    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }

    /// Resolve an accept proposed by `key`.
    pub fn accept(&mut self, tree: &mut GestureTree, key: RecognizerKey) -> Resolution {
        if tree
            .recognizer(key)
            .is_none_or(|r| r.state().is_terminal())
        {
            return Resolution::Dropped;
        }

        // (touch, index of the root reaching the leaf, groups from that root to the leaf)
        let mut paths: SmallVec<[(TouchId, usize, Vec<_>); 2]> = SmallVec::new();
        for (touch, entry) in &self.ledger {
            let found = entry
                .roots
                .iter()
                .enumerate()
                .find_map(|(i, root)| tree.path_to(*root, key).map(|path| (i, path)));
            if let Some((i, path)) = found {
                paths.push((*touch, i, path));
            }
        }
        if paths.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::debug!(recognizer = ?key, "accept dropped: no ledger entry");
            return Resolution::Dropped;
        }

        // Competitors: top-level siblings, plus siblings inside exclusive groups on the path.
        let mut competitors: Vec<(TouchId, Participant)> = Vec::new();
        for (touch, root_index, path) in &paths {
            let Some(entry) = self.ledger.get(touch) else {
                continue;
            };
            for (i, root) in entry.roots.iter().enumerate() {
                if i != *root_index {
                    competitors.push((*touch, *root));
                }
            }
            for (depth, group_key) in path.iter().enumerate() {
                let Some(group) = tree.group(*group_key) else {
                    continue;
                };
                if group.policy() != CombinationPolicy::Exclusive {
                    continue;
                }
                let on_path = path
                    .get(depth + 1)
                    .map_or(Participant::Recognizer(key), |g| Participant::Group(*g));
                competitors.extend(
                    group
                        .children()
                        .iter()
                        .filter(|c| **c != on_path)
                        .map(|c| (*touch, *c)),
                );
            }
        }

        // Only leaves registered for a touch compete in that touch's arbitration.
        let mut engaged: Vec<RecognizerKey> = Vec::new();
        for (touch, competitor) in competitors {
            for leaf in tree.leaves(competitor) {
                if leaf != key
                    && !engaged.contains(&leaf)
                    && tree
                        .recognizer(leaf)
                        .is_some_and(|r| r.touch_ids().contains(&touch))
                {
                    engaged.push(leaf);
                }
            }
        }

        if engaged.iter().any(|leaf| {
            tree.recognizer(*leaf)
                .is_some_and(|r| r.state() == RecognizerState::Accepted)
        }) {
            if let Some(r) = tree.recognizer_mut(key) {
                r.force_reject();
            }
            #[cfg(feature = "tracing")]
            tracing::trace!(recognizer = ?key, "accept lost to an earlier winner");
            return Resolution::Conflict;
        }

        for leaf in engaged {
            if let Some(r) = tree.recognizer_mut(leaf) {
                if r.force_reject() {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(recognizer = ?leaf, winner = ?key, "forced reject");
                }
            }
        }
        if let Some(r) = tree.recognizer_mut(key) {
            r.mark_accepted();
        }
        for (touch, _, _) in &paths {
            if let Some(entry) = self.ledger.get_mut(touch) {
                entry.winners.push(key);
            }
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(recognizer = ?key, "accepted");
        Resolution::Accepted
    }

    /// Release every entry whose leaves have all reached a terminal state.
    ///
    /// Returns the released touch ids.
    pub fn sweep(&mut self, tree: &GestureTree) -> Vec<TouchId> {
        let mut released = Vec::new();
        self.ledger.retain(|touch, entry| {
            let live = entry.roots.iter().any(|root| {
                tree.leaves(*root).into_iter().any(|leaf| {
                    tree.recognizer(leaf)
                        .is_some_and(|r| !r.state().is_terminal())
                })
            });
            if !live {
                released.push(*touch);
            }
            live
        });
        released
    }

    /// Release the entry of `touch`.
    pub fn release(&mut self, touch: TouchId) -> Option<LedgerEntry> {
        self.ledger.remove(&touch)
    }

    /// Forget participants and winners that no longer resolve in `tree`.
    pub fn purge(&mut self, tree: &GestureTree) {
        for entry in self.ledger.values_mut() {
            entry.roots.retain(|p| tree.participant_alive(*p));
            entry.winners.retain(|k| tree.recognizer(*k).is_some());
        }
    }
}
