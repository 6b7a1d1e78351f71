// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node composition: fold the declared gestures over what the node has accumulated.
//!
//! The accumulated participant `current` starts as the node's inner participant (hit
//! children first, then built-ins; wrapped in an exclusive group when there are several).
//! Each declared recognizer `r` then combines with it, in declaration order:
//!
//! | `r`                         | new `current`              |
//! |-----------------------------|----------------------------|
//! | mask `IgnoreSelfBuiltins`   | `r`                        |
//! | no `current` yet            | `r`                        |
//! | priority `Low`              | `Exclusive(current, r)`    |
//! | priority `High`             | `Exclusive(r, current)`    |
//! | priority `Parallel`         | `Parallel(r, current)`     |
//!
//! Groups are kept in per-node ordinal slots and reused across hit tests, so a pass that
//! produces the same shape hands the referee the same groups. A group another touch is
//! still arbitrating over is never changed: a pass that needs different children parks it
//! and takes a fresh one.

use alloc::vec::Vec;

use crate::arena::{SlotKey, Slots};
use crate::collector::{Probe, allowed, reuse_group};
use crate::declaration::{GestureMask, GesturePriority};
use crate::group::{CombinationPolicy, GroupKey, Participant, RecognizerGroup};
use crate::recognizer::RecognizerKey;
use crate::tree::GestureTree;
use crate::types::{GestureTarget, NodeId};

use kurbo::{Size, Vec2};
use smallvec::SmallVec;

impl GestureTree {
    /// Compose the node's single participant from its inner participants and its
    /// declared hierarchy, registering every group it uses for the probe's touch.
    pub(crate) fn compose(
        &mut self,
        id: NodeId,
        inner: &[Participant],
        origin: Vec2,
        size: Size,
        probe: &Probe<'_>,
    ) -> Option<Participant> {
        let entry = self.nodes.get_mut(id.slot())?;
        let groups = &mut entry.groups;
        let parked = &mut entry.parked;

        let mut current = match inner {
            [] => None,
            [single] => Some(*single),
            _ => {
                let slot = reuse_group(
                    groups,
                    parked,
                    entry.inner_group,
                    CombinationPolicy::Exclusive,
                    inner,
                );
                entry.inner_group = Some(slot);
                Some(register(groups, id, slot, inner, probe))
            }
        };
        if inner.len() < 2 {
            retire(groups, parked, &mut entry.inner_group);
        }

        let target = GestureTarget {
            node: id,
            component: entry.node.component,
        };
        let mut used = 0;
        let mut discarded: SmallVec<[Participant; 2]> = SmallVec::new();
        for slot in entry.hierarchy.slots() {
            let Some(r) = entry.recognizers.get_mut(*slot) else {
                continue;
            };
            if !allowed(probe.restrict, r) {
                continue;
            }
            r.attach(target, origin, size);
            r.begin_referee(probe.touch);
            let leaf = Participant::Recognizer(RecognizerKey {
                node: id,
                slot: *slot,
            });

            let prev = match (r.mask(), current) {
                (GestureMask::IgnoreSelfBuiltins, prev) => {
                    discarded.extend(prev);
                    current = Some(leaf);
                    continue;
                }
                (GestureMask::Normal, None) => {
                    current = Some(leaf);
                    continue;
                }
                (GestureMask::Normal, Some(prev)) => prev,
            };
            let (policy, members) = match r.priority() {
                GesturePriority::Low => (CombinationPolicy::Exclusive, [prev, leaf]),
                GesturePriority::High => (CombinationPolicy::Exclusive, [leaf, prev]),
                GesturePriority::Parallel => (CombinationPolicy::Parallel, [leaf, prev]),
            };
            let group_slot = reuse_group(
                groups,
                parked,
                entry.folded.get(used).copied(),
                policy,
                &members,
            );
            if used < entry.folded.len() {
                entry.folded[used] = group_slot;
            } else {
                entry.folded.push(group_slot);
            }
            used += 1;
            current = Some(register(groups, id, group_slot, &members, probe));
        }

        // Trailing groups this pass did not use.
        for slot in entry.folded.drain(used..) {
            retire(groups, parked, &mut Some(slot));
        }

        entry.composed = current;

        // Masked-out participants were registered for this touch but never reach the
        // referee; release them again.
        for p in discarded {
            self.end_touch(p, probe.touch);
        }
        current
    }
}

fn register(
    groups: &mut Slots<RecognizerGroup>,
    node: NodeId,
    slot: SlotKey,
    children: &[Participant],
    probe: &Probe<'_>,
) -> Participant {
    if let Some(group) = groups.get_mut(slot) {
        group.set_children(children);
        group.begin_referee(probe.touch);
    }
    Participant::Group(GroupKey { node, slot })
}

/// Empty `slot`, dropping its group, or parking it while a touch is in progress on it.
pub(crate) fn retire(
    groups: &mut Slots<RecognizerGroup>,
    parked: &mut Vec<SlotKey>,
    slot: &mut Option<SlotKey>,
) {
    let Some(key) = slot.take() else {
        return;
    };
    if groups.get(key).is_some_and(|g| !g.touch_ids().is_empty()) {
        parked.push(key);
    } else {
        groups.remove(key);
    }
}
