// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hit testing: walk the tree for one touch point and collect targets.
//!
//! The walk visits children topmost first and composes bottom-up: each hit node combines
//! the participants of its hit children with its own built-ins and declared gestures into a
//! single participant (see the composer), which it hands to its parent.

use alloc::vec::Vec;

use smallvec::SmallVec;

use kurbo::{Point, Size, Vec2};

use crate::arena::{SlotKey, Slots};
use crate::composer::retire;
use crate::group::{CombinationPolicy, GroupKey, Participant, RecognizerGroup};
use crate::recognizer::{Recognizer, RecognizerKey};
use crate::result::{PlainTarget, TouchTarget, TouchTestResult};
use crate::tree::{GestureTree, NodeEntry};
use crate::types::{GestureTarget, HitTestMode, NodeId, SourceDevice, TouchId, TouchRestrict};

pub(crate) type Inner = SmallVec<[Participant; 4]>;

/// Per-walk parameters shared by every visited node.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Probe<'a> {
    pub(crate) point: Point,
    pub(crate) touch: TouchId,
    pub(crate) restrict: &'a TouchRestrict,
}

impl GestureTree {
    /// Collect the targets under `point` for `touch`, registering every collected
    /// recognizer and group for that touch.
    ///
    /// `point` is in global coordinates. Roots and children are tested topmost first; a hit
    /// node in [`HitTestMode::Default`] or [`HitTestMode::Block`] stops the test of its
    /// lower siblings.
    pub fn hit_test(
        &mut self,
        point: Point,
        touch: TouchId,
        restrict: &TouchRestrict,
    ) -> TouchTestResult {
        let probe = Probe {
            point,
            touch,
            restrict,
        };
        let mut result = TouchTestResult::new();
        let roots = self.roots().to_vec();
        for root in roots.iter().rev() {
            if self.collect(*root, Vec2::ZERO, &probe, &mut result) == Some(true) {
                break;
            }
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(touch = touch.0, targets = result.len(), "hit test complete");
        result
    }

    /// Visit `id`. Returns `None` if the node was not hit, otherwise whether it blocks its
    /// lower siblings.
    fn collect(
        &mut self,
        id: NodeId,
        parent_offset: Vec2,
        probe: &Probe<'_>,
        out: &mut TouchTestResult,
    ) -> Option<bool> {
        let (frame, mode) = {
            let entry = self.nodes.get(id.slot())?;
            (entry.node.frame, entry.node.hit_test_mode)
        };
        if !frame.contains(probe.point - parent_offset) {
            return None;
        }
        self.apply_pending(id);
        let origin = parent_offset + frame.origin().to_vec2();

        let mut below = TouchTestResult::new();
        if mode != HitTestMode::Block {
            let children = self.children(id).map(<[NodeId]>::to_vec).unwrap_or_default();
            for child in children.iter().rev() {
                if self.collect(*child, origin, probe, &mut below) == Some(true) {
                    break;
                }
            }
        }
        if mode == HitTestMode::None {
            out.extend(below);
            return Some(false);
        }

        let mut inner = Inner::new();
        for target in below.iter() {
            match target {
                TouchTarget::Plain(plain) => out.push(TouchTarget::Plain(*plain)),
                TouchTarget::Participant(p) => inner.push(*p),
            }
        }

        let entry = self.nodes.get_mut(id.slot())?;
        collect_builtins(entry, id, origin, frame.size(), probe, &mut inner, out);
        if let Some(participant) = self.compose(id, &inner, origin, frame.size(), probe) {
            out.push(TouchTarget::Participant(participant));
        }
        Some(mode != HitTestMode::Transparent)
    }
}

/// Gather the node's built-ins in category order: scrollable, raw touch, click, pan, then
/// long press and drag together.
fn collect_builtins(
    entry: &mut NodeEntry,
    id: NodeId,
    origin: Vec2,
    size: Size,
    probe: &Probe<'_>,
    inner: &mut Inner,
    out: &mut TouchTestResult,
) {
    let target = GestureTarget {
        node: id,
        component: entry.node.component,
    };
    let slots = &entry.builtin_slots;
    let arena = &mut entry.recognizers;

    let mut take = |slot: Option<SlotKey>| -> Option<Participant> {
        let slot = slot?;
        let r = arena.get_mut(slot)?;
        if !allowed(probe.restrict, r) {
            return None;
        }
        r.attach(target, origin, size);
        r.begin_referee(probe.touch);
        Some(Participant::Recognizer(RecognizerKey { node: id, slot }))
    };

    inner.extend(take(slots.scrollable));
    if entry.builtins.touch_listener {
        out.push(TouchTarget::Plain(PlainTarget {
            node: id,
            component: entry.node.component,
            offset: origin,
        }));
    }
    inner.extend(take(slots.click));
    inner.extend(take(slots.pan));

    let racing: Inner = [slots.long_press, slots.drag]
        .into_iter()
        .filter_map(&mut take)
        .collect();
    match racing.as_slice() {
        [] => retire(&mut entry.groups, &mut entry.parked, &mut entry.builtin_group),
        [single] => {
            retire(&mut entry.groups, &mut entry.parked, &mut entry.builtin_group);
            inner.push(*single);
        }
        _ => {
            let slot = reuse_group(
                &mut entry.groups,
                &mut entry.parked,
                entry.builtin_group,
                CombinationPolicy::Parallel,
                &racing,
            );
            entry.builtin_group = Some(slot);
            if let Some(group) = entry.groups.get_mut(slot) {
                group.set_children(&racing);
                group.begin_referee(probe.touch);
            }
            inner.push(Participant::Group(GroupKey { node: id, slot }));
        }
    }
}

/// The group in `existing` if it can serve `policy` over `children`, otherwise a fresh one.
///
/// An idle group is reused whenever the policy matches. A group still registered for a
/// touch is only reused when it already has exactly these children; otherwise it is parked
/// unchanged, so the touches using it keep their arbitration state, and dropped once idle.
pub(crate) fn reuse_group(
    groups: &mut Slots<RecognizerGroup>,
    parked: &mut Vec<SlotKey>,
    existing: Option<SlotKey>,
    policy: CombinationPolicy,
    children: &[Participant],
) -> SlotKey {
    if let Some(slot) = existing {
        match groups.get(slot) {
            Some(g) if g.touch_ids().is_empty() => {
                if g.policy() == policy {
                    return slot;
                }
                groups.remove(slot);
            }
            Some(g) => {
                if g.policy() == policy && g.children() == children {
                    return slot;
                }
                parked.push(slot);
            }
            None => {}
        }
    }
    groups.insert(RecognizerGroup::new(policy))
}

/// Whether `recognizer` may be collected under `restrict`.
///
/// Forbidden kinds are skipped. A mouse or pen has a single contact, so recognizers that
/// need more than one finger are skipped for them too.
pub(crate) fn allowed(restrict: &TouchRestrict, recognizer: &Recognizer) -> bool {
    if restrict.forbidden.contains(recognizer.kind().as_flag()) {
        return false;
    }
    restrict.device == SourceDevice::Touch || recognizer.declaration().fingers <= 1
}
