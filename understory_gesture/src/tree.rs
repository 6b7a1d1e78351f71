// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The gesture tree: node structure, per-node recognizer ownership, and participant queries.
//!
//! Each node owns its recognizers and groups outright, in per-node generational slots.
//! Everything else (ancestor groups, the referee ledger, queued tasks) holds
//! [`RecognizerKey`]s and [`GroupKey`]s, which resolve through the tree and go stale when
//! the node is removed or the slot is rebuilt.

use alloc::vec::Vec;

use kurbo::Rect;

use crate::arena::{SlotKey, Slots};
use crate::config::GestureConfig;
use crate::declaration::{BuiltinGestures, GestureDeclaration, GestureKind};
use crate::error::TreeError;
use crate::group::{Composition, GroupKey, Participant, RecognizerGroup};
use crate::hierarchy::GestureHierarchy;
use crate::recognizer::{Recognizer, RecognizerKey, RecognizerSource, RecognizerState};
use crate::types::{ComponentId, GestureNode, HitTestMode, NodeId, TouchId};

#[derive(Clone, Debug, Default)]
pub(crate) struct BuiltinSlots {
    pub(crate) scrollable: Option<SlotKey>,
    pub(crate) click: Option<SlotKey>,
    pub(crate) pan: Option<SlotKey>,
    pub(crate) long_press: Option<SlotKey>,
    pub(crate) drag: Option<SlotKey>,
}

#[derive(Clone, Debug)]
pub(crate) struct NodeEntry {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node: GestureNode,
    pub(crate) builtins: BuiltinGestures,
    pub(crate) builtin_slots: BuiltinSlots,
    pub(crate) recognizers: Slots<Recognizer>,
    pub(crate) hierarchy: GestureHierarchy,
    pending_gestures: Option<Vec<GestureDeclaration>>,
    pending_builtins: Option<BuiltinGestures>,
    pub(crate) groups: Slots<RecognizerGroup>,
    pub(crate) inner_group: Option<SlotKey>,
    pub(crate) builtin_group: Option<SlotKey>,
    pub(crate) folded: Vec<SlotKey>,
    /// Groups replaced while a touch was still using them; dropped once idle.
    pub(crate) parked: Vec<SlotKey>,
    pub(crate) composed: Option<Participant>,
}

impl NodeEntry {
    fn new(parent: Option<NodeId>, node: GestureNode) -> Self {
        Self {
            parent,
            children: Vec::new(),
            node,
            builtins: BuiltinGestures::default(),
            builtin_slots: BuiltinSlots::default(),
            recognizers: Slots::new(),
            hierarchy: GestureHierarchy::new(),
            pending_gestures: None,
            pending_builtins: None,
            groups: Slots::new(),
            inner_group: None,
            builtin_group: None,
            folded: Vec::new(),
            parked: Vec::new(),
            composed: None,
        }
    }

    /// Whether any recognizer or group of this node is registered for a live touch.
    fn in_progress(&self) -> bool {
        self.recognizers.iter().any(|(_, r)| !r.touch_ids().is_empty())
            || self.groups.iter().any(|(_, g)| !g.touch_ids().is_empty())
    }

    fn apply_builtins(&mut self, builtins: BuiltinGestures, config: &GestureConfig) {
        let scroll = builtins.scrollable.map(|axis| {
            GestureDeclaration::from_config(GestureKind::Pan, config).with_directions(axis)
        });
        let arena = &mut self.recognizers;
        let slots = &mut self.builtin_slots;
        sync_builtin(
            arena,
            &mut slots.scrollable,
            scroll.as_ref(),
            RecognizerSource::Scrollable,
            config,
        );
        sync_builtin(
            arena,
            &mut slots.click,
            builtins.click.as_ref(),
            RecognizerSource::Click,
            config,
        );
        sync_builtin(
            arena,
            &mut slots.pan,
            builtins.pan.as_ref(),
            RecognizerSource::Pan,
            config,
        );
        sync_builtin(
            arena,
            &mut slots.long_press,
            builtins.long_press.as_ref(),
            RecognizerSource::LongPress,
            config,
        );
        sync_builtin(
            arena,
            &mut slots.drag,
            builtins.drag.as_ref(),
            RecognizerSource::Drag,
            config,
        );
        self.builtins = builtins;
    }
}

/// Keep, update, replace or drop the built-in recognizer in `slot` so it follows `decl`.
fn sync_builtin(
    arena: &mut Slots<Recognizer>,
    slot: &mut Option<SlotKey>,
    decl: Option<&GestureDeclaration>,
    source: RecognizerSource,
    config: &GestureConfig,
) {
    if let (Some(key), Some(decl)) = (*slot, decl) {
        if arena.get_mut(key).is_some_and(|r| r.reconcile_from(decl)) {
            return;
        }
    }
    if let Some(key) = slot.take() {
        arena.remove(key);
    }
    if let Some(decl) = decl {
        *slot = Some(arena.insert(Recognizer::new(decl.clone(), source, config)));
    }
}

/// Node tree plus the recognizers and groups each node owns.
///
/// Structure and declarations are set by the host; the hit test
/// ([`hit_test`](Self::hit_test)) collects and composes participants for one touch.
/// Declaration changes are applied lazily, right before the node's next hit test, and only
/// when no touch is in progress on the node.
#[derive(Clone, Debug, Default)]
pub struct GestureTree {
    pub(crate) nodes: Slots<NodeEntry>,
    roots: Vec<NodeId>,
    pub(crate) config: GestureConfig,
}

impl GestureTree {
    /// An empty tree with default thresholds.
    pub fn new() -> Self {
        Self::with_config(GestureConfig::default())
    }

    /// An empty tree whose built-in recognizers use `config`.
    pub fn with_config(config: GestureConfig) -> Self {
        Self {
            nodes: Slots::new(),
            roots: Vec::new(),
            config,
        }
    }

    /// Thresholds used for built-in recognizers.
    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Insert a node under `parent` (or as a new root) above its existing siblings.
    pub fn insert(&mut self, parent: Option<NodeId>, node: GestureNode) -> Result<NodeId, TreeError> {
        if let Some(p) = parent {
            if !self.is_alive(p) {
                return Err(TreeError::StaleParent(p));
            }
        }
        let id = NodeId::from_slot(self.nodes.insert(NodeEntry::new(parent, node)));
        match parent.and_then(|p| self.nodes.get_mut(p.slot())) {
            Some(p) => p.children.push(id),
            None => self.roots.push(id),
        }
        Ok(id)
    }

    /// Remove `id` and its subtree. Returns the removed nodes, `id` first.
    ///
    /// The removed nodes' recognizers and groups are dropped, so every key that pointed to
    /// them goes stale. Ancestor groups forget them.
    pub fn remove(&mut self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let parent = match self.nodes.get(id.slot()) {
            Some(entry) => entry.parent,
            None => return Err(TreeError::StaleNode(id)),
        };
        match parent.and_then(|p| self.nodes.get_mut(p.slot())) {
            Some(p) => p.children.retain(|c| *c != id),
            None => self.roots.retain(|r| *r != id),
        }

        let mut removed = Vec::new();
        let mut stack = alloc::vec![id];
        while let Some(n) = stack.pop() {
            if let Some(entry) = self.nodes.remove(n.slot()) {
                removed.push(n);
                stack.extend(entry.children.iter().rev());
            }
        }

        let mut ancestor = parent;
        while let Some(a) = ancestor {
            let Some(entry) = self.nodes.get_mut(a.slot()) else {
                break;
            };
            for (_, group) in entry.groups.iter_mut() {
                for node in &removed {
                    group.drop_children_of(*node);
                }
            }
            ancestor = entry.parent;
        }
        Ok(removed)
    }

    /// Whether `id` refers to a live node.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes.contains(id.slot())
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 0
    }

    /// Root nodes, bottom-most first.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Parent of a live node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.slot())?.parent
    }

    /// Children of a live node, bottom-most first.
    pub fn children(&self, id: NodeId) -> Option<&[NodeId]> {
        self.nodes.get(id.slot()).map(|e| e.children.as_slice())
    }

    /// Geometry and hit-test configuration of a live node.
    pub fn node(&self, id: NodeId) -> Option<&GestureNode> {
        self.nodes.get(id.slot()).map(|e| &e.node)
    }

    fn entry_mut(&mut self, id: NodeId) -> Result<&mut NodeEntry, TreeError> {
        self.nodes.get_mut(id.slot()).ok_or(TreeError::StaleNode(id))
    }

    /// Set the frame of a node, in its parent's coordinate space.
    pub fn set_frame(&mut self, id: NodeId, frame: Rect) -> Result<(), TreeError> {
        self.entry_mut(id)?.node.frame = frame;
        Ok(())
    }

    /// Set the hit-test mode of a node.
    pub fn set_hit_test_mode(&mut self, id: NodeId, mode: HitTestMode) -> Result<(), TreeError> {
        self.entry_mut(id)?.node.hit_test_mode = mode;
        Ok(())
    }

    /// Set the component identity of a node.
    pub fn set_component(
        &mut self,
        id: NodeId,
        component: Option<ComponentId>,
    ) -> Result<(), TreeError> {
        self.entry_mut(id)?.node.component = component;
        Ok(())
    }

    /// Replace the node's built-in gestures. Applied before the node's next idle hit test.
    pub fn set_builtins(&mut self, id: NodeId, builtins: BuiltinGestures) -> Result<(), TreeError> {
        self.entry_mut(id)?.pending_builtins = Some(builtins);
        Ok(())
    }

    /// Replace the node's declared gesture list. Applied before the node's next idle hit test.
    pub fn set_gestures(
        &mut self,
        id: NodeId,
        gestures: Vec<GestureDeclaration>,
    ) -> Result<(), TreeError> {
        self.entry_mut(id)?.pending_gestures = Some(gestures);
        Ok(())
    }

    /// Whether the node has declaration changes that are not applied yet.
    pub fn has_pending(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.slot())
            .is_some_and(|e| e.pending_gestures.is_some() || e.pending_builtins.is_some())
    }

    /// Apply pending declaration changes now, unless a touch is in progress on the node.
    ///
    /// Returns whether the declared hierarchy was rebuilt. The hit test calls this for every
    /// node it visits.
    pub fn apply_pending(&mut self, id: NodeId) -> bool {
        let Self { nodes, config, .. } = self;
        let Some(entry) = nodes.get_mut(id.slot()) else {
            return false;
        };
        if entry.pending_gestures.is_none() && entry.pending_builtins.is_none() {
            return false;
        }
        if entry.in_progress() {
            #[cfg(feature = "tracing")]
            tracing::debug!(node = ?id, "touch in progress; reconciliation deferred");
            return false;
        }
        let mut rebuilt = false;
        if let Some(decls) = entry.pending_gestures.take() {
            rebuilt = entry
                .hierarchy
                .reconcile(&mut entry.recognizers, &decls, config);
            if rebuilt {
                #[cfg(feature = "tracing")]
                tracing::debug!(node = ?id, count = decls.len(), "gesture hierarchy rebuilt");
            }
        }
        if let Some(builtins) = entry.pending_builtins.take() {
            entry.apply_builtins(builtins, config);
        }
        rebuilt
    }

    /// Applied built-in gestures of a node.
    pub fn builtins(&self, id: NodeId) -> Option<&BuiltinGestures> {
        self.nodes.get(id.slot()).map(|e| &e.builtins)
    }

    /// The node's declared hierarchy.
    pub fn hierarchy(&self, id: NodeId) -> Option<&GestureHierarchy> {
        self.nodes.get(id.slot()).map(|e| &e.hierarchy)
    }

    /// Keys of the node's declared recognizers, in declaration order.
    pub fn declared_recognizers(&self, id: NodeId) -> impl Iterator<Item = RecognizerKey> + '_ {
        self.nodes
            .get(id.slot())
            .into_iter()
            .flat_map(move |e| e.hierarchy.slots().iter())
            .map(move |slot| RecognizerKey { node: id, slot: *slot })
    }

    /// Key of a built-in recognizer of the node.
    pub fn builtin_recognizer(&self, id: NodeId, source: RecognizerSource) -> Option<RecognizerKey> {
        let slots = &self.nodes.get(id.slot())?.builtin_slots;
        let slot = match source {
            RecognizerSource::Scrollable => slots.scrollable,
            RecognizerSource::Click => slots.click,
            RecognizerSource::Pan => slots.pan,
            RecognizerSource::LongPress => slots.long_press,
            RecognizerSource::Drag => slots.drag,
            RecognizerSource::Declared(_) => None,
        }?;
        Some(RecognizerKey { node: id, slot })
    }

    /// The participant the node contributed to its most recent hit test.
    pub fn composed(&self, id: NodeId) -> Option<Participant> {
        self.nodes.get(id.slot())?.composed
    }

    /// Drag info blob of the node's applied built-ins.
    pub fn drag_info(&self, id: NodeId) -> Option<&[u8]> {
        self.nodes
            .get(id.slot())
            .map(|e| e.builtins.drag_info.as_slice())
    }

    /// Resolve a recognizer key.
    pub fn recognizer(&self, key: RecognizerKey) -> Option<&Recognizer> {
        self.nodes.get(key.node.slot())?.recognizers.get(key.slot)
    }

    pub(crate) fn recognizer_mut(&mut self, key: RecognizerKey) -> Option<&mut Recognizer> {
        self.nodes
            .get_mut(key.node.slot())?
            .recognizers
            .get_mut(key.slot)
    }

    /// Resolve a group key.
    pub fn group(&self, key: GroupKey) -> Option<&RecognizerGroup> {
        self.nodes.get(key.node.slot())?.groups.get(key.slot)
    }

    pub(crate) fn group_mut(&mut self, key: GroupKey) -> Option<&mut RecognizerGroup> {
        self.nodes.get_mut(key.node.slot())?.groups.get_mut(key.slot)
    }

    /// Whether a participant still resolves.
    pub fn participant_alive(&self, participant: Participant) -> bool {
        match participant {
            Participant::Recognizer(k) => self.recognizer(k).is_some(),
            Participant::Group(k) => self.group(k).is_some(),
        }
    }

    /// State of a participant.
    ///
    /// A leaf reports its own state. A group reports `Accepted` once any child is accepted,
    /// `Rejected` once every child is rejected, and otherwise the most advanced pending
    /// state among its children. Stale participants and groups without live children
    /// report `None`.
    pub fn participant_state(&self, participant: Participant) -> Option<RecognizerState> {
        match participant {
            Participant::Recognizer(k) => self.recognizer(k).map(Recognizer::state),
            Participant::Group(k) => {
                let group = self.group(k)?;
                let mut live = 0_usize;
                let mut rejected = 0_usize;
                let mut best = RecognizerState::Ready;
                for child in group.children() {
                    let Some(state) = self.participant_state(*child) else {
                        continue;
                    };
                    live += 1;
                    match state {
                        RecognizerState::Accepted => return Some(RecognizerState::Accepted),
                        RecognizerState::Rejected => rejected += 1,
                        RecognizerState::Pending => best = RecognizerState::Pending,
                        RecognizerState::Detecting if best == RecognizerState::Ready => {
                            best = RecognizerState::Detecting;
                        }
                        _ => {}
                    }
                }
                if live == 0 {
                    None
                } else if rejected == live {
                    Some(RecognizerState::Rejected)
                } else {
                    Some(best)
                }
            }
        }
    }

    /// Live leaf recognizers under `participant`, in precedence (preorder) order.
    pub fn leaves(&self, participant: Participant) -> Vec<RecognizerKey> {
        let mut out = Vec::new();
        self.collect_leaves(participant, &mut out);
        out
    }

    pub(crate) fn collect_leaves(&self, participant: Participant, out: &mut Vec<RecognizerKey>) {
        match participant {
            Participant::Recognizer(k) => {
                if self.recognizer(k).is_some() && !out.contains(&k) {
                    out.push(k);
                }
            }
            Participant::Group(k) => {
                if let Some(group) = self.group(k) {
                    for child in group.children() {
                        self.collect_leaves(*child, out);
                    }
                }
            }
        }
    }

    /// Groups from `root` down to the parent of `key`, if `key` is reachable from `root`.
    pub(crate) fn path_to(&self, root: Participant, key: RecognizerKey) -> Option<Vec<GroupKey>> {
        let mut path = Vec::new();
        self.find_path(root, key, &mut path).then_some(path)
    }

    fn find_path(&self, at: Participant, key: RecognizerKey, path: &mut Vec<GroupKey>) -> bool {
        match at {
            Participant::Recognizer(k) => k == key && self.recognizer(k).is_some(),
            Participant::Group(g) => {
                let Some(group) = self.group(g) else {
                    return false;
                };
                path.push(g);
                if group
                    .children()
                    .iter()
                    .any(|child| self.find_path(*child, key, path))
                {
                    return true;
                }
                path.pop();
                false
            }
        }
    }

    /// Drop `touch` from every leaf and group under `participant`.
    pub(crate) fn end_touch(&mut self, participant: Participant, touch: TouchId) {
        match participant {
            Participant::Recognizer(k) => {
                if let Some(r) = self.recognizer_mut(k) {
                    r.end_touch(touch);
                }
            }
            Participant::Group(k) => {
                let Some(entry) = self.nodes.get_mut(k.node.slot()) else {
                    return;
                };
                let Some(group) = entry.groups.get_mut(k.slot) else {
                    return;
                };
                group.end_touch(touch);
                let children: Vec<Participant> = group.children().to_vec();
                if group.touch_ids().is_empty() {
                    if let Some(i) = entry.parked.iter().position(|p| *p == k.slot) {
                        entry.parked.swap_remove(i);
                        entry.groups.remove(k.slot);
                    }
                }
                for child in children {
                    self.end_touch(child, touch);
                }
            }
        }
    }

    /// Structural snapshot of a participant.
    pub fn composition(&self, participant: Participant) -> Option<Composition> {
        match participant {
            Participant::Recognizer(k) => {
                let r = self.recognizer(k)?;
                Some(Composition::leaf(r.kind(), r.source()))
            }
            Participant::Group(k) => {
                let group = self.group(k)?;
                let children = group
                    .children()
                    .iter()
                    .filter_map(|c| self.composition(*c))
                    .collect();
                Some(Composition::Group {
                    policy: group.policy(),
                    children,
                })
            }
        }
    }
}
