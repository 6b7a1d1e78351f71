// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The arbiter: drives hit testing, dispatch, arbitration and deferred work from raw input.

use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::config::GestureConfig;
use crate::declaration::GestureKind;
use crate::error::TreeError;
use crate::event::{DragRequest, GestureAction, GestureEvent, GestureListener, notify};
use crate::recognizer::{Outcome, RecognizerKey, Verdict};
use crate::referee::{Referee, Resolution};
use crate::result::{PlainTarget, TouchTarget, TouchTestResult};
use crate::task::{Task, TaskPayload, TaskQueue};
use crate::tree::GestureTree;
use crate::types::{NodeId, TouchEvent, TouchId, TouchPhase, TouchRestrict};

/// Entry point for raw input.
///
/// - `Down` hit tests the tree, opens the touch's ledger entry and records the dispatch set.
/// - `Move`, `Up` and `Cancel` go to the dispatch set recorded at `Down`.
/// - `Up` and `Cancel` end the touch for every participant and release its ledger entry.
///
/// After every event, settled ledger entries are released and follow-up tasks (drag starts)
/// run. Timers run from [`advance`](Self::advance).
#[derive(Clone, Debug, Default)]
pub struct Arbiter {
    tree: GestureTree,
    referee: Referee,
    dispatch: HashMap<TouchId, TouchTestResult>,
    tasks: TaskQueue,
    restrict: TouchRestrict,
}

impl Arbiter {
    /// An arbiter over an empty tree with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// An arbiter over an empty tree whose built-ins use `config`.
    pub fn with_config(config: GestureConfig) -> Self {
        Self::from_tree(GestureTree::with_config(config))
    }

    /// An arbiter over an existing tree.
    pub fn from_tree(tree: GestureTree) -> Self {
        Self {
            tree,
            ..Self::default()
        }
    }

    /// The gesture tree.
    pub fn tree(&self) -> &GestureTree {
        &self.tree
    }

    /// The gesture tree, for structural and declaration updates.
    ///
    /// Use [`remove_node`](Self::remove_node) rather than [`GestureTree::remove`] so the
    /// referee and dispatch sets forget the removed nodes.
    pub fn tree_mut(&mut self) -> &mut GestureTree {
        &mut self.tree
    }

    /// The referee.
    pub fn referee(&self) -> &Referee {
        &self.referee
    }

    /// Queued tasks.
    pub fn tasks(&self) -> &TaskQueue {
        &self.tasks
    }

    /// Restriction applied to subsequent hit tests.
    pub fn set_touch_restrict(&mut self, restrict: TouchRestrict) {
        self.restrict = restrict;
    }

    /// Dispatch set of a touch in progress.
    pub fn touch_result(&self, touch: TouchId) -> Option<&TouchTestResult> {
        self.dispatch.get(&touch)
    }

    /// Feed one raw event.
    pub fn handle(&mut self, event: &TouchEvent, listener: &mut impl GestureListener) {
        match event.phase {
            TouchPhase::Down => {
                if self.dispatch.contains_key(&event.id) {
                    // A repeated down without up; close the old sequence first.
                    self.finish_touch(event.id);
                }
                let restrict = TouchRestrict {
                    device: event.device,
                    ..self.restrict
                };
                let result = self.tree.hit_test(event.point, event.id, &restrict);
                self.referee.open(event.id, result.participants());
                self.dispatch.insert(event.id, result);
                self.deliver(event, listener);
            }
            TouchPhase::Move => self.deliver(event, listener),
            TouchPhase::Up | TouchPhase::Cancel => {
                self.deliver(event, listener);
                self.finish_touch(event.id);
            }
        }
        self.settle(listener);
    }

    /// Run every timer due at `now`.
    pub fn advance(&mut self, now: u64, listener: &mut impl GestureListener) {
        for task in self.tasks.take_due(now) {
            self.run(task, now, listener);
        }
        self.settle(listener);
    }

    /// Remove a node and its subtree mid-gesture.
    ///
    /// The subtree's recognizers are dropped without further callbacks; ledger entries and
    /// dispatch sets forget them, and their queued tasks fail the liveness check.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let removed = self.tree.remove(id)?;
        self.referee.purge(&self.tree);
        let tree = &self.tree;
        for result in self.dispatch.values_mut() {
            result.retain(|t| match t {
                TouchTarget::Plain(p) => tree.is_alive(p.node),
                TouchTarget::Participant(p) => tree.participant_alive(*p),
            });
        }
        #[cfg(feature = "tracing")]
        tracing::info!(node = ?id, removed = removed.len(), "removed subtree; live recognizers cancelled");
        Ok(removed)
    }

    fn deliver(&mut self, event: &TouchEvent, listener: &mut impl GestureListener) {
        let Some(result) = self.dispatch.get(&event.id) else {
            return;
        };
        let plain: Vec<PlainTarget> = result.plain_targets().copied().collect();
        let mut leaves = Vec::new();
        for p in result.participants() {
            self.tree.collect_leaves(p, &mut leaves);
        }

        for target in &plain {
            listener.on_touch(target, event);
        }
        for key in leaves {
            let Some(r) = self.tree.recognizer_mut(key) else {
                continue;
            };
            let outcome = r.handle(event);
            self.apply(key, outcome, listener);
        }
    }

    fn apply(&mut self, key: RecognizerKey, outcome: Outcome, listener: &mut impl GestureListener) {
        let Some(r) = self.tree.recognizer(key) else {
            return;
        };
        let session = r.session();
        if let Some((due, timer)) = outcome.timer {
            self.tasks.post(Task {
                owner: key,
                session,
                due: Some(due),
                payload: TaskPayload::Timer(timer),
            });
        }
        match outcome.vote {
            Some(Verdict::Accept) => {
                if self.referee.accept(&mut self.tree, key) == Resolution::Accepted {
                    self.on_accepted(key, listener);
                }
            }
            Some(Verdict::Reject) => {
                #[cfg(feature = "tracing")]
                tracing::trace!(recognizer = ?key, "rejected");
            }
            None => {}
        }
        for action in outcome.actions {
            self.emit(key, action, listener);
        }
    }

    fn on_accepted(&mut self, key: RecognizerKey, listener: &mut impl GestureListener) {
        self.emit(key, GestureAction::Start, listener);
        let Some(r) = self.tree.recognizer(key) else {
            return;
        };
        if !r.kind().is_continuous() {
            self.emit(key, GestureAction::End, listener);
            return;
        }
        if r.kind() == GestureKind::Drag {
            let request = DragRequest {
                node: key.node,
                component: r.target().and_then(|t| t.component),
                pointer: r.event_info().touch,
                extra_info: self.tree.drag_info(key.node).unwrap_or_default().to_vec(),
            };
            self.tasks.post(Task {
                owner: key,
                session: r.session(),
                due: None,
                payload: TaskPayload::BeginDrag(request),
            });
        }
    }

    fn emit(&self, key: RecognizerKey, action: GestureAction, listener: &mut impl GestureListener) {
        let Some(r) = self.tree.recognizer(key) else {
            return;
        };
        let event = GestureEvent {
            target: r.target(),
            recognizer: key,
            source: r.source(),
            kind: r.kind(),
            action,
            info: r.event_info(),
        };
        notify(listener, &event);
    }

    fn run(&mut self, task: Task, now: u64, listener: &mut impl GestureListener) {
        let live = self
            .tree
            .recognizer(task.owner)
            .is_some_and(|r| r.session() == task.session);
        if !live {
            #[cfg(feature = "tracing")]
            tracing::debug!(owner = ?task.owner, "stale task skipped");
            return;
        }
        match task.payload {
            TaskPayload::Timer(timer) => {
                let Some(r) = self.tree.recognizer_mut(task.owner) else {
                    return;
                };
                let outcome = r.on_timer(timer, now);
                self.apply(task.owner, outcome, listener);
            }
            TaskPayload::BeginDrag(request) => listener.begin_drag(&request),
        }
    }

    /// Release settled ledger entries, then run follow-ups until none are left.
    fn settle(&mut self, listener: &mut impl GestureListener) {
        loop {
            self.referee.sweep(&self.tree);
            let follow_ups = self.tasks.take_follow_ups();
            if follow_ups.is_empty() {
                break;
            }
            for task in follow_ups {
                let now = task.due.unwrap_or_default();
                self.run(task, now, listener);
            }
        }
    }

    fn finish_touch(&mut self, touch: TouchId) {
        if let Some(result) = self.dispatch.remove(&touch) {
            for p in result.participants() {
                self.tree.end_touch(p, touch);
            }
        }
        self.referee.release(touch);
    }
}
