// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deferred work: recognizer timers and post-dispatch follow-ups.
//!
//! Tasks never capture a recognizer. They carry the owner's [`RecognizerKey`] and the
//! recognizer's session counter at posting time; when a task runs, the arbiter checks that
//! the key still resolves and the session still matches, and otherwise drops the task.
//! Nothing is ever cancelled explicitly.

use alloc::vec::Vec;

use crate::event::DragRequest;
use crate::recognizer::{RecognizerKey, TimerKind};

/// What a task does when it runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskPayload {
    /// Fire a recognizer timer.
    Timer(TimerKind),
    /// Hand a drag start to the listener.
    BeginDrag(DragRequest),
}

/// A deferred unit of work owned by a recognizer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    /// Recognizer the task belongs to.
    pub owner: RecognizerKey,
    /// Recognizer session at posting time.
    pub session: u32,
    /// Timestamp at which the task becomes due; `None` runs after the current pass.
    pub due: Option<u64>,
    /// Work to perform.
    pub payload: TaskPayload,
}

/// Single-threaded queue of deferred tasks.
///
/// Follow-ups (`due == None`) run in posting order once the current dispatch pass is over.
/// Timers run in due order, ties in posting order.
#[derive(Clone, Debug, Default)]
pub struct TaskQueue {
    tasks: Vec<Task>,
}

impl TaskQueue {
    /// An empty queue.
    pub const fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    pub(crate) fn post(&mut self, task: Task) {
        self.tasks.push(task);
    }

    /// Number of queued tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no task is queued.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Queued tasks in posting order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> + '_ {
        self.tasks.iter()
    }

    /// Earliest timer due time, if any.
    pub fn next_due(&self) -> Option<u64> {
        self.tasks.iter().filter_map(|t| t.due).min()
    }

    pub(crate) fn take_follow_ups(&mut self) -> Vec<Task> {
        let (ready, rest): (Vec<Task>, Vec<Task>) =
            self.tasks.drain(..).partition(|t| t.due.is_none());
        self.tasks = rest;
        ready
    }

    pub(crate) fn take_due(&mut self, now: u64) -> Vec<Task> {
        let (mut ready, rest): (Vec<Task>, Vec<Task>) = self
            .tasks
            .drain(..)
            .partition(|t| t.due.is_some_and(|due| due <= now));
        self.tasks = rest;
        ready.sort_by_key(|t| t.due);
        ready
    }
}
