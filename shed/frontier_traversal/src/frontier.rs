/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

use std::collections::VecDeque;
use std::fmt;

/// FIFO queue of markers waiting for their producer call.
///
/// Markers are never compared, so the same marker may sit in the queue more
/// than once and will be visited once per occurrence. The queue is unbounded.
pub(crate) struct Frontier<M> {
    queue: VecDeque<M>,
}

impl<M> Frontier<M> {
    pub(crate) fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Append a marker to the tail of the queue.
    pub(crate) fn enqueue(&mut self, marker: M) {
        self.queue.push_back(marker);
    }

    /// Remove and return the head of the queue.
    pub(crate) fn dequeue(&mut self) -> Option<M> {
        self.queue.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.queue.clear();
    }
}

impl<M> Extend<M> for Frontier<M> {
    fn extend<I: IntoIterator<Item = M>>(&mut self, markers: I) {
        for marker in markers {
            self.enqueue(marker);
        }
    }
}

impl<M> fmt::Debug for Frontier<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frontier")
            .field("len", &self.queue.len())
            .finish()
    }
}
