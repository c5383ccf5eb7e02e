/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

use std::fmt;

/// Result of a single producer call.
///
/// `markers` are the children to visit later; they are appended to the
/// frontier in this order. `values` is the payload of the visited node: a
/// stream that is merged into the traversal output and may keep producing
/// items while later producer calls run.
pub struct Chunk<M, S> {
    /// Children of the visited node.
    pub markers: Vec<M>,
    /// Payload of the visited node.
    pub values: S,
}

impl<M, S> Chunk<M, S> {
    /// Create a chunk from child markers and a value stream.
    pub fn new(markers: impl IntoIterator<Item = M>, values: S) -> Self {
        Self {
            markers: markers.into_iter().collect(),
            values,
        }
    }

    /// Split the chunk into its markers and its value stream.
    pub fn into_parts(self) -> (Vec<M>, S) {
        (self.markers, self.values)
    }
}

impl<M: fmt::Debug, S> fmt::Debug for Chunk<M, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("markers", &self.markers)
            .finish_non_exhaustive()
    }
}
