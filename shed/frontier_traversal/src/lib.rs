/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

#![warn(missing_docs)]

//! Traversal of asynchronously discovered graphs and trees as a stream.
//!
//! The graph is never materialised. Each node is addressed by an opaque
//! marker, and a caller supplied producer expands a marker (or `None` for the
//! root) into a [`Chunk`]: the markers of its children and a stream of values
//! belonging to the node. [`traverse`] keeps a FIFO frontier of markers
//! waiting to be expanded, makes at most one producer call at a time, and
//! merges the value streams of all visited nodes into one output stream.
//!
//! * Values are yielded as they are produced, so the output follows
//!   completion order rather than discovery order.
//! * By default the traversal is free-running: the next producer call starts
//!   once the previous call's values are complete. With
//!   [`Traverse::paced_by`] every frontier advance after the root is
//!   authorised by one item of a notifier stream instead, and value streams
//!   of earlier nodes keep running while later nodes are expanded.
//! * A failing producer call or value stream ends the output with that
//!   error. There are no retries.
//! * Markers are never compared. A marker returned twice is visited twice.
//! * The output completes when the frontier is empty, no producer call is
//!   in flight and all value streams are done.
//!
//! Dropping the output cancels the in-flight producer call, every value
//! stream and the notifier. Each [`Traverse`] owns its state; use a
//! [`TraversalPlan`] to start the same traversal several times.
//!
//! # Examples
//!
//! ```rust
//! # futures::executor::block_on(async {
//! use frontier_traversal::Chunk;
//! use futures::TryStreamExt as _;
//! use futures::stream;
//!
//! // Heap-numbered binary tree with 15 nodes.
//! let nodes: Vec<u32> = frontier_traversal::traverse(|node: Option<u32>, _call_index| {
//!     let node = node.unwrap_or(1);
//!     let children = if node < 8 {
//!         vec![2 * node, 2 * node + 1]
//!     } else {
//!         vec![]
//!     };
//!     async move { Ok::<_, anyhow::Error>(Chunk::new(children, stream::iter(vec![Ok(node)]))) }
//! })
//! .try_collect()
//! .await?;
//!
//! assert_eq!(nodes, (1..16).collect::<Vec<_>>());
//! # Ok::<(), anyhow::Error>(()) }).unwrap();
//! ```

mod chunk;
mod frontier;
pub mod pacing;
mod plan;
mod traverse;


pub use crate::chunk::Chunk;
pub use crate::pacing::FallibleNotified;
pub use crate::pacing::FreeRunning;
pub use crate::pacing::Notified;
pub use crate::plan::FallibleNotifierFactory;
pub use crate::plan::NotifierFactory;
pub use crate::plan::TraversalPlan;
pub use crate::traverse::Traverse;
pub use crate::traverse::traverse;
