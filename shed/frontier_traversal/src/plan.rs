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
use std::future::Future;

use futures::Stream;
use slog::Logger;

use crate::chunk::Chunk;
use crate::pacing::FallibleNotified;
use crate::pacing::FreeRunning;
use crate::pacing::Notified;
use crate::traverse::Traverse;
use crate::traverse::discard_logger;

/// Reusable recipe for a traversal.
///
/// Every call to `start` builds a new [`Traverse`] from the root with its own
/// frontier, signal queue and call counter; nothing is shared or cached
/// between the traversals of one plan. The producer is cloned for each start.
#[derive(Clone)]
pub struct TraversalPlan<P, Pf> {
    producer: P,
    pacing: Pf,
    logger: Logger,
}

/// Notifier factory of a [`TraversalPlan`] paced with
/// [`TraversalPlan::paced_by`].
#[derive(Clone, Debug)]
pub struct NotifierFactory<F>(F);

/// Notifier factory of a [`TraversalPlan`] paced with
/// [`TraversalPlan::paced_by_fallible`].
#[derive(Clone, Debug)]
pub struct FallibleNotifierFactory<F>(F);

impl<P> TraversalPlan<P, FreeRunning> {
    /// Create a free-running plan.
    pub fn new(producer: P) -> Self {
        Self {
            producer,
            pacing: FreeRunning,
            logger: discard_logger(),
        }
    }

    /// Start a new free-running traversal.
    pub fn start<M, Fut, S, V, E>(&self) -> Traverse<M, P, Fut, S, FreeRunning>
    where
        P: FnMut(Option<M>, usize) -> Fut + Clone,
        Fut: Future<Output = Result<Chunk<M, S>, E>>,
        S: Stream<Item = Result<V, E>>,
    {
        Traverse::new(self.producer.clone(), FreeRunning, self.logger.clone())
    }
}

impl<P, Pf> TraversalPlan<P, Pf> {
    /// Pace every traversal of this plan with a fresh notifier returned by
    /// `make_notifier`. See [`Traverse::paced_by`].
    pub fn paced_by<F, N>(self, make_notifier: F) -> TraversalPlan<P, NotifierFactory<F>>
    where
        F: Fn() -> N,
        N: Stream,
    {
        TraversalPlan {
            producer: self.producer,
            pacing: NotifierFactory(make_notifier),
            logger: self.logger,
        }
    }

    /// Pace every traversal of this plan with a fresh fallible notifier. See
    /// [`Traverse::paced_by_fallible`].
    pub fn paced_by_fallible<F, N, T, E>(
        self,
        make_notifier: F,
    ) -> TraversalPlan<P, FallibleNotifierFactory<F>>
    where
        F: Fn() -> N,
        N: Stream<Item = Result<T, E>>,
        E: fmt::Debug,
    {
        TraversalPlan {
            producer: self.producer,
            pacing: FallibleNotifierFactory(make_notifier),
            logger: self.logger,
        }
    }

    /// Log the progress of every traversal of this plan to `logger`.
    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }
}

impl<P, F, N> TraversalPlan<P, NotifierFactory<F>>
where
    F: Fn() -> N,
    N: Stream,
{
    /// Start a new traversal paced by a fresh notifier.
    pub fn start<M, Fut, S, V, E>(&self) -> Traverse<M, P, Fut, S, Notified<N>>
    where
        P: FnMut(Option<M>, usize) -> Fut + Clone,
        Fut: Future<Output = Result<Chunk<M, S>, E>>,
        S: Stream<Item = Result<V, E>>,
    {
        let NotifierFactory(make_notifier) = &self.pacing;
        Traverse::new(
            self.producer.clone(),
            Notified::new(make_notifier()),
            self.logger.clone(),
        )
    }
}

impl<P, F, N, T, SigErr> TraversalPlan<P, FallibleNotifierFactory<F>>
where
    F: Fn() -> N,
    N: Stream<Item = Result<T, SigErr>>,
    SigErr: fmt::Debug,
{
    /// Start a new traversal paced by a fresh fallible notifier.
    pub fn start<M, Fut, S, V, E>(&self) -> Traverse<M, P, Fut, S, FallibleNotified<N>>
    where
        P: FnMut(Option<M>, usize) -> Fut + Clone,
        Fut: Future<Output = Result<Chunk<M, S>, E>>,
        S: Stream<Item = Result<V, E>>,
    {
        let FallibleNotifierFactory(make_notifier) = &self.pacing;
        Traverse::new(
            self.producer.clone(),
            FallibleNotified::new(make_notifier()),
            self.logger.clone(),
        )
    }
}

impl<P, Pf: fmt::Debug> fmt::Debug for TraversalPlan<P, Pf> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraversalPlan")
            .field("pacing", &self.pacing)
            .finish_non_exhaustive()
    }
}
