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
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;

use futures::Stream;
use futures::StreamExt as _;
use futures::stream::FusedStream;
use futures::stream::SelectAll;
use pin_project::pin_project;
use slog::Logger;
use slog::debug;
use slog::o;
use slog::trace;

use crate::chunk::Chunk;
use crate::frontier::Frontier;
use crate::pacing::FallibleNotified;
use crate::pacing::FreeRunning;
use crate::pacing::Notified;
use crate::pacing::Pacing;

/// Stream for the [`traverse`] function.
///
/// Yields the values of every visited node in the order they are produced.
/// Nothing happens until the stream is first polled; dropping it cancels the
/// in-flight producer call, every value stream still being merged and the
/// pacing source.
#[must_use = "streams do nothing unless polled"]
#[pin_project(project = TraverseProj)]
pub struct Traverse<M, P, Fut, S, Pc> {
    producer: P,
    frontier: Frontier<M>,
    #[pin]
    in_flight: Option<Fut>,
    merged: SelectAll<Pin<Box<S>>>,
    #[pin]
    pacing: Pc,
    logger: Logger,
    call_count: usize,
    started: bool,
    terminated: bool,
}

/// Walk the graph described by `producer`, starting from the root.
///
/// `producer` is called with `None` and call index 0 for the root, then with
/// each marker taken from the frontier and the number of calls made so far.
/// Each call resolves to a [`Chunk`]: its markers are appended to the
/// frontier and its values are merged into the returned stream.
///
/// The traversal is free-running: a producer call starts as soon as the
/// previous call's values are complete. Use [`Traverse::paced_by`] to advance
/// on external signals instead.
///
/// Markers are not deduplicated. A producer that keeps returning markers keeps
/// the traversal going.
pub fn traverse<M, P, Fut, S, V, E>(producer: P) -> Traverse<M, P, Fut, S, FreeRunning>
where
    P: FnMut(Option<M>, usize) -> Fut,
    Fut: Future<Output = Result<Chunk<M, S>, E>>,
    S: Stream<Item = Result<V, E>>,
{
    Traverse::new(producer, FreeRunning, discard_logger())
}

/// Maximum number of producer calls started by a single poll. Once spent, the
/// task is woken again so a graph of immediately ready nodes cannot starve
/// the executor.
const ADVANCE_BUDGET: usize = 64;

pub(crate) fn discard_logger() -> Logger {
    Logger::root(slog::Discard, o!())
}

impl<M, P, Fut, S, Pc> Traverse<M, P, Fut, S, Pc>
where
    S: Stream,
{
    pub(crate) fn new(producer: P, pacing: Pc, logger: Logger) -> Self {
        Self {
            producer,
            frontier: Frontier::new(),
            in_flight: None,
            merged: SelectAll::new(),
            pacing,
            logger,
            call_count: 0,
            started: false,
            terminated: false,
        }
    }

    fn with_pacing<Pc2>(self, pacing: Pc2) -> Traverse<M, P, Fut, S, Pc2> {
        Traverse {
            producer: self.producer,
            frontier: self.frontier,
            in_flight: self.in_flight,
            merged: self.merged,
            pacing,
            logger: self.logger,
            call_count: self.call_count,
            started: self.started,
            terminated: self.terminated,
        }
    }

    /// Advance the frontier by one entry per item of `notifier`; markers still
    /// in the frontier once `notifier` has ended and its signals are spent
    /// are never visited.
    ///
    /// The root call still happens on the first poll. Signals that arrive
    /// while a producer call is in flight are queued, and are still honoured
    /// after `notifier` ends. The stream then ends once all values are out,
    /// abandoning the rest of the frontier.
    pub fn paced_by<N>(self, notifier: N) -> Traverse<M, P, Fut, S, Notified<N>>
    where
        N: Stream,
    {
        self.with_pacing(Notified::new(notifier))
    }

    /// Like [`Traverse::paced_by`], for a notifier yielding `Result`s. An
    /// `Err` ends the pacing source and is logged; it does not fail the
    /// traversal.
    pub fn paced_by_fallible<N, T, E>(
        self,
        notifier: N,
    ) -> Traverse<M, P, Fut, S, FallibleNotified<N>>
    where
        N: Stream<Item = Result<T, E>>,
        E: fmt::Debug,
    {
        self.with_pacing(FallibleNotified::new(notifier))
    }

    /// Log the traversal's progress to `logger`.
    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Pass the traversal once through `transform` and return its result.
    ///
    /// The transform sees the whole output and may add lifecycle behaviour
    /// around it, e.g. a trailer after the last value. Dropping the traversal
    /// from inside the transform cancels it.
    pub fn transform<F, T>(self, transform: F) -> T
    where
        F: FnOnce(Self) -> T,
        T: Stream,
    {
        transform(self)
    }

    /// Number of markers waiting for their producer call.
    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    /// Number of producer calls made so far.
    pub fn call_count(&self) -> usize {
        self.call_count
    }

    /// Number of value streams still being merged into the output.
    pub fn open_value_streams(&self) -> usize {
        self.merged.len()
    }

    /// Number of pacing signals received and not consumed yet.
    pub fn pending_signals(&self) -> usize
    where
        Pc: Pacing,
    {
        self.pacing.pending_signals()
    }
}

impl<M, P, Fut, S, Pc> TraverseProj<'_, M, P, Fut, S, Pc>
where
    S: Stream,
    Pc: Pacing,
{
    fn start_call(&mut self, marker: Option<M>)
    where
        P: FnMut(Option<M>, usize) -> Fut,
    {
        let call_index = *self.call_count;
        debug!(
            self.logger,
            "producer call started";
            "call_index" => call_index,
            "frontier" => self.frontier.len()
        );
        let call = (self.producer)(marker, call_index);
        *self.call_count += 1;
        self.in_flight.set(Some(call));
    }

    fn ingest(&mut self, chunk: Chunk<M, S>) {
        let (markers, values) = chunk.into_parts();
        let count = markers.len();
        self.frontier.extend(markers);
        self.merged.push(Box::pin(values));
        trace!(
            self.logger,
            "chunk ingested";
            "markers" => count,
            "frontier" => self.frontier.len()
        );
    }

    /// A new producer call is allowed: nothing in flight, something to visit,
    /// and the pacing strategy agrees.
    fn can_advance(&self) -> bool {
        self.in_flight.is_none()
            && !self.frontier.is_empty()
            && self.pacing.may_advance(self.merged.len())
    }

    fn is_finished(&self) -> bool {
        self.in_flight.is_none()
            && self.merged.is_empty()
            && (self.frontier.is_empty() || self.pacing.is_exhausted())
    }

    fn teardown(&mut self) {
        self.in_flight.set(None);
        *self.merged = SelectAll::new();
        self.frontier.clear();
        self.pacing.as_mut().close();
        *self.terminated = true;
    }
}

impl<M, P, Fut, S, V, E, Pc> Stream for Traverse<M, P, Fut, S, Pc>
where
    P: FnMut(Option<M>, usize) -> Fut,
    Fut: Future<Output = Result<Chunk<M, S>, E>>,
    S: Stream<Item = Result<V, E>>,
    Pc: Pacing,
{
    type Item = Result<V, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.terminated {
            return Poll::Ready(None);
        }

        if !*this.started {
            *this.started = true;
            this.start_call(None);
        }

        let mut advance_budget = ADVANCE_BUDGET;
        loop {
            if let Some(call) = this.in_flight.as_mut().as_pin_mut() {
                match call.poll(cx) {
                    Poll::Ready(Ok(chunk)) => {
                        this.in_flight.set(None);
                        this.ingest(chunk);
                    }
                    Poll::Ready(Err(e)) => {
                        debug!(
                            this.logger,
                            "producer call failed";
                            "call_index" => *this.call_count - 1
                        );
                        this.teardown();
                        return Poll::Ready(Some(Err(e)));
                    }
                    Poll::Pending => {}
                }
            }

            this.pacing.as_mut().poll_signals(cx, this.logger);

            if advance_budget > 0
                && this.can_advance()
                && let Some(marker) = this.frontier.dequeue()
            {
                advance_budget -= 1;
                this.pacing.as_mut().consume();
                this.start_call(Some(marker));
                continue;
            }

            match this.merged.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(value))) => return Poll::Ready(Some(Ok(value))),
                Poll::Ready(Some(Err(e))) => {
                    debug!(
                        this.logger,
                        "value stream failed";
                        "calls" => *this.call_count
                    );
                    this.teardown();
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) | Poll::Pending => {}
            }

            // Finished value streams may have released the free-running gate.
            if this.can_advance() {
                if advance_budget > 0 {
                    continue;
                }
                cx.waker().wake_by_ref();
                return Poll::Pending;
            }

            if this.is_finished() {
                if !this.frontier.is_empty() {
                    debug!(
                        this.logger,
                        "pacing exhausted, frontier abandoned";
                        "abandoned" => this.frontier.len()
                    );
                }
                debug!(this.logger, "traversal finished"; "calls" => *this.call_count);
                this.teardown();
                return Poll::Ready(None);
            }

            return Poll::Pending;
        }
    }
}

impl<M, P, Fut, S, V, E, Pc> FusedStream for Traverse<M, P, Fut, S, Pc>
where
    P: FnMut(Option<M>, usize) -> Fut,
    Fut: Future<Output = Result<Chunk<M, S>, E>>,
    S: Stream<Item = Result<V, E>>,
    Pc: Pacing,
{
    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

impl<M, P, Fut, S, Pc> fmt::Debug for Traverse<M, P, Fut, S, Pc>
where
    S: Stream,
    Pc: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Traverse")
            .field("frontier", &self.frontier)
            .field("in_flight", &self.in_flight.is_some())
            .field("open_value_streams", &self.merged.len())
            .field("pacing", &self.pacing)
            .field("call_count", &self.call_count)
            .field("terminated", &self.terminated)
            .finish()
    }
}
