/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is dual-licensed under either the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree or the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree. You may select, at your option, one of the
 * above-listed licenses.
 */

//! Strategies deciding when the next frontier entry is handed to the producer.

use std::fmt;
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;

use futures::Stream;
use pin_project::pin_project;
use slog::Logger;
use slog::debug;
use slog::trace;
use slog::warn;

/// Maximum number of pacing signals taken from an always-ready notifier in a
/// single poll. Once spent, the task is woken again instead of spinning.
pub const SIGNAL_DRAIN_BUDGET: usize = 64;

/// Pacing strategy of a [`Traverse`](crate::Traverse).
///
/// The root producer call is never paced. Every later call needs the previous
/// producer call to have returned its chunk, a non-empty frontier, and
/// permission from this strategy.
///
/// This trait is sealed; the strategies are [`FreeRunning`], [`Notified`] and
/// [`FallibleNotified`].
pub trait Pacing: private::Sealed {
    /// Take newly arrived pacing signals into account and register the task
    /// for future ones.
    fn poll_signals(self: Pin<&mut Self>, cx: &mut Context<'_>, logger: &Logger);

    /// Whether a new producer call may start, given the number of value
    /// streams still being merged.
    fn may_advance(&self, open_value_streams: usize) -> bool;

    /// Account for one started producer call.
    fn consume(self: Pin<&mut Self>);

    /// True when no further producer call can ever be authorised.
    fn is_exhausted(&self) -> bool;

    /// Number of received signals that have not been consumed yet.
    fn pending_signals(&self) -> usize;

    /// Drop the pacing source.
    fn close(self: Pin<&mut Self>);
}

mod private {
    pub trait Sealed {}
}

/// Start the next producer call as soon as the previous call's values are
/// complete. Producer calls are strictly sequential and at most one value
/// stream is open at a time.
#[derive(Clone, Copy, Debug, Default)]
pub struct FreeRunning;

impl private::Sealed for FreeRunning {}

impl Pacing for FreeRunning {
    fn poll_signals(self: Pin<&mut Self>, _cx: &mut Context<'_>, _logger: &Logger) {}

    fn may_advance(&self, open_value_streams: usize) -> bool {
        open_value_streams == 0
    }

    fn consume(self: Pin<&mut Self>) {}

    fn is_exhausted(&self) -> bool {
        false
    }

    fn pending_signals(&self) -> usize {
        0
    }

    fn close(self: Pin<&mut Self>) {}
}

/// Advance the frontier by one entry per item of a notifier stream.
///
/// Item payloads are ignored. Signals received while a producer call is in
/// flight are queued and consumed one at a time as calls complete.
#[pin_project]
pub struct Notified<N> {
    #[pin]
    notifier: Option<N>,
    pending: usize,
}

impl<N> Notified<N> {
    pub(crate) fn new(notifier: N) -> Self {
        Self {
            notifier: Some(notifier),
            pending: 0,
        }
    }
}

impl<N> fmt::Debug for Notified<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notified")
            .field("live", &self.notifier.is_some())
            .field("pending", &self.pending)
            .finish()
    }
}

impl<N: Stream> private::Sealed for Notified<N> {}

impl<N: Stream> Pacing for Notified<N> {
    fn poll_signals(self: Pin<&mut Self>, cx: &mut Context<'_>, logger: &Logger) {
        let this = self.project();
        drain_signals(this.notifier, this.pending, cx, logger, |_signal, _logger| true);
    }

    fn may_advance(&self, _open_value_streams: usize) -> bool {
        self.pending > 0
    }

    fn consume(self: Pin<&mut Self>) {
        let this = self.project();
        *this.pending = this.pending.saturating_sub(1);
    }

    fn is_exhausted(&self) -> bool {
        self.notifier.is_none() && self.pending == 0
    }

    fn pending_signals(&self) -> usize {
        self.pending
    }

    fn close(self: Pin<&mut Self>) {
        let mut this = self.project();
        this.notifier.set(None);
        *this.pending = 0;
    }
}

/// Like [`Notified`], but the notifier is a stream of `Result`s. An error ends the
/// pacing source without failing the traversal: signals already queued are
/// still honoured, no new ones are accepted.
#[pin_project]
pub struct FallibleNotified<N> {
    #[pin]
    notifier: Option<N>,
    pending: usize,
}

impl<N> FallibleNotified<N> {
    pub(crate) fn new(notifier: N) -> Self {
        Self {
            notifier: Some(notifier),
            pending: 0,
        }
    }
}

impl<N> fmt::Debug for FallibleNotified<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallibleNotified")
            .field("live", &self.notifier.is_some())
            .field("pending", &self.pending)
            .finish()
    }
}

impl<N, T, E> private::Sealed for FallibleNotified<N>
where
    N: Stream<Item = Result<T, E>>,
    E: fmt::Debug,
{
}

impl<N, T, E> Pacing for FallibleNotified<N>
where
    N: Stream<Item = Result<T, E>>,
    E: fmt::Debug,
{
    fn poll_signals(self: Pin<&mut Self>, cx: &mut Context<'_>, logger: &Logger) {
        let this = self.project();
        drain_signals(
            this.notifier,
            this.pending,
            cx,
            logger,
            |signal, logger| match signal {
                Ok(_) => true,
                Err(e) => {
                    warn!(
                        logger,
                        "Pacing signal source failed, no further advances: {:?}", e
                    );
                    false
                }
            },
        );
    }

    fn may_advance(&self, _open_value_streams: usize) -> bool {
        self.pending > 0
    }

    fn consume(self: Pin<&mut Self>) {
        let this = self.project();
        *this.pending = this.pending.saturating_sub(1);
    }

    fn is_exhausted(&self) -> bool {
        self.notifier.is_none() && self.pending == 0
    }

    fn pending_signals(&self) -> usize {
        self.pending
    }

    fn close(self: Pin<&mut Self>) {
        let mut this = self.project();
        this.notifier.set(None);
        *this.pending = 0;
    }
}

/// Count every ready signal of `notifier` into `pending`. `accept` returns
/// false for a signal that ends the source. The notifier is dropped once it
/// ends.
fn drain_signals<N, F>(
    mut notifier: Pin<&mut Option<N>>,
    pending: &mut usize,
    cx: &mut Context<'_>,
    logger: &Logger,
    mut accept: F,
) where
    N: Stream,
    F: FnMut(N::Item, &Logger) -> bool,
{
    let mut budget = SIGNAL_DRAIN_BUDGET;
    while let Some(stream) = notifier.as_mut().as_pin_mut() {
        if budget == 0 {
            cx.waker().wake_by_ref();
            return;
        }
        match stream.poll_next(cx) {
            Poll::Ready(Some(signal)) => {
                budget -= 1;
                if accept(signal, logger) {
                    *pending += 1;
                    trace!(logger, "pacing signal queued"; "pending" => *pending);
                } else {
                    notifier.set(None);
                }
            }
            Poll::Ready(None) => {
                debug!(logger, "pacing signal source finished"; "pending" => *pending);
                notifier.set(None);
            }
            Poll::Pending => return,
        }
    }
}
