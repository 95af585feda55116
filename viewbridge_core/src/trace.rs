// Copyright 2026 the Viewbridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the notification protocol.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! engine calls at each protocol step. All method bodies default to no-ops,
//! so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace`
//! feature is **off**, every `Tracer` method compiles to nothing (zero
//! overhead). When **on**, each method performs a single `Option` branch
//! before dispatching.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).

use crate::message::ChannelId;
use crate::time::MeasureTime;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a handshake message arrives from a remote endpoint.
#[derive(Clone, Copy, Debug)]
pub struct HandshakeEvent {
    /// Channel of the requesting endpoint.
    pub channel: ChannelId,
    /// Whether the channel was already registered (no-op merge).
    pub known: bool,
    /// Endpoint count after registration.
    pub endpoints: u32,
}

/// Emitted when the visibility tracker transitions.
#[derive(Clone, Copy, Debug)]
pub struct VisibilityEvent {
    /// `true` for became-visible, `false` for became-invisible.
    pub visible: bool,
}

/// Emitted when a change record is appended to the pending queue.
#[derive(Clone, Copy, Debug)]
pub struct ChangeQueuedEvent {
    /// Measurement time of the queued record.
    pub time: MeasureTime,
    /// Queue length after the append.
    pub queue_len: u32,
}

/// Emitted when a recomputed change is discarded because its measurement
/// time equals the queue tail's.
#[derive(Clone, Copy, Debug)]
pub struct ChangeDroppedEvent {
    /// Measurement time of the discarded record.
    pub time: MeasureTime,
}

/// Emitted when a rate-limit delay is armed after an immediate flush.
#[derive(Clone, Copy, Debug)]
pub struct FlushScheduledEvent {
    /// Window length in milliseconds.
    pub delay_ms: u32,
}

/// Emitted when the rate-limit delay elapses.
#[derive(Clone, Copy, Debug)]
pub struct DelayElapsedEvent {
    /// Records accumulated during the window (flushed iff non-zero).
    pub pending: u32,
}

/// Emitted after a broadcast attempt to all registered endpoints.
#[derive(Clone, Copy, Debug)]
pub struct BroadcastEvent {
    /// Number of endpoints addressed.
    pub endpoints: u32,
    /// Number of change records in the batch.
    pub changes: u32,
    /// Number of per-endpoint delivery failures (swallowed).
    pub failed: u32,
}

/// Emitted once at engine teardown.
#[derive(Clone, Copy, Debug)]
pub struct TeardownEvent {
    /// Whether an outstanding rate-limit delay was cancelled.
    pub delay_cancelled: bool,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the protocol engine.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a handshake arrives.
    fn on_handshake(&mut self, e: &HandshakeEvent) {
        _ = e;
    }

    /// Called on each visibility transition.
    fn on_visibility(&mut self, e: &VisibilityEvent) {
        _ = e;
    }

    /// Called when a change record is queued.
    fn on_change_queued(&mut self, e: &ChangeQueuedEvent) {
        _ = e;
    }

    /// Called when a change record is dropped by de-duplication.
    fn on_change_dropped(&mut self, e: &ChangeDroppedEvent) {
        _ = e;
    }

    /// Called when a rate-limit delay is armed.
    fn on_flush_scheduled(&mut self, e: &FlushScheduledEvent) {
        _ = e;
    }

    /// Called when the rate-limit delay elapses.
    fn on_delay_elapsed(&mut self, e: &DelayElapsedEvent) {
        _ = e;
    }

    /// Called after each broadcast attempt.
    fn on_broadcast(&mut self, e: &BroadcastEvent) {
        _ = e;
    }

    /// Called at engine teardown.
    fn on_teardown(&mut self, e: &TeardownEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing.
/// When **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`HandshakeEvent`].
    #[inline]
    pub fn handshake(&mut self, e: &HandshakeEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_handshake(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`VisibilityEvent`].
    #[inline]
    pub fn visibility(&mut self, e: &VisibilityEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_visibility(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ChangeQueuedEvent`].
    #[inline]
    pub fn change_queued(&mut self, e: &ChangeQueuedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_change_queued(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ChangeDroppedEvent`].
    #[inline]
    pub fn change_dropped(&mut self, e: &ChangeDroppedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_change_dropped(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FlushScheduledEvent`].
    #[inline]
    pub fn flush_scheduled(&mut self, e: &FlushScheduledEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_flush_scheduled(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DelayElapsedEvent`].
    #[inline]
    pub fn delay_elapsed(&mut self, e: &DelayElapsedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_delay_elapsed(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`BroadcastEvent`].
    #[inline]
    pub fn broadcast(&mut self, e: &BroadcastEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_broadcast(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`TeardownEvent`].
    #[inline]
    pub fn teardown(&mut self, e: &TeardownEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_teardown(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_broadcast() -> BroadcastEvent {
        BroadcastEvent {
            endpoints: 2,
            changes: 3,
            failed: 0,
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_broadcast(&sample_broadcast());
        sink.on_handshake(&HandshakeEvent {
            channel: ChannelId(1),
            known: false,
            endpoints: 1,
        });
        sink.on_teardown(&TeardownEvent {
            delay_cancelled: false,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.broadcast(&sample_broadcast());
        tracer.visibility(&VisibilityEvent { visible: true });
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            broadcasts: Vec<u32>,
        }
        impl TraceSink for RecordingSink {
            fn on_broadcast(&mut self, e: &BroadcastEvent) {
                self.broadcasts.push(e.changes);
            }
        }

        let mut sink = RecordingSink {
            broadcasts: Vec::new(),
        };
        let mut tracer = Tracer::new(&mut sink);
        tracer.broadcast(&sample_broadcast());
        drop(tracer);
        assert_eq!(sink.broadcasts, &[3]);
    }
}
