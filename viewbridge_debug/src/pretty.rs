// Copyright 2026 the Viewbridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use viewbridge_core::trace::{
    BroadcastEvent, ChangeDroppedEvent, ChangeQueuedEvent, DelayElapsedEvent, FlushScheduledEvent,
    HandshakeEvent, TeardownEvent, TraceSink, VisibilityEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_handshake(&mut self, e: &HandshakeEvent) {
        let _ = writeln!(
            self.writer,
            "[handshake] channel={} known={} endpoints={}",
            e.channel.0, e.known, e.endpoints,
        );
    }

    fn on_visibility(&mut self, e: &VisibilityEvent) {
        let _ = writeln!(
            self.writer,
            "[visibility] {}",
            if e.visible { "visible" } else { "invisible" },
        );
    }

    fn on_change_queued(&mut self, e: &ChangeQueuedEvent) {
        let _ = writeln!(
            self.writer,
            "[queued] time={}ms queue_len={}",
            e.time.millis(),
            e.queue_len,
        );
    }

    fn on_change_dropped(&mut self, e: &ChangeDroppedEvent) {
        let _ = writeln!(self.writer, "[dropped] time={}ms (duplicate)", e.time.millis());
    }

    fn on_flush_scheduled(&mut self, e: &FlushScheduledEvent) {
        let _ = writeln!(self.writer, "[window] armed delay={}ms", e.delay_ms);
    }

    fn on_delay_elapsed(&mut self, e: &DelayElapsedEvent) {
        let _ = writeln!(self.writer, "[window] closed pending={}", e.pending);
    }

    fn on_broadcast(&mut self, e: &BroadcastEvent) {
        let _ = writeln!(
            self.writer,
            "[broadcast] endpoints={} changes={} failed={}",
            e.endpoints, e.changes, e.failed,
        );
    }

    fn on_teardown(&mut self, e: &TeardownEvent) {
        let _ = writeln!(
            self.writer,
            "[teardown] delay_cancelled={}",
            e.delay_cancelled,
        );
    }
}
