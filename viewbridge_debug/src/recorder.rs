// Copyright 2026 the Viewbridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].

use viewbridge_core::message::ChannelId;
use viewbridge_core::time::MeasureTime;
use viewbridge_core::trace::{
    BroadcastEvent, ChangeDroppedEvent, ChangeQueuedEvent, DelayElapsedEvent, FlushScheduledEvent,
    HandshakeEvent, TeardownEvent, TraceSink, VisibilityEvent,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_HANDSHAKE: u8 = 1;
const TAG_VISIBILITY: u8 = 2;
const TAG_CHANGE_QUEUED: u8 = 3;
const TAG_CHANGE_DROPPED: u8 = 4;
const TAG_FLUSH_SCHEDULED: u8 = 5;
const TAG_DELAY_ELAPSED: u8 = 6;
const TAG_BROADCAST: u8 = 7;
const TAG_TEARDOWN: u8 = 8;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }
}

impl TraceSink for RecorderSink {
    fn on_handshake(&mut self, e: &HandshakeEvent) {
        self.write_u8(TAG_HANDSHAKE);
        self.write_u64(e.channel.0);
        self.write_bool(e.known);
        self.write_u32(e.endpoints);
    }

    fn on_visibility(&mut self, e: &VisibilityEvent) {
        self.write_u8(TAG_VISIBILITY);
        self.write_bool(e.visible);
    }

    fn on_change_queued(&mut self, e: &ChangeQueuedEvent) {
        self.write_u8(TAG_CHANGE_QUEUED);
        self.write_u64(e.time.millis());
        self.write_u32(e.queue_len);
    }

    fn on_change_dropped(&mut self, e: &ChangeDroppedEvent) {
        self.write_u8(TAG_CHANGE_DROPPED);
        self.write_u64(e.time.millis());
    }

    fn on_flush_scheduled(&mut self, e: &FlushScheduledEvent) {
        self.write_u8(TAG_FLUSH_SCHEDULED);
        self.write_u32(e.delay_ms);
    }

    fn on_delay_elapsed(&mut self, e: &DelayElapsedEvent) {
        self.write_u8(TAG_DELAY_ELAPSED);
        self.write_u32(e.pending);
    }

    fn on_broadcast(&mut self, e: &BroadcastEvent) {
        self.write_u8(TAG_BROADCAST);
        self.write_u32(e.endpoints);
        self.write_u32(e.changes);
        self.write_u32(e.failed);
    }

    fn on_teardown(&mut self, e: &TeardownEvent) {
        self.write_u8(TAG_TEARDOWN);
        self.write_bool(e.delay_cancelled);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`HandshakeEvent`].
    Handshake(HandshakeEvent),
    /// A [`VisibilityEvent`].
    Visibility(VisibilityEvent),
    /// A [`ChangeQueuedEvent`].
    ChangeQueued(ChangeQueuedEvent),
    /// A [`ChangeDroppedEvent`].
    ChangeDropped(ChangeDroppedEvent),
    /// A [`FlushScheduledEvent`].
    FlushScheduled(FlushScheduledEvent),
    /// A [`DelayElapsedEvent`].
    DelayElapsed(DelayElapsedEvent),
    /// A [`BroadcastEvent`].
    Broadcast(BroadcastEvent),
    /// A [`TeardownEvent`].
    Teardown(TeardownEvent),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
#[must_use]
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        if self.remaining() < 8 {
            return None;
        }
        let v = u64::from_le_bytes(self.data[self.pos..self.pos + 8].try_into().ok()?);
        self.pos += 8;
        Some(v)
    }

    fn read_bool(&mut self) -> Option<bool> {
        Some(self.read_u8()? != 0)
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<RecordedEvent> {
        match self.read_u8()? {
            TAG_HANDSHAKE => Some(RecordedEvent::Handshake(HandshakeEvent {
                channel: ChannelId(self.read_u64()?),
                known: self.read_bool()?,
                endpoints: self.read_u32()?,
            })),
            TAG_VISIBILITY => Some(RecordedEvent::Visibility(VisibilityEvent {
                visible: self.read_bool()?,
            })),
            TAG_CHANGE_QUEUED => Some(RecordedEvent::ChangeQueued(ChangeQueuedEvent {
                time: MeasureTime(self.read_u64()?),
                queue_len: self.read_u32()?,
            })),
            TAG_CHANGE_DROPPED => Some(RecordedEvent::ChangeDropped(ChangeDroppedEvent {
                time: MeasureTime(self.read_u64()?),
            })),
            TAG_FLUSH_SCHEDULED => Some(RecordedEvent::FlushScheduled(FlushScheduledEvent {
                delay_ms: self.read_u32()?,
            })),
            TAG_DELAY_ELAPSED => Some(RecordedEvent::DelayElapsed(DelayElapsedEvent {
                pending: self.read_u32()?,
            })),
            TAG_BROADCAST => Some(RecordedEvent::Broadcast(BroadcastEvent {
                endpoints: self.read_u32()?,
                changes: self.read_u32()?,
                failed: self.read_u32()?,
            })),
            TAG_TEARDOWN => Some(RecordedEvent::Teardown(TeardownEvent {
                delay_cancelled: self.read_bool()?,
            })),
            _ => None,
        }
    }
}
