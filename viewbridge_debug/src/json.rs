// Copyright 2026 the Viewbridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON transcript exporter.
//!
//! [`export`] reads recorded bytes from a
//! [`RecorderSink`](super::recorder::RecorderSink) and writes a JSON array
//! with one object per event, in recording order. Useful for diffing
//! protocol transcripts across runs or feeding them to external tooling.

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as a JSON array, one object per event.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::Handshake(e) => {
                events.push(json!({
                    "event": "handshake",
                    "channel": e.channel.0,
                    "known": e.known,
                    "endpoints": e.endpoints,
                }));
            }
            RecordedEvent::Visibility(e) => {
                events.push(json!({
                    "event": "visibility",
                    "visible": e.visible,
                }));
            }
            RecordedEvent::ChangeQueued(e) => {
                events.push(json!({
                    "event": "change-queued",
                    "time_ms": e.time.millis(),
                    "queue_len": e.queue_len,
                }));
            }
            RecordedEvent::ChangeDropped(e) => {
                events.push(json!({
                    "event": "change-dropped",
                    "time_ms": e.time.millis(),
                }));
            }
            RecordedEvent::FlushScheduled(e) => {
                events.push(json!({
                    "event": "window-armed",
                    "delay_ms": e.delay_ms,
                }));
            }
            RecordedEvent::DelayElapsed(e) => {
                events.push(json!({
                    "event": "window-closed",
                    "pending": e.pending,
                }));
            }
            RecordedEvent::Broadcast(e) => {
                events.push(json!({
                    "event": "broadcast",
                    "endpoints": e.endpoints,
                    "changes": e.changes,
                    "failed": e.failed,
                }));
            }
            RecordedEvent::Teardown(e) => {
                events.push(json!({
                    "event": "teardown",
                    "delay_cancelled": e.delay_cancelled,
                }));
            }
        }
    }

    serde_json::to_writer_pretty(&mut *writer, &events)?;
    writer.flush()
}
