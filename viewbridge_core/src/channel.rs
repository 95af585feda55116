// Copyright 2026 the Viewbridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Best-effort outbound broadcast over an injected transport.
//!
//! [`ChannelAdapter`] wraps a [`Transport`] and sends a message individually
//! to every registered endpoint. Delivery is best-effort: a
//! [`DeliveryError`](crate::host::DeliveryError) from one endpoint is
//! swallowed at this layer and counted in the [`BroadcastEvent`], never
//! escalated — the remaining endpoints still receive the message.
//!
//! The inbound half of the boundary is host glue, not a type in this module:
//! the host registers a handler for the reserved handshake name
//! ([`HANDSHAKE_MESSAGE`](crate::message::HANDSHAKE_MESSAGE)) with its
//! transport and routes receipts to
//! [`ProtocolEngine::on_handshake`](crate::engine::ProtocolEngine::on_handshake).
//! That registration is persistent for the lifetime of the boundary target —
//! multiple independent remote parties may issue the handshake over time.

use crate::host::Transport;
use crate::message::{OutboundMessage, RemoteEndpoint};
use crate::trace::{BroadcastEvent, Tracer};

/// Wraps a [`Transport`] with per-endpoint, failure-swallowing broadcast.
#[derive(Debug)]
pub struct ChannelAdapter<T> {
    transport: T,
}

impl<T: Transport> ChannelAdapter<T> {
    /// Creates an adapter over the given transport.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Sends `message` to every endpoint in `endpoints`, swallowing
    /// per-endpoint delivery failures.
    ///
    /// Emits one [`BroadcastEvent`] carrying the endpoint, record, and
    /// failure counts.
    pub fn broadcast(
        &mut self,
        endpoints: &[RemoteEndpoint],
        message: &OutboundMessage,
        tracer: &mut Tracer<'_>,
    ) {
        let mut failed = 0u32;
        for endpoint in endpoints {
            if self.transport.deliver(endpoint, message).is_err() {
                failed += 1;
            }
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "endpoint and batch counts are far below u32::MAX"
        )]
        tracer.broadcast(&BroadcastEvent {
            endpoints: endpoints.len() as u32,
            changes: message.changes().len() as u32,
            failed,
        });
    }

    /// Returns the wrapped transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the wrapped transport mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
