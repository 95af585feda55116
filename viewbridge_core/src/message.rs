// Copyright 2026 the Viewbridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Wire message model for the embed boundary.
//!
//! Messages crossing the boundary form a closed tagged union in each
//! direction, so handling is exhaustively matched: the compiler flags any
//! new message kind that a handler forgets. The serde tag carries the
//! reserved message name, which keeps the serialized form compatible with
//! name-dispatched transports.
//!
//! - Inbound (embedded → host): [`InboundMessage::SendIntersections`], the
//!   handshake by which a remote endpoint opts in to updates. Its payload is
//!   ignored; only the sender's channel and origin matter.
//! - Outbound (host → embedded): [`OutboundMessage::Intersection`], a
//!   non-empty batch of [`ChangeRecord`]s in non-decreasing measurement-time
//!   order.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::geom::ChangeRecord;

/// Reserved name of the inbound handshake message.
pub const HANDSHAKE_MESSAGE: &str = "send-intersections";

/// Reserved name of the outbound update message.
pub const UPDATE_MESSAGE: &str = "intersection";

/// Identifies one remote execution context addressable for outbound messages.
///
/// The transport assigns channel identifiers; core code treats them as
/// opaque and compares them only for equality.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ChannelId(pub u64);

impl fmt::Debug for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelId({})", self.0)
    }
}

/// A registered remote endpoint: a channel plus the origin it presented at
/// handshake time.
///
/// Endpoint identity is the channel identifier alone. Two endpoints with the
/// same origin but different channels are distinct; re-registering a known
/// channel is a no-op merge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteEndpoint {
    /// Opaque handle to the remote execution context.
    pub channel: ChannelId,
    /// Origin string presented with the handshake.
    pub origin: String,
}

/// Messages the host accepts from embedded content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InboundMessage {
    /// Handshake: the sender asks to start receiving change batches.
    ///
    /// Serialized tag: [`HANDSHAKE_MESSAGE`]. Any additional payload is
    /// ignored by design.
    SendIntersections,
}

/// Messages the host pushes to embedded content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutboundMessage {
    /// A batch of geometry changes, oldest first.
    ///
    /// Serialized tag: [`UPDATE_MESSAGE`]. `changes` is never empty; the
    /// engine does not flush an empty queue.
    Intersection {
        /// Queued change records in non-decreasing measurement-time order.
        changes: Vec<ChangeRecord>,
    },
}

impl OutboundMessage {
    /// Returns the reserved wire name of this message.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Intersection { .. } => UPDATE_MESSAGE,
        }
    }

    /// Returns the change records carried by this message.
    #[must_use]
    pub fn changes(&self) -> &[ChangeRecord] {
        match self {
            Self::Intersection { changes } => changes,
        }
    }
}

impl InboundMessage {
    /// Returns the reserved wire name of this message.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SendIntersections => HANDSHAKE_MESSAGE,
        }
    }
}
