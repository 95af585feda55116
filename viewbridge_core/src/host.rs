// Copyright 2026 the Viewbridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host contract for platform integrations.
//!
//! Viewbridge splits platform-specific work into *host* glue around the
//! [`ProtocolEngine`](crate::engine::ProtocolEngine). A host provides the
//! following capabilities, each injected as a trait implementation:
//!
//! - **Layout** — Synchronous geometry reads ([`Layout::reference_frame`],
//!   [`Layout::target_rect`], [`Layout::now`], [`Layout::is_visible`]) plus
//!   an asynchronous measurement request. [`Layout::request_measurement`]
//!   only *issues* the request; when the platform's measurement completes,
//!   the host re-enters the engine via
//!   [`on_measurement_ready`](crate::engine::ProtocolEngine::on_measurement_ready).
//!
//! - **Viewport events** — Subscription management for scroll and resize
//!   streams. The engine subscribes while the target is visible and
//!   unsubscribes on exit; the host routes each live-stream event to
//!   [`on_scroll_or_resize`](crate::engine::ProtocolEngine::on_scroll_or_resize).
//!   Resize streams also fire on generic layout-changed events.
//!
//! - **Delay scheduling** — One-shot delays for the rate-limit window. When
//!   a scheduled delay elapses, the host re-enters the engine via
//!   [`on_delay_elapsed`](crate::engine::ProtocolEngine::on_delay_elapsed)
//!   with the [`TimerId`] the schedule call returned.
//!
//! - **Transport** — Delivery of one [`OutboundMessage`] to one
//!   [`RemoteEndpoint`]. The host also registers a *persistent* inbound
//!   handler for the reserved handshake name
//!   ([`HANDSHAKE_MESSAGE`](crate::message::HANDSHAKE_MESSAGE)) and routes
//!   each receipt — with the sender's channel identifier and origin — to
//!   [`on_handshake`](crate::engine::ProtocolEngine::on_handshake).
//!   Registration is for the lifetime of the boundary, not one-shot:
//!   multiple independent remote parties may issue the handshake over time.
//!
//! # Wiring pseudocode
//!
//! A typical host wires the pieces together like this:
//!
//! ```rust,ignore
//! transport.on_message(HANDSHAKE_MESSAGE, |_, channel, origin| {
//!     engine.on_handshake(channel, origin, &mut tracer);
//! });
//! layout.on_measurement_done(|| engine.on_measurement_ready(&mut tracer));
//! viewport.on_event(|_| engine.on_scroll_or_resize(&mut tracer));
//! timer.on_elapsed(|id| engine.on_delay_elapsed(id, &mut tracer));
//! ```
//!
//! All callbacks run on a single thread; the engine never blocks and
//! re-validates its state on every re-entry, so arbitrary operations may
//! interleave between a request and its completion.
//!
//! [`OutboundMessage`]: crate::message::OutboundMessage
//! [`RemoteEndpoint`]: crate::message::RemoteEndpoint

use core::fmt;

use crate::geom::FrameRect;
use crate::message::{OutboundMessage, RemoteEndpoint};
use crate::time::MeasureTime;

/// Handle for one scroll or resize subscription.
///
/// Viewport engines assign these; core holds them only to release the
/// subscription exactly once.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

/// Handle for one outstanding one-shot delay.
///
/// Schedulers assign these; the engine compares the id delivered with
/// [`on_delay_elapsed`](crate::engine::ProtocolEngine::on_delay_elapsed)
/// against the one it holds, so a stale or cancelled delay is ignored.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

impl fmt::Debug for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimerId({})", self.0)
    }
}

/// Failure to deliver one message to one endpoint.
///
/// Delivery is best-effort: the [`ChannelAdapter`](crate::channel::ChannelAdapter)
/// swallows these per endpoint so one unreachable endpoint never blocks the
/// others. They surface only in trace events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryError {
    /// The remote execution context is gone.
    Disconnected,
    /// The transport refused the message.
    Rejected,
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("remote execution context disconnected"),
            Self::Rejected => f.write_str("transport rejected the message"),
        }
    }
}

impl core::error::Error for DeliveryError {}

/// Layout and measurement engine capability.
pub trait Layout {
    /// Issues an asynchronous measurement request.
    ///
    /// The host delivers completion by calling
    /// [`on_measurement_ready`](crate::engine::ProtocolEngine::on_measurement_ready);
    /// zero or more other operations may run in between.
    fn request_measurement(&mut self);

    /// Whether the target is currently inside the visible area.
    fn is_visible(&self) -> bool;

    /// The observing viewport's rectangle.
    fn reference_frame(&self) -> FrameRect;

    /// The target's rectangle, in the same coordinate space as the
    /// reference frame.
    fn target_rect(&self) -> FrameRect;

    /// Current monotonic measurement time.
    fn now(&self) -> MeasureTime;
}

/// Viewport scroll/resize notification capability.
pub trait ViewportEvents {
    /// Subscribes to scroll notifications; events flow only while the
    /// subscription is live.
    fn subscribe_scroll(&mut self) -> SubscriptionId;

    /// Subscribes to resize notifications (also fired on generic
    /// layout-changed events).
    fn subscribe_resize(&mut self) -> SubscriptionId;

    /// Releases a subscription. Events for this id must stop.
    fn unsubscribe(&mut self, sub: SubscriptionId);
}

/// One-shot delay scheduling capability.
///
/// Modeled as an injected capability rather than a global clock so tests can
/// substitute a deterministic virtual scheduler.
pub trait DelayScheduler {
    /// Schedules a one-shot delay of `delay_ms` milliseconds.
    fn schedule(&mut self, delay_ms: u32) -> TimerId;

    /// Cancels an outstanding delay. Cancelling an already-elapsed delay is
    /// a no-op.
    fn cancel(&mut self, timer: TimerId);
}

/// Boundary-crossing message delivery capability.
pub trait Transport {
    /// Delivers one message to one endpoint.
    fn deliver(
        &mut self,
        endpoint: &RemoteEndpoint,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError>;
}
