// Copyright 2026 the Viewbridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deterministic host fakes and channel cadence metrics.
//!
//! This crate provides in-memory implementations of every capability the
//! [`ProtocolEngine`] consumes, plus a [`HostDriver`] that wires them
//! together the way a real host would: completions and timer firings are
//! delivered as explicit re-entry calls, and time only moves when a test
//! says so.
//!
//! - [`ScriptedLayout`] — geometry and visibility a test scripts directly;
//!   measurement requests are counted and completed on demand.
//! - [`FakeViewport`] — subscription bookkeeping; events are routed only to
//!   live subscriptions.
//! - [`VirtualScheduler`] — a virtual clock; [`advance`](VirtualScheduler::advance)
//!   returns the delays that elapsed so the driver can re-enter the engine.
//! - [`RecordingTransport`] — records every per-endpoint delivery and can be
//!   told to fail specific channels.
//! - [`CadenceTracker`] — a [`TraceSink`] aggregating broadcast cadence and
//!   coalescing counters into a [`CadenceReport`].

#![no_std]

extern crate alloc;

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use viewbridge_core::engine::{EngineConfig, ProtocolEngine};
use viewbridge_core::geom::{ChangeRecord, FrameRect};
use viewbridge_core::host::{
    DelayScheduler, DeliveryError, Layout, SubscriptionId, TimerId, Transport, ViewportEvents,
};
use viewbridge_core::message::{ChannelId, OutboundMessage, RemoteEndpoint};
use viewbridge_core::time::MeasureTime;
use viewbridge_core::trace::{
    BroadcastEvent, ChangeDroppedEvent, ChangeQueuedEvent, TraceSink, Tracer,
};

// ---------------------------------------------------------------------------
// ScriptedLayout
// ---------------------------------------------------------------------------

/// A layout engine whose geometry and clock are scripted by the test.
#[derive(Debug)]
pub struct ScriptedLayout {
    /// Current measurement time; advanced by the driver's clock.
    pub now: MeasureTime,
    /// What [`Layout::is_visible`] reports.
    pub visible: bool,
    /// The observing viewport rectangle.
    pub reference_frame: FrameRect,
    /// The target rectangle.
    pub target: FrameRect,
    outstanding_measurements: u32,
}

impl Default for ScriptedLayout {
    fn default() -> Self {
        Self {
            now: MeasureTime(0),
            visible: true,
            reference_frame: FrameRect::new(0.0, 0.0, 400.0, 300.0),
            target: FrameRect::new(50.0, 50.0, 100.0, 100.0),
            outstanding_measurements: 0,
        }
    }
}

impl ScriptedLayout {
    /// Number of measurement requests not yet completed.
    #[must_use]
    pub const fn outstanding_measurements(&self) -> u32 {
        self.outstanding_measurements
    }

    fn take_measurement(&mut self) -> bool {
        if self.outstanding_measurements == 0 {
            return false;
        }
        self.outstanding_measurements -= 1;
        true
    }
}

impl Layout for ScriptedLayout {
    fn request_measurement(&mut self) {
        self.outstanding_measurements += 1;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn reference_frame(&self) -> FrameRect {
        self.reference_frame
    }

    fn target_rect(&self) -> FrameRect {
        self.target
    }

    fn now(&self) -> MeasureTime {
        self.now
    }
}

// ---------------------------------------------------------------------------
// FakeViewport
// ---------------------------------------------------------------------------

/// Viewport event source with explicit subscription bookkeeping.
#[derive(Debug, Default)]
pub struct FakeViewport {
    next_id: u64,
    scroll_live: Vec<SubscriptionId>,
    resize_live: Vec<SubscriptionId>,
    unsubscribe_count: u32,
}

impl FakeViewport {
    /// Whether any scroll subscription is live.
    #[must_use]
    pub fn scroll_subscribed(&self) -> bool {
        !self.scroll_live.is_empty()
    }

    /// Whether any resize subscription is live.
    #[must_use]
    pub fn resize_subscribed(&self) -> bool {
        !self.resize_live.is_empty()
    }

    /// Total number of unsubscribe calls observed.
    #[must_use]
    pub const fn unsubscribe_count(&self) -> u32 {
        self.unsubscribe_count
    }
}

impl ViewportEvents for FakeViewport {
    fn subscribe_scroll(&mut self) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.scroll_live.push(id);
        id
    }

    fn subscribe_resize(&mut self) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.resize_live.push(id);
        id
    }

    fn unsubscribe(&mut self, sub: SubscriptionId) {
        self.scroll_live.retain(|s| *s != sub);
        self.resize_live.retain(|s| *s != sub);
        self.unsubscribe_count += 1;
    }
}

// ---------------------------------------------------------------------------
// VirtualScheduler
// ---------------------------------------------------------------------------

/// A delay scheduler driven by a virtual clock.
#[derive(Debug, Default)]
pub struct VirtualScheduler {
    now_ms: u64,
    next_id: u64,
    armed: Vec<(TimerId, u64)>,
    cancelled: Vec<TimerId>,
}

impl VirtualScheduler {
    /// Current virtual time in milliseconds.
    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Timer ids cancelled so far.
    #[must_use]
    pub fn cancelled(&self) -> &[TimerId] {
        &self.cancelled
    }

    /// Number of delays currently armed.
    #[must_use]
    pub fn armed_len(&self) -> usize {
        self.armed.len()
    }

    /// Advances the clock by `ms` and returns the delays that elapsed, in
    /// due order.
    pub fn advance(&mut self, ms: u64) -> Vec<TimerId> {
        self.now_ms += ms;
        let now = self.now_ms;
        let mut due: Vec<(TimerId, u64)> = Vec::new();
        self.armed.retain(|entry| {
            if entry.1 <= now {
                due.push(*entry);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|entry| entry.1);
        due.into_iter().map(|entry| entry.0).collect()
    }
}

impl DelayScheduler for VirtualScheduler {
    fn schedule(&mut self, delay_ms: u32) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.armed.push((id, self.now_ms + u64::from(delay_ms)));
        id
    }

    fn cancel(&mut self, timer: TimerId) {
        self.armed.retain(|entry| entry.0 != timer);
        self.cancelled.push(timer);
    }
}

// ---------------------------------------------------------------------------
// RecordingTransport
// ---------------------------------------------------------------------------

/// One recorded per-endpoint delivery.
#[derive(Clone, Debug)]
pub struct Delivery {
    /// Addressed channel.
    pub channel: ChannelId,
    /// Origin the endpoint registered with.
    pub origin: String,
    /// The change records carried by the message.
    pub changes: Vec<ChangeRecord>,
}

/// Transport that records deliveries and can fail selected channels.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    deliveries: Vec<Delivery>,
    fail_channels: Vec<ChannelId>,
}

impl RecordingTransport {
    /// All successful deliveries, in send order.
    #[must_use]
    pub fn deliveries(&self) -> &[Delivery] {
        &self.deliveries
    }

    /// Makes every future delivery to `channel` fail with
    /// [`DeliveryError::Disconnected`].
    pub fn fail_channel(&mut self, channel: ChannelId) {
        self.fail_channels.push(channel);
    }
}

impl Transport for RecordingTransport {
    fn deliver(
        &mut self,
        endpoint: &RemoteEndpoint,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError> {
        if self.fail_channels.contains(&endpoint.channel) {
            return Err(DeliveryError::Disconnected);
        }
        self.deliveries.push(Delivery {
            channel: endpoint.channel,
            origin: endpoint.origin.clone(),
            changes: message.changes().to_vec(),
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Cadence metrics
// ---------------------------------------------------------------------------

/// Aggregated cadence counters produced by [`CadenceTracker::report`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CadenceReport {
    /// Broadcast attempts observed.
    pub broadcasts: u64,
    /// Change records sent across all broadcasts.
    pub records_sent: u64,
    /// Records appended to the pending queue.
    pub queued: u64,
    /// Records discarded by de-duplication.
    pub dropped: u64,
    /// Per-endpoint delivery failures (swallowed by the adapter).
    pub failed_deliveries: u64,
    /// Mean records per broadcast; 1.0 means no coalescing happened.
    pub mean_batch_size: f64,
}

/// A [`TraceSink`] that aggregates broadcast cadence and coalescing counters.
#[derive(Debug, Default)]
pub struct CadenceTracker {
    broadcasts: u64,
    records_sent: u64,
    queued: u64,
    dropped: u64,
    failed_deliveries: u64,
}

impl CadenceTracker {
    /// Produces the current report.
    #[must_use]
    pub fn report(&self) -> CadenceReport {
        #[expect(
            clippy::cast_precision_loss,
            reason = "counters are far below f64 precision limits"
        )]
        let mean_batch_size = if self.broadcasts == 0 {
            0.0
        } else {
            self.records_sent as f64 / self.broadcasts as f64
        };
        CadenceReport {
            broadcasts: self.broadcasts,
            records_sent: self.records_sent,
            queued: self.queued,
            dropped: self.dropped,
            failed_deliveries: self.failed_deliveries,
            mean_batch_size,
        }
    }
}

impl TraceSink for CadenceTracker {
    fn on_change_queued(&mut self, _e: &ChangeQueuedEvent) {
        self.queued += 1;
    }

    fn on_change_dropped(&mut self, _e: &ChangeDroppedEvent) {
        self.dropped += 1;
    }

    fn on_broadcast(&mut self, e: &BroadcastEvent) {
        self.broadcasts += 1;
        self.records_sent += u64::from(e.changes);
        self.failed_deliveries += u64::from(e.failed);
    }
}

// ---------------------------------------------------------------------------
// HostDriver
// ---------------------------------------------------------------------------

/// The engine type assembled from the harness fakes.
pub type HarnessEngine =
    ProtocolEngine<ScriptedLayout, FakeViewport, VirtualScheduler, RecordingTransport>;

/// Wires the fakes to a [`ProtocolEngine`] the way a real host would.
///
/// Scroll/resize events are routed only while the corresponding
/// subscription is live; elapsed delays and completed measurements re-enter
/// the engine explicitly; the virtual clock also advances the scripted
/// layout's measurement time.
#[derive(Debug)]
pub struct HostDriver {
    engine: HarnessEngine,
    metrics: CadenceTracker,
}

impl Default for HostDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl HostDriver {
    /// Creates a driver with the default engine configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::new())
    }

    /// Creates a driver with a custom engine configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            engine: ProtocolEngine::new(
                config,
                ScriptedLayout::default(),
                FakeViewport::default(),
                VirtualScheduler::default(),
                RecordingTransport::default(),
            ),
            metrics: CadenceTracker::default(),
        }
    }

    /// Delivers a handshake from `channel` with the given origin.
    pub fn handshake(&mut self, channel: u64, origin: &str) {
        self.engine.on_handshake(
            ChannelId(channel),
            origin.to_string(),
            &mut Tracer::new(&mut self.metrics),
        );
    }

    /// Completes one outstanding measurement request, if any.
    ///
    /// Returns `false` when no request was outstanding.
    pub fn complete_measurement(&mut self) -> bool {
        if !self.engine.layout_mut().take_measurement() {
            return false;
        }
        self.engine
            .on_measurement_ready(&mut Tracer::new(&mut self.metrics));
        true
    }

    /// Delivers a viewport enter/exit notification.
    pub fn set_in_viewport(&mut self, in_viewport: bool) {
        self.engine
            .on_viewport_transition(in_viewport, &mut Tracer::new(&mut self.metrics));
    }

    /// Emits a scroll event; routed only while a scroll subscription is
    /// live. Returns whether the engine saw it.
    pub fn emit_scroll(&mut self) -> bool {
        if !self.engine.viewport().scroll_subscribed() {
            return false;
        }
        self.engine
            .on_scroll_or_resize(&mut Tracer::new(&mut self.metrics));
        true
    }

    /// Emits a resize (or generic layout-changed) event; routed only while
    /// a resize subscription is live. Returns whether the engine saw it.
    pub fn emit_resize(&mut self) -> bool {
        if !self.engine.viewport().resize_subscribed() {
            return false;
        }
        self.engine
            .on_scroll_or_resize(&mut Tracer::new(&mut self.metrics));
        true
    }

    /// Advances the virtual clock, moving the layout's measurement time and
    /// re-entering the engine for every delay that elapsed.
    pub fn advance_ms(&mut self, ms: u64) {
        self.engine.layout_mut().now = MeasureTime(self.engine.layout_mut().now.millis() + ms);
        let fired = self.engine.timer_mut().advance(ms);
        for timer in fired {
            self.engine
                .on_delay_elapsed(timer, &mut Tracer::new(&mut self.metrics));
        }
    }

    /// Tears the engine down.
    pub fn teardown(&mut self) {
        self.engine.teardown(&mut Tracer::new(&mut self.metrics));
    }

    /// The assembled engine.
    #[must_use]
    pub fn engine(&self) -> &HarnessEngine {
        &self.engine
    }

    /// The assembled engine, mutably (to script layout geometry, fail
    /// transport channels, or inspect the scheduler).
    pub fn engine_mut(&mut self) -> &mut HarnessEngine {
        &mut self.engine
    }

    /// Recorded per-endpoint deliveries, in send order.
    #[must_use]
    pub fn deliveries(&self) -> &[Delivery] {
        self.engine.transport().deliveries()
    }

    /// The current cadence report.
    #[must_use]
    pub fn report(&self) -> CadenceReport {
        self.metrics.report()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_scheduler_fires_in_due_order() {
        let mut sched = VirtualScheduler::default();
        let late = sched.schedule(200);
        let early = sched.schedule(50);

        assert_eq!(sched.advance(49), Vec::new());
        assert_eq!(sched.advance(1), [early]);
        assert_eq!(sched.armed_len(), 1);
        assert_eq!(sched.advance(1000), [late]);
    }

    #[test]
    fn virtual_scheduler_cancel_prevents_firing() {
        let mut sched = VirtualScheduler::default();
        let t = sched.schedule(10);
        sched.cancel(t);
        assert_eq!(sched.advance(100), Vec::new());
        assert_eq!(sched.cancelled(), [t]);
    }

    #[test]
    fn cadence_report_mean_batch_size() {
        let mut tracker = CadenceTracker::default();
        tracker.on_broadcast(&BroadcastEvent {
            endpoints: 1,
            changes: 1,
            failed: 0,
        });
        tracker.on_broadcast(&BroadcastEvent {
            endpoints: 1,
            changes: 5,
            failed: 1,
        });
        let report = tracker.report();
        assert_eq!(report.broadcasts, 2);
        assert_eq!(report.records_sent, 6);
        assert_eq!(report.failed_deliveries, 1);
        assert!((report.mean_batch_size - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn driver_routes_scroll_only_while_subscribed() {
        let mut driver = HostDriver::new();
        assert!(!driver.emit_scroll(), "no subscription before handshake");

        driver.handshake(1, "https://a.test");
        driver.complete_measurement();
        assert!(driver.emit_scroll());
    }

    #[test]
    fn complete_measurement_without_request_is_false() {
        let mut driver = HostDriver::new();
        assert!(!driver.complete_measurement());
    }
}
