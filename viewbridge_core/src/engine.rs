// Copyright 2026 the Viewbridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The notification protocol engine.
//!
//! [`ProtocolEngine`] is the stateful orchestrator for one observed target.
//! It tracks which remote endpoints have asked for updates, maintains the
//! pending-change queue, enforces the rate limit, and drives the handshake
//! and coalescing logic.
//!
//! # State machine
//!
//! The engine starts `Inactive` and becomes `Active` on the first handshake;
//! the transition is one-directional and permanent. While `Inactive`, no
//! geometry is ever computed — measurements cost layout work and would leak
//! visibility timing to nobody.
//!
//! # Rate limiting
//!
//! The first change after an idle period is flushed immediately; a delay of
//! [`EngineConfig::rate_limit_ms`] is then armed. Changes recomputed while
//! the delay is outstanding accumulate in the queue (coalescing) and are
//! drained in one batch when the delay elapses. This bounds outbound traffic
//! to at most one send per window per observed target regardless of event
//! burst rate, while the very first change always goes out instantly.
//!
//! # Re-entry discipline
//!
//! The two asynchronous completions ([`on_measurement_ready`] and
//! [`on_delay_elapsed`]) re-validate current state instead of trusting
//! anything captured at issuance time; arbitrary handshakes, scroll events,
//! and visibility flips may have interleaved.
//!
//! [`on_measurement_ready`]: ProtocolEngine::on_measurement_ready
//! [`on_delay_elapsed`]: ProtocolEngine::on_delay_elapsed

use alloc::string::String;
use alloc::vec::Vec;
use core::mem;

use crate::channel::ChannelAdapter;
use crate::geom::{self, ChangeRecord};
use crate::host::{DelayScheduler, Layout, TimerId, Transport, ViewportEvents};
use crate::message::{ChannelId, OutboundMessage, RemoteEndpoint};
use crate::trace::{
    ChangeDroppedEvent, ChangeQueuedEvent, DelayElapsedEvent, FlushScheduledEvent, HandshakeEvent,
    TeardownEvent, Tracer, VisibilityEvent,
};
use crate::visibility::VisibilityTracker;

/// Configuration for the [`ProtocolEngine`].
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    /// Rate-limit window in milliseconds. At most one broadcast is sent per
    /// window per observed target.
    pub rate_limit_ms: u32,
}

impl EngineConfig {
    /// The default configuration: one broadcast per 100 ms.
    #[must_use]
    pub const fn new() -> Self {
        Self { rate_limit_ms: 100 }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Protocol engine for one observed target.
///
/// Composes the [`VisibilityTracker`], the geometry snapshot builder, and
/// the [`ChannelAdapter`] over the host's capability traits. All methods run
/// on the host's single callback thread; nothing here blocks.
#[derive(Debug)]
pub struct ProtocolEngine<L, V, S, T> {
    config: EngineConfig,
    layout: L,
    viewport: V,
    timer: S,
    channel: ChannelAdapter<T>,
    visibility: VisibilityTracker,
    endpoints: Vec<RemoteEndpoint>,
    active: bool,
    pending: Vec<ChangeRecord>,
    flush_timer: Option<TimerId>,
}

impl<L, V, S, T> ProtocolEngine<L, V, S, T>
where
    L: Layout,
    V: ViewportEvents,
    S: DelayScheduler,
    T: Transport,
{
    /// Creates an inactive engine over the given collaborators.
    #[must_use]
    pub fn new(config: EngineConfig, layout: L, viewport: V, timer: S, transport: T) -> Self {
        Self {
            config,
            layout,
            viewport,
            timer,
            channel: ChannelAdapter::new(transport),
            visibility: VisibilityTracker::new(),
            endpoints: Vec::new(),
            active: false,
            pending: Vec::new(),
            flush_timer: None,
        }
    }

    /// Handles a handshake receipt from the inbound channel.
    ///
    /// Registers the endpoint if its channel is unknown (a duplicate channel
    /// is a no-op merge, not an error), then unconditionally activates:
    /// a measurement is requested so the requester receives one baseline
    /// change record even if no viewport motion has occurred.
    pub fn on_handshake(&mut self, channel: ChannelId, origin: String, tracer: &mut Tracer<'_>) {
        let known = self.endpoints.iter().any(|e| e.channel == channel);
        if !known {
            self.endpoints.push(RemoteEndpoint { channel, origin });
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "endpoint count is far below u32::MAX"
        )]
        tracer.handshake(&HandshakeEvent {
            channel,
            known,
            endpoints: self.endpoints.len() as u32,
        });

        self.active = true;
        self.layout.request_measurement();
    }

    /// Completion callback for the measurement requested at handshake time.
    ///
    /// Re-validates `active` (the engine may have been handed other events
    /// in the meantime). If the layout engine reports the target visible,
    /// synthesizes a visibility-entered transition through the tracker, then
    /// unconditionally recomputes and enqueues — de-duplication collapses
    /// the two samples when both land in the same measurement tick.
    pub fn on_measurement_ready(&mut self, tracer: &mut Tracer<'_>) {
        if !self.active {
            return;
        }
        if self.layout.is_visible() {
            self.transition(true, tracer);
        }
        self.recompute_and_enqueue(tracer);
    }

    /// Handles an enter/exit notification from the external viewport engine.
    pub fn on_viewport_transition(&mut self, in_viewport: bool, tracer: &mut Tracer<'_>) {
        self.transition(in_viewport, tracer);
    }

    /// Handles one scroll or resize notification.
    ///
    /// The host routes these only while the tracker's subscriptions are
    /// live, i.e. while the target is visible.
    pub fn on_scroll_or_resize(&mut self, tracer: &mut Tracer<'_>) {
        self.recompute_and_enqueue(tracer);
    }

    /// Completion callback for the rate-limit delay.
    ///
    /// A stale id (cancelled at teardown, or from an earlier window) is
    /// ignored. Otherwise the window closes: anything accumulated during it
    /// is flushed in one batch. The flush here does not arm a new window.
    pub fn on_delay_elapsed(&mut self, timer: TimerId, tracer: &mut Tracer<'_>) {
        if self.flush_timer != Some(timer) {
            return;
        }
        self.flush_timer = None;
        #[expect(
            clippy::cast_possible_truncation,
            reason = "pending queue length is far below u32::MAX"
        )]
        tracer.delay_elapsed(&DelayElapsedEvent {
            pending: self.pending.len() as u32,
        });
        if !self.pending.is_empty() {
            self.flush(tracer);
        }
    }

    /// Releases the tracker's subscriptions and cancels any outstanding
    /// rate-limit delay. Safe to call more than once; each resource is
    /// released exactly once.
    pub fn teardown(&mut self, tracer: &mut Tracer<'_>) {
        self.visibility.release(&mut self.viewport);
        let delay_cancelled = match self.flush_timer.take() {
            Some(timer) => {
                self.timer.cancel(timer);
                true
            }
            None => false,
        };
        tracer.teardown(&TeardownEvent { delay_cancelled });
    }

    fn transition(&mut self, in_viewport: bool, tracer: &mut Tracer<'_>) {
        if let Some(t) = self.visibility.set_visible(in_viewport, &mut self.viewport) {
            tracer.visibility(&VisibilityEvent {
                visible: t == crate::visibility::Transition::BecameVisible,
            });
            self.recompute_and_enqueue(tracer);
        }
    }

    fn recompute_and_enqueue(&mut self, tracer: &mut Tracer<'_>) {
        if !self.active {
            return;
        }
        let change = geom::build_change(
            self.layout.now(),
            self.layout.reference_frame(),
            self.layout.target_rect(),
        );
        // Tail-compare only: a sample from the same measurement tick as the
        // most recently queued one did not advance and is discarded.
        if let Some(last) = self.pending.last() {
            if last.time == change.time {
                tracer.change_dropped(&ChangeDroppedEvent { time: change.time });
                return;
            }
        }
        self.pending.push(change);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "pending queue length is far below u32::MAX"
        )]
        tracer.change_queued(&ChangeQueuedEvent {
            time: change.time,
            queue_len: self.pending.len() as u32,
        });
        self.schedule_flush(tracer);
    }

    fn schedule_flush(&mut self, tracer: &mut Tracer<'_>) {
        if self.flush_timer.is_some() {
            // Window already open; the change coalesces into the queue.
            return;
        }
        self.flush(tracer);
        self.flush_timer = Some(self.timer.schedule(self.config.rate_limit_ms));
        tracer.flush_scheduled(&FlushScheduledEvent {
            delay_ms: self.config.rate_limit_ms,
        });
    }

    fn flush(&mut self, tracer: &mut Tracer<'_>) {
        if self.pending.is_empty() {
            return;
        }
        let changes = mem::take(&mut self.pending);
        let message = OutboundMessage::Intersection { changes };
        self.channel.broadcast(&self.endpoints, &message, tracer);
    }

    // -- accessors ---------------------------------------------------------

    /// Whether at least one endpoint has ever requested updates.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the tracker currently holds the target visible.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visibility.is_visible()
    }

    /// The registered endpoints, in registration order.
    #[must_use]
    pub fn endpoints(&self) -> &[RemoteEndpoint] {
        &self.endpoints
    }

    /// Number of change records awaiting flush.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// The layout collaborator.
    #[must_use]
    pub fn layout(&self) -> &L {
        &self.layout
    }

    /// The layout collaborator, mutably.
    pub fn layout_mut(&mut self) -> &mut L {
        &mut self.layout
    }

    /// The viewport collaborator.
    #[must_use]
    pub fn viewport(&self) -> &V {
        &self.viewport
    }

    /// The delay scheduler collaborator, mutably.
    pub fn timer_mut(&mut self) -> &mut S {
        &mut self.timer
    }

    /// The wrapped transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        self.channel.transport()
    }

    /// The wrapped transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        self.channel.transport_mut()
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;
    use alloc::vec::Vec;

    use super::*;
    use crate::geom::FrameRect;
    use crate::host::{DeliveryError, SubscriptionId};
    use crate::time::MeasureTime;

    struct TestLayout {
        now: MeasureTime,
        visible: bool,
        reference_frame: FrameRect,
        target: FrameRect,
        measurement_requests: u32,
    }

    impl TestLayout {
        fn new() -> Self {
            Self {
                now: MeasureTime(1000),
                visible: true,
                reference_frame: FrameRect::new(0.0, 0.0, 400.0, 300.0),
                target: FrameRect::new(50.0, 50.0, 100.0, 100.0),
                measurement_requests: 0,
            }
        }
    }

    impl Layout for TestLayout {
        fn request_measurement(&mut self) {
            self.measurement_requests += 1;
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

    #[derive(Default)]
    struct TestViewport {
        next: u64,
        live: Vec<SubscriptionId>,
        released: Vec<SubscriptionId>,
    }

    impl ViewportEvents for TestViewport {
        fn subscribe_scroll(&mut self) -> SubscriptionId {
            self.next += 1;
            let id = SubscriptionId(self.next);
            self.live.push(id);
            id
        }
        fn subscribe_resize(&mut self) -> SubscriptionId {
            self.subscribe_scroll()
        }
        fn unsubscribe(&mut self, sub: SubscriptionId) {
            self.live.retain(|s| *s != sub);
            self.released.push(sub);
        }
    }

    #[derive(Default)]
    struct TestTimer {
        next: u64,
        scheduled: Vec<(TimerId, u32)>,
        cancelled: Vec<TimerId>,
    }

    impl DelayScheduler for TestTimer {
        fn schedule(&mut self, delay_ms: u32) -> TimerId {
            self.next += 1;
            let id = TimerId(self.next);
            self.scheduled.push((id, delay_ms));
            id
        }
        fn cancel(&mut self, timer: TimerId) {
            self.cancelled.push(timer);
        }
    }

    #[derive(Default)]
    struct TestTransport {
        deliveries: Vec<(ChannelId, usize)>,
        last_batch_times: Vec<u64>,
    }

    impl Transport for TestTransport {
        fn deliver(
            &mut self,
            endpoint: &RemoteEndpoint,
            message: &OutboundMessage,
        ) -> Result<(), DeliveryError> {
            self.deliveries
                .push((endpoint.channel, message.changes().len()));
            self.last_batch_times = message.changes().iter().map(|c| c.time.millis()).collect();
            Ok(())
        }
    }

    type TestEngine = ProtocolEngine<TestLayout, TestViewport, TestTimer, TestTransport>;

    fn engine() -> TestEngine {
        ProtocolEngine::new(
            EngineConfig::new(),
            TestLayout::new(),
            TestViewport::default(),
            TestTimer::default(),
            TestTransport::default(),
        )
    }

    fn handshake(e: &mut TestEngine, channel: u64) {
        e.on_handshake(
            ChannelId(channel),
            "https://a.test".to_string(),
            &mut Tracer::none(),
        );
    }

    #[test]
    fn handshake_registers_endpoint_and_requests_measurement() {
        let mut e = engine();
        assert!(!e.is_active());

        handshake(&mut e, 1);
        assert!(e.is_active());
        assert_eq!(e.endpoints().len(), 1);
        assert_eq!(e.layout().measurement_requests, 1);
    }

    #[test]
    fn duplicate_handshake_keeps_one_endpoint() {
        let mut e = engine();
        handshake(&mut e, 1);
        handshake(&mut e, 1);
        assert_eq!(e.endpoints().len(), 1);
        // Activation is idempotent but the measurement is re-requested.
        assert_eq!(e.layout().measurement_requests, 2);
    }

    #[test]
    fn same_origin_different_channels_are_distinct() {
        let mut e = engine();
        handshake(&mut e, 1);
        handshake(&mut e, 2);
        assert_eq!(e.endpoints().len(), 2);
    }

    #[test]
    fn baseline_broadcast_after_measurement_completes() {
        // Scenario: inactive engine, handshake arrives, measurement
        // completes with the target visible.
        let mut e = engine();
        handshake(&mut e, 1);
        e.on_measurement_ready(&mut Tracer::none());

        assert!(e.is_visible());
        assert_eq!(e.viewport().live.len(), 2, "scroll + resize subscribed");
        // Exactly one broadcast carrying exactly one record.
        assert_eq!(e.transport().deliveries, &[(ChannelId(1), 1)]);
        assert_eq!(e.pending_len(), 0);
    }

    #[test]
    fn measurement_without_handshake_is_a_no_op() {
        let mut e = engine();
        e.on_measurement_ready(&mut Tracer::none());
        assert!(e.transport().deliveries.is_empty());
        assert!(!e.is_visible());
    }

    #[test]
    fn inactive_engine_ignores_viewport_traffic() {
        // No handshake ever arrives: visibility and scroll events must not
        // produce geometry work or broadcasts.
        let mut e = engine();
        e.on_viewport_transition(true, &mut Tracer::none());
        e.on_scroll_or_resize(&mut Tracer::none());
        e.on_viewport_transition(false, &mut Tracer::none());
        assert!(e.transport().deliveries.is_empty());
        assert_eq!(e.pending_len(), 0);
    }

    #[test]
    fn duplicate_measurement_time_is_discarded() {
        let mut e = engine();
        handshake(&mut e, 1);
        e.on_measurement_ready(&mut Tracer::none());

        // Same tick: the recompute must not queue a second record.
        e.on_scroll_or_resize(&mut Tracer::none());
        assert_eq!(e.pending_len(), 0, "tail-deduped, nothing queued");

        e.layout_mut().now = MeasureTime(1016);
        e.on_scroll_or_resize(&mut Tracer::none());
        assert_eq!(e.pending_len(), 1);
    }

    #[test]
    fn burst_coalesces_into_two_broadcasts() {
        let mut e = engine();
        handshake(&mut e, 1);
        e.on_measurement_ready(&mut Tracer::none());
        assert_eq!(e.transport().deliveries.len(), 1, "immediate flush");

        // Four more scroll events inside the window, each a new tick.
        for ms in [1010u64, 1020, 1030, 1040] {
            e.layout_mut().now = MeasureTime(ms);
            e.on_scroll_or_resize(&mut Tracer::none());
        }
        assert_eq!(
            e.transport().deliveries.len(),
            1,
            "window open, changes accumulate"
        );
        assert_eq!(e.pending_len(), 4);

        let (timer, delay) = e.timer_mut().scheduled[0];
        assert_eq!(delay, 100);
        e.on_delay_elapsed(timer, &mut Tracer::none());

        assert_eq!(e.transport().deliveries, &[(ChannelId(1), 1), (ChannelId(1), 4)]);
        assert_eq!(e.pending_len(), 0);
    }

    #[test]
    fn window_close_with_empty_queue_sends_nothing() {
        let mut e = engine();
        handshake(&mut e, 1);
        e.on_measurement_ready(&mut Tracer::none());

        let (timer, _) = e.timer_mut().scheduled[0];
        e.on_delay_elapsed(timer, &mut Tracer::none());
        assert_eq!(e.transport().deliveries.len(), 1, "no second broadcast");

        // The window is closed: the next change flushes immediately again.
        e.layout_mut().now = MeasureTime(2000);
        e.on_scroll_or_resize(&mut Tracer::none());
        assert_eq!(e.transport().deliveries.len(), 2);
    }

    #[test]
    fn stale_timer_id_is_ignored() {
        let mut e = engine();
        handshake(&mut e, 1);
        e.on_measurement_ready(&mut Tracer::none());

        e.layout_mut().now = MeasureTime(1016);
        e.on_scroll_or_resize(&mut Tracer::none());
        assert_eq!(e.pending_len(), 1);

        e.on_delay_elapsed(TimerId(999), &mut Tracer::none());
        assert_eq!(e.pending_len(), 1, "stale id must not close the window");
        assert_eq!(e.transport().deliveries.len(), 1);
    }

    #[test]
    fn batch_preserves_measurement_order() {
        let mut e = engine();
        handshake(&mut e, 1);
        e.on_measurement_ready(&mut Tracer::none());

        for ms in [1010u64, 1020, 1030] {
            e.layout_mut().now = MeasureTime(ms);
            e.on_scroll_or_resize(&mut Tracer::none());
        }

        let (timer, _) = e.timer_mut().scheduled[0];
        e.on_delay_elapsed(timer, &mut Tracer::none());
        assert_eq!(e.transport().deliveries.last(), Some(&(ChannelId(1), 3)));
        assert_eq!(e.transport().last_batch_times, &[1010, 1020, 1030]);
    }

    #[test]
    fn invisible_transition_enqueues_a_final_sample() {
        let mut e = engine();
        handshake(&mut e, 1);
        e.on_measurement_ready(&mut Tracer::none());

        e.layout_mut().now = MeasureTime(1100);
        e.on_viewport_transition(false, &mut Tracer::none());

        assert!(!e.is_visible());
        assert!(e.viewport().live.is_empty(), "subscriptions released");
        assert_eq!(e.viewport().released.len(), 2);
        assert_eq!(e.pending_len(), 1, "exit sample queued for the window");
    }

    #[test]
    fn broadcast_reaches_every_registered_endpoint() {
        let mut e = engine();
        handshake(&mut e, 1);
        handshake(&mut e, 2);
        e.on_measurement_ready(&mut Tracer::none());

        assert_eq!(
            e.transport().deliveries,
            &[(ChannelId(1), 1), (ChannelId(2), 1)]
        );
    }

    #[test]
    fn teardown_cancels_delay_and_releases_subscriptions_once() {
        let mut e = engine();
        handshake(&mut e, 1);
        e.on_measurement_ready(&mut Tracer::none());
        let (timer, _) = e.timer_mut().scheduled[0];

        e.teardown(&mut Tracer::none());
        assert_eq!(e.timer_mut().cancelled, &[timer]);
        assert_eq!(e.viewport().released.len(), 2);

        // Idempotent: nothing left to release or cancel.
        e.teardown(&mut Tracer::none());
        assert_eq!(e.timer_mut().cancelled.len(), 1);
        assert_eq!(e.viewport().released.len(), 2);

        // The cancelled delay firing late is ignored.
        e.on_delay_elapsed(timer, &mut Tracer::none());
        assert_eq!(e.transport().deliveries.len(), 1);
    }
}
