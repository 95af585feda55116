// Copyright 2026 the Viewbridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Visibility state machine and subscription lifetime.
//!
//! [`VisibilityTracker`] mirrors the external visibility signal as a
//! two-state machine over {invisible, visible} and owns the scroll/resize
//! subscription handles. The invariant maintained here: subscriptions exist
//! if and only if the target is visible. Each handle is released exactly
//! once, either on the visible→invisible transition or at teardown.

use crate::host::{SubscriptionId, ViewportEvents};

/// The notification produced by a state change, delivered synchronously to
/// the engine. Exactly one per transition; redundant updates produce none.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// The target entered the visible area.
    BecameVisible,
    /// The target left the visible area.
    BecameInvisible,
}

/// Tracks visibility and owns the scroll/resize subscriptions.
///
/// Initial state: invisible, no subscriptions.
#[derive(Debug, Default)]
pub struct VisibilityTracker {
    visible: bool,
    scroll_sub: Option<SubscriptionId>,
    resize_sub: Option<SubscriptionId>,
}

impl VisibilityTracker {
    /// Creates a tracker in the invisible state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the target is currently visible.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Applies an external visibility update.
    ///
    /// Idempotent: returns `None` when `now_visible` matches the current
    /// state. On invisible→visible, subscribes to the scroll and resize
    /// streams (both routed by the host to the engine's recompute path) and
    /// returns [`Transition::BecameVisible`]. On visible→invisible, releases
    /// both subscriptions and returns [`Transition::BecameInvisible`].
    pub fn set_visible<V: ViewportEvents>(
        &mut self,
        now_visible: bool,
        viewport: &mut V,
    ) -> Option<Transition> {
        if now_visible == self.visible {
            return None;
        }
        self.visible = now_visible;
        if now_visible {
            self.scroll_sub = Some(viewport.subscribe_scroll());
            self.resize_sub = Some(viewport.subscribe_resize());
            Some(Transition::BecameVisible)
        } else {
            self.release(viewport);
            Some(Transition::BecameInvisible)
        }
    }

    /// Releases both subscriptions if held.
    ///
    /// Safe to call more than once; the handles are taken so each is
    /// released at most once. Used on the invisible transition and at
    /// engine teardown.
    pub fn release<V: ViewportEvents>(&mut self, viewport: &mut V) {
        if let Some(sub) = self.scroll_sub.take() {
            viewport.unsubscribe(sub);
        }
        if let Some(sub) = self.resize_sub.take() {
            viewport.unsubscribe(sub);
        }
    }
}
