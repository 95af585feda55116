// Copyright 2026 the Viewbridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core protocol engine for cross-boundary visibility notification.
//!
//! `viewbridge_core` implements the host side of a visibility-notification
//! protocol: the host tracks the on-screen geometry of an embedded, untrusted
//! content region and pushes geometry/visibility updates across the embed
//! boundary, but only to remote endpoints that have explicitly asked for them.
//! It is `no_std` compatible (with `alloc`) and contains no platform code;
//! all platform concerns are injected as capability traits.
//!
//! # Architecture
//!
//! The crate is organized around an event-driven engine that turns layout
//! and viewport callbacks into rate-limited change broadcasts:
//!
//! ```text
//!   Viewport engine (scroll / resize / enter / exit)
//!       │
//!       ▼
//!   VisibilityTracker ──► ProtocolEngine ──► build_change() ──► pending queue
//!                              ▲                                     │
//!        handshake             │                                     ▼
//!   (remote endpoint) ─────────┘            ChannelAdapter ──► Transport::deliver
//! ```
//!
//! **[`geom`]** — Pure geometry snapshot builder. Produces immutable
//! [`ChangeRecord`](geom::ChangeRecord)s from a measurement time, a reference
//! frame rectangle, and a target rectangle.
//!
//! **[`message`]** — Closed tagged-union wire model. The handshake request
//! and the change-batch payload are serde types so message handling is
//! exhaustively matched at compile time.
//!
//! **[`visibility`]** — Two-state visibility tracker that owns the scroll and
//! resize subscription handles. Subscriptions exist if and only if the target
//! is visible.
//!
//! **[`engine`]** — The stateful orchestrator: endpoint registration,
//! pending-change queue, de-duplication, and the rate-limited flush protocol.
//!
//! **[`channel`]** — Best-effort broadcast over an injected
//! [`Transport`](host::Transport); a delivery failure to one endpoint never
//! prevents delivery to the others.
//!
//! **[`host`]** — The capability traits a host platform implements
//! ([`Layout`](host::Layout), [`ViewportEvents`](host::ViewportEvents),
//! [`DelayScheduler`](host::DelayScheduler), [`Transport`](host::Transport))
//! and the wiring contract between them and the engine.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types for
//! protocol instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one
//!   branch per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod channel;
pub mod engine;
pub mod geom;
pub mod host;
pub mod message;
pub mod time;
pub mod trace;
pub mod visibility;
