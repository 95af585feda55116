// Copyright 2026 the Viewbridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Measurement timestamps.
//!
//! [`MeasureTime`] is the monotonic timestamp attached to each geometry
//! sample. The layout engine is the sole producer; core code only compares
//! values for equality (de-duplication) and ordering (the non-decreasing
//! batch order invariant), so the unit is whatever the layout engine reports
//! — millisecond resolution in practice.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A monotonic measurement timestamp in milliseconds.
///
/// Produced by the layout engine at measurement time. Two samples taken in
/// the same measurement tick carry equal `MeasureTime` values, which is what
/// the engine's de-duplication keys on.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MeasureTime(pub u64);

impl MeasureTime {
    /// Returns the raw millisecond value.
    #[inline]
    #[must_use]
    pub const fn millis(self) -> u64 {
        self.0
    }

    /// Returns the elapsed milliseconds since `earlier`, saturating to zero
    /// if `earlier` is in the future.
    #[inline]
    #[must_use]
    pub const fn saturating_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Debug for MeasureTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MeasureTime({}ms)", self.0)
    }
}
