// Copyright 2026 the Viewbridge Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry snapshot builder.
//!
//! [`build_change`] is a pure function from a measurement time, a reference
//! frame rectangle, and a target rectangle to an immutable [`ChangeRecord`].
//! Rectangle intersection and translation go through [`kurbo::Rect`]; the
//! wire representation is [`FrameRect`], which carries the redundant `x`/`y`
//! aliases the embedded consumer expects.

use kurbo::Rect;
use serde::{Deserialize, Serialize};

use crate::time::MeasureTime;

/// An axis-aligned rectangle in the wire format consumed by embedded content.
///
/// `x` and `y` are always equal to `left` and `top` respectively; the
/// constructors enforce the aliasing. Width and height may legitimately be
/// zero (empty intersection) but never negative for rectangles produced by
/// this crate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameRect {
    /// Left edge.
    pub left: f64,
    /// Top edge.
    pub top: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
    /// Alias of `left`.
    pub x: f64,
    /// Alias of `top`.
    pub y: f64,
}

impl FrameRect {
    /// The zero rectangle at the origin.
    pub const ZERO: Self = Self {
        left: 0.0,
        top: 0.0,
        width: 0.0,
        height: 0.0,
        x: 0.0,
        y: 0.0,
    };

    /// Creates a rectangle, setting the `x`/`y` aliases from `left`/`top`.
    #[inline]
    #[must_use]
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
            x: left,
            y: top,
        }
    }

    /// Returns this rectangle translated by `(dx, dy)`.
    #[inline]
    #[must_use]
    pub fn translated(self, dx: f64, dy: f64) -> Self {
        Self::new(self.left + dx, self.top + dy, self.width, self.height)
    }

    /// Returns the geometric intersection with `other`, or [`Self::ZERO`]
    /// when the rectangles do not overlap.
    ///
    /// A degenerate (zero-area) overlap also maps to the zero rectangle at
    /// the origin, so consumers never observe a positioned empty rectangle.
    #[must_use]
    pub fn intersection(self, other: Self) -> Self {
        let r = self.to_kurbo().intersect(other.to_kurbo());
        if r.width() <= 0.0 || r.height() <= 0.0 {
            Self::ZERO
        } else {
            Self::from_kurbo(r)
        }
    }

    /// Converts to a [`kurbo::Rect`] for geometry math.
    #[inline]
    #[must_use]
    pub fn to_kurbo(self) -> Rect {
        Rect::new(
            self.left,
            self.top,
            self.left + self.width,
            self.top + self.height,
        )
    }

    /// Converts from a [`kurbo::Rect`].
    #[inline]
    #[must_use]
    pub fn from_kurbo(r: Rect) -> Self {
        Self::new(r.x0, r.y0, r.width(), r.height())
    }
}

/// An immutable geometry sample, created by [`build_change`] and consumed by
/// being enqueued for broadcast. Never mutated after creation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    /// Monotonic measurement timestamp.
    pub time: MeasureTime,
    /// The observing viewport's rectangle at measurement time.
    pub reference_frame: FrameRect,
    /// The target rectangle translated so the reference frame's origin is
    /// `(0, 0)`.
    pub bounding_box: FrameRect,
    /// Intersection of `reference_frame` and the untranslated target;
    /// [`FrameRect::ZERO`] when disjoint, never absent.
    pub intersection_box: FrameRect,
}

/// Builds a [`ChangeRecord`] from the current measurement.
///
/// The reference frame is re-normalized so its `x`/`y` aliases hold; the
/// bounding box is the target translated by `(-reference_frame.x,
/// -reference_frame.y)`; the intersection box is computed against the
/// untranslated target. Pure and deterministic.
///
/// # Panics
///
/// Panics if the target rectangle has negative width or height. That
/// geometry is impossible for a measured element, so it indicates a defect
/// in the upstream layout engine rather than a recoverable condition.
#[must_use]
pub fn build_change(
    time: MeasureTime,
    reference_frame: FrameRect,
    target: FrameRect,
) -> ChangeRecord {
    let reference_frame = FrameRect::new(
        reference_frame.left,
        reference_frame.top,
        reference_frame.width,
        reference_frame.height,
    );
    let bounding_box = target.translated(-reference_frame.x, -reference_frame.y);
    assert!(
        bounding_box.width >= 0.0 && bounding_box.height >= 0.0,
        "layout engine reported a negative-dimension target rect"
    );
    let intersection_box = reference_frame.intersection(target);

    ChangeRecord {
        time,
        reference_frame,
        bounding_box,
        intersection_box,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_aliases_x_and_y() {
        let r = FrameRect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(r.x, r.left);
        assert_eq!(r.y, r.top);
    }

    #[test]
    fn translated_preserves_size_and_aliasing() {
        let r = FrameRect::new(10.0, 20.0, 30.0, 40.0).translated(-10.0, -20.0);
        assert_eq!(r.left, 0.0);
        assert_eq!(r.top, 0.0);
        assert_eq!(r.width, 30.0);
        assert_eq!(r.height, 40.0);
        assert_eq!(r.x, r.left);
        assert_eq!(r.y, r.top);
    }

    #[test]
    fn intersection_of_overlapping_rects() {
        let a = FrameRect::new(0.0, 0.0, 100.0, 100.0);
        let b = FrameRect::new(50.0, 50.0, 100.0, 100.0);
        let i = a.intersection(b);
        assert_eq!(i, FrameRect::new(50.0, 50.0, 50.0, 50.0));
    }

    #[test]
    fn disjoint_rects_intersect_to_zero_at_origin() {
        let a = FrameRect::new(0.0, 0.0, 10.0, 10.0);
        let b = FrameRect::new(100.0, 100.0, 10.0, 10.0);
        assert_eq!(a.intersection(b), FrameRect::ZERO);
    }

    #[test]
    fn touching_rects_intersect_to_zero_at_origin() {
        // Shared edge, zero-area overlap.
        let a = FrameRect::new(0.0, 0.0, 10.0, 10.0);
        let b = FrameRect::new(10.0, 0.0, 10.0, 10.0);
        assert_eq!(a.intersection(b), FrameRect::ZERO);
    }

    #[test]
    fn intersection_dimensions_are_non_negative() {
        let a = FrameRect::new(-5.0, -5.0, 3.0, 3.0);
        let b = FrameRect::new(40.0, 40.0, 1.0, 1.0);
        let i = a.intersection(b);
        assert!(i.width >= 0.0 && i.height >= 0.0, "must never be negative");
    }

    #[test]
    fn build_change_translates_into_reference_space() {
        let reference = FrameRect::new(0.0, 100.0, 400.0, 300.0);
        let target = FrameRect::new(50.0, 150.0, 200.0, 100.0);
        let change = build_change(MeasureTime(42), reference, target);

        assert_eq!(change.time, MeasureTime(42));
        assert_eq!(change.bounding_box, FrameRect::new(50.0, 50.0, 200.0, 100.0));
        // Intersection is computed against the untranslated target.
        assert_eq!(
            change.intersection_box,
            FrameRect::new(50.0, 150.0, 200.0, 100.0)
        );
    }

    #[test]
    fn build_change_normalizes_reference_frame_aliases() {
        // A reference frame with stale aliases gets re-normalized.
        let reference = FrameRect {
            left: 5.0,
            top: 6.0,
            width: 10.0,
            height: 10.0,
            x: -1.0,
            y: -1.0,
        };
        let target = FrameRect::new(7.0, 8.0, 2.0, 2.0);
        let change = build_change(MeasureTime(1), reference, target);

        assert_eq!(change.reference_frame.x, 5.0);
        assert_eq!(change.reference_frame.y, 6.0);
        assert_eq!(change.bounding_box.x, change.bounding_box.left);
        assert_eq!(change.bounding_box.y, change.bounding_box.top);
    }

    #[test]
    fn build_change_offscreen_target_has_zero_intersection() {
        let reference = FrameRect::new(0.0, 0.0, 400.0, 300.0);
        let target = FrameRect::new(0.0, 1000.0, 200.0, 100.0);
        let change = build_change(MeasureTime(3), reference, target);
        assert_eq!(change.intersection_box, FrameRect::ZERO);
    }

    #[test]
    #[should_panic(expected = "negative-dimension target rect")]
    fn build_change_panics_on_negative_target_dimensions() {
        let reference = FrameRect::new(0.0, 0.0, 100.0, 100.0);
        let target = FrameRect {
            left: 0.0,
            top: 0.0,
            width: -1.0,
            height: 10.0,
            x: 0.0,
            y: 0.0,
        };
        let _ = build_change(MeasureTime(0), reference, target);
    }

    #[test]
    fn change_record_serializes_with_wire_field_names() {
        let change = build_change(
            MeasureTime(9),
            FrameRect::new(0.0, 0.0, 100.0, 100.0),
            FrameRect::new(10.0, 10.0, 20.0, 20.0),
        );
        let json = serde_json::to_value(change).unwrap();
        assert!(json.get("referenceFrame").is_some());
        assert!(json.get("boundingBox").is_some());
        assert!(json.get("intersectionBox").is_some());
        assert_eq!(json["time"], 9);
        assert_eq!(json["boundingBox"]["x"], json["boundingBox"]["left"]);
    }
}
