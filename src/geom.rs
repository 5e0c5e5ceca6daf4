//! Viewport geometry: points, axis-aligned rectangles, and live bounds sources.
//!
//! All coordinates are CSS pixels in viewport space (the space pointer events
//! report in). A [`Region`] is asked for its bounds every time the drag engine
//! resolves a drop target, so scrolled or resized zones are never matched
//! against stale rectangles.

#[cfg(test)]
#[path = "geom_test.rs"]
mod geom_test;

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// A point in viewport space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Straight-line distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Area in square pixels. Degenerate rectangles report zero.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Whether the rectangle has no extent (e.g. a collapsed or hidden element).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Whether `pt` lies inside the rectangle. Edges are inclusive; empty
    /// rectangles contain nothing.
    #[must_use]
    pub fn contains(&self, pt: Point) -> bool {
        !self.is_empty() && pt.x >= self.x && pt.x <= self.right() && pt.y >= self.y && pt.y <= self.bottom()
    }
}

/// Source of a drop zone's current on-screen bounds.
///
/// Implementations must report the bounds as they are *now*; the engine calls
/// this on every resolution pass instead of caching the value.
pub trait Region {
    fn bounds(&self) -> Rect;
}

impl Region for Rect {
    fn bounds(&self) -> Rect {
        *self
    }
}

/// A rectangle shared between the layout owner and the engine.
///
/// Hosts without a DOM (tests, the replay binary) use this to model layout
/// changes such as scrolling: updating the cell moves the zone for the next
/// resolution pass.
#[derive(Debug, Clone, Default)]
pub struct SharedRect(Rc<Cell<Rect>>);

impl SharedRect {
    #[must_use]
    pub fn new(rect: Rect) -> Self {
        Self(Rc::new(Cell::new(rect)))
    }

    pub fn set(&self, rect: Rect) {
        self.0.set(rect);
    }

    #[must_use]
    pub fn get(&self) -> Rect {
        self.0.get()
    }

    /// Shift the rectangle by `(dx, dy)`, as a scroll of the containing view would.
    pub fn translate(&self, dx: f64, dy: f64) {
        let r = self.0.get();
        self.0.set(Rect::new(r.x + dx, r.y + dy, r.width, r.height));
    }
}

impl Region for SharedRect {
    fn bounds(&self) -> Rect {
        self.0.get()
    }
}
