#[cfg(test)]
#[path = "viewport_test.rs"]
mod viewport_test;

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_ZOOM, MIN_ZOOM};

/// A point in either screen or logical space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Viewport state for pan/zoom on the infinite canvas.
///
/// `offset_x` / `offset_y` are the pan translation in screen pixels.
/// `scale` is a zoom factor (1.0 = no zoom), kept within
/// [`MIN_ZOOM`]..=[`MAX_ZOOM`] by every mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { offset_x: 0.0, offset_y: 0.0, scale: 1.0 }
    }
}

impl Viewport {
    /// Convert a screen-space point (pixels) to logical coordinates.
    #[must_use]
    pub fn screen_to_logical(&self, screen: Point) -> Point {
        Point {
            x: (screen.x - self.offset_x) / self.scale,
            y: (screen.y - self.offset_y) / self.scale,
        }
    }

    /// Convert a logical point to screen coordinates (pixels).
    #[must_use]
    pub fn logical_to_screen(&self, logical: Point) -> Point {
        Point {
            x: logical.x * self.scale + self.offset_x,
            y: logical.y * self.scale + self.offset_y,
        }
    }

    /// Translate the pan offset by a screen-space delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    /// Multiply the scale by `factor`, clamped to the zoom bounds.
    ///
    /// Pinch gestures use this with the ratio of successive finger
    /// distances.
    pub fn zoom_by(&mut self, factor: f64) {
        self.scale = (self.scale * factor).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Add `delta` to the scale, clamped to the zoom bounds.
    ///
    /// The zoom in/out controls use this with ±[`crate::consts::ZOOM_STEP`].
    pub fn zoom_step(&mut self, delta: f64) {
        self.scale = (self.scale + delta).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Restore the identity view: scale 1.0, no pan.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
