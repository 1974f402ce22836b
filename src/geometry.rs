//! Pixel-space geometry shared by the map view, the backend client, and the
//! headless driver.
//!
//! All coordinates live in the full-resolution pixel frame of the source
//! raster: x grows to the right, y grows downward with the row order. The
//! screen never re-projects anything; the view transform is a plain
//! scale-and-translate on top of this frame.

use serde::Deserialize;

/// Full-resolution dimensions reported by the backend when a source image is
/// opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct RasterSize {
    pub nx: u32,
    pub ny: u32,
}

/// Axis-aligned window in full-resolution pixel coordinates.
///
/// A window may be degenerate (zero or negative span after clamping); callers
/// that care use [`PixelWindow::is_empty`] before acting on it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelWindow {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl PixelWindow {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Build a normalized window from two opposite corners given in any
    /// order.
    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Self {
        Self {
            min_x: a.0.min(b.0),
            min_y: a.1.min(b.1),
            max_x: a.0.max(b.0),
            max_y: a.1.max(b.1),
        }
    }

    pub fn width(&self) -> f64 {
        (self.max_x - self.min_x).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.max_y - self.min_y).max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Clamp the window to the raster's valid pixel range.
    ///
    /// Low edges clamp to zero, high edges to the raster dimensions. The
    /// result is always a subset of the raster; a window fully outside it
    /// collapses to a degenerate one.
    pub fn clamp_to(self, raster: RasterSize) -> Self {
        Self {
            min_x: self.min_x.max(0.0),
            min_y: self.min_y.max(0.0),
            max_x: self.max_x.min(f64::from(raster.nx)),
            max_y: self.max_y.min(f64::from(raster.ny)),
        }
    }
}

/// Parse a frame extent sent as a JSON pair of opposite corners.
///
/// Corners arrive as `[[y0, x0], [y1, x1]]`, matching the raster's
/// (row, column) order, in either corner order.
pub fn parse_extent(text: &str) -> Result<PixelWindow, serde_json::Error> {
    let corners: [[f64; 2]; 2] = serde_json::from_str(text)?;
    Ok(PixelWindow::from_corners(
        (corners[0][1], corners[0][0]),
        (corners[1][1], corners[1][0]),
    ))
}
