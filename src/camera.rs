//! Coordinate engine: fitting the diagram to the viewport, screen/native
//! conversions, panning, and the deferred zoom model.
//!
//! Screen space is viewport CSS pixels. Native space is the SVG document's own
//! coordinate system. The diagram is displayed as a box of `size` pixels whose
//! top-left corner sits at (`left`, `top`); `ratio_x` / `ratio_y` convert
//! native units to on-screen pixels.

#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use std::fmt;
use std::str::FromStr;

use crate::consts::{SCROLL_STEP, ZOOM_BASE, ZOOM_MAX, ZOOM_MIN};

/// A point in either screen or native space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
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

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether both dimensions are finite and strictly positive.
    #[must_use]
    pub fn is_usable(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Round `value` to `decimals` places, the way serialized positions and sizes are stored.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// How the diagram is sized when it is first shown or the zoom is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitMode {
    /// Largest size that fits the viewport on both axes.
    #[default]
    Fit,
    FitWidth,
    FitHeight,
    /// Smallest size that covers the viewport on both axes.
    Fill,
    /// Native size.
    Original,
}

/// The configured zoom mode was not one of the recognised names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unexpected zoom mode: {0}")]
pub struct FitModeError(pub String);

impl FromStr for FitMode {
    type Err = FitModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fit" => Ok(Self::Fit),
            "fit width" | "fit-width" => Ok(Self::FitWidth),
            "fit height" | "fit-height" => Ok(Self::FitHeight),
            "fill" => Ok(Self::Fill),
            "original" => Ok(Self::Original),
            _ => Err(FitModeError(s.to_owned())),
        }
    }
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fit => "Fit",
            Self::FitWidth => "Fit Width",
            Self::FitHeight => "Fit Height",
            Self::Fill => "Fill",
            Self::Original => "Original",
        })
    }
}

/// Display state of the diagram within the viewport.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    /// Size of the diagram in native units.
    pub native: Size,
    /// Size of the browser viewport in CSS pixels.
    pub viewport: Size,
    /// Unrounded on-screen size at 100% zoom, as computed by the last fit.
    pub fitted: Size,
    /// Current on-screen size, rounded to whole pixels.
    pub size: Size,
    /// Screen x of the diagram's left edge.
    pub left: f64,
    /// Screen y of the diagram's top edge.
    pub top: f64,
    /// On-screen pixels per native unit, horizontally.
    pub ratio_x: f64,
    /// On-screen pixels per native unit, vertically.
    pub ratio_y: f64,
    /// Zoom level in percent of the fitted size.
    pub zoom: f64,
    /// A zoom step has been taken but not yet applied to `size`.
    pub zoom_pending: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            native: Size::default(),
            viewport: Size::default(),
            fitted: Size::default(),
            size: Size::default(),
            left: 0.0,
            top: 0.0,
            ratio_x: 1.0,
            ratio_y: 1.0,
            zoom: ZOOM_BASE,
            zoom_pending: false,
        }
    }
}

impl Camera {
    /// Size the diagram according to `mode`, centre it, and reset zoom to 100%.
    pub fn fit(&mut self, mode: FitMode) {
        let width_ratio = self.viewport.width / self.native.width;
        let height_ratio = self.viewport.height / self.native.height;

        let scale = match mode {
            FitMode::Fit => width_ratio.min(height_ratio),
            FitMode::FitWidth => width_ratio,
            FitMode::FitHeight => height_ratio,
            FitMode::Fill => width_ratio.max(height_ratio),
            FitMode::Original => 1.0,
        };

        self.fitted = Size::new(self.native.width * scale, self.native.height * scale);
        self.size = Size::new(round_to(self.fitted.width, 0), round_to(self.fitted.height, 0));
        self.zoom = ZOOM_BASE;
        self.zoom_pending = false;
        self.recenter();

        self.ratio_x = self.fitted.width / self.native.width;
        self.ratio_y = self.fitted.height / self.native.height;
    }

    /// Centre the diagram in the viewport at its current size.
    pub fn recenter(&mut self) {
        self.left = round_to((self.viewport.width - self.size.width) / 2.0, 1);
        self.top = round_to((self.viewport.height - self.size.height) / 2.0, 1);
    }

    /// Convert a screen point to native coordinates.
    #[must_use]
    pub fn screen_to_native(&self, screen: Point) -> Point {
        Point {
            x: (screen.x - self.left) / self.ratio_x,
            y: (screen.y - self.top) / self.ratio_y,
        }
    }

    /// Convert a native point to screen coordinates.
    #[must_use]
    pub fn native_to_screen(&self, native: Point) -> Point {
        Point {
            x: native.x * self.ratio_x + self.left,
            y: native.y * self.ratio_y + self.top,
        }
    }

    /// Move the diagram's top-left corner.
    pub fn pan_to(&mut self, left: f64, top: f64) {
        self.left = round_to(left, 1);
        self.top = round_to(top, 1);
    }

    /// Pan by a fraction of the viewport; positive values move the view right/down.
    pub fn scroll_step(&mut self, fraction_x: f64, fraction_y: f64) {
        let left = self.left - self.viewport.width * fraction_x;
        let top = self.top - self.viewport.height * fraction_y;
        self.pan_to(left, top);
    }

    /// Pan one arrow-key step in the given direction (-1, 0, 1 on each axis).
    pub fn arrow_step(&mut self, dx: f64, dy: f64) {
        self.scroll_step(dx * SCROLL_STEP, dy * SCROLL_STEP);
    }

    /// Adjust the zoom level by `step` percent without resizing yet.
    ///
    /// Steps are quartered below 100% and when zooming out from exactly 100%, giving finer
    /// control near the minimum. The level is clamped to `[ZOOM_MIN, ZOOM_MAX]`;
    /// non-finite steps are ignored.
    pub fn step_zoom(&mut self, step: f64) {
        if !step.is_finite() {
            return;
        }
        let mut step = step;
        if self.zoom < ZOOM_BASE {
            step /= 4.0;
        } else if (self.zoom - ZOOM_BASE).abs() < f64::EPSILON && step < 0.0 {
            step /= 4.0;
        }
        self.zoom = (self.zoom + step).clamp(ZOOM_MIN, ZOOM_MAX);
        self.zoom_pending = true;
    }

    /// Apply a pending zoom, keeping the diagram point under `pointer` fixed on screen.
    ///
    /// Returns `true` when a resize happened.
    pub fn apply_pending_zoom(&mut self, pointer: Point) -> bool {
        if !self.zoom_pending {
            return false;
        }
        self.zoom_pending = false;

        let prev = self.size;
        let width = self.fitted.width * self.zoom / ZOOM_BASE;
        let height = self.fitted.height * self.zoom / ZOOM_BASE;

        self.size = Size::new(round_to(width, 0), round_to(height, 0));
        self.ratio_x = width / self.native.width;
        self.ratio_y = height / self.native.height;

        let scale_x = if prev.width > 0.0 { self.size.width / prev.width } else { 1.0 };
        let scale_y = if prev.height > 0.0 { self.size.height / prev.height } else { 1.0 };

        let relative_x = pointer.x - self.left;
        let relative_y = pointer.y - self.top;

        let left = self.left - (relative_x * scale_x - relative_x);
        let top = self.top - (relative_y * scale_y - relative_y);
        self.pan_to(left, top);
        true
    }

    /// Centre of the viewport in screen coordinates.
    #[must_use]
    pub fn viewport_center(&self) -> Point {
        Point::new(self.viewport.width / 2.0, self.viewport.height / 2.0)
    }
}
