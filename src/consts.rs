//! Shared numeric and naming constants for the editor.

// ── Annotation classes ──────────────────────────────────────────

/// Class carried by freehand draw paths.
pub const DRAW_CLASS: &str = "svgnote-draw";

/// Class carried by inserted text labels.
pub const TEXT_CLASS: &str = "svgnote-text";

/// Class carried by inserted images and glyphs.
pub const IMAGE_CLASS: &str = "svgnote-image";

/// Transient class marking the node currently targeted by a gesture.
pub const SELECT_CLASS: &str = "svgnote-select";

/// Quick-highlight classes, one per keyboard/modifier slot.
pub const QUICK_HIGHLIGHT_CLASSES: [&str; 4] = ["highlight1", "highlight2", "highlight3", "highlight4"];

/// Id of the injected `<style>` element carrying highlight and annotation styling.
pub const STYLE_ID: &str = "svgnote-styles";

/// Class added to the root while any edit mode is active.
pub const EDIT_MODE_CLASS: &str = "edit-mode";

pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

// ── Zoom ────────────────────────────────────────────────────────

/// Zoom step for one wheel tick or zoom key press, in percent.
pub const ZOOM_STEP: f64 = 20.0;

pub const ZOOM_MIN: f64 = 10.0;
pub const ZOOM_MAX: f64 = 1000.0;

/// Zoom level at which the fitted diagram is shown.
pub const ZOOM_BASE: f64 = 100.0;

/// Wheel deltas smaller than this are ignored.
pub const WHEEL_DEADBAND: f64 = 0.1;

/// Pinch distance changes smaller than this are ignored.
pub const PINCH_DEADBAND: f64 = 0.1;

/// Interval at which the host should call `EngineCore::tick` to apply pending zoom.
pub const ZOOM_TICK_MS: u64 = 100;

/// Fraction of the viewport moved by one arrow key press.
pub const SCROLL_STEP: f64 = 0.05;

// ── Gestures ────────────────────────────────────────────────────

/// Manhattan distance in screen pixels a pointer must travel before a press becomes a drag.
pub const DRAG_THRESHOLD_PX: f64 = 3.0;

/// Manhattan distance in screen pixels below which a paint segment is dropped.
pub const PAINT_THRESHOLD_PX: f64 = 4.0;

// ── Transforms ──────────────────────────────────────────────────

pub const SCALE_MIN: f64 = 0.05;
pub const SCALE_MAX: f64 = 10.0;

/// Rotation increment for Shift-click on text and images, in degrees.
pub const ROTATE_STEP_DEG: f64 = 90.0;

// ── Export ──────────────────────────────────────────────────────

/// Largest raster dimension produced by a PNG export.
pub const RASTER_MAX_PX: f64 = 8192.0;

/// Raster exports render at this multiple of the requested size.
pub const RASTER_SCALE: f64 = 2.0;

/// Inserted images larger than the diagram are shrunk to this fraction of the fitting size.
pub const IMAGE_FIT_FRACTION: f64 = 0.9;

// ── Draw palette ────────────────────────────────────────────────

/// Stroke colours cycled by clicking an existing draw path.
pub const DRAW_PALETTE: [&str; 13] = [
    "Red", "Orange", "Yellow", "Lime", "Green", "Navy", "Blue", "Aqua", "Fuchsia", "Purple", "Black", "Gray", "White",
];
