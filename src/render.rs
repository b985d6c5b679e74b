//! Serialization and display bookkeeping for the loaded diagram.
//!
//! The document tree is the only state; the host renders it. This module
//! writes the display-only attributes the host needs (on-screen size,
//! injected styles, image filters) and produces the XML that is saved or
//! exported, with every editor-only trace removed.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use crate::camera::Size;
use crate::consts::{DRAW_CLASS, EDIT_MODE_CLASS, RASTER_MAX_PX, RASTER_SCALE, SELECT_CLASS, STYLE_ID, TEXT_CLASS};
use crate::doc::{DocStore, NodeId, parse_length};
use crate::input::EditMode;
use crate::settings::{Filters, Settings};

/// An axis-aligned box in native units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }
}

// =============================================================================
// Native size
// =============================================================================

/// Native size of the root: `width`/`height` attributes, else the `viewBox`
/// extent, else the rendered bounding box supplied by the host.
///
/// The `viewBox` extent is its width and height as written; min-x and min-y
/// only move the origin and do not shrink the size.
#[must_use]
pub fn native_size(doc: &DocStore, bbox: Option<Bounds>) -> Option<Size> {
    let root = doc.root();
    let attrs = doc.attr(root, "width").and_then(parse_length).zip(doc.attr(root, "height").and_then(parse_length));
    if let Some((width, height)) = attrs {
        return Some(Size::new(width, height)).filter(|s| s.is_usable());
    }

    if let Some(view_box) = doc.attr(root, "viewBox") {
        let values: Vec<f64> =
            view_box.split([' ', ',', '\t', '\n', '\r']).filter(|v| !v.is_empty()).filter_map(parse_length).collect();
        if let [_, _, width, height] = values[..] {
            return Some(Size::new(width, height)).filter(|s| s.is_usable());
        }
    }

    bbox.map(|b| Size::new(b.width, b.height)).filter(|s| s.is_usable())
}

/// Write the on-screen size to the root's inline style.
pub fn set_display_size(doc: &mut DocStore, size: Size) {
    let root = doc.root();
    doc.set_style(root, "width", &format!("{:.0}px", size.width));
    doc.set_style(root, "height", &format!("{:.0}px", size.height));
}

/// Replace the root's edit mode classes with those for `mode`.
pub fn set_mode_classes(doc: &mut DocStore, mode: EditMode) {
    let root = doc.root();
    strip_mode_classes(doc, root);
    if let Some(class) = mode.root_class() {
        doc.add_class(root, EDIT_MODE_CLASS);
        doc.add_class(root, class);
    }
}

fn strip_mode_classes(doc: &mut DocStore, node: NodeId) {
    doc.remove_class(node, EDIT_MODE_CLASS);
    for class in EditMode::ALL.iter().filter_map(|m| m.root_class()) {
        doc.remove_class(node, class);
    }
}

// =============================================================================
// Styles and filters
// =============================================================================

/// Style sheet for quick highlights and annotation kinds.
#[must_use]
pub fn style_sheet(settings: &Settings) -> String {
    let [h1, h2, h3, h4] = settings.quick_highlights();
    format!(
        ".highlight1{{fill:{h1};}} .highlight2{{fill:{h2};}} .highlight3{{fill:{h3};}} .highlight4{{fill:{h4};}} \
         .{DRAW_CLASS}{{stroke-width:5px;stroke-linecap:round;stroke-linejoin:round;fill-opacity:25%;stroke-opacity:80%;}} \
         .{TEXT_CLASS}{{font-family:Arial;font-size:2.5em;font-weight:bold;}}"
    )
}

/// Write the style sheet built from `settings` into the injected `<style>`
/// element. An existing element keeps its place; a missing one is appended.
pub fn inject_styles(doc: &mut DocStore, settings: &Settings) {
    let css = style_sheet(settings);
    if let Some(style) = doc.element_by_id(STYLE_ID) {
        doc.set_text_content(style, &css);
        return;
    }
    let style = doc.create_element("style");
    doc.set_attr(style, "id", STYLE_ID);
    doc.set_text_content(style, &css);
    let root = doc.root();
    doc.append_child(root, style);
}

/// Set the root's CSS filter.
pub fn apply_filters(doc: &mut DocStore, filters: &Filters) {
    let root = doc.root();
    doc.set_style(root, "filter", &filters.css());
}

/// Filter values stored in the root's CSS filter, if it has one.
#[must_use]
pub fn read_filters(doc: &DocStore) -> Option<Filters> {
    let css = doc.style(doc.root(), "filter")?;
    Filters::from_css(&css, Filters::default())
}

// =============================================================================
// Serialization
// =============================================================================

/// XML of the diagram as it should be saved: mode and selection classes
/// removed and the root sized to `native`.
#[must_use]
pub fn serialize(doc: &DocStore, native: Size) -> String {
    let mut copy = doc.clone();
    let root = copy.root();
    strip_mode_classes(&mut copy, root);
    for node in copy.elements() {
        copy.remove_class(node, SELECT_CLASS);
    }
    set_display_size(&mut copy, native);
    copy.to_xml(root)
}

/// View box covering both the rendered content and the native canvas, so
/// annotations dragged outside the original bounds are not clipped.
#[must_use]
pub fn export_view_box(bbox: Bounds, native: Size) -> Bounds {
    Bounds {
        x: bbox.x.min(0.0).round(),
        y: bbox.y.min(0.0).round(),
        width: bbox.width.max(native.width).round(),
        height: bbox.height.max(native.height).round(),
    }
}

/// XML for raster export, with the view box expanded to `bbox`.
#[must_use]
pub fn raster_markup(doc: &DocStore, native: Size, bbox: Bounds) -> (String, Bounds) {
    let view = export_view_box(bbox, native);
    let mut copy = doc.clone();
    let root = copy.root();
    copy.set_attr(root, "viewBox", format!("{} {} {} {}", view.x, view.y, view.width, view.height));
    copy.set_attr(root, "width", view.width.to_string());
    copy.set_attr(root, "height", view.height.to_string());
    (serialize(&copy, native), view)
}

/// Pixel size of a raster export: twice the image size, scaled down to fit
/// within [`RASTER_MAX_PX`] on both axes while keeping the aspect ratio.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn raster_size(width: f64, height: f64) -> (u32, u32) {
    let mut w = width * RASTER_SCALE;
    let mut h = height * RASTER_SCALE;
    if w > RASTER_MAX_PX || h > RASTER_MAX_PX {
        let ratio = w / h;
        if ratio > 1.0 {
            w = RASTER_MAX_PX;
            h = (RASTER_MAX_PX / ratio).round();
        } else {
            w = (RASTER_MAX_PX * ratio).round();
            h = RASTER_MAX_PX;
        }
    }
    (w.max(1.0) as u32, h.max(1.0) as u32)
}

/// Download name for an export: the saved title, or the decoded built-in name.
#[must_use]
pub fn export_filename(saved_title: Option<&str>, filename: &str, extension: &str) -> String {
    let stem = saved_title.map_or_else(|| decode_component(filename), str::to_owned);
    format!("{stem}.{extension}")
}

/// Percent-decode a URL component. Malformed escapes are kept literally.
#[must_use]
pub fn decode_component(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let (Some(hi), Some(lo)) = (bytes.get(i + 1).and_then(|b| hex_digit(*b)), bytes.get(i + 2).and_then(|b| hex_digit(*b))) {
                out.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_digit(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
