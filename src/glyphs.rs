//! Glyph gallery and image URL helpers.
//!
//! Glyphs are small status/priority icons served from `/media/glyphs/`.
//! Older saved diagrams reference them as fragments of a single sprite sheet
//! (`/media/sprites.svg#tick`); those are rewritten to inline data URLs of
//! the standalone files when the diagram loads.

#[cfg(test)]
#[path = "glyphs_test.rs"]
mod glyphs_test;

use crate::dialog::PromptItem;

/// A gallery entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub label: &'static str,
    pub image: &'static str,
}

const fn glyph(label: &'static str, image: &'static str) -> Glyph {
    Glyph { label, image }
}

/// Every selectable glyph, in gallery order.
pub const GLYPH_GALLERY: &[Glyph] = &[
    glyph("Tick", "/media/glyphs/tick.svg"),
    glyph("Cross", "/media/glyphs/cross.svg"),
    glyph("Blocked", "/media/glyphs/blocked.svg"),
    glyph("Star", "/media/glyphs/star.svg"),
    glyph("Heart", "/media/glyphs/heart.svg"),
    glyph("Priority: High", "/media/glyphs/label-priority-high.svg"),
    glyph("Priority: Medium", "/media/glyphs/label-priority-medium.svg"),
    glyph("Priority: Low", "/media/glyphs/label-priority-low.svg"),
    glyph("Priority: Must Have", "/media/glyphs/label-mscw-m.svg"),
    glyph("Priority: Should Have", "/media/glyphs/label-mscw-s.svg"),
    glyph("Priority: Could Have", "/media/glyphs/label-mscw-c.svg"),
    glyph("Priority: Won't Have", "/media/glyphs/label-mscw-w.svg"),
    glyph("Label: Will", "/media/glyphs/label-will.svg"),
    glyph("Label: In progress", "/media/glyphs/label-in-progress.svg"),
    glyph("Label: Testing", "/media/glyphs/label-testing.svg"),
    glyph("Label: Purchasing", "/media/glyphs/label-purchasing.svg"),
    glyph("Label: Purchased", "/media/glyphs/label-purchased.svg"),
    glyph("Label: On hold", "/media/glyphs/label-on-hold.svg"),
    glyph("Label: Not yet", "/media/glyphs/label-not-yet.svg"),
    glyph("Label: Done", "/media/glyphs/label-done.svg"),
    glyph("Label: Future", "/media/glyphs/label-future.svg"),
    glyph("Completion: 0%", "/media/glyphs/percent-0.svg"),
    glyph("Completion: 25%", "/media/glyphs/percent-1.svg"),
    glyph("Completion: 50%", "/media/glyphs/percent-2.svg"),
    glyph("Completion: 75%", "/media/glyphs/percent-3.svg"),
    glyph("Completion: 100%", "/media/glyphs/percent-4.svg"),
    glyph("Phase: 1", "/media/glyphs/label-phase-1.svg"),
    glyph("Phase: 2", "/media/glyphs/label-phase-2.svg"),
    glyph("Phase: 3", "/media/glyphs/label-phase-3.svg"),
    glyph("Status: Green", "/media/glyphs/status-green.svg"),
    glyph("Status: Yellow", "/media/glyphs/status-yellow.svg"),
    glyph("Status: Red", "/media/glyphs/status-red.svg"),
    glyph("Traffic Light: Green", "/media/glyphs/light-green.svg"),
    glyph("Traffic Light: Yellow", "/media/glyphs/light-yellow.svg"),
    glyph("Traffic Light: Red", "/media/glyphs/light-red.svg"),
    glyph("Arrow: Up", "/media/glyphs/arrow-up.svg"),
    glyph("Arrow: Down", "/media/glyphs/arrow-down.svg"),
    glyph("Arrow: Left", "/media/glyphs/arrow-left.svg"),
    glyph("Arrow: Right", "/media/glyphs/arrow-right.svg"),
];

const SPRITE_SHEET: &str = "/media/sprites.svg#";

/// Gallery entry with exactly this label.
#[must_use]
pub fn find(label: &str) -> Option<&'static Glyph> {
    GLYPH_GALLERY.iter().find(|g| g.label == label)
}

/// Gallery entries as dialog list items, identified by index.
#[must_use]
pub fn gallery_items() -> Vec<PromptItem> {
    GLYPH_GALLERY
        .iter()
        .enumerate()
        .map(|(i, g)| PromptItem { label: g.label.to_owned(), image: Some(g.image.to_owned()), id: Some(i.to_string()) })
        .collect()
}

/// Glyph name of a sprite-sheet reference, e.g. `tick` for
/// `https://host/media/sprites.svg#tick`.
#[must_use]
pub fn legacy_glyph_name(href: &str) -> Option<&str> {
    if !href.contains(SPRITE_SHEET) {
        return None;
    }
    let hash = href.rfind('#')?;
    Some(&href[hash + 1..]).filter(|name| !name.is_empty())
}

/// Path of the standalone file for a glyph name.
#[must_use]
pub fn glyph_path(name: &str) -> String {
    format!("/media/glyphs/{name}.svg")
}

/// Encode SVG markup as a `data:` URL usable in an `href`.
#[must_use]
pub fn svg_to_data_url(svg: &str) -> String {
    let encoded = svg
        .replace('%', "%25")
        .replace('"', "%22")
        .replace('#', "%23")
        .replace('\'', "%27")
        .replace('\n', "");
    format!("data:image/svg+xml;charset=utf-8,{encoded}")
}
