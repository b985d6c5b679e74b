//! Feature map application.
//!
//! Source diagrams tag their elements with `data-feature="<id>"`. Header
//! cells additionally carry `data-header` and group outlines `data-group`.
//! Applying a [`FeatureMap`] walks every entry, finds all elements with the
//! entry's id, and writes what the entry mentions:
//!
//! - **Highlight**: inline fill, except on headers.
//! - **Glyph**: a gallery image positioned inside the element's box, except
//!   on headers. The image has to be decoded before its size is known, so
//!   glyphs come back as [`PendingGlyph`]s for the host to load and the
//!   engine to insert.
//! - **Link**: `href` on the enclosing anchor, or a new anchor wrapper, except
//!   on groups. An empty link removes the `href`.
//! - **Notes**: a `<title>` child, except on groups.
//!
//! Application is additive. Nothing an entry does not mention is cleared,
//! and applying the same map again inserts its glyphs again.

#[cfg(test)]
#[path = "overlay_test.rs"]
mod overlay_test;

use std::str::FromStr;

use tracing::{debug, info, warn};

use crate::camera::{Point, Size};
use crate::consts::IMAGE_CLASS;
use crate::doc::{DocStore, NodeId};
use crate::glyphs;
use crate::store::FeatureMap;
use crate::transform::translate_of;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OverlayError {
    #[error("unexpected alignment value: {0}")]
    Alignment(String),
}

/// One alignment keyword. Each keyword shifts the glyph within the feature box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignKeyword {
    Top,
    Middle,
    Bottom,
    Left,
    Centre,
    Right,
}

impl FromStr for AlignKeyword {
    type Err = OverlayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "middle" => Ok(Self::Middle),
            "bottom" => Ok(Self::Bottom),
            "left" => Ok(Self::Left),
            "centre" => Ok(Self::Centre),
            "right" => Ok(Self::Right),
            _ => Err(OverlayError::Alignment(s.to_owned())),
        }
    }
}

/// Alignment keywords in the order written, e.g. `"Middle Right"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alignment(pub Vec<AlignKeyword>);

impl FromStr for Alignment {
    type Err = OverlayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(' ').filter(|k| !k.is_empty()).map(str::parse).collect::<Result<_, _>>().map(Self)
    }
}

impl Alignment {
    /// Offset of a `glyph`-sized image within a `container`-sized box.
    #[must_use]
    pub fn offset(&self, container: Size, glyph: Size) -> Point {
        self.0.iter().fold(Point::default(), |mut p, keyword| {
            match keyword {
                AlignKeyword::Top | AlignKeyword::Left => {}
                AlignKeyword::Middle => p.y += container.height / 2.0 - glyph.height / 2.0,
                AlignKeyword::Bottom => p.y += container.height - glyph.height,
                AlignKeyword::Centre => p.x += container.width / 2.0 - glyph.width / 2.0,
                AlignKeyword::Right => p.x += container.width - glyph.width,
            }
            p
        })
    }
}

/// A glyph waiting for its image to load.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingGlyph {
    pub feature: String,
    pub href: String,
    /// Absolute native position of the feature element.
    pub origin: Point,
    /// Width and height attributes of the feature element.
    pub container: Size,
    pub align: Alignment,
}

impl PendingGlyph {
    /// Native position for an image of the given natural size.
    #[must_use]
    pub fn position(&self, natural: Size) -> Point {
        let offset = self.align.offset(self.container, natural);
        Point::new(self.origin.x + offset.x, self.origin.y + offset.y)
    }

    /// Insert the loaded glyph as the last child of the root.
    pub fn insert(&self, doc: &mut DocStore, natural: Size) -> NodeId {
        let pos = self.position(natural);
        let image = doc.create_element("image");
        doc.set_attr(image, "href", self.href.as_str());
        doc.set_attr(image, "width", format!("{:.1}", natural.width));
        doc.set_attr(image, "height", format!("{:.1}", natural.height));
        doc.set_attr(image, "x", "0");
        doc.set_attr(image, "y", "0");
        doc.set_attr(image, "class", IMAGE_CLASS);
        doc.set_attr(image, "transform", format!("translate({:.1} {:.1})", pos.x, pos.y));
        let root = doc.root();
        doc.append_child(root, image);
        debug!(feature = %self.feature, x = pos.x, y = pos.y, "inserted glyph");
        image
    }
}

/// Outcome of applying a feature map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayReport {
    /// Elements matched across all entries.
    pub matched: usize,
    /// Highlight, link or notes changes made.
    pub changes: usize,
    pub glyphs: Vec<PendingGlyph>,
}

/// Apply `map` to `doc`.
///
/// # Errors
///
/// Returns [`OverlayError::Alignment`] for an unknown alignment keyword. All
/// alignments are checked before anything is written, so a failed
/// application leaves the document untouched.
pub fn apply(doc: &mut DocStore, map: &FeatureMap) -> Result<OverlayReport, OverlayError> {
    let alignments = map
        .features
        .iter()
        .map(|entry| entry.glyph.as_ref().map(|g| g.align.parse::<Alignment>()).transpose())
        .collect::<Result<Vec<_>, _>>()?;

    let mut report = OverlayReport::default();
    for (entry, alignment) in map.features.iter().zip(alignments) {
        for tag in doc.elements_with_attr("data-feature", &entry.feature) {
            report.matched += 1;
            let is_header = doc.attr(tag, "data-header").is_some();
            let is_group = doc.attr(tag, "data-group").is_some();

            if let Some(fill) = entry.highlight.as_deref().filter(|h| !h.is_empty() && !is_header) {
                doc.set_style(tag, "fill", fill);
                report.changes += 1;
            }

            if let (Some(glyph), Some(align)) = (&entry.glyph, &alignment) {
                if !is_header {
                    match glyphs::find(&glyph.label) {
                        Some(item) => report.glyphs.push(PendingGlyph {
                            feature: entry.feature.clone(),
                            href: item.image.to_owned(),
                            origin: absolute_position(doc, tag),
                            container: Size::new(doc.number_attr(tag, "width"), doc.number_attr(tag, "height")),
                            align: align.clone(),
                        }),
                        None => warn!(label = %glyph.label, feature = %entry.feature, "unknown glyph"),
                    }
                }
            }

            if let Some(link) = entry.link.as_deref().filter(|_| !is_group) {
                if apply_link(doc, tag, link) {
                    report.changes += 1;
                }
            }

            if let Some(notes) = entry.notes.as_deref().filter(|n| !n.is_empty() && !is_group) {
                let title = match doc.find_descendant(tag, "title") {
                    Some(title) => title,
                    None => {
                        let title = doc.create_element("title");
                        doc.append_child(tag, title);
                        title
                    }
                };
                doc.set_text_content(title, notes);
                report.changes += 1;
            }
        }
    }

    info!(title = %map.title, entries = map.features.len(), matched = report.matched, glyphs = report.glyphs.len(), "applied feature map");
    Ok(report)
}

fn apply_link(doc: &mut DocStore, tag: NodeId, link: &str) -> bool {
    let anchor = doc.closest(tag, "a");
    match anchor {
        Some(a) if !link.is_empty() => doc.set_attr(a, "href", link),
        None if !link.is_empty() => {
            let a = doc.create_element("a");
            doc.set_attr(a, "target", "_blank");
            doc.set_attr(a, "href", link);
            doc.wrap(tag, a);
        }
        Some(a) => return doc.remove_attr(a, "href").is_some(),
        None => return false,
    }
    true
}

/// Position of an element relative to the element itself: its translate
/// plus its `x`/`y` attributes.
#[must_use]
pub fn relative_position(doc: &DocStore, node: NodeId) -> Point {
    let mut p = doc.attr(node, "transform").and_then(translate_of).unwrap_or_default();
    p.x += doc.number_attr(node, "x");
    p.y += doc.number_attr(node, "y");
    p
}

/// Position of an element in root coordinates, summing
/// [`relative_position`] over the element and its ancestors below the root.
#[must_use]
pub fn absolute_position(doc: &DocStore, node: NodeId) -> Point {
    let root = doc.root();
    std::iter::once(node).chain(doc.ancestors(node)).take_while(|n| *n != root).fold(Point::default(), |acc, n| {
        let p = relative_position(doc, n);
        Point::new(acc.x + p.x, acc.y + p.y)
    })
}
