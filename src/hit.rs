//! Target resolution: which node a pointer gesture acts on in each edit mode,
//! and classification of annotation nodes by class.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::consts::{DRAW_CLASS, IMAGE_CLASS, QUICK_HIGHLIGHT_CLASSES, TEXT_CLASS};
use crate::doc::{DocStore, NodeId};

/// Kind of an editor-inserted annotation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    Draw,
    Text,
    Image,
}

impl AnnotationKind {
    #[must_use]
    pub fn class(self) -> &'static str {
        match self {
            Self::Draw => DRAW_CLASS,
            Self::Text => TEXT_CLASS,
            Self::Image => IMAGE_CLASS,
        }
    }
}

/// Classify a node by its annotation class.
#[must_use]
pub fn annotation_kind(doc: &DocStore, node: NodeId) -> Option<AnnotationKind> {
    [AnnotationKind::Draw, AnnotationKind::Text, AnnotationKind::Image]
        .into_iter()
        .find(|kind| doc.has_class(node, kind.class()))
}

/// Resolve the shape a highlight click applies to.
///
/// Walks up past `text`/`tspan` wrappers; a group or anchor resolves to its
/// first `rect`, else its first `path`; a rect, path, circle or ellipse is
/// its own target.
#[must_use]
pub fn highlight_target(doc: &DocStore, start: NodeId) -> Option<NodeId> {
    let mut target = start;
    while !doc.is_element(target) || doc.is_named(target, "tspan") || doc.is_named(target, "text") {
        target = doc.parent(target)?;
    }

    if doc.is_named(target, "g") || doc.is_named(target, "a") {
        return doc.find_descendant(target, "rect").or_else(|| doc.find_descendant(target, "path"));
    }

    ["rect", "path", "circle", "ellipse"].into_iter().any(|n| doc.is_named(target, n)).then_some(target)
}

/// The first quick-highlight class carried by the node.
#[must_use]
pub fn quick_highlight_class(doc: &DocStore, node: NodeId) -> Option<&'static str> {
    QUICK_HIGHLIGHT_CLASSES.into_iter().find(|c| doc.has_class(node, c))
}

/// Nearest `a` element at or above the node, below the root.
#[must_use]
pub fn link_ancestor(doc: &DocStore, node: NodeId) -> Option<NodeId> {
    doc.closest(node, "a")
}

/// Whether a link can be attached to or edited on the node.
#[must_use]
pub fn is_link_eligible(doc: &DocStore, node: NodeId) -> bool {
    link_ancestor(doc, node).is_some() || annotation_kind(doc, node).is_some()
}

/// Whether notes can be attached for the node: annotation nodes, and nodes inside a group or anchor.
#[must_use]
pub fn is_notes_eligible(doc: &DocStore, node: NodeId) -> bool {
    if annotation_kind(doc, node).is_some() {
        return true;
    }
    doc.ancestors(node)
        .take_while(|a| *a != doc.root())
        .any(|a| doc.is_named(a, "g") || doc.is_named(a, "a"))
}

/// The ancestor (or self) directly beneath the root, which owns the node's `title`.
#[must_use]
pub fn top_level_ancestor(doc: &DocStore, node: NodeId) -> Option<NodeId> {
    let root = doc.root();
    std::iter::once(node).chain(doc.ancestors(node)).find(|n| doc.parent(*n) == Some(root))
}

const NAMED_COLOURS: [(&str, &str); 13] = [
    ("red", "#FF0000"),
    ("orange", "#FFA500"),
    ("yellow", "#FFFF00"),
    ("lime", "#00FF00"),
    ("green", "#008000"),
    ("navy", "#000080"),
    ("blue", "#0000FF"),
    ("aqua", "#00FFFF"),
    ("fuchsia", "#FF00FF"),
    ("purple", "#800080"),
    ("black", "#000000"),
    ("gray", "#808080"),
    ("white", "#FFFFFF"),
];

/// Normalize a CSS colour to uppercase `#RRGGBB` where possible.
///
/// Handles `#rgb`, `#rrggbb`, `rgb(r, g, b)` and the palette's named colours.
/// Anything else is returned trimmed and uppercased so comparisons stay exact.
#[must_use]
pub fn normalize_colour(colour: &str) -> String {
    let colour = colour.trim();
    let lower = colour.to_ascii_lowercase();

    if let Some((_, hex)) = NAMED_COLOURS.iter().find(|(name, _)| *name == lower) {
        return (*hex).to_owned();
    }

    if let Some(hex) = lower.strip_prefix('#') {
        if hex.len() == 3 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            let expanded: String = hex.chars().flat_map(|c| [c, c]).collect();
            return format!("#{}", expanded.to_ascii_uppercase());
        }
        return colour.to_ascii_uppercase();
    }

    if let Some(args) = lower.strip_prefix("rgb(").and_then(|s| s.strip_suffix(')')) {
        let mut channels = Vec::with_capacity(3);
        for channel in args.split(',') {
            match channel.trim().parse::<u8>() {
                Ok(value) => channels.push(value),
                Err(_) => return colour.to_ascii_uppercase(),
            }
        }
        if let [r, g, b] = channels[..] {
            return format!("#{r:02X}{g:02X}{b:02X}");
        }
    }

    colour.to_ascii_uppercase()
}

/// Compare two CSS colours after normalization.
#[must_use]
pub fn same_colour(a: &str, b: &str) -> bool {
    normalize_colour(a) == normalize_colour(b)
}
