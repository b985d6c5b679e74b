//! Session edit state: the transient, in-memory bookkeeping for one loaded diagram.
//!
//! Created when a diagram loads and discarded on navigation. Holds the active
//! edit mode, the node the current gesture targets, the in-progress drag action,
//! pointer bookkeeping, and the unsaved-changes flag.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use crate::camera::Point;
use crate::doc::NodeId;
use crate::input::EditMode;
use crate::transform::Transform;

/// What a primary-button drag does once it starts moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragAction {
    /// Freehand painting into a new draw path.
    Paint,
    /// Translate the target node.
    Move,
    /// Scale the target node from vertical pointer travel.
    Resize,
    /// Rotate the target node about its translate origin.
    Rotate,
    /// Pan the diagram.
    Scroll,
    /// Secondary-button erase stroke.
    Erase,
}

impl DragAction {
    #[must_use]
    pub fn body_marker(self) -> BodyMarker {
        match self {
            Self::Paint => BodyMarker::Drawing,
            Self::Move => BodyMarker::Moving,
            Self::Resize => BodyMarker::Resizing,
            Self::Rotate => BodyMarker::Rotating,
            Self::Scroll => BodyMarker::Scrolling,
            Self::Erase => BodyMarker::Erasing,
        }
    }
}

/// Page-level "in progress" style markers, used by the host to pick cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMarker {
    Drawing,
    Scrolling,
    Moving,
    Resizing,
    Rotating,
    Erasing,
}

impl BodyMarker {
    #[must_use]
    pub fn class_name(self) -> &'static str {
        match self {
            Self::Drawing => "drawing",
            Self::Scrolling => "scrolling",
            Self::Moving => "moving",
            Self::Resizing => "resizing",
            Self::Rotating => "rotating",
            Self::Erasing => "erasing",
        }
    }
}

/// Unsaved-changes flag, mirrored into the page title as a trailing `" *"`.
#[derive(Debug, Clone, Default)]
pub struct EditTracker {
    has_edits: bool,
}

impl EditTracker {
    #[must_use]
    pub fn has_edits(&self) -> bool {
        self.has_edits
    }

    /// Set the flag, updating `title` to match. Returns `true` when the flag changed.
    pub fn set(&mut self, state: bool, title: &mut String) -> bool {
        if state == self.has_edits {
            return false;
        }
        self.has_edits = state;
        if state {
            title.push_str(" *");
        } else if let Some(stripped) = title.strip_suffix(" *") {
            let len = stripped.len();
            title.truncate(len);
        }
        true
    }
}

/// Transient state for the loaded diagram.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone)]
pub struct Session {
    pub mode: EditMode,
    /// Mode restored when the edit panel is reopened.
    pub last_mode: EditMode,
    /// Node the current gesture acts on.
    pub target: Option<NodeId>,
    /// Transform of `target`, parsed at pointer-down.
    pub transform: Transform,
    /// Scale of `target` when a resize drag started.
    pub start_scale: f64,
    /// Drag action chosen at pointer-down.
    pub action: Option<DragAction>,
    /// A drag is in progress.
    pub active: bool,
    /// The click that ends the current press should be ignored.
    pub ignore_click: bool,
    /// Pointer-down happened inside the diagram, so moves are processed.
    pub tracking: bool,
    /// Screen position of the last pointer-down, paint point, or zoom anchor.
    /// Adjusted by the target's translate for move drags.
    pub pointer: Point,
    /// Diagram offset when the press started, for panning.
    pub scroll_start: Point,
    pub edits: EditTracker,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            mode: EditMode::Off,
            last_mode: EditMode::Highlight,
            target: None,
            transform: Transform::default(),
            start_scale: 1.0,
            action: None,
            active: false,
            ignore_click: false,
            tracking: false,
            pointer: Point::default(),
            scroll_start: Point::default(),
            edits: EditTracker::default(),
        }
    }
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget any in-progress gesture.
    pub fn reset_gesture(&mut self) {
        self.target = None;
        self.action = None;
        self.active = false;
        self.ignore_click = false;
        self.tracking = false;
        self.transform = Transform::default();
    }
}
