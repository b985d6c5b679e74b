//! Input model: edit modes, modifier keys, raw host events, and the gesture normalizer.
//!
//! The host forwards raw mouse, touch and wheel events as [`InputEvent`]s.
//! [`GestureNormalizer`] folds them into the small abstract [`Gesture`] set the
//! edit-mode state machine understands: a pointer down/move/up triplet shared by
//! mouse and single-finger touch, clicks distinguished from drags by a small
//! movement threshold, secondary-button erase strokes, two-finger pinch deltas,
//! and wheel zoom steps.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use std::fmt;

use crate::camera::Point;
use crate::consts::{DRAG_THRESHOLD_PX, PINCH_DEADBAND, WHEEL_DEADBAND};
use crate::doc::NodeId;

/// Which editing tool is active. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EditMode {
    /// Viewing only; drags pan the diagram.
    #[default]
    Off,
    Highlight,
    Draw,
    Text,
    Image,
    Link,
    Notes,
}

impl EditMode {
    pub const ALL: [Self; 7] = [Self::Off, Self::Highlight, Self::Draw, Self::Text, Self::Image, Self::Link, Self::Notes];

    /// Class set on the root element while this mode is active, if any.
    #[must_use]
    pub fn root_class(self) -> Option<&'static str> {
        match self {
            Self::Off => None,
            Self::Highlight => Some("highlight-mode"),
            Self::Draw => Some("draw-mode"),
            Self::Text => Some("text-mode"),
            Self::Image => Some("image-mode"),
            Self::Link => Some("link-mode"),
            Self::Notes => Some("notes-mode"),
        }
    }

    /// Whether digit keys pick a tool colour in this mode.
    #[must_use]
    pub fn has_tool_colour(self) -> bool {
        matches!(self, Self::Highlight | Self::Draw | Self::Text)
    }
}

impl fmt::Display for EditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Quick-highlight slot (0-based) selected by the Shift/Ctrl combination.
    #[must_use]
    pub fn highlight_slot(self) -> usize {
        match (self.shift, self.ctrl) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
        }
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button.
    Primary,
    /// Middle mouse button.
    Middle,
    /// Right mouse button.
    Secondary,
}

/// A keyboard key as reported by the browser (e.g. `"ArrowUp"`, `"+"`, `"3"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelDelta {
    pub dx: f64,
    /// Positive scrolls down, which zooms out.
    pub dy: f64,
}

/// One active touch point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Touch {
    pub target: Option<NodeId>,
    pub point: Point,
}

/// Raw input forwarded by the host. `target` is the diagram node under the pointer, if any.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    MouseDown { target: Option<NodeId>, point: Point, button: Button, modifiers: Modifiers },
    MouseMove { target: Option<NodeId>, point: Point, modifiers: Modifiers },
    MouseUp { point: Point, button: Button, modifiers: Modifiers },
    /// `touches` lists every touch still on the surface after the change.
    TouchStart { touches: Vec<Touch>, modifiers: Modifiers },
    TouchMove { touches: Vec<Touch>, modifiers: Modifiers },
    TouchEnd { touches: Vec<Touch>, modifiers: Modifiers },
    Wheel { point: Point, delta: WheelDelta, modifiers: Modifiers },
}

/// Abstract gestures consumed by the edit-mode state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    PointerDown { target: Option<NodeId>, point: Point, modifiers: Modifiers },
    PointerMove { point: Point, modifiers: Modifiers },
    PointerUp,
    /// Primary press released without moving past the drag threshold.
    Click { target: Option<NodeId>, modifiers: Modifiers },
    /// Secondary press released without moving.
    SecondaryClick { target: Option<NodeId> },
    /// Secondary-button drag passing over `target`.
    EraseMove { target: NodeId },
    /// Two-finger move; `delta` is the change in Manhattan distance between the fingers.
    PinchUpdate { a: Point, b: Point, delta: f64 },
    /// `direction` is +1 to zoom in, -1 to zoom out.
    WheelZoom { direction: f64, point: Point },
}

#[derive(Debug, Clone, Copy)]
struct Press {
    button: Button,
    origin: Point,
    target: Option<NodeId>,
    moved: bool,
}

impl Press {
    /// Record movement to `point`; returns `false` while still inside the click threshold.
    fn track(&mut self, point: Point) -> bool {
        if !self.moved && manhattan(self.origin, point) >= DRAG_THRESHOLD_PX {
            self.moved = true;
        }
        self.moved
    }
}

/// Folds raw mouse, touch and wheel events into [`Gesture`]s.
#[derive(Debug, Clone, Default)]
pub struct GestureNormalizer {
    press: Option<Press>,
    touch_count: usize,
    pinch_distance: f64,
    dialog_open: bool,
}

impl GestureNormalizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// While a dialog is open every event is swallowed.
    pub fn set_dialog_open(&mut self, open: bool) {
        self.dialog_open = open;
        if open {
            self.press = None;
            self.touch_count = 0;
        }
    }

    #[must_use]
    pub fn dialog_open(&self) -> bool {
        self.dialog_open
    }

    /// Number of fingers currently tracked (0, 1 or 2).
    #[must_use]
    pub fn touch_count(&self) -> usize {
        self.touch_count
    }

    /// Baseline distance for the current pinch.
    #[must_use]
    pub fn pinch_distance(&self) -> f64 {
        self.pinch_distance
    }

    /// Translate one raw event into zero or more gestures, in order.
    pub fn handle(&mut self, event: &InputEvent) -> Vec<Gesture> {
        if self.dialog_open {
            return Vec::new();
        }
        match event {
            InputEvent::MouseDown { target, point, button, modifiers } => {
                self.mouse_down(*target, *point, *button, *modifiers)
            }
            InputEvent::MouseMove { target, point, modifiers } => self.mouse_move(*target, *point, *modifiers),
            InputEvent::MouseUp { button, modifiers, .. } => self.mouse_up(*button, *modifiers),
            InputEvent::TouchStart { touches, modifiers } => self.touch_start(touches, *modifiers),
            InputEvent::TouchMove { touches, modifiers } => self.touch_move(touches, *modifiers),
            InputEvent::TouchEnd { modifiers, .. } => self.touch_end(*modifiers),
            InputEvent::Wheel { point, delta, .. } => Self::wheel(*point, *delta),
        }
    }

    fn mouse_down(&mut self, target: Option<NodeId>, point: Point, button: Button, modifiers: Modifiers) -> Vec<Gesture> {
        self.press = Some(Press { button, origin: point, target, moved: false });
        match button {
            Button::Primary => vec![Gesture::PointerDown { target, point, modifiers }],
            Button::Middle | Button::Secondary => Vec::new(),
        }
    }

    fn mouse_move(&mut self, target: Option<NodeId>, point: Point, modifiers: Modifiers) -> Vec<Gesture> {
        let Some(press) = self.press.as_mut() else {
            return Vec::new();
        };
        if !press.track(point) {
            return Vec::new();
        }
        match (press.button, target) {
            (Button::Primary, _) => vec![Gesture::PointerMove { point, modifiers }],
            (Button::Secondary, Some(target)) => vec![Gesture::EraseMove { target }],
            _ => Vec::new(),
        }
    }

    fn mouse_up(&mut self, button: Button, modifiers: Modifiers) -> Vec<Gesture> {
        let Some(press) = self.press.take() else {
            return vec![Gesture::PointerUp];
        };
        let mut out = vec![Gesture::PointerUp];
        if !press.moved && press.button == button {
            match button {
                Button::Primary => out.push(Gesture::Click { target: press.target, modifiers }),
                Button::Secondary => out.push(Gesture::SecondaryClick { target: press.target }),
                Button::Middle => {}
            }
        }
        out
    }

    fn touch_start(&mut self, touches: &[Touch], modifiers: Modifiers) -> Vec<Gesture> {
        match (self.touch_count, touches) {
            (0, [touch]) => {
                self.press = Some(Press { button: Button::Primary, origin: touch.point, target: touch.target, moved: false });
                self.touch_count = 1;
                vec![Gesture::PointerDown { target: touch.target, point: touch.point, modifiers }]
            }
            (count, [a, b]) if count < 2 => {
                let mut out = Vec::new();
                if count == 1 {
                    out.push(Gesture::PointerUp);
                }
                self.press = None;
                self.pinch_distance = manhattan(a.point, b.point);
                self.touch_count = 2;
                out
            }
            (0, _) => Vec::new(),
            _ => {
                self.press = None;
                self.touch_count = 0;
                vec![Gesture::PointerUp]
            }
        }
    }

    fn touch_move(&mut self, touches: &[Touch], modifiers: Modifiers) -> Vec<Gesture> {
        match (self.touch_count, touches) {
            (1, [touch]) => {
                let Some(press) = self.press.as_mut() else {
                    return Vec::new();
                };
                if press.track(touch.point) {
                    vec![Gesture::PointerMove { point: touch.point, modifiers }]
                } else {
                    Vec::new()
                }
            }
            (2, [a, b]) => {
                let distance = manhattan(a.point, b.point);
                let delta = distance - self.pinch_distance;
                if delta.abs() < PINCH_DEADBAND {
                    return Vec::new();
                }
                self.pinch_distance = distance;
                vec![Gesture::PinchUpdate { a: a.point, b: b.point, delta }]
            }
            _ => Vec::new(),
        }
    }

    fn touch_end(&mut self, modifiers: Modifiers) -> Vec<Gesture> {
        let press = self.press.take();
        let count = std::mem::take(&mut self.touch_count);
        if count == 0 {
            return Vec::new();
        }
        let mut out = vec![Gesture::PointerUp];
        if let Some(press) = press.filter(|p| count == 1 && !p.moved) {
            out.push(Gesture::Click { target: press.target, modifiers });
        }
        out
    }

    fn wheel(point: Point, delta: WheelDelta) -> Vec<Gesture> {
        if delta.dy.abs() < WHEEL_DEADBAND || delta.dy.is_nan() {
            return Vec::new();
        }
        let direction = if delta.dy > 0.0 { -1.0 } else { 1.0 };
        vec![Gesture::WheelZoom { direction, point }]
    }
}

/// Cheap distance estimate used for drag and pinch thresholds.
#[must_use]
pub fn manhattan(a: Point, b: Point) -> f64 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}
