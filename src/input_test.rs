#![allow(clippy::float_cmp)]

use super::*;

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn none() -> Modifiers {
    Modifiers::default()
}

fn down(button: Button, x: f64, y: f64) -> InputEvent {
    InputEvent::MouseDown { target: None, point: pt(x, y), button, modifiers: none() }
}

fn mv(x: f64, y: f64) -> InputEvent {
    InputEvent::MouseMove { target: None, point: pt(x, y), modifiers: none() }
}

fn up(button: Button) -> InputEvent {
    InputEvent::MouseUp { point: pt(0.0, 0.0), button, modifiers: none() }
}

fn touch(x: f64, y: f64) -> Touch {
    Touch { target: None, point: pt(x, y) }
}

// =============================================================
// EditMode / Modifiers
// =============================================================

#[test]
fn edit_mode_default_is_off() {
    assert_eq!(EditMode::default(), EditMode::Off);
    assert_eq!(EditMode::Off.root_class(), None);
    assert_eq!(EditMode::Notes.root_class(), Some("notes-mode"));
}

#[test]
fn tool_colour_modes() {
    let with: Vec<_> = EditMode::ALL.into_iter().filter(|m| m.has_tool_colour()).collect();
    assert_eq!(with, vec![EditMode::Highlight, EditMode::Draw, EditMode::Text]);
}

#[test]
fn highlight_slot_follows_shift_ctrl() {
    assert_eq!(none().highlight_slot(), 0);
    assert_eq!(Modifiers { shift: true, ..none() }.highlight_slot(), 1);
    assert_eq!(Modifiers { ctrl: true, ..none() }.highlight_slot(), 2);
    assert_eq!(Modifiers { shift: true, ctrl: true, ..none() }.highlight_slot(), 3);
}

// =============================================================
// Mouse
// =============================================================

#[test]
fn primary_press_without_movement_is_click() {
    let mut n = GestureNormalizer::new();
    let g = n.handle(&down(Button::Primary, 10.0, 10.0));
    assert!(matches!(g[..], [Gesture::PointerDown { .. }]));
    assert!(n.handle(&mv(11.0, 11.0)).is_empty());
    let g = n.handle(&up(Button::Primary));
    assert_eq!(g, vec![Gesture::PointerUp, Gesture::Click { target: None, modifiers: none() }]);
}

#[test]
fn movement_past_threshold_is_drag() {
    let mut n = GestureNormalizer::new();
    n.handle(&down(Button::Primary, 10.0, 10.0));
    let g = n.handle(&mv(12.0, 11.0));
    assert_eq!(g, vec![Gesture::PointerMove { point: pt(12.0, 11.0), modifiers: none() }]);
    // Once dragging, small moves pass through.
    let g = n.handle(&mv(12.5, 11.0));
    assert_eq!(g.len(), 1);
    assert_eq!(n.handle(&up(Button::Primary)), vec![Gesture::PointerUp]);
}

#[test]
fn move_without_press_is_ignored() {
    let mut n = GestureNormalizer::new();
    assert!(n.handle(&mv(100.0, 100.0)).is_empty());
}

#[test]
fn secondary_drag_erases_hovered_nodes() {
    let doc = crate::doc::DocStore::parse("<svg><rect/></svg>").unwrap();
    let rect = doc.find_descendant(doc.root(), "rect").unwrap();

    let mut n = GestureNormalizer::new();
    assert!(n.handle(&down(Button::Secondary, 0.0, 0.0)).is_empty());
    let g = n.handle(&InputEvent::MouseMove { target: Some(rect), point: pt(10.0, 0.0), modifiers: none() });
    assert_eq!(g, vec![Gesture::EraseMove { target: rect }]);
    assert!(n.handle(&mv(20.0, 0.0)).is_empty());
    assert_eq!(n.handle(&up(Button::Secondary)), vec![Gesture::PointerUp]);
}

#[test]
fn secondary_click_without_movement() {
    let mut n = GestureNormalizer::new();
    n.handle(&down(Button::Secondary, 5.0, 5.0));
    let g = n.handle(&up(Button::Secondary));
    assert_eq!(g, vec![Gesture::PointerUp, Gesture::SecondaryClick { target: None }]);
}

#[test]
fn stray_mouse_up_still_cancels() {
    let mut n = GestureNormalizer::new();
    assert_eq!(n.handle(&up(Button::Primary)), vec![Gesture::PointerUp]);
}

// =============================================================
// Touch
// =============================================================

#[test]
fn single_touch_tap_is_click() {
    let mut n = GestureNormalizer::new();
    let g = n.handle(&InputEvent::TouchStart { touches: vec![touch(5.0, 5.0)], modifiers: none() });
    assert!(matches!(g[..], [Gesture::PointerDown { .. }]));
    assert_eq!(n.touch_count(), 1);
    let g = n.handle(&InputEvent::TouchEnd { touches: vec![], modifiers: none() });
    assert_eq!(g, vec![Gesture::PointerUp, Gesture::Click { target: None, modifiers: none() }]);
    assert_eq!(n.touch_count(), 0);
}

#[test]
fn single_touch_drag_moves() {
    let mut n = GestureNormalizer::new();
    n.handle(&InputEvent::TouchStart { touches: vec![touch(5.0, 5.0)], modifiers: none() });
    let g = n.handle(&InputEvent::TouchMove { touches: vec![touch(50.0, 5.0)], modifiers: none() });
    assert_eq!(g, vec![Gesture::PointerMove { point: pt(50.0, 5.0), modifiers: none() }]);
    let g = n.handle(&InputEvent::TouchEnd { touches: vec![], modifiers: none() });
    assert_eq!(g, vec![Gesture::PointerUp]);
}

#[test]
fn second_finger_ends_drag_and_starts_pinch() {
    let mut n = GestureNormalizer::new();
    n.handle(&InputEvent::TouchStart { touches: vec![touch(0.0, 0.0)], modifiers: none() });
    let g = n.handle(&InputEvent::TouchStart { touches: vec![touch(0.0, 0.0), touch(100.0, 0.0)], modifiers: none() });
    assert_eq!(g, vec![Gesture::PointerUp]);
    assert_eq!(n.touch_count(), 2);
    assert_eq!(n.pinch_distance(), 100.0);

    let g = n.handle(&InputEvent::TouchMove { touches: vec![touch(0.0, 0.0), touch(130.0, 20.0)], modifiers: none() });
    assert_eq!(g, vec![Gesture::PinchUpdate { a: pt(0.0, 0.0), b: pt(130.0, 20.0), delta: 50.0 }]);
    assert_eq!(n.pinch_distance(), 150.0);
}

#[test]
fn two_fingers_at_once_start_pinch_without_up() {
    let mut n = GestureNormalizer::new();
    let g = n.handle(&InputEvent::TouchStart { touches: vec![touch(0.0, 0.0), touch(10.0, 10.0)], modifiers: none() });
    assert!(g.is_empty());
    assert_eq!(n.touch_count(), 2);
}

#[test]
fn pinch_deadband_ignores_tiny_changes() {
    let mut n = GestureNormalizer::new();
    n.handle(&InputEvent::TouchStart { touches: vec![touch(0.0, 0.0), touch(10.0, 0.0)], modifiers: none() });
    let g = n.handle(&InputEvent::TouchMove { touches: vec![touch(0.0, 0.0), touch(10.05, 0.0)], modifiers: none() });
    assert!(g.is_empty());
}

#[test]
fn third_finger_cancels() {
    let mut n = GestureNormalizer::new();
    n.handle(&InputEvent::TouchStart { touches: vec![touch(0.0, 0.0), touch(10.0, 0.0)], modifiers: none() });
    let g = n.handle(&InputEvent::TouchStart {
        touches: vec![touch(0.0, 0.0), touch(10.0, 0.0), touch(20.0, 0.0)],
        modifiers: none(),
    });
    assert_eq!(g, vec![Gesture::PointerUp]);
    assert_eq!(n.touch_count(), 0);
}

#[test]
fn pinch_release_does_not_click() {
    let mut n = GestureNormalizer::new();
    n.handle(&InputEvent::TouchStart { touches: vec![touch(0.0, 0.0), touch(10.0, 0.0)], modifiers: none() });
    let g = n.handle(&InputEvent::TouchEnd { touches: vec![touch(0.0, 0.0)], modifiers: none() });
    assert_eq!(g, vec![Gesture::PointerUp]);
}

// =============================================================
// Wheel and dialogs
// =============================================================

#[test]
fn wheel_direction_follows_delta_sign() {
    let mut n = GestureNormalizer::new();
    let wheel = |dy| InputEvent::Wheel { point: pt(1.0, 2.0), delta: WheelDelta { dx: 0.0, dy }, modifiers: none() };
    assert_eq!(n.handle(&wheel(3.0)), vec![Gesture::WheelZoom { direction: -1.0, point: pt(1.0, 2.0) }]);
    assert_eq!(n.handle(&wheel(-120.0)), vec![Gesture::WheelZoom { direction: 1.0, point: pt(1.0, 2.0) }]);
    assert!(n.handle(&wheel(0.05)).is_empty());
}

#[test]
fn open_dialog_suppresses_everything() {
    let mut n = GestureNormalizer::new();
    n.set_dialog_open(true);
    assert!(n.dialog_open());
    assert!(n.handle(&down(Button::Primary, 0.0, 0.0)).is_empty());
    assert!(n.handle(&up(Button::Primary)).is_empty());
    let wheel = InputEvent::Wheel { point: pt(0.0, 0.0), delta: WheelDelta { dx: 0.0, dy: 5.0 }, modifiers: none() };
    assert!(n.handle(&wheel).is_empty());
    n.set_dialog_open(false);
    assert_eq!(n.handle(&down(Button::Primary, 0.0, 0.0)).len(), 1);
}

#[test]
fn manhattan_distance() {
    assert_eq!(manhattan(pt(0.0, 0.0), pt(3.0, -4.0)), 7.0);
}
