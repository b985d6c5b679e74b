use super::*;

#[test]
fn edit_tracker_appends_and_strips_marker() {
    let mut tracker = EditTracker::default();
    let mut title = String::from("Network");

    assert!(tracker.set(true, &mut title));
    assert_eq!(title, "Network *");
    assert!(tracker.has_edits());

    assert!(!tracker.set(true, &mut title));
    assert_eq!(title, "Network *");

    assert!(tracker.set(false, &mut title));
    assert_eq!(title, "Network");
    assert!(!tracker.has_edits());
}

#[test]
fn edit_tracker_clear_leaves_unmarked_title() {
    let mut tracker = EditTracker::default();
    let mut title = String::from("A");
    tracker.set(true, &mut title);
    title = String::from("Renamed");
    tracker.set(false, &mut title);
    assert_eq!(title, "Renamed");
}

#[test]
fn drag_actions_map_to_body_markers() {
    assert_eq!(DragAction::Paint.body_marker().class_name(), "drawing");
    assert_eq!(DragAction::Scroll.body_marker().class_name(), "scrolling");
    assert_eq!(DragAction::Erase.body_marker(), BodyMarker::Erasing);
    assert_eq!(DragAction::Rotate.body_marker(), BodyMarker::Rotating);
}

#[test]
fn session_defaults() {
    let session = Session::new();
    assert_eq!(session.mode, EditMode::Off);
    assert_eq!(session.last_mode, EditMode::Highlight);
    assert!(session.target.is_none());
    assert!(!session.active);
}

#[test]
fn reset_gesture_clears_drag_state() {
    let mut session = Session { active: true, ignore_click: true, action: Some(DragAction::Move), ..Session::new() };
    session.reset_gesture();
    assert!(!session.active);
    assert!(!session.ignore_click);
    assert_eq!(session.action, None);
}
