#![allow(clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn camera(native: (f64, f64), viewport: (f64, f64)) -> Camera {
    Camera {
        native: Size::new(native.0, native.1),
        viewport: Size::new(viewport.0, viewport.1),
        ..Camera::default()
    }
}

// --- round_to ---

#[test]
fn round_to_one_decimal() {
    assert_eq!(round_to(166.54, 1), 166.5);
    assert_eq!(round_to(166.56, 1), 166.6);
}

#[test]
fn round_to_whole() {
    assert_eq!(round_to(666.666, 0), 667.0);
}

// --- FitMode parsing ---

#[test]
fn fit_mode_parses_case_insensitively() {
    assert_eq!("Fit".parse::<FitMode>(), Ok(FitMode::Fit));
    assert_eq!("FIT WIDTH".parse::<FitMode>(), Ok(FitMode::FitWidth));
    assert_eq!("fit-height".parse::<FitMode>(), Ok(FitMode::FitHeight));
    assert_eq!("fill".parse::<FitMode>(), Ok(FitMode::Fill));
    assert_eq!("Original".parse::<FitMode>(), Ok(FitMode::Original));
}

#[test]
fn fit_mode_unknown_is_error() {
    let err = "stretch".parse::<FitMode>().unwrap_err();
    assert_eq!(err, FitModeError("stretch".into()));
    assert!(err.to_string().contains("stretch"));
}

#[test]
fn fit_mode_display_round_trips() {
    for mode in [FitMode::Fit, FitMode::FitWidth, FitMode::FitHeight, FitMode::Fill, FitMode::Original] {
        assert_eq!(mode.to_string().parse::<FitMode>(), Ok(mode));
    }
}

// --- fit ---

#[test]
fn fit_height_bound_diagram() {
    let mut cam = camera((800.0, 600.0), (1000.0, 500.0));
    cam.fit(FitMode::Fit);
    assert_eq!(cam.size, Size::new(667.0, 500.0));
    assert_eq!(cam.left, 166.5);
    assert_eq!(cam.top, 0.0);
    assert!(approx_eq(cam.ratio_x, 500.0 / 600.0));
    assert!(approx_eq(cam.ratio_y, 500.0 / 600.0));
}

#[test]
fn fit_never_exceeds_viewport() {
    let cases = [
        ((800.0, 600.0), (1000.0, 500.0)),
        ((123.0, 457.0), (640.0, 480.0)),
        ((3000.0, 20.0), (1920.0, 1080.0)),
        ((1.0, 1.0), (333.0, 777.0)),
    ];
    for (native, viewport) in cases {
        let mut cam = camera(native, viewport);
        cam.fit(FitMode::Fit);
        assert!(cam.size.width <= viewport.0 + 0.5);
        assert!(cam.size.height <= viewport.1 + 0.5);
        let width_match = (cam.size.width - viewport.0).abs() <= 0.5;
        let height_match = (cam.size.height - viewport.1).abs() <= 0.5;
        assert!(width_match || height_match, "{native:?} in {viewport:?}");
    }
}

#[test]
fn fit_width_matches_viewport_width() {
    let mut cam = camera((800.0, 600.0), (1000.0, 500.0));
    cam.fit(FitMode::FitWidth);
    assert_eq!(cam.size, Size::new(1000.0, 750.0));
    assert_eq!(cam.left, 0.0);
    assert_eq!(cam.top, -125.0);
}

#[test]
fn fit_height_matches_viewport_height() {
    let mut cam = camera((800.0, 600.0), (1000.0, 500.0));
    cam.fit(FitMode::FitHeight);
    assert_eq!(cam.size.height, 500.0);
}

#[test]
fn fill_covers_viewport() {
    let mut cam = camera((800.0, 600.0), (1000.0, 500.0));
    cam.fit(FitMode::Fill);
    assert!(cam.size.width >= 1000.0);
    assert!(cam.size.height >= 500.0);
}

#[test]
fn original_keeps_native_size() {
    let mut cam = camera((800.0, 600.0), (1000.0, 500.0));
    cam.fit(FitMode::Original);
    assert_eq!(cam.size, Size::new(800.0, 600.0));
    assert_eq!(cam.ratio_x, 1.0);
    assert_eq!(cam.left, 100.0);
    assert_eq!(cam.top, -50.0);
}

#[test]
fn fit_resets_zoom() {
    let mut cam = camera((800.0, 600.0), (1000.0, 500.0));
    cam.zoom = 300.0;
    cam.zoom_pending = true;
    cam.fit(FitMode::Fit);
    assert_eq!(cam.zoom, 100.0);
    assert!(!cam.zoom_pending);
}

// --- conversions ---

#[test]
fn screen_to_native_inverts_fit() {
    let mut cam = camera((800.0, 600.0), (1000.0, 500.0));
    cam.fit(FitMode::Fit);
    let native = cam.screen_to_native(Point::new(166.5, 0.0));
    assert!(approx_eq(native.x, 0.0));
    assert!(approx_eq(native.y, 0.0));

    let back = cam.native_to_screen(Point::new(400.0, 300.0));
    let again = cam.screen_to_native(back);
    assert!(approx_eq(again.x, 400.0));
    assert!(approx_eq(again.y, 300.0));
}

// --- panning ---

#[test]
fn pan_to_rounds_to_one_decimal() {
    let mut cam = Camera::default();
    cam.pan_to(10.04, -3.26);
    assert_eq!(cam.left, 10.0);
    assert_eq!(cam.top, -3.3);
}

#[test]
fn scroll_step_uses_matching_viewport_axis() {
    let mut cam = camera((100.0, 100.0), (1000.0, 500.0));
    cam.scroll_step(0.1, 0.0);
    assert_eq!(cam.left, -100.0);
    assert_eq!(cam.top, 0.0);
    cam.scroll_step(0.0, 0.1);
    assert_eq!(cam.top, -50.0);
}

#[test]
fn arrow_step_moves_five_percent() {
    let mut cam = camera((100.0, 100.0), (1000.0, 500.0));
    cam.arrow_step(-1.0, 1.0);
    assert_eq!(cam.left, 50.0);
    assert_eq!(cam.top, -25.0);
}

// --- zoom ---

#[test]
fn step_zoom_in_from_base_is_full_step() {
    let mut cam = Camera::default();
    cam.step_zoom(20.0);
    assert_eq!(cam.zoom, 120.0);
    assert!(cam.zoom_pending);
}

#[test]
fn step_zoom_out_from_base_is_quartered() {
    let mut cam = Camera::default();
    cam.step_zoom(-20.0);
    assert_eq!(cam.zoom, 95.0);
}

#[test]
fn step_zoom_below_base_is_quartered() {
    let mut cam = Camera { zoom: 50.0, ..Camera::default() };
    cam.step_zoom(20.0);
    assert_eq!(cam.zoom, 55.0);
}

#[test]
fn step_zoom_clamps_to_range() {
    let mut cam = Camera::default();
    for _ in 0..100 {
        cam.step_zoom(-1000.0);
        assert!(cam.zoom >= ZOOM_MIN);
    }
    assert_eq!(cam.zoom, ZOOM_MIN);
    cam.step_zoom(1.0e9);
    assert_eq!(cam.zoom, ZOOM_MAX);
    cam.step_zoom(-1.0e9);
    assert_eq!(cam.zoom, ZOOM_MIN);
    cam.step_zoom(1.0e9);
    assert_eq!(cam.zoom, ZOOM_MAX);
}

#[test]
fn step_zoom_ignores_non_finite_steps() {
    let mut cam = Camera::default();
    cam.step_zoom(f64::INFINITY);
    assert_eq!(cam.zoom, ZOOM_BASE);
    assert!(!cam.zoom_pending);
    cam.step_zoom(f64::NAN);
    cam.step_zoom(f64::NEG_INFINITY);
    assert_eq!(cam.zoom, ZOOM_BASE);
    assert!(!cam.zoom_pending);
}

#[test]
fn apply_pending_zoom_without_step_is_noop() {
    let mut cam = camera((800.0, 600.0), (1000.0, 500.0));
    cam.fit(FitMode::Fit);
    assert!(!cam.apply_pending_zoom(Point::new(0.0, 0.0)));
}

#[test]
fn apply_pending_zoom_keeps_pointer_fixed() {
    let mut cam = camera((800.0, 600.0), (1000.0, 600.0));
    cam.fit(FitMode::Fit);
    assert_eq!(cam.size, Size::new(800.0, 600.0));
    assert_eq!(cam.left, 100.0);

    let pointer = Point::new(500.0, 300.0);
    let before = cam.screen_to_native(pointer);

    cam.step_zoom(100.0);
    assert!(cam.apply_pending_zoom(pointer));
    assert_eq!(cam.size, Size::new(1600.0, 1200.0));
    assert_eq!(cam.left, -300.0);
    assert_eq!(cam.top, -300.0);

    let after = cam.screen_to_native(pointer);
    assert!(approx_eq(before.x, after.x));
    assert!(approx_eq(before.y, after.y));
    assert!(!cam.zoom_pending);
}

#[test]
fn viewport_center_is_half_viewport() {
    let cam = camera((1.0, 1.0), (640.0, 480.0));
    assert_eq!(cam.viewport_center(), Point::new(320.0, 240.0));
}
