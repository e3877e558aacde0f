//! Integration tests for note flow geometry and edge shading.

use notefall::notes::geometry::{has_exited, note_length, note_span, travel, visible_span};
use notefall::notes::shading::{fade_factor, gradient_ratio, shade_pixel};
use notefall::notes::{FlowParams, NoteGlow, NoteSpec, ShadeParams};
use notefall::FadePosition;

const FLOW: FlowParams = FlowParams {
    speed: 180.0,
    track_height: 150.0,
    reverse: false,
};
const BOTTOM: f32 = 400.0;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

// ==================== Note Length ====================

#[test]
fn test_held_note_is_clamped_to_track_height() {
    // 180 px/s for one second would be 180 px.
    assert!(approx(note_length(1000.0, 0.0, 2000.0, &FLOW), 150.0));
}

#[test]
fn test_released_note_keeps_length_and_moves() {
    let length_at_release = note_length(1000.0, 1500.0, 1500.0, &FLOW);
    let length_later = note_length(1000.0, 1500.0, 2500.0, &FLOW);
    assert!(approx(length_at_release, 90.0));
    assert!(approx(length_later, 90.0));

    let at_release = note_span(1000.0, 1500.0, 1500.0, BOTTOM, &FLOW);
    let later = note_span(1000.0, 1500.0, 2500.0, BOTTOM, &FLOW);
    assert!(approx(at_release.top - later.top, 180.0));
    assert!(approx(travel(1500.0, 2500.0, &FLOW), 180.0));
}

#[test]
fn test_zero_speed_freezes_notes() {
    let flow = FlowParams { speed: 0.0, ..FLOW };
    assert_eq!(note_length(1000.0, 0.0, 9000.0, &flow), 0.0);
    assert!(!has_exited(1000.0, 1200.0, 9000.0, BOTTOM, &flow));
}

// ==================== Visibility and Exit ====================

#[test]
fn test_fresh_note_has_no_visible_body_but_stays() {
    assert_eq!(visible_span(1000.0, 0.0, 1000.0, BOTTOM, &FLOW), None);
    assert!(!has_exited(1000.0, 0.0, 1000.0, BOTTOM, &FLOW));
}

#[test]
fn test_visible_span_is_clipped_to_track() {
    // 90 px long, travelled 120 px: the upper 60 px are past the track top.
    let span = visible_span(1000.0, 1500.0, 2166.667, BOTTOM, &FLOW).unwrap();
    assert!(approx(span.top, BOTTOM - 150.0));
    assert!((span.length() - 30.0).abs() < 0.01);
}

#[test]
fn test_exit_happens_at_far_edge() {
    // Bottom edge reaches the track top after 150 px of travel (833.3 ms).
    assert!(!has_exited(1000.0, 1500.0, 2300.0, BOTTOM, &FLOW));
    assert!(has_exited(1000.0, 1500.0, 2340.0, BOTTOM, &FLOW));
}

#[test]
fn test_reverse_flow_exits_at_bottom() {
    let flow = FlowParams {
        reverse: true,
        ..FLOW
    };
    let span = note_span(1000.0, 1500.0, 2000.0, BOTTOM, &flow);
    assert!(approx(span.top, BOTTOM - 150.0 + 90.0));
    assert!(!has_exited(1000.0, 1500.0, 2300.0, BOTTOM, &flow));
    assert!(has_exited(1000.0, 1500.0, 2340.0, BOTTOM, &flow));
}

// ==================== Shading ====================

#[test]
fn test_auto_fade_flips_with_reverse() {
    let forward = ShadeParams {
        track_height: 150.0,
        reverse: false,
        fade_position: FadePosition::Auto,
    };
    let reverse = ShadeParams {
        reverse: true,
        ..forward
    };

    // Forward: notes exit at the top, so the top edge fades.
    assert_eq!(fade_factor(0.0, &forward), 0.0);
    assert_eq!(fade_factor(1.0, &forward), 1.0);
    // Reversed: the ramp moves to the bottom edge.
    assert_eq!(fade_factor(0.0, &reverse), 1.0);
    assert_eq!(fade_factor(1.0, &reverse), 0.0);
}

#[test]
fn test_fade_ramp_spans_fifty_pixels() {
    let params = ShadeParams {
        track_height: 200.0,
        reverse: false,
        fade_position: FadePosition::Top,
    };
    let at = |y: f32| fade_factor(gradient_ratio(y, 0.0, 200.0), &params);
    assert!(approx(at(25.0), 0.5));
    assert!(approx(at(50.0), 1.0));
    assert!(approx(at(120.0), 1.0));
}

#[test]
fn test_shaded_body_follows_vertical_gradient() {
    let spec = NoteSpec::new(0, 0.0, 20.0, 200.0)
        .with_colors([1.0, 0.0, 0.0, 1.0], [0.0, 0.0, 1.0, 1.0]);
    let params = ShadeParams {
        track_height: 200.0,
        reverse: false,
        fade_position: FadePosition::None,
    };
    let flow = FlowParams {
        speed: 200.0,
        track_height: 200.0,
        reverse: false,
    };
    let span = visible_span(1000.0, 0.0, 2000.0, 200.0, &flow).unwrap();

    let near_top = shade_pixel(&spec, &span, [10.0, 10.0], &params);
    let near_bottom = shade_pixel(&spec, &span, [10.0, 190.0], &params);
    assert!(near_top[0] > near_top[2]);
    assert!(near_bottom[2] > near_bottom[0]);
    assert!(approx(near_top[3], 1.0));
}

#[test]
fn test_glow_extends_beyond_body() {
    let glow = NoteGlow {
        size: 8.0,
        opacity_top: 1.0,
        opacity_bottom: 1.0,
        color_top: [0.0, 1.0, 0.0],
        color_bottom: [0.0, 1.0, 0.0],
    };
    let spec = NoteSpec::new(0, 40.0, 20.0, 200.0).with_glow(glow);
    let params = ShadeParams {
        track_height: 200.0,
        reverse: false,
        fade_position: FadePosition::None,
    };
    let flow = FlowParams {
        speed: 100.0,
        track_height: 200.0,
        reverse: false,
    };
    let span = visible_span(1000.0, 0.0, 2000.0, 200.0, &flow).unwrap();

    let halo = shade_pixel(&spec, &span, [36.0, 150.0], &params);
    let outside = shade_pixel(&spec, &span, [20.0, 150.0], &params);
    assert!(halo[3] > 0.0 && halo[1] > 0.0);
    assert_eq!(outside[3], 0.0);
}
