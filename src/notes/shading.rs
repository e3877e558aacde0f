//! Per-pixel note shading.
//!
//! Mirrors `fs_main` in `gpu/shaders/notes.wgsl`: vertical gradient, edge fade,
//! rounded-box body with a one pixel antialiasing band, and a quadratic glow
//! halo. Output is premultiplied alpha.

use super::buffer::NoteSpec;
use super::geometry::NoteSpan;
use crate::config::FadePosition;

/// Height of the fade ramp at the fading track edge, in logical pixels.
pub const FADE_ZONE_PX: f32 = 50.0;

/// Smallest track height used as a divisor.
const MIN_TRACK_HEIGHT: f32 = 1e-3;

/// Frame-wide values the fragment stage reads from uniforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadeParams {
    pub track_height: f32,
    pub reverse: bool,
    pub fade_position: FadePosition,
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Convert a framebuffer row to a logical (DOM-space) Y coordinate.
pub fn logical_y(physical_y: f32, pixel_ratio: f32, logical_height: f32) -> f32 {
    let ratio = if pixel_ratio > 0.0 { pixel_ratio } else { 1.0 };
    (physical_y / ratio).min(logical_height)
}

/// Position of `pixel_y` inside the track: 0 at the top edge, 1 at the bottom.
pub fn gradient_ratio(pixel_y: f32, track_top: f32, track_height: f32) -> f32 {
    ((pixel_y - track_top) / track_height.max(MIN_TRACK_HEIGHT)).clamp(0.0, 1.0)
}

/// Edge fade multiplier for a pixel at `ratio`.
pub fn fade_factor(ratio: f32, params: &ShadeParams) -> f32 {
    match params.fade_position.fades_at_bottom(params.reverse) {
        None => 1.0,
        Some(at_bottom) => {
            let reference = if at_bottom { 1.0 - ratio } else { ratio };
            (reference * params.track_height / FADE_ZONE_PX).clamp(0.0, 1.0)
        }
    }
}

/// Signed distance from `p` (relative to the box center) to a rounded box.
pub fn rounded_box_distance(p: [f32; 2], half_size: [f32; 2], radius: f32) -> f32 {
    let r = radius.clamp(0.0, half_size[0].min(half_size[1]).max(0.0));
    let qx = p[0].abs() - half_size[0] + r;
    let qy = p[1].abs() - half_size[1] + r;
    let outside = (qx.max(0.0).powi(2) + qy.max(0.0).powi(2)).sqrt();
    outside + qx.max(qy).min(0.0) - r
}

/// Body coverage with a one pixel antialiasing band centred on the edge.
pub fn coverage(distance: f32) -> f32 {
    (0.5 - distance).clamp(0.0, 1.0)
}

/// Glow intensity outside the body.
pub fn glow_falloff(distance: f32, glow_size: f32) -> f32 {
    if glow_size <= 0.0 || distance <= 0.0 {
        return 0.0;
    }
    let f = 1.0 - (distance / glow_size).clamp(0.0, 1.0);
    f * f
}

/// Shade one logical pixel of a note whose visible body is `span`.
///
/// Returns premultiplied RGBA.
pub fn shade_pixel(
    spec: &NoteSpec,
    span: &NoteSpan,
    pixel: [f32; 2],
    params: &ShadeParams,
) -> [f32; 4] {
    let track_top = spec.track_bottom - params.track_height;
    let ratio = gradient_ratio(pixel[1], track_top, params.track_height);

    let base: [f32; 4] =
        std::array::from_fn(|i| lerp(spec.color_top[i], spec.color_bottom[i], ratio));
    let glow: [f32; 3] =
        std::array::from_fn(|i| lerp(spec.glow.color_top[i], spec.glow.color_bottom[i], ratio));
    let glow_opacity = lerp(spec.glow.opacity_top, spec.glow.opacity_bottom, ratio);

    let half = [spec.width * 0.5, span.length() * 0.5];
    let center = [spec.column_x + half[0], span.top + half[1]];
    let local = [pixel[0] - center[0], pixel[1] - center[1]];
    let d = rounded_box_distance(local, half, spec.corner_radius);

    let fade = fade_factor(ratio, params);
    let body_alpha = base[3] * coverage(d) * fade;
    let glow_alpha = base[3] * glow_opacity * glow_falloff(d, spec.glow.size) * fade;

    [
        base[0] * body_alpha + glow[0] * glow_alpha,
        base[1] * body_alpha + glow[1] * glow_alpha,
        base[2] * body_alpha + glow[2] * glow_alpha,
        (body_alpha + glow_alpha).clamp(0.0, 1.0),
    ]
}
