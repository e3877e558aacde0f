//! Time-driven note geometry.
//!
//! Every function here has a line-for-line counterpart in `vs_main` of
//! `gpu/shaders/notes.wgsl`. Host-side cleanup uses these, so a note leaves the
//! buffer at the same moment the shader stops drawing it.
//!
//! Coordinates are logical pixels with Y increasing downward. Times are
//! milliseconds on the frame clock.

use crate::config::FlowSettings;

const MS_PER_SECOND: f64 = 1000.0;

/// The subset of flow settings that moves notes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowParams {
    /// Pixels per second.
    pub speed: f32,
    pub track_height: f32,
    pub reverse: bool,
}

impl From<&FlowSettings> for FlowParams {
    fn from(settings: &FlowSettings) -> Self {
        Self {
            speed: settings.speed,
            track_height: settings.track_height,
            reverse: settings.reverse,
        }
    }
}

/// Vertical extent of a note body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteSpan {
    pub top: f32,
    pub bottom: f32,
}

impl NoteSpan {
    pub fn length(&self) -> f32 {
        self.bottom - self.top
    }
}

fn pixels_for(duration_ms: f64, speed: f32) -> f64 {
    duration_ms * speed as f64 / MS_PER_SECOND
}

/// Top edge of a track given its bottom edge.
pub fn track_top(track_bottom: f32, flow: &FlowParams) -> f32 {
    track_bottom - flow.track_height
}

/// Note length before clamping to the track.
///
/// Held notes grow until `now`; released notes stop growing at `end`.
pub fn raw_length(start: f64, end: f64, now: f64, flow: &FlowParams) -> f32 {
    let held_until = if end == 0.0 { now } else { end };
    pixels_for(held_until - start, flow.speed).max(0.0) as f32
}

/// Note length clamped to the track height.
pub fn note_length(start: f64, end: f64, now: f64, flow: &FlowParams) -> f32 {
    raw_length(start, end, now, flow).min(flow.track_height)
}

/// Distance a released note has moved since release. Zero while held.
pub fn travel(end: f64, now: f64, flow: &FlowParams) -> f32 {
    if end == 0.0 {
        return 0.0;
    }
    pixels_for((now - end).max(0.0), flow.speed) as f32
}

/// Unclamped note extent.
///
/// Held notes are pinned to the entry edge (bottom when flowing up, top when
/// reversed) and grow away from it. Released notes keep their length and
/// translate along the flow direction.
pub fn note_span(
    start: f64,
    end: f64,
    now: f64,
    track_bottom: f32,
    flow: &FlowParams,
) -> NoteSpan {
    let length = note_length(start, end, now, flow);
    let moved = travel(end, now, flow);
    if flow.reverse {
        let top = track_top(track_bottom, flow) + moved;
        NoteSpan {
            top,
            bottom: top + length,
        }
    } else {
        let bottom = track_bottom - moved;
        NoteSpan {
            top: bottom - length,
            bottom,
        }
    }
}

/// Note extent clipped to the track, or `None` when nothing is visible.
pub fn visible_span(
    start: f64,
    end: f64,
    now: f64,
    track_bottom: f32,
    flow: &FlowParams,
) -> Option<NoteSpan> {
    if start == 0.0 {
        return None;
    }
    let span = note_span(start, end, now, track_bottom, flow);
    let top = track_top(track_bottom, flow);
    let clipped = NoteSpan {
        top: span.top.clamp(top, track_bottom),
        bottom: span.bottom.clamp(top, track_bottom),
    };
    (clipped.length() > 0.0).then_some(clipped)
}

/// Whether a released note has travelled completely past the exit edge.
///
/// Held notes never exit: a note that was just pressed has zero length but is
/// still on the track.
pub fn has_exited(
    start: f64,
    end: f64,
    now: f64,
    track_bottom: f32,
    flow: &FlowParams,
) -> bool {
    if start == 0.0 {
        return true;
    }
    if end == 0.0 {
        return false;
    }
    let span = note_span(start, end, now, track_bottom, flow);
    if flow.reverse {
        span.top >= track_bottom
    } else {
        span.bottom <= track_top(track_bottom, flow)
    }
}
