//! Renderer interface driven by the note engine.
//!
//! The engine decides when to upload and draw; a [`NoteRenderer`] decides how.
//! [`crate::gpu::GpuNoteRenderer`] is the wgpu implementation.

use crate::config::FlowSettings;
use crate::notes::NoteBuffer;

/// Per-frame inputs to a draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    /// Frame timestamp in milliseconds, same clock as note start/end times.
    pub now: f64,
    pub settings: FlowSettings,
}

/// Canvas-derived constants pushed to the renderer on resize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportConstants {
    /// Orthographic projection over the logical canvas, origin top-left, Y down.
    pub projection: [[f32; 4]; 4],
    pub logical_width: f32,
    pub logical_height: f32,
    pub pixel_ratio: f32,
    pub physical_width: u32,
    pub physical_height: u32,
}

/// Something that can turn note buffer contents into pixels.
pub trait NoteRenderer {
    /// Most note rows a single upload and draw can hold.
    fn capacity(&self) -> usize;

    /// Adopt new canvas dimensions. Never called mid-draw.
    fn resize(&mut self, viewport: &ViewportConstants);

    /// Copy rows `[0, notes.len())` of every attribute stream to the renderer.
    fn upload(&mut self, notes: &NoteBuffer);

    /// Draw `instance_count` notes as they stand at `frame.now`.
    fn draw(&mut self, frame: &FrameParams, instance_count: u32);

    /// Clear the output to fully transparent without drawing notes.
    fn clear_frame(&mut self);
}
