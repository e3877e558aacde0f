//! Headless wgpu note renderer.

use std::path::Path;

use wgpu::BindGroup;

use super::context::{GpuContext, GpuError};
use super::pipeline::{NotePipeline, NoteUniforms};
use super::textures::{ReadbackBuffer, RenderTarget, OVERLAY_FORMAT};
use crate::engine::Viewport;
use crate::notes::{NoteBuffer, FADE_ZONE_PX};
use crate::render::{FrameParams, NoteRenderer, ViewportConstants};

/// Renders falling notes into an offscreen, transparent overlay texture.
///
/// Start and end times are uploaded as `f32` relative to a per-upload origin
/// one millisecond before the oldest live note, so zero keeps meaning
/// "empty slot" / "still held" and precision does not decay with uptime.
pub struct GpuNoteRenderer {
    ctx: GpuContext,
    pipeline: NotePipeline,
    bind_group: BindGroup,
    target: RenderTarget,
    readback: ReadbackBuffer,
    viewport: ViewportConstants,
    time_origin: f64,
    staged_times: Vec<[f32; 2]>,
    uploaded_rows: usize,
    frames_drawn: u64,
}

impl GpuNoteRenderer {
    /// Create a renderer on a fresh GPU context.
    pub async fn new(capacity: usize, viewport: &Viewport) -> Result<Self, GpuError> {
        let ctx = GpuContext::new().await?;
        Self::with_context(ctx, capacity, viewport).await
    }

    /// Blocking variant of [`GpuNoteRenderer::new`] for hosts without an executor.
    pub fn new_blocking(capacity: usize, viewport: &Viewport) -> Result<Self, GpuError> {
        pollster::block_on(Self::new(capacity, viewport))
    }

    /// Create a renderer sharing an existing context.
    ///
    /// Fails with [`GpuError::Pipeline`] when the device rejects the note shader.
    pub async fn with_context(
        ctx: GpuContext,
        capacity: usize,
        viewport: &Viewport,
    ) -> Result<Self, GpuError> {
        let capacity = capacity.max(1);
        let pipeline = NotePipeline::new(&ctx.device, OVERLAY_FORMAT, capacity).await?;
        let bind_group = pipeline.create_bind_group(&ctx.device);

        let constants = viewport.constants();
        let (width, height) = ctx.clamp_extent(constants.physical_width, constants.physical_height);
        let target = RenderTarget::for_overlay(&ctx.device, width, height);
        let readback = ReadbackBuffer::new(&ctx.device, width, height);

        log::debug!(
            "Note renderer ready: capacity {}, target {}x{}",
            capacity,
            width,
            height
        );

        Ok(Self {
            ctx,
            pipeline,
            bind_group,
            target,
            readback,
            viewport: constants,
            time_origin: 0.0,
            staged_times: Vec::with_capacity(capacity),
            uploaded_rows: 0,
            frames_drawn: 0,
        })
    }

    /// Size of the overlay texture in device pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        self.target.size()
    }

    pub fn viewport(&self) -> &ViewportConstants {
        &self.viewport
    }

    /// View of the overlay texture, for hosts compositing it themselves.
    pub fn target_view(&self) -> &wgpu::TextureView {
        self.target.view()
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    /// Number of note rows in the GPU streams after the last upload.
    pub fn uploaded_rows(&self) -> usize {
        self.uploaded_rows
    }

    /// Draws submitted so far, clear frames included.
    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.ctx.adapter_info()
    }

    /// Copy the overlay back to the CPU as premultiplied RGBA8 rows.
    pub fn read_pixels(&self) -> Result<Vec<u8>, GpuError> {
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("overlay_readback_encoder"),
            });
        self.readback.copy_from(&mut encoder, &self.target);
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        self.readback.read_pixels(&self.ctx.device)
    }

    /// Write the current overlay to a PNG file with straight alpha.
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<(), GpuError> {
        let mut pixels = self.read_pixels()?;
        unpremultiply(&mut pixels);
        let (width, height) = self.target.size();
        image::save_buffer(
            path.as_ref(),
            &pixels,
            width,
            height,
            image::ExtendedColorType::Rgba8,
        )?;
        log::info!("Saved overlay snapshot to {}", path.as_ref().display());
        Ok(())
    }

    /// Device pixels per logical pixel on the actual target.
    ///
    /// Differs from the requested ratio when the target was clamped to the
    /// device limit, since the projection always spans the whole target.
    fn effective_pixel_ratio(&self) -> f32 {
        let (_, height) = self.target.size();
        if self.viewport.logical_height > 0.0 {
            height as f32 / self.viewport.logical_height
        } else {
            self.viewport.pixel_ratio
        }
    }

    fn uniforms(&self, frame: &FrameParams) -> NoteUniforms {
        let settings = &frame.settings;
        NoteUniforms {
            projection: self.viewport.projection,
            now: (frame.now - self.time_origin) as f32,
            flow_speed: settings.speed,
            track_height: settings.track_height,
            reverse: settings.reverse as u32,
            fade_mode: settings.fade_position.shader_mode(),
            pixel_ratio: self.effective_pixel_ratio(),
            logical_height: self.viewport.logical_height,
            fade_zone: FADE_ZONE_PX,
        }
    }

    fn submit_pass(&mut self, instances: Option<u32>) {
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("note_encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("note_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.target.view(),
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            if let Some(count) = instances.filter(|&count| count > 0) {
                render_pass.set_pipeline(&self.pipeline.pipeline);
                render_pass.set_bind_group(0, &self.bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.pipeline.quad_buffer.slice(..));
                for (slot, buffer) in self.pipeline.streams.slots().into_iter().enumerate() {
                    render_pass.set_vertex_buffer(slot as u32 + 1, buffer.slice(..));
                }
                render_pass.draw(0..4, 0..count);
            }
        }

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        self.frames_drawn += 1;
    }
}

impl NoteRenderer for GpuNoteRenderer {
    fn capacity(&self) -> usize {
        self.pipeline.streams.capacity()
    }

    fn resize(&mut self, viewport: &ViewportConstants) {
        self.viewport = *viewport;
        let (width, height) = self
            .ctx
            .clamp_extent(viewport.physical_width, viewport.physical_height);
        if self.target.size() == (width, height) {
            return;
        }
        self.target = RenderTarget::for_overlay(&self.ctx.device, width, height);
        self.readback = ReadbackBuffer::new(&self.ctx.device, width, height);
    }

    fn upload(&mut self, notes: &NoteBuffer) {
        self.time_origin = notes.oldest_start().map_or(0.0, |start| start - 1.0);
        let origin = self.time_origin;

        self.staged_times.clear();
        self.staged_times.extend(
            notes
                .start_times()
                .iter()
                .zip(notes.end_times())
                .map(|(&start, &end)| {
                    let end = if end == 0.0 { 0.0 } else { (end - origin) as f32 };
                    [(start - origin) as f32, end]
                }),
        );

        self.pipeline
            .streams
            .write(&self.ctx.queue, &self.staged_times, notes);
        self.uploaded_rows = notes.len().min(self.capacity());
    }

    fn draw(&mut self, frame: &FrameParams, instance_count: u32) {
        let uniforms = self.uniforms(frame);
        self.ctx.queue.write_buffer(
            &self.pipeline.uniform_buffer,
            0,
            bytemuck::bytes_of(&uniforms),
        );
        let count = instance_count.min(self.capacity() as u32);
        self.submit_pass(Some(count));
    }

    fn clear_frame(&mut self) {
        self.submit_pass(None);
    }
}

fn unpremultiply(pixels: &mut [u8]) {
    for pixel in pixels.chunks_exact_mut(4) {
        let alpha = pixel[3] as u32;
        if alpha == 0 || alpha == 255 {
            continue;
        }
        for channel in &mut pixel[..3] {
            *channel = ((*channel as u32 * 255 + alpha / 2) / alpha).min(255) as u8;
        }
    }
}
