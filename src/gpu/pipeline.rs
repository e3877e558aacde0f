//! Instanced note pipeline: uniforms, vertex layouts and attribute streams.

use wgpu::util::DeviceExt;
use wgpu::{BindGroup, BindGroupLayout, Buffer, Device, Queue, RenderPipeline, TextureFormat};

use super::context::GpuError;
use super::layouts::create_note_layout;
use super::pipelines::{create_pipeline_layout, RenderPipelineBuilder};
use crate::notes::NoteBuffer;

/// Uniform data passed to both shader stages.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct NoteUniforms {
    pub projection: [[f32; 4]; 4],
    /// Frame time relative to the stream time origin.
    pub now: f32,
    pub flow_speed: f32,
    pub track_height: f32,
    pub reverse: u32,
    pub fade_mode: u32,
    pub pixel_ratio: f32,
    pub logical_height: f32,
    pub fade_zone: f32,
}

const UNIT_QUAD: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];

const QUAD_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
const TIMES_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];
const PLACEMENT_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![2 => Float32x3];
const COLOR_TOP_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![3 => Float32x4];
const COLOR_BOTTOM_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![4 => Float32x4];
const SHAPE_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![5 => Float32x4];
const GLOW_TOP_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![6 => Float32x3];
const GLOW_BOTTOM_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![7 => Float32x3];

const TIMES_STRIDE: u64 = 8;
const VEC3_STRIDE: u64 = 12;
const VEC4_STRIDE: u64 = 16;

fn instance_layout(
    stride: u64,
    attributes: &'static [wgpu::VertexAttribute],
) -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: stride,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes,
    }
}

/// Vertex buffer layouts in slot order: unit quad, then one per attribute stream.
pub fn vertex_layouts() -> Vec<wgpu::VertexBufferLayout<'static>> {
    vec![
        wgpu::VertexBufferLayout {
            array_stride: 8,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &QUAD_ATTRIBUTES,
        },
        instance_layout(TIMES_STRIDE, &TIMES_ATTRIBUTES),
        instance_layout(VEC3_STRIDE, &PLACEMENT_ATTRIBUTES),
        instance_layout(VEC4_STRIDE, &COLOR_TOP_ATTRIBUTES),
        instance_layout(VEC4_STRIDE, &COLOR_BOTTOM_ATTRIBUTES),
        instance_layout(VEC4_STRIDE, &SHAPE_ATTRIBUTES),
        instance_layout(VEC3_STRIDE, &GLOW_TOP_ATTRIBUTES),
        instance_layout(VEC3_STRIDE, &GLOW_BOTTOM_ATTRIBUTES),
    ]
}

/// One GPU vertex buffer per note attribute, each sized for the full capacity.
pub struct InstanceStreams {
    pub times: Buffer,
    pub placements: Buffer,
    pub colors_top: Buffer,
    pub colors_bottom: Buffer,
    pub shapes: Buffer,
    pub glow_colors_top: Buffer,
    pub glow_colors_bottom: Buffer,
    capacity: usize,
}

impl InstanceStreams {
    fn new(device: &Device, capacity: usize) -> Self {
        let stream = |label: &'static str, stride: u64| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: stride * capacity as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        Self {
            times: stream("note_times", TIMES_STRIDE),
            placements: stream("note_placements", VEC3_STRIDE),
            colors_top: stream("note_colors_top", VEC4_STRIDE),
            colors_bottom: stream("note_colors_bottom", VEC4_STRIDE),
            shapes: stream("note_shapes", VEC4_STRIDE),
            glow_colors_top: stream("note_glow_top", VEC3_STRIDE),
            glow_colors_bottom: stream("note_glow_bottom", VEC3_STRIDE),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Buffers in vertex slot order, starting at slot 1.
    pub fn slots(&self) -> [&Buffer; 7] {
        [
            &self.times,
            &self.placements,
            &self.colors_top,
            &self.colors_bottom,
            &self.shapes,
            &self.glow_colors_top,
            &self.glow_colors_bottom,
        ]
    }

    /// Write rows `[0, notes.len())` of every stream. `times` holds the
    /// origin-relative start/end pairs for the same rows. Bytes past the
    /// live range keep whatever they held; the draw never reads them.
    pub fn write(&self, queue: &Queue, times: &[[f32; 2]], notes: &NoteBuffer) {
        let rows = notes.len().min(times.len()).min(self.capacity);
        if rows == 0 {
            return;
        }
        queue.write_buffer(&self.times, 0, bytemuck::cast_slice(&times[..rows]));
        queue.write_buffer(
            &self.placements,
            0,
            bytemuck::cast_slice(&notes.placements()[..rows]),
        );
        queue.write_buffer(
            &self.colors_top,
            0,
            bytemuck::cast_slice(&notes.colors_top()[..rows]),
        );
        queue.write_buffer(
            &self.colors_bottom,
            0,
            bytemuck::cast_slice(&notes.colors_bottom()[..rows]),
        );
        queue.write_buffer(&self.shapes, 0, bytemuck::cast_slice(&notes.shapes()[..rows]));
        queue.write_buffer(
            &self.glow_colors_top,
            0,
            bytemuck::cast_slice(&notes.glow_colors_top()[..rows]),
        );
        queue.write_buffer(
            &self.glow_colors_bottom,
            0,
            bytemuck::cast_slice(&notes.glow_colors_bottom()[..rows]),
        );
    }
}

/// Note rendering pipeline and the buffers it reads.
pub struct NotePipeline {
    pub pipeline: RenderPipeline,
    pub bind_group_layout: BindGroupLayout,
    pub uniform_buffer: Buffer,
    pub quad_buffer: Buffer,
    pub streams: InstanceStreams,
}

impl NotePipeline {
    /// Compile the shader and build the pipeline.
    ///
    /// Shader and pipeline validation errors are captured and returned
    /// instead of reaching the device's uncaptured-error handler.
    pub async fn new(
        device: &Device,
        format: TextureFormat,
        capacity: usize,
    ) -> Result<Self, GpuError> {
        Self::from_wgsl(device, format, capacity, include_str!("shaders/notes.wgsl")).await
    }

    async fn from_wgsl(
        device: &Device,
        format: TextureFormat,
        capacity: usize,
        source: &str,
    ) -> Result<Self, GpuError> {
        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("note_shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let uniform_size = std::mem::size_of::<NoteUniforms>() as u64;
        let bind_group_layout = create_note_layout(device, uniform_size);
        let pipeline_layout =
            create_pipeline_layout(device, "note_pipeline_layout", &[&bind_group_layout]);

        let pipeline = RenderPipelineBuilder::new("note_pipeline", &shader)
            .layout(&pipeline_layout)
            .vertex_buffers(vertex_layouts())
            .format(format)
            .build(device);

        if let Some(error) = scope.pop().await {
            log::error!("Note pipeline rejected: {}", error);
            return Err(GpuError::Pipeline(error.to_string()));
        }

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("note_uniforms"),
            size: uniform_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let quad_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("note_quad"),
            contents: bytemuck::cast_slice(&UNIT_QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Ok(Self {
            pipeline,
            bind_group_layout,
            uniform_buffer,
            quad_buffer,
            streams: InstanceStreams::new(device, capacity),
        })
    }

    pub fn create_bind_group(&self, device: &Device) -> BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("note_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: self.uniform_buffer.as_entire_binding(),
            }],
        })
    }
}
