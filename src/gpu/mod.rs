//! Headless GPU rendering of the note overlay using wgpu.

pub mod context;
pub mod layouts;
pub mod pipeline;
pub mod pipelines;
pub mod renderer;
pub mod textures;

pub use context::{ContextOptions, GpuContext, GpuError};
pub use pipeline::{NotePipeline, NoteUniforms};
pub use renderer::GpuNoteRenderer;
pub use textures::{ReadbackBuffer, RenderTarget, OVERLAY_FORMAT};
