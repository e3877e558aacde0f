//! Note storage and the flow/shading math shared with the GPU shader.

pub mod buffer;
pub mod geometry;
pub mod shading;

pub use buffer::{AddError, NoteBuffer, NoteGlow, NoteHandle, NoteSpec, NoteView, Rgb, Rgba};
pub use geometry::{FlowParams, NoteSpan};
pub use shading::{ShadeParams, FADE_ZONE_PX};
