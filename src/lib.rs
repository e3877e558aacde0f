//! Notefall Core
//!
//! GPU-instanced falling-note overlay for rhythm and piano visualizations.
//!
//! # Overview
//!
//! - [`notes::NoteBuffer`]: fixed-capacity structure-of-arrays note storage
//! - [`engine::NoteEngine`]: lifecycle owner that batches uploads, drives the
//!   per-frame draw through an [`engine::AnimationScheduler`] and idles when
//!   no notes remain
//! - [`engine::ResizeCoordinator`]: defers canvas size changes to frame boundaries
//! - [`gpu::GpuNoteRenderer`]: wgpu renderer drawing every note in one
//!   instanced draw call into a transparent offscreen texture
//!
//! The flow and shading math in [`notes::geometry`] and [`notes::shading`]
//! mirrors the WGSL shader, so CPU-side tests pin down what the GPU draws.

pub mod clock;
pub mod config;
pub mod engine;
pub mod gpu;
pub mod notes;
pub mod render;

// Re-export commonly used types
pub use clock::MonotonicClock;
pub use config::{ConfigError, EngineConfig, FadePosition, FlowSettings, DEFAULT_CAPACITY};
pub use engine::{
    AnimationScheduler, AnimationState, CallbackId, EngineStats, IntentOutcome, ListenerId,
    NoteEngine, NoteEvent, NoteIntent, Viewport,
};
pub use gpu::{GpuContext, GpuError, GpuNoteRenderer};
pub use notes::{AddError, NoteBuffer, NoteGlow, NoteHandle, NoteSpec, NoteView};
pub use render::{FrameParams, NoteRenderer, ViewportConstants};
