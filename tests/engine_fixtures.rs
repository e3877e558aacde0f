//! Shared test fixtures for engine tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use notefall::engine::{AnimationScheduler, NoteEngine};
use notefall::{
    EngineConfig, FadePosition, FlowSettings, FrameParams, NoteBuffer, NoteRenderer, NoteSpec,
    ViewportConstants, DEFAULT_CAPACITY,
};

/// Every call a [`RecordingRenderer`] received, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Resize { width: u32, height: u32 },
    Upload { rows: usize },
    Draw { now: f64, instances: u32 },
    ClearFrame,
}

/// Renderer that records calls into a log shared with the test.
#[derive(Debug, Clone)]
pub struct RecordingRenderer {
    pub calls: Rc<RefCell<Vec<RenderCall>>>,
    pub capacity: usize,
}

impl Default for RecordingRenderer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            calls: Rc::default(),
            capacity,
        }
    }

    pub fn uploads(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::Upload { .. }))
    }

    pub fn draws(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::Draw { .. }))
    }

    pub fn clear_frames(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::ClearFrame))
    }

    pub fn resizes(&self) -> Vec<(u32, u32)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                RenderCall::Resize { width, height } => Some((*width, *height)),
                _ => None,
            })
            .collect()
    }

    pub fn last(&self) -> Option<RenderCall> {
        self.calls.borrow().last().cloned()
    }

    pub fn reset(&self) {
        self.calls.borrow_mut().clear();
    }

    fn count(&self, pred: impl Fn(&RenderCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|call| pred(call)).count()
    }
}

impl NoteRenderer for RecordingRenderer {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn resize(&mut self, viewport: &ViewportConstants) {
        self.calls.borrow_mut().push(RenderCall::Resize {
            width: viewport.physical_width,
            height: viewport.physical_height,
        });
    }

    fn upload(&mut self, notes: &NoteBuffer) {
        self.calls
            .borrow_mut()
            .push(RenderCall::Upload { rows: notes.len() });
    }

    fn draw(&mut self, frame: &FrameParams, instance_count: u32) {
        self.calls.borrow_mut().push(RenderCall::Draw {
            now: frame.now,
            instances: instance_count,
        });
    }

    fn clear_frame(&mut self) {
        self.calls.borrow_mut().push(RenderCall::ClearFrame);
    }
}

/// Speed 180 px/s over a 150 px track, flowing up, no fade.
pub fn test_settings() -> FlowSettings {
    FlowSettings {
        speed: 180.0,
        track_height: 150.0,
        reverse: false,
        fade_position: FadePosition::None,
    }
}

/// A small config that never cleans up on its own.
pub fn manual_cleanup_config(capacity: usize) -> EngineConfig {
    EngineConfig {
        capacity,
        cleanup_interval_frames: u32::MAX,
    }
}

/// Standard note on track `track`, bottom edge at y = 400.
pub fn note(track: u32) -> NoteSpec {
    NoteSpec::new(track, track as f32 * 20.0, 18.0, 400.0)
}

/// Engine with a recording renderer; the returned renderer shares the call log.
pub fn recording_engine(
    config: EngineConfig,
) -> (NoteEngine<RecordingRenderer>, RecordingRenderer, AnimationScheduler) {
    init_logging();
    let renderer = RecordingRenderer::new();
    let recorder = renderer.clone();
    let scheduler = AnimationScheduler::new();
    let engine = NoteEngine::new(renderer, scheduler.clone(), test_settings(), config)
        .expect("valid test configuration");
    (engine, recorder, scheduler)
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
