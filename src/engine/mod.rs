//! Note engine: buffer lifecycle, frame scheduling and renderer driving.
//!
//! The engine is Idle while the buffer is empty and Active otherwise. Entering
//! Active registers exactly one callback with the shared
//! [`AnimationScheduler`]; returning to Idle removes it and issues a single
//! clear-frame draw so no stale pixels remain.
//!
//! Mutations apply to the buffer immediately. Adds and finalizes only mark the
//! [`UploadBatcher`], so a burst of key events costs one upload on the next
//! frame. Cleanup and clear change the draw range and upload right away.
//!
//! Events are queued while the engine state is borrowed and delivered once the
//! mutation has finished, so listeners may read the engine or feed it further
//! intents. Events raised by a listener are delivered after the current batch.

pub mod batcher;
pub mod resize;
pub mod scheduler;

pub use batcher::UploadBatcher;
pub use resize::{ResizeCoordinator, Viewport};
pub use scheduler::{AnimationScheduler, CallbackId};

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::config::{ConfigError, EngineConfig, FlowSettings};
use crate::notes::{AddError, FlowParams, NoteBuffer, NoteHandle, NoteSpec, NoteView};
use crate::render::{FrameParams, NoteRenderer};

/// Whether the engine is currently hooked into the frame scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationState {
    Idle,
    Active(CallbackId),
}

/// Host requests accepted by [`NoteEngine::ingest`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoteIntent {
    Add { now: f64, spec: NoteSpec },
    Finalize { handle: NoteHandle, now: f64 },
    Cleanup { now: f64 },
    Clear,
}

/// Result of an ingested intent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntentOutcome {
    Added(NoteHandle),
    Rejected(AddError),
    Finalized(bool),
    CleanedUp(usize),
    Cleared(u64),
}

/// Notification sent to subscribed listeners after a mutation is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoteEvent {
    Added { handle: NoteHandle, track_index: u32 },
    Dropped { track_index: u32, reason: AddError },
    Finalized { handle: NoteHandle },
    CleanedUp { removed: usize, remaining: usize },
    Cleared { version: u64 },
}

/// Identifies a subscribed listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Running counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub frames: u64,
    pub uploads: u64,
    pub draws: u64,
    pub clear_frames: u64,
    pub dropped: u64,
}

type Listener = Rc<RefCell<dyn FnMut(&NoteEvent)>>;

struct EngineCore<R: NoteRenderer> {
    buffer: NoteBuffer,
    renderer: R,
    settings: FlowSettings,
    config: EngineConfig,
    batcher: UploadBatcher,
    resize: ResizeCoordinator,
    scheduler: AnimationScheduler,
    state: AnimationState,
    frames_since_cleanup: u32,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
    pending_events: Vec<NoteEvent>,
    dispatching: bool,
    stats: EngineStats,
    self_ref: Weak<RefCell<EngineCore<R>>>,
}

impl<R: NoteRenderer + 'static> EngineCore<R> {
    fn flow(&self) -> FlowParams {
        FlowParams::from(&self.settings)
    }

    fn emit(&mut self, event: NoteEvent) {
        if !self.listeners.is_empty() {
            self.pending_events.push(event);
        }
    }

    fn add(&mut self, now: f64, spec: &NoteSpec) -> Result<NoteHandle, AddError> {
        match self.buffer.add(now, spec) {
            Ok(handle) => {
                self.batcher.mark();
                self.emit(NoteEvent::Added {
                    handle,
                    track_index: spec.track_index,
                });
                self.start_animation();
                Ok(handle)
            }
            Err(reason) => {
                self.stats.dropped += 1;
                log::trace!("Dropped note on track {}: {}", spec.track_index, reason);
                self.emit(NoteEvent::Dropped {
                    track_index: spec.track_index,
                    reason,
                });
                Err(reason)
            }
        }
    }

    fn finalize(&mut self, handle: NoteHandle, now: f64) -> bool {
        if !self.buffer.finalize(handle, now) {
            return false;
        }
        self.batcher.mark();
        self.emit(NoteEvent::Finalized { handle });
        true
    }

    fn cleanup(&mut self, now: f64) -> usize {
        let flow = self.flow();
        let removed = self.buffer.cleanup(now, &flow);
        if removed > 0 {
            self.emit(NoteEvent::CleanedUp {
                removed,
                remaining: self.buffer.len(),
            });
            self.sync_draw_range();
        }
        removed
    }

    fn clear(&mut self) -> u64 {
        let version = self.buffer.clear();
        self.emit(NoteEvent::Cleared { version });
        self.sync_draw_range();
        version
    }

    /// Apply a draw-range change immediately instead of waiting for a frame.
    fn sync_draw_range(&mut self) {
        self.batcher.take();
        if self.buffer.is_empty() {
            self.stop_animation();
        } else {
            self.renderer.upload(&self.buffer);
            self.stats.uploads += 1;
        }
    }

    fn start_animation(&mut self) {
        if matches!(self.state, AnimationState::Active(_)) {
            return;
        }
        self.resize.apply_pending(&mut self.renderer);
        let core = self.self_ref.clone();
        let id = self.scheduler.add(move |timestamp| {
            if let Some(core) = core.upgrade() {
                core.borrow_mut().on_frame(timestamp);
                dispatch_events(&core);
            }
        });
        self.state = AnimationState::Active(id);
        log::debug!("Note engine active");
    }

    fn stop_animation(&mut self) {
        let AnimationState::Active(id) = self.state else {
            return;
        };
        self.scheduler.remove(id);
        self.state = AnimationState::Idle;
        self.resize.apply_pending(&mut self.renderer);
        self.renderer.clear_frame();
        self.stats.clear_frames += 1;
        log::debug!("Note engine idle");
    }

    fn on_frame(&mut self, now: f64) {
        self.stats.frames += 1;
        self.resize.apply_pending(&mut self.renderer);

        self.frames_since_cleanup += 1;
        if self.frames_since_cleanup >= self.config.cleanup_interval_frames.max(1) {
            self.frames_since_cleanup = 0;
            self.cleanup(now);
        }
        if self.state == AnimationState::Idle {
            return;
        }

        if self.batcher.take() {
            self.renderer.upload(&self.buffer);
            self.stats.uploads += 1;
        }
        let frame = FrameParams {
            now,
            settings: self.settings,
        };
        self.renderer.draw(&frame, self.buffer.len() as u32);
        self.stats.draws += 1;
        log::trace!("Drew {} notes at {:.1}", self.buffer.len(), now);
    }
}

/// Deliver queued events with no borrow of the engine held.
///
/// Reentrant calls return immediately; the outermost call drains whatever
/// its listeners queue.
fn dispatch_events<R: NoteRenderer>(core: &RefCell<EngineCore<R>>) {
    {
        let mut state = core.borrow_mut();
        if state.dispatching || state.pending_events.is_empty() {
            return;
        }
        state.dispatching = true;
    }
    loop {
        let (events, listeners) = {
            let mut state = core.borrow_mut();
            if state.pending_events.is_empty() {
                state.dispatching = false;
                return;
            }
            let listeners: Vec<Listener> = state
                .listeners
                .iter()
                .map(|(_, listener)| Rc::clone(listener))
                .collect();
            (std::mem::take(&mut state.pending_events), listeners)
        };
        for event in &events {
            for listener in &listeners {
                (*listener.borrow_mut())(event);
            }
        }
    }
}

impl<R: NoteRenderer> Drop for EngineCore<R> {
    fn drop(&mut self) {
        if let AnimationState::Active(id) = self.state {
            self.scheduler.remove(id);
        }
    }
}

/// Falling-note engine bound to one renderer and a shared scheduler.
pub struct NoteEngine<R: NoteRenderer + 'static> {
    core: Rc<RefCell<EngineCore<R>>>,
}

impl<R: NoteRenderer + 'static> NoteEngine<R> {
    /// Create an idle engine. Nothing is scheduled until the first note arrives.
    ///
    /// `config.capacity` may not exceed what the renderer can draw in one call.
    pub fn new(
        renderer: R,
        scheduler: AnimationScheduler,
        settings: FlowSettings,
        config: EngineConfig,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        config.validate()?;
        if config.capacity > renderer.capacity() {
            return Err(ConfigError::CapacityExceedsRenderer {
                requested: config.capacity,
                available: renderer.capacity(),
            });
        }
        let core = Rc::new_cyclic(|self_ref| {
            RefCell::new(EngineCore {
                buffer: NoteBuffer::new(config.capacity),
                renderer,
                settings,
                config,
                batcher: UploadBatcher::new(),
                resize: ResizeCoordinator::new(),
                scheduler,
                state: AnimationState::Idle,
                frames_since_cleanup: 0,
                listeners: Vec::new(),
                next_listener: 0,
                pending_events: Vec::new(),
                dispatching: false,
                stats: EngineStats::default(),
                self_ref: self_ref.clone(),
            })
        });
        Ok(Self { core })
    }

    /// Start a held note. Over capacity the note is dropped, never queued.
    pub fn add(&self, now: f64, spec: &NoteSpec) -> Result<NoteHandle, AddError> {
        let result = self.core.borrow_mut().add(now, spec);
        dispatch_events(&self.core);
        result
    }

    /// Release a held note. `false` for stale or already released handles.
    pub fn finalize(&self, handle: NoteHandle, now: f64) -> bool {
        let finalized = self.core.borrow_mut().finalize(handle, now);
        dispatch_events(&self.core);
        finalized
    }

    /// Remove notes that have left their track. Applied immediately.
    pub fn cleanup(&self, now: f64) -> usize {
        let removed = self.core.borrow_mut().cleanup(now);
        dispatch_events(&self.core);
        removed
    }

    /// Drop every note. Returns the new buffer version.
    pub fn clear(&self) -> u64 {
        let version = self.core.borrow_mut().clear();
        dispatch_events(&self.core);
        version
    }

    /// Single ingestion point for host-forwarded intents.
    pub fn ingest(&self, intent: NoteIntent) -> IntentOutcome {
        match intent {
            NoteIntent::Add { now, spec } => match self.add(now, &spec) {
                Ok(handle) => IntentOutcome::Added(handle),
                Err(reason) => IntentOutcome::Rejected(reason),
            },
            NoteIntent::Finalize { handle, now } => {
                IntentOutcome::Finalized(self.finalize(handle, now))
            }
            NoteIntent::Cleanup { now } => IntentOutcome::CleanedUp(self.cleanup(now)),
            NoteIntent::Clear => IntentOutcome::Cleared(self.clear()),
        }
    }

    /// Register a listener for applied mutations.
    ///
    /// Listeners run after the mutation completes and may call back into the
    /// engine.
    pub fn subscribe(&self, listener: impl FnMut(&NoteEvent) + 'static) -> ListenerId {
        let mut core = self.core.borrow_mut();
        let id = ListenerId(core.next_listener);
        core.next_listener += 1;
        let listener: Listener = Rc::new(RefCell::new(listener));
        core.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut core = self.core.borrow_mut();
        let before = core.listeners.len();
        core.listeners.retain(|(entry, _)| *entry != id);
        core.listeners.len() != before
    }

    /// Replace the flow settings. Takes effect on the next drawn frame.
    pub fn set_settings(&self, settings: FlowSettings) -> Result<(), ConfigError> {
        settings.validate()?;
        self.core.borrow_mut().settings = settings;
        Ok(())
    }

    pub fn settings(&self) -> FlowSettings {
        self.core.borrow().settings
    }

    /// Report a canvas size or pixel ratio change.
    ///
    /// Applied before the next frame, or on the next Idle to Active transition.
    pub fn resize(&self, viewport: Viewport) -> bool {
        self.core.borrow_mut().resize.request(viewport)
    }

    /// The viewport the renderer is currently configured for.
    pub fn viewport(&self) -> Option<Viewport> {
        self.core.borrow().resize.current()
    }

    pub fn state(&self) -> AnimationState {
        self.core.borrow().state
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.state(), AnimationState::Active(_))
    }

    /// Number of live notes.
    pub fn len(&self) -> usize {
        self.core.borrow().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn version(&self) -> u64 {
        self.core.borrow().buffer.version()
    }

    pub fn note(&self, handle: NoteHandle) -> Option<NoteView> {
        self.core.borrow().buffer.get(handle)
    }

    pub fn notes(&self) -> Vec<NoteView> {
        self.core.borrow().buffer.iter().collect()
    }

    pub fn has_pending_upload(&self) -> bool {
        self.core.borrow().batcher.is_dirty()
    }

    pub fn stats(&self) -> EngineStats {
        self.core.borrow().stats
    }

    /// Inspect the renderer, e.g. to read back the last frame.
    pub fn with_renderer<T>(&self, f: impl FnOnce(&R) -> T) -> T {
        f(&self.core.borrow().renderer)
    }

    pub fn with_renderer_mut<T>(&self, f: impl FnOnce(&mut R) -> T) -> T {
        f(&mut self.core.borrow_mut().renderer)
    }
}

impl<R: NoteRenderer + 'static> std::fmt::Debug for NoteEngine<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.core.borrow();
        f.debug_struct("NoteEngine")
            .field("state", &core.state)
            .field("notes", &core.buffer.len())
            .field("version", &core.buffer.version())
            .field("stats", &core.stats)
            .finish()
    }
}
