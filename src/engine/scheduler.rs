//! Shared per-frame callback scheduler.
//!
//! One scheduler is shared by every frame-driven subsystem of the overlay. The
//! host calls [`AnimationScheduler::tick`] once per display refresh.

use std::cell::RefCell;
use std::rc::Rc;

/// Identifies a registered frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(u64);

type FrameCallback = Rc<RefCell<dyn FnMut(f64)>>;

#[derive(Default)]
struct SchedulerState {
    next_id: u64,
    entries: Vec<(CallbackId, FrameCallback)>,
}

/// Ordered collection of frame callbacks. Clones share the same collection.
#[derive(Clone, Default)]
pub struct AnimationScheduler {
    state: Rc<RefCell<SchedulerState>>,
}

impl AnimationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback to run on every tick, after those already registered.
    pub fn add(&self, callback: impl FnMut(f64) + 'static) -> CallbackId {
        let mut state = self.state.borrow_mut();
        let id = CallbackId(state.next_id);
        state.next_id += 1;
        let callback: FrameCallback = Rc::new(RefCell::new(callback));
        state.entries.push((id, callback));
        id
    }

    /// Unregister a callback. Unknown ids are ignored.
    pub fn remove(&self, id: CallbackId) -> bool {
        let mut state = self.state.borrow_mut();
        let before = state.entries.len();
        state.entries.retain(|(entry, _)| *entry != id);
        state.entries.len() != before
    }

    pub fn contains(&self, id: CallbackId) -> bool {
        self.state
            .borrow()
            .entries
            .iter()
            .any(|(entry, _)| *entry == id)
    }

    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every registered callback with the frame timestamp.
    ///
    /// Callbacks may add or remove callbacks. A callback removed during the
    /// tick is skipped if it has not run yet; one added during the tick first
    /// runs on the next tick.
    pub fn tick(&self, timestamp: f64) {
        let snapshot: Vec<(CallbackId, FrameCallback)> = self.state.borrow().entries.clone();
        for (id, callback) in snapshot {
            if !self.contains(id) {
                continue;
            }
            (&mut *callback.borrow_mut())(timestamp);
        }
    }
}

impl std::fmt::Debug for AnimationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationScheduler")
            .field("callbacks", &self.len())
            .finish()
    }
}
