//! Hand-off of the frame source between the service binding and the frame pump.
//!
//! A single mutex guards the source reference and the destination rect; the
//! pump holds it across the whole blit-and-post sequence so connect,
//! disconnect and resize are serialized against rendering.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Condvar, Mutex, MutexGuard, PoisonError,
};

use crate::frame_source::FrameSource;
use crate::types::Rect;

#[derive(Clone)]
pub struct SourceSlot {
    shared: Arc<Shared>,
}
struct Shared {
    state: Mutex<State>,
    changed: Condvar,
    running: AtomicBool,
}
pub(crate) struct State {
    pub(crate) source: Option<Arc<dyn FrameSource>>,
    pub(crate) rect: Rect,
}

/// Outcome of [`SourceSlot::wait_for_source`].
pub(crate) enum Wait<'a> {
    /// A source is attached; the guard keeps it there until dropped.
    Ready {
        state: MutexGuard<'a, State>,
        source: Arc<dyn FrameSource>,
    },
    /// The slot was cancelled.
    Cancelled,
}

impl SourceSlot {
    pub fn new(rect: Rect) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State { source: None, rect }),
                changed: Condvar::new(),
                running: AtomicBool::new(true),
            }),
        }
    }

    /// Attach a source and wake the pump.
    pub fn connect(&self, source: Arc<dyn FrameSource>) {
        let mut state = self.lock();
        state.source = Some(source);
        self.shared.changed.notify_all();
    }

    /// Detach the source. The pump goes back to waiting on its next iteration.
    pub fn disconnect(&self) {
        let mut state = self.lock();
        state.source = None;
        self.shared.changed.notify_all();
    }

    pub fn is_connected(&self) -> bool {
        self.lock().source.is_some()
    }

    pub fn rect(&self) -> Rect {
        self.lock().rect
    }

    /// Replace the destination rect. Takes effect from the next blit.
    pub fn set_rect(&self, rect: Rect) {
        self.lock().rect = rect;
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Clear the running flag and wake anyone blocked in
    /// [`SourceSlot::wait_for_source`]. Permanent.
    pub fn cancel(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        // notify under the lock so a waiter between its check and its wait
        // cannot miss the wakeup
        let _state = self.lock();
        self.shared.changed.notify_all();
    }

    /// Block until a source is attached or the slot is cancelled. `on_idle` is
    /// called once before the first wait, if a wait is needed at all.
    pub(crate) fn wait_for_source(&self, mut on_idle: impl FnMut()) -> Wait<'_> {
        let mut state = self.lock();
        let mut idled = false;
        loop {
            if !self.is_running() {
                return Wait::Cancelled;
            }
            if let Some(source) = state.source.clone() {
                return Wait::Ready { state, source };
            }
            if !idled {
                on_idle();
                idled = true;
            }
            state = self
                .shared
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
