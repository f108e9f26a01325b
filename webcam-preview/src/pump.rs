use std::{
    io,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use futures::Stream;
use thiserror::Error;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::handoff::{SourceSlot, Wait};
use crate::surface::Surface;

#[derive(Debug, Error)]
pub enum PumpError {
    #[error("failed to spawn render thread: {0}")]
    Spawn(#[from] io::Error),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PumpState {
    /// No frame source attached; blocked waiting for one.
    Idle,
    /// Rendering frames from an attached source.
    Active,
    /// Loop exited. Terminal.
    Stopped,
}

/// The render thread. Repeatedly pulls the latest image from the attached frame
/// source and blits it into the slot's rect on the surface.
pub struct FramePump {
    slot: SourceSlot,
    handle: Option<JoinHandle<()>>,
    shared: Arc<Shared>,
    state_rx: watch::Receiver<PumpState>,
}
struct Shared {
    state_tx: watch::Sender<PumpState>,
    drawn: AtomicU64,
    skipped: AtomicU64,
}

impl FramePump {
    pub fn spawn(
        slot: SourceSlot,
        surface: Arc<dyn Surface>,
        thread_name: &str,
    ) -> Result<Self, PumpError> {
        let initial = if slot.is_connected() {
            PumpState::Active
        } else {
            PumpState::Idle
        };
        let (state_tx, state_rx) = watch::channel(initial);
        let shared = Arc::new(Shared {
            state_tx,
            drawn: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        });
        let handle = thread::Builder::new().name(thread_name.to_owned()).spawn({
            let slot = slot.clone();
            let shared = shared.clone();
            move || run(slot, surface, shared)
        })?;
        log::debug!("frame pump {:?} started ({:?})", thread_name, initial);
        Ok(Self {
            slot,
            handle: Some(handle),
            shared,
            state_rx,
        })
    }

    pub fn state(&self) -> PumpState {
        *self.state_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PumpState> {
        self.state_rx.clone()
    }

    /// The current state followed by every transition, ending after `Stopped`
    /// once the pump is dropped.
    pub fn state_stream(&self) -> impl Stream<Item = PumpState> {
        WatchStream::new(self.state_rx.clone())
    }

    pub fn frames_drawn(&self) -> u64 {
        self.shared.drawn.load(Ordering::SeqCst)
    }

    pub fn frames_skipped(&self) -> u64 {
        self.shared.skipped.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Cancel the loop and wait for the thread to exit.
    pub fn stop(&mut self) {
        self.slot.cancel();
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                log::warn!("frame pump stopped from its own thread, not joining");
                return;
            }
            if handle.join().is_err() {
                log::warn!("frame pump thread panicked");
                self.shared.set_state(PumpState::Stopped);
            }
            log::debug!("frame pump joined");
        }
    }
}

impl Drop for FramePump {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Shared {
    fn set_state(&self, new: PumpState) {
        self.state_tx.send_if_modified(|state| {
            if *state == new {
                return false;
            }
            log::trace!("frame pump {:?} -> {:?}", state, new);
            *state = new;
            true
        });
    }
}

fn run(slot: SourceSlot, surface: Arc<dyn Surface>, shared: Arc<Shared>) {
    loop {
        let (state, source) = match slot.wait_for_source(|| shared.set_state(PumpState::Idle)) {
            Wait::Ready { state, source } => (state, source),
            Wait::Cancelled => break,
        };
        shared.set_state(PumpState::Active);

        let image = source.current_image();
        match surface.lock_canvas() {
            Some(mut canvas) => {
                canvas.draw_image(&image, state.rect);
                canvas.unlock_and_post();
                shared.drawn.fetch_add(1, Ordering::SeqCst);
            }
            None => {
                shared.skipped.fetch_add(1, Ordering::SeqCst);
            }
        }
        drop(state);
        // let signal threads in before the next iteration
        thread::yield_now();
    }
    shared.set_state(PumpState::Stopped);
    log::debug!("frame pump exiting");
}
