use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::config::{ConfigError, PreviewConfig};
use crate::frame_source::FrameSource;
use crate::handoff::SourceSlot;
use crate::layout::compute_rect;
use crate::pump::{FramePump, PumpError, PumpState};
use crate::surface::Surface;
use crate::types::{Rect, Size};

#[derive(Debug, Error)]
#[error("service binding failed: {0}")]
pub struct BindError(pub String);

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("render thread already started")]
    AlreadyStarted,
    #[error("preview surface was destroyed")]
    Destroyed,
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error(transparent)]
    Pump(#[from] PumpError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Binds to the service producing camera frames. Connection state is reported
/// asynchronously through the [`ServiceConnection`] given to `bind`.
pub trait ServiceBinder: Send + Sync {
    fn bind(&self, connection: ServiceConnection) -> Result<(), BindError>;
    fn unbind(&self);
}

/// Callback handle a [`ServiceBinder`] reports connect/disconnect through.
#[derive(Clone)]
pub struct ServiceConnection {
    slot: SourceSlot,
}
impl ServiceConnection {
    pub fn on_service_connected(&self, source: Arc<dyn FrameSource>) {
        log::info!("bound to frame source");
        self.slot.connect(source);
    }

    pub fn on_service_disconnected(&self) {
        log::warn!("frame source disconnected unexpectedly");
        self.slot.disconnect();
    }
}

/// A widget showing the latest camera frame letterboxed on a surface.
///
/// Construction binds to the frame service. The platform then drives it with
/// [`surface_created`](Self::surface_created),
/// [`surface_changed`](Self::surface_changed) and
/// [`surface_destroyed`](Self::surface_destroyed); after the latter the
/// widget is inert.
#[derive(Clone)]
pub struct WebcamPreview {
    shared: Arc<Shared>,
}
struct Shared {
    state: Mutex<State>,
    slot: SourceSlot,
    surface: Arc<dyn Surface>,
    binder: Arc<dyn ServiceBinder>,
    config: PreviewConfig,
}
struct State {
    pump: Option<FramePump>,
    bound: bool,
    destroyed: bool,
}

impl WebcamPreview {
    pub fn new(
        surface: Arc<dyn Surface>,
        binder: Arc<dyn ServiceBinder>,
        window: Size,
        config: PreviewConfig,
    ) -> Result<Self, PreviewError> {
        config.validate()?;
        let rect = compute_rect(window, config.content());
        log::debug!("preview constructed for {:?}, drawing into {:?}", window, rect);

        let slot = SourceSlot::new(rect);
        binder.bind(ServiceConnection { slot: slot.clone() })?;

        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    pump: None,
                    bound: true,
                    destroyed: false,
                }),
                slot,
                surface,
                binder,
                config,
            }),
        })
    }

    /// Start the render thread.
    pub fn surface_created(&self) -> Result<(), PreviewError> {
        log::debug!("surface created");
        let mut state = self.shared.lock();
        if state.destroyed {
            return Err(PreviewError::Destroyed);
        }
        if state.pump.is_some() {
            return Err(PreviewError::AlreadyStarted);
        }
        let pump = FramePump::spawn(
            self.shared.slot.clone(),
            self.shared.surface.clone(),
            &self.shared.config.thread_name,
        )?;
        state.pump = Some(pump);
        Ok(())
    }

    /// React to a new surface size. Recomputes the destination rect unless
    /// `recompute_on_resize` is off.
    pub fn surface_changed(&self, width: u32, height: u32) -> Result<(), PreviewError> {
        log::debug!("surface changed to {}x{}", width, height);
        if self.shared.lock().destroyed {
            return Err(PreviewError::Destroyed);
        }
        if self.shared.config.recompute_on_resize {
            let rect = compute_rect(Size::new(width, height), self.shared.config.content());
            self.shared.slot.set_rect(rect);
        }
        Ok(())
    }

    /// Stop and join the render thread, then release the service binding.
    /// Calling it again is a no-op.
    pub fn surface_destroyed(&self) {
        log::debug!("surface destroyed");
        let mut state = self.shared.lock();
        state.destroyed = true;
        self.shared.slot.cancel();
        if let Some(mut pump) = state.pump.take() {
            pump.stop();
        }
        if state.bound {
            log::info!("unbinding from frame source");
            self.shared.binder.unbind();
            state.bound = false;
        }
    }

    pub fn rect(&self) -> Rect {
        self.shared.slot.rect()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.slot.is_connected()
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.lock().destroyed
    }

    /// State of the render thread, or `None` before `surface_created`.
    pub fn pump_state(&self) -> Option<PumpState> {
        let state = self.shared.lock();
        match &state.pump {
            Some(pump) => Some(pump.state()),
            None if state.destroyed => Some(PumpState::Stopped),
            None => None,
        }
    }

    pub fn subscribe(&self) -> Option<tokio::sync::watch::Receiver<PumpState>> {
        self.shared.lock().pump.as_ref().map(FramePump::subscribe)
    }

    pub fn frames_drawn(&self) -> u64 {
        self.shared
            .lock()
            .pump
            .as_ref()
            .map_or(0, FramePump::frames_drawn)
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut pump) = state.pump.take() {
            pump.stop();
        }
        if state.bound {
            log::trace!("preview dropped while bound, unbinding");
            self.binder.unbind();
            state.bound = false;
        }
    }
}
