//! Live preview of a webcam capture service on a display surface.
//!
//! A [`WebcamPreview`] binds to the service producing decoded frames and runs a
//! [`FramePump`] that blits the latest frame, letterboxed to the capture aspect
//! ratio, onto a [`Surface`].

pub mod config;
pub mod frame_source;
pub mod handoff;
pub mod layout;
pub mod preview;
pub mod pump;
pub mod surface;
pub mod types;

pub use config::{ConfigError, PreviewConfig};
pub use frame_source::FrameSource;
pub use handoff::SourceSlot;
pub use layout::{compute_default_rect, compute_rect};
pub use preview::{BindError, PreviewError, ServiceBinder, ServiceConnection, WebcamPreview};
pub use pump::{FramePump, PumpError, PumpState};
pub use surface::{Canvas, MemorySurface, Surface};
pub use types::{Image, ImageError, Rect, Size};

/// Capture width. The webcam must support 640x480.
pub const IMG_WIDTH: u32 = 640;
/// Capture height.
pub const IMG_HEIGHT: u32 = 480;
