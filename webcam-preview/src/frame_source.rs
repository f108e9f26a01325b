use crate::types::Image;

pub trait FrameSource: Send + Sync {
    /// Get the most recently decoded frame from this source. May block until a
    /// frame is available or return a cached one; the pump calls it once per
    /// iteration while holding the handoff lock.
    fn current_image(&self) -> Image;
}
