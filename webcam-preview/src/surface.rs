use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Mutex, MutexGuard, PoisonError, TryLockError,
};

use tiny_skia::{
    BlendMode, FilterQuality, Paint, Pattern, Pixmap, PixmapMut, SpreadMode, Transform,
};

use crate::types::{Image, ImageError, Rect, Size};

/// A drawable target the frame pump presents into.
pub trait Surface: Send + Sync {
    /// Try to acquire an exclusive canvas without blocking. Returns `None` if
    /// the surface is not ready to be drawn on.
    fn lock_canvas(&self) -> Option<Box<dyn Canvas + '_>>;
}

/// Exclusive drawing handle obtained from [`Surface::lock_canvas`].
pub trait Canvas {
    /// Draw `image` scaled to fill `dst`. Pixels outside the canvas are clipped.
    fn draw_image(&mut self, image: &Image, dst: Rect);

    /// Present what was drawn and release the handle.
    fn unlock_and_post(self: Box<Self>);
}

/// Nearest-neighbour scale of `image` into `dst` on `target`, replacing the
/// pixels underneath. `dst` is inclusive on its right and bottom edges.
pub fn blit_scaled(image: &Image, target: &mut PixmapMut, dst: Rect) {
    if dst.is_empty() {
        return;
    }
    // only the visible part of dst is filled; the shader maps it back to the
    // image, so off-canvas extents never reach the rasterizer
    let left = (dst.left as i64).max(0);
    let top = (dst.top as i64).max(0);
    let right = (dst.right as i64 + 1).min(target.width() as i64);
    let bottom = (dst.bottom as i64 + 1).min(target.height() as i64);
    let visible = match tiny_skia::Rect::from_ltrb(
        left as f32,
        top as f32,
        right as f32,
        bottom as f32,
    ) {
        Some(visible) if left < right && top < bottom => visible,
        _ => return,
    };

    let transform = Transform::from_scale(
        dst.width() as f32 / image.width() as f32,
        dst.height() as f32 / image.height() as f32,
    )
    .post_translate(dst.left as f32, dst.top as f32);
    let paint = Paint {
        shader: Pattern::new(
            image.as_pixmap(),
            SpreadMode::Pad,
            FilterQuality::Nearest,
            1.0,
            transform,
        ),
        blend_mode: BlendMode::Source,
        anti_alias: false,
        ..Paint::default()
    };
    target.fill_rect(visible, &paint, Transform::identity(), None);
}

/// A double-buffered surface backed by pixmaps. Drawing goes to the back
/// buffer; posting copies it to the front buffer.
pub struct MemorySurface {
    size: Size,
    ready: AtomicBool,
    back: Mutex<Pixmap>,
    front: Mutex<Pixmap>,
    posted: AtomicU64,
    refused: AtomicU64,
}

impl MemorySurface {
    pub fn new(size: Size) -> Result<Self, ImageError> {
        let pixmap = || {
            Pixmap::new(size.width, size.height).ok_or(ImageError::InvalidSize {
                width: size.width,
                height: size.height,
            })
        };
        Ok(Self {
            size,
            ready: AtomicBool::new(true),
            back: Mutex::new(pixmap()?),
            front: Mutex::new(pixmap()?),
            posted: AtomicU64::new(0),
            refused: AtomicU64::new(0),
        })
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// While not ready, [`Surface::lock_canvas`] returns `None`.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Number of canvases posted so far.
    pub fn frames_posted(&self) -> u64 {
        self.posted.load(Ordering::SeqCst)
    }

    /// Number of `lock_canvas` calls refused because the surface was not ready.
    pub fn canvases_refused(&self) -> u64 {
        self.refused.load(Ordering::SeqCst)
    }

    /// Copy of the front buffer.
    pub fn snapshot(&self) -> Image {
        Image::from_pixmap(lock(&self.front).clone())
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let px = lock(&self.front).pixel(x, y)?;
        Some([px.red(), px.green(), px.blue(), px.alpha()])
    }
}

impl Surface for MemorySurface {
    fn lock_canvas(&self) -> Option<Box<dyn Canvas + '_>> {
        if !self.ready.load(Ordering::SeqCst) {
            self.refused.fetch_add(1, Ordering::SeqCst);
            return None;
        }
        // another holder means the surface is busy; same as not ready
        let back = match self.back.try_lock() {
            Ok(back) => back,
            Err(TryLockError::Poisoned(e)) => e.into_inner(),
            Err(TryLockError::WouldBlock) => {
                self.refused.fetch_add(1, Ordering::SeqCst);
                return None;
            }
        };
        Some(Box::new(MemoryCanvas {
            surface: self,
            back,
        }))
    }
}

struct MemoryCanvas<'a> {
    surface: &'a MemorySurface,
    back: MutexGuard<'a, Pixmap>,
}

impl Canvas for MemoryCanvas<'_> {
    fn draw_image(&mut self, image: &Image, dst: Rect) {
        blit_scaled(image, &mut Pixmap::as_mut(&mut self.back), dst);
    }

    fn unlock_and_post(self: Box<Self>) {
        lock(&self.surface.front)
            .data_mut()
            .copy_from_slice(self.back.data());
        self.surface.posted.fetch_add(1, Ordering::SeqCst);
        log::trace!("memory surface posted frame {}", self.surface.frames_posted());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAR: [u8; 4] = [0, 0, 0, 0];
    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];

    fn checker() -> Image {
        let mut data = Vec::new();
        data.extend_from_slice(&RED);
        data.extend_from_slice(&BLUE);
        data.extend_from_slice(&BLUE);
        data.extend_from_slice(&RED);
        Image::new(2, 2, data).unwrap()
    }

    fn surface(width: u32, height: u32) -> MemorySurface {
        MemorySurface::new(Size::new(width, height)).unwrap()
    }

    #[test]
    fn blit_scales_up_nearest_neighbour() {
        let surface = surface(4, 4);
        let mut canvas = surface.lock_canvas().unwrap();
        canvas.draw_image(&checker(), Rect::new(0, 0, 3, 3));
        canvas.unlock_and_post();

        assert_eq!(surface.pixel(0, 0), Some(RED));
        assert_eq!(surface.pixel(1, 1), Some(RED));
        assert_eq!(surface.pixel(2, 0), Some(BLUE));
        assert_eq!(surface.pixel(3, 1), Some(BLUE));
        assert_eq!(surface.pixel(0, 3), Some(BLUE));
        assert_eq!(surface.pixel(3, 3), Some(RED));
        assert_eq!(surface.frames_posted(), 1);
    }

    #[test]
    fn blit_leaves_letterbox_untouched() {
        let surface = surface(4, 6);
        let mut canvas = surface.lock_canvas().unwrap();
        canvas.draw_image(&Image::filled(4, 3, RED).unwrap(), Rect::new(0, 1, 3, 3));
        canvas.unlock_and_post();

        for x in 0..4 {
            assert_eq!(surface.pixel(x, 0), Some(CLEAR));
            assert_eq!(surface.pixel(x, 2), Some(RED));
            assert_eq!(surface.pixel(x, 4), Some(CLEAR));
        }
    }

    #[test]
    fn blit_clips_to_canvas() {
        let mut pixmap = Pixmap::new(2, 2).unwrap();
        blit_scaled(
            &Image::filled(1, 1, RED).unwrap(),
            &mut pixmap.as_mut(),
            Rect::new(-5, -5, 10, 10),
        );
        assert!(pixmap.data().chunks(4).all(|px| px == RED));
    }

    #[test]
    fn blit_survives_extreme_rects() {
        let surface = surface(4, 2);
        let mut canvas = surface.lock_canvas().unwrap();
        canvas.draw_image(&checker(), Rect::new(i32::MIN, 0, i32::MAX, 1));
        canvas.draw_image(&checker(), Rect::new(i32::MAX, 0, i32::MAX, 1));
        canvas.draw_image(&checker(), Rect::new(i32::MIN, i32::MIN, i32::MIN, i32::MIN));
        canvas.unlock_and_post();
        assert_eq!(surface.frames_posted(), 1);
    }

    #[test]
    fn blit_replaces_rather_than_blends() {
        let surface = surface(1, 1);
        let mut canvas = surface.lock_canvas().unwrap();
        canvas.draw_image(&Image::filled(1, 1, RED).unwrap(), Rect::new(0, 0, 0, 0));
        canvas.draw_image(&Image::filled(1, 1, CLEAR).unwrap(), Rect::new(0, 0, 0, 0));
        canvas.unlock_and_post();
        assert_eq!(surface.pixel(0, 0), Some(CLEAR));
    }

    #[test]
    fn nothing_is_visible_until_posted() {
        let surface = surface(2, 2);
        let mut canvas = surface.lock_canvas().unwrap();
        canvas.draw_image(&Image::filled(2, 2, RED).unwrap(), Rect::new(0, 0, 1, 1));
        assert_eq!(surface.pixel(0, 0), Some(CLEAR));
        canvas.unlock_and_post();
        assert_eq!(surface.pixel(0, 0), Some(RED));
    }

    #[test]
    fn snapshot_matches_posted_frame() {
        let surface = surface(2, 2);
        let image = checker();
        let mut canvas = surface.lock_canvas().unwrap();
        canvas.draw_image(&image, Rect::new(0, 0, 1, 1));
        canvas.unlock_and_post();
        assert_eq!(surface.snapshot(), image);
        assert_eq!(surface.snapshot().size(), surface.size());
    }

    #[test]
    fn zero_sized_surface_rejected() {
        assert!(matches!(
            MemorySurface::new(Size::new(0, 4)),
            Err(ImageError::InvalidSize { .. })
        ));
    }

    #[test]
    fn not_ready_surface_refuses_canvas() {
        let surface = surface(2, 2);
        surface.set_ready(false);
        assert!(surface.lock_canvas().is_none());
        assert_eq!(surface.canvases_refused(), 1);
        surface.set_ready(true);
        assert!(surface.lock_canvas().is_some());
    }

    #[test]
    fn canvas_is_exclusive() {
        let surface = surface(2, 2);
        let held = surface.lock_canvas();
        assert!(held.is_some());
        assert!(surface.lock_canvas().is_none());
        drop(held);
        assert!(surface.lock_canvas().is_some());
    }
}
