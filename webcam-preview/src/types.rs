//! Plain value types shared between the layout calculator, the frame pump and
//! surface implementations.

use std::{fmt, sync::Arc};

use derive_more::{From, Into};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tiny_skia::{Color, IntSize, Pixmap, PixmapRef};

/// Bytes per pixel of the 32-bit RGBA format every image is stored in.
pub const BYTES_PER_PIXEL: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("image buffer has {actual} bytes, expected {expected}")]
    BadLength { expected: usize, actual: usize },
    #[error("invalid image size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize, Serialize, From, Into)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}
impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Destination rectangle on a surface. `right` and `bottom` are inclusive, so a
/// rect covering a 640x480 window is `(0, 0, 639, 479)`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}
impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }
    pub fn width(&self) -> i64 {
        (self.right as i64 - self.left as i64 + 1).max(0)
    }
    pub fn height(&self) -> i64 {
        (self.bottom as i64 - self.top as i64 + 1).max(0)
    }
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// A decoded frame in 32-bit premultiplied RGBA. Cloning shares the pixel
/// buffer.
#[derive(Clone)]
pub struct Image {
    pixmap: Arc<Pixmap>,
}
impl Image {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ImageError> {
        let size = int_size(width, height)?;
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        let actual = data.len();
        let pixmap =
            Pixmap::from_vec(data, size).ok_or(ImageError::BadLength { expected, actual })?;
        Ok(Self::from_pixmap(pixmap))
    }

    /// An image filled with a single straight-alpha color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, ImageError> {
        let mut pixmap =
            Pixmap::new(width, height).ok_or(ImageError::InvalidSize { width, height })?;
        pixmap.fill(Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]));
        Ok(Self::from_pixmap(pixmap))
    }

    pub fn from_pixmap(pixmap: Pixmap) -> Self {
        Self {
            pixmap: Arc::new(pixmap),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }
    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }
    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }
    pub fn as_pixmap(&self) -> PixmapRef<'_> {
        (*self.pixmap).as_ref()
    }

    /// Premultiplied RGBA at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let px = self.pixmap.pixel(x, y)?;
        Some([px.red(), px.green(), px.blue(), px.alpha()])
    }
}
impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        self.size() == other.size() && self.data() == other.data()
    }
}
impl Eq for Image {}
impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

fn int_size(width: u32, height: u32) -> Result<IntSize, ImageError> {
    IntSize::from_wh(width, height).ok_or(ImageError::InvalidSize { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_rejects_short_buffer() {
        let err = Image::new(2, 2, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            ImageError::BadLength {
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn image_rejects_zero_size() {
        assert_eq!(
            Image::filled(0, 4, [0, 0, 0, 255]).unwrap_err(),
            ImageError::InvalidSize {
                width: 0,
                height: 4
            }
        );
        assert!(matches!(
            Image::new(4, 0, Vec::new()),
            Err(ImageError::InvalidSize { .. })
        ));
    }

    #[test]
    fn filled_image_reads_back() {
        let image = Image::filled(3, 2, [1, 2, 3, 255]).unwrap();
        assert_eq!(image.data().len(), 24);
        assert_eq!(image.pixel(2, 1), Some([1, 2, 3, 255]));
        assert_eq!(image.pixel(3, 0), None);
    }

    #[test]
    fn filled_image_is_premultiplied() {
        let image = Image::filled(1, 1, [255, 0, 0, 128]).unwrap();
        assert_eq!(image.pixel(0, 0), Some([128, 0, 0, 128]));
    }

    #[test]
    fn raw_buffer_round_trips() {
        let data = vec![10, 20, 30, 255, 40, 50, 60, 255];
        let image = Image::new(2, 1, data.clone()).unwrap();
        assert_eq!(image.data(), &data[..]);
        assert_eq!(image.pixel(1, 0), Some([40, 50, 60, 255]));
        assert_eq!(image, image.clone());
    }

    #[test]
    fn rect_dimensions_are_inclusive() {
        let rect = Rect::new(0, 0, 639, 479);
        assert_eq!(rect.width(), 640);
        assert_eq!(rect.height(), 480);
        assert!(Rect::new(0, 5, -1, 4).is_empty());
    }

    #[test]
    fn extreme_rect_dimensions_do_not_overflow() {
        let rect = Rect::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX);
        assert_eq!(rect.width(), 1 << 32);
        assert_eq!(rect.height(), 1 << 32);
        assert!(Rect::new(i32::MAX, 0, i32::MIN, 0).is_empty());
    }

    #[test]
    fn size_converts_from_tuple() {
        let size: Size = (640, 480).into();
        assert_eq!(size, Size::new(640, 480));
        let (w, h): (u32, u32) = size.into();
        assert_eq!((w, h), (640, 480));
    }
}
