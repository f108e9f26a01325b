//! Letterboxed placement of a fixed-aspect image inside a window.

use crate::types::{Rect, Size};
use crate::{IMG_HEIGHT, IMG_WIDTH};

/// Compute the largest rect with the aspect ratio of `content` that fits in
/// `window`, centered on the axis with spare room.
///
/// Integer division truncates, so odd remainders put the extra pixel on the
/// bottom/right margin. A zero-sized window yields a zero-area rect. Window
/// dimensions beyond `i32::MAX` are clamped so the rect stays representable.
pub fn compute_rect(window: Size, content: Size) -> Rect {
    if content.is_empty() {
        return Rect::default();
    }
    let max = i32::MAX as i64;
    let (ww, wh) = (
        (window.width as i64).min(max),
        (window.height as i64).min(max),
    );
    let (cw, ch) = (content.width as i64, content.height as i64);

    let scaled_height = ww * ch / cw;
    if scaled_height <= wh {
        let dh = (wh - scaled_height) / 2;
        rect_from(0, dh, ww, scaled_height)
    } else {
        let scaled_width = wh * cw / ch;
        let dw = (ww - scaled_width) / 2;
        rect_from(dw, 0, scaled_width, wh)
    }
}

/// [`compute_rect`] for the fixed capture resolution.
pub fn compute_default_rect(window: Size) -> Rect {
    compute_rect(window, Size::new(IMG_WIDTH, IMG_HEIGHT))
}

fn rect_from(left: i64, top: i64, width: i64, height: i64) -> Rect {
    Rect::new(
        left as i32,
        top as i32,
        (left + width - 1) as i32,
        (top + height - 1) as i32,
    )
}
