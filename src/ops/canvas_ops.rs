// ============================================================================
// CANVAS-LEVEL OPERATIONS — blank / background resets
// ============================================================================

use image::{Rgba, RgbaImage};

use crate::canvas::{PixelBuffer, PixelRect, ResampleFilter};

/// Reset the whole buffer to `blank`, then stretch `background` (if any) over
/// the full canvas.
///
/// This function does NOT push undo history itself; the session commits
/// after calling it.
pub fn reset_surface(
    buffer: &mut PixelBuffer,
    blank: Rgba<u8>,
    background: Option<&RgbaImage>,
    filter: ResampleFilter,
) {
    buffer.clear(blank);
    if let Some(img) = background {
        let full = PixelRect::new(0, 0, buffer.width(), buffer.height());
        buffer.composite_image(img, full, filter);
    }
}

/// Scale `src` to exactly `width × height` with the given filter. Returns a
/// copy unchanged when the dimensions already match.
pub fn resample_to(src: &RgbaImage, width: u32, height: u32, filter: ResampleFilter) -> RgbaImage {
    if src.dimensions() == (width, height) {
        return src.clone();
    }
    image::imageops::resize(src, width, height, filter.to_image_filter())
}
