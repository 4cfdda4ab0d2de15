use image::{Rgba, RgbaImage, imageops};
use rayon::prelude::*;

use crate::error::CanvasError;

/// Default canvas width for a new session.
pub const DEFAULT_WIDTH: u32 = 800;
/// Default canvas height for a new session.
pub const DEFAULT_HEIGHT: u32 = 600;

/// Largest canvas we are willing to allocate (~256 megapixels).
const MAX_PIXELS: u64 = 256_000_000;

// ============================================================================
// COLORS
// ============================================================================

/// An opaque drawing color. Tools never carry alpha; pixels written by the
/// stroke and fill tools are always fully opaque.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const BLACK: Rgb = Rgb([0, 0, 0]);
    pub const WHITE: Rgb = Rgb([255, 255, 255]);

    /// Parse `#rrggbb` (the leading `#` is required).
    pub fn from_hex(s: &str) -> Result<Self, CanvasError> {
        let invalid = || CanvasError::InvalidColor(s.to_string());
        let [r, g, b] = hex_channels::<3>(s).ok_or_else(invalid)?;
        Ok(Rgb([r, g, b]))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }

    /// The color as a fully opaque pixel.
    #[inline]
    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.0[0], self.0[1], self.0[2], 255])
    }

    /// Drop the alpha channel of a pixel.
    #[inline]
    pub fn from_rgba(p: Rgba<u8>) -> Self {
        Rgb([p[0], p[1], p[2]])
    }

    /// RGB-only comparison; alpha is ignored.
    #[inline]
    pub fn matches(self, p: &[u8]) -> bool {
        p[0] == self.0[0] && p[1] == self.0[1] && p[2] == self.0[2]
    }
}

/// Fully transparent black, the blank of a canvas configured as `transparent`.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Parse a blank-canvas color: `transparent`, `#rrggbb` (opaque) or
/// `#rrggbbaa`.
pub fn parse_blank(s: &str) -> Result<Rgba<u8>, CanvasError> {
    if s == "transparent" {
        return Ok(TRANSPARENT);
    }
    if let Some([r, g, b]) = hex_channels::<3>(s) {
        return Ok(Rgba([r, g, b, 255]));
    }
    hex_channels::<4>(s)
        .map(Rgba)
        .ok_or_else(|| CanvasError::InvalidColor(s.to_string()))
}

/// Inverse of [`parse_blank`].
pub fn blank_to_string(p: Rgba<u8>) -> String {
    match p[3] {
        0 => "transparent".to_string(),
        255 => Rgb::from_rgba(p).to_hex(),
        a => format!("{}{:02x}", Rgb::from_rgba(p).to_hex(), a),
    }
}

/// `#` followed by exactly `N` two-digit hex channels, nothing around it.
fn hex_channels<const N: usize>(s: &str) -> Option<[u8; N]> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != N * 2 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let mut out = [0u8; N];
    for (i, c) in out.iter_mut().enumerate() {
        *c = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(out)
}

// ============================================================================
// RESAMPLING
// ============================================================================

/// Filter used when an imported image is scaled to the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ResampleFilter {
    Nearest,
    #[default]
    Bilinear,
}

impl ResampleFilter {
    pub fn to_image_filter(self) -> imageops::FilterType {
        match self {
            ResampleFilter::Nearest => imageops::FilterType::Nearest,
            ResampleFilter::Bilinear => imageops::FilterType::Triangle,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ResampleFilter::Nearest => "nearest",
            ResampleFilter::Bilinear => "bilinear",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "nearest" | "nn" => Some(ResampleFilter::Nearest),
            "bilinear" | "linear" | "triangle" => Some(ResampleFilter::Bilinear),
            _ => None,
        }
    }
}

/// Destination rectangle for [`PixelBuffer::composite_image`]. May extend past
/// the buffer edges; the overhang is clipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

// ============================================================================
// PIXEL BUFFER
// ============================================================================

/// Fixed-size, dense RGBA8 raster. The raw length is always
/// `width * height * 4`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    image: RgbaImage,
}

impl PixelBuffer {
    // ---- construction -------------------------------------------------------

    /// Create a fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = {
            let total = (width as u64) * (height as u64);
            if total > MAX_PIXELS || width == 0 || height == 0 {
                log_warn!(
                    "PixelBuffer::new: dimensions {}×{} rejected, clamped to 1×1",
                    width,
                    height
                );
                (1, 1)
            } else {
                (width, height)
            }
        };
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn new_filled(width: u32, height: u32, color: Rgba<u8>) -> Self {
        let mut buf = Self::new(width, height);
        buf.clear(color);
        buf
    }

    pub fn from_rgba_image(src: RgbaImage) -> Self {
        if src.width() == 0 || src.height() == 0 {
            return Self::new(1, 1);
        }
        Self { image: src }
    }

    // ---- dimensions ---------------------------------------------------------

    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width() as i64 && y < self.height() as i64
    }

    fn check(&self, x: i64, y: i64) -> Result<(u32, u32), CanvasError> {
        if self.contains(x, y) {
            Ok((x as u32, y as u32))
        } else {
            Err(CanvasError::out_of_bounds(x, y, self.width(), self.height()))
        }
    }

    // ---- pixel access -------------------------------------------------------

    pub fn get(&self, x: i64, y: i64) -> Result<Rgba<u8>, CanvasError> {
        let (x, y) = self.check(x, y)?;
        Ok(*self.image.get_pixel(x, y))
    }

    pub fn set(&mut self, x: i64, y: i64, pixel: Rgba<u8>) -> Result<(), CanvasError> {
        let (x, y) = self.check(x, y)?;
        self.image.put_pixel(x, y, pixel);
        Ok(())
    }

    /// Byte offset of pixel `(x, y)`. Callers must have bounds-checked.
    #[inline]
    pub(crate) fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width() as usize + x as usize) * 4
    }

    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub(crate) fn raw_mut(&mut self) -> &mut [u8] {
        &mut *self.image
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        self.image.clone()
    }

    /// Overwrite every pixel from an image of identical dimensions.
    pub fn copy_from(&mut self, src: &RgbaImage) {
        debug_assert_eq!(src.dimensions(), self.image.dimensions());
        self.image.copy_from_slice(src.as_raw());
    }

    // ---- bulk operations ----------------------------------------------------

    /// Set every pixel to `color`.
    pub fn clear(&mut self, color: Rgba<u8>) {
        self.image
            .par_chunks_exact_mut(4)
            .for_each(|px| px.copy_from_slice(&color.0));
    }

    /// Resample `src` to `dest` and blend it source-over onto the buffer.
    ///
    /// Resampling is deterministic for a given filter, so compositing the
    /// same image twice produces identical bytes.
    pub fn composite_image(&mut self, src: &RgbaImage, dest: PixelRect, filter: ResampleFilter) {
        if dest.width == 0 || dest.height == 0 || src.width() == 0 || src.height() == 0 {
            return;
        }
        let scaled;
        let scaled_ref = if src.dimensions() == (dest.width, dest.height) {
            src
        } else {
            scaled = imageops::resize(src, dest.width, dest.height, filter.to_image_filter());
            &scaled
        };

        let width = self.width() as i64;
        let row_bytes = self.width() as usize * 4;
        let x0 = (dest.x as i64).max(0);
        let x1 = (dest.x as i64 + dest.width as i64).min(width);
        if x0 >= x1 {
            return;
        }
        let src_raw = scaled_ref.as_raw();
        let src_row_bytes = dest.width as usize * 4;

        self.image
            .par_chunks_exact_mut(row_bytes)
            .enumerate()
            .for_each(|(y, row)| {
                let sy = y as i64 - dest.y as i64;
                if sy < 0 || sy >= dest.height as i64 {
                    return;
                }
                let src_row = &src_raw[sy as usize * src_row_bytes..][..src_row_bytes];
                for x in x0..x1 {
                    let sx = (x - dest.x as i64) as usize;
                    let s = &src_row[sx * 4..sx * 4 + 4];
                    let d = &mut row[x as usize * 4..x as usize * 4 + 4];
                    blend_over(d, s);
                }
            });
    }
}

/// Source-over blend of unpremultiplied RGBA8 `src` onto `dst`, integer math.
#[inline]
fn blend_over(dst: &mut [u8], src: &[u8]) {
    let sa = src[3] as u32;
    if sa == 255 {
        dst.copy_from_slice(src);
        return;
    }
    if sa == 0 {
        return;
    }
    let da = dst[3] as u32;
    // Destination weight, scaled by 255.
    let dw = da * (255 - sa) / 255;
    let out_a = sa + dw;
    if out_a == 0 {
        dst.copy_from_slice(&[0, 0, 0, 0]);
        return;
    }
    for c in 0..3 {
        let v = (src[c] as u32 * sa + dst[c] as u32 * dw + out_a / 2) / out_a;
        dst[c] = v.min(255) as u8;
    }
    dst[3] = out_a.min(255) as u8;
}
