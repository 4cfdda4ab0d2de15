// ============================================================================
// STROKES — solid round-capped polylines
// ============================================================================

use crate::canvas::{PixelBuffer, Rgb};

/// A pointer position in canvas pixel space. Pixel `(x, y)` covers
/// `[x, x+1) × [y, y+1)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// Inclusive pixel bounds `(min_x, min_y, max_x, max_y)`.
pub type PixelBounds = (u32, u32, u32, u32);

fn union(a: Option<PixelBounds>, b: Option<PixelBounds>) -> Option<PixelBounds> {
    match (a, b) {
        (Some(a), Some(b)) => Some((a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3))),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Paint every pixel whose center lies within `width / 2` of the segment
/// `from → to`. The covered shape is a capsule, so consecutive segments of a
/// polyline meet with round joins and the ends get round caps.
///
/// Pixels outside the buffer are clipped, and a segment with a NaN or
/// infinite endpoint paints nothing. Returns the repainted bounds.
pub fn draw_segment(
    buffer: &mut PixelBuffer,
    from: Point,
    to: Point,
    color: Rgb,
    width: u32,
) -> Option<PixelBounds> {
    if !from.is_finite() || !to.is_finite() {
        return None;
    }
    let radius = width.max(1) as f32 / 2.0;
    let radius_sq = radius * radius;
    let (bw, bh) = (buffer.width() as i64, buffer.height() as i64);

    let min_x = ((from.x.min(to.x) - radius - 0.5).floor() as i64).max(0);
    let min_y = ((from.y.min(to.y) - radius - 0.5).floor() as i64).max(0);
    let max_x = ((from.x.max(to.x) + radius).ceil() as i64).min(bw - 1);
    let max_y = ((from.y.max(to.y) + radius).ceil() as i64).min(bh - 1);
    if min_x > max_x || min_y > max_y {
        return None;
    }

    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let len_sq = dx * dx + dy * dy;
    let px = color.to_rgba().0;

    let mut bounds: Option<PixelBounds> = None;
    for y in min_y..=max_y {
        let cy = y as f32 + 0.5;
        for x in min_x..=max_x {
            let cx = x as f32 + 0.5;
            // Closest point on the segment to the pixel center.
            let t = if len_sq > f32::EPSILON {
                (((cx - from.x) * dx + (cy - from.y) * dy) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let ex = cx - (from.x + dx * t);
            let ey = cy - (from.y + dy * t);
            if ex * ex + ey * ey > radius_sq {
                continue;
            }
            let o = buffer.offset(x as u32, y as u32);
            buffer.raw_mut()[o..o + 4].copy_from_slice(&px);
            bounds = union(bounds, Some((x as u32, y as u32, x as u32, y as u32)));
        }
    }
    bounds
}

/// Summary of a finished stroke.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeSummary {
    /// Number of pointer positions, including the starting one.
    pub points: usize,
    /// Union of everything the stroke painted.
    pub bounds: Option<PixelBounds>,
}

#[derive(Clone, Copy, Debug)]
struct ActiveStroke {
    last: Point,
    points: usize,
    bounds: Option<PixelBounds>,
}

/// Tracks the in-progress stroke between pointer-down and pointer-up.
///
/// Segments are painted straight into the live buffer as the pointer moves;
/// nothing here touches history.
#[derive(Debug, Default)]
pub struct StrokeRenderer {
    active: Option<ActiveStroke>,
}

impl StrokeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Start a stroke at `point`. Nothing is painted until the first
    /// extension. Starting while another stroke is active discards the old
    /// one's tracking state.
    pub fn begin_stroke(&mut self, point: Point) {
        self.active = Some(ActiveStroke {
            last: point,
            points: 1,
            bounds: None,
        });
    }

    /// Paint one segment of the active stroke. A non-finite `to` is dropped
    /// and the stroke keeps its last position.
    pub fn extend_stroke(
        &mut self,
        buffer: &mut PixelBuffer,
        from: Point,
        to: Point,
        color: Rgb,
        width: u32,
    ) -> Option<PixelBounds> {
        let stroke = self.active.as_mut()?;
        if !to.is_finite() {
            return None;
        }
        let painted = draw_segment(buffer, from, to, color, width);
        stroke.last = to;
        stroke.points += 1;
        stroke.bounds = union(stroke.bounds, painted);
        painted
    }

    /// Paint from the last reported position to `to`. No-op without an
    /// active stroke.
    pub fn extend_to(
        &mut self,
        buffer: &mut PixelBuffer,
        to: Point,
        color: Rgb,
        width: u32,
    ) -> Option<PixelBounds> {
        let from = self.active.as_ref()?.last;
        self.extend_stroke(buffer, from, to, color, width)
    }

    /// Finish the active stroke. Returns `None` when no stroke was active.
    pub fn end_stroke(&mut self) -> Option<StrokeSummary> {
        self.active.take().map(|s| StrokeSummary {
            points: s.points,
            bounds: s.bounds,
        })
    }
}
