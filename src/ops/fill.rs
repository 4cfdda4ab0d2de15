// ============================================================================
// FLOOD FILL — 4-connected, exact RGB match, explicit stack
// ============================================================================

use crate::canvas::{PixelBuffer, Rgb};
use crate::error::CanvasError;

/// What a fill touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct FillReport {
    /// Number of pixels repainted.
    pub painted: usize,
    /// Inclusive `(min_x, min_y, max_x, max_y)` of the repainted pixels,
    /// `None` when nothing changed.
    pub bounds: Option<(u32, u32, u32, u32)>,
}

impl FillReport {
    pub fn is_noop(&self) -> bool {
        self.painted == 0
    }
}

/// Flood-fill the 4-connected region containing `(seed_x, seed_y)` with
/// `target`.
///
/// Matching compares R, G and B against the seed pixel and ignores alpha.
/// Every repainted pixel gets alpha 255, so filling a translucent region
/// leaves it opaque. When the seed already has the target RGB the buffer is
/// left untouched.
///
/// The traversal is a LIFO stack of coordinates; neighbors are pushed in the
/// order right, left, down, up and range-checked when popped.
pub fn flood_fill(
    buffer: &mut PixelBuffer,
    seed_x: i64,
    seed_y: i64,
    target: Rgb,
) -> Result<FillReport, CanvasError> {
    let start = Rgb::from_rgba(buffer.get(seed_x, seed_y)?);
    if start == target {
        return Ok(FillReport::default());
    }

    let width = buffer.width() as i64;
    let height = buffer.height() as i64;
    let fill_px = target.to_rgba().0;

    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut painted = 0usize;

    // i32 pairs keep the stack at 8 bytes per entry; a full 800×600 fill
    // peaks well under 2M entries.
    let mut stack: Vec<(i32, i32)> = Vec::with_capacity(4096);
    stack.push((seed_x as i32, seed_y as i32));

    while let Some((x, y)) = stack.pop() {
        if x < 0 || y < 0 || x as i64 >= width || y as i64 >= height {
            continue;
        }
        let (ux, uy) = (x as u32, y as u32);
        let o = buffer.offset(ux, uy);
        let raw = buffer.raw_mut();
        if !start.matches(&raw[o..o + 4]) {
            continue;
        }
        raw[o..o + 4].copy_from_slice(&fill_px);
        painted += 1;

        min_x = min_x.min(ux);
        min_y = min_y.min(uy);
        max_x = max_x.max(ux);
        max_y = max_y.max(uy);

        stack.push((x + 1, y));
        stack.push((x - 1, y));
        stack.push((x, y + 1));
        stack.push((x, y - 1));
    }

    let bounds = if painted > 0 {
        Some((min_x, min_y, max_x, max_y))
    } else {
        None
    };
    Ok(FillReport { painted, bounds })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use pretty_assertions::assert_eq;

    const RED: Rgb = Rgb([255, 0, 0]);

    fn buffer_from_rows(rows: &[&str]) -> PixelBuffer {
        // '.' = white, '#' = black
        let h = rows.len() as u32;
        let w = rows[0].len() as u32;
        let mut buf = PixelBuffer::new(w, h);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let px = match ch {
                    '#' => Rgba([0, 0, 0, 255]),
                    _ => Rgba([255, 255, 255, 255]),
                };
                buf.set(x as i64, y as i64, px).unwrap();
            }
        }
        buf
    }

    #[test]
    fn uniform_buffer_is_filled_completely() {
        let mut buf = PixelBuffer::new_filled(37, 23, Rgba([10, 20, 30, 255]));
        let report = flood_fill(&mut buf, 5, 17, RED).unwrap();
        assert_eq!(report.painted, 37 * 23);
        assert_eq!(report.bounds, Some((0, 0, 36, 22)));
        assert!(buf.as_raw().chunks_exact(4).all(|p| p == [255, 0, 0, 255]));
    }

    #[test]
    fn full_default_canvas_does_not_overflow() {
        let mut buf = PixelBuffer::new_filled(800, 600, Rgba([255, 255, 255, 255]));
        let report = flood_fill(&mut buf, 799, 599, Rgb::BLACK).unwrap();
        assert_eq!(report.painted, 480_000);
    }

    #[test]
    fn same_rgb_target_is_a_noop_even_with_different_alpha() {
        let mut buf = PixelBuffer::new_filled(6, 6, Rgba([255, 0, 0, 40]));
        let before = buf.clone();
        let report = flood_fill(&mut buf, 2, 2, RED).unwrap();
        assert!(report.is_noop());
        assert_eq!(buf.as_raw(), before.as_raw());
    }

    #[test]
    fn translucent_region_becomes_opaque() {
        let mut buf = PixelBuffer::new_filled(3, 3, Rgba([0, 0, 255, 10]));
        flood_fill(&mut buf, 1, 1, RED).unwrap();
        assert!(buf.as_raw().chunks_exact(4).all(|p| p[3] == 255));
    }

    #[test]
    fn alpha_is_ignored_when_matching() {
        let mut buf = PixelBuffer::new_filled(2, 1, Rgba([0, 0, 0, 255]));
        buf.set(1, 0, Rgba([0, 0, 0, 0])).unwrap();
        let report = flood_fill(&mut buf, 0, 0, RED).unwrap();
        assert_eq!(report.painted, 2);
    }

    #[test]
    fn diagonal_contact_does_not_connect_regions() {
        // Two white regions touch only at the corner between (1,1) and (2,2).
        let mut buf = buffer_from_rows(&[
            "..##", //
            "..##", //
            "##..", //
            "##..", //
        ]);
        let report = flood_fill(&mut buf, 0, 0, RED).unwrap();
        assert_eq!(report.painted, 4);
        assert_eq!(buf.get(1, 1).unwrap(), Rgba([255, 0, 0, 255]));
        assert_eq!(buf.get(2, 2).unwrap(), Rgba([255, 255, 255, 255]));
        assert_eq!(buf.get(3, 3).unwrap(), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn fill_stops_at_differently_colored_border() {
        let mut buf = buffer_from_rows(&[
            ".....", //
            ".###.", //
            ".#.#.", //
            ".###.", //
            ".....", //
        ]);
        let report = flood_fill(&mut buf, 2, 2, RED).unwrap();
        assert_eq!(report.painted, 1);
        assert_eq!(report.bounds, Some((2, 2, 2, 2)));
        assert_eq!(buf.get(0, 0).unwrap(), Rgba([255, 255, 255, 255]));
        assert_eq!(buf.get(1, 1).unwrap(), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn ring_around_island_is_filled_without_the_island() {
        let mut buf = buffer_from_rows(&[
            ".....", //
            ".###.", //
            ".#.#.", //
            ".###.", //
            ".....", //
        ]);
        let report = flood_fill(&mut buf, 0, 0, RED).unwrap();
        assert_eq!(report.painted, 16);
        assert_eq!(buf.get(2, 2).unwrap(), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn seed_outside_buffer_is_an_error_and_changes_nothing() {
        let mut buf = PixelBuffer::new_filled(4, 4, Rgba([255, 255, 255, 255]));
        let before = buf.clone();
        assert!(matches!(
            flood_fill(&mut buf, 4, 0, RED),
            Err(CanvasError::OutOfBounds { .. })
        ));
        assert!(flood_fill(&mut buf, 0, -1, RED).is_err());
        assert_eq!(buf, before);
    }

    #[test]
    fn repeated_fill_is_deterministic() {
        let rows = [
            "..#..#", //
            ".##..#", //
            "...#..", //
            "#.....", //
        ];
        let mut a = buffer_from_rows(&rows);
        let mut b = buffer_from_rows(&rows);
        flood_fill(&mut a, 0, 0, RED).unwrap();
        flood_fill(&mut b, 0, 0, RED).unwrap();
        assert_eq!(a.as_raw(), b.as_raw());
    }
}
