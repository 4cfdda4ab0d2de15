//! Integration tests: session-level undo/redo.
//!
//! Drives a `CanvasSession` the way a pointer surface would and checks that
//! every completed gesture lands in history exactly once and that undo/redo
//! restore byte-identical buffers.

use image::Rgba;
use pretty_assertions::assert_eq;
use sketchpad::{CanvasSession, PixelBuffer, Rgb, Tool};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

fn session() -> CanvasSession {
    CanvasSession::with_size(800, 600)
}

/// One distinct, committed edit per call: fill the whole canvas with a
/// color derived from `i`.
fn distinct_edit(s: &mut CanvasSession, i: u8) {
    s.set_color(Rgb([i.wrapping_mul(37), 255 - i, i]));
    s.fill_at(0, 0).unwrap();
}

// ─── Strokes ────────────────────────────────────────────────────────────

#[test]
fn stroke_with_many_points_is_one_history_entry() {
    let mut s = session();
    s.set_brush_width(5);
    s.pointer_down(10.0, 10.0).unwrap();
    for i in 0..=400 {
        s.pointer_move(10.0, 10.0 + i as f32 * 0.1);
    }
    assert_eq!(s.history().len(), 1);
    s.pointer_up();

    assert_eq!(s.history().len(), 2);
    assert_eq!(s.history().index(), 1);
    assert_eq!(s.buffer().get(10, 30).unwrap(), BLACK);
    assert_eq!(s.buffer().get(10, 5).unwrap(), WHITE);
    assert_eq!(s.buffer().get(20, 30).unwrap(), WHITE);
}

#[test]
fn press_and_release_without_moving_commits_unchanged_buffer() {
    let mut s = session();
    let blank = s.buffer().clone();
    s.pointer_down(100.0, 100.0).unwrap();
    s.pointer_up();
    assert_eq!(s.history().len(), 2);
    assert_eq!(s.buffer(), &blank);
}

#[test]
fn release_without_press_is_noop() {
    let mut s = session();
    assert!(!s.pointer_up());
    assert!(!s.pointer_leave());
    assert_eq!(s.history().len(), 1);
}

#[test]
fn switching_to_fill_mid_stroke_freezes_the_stroke() {
    let mut s = CanvasSession::with_size(40, 40);
    s.pointer_down(5.0, 5.0).unwrap();
    assert!(s.pointer_move(5.0, 20.0));
    let painted = s.buffer().clone();

    s.set_tool(Tool::Fill);
    assert!(!s.pointer_move(30.0, 20.0));
    assert_eq!(s.buffer(), &painted);
    assert_eq!(s.history().len(), 1);

    assert!(s.pointer_up());
    assert_eq!(s.history().len(), 2);
    assert_eq!(s.buffer(), &painted);
    assert!(!s.pointer_up());
    assert_eq!(s.history().len(), 2);
    assert_eq!(s.history_labels(), vec!["New Canvas", "Brush Stroke"]);
}

#[test]
fn fill_press_during_open_stroke_commits_stroke_then_fill() {
    let mut s = CanvasSession::with_size(40, 40);
    s.pointer_down(5.0, 5.0).unwrap();
    s.pointer_move(5.0, 20.0);
    let stroked = s.buffer().clone();

    s.set_tool(Tool::Fill);
    s.set_color(Rgb([0, 200, 0]));
    s.pointer_down(30.0, 30.0).unwrap();

    assert!(!s.is_stroke_active());
    assert_eq!(s.history_labels(), vec!["New Canvas", "Brush Stroke", "Fill"]);
    assert_eq!(s.buffer().get(30, 30).unwrap(), Rgba([0, 200, 0, 255]));
    assert_eq!(s.buffer().get(5, 12).unwrap(), BLACK);

    // one undo per completed action
    assert!(s.undo());
    assert_eq!(s.buffer(), &stroked);
    assert!(s.undo());
    assert_eq!(s.buffer().get(5, 12).unwrap(), WHITE);
}

// ─── Undo / redo ────────────────────────────────────────────────────────

#[test]
fn undo_redo_restore_exact_snapshots() {
    let n = 4u8;
    let mut s = CanvasSession::with_size(32, 24);
    let mut states: Vec<PixelBuffer> = vec![s.buffer().clone()];
    for i in 1..=n {
        distinct_edit(&mut s, i);
        states.push(s.buffer().clone());
    }

    for u in 0..=n as usize {
        for r in 0..=u {
            let mut replay = CanvasSession::with_size(32, 24);
            for i in 1..=n {
                distinct_edit(&mut replay, i);
            }
            for _ in 0..u {
                replay.undo();
            }
            for _ in 0..r {
                replay.redo();
            }
            let expected = n as usize - u + r;
            assert_eq!(replay.history().index(), expected as isize, "u={} r={}", u, r);
            assert_eq!(replay.buffer(), &states[expected], "u={} r={}", u, r);
        }
    }
}

#[test]
fn undo_at_start_is_noop() {
    let mut s = session();
    let blank = s.buffer().clone();
    assert!(!s.can_undo());
    assert!(!s.undo());
    assert_eq!(s.history().index(), 0);
    assert_eq!(s.buffer(), &blank);
}

#[test]
fn commit_after_undo_discards_redo() {
    let mut s = CanvasSession::with_size(32, 24);
    distinct_edit(&mut s, 1);
    distinct_edit(&mut s, 2);
    distinct_edit(&mut s, 3);
    assert!(s.undo());
    assert!(s.undo());
    assert!(s.can_redo());

    s.clear();
    assert!(!s.can_redo());
    assert!(!s.redo());
    assert_eq!(s.history().len(), 3);
    assert_eq!(s.history_labels(), vec!["New Canvas", "Fill", "Clear"]);
}

#[test]
fn tool_changes_do_not_create_history() {
    let mut s = session();
    s.set_tool(Tool::Fill);
    s.set_tool(Tool::Draw);
    s.set_color(Rgb([1, 2, 3]));
    s.set_brush_width(30);
    s.select_eraser();
    assert_eq!(s.history().len(), 1);
    assert!(s.brush_width_enabled());
}

// ─── Fill through the session ───────────────────────────────────────────

#[test]
fn fill_repaints_whole_uniform_canvas() {
    let mut s = session();
    s.set_tool(Tool::Fill);
    s.set_color(Rgb([0, 128, 255]));
    let report = s.fill_at(400, 300).unwrap();
    assert_eq!(report.painted, 800 * 600);
    assert!(
        s.buffer()
            .as_raw()
            .chunks_exact(4)
            .all(|p| p == [0, 128, 255, 255])
    );
    assert!(!s.brush_width_enabled());
}

#[test]
fn fill_stops_at_stroke_outline() {
    let mut s = CanvasSession::with_size(60, 60);
    s.set_brush_width(3);
    // closed square outline
    s.pointer_down(10.0, 10.0).unwrap();
    s.pointer_move(50.0, 10.0);
    s.pointer_move(50.0, 50.0);
    s.pointer_move(10.0, 50.0);
    s.pointer_move(10.0, 10.0);
    s.pointer_up();

    s.set_tool(Tool::Fill);
    s.set_color(Rgb([255, 0, 0]));
    s.pointer_down(30.0, 30.0).unwrap();

    assert_eq!(s.buffer().get(30, 30).unwrap(), Rgba([255, 0, 0, 255]));
    assert_eq!(s.buffer().get(2, 2).unwrap(), WHITE);
    assert_eq!(s.buffer().get(57, 30).unwrap(), WHITE);
    assert_eq!(s.history().len(), 3);

    // one undo removes the fill, the outline survives
    s.undo();
    assert_eq!(s.buffer().get(30, 30).unwrap(), WHITE);
    assert_eq!(s.buffer().get(30, 10).unwrap(), BLACK);
}
