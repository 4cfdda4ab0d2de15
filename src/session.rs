use image::{Rgba, RgbaImage};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use uuid::Uuid;

use crate::canvas::{PixelBuffer, ResampleFilter, Rgb};
use crate::components::history::HistoryManager;
use crate::components::tools::{Tool, ToolConfig};
use crate::error::CanvasError;
use crate::io::{self, ExportFormat, PendingLoad};
use crate::ops::canvas_ops::{reset_surface, resample_to};
use crate::ops::fill::{FillReport, flood_fill};
use crate::ops::stroke::{Point, StrokeRenderer};
use crate::settings::CanvasSettings;

// History labels
const LABEL_NEW: &str = "New Canvas";
const LABEL_STROKE: &str = "Brush Stroke";
const LABEL_FILL: &str = "Fill";
const LABEL_CLEAR: &str = "Clear";
const LABEL_LOAD_BACKGROUND: &str = "Load Background";
const LABEL_REMOVE_BACKGROUND: &str = "Remove Background";

/// State-change notification delivered to receivers from
/// [`CanvasSession::subscribe`].
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// A new snapshot was committed at `index`.
    Committed { index: usize, label: String },
    Undone { index: usize },
    Redone { index: usize },
    ToolChanged {
        tool: Tool,
        color: Rgb,
        brush_width: u32,
    },
    BackgroundChanged { present: bool },
}

// ============================================================================
// CANVAS SESSION — the single owner of all mutable canvas state
// ============================================================================

/// One drawing session: the live buffer, its history, the tool settings and
/// the optional background image.
///
/// Every completed mutation (stroke end, fill, clear, background load or
/// removal) commits exactly one snapshot. An in-progress stroke never
/// commits; if another mutating action arrives while a stroke is active the
/// stroke is finished and committed first.
pub struct CanvasSession {
    id: Uuid,
    buffer: PixelBuffer,
    history: HistoryManager,
    tools: ToolConfig,
    strokes: StrokeRenderer,
    /// Background already resampled to the canvas dimensions.
    background: Option<RgbaImage>,
    blank: Rgba<u8>,
    eraser_color: Rgb,
    eraser_width: u32,
    filter: ResampleFilter,
    subscribers: Vec<Sender<SessionEvent>>,
}

impl CanvasSession {
    pub fn new(settings: &CanvasSettings) -> Self {
        let buffer = PixelBuffer::new_filled(settings.width, settings.height, settings.blank);
        let tools = ToolConfig::new(
            settings.default_color,
            settings.default_brush_width,
            settings.min_brush_width,
            settings.max_brush_width,
        );
        let mut session = Self {
            id: Uuid::new_v4(),
            buffer,
            history: HistoryManager::new(settings.history_cap()),
            tools,
            strokes: StrokeRenderer::new(),
            background: None,
            blank: settings.blank,
            eraser_color: settings.eraser_color,
            eraser_width: settings.eraser_width,
            filter: settings.resample_filter,
            subscribers: Vec::new(),
        };
        log_info!(
            "session {}: new {}x{} canvas",
            session.id,
            session.buffer.width(),
            session.buffer.height()
        );
        session.commit(LABEL_NEW);
        session
    }

    /// Session with default settings at the given size.
    pub fn with_size(width: u32, height: u32) -> Self {
        Self::new(&CanvasSettings {
            width,
            height,
            ..CanvasSettings::default()
        })
    }

    // ---- accessors ----------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn tools(&self) -> &ToolConfig {
        &self.tools
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// The pixel value of an empty canvas; may be transparent.
    pub fn blank_color(&self) -> Rgba<u8> {
        self.blank
    }

    pub fn is_stroke_active(&self) -> bool {
        self.strokes.is_active()
    }

    pub fn has_background(&self) -> bool {
        self.background.is_some()
    }

    pub fn brush_width_enabled(&self) -> bool {
        self.tools.brush_width_enabled()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.history.undo_description()
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.history.redo_description()
    }

    pub fn history_labels(&self) -> Vec<&str> {
        self.history.labels()
    }

    /// Receive a [`SessionEvent`] for every subsequent state change.
    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.push(sender);
        receiver
    }

    // ---- pointer input ------------------------------------------------------

    /// Press at canvas coordinates `(x, y)`.
    ///
    /// Draw starts a stroke (nothing is painted until the pointer moves);
    /// Fill floods from the pixel under the pointer and commits. NaN or
    /// infinite coordinates are out of bounds.
    pub fn pointer_down(&mut self, x: f32, y: f32) -> Result<(), CanvasError> {
        let (px, py) = (x.floor() as i64, y.floor() as i64);
        if !Point::new(x, y).is_finite() || !self.buffer.contains(px, py) {
            return Err(CanvasError::out_of_bounds(
                px,
                py,
                self.buffer.width(),
                self.buffer.height(),
            ));
        }
        self.finish_stroke();
        match self.tools.tool {
            Tool::Draw => self.strokes.begin_stroke(Point::new(x, y)),
            Tool::Fill => {
                self.fill_at(px, py)?;
            }
        }
        Ok(())
    }

    /// Extend the active stroke to `(x, y)`. Returns false when no stroke is
    /// in progress, the active tool is not Draw, or the position is not
    /// finite.
    pub fn pointer_move(&mut self, x: f32, y: f32) -> bool {
        let to = Point::new(x, y);
        if self.tools.tool != Tool::Draw || !self.strokes.is_active() || !to.is_finite() {
            return false;
        }
        self.strokes.extend_to(
            &mut self.buffer,
            to,
            self.tools.color,
            self.tools.brush_width(),
        );
        true
    }

    /// Release: ends and commits the active stroke. Returns false when no
    /// stroke was in progress.
    pub fn pointer_up(&mut self) -> bool {
        self.finish_stroke()
    }

    /// The pointer left the drawing surface; same as releasing it.
    pub fn pointer_leave(&mut self) -> bool {
        self.finish_stroke()
    }

    fn finish_stroke(&mut self) -> bool {
        let Some(summary) = self.strokes.end_stroke() else {
            return false;
        };
        match summary.bounds {
            Some((x0, y0, x1, y1)) => log_info!(
                "stroke: {} points, bbox ({}, {})-({}, {})",
                summary.points,
                x0,
                y0,
                x1,
                y1
            ),
            None => log_info!("stroke: {} points, nothing painted", summary.points),
        }
        self.commit(LABEL_STROKE);
        true
    }

    // ---- actions ------------------------------------------------------------

    /// Flood-fill from `(x, y)` with the current color and commit, whatever
    /// the active tool. A fill that repaints nothing still commits; an
    /// out-of-bounds seed commits nothing.
    pub fn fill_at(&mut self, x: i64, y: i64) -> Result<FillReport, CanvasError> {
        self.finish_stroke();
        let report = match flood_fill(&mut self.buffer, x, y, self.tools.color) {
            Ok(report) => report,
            Err(e) => {
                log_warn!("fill at ({}, {}) rejected: {}", x, y, e);
                return Err(e);
            }
        };
        match report.bounds {
            Some((x0, y0, x1, y1)) => log_info!(
                "fill at ({}, {}) with {}: {} px, bbox ({}, {})-({}, {})",
                x,
                y,
                self.tools.color.to_hex(),
                report.painted,
                x0,
                y0,
                x1,
                y1
            ),
            None => log_info!("fill at ({}, {}): region already {}", x, y, self.tools.color.to_hex()),
        }
        self.commit(LABEL_FILL);
        Ok(report)
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tools.tool = tool;
        self.notify_tool_changed();
    }

    pub fn set_color(&mut self, color: Rgb) {
        self.tools.color = color;
        self.notify_tool_changed();
    }

    /// Parse `#rrggbb` and make it the current color. A bad string leaves the
    /// current color untouched.
    pub fn set_color_hex(&mut self, hex: &str) -> Result<(), CanvasError> {
        let color = Rgb::from_hex(hex)?;
        self.set_color(color);
        Ok(())
    }

    /// Clamp to the brush range; returns the width applied.
    pub fn set_brush_width(&mut self, width: u32) -> u32 {
        let applied = self.tools.set_brush_width(width);
        self.notify_tool_changed();
        applied
    }

    /// Switch to the draw tool painting the eraser color with the eraser
    /// width. The eraser paints opaque pixels even on a transparent canvas.
    pub fn select_eraser(&mut self) {
        self.tools.select_eraser(self.eraser_color, self.eraser_width);
        self.notify_tool_changed();
    }

    /// Reset to blank, recomposite the background if there is one, commit.
    pub fn clear(&mut self) {
        self.finish_stroke();
        self.reset_surface();
        self.commit(LABEL_CLEAR);
    }

    /// Make `image` the background: resample it to the canvas, reset the
    /// buffer to blank, composite the image and commit.
    ///
    /// Anything drawn since the last clear is discarded from the live
    /// canvas; it stays reachable through undo.
    pub fn load_background_image(&mut self, image: RgbaImage) {
        self.finish_stroke();
        log_info!(
            "background: {}x{} image scaled to {}x{} ({})",
            image.width(),
            image.height(),
            self.buffer.width(),
            self.buffer.height(),
            self.filter.name()
        );
        self.background = Some(resample_to(
            &image,
            self.buffer.width(),
            self.buffer.height(),
            self.filter,
        ));
        self.reset_surface();
        self.commit(LABEL_LOAD_BACKGROUND);
        self.emit(SessionEvent::BackgroundChanged { present: true });
    }

    /// Second half of a two-phase load: wait for the decode and apply it.
    /// A decode failure leaves the session untouched.
    pub fn complete_load(&mut self, pending: PendingLoad) -> Result<(), CanvasError> {
        match pending.wait() {
            Ok(image) => {
                self.load_background_image(image);
                Ok(())
            }
            Err(e) => {
                log_err!("background load failed: {}", e);
                Err(e)
            }
        }
    }

    /// Non-blocking half of a two-phase load. Applies the image and returns
    /// `Ok(true)` once the decode has finished, `Ok(false)` while it is still
    /// running. A decode failure leaves the session untouched.
    ///
    /// Polling again after a result has been taken is an error.
    pub fn try_complete_load(&mut self, pending: &PendingLoad) -> Result<bool, CanvasError> {
        match pending.poll() {
            Ok(Some(image)) => {
                self.load_background_image(image);
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) => {
                log_err!("background load failed: {}", e);
                Err(e)
            }
        }
    }

    /// Decode `bytes` and use them as the background.
    pub fn load_background_bytes(&mut self, bytes: Vec<u8>) -> Result<(), CanvasError> {
        self.complete_load(PendingLoad::spawn(bytes))
    }

    /// Drop the background and clear to blank. Returns false (and commits
    /// nothing) when there was no background.
    pub fn remove_background_image(&mut self) -> bool {
        if self.background.is_none() {
            return false;
        }
        self.finish_stroke();
        self.background = None;
        self.reset_surface();
        self.commit(LABEL_REMOVE_BACKGROUND);
        self.emit(SessionEvent::BackgroundChanged { present: false });
        true
    }

    pub fn undo(&mut self) -> bool {
        self.finish_stroke();
        match self.history.undo(&mut self.buffer) {
            Some(index) => {
                log_info!("undo -> {}", index);
                self.emit(SessionEvent::Undone { index });
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        self.finish_stroke();
        match self.history.redo(&mut self.buffer) {
            Some(index) => {
                log_info!("redo -> {}", index);
                self.emit(SessionEvent::Redone { index });
                true
            }
            None => false,
        }
    }

    // ---- export -------------------------------------------------------------

    pub fn export_png_bytes(&self) -> Result<Vec<u8>, CanvasError> {
        io::encode_to_vec(&self.buffer, ExportFormat::Png)
    }

    pub fn export(&self, path: &Path, format: ExportFormat) -> Result<(), CanvasError> {
        io::export_to_path(&self.buffer, path, format)?;
        log_info!("exported {} as {}", path.display(), format.extension());
        Ok(())
    }

    // ---- internals ----------------------------------------------------------

    fn reset_surface(&mut self) {
        reset_surface(
            &mut self.buffer,
            self.blank,
            self.background.as_ref(),
            self.filter,
        );
    }

    fn commit(&mut self, label: &str) {
        let index = self.history.commit(&self.buffer, label);
        log_info!(
            "commit #{} '{}' ({} snapshots, {} KB)",
            index,
            label,
            self.history.len(),
            self.history.memory_usage() / 1024
        );
        self.emit(SessionEvent::Committed {
            index,
            label: label.to_string(),
        });
    }

    fn notify_tool_changed(&mut self) {
        self.emit(SessionEvent::ToolChanged {
            tool: self.tools.tool,
            color: self.tools.color,
            brush_width: self.tools.brush_width(),
        });
    }

    /// Deliver to every live subscriber, dropping the ones that hung up.
    fn emit(&mut self, event: SessionEvent) {
        self.subscribers
            .retain(|sub| sub.send(event.clone()).is_ok());
    }
}

impl Default for CanvasSession {
    fn default() -> Self {
        Self::new(&CanvasSettings::default())
    }
}
