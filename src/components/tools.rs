use crate::canvas::Rgb;

/// Smallest brush width the slider allows by default.
pub const MIN_BRUSH_WIDTH: u32 = 1;
/// Largest brush width the slider allows by default.
pub const MAX_BRUSH_WIDTH: u32 = 50;
/// Width the eraser shortcut switches to.
pub const ERASER_WIDTH: u32 = 20;
/// Brush width of a fresh session.
pub const DEFAULT_BRUSH_WIDTH: u32 = 5;

// ============================================================================
// TOOL
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Draw,
    Fill,
}

impl Tool {
    pub fn all() -> &'static [Tool] {
        &[Tool::Draw, Tool::Fill]
    }

    pub fn name(self) -> &'static str {
        match self {
            Tool::Draw => "draw",
            Tool::Fill => "fill",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "draw" | "brush" | "pen" => Some(Tool::Draw),
            "fill" | "bucket" => Some(Tool::Fill),
            _ => None,
        }
    }
}

// ============================================================================
// TOOL CONFIG
// ============================================================================

/// Active tool, stroke color and brush width.
///
/// There is no eraser variant. [`ToolConfig::select_eraser`] switches to the
/// draw tool with the background color and a wide brush, so choosing any
/// other color afterwards leaves eraser mode on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToolConfig {
    pub tool: Tool,
    pub color: Rgb,
    brush_width: u32,
    min_brush_width: u32,
    max_brush_width: u32,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self::new(Rgb::BLACK, DEFAULT_BRUSH_WIDTH, MIN_BRUSH_WIDTH, MAX_BRUSH_WIDTH)
    }
}

impl ToolConfig {
    /// `min`/`max` are normalised so that `1 <= min <= max`.
    pub fn new(color: Rgb, brush_width: u32, min: u32, max: u32) -> Self {
        let min_brush_width = min.max(1);
        let max_brush_width = max.max(min_brush_width);
        Self {
            tool: Tool::Draw,
            color,
            brush_width: brush_width.clamp(min_brush_width, max_brush_width),
            min_brush_width,
            max_brush_width,
        }
    }

    pub fn brush_width(&self) -> u32 {
        self.brush_width
    }

    pub fn brush_range(&self) -> (u32, u32) {
        (self.min_brush_width, self.max_brush_width)
    }

    /// Clamp into the configured range; returns the width actually applied.
    pub fn set_brush_width(&mut self, width: u32) -> u32 {
        self.brush_width = width.clamp(self.min_brush_width, self.max_brush_width);
        self.brush_width
    }

    /// The width slider is only meaningful for the draw tool.
    pub fn brush_width_enabled(&self) -> bool {
        self.tool == Tool::Draw
    }

    /// Draw tool + eraser color + wide brush. The eraser width is not
    /// clamped to the slider range.
    pub fn select_eraser(&mut self, eraser_color: Rgb, eraser_width: u32) {
        self.tool = Tool::Draw;
        self.color = eraser_color;
        self.brush_width = eraser_width.max(1);
    }
}
