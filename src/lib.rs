//! Raster canvas core: a fixed-size RGBA buffer with round-capped strokes,
//! 4-connected flood fill, background compositing and snapshot undo/redo,
//! driven through a single [`CanvasSession`].

#![allow(clippy::too_many_arguments)]

#[macro_use]
pub mod logger;

pub mod canvas;
pub mod cli;
pub mod components;
pub mod error;
pub mod io;
pub mod ops;
pub mod session;
pub mod settings;

pub use canvas::{PixelBuffer, ResampleFilter, Rgb, TRANSPARENT};
pub use components::history::{HistoryManager, Snapshot};
pub use components::tools::{Tool, ToolConfig};
pub use error::CanvasError;
pub use io::{ExportFormat, PendingLoad};
pub use ops::fill::{FillReport, flood_fill};
pub use ops::stroke::{Point, StrokeRenderer};
pub use session::{CanvasSession, SessionEvent};
pub use settings::CanvasSettings;
