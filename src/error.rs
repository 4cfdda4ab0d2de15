use std::fmt;

/// Errors surfaced by the canvas core.
///
/// Programmer errors (bad coordinates) and user errors (bad color strings,
/// unreadable images) both come back through this type; none of the failing
/// paths mutate the buffer or the history before returning.
#[derive(Debug)]
pub enum CanvasError {
    /// Coordinate outside `[0, width) x [0, height)`.
    OutOfBounds {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
    },
    /// Color string that is not `#rrggbb`.
    InvalidColor(String),
    /// A snapshot was requested from a history with nothing committed.
    EmptyHistoryUnderflow,
    /// Uploaded bytes could not be decoded as an image.
    ImageDecodeFailure(String),
    /// The live buffer could not be encoded for export.
    ImageEncodeFailure(String),
    Io(std::io::Error),
}

impl fmt::Display for CanvasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanvasError::OutOfBounds {
                x,
                y,
                width,
                height,
            } => write!(
                f,
                "Coordinate ({}, {}) is outside the {}×{} canvas",
                x, y, width, height
            ),
            CanvasError::InvalidColor(s) => write!(f, "Invalid color '{}': expected #rrggbb", s),
            CanvasError::EmptyHistoryUnderflow => write!(f, "History is empty"),
            CanvasError::ImageDecodeFailure(e) => write!(f, "Image decode error: {}", e),
            CanvasError::ImageEncodeFailure(e) => write!(f, "Image encode error: {}", e),
            CanvasError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for CanvasError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CanvasError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CanvasError {
    fn from(e: std::io::Error) -> Self {
        CanvasError::Io(e)
    }
}

impl CanvasError {
    pub(crate) fn out_of_bounds(x: i64, y: i64, width: u32, height: u32) -> Self {
        CanvasError::OutOfBounds {
            x,
            y,
            width,
            height,
        }
    }
}
