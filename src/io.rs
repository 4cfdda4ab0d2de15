use image::codecs::bmp::BmpEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tga::TgaEncoder;
use image::{ColorType, DynamicImage, ImageEncoder, ImageError, ImageFormat, RgbaImage};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, TryRecvError};

use crate::canvas::PixelBuffer;
use crate::error::CanvasError;

impl From<ImageError> for CanvasError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::IoError(io) => CanvasError::Io(io),
            d @ ImageError::Decoding(_) => CanvasError::ImageDecodeFailure(d.to_string()),
            other => CanvasError::ImageEncodeFailure(other.to_string()),
        }
    }
}

// ============================================================================
// EXPORT FORMATS — lossless, alpha-preserving only
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Png,
    Bmp,
    Tga,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Bmp => "bmp",
            ExportFormat::Tga => "tga",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "png" => Some(ExportFormat::Png),
            "bmp" => Some(ExportFormat::Bmp),
            "tga" => Some(ExportFormat::Tga),
            _ => None,
        }
    }

    /// Format implied by a file extension, if it is one we can write.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::parse)
    }
}

// ============================================================================
// IMPORT
// ============================================================================

/// Decode an uploaded image (any format the `image` crate is built with) to
/// RGBA8. The format is guessed from the leading bytes, so headerless
/// formats such as TGA need [`decode_image_with_format`] or [`load_image`].
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, CanvasError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| CanvasError::ImageDecodeFailure(e.to_string()))?;
    into_rgba(img)
}

pub fn decode_image_with_format(bytes: &[u8], format: ImageFormat) -> Result<RgbaImage, CanvasError> {
    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| CanvasError::ImageDecodeFailure(e.to_string()))?;
    into_rgba(img)
}

fn into_rgba(img: DynamicImage) -> Result<RgbaImage, CanvasError> {
    let rgba = img.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(CanvasError::ImageDecodeFailure(
            "image has zero width or height".to_string(),
        ));
    }
    Ok(rgba)
}

/// Read and decode an image file, using the extension to pick the decoder.
pub fn load_image(path: &Path) -> Result<RgbaImage, CanvasError> {
    let img = image::open(path).map_err(|e| match e {
        ImageError::IoError(io) => CanvasError::Io(io),
        other => CanvasError::ImageDecodeFailure(other.to_string()),
    })?;
    into_rgba(img)
}

/// An image decode running on the rayon pool.
///
/// This is the first half of the two-phase background load: `spawn` hands
/// the bytes to a worker and returns immediately; the session applies the
/// result later on its own thread, blocking through
/// [`CanvasSession::complete_load`](crate::session::CanvasSession::complete_load)
/// or polling through
/// [`CanvasSession::try_complete_load`](crate::session::CanvasSession::try_complete_load).
pub struct PendingLoad {
    receiver: Receiver<Result<RgbaImage, CanvasError>>,
}

impl PendingLoad {
    /// Decode `bytes`, sniffing the format from their header.
    pub fn spawn(bytes: Vec<u8>) -> Self {
        Self::spawn_decoder(bytes, None)
    }

    /// Read the file on the calling thread, decode on the pool. The
    /// extension picks the decoder when it names a known format.
    pub fn from_path(path: &Path) -> Result<Self, CanvasError> {
        let bytes = std::fs::read(path)?;
        Ok(Self::spawn_decoder(bytes, ImageFormat::from_path(path).ok()))
    }

    fn spawn_decoder(bytes: Vec<u8>, format: Option<ImageFormat>) -> Self {
        let (sender, receiver) = mpsc::channel();
        rayon::spawn(move || {
            let result = match format {
                Some(f) => decode_image_with_format(&bytes, f),
                None => decode_image(&bytes),
            };
            let _ = sender.send(result);
        });
        Self { receiver }
    }

    /// Block until the decode finishes.
    pub fn wait(self) -> Result<RgbaImage, CanvasError> {
        self.receiver.recv().unwrap_or_else(|_| {
            Err(CanvasError::ImageDecodeFailure(
                "decoder worker exited without a result".to_string(),
            ))
        })
    }

    /// Poll without blocking. `Ok(None)` while the decode is still running.
    /// Once a result has been returned the load is spent and further polls
    /// report a failure.
    pub fn poll(&self) -> Result<Option<RgbaImage>, CanvasError> {
        match self.receiver.try_recv() {
            Ok(result) => result.map(Some),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(CanvasError::ImageDecodeFailure(
                "decoder worker exited without a result".to_string(),
            )),
        }
    }
}

// ============================================================================
// EXPORT
// ============================================================================

/// Encode an RGBA image to `writer`. All formats keep the alpha channel
/// bit-exact.
pub fn encode<W: Write>(
    image: &RgbaImage,
    format: ExportFormat,
    writer: &mut W,
) -> Result<(), CanvasError> {
    match format {
        ExportFormat::Png => {
            PngEncoder::new(writer).write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ColorType::Rgba8,
            )?;
        }
        ExportFormat::Bmp => {
            let mut encoder = BmpEncoder::new(writer);
            encoder.encode(
                image.as_raw(),
                image.width(),
                image.height(),
                ColorType::Rgba8,
            )?;
        }
        ExportFormat::Tga => {
            TgaEncoder::new(writer).encode(
                image.as_raw(),
                image.width(),
                image.height(),
                ColorType::Rgba8,
            )?;
        }
    }
    Ok(())
}

/// Encode the live buffer into memory.
pub fn encode_to_vec(buffer: &PixelBuffer, format: ExportFormat) -> Result<Vec<u8>, CanvasError> {
    let mut out = Vec::new();
    encode(buffer.as_image(), format, &mut out)?;
    Ok(out)
}

/// Encode the live buffer and write it to `path`.
pub fn export_to_path(
    buffer: &PixelBuffer,
    path: &Path,
    format: ExportFormat,
) -> Result<(), CanvasError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    encode(buffer.as_image(), format, &mut writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use pretty_assertions::assert_eq;

    fn sample() -> PixelBuffer {
        let img = RgbaImage::from_fn(9, 6, |x, y| {
            Rgba([x as u8 * 20, y as u8 * 40, 99, (x * 25 + y) as u8])
        });
        PixelBuffer::from_rgba_image(img)
    }

    #[test]
    fn png_export_preserves_alpha_exactly() {
        let buf = sample();
        let bytes = encode_to_vec(&buf, ExportFormat::Png).unwrap();
        let decoded = decode_image(&bytes).unwrap();
        assert_eq!(decoded.as_raw(), buf.as_image().as_raw());
    }

    #[test]
    fn garbage_bytes_are_a_decode_failure() {
        let err = decode_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, CanvasError::ImageDecodeFailure(_)));
    }

    #[test]
    fn pending_load_delivers_decoded_image() {
        let bytes = encode_to_vec(&sample(), ExportFormat::Png).unwrap();
        let img = PendingLoad::spawn(bytes).wait().unwrap();
        assert_eq!(img.dimensions(), (9, 6));
    }

    #[test]
    fn pending_load_reports_decode_failure() {
        let result = PendingLoad::spawn(vec![0, 1, 2, 3]).wait();
        assert!(matches!(result, Err(CanvasError::ImageDecodeFailure(_))));
    }

    #[test]
    fn exported_tga_loads_back_by_path() {
        let dir = std::env::temp_dir().join(format!("sketchpad-io-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("canvas.tga");
        let buf = sample();
        export_to_path(&buf, &path, ExportFormat::Tga).unwrap();

        let direct = load_image(&path).unwrap();
        assert_eq!(direct.as_raw(), buf.as_image().as_raw());
        let pooled = PendingLoad::from_path(&path).unwrap().wait().unwrap();
        assert_eq!(pooled.as_raw(), buf.as_image().as_raw());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_io_error() {
        let path = std::env::temp_dir().join("sketchpad-no-such-image.png");
        assert!(matches!(load_image(&path), Err(CanvasError::Io(_))));
        assert!(matches!(PendingLoad::from_path(&path), Err(CanvasError::Io(_))));
    }

    #[test]
    fn poll_reports_progress_then_result() {
        let bytes = encode_to_vec(&sample(), ExportFormat::Png).unwrap();
        let pending = PendingLoad::spawn(bytes);
        let img = loop {
            if let Some(img) = pending.poll().unwrap() {
                break img;
            }
            std::thread::yield_now();
        };
        assert_eq!(img.dimensions(), (9, 6));
        assert!(pending.poll().is_err());
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("a/b.PNG")), Some(ExportFormat::Png));
        assert_eq!(ExportFormat::from_path(Path::new("out.tga")), Some(ExportFormat::Tga));
        assert_eq!(ExportFormat::from_path(Path::new("out.jpg")), None);
        assert_eq!(ExportFormat::from_path(Path::new("noext")), None);
    }
}
