//! Integration tests: background import, clear, and export.

use image::{Rgba, RgbaImage};
use pretty_assertions::assert_eq;
use sketchpad::io::{ExportFormat, PendingLoad, decode_image, encode_to_vec};
use sketchpad::ops::canvas_ops::resample_to;
use sketchpad::{
    CanvasError, CanvasSession, CanvasSettings, ResampleFilter, Rgb, SessionEvent, TRANSPARENT,
};

fn photo() -> RgbaImage {
    RgbaImage::from_fn(37, 23, |x, y| {
        Rgba([(x * 7) as u8, (y * 11) as u8, ((x + y) * 3) as u8, 255])
    })
}

fn png_bytes(img: &RgbaImage) -> Vec<u8> {
    let buffer = sketchpad::PixelBuffer::from_rgba_image(img.clone());
    encode_to_vec(&buffer, ExportFormat::Png).unwrap()
}

#[test]
fn export_after_import_and_clear_matches_resampled_background() {
    for filter in [ResampleFilter::Nearest, ResampleFilter::Bilinear] {
        let settings = CanvasSettings {
            width: 120,
            height: 90,
            resample_filter: filter,
            ..CanvasSettings::default()
        };
        let mut s = CanvasSession::new(&settings);
        s.complete_load(PendingLoad::spawn(png_bytes(&photo())))
            .unwrap();

        // scribble, then clear back to the background
        s.pointer_down(5.0, 5.0).unwrap();
        s.pointer_move(100.0, 80.0);
        s.pointer_up();
        s.clear();

        let exported = decode_image(&s.export_png_bytes().unwrap()).unwrap();
        let expected = resample_to(&photo(), 120, 90, filter);
        assert_eq!(exported.as_raw(), expected.as_raw(), "{:?}", filter);
    }
}

#[test]
fn translucent_background_blends_over_blank() {
    let mut s = CanvasSession::new(&CanvasSettings {
        width: 10,
        height: 10,
        blank: Rgba([0, 0, 0, 255]),
        ..CanvasSettings::default()
    });
    s.load_background_image(RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 0])));
    assert_eq!(s.buffer().get(3, 3).unwrap(), Rgba([0, 0, 0, 255]));

    s.load_background_image(RgbaImage::from_pixel(10, 10, Rgba([200, 100, 50, 255])));
    assert_eq!(s.buffer().get(3, 3).unwrap(), Rgba([200, 100, 50, 255]));
}

#[test]
fn transparent_blank_exports_with_zero_alpha() {
    let mut s = CanvasSession::new(&CanvasSettings {
        width: 16,
        height: 10,
        blank: TRANSPARENT,
        ..CanvasSettings::default()
    });
    s.set_color(Rgb([255, 0, 0]));
    s.pointer_down(2.0, 2.0).unwrap();
    s.pointer_move(2.0, 6.0);
    s.pointer_up();

    let exported = decode_image(&s.export_png_bytes().unwrap()).unwrap();
    assert_eq!(*exported.get_pixel(12, 8), Rgba([0, 0, 0, 0]));
    assert_eq!(*exported.get_pixel(2, 4), Rgba([255, 0, 0, 255]));

    // a fill forces the region it repaints opaque
    s.set_color(Rgb([0, 0, 255]));
    s.fill_at(12, 8).unwrap();
    let exported = decode_image(&s.export_png_bytes().unwrap()).unwrap();
    assert_eq!(*exported.get_pixel(12, 8), Rgba([0, 0, 255, 255]));
    assert_eq!(*exported.get_pixel(2, 4), Rgba([255, 0, 0, 255]));
}

#[test]
fn bad_upload_leaves_session_untouched() {
    let mut s = CanvasSession::with_size(20, 20);
    s.set_color(Rgb([9, 9, 9]));
    s.fill_at(0, 0).unwrap();
    let before = s.buffer().clone();
    let len = s.history().len();

    let err = s
        .complete_load(PendingLoad::spawn(b"GIF89a but not really".to_vec()))
        .unwrap_err();
    assert!(matches!(err, CanvasError::ImageDecodeFailure(_)));
    assert_eq!(s.buffer(), &before);
    assert_eq!(s.history().len(), len);
    assert!(!s.has_background());
}

#[test]
fn remove_background_returns_to_blank_and_is_undoable() {
    let mut s = CanvasSession::with_size(16, 16);
    let events = s.subscribe();
    s.load_background_image(photo());
    let with_bg = s.buffer().clone();

    assert!(s.remove_background_image());
    assert!(
        s.buffer()
            .as_raw()
            .chunks_exact(4)
            .all(|p| p == [255, 255, 255, 255])
    );

    assert!(s.undo());
    assert_eq!(s.buffer(), &with_bg);

    let bg_events: Vec<bool> = events
        .try_iter()
        .filter_map(|e| match e {
            SessionEvent::BackgroundChanged { present } => Some(present),
            _ => None,
        })
        .collect();
    assert_eq!(bg_events, vec![true, false]);
}

#[test]
fn tga_background_loads_by_path() {
    let dir = std::env::temp_dir().join(format!("sketchpad-tga-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("photo.tga");
    sketchpad::io::export_to_path(
        &sketchpad::PixelBuffer::from_rgba_image(photo()),
        &path,
        ExportFormat::Tga,
    )
    .unwrap();

    let mut s = CanvasSession::with_size(37, 23);
    s.complete_load(PendingLoad::from_path(&path).unwrap())
        .unwrap();
    assert!(s.has_background());
    assert_eq!(s.buffer().as_raw(), photo().as_raw());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn exported_files_decode_back_exactly() {
    let dir = std::env::temp_dir().join(format!("sketchpad-export-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();

    let mut s = CanvasSession::with_size(12, 8);
    s.load_background_image(photo());
    for format in [ExportFormat::Png, ExportFormat::Bmp, ExportFormat::Tga] {
        let path = dir.join(format!("canvas.{}", format.extension()));
        s.export(&path, format).unwrap();
        let back = sketchpad::io::load_image(&path).unwrap();
        assert_eq!(back.as_raw(), s.buffer().as_raw(), "{:?}", format);
    }

    let _ = std::fs::remove_dir_all(&dir);
}
