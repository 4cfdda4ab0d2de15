use image::Rgba;
use std::path::{Path, PathBuf};

use crate::canvas::{
    DEFAULT_HEIGHT, DEFAULT_WIDTH, ResampleFilter, Rgb, blank_to_string, parse_blank,
};
use crate::components::tools::{
    DEFAULT_BRUSH_WIDTH, ERASER_WIDTH, MAX_BRUSH_WIDTH, MIN_BRUSH_WIDTH,
};

/// Session defaults that persist across launches.
#[derive(Clone, Debug, PartialEq)]
pub struct CanvasSettings {
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
    /// Blank-canvas color used by new, clear and remove-background.
    /// `transparent` in the file gives alpha 0.
    pub blank: Rgba<u8>,
    /// Color the eraser paints with
    pub eraser_color: Rgb,
    /// Stroke/fill color of a fresh session
    pub default_color: Rgb,
    pub default_brush_width: u32,
    pub min_brush_width: u32,
    pub max_brush_width: u32,
    /// Brush width the eraser shortcut switches to
    pub eraser_width: u32,
    /// Maximum number of history snapshots (0 = unbounded)
    pub max_undo_steps: usize,
    /// Filter used to scale background images to the canvas
    pub resample_filter: ResampleFilter,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            blank: Rgb::WHITE.to_rgba(),
            eraser_color: Rgb::WHITE,
            default_color: Rgb::BLACK,
            default_brush_width: DEFAULT_BRUSH_WIDTH,
            min_brush_width: MIN_BRUSH_WIDTH,
            max_brush_width: MAX_BRUSH_WIDTH,
            eraser_width: ERASER_WIDTH,
            max_undo_steps: 0,
            resample_filter: ResampleFilter::Bilinear,
        }
    }
}

impl CanvasSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/sketchpad/sketchpad_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\Sketchpad\sketchpad_settings.cfg
    /// On macOS:   ~/Library/Application Support/Sketchpad/sketchpad_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            return Some(
                PathBuf::from(appdata)
                    .join("Sketchpad")
                    .join("sketchpad_settings.cfg"),
            );
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("Sketchpad")
                    .join("sketchpad_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?;
            Some(config_dir.join("sketchpad").join("sketchpad_settings.cfg"))
        }
    }

    /// History cap for [`HistoryManager::new`](crate::components::history::HistoryManager::new).
    pub fn history_cap(&self) -> Option<usize> {
        (self.max_undo_steps > 0).then_some(self.max_undo_steps)
    }

    /// Load settings from the platform path (returns default if missing).
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load settings from `path`; a missing or unreadable file yields the
    /// defaults, and unknown keys or bad values are skipped.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let val = val.trim();
            match key {
                "width" => {
                    if let Ok(v) = val.parse::<u32>()
                        && v > 0
                    {
                        s.width = v;
                    }
                }
                "height" => {
                    if let Ok(v) = val.parse::<u32>()
                        && v > 0
                    {
                        s.height = v;
                    }
                }
                "blank" => {
                    if let Ok(c) = parse_blank(val) {
                        s.blank = c;
                    }
                }
                "eraser_color" => {
                    if let Ok(c) = Rgb::from_hex(val) {
                        s.eraser_color = c;
                    }
                }
                "default_color" => {
                    if let Ok(c) = Rgb::from_hex(val) {
                        s.default_color = c;
                    }
                }
                "default_brush_width" => {
                    s.default_brush_width = val.parse().unwrap_or(DEFAULT_BRUSH_WIDTH);
                }
                "min_brush_width" => {
                    s.min_brush_width = val.parse().unwrap_or(MIN_BRUSH_WIDTH);
                }
                "max_brush_width" => {
                    s.max_brush_width = val.parse().unwrap_or(MAX_BRUSH_WIDTH);
                }
                "eraser_width" => {
                    s.eraser_width = val.parse().unwrap_or(ERASER_WIDTH);
                }
                "max_undo_steps" => {
                    s.max_undo_steps = val.parse().unwrap_or(0);
                }
                "resample_filter" => {
                    s.resample_filter = ResampleFilter::parse(val).unwrap_or_default();
                }
                other => {
                    log_warn!("settings: ignoring unknown key '{}'", other);
                }
            }
        }
        s
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "width={}\n\
             height={}\n\
             blank={}\n\
             eraser_color={}\n\
             default_color={}\n\
             default_brush_width={}\n\
             min_brush_width={}\n\
             max_brush_width={}\n\
             eraser_width={}\n\
             max_undo_steps={}\n\
             resample_filter={}\n",
            self.width,
            self.height,
            blank_to_string(self.blank),
            self.eraser_color.to_hex(),
            self.default_color.to_hex(),
            self.default_brush_width,
            self.min_brush_width,
            self.max_brush_width,
            self.eraser_width,
            self.max_undo_steps,
            self.resample_filter.name(),
        )
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config_string())
    }

    /// Save to the platform path and return where it went.
    pub fn save(&self) -> std::io::Result<PathBuf> {
        let path = Self::settings_path().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "no config directory")
        })?;
        if let Err(e) = self.save_to(&path) {
            log_err!("settings: failed to write {}: {}", path.display(), e);
            return Err(e);
        }
        log_info!("settings: saved to {}", path.display());
        Ok(path)
    }
}
