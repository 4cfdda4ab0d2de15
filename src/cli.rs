// ============================================================================
// Sketchpad CLI — headless scripted drawing via command-line arguments
// ============================================================================
//
// Usage examples:
//   sketchpad --script smiley.rhai --output smiley.png
//   sketchpad -s strokes/*.rhai --output-dir out/ --format bmp
//   sketchpad -s trace.rhai --background photo.jpg --width 1024 --height 768
//   sketchpad --save-settings --width 1024 --height 768
//
// Each script runs against a fresh canvas session on the current thread; the
// final buffer is exported once the script finishes.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use image::RgbaImage;

use crate::io::{ExportFormat, PendingLoad};
use crate::ops::scripting::run_script;
use crate::session::CanvasSession;
use crate::settings::CanvasSettings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Sketchpad headless canvas runner.
#[derive(Parser, Debug)]
#[command(
    name = "sketchpad",
    version,
    about = "Run Rhai drawing scripts against a raster canvas and export the result",
    long_about = "Run Rhai scripts that draw strokes, flood fills and clears on a\n\
                  fresh canvas, then export the canvas as PNG, BMP or TGA.\n\n\
                  Example:\n  \
                  sketchpad --script smiley.rhai --output smiley.png\n  \
                  sketchpad -s 'strokes/*.rhai' --output-dir out/ --format bmp"
)]
pub struct CliArgs {
    /// Script file(s). Glob patterns accepted (e.g. "*.rhai", "demo/*.rhai").
    #[arg(short, long, required_unless_present = "save_settings", num_args = 1..)]
    pub script: Vec<String>,

    /// Output file path. Only valid for a single script.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch runs; files are named after each script.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Background image composited onto every fresh canvas.
    #[arg(short, long, value_name = "IMAGE")]
    pub background: Option<PathBuf>,

    /// Canvas width (overrides the settings file).
    #[arg(long)]
    pub width: Option<u32>,

    /// Canvas height (overrides the settings file).
    #[arg(long)]
    pub height: Option<u32>,

    /// Output format: png, bmp, tga.
    /// When omitted, the format is inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Settings file to use instead of the platform default.
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Write the effective settings (including --width/--height) to the
    /// settings file. Scripts are optional with this flag.
    #[arg(long)]
    pub save_settings: bool,

    /// Print script console output and per-script timing; mirror the log to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all scripts and return an OS exit code.
/// `0` = every script succeeded, `1` = one or more failed.
pub fn run(args: CliArgs) -> ExitCode {
    let mut settings = match &args.settings {
        Some(path) => CanvasSettings::load_from(path),
        None => CanvasSettings::load(),
    };
    if let Some(w) = args.width {
        settings.width = w;
    }
    if let Some(h) = args.height {
        settings.height = h;
    }

    if args.save_settings {
        match save_settings(&settings, args.settings.as_deref()) {
            Ok(path) => println!("settings saved to {}", path.display()),
            Err(e) => {
                eprintln!("error: could not save settings: {}", e);
                return ExitCode::FAILURE;
            }
        }
        if args.script.is_empty() {
            return ExitCode::SUCCESS;
        }
    }

    let scripts = resolve_inputs(&args.script);
    if scripts.is_empty() {
        eprintln!("error: no script files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if scripts.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} scripts given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch runs.",
            scripts.len()
        );
        return ExitCode::FAILURE;
    }

    let format = match parse_format(args.format.as_deref(), args.output.as_deref()) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Decode the background once, on the pool, while the output dir is set up
    let pending = match &args.background {
        Some(path) => match PendingLoad::from_path(path) {
            Ok(p) => Some(p),
            Err(e) => {
                eprintln!("error: could not read background '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!(
            "error: could not create output directory '{}': {}",
            dir.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    let background: Option<RgbaImage> = match pending.map(PendingLoad::wait) {
        Some(Ok(img)) => Some(img),
        Some(Err(e)) => {
            eprintln!("error: background image: {}", e);
            return ExitCode::FAILURE;
        }
        None => None,
    };

    let total = scripts.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, script_path) in scripts.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, script_path.display());
        }

        let start = Instant::now();

        let Some(output_path) = build_output_path(
            script_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            format,
        ) else {
            eprintln!(
                "  error: cannot determine output path for '{}'.",
                script_path.display()
            );
            any_failure = true;
            continue;
        };

        match run_one(
            script_path,
            &output_path,
            &settings,
            background.as_ref(),
            format,
            args.verbose,
        ) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                log_err!("{}: {}", script_path.display(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

// ============================================================================
// Per-script pipeline
// ============================================================================

fn run_one(
    script: &Path,
    output: &Path,
    settings: &CanvasSettings,
    background: Option<&RgbaImage>,
    format: ExportFormat,
    verbose: bool,
) -> Result<(), String> {
    let source = std::fs::read_to_string(script)
        .map_err(|e| format!("could not read script: {}", e))?;

    let mut session = CanvasSession::new(settings);
    if let Some(img) = background {
        session.load_background_image(img.clone());
    }

    let run = run_script(&source, session)
        .map_err(|e| format!("script error: {}", e.friendly_message()))?;

    if verbose {
        for line in &run.console_output {
            println!("  [script] {}", line);
        }
    }

    run.session
        .export(output, format)
        .map_err(|e| format!("export failed: {}", e))
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand each argument into script files. A path that exists is taken
/// literally, anything else is a glob whose matches are sorted. Directories
/// are skipped and a file named twice keeps its first position.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut scripts: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let literal = Path::new(pattern);
        let mut found: Vec<PathBuf> = if literal.exists() {
            vec![literal.to_path_buf()]
        } else {
            match glob::glob(pattern) {
                Ok(paths) => paths.filter_map(Result::ok).collect(),
                Err(e) => {
                    log_warn!("invalid glob '{}': {}", pattern, e);
                    eprintln!("warning: invalid glob '{}': {}", pattern, e);
                    continue;
                }
            }
        };
        found.retain(|p| p.is_file());
        found.sort();

        if found.is_empty() {
            log_warn!("'{}' matched no script files", pattern);
            eprintln!("warning: '{}' matched no script files.", pattern);
        }
        for path in found {
            if !scripts.contains(&path) {
                scripts.push(path);
            }
        }
    }

    scripts
}

/// Write `settings` to `path`, or to the platform settings file when no
/// path was given.
fn save_settings(settings: &CanvasSettings, path: Option<&Path>) -> Result<PathBuf, String> {
    match path {
        Some(path) => settings
            .save_to(path)
            .map(|()| path.to_path_buf())
            .map_err(|e| format!("{}: {}", path.display(), e)),
        None => settings.save().map_err(|e| e.to_string()),
    }
}

/// Choose the [`ExportFormat`] from `--format` or infer it from the output
/// file extension. Defaults to PNG; an unknown `--format` is an error.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> Result<ExportFormat, String> {
    if let Some(f) = format_arg {
        return ExportFormat::parse(f)
            .ok_or_else(|| format!("unsupported format '{}' (expected png, bmp or tga)", f));
    }
    Ok(output
        .and_then(ExportFormat::from_path)
        .unwrap_or_default())
}

/// Where a script's export goes: `--output` as given, else
/// `<output-dir>/<stem>.<ext>`, else `<stem>.<ext>` beside the script.
/// Returns `None` for a script path without a file stem.
fn build_output_path(
    script: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: ExportFormat,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let stem = script.file_stem()?.to_string_lossy();
    let ext = format.extension();
    let file_name = format!("{}.{}", stem, ext);

    match output_dir {
        Some(dir) => Some(dir.join(file_name)),
        None => {
            let dir = script.parent().unwrap_or(Path::new("."));
            let beside = dir.join(&file_name);
            // never export over the script itself
            if beside == script {
                Some(dir.join(format!("{}_out.{}", stem, ext)))
            } else {
                Some(beside)
            }
        }
    }
}
