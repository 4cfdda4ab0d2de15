// ============================================================================
// Sketchpad scripting — Rhai-based sandboxed session scripting
// ============================================================================
//
// Scripts drive a CanvasSession through the same operations the pointer and
// toolbar would: strokes, fills, tool changes, clear, undo/redo. Used by the
// CLI batch runner.

use rhai::{Array, Dynamic, Engine, EvalAltResult, ImmutableString, Position, Scope};
use std::sync::{Arc, Mutex};

use crate::canvas::Rgb;
use crate::components::tools::Tool;
use crate::session::CanvasSession;

// ============================================================================
// Error type
// ============================================================================

#[derive(Debug, Clone)]
pub struct ScriptError {
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl ScriptError {
    fn at(message: String, pos: Position) -> Self {
        Self {
            message,
            line: pos.line().filter(|&l| l > 0),
            column: pos.position().filter(|&c| c > 0),
        }
    }

    /// Error explanation with line/column context and a hint for the common
    /// mistakes.
    pub fn friendly_message(&self) -> String {
        let raw = &self.message;
        let mut parts = Vec::new();

        match (self.line, self.column) {
            (Some(line), Some(col)) => {
                parts.push(format!("Error on line {}, column {}:", line, col));
            }
            (Some(line), None) => {
                parts.push(format!("Error on line {}:", line));
            }
            _ => {
                parts.push("Script error:".to_string());
            }
        }

        let cleaned = raw.split(" (line ").next().unwrap_or(raw);
        parts.push(format!("  {}", cleaned));

        if raw.contains("Function not found:") {
            parts.push(String::new());
            parts.push("  Tip: coordinates are numbers, colors are \"#rrggbb\" strings,".to_string());
            parts.push("  and stroke() takes an array of [x, y] pairs.".to_string());
        } else if raw.contains("Too many operations") {
            parts.push(String::new());
            parts.push("  Tip: the script may contain an infinite loop.".to_string());
        }

        parts.join("\n")
    }
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let (Some(line), Some(col)) = (self.line, self.column) {
            write!(f, "Line {}, Col {}: {}", line, col, self.message)
        } else if let Some(line) = self.line {
            write!(f, "Line {}: {}", line, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ScriptError {}

// ============================================================================
// Script context — shared mutable state between engine and host functions
// ============================================================================

struct ScriptContext {
    session: CanvasSession,
    console_output: Vec<String>,
}

type SharedContext = Arc<Mutex<ScriptContext>>;

/// What a successful script run hands back.
pub struct ScriptRun {
    pub session: CanvasSession,
    pub console_output: Vec<String>,
}

type HostResult<T> = Result<T, Box<EvalAltResult>>;

fn number(v: &Dynamic) -> Option<f32> {
    v.as_float()
        .ok()
        .map(|f| f as f32)
        .or_else(|| v.as_int().ok().map(|i| i as f32))
}

fn coords(x: &Dynamic, y: &Dynamic) -> HostResult<(f32, f32)> {
    match (number(x), number(y)) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(format!(
            "expected numeric coordinates, got ({}, {})",
            x.type_name(),
            y.type_name()
        )
        .into()),
    }
}

// ============================================================================
// Engine construction with full sandbox + API registration
// ============================================================================

fn create_engine(ctx: SharedContext) -> Engine {
    let mut engine = Engine::new();

    // ── Sandbox limits ──
    engine.set_max_operations(50_000_000);
    engine.set_max_call_levels(64);
    engine.set_max_expr_depths(64, 64);
    engine.set_max_string_size(10_000);
    engine.set_max_array_size(100_000);
    engine.set_max_map_size(1_000);

    register_canvas_api(&mut engine, ctx.clone());
    register_tool_api(&mut engine, ctx.clone());
    register_pointer_api(&mut engine, ctx.clone());
    register_history_api(&mut engine, ctx.clone());
    register_utility_api(&mut engine, ctx);

    engine
}

// ============================================================================
// Canvas API
// ============================================================================

fn register_canvas_api(engine: &mut Engine, ctx: SharedContext) {
    let c = ctx.clone();
    engine.register_fn("width", move || -> i64 {
        let lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.width() as i64
    });

    let c = ctx.clone();
    engine.register_fn("height", move || -> i64 {
        let lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.height() as i64
    });

    // get_pixel(x, y) -> [r, g, b, a]
    let c = ctx.clone();
    engine.register_fn("get_pixel", move |x: i64, y: i64| -> HostResult<Array> {
        let lock = c.lock().unwrap_or_else(|e| e.into_inner());
        let px = lock
            .session
            .buffer()
            .get(x, y)
            .map_err(|e| e.to_string())?;
        Ok(px.0.iter().map(|&v| Dynamic::from(v as i64)).collect())
    });

    // fill(x, y) -> number of pixels repainted
    let c = ctx.clone();
    engine.register_fn("fill", move |x: i64, y: i64| -> HostResult<i64> {
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        let report = lock.session.fill_at(x, y).map_err(|e| e.to_string())?;
        Ok(report.painted as i64)
    });

    let c = ctx.clone();
    engine.register_fn("clear", move || {
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.clear();
    });

    let c = ctx;
    engine.register_fn("remove_background", move || -> bool {
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.remove_background_image()
    });
}

// ============================================================================
// Tool API
// ============================================================================

fn register_tool_api(engine: &mut Engine, ctx: SharedContext) {
    let c = ctx.clone();
    engine.register_fn("set_tool", move |name: ImmutableString| -> HostResult<()> {
        let tool = Tool::parse(&name).ok_or_else(|| format!("unknown tool '{}'", name))?;
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.set_tool(tool);
        Ok(())
    });

    let c = ctx.clone();
    engine.register_fn("set_color", move |hex: ImmutableString| -> HostResult<()> {
        let color = Rgb::from_hex(&hex).map_err(|e| e.to_string())?;
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.set_color(color);
        Ok(())
    });

    // set_brush_width(n) -> width actually applied
    let c = ctx.clone();
    engine.register_fn("set_brush_width", move |width: i64| -> i64 {
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.set_brush_width(width.clamp(0, u32::MAX as i64) as u32) as i64
    });

    let c = ctx;
    engine.register_fn("eraser", move || {
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.select_eraser();
    });
}

// ============================================================================
// Pointer API
// ============================================================================

fn register_pointer_api(engine: &mut Engine, ctx: SharedContext) {
    let c = ctx.clone();
    engine.register_fn("down", move |x: Dynamic, y: Dynamic| -> HostResult<()> {
        let (x, y) = coords(&x, &y)?;
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.pointer_down(x, y).map_err(|e| e.to_string())?;
        Ok(())
    });

    let c = ctx.clone();
    engine.register_fn("move_to", move |x: Dynamic, y: Dynamic| -> HostResult<bool> {
        let (x, y) = coords(&x, &y)?;
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        Ok(lock.session.pointer_move(x, y))
    });

    let c = ctx.clone();
    engine.register_fn("up", move || -> bool {
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.pointer_up()
    });

    let c = ctx.clone();
    engine.register_fn("leave", move || -> bool {
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.pointer_leave()
    });

    // stroke([[x, y], ...]) — press at the first point, drag through the
    // rest, release. Every point is validated before anything is drawn.
    let c = ctx;
    engine.register_fn("stroke", move |points: Array| -> HostResult<()> {
        let mut path = Vec::with_capacity(points.len());
        for p in points {
            let pair = p
                .into_array()
                .map_err(|t| format!("stroke point must be [x, y], got {}", t))?;
            if pair.len() != 2 {
                return Err(format!("stroke point must be [x, y], got {} values", pair.len()).into());
            }
            path.push(coords(&pair[0], &pair[1])?);
        }
        let Some((&(x0, y0), rest)) = path.split_first() else {
            return Ok(());
        };

        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.pointer_down(x0, y0).map_err(|e| e.to_string())?;
        for &(x, y) in rest {
            lock.session.pointer_move(x, y);
        }
        lock.session.pointer_up();
        Ok(())
    });
}

// ============================================================================
// History API
// ============================================================================

fn register_history_api(engine: &mut Engine, ctx: SharedContext) {
    let c = ctx.clone();
    engine.register_fn("undo", move || -> bool {
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.undo()
    });

    let c = ctx.clone();
    engine.register_fn("redo", move || -> bool {
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.redo()
    });

    let c = ctx.clone();
    engine.register_fn("can_undo", move || -> bool {
        let lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.can_undo()
    });

    let c = ctx.clone();
    engine.register_fn("can_redo", move || -> bool {
        let lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.can_redo()
    });

    let c = ctx.clone();
    engine.register_fn("history_len", move || -> i64 {
        let lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.history().len() as i64
    });

    let c = ctx;
    engine.register_fn("history_index", move || -> i64 {
        let lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.session.history().index() as i64
    });
}

// ============================================================================
// Utility API
// ============================================================================

fn register_utility_api(engine: &mut Engine, ctx: SharedContext) {
    let c = ctx;
    engine.on_print(move |msg| {
        log_info!("script: {}", msg);
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.console_output.push(msg.to_string());
    });
}

// ============================================================================
// Public execution API
// ============================================================================

/// Check a script for syntax errors without running it.
pub fn compile_script(source: &str) -> Result<(), ScriptError> {
    Engine::new()
        .compile(source)
        .map(|_| ())
        .map_err(|e| ScriptError::at(e.to_string(), e.position()))
}

/// Run `source` against `session` on the calling thread and hand the session
/// back with everything the script printed.
pub fn run_script(source: &str, session: CanvasSession) -> Result<ScriptRun, ScriptError> {
    let ctx = Arc::new(Mutex::new(ScriptContext {
        session,
        console_output: Vec::new(),
    }));

    let engine = create_engine(ctx.clone());
    let mut scope = Scope::new();

    let ast = engine
        .compile(source)
        .map_err(|e| ScriptError::at(e.to_string(), e.position()))?;
    engine
        .run_ast_with_scope(&mut scope, &ast)
        .map_err(|e| ScriptError::at(e.to_string(), e.position()))?;

    // The engine's host functions hold the other references.
    drop(engine);
    let ctx = Arc::try_unwrap(ctx).map_err(|_| ScriptError {
        message: "script engine still holds the canvas".to_string(),
        line: None,
        column: None,
    })?;
    let ctx = ctx.into_inner().unwrap_or_else(|e| e.into_inner());
    Ok(ScriptRun {
        session: ctx.session,
        console_output: ctx.console_output,
    })
}
