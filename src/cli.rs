// ============================================================================
// rasterpad CLI: headless canvas host driven by replay scripts
// ============================================================================
//
// Usage examples:
//   rasterpad --ops strokes.txt --output out.png
//   rasterpad -i photo.png --ops markup.txt -o marked.jpg --quality 85
//   rasterpad --width 64 --height 32 --background transparent -o blank.png
//   rasterpad --config my.toml --font DejaVuSans.ttf --ops label.txt -o label.png

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use log::info;
use thiserror::Error;

use crate::color::{Color, parse_color};
use crate::config::PaintConfig;
use crate::error::{ConfigError, GridError, ImageIoError, ScriptError};
use crate::io::{self, DEFAULT_JPEG_QUALITY};
use crate::logger;
use crate::script::{self, ReplayStats};
use crate::session::CanvasSession;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Headless raster canvas: create or load an image, replay drawing
/// operations, and save the result.
#[derive(Parser, Debug)]
#[command(
    name = "rasterpad",
    about = "Headless raster paint engine",
    long_about = "Create a canvas (or load one with --input), replay a drawing\n\
                  script with --ops, and write the result as PNG or JPEG.\n\n\
                  Script lines: tool <name> | color primary|secondary <color> |\n\
                  press x y | drag x y | release x y | stroke x0 y0 x1 y1 ... |\n\
                  text x y size <text> | undo | redo   (# starts a comment)"
)]
pub struct CliArgs {
    /// TOML config file. Defaults to the per-user config when present.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Image to start from instead of a blank canvas (png, jpg, jpeg).
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Replay script to run against the canvas.
    #[arg(long, value_name = "FILE")]
    pub ops: Option<PathBuf>,

    /// Where to write the result. Format follows the extension.
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Blank canvas width (overrides config).
    #[arg(long)]
    pub width: Option<u32>,

    /// Blank canvas height (overrides config).
    #[arg(long)]
    pub height: Option<u32>,

    /// Blank canvas fill: palette name, #RRGGBB[AA], or "transparent".
    #[arg(long, value_name = "COLOR", value_parser = parse_color)]
    pub background: Option<Color>,

    /// TTF/OTF font for `text` ops (overrides config).
    #[arg(long, value_name = "FILE")]
    pub font: Option<PathBuf>,

    /// JPEG quality (1–100).
    #[arg(short, long, default_value_t = DEFAULT_JPEG_QUALITY, value_name = "1-100")]
    pub quality: u8,

    /// Log at debug level and echo the log to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Image(#[from] ImageIoError),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("script {path}: {source}")]
    Script {
        path: PathBuf,
        #[source]
        source: ScriptError,
    },
    #[error("could not read script {path}: {source}")]
    ScriptIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run the headless host and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    let start = Instant::now();
    match execute(&args) {
        Ok(stats) => {
            if args.verbose {
                println!(
                    "{} ops ({} undo, {} redo) -> {} in {:.1?}",
                    stats.ops,
                    stats.undos,
                    stats.redos,
                    args.output.display(),
                    start.elapsed()
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Resolve config from the file plus command-line overrides.
pub fn resolve_config(args: &CliArgs) -> Result<PaintConfig, ConfigError> {
    let mut config = PaintConfig::load_or_default(args.config.as_deref())?;
    if let Some(w) = args.width {
        config.canvas.width = w;
    }
    if let Some(h) = args.height {
        config.canvas.height = h;
    }
    if let Some(bg) = args.background {
        config.canvas.background = bg;
        config.canvas.transparent = bg[3] == 0;
    }
    if let Some(font) = &args.font {
        config.text.font_path = Some(font.clone());
    }
    if args.verbose {
        config.logging.level = "debug".to_string();
        config.logging.stderr = true;
    }
    config.validate()?;
    Ok(config)
}

fn execute(args: &CliArgs) -> Result<ReplayStats, CliError> {
    let config = resolve_config(args)?;
    logger::init(&config.logging);

    // Parse before touching the canvas so a bad script fails fast.
    let ops = match &args.ops {
        Some(path) => {
            let src = std::fs::read_to_string(path).map_err(|source| CliError::ScriptIo {
                path: path.clone(),
                source,
            })?;
            script::parse_script(&src).map_err(|source| CliError::Script {
                path: path.clone(),
                source,
            })?
        }
        None => Vec::new(),
    };

    let mut session = match &args.input {
        Some(path) => CanvasSession::from_grid(io::load_grid(path)?, &config),
        None => CanvasSession::new(&config)?,
    };

    let stats = script::replay(&mut session, &ops);
    info!(
        "Replayed {} ops; {} undo steps available",
        stats.ops,
        session.history().undo_count()
    );
    io::save_grid(session.grid(), &args.output, args.quality)?;
    Ok(stats)
}
