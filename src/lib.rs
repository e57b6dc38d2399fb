//! Raster paint engine: a pixel grid edited by pointer-driven tools, with
//! per-session undo steps and a dirty-region aware renderer.
//!
//! The usual entry point is [`session::CanvasSession`], which wires a
//! [`grid::PixelGrid`] to the tools, the undo history and a display buffer.

pub mod cli;
pub mod color;
pub mod config;
pub mod error;
pub mod grid;
pub mod history;
pub mod io;
pub mod logger;
pub mod render;
pub mod script;
pub mod session;
pub mod tools;

pub use color::Color;
pub use config::PaintConfig;
pub use error::{ConfigError, FontError, GridError, ImageIoError, ScriptError};
pub use grid::{PixelGrid, PixelRect};
pub use history::{Command, HistoryManager, PixelChangeCommand};
pub use render::preview::PreviewLayer;
pub use render::target::{DisplayBuffer, TargetGuard};
pub use render::{Flush, RenderService, RenderThrottle};
pub use session::{CanvasSession, PressOutcome};
pub use tools::{PixelChange, Tool, ToolChoice, ToolKind};
