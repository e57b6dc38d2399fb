use std::path::{Path, PathBuf};

use log::{LevelFilter, info};
use serde::{Deserialize, Serialize};

use crate::color::{self, Color, TRANSPARENT};
use crate::error::ConfigError;
use crate::history::DEFAULT_MAX_HISTORY;
use crate::render::{DEFAULT_LARGE_CANVAS_THRESHOLD, DEFAULT_MAX_FPS};
use crate::tools::fill::DEFAULT_MAX_FILL_PIXELS;
use crate::tools::text::{DEFAULT_FONT_SIZE, MAX_FONT_SIZE, MIN_FONT_SIZE};

const CONFIG_DIR: &str = "rasterpad";
const CONFIG_FILE: &str = "rasterpad.toml";

/// Everything tunable about a canvas session, loaded from TOML.
/// Missing sections and keys fall back to their defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaintConfig {
    pub canvas: CanvasSettings,
    pub history: HistorySettings,
    pub render: RenderSettings,
    pub fill: FillSettings,
    pub text: TextSettings,
    pub logging: LoggingSettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasSettings {
    pub width: u32,
    pub height: u32,
    /// Display zoom hint for hosts; not used by the engine itself.
    pub pixel_size: u32,
    #[serde(with = "color::hex")]
    pub background: Color,
    /// Start fully transparent instead of filling with `background`.
    pub transparent: bool,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            pixel_size: 4,
            background: color::WHITE,
            transparent: false,
        }
    }
}

impl CanvasSettings {
    pub fn initial_fill(&self) -> Color {
        if self.transparent { TRANSPARENT } else { self.background }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub max_steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_memory_mb: Option<usize>,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_HISTORY,
            max_memory_mb: None,
        }
    }
}

impl HistorySettings {
    pub fn memory_limit_bytes(&self) -> Option<usize> {
        self.max_memory_mb.map(|mb| mb.saturating_mul(1024 * 1024))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Incremental render rate during drags; 0 renders on every event.
    pub max_fps: u32,
    pub large_canvas_threshold: u64,
    /// Pack full frames of large canvases on a worker instead of blocking.
    pub background_full_render: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            max_fps: DEFAULT_MAX_FPS,
            large_canvas_threshold: DEFAULT_LARGE_CANVAS_THRESHOLD,
            background_full_render: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillSettings {
    pub max_pixels: usize,
}

impl Default for FillSettings {
    fn default() -> Self {
        Self { max_pixels: DEFAULT_MAX_FILL_PIXELS }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
    pub font_size: f32,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            font_path: None,
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    /// Session log location; the platform data directory when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Echo records to stderr as well.
    pub stderr: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            stderr: false,
        }
    }
}

impl LoggingSettings {
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        self.level.parse().map_err(|_| ConfigError::Invalid {
            field: "logging.level",
            reason: format!("unknown level `{}`", self.level),
        })
    }
}

impl PaintConfig {
    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&raw).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `path`, or the platform config file when `path` is `None`.
    /// A missing file yields the defaults; an unreadable or invalid one is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = match path {
            Some(p) => Some(p.to_path_buf()),
            None => config_path(),
        };
        match resolved {
            Some(p) if p.exists() => Self::load(&p),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(ConfigError::Invalid {
                field: "canvas.width/height",
                reason: format!("must be positive, got {}x{}", self.canvas.width, self.canvas.height),
            });
        }
        if self.canvas.pixel_size == 0 {
            return Err(ConfigError::Invalid {
                field: "canvas.pixel_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.history.max_steps == 0 {
            return Err(ConfigError::Invalid {
                field: "history.max_steps",
                reason: "must be at least 1".to_string(),
            });
        }
        let size = self.text.font_size;
        if !(MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&size) {
            return Err(ConfigError::Invalid {
                field: "text.font_size",
                reason: format!("must be between {} and {}, got {}", MIN_FONT_SIZE, MAX_FONT_SIZE, size),
            });
        }
        self.logging.level_filter()?;
        Ok(())
    }
}

/// Per-user config file location.
pub fn config_path() -> Option<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|_| std::env::var("HOME").map(|home| PathBuf::from(home).join(".config")))
            .ok()?;
        return Some(config_dir.join(CONFIG_DIR).join(CONFIG_FILE));
    }
    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA").or_else(|_| std::env::var("USERPROFILE")).ok()?;
        return Some(PathBuf::from(appdata).join(CONFIG_DIR).join(CONFIG_FILE));
    }
    #[cfg(target_os = "macos")]
    {
        let home = std::env::var("HOME").ok()?;
        return Some(
            PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join(CONFIG_DIR)
                .join(CONFIG_FILE),
        );
    }
    #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
    {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|d| d.join(CONFIG_FILE)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn defaults_match_documented_values() {
        let config = PaintConfig::default();
        assert_eq!((config.canvas.width, config.canvas.height), (512, 512));
        assert_eq!(config.canvas.pixel_size, 4);
        assert_eq!(config.canvas.initial_fill(), color::WHITE);
        assert_eq!(config.history.max_steps, 50);
        assert_eq!(config.history.memory_limit_bytes(), None);
        assert_eq!(config.render.max_fps, 60);
        assert_eq!(config.render.large_canvas_threshold, 1_000_000);
        assert_eq!(config.fill.max_pixels, 100_000);
        assert_eq!(config.text.font_size, 12.0);
        assert_eq!(config.logging.level_filter().unwrap(), LevelFilter::Info);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = PaintConfig::from_toml_str(
            r##"
            [canvas]
            width = 64
            background = "red"

            [history]
            max_memory_mb = 2
            "##,
        )
        .unwrap();
        assert_eq!(config.canvas.width, 64);
        assert_eq!(config.canvas.height, 512);
        assert_eq!(config.canvas.background, color::RED);
        assert_eq!(config.history.memory_limit_bytes(), Some(2 * 1024 * 1024));
        assert_eq!(config.fill, FillSettings::default());
    }

    #[test]
    fn round_trips_through_toml() {
        let mut config = PaintConfig::default();
        config.canvas.background = Rgba([1, 2, 3, 4]);
        config.canvas.transparent = true;
        config.text.font_path = Some(PathBuf::from("/fonts/mono.ttf"));
        config.logging.stderr = true;
        let raw = config.to_toml_string().unwrap();
        assert!(raw.contains("#01020304"));
        assert_eq!(PaintConfig::from_toml_str(&raw).unwrap(), config);
        assert_eq!(config.canvas.initial_fill(), TRANSPARENT);
    }

    #[test]
    fn rejects_invalid_values() {
        for raw in [
            "[canvas]\nwidth = 0",
            "[history]\nmax_steps = 0",
            "[text]\nfont_size = 90.0",
            "[logging]\nlevel = \"loud\"",
            "[canvas]\nbackground = \"#zz\"",
        ] {
            assert!(PaintConfig::from_toml_str(raw).is_err(), "accepted {raw:?}");
        }
        assert!(matches!(
            PaintConfig::from_toml_str("[history]\nmax_steps = 0"),
            Err(ConfigError::Invalid { field: "history.max_steps", .. })
        ));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PaintConfig::load_or_default(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, PaintConfig::default());
    }

    #[test]
    fn loads_from_disk_and_reports_parse_path() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.toml");
        std::fs::write(&good, "[fill]\nmax_pixels = 10\n").unwrap();
        assert_eq!(PaintConfig::load(&good).unwrap().fill.max_pixels, 10);

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[fill\n").unwrap();
        match PaintConfig::load(&bad) {
            Err(ConfigError::Parse { path, .. }) => assert_eq!(path, bad),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
