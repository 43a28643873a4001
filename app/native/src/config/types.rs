//! Configuration types for swayfade.
//!
//! The configuration file is optional. It may be TOML (`swayfade.toml` or
//! `swayfade.conf`) or JSONC (`swayfade.jsonc` / `swayfade.json`); in the
//! latter, `//` and `/* */` comments are stripped before parsing. Every key
//! is optional and unknown keys are ignored.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ipc::WindowKind;

/// Default opacity of the focused window.
pub const DEFAULT_ACTIVE_OPACITY: f64 = 1.0;

/// Default opacity of unfocused tiled windows.
pub const DEFAULT_INACTIVE_OPACITY: f64 = 0.9;

/// Default opacity of unfocused floating windows.
pub const DEFAULT_FLOATING_OPACITY: f64 = 0.9;

/// Default fade duration, in seconds.
pub const DEFAULT_FADE_TIME: f64 = 0.2;

/// Default time between fade frames, in seconds.
pub const DEFAULT_FRAME_TIME: f64 = 0.01;

/// Directory name under the user configuration directory.
const CONFIG_DIR_NAME: &str = "swayfade";

/// Supported configuration file names, in priority order.
const CONFIG_FILE_NAMES: [&str; 4] =
    ["swayfade.toml", "swayfade.conf", "swayfade.jsonc", "swayfade.json"];

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An explicitly requested configuration file does not exist.
    #[error("Invalid config path: {0} does not exist")]
    NotFound(PathBuf),

    /// The configuration file could not be read.
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML configuration file is malformed.
    #[error("Failed to parse configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    /// The JSON configuration file is malformed.
    #[error("Failed to parse configuration file: {0}")]
    Json(#[from] serde_json::Error),

    /// A value is outside its allowed range.
    #[error("{key} {reason}")]
    Invalid { key: &'static str, reason: &'static str },
}

// ============================================================================
// Resolved Configuration
// ============================================================================

/// Validated settings consumed by the fader.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FadeConfig {
    /// Opacity of the focused window, between 0 and 1.
    pub active_opacity: f64,
    /// Opacity of unfocused tiled windows, between 0 and 1.
    pub inactive_opacity: f64,
    /// Opacity of unfocused floating windows, between 0 and 1.
    pub floating_opacity: f64,
    /// Seconds a fade takes to complete. Zero disables fading.
    pub fade_time: f64,
    /// Seconds between fade frames.
    pub frame_time: f64,
}

impl Default for FadeConfig {
    fn default() -> Self {
        Self {
            active_opacity: DEFAULT_ACTIVE_OPACITY,
            inactive_opacity: DEFAULT_INACTIVE_OPACITY,
            floating_opacity: DEFAULT_FLOATING_OPACITY,
            fade_time: DEFAULT_FADE_TIME,
            frame_time: DEFAULT_FRAME_TIME,
        }
    }
}

impl FadeConfig {
    /// Checks every value against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let opacities = [
            ("active-opacity", self.active_opacity),
            ("inactive-opacity", self.inactive_opacity),
            ("floating-opacity", self.floating_opacity),
        ];
        for (key, value) in opacities {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid { key, reason: "must be between 0 and 1" });
            }
        }

        if !self.fade_time.is_finite() || self.fade_time < 0.0 {
            return Err(ConfigError::Invalid { key: "fade-time", reason: "cannot be negative" });
        }
        if Duration::try_from_secs_f64(self.fade_time).is_err() {
            return Err(ConfigError::Invalid { key: "fade-time", reason: "is too large" });
        }

        if !self.frame_time.is_finite() || self.frame_time <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "frame-time",
                reason: "must be greater than zero",
            });
        }
        match Duration::try_from_secs_f64(self.frame_time) {
            Ok(frame) if frame.is_zero() => {
                return Err(ConfigError::Invalid {
                    key: "frame-time",
                    reason: "must be at least one nanosecond",
                });
            }
            Ok(_) => {}
            Err(_) => {
                return Err(ConfigError::Invalid { key: "frame-time", reason: "is too large" });
            }
        }

        Ok(())
    }

    /// Fade duration. Only meaningful on a validated configuration.
    #[must_use]
    pub fn fade_duration(&self) -> Duration { Duration::from_secs_f64(self.fade_time) }

    /// Time between frames. Only meaningful on a validated configuration.
    #[must_use]
    pub fn frame_duration(&self) -> Duration { Duration::from_secs_f64(self.frame_time) }

    /// Opacity a window of the given kind rests at while unfocused.
    #[must_use]
    pub const fn resting_opacity(&self, kind: WindowKind) -> f64 {
        match kind {
            WindowKind::Floating => self.floating_opacity,
            WindowKind::Normal => self.inactive_opacity,
        }
    }
}

// ============================================================================
// Partial Configuration (one layer: file or command line)
// ============================================================================

/// One configuration layer where every key may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct PartialConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inactive_opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floating_opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fade_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_time: Option<f64>,
}

impl PartialConfig {
    /// Layers `overrides` on top of `self`; keys set in `overrides` win.
    #[must_use]
    pub fn merge(self, overrides: Self) -> Self {
        Self {
            active_opacity: overrides.active_opacity.or(self.active_opacity),
            inactive_opacity: overrides.inactive_opacity.or(self.inactive_opacity),
            floating_opacity: overrides.floating_opacity.or(self.floating_opacity),
            fade_time: overrides.fade_time.or(self.fade_time),
            frame_time: overrides.frame_time.or(self.frame_time),
        }
    }

    /// Fills absent keys with defaults and validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a value is out of range.
    pub fn resolve(self) -> Result<FadeConfig, ConfigError> {
        let defaults = FadeConfig::default();
        let config = FadeConfig {
            active_opacity: self.active_opacity.unwrap_or(defaults.active_opacity),
            inactive_opacity: self.inactive_opacity.unwrap_or(defaults.inactive_opacity),
            floating_opacity: self.floating_opacity.unwrap_or(defaults.floating_opacity),
            fade_time: self.fade_time.unwrap_or(defaults.fade_time),
            frame_time: self.frame_time.unwrap_or(defaults.frame_time),
        };
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Expands a leading `~` in a user-supplied path.
#[must_use]
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();
    if path.is_empty() {
        return PathBuf::new();
    }
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Returns the possible configuration file paths in priority order.
///
/// `$XDG_CONFIG_HOME/swayfade/` is checked first when set, then
/// `~/.config/swayfade/`, then the platform configuration directory.
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    let mut dirs_to_check = Vec::new();

    if let Some(xdg_config) = std::env::var_os("XDG_CONFIG_HOME").filter(|value| !value.is_empty())
    {
        dirs_to_check.push(PathBuf::from(xdg_config).join(CONFIG_DIR_NAME));
    }
    if let Some(home) = dirs::home_dir() {
        dirs_to_check.push(home.join(".config").join(CONFIG_DIR_NAME));
    }
    if let Some(config_dir) = dirs::config_dir() {
        dirs_to_check.push(config_dir.join(CONFIG_DIR_NAME));
    }

    let mut paths = Vec::new();
    for dir in dirs_to_check {
        for filename in CONFIG_FILE_NAMES {
            let path = dir.join(filename);
            // XDG_CONFIG_HOME and dirs::config_dir() usually coincide
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }
    paths
}

/// Loads one configuration file, choosing the parser from its extension.
///
/// Files ending in `.json` or `.jsonc` are parsed as JSONC; anything else
/// as TOML.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] if the file does not exist, or an I/O
/// or parse error.
pub fn load_config_from_path(path: &Path) -> Result<PartialConfig, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json") || ext.eq_ignore_ascii_case("jsonc"));

    if is_json {
        let file = fs::File::open(path)?;
        let reader = json_comments::StripComments::new(file);
        Ok(serde_json::from_reader(reader)?)
    } else {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}

/// Loads the first configuration file found in [`config_paths`].
///
/// Returns `Ok(None)` when no file exists.
///
/// # Errors
///
/// Returns an I/O or parse error for a file that exists but cannot be loaded.
pub fn load_config() -> Result<Option<(PartialConfig, PathBuf)>, ConfigError> {
    for path in config_paths() {
        if path.is_file() {
            let config = load_config_from_path(&path)?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}
