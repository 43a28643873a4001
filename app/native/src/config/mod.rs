//! Configuration for swayfade.
//!
//! Settings come from three layers, highest priority first: command-line
//! flags, the configuration file, built-in defaults. Each key is resolved
//! independently.
//!
//! The configuration file supports TOML and JSONC (JSON with comments).

pub mod types;

use std::path::{Path, PathBuf};

pub use types::{
    ConfigError, DEFAULT_ACTIVE_OPACITY, DEFAULT_FADE_TIME, DEFAULT_FLOATING_OPACITY,
    DEFAULT_FRAME_TIME, DEFAULT_INACTIVE_OPACITY, FadeConfig, PartialConfig, config_paths,
    expand_path, load_config, load_config_from_path,
};

/// A resolved configuration and the file it was read from, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub config: FadeConfig,
    pub path: Option<PathBuf>,
}

/// Resolves the effective configuration.
///
/// `custom_path` replaces the default search paths and must exist. Without
/// it, a missing configuration file simply means defaults. `overrides` is
/// layered on top of whatever the file provides.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be loaded or the merged
/// values are out of range.
pub fn resolve(
    custom_path: Option<&Path>,
    overrides: PartialConfig,
) -> Result<LoadedConfig, ConfigError> {
    let (file_layer, path) = match custom_path {
        Some(path) => (load_config_from_path(path)?, Some(path.to_path_buf())),
        None => match load_config()? {
            Some((layer, path)) => (layer, Some(path)),
            None => (PartialConfig::default(), None),
        },
    };

    let config = file_layer.merge(overrides).resolve()?;

    match &path {
        Some(path) => tracing::debug!(path = %path.display(), ?config, "configuration loaded"),
        None => tracing::debug!(?config, "no configuration file found, using defaults"),
    }

    Ok(LoadedConfig { config, path })
}
