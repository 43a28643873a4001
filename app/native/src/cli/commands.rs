//! CLI argument definitions using Clap.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{self, LoadedConfig, PartialConfig, expand_path};
use crate::daemon::Daemon;
use crate::error::SwayfadeError;
use crate::ipc;

/// Application version from Cargo.toml.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// swayfade - fades unfocused windows on sway and i3.
///
/// Runs in the foreground until interrupted. Every flag overrides the same
/// key from the configuration file.
#[derive(Parser, Debug, Default)]
#[command(name = "swayfade")]
#[command(author, version = APP_VERSION, about, long_about = None)]
pub struct Cli {
    /// Opacity of the focused window (0 to 1).
    #[arg(long, short = 'a', value_name = "OPACITY")]
    pub active_opacity: Option<f64>,

    /// Opacity of unfocused tiled windows (0 to 1).
    #[arg(long, short = 'i', value_name = "OPACITY")]
    pub inactive_opacity: Option<f64>,

    /// Opacity of unfocused floating windows (0 to 1).
    #[arg(long, short = 'f', value_name = "OPACITY")]
    pub floating_opacity: Option<f64>,

    /// Seconds a fade takes. Zero switches opacity instantly.
    #[arg(long, short = 't', value_name = "SECONDS")]
    pub fade_time: Option<f64>,

    /// Seconds between fade frames.
    #[arg(long, short = 'r', value_name = "SECONDS")]
    pub frame_time: Option<f64>,

    /// Path to a configuration file.
    ///
    /// Overrides the default configuration file search paths.
    /// Supports TOML and JSONC (JSON with comments).
    #[arg(long, short, value_name = "PATH", env = "SWAYFADE_CONFIG")]
    pub config: Option<String>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    /// The configuration layer made of the flags that were given.
    #[must_use]
    pub const fn overrides(&self) -> PartialConfig {
        PartialConfig {
            active_opacity: self.active_opacity,
            inactive_opacity: self.inactive_opacity,
            floating_opacity: self.floating_opacity,
            fade_time: self.fade_time,
            frame_time: self.frame_time,
        }
    }

    /// The configuration file requested with `--config`, with `~` expanded.
    #[must_use]
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.as_deref().map(expand_path).filter(|path| !path.as_os_str().is_empty())
    }

    /// Merges flags, configuration file and defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be loaded or a
    /// value is out of range.
    pub fn resolve_config(&self) -> Result<LoadedConfig, SwayfadeError> {
        Ok(config::resolve(self.config_path().as_deref(), self.overrides())?)
    }

    /// Runs the command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the daemon fails.
    pub fn execute(&self) -> Result<(), SwayfadeError> {
        let loaded = self.resolve_config()?;

        if self.print_config {
            print_config(&loaded);
            return Ok(());
        }

        if let Some(path) = &loaded.path {
            tracing::info!(path = %path.display(), "using configuration file");
        }

        // May spawn `sway --get-socketpath`, so resolve before entering the runtime.
        let socket_path = ipc::socket_path()?;
        let daemon = Daemon::new(loaded.config).with_socket_path(socket_path);

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        runtime.block_on(crate::run(daemon))
    }
}

fn print_config(loaded: &LoadedConfig) {
    if let Some(path) = &loaded.path {
        println!("# loaded from {}", path.display());
    }
    match toml::to_string(&loaded.config) {
        Ok(rendered) => print!("{rendered}"),
        Err(err) => tracing::warn!(error = %err, "failed to render configuration"),
    }
}
