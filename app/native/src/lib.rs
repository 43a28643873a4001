//! swayfade - fades window opacity on focus changes under sway and i3.
//!
//! The daemon subscribes to window events over the window manager's IPC
//! socket, dims windows that lose focus and brightens the one that gains it,
//! interpolating opacity linearly over a configurable duration.

pub mod cli;
pub mod config;
pub mod daemon;
pub mod error;
pub mod fader;
pub mod ipc;
pub mod tracker;

pub use config::FadeConfig;
pub use daemon::Daemon;
pub use error::SwayfadeError;

/// Runs the daemon until a termination signal arrives or the window manager
/// goes away, then restores every window to full opacity.
///
/// # Errors
///
/// Returns an error if the daemon cannot start, if the event connection
/// fails, or if the signal handlers cannot be installed.
pub async fn run(mut daemon: Daemon) -> Result<(), SwayfadeError> {
    daemon.start().await?;

    let outcome = tokio::select! {
        result = daemon.wait() => result,
        signal = daemon::shutdown_signal() => match signal {
            Ok(name) => {
                tracing::info!(signal = name, "received termination signal");
                Ok(())
            }
            Err(err) => Err(err.into()),
        },
    };

    let stopped = daemon.stop().await;
    outcome.and(stopped)
}
