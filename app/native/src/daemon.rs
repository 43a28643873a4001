//! Daemon lifecycle.
//!
//! Starting the daemon:
//! 1. Resolves the IPC socket and subscribes an event connection to window events
//! 2. Fetches the layout tree on a second connection
//! 3. Hands that connection to the opacity writer task
//! 4. Applies the initial opacities and records the focused window
//! 5. Spawns the focus tracker and the event reader feeding it
//!
//! Stopping tears all of that down and leaves every window fully opaque.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::FadeConfig;
use crate::error::SwayfadeError;
use crate::fader::{FadeEngine, IpcSink, OpacitySink};
use crate::ipc::{self, Connection, EventStream, IpcError, WindowEvent, WindowId};
use crate::tracker::{EVENT_BUFFER_SIZE, FocusTracker, seed_opacities};

/// Opacity every window is left at once the daemon stops.
pub const RESTORED_OPACITY: f64 = 1.0;

struct Running {
    socket_path: PathBuf,
    engine: FadeEngine,
    sink: IpcSink,
    writer: JoinHandle<()>,
    tracker: JoinHandle<()>,
    reader: Option<JoinHandle<Result<(), IpcError>>>,
}

/// The fader daemon. Owns every task it spawns.
pub struct Daemon {
    config: FadeConfig,
    socket_path: Option<PathBuf>,
    running: Option<Running>,
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("config", &self.config)
            .field("socket_path", &self.socket_path)
            .field("running", &self.is_running())
            .finish()
    }
}

impl Daemon {
    /// Creates a stopped daemon that will locate the socket on start.
    #[must_use]
    pub const fn new(config: FadeConfig) -> Self {
        Self {
            config,
            socket_path: None,
            running: None,
        }
    }

    /// Uses `path` instead of resolving the socket from the environment.
    #[must_use]
    pub fn with_socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = Some(path.into());
        self
    }

    #[must_use]
    pub const fn is_running(&self) -> bool { self.running.is_some() }

    /// Connects to the window manager and starts fading.
    ///
    /// # Errors
    ///
    /// Returns [`SwayfadeError::AlreadyStarted`] if the daemon is running, or
    /// an IPC error if the window manager cannot be reached.
    pub async fn start(&mut self) -> Result<(), SwayfadeError> {
        if self.running.is_some() {
            return Err(SwayfadeError::AlreadyStarted);
        }

        let socket_path = match &self.socket_path {
            Some(path) => path.clone(),
            None => tokio::task::spawn_blocking(ipc::socket_path)
                .await
                .map_err(|err| IpcError::Io(err.into()))??,
        };
        tracing::debug!(path = %socket_path.display(), "connecting to window manager");

        // Subscribe before reading the tree so no focus change is missed in between.
        let events = Connection::connect(&socket_path).await?.subscribe_windows().await?;
        let mut commands = Connection::connect(&socket_path).await?;
        let tree = commands.get_tree().await?;

        let (sink, writer) = IpcSink::spawn(commands);
        let shared_sink: Arc<dyn OpacitySink> = Arc::new(sink.clone());

        let session = seed_opacities(&tree, &self.config, shared_sink.as_ref());
        let engine = FadeEngine::new(self.config.frame_duration(), shared_sink.clone());

        let (sender, receiver) = mpsc::channel(EVENT_BUFFER_SIZE);
        let tracker = FocusTracker::new(self.config, session, engine.clone(), shared_sink);
        let tracker = tokio::spawn(tracker.run(receiver));
        let reader = tokio::spawn(forward_events(events, sender));

        self.running = Some(Running {
            socket_path,
            engine,
            sink,
            writer,
            tracker,
            reader: Some(reader),
        });

        tracing::info!(
            active = self.config.active_opacity,
            inactive = self.config.inactive_opacity,
            floating = self.config.floating_opacity,
            fade_time = self.config.fade_time,
            "swayfade started"
        );
        Ok(())
    }

    /// Resolves once the event connection ends.
    ///
    /// Cancel-safe: dropping the returned future leaves the daemon running.
    ///
    /// # Errors
    ///
    /// Returns [`SwayfadeError::NotStarted`] if the daemon is not running, or
    /// the IPC error that ended the event connection.
    pub async fn wait(&mut self) -> Result<(), SwayfadeError> {
        let running = self.running.as_mut().ok_or(SwayfadeError::NotStarted)?;
        let Some(reader) = running.reader.as_mut() else {
            return Ok(());
        };

        let result = reader.await;
        running.reader = None;

        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(IpcError::ConnectionClosed)) => {
                tracing::info!("window manager closed the event connection");
                Ok(())
            }
            Ok(Err(err)) => Err(err.into()),
            Err(err) => {
                tracing::error!(error = %err, "event reader task failed");
                Ok(())
            }
        }
    }

    /// Stops fading and restores every window to full opacity.
    ///
    /// In-flight fades are abandoned. Windows are restored from a fresh
    /// layout tree, plus any window that was still fading.
    ///
    /// # Errors
    ///
    /// Returns [`SwayfadeError::NotStarted`] if the daemon is not running.
    pub async fn stop(&mut self) -> Result<(), SwayfadeError> {
        let running = self.running.take().ok_or(SwayfadeError::NotStarted)?;

        if let Some(reader) = running.reader {
            reader.abort();
        }
        running.tracker.abort();
        let fading = running.engine.shutdown();

        let mut windows: BTreeSet<WindowId> = fading.into_iter().collect();
        match fetch_window_ids(&running.socket_path).await {
            Ok(ids) => windows.extend(ids),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "could not fetch layout tree, restoring fading windows only"
                );
            }
        }

        for &window in &windows {
            running.sink.set_opacity(window, RESTORED_OPACITY);
        }
        running.sink.flush().await;
        running.writer.abort();

        tracing::info!(restored = windows.len(), "swayfade stopped");
        Ok(())
    }
}

async fn fetch_window_ids(socket_path: &Path) -> Result<Vec<WindowId>, IpcError> {
    let tree = Connection::connect(socket_path).await?.get_tree().await?;
    Ok(tree.windows().into_iter().map(|node| node.id).collect())
}

/// Reads window events and forwards them to the tracker in arrival order.
async fn forward_events(
    mut events: EventStream,
    sender: mpsc::Sender<WindowEvent>,
) -> Result<(), IpcError> {
    loop {
        match events.next_window_event().await {
            Ok(event) => {
                tracing::trace!(
                    change = ?event.change,
                    window = %event.container.id,
                    "window event"
                );
                if sender.send(event).await.is_err() {
                    tracing::debug!("focus tracker is gone, event reader stopping");
                    return Ok(());
                }
            }
            Err(IpcError::Json(err)) => {
                tracing::warn!(error = %err, "skipping malformed window event");
            }
            Err(err) => return Err(err),
        }
    }
}

/// Resolves when the process receives SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns an error if the signal handlers cannot be installed.
pub async fn shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}
