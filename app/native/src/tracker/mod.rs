//! Focus tracking.
//!
//! The tracker consumes window events in order and turns focus transitions
//! into fades. It owns the session state outright; nothing else reads or
//! writes it while the daemon runs.
//!
//! # Panic Recovery
//!
//! A panic while handling one event is caught and logged, and the tracker
//! keeps processing later events.

mod session;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

pub use session::{SessionState, seed_opacities};
use tokio::sync::mpsc;

use crate::config::FadeConfig;
use crate::fader::{FadeEngine, OpacitySink};
use crate::ipc::{Window, WindowChange, WindowEvent, WindowId};

/// Channel buffer size between the event reader and the tracker.
pub const EVENT_BUFFER_SIZE: usize = 256;

/// Applies the focus-transition policy to incoming window events.
pub struct FocusTracker {
    config: FadeConfig,
    session: SessionState,
    engine: FadeEngine,
    sink: Arc<dyn OpacitySink>,
}

impl std::fmt::Debug for FocusTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FocusTracker")
            .field("config", &self.config)
            .field("session", &self.session)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl FocusTracker {
    #[must_use]
    pub fn new(
        config: FadeConfig,
        session: SessionState,
        engine: FadeEngine,
        sink: Arc<dyn OpacitySink>,
    ) -> Self {
        Self { config, session, engine, sink }
    }

    #[must_use]
    pub const fn session(&self) -> &SessionState { &self.session }

    /// Processes events until the sender side is dropped.
    pub async fn run(mut self, mut events: mpsc::Receiver<WindowEvent>) {
        tracing::trace!("focus tracker starting");

        while let Some(event) = events.recv().await {
            let change = event.change;
            let window_id = event.container.id;
            let result = catch_unwind(AssertUnwindSafe(|| self.handle_event(&event)));

            if let Err(panic_info) = result {
                let panic_msg = panic_info
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic_info.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());

                tracing::error!(
                    ?change,
                    window = %window_id,
                    panic = %panic_msg,
                    "focus tracker panicked while handling event, continuing"
                );
            }
        }

        tracing::debug!("event channel closed, focus tracker exiting");
    }

    /// Dispatches one window event.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        let window = event.container.window();
        match event.change {
            WindowChange::New => self.on_window_new(window),
            WindowChange::Floating => self.on_window_floating(window),
            WindowChange::Focus => self.on_window_focus(window),
            WindowChange::Close => self.on_window_close(window.id),
            change => tracing::trace!(?change, window = %window.id, "ignoring window event"),
        }
    }

    /// A new window starts at its resting opacity without a fade.
    pub fn on_window_new(&mut self, window: Window) {
        let opacity = self.config.resting_opacity(window.kind);
        tracing::debug!(window = %window.id, kind = ?window.kind, opacity, "window created");

        self.sink.set_opacity(window.id, opacity);
        self.session.pending_new_window = Some(window.id);
    }

    /// Refreshes the cached kind of the current window when it starts floating.
    pub fn on_window_floating(&mut self, window: Window) {
        if self.session.current_window.is_some_and(|current| current.id == window.id) {
            tracing::debug!(
                window = %window.id,
                kind = ?window.kind,
                "current window changed kind"
            );
            self.session.current_window = Some(window);
        }
    }

    /// Moves focus to `window`, fading the outgoing and incoming windows.
    ///
    /// A window that is being focused for the first time since it was created
    /// switches instantly instead.
    pub fn on_window_focus(&mut self, window: Window) {
        let previous = self.session.current_window;
        if previous.is_some_and(|current| current.id == window.id) {
            return;
        }

        let config = self.config;
        let fade = config.fade_duration();

        if self.session.pending_new_window == Some(window.id) {
            tracing::debug!(window = %window.id, "first focus of new window, switching instantly");
            // Zero-duration enqueues also drop any fade still running for either window.
            if let Some(previous) = previous {
                let resting = config.resting_opacity(previous.kind);
                self.engine.enqueue(previous, resting, resting, Duration::ZERO);
            }
            let active = config.active_opacity;
            self.engine.enqueue(window, active, active, Duration::ZERO);
        } else {
            tracing::debug!(
                from = ?previous.map(|previous| previous.id),
                to = %window.id,
                "focus changed, fading"
            );
            if let Some(previous) = previous {
                let resting = config.resting_opacity(previous.kind);
                self.engine.enqueue(previous, config.active_opacity, resting, fade);
            }
            let resting = config.resting_opacity(window.kind);
            self.engine.enqueue(window, resting, config.active_opacity, fade);
            self.engine.start_driver();
        }

        self.session.current_window = Some(window);
        self.session.pending_new_window = None;
    }

    /// Stops fading a closed window.
    pub fn on_window_close(&mut self, window_id: WindowId) {
        if self.engine.cancel(window_id) {
            tracing::debug!(window = %window_id, "window closed mid-fade, fade dropped");
        }
        if self.session.pending_new_window == Some(window_id) {
            self.session.pending_new_window = None;
        }
    }
}
