//! The fade engine: the fade table plus the periodic driver that steps it.
//!
//! # Locking
//!
//! The table and the driver's running flag share one `parking_lot::Mutex`.
//! Every enqueue, step and teardown happens under it, and the driver decides
//! to exit (table empty) and clears its flag in the same critical section.
//! A caller that sees the flag set is therefore guaranteed the driver will
//! step at least once more.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::sink::OpacitySink;
use super::table::{FadeRecord, FadeTable, OpacityUpdate};
use crate::ipc::{Window, WindowId};

struct EngineState {
    table: FadeTable,
    driver_running: bool,
    driver: Option<JoinHandle<()>>,
    shut_down: bool,
}

/// Handle to the fade engine. Cheap to clone; all clones share one table.
#[derive(Clone)]
pub struct FadeEngine {
    state: Arc<Mutex<EngineState>>,
    sink: Arc<dyn OpacitySink>,
    frame_time: Duration,
}

impl std::fmt::Debug for FadeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("FadeEngine")
            .field("frame_time", &self.frame_time)
            .field("fading", &state.table.len())
            .field("driver_running", &state.driver_running)
            .finish_non_exhaustive()
    }
}

impl FadeEngine {
    /// Creates an engine stepping every `frame_time` and writing to `sink`.
    #[must_use]
    pub fn new(frame_time: Duration, sink: Arc<dyn OpacitySink>) -> Self {
        Self {
            state: Arc::new(Mutex::new(EngineState {
                table: FadeTable::new(frame_time),
                driver_running: false,
                driver: None,
                shut_down: false,
            })),
            sink,
            frame_time,
        }
    }

    /// Starts or redirects the fade of `window` toward `target`.
    ///
    /// A window without a fade is set to `start` immediately. A window
    /// already fading keeps its current opacity and is redirected. The
    /// driver is not started here; call [`Self::start_driver`] once the
    /// batch of enqueues is done.
    pub fn enqueue(&self, window: Window, start: f64, target: f64, duration: Duration) {
        let mut state = self.state.lock();
        if state.shut_down {
            return;
        }
        if let Some(update) = state.table.enqueue(window, start, target, duration) {
            self.apply(&[update]);
        }
        tracing::trace!(window = %window.id, start, target, ?duration, "fade enqueued");
    }

    /// Advances every fade by one frame and returns how many are still running.
    pub fn step(&self) -> usize {
        let mut state = self.state.lock();
        let updates = state.table.step();
        self.apply(&updates);
        state.table.len()
    }

    /// Drops the fade of a window without touching its opacity.
    pub fn cancel(&self, window_id: WindowId) -> bool {
        self.state.lock().table.remove(window_id).is_some()
    }

    /// Spawns the driver task unless it is already running or there is nothing to do.
    ///
    /// Returns whether a new driver was spawned. Must be called from within a
    /// tokio runtime.
    pub fn start_driver(&self) -> bool {
        let mut state = self.state.lock();
        if state.shut_down || state.driver_running || state.table.is_empty() {
            return false;
        }

        state.driver_running = true;
        state.driver = Some(tokio::spawn(self.clone().drive()));
        tracing::trace!(fading = state.table.len(), "fade driver started");
        true
    }

    async fn drive(self) {
        let mut ticker = tokio::time::interval(self.frame_time);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let done = {
                let mut state = self.state.lock();
                let updates = state.table.step();
                self.apply(&updates);

                let done = state.table.is_empty() || state.shut_down;
                if done {
                    state.driver_running = false;
                    state.driver = None;
                }
                done
            };

            if done {
                break;
            }
        }

        tracing::trace!("fade driver stopped");
    }

    /// Stops the driver, abandons every fade and returns the windows that were fading.
    ///
    /// The engine ignores later enqueues and driver starts.
    pub fn shutdown(&self) -> Vec<WindowId> {
        let mut state = self.state.lock();
        state.shut_down = true;
        state.driver_running = false;
        if let Some(driver) = state.driver.take() {
            driver.abort();
        }
        state.table.drain()
    }

    #[must_use]
    pub fn is_driver_running(&self) -> bool { self.state.lock().driver_running }

    #[must_use]
    pub fn len(&self) -> usize { self.state.lock().table.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.state.lock().table.is_empty() }

    /// Returns a copy of the fade record of a window, if it is fading.
    #[must_use]
    pub fn record(&self, window_id: WindowId) -> Option<FadeRecord> {
        self.state.lock().table.get(window_id).cloned()
    }

    fn apply(&self, updates: &[OpacityUpdate]) {
        for update in updates {
            self.sink.set_opacity(update.window_id, update.opacity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fader::sink::testing::RecordingSink;

    const EPSILON: f64 = 1e-9;
    const FADE: Duration = Duration::from_millis(200);

    fn engine(frame_ms: u64) -> (FadeEngine, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let engine = FadeEngine::new(Duration::from_millis(frame_ms), sink.clone());
        (engine, sink)
    }

    #[test]
    fn test_enqueue_commands_start_once() {
        let (engine, sink) = engine(10);
        engine.enqueue(Window::normal(1), 1.0, 0.9, FADE);
        engine.enqueue(Window::normal(1), 0.2, 0.5, FADE);

        assert_eq!(sink.commands_for(1), vec![1.0]);
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_merge_mid_fade_keeps_reached_opacity() {
        let (engine, sink) = engine(100);
        engine.enqueue(Window::normal(1), 1.0, 0.9, FADE);
        engine.step();

        engine.enqueue(Window::normal(1), 0.9, 1.0, FADE);
        let record = engine.record(WindowId(1)).unwrap();
        assert!((record.opacity - 0.95).abs() < EPSILON);
        assert!((record.target - 1.0).abs() < EPSILON);
        assert_eq!(sink.commands_for(1).len(), 2);
    }

    #[test]
    fn test_step_until_empty_ends_on_target() {
        let (engine, sink) = engine(10);
        engine.enqueue(Window::normal(4), 0.9, 1.0, FADE);

        let mut frames = 0;
        while engine.step() > 0 {
            frames += 1;
            assert!(frames < 100);
        }

        assert!(engine.is_empty());
        assert_eq!(sink.last_for(4), Some(1.0));
        let commands = sink.commands_for(4);
        assert!(commands.iter().all(|&opacity| opacity <= 1.0));
    }

    #[test]
    fn test_cancel_drops_fade_silently() {
        let (engine, sink) = engine(10);
        engine.enqueue(Window::normal(1), 1.0, 0.9, FADE);
        sink.clear();

        assert!(engine.cancel(WindowId(1)));
        assert!(!engine.cancel(WindowId(1)));
        assert_eq!(engine.step(), 0);
        assert!(sink.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_runs_to_completion_and_stops() {
        let (engine, sink) = engine(100);
        engine.enqueue(Window::normal(1), 1.0, 0.9, FADE);
        engine.enqueue(Window::normal(2), 0.9, 1.0, FADE);

        assert!(engine.start_driver());
        assert!(!engine.start_driver());
        assert!(engine.is_driver_running());

        tokio::time::sleep(Duration::from_millis(350)).await;

        assert!(engine.is_empty());
        assert!(!engine.is_driver_running());
        assert_eq!(sink.commands_for(1).len(), 3);
        assert_eq!(sink.last_for(1), Some(0.9));
        assert_eq!(sink.last_for(2), Some(1.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_restarts_after_stopping() {
        let (engine, sink) = engine(100);
        engine.enqueue(Window::normal(1), 1.0, 0.9, FADE);
        engine.start_driver();
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(!engine.is_driver_running());

        engine.enqueue(Window::normal(1), 0.9, 1.0, FADE);
        assert!(engine.start_driver());
        tokio::time::sleep(Duration::from_millis(350)).await;

        assert!(!engine.is_driver_running());
        assert_eq!(sink.last_for(1), Some(1.0));
    }

    #[tokio::test]
    async fn test_start_driver_with_empty_table_is_noop() {
        let (engine, _sink) = engine(10);
        assert!(!engine.start_driver());
        assert!(!engine.is_driver_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_abandons_fades() {
        let (engine, sink) = engine(100);
        engine.enqueue(Window::normal(2), 1.0, 0.9, FADE);
        engine.enqueue(Window::normal(1), 0.9, 1.0, FADE);
        engine.start_driver();

        let fading = engine.shutdown();
        assert_eq!(fading, vec![WindowId(1), WindowId(2)]);
        assert!(!engine.is_driver_running());

        sink.clear();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(sink.commands().is_empty());

        engine.enqueue(Window::normal(3), 1.0, 0.9, FADE);
        assert!(engine.is_empty());
        assert!(!engine.start_driver());
    }
}
