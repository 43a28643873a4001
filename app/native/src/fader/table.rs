//! The fade table: one linear fade per window.
//!
//! Pure state with no I/O. Every mutation returns the opacity updates it
//! implies so the caller decides how to apply them.

use std::collections::HashMap;
use std::time::Duration;

use crate::ipc::{Window, WindowId};

/// An opacity value to apply to a window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpacityUpdate {
    pub window_id: WindowId,
    pub opacity: f64,
}

/// An active fade.
#[derive(Debug, Clone, PartialEq)]
pub struct FadeRecord {
    /// Handle used to address the window.
    pub window: Window,
    /// Current interpolated opacity. Not clamped mid-fade.
    pub opacity: f64,
    /// Signed per-frame increment.
    pub delta: f64,
    /// Value the fade converges toward.
    pub target: f64,
}

impl FadeRecord {
    /// Advances one frame and reports whether the target has been reached.
    fn advance(&mut self) -> bool {
        self.opacity += self.delta;
        if self.delta > 0.0 {
            self.opacity >= self.target
        } else {
            self.opacity <= self.target
        }
    }
}

/// Active fades keyed by window.
#[derive(Debug)]
pub struct FadeTable {
    frame_time: Duration,
    records: HashMap<WindowId, FadeRecord>,
}

impl FadeTable {
    #[must_use]
    pub fn new(frame_time: Duration) -> Self {
        Self {
            frame_time,
            records: HashMap::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize { self.records.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    #[must_use]
    pub fn get(&self, window_id: WindowId) -> Option<&FadeRecord> { self.records.get(&window_id) }

    /// Starts or redirects the fade of `window`.
    ///
    /// A new fade begins at `start` and the returned update must be applied
    /// right away. An existing fade keeps its current opacity and heads for
    /// the new target from there, with its rate recomputed over `duration`;
    /// nothing is returned in that case.
    ///
    /// A zero `duration` jumps straight to `target`, dropping any fade in
    /// progress for the window.
    pub fn enqueue(
        &mut self,
        window: Window,
        start: f64,
        target: f64,
        duration: Duration,
    ) -> Option<OpacityUpdate> {
        if duration.is_zero() {
            self.records.remove(&window.id);
            return Some(OpacityUpdate {
                window_id: window.id,
                opacity: target,
            });
        }

        if let Some(record) = self.records.get_mut(&window.id) {
            record.window = window;
            record.delta = per_frame(self.frame_time, duration, record.opacity, target);
            record.target = target;
            return None;
        }

        let delta = per_frame(self.frame_time, duration, start, target);
        self.records.insert(window.id, FadeRecord {
            window,
            opacity: start,
            delta,
            target,
        });

        Some(OpacityUpdate {
            window_id: window.id,
            opacity: start,
        })
    }

    /// Advances every fade by one frame.
    ///
    /// Finished fades are removed and report exactly their target so no
    /// rounding residue is left on the window.
    pub fn step(&mut self) -> Vec<OpacityUpdate> {
        let mut updates = Vec::with_capacity(self.records.len());

        self.records.retain(|&window_id, record| {
            let finished = record.advance();
            let opacity = if finished { record.target } else { record.opacity };
            updates.push(OpacityUpdate { window_id, opacity });
            !finished
        });

        updates
    }

    /// Drops the fade of a window without producing an update.
    pub fn remove(&mut self, window_id: WindowId) -> Option<FadeRecord> {
        self.records.remove(&window_id)
    }

    /// Empties the table and returns the windows that were still fading.
    pub fn drain(&mut self) -> Vec<WindowId> {
        let mut ids: Vec<WindowId> = self.records.drain().map(|(id, _)| id).collect();
        ids.sort_unstable();
        ids
    }
}

/// Per-frame increment covering `from -> target` in `duration`.
fn per_frame(frame_time: Duration, duration: Duration, from: f64, target: f64) -> f64 {
    (frame_time.as_secs_f64() / duration.as_secs_f64()) * (target - from)
}
