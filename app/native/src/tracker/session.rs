//! Per-daemon focus state and the startup opacity pass.

use crate::config::FadeConfig;
use crate::fader::OpacitySink;
use crate::ipc::{Node, Window, WindowId};

/// What the tracker believes about focus between events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionState {
    /// The window believed focused, if any.
    pub current_window: Option<Window>,
    /// The most recently created window that has not been focused yet.
    pub pending_new_window: Option<WindowId>,
}

impl SessionState {
    #[must_use]
    pub const fn new(current_window: Option<Window>) -> Self {
        Self {
            current_window,
            pending_new_window: None,
        }
    }
}

/// Commands every window in `tree` to its starting opacity.
///
/// The focused window gets the active opacity and becomes the current
/// window; every other window gets the inactive opacity. Floating windows
/// are not treated specially here.
pub fn seed_opacities(tree: &Node, config: &FadeConfig, sink: &dyn OpacitySink) -> SessionState {
    let mut current_window = None;
    let mut seeded = 0_usize;

    for node in tree.windows() {
        if node.focused {
            sink.set_opacity(node.id, config.active_opacity);
            current_window = Some(node.window());
        } else {
            sink.set_opacity(node.id, config.inactive_opacity);
        }
        seeded += 1;
    }

    match current_window {
        Some(window) => tracing::debug!(seeded, focused = %window.id, "initial opacities applied"),
        None => tracing::debug!(seeded, "initial opacities applied, no focused window"),
    }

    SessionState::new(current_window)
}
