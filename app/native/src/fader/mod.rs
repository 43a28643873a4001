//! Opacity fading.
//!
//! - `table` - per-window linear fades and the merge rule for redirected fades
//! - `engine` - shared handle around the table plus the periodic driver task
//! - `sink` - where opacity values go once computed

mod engine;
mod sink;
mod table;

pub use engine::FadeEngine;
#[cfg(test)]
pub(crate) use sink::testing;
pub use sink::{IpcSink, OpacitySink, opacity_command};
pub use table::{FadeRecord, FadeTable, OpacityUpdate};
