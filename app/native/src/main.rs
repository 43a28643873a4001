#![allow(clippy::multiple_crate_versions)]

//! swayfade - fades unfocused windows on sway and i3.
//!
//! Runs in the foreground until SIGINT or SIGTERM, then restores every
//! window to full opacity.

fn main() {
    if let Err(err) = swayfade_lib::cli::run() {
        eprintln!("swayfade: {err}");
        std::process::exit(1);
    }
}
