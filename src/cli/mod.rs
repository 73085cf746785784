//! # CLI Module
//!
//! Terminal front end for the spotbar core. It plays the part of the widget's
//! presentation layer: it asks the core for snapshots, renders them, and turns
//! keystrokes into playback commands.
//!
//! ## Commands
//!
//! - [`auth`] / [`logout`] - Browser PKCE login and local credential removal
//! - [`status`] - Stored credential summary
//! - [`now`] - One poll, rendered
//! - [`play_pause`], [`next`], [`prev`], [`like`] - Playback controls
//! - [`watch`] - Runs the poll loop and renders every snapshot, reading
//!   single-letter commands from stdin
//!
//! One-shot commands exit with status 1 through the `error!` macro when they
//! fail; `watch` keeps running and reports failures as warnings.

mod auth;
mod player;
mod status;
mod watch;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

pub use auth::auth;
pub use auth::logout;
pub use player::like;
pub use player::next;
pub use player::now;
pub use player::play_pause;
pub use player::prev;
pub use status::status;
pub use watch::watch;

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb
}
