//! spotbar core library
//!
//! The engine behind a taskbar now-playing widget for Spotify: the OAuth PKCE
//! login, an encrypted token cache with proactive refresh, a Web API gateway
//! that classifies every failure, and an adaptive poll loop that turns remote
//! playback state into UI snapshots.
//!
//! # Modules
//!
//! - `api` - HTTP endpoint for the local authorization callback
//! - `app` - Wiring of all components for one process
//! - `cli` - Terminal front end standing in for the widget UI
//! - `config` - Configuration from environment variables and `.env`
//! - `error` - Error taxonomy
//! - `events` - Outbound events to the presentation layer
//! - `management` - Credential storage and token lifecycle
//! - `poller` - Now-playing poll loop and interval table
//! - `server` - Ephemeral callback listener
//! - `spotify` - Authorization, gateway and player operations
//! - `types` - Data structures
//! - `utils` - PKCE helpers and formatting
//!
//! # Example
//!
//! ```
//! use spotbar::{app::App, config};
//!
//! #[tokio::main]
//! async fn main() -> spotbar::Res<()> {
//!     config::load_env().await?;
//!     let app = App::new(config::Config::from_env()?)?;
//!     let poller = app.start_poller();
//!     // subscribe to app.events ...
//!     poller.stop().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod management;
pub mod poller;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

/// A convenient Result type alias for operations that may fail.
pub type Res<T> = std::result::Result<T, error::Error>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Waiting for authorization in your browser...");
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only the one-shot CLI commands use this; the core never terminates the
/// process.
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
