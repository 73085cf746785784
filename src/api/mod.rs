//! # API Module
//!
//! HTTP endpoints served by the ephemeral authorization listener.
//!
//! - [`callback`] - Receives the provider redirect, exchanges the code for
//!   tokens and answers the browser with a small HTML page. Each listener
//!   serves exactly one callback; later requests get `410 Gone`.
//!
//! The endpoint is mounted by [`crate::server::serve_callback`].

mod callback;

pub use callback::CallbackContext;
pub use callback::callback;
