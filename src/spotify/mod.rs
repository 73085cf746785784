//! # Spotify Integration Module
//!
//! Everything that talks to Spotify: the authorization handshake, the Web API
//! gateway and the player operations built on it.
//!
//! ```text
//! Poller / CLI
//!      ↓
//! Player (playback commands, liked tracks)
//!      ↓
//! Gateway (bearer token, error classification)
//!      ↓                      ↘
//! Web API            TokenManager → token endpoint (refresh)
//! ```
//!
//! ## Modules
//!
//! - [`auth`] - PKCE authorization (`Authorizer`) and the two token grants.
//! - [`gateway`] - Wraps each Web API call and classifies the result into an
//!   [`Outcome`](crate::types::Outcome). Status 401 is the authorization
//!   failure signal; status 0 means no response was received.
//! - [`player`] - `/me/player` commands and `/me/tracks` liked state.
//!
//! Every outbound request goes through the one `reqwest::Client` built from
//! [`Config::http_client`](crate::config::Config::http_client), so all of them
//! share the same timeout.

pub mod auth;
pub mod gateway;
pub mod player;
