use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;

use crate::{Res, error::Error, spotify::gateway::Gateway, types::Outcome};

const NO_ACTIVE_DEVICE: &str = "No active device found. Start playing music on Spotify.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    Play,
    Pause,
    Next,
    Previous,
}

impl PlayerCommand {
    fn method(self) -> Method {
        match self {
            PlayerCommand::Play | PlayerCommand::Pause => Method::PUT,
            PlayerCommand::Next | PlayerCommand::Previous => Method::POST,
        }
    }

    fn endpoint(self) -> &'static str {
        match self {
            PlayerCommand::Play => "/me/player/play",
            PlayerCommand::Pause => "/me/player/pause",
            PlayerCommand::Next => "/me/player/next",
            PlayerCommand::Previous => "/me/player/previous",
        }
    }
}

/// Playback and library operations on top of the [`Gateway`].
pub struct Player {
    gateway: Arc<Gateway>,
}

impl Player {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Player { gateway }
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    pub async fn currently_playing(&self) -> Outcome {
        self.gateway.get("/me/player/currently-playing").await
    }

    pub async fn player_state(&self) -> Outcome {
        self.gateway.get("/me/player").await
    }

    pub async fn play(&self) -> Res<()> {
        self.send(PlayerCommand::Play).await
    }

    pub async fn pause(&self) -> Res<()> {
        self.send(PlayerCommand::Pause).await
    }

    pub async fn next(&self) -> Res<()> {
        self.send(PlayerCommand::Next).await
    }

    pub async fn previous(&self) -> Res<()> {
        self.send(PlayerCommand::Previous).await
    }

    pub async fn send(&self, command: PlayerCommand) -> Res<()> {
        let outcome = self
            .gateway
            .call(command.endpoint(), command.method(), None)
            .await;
        self.settle_playback(outcome).await.map(|_| ())
    }

    /// Pauses when something is playing, resumes otherwise. Returns the
    /// command that was sent.
    pub async fn toggle_play_pause(&self) -> Res<PlayerCommand> {
        let state = self.settle_playback(self.player_state().await).await?;
        let Some(state) = state.filter(|s| !s.is_null()) else {
            return Err(Error::Provider {
                status: 404,
                message: NO_ACTIVE_DEVICE.to_string(),
            });
        };

        let command = if state["is_playing"].as_bool().unwrap_or(false) {
            PlayerCommand::Pause
        } else {
            PlayerCommand::Play
        };
        self.send(command).await?;
        Ok(command)
    }

    pub async fn is_liked(&self, track_id: &str) -> Res<bool> {
        let endpoint = format!("/me/tracks/contains?ids={track_id}");
        let payload = self.settle(self.gateway.get(&endpoint).await).await?;
        Ok(payload
            .as_ref()
            .and_then(|p| p.get(0))
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    pub async fn set_liked(&self, track_id: &str, liked: bool) -> Res<()> {
        let endpoint = format!("/me/tracks?ids={track_id}");
        let method = if liked { Method::PUT } else { Method::DELETE };
        let outcome = self.gateway.call(&endpoint, method, None).await;
        self.settle(outcome).await.map(|_| ())
    }

    /// Flips the saved state of a track and returns the new state.
    pub async fn toggle_like(&self, track_id: &str) -> Res<bool> {
        let liked = !self.is_liked(track_id).await?;
        self.set_liked(track_id, liked).await?;
        Ok(liked)
    }

    /// Like [`Player::settle`], but a 404 on `/me/player*` means no device.
    async fn settle_playback(&self, outcome: Outcome) -> Res<Option<Value>> {
        match outcome {
            Outcome::Error { status: 404, .. } => Err(Error::Provider {
                status: 404,
                message: NO_ACTIVE_DEVICE.to_string(),
            }),
            other => self.settle(other).await,
        }
    }

    /// Turns an outcome into a result, dropping credentials on 401.
    async fn settle(&self, outcome: Outcome) -> Res<Option<Value>> {
        match outcome {
            Outcome::Data { payload, .. } => Ok(Some(payload)),
            Outcome::NoContent => Ok(None),
            Outcome::Error { status: 401, .. } => {
                self.gateway.tokens().invalidate().await;
                Err(Error::Unauthorized)
            }
            Outcome::Error { status: 0, message } => Err(Error::Network(message)),
            Outcome::Error { status, message } => Err(Error::Provider { status, message }),
        }
    }
}
