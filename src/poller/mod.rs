//! Now-playing poll loop.
//!
//! The poller is one tokio task that owns its timer. Each tick calls the Web
//! API, classifies the answer into a [`PlaybackSnapshot`], emits it on the
//! [`EventBus`] and only then arms the next tick, so ticks never overlap.

mod interval;

pub use interval::{REFRESH_DEBOUNCE, next_interval};

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{broadcast::error::RecvError, mpsc},
    task::JoinHandle,
    time::{Instant, sleep_until},
};
use tracing::{debug, info, warn};

use crate::{
    events::{CoreEvent, EventBus},
    management::TokenManager,
    spotify::player::Player,
    types::{CurrentlyPlayingResponse, Outcome, PlaybackSnapshot, SnapshotKind},
};

#[derive(Debug)]
enum PollerCommand {
    RefreshSoon,
    SetVisible(bool),
    Stop,
}

pub struct Poller {
    player: Arc<Player>,
    tokens: Arc<TokenManager>,
    events: EventBus,
    debounce: Duration,
}

/// Control surface of a running poller.
pub struct PollerHandle {
    commands: mpsc::Sender<PollerCommand>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Requests a debounced re-poll after a manual action. Bursts collapse
    /// into a single poll.
    pub fn refresh_soon(&self) {
        let _ = self.commands.try_send(PollerCommand::RefreshSoon);
    }

    pub fn set_visible(&self, visible: bool) {
        let _ = self.commands.try_send(PollerCommand::SetVisible(visible));
    }

    pub async fn stop(self) {
        let _ = self.commands.send(PollerCommand::Stop).await;
        if let Err(e) = self.task.await {
            warn!("poller task ended abnormally: {}", e);
        }
    }
}

impl Poller {
    pub fn new(player: Arc<Player>, tokens: Arc<TokenManager>, events: EventBus) -> Self {
        Poller {
            player,
            tokens,
            events,
            debounce: REFRESH_DEBOUNCE,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// One tick: query the Web API and classify the result.
    pub async fn poll_once(&self) -> PlaybackSnapshot {
        match self.player.currently_playing().await {
            Outcome::Error { status: 401, .. } => self.unauthorized().await,
            Outcome::Error { message, .. } => PlaybackSnapshot::Error { message },
            Outcome::NoContent => self.check_device().await,
            Outcome::Data { payload, .. } if payload.is_null() => self.check_device().await,
            Outcome::Data { payload, .. } => {
                match serde_json::from_value::<CurrentlyPlayingResponse>(payload) {
                    Ok(current) => match current.track() {
                        Some(track) => PlaybackSnapshot::Playing {
                            track,
                            is_playing: current.is_playing,
                        },
                        None => self.check_device().await,
                    },
                    Err(e) => PlaybackSnapshot::Error {
                        message: format!("Unrecognised playback payload: {e}"),
                    },
                }
            }
        }
    }

    /// Distinguishes "nothing playing" from "no device at all".
    async fn check_device(&self) -> PlaybackSnapshot {
        match self.player.player_state().await {
            Outcome::Data { payload, .. } if !payload.is_null() => PlaybackSnapshot::Idle,
            Outcome::Error { status: 401, .. } => self.unauthorized().await,
            _ => PlaybackSnapshot::NoDevice,
        }
    }

    async fn unauthorized(&self) -> PlaybackSnapshot {
        self.tokens.invalidate().await;
        PlaybackSnapshot::Unauthorized
    }

    /// Starts the loop; the first poll happens immediately.
    pub fn spawn(self) -> PollerHandle {
        let (tx, rx) = mpsc::channel(32);
        let task = tokio::spawn(self.run(rx));
        PollerHandle { commands: tx, task }
    }

    async fn run(self, mut commands: mpsc::Receiver<PollerCommand>) {
        let mut events = self.events.subscribe();
        let mut visible = true;
        let mut last_kind: Option<SnapshotKind> = None;
        let mut streak = 0u32;
        let mut next_tick = Some(Instant::now());
        let mut debounced: Option<Instant> = None;

        info!("playback poller started");
        loop {
            let wake = match (next_tick, debounced) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };

            tokio::select! {
                _ = sleep_until_opt(wake) => {
                    debounced = None;
                    let snapshot = self.poll_once().await;
                    let kind = snapshot.kind();
                    streak = if last_kind == Some(kind) { streak.saturating_add(1) } else { 0 };
                    last_kind = Some(kind);
                    self.events.emit(CoreEvent::Playback(snapshot));

                    next_tick = next_interval(kind, visible, streak).map(|d| Instant::now() + d);
                    match next_tick {
                        Some(at) => debug!(?kind, delay_ms = at.saturating_duration_since(Instant::now()).as_millis() as u64, "next poll armed"),
                        None => info!("polling halted until authorization succeeds"),
                    }
                }
                command = commands.recv() => match command {
                    Some(PollerCommand::RefreshSoon) => {
                        if next_tick.is_some() {
                            debounced = Some(Instant::now() + self.debounce);
                        }
                    }
                    Some(PollerCommand::SetVisible(now_visible)) => {
                        if now_visible && !visible && next_tick.is_some() {
                            debounced = Some(Instant::now() + self.debounce);
                        }
                        visible = now_visible;
                    }
                    Some(PollerCommand::Stop) | None => break,
                },
                event = events.recv() => match event {
                    Ok(CoreEvent::AuthSucceeded) => {
                        info!("authorization succeeded, resuming polling");
                        last_kind = None;
                        streak = 0;
                        debounced = None;
                        next_tick = Some(Instant::now());
                    }
                    Ok(CoreEvent::AuthRequired) => {
                        next_tick = None;
                        debounced = None;
                    }
                    Ok(CoreEvent::Playback(_)) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "poller fell behind on core events");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        info!("playback poller stopped");
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
