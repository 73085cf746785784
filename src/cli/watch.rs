use std::sync::Arc;

use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};

use crate::{
    Res,
    app::App,
    events::CoreEvent,
    info, success,
    types::PlaybackSnapshot,
    warning,
};

use super::player::print_snapshot;

const HELP: &str = "commands: p play/pause, n next, b previous, l like, h hide/show, login, logout, q quit";

/// Runs the poll loop and renders snapshots until `q` or end of input.
pub async fn watch(app: &App) {
    let mut events = app.events.subscribe();
    let poller = app.start_poller();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last: Option<PlaybackSnapshot> = None;
    let mut visible = true;

    info!("{}", HELP);
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(CoreEvent::Playback(snapshot)) => {
                    if last.as_ref() != Some(&snapshot) {
                        print_snapshot(&snapshot);
                    }
                    last = Some(snapshot);
                }
                Ok(CoreEvent::AuthRequired) => {
                    warning!("Authorization required. Type `login` to connect.")
                }
                Ok(CoreEvent::AuthSucceeded) => success!("Connected to Spotify."),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line() => {
                let command = match line {
                    Ok(Some(line)) => line.trim().to_lowercase(),
                    Ok(None) | Err(_) => break,
                };
                match command.as_str() {
                    "" => {}
                    "q" | "quit" => break,
                    "h" | "hide" => {
                        visible = !visible;
                        poller.set_visible(visible);
                        info!("{}", if visible { "Visible: polling at full rate." } else { "Hidden: polling slowed down." });
                    }
                    "login" => spawn_login(app),
                    "logout" => {
                        if let Err(e) = app.tokens.logout().await {
                            warning!("Failed to remove stored credentials: {}", e);
                        }
                    }
                    other => match run_control(app, other, last.as_ref()).await {
                        Ok(true) => poller.refresh_soon(),
                        Ok(false) => info!("{}", HELP),
                        Err(e) => warning!("{}", e),
                    },
                }
            }
        }
    }

    poller.stop().await;
}

/// Returns `Ok(false)` for unknown input.
async fn run_control(app: &App, command: &str, last: Option<&PlaybackSnapshot>) -> Res<bool> {
    match command {
        "p" | "play" | "pause" => app.player.toggle_play_pause().await.map(|_| true),
        "n" | "next" => app.player.next().await.map(|_| true),
        "b" | "prev" => app.player.previous().await.map(|_| true),
        "l" | "like" => {
            let id = match last {
                Some(PlaybackSnapshot::Playing { track, .. }) => track.id.clone(),
                _ => None,
            };
            match id {
                Some(id) => {
                    let liked = app.player.toggle_like(&id).await?;
                    success!("{}", if liked { "Saved to your library." } else { "Removed from your library." });
                    Ok(true)
                }
                None => {
                    warning!("Nothing is playing.");
                    Ok(true)
                }
            }
        }
        _ => Ok(false),
    }
}

fn spawn_login(app: &App) {
    let authorizer = Arc::clone(&app.authorizer);
    tokio::spawn(async move {
        match authorizer.begin().await {
            Ok(handle) => {
                info!("Authorize in your browser, or visit:\n{}", handle.authorize_url());
                if let Err(e) = handle.wait().await {
                    warning!("Authentication failed: {}", e);
                }
            }
            Err(e) => warning!("Cannot start authorization: {}", e),
        }
    });
}
