use tabled::Table;

use crate::{
    Res,
    app::App,
    error, info, success,
    spotify::player::PlayerCommand,
    types::{PlaybackSnapshot, TrackTableRow},
    utils, warning,
};

pub async fn now(app: &App) {
    let snapshot = app.poller().poll_once().await;
    print_snapshot(&snapshot);

    if let PlaybackSnapshot::Playing { track, .. } = &snapshot {
        let row = TrackTableRow {
            title: track.title.clone(),
            artists: track.artists.clone(),
            album: track.album.clone().unwrap_or_default(),
            progress: format!(
                "{} / {}",
                utils::format_duration_ms(track.progress_ms.unwrap_or(0)),
                utils::format_duration_ms(track.duration_ms)
            ),
        };
        println!("{}", Table::new(vec![row]));
    }
}

pub async fn play_pause(app: &App) {
    match app.player.toggle_play_pause().await {
        Ok(PlayerCommand::Pause) => success!("Paused."),
        Ok(_) => success!("Playing."),
        Err(e) => error!("{}", e),
    }
}

pub async fn next(app: &App) {
    report(app.player.next().await, "Skipped to next track.");
}

pub async fn prev(app: &App) {
    report(app.player.previous().await, "Back to previous track.");
}

pub async fn like(app: &App) {
    match like_current(app).await {
        Ok(Some(true)) => success!("Saved to your library."),
        Ok(Some(false)) => success!("Removed from your library."),
        Ok(None) => warning!("Nothing is playing."),
        Err(e) => error!("{}", e),
    }
}

/// Toggles the liked state of whatever is playing right now.
pub(crate) async fn like_current(app: &App) -> Res<Option<bool>> {
    let snapshot = app.poller().poll_once().await;
    let PlaybackSnapshot::Playing { track, .. } = snapshot else {
        return Ok(None);
    };
    let Some(id) = track.id else {
        return Ok(None);
    };
    app.player.toggle_like(&id).await.map(Some)
}

fn report(result: Res<()>, done: &str) {
    match result {
        Ok(()) => success!("{}", done),
        Err(e) => error!("{}", e),
    }
}

pub(crate) fn print_snapshot(snapshot: &PlaybackSnapshot) {
    match snapshot {
        PlaybackSnapshot::Unauthorized => {
            warning!("Not connected to Spotify. Run `spotbar auth` to log in.")
        }
        PlaybackSnapshot::Playing { track, is_playing } => {
            let icon = if *is_playing { "▶" } else { "⏸" };
            info!("{} {} - {}", icon, track.title, track.artists);
        }
        PlaybackSnapshot::Idle => info!("Playback is paused or stopped."),
        PlaybackSnapshot::NoDevice => {
            warning!("No active Spotify device found. Start playing music on any device.")
        }
        PlaybackSnapshot::Error { message } => warning!("{}", message),
    }
}
