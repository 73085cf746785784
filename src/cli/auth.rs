use crate::{app::App, error, info, success};

use super::spinner;

pub async fn auth(app: &App) {
    let handle = match app.authorizer.begin().await {
        Ok(handle) => handle,
        Err(e) => error!("Cannot start authorization: {}", e),
    };

    info!(
        "Authorize spotbar in your browser. If no window opened, visit:\n{}",
        handle.authorize_url()
    );

    let pb = spinner("Waiting for the Spotify callback...");
    let result = handle.wait().await;
    pb.finish_and_clear();

    match result {
        Ok(_) => success!("Authentication successful!"),
        Err(e) => error!("Authentication failed: {}", e),
    }
}

pub async fn logout(app: &App) {
    match app.tokens.logout().await {
        Ok(()) => success!("Logged out. Stored credentials removed."),
        Err(e) => error!("Failed to remove stored credentials: {}", e),
    }
}
