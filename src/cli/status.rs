use tabled::Table;

use crate::{app::App, types::TokenStatusRow, utils, warning};

pub async fn status(app: &App) {
    let Some(tokens) = app.tokens.current().await else {
        warning!("Not connected to Spotify. Run `spotbar auth` to log in.");
        return;
    };

    let now = utils::now_secs();
    let state = if tokens.needs_refresh(now) {
        "expired, refreshes on next call"
    } else {
        "valid"
    };

    let rows = vec![
        row("Credentials", app.tokens.store().path().display().to_string()),
        row("Access token", state.to_string()),
        row("Obtained", utils::format_epoch(tokens.obtained_at)),
        row("Refresh due", utils::format_epoch(tokens.refresh_due_at())),
        row(
            "Refresh token",
            if tokens.refresh_token.is_some() { "present" } else { "absent" }.to_string(),
        ),
        row("Token type", tokens.token_type.clone()),
        row("Scope", tokens.scope.replace(' ', "\n")),
    ];
    println!("{}", Table::new(rows));
}

fn row(field: &str, value: String) -> TokenStatusRow {
    TokenStatusRow {
        field: field.to_string(),
        value,
    }
}
