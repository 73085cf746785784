#![allow(dead_code)]

use std::{
    collections::HashMap,
    net::SocketAddr,
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Form, Json, Router,
    body::Bytes,
    extract::State,
    http::{
        HeaderMap, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::{Value, json};
use spotbar::{config::Config, events::CoreEvent, types::TokenSet, utils};
use tokio::{net::TcpListener, sync::broadcast};

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub json: Option<Value>,
    pub raw: Option<String>,
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            json: Some(body),
            raw: None,
        }
    }

    pub fn raw(status: u16, body: &str) -> Self {
        Self {
            status,
            json: None,
            raw: Some(body.to_string()),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            json: None,
            raw: None,
        }
    }

    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap();
        match (self.json, self.raw) {
            (Some(body), _) => (status, Json(body)).into_response(),
            (None, Some(raw)) => (status, raw).into_response(),
            (None, None) => status.into_response(),
        }
    }
}

impl Default for Reply {
    fn default() -> Self {
        Self::no_content()
    }
}

/// Recorded traffic and scripted answers of the fake provider.
#[derive(Default)]
pub struct FakeState {
    pub code_grants: AtomicUsize,
    pub refresh_grants: AtomicUsize,
    pub currently_playing_calls: AtomicUsize,
    pub player_calls: AtomicUsize,
    pub refresh_delay_ms: AtomicU64,
    pub code_delay_ms: AtomicU64,
    pub liked: AtomicBool,
    pub token_reply: Mutex<Reply>,
    pub refresh_reply: Mutex<Reply>,
    pub currently_playing: Mutex<Reply>,
    pub player: Mutex<Reply>,
    pub command_reply: Mutex<Reply>,
    pub library_reply: Mutex<Option<Reply>>,
    pub last_body: Mutex<Option<Value>>,
    pub last_content_type: Mutex<Option<String>>,
    pub commands: Mutex<Vec<String>>,
    pub bearers: Mutex<Vec<String>>,
    pub last_form: Mutex<HashMap<String, String>>,
}

impl FakeState {
    pub fn set_token_reply(&self, reply: Reply) {
        *self.token_reply.lock().unwrap() = reply;
    }

    pub fn set_refresh_reply(&self, reply: Reply) {
        *self.refresh_reply.lock().unwrap() = reply;
    }

    pub fn set_currently_playing(&self, reply: Reply) {
        *self.currently_playing.lock().unwrap() = reply;
    }

    pub fn set_player(&self, reply: Reply) {
        *self.player.lock().unwrap() = reply;
    }

    pub fn set_command_reply(&self, reply: Reply) {
        *self.command_reply.lock().unwrap() = reply;
    }

    pub fn set_library_reply(&self, reply: Reply) {
        *self.library_reply.lock().unwrap() = Some(reply);
    }

    pub fn last_body(&self) -> Option<Value> {
        self.last_body.lock().unwrap().clone()
    }

    pub fn last_content_type(&self) -> Option<String> {
        self.last_content_type.lock().unwrap().clone()
    }

    pub fn last_form(&self) -> HashMap<String, String> {
        self.last_form.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn bearers(&self) -> Vec<String> {
        self.bearers.lock().unwrap().clone()
    }

    fn record_bearer(&self, headers: &HeaderMap) {
        if let Some(token) = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
        {
            self.bearers.lock().unwrap().push(token.to_string());
        }
    }
}

pub struct FakeSpotify {
    pub addr: SocketAddr,
    pub state: Arc<FakeState>,
}

impl FakeSpotify {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());
        state.set_token_reply(Reply::json(200, token_body("A", Some("R"), 3600)));
        state.set_refresh_reply(Reply::json(200, token_body("A2", Some("R2"), 3600)));

        let app = Router::new()
            .route("/api/token", post(token))
            .route("/v1/me/player/currently-playing", get(currently_playing))
            .route("/v1/me/player", get(player))
            .route("/v1/me/player/play", put(command_play))
            .route("/v1/me/player/pause", put(command_pause))
            .route("/v1/me/player/next", post(command_next))
            .route("/v1/me/player/previous", post(command_previous))
            .route("/v1/me/tracks/contains", get(tracks_contains))
            .route("/v1/me/tracks", put(save_track).delete(remove_track))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    /// Configuration pointing every endpoint at this fake.
    pub fn config(&self, dir: &Path) -> Config {
        let mut config = Config::new("test-client");
        config.auth_url = format!("http://{}/authorize", self.addr);
        config.token_url = format!("http://{}/api/token", self.addr);
        config.api_url = format!("http://{}/v1", self.addr);
        config.token_path = dir.join("tokens.bin");
        config.server_addr = "127.0.0.1:0".to_string();
        config.redirect_uri = "http://127.0.0.1:0/callback".to_string();
        config.http_timeout = Duration::from_secs(5);
        config.open_browser = false;
        config
    }
}

pub fn token_body(access: &str, refresh: Option<&str>, expires_in: u64) -> Value {
    let mut body = json!({
        "access_token": access,
        "token_type": "Bearer",
        "scope": "user-read-playback-state",
        "expires_in": expires_in,
    });
    if let Some(refresh) = refresh {
        body["refresh_token"] = json!(refresh);
    }
    body
}

pub fn fresh_tokens(access: &str) -> TokenSet {
    TokenSet {
        access_token: access.to_string(),
        refresh_token: Some("R-old".to_string()),
        expires_in: 3600,
        obtained_at: utils::now_secs(),
        token_type: "Bearer".to_string(),
        scope: "user-read-playback-state".to_string(),
    }
}

pub fn expired_tokens(access: &str) -> TokenSet {
    TokenSet {
        obtained_at: utils::now_secs() - 7200,
        ..fresh_tokens(access)
    }
}

pub fn playing_body(is_playing: bool) -> Value {
    json!({
        "is_playing": is_playing,
        "progress_ms": 61_000,
        "item": {
            "id": "track-1",
            "name": "Teardrop",
            "duration_ms": 330_000,
            "artists": [{ "name": "Massive Attack" }, { "name": "Elizabeth Fraser" }],
            "album": {
                "name": "Mezzanine",
                "images": [{ "url": "https://i.scdn.co/image/large" }, { "url": "https://i.scdn.co/image/small" }]
            }
        }
    })
}

pub fn device_body() -> Value {
    json!({
        "is_playing": false,
        "device": { "id": "dev-1", "name": "Desk speaker", "is_active": true }
    })
}

/// Everything queued on a receiver right now.
pub fn drain(rx: &mut broadcast::Receiver<CoreEvent>) -> Vec<CoreEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn count(events: &[CoreEvent], wanted: &CoreEvent) -> usize {
    events.iter().filter(|e| *e == wanted).count()
}

async fn token(
    State(state): State<Arc<FakeState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let grant = form.get("grant_type").cloned().unwrap_or_default();
    *state.last_form.lock().unwrap() = form;

    if grant == "refresh_token" {
        state.refresh_grants.fetch_add(1, Ordering::SeqCst);
        let delay = state.refresh_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        state.refresh_reply.lock().unwrap().clone().into_response()
    } else {
        state.code_grants.fetch_add(1, Ordering::SeqCst);
        let delay = state.code_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        state.token_reply.lock().unwrap().clone().into_response()
    }
}

async fn currently_playing(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    state.record_bearer(&headers);
    state.currently_playing_calls.fetch_add(1, Ordering::SeqCst);
    state.currently_playing.lock().unwrap().clone().into_response()
}

async fn player(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    state.record_bearer(&headers);
    state.player_calls.fetch_add(1, Ordering::SeqCst);
    state.player.lock().unwrap().clone().into_response()
}

fn command(state: &FakeState, headers: &HeaderMap, name: &str) -> Response {
    state.record_bearer(headers);
    *state.last_content_type.lock().unwrap() = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.commands.lock().unwrap().push(name.to_string());
    state.command_reply.lock().unwrap().clone().into_response()
}

async fn command_play(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    *state.last_body.lock().unwrap() = serde_json::from_slice(&body).ok();
    command(&state, &headers, "play")
}

async fn command_pause(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    command(&state, &headers, "pause")
}

async fn command_next(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    command(&state, &headers, "next")
}

async fn command_previous(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    command(&state, &headers, "previous")
}

fn library_override(state: &FakeState) -> Option<Response> {
    state
        .library_reply
        .lock()
        .unwrap()
        .clone()
        .map(Reply::into_response)
}

async fn tracks_contains(State(state): State<Arc<FakeState>>) -> Response {
    if let Some(response) = library_override(&state) {
        return response;
    }
    Json(json!([state.liked.load(Ordering::SeqCst)])).into_response()
}

async fn save_track(State(state): State<Arc<FakeState>>) -> Response {
    if let Some(response) = library_override(&state) {
        return response;
    }
    state.liked.store(true, Ordering::SeqCst);
    StatusCode::OK.into_response()
}

async fn remove_track(State(state): State<Arc<FakeState>>) -> Response {
    state.liked.store(false, Ordering::SeqCst);
    StatusCode::OK.into_response()
}
