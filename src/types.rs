use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabled::Tabled;

/// Seconds subtracted from the provider's expiry to refresh proactively.
pub const TOKEN_SKEW_SECS: u64 = 30;

/// The one persisted entity: the current OAuth token set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: u64,
    pub obtained_at: u64,
    pub token_type: String,
    pub scope: String,
}

impl TokenSet {
    /// Epoch second after which the access token must not be used.
    pub fn refresh_due_at(&self) -> u64 {
        self.obtained_at
            .saturating_add(self.expires_in)
            .saturating_sub(TOKEN_SKEW_SECS)
    }

    pub fn needs_refresh(&self, now: u64) -> bool {
        now >= self.refresh_due_at()
    }
}

/// Token endpoint response body, for both grant types.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Stamps `obtained_at` and keeps `prior_refresh` when the provider did
    /// not rotate the refresh token.
    pub fn into_token_set(self, obtained_at: u64, prior_refresh: Option<String>) -> TokenSet {
        TokenSet {
            access_token: self.access_token,
            refresh_token: self
                .refresh_token
                .filter(|t| !t.is_empty())
                .or(prior_refresh),
            expires_in: self.expires_in,
            obtained_at,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            scope: self.scope.unwrap_or_default(),
        }
    }
}

/// Ephemeral PKCE material for one authorization attempt.
#[derive(Debug, Clone)]
pub struct PkceSession {
    pub code_verifier: String,
    pub code_challenge: String,
}

/// Progress of the authorization handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Idle,
    AwaitingCallback,
    Exchanging,
    Complete,
    Failed,
}

/// Result of one call through the gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Data { payload: Value, status: u16 },
    NoContent,
    Error { status: u16, message: String },
}

impl Outcome {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Outcome::Error { status: 401, .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Track {
    pub id: Option<String>,
    pub title: String,
    pub artists: String,
    pub album: Option<String>,
    pub album_art_url: Option<String>,
    pub duration_ms: u64,
    pub progress_ms: Option<u64>,
}

/// Point-in-time classification of remote playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum PlaybackSnapshot {
    Unauthorized,
    Playing { track: Track, is_playing: bool },
    Idle,
    NoDevice,
    Error { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotKind {
    Unauthorized,
    Playing,
    Paused,
    Idle,
    NoDevice,
    Error,
}

impl PlaybackSnapshot {
    pub fn kind(&self) -> SnapshotKind {
        match self {
            PlaybackSnapshot::Unauthorized => SnapshotKind::Unauthorized,
            PlaybackSnapshot::Playing {
                is_playing: true, ..
            } => SnapshotKind::Playing,
            PlaybackSnapshot::Playing { .. } => SnapshotKind::Paused,
            PlaybackSnapshot::Idle => SnapshotKind::Idle,
            PlaybackSnapshot::NoDevice => SnapshotKind::NoDevice,
            PlaybackSnapshot::Error { .. } => SnapshotKind::Error,
        }
    }
}

/// `GET /me/player/currently-playing` body.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentlyPlayingResponse {
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub progress_ms: Option<u64>,
    #[serde(default)]
    pub item: Option<PlayableItem>,
}

/// A track, or an episode (which has a show instead of artists/album).
#[derive(Debug, Clone, Deserialize)]
pub struct PlayableItem {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub album: Option<AlbumRef>,
    #[serde(default)]
    pub show: Option<ShowRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumRef {
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShowRef {
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub url: String,
}

impl CurrentlyPlayingResponse {
    pub fn track(&self) -> Option<Track> {
        let item = self.item.as_ref()?;
        let artists = if item.artists.is_empty() {
            item.show.as_ref().map(|s| s.name.clone()).unwrap_or_default()
        } else {
            item.artists
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        let images = item
            .album
            .as_ref()
            .map(|a| &a.images)
            .or_else(|| item.show.as_ref().map(|s| &s.images));

        Some(Track {
            id: item.id.clone(),
            title: item.name.clone(),
            artists,
            album: item.album.as_ref().map(|a| a.name.clone()),
            album_art_url: images.and_then(|i| i.first()).map(|i| i.url.clone()),
            duration_ms: item.duration_ms,
            progress_ms: self.progress_ms,
        })
    }
}

#[derive(Tabled)]
pub struct TokenStatusRow {
    pub field: String,
    pub value: String,
}

#[derive(Tabled)]
pub struct TrackTableRow {
    pub title: String,
    pub artists: String,
    pub album: String,
    pub progress: String,
}
