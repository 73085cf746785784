//! Configuration management for the spotbar core.
//!
//! Configuration values come from environment variables, optionally seeded
//! from a `.env` file in the local data directory. The system follows a
//! hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (everything but the client id has one)

use std::{env, path::PathBuf, time::Duration};

use reqwest::Client;

use crate::{Res, error::Error};

pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8888";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";
pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_SCOPE: &str = "user-read-currently-playing user-read-playback-state user-modify-playback-state user-library-read user-library-modify";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 300;

/// Loads environment variables from a `.env` file in the local data directory.
///
/// The file lives at `<data_local_dir>/spotbar/.env`:
/// - Linux: `~/.local/share/spotbar/.env`
/// - macOS: `~/Library/Application Support/spotbar/.env`
/// - Windows: `%LOCALAPPDATA%/spotbar/.env`
///
/// A missing file is not an error; variables may come from the process
/// environment alone.
pub async fn load_env() -> Res<()> {
    let mut path = app_dir();
    async_fs::create_dir_all(&path).await?;
    path.push(".env");

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| Error::Config(e.to_string()))?;
    }
    Ok(())
}

/// Per-user application directory (`<data_local_dir>/spotbar`).
pub fn app_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("spotbar");
    path
}

/// Runtime configuration of the core.
#[derive(Debug, Clone)]
pub struct Config {
    /// Public client id registered with the provider.
    pub client_id: String,
    /// Redirect URI registered with the provider; must point at `server_addr`.
    pub redirect_uri: String,
    /// Address the ephemeral callback listener binds to.
    pub server_addr: String,
    pub scope: String,
    pub auth_url: String,
    pub token_url: String,
    /// Base URL of the Web API, without a trailing slash.
    pub api_url: String,
    /// Location of the encrypted credential file.
    pub token_path: PathBuf,
    pub http_timeout: Duration,
    /// How long the callback listener waits for the browser.
    pub auth_timeout: Duration,
    /// Open the authorize URL in the default browser; otherwise only log it.
    pub open_browser: bool,
}

impl Config {
    /// Builds a configuration with every default except the client id.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            server_addr: DEFAULT_SERVER_ADDRESS.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            token_path: default_token_path(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            auth_timeout: Duration::from_secs(DEFAULT_AUTH_TIMEOUT_SECS),
            open_browser: true,
        }
    }

    /// Reads the configuration from the environment.
    ///
    /// Only `SPOTIFY_API_AUTH_CLIENT_ID` is required.
    pub fn from_env() -> Res<Self> {
        let client_id = env::var("SPOTIFY_API_AUTH_CLIENT_ID")
            .ok()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| Error::Config("SPOTIFY_API_AUTH_CLIENT_ID must be set".to_string()))?;

        let mut config = Self::new(client_id);
        config.redirect_uri = env_or("SPOTIFY_API_REDIRECT_URI", config.redirect_uri);
        config.server_addr = env_or("SERVER_ADDRESS", config.server_addr);
        config.scope = env_or("SPOTIFY_API_AUTH_SCOPE", config.scope);
        config.auth_url = env_or("SPOTIFY_API_AUTH_URL", config.auth_url);
        config.token_url = env_or("SPOTIFY_API_TOKEN_URL", config.token_url);
        config.api_url = env_or("SPOTIFY_API_URL", config.api_url)
            .trim_end_matches('/')
            .to_string();

        if let Ok(path) = env::var("SPOTBAR_TOKEN_PATH") {
            config.token_path = PathBuf::from(path);
        }
        config.http_timeout = env_secs("SPOTBAR_HTTP_TIMEOUT_SECS", config.http_timeout)?;
        config.auth_timeout = env_secs("SPOTBAR_AUTH_TIMEOUT_SECS", config.auth_timeout)?;
        if let Ok(flag) = env::var("SPOTBAR_OPEN_BROWSER") {
            config.open_browser = parse_flag(&flag)
                .ok_or_else(|| Error::Config(format!("SPOTBAR_OPEN_BROWSER: invalid flag {flag:?}")))?;
        }

        Ok(config)
    }

    /// The one HTTP client shared by every outbound call.
    pub fn http_client(&self) -> Res<Client> {
        Client::builder()
            .timeout(self.http_timeout)
            .build()
            .map_err(|e| Error::Config(format!("cannot build http client: {e}")))
    }
}

/// `<data_local_dir>/spotbar/cache/tokens.bin`
pub fn default_token_path() -> PathBuf {
    let mut path = app_dir();
    path.push("cache/tokens.bin");
    path
}

fn env_or(name: &str, default: String) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

fn env_secs(name: &str, default: Duration) -> Res<Duration> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| Error::Config(format!("{name}: {e}"))),
        Err(_) => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
