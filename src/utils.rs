use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{TimeZone, Utc};
use rand::{Rng, distr::Alphanumeric};
use reqwest::Url;
use sha2::{Digest, Sha256};

use crate::{Res, config::Config, error::Error, types::PkceSession};

pub fn generate_code_verifier() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(128)
        .map(char::from)
        .collect()
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

pub fn new_pkce_session() -> PkceSession {
    let code_verifier = generate_code_verifier();
    let code_challenge = generate_code_challenge(&code_verifier);
    PkceSession {
        code_verifier,
        code_challenge,
    }
}

/// Provider authorize URL carrying the PKCE challenge.
pub fn build_authorize_url(config: &Config, code_challenge: &str) -> Res<Url> {
    Url::parse_with_params(
        &config.auth_url,
        &[
            ("response_type", "code"),
            ("client_id", config.client_id.as_str()),
            ("scope", config.scope.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("code_challenge_method", "S256"),
            ("code_challenge", code_challenge),
        ],
    )
    .map_err(|e| Error::Config(format!("invalid authorization url: {e}")))
}

pub fn now_secs() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

/// Formats epoch seconds as a local-agnostic UTC timestamp.
pub fn format_epoch(secs: u64) -> String {
    Utc.timestamp_opt(secs as i64, 0)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}

/// `m:ss` rendering of a millisecond duration.
pub fn format_duration_ms(ms: u64) -> String {
    let total = ms / 1000;
    format!("{}:{:02}", total / 60, total % 60)
}
