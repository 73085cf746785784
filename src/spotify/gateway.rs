use std::sync::Arc;

use reqwest::{Client, Method, StatusCode, header::CONTENT_LENGTH};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{management::TokenManager, types::Outcome};

/// Single entry point for Web API calls.
///
/// Attaches the bearer token, normalizes every failure into an
/// [`Outcome::Error`] and is the one place where authorization failures are
/// classified (status 401). It never mutates credentials itself; callers react
/// to a 401 through [`TokenManager::invalidate`].
pub struct Gateway {
    http: Client,
    base_url: String,
    tokens: Arc<TokenManager>,
}

impl Gateway {
    pub fn new(http: Client, base_url: impl Into<String>, tokens: Arc<TokenManager>) -> Self {
        Gateway {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    pub async fn get(&self, endpoint: &str) -> Outcome {
        self.call(endpoint, Method::GET, None).await
    }

    pub async fn call(&self, endpoint: &str, method: Method, body: Option<&Value>) -> Outcome {
        let token = match self.tokens.ensure_access_token().await {
            Ok(token) => token,
            Err(_) => {
                debug!(endpoint, "no access token available, skipping request");
                return Outcome::Error {
                    status: 401,
                    message: "Not authorized".to_string(),
                };
            }
        };

        let url = format!("{}{}", self.base_url, endpoint);
        let mut request = self.http.request(method.clone(), &url).bearer_auth(token);
        match body {
            Some(body) => request = request.json(body),
            None if method != Method::GET => request = request.header(CONTENT_LENGTH, 0),
            None => {}
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(%method, endpoint, "request failed: {}", e);
                return Outcome::Error {
                    status: 0,
                    message: network_message(&e),
                };
            }
        };

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Outcome::NoContent;
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(%method, endpoint, "reading response body failed: {}", e);
                return Outcome::Error {
                    status: 0,
                    message: network_message(&e),
                };
            }
        };

        if !status.is_success() {
            let message = provider_message(&bytes).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown API error")
                    .to_string()
            });
            debug!(%method, endpoint, status = status.as_u16(), "provider error: {}", message);
            return Outcome::Error {
                status: status.as_u16(),
                message,
            };
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Outcome::Data {
                payload: Value::Null,
                status: status.as_u16(),
            };
        }

        match serde_json::from_slice(&bytes) {
            Ok(payload) => Outcome::Data {
                payload,
                status: status.as_u16(),
            },
            Err(e) => Outcome::Error {
                status: status.as_u16(),
                message: format!("Malformed response body: {e}"),
            },
        }
    }
}

fn network_message(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "Network request timed out".to_string()
    } else {
        format!("Network request failed: {err}")
    }
}

/// Pulls the human-readable message out of the provider's error shapes.
fn provider_message(body: &[u8]) -> Option<String> {
    let json: Value = serde_json::from_slice(body).ok()?;
    json["error"]["message"]
        .as_str()
        .or_else(|| json["error_description"].as_str())
        .or_else(|| json["error"].as_str())
        .or_else(|| json["message"].as_str())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
