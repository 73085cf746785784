use std::sync::Arc;

use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    Res,
    config::Config,
    error::Error,
    events::{CoreEvent, EventBus},
    management::CredentialStore,
    spotify, types::TokenSet, utils,
};

/// Sole owner of the process-wide [`TokenSet`].
///
/// Every other component asks this manager for an access token; nothing else
/// reads or writes the credential file. The held token sits behind an async
/// mutex that stays locked while a refresh is in flight, so concurrent callers
/// wait for that one refresh instead of issuing their own.
pub struct TokenManager {
    config: Arc<Config>,
    http: Client,
    store: CredentialStore,
    events: EventBus,
    current: Mutex<Option<TokenSet>>,
}

impl TokenManager {
    pub fn new(config: Arc<Config>, http: Client, store: CredentialStore, events: EventBus) -> Self {
        TokenManager {
            config,
            http,
            store,
            events,
            current: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Returns a usable access token, refreshing it first when it is within
    /// the expiry skew.
    pub async fn ensure_access_token(&self) -> Res<String> {
        let mut current = self.current.lock().await;
        if current.is_none() {
            *current = self.load_stored().await;
        }

        let Some(tokens) = current.as_ref() else {
            return Err(Error::Unauthorized);
        };

        if !tokens.needs_refresh(utils::now_secs()) {
            return Ok(tokens.access_token.clone());
        }

        let Some(refresh_token) = tokens.refresh_token.clone() else {
            warn!("access token expired and no refresh token is held");
            self.drop_credentials(&mut current).await;
            return Err(Error::Unauthorized);
        };

        info!("access token expired or about to expire, refreshing");
        match spotify::auth::refresh_tokens(&self.http, &self.config, &refresh_token).await {
            Ok(response) => {
                let refreshed = response.into_token_set(utils::now_secs(), Some(refresh_token));
                if let Err(e) = self.store.save(&refreshed).await {
                    warn!("refreshed tokens could not be persisted: {}", e);
                }
                let access_token = refreshed.access_token.clone();
                *current = Some(refreshed);
                debug!("tokens refreshed");
                Ok(access_token)
            }
            Err(e) => {
                error!("token refresh failed, re-authorization required: {}", e);
                self.drop_credentials(&mut current).await;
                Err(Error::Unauthorized)
            }
        }
    }

    /// Persists and holds tokens obtained from a code exchange.
    pub async fn install(&self, tokens: TokenSet) -> Res<()> {
        let mut current = self.current.lock().await;
        self.store.save(&tokens).await?;
        *current = Some(tokens);
        Ok(())
    }

    /// Drops credentials after the provider rejected them.
    ///
    /// Emits [`CoreEvent::AuthRequired`] only when a held token was actually
    /// dropped, so a refresh failure that already signalled is not repeated.
    pub async fn invalidate(&self) -> bool {
        let mut current = self.current.lock().await;
        if current.is_none() {
            if let Err(e) = self.store.clear().await {
                warn!("failed to clear stored credentials: {}", e);
            }
            return false;
        }
        self.drop_credentials(&mut current).await;
        true
    }

    /// Local logout; there is no remote revocation.
    pub async fn logout(&self) -> Res<()> {
        let mut current = self.current.lock().await;
        *current = None;
        let cleared = self.store.clear().await;
        self.events.emit(CoreEvent::AuthRequired);
        cleared
    }

    /// The held token set, loading it from storage on first use.
    pub async fn current(&self) -> Option<TokenSet> {
        let mut current = self.current.lock().await;
        if current.is_none() {
            *current = self.load_stored().await;
        }
        current.clone()
    }

    async fn load_stored(&self) -> Option<TokenSet> {
        match self.store.load().await {
            Ok(tokens) => tokens,
            Err(Error::Decryption(reason)) => {
                warn!(path = %self.store.path().display(), "stored credentials are unreadable ({}); treating as signed out", reason);
                None
            }
            Err(e) => {
                warn!(path = %self.store.path().display(), "stored credentials could not be loaded ({}); treating as signed out", e);
                None
            }
        }
    }

    async fn drop_credentials(&self, current: &mut Option<TokenSet>) {
        *current = None;
        if let Err(e) = self.store.clear().await {
            warn!("failed to clear stored credentials: {}", e);
        }
        self.events.emit(CoreEvent::AuthRequired);
    }
}
