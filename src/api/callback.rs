use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
};
use reqwest::Client;
use tokio::sync::{oneshot, watch};
use tracing::{info, warn};

use crate::{
    Res,
    config::Config,
    error::Error,
    events::{CoreEvent, EventBus},
    management::TokenManager,
    spotify,
    types::{AuthState, TokenSet},
};

const SUCCESS_PAGE: &str = "<html><body><h1>Success!</h1><p>You are authenticated. You can close this window now.</p><script>window.close();</script></body></html>";
const MISSING_CODE_PAGE: &str = "<html><body><h1>Error</h1><p>Authorization code not found.</p></body></html>";
const EXCHANGE_FAILED_PAGE: &str = "<html><body><h1>Error</h1><p>Failed to get authentication token.</p></body></html>";
const ALREADY_HANDLED_PAGE: &str = "<html><body><h1>Error</h1><p>This authorization request was already handled. Start a new login from the app.</p></body></html>";

/// Everything the one-shot callback handler needs for its flow.
pub struct CallbackContext {
    code_verifier: String,
    config: Arc<Config>,
    http: Client,
    tokens: Arc<TokenManager>,
    events: EventBus,
    state: Arc<watch::Sender<AuthState>>,
    done: Mutex<Option<oneshot::Sender<Res<TokenSet>>>>,
}

impl CallbackContext {
    pub fn new(
        code_verifier: String,
        config: Arc<Config>,
        http: Client,
        tokens: Arc<TokenManager>,
        events: EventBus,
        state: Arc<watch::Sender<AuthState>>,
        done: oneshot::Sender<Res<TokenSet>>,
    ) -> Self {
        Self {
            code_verifier,
            config,
            http,
            tokens,
            events,
            state,
            done: Mutex::new(Some(done)),
        }
    }

    /// The first caller wins; later callbacks find nothing to complete.
    fn claim(&self) -> Option<oneshot::Sender<Res<TokenSet>>> {
        self.done.lock().ok().and_then(|mut done| done.take())
    }

    /// Closes the flow to callbacks. Returns `false` when a callback already
    /// claimed it; that callback's result then ends the flow.
    pub fn abandon(&self) -> bool {
        self.claim().is_some()
    }

    fn fail(&self, done: oneshot::Sender<Res<TokenSet>>, err: Error) {
        self.state.send_replace(AuthState::Failed);
        let _ = done.send(Err(err));
    }
}

pub async fn callback(
    State(ctx): State<Arc<CallbackContext>>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Html<&'static str>) {
    let Some(done) = ctx.claim() else {
        return (StatusCode::GONE, Html(ALREADY_HANDLED_PAGE));
    };

    let Some(code) = params.get("code").filter(|c| !c.is_empty()) else {
        let reason = params
            .get("error")
            .map(|e| format!("provider returned error {e:?}"))
            .unwrap_or_else(|| "callback carried no authorization code".to_string());
        warn!("{}", reason);
        ctx.fail(done, Error::AuthorizationAbandoned(reason));
        return (StatusCode::BAD_REQUEST, Html(MISSING_CODE_PAGE));
    };

    ctx.state.send_replace(AuthState::Exchanging);
    let tokens =
        match spotify::auth::exchange_code(&ctx.http, &ctx.config, code, &ctx.code_verifier).await
        {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("token exchange failed: {}", e);
                ctx.fail(done, e);
                return (StatusCode::INTERNAL_SERVER_ERROR, Html(EXCHANGE_FAILED_PAGE));
            }
        };

    if let Err(e) = ctx.tokens.install(tokens.clone()).await {
        warn!("exchanged tokens could not be persisted: {}", e);
        ctx.fail(done, e);
        return (StatusCode::INTERNAL_SERVER_ERROR, Html(EXCHANGE_FAILED_PAGE));
    }

    info!("authorization complete");
    ctx.state.send_replace(AuthState::Complete);
    ctx.events.emit(CoreEvent::AuthSucceeded);
    let _ = done.send(Ok(tokens));
    (StatusCode::OK, Html(SUCCESS_PAGE))
}
