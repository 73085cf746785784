use std::{net::SocketAddr, sync::Arc};

use reqwest::{Client, Url};
use serde_json::Value;
use tokio::{
    net::TcpListener,
    sync::{oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{
    Res,
    api::CallbackContext,
    config::Config,
    error::Error,
    events::EventBus,
    management::TokenManager,
    server,
    types::{AuthState, TokenResponse, TokenSet},
    utils,
};

/// Drives the browser-based PKCE handshake.
///
/// At most one flow is pending at a time. Each [`Authorizer::begin`] binds a
/// fresh callback listener that serves exactly one `/callback` request and is
/// closed on every exit path: served callback, timeout, replacement by a newer
/// flow, or the authorizer being dropped.
pub struct Authorizer {
    config: Arc<Config>,
    http: Client,
    tokens: Arc<TokenManager>,
    events: EventBus,
    state: Arc<watch::Sender<AuthState>>,
    pending: tokio::sync::Mutex<Option<PendingFlow>>,
}

struct PendingFlow {
    cancel: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Handle on one authorization attempt.
pub struct AuthorizationHandle {
    authorize_url: Url,
    local_addr: SocketAddr,
    result: oneshot::Receiver<Res<TokenSet>>,
}

impl AuthorizationHandle {
    /// URL the user has to visit; already opened when the browser launch worked.
    pub fn authorize_url(&self) -> &Url {
        &self.authorize_url
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Resolves once the listener has been closed.
    pub async fn wait(self) -> Res<TokenSet> {
        self.result.await.unwrap_or_else(|_| {
            Err(Error::AuthorizationAbandoned(
                "authorization flow ended unexpectedly".to_string(),
            ))
        })
    }
}

impl Authorizer {
    pub fn new(
        config: Arc<Config>,
        http: Client,
        tokens: Arc<TokenManager>,
        events: EventBus,
    ) -> Self {
        let (state, _) = watch::channel(AuthState::Idle);
        Authorizer {
            config,
            http,
            tokens,
            events,
            state: Arc::new(state),
            pending: tokio::sync::Mutex::new(None),
        }
    }

    pub fn state(&self) -> AuthState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Starts a new authorization attempt, replacing any pending one.
    pub async fn begin(&self) -> Res<AuthorizationHandle> {
        let mut pending = self.pending.lock().await;
        if let Some(previous) = pending.take() {
            info!("replacing pending authorization attempt");
            let _ = previous.cancel.send(());
            if let Err(e) = previous.task.await {
                warn!("previous authorization task ended abnormally: {}", e);
            }
        }

        let pkce = utils::new_pkce_session();
        let authorize_url = utils::build_authorize_url(&self.config, &pkce.code_challenge)?;

        let listener = match TcpListener::bind(&self.config.server_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("cannot bind callback listener on {}: {}", self.config.server_addr, e);
                self.state.send_replace(AuthState::Failed);
                return Err(e.into());
            }
        };
        let local_addr = listener.local_addr()?;

        let (done_tx, done_rx) = oneshot::channel();
        let context = Arc::new(CallbackContext::new(
            pkce.code_verifier,
            Arc::clone(&self.config),
            self.http.clone(),
            Arc::clone(&self.tokens),
            self.events.clone(),
            Arc::clone(&self.state),
            done_tx,
        ));

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (result_tx, result_rx) = oneshot::channel();
        self.state.send_replace(AuthState::AwaitingCallback);

        let task = tokio::spawn(run_flow(
            listener,
            context,
            done_rx,
            cancel_rx,
            result_tx,
            Arc::clone(&self.state),
            self.config.auth_timeout,
        ));
        *pending = Some(PendingFlow {
            cancel: cancel_tx,
            task,
        });
        drop(pending);

        info!(addr = %local_addr, "waiting for authorization callback");
        self.open_browser(&authorize_url);

        Ok(AuthorizationHandle {
            authorize_url,
            local_addr,
            result: result_rx,
        })
    }

    fn open_browser(&self, url: &Url) {
        if !self.config.open_browser {
            info!("browser launch disabled, authorize at {}", url);
            return;
        }
        if let Err(e) = webbrowser::open(url.as_str()) {
            warn!("failed to open browser ({}), authorize at {}", e, url);
        }
    }
}

async fn run_flow(
    listener: TcpListener,
    context: Arc<CallbackContext>,
    mut done: oneshot::Receiver<Res<TokenSet>>,
    cancel: oneshot::Receiver<()>,
    result: oneshot::Sender<Res<TokenSet>>,
    state: Arc<watch::Sender<AuthState>>,
    timeout: std::time::Duration,
) {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let server = tokio::spawn(server::serve_callback(
        listener,
        Arc::clone(&context),
        shutdown_rx,
    ));

    let outcome = tokio::select! {
        biased;
        served = &mut done => handler_result(served),
        _ = cancel => {
            abandon_or_finish(&context, &mut done, "superseded by a newer authorization attempt".to_string()).await
        }
        _ = tokio::time::sleep(timeout) => {
            abandon_or_finish(&context, &mut done, format!("no callback received within {timeout:?}")).await
        }
    };

    let _ = shutdown_tx.send(());
    match server.await {
        Ok(Ok(())) => debug!("callback listener closed"),
        Ok(Err(e)) => warn!("callback listener failed: {}", e),
        Err(e) => warn!("callback listener task panicked: {}", e),
    }

    if let Err(e) = &outcome {
        warn!("authorization attempt failed: {}", e);
        state.send_replace(AuthState::Failed);
    }
    let _ = result.send(outcome);
}

/// A callback that claimed the flow before the cancel or timeout keeps it.
async fn abandon_or_finish(
    context: &CallbackContext,
    done: &mut oneshot::Receiver<Res<TokenSet>>,
    reason: String,
) -> Res<TokenSet> {
    if context.abandon() {
        return Err(Error::AuthorizationAbandoned(reason));
    }
    debug!("callback already claimed the flow, waiting for the code exchange");
    handler_result(done.await)
}

fn handler_result(served: Result<Res<TokenSet>, oneshot::error::RecvError>) -> Res<TokenSet> {
    served.unwrap_or_else(|_| {
        Err(Error::AuthorizationAbandoned(
            "callback handler went away".to_string(),
        ))
    })
}

/// Authorization-code grant with the PKCE verifier.
pub async fn exchange_code(
    http: &Client,
    config: &Config,
    code: &str,
    verifier: &str,
) -> Res<TokenSet> {
    let response = token_request(
        http,
        config,
        &[
            ("client_id", config.client_id.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("code_verifier", verifier),
        ],
    )
    .await?;

    Ok(response.into_token_set(utils::now_secs(), None))
}

/// Refresh-token grant. The caller merges the prior refresh token.
pub async fn refresh_tokens(
    http: &Client,
    config: &Config,
    refresh_token: &str,
) -> Res<TokenResponse> {
    token_request(
        http,
        config,
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", config.client_id.as_str()),
        ],
    )
    .await
}

async fn token_request(
    http: &Client,
    config: &Config,
    form: &[(&str, &str)],
) -> Res<TokenResponse> {
    let response = http.post(&config.token_url).form(form).send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|json| {
                json["error_description"]
                    .as_str()
                    .or_else(|| json["error"].as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("token request failed").to_string());
        return Err(Error::Provider {
            status: status.as_u16(),
            message,
        });
    }

    Ok(response.json::<TokenResponse>().await?)
}
