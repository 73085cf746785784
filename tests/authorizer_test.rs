mod common;

use std::{collections::HashMap, sync::atomic::Ordering, time::Duration};

use common::{FakeSpotify, Reply, count, drain};
use serde_json::json;
use spotbar::{app::App, error::Error, events::CoreEvent, types::AuthState, utils};

fn query(url: &reqwest::Url) -> HashMap<String, String> {
    url.query_pairs().into_owned().collect()
}

async fn listener_is_closed(addr: std::net::SocketAddr) -> bool {
    tokio::net::TcpStream::connect(addr).await.is_err()
}

#[tokio::test]
async fn test_fresh_login_stores_tokens_and_signals_once() {
    let fake = FakeSpotify::start().await;
    let dir = tempfile::tempdir().unwrap();
    let app = App::new(fake.config(dir.path())).unwrap();
    let mut events = app.events.subscribe();
    let state = app.authorizer.watch_state();
    assert_eq!(*state.borrow(), AuthState::Idle);

    let handle = app.authorizer.begin().await.unwrap();
    assert_eq!(app.authorizer.state(), AuthState::AwaitingCallback);
    let addr = handle.local_addr();
    let params = query(handle.authorize_url());

    let response = reqwest::get(format!("http://{addr}/callback?code=abc123"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().contains("Success!"));

    let tokens = handle.wait().await.unwrap();
    assert_eq!(tokens.access_token, "A");
    assert_eq!(tokens.refresh_token.as_deref(), Some("R"));
    assert!(tokens.obtained_at.abs_diff(utils::now_secs()) <= 5);

    // The exchange used this attempt's verifier
    let form = fake.state.last_form();
    assert_eq!(form["grant_type"], "authorization_code");
    assert_eq!(form["code"], "abc123");
    assert_eq!(form["client_id"], "test-client");
    assert_eq!(form["redirect_uri"], app.config.redirect_uri);
    assert_eq!(form["code_verifier"].len(), 128);
    assert_eq!(
        utils::generate_code_challenge(&form["code_verifier"]),
        params["code_challenge"]
    );
    assert_eq!(params["code_challenge_method"], "S256");

    let stored = app.tokens.store().load().await.unwrap().unwrap();
    assert_eq!(stored, tokens);
    assert_eq!(app.authorizer.state(), AuthState::Complete);
    assert_eq!(*state.borrow(), AuthState::Complete);
    assert_eq!(count(&drain(&mut events), &CoreEvent::AuthSucceeded), 1);
    assert!(listener_is_closed(addr).await);
}

#[tokio::test]
async fn test_callback_without_code_fails_without_exchange() {
    let fake = FakeSpotify::start().await;
    let dir = tempfile::tempdir().unwrap();
    let app = App::new(fake.config(dir.path())).unwrap();
    let mut events = app.events.subscribe();

    let handle = app.authorizer.begin().await.unwrap();
    let addr = handle.local_addr();

    let response = reqwest::get(format!("http://{addr}/callback?error=access_denied"))
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert!(
        response
            .text()
            .await
            .unwrap()
            .contains("Authorization code not found")
    );

    assert!(matches!(
        handle.wait().await,
        Err(Error::AuthorizationAbandoned(_))
    ));
    assert_eq!(fake.state.code_grants.load(Ordering::SeqCst), 0);
    assert_eq!(app.authorizer.state(), AuthState::Failed);
    assert!(app.tokens.store().load().await.unwrap().is_none());
    assert_eq!(count(&drain(&mut events), &CoreEvent::AuthSucceeded), 0);
    assert!(listener_is_closed(addr).await);
}

#[tokio::test]
async fn test_rejected_exchange_reports_provider_error() {
    let fake = FakeSpotify::start().await;
    fake.state.set_token_reply(Reply::json(
        400,
        json!({ "error": "invalid_grant", "error_description": "Invalid authorization code" }),
    ));
    let dir = tempfile::tempdir().unwrap();
    let app = App::new(fake.config(dir.path())).unwrap();

    let handle = app.authorizer.begin().await.unwrap();
    let addr = handle.local_addr();

    let response = reqwest::get(format!("http://{addr}/callback?code=stale"))
        .await
        .unwrap();
    assert_eq!(response.status(), 500);

    match handle.wait().await {
        Err(Error::Provider { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid authorization code");
        }
        other => panic!("expected provider error, got {other:?}"),
    }
    assert_eq!(fake.state.code_grants.load(Ordering::SeqCst), 1);
    assert_eq!(app.authorizer.state(), AuthState::Failed);
    assert!(app.tokens.store().load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_timeout_abandons_and_closes_listener() {
    let fake = FakeSpotify::start().await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = fake.config(dir.path());
    config.auth_timeout = Duration::from_millis(200);
    let app = App::new(config).unwrap();

    let handle = app.authorizer.begin().await.unwrap();
    let addr = handle.local_addr();

    match handle.wait().await {
        Err(Error::AuthorizationAbandoned(reason)) => assert!(reason.contains("200ms")),
        other => panic!("expected abandoned attempt, got {other:?}"),
    }
    assert_eq!(app.authorizer.state(), AuthState::Failed);
    assert!(listener_is_closed(addr).await);
}

#[tokio::test]
async fn test_new_attempt_replaces_pending_one() {
    let fake = FakeSpotify::start().await;
    let dir = tempfile::tempdir().unwrap();
    let app = App::new(fake.config(dir.path())).unwrap();

    let first = app.authorizer.begin().await.unwrap();
    let first_challenge = query(first.authorize_url())["code_challenge"].clone();

    let second = app.authorizer.begin().await.unwrap();
    let second_addr = second.local_addr();
    assert_ne!(query(second.authorize_url())["code_challenge"], first_challenge);

    assert!(matches!(
        first.wait().await,
        Err(Error::AuthorizationAbandoned(_))
    ));
    assert_eq!(app.authorizer.state(), AuthState::AwaitingCallback);

    let response = reqwest::get(format!("http://{second_addr}/callback?code=abc123"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(second.wait().await.is_ok());
    assert_eq!(app.authorizer.state(), AuthState::Complete);
}

#[tokio::test]
async fn test_slow_exchange_outlives_the_timeout() {
    let fake = FakeSpotify::start().await;
    fake.state.code_delay_ms.store(600, Ordering::SeqCst);
    let dir = tempfile::tempdir().unwrap();
    let mut config = fake.config(dir.path());
    config.auth_timeout = Duration::from_millis(300);
    let app = App::new(config).unwrap();
    let mut events = app.events.subscribe();

    let handle = app.authorizer.begin().await.unwrap();
    let addr = handle.local_addr();
    let browser = tokio::spawn(reqwest::get(format!("http://{addr}/callback?code=abc123")));

    let tokens = handle.wait().await.unwrap();
    assert_eq!(tokens.access_token, "A");
    assert_eq!(browser.await.unwrap().unwrap().status(), 200);

    assert_eq!(app.authorizer.state(), AuthState::Complete);
    assert_eq!(app.tokens.store().load().await.unwrap(), Some(tokens));
    assert_eq!(count(&drain(&mut events), &CoreEvent::AuthSucceeded), 1);
    assert!(listener_is_closed(addr).await);
}

#[tokio::test]
async fn test_new_attempt_waits_for_exchange_in_progress() {
    let fake = FakeSpotify::start().await;
    fake.state.code_delay_ms.store(300, Ordering::SeqCst);
    let dir = tempfile::tempdir().unwrap();
    let app = App::new(fake.config(dir.path())).unwrap();

    let first = app.authorizer.begin().await.unwrap();
    let addr = first.local_addr();
    let browser = tokio::spawn(reqwest::get(format!("http://{addr}/callback?code=abc123")));
    let mut state = app.authorizer.watch_state();
    tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| *s == AuthState::Exchanging),
    )
    .await
    .unwrap()
    .unwrap();

    // The exchange already started, so the first attempt still completes
    let second = app.authorizer.begin().await.unwrap();
    assert!(first.wait().await.is_ok());
    assert_eq!(browser.await.unwrap().unwrap().status(), 200);
    assert!(app.tokens.store().load().await.unwrap().is_some());
    assert_eq!(app.authorizer.state(), AuthState::AwaitingCallback);
    drop(second);
}
