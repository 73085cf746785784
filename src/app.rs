use std::sync::Arc;

use crate::{
    Res,
    config::Config,
    events::EventBus,
    management::{CredentialStore, TokenManager},
    poller::{Poller, PollerHandle},
    spotify::{auth::Authorizer, gateway::Gateway, player::Player},
};

/// The wired-up core for one process.
pub struct App {
    pub config: Arc<Config>,
    pub events: EventBus,
    pub tokens: Arc<TokenManager>,
    pub player: Arc<Player>,
    pub authorizer: Arc<Authorizer>,
}

impl App {
    pub fn new(config: Config) -> Res<Self> {
        let config = Arc::new(config);
        let http = config.http_client()?;
        let events = EventBus::new();

        let store = CredentialStore::new(config.token_path.clone());
        let tokens = Arc::new(TokenManager::new(
            Arc::clone(&config),
            http.clone(),
            store,
            events.clone(),
        ));
        let gateway = Arc::new(Gateway::new(
            http.clone(),
            config.api_url.clone(),
            Arc::clone(&tokens),
        ));
        let player = Arc::new(Player::new(gateway));
        let authorizer = Arc::new(Authorizer::new(
            Arc::clone(&config),
            http,
            Arc::clone(&tokens),
            events.clone(),
        ));

        Ok(App {
            config,
            events,
            tokens,
            player,
            authorizer,
        })
    }

    pub fn poller(&self) -> Poller {
        Poller::new(
            Arc::clone(&self.player),
            Arc::clone(&self.tokens),
            self.events.clone(),
        )
    }

    pub fn start_poller(&self) -> PollerHandle {
        self.poller().spawn()
    }
}
