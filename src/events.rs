//! Outbound notifications from the core to whatever presents it.

use tokio::sync::broadcast;
use tracing::trace;

use crate::types::PlaybackSnapshot;

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    /// Stored credentials are gone; the user has to authorize again.
    AuthRequired,
    /// A browser authorization completed and tokens are installed.
    AuthSucceeded,
    Playback(PlaybackSnapshot),
}

/// Cloneable publisher handle over a broadcast channel.
///
/// Emitting never fails: with no subscribers the event is dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: CoreEvent) {
        trace!(?event, "emitting core event");
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
