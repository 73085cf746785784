use axum::{Router, routing::get};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::oneshot};

use crate::api::{self, CallbackContext};

/// Serves `/callback` on an already-bound listener until `shutdown` fires
/// (or its sender is dropped). The listener is closed when this returns.
pub async fn serve_callback(
    listener: TcpListener,
    context: Arc<CallbackContext>,
    shutdown: oneshot::Receiver<()>,
) -> std::io::Result<()> {
    let app = Router::new()
        .route("/callback", get(api::callback))
        .with_state(context);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.await;
        })
        .await
}
