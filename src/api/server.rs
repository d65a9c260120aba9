use axum::Router;
use std::future::Future;
use tokio::net::TcpListener;

use crate::poller::PollerHandle;

/// Serve until `shutdown` resolves, then stop the pollers. The pollers are
/// stopped whether the server exits cleanly or with an error.
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    pollers: Vec<PollerHandle>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    if let Err(e) = &served {
        tracing::error!("HTTP server failed: {}", e);
    }

    for poller in pollers {
        poller.shutdown().await;
    }

    served
}
