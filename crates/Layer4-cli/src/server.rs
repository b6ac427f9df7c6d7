//! HTTP server - one WebSocket route per endpoint, static web UI for the rest

use crate::socket;
use anyhow::Context;
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::routing::get;
use axum::Router;
use koderunner_core::{Endpoint, KodeRunner};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

pub fn router(runner: Arc<KodeRunner>) -> Router {
    let mut app: Router<Arc<KodeRunner>> = Router::new();

    for endpoint in Endpoint::ALL {
        app = app.route(
            endpoint.path(),
            get(
                move |ws: WebSocketUpgrade,
                      State(runner): State<Arc<KodeRunner>>,
                      ConnectInfo(remote): ConnectInfo<SocketAddr>| async move {
                    info!("WebSocket connection to {} endpoint from {}", endpoint, remote);
                    ws.on_upgrade(move |upgraded| socket::run_channel(upgraded, runner, endpoint, remote))
                },
            ),
        );
    }

    let html = ServeDir::new(runner.config().html_dir());
    app.fallback_service(html)
        .layer(TraceLayer::new_for_http())
        .with_state(runner)
}

pub async fn serve(runner: Arc<KodeRunner>, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", listener.local_addr()?);

    let app = router(Arc::clone(&runner));
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(runner))
    .await?;

    Ok(())
}

async fn shutdown_signal(runner: Arc<KodeRunner>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }

    info!("Shutting down");
    runner.shutdown("Server shutting down");
}
