use log::*;
use relay::{Relay, RelayOptions};
use service::config::Config;
use std::future::Future;
use tokio::net::TcpListener;

pub(crate) mod controller;
pub mod error;
pub(crate) mod extractors;
pub(crate) mod middleware;
pub mod router;

// Web-level state shared by every handler.
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub relay: Relay,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, relay::Error> {
        let client = Relay::build_client(config.upstream_connect_timeout())?;
        let relay = Relay::new(
            client,
            RelayOptions {
                keep_alive: config.keep_alive_interval(),
                buffer: config.relay_buffer_chunks,
            },
        );
        Ok(Self { config, relay })
    }
}

/// Serves the router until `shutdown` resolves, then closes open relay
/// sessions and lets in-flight responses drain.
pub async fn init_server(
    app_state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let server_url = format!(
        "{}:{}",
        app_state.config.interface(),
        app_state.config.port
    );
    let listener = TcpListener::bind(&server_url).await?;
    info!("Coze relay listening on http://{server_url}");

    let relay = app_state.relay.clone();
    let app = router::define_routes(app_state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            relay.shutdown();
        })
        .await
}
