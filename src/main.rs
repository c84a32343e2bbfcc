use log::{error, info};
use service::{config::Config, logging::Logger};
use tokio::signal;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config);
    Logger::log_config_summary(&config);
    install_panic_hook();

    let app_state = match web::AppState::new(config) {
        Ok(app_state) => app_state,
        Err(e) => {
            error!("Failed to initialize the relay: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = web::init_server(app_state, shutdown_signal()).await {
        error!("Server failed: {e}");
        std::process::exit(1);
    }

    info!("HTTP server closed. Bye.");
}

// A panic inside a request or relay task is contained by tokio; log it so it
// is not lost and keep serving other sessions.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("Uncaught panic: {panic_info}");
    }));
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT received, closing server..."),
        _ = terminate => info!("SIGTERM received, closing server..."),
    }
}
