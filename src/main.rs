use words_backend::config::Config;
use words_backend::create_app;
use words_backend::logging::{init_tracing, LogConfig};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&LogConfig::from_env(&config.log_level));

    let app = match create_app(&config).await {
        Ok(app) => app,
        Err(err) => {
            tracing::error!(error = %err, "primary store not initialized");
            std::process::exit(1);
        }
    };

    let addr = config.bind_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, %addr, "bind listener failed");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "words-backend listening");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    if let Err(err) = server.await {
        tracing::error!(error = %err, "server error");
    }

    tracing::info!("graceful shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
