use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::{signal, sync::mpsc};
use tracing::{error, info, warn};

use estoque_api as api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db_arc = Arc::new(db_pool);

    // Init events
    let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
    let event_sender = api::events::EventSender::new(event_tx);
    tokio::spawn(api::events::process_events(event_rx));

    let app_state = api::AppState::new(db_arc.clone(), cfg.clone(), event_sender);

    match cfg.bootstrap_supervisor() {
        Some((name, phone, password)) => {
            if let Err(e) = app_state
                .auth
                .bootstrap_supervisor(name, phone, password)
                .await
            {
                error!(error = %e, "supervisor bootstrap failed");
                return Err(anyhow::anyhow!("supervisor bootstrap failed: {}", e));
            }
        }
        None => warn!("no bootstrap supervisor configured; an empty database cannot be logged into"),
    }

    let app = api::app_router(app_state);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.host, cfg.port))?;
    info!(store = %cfg.store_name, "estoque-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Ok(pool) = Arc::try_unwrap(db_arc) {
        if let Err(e) = api::db::close_pool(pool).await {
            warn!(error = %e, "error closing database pool");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
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
    info!("shutdown signal received");
}
