mod bootstrap;
mod chat;
mod health;
mod webhook;

use std::time::Duration;

use anyhow::Result;
use axum::Router;
use glassdesk_core::config::{AppConfig, LoadOptions};
use glassdesk_db::SessionStore;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use crate::bootstrap::Application;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

fn init_logging(config: &AppConfig) {
    use glassdesk_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

fn router(app: &Application) -> Router {
    health::router(app.store.clone())
        .merge(chat::router(app.orchestrator.clone()))
        .merge(webhook::router(app.dispatcher.clone(), app.config.whatsapp.verify_token.clone()))
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // logging has to exist before bootstrap emits anything
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let sweeper = spawn_session_sweeper(app.store.clone(), shutdown_tx.subscribe());
    let service = router(&app);
    let server = tokio::spawn(async move {
        axum::serve(listener, service)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            })
            .await
    });

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        session_key = "unknown",
        bind_address = %address,
        "glassdesk-server started"
    );
    wait_for_shutdown().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        session_key = "unknown",
        grace_secs = app.config.server.graceful_shutdown_secs,
        "glassdesk-server stopping"
    );

    let _ = shutdown_tx.send(true);
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    match tokio::time::timeout(grace, server).await {
        Ok(joined) => joined??,
        Err(_) => tracing::warn!(
            event_name = "system.server.drain_timeout",
            correlation_id = "shutdown",
            session_key = "unknown",
            "in-flight requests did not drain before the grace period elapsed"
        ),
    }
    sweeper.abort();

    if let Some(pool) = &app.db_pool {
        pool.close().await;
    }
    Ok(())
}

fn spawn_session_sweeper(
    store: SessionStore,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(
                    event_name = "session.expired_purged",
                    correlation_id = "sweeper",
                    session_key = "unknown",
                    purged,
                    "expired sessions purged"
                ),
                Err(error) => tracing::warn!(
                    event_name = "session.purge_failed",
                    correlation_id = "sweeper",
                    session_key = "unknown",
                    error = %error,
                    "expired session purge failed"
                ),
            }
        }
    })
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use glassdesk_core::config::{ConfigOverrides, LoadOptions};
    use tower::ServiceExt;

    use crate::bootstrap::bootstrap;
    use crate::router;

    #[tokio::test]
    async fn assembled_router_serves_health_chat_and_webhook() {
        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                whatsapp_verify_token: Some("glass-verify".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap");
        let router = router(&app);

        let health = router
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("health");
        assert_eq!(health.status(), StatusCode::OK);

        let history = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/chat/history?user_id=someone")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("history");
        assert_eq!(history.status(), StatusCode::OK);

        let verify = router
            .oneshot(
                Request::builder()
                    .uri("/webhook?hub.mode=subscribe&hub.verify_token=glass-verify&hub.challenge=42")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("verify");
        assert_eq!(verify.status(), StatusCode::OK);
    }
}
