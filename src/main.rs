use std::sync::Arc;

mod app;
mod cart;
mod claims;
mod config;
mod donations;
mod error;
mod notifications;
mod state;
mod sweeper;
mod users;

use crate::{config::AppConfig, state::AppState, sweeper::ExpirySweeper};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "sharefood=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    let db = state::connect(&config).await?;

    // Run migrations if present
    if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }

    let app_state = AppState::from_pool(db, &config)?;
    let sweeper = Arc::new(ExpirySweeper::new(app_state.inventory.clone(), &config.sweep)).start();

    let result = app::serve(app::build_app(app_state), shutdown_signal()).await;

    sweeper.stop().await;
    result
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut term), Ok(mut int)) => {
                tokio::select! {
                    _ = term.recv() => {}
                    _ = int.recv() => {}
                }
            }
            _ => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("shutdown signal received");
}
