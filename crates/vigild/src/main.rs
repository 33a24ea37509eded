//! Vigil Daemon - audits application modules and serves the results

use anyhow::Result;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use vigil_shared::VigilError;
use vigild::server::{self, AppState};
use vigild::{AuditOrchestrator, AuditService, Config};

#[tokio::main]
async fn main() -> Result<()> {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_level(true)
        .init();

    info!("Vigil Daemon v{} starting", vigil_shared::VERSION);

    let config = Config::load();
    let orchestrator = AuditOrchestrator::from_config(&config)?;
    let audit = AuditService::new(orchestrator);

    match audit.modules() {
        Ok(modules) => info!("Module catalog: {} modules", modules.len()),
        Err(e) => warn!("Module catalog unavailable: {}", e),
    }

    if config.daemon.audit_on_start {
        schedule(&audit).await;
    }

    let shutdown = CancellationToken::new();

    if let Some(secs) = config.daemon.audit_interval_secs.filter(|s| *s > 0) {
        info!("Periodic audits every {}s", secs);
        let audit = Arc::clone(&audit);
        let stop = shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(secs));
            // The first tick fires immediately; startup audits are governed by audit_on_start
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => schedule(&audit).await,
                }
            }
        });
    }

    {
        let shutdown = shutdown.clone();
        let audit = Arc::clone(&audit);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutting down gracefully");
                audit.cancel().await;
                shutdown.cancel();
            }
        });
    }

    let state = Arc::new(AppState::new(audit));
    server::run(state, &config.daemon.listen_addr, shutdown).await?;

    info!("Vigil Daemon stopped");
    Ok(())
}

async fn schedule(audit: &Arc<AuditService>) {
    match audit.start().await {
        Ok(run_id) => info!("Scheduled audit {}", run_id),
        Err(VigilError::AuditInProgress(current)) => {
            info!("Skipping scheduled audit, {} still running", current)
        }
        Err(e) => error!("Scheduled audit failed to start: {}", e),
    }
}
