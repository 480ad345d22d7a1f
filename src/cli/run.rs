//! Run command implementation

use crate::config::Config;
use crate::feed::DexScreenerClient;
use crate::notify::TelegramNotifier;
use crate::scheduler::Scheduler;
use crate::store::SqliteDedupStore;
use anyhow::Context;
use clap::Args;
use tokio::sync::watch;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Skip the startup announcement
    #[arg(long)]
    pub no_announce: bool,
}

impl RunArgs {
    pub async fn execute(&self, mut config: Config) -> anyhow::Result<()> {
        config.validate()?;
        if self.no_announce {
            config.scheduler.announce_startup = false;
        }

        let store = SqliteDedupStore::open(&config.store.path)
            .with_context(|| format!("opening dedup store {:?}", config.store.path))?;
        let source = DexScreenerClient::new(config.feed.clone(), config.filter.target_chain.clone())?;
        let notifier = TelegramNotifier::new(&config.telegram)?;

        tracing::info!(
            chain = %config.filter.target_chain,
            venues = ?config.filter.allowed_venues,
            interval_secs = config.scheduler.scan_interval_secs,
            store = ?config.store.path,
            "Starting pair screener"
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(true);
        });

        let mut scheduler = Scheduler::new(&config, source, store, notifier);
        scheduler.run(shutdown_rx).await;

        scheduler
            .into_store()
            .close()
            .context("closing dedup store")?;
        Ok(())
    }
}

/// Resolve on Ctrl-C, or SIGTERM on unix
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable, listening for Ctrl-C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
