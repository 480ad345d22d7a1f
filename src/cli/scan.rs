//! Scan command implementation

use crate::config::Config;
use crate::feed::DexScreenerClient;
use crate::notify::{alert_message, ConsoleNotifier, TelegramNotifier};
use crate::scheduler::Scheduler;
use crate::store::SqliteDedupStore;
use anyhow::Context;
use clap::Args;

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Print admitted pairs instead of sending alerts; the store is not touched
    #[arg(long)]
    pub dry_run: bool,
}

impl ScanArgs {
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        if self.dry_run {
            config.validate_screening()?;
        } else {
            config.validate()?;
        }
        let source = DexScreenerClient::new(config.feed.clone(), config.filter.target_chain.clone())?;

        if self.dry_run {
            let store = SqliteDedupStore::open_in_memory()?;
            let mut scheduler = Scheduler::new(&config, source, store, ConsoleNotifier);

            let (admitted, result) = scheduler.preview().await?;
            for candidate in &admitted {
                println!("{}\n", alert_message(&candidate.snapshot, &candidate.admission, 0));
            }
            println!("{result}");
            return Ok(());
        }

        let store = SqliteDedupStore::open(&config.store.path)
            .with_context(|| format!("opening dedup store {:?}", config.store.path))?;
        let notifier = TelegramNotifier::new(&config.telegram)?;
        let mut scheduler = Scheduler::new(&config, source, store, notifier);

        let result = scheduler.run_once().await?;
        println!("{result}");

        scheduler
            .into_store()
            .close()
            .context("closing dedup store")?;
        Ok(())
    }
}
