//! Status command implementation

use crate::config::Config;
use crate::store::SqliteDedupStore;
use anyhow::Context;
use clap::Args;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Number of recent alerts to list
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,
}

impl StatusArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = SqliteDedupStore::open(&config.store.path)
            .with_context(|| format!("opening dedup store {:?}", config.store.path))?;

        println!("pairwatch status");
        println!("  Store: {}", config.store.path.display());
        println!("  Alerts sent: {}", store.sent_count()?);

        let recent = store.recent(self.limit)?;
        if recent.is_empty() {
            println!("  No alerts recorded yet");
        } else {
            println!("  Recent alerts:");
            for record in &recent {
                let Some(sent_at) = record.sent_at else {
                    continue;
                };
                println!(
                    "    {}  first seen {}  sent {}",
                    record.address,
                    record.first_seen.format("%Y-%m-%d %H:%M:%S"),
                    sent_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }

        store.close()?;
        Ok(())
    }
}
