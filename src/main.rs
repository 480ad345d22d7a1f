use clap::Parser;
use dotenv::dotenv;
use pairwatch::cli::{Cli, Commands};
use pairwatch::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    // Load configuration
    let mut config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(pairwatch::config::ConfigError::Read { path, source })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            eprintln!("Warning: config file {path:?} not found, using defaults");
            Config::default()
        }
        Err(e) => return Err(e.into()),
    };
    config.apply_env();

    // Initialize telemetry
    pairwatch::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => args.execute(config).await?,
        Commands::Scan(args) => args.execute(config).await?,
        Commands::Status(args) => args.execute(&config)?,
        Commands::Config => {
            config.validate_screening()?;
            let f = &config.filter;
            println!("Current configuration:");
            println!("  Feed: {} ({:?})", config.feed.base_url, config.feed.mode);
            println!("  Chain: {}  Venues: {}", f.target_chain, f.allowed_venues.join(", "));
            println!(
                "  Filters: cap {}-{}, volume >= {}, liquidity >= {}, age <= {} min",
                f.min_cap, f.max_cap, f.min_volume, f.min_liquidity, f.max_age_minutes
            );
            println!(
                "  Dispatch: {} per scan, {}ms apart",
                config.dispatch.max_posts_per_scan, config.dispatch.send_spacing_ms
            );
            println!(
                "  Scheduler: every {}s, backoff {}s",
                config.scheduler.scan_interval_secs, config.scheduler.backoff_secs
            );
            println!("  Store: {}", config.store.path.display());
            println!(
                "  Telegram: chat {}, token {}",
                if config.telegram.chat_id.is_empty() { "<unset>" } else { &config.telegram.chat_id },
                if config.telegram.bot_token.is_empty() { "<unset>" } else { "<set>" }
            );
        }
    }

    Ok(())
}
