use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{error, info};
use paper_api::{CommissionCalculator, MarketDataSource, StatePublisher};
use paper_engine::gateway::SyntheticFeed;
use paper_engine::io::{handle_command, Args, LogPublisher};
use paper_engine::models::PaperConfig;
use paper_engine::PaperTrader;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(args.log_level.as_str())).init();

    let config = PaperConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    info!(
        "Loaded {} (dictionary '{}')",
        args.config.display(),
        config.instrument_dictionary()
    );

    let source: Arc<dyn MarketDataSource> = Arc::new(SyntheticFeed::new(config.feed().clone()));
    let commission: Arc<dyn CommissionCalculator> = Arc::new(config.commission().clone());
    let publisher: Arc<dyn StatePublisher> = Arc::new(LogPublisher);

    let trader = PaperTrader::new(&config, source, commission, publisher);
    trader.attach_replay();
    let pump = trader.spawn_feed();

    let refresh = {
        let trader = Arc::downgrade(&trader);
        let period = config.refresh_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(trader) = trader.upgrade() else {
                    break;
                };
                trader.publish_balances();
                trader.publish_positions();
            }
        })
    };

    match &args.script {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening script {}", path.display()))?;
            run_commands(&trader, BufReader::new(file)).await?;
        }
        None => run_commands(&trader, BufReader::new(tokio::io::stdin())).await?,
    }

    if args.linger_secs > 0 {
        info!("Lingering {}s for resting orders", args.linger_secs);
        tokio::time::sleep(Duration::from_secs(args.linger_secs)).await;
    }

    refresh.abort();
    if let Some(pump) = pump {
        pump.abort();
    }

    println!("{}", serde_json::to_string_pretty(&trader.export())?);
    Ok(())
}

async fn run_commands<R>(trader: &PaperTrader, reader: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let response = handle_command(trader, line).await;
        if response["status"] == "ERROR" {
            error!("Command failed: {}", response);
        }
        println!("{}", response);
    }
    Ok(())
}
