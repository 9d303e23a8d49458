use std::sync::Arc;

use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;

use proxy_dns_syncer::Engine;
use proxy_dns_syncer::error::Result;
use proxy_dns_syncer::fleet::{FleetEvent, FleetSnapshot};
use proxy_dns_syncer::provider::cloudflare::CfClient;
use proxy_dns_syncer::store::JsonFileStore;

mod config;

#[derive(Parser)]
struct Args {
    #[clap(short, long)]
    config: String,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Err(e) = run(&args.config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config_path: &str) -> Result<()> {
    let cfg = config::Parser::parse_yaml(config_path)?;
    let fleet = match &cfg.fleet {
        Some(path) => config::Parser::parse_fleet(path)?,
        None => FleetSnapshot::default(),
    };

    let store = JsonFileStore::open(&cfg.store).await?;
    let provider = CfClient::new(&cfg.api.base_url, cfg.api.timeout())?;
    let engine = Arc::new(
        Engine::new(cfg.zones, Arc::new(provider), Arc::new(store))
            .with_pacing(cfg.pacing.into())
            .with_sweep(cfg.sweep),
    );

    tokio::select! {
        _ = engine.startup(&fleet) => {
            watch_events(&engine).await;
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("startup sweep interrupted");
        }
    }

    engine.shutdown().await;
    Ok(())
}

/// Applies newline-delimited JSON fleet events from stdin until EOF or
/// Ctrl-C. Every event runs on its own task.
async fn watch_events(engine: &Arc<Engine>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<FleetEvent>(&line) {
                        Ok(event) => {
                            let engine = engine.clone();
                            tasks.spawn(async move { engine.handle(event).await });
                        }
                        Err(e) => warn!("ignoring malformed event {:?}: {}", line, e),
                    }
                }
                Ok(None) => {
                    info!("event stream closed");
                    break;
                }
                Err(e) => {
                    error!("failed to read events: {}", e);
                    break;
                }
            },
            Some(res) = tasks.join_next() => {
                if let Err(e) = res {
                    error!("event task failed: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    while let Some(res) = tasks.join_next().await {
        if let Err(e) = res {
            error!("event task failed: {}", e);
        }
    }
}
