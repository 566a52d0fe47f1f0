use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use stock_keeper::analysis;
use stock_keeper::config::Settings;
use stock_keeper::database::Database;
use stock_keeper::logging;
use stock_keeper::models::{DailyBar, NewStockInfo};
use stock_keeper::screener::{refresh_conditions, ConditionRegistry};
use stock_keeper::sync::Session;

#[derive(Parser)]
#[command(
    name = "stock-keeper",
    about = "Stock market data layer: daily bars, moving averages, condition screening"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Batch-upsert daily bars from a JSON file
    Import {
        #[arg(long)]
        file: PathBuf,
    },
    /// Insert or replace a stock's metadata and mark it followed
    Follow {
        stock_id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        industry: String,
        #[arg(long)]
        market_type: String,
        #[arg(long, default_value = "manual")]
        source: String,
    },
    /// Clear the followed flag
    Unfollow { stock_id: String },
    /// Refresh moving averages and screening conditions
    Refresh {
        /// Refresh every stock that has bars instead of the followed set
        #[arg(long)]
        all: bool,
        /// Recompute the full history instead of just the newest bar
        #[arg(long)]
        full: bool,
        /// Explicit stock ids (overrides --all and the followed set)
        stock_ids: Vec<String>,
    },
    /// List stocks whose persisted conditions are all true for the selection
    Screen {
        #[arg(long, value_delimiter = ',')]
        conditions: Vec<String>,
    },
    /// Print a stock's bar history
    History {
        stock_id: String,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
    },
    /// Show a stock's metadata and evaluated conditions
    Info { stock_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    logging::init_logging();

    let cli = Cli::parse();
    let settings = Settings::from_env();

    let session = Session::open(&settings.db_path, settings.snapshot_store()).await?;
    let outcome = run(cli.command, session.db());

    // Close on both paths so the connection scope is released and a modified
    // snapshot still gets pushed.
    if let Err(close_err) = session.close().await {
        if outcome.is_ok() {
            return Err(close_err.into());
        }
        tracing::error!(error = %close_err, "failed to close session");
    }

    outcome
}

fn run(command: Command, db: &Database) -> Result<()> {
    match command {
        Command::Import { file } => {
            let raw = std::fs::read_to_string(&file)?;
            let bars: Vec<DailyBar> = serde_json::from_str(&raw)?;
            let count = db.upsert_daily_bars(&bars)?;
            println!("imported {} bars from {}", count, file.display());
        }
        Command::Follow {
            stock_id,
            name,
            industry,
            market_type,
            source,
        } => {
            db.upsert_stock_info(&NewStockInfo {
                stock_id: stock_id.clone(),
                stock_name: name,
                industry,
                follow: true,
                market_type,
                source,
            })?;
            println!("following {}", stock_id);
        }
        Command::Unfollow { stock_id } => {
            if db.set_follow(&stock_id, false)? {
                println!("unfollowed {}", stock_id);
            } else {
                println!("no stock_info row for {}", stock_id);
            }
        }
        Command::Refresh {
            all,
            full,
            stock_ids,
        } => {
            let targets = if !stock_ids.is_empty() {
                stock_ids
            } else if all {
                db.get_bar_stock_ids()?
            } else {
                db.get_followed_stocks()?
                    .into_iter()
                    .map(|(stock_id, _)| stock_id)
                    .collect()
            };

            let rows = if full {
                analysis::refresh_full(db, &targets)?
            } else {
                analysis::refresh_latest(db, &targets)?
            };
            let registry = ConditionRegistry::default();
            let evaluated = refresh_conditions(db, &registry, &targets)?;
            println!(
                "updated {} moving-average rows, evaluated conditions for {} stocks",
                rows, evaluated
            );
        }
        Command::Screen { conditions } => {
            let known = ConditionRegistry::default().names();
            for name in &conditions {
                if !known.contains(&name.as_str()) {
                    anyhow::bail!(
                        "unknown condition '{}' (known: {})",
                        name,
                        known.join(", ")
                    );
                }
            }
            let matches = db.screen(&conditions)?;
            println!("{} stocks match", matches.len());
            for stock in matches {
                let satisfied = stock
                    .conditions
                    .as_ref()
                    .map(|set| {
                        let mut names: Vec<&str> = set
                            .iter()
                            .filter(|(_, value)| **value)
                            .map(|(name, _)| name.as_str())
                            .collect();
                        names.sort_unstable();
                        names.join(", ")
                    })
                    .unwrap_or_default();
                println!(
                    "{}  {}  {}  [{}]",
                    stock.stock_id, stock.stock_name, stock.industry, satisfied
                );
            }
        }
        Command::History { stock_id, from, to } => {
            let bars = db.get_daily_history(&stock_id, from.as_deref(), to.as_deref())?;
            for bar in bars {
                println!(
                    "{}  open {:.2}  high {:.2}  low {:.2}  close {:.2}  vol {}  ma5 {}  ma20 {}",
                    bar.date,
                    bar.opening_price,
                    bar.highest_price,
                    bar.lowest_price,
                    bar.closing_price,
                    bar.trade_volume,
                    fmt_ma(bar.ma5),
                    fmt_ma(bar.ma20),
                );
            }
        }
        Command::Info { stock_id } => match db.get_stock_info(&stock_id)? {
            Some(stock) => {
                println!(
                    "{} {} ({}, {})",
                    stock.stock_id, stock.stock_name, stock.industry, stock.market_type
                );
                println!(
                    "followed: {}  source: {}  updated: {}",
                    stock.follow, stock.source, stock.updated_at
                );
                match stock.conditions {
                    Some(set) => {
                        let mut entries: Vec<_> = set.into_iter().collect();
                        entries.sort();
                        for (name, value) in entries {
                            println!("  {} = {}", name, value);
                        }
                    }
                    None => println!("  not yet evaluated"),
                }
            }
            None => println!("no stock_info row for {}", stock_id),
        },
    }
    Ok(())
}

fn fmt_ma(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}
