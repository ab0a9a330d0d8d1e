use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::Level;
use trendcross::prelude::*;

#[derive(Parser)]
#[command(name = "trendcross")]
#[command(about = "A moving-average crossover backtester for daily closes", long_about = None)]
struct Cli {
    //log entries and exits
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    //run a backtest
    Run {
        //path to csv file with date and close columns
        #[arg(long)]
        data: Option<PathBuf>,

        //json run configuration, flags below override it
        #[arg(long)]
        config: Option<PathBuf>,

        //symbol label used in the report
        #[arg(long)]
        symbol: Option<String>,

        //starting cash
        #[arg(long)]
        initial_capital: Option<f64>,

        //proportional fee, eg 0.001 for 0.1%
        #[arg(long)]
        transaction_cost: Option<f64>,

        //stop-loss distance below entry, eg 0.08 for 8%
        #[arg(long)]
        stop_loss: Option<f64>,

        //accepted for future risk-based sizing, currently has no effect
        #[arg(long)]
        risk_per_trade: Option<f64>,

        //fast sma window
        #[arg(long)]
        fast: Option<usize>,

        //slow sma window
        #[arg(long)]
        slow: Option<usize>,

        //trend filter sma window
        #[arg(long)]
        trend: Option<usize>,

        //also charge the transaction cost on exits
        #[arg(long)]
        charge_exit_fee: bool,

        //output options
        //output path for the enriched per-bar series
        #[arg(long)]
        output_series_csv: Option<PathBuf>,

        //output path for trades csv
        #[arg(long)]
        output_trades_csv: Option<PathBuf>,

        //output path for the summary report json
        #[arg(long)]
        output_report_json: Option<PathBuf>,
    },

    //write the default run configuration to a json file
    InitConfig {
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run {
            data,
            config,
            symbol,
            initial_capital,
            transaction_cost,
            stop_loss,
            risk_per_trade,
            fast,
            slow,
            trend,
            charge_exit_fee,
            output_series_csv,
            output_trades_csv,
            output_report_json,
        } => {
            let mut run = match config {
                Some(path) => BacktestConfiguration::from_json_file(&path)
                    .context(format!("Failed to load config from {:?}", path))?,
                None => {
                    let data = data
                        .clone()
                        .ok_or_else(|| anyhow::anyhow!("--data is required without --config"))?;
                    BacktestConfiguration {
                        data_path: data,
                        ..BacktestConfiguration::default()
                    }
                }
            };

            if let Some(data) = data {
                run.data_path = data;
            }
            if let Some(symbol) = symbol {
                run.symbol = symbol;
            }

            let sim = &mut run.simulation;
            if let Some(value) = initial_capital {
                sim.initial_capital = value;
            }
            if let Some(value) = transaction_cost {
                sim.transaction_cost_rate = value;
            }
            if let Some(value) = stop_loss {
                sim.stop_loss_pct = value;
            }
            if let Some(value) = risk_per_trade {
                sim.risk_per_trade = value;
            }
            if let Some(value) = fast {
                sim.fast_window = value;
            }
            if let Some(value) = slow {
                sim.slow_window = value;
            }
            if let Some(value) = trend {
                sim.trend_window = value;
            }
            if charge_exit_fee {
                sim.fee_policy = FeePolicy::EntryAndExit;
            }

            if output_series_csv.is_some() {
                run.output_series_csv = output_series_csv;
            }
            if output_trades_csv.is_some() {
                run.output_trades_csv = output_trades_csv;
            }
            if output_report_json.is_some() {
                run.output_report_json = output_report_json;
            }

            run_backtest(&run)?;
        }
        Commands::InitConfig { path } => {
            BacktestConfiguration::default()
                .to_json_file(&path)
                .context(format!("Failed to write config to {:?}", path))?;
            println!("Default configuration written to {:?}", path);
        }
    }

    Ok(())
}

fn run_backtest(run: &BacktestConfiguration) -> Result<()> {
    println!("Trendcross Backtesting Engine");
    println!("=============================\n");

    let engine = BacktestEngine::new(run.simulation.clone()).context("Invalid configuration")?;

    //load data
    println!("Loading data from {:?}...", run.data_path);
    let bars = load_csv(&run.data_path)
        .context(format!("Failed to load data from {:?}", run.data_path))?;

    if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
        println!("Loaded {} bars for {}", bars.len(), run.symbol);
        println!("Date range: {} to {}\n", first.date, last.date);
    }

    let sim = engine.config();
    println!("Strategy: {}", engine.strategy().name());
    println!("Initial capital: {:.2}", sim.initial_capital);
    println!(
        "Transaction cost: {:.3}% ({:?})",
        sim.transaction_cost_rate * 100.0,
        sim.fee_policy
    );
    println!("Stop loss: {:.2}%\n", sim.stop_loss_pct * 100.0);

    //run backtest
    println!("Running backtest...\n");
    let result = engine.run(&bars).context("Price series failed validation")?;

    //display results
    println!("Backtest Results");
    println!("================\n");
    result.summary.pretty_print_table();

    let open = result.final_account.position;
    if let (
        Position::Long {
            entry_date,
            entry_price,
            size,
        },
        Some(last),
    ) = (open, bars.last())
    {
        println!(
            "\nPosition still open: {:.4} shares since {} at {:.2}, unrealized pnl {:.2}",
            size,
            entry_date,
            entry_price,
            open.unrealized_pnl(last.close)
        );
    }

    //save outputs if requested
    if let Some(path) = &run.output_series_csv {
        save_series_csv(&result.series, path)?;
        println!("\nEnriched series saved to {:?}", path);
    }

    if let Some(path) = &run.output_trades_csv {
        save_trades_csv(&result.trades, path)?;
        println!("Trades saved to {:?}", path);
    }

    if let Some(path) = &run.output_report_json {
        let json = serde_json::to_string_pretty(&result.summary)?;
        std::fs::write(path, json).context(format!("Failed to write report to {:?}", path))?;
        println!("Report saved to {:?}", path);
    }

    Ok(())
}

fn save_series_csv(series: &[EnrichedBar], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in series {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn save_trades_csv(trades: &[TradeRecord], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for trade in trades {
        writer.serialize(trade)?;
    }
    writer.flush()?;
    Ok(())
}
