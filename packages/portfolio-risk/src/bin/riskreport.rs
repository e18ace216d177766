//! riskreport - command line front end for portfolio risk analytics.
//!
//! Reads return data from a JSON file and prints an `ApiResponse` JSON
//! envelope on stdout. Logs go to stderr (`RUST_LOG`, default `info`).

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use portfolio_risk::{
    AnalyticsConfig, ApiResponse, MultiAssetReturnSeries, ReturnSeries, RiskReportAssembler,
    VarEngine,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "riskreport")]
#[command(about = "Portfolio risk analytics - metrics, VaR and risk reports")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the comprehensive risk metrics bundle
    Metrics {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Generate a risk report with risk level and recommendations
    Report {
        #[command(flatten)]
        common: CommonArgs,
        /// Portfolio name shown in the report
        #[arg(short, long, default_value = "Portfolio")]
        name: String,
    },
    /// VaR estimates and a historical VaR backtest for the portfolio column
    Var {
        #[command(flatten)]
        common: CommonArgs,
        /// Tail probability (0.05 = 95% VaR)
        #[arg(long, default_value = "0.05")]
        confidence: f64,
        /// Backtest window in periods
        #[arg(long, default_value = "100")]
        backtest_window: usize,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Input JSON file with return series
    #[arg(short, long)]
    input: PathBuf,
    /// Config file (defaults to PORTFOLIO_RISK_CONFIG or the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Annual risk-free rate
    #[arg(long)]
    risk_free_rate: Option<f64>,
    /// Rolling window length
    #[arg(long)]
    window: Option<usize>,
    /// Monte Carlo simulation count
    #[arg(long)]
    simulations: Option<usize>,
    /// RNG seed for reproducible Monte Carlo and clustering
    #[arg(long)]
    seed: Option<u64>,
}

/// Input file layout.
#[derive(Deserialize)]
struct InputFile {
    /// Asset id to series; the `portfolio` asset is the primary column
    returns: BTreeMap<String, ReturnSeries>,
    /// Primary asset id (defaults to the first id in sorted order)
    #[serde(default)]
    portfolio: Option<String>,
    #[serde(default)]
    benchmark: Option<ReturnSeries>,
}

struct Loaded {
    config: AnalyticsConfig,
    data: MultiAssetReturnSeries,
    benchmark: Option<ReturnSeries>,
    rng: StdRng,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let (output, ok) = match run(cli.command) {
        Ok(output) => (output, true),
        Err(e) => {
            tracing::error!("{:#}", e);
            let response = match e.downcast_ref::<portfolio_risk::Error>() {
                Some(err) => ApiResponse::<()>::from_error(err),
                None => ApiResponse::<()>::err(format!("{:#}", e)),
            };
            (to_json(&response), false)
        }
    };

    println!("{}", output);
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run(command: Commands) -> anyhow::Result<String> {
    match command {
        Commands::Metrics { common } => {
            let Loaded {
                config,
                data,
                benchmark,
                mut rng,
            } = load(&common)?;
            let mut assembler = RiskReportAssembler::new(config.clone());
            assembler.initialize(data, benchmark, config.risk_free_rate)?;
            let metrics = assembler.calculate_comprehensive_risk_metrics(&mut rng)?;
            Ok(to_json(&ApiResponse::ok(metrics)))
        }
        Commands::Report { common, name } => {
            let Loaded {
                config,
                data,
                benchmark,
                mut rng,
            } = load(&common)?;
            let mut assembler = RiskReportAssembler::new(config.clone());
            assembler.initialize(data, benchmark, config.risk_free_rate)?;
            let report = assembler.generate_risk_report(&name, &mut rng)?;
            Ok(to_json(&ApiResponse::ok(report)))
        }
        Commands::Var {
            common,
            confidence,
            backtest_window,
        } => {
            let Loaded {
                config,
                data,
                mut rng,
                ..
            } = load(&common)?;
            let engine = VarEngine::new(&data.primary());
            Ok(to_json(&ApiResponse::ok(json!({
                "asset": data.primary_asset(),
                "confidence": confidence,
                "historical_var": engine.historical_var(confidence)?,
                "parametric_var": engine.parametric_var(confidence)?,
                "monte_carlo_var": engine.monte_carlo_var(confidence, config.monte_carlo_simulations, &mut rng)?,
                "conditional_var": engine.conditional_var(confidence)?,
                "backtest": engine.var_backtesting(confidence, backtest_window)?,
            }))))
        }
    }
}

fn load(args: &CommonArgs) -> anyhow::Result<Loaded> {
    let mut config = match &args.config {
        Some(path) => AnalyticsConfig::load_from_path(path)?,
        None => AnalyticsConfig::load()?,
    };
    if let Some(rate) = args.risk_free_rate {
        config.risk_free_rate = rate;
    }
    if let Some(window) = args.window {
        config.rolling_window = window;
    }
    if let Some(n) = args.simulations {
        config.monte_carlo_simulations = n;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.validate()?;

    let (data, benchmark) = read_input(&args.input)?;

    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    Ok(Loaded {
        config,
        data,
        benchmark,
        rng,
    })
}

fn read_input(path: &Path) -> anyhow::Result<(MultiAssetReturnSeries, Option<ReturnSeries>)> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input {}", path.display()))?;
    let input: InputFile = serde_json::from_str(&content)
        .with_context(|| format!("Invalid input file {}", path.display()))?;

    if input.returns.is_empty() {
        bail!("Input contains no return series");
    }

    let mut series: Vec<(String, ReturnSeries)> = input.returns.into_iter().collect();
    if let Some(primary) = &input.portfolio {
        let Some(idx) = series.iter().position(|(asset, _)| asset == primary) else {
            return Err(portfolio_risk::Error::UnknownAsset(primary.clone()).into());
        };
        let entry = series.remove(idx);
        series.insert(0, entry);
    }

    tracing::debug!(assets = series.len(), "Loaded input {}", path.display());
    Ok((MultiAssetReturnSeries::new(series)?, input.benchmark))
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        format!(
            "{{\"ok\":false,\"error\":\"Failed to serialize response: {}\"}}",
            e
        )
    })
}
