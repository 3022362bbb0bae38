//! Currency cycle arbitrage scanner entry point.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use rust_decimal::Decimal;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use currency_arb::arbitrage::{
    analyze_all_currencies, find_opportunities, find_realistic_opportunities, ScaleCache,
};
use currency_arb::config::Config;
use currency_arb::currency::{
    CurrencyCatalog, FileSnapshotSupplier, SampleSnapshotSupplier, Snapshot, SnapshotSupplier,
};
use currency_arb::metrics;
use currency_arb::rates::RateMatrix;

/// Currency cycle arbitrage scanner.
#[derive(Parser, Debug)]
#[command(name = "currency-arb")]
#[command(about = "Find profitable 3-hop currency exchange cycles in a rate snapshot")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print Prometheus metrics after the command.
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search cycles starting from one currency.
    Scan {
        /// Starting currency id.
        #[arg(short, long)]
        currency: String,

        /// JSON snapshot file (built-in sample data when omitted).
        #[arg(short, long)]
        snapshot: Option<PathBuf>,

        /// Amount invested.
        #[arg(long)]
        amount: Option<Decimal>,

        /// Minimum profit percentage.
        #[arg(long)]
        min_profit: Option<Decimal>,

        /// Per-hop slippage in [0, 1).
        #[arg(long)]
        slippage: Option<Decimal>,

        /// Maximum opportunities shown.
        #[arg(long)]
        max_results: Option<usize>,

        /// Only show cycles that survive realistic rounding.
        #[arg(long)]
        realistic: bool,

        /// Only trade through the most popular currencies.
        #[arg(long)]
        popular: bool,
    },

    /// Search cycles from every currency and merge the results.
    AllTrades {
        /// JSON snapshot file (built-in sample data when omitted).
        #[arg(short, long)]
        snapshot: Option<PathBuf>,

        /// Only trade through the most popular currencies.
        #[arg(long)]
        popular: bool,
    },

    /// Show every currency priced in a base currency.
    Prices {
        /// Base currency id.
        #[arg(short, long)]
        base: String,

        /// JSON snapshot file (built-in sample data when omitted).
        #[arg(short, long)]
        snapshot: Option<PathBuf>,
    },

    /// Check configuration validity.
    CheckConfig,
}

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration; check-config reports a load failure itself
    let loaded = Config::load();

    // Initialize logging
    let log_config = loaded
        .as_ref()
        .ok()
        .cloned()
        .unwrap_or_default()
        .with_verbose(args.verbose);
    let filter = EnvFilter::new(log_config.log_filter());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Initialize metrics
    let prometheus = if args.metrics {
        Some(install_prometheus()?)
    } else {
        None
    };
    metrics::init_metrics();

    let result = match args.command {
        Command::Scan {
            currency,
            snapshot,
            amount,
            min_profit,
            slippage,
            max_results,
            realistic,
            popular,
        } => loaded.map_err(anyhow::Error::from).and_then(|mut config| {
            config.starting_amount = amount.unwrap_or(config.starting_amount);
            config.min_profit_percentage = min_profit.unwrap_or(config.min_profit_percentage);
            config.slippage_per_hop = slippage.unwrap_or(config.slippage_per_hop);
            config.max_results = max_results.unwrap_or(config.max_results);
            cmd_scan(&config, &currency, snapshot, realistic, popular)
        }),
        Command::AllTrades { snapshot, popular } => loaded
            .map_err(anyhow::Error::from)
            .and_then(|config| cmd_all_trades(&config, snapshot, popular)),
        Command::Prices { base, snapshot } => loaded
            .map_err(anyhow::Error::from)
            .and_then(|config| cmd_prices(&config, &base, snapshot)),
        Command::CheckConfig => cmd_check_config(loaded),
    };

    if let Some(handle) = prometheus {
        println!("----------------------------------------------------------------------");
        println!("{}", handle.render());
    }

    result
}

/// Install a Prometheus recorder whose output is printed on exit.
fn install_prometheus() -> anyhow::Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")
}

/// Load the snapshot from a file or the built-in sample data.
fn load_snapshot(config: &Config, path: Option<PathBuf>) -> anyhow::Result<Snapshot> {
    let snapshot = match path.or_else(|| config.snapshot_path.clone()) {
        Some(path) => {
            let supplier = FileSnapshotSupplier::new(&path);
            supplier
                .snapshot()
                .with_context(|| format!("Failed to load snapshot {}", path.display()))?
        }
        None => SampleSnapshotSupplier::new().snapshot()?,
    };

    let metadata = snapshot
        .metadata
        .clone()
        .with_ttl(config.snapshot_ttl_seconds);
    if metadata.is_expired() {
        warn!(
            source = %metadata.source,
            league = %metadata.league,
            ttl_seconds = metadata.ttl_seconds,
            "Snapshot is stale"
        );
    }

    info!(
        source = %snapshot.metadata.source,
        rates = snapshot.rates.len(),
        currencies = snapshot.currencies.len(),
        "Snapshot loaded"
    );
    Ok(snapshot)
}

/// Build the matrix for a snapshot, optionally limited to popular currencies.
fn build_matrix(
    config: &Config,
    snapshot: &Snapshot,
    catalog: &CurrencyCatalog,
    popular: bool,
) -> RateMatrix {
    let mut builder = RateMatrix::builder()
        .derive_transitive(config.derive_transitive)
        .metadata(snapshot.metadata.clone());
    if popular {
        builder = builder.restrict_to(catalog.top_currencies(config.top_percentage));
    }

    let report = builder.build(snapshot.rates.iter().cloned());
    if !report.is_clean() {
        warn!(rejected = report.rejected.len(), "Some rates were rejected");
    }
    report.matrix
}

/// Search cycles from one currency.
fn cmd_scan(
    config: &Config,
    currency: &str,
    snapshot: Option<PathBuf>,
    realistic: bool,
    popular: bool,
) -> anyhow::Result<()> {
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    let snapshot = load_snapshot(config, snapshot)?;
    let catalog = snapshot.catalog();
    let matrix = build_matrix(config, &snapshot, &catalog, popular);
    let finder_config = config.finder_config(currency);

    println!("======================================================================");
    println!(
        "CYCLES FROM {} ({} {})",
        catalog.display_name(currency).to_uppercase(),
        finder_config.starting_amount,
        currency
    );
    println!("======================================================================");

    if realistic {
        let tiers = catalog.tier_table();
        let cache = ScaleCache::new();
        let found = find_realistic_opportunities(&matrix, &finder_config, &tiers, &cache)?;
        if found.is_empty() {
            println!("No cycle survives realistic rounding.");
        }
        for (i, realistic) in found.iter().enumerate() {
            let opp = &realistic.opportunity;
            println!(
                "{:>2}. {:+.4}%  {}",
                i + 1,
                opp.profit_percentage,
                opp.path_description(&catalog)
            );
            for scale in &realistic.scales {
                println!(
                    "      {:<9} {} -> {} (profit {}, {:.2}%)",
                    scale.investment_tier.to_string(),
                    scale.starting_amount,
                    scale.final_amount,
                    scale.profit_amount,
                    scale.profit_percentage
                );
            }
        }
    } else {
        let found = find_opportunities(&matrix, &finder_config)?;
        if found.is_empty() {
            println!("No cycle meets the profit threshold.");
        }
        for (i, opp) in found.iter().enumerate() {
            println!(
                "{:>2}. {:+.4}%  {}  ({} -> {}){}",
                i + 1,
                opp.profit_percentage,
                opp.path_description(&catalog),
                opp.starting_amount,
                opp.final_amount.round_dp(4),
                if opp.uses_derived_rates { "  [derived]" } else { "" }
            );
        }
    }

    println!("======================================================================");
    Ok(())
}

/// Search cycles from every currency.
fn cmd_all_trades(config: &Config, snapshot: Option<PathBuf>, popular: bool) -> anyhow::Result<()> {
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    let snapshot = load_snapshot(config, snapshot)?;
    let catalog = snapshot.catalog();
    let matrix = build_matrix(config, &snapshot, &catalog, popular);

    let template = config.finder_config("");
    let report = analyze_all_currencies(&matrix, &template);

    println!("======================================================================");
    println!("ALL CURRENCIES - {} STARTING POINTS", report.by_currency.len());
    println!("======================================================================");

    for (i, opp) in report.opportunities.iter().enumerate() {
        println!(
            "{:>3}. {:+.4}%  {}",
            i + 1,
            opp.profit_percentage,
            opp.path_description(&catalog)
        );
    }
    for (currency, reason) in &report.failures {
        println!("  skipped {}: {}", currency, reason);
    }

    let summary = &report.summary;
    println!("----------------------------------------------------------------------");
    println!("Summary:");
    println!("  Opportunities: {}", summary.total_opportunities);
    if summary.total_opportunities > 0 {
        println!("  Best: {:.4}%", summary.best_profit_percentage);
        println!("  Average: {:.4}%", summary.average_profit_percentage);
        println!("  Worst: {:.4}%", summary.worst_profit_percentage);
    }
    println!("======================================================================");

    Ok(())
}

/// Price every currency in a base currency.
fn cmd_prices(config: &Config, base: &str, snapshot: Option<PathBuf>) -> anyhow::Result<()> {
    let snapshot = load_snapshot(config, snapshot)?;
    let catalog = snapshot.catalog();
    let matrix = build_matrix(config, &snapshot, &catalog, false);

    if !matrix.contains(base) {
        anyhow::bail!("Unknown base currency: {}", base);
    }

    println!("======================================================================");
    println!("PRICES IN {}", catalog.display_name(base).to_uppercase());
    println!("======================================================================");

    for quote in matrix.price_table(base) {
        let price = match quote.price {
            Some(price) => format!("{:.6}", price),
            None => "n/a".to_string(),
        };
        println!(
            "  {:<32} {:>18}{}",
            catalog.display_name(quote.currency.as_str()),
            price,
            if quote.derived { "  (derived)" } else { "" }
        );
    }
    println!("======================================================================");

    Ok(())
}

/// Check configuration validity.
fn cmd_check_config(loaded: Result<Config, envy::Error>) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("CURRENCY ARB - CONFIGURATION CHECK");
    println!("======================================================================");

    // Load configuration
    print!("Loading configuration... ");
    let config = match loaded {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    // Validate configuration
    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    // Show configuration summary
    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Starting Amount: {}", config.starting_amount);
    println!("  Min Profit: {}%", config.min_profit_percentage);
    println!("  Slippage Per Hop: {}", config.slippage_per_hop);
    println!("  Max Results: {}", config.max_results);
    println!("  Edge Policy: {}", config.edge_policy);
    println!("  Transitive Rates: {}", if config.derive_transitive { "Enabled" } else { "Disabled" });
    println!("  Snapshot TTL: {}s", config.snapshot_ttl_seconds);
    println!("  Top Percentage: {}", config.top_percentage);
    match &config.snapshot_path {
        Some(path) => println!("  Snapshot: {}", path.display()),
        None => println!("  Snapshot: built-in sample data"),
    }
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}
