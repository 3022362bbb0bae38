//! Application configuration loaded from environment variables.

use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::arbitrage::{EdgePolicy, FinderConfig};
use crate::currency::CurrencyId;

/// Prefix shared by every configuration variable.
pub const ENV_PREFIX: &str = "ARB_";

/// Application configuration loaded from `ARB_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Search Parameters ===
    /// Amount invested in every cycle.
    #[serde(default = "default_starting_amount")]
    pub starting_amount: Decimal,

    /// Minimum profit percentage to report (e.g., 0.01 = 0.01%).
    #[serde(default = "default_min_profit")]
    pub min_profit_percentage: Decimal,

    /// Haircut applied to every hop's rate.
    #[serde(default)]
    pub slippage_per_hop: Decimal,

    /// Maximum opportunities per search.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Which matrix edges cycles may use: observed_only, direct or any.
    #[serde(default)]
    pub edge_policy: EdgePolicy,

    // === Matrix Construction ===
    /// Derive two-hop rates for pairs with no direct quote.
    #[serde(default = "default_true")]
    pub derive_transitive: bool,

    /// Seconds before a snapshot is considered stale.
    #[serde(default = "default_snapshot_ttl")]
    pub snapshot_ttl_seconds: u64,

    /// Share of the catalog considered popular, in `(0, 1]`.
    #[serde(default = "default_top_percentage")]
    pub top_percentage: f64,

    /// JSON snapshot to load instead of the built-in sample data.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,

    // === Logging ===
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_starting_amount() -> Decimal {
    Decimal::new(100, 0) // 100 units
}

fn default_min_profit() -> Decimal {
    Decimal::new(1, 2) // 0.01%
}

fn default_max_results() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_snapshot_ttl() -> u64 {
    300
}

fn default_top_percentage() -> f64 {
    0.8
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            starting_amount: default_starting_amount(),
            min_profit_percentage: default_min_profit(),
            slippage_per_hop: Decimal::ZERO,
            max_results: default_max_results(),
            edge_policy: EdgePolicy::default(),
            derive_transitive: default_true(),
            snapshot_ttl_seconds: default_snapshot_ttl(),
            top_percentage: default_top_percentage(),
            snapshot_path: None,
            rust_log: default_log_level(),
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::prefixed(ENV_PREFIX).from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.starting_amount <= Decimal::ZERO {
            return Err("ARB_STARTING_AMOUNT must be positive".to_string());
        }

        if self.min_profit_percentage < Decimal::ZERO {
            return Err("ARB_MIN_PROFIT_PERCENTAGE must not be negative".to_string());
        }

        if self.slippage_per_hop < Decimal::ZERO || self.slippage_per_hop >= Decimal::ONE {
            return Err("ARB_SLIPPAGE_PER_HOP must be in [0, 1)".to_string());
        }

        if self.max_results == 0 {
            return Err("ARB_MAX_RESULTS must be at least 1".to_string());
        }

        if !(self.top_percentage > 0.0 && self.top_percentage <= 1.0) {
            return Err("ARB_TOP_PERCENTAGE must be in (0, 1]".to_string());
        }

        Ok(())
    }

    /// Search parameters for the given starting currency.
    pub fn finder_config(&self, starting_currency: impl Into<CurrencyId>) -> FinderConfig {
        FinderConfig::new(starting_currency)
            .with_amount(self.starting_amount)
            .with_min_profit(self.min_profit_percentage)
            .with_slippage(self.slippage_per_hop)
            .with_max_results(self.max_results)
            .with_edge_policy(self.edge_policy)
    }

    /// Turn on verbose logging when `verbose` is set; never turns it off.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose |= verbose;
        self
    }

    /// Log filter directive honoring the verbose flag.
    pub fn log_filter(&self) -> String {
        if self.verbose {
            "currency_arb=debug,info".to_string()
        } else {
            self.rust_log.clone()
        }
    }
}
