//! Unified error types for the rate matrix and arbitrage search.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::currency::CurrencyId;

/// Unified error type for the crate.
#[derive(Error, Debug)]
pub enum ArbError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Invalid search parameters.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    /// Rate lookup failed.
    #[error("rate error: {0}")]
    NoRate(#[from] NoRateError),

    /// Snapshot could not be produced.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why an observed rate was discarded during matrix construction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestionError {
    /// A currency key was empty.
    #[error("empty currency id in rate {from:?} -> {to:?}")]
    EmptyCurrency {
        /// Source currency as given.
        from: CurrencyId,
        /// Target currency as given.
        to: CurrencyId,
    },

    /// The rate converts a currency into itself.
    #[error("self-loop rate for {currency}")]
    SelfLoop {
        /// The currency on both sides.
        currency: CurrencyId,
    },

    /// The rate is NaN, infinite or outside the decimal range.
    #[error("non-finite rate {rate} for {from} -> {to}")]
    NonFinite {
        /// Source currency.
        from: CurrencyId,
        /// Target currency.
        to: CurrencyId,
        /// Observed value.
        rate: f64,
    },

    /// The rate is zero or negative.
    #[error("non-positive rate {rate} for {from} -> {to}")]
    NonPositive {
        /// Source currency.
        from: CurrencyId,
        /// Target currency.
        to: CurrencyId,
        /// Observed value.
        rate: f64,
    },

    /// The matrix is restricted and this currency is not allowed.
    #[error("unsupported currency {currency}")]
    UnsupportedCurrency {
        /// The rejected currency.
        currency: CurrencyId,
    },
}

/// No direct or derivable rate exists for a pair.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no rate from {from} to {to}")]
pub struct NoRateError {
    /// Source currency.
    pub from: CurrencyId,
    /// Target currency.
    pub to: CurrencyId,
}

/// Invalid search parameters, rejected before any search work.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Starting currency is not in the matrix.
    #[error("unknown starting currency {0}")]
    UnknownCurrency(CurrencyId),

    /// Starting amount must be positive.
    #[error("starting amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    /// Minimum profit percentage must not be negative.
    #[error("min profit percentage must be >= 0, got {0}")]
    MinProfitNegative(Decimal),

    /// Slippage must be in `[0, 1)`.
    #[error("slippage per hop must be in [0, 1), got {0}")]
    SlippageOutOfRange(Decimal),

    /// At least one result must be requested.
    #[error("max results must be at least 1")]
    ZeroMaxResults,
}

/// A realistic simulation hop rounded to nothing (or overflowed).
///
/// This is a simulation outcome, not a failure: the scale is dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("chain broken at hop {hop}: no usable amount of {currency}")]
pub struct ChainBroken {
    /// Zero-based hop index.
    pub hop: usize,
    /// Currency whose amount rounded to zero or overflowed.
    pub currency: CurrencyId,
}

/// Snapshot supplier errors.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Snapshot file could not be read.
    #[error("failed to read snapshot {path}: {source}")]
    Read {
        /// Path that failed.
        path: String,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Snapshot document is malformed.
    #[error("failed to parse snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ArbError>;
