//! Currency cycle arbitrage over exchange-rate snapshots.
//!
//! This library turns a snapshot of directed currency quotes into a rate
//! matrix and searches it for 3-hop cycles that end with more of the
//! starting currency than they began with.
//!
//! # Strategy
//!
//! Trade A → B → C → A. If the product of the three rates exceeds 1.0, the
//! cycle is profitable before fees:
//!
//! ```text
//! 10 A × 2.0  = 20 B
//! 20 B × 3.0  = 60 C
//! 60 C × 0.2  = 12 A
//! ─────────────────────
//! Profit:       2 A (20%)
//! ```
//!
//! Realistic simulation then re-runs each cycle with whole, half or quarter
//! units per currency tier and keeps only those that still profit.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`currency`]: Currency ids, catalog, tiers and snapshots
//! - [`rates`]: Rate matrix construction and queries
//! - [`arbitrage`]: Cycle search and realistic scale simulation
//! - [`metrics`]: Prometheus metrics

pub mod arbitrage;
pub mod config;
pub mod currency;
pub mod error;
pub mod metrics;
pub mod rates;

pub use config::Config;
pub use error::{ArbError, Result};
