//! Arbitrage module for finding and sizing currency cycles.
//!
//! This module handles:
//! - Cycle simulation and profit calculations
//! - 3-hop cycle search from one or every currency
//! - Realistic scale simulation with rounding

pub mod calculator;
pub mod finder;
pub mod simulator;

pub use calculator::{
    evaluate_path, profit_percentage, rank_order, simulate_cycle, Opportunity, OpportunityId,
    Steps, SummaryStats, TradeStep,
};
pub use finder::{
    analyze_all_currencies, find_best_opportunity, find_opportunities,
    find_realistic_opportunities, AllTradesReport, EdgePolicy, FinderConfig, RealisticOpportunity,
};
pub use simulator::{
    best_scale, simulate_realistic_scales, simulate_realistic_scales_with, simulate_scale,
    InvestmentTier, ScaleCache, ScalePlan, ScaledResult, TierAmounts,
};
