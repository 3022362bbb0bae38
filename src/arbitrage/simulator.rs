//! Realistic-amount re-simulation of opportunities.
//!
//! Quoted rates assume any fractional amount can be traded. In game most
//! currencies only trade in whole units or coarse fractions, so a cycle that
//! looks profitable can round its profit away. This module re-runs an
//! opportunity at a set of concrete starting amounts with the rounding
//! policy below, and keeps the best amount per investment tier.
//!
//! Rounding policy:
//! - amount paid into a hop is rounded **up**, amount received is rounded
//!   **down**;
//! - premium currencies use whole units below 1 and half units from 1;
//! - other currencies use quarter units below 10 and whole units from 10.

use dashmap::DashMap;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use strum::{Display, EnumString};
use tracing::{debug, instrument};

use super::calculator::{profit_percentage, Opportunity, OpportunityId, Steps, TradeStep};
use crate::currency::{CurrencyId, Tier, TierTable};
use crate::error::ChainBroken;
use crate::metrics;

/// Penalty scale for large starting amounts in the efficiency score.
pub const EFFICIENCY_SCALE: Decimal = dec!(10000);

const HALF: Decimal = dec!(0.5);
const QUARTER: Decimal = dec!(0.25);
const WHOLE_UNIT_THRESHOLD: Decimal = dec!(10);

/// Bucket of starting amounts a player might invest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InvestmentTier {
    /// Small first trades.
    Starter,
    /// Mid-sized trades.
    Moderate,
    /// Large trades.
    Advanced,
}

impl InvestmentTier {
    /// All tiers, smallest first.
    pub const ALL: [InvestmentTier; 3] = [
        InvestmentTier::Starter,
        InvestmentTier::Moderate,
        InvestmentTier::Advanced,
    ];
}

/// Candidate starting amounts per investment tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierAmounts {
    /// Starter amounts.
    pub starter: Vec<Decimal>,
    /// Moderate amounts.
    pub moderate: Vec<Decimal>,
    /// Advanced amounts.
    pub advanced: Vec<Decimal>,
}

impl TierAmounts {
    /// Amounts for one investment tier.
    pub fn get(&self, tier: InvestmentTier) -> &[Decimal] {
        match tier {
            InvestmentTier::Starter => &self.starter,
            InvestmentTier::Moderate => &self.moderate,
            InvestmentTier::Advanced => &self.advanced,
        }
    }
}

/// Which starting amounts to test, by the starting currency's tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalePlan {
    /// Amounts for premium starting currencies.
    pub premium: TierAmounts,
    /// Amounts for every other starting currency.
    pub standard: TierAmounts,
}

impl Default for ScalePlan {
    fn default() -> Self {
        Self {
            premium: TierAmounts {
                starter: vec![dec!(1), dec!(2), dec!(3)],
                moderate: vec![dec!(5), dec!(10), dec!(15)],
                advanced: vec![dec!(25), dec!(50)],
            },
            standard: TierAmounts {
                starter: vec![dec!(5), dec!(10), dec!(20)],
                moderate: vec![dec!(50), dec!(100), dec!(200)],
                advanced: vec![dec!(500), dec!(1000), dec!(2000)],
            },
        }
    }
}

impl ScalePlan {
    /// Amount set for a starting currency tier.
    pub fn amounts_for(&self, tier: Tier) -> &TierAmounts {
        if tier.is_premium() {
            &self.premium
        } else {
            &self.standard
        }
    }
}

/// One realistic re-simulation at a concrete starting amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaledResult {
    /// Investment bucket this amount belongs to.
    pub investment_tier: InvestmentTier,
    /// Amount actually paid into the first hop.
    pub starting_amount: Decimal,
    /// Amount received from the last hop.
    pub final_amount: Decimal,
    /// `final_amount - starting_amount`.
    pub profit_amount: Decimal,
    /// `profit_amount / starting_amount * 100`.
    pub profit_percentage: Decimal,
    /// `profit / start - start / EFFICIENCY_SCALE`.
    pub efficiency: Decimal,
    /// Rounded hops; `rate` is the achieved rate.
    pub steps: Steps,
}

fn granularity(amount: Decimal, tier: Tier) -> Decimal {
    if tier.is_premium() {
        if amount < Decimal::ONE {
            Decimal::ONE
        } else {
            HALF
        }
    } else if amount < WHOLE_UNIT_THRESHOLD {
        QUARTER
    } else {
        Decimal::ONE
    }
}

/// Round an amount paid into a hop up to the currency's grid.
pub fn round_up(amount: Decimal, tier: Tier) -> Option<Decimal> {
    let step = granularity(amount, tier);
    amount.checked_div(step)?.ceil().checked_mul(step)
}

/// Round an amount received from a hop down to the currency's grid.
pub fn round_down(amount: Decimal, tier: Tier) -> Option<Decimal> {
    let step = granularity(amount, tier);
    amount.checked_div(step)?.floor().checked_mul(step)
}

/// Re-run an opportunity's rates from `starting_amount` with rounding.
///
/// Fails with [`ChainBroken`] when a hop's output rounds to zero or any
/// amount, percentage or efficiency overflows; such a scale is not viable.
pub fn simulate_scale(
    opportunity: &Opportunity,
    tiers: &TierTable,
    investment_tier: InvestmentTier,
    starting_amount: Decimal,
) -> Result<ScaledResult, ChainBroken> {
    let mut steps = Steps::new();
    let mut held = starting_amount;

    for (hop, step) in opportunity.steps.iter().enumerate() {
        let broken = || ChainBroken {
            hop,
            currency: step.to.clone(),
        };

        let amount_before = round_up(held, tiers.tier_of(step.from.as_str())).ok_or_else(broken)?;
        let raw_after = amount_before.checked_mul(step.rate).ok_or_else(broken)?;
        let amount_after = round_down(raw_after, tiers.tier_of(step.to.as_str())).ok_or_else(broken)?;
        if amount_after <= Decimal::ZERO || amount_before <= Decimal::ZERO {
            return Err(broken());
        }

        let rate = amount_after.checked_div(amount_before).ok_or_else(broken)?;
        steps.push(TradeStep {
            from: step.from.clone(),
            to: step.to.clone(),
            rate,
            amount_before,
            amount_after,
        });
        held = amount_after;
    }

    let settle = || ChainBroken {
        hop: opportunity.steps.len().saturating_sub(1),
        currency: opportunity.starting_currency.clone(),
    };
    let paid = steps.first().map(|s| s.amount_before).unwrap_or(starting_amount);
    let profit_amount = held.checked_sub(paid).ok_or_else(settle)?;
    let profit_pct = profit_percentage(paid, held).ok_or_else(settle)?;
    let efficiency = profit_amount
        .checked_div(paid)
        .zip(paid.checked_div(EFFICIENCY_SCALE))
        .and_then(|(ratio, size)| ratio.checked_sub(size))
        .ok_or_else(settle)?;

    Ok(ScaledResult {
        investment_tier,
        starting_amount: paid,
        final_amount: held,
        profit_amount,
        profit_percentage: profit_pct,
        efficiency,
        steps,
    })
}

/// Best viable scale per investment tier using the default [`ScalePlan`].
pub fn simulate_realistic_scales(opportunity: &Opportunity, tiers: &TierTable) -> Vec<ScaledResult> {
    simulate_realistic_scales_with(opportunity, tiers, &ScalePlan::default())
}

/// Best viable scale per investment tier.
///
/// A scale is viable when no hop rounds to zero and it still makes a profit.
/// Per tier the most efficient amount wins, the smaller amount on ties.
/// Tiers without a viable amount are omitted; an empty result means the
/// opportunity does not survive realistic trading.
#[instrument(skip_all, fields(opportunity = %opportunity.id))]
pub fn simulate_realistic_scales_with(
    opportunity: &Opportunity,
    tiers: &TierTable,
    plan: &ScalePlan,
) -> Vec<ScaledResult> {
    let _timer = metrics::timer_scale_simulation();
    let amounts = plan.amounts_for(tiers.tier_of(opportunity.starting_currency.as_str()));

    let mut results = Vec::with_capacity(InvestmentTier::ALL.len());
    for investment_tier in InvestmentTier::ALL {
        let mut best: Option<ScaledResult> = None;

        for &amount in amounts.get(investment_tier) {
            let scaled = match simulate_scale(opportunity, tiers, investment_tier, amount) {
                Ok(scaled) => scaled,
                Err(broken) => {
                    metrics::inc_scales_broken();
                    debug!(amount = %amount, reason = %broken, "Scale dropped");
                    continue;
                }
            };
            if scaled.profit_amount <= Decimal::ZERO {
                continue;
            }

            let better = match &best {
                None => true,
                Some(current) => {
                    scaled.efficiency > current.efficiency
                        || (scaled.efficiency == current.efficiency
                            && scaled.starting_amount < current.starting_amount)
                }
            };
            if better {
                best = Some(scaled);
            }
        }

        results.extend(best);
    }
    results
}

/// Highest-efficiency scale across tiers.
pub fn best_scale(scales: &[ScaledResult]) -> Option<&ScaledResult> {
    scales.iter().max_by(|a, b| {
        a.efficiency
            .cmp(&b.efficiency)
            .then_with(|| b.starting_amount.cmp(&a.starting_amount))
    })
}

/// Inputs that determine a scale result, stored to detect stale entries.
type Fingerprint = SmallVec<[(Decimal, Tier, Tier); 3]>;

#[derive(Debug, Clone)]
struct CachedScales {
    fingerprint: Fingerprint,
    scales: Vec<ScaledResult>,
}

/// Optional cache of realistic scales keyed by `(opportunity id, currency id)`.
///
/// Entries remember the rates and tiers they were computed from and are
/// recomputed when those differ, so a hit always equals a fresh
/// [`simulate_realistic_scales_with`] call under the cache's plan.
#[derive(Debug, Default)]
pub struct ScaleCache {
    plan: ScalePlan,
    entries: DashMap<(OpportunityId, CurrencyId), CachedScales>,
}

impl ScaleCache {
    /// Cache using the default plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache using a custom plan.
    pub fn with_plan(plan: ScalePlan) -> Self {
        Self {
            plan,
            entries: DashMap::new(),
        }
    }

    /// Plan used for computations.
    pub fn plan(&self) -> &ScalePlan {
        &self.plan
    }

    /// Cached scales for an opportunity, computing them on a miss.
    pub fn get_or_compute(&self, opportunity: &Opportunity, tiers: &TierTable) -> Vec<ScaledResult> {
        let key = (opportunity.id.clone(), opportunity.starting_currency.clone());
        let fingerprint: Fingerprint = opportunity
            .steps
            .iter()
            .map(|s| {
                (
                    s.rate,
                    tiers.tier_of(s.from.as_str()),
                    tiers.tier_of(s.to.as_str()),
                )
            })
            .collect();

        if let Some(cached) = self.entries.get(&key) {
            if cached.fingerprint == fingerprint {
                metrics::inc_scale_cache_hits();
                return cached.scales.clone();
            }
        }

        let scales = simulate_realistic_scales_with(opportunity, tiers, &self.plan);
        self.entries.insert(
            key,
            CachedScales {
                fingerprint,
                scales: scales.clone(),
            },
        );
        scales
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }
}
