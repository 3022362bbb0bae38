//! Cycle simulation and profit calculations.

use std::cmp::Ordering;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::currency::{CurrencyCatalog, CurrencyId};
use crate::rates::{Rate, RateMatrix};

/// Deterministic opportunity identifier: the route ids joined by `>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpportunityId(String);

impl OpportunityId {
    /// Identifier for a route (without the closing currency).
    pub fn from_route<'a>(route: impl IntoIterator<Item = &'a CurrencyId>) -> Self {
        let parts: Vec<&str> = route.into_iter().map(CurrencyId::as_str).collect();
        Self(parts.join(">"))
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OpportunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One simulated conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeStep {
    /// Currency paid.
    pub from: CurrencyId,
    /// Currency received.
    pub to: CurrencyId,
    /// Rate applied (effective after slippage, or achieved after rounding).
    pub rate: Decimal,
    /// Amount paid.
    pub amount_before: Decimal,
    /// Amount received.
    pub amount_after: Decimal,
}

/// Steps of a cycle. Cycles are 2-3 hops.
pub type Steps = SmallVec<[TradeStep; 3]>;

/// A cycle back to the starting currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opportunity {
    /// Route identifier.
    pub id: OpportunityId,
    /// Currency the cycle starts and ends in.
    pub starting_currency: CurrencyId,
    /// Amount invested.
    pub starting_amount: Decimal,
    /// Amount after the last hop.
    pub final_amount: Decimal,
    /// `final_amount - starting_amount`.
    pub profit_amount: Decimal,
    /// `profit_amount / starting_amount * 100`.
    pub profit_percentage: Decimal,
    /// Simulated hops.
    pub steps: Steps,
    /// Whether any hop used a synthesized rate.
    pub uses_derived_rates: bool,
}

impl Opportunity {
    /// Currencies visited, starting currency first, closing currency omitted.
    pub fn route(&self) -> impl Iterator<Item = &CurrencyId> {
        std::iter::once(&self.starting_currency).chain(
            self.steps
                .iter()
                .take(self.steps.len().saturating_sub(1))
                .map(|s| &s.to),
        )
    }

    /// Route as ids joined by arrows (e.g. "chaos → divine → exalted → chaos").
    pub fn route_description(&self) -> String {
        self.describe(|id| id.to_string())
    }

    /// Route as display names joined by arrows.
    pub fn path_description(&self, catalog: &CurrencyCatalog) -> String {
        self.describe(|id| catalog.display_name(id.as_str()))
    }

    fn describe(&self, name: impl Fn(&CurrencyId) -> String) -> String {
        let mut parts = Vec::with_capacity(self.steps.len() + 1);
        parts.push(name(&self.starting_currency));
        parts.extend(self.steps.iter().map(|s| name(&s.to)));
        parts.join(" → ")
    }
}

/// Ranking order: profit percentage descending, then route ids ascending.
pub fn rank_order(a: &Opportunity, b: &Opportunity) -> Ordering {
    b.profit_percentage
        .cmp(&a.profit_percentage)
        .then_with(|| a.route().cmp(b.route()))
}

/// `(final - start) / start * 100`, zero for a zero start.
///
/// `None` when the result does not fit in a [`Decimal`].
pub fn profit_percentage(starting_amount: Decimal, final_amount: Decimal) -> Option<Decimal> {
    if starting_amount.is_zero() {
        return Some(Decimal::ZERO);
    }
    final_amount
        .checked_sub(starting_amount)?
        .checked_div(starting_amount)?
        .checked_mul(Decimal::ONE_HUNDRED)
}

/// Simulate a closed route (`path[0] == path[last]`) through resolved rates.
///
/// `resolve` returns the usable edge for a hop, or `None` to prune the
/// route. Slippage is applied as `rate * (1 - slippage)` per hop. Returns
/// `None` when a hop is missing or any amount or percentage overflows.
pub fn simulate_cycle<'m>(
    path: &[&CurrencyId],
    starting_amount: Decimal,
    slippage_per_hop: Decimal,
    resolve: impl Fn(&CurrencyId, &CurrencyId) -> Option<&'m Rate>,
) -> Option<Opportunity> {
    if path.len() < 3 || path.first() != path.last() {
        return None;
    }

    let haircut = Decimal::ONE - slippage_per_hop;
    let mut steps = Steps::new();
    let mut uses_derived_rates = false;
    let mut amount = starting_amount;

    for hop in path.windows(2) {
        let (from, to) = (hop[0], hop[1]);
        let rate = resolve(from, to)?;
        uses_derived_rates |= rate.is_derived();

        let effective_rate = rate.value.checked_mul(haircut)?;
        let amount_after = amount.checked_mul(effective_rate)?;
        steps.push(TradeStep {
            from: from.clone(),
            to: to.clone(),
            rate: effective_rate,
            amount_before: amount,
            amount_after,
        });
        amount = amount_after;
    }

    let profit_amount = amount.checked_sub(starting_amount)?;
    let profit_percentage = profit_percentage(starting_amount, amount)?;

    let starting_currency = path[0].clone();
    Some(Opportunity {
        id: OpportunityId::from_route(path[..path.len() - 1].iter().copied()),
        starting_currency,
        starting_amount,
        final_amount: amount,
        profit_amount,
        profit_percentage,
        steps,
        uses_derived_rates,
    })
}

/// Simulate a route using every edge the matrix holds.
pub fn evaluate_path(
    matrix: &RateMatrix,
    path: &[&CurrencyId],
    starting_amount: Decimal,
    slippage_per_hop: Decimal,
) -> Option<Opportunity> {
    simulate_cycle(path, starting_amount, slippage_per_hop, |from, to| {
        matrix.edge(from.as_str(), to.as_str())
    })
}

/// Summary statistics over a result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SummaryStats {
    /// Number of opportunities.
    pub total_opportunities: usize,
    /// Highest profit percentage.
    pub best_profit_percentage: Decimal,
    /// Mean profit percentage.
    pub average_profit_percentage: Decimal,
    /// Lowest profit percentage.
    pub worst_profit_percentage: Decimal,
    /// Sum of profit amounts (each in its own starting currency).
    pub total_profit_amount: Decimal,
}

impl SummaryStats {
    /// Compute statistics; all zeros for an empty slice.
    pub fn from_opportunities(opportunities: &[Opportunity]) -> Self {
        let Some(first) = opportunities.first() else {
            return Self::default();
        };

        let mut best = first.profit_percentage;
        let mut worst = first.profit_percentage;
        let mut sum_pct = Decimal::ZERO;
        let mut total_profit = Decimal::ZERO;

        for opp in opportunities {
            best = best.max(opp.profit_percentage);
            worst = worst.min(opp.profit_percentage);
            sum_pct = sum_pct.saturating_add(opp.profit_percentage);
            total_profit = total_profit.saturating_add(opp.profit_amount);
        }

        Self {
            total_opportunities: opportunities.len(),
            best_profit_percentage: best,
            average_profit_percentage: sum_pct / Decimal::from(opportunities.len()),
            worst_profit_percentage: worst,
            total_profit_amount: total_profit,
        }
    }
}
