//! 3-hop cycle search over a rate matrix.

use std::collections::BTreeMap;

use rayon::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, info, instrument, warn};

use super::calculator::{rank_order, simulate_cycle, Opportunity, SummaryStats};
use super::simulator::{best_scale, ScaleCache, ScaledResult};
use crate::currency::{CurrencyId, TierTable};
use crate::error::ConfigError;
use crate::metrics;
use crate::rates::{Rate, RateMatrix};

/// Which matrix edges a cycle may use.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EdgePolicy {
    /// Only directly quoted rates.
    ObservedOnly,
    /// Quoted rates and their synthesized inverses.
    #[default]
    Direct,
    /// Any stored rate, including transitive ones.
    Any,
}

impl EdgePolicy {
    /// Whether a stored rate may be used as a hop.
    pub fn allows(&self, rate: &Rate) -> bool {
        match self {
            EdgePolicy::ObservedOnly => !rate.is_derived(),
            EdgePolicy::Direct => !rate.provenance.is_transitive(),
            EdgePolicy::Any => true,
        }
    }
}

/// Search parameters. Validated before any search work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinderConfig {
    /// Currency every cycle starts and ends in.
    pub starting_currency: CurrencyId,
    /// Amount invested.
    pub starting_amount: Decimal,
    /// Minimum profit percentage to report.
    pub min_profit_percentage: Decimal,
    /// Haircut applied to every hop's rate, in `[0, 1)`.
    pub slippage_per_hop: Decimal,
    /// Result cap.
    pub max_results: usize,
    /// Which edges cycles may use.
    pub edge_policy: EdgePolicy,
}

impl FinderConfig {
    /// Config with defaults: 100 units, 0.01% minimum, no slippage, 10 results.
    pub fn new(starting_currency: impl Into<CurrencyId>) -> Self {
        Self {
            starting_currency: starting_currency.into(),
            starting_amount: dec!(100),
            min_profit_percentage: dec!(0.01),
            slippage_per_hop: Decimal::ZERO,
            max_results: 10,
            edge_policy: EdgePolicy::default(),
        }
    }

    /// Set the starting amount.
    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.starting_amount = amount;
        self
    }

    /// Set the minimum profit percentage.
    pub fn with_min_profit(mut self, pct: Decimal) -> Self {
        self.min_profit_percentage = pct;
        self
    }

    /// Set the per-hop slippage.
    pub fn with_slippage(mut self, slippage: Decimal) -> Self {
        self.slippage_per_hop = slippage;
        self
    }

    /// Set the result cap.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Set the edge policy.
    pub fn with_edge_policy(mut self, policy: EdgePolicy) -> Self {
        self.edge_policy = policy;
        self
    }

    /// Same parameters for a different starting currency.
    pub fn for_currency(&self, starting_currency: CurrencyId) -> Self {
        Self {
            starting_currency,
            ..self.clone()
        }
    }

    /// Check parameters against the matrix.
    pub fn validate(&self, matrix: &RateMatrix) -> Result<(), ConfigError> {
        if !matrix.contains(self.starting_currency.as_str()) {
            return Err(ConfigError::UnknownCurrency(self.starting_currency.clone()));
        }
        if self.starting_amount <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveAmount(self.starting_amount));
        }
        if self.slippage_per_hop < Decimal::ZERO || self.slippage_per_hop >= Decimal::ONE {
            return Err(ConfigError::SlippageOutOfRange(self.slippage_per_hop));
        }
        if self.min_profit_percentage < Decimal::ZERO {
            return Err(ConfigError::MinProfitNegative(self.min_profit_percentage));
        }
        if self.max_results == 0 {
            return Err(ConfigError::ZeroMaxResults);
        }
        Ok(())
    }
}

/// Every qualifying cycle, ranked, untruncated. Config must be valid.
fn search(matrix: &RateMatrix, config: &FinderConfig) -> Vec<Opportunity> {
    let _timer = metrics::timer_opportunity_search();
    let start = &config.starting_currency;
    let others: Vec<&CurrencyId> = matrix.currencies().iter().filter(|c| *c != start).collect();

    let resolve = |from: &CurrencyId, to: &CurrencyId| {
        matrix
            .edge(from.as_str(), to.as_str())
            .filter(|rate| config.edge_policy.allows(rate))
    };

    let mut evaluated = 0u64;
    let mut pruned = 0u64;
    let mut found = Vec::new();

    for &b in &others {
        for &c in &others {
            if b == c {
                continue;
            }
            evaluated += 1;

            let path = [start, b, c, start];
            let Some(opportunity) =
                simulate_cycle(&path, config.starting_amount, config.slippage_per_hop, resolve)
            else {
                pruned += 1;
                continue;
            };

            if opportunity.profit_percentage >= config.min_profit_percentage {
                found.push(opportunity);
            }
        }
    }

    metrics::add_cycles_evaluated(evaluated);
    metrics::add_cycles_pruned(pruned);
    debug!(evaluated, pruned, profitable = found.len(), "Cycle enumeration finished");

    found.sort_by(rank_order);
    found
}

/// Ranked profitable 3-hop cycles from the configured starting currency.
///
/// Enumerates every ordered pair of distinct intermediate currencies.
/// Cycles with an unresolvable hop are skipped. Ties in profit percentage
/// are ordered by route ids. Never returns more than `max_results`.
#[instrument(skip(matrix, config), fields(start = %config.starting_currency))]
pub fn find_opportunities(
    matrix: &RateMatrix,
    config: &FinderConfig,
) -> Result<Vec<Opportunity>, ConfigError> {
    config.validate(matrix)?;

    let mut opportunities = search(matrix, config);
    opportunities.truncate(config.max_results);
    metrics::add_opportunities_found(opportunities.len() as u64);

    if let Some(best) = opportunities.first() {
        info!(
            count = opportunities.len(),
            best_profit_pct = %best.profit_percentage,
            best_route = %best.id,
            "Opportunities found"
        );
    } else {
        debug!("No opportunity meets the profit threshold");
    }

    Ok(opportunities)
}

/// The single most profitable cycle, if any.
pub fn find_best_opportunity(
    matrix: &RateMatrix,
    config: &FinderConfig,
) -> Result<Option<Opportunity>, ConfigError> {
    let config = config.clone().with_max_results(1);
    Ok(find_opportunities(matrix, &config)?.into_iter().next())
}

/// An opportunity that survives realistic rounding, with its best scales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealisticOpportunity {
    /// Theoretical opportunity.
    pub opportunity: Opportunity,
    /// Best viable scale per investment tier (never empty).
    pub scales: Vec<ScaledResult>,
}

impl RealisticOpportunity {
    /// Highest-efficiency scale.
    pub fn best_scale(&self) -> Option<&ScaledResult> {
        best_scale(&self.scales)
    }
}

/// Ranked opportunities that stay profitable with realistic amounts.
///
/// Opportunities with no viable scale are excluded before truncating to
/// `max_results`; the theoretical ranking is kept.
#[instrument(skip_all, fields(start = %config.starting_currency))]
pub fn find_realistic_opportunities(
    matrix: &RateMatrix,
    config: &FinderConfig,
    tiers: &TierTable,
    cache: &ScaleCache,
) -> Result<Vec<RealisticOpportunity>, ConfigError> {
    config.validate(matrix)?;

    let candidates = search(matrix, config);
    let total = candidates.len();
    let realistic: Vec<RealisticOpportunity> = candidates
        .into_iter()
        .filter_map(|opportunity| {
            let scales = cache.get_or_compute(&opportunity, tiers);
            if scales.is_empty() {
                debug!(route = %opportunity.id, "No viable realistic scale");
                None
            } else {
                Some(RealisticOpportunity {
                    opportunity,
                    scales,
                })
            }
        })
        .take(config.max_results)
        .collect();

    info!(
        theoretical = total,
        realistic = realistic.len(),
        "Realistic opportunities found"
    );
    Ok(realistic)
}

/// Results of searching from every currency.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AllTradesReport {
    /// Every currency's opportunities merged and ranked.
    pub opportunities: Vec<Opportunity>,
    /// Opportunities per starting currency.
    pub by_currency: BTreeMap<CurrencyId, Vec<Opportunity>>,
    /// Currencies whose search was rejected.
    pub failures: BTreeMap<CurrencyId, String>,
    /// Statistics over the merged list.
    pub summary: SummaryStats,
}

/// Search from every known currency in parallel and merge the results.
///
/// `template` supplies every parameter except the starting currency. A
/// failing currency contributes no results and is listed in `failures`.
#[instrument(skip_all, fields(currencies = matrix.currencies().len()))]
pub fn analyze_all_currencies(matrix: &RateMatrix, template: &FinderConfig) -> AllTradesReport {
    let starts: Vec<&CurrencyId> = matrix.currencies().iter().collect();

    let outcomes: Vec<(CurrencyId, Result<Vec<Opportunity>, ConfigError>)> = starts
        .par_iter()
        .map(|&start| {
            let config = template.for_currency(start.clone());
            (start.clone(), find_opportunities(matrix, &config))
        })
        .collect();

    let mut report = AllTradesReport::default();
    for (currency, outcome) in outcomes {
        match outcome {
            Ok(found) => {
                report.opportunities.extend(found.iter().cloned());
                report.by_currency.insert(currency, found);
            }
            Err(e) => {
                warn!(currency = %currency, error = %e, "Search rejected");
                report.failures.insert(currency.clone(), e.to_string());
                report.by_currency.insert(currency, Vec::new());
            }
        }
    }

    report.opportunities.sort_by(rank_order);
    report.summary = SummaryStats::from_opportunities(&report.opportunities);

    info!(
        total = report.opportunities.len(),
        failures = report.failures.len(),
        "All-currency analysis finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::RateEntry;
    use pretty_assertions::assert_eq;

    fn example_matrix() -> RateMatrix {
        RateMatrix::build(vec![
            RateEntry::new("a", "b", 2.0),
            RateEntry::new("b", "c", 3.0),
            RateEntry::new("c", "a", 0.2),
        ])
        .matrix
    }

    fn example_config() -> FinderConfig {
        FinderConfig::new("a")
            .with_amount(dec!(10))
            .with_min_profit(Decimal::ZERO)
    }

    #[test]
    fn validate_rejects_bad_parameters() {
        let matrix = example_matrix();

        assert_eq!(
            FinderConfig::new("zzz").validate(&matrix),
            Err(ConfigError::UnknownCurrency(CurrencyId::new("zzz")))
        );
        assert!(matches!(
            example_config().with_amount(Decimal::ZERO).validate(&matrix),
            Err(ConfigError::NonPositiveAmount(_))
        ));
        assert!(matches!(
            example_config().with_slippage(Decimal::ONE).validate(&matrix),
            Err(ConfigError::SlippageOutOfRange(_))
        ));
        assert!(matches!(
            example_config().with_slippage(dec!(-0.1)).validate(&matrix),
            Err(ConfigError::SlippageOutOfRange(_))
        ));
        assert!(matches!(
            example_config().with_min_profit(dec!(-1)).validate(&matrix),
            Err(ConfigError::MinProfitNegative(_))
        ));
        assert_eq!(
            example_config().with_max_results(0).validate(&matrix),
            Err(ConfigError::ZeroMaxResults)
        );
        assert!(example_config().validate(&matrix).is_ok());
    }

    #[test]
    fn finds_example_cycle() {
        let matrix = example_matrix();
        let found = find_opportunities(&matrix, &example_config()).unwrap();

        let best = &found[0];
        assert_eq!(best.id.as_str(), "a>b>c");
        assert_eq!(best.steps[0].amount_after, dec!(20));
        assert_eq!(best.steps[1].amount_after, dec!(60));
        assert_eq!(best.final_amount, dec!(12));
        assert_eq!(best.profit_percentage, dec!(20));
        // The reverse cycle loses money and is filtered by the 0% threshold.
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn threshold_is_inclusive() {
        let matrix = example_matrix();
        let config = example_config().with_min_profit(dec!(20));

        let found = find_opportunities(&matrix, &config).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].profit_percentage, dec!(20));
    }

    #[test]
    fn threshold_above_profit_excludes_cycle() {
        let matrix = example_matrix();
        let config = example_config().with_min_profit(dec!(25));

        assert!(find_opportunities(&matrix, &config).unwrap().is_empty());
    }

    #[test]
    fn edge_policy_filters_transitive_edges() {
        // a-b-c-d-a is a square of quotes: every triangle needs a transitive edge.
        let matrix = RateMatrix::build(vec![
            RateEntry::new("a", "b", 2.0),
            RateEntry::new("b", "c", 3.0),
            RateEntry::new("c", "d", 0.5),
            RateEntry::new("d", "a", 0.5),
        ])
        .matrix;
        let config = example_config();

        assert!(find_opportunities(&matrix, &config).unwrap().is_empty());

        let any = find_opportunities(&matrix, &config.clone().with_edge_policy(EdgePolicy::Any))
            .unwrap();
        assert_eq!(any[0].id.as_str(), "a>b>c");
        assert_eq!(any[0].profit_percentage, dec!(50));
        assert!(any.iter().all(|o| o.uses_derived_rates));
    }

    #[test]
    fn observed_only_policy_ignores_inverses() {
        let matrix = example_matrix();
        let config = example_config().with_edge_policy(EdgePolicy::ObservedOnly);

        let found = find_opportunities(&matrix, &config).unwrap();
        assert_eq!(found.len(), 1);
        assert!(!found[0].uses_derived_rates);
    }

    #[test]
    fn find_best_returns_top_result() {
        let matrix = example_matrix();
        let best = find_best_opportunity(&matrix, &example_config()).unwrap().unwrap();
        assert_eq!(best.id.as_str(), "a>b>c");

        let none = find_best_opportunity(&matrix, &example_config().with_min_profit(dec!(50)))
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn edge_policy_parses_from_config_strings() {
        use std::str::FromStr;
        assert_eq!(EdgePolicy::from_str("observed_only").unwrap(), EdgePolicy::ObservedOnly);
        assert_eq!(EdgePolicy::from_str("DIRECT").unwrap(), EdgePolicy::Direct);
        assert_eq!(EdgePolicy::from_str("any").unwrap(), EdgePolicy::Any);
    }

    #[test]
    fn analyze_all_merges_every_start() {
        let matrix = RateMatrix::build(vec![
            RateEntry::new("a", "b", 2.0),
            RateEntry::new("b", "c", 3.0),
            RateEntry::new("c", "a", 0.25),
        ])
        .matrix;
        let report = analyze_all_currencies(&matrix, &example_config());

        assert_eq!(report.by_currency.len(), 3);
        assert!(report.failures.is_empty());
        // The same profitable loop is found once from each rotation.
        assert_eq!(report.opportunities.len(), 3);
        let ids: Vec<&str> = report.opportunities.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["a>b>c", "b>c>a", "c>a>b"]);
        assert_eq!(report.summary.total_opportunities, 3);
    }

    #[test]
    fn analyze_all_records_failures() {
        let matrix = example_matrix();
        let report = analyze_all_currencies(&matrix, &example_config().with_amount(dec!(-5)));

        assert!(report.opportunities.is_empty());
        assert_eq!(report.failures.len(), 3);
    }

    #[test]
    fn realistic_search_keeps_viable_opportunities() {
        let matrix = example_matrix();
        let cache = ScaleCache::new();
        let found =
            find_realistic_opportunities(&matrix, &example_config(), &TierTable::new(), &cache)
                .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].opportunity.id.as_str(), "a>b>c");
        assert_eq!(found[0].scales.len(), 3);
        assert_eq!(cache.len(), 1);
    }
}
