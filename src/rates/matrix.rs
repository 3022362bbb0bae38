//! Rate matrix construction and queries.
//!
//! Construction ingests observed quotes, synthesizes inverses and derives
//! single-intermediate transitive rates. The resulting matrix is immutable;
//! a new snapshot produces a new matrix.
//!
//! Derived rates carry no explicit error bound. `1 / r` is rounded at the
//! 28 significant digits of [`Decimal`] and a transitive rate multiplies two
//! such values, so derived edges can differ from the "true" cross rate in the
//! last digits. Callers that care can inspect [`Rate::provenance`].

use std::collections::{BTreeSet, HashMap, HashSet};

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use super::types::{PriceQuote, Rate, RateEntry};
use crate::currency::{CurrencyId, SnapshotMetadata};
use crate::error::{IngestionError, NoRateError};
use crate::metrics;

/// Outcome of building a matrix: the matrix plus every discarded entry.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// The constructed matrix.
    pub matrix: RateMatrix,
    /// Entries that were rejected, with reasons.
    pub rejected: Vec<IngestionError>,
}

impl BuildReport {
    /// Whether every entry was accepted.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Builder for [`RateMatrix`].
#[derive(Debug, Clone)]
pub struct RateMatrixBuilder {
    allowed: Option<HashSet<CurrencyId>>,
    derive_transitive: bool,
    metadata: Option<SnapshotMetadata>,
}

impl Default for RateMatrixBuilder {
    fn default() -> Self {
        Self {
            allowed: None,
            derive_transitive: true,
            metadata: None,
        }
    }
}

impl RateMatrixBuilder {
    /// Create a builder with transitive derivation enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept rates between the given currencies.
    pub fn restrict_to(mut self, currencies: impl IntoIterator<Item = CurrencyId>) -> Self {
        self.allowed = Some(currencies.into_iter().collect());
        self
    }

    /// Enable or disable single-intermediate transitive derivation.
    pub fn derive_transitive(mut self, enabled: bool) -> Self {
        self.derive_transitive = enabled;
        self
    }

    /// Attach the snapshot metadata the entries came from.
    pub fn metadata(mut self, metadata: SnapshotMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Build from one base currency's price list.
    ///
    /// Each `(currency, rate)` means 1 `base` buys `rate` of `currency`.
    /// Entries for `base` itself are skipped. With transitive derivation
    /// enabled every listed pair becomes resolvable through `base`.
    pub fn build_from_base<I, K>(self, base: impl Into<CurrencyId>, base_rates: I) -> BuildReport
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<CurrencyId>,
    {
        let base = base.into();
        let entries: Vec<RateEntry> = base_rates
            .into_iter()
            .map(|(currency, rate)| (currency.into(), rate))
            .filter(|(currency, _)| *currency != base)
            .map(|(currency, rate)| RateEntry::new(base.clone(), currency, rate))
            .collect();
        self.build(entries)
    }

    /// Build the matrix. Invalid entries are reported, never fatal.
    #[instrument(skip_all, fields(transitive = self.derive_transitive))]
    pub fn build<I>(self, entries: I) -> BuildReport
    where
        I: IntoIterator<Item = RateEntry>,
    {
        let _timer = metrics::timer_matrix_build();

        let mut edges: HashMap<CurrencyId, HashMap<CurrencyId, Rate>> = HashMap::new();
        let mut currencies = BTreeSet::new();
        let mut rejected = Vec::new();

        for entry in entries {
            match self.validate(&entry) {
                Ok(value) => {
                    let previous = edges
                        .entry(entry.from.clone())
                        .or_default()
                        .insert(entry.to.clone(), Rate::observed(value));
                    if let Some(previous) = previous {
                        debug!(
                            from = %entry.from,
                            to = %entry.to,
                            old = %previous.value,
                            new = %value,
                            "Observed rate overwritten"
                        );
                    }
                    currencies.insert(entry.from);
                    currencies.insert(entry.to);
                }
                Err(e) => {
                    warn!(error = %e, "Rate rejected");
                    rejected.push(e);
                }
            }
        }

        let observed = edges.values().map(HashMap::len).sum::<usize>();
        let inverses = synthesize_inverses(&mut edges);
        let transitive = if self.derive_transitive {
            derive_transitive(&mut edges, &currencies)
        } else {
            0
        };

        metrics::add_rates_ingested(observed as u64);
        metrics::add_rates_rejected(rejected.len() as u64);
        metrics::add_rates_derived("inverse", inverses as u64);
        metrics::add_rates_derived("transitive", transitive as u64);

        info!(
            currencies = currencies.len(),
            observed,
            inverses,
            transitive,
            rejected = rejected.len(),
            "Rate matrix built"
        );

        BuildReport {
            matrix: RateMatrix {
                edges,
                currencies,
                metadata: self.metadata,
            },
            rejected,
        }
    }

    fn validate(&self, entry: &RateEntry) -> Result<Decimal, IngestionError> {
        if entry.from.is_blank() || entry.to.is_blank() {
            return Err(IngestionError::EmptyCurrency {
                from: entry.from.clone(),
                to: entry.to.clone(),
            });
        }

        if entry.from == entry.to {
            return Err(IngestionError::SelfLoop {
                currency: entry.from.clone(),
            });
        }

        if !entry.rate.is_finite() {
            return Err(IngestionError::NonFinite {
                from: entry.from.clone(),
                to: entry.to.clone(),
                rate: entry.rate,
            });
        }

        if entry.rate <= 0.0 {
            return Err(IngestionError::NonPositive {
                from: entry.from.clone(),
                to: entry.to.clone(),
                rate: entry.rate,
            });
        }

        if let Some(allowed) = &self.allowed {
            for id in [&entry.from, &entry.to] {
                if !allowed.contains(id) {
                    return Err(IngestionError::UnsupportedCurrency {
                        currency: id.clone(),
                    });
                }
            }
        }

        let value = Decimal::from_f64(entry.rate).ok_or_else(|| IngestionError::NonFinite {
            from: entry.from.clone(),
            to: entry.to.clone(),
            rate: entry.rate,
        })?;

        // Positive floats below the decimal resolution collapse to zero.
        if value <= Decimal::ZERO {
            return Err(IngestionError::NonPositive {
                from: entry.from.clone(),
                to: entry.to.clone(),
                rate: entry.rate,
            });
        }

        Ok(value)
    }
}

/// Add `1 / r` for every observed edge lacking an observed opposite.
fn synthesize_inverses(edges: &mut HashMap<CurrencyId, HashMap<CurrencyId, Rate>>) -> usize {
    let observed: Vec<(CurrencyId, CurrencyId, Decimal)> = edges
        .iter()
        .flat_map(|(from, row)| {
            row.iter()
                .map(move |(to, rate)| (from.clone(), to.clone(), rate.value))
        })
        .collect();

    let mut added = 0;
    for (from, to, value) in observed {
        let row = edges.entry(to).or_default();
        if row.contains_key(&from) {
            continue;
        }
        if let Some(inverse) = Decimal::ONE.checked_div(value) {
            row.insert(from, Rate::inverse(inverse));
            added += 1;
        }
    }
    added
}

/// Fill missing pairs through exactly one intermediate currency.
///
/// Only edges present before this pass are used as legs, so the result does
/// not depend on iteration order. Among candidate intermediates the one with
/// the fewest derived legs wins, then the smallest id.
fn derive_transitive(
    edges: &mut HashMap<CurrencyId, HashMap<CurrencyId, Rate>>,
    currencies: &BTreeSet<CurrencyId>,
) -> usize {
    let base = edges.clone();
    let leg = |from: &CurrencyId, to: &CurrencyId| base.get(from).and_then(|row| row.get(to));

    let mut added = 0;
    for a in currencies {
        for b in currencies {
            if a == b || leg(a, b).is_some() {
                continue;
            }

            let mut best: Option<(usize, &CurrencyId, Decimal)> = None;
            for m in currencies {
                if m == a || m == b {
                    continue;
                }
                let (Some(am), Some(mb)) = (leg(a, m), leg(m, b)) else {
                    continue;
                };
                let Some(value) = am.value.checked_mul(mb.value) else {
                    debug!(from = %a, to = %b, via = %m, "Transitive rate overflowed");
                    continue;
                };
                if value <= Decimal::ZERO {
                    continue;
                }
                let derived_legs = usize::from(am.is_derived()) + usize::from(mb.is_derived());
                if best.map_or(true, |(legs, _, _)| derived_legs < legs) {
                    best = Some((derived_legs, m, value));
                }
            }

            if let Some((_, via, value)) = best {
                edges
                    .entry(a.clone())
                    .or_default()
                    .insert(b.clone(), Rate::transitive(value, via.clone()));
                added += 1;
            }
        }
    }
    added
}

/// Immutable directed graph of resolvable conversion rates for one snapshot.
#[derive(Debug, Clone, Default)]
pub struct RateMatrix {
    edges: HashMap<CurrencyId, HashMap<CurrencyId, Rate>>,
    currencies: BTreeSet<CurrencyId>,
    metadata: Option<SnapshotMetadata>,
}

impl RateMatrix {
    /// Build a matrix with default settings.
    pub fn build<I>(entries: I) -> BuildReport
    where
        I: IntoIterator<Item = RateEntry>,
    {
        RateMatrixBuilder::new().build(entries)
    }

    /// Build a matrix with default settings from one base currency's price list.
    pub fn from_base<I, K>(base: impl Into<CurrencyId>, base_rates: I) -> BuildReport
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<CurrencyId>,
    {
        RateMatrixBuilder::new().build_from_base(base, base_rates)
    }

    /// Start configuring a matrix build.
    pub fn builder() -> RateMatrixBuilder {
        RateMatrixBuilder::new()
    }

    /// Units of `to` per unit of `from`. Identity for `from == to`.
    pub fn rate(&self, from: &str, to: &str) -> Result<Decimal, NoRateError> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        self.edge(from, to)
            .map(|r| r.value)
            .ok_or_else(|| NoRateError {
                from: CurrencyId::new(from),
                to: CurrencyId::new(to),
            })
    }

    /// Stored edge with provenance. Self pairs are never stored.
    pub fn edge(&self, from: &str, to: &str) -> Option<&Rate> {
        self.edges.get(from).and_then(|row| row.get(to))
    }

    /// Every currency seen in an accepted observation.
    pub fn currencies(&self) -> &BTreeSet<CurrencyId> {
        &self.currencies
    }

    /// Whether the currency is known.
    pub fn contains(&self, id: &str) -> bool {
        self.currencies.contains(id)
    }

    /// Convert `amount` of `from` into `to`.
    pub fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<Decimal, NoRateError> {
        let rate = self.rate(from, to)?;
        Ok(amount.saturating_mul(rate))
    }

    /// Price of every other currency in `base`, most valuable first.
    ///
    /// Currencies with no path to `base` are listed last with no price.
    pub fn price_table(&self, base: &str) -> Vec<PriceQuote> {
        let mut quotes: Vec<PriceQuote> = self
            .currencies
            .iter()
            .filter(|c| c.as_str() != base)
            .map(|c| {
                let edge = self.edge(c.as_str(), base);
                PriceQuote {
                    currency: c.clone(),
                    price: edge.map(|r| r.value),
                    derived: edge.is_some_and(Rate::is_derived),
                }
            })
            .collect();

        quotes.sort_by(|a, b| match (a.price, b.price) {
            (Some(pa), Some(pb)) => pb.cmp(&pa).then_with(|| a.currency.cmp(&b.currency)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.currency.cmp(&b.currency),
        });
        quotes
    }

    /// Total number of stored edges.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(HashMap::len).sum()
    }

    /// Number of synthesized edges.
    pub fn derived_edge_count(&self) -> usize {
        self.edges
            .values()
            .flat_map(HashMap::values)
            .filter(|r| r.is_derived())
            .count()
    }

    /// Snapshot metadata, when the builder was given one.
    pub fn metadata(&self) -> Option<&SnapshotMetadata> {
        self.metadata.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::types::Provenance;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn entry(from: &str, to: &str, rate: f64) -> RateEntry {
        RateEntry::new(from, to, rate)
    }

    #[test]
    fn base_price_list_resolves_every_pair() {
        let report = RateMatrix::from_base(
            "chaos",
            vec![("exalted", 4.0), ("divine", 0.25), ("chaos", 1.0)],
        );
        let matrix = report.matrix;

        assert!(report.rejected.is_empty());
        assert_eq!(matrix.currencies().len(), 3);
        assert_eq!(matrix.rate("chaos", "exalted").unwrap(), dec!(4));
        assert_eq!(matrix.rate("divine", "chaos").unwrap(), dec!(4));

        let cross = matrix.edge("exalted", "divine").unwrap();
        assert_eq!(cross.value, dec!(0.0625));
        assert_eq!(
            cross.provenance,
            Provenance::Transitive {
                via: CurrencyId::new("chaos")
            }
        );
        assert_eq!(matrix.rate("divine", "exalted").unwrap(), dec!(16));
    }

    #[test]
    fn synthesizes_exact_inverse() {
        let report = RateMatrix::build(vec![entry("a", "b", 2.0)]);
        let matrix = report.matrix;

        assert!(report.rejected.is_empty());
        assert_eq!(matrix.rate("a", "b").unwrap(), dec!(2));
        assert_eq!(matrix.rate("b", "a").unwrap(), Decimal::ONE / dec!(2));
        assert_eq!(matrix.edge("b", "a").unwrap().provenance, Provenance::Inverse);
    }

    #[test]
    fn observed_inverse_takes_precedence() {
        let matrix = RateMatrix::build(vec![entry("a", "b", 2.0), entry("b", "a", 0.4)]).matrix;

        assert_eq!(matrix.rate("b", "a").unwrap(), dec!(0.4));
        assert_eq!(matrix.edge("b", "a").unwrap().provenance, Provenance::Observed);
        assert_eq!(matrix.derived_edge_count(), 0);
    }

    #[test]
    fn later_observation_overwrites_earlier() {
        let matrix = RateMatrix::build(vec![entry("a", "b", 2.0), entry("a", "b", 4.0)]).matrix;
        assert_eq!(matrix.rate("a", "b").unwrap(), dec!(4));
        assert_eq!(matrix.rate("b", "a").unwrap(), dec!(0.25));
    }

    #[test]
    fn identity_is_never_stored() {
        let matrix = RateMatrix::build(vec![entry("a", "b", 2.0)]).matrix;

        assert!(matrix.edge("a", "a").is_none());
        assert_eq!(matrix.rate("a", "a").unwrap(), Decimal::ONE);
    }

    #[test]
    fn rejects_invalid_entries_without_aborting() {
        let report = RateMatrix::build(vec![
            entry("a", "b", 0.0),
            entry("a", "c", -1.0),
            entry("a", "d", f64::NAN),
            entry("a", "e", f64::INFINITY),
            entry("a", "a", 1.0),
            entry("", "b", 1.0),
            entry("b", "c", 3.0),
        ]);

        assert_eq!(report.rejected.len(), 6);
        assert!(matches!(report.rejected[0], IngestionError::NonPositive { .. }));
        assert!(matches!(report.rejected[1], IngestionError::NonPositive { .. }));
        assert!(matches!(report.rejected[2], IngestionError::NonFinite { .. }));
        assert!(matches!(report.rejected[3], IngestionError::NonFinite { .. }));
        assert!(matches!(report.rejected[4], IngestionError::SelfLoop { .. }));
        assert!(matches!(report.rejected[5], IngestionError::EmptyCurrency { .. }));

        let currencies: Vec<&str> = report.matrix.currencies().iter().map(|c| c.as_str()).collect();
        assert_eq!(currencies, vec!["b", "c"]);
    }

    #[test]
    fn derives_transitive_rate_through_intermediate() {
        let matrix = RateMatrix::build(vec![entry("a", "b", 2.0), entry("b", "c", 3.0)]).matrix;

        let edge = matrix.edge("a", "c").unwrap();
        assert_eq!(edge.value, dec!(6));
        assert_eq!(
            edge.provenance,
            Provenance::Transitive {
                via: CurrencyId::new("b")
            }
        );
        assert!(matrix.edge("c", "a").unwrap().provenance.is_transitive());
    }

    #[test]
    fn transitive_prefers_observed_legs() {
        // a->z->c is fully observed; a->m->c needs the synthesized m->c leg.
        let matrix = RateMatrix::build(vec![
            entry("a", "m", 2.0),
            entry("c", "m", 4.0),
            entry("a", "z", 5.0),
            entry("z", "c", 7.0),
        ])
        .matrix;

        let edge = matrix.edge("a", "c").unwrap();
        assert_eq!(edge.value, dec!(35));
        assert_eq!(
            edge.provenance,
            Provenance::Transitive {
                via: CurrencyId::new("z")
            }
        );
    }

    #[test]
    fn transitive_can_be_disabled() {
        let matrix = RateMatrix::builder()
            .derive_transitive(false)
            .build(vec![entry("a", "b", 2.0), entry("b", "c", 3.0)])
            .matrix;

        assert!(matrix.edge("a", "c").is_none());
        assert!(matches!(matrix.rate("a", "c"), Err(NoRateError { .. })));
    }

    #[test]
    fn disconnected_pairs_stay_absent() {
        let matrix = RateMatrix::build(vec![entry("a", "b", 2.0), entry("c", "d", 3.0)]).matrix;

        let err = matrix.rate("a", "d").unwrap_err();
        assert_eq!(err.from, CurrencyId::new("a"));
        assert_eq!(err.to, CurrencyId::new("d"));
    }

    #[test]
    fn restricted_builder_rejects_unsupported_currencies() {
        let report = RateMatrix::builder()
            .restrict_to(vec![CurrencyId::new("a"), CurrencyId::new("b")])
            .build(vec![entry("a", "b", 2.0), entry("a", "x", 3.0)]);

        assert_eq!(
            report.rejected,
            vec![IngestionError::UnsupportedCurrency {
                currency: CurrencyId::new("x")
            }]
        );
        assert!(!report.matrix.contains("x"));
    }

    #[test]
    fn convert_uses_resolved_rate() {
        let matrix = RateMatrix::build(vec![entry("chaos", "exalted", 4.0)]).matrix;

        assert_eq!(matrix.convert(dec!(10), "chaos", "exalted").unwrap(), dec!(40));
        assert_eq!(matrix.convert(dec!(10), "exalted", "chaos").unwrap(), dec!(2.5));
    }

    #[test]
    fn price_table_sorts_by_price_and_lists_unpriced_last() {
        let matrix = RateMatrix::builder()
            .derive_transitive(false)
            .build(vec![
                entry("divine", "exalted", 100.0),
                entry("chaos", "exalted", 4.0),
                entry("x", "y", 2.0),
            ])
            .matrix;

        let table = matrix.price_table("exalted");
        let order: Vec<&str> = table.iter().map(|q| q.currency.as_str()).collect();

        assert_eq!(order, vec!["divine", "chaos", "x", "y"]);
        assert_eq!(table[0].price, Some(dec!(100)));
        assert!(!table[0].derived);
        assert_eq!(table[2].price, None);
    }
}
