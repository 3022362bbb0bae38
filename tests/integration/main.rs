//! End-to-end tests for the rate matrix and cycle search.
//!
//! These tests run offline against small hand-built quote sets and the
//! built-in sample snapshot.

use std::fs;

use currency_arb::arbitrage::{
    analyze_all_currencies, evaluate_path, find_opportunities, find_realistic_opportunities,
    simulate_realistic_scales, FinderConfig, ScaleCache,
};
use currency_arb::currency::{
    CurrencyId, FileSnapshotSupplier, SampleSnapshotSupplier, SnapshotSupplier, Tier, TierTable,
};
use currency_arb::error::ConfigError;
use currency_arb::rates::{RateEntry, RateMatrix};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn example_matrix() -> RateMatrix {
    RateMatrix::build(vec![
        RateEntry::new("a", "b", 2.0),
        RateEntry::new("b", "c", 3.0),
        RateEntry::new("c", "a", 0.2),
    ])
    .matrix
}

fn config_from(start: &str) -> FinderConfig {
    FinderConfig::new(start)
        .with_amount(dec!(10))
        .with_min_profit(Decimal::ZERO)
}

#[test]
fn twenty_percent_cycle_is_reported() {
    let matrix = example_matrix();
    let found = find_opportunities(&matrix, &config_from("a")).unwrap();

    assert_eq!(found.len(), 1);
    let opp = &found[0];
    assert_eq!(opp.route_description(), "a → b → c → a");
    assert_eq!(opp.steps.len(), 3);
    assert_eq!(opp.steps[0].amount_after, dec!(20));
    assert_eq!(opp.steps[1].amount_after, dec!(60));
    assert_eq!(opp.final_amount, dec!(12));
    assert_eq!(opp.profit_amount, dec!(2));
    assert_eq!(opp.profit_percentage, dec!(20));
}

#[test]
fn threshold_equal_to_profit_keeps_cycle() {
    let matrix = example_matrix();
    let config = config_from("a").with_min_profit(dec!(20));

    let found = find_opportunities(&matrix, &config).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id.as_str(), "a>b>c");
}

#[test]
fn twenty_five_percent_threshold_excludes_cycle() {
    let matrix = example_matrix();
    let config = config_from("a").with_min_profit(dec!(25));

    assert!(find_opportunities(&matrix, &config).unwrap().is_empty());
}

#[test]
fn missing_edges_are_skipped_silently() {
    let matrix = RateMatrix::builder()
        .derive_transitive(false)
        .build(vec![
            RateEntry::new("a", "b", 2.0),
            RateEntry::new("b", "c", 3.0),
            RateEntry::new("c", "a", 0.2),
            RateEntry::new("a", "d", 1.5),
        ])
        .matrix;

    // Every route through d lacks a hop; the search still succeeds.
    let found = find_opportunities(&matrix, &config_from("a")).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id.as_str(), "a>b>c");
}

#[test]
fn overflowing_cycles_are_skipped_not_fatal() {
    let matrix = RateMatrix::build(vec![
        RateEntry::new("a", "b", 1e9),
        RateEntry::new("b", "c", 1e9),
        RateEntry::new("c", "a", 1e9),
    ])
    .matrix;
    let config = FinderConfig::new("a").with_amount(dec!(0.00001));

    let found = find_opportunities(&matrix, &config).unwrap();
    assert!(found.iter().all(|o| o.id.as_str() != "a>b>c"));

    let report = analyze_all_currencies(&matrix, &config);
    assert_eq!(report.by_currency.len(), 3);
    assert!(report.failures.is_empty());
}

#[test]
fn unknown_start_is_invalid_configuration() {
    let matrix = example_matrix();
    let err = find_opportunities(&matrix, &config_from("zzz")).unwrap_err();

    assert_eq!(err, ConfigError::UnknownCurrency(CurrencyId::new("zzz")));
}

#[test]
fn inverse_law_holds_for_every_synthesized_edge() {
    let snapshot = SampleSnapshotSupplier::new().snapshot().unwrap();
    let matrix = RateMatrix::builder()
        .derive_transitive(false)
        .build(snapshot.rates)
        .matrix;

    for from in matrix.currencies() {
        for to in matrix.currencies() {
            let (Some(forward), Some(backward)) = (
                matrix.edge(from.as_str(), to.as_str()),
                matrix.edge(to.as_str(), from.as_str()),
            ) else {
                continue;
            };
            if forward.is_derived() {
                assert_eq!(forward.value, Decimal::ONE / backward.value);
            }
        }
    }
    assert_eq!(matrix.rate("divine", "divine").unwrap(), Decimal::ONE);
}

#[test]
fn sample_snapshot_search_is_bounded_sorted_and_deterministic() {
    let snapshot = SampleSnapshotSupplier::new().snapshot().unwrap();
    let matrix = RateMatrix::build(snapshot.rates).matrix;
    let config = FinderConfig::new("divine").with_max_results(5);

    let first = find_opportunities(&matrix, &config).unwrap();
    let second = find_opportunities(&matrix, &config).unwrap();
    assert_eq!(first, second);

    assert!(!first.is_empty());
    assert!(first.len() <= 5);
    for pair in first.windows(2) {
        assert!(pair[0].profit_percentage >= pair[1].profit_percentage);
    }
    for opp in &first {
        assert_eq!(opp.starting_currency.as_str(), "divine");
        assert!(opp.profit_percentage >= config.min_profit_percentage);
        assert_eq!(opp.steps.first().unwrap().from.as_str(), "divine");
        assert_eq!(opp.steps.last().unwrap().to.as_str(), "divine");
    }
}

#[test]
fn sample_divine_exalted_chaos_loop_is_profitable() {
    let snapshot = SampleSnapshotSupplier::new().snapshot().unwrap();
    let matrix = RateMatrix::build(snapshot.rates).matrix;
    let config = FinderConfig::new("divine").with_max_results(100);

    let found = find_opportunities(&matrix, &config).unwrap();
    let opp = found
        .iter()
        .find(|o| o.id.as_str() == "divine>exalted>chaos")
        .unwrap();

    // 139.48 / 4.48 / 29.82 ≈ 1.0441
    assert!(opp.profit_percentage > dec!(4.3) && opp.profit_percentage < dec!(4.5));
    assert!(opp.uses_derived_rates);

    let path: Vec<CurrencyId> = ["divine", "exalted", "chaos", "divine"]
        .into_iter()
        .map(CurrencyId::new)
        .collect();
    let path: Vec<&CurrencyId> = path.iter().collect();
    let replayed = evaluate_path(&matrix, &path, config.starting_amount, Decimal::ZERO).unwrap();
    assert_eq!(replayed.final_amount, opp.final_amount);
}

#[test]
fn slippage_lowers_every_opportunity() {
    let matrix = example_matrix();
    let clean = find_opportunities(&matrix, &config_from("a")).unwrap();
    let slipped =
        find_opportunities(&matrix, &config_from("a").with_slippage(dec!(0.01))).unwrap();

    assert_eq!(slipped.len(), 1);
    assert!(slipped[0].profit_percentage < clean[0].profit_percentage);
}

#[test]
fn realistic_search_drops_cycles_that_round_away() {
    // b is so expensive that no planned amount of a buys a quarter unit.
    let matrix = RateMatrix::build(vec![
        RateEntry::new("a", "b", 0.0001),
        RateEntry::new("b", "c", 20000.0),
        RateEntry::new("c", "a", 0.6),
    ])
    .matrix;
    let config = config_from("a");

    let theoretical = find_opportunities(&matrix, &config).unwrap();
    assert_eq!(theoretical.len(), 1);
    assert!(simulate_realistic_scales(&theoretical[0], &TierTable::new()).is_empty());

    let cache = ScaleCache::new();
    let realistic =
        find_realistic_opportunities(&matrix, &config, &TierTable::new(), &cache).unwrap();
    assert!(realistic.is_empty());
}

#[test]
fn realistic_scales_respect_currency_tiers() {
    let matrix = example_matrix();
    let opp = find_opportunities(&matrix, &config_from("a"))
        .unwrap()
        .remove(0);
    let tiers = TierTable::new().with("a", Tier::Premium);

    let scales = simulate_realistic_scales(&opp, &tiers);
    assert!(!scales.is_empty());
    for scale in &scales {
        assert!(scale.profit_amount > Decimal::ZERO);
        // Premium amounts from 1 trade in half units.
        assert_eq!(scale.starting_amount % dec!(0.5), Decimal::ZERO);
        assert_eq!(scale.final_amount % dec!(0.5), Decimal::ZERO);
    }

    let cache = ScaleCache::new();
    assert_eq!(cache.get_or_compute(&opp, &tiers), scales);
    assert_eq!(cache.get_or_compute(&opp, &tiers), scales);
}

#[test]
fn all_trades_covers_every_currency() {
    let snapshot = SampleSnapshotSupplier::new().snapshot().unwrap();
    let matrix = RateMatrix::build(snapshot.rates).matrix;
    let report = analyze_all_currencies(&matrix, &FinderConfig::new("unused"));

    assert_eq!(report.by_currency.len(), matrix.currencies().len());
    assert!(report.failures.is_empty());
    assert_eq!(report.summary.total_opportunities, report.opportunities.len());
    for pair in report.opportunities.windows(2) {
        assert!(pair[0].profit_percentage >= pair[1].profit_percentage);
    }
}

#[test]
fn file_snapshot_drives_a_search() {
    let dir = std::env::temp_dir().join(format!("currency-arb-it-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("snapshot.json");
    fs::write(
        &path,
        r#"{
            "metadata": {"source": "file", "league": "Standard",
                         "fetched_at": "2025-09-12T12:00:00Z"},
            "rates": [
                {"from": "a", "to": "b", "rate": 2.0},
                {"from": "b", "to": "c", "rate": 3.0},
                {"from": "c", "to": "a", "rate": 0.2},
                {"from": "c", "to": "", "rate": 1.0}
            ],
            "currencies": [
                {"id": "a", "name": "Alpha Orb", "tier": "premium"}
            ]
        }"#,
    )
    .unwrap();

    let snapshot = FileSnapshotSupplier::new(&path).snapshot().unwrap();
    assert!(snapshot.metadata.is_expired());

    let report = RateMatrix::build(snapshot.rates.clone());
    assert_eq!(report.rejected.len(), 1);

    let found = find_opportunities(&report.matrix, &config_from("a")).unwrap();
    assert_eq!(
        found[0].path_description(&snapshot.catalog()),
        "Alpha Orb → B → C → Alpha Orb"
    );

    fs::remove_dir_all(&dir).ok();
}
