//! Built-in sample market data for demos and tests.
//!
//! Rates are a snapshot of the Rise of the Abyssal currency exchange and are
//! only meant to exercise the search, not to reflect the current market.

use super::snapshot::{Snapshot, SnapshotMetadata, SnapshotSupplier};
use super::types::{Currency, Popularity, Tier};
use crate::error::SnapshotError;
use crate::rates::RateEntry;

/// `(id, display name, tier, best listing position)`.
const SAMPLE_CURRENCIES: &[(&str, &str, Tier, u32)] = &[
    ("exalted", "Exalted Orb", Tier::Budget, 1),
    ("divine", "Divine Orb", Tier::Premium, 2),
    ("chaos", "Chaos Orb", Tier::Moderate, 3),
    ("mirror", "Mirror of Kalandra", Tier::Premium, 4),
    ("perfect_exalted", "Perfect Exalted Orb", Tier::Premium, 5),
    ("orb_annulment", "Orb of Annulment", Tier::Moderate, 6),
    ("orb_chance", "Orb of Chance", Tier::Moderate, 7),
    ("perfect_chaos", "Perfect Chaos Orb", Tier::Premium, 8),
    ("fracturing_orb", "Fracturing Orb", Tier::Moderate, 9),
    ("greater_exalted", "Greater Exalted Orb", Tier::Moderate, 10),
    ("perfect_jeweller", "Perfect Jeweller's Orb", Tier::Premium, 11),
    ("uncut_gem_20", "Uncut Skill Gem (Level 20)", Tier::Premium, 12),
    ("omen_light", "Omen of Light", Tier::Premium, 13),
    ("omen_homogenising", "Omen of Homogenising Exaltation", Tier::Premium, 14),
    ("omen_abyssal", "Omen of Abyssal Echoes", Tier::Moderate, 15),
    ("omen_whittling", "Omen of Whittling", Tier::Premium, 16),
    ("omen_chaotic", "Omen of Chaotic Rarity", Tier::Moderate, 17),
    ("omen_amelioration", "Omen of Amelioration", Tier::Moderate, 18),
    ("rakiata_flow", "Rakiata's Flow", Tier::Premium, 19),
    ("talisman_sirrius", "Talisman of Sirrius", Tier::Premium, 20),
    ("hinekora_lock", "Hinekora's Lock", Tier::Premium, 21),
    ("farrul_rune", "Farrul's Rune of the Chase", Tier::Premium, 22),
    ("atalui_bloodletting", "Atalui's Bloodletting", Tier::Premium, 23),
];

/// Observed `(from, to, rate)` quotes.
const SAMPLE_RATES: &[(&str, &str, f64)] = &[
    ("divine", "exalted", 139.48),
    ("divine", "chaos", 29.82),
    ("chaos", "exalted", 4.48),
    ("mirror", "divine", 613.20),
    ("perfect_exalted", "exalted", 298.82),
    ("perfect_exalted", "divine", 2.29),
    ("orb_annulment", "exalted", 38.12),
    ("orb_annulment", "divine", 0.28),
    ("orb_chance", "exalted", 9.67),
    ("perfect_chaos", "exalted", 207.44),
    ("fracturing_orb", "exalted", 48.47),
    ("greater_exalted", "exalted", 3.61),
    ("perfect_jeweller", "exalted", 41.07),
    ("uncut_gem_20", "exalted", 213.81),
    ("omen_light", "exalted", 312.76),
    ("omen_light", "divine", 2.39),
    ("omen_homogenising", "exalted", 117.74),
    ("omen_homogenising", "divine", 0.84),
    ("omen_abyssal", "exalted", 46.19),
    ("omen_whittling", "exalted", 154.76),
    ("omen_whittling", "divine", 1.17),
    ("omen_chaotic", "exalted", 25.64),
    ("omen_amelioration", "exalted", 18.46),
    ("rakiata_flow", "divine", 23.51),
    ("talisman_sirrius", "divine", 12.45),
    ("hinekora_lock", "divine", 78.16),
    ("farrul_rune", "divine", 11.52),
    ("farrul_rune", "exalted", 1504.13),
    ("atalui_bloodletting", "divine", 11.69),
];

/// Supplies the built-in sample snapshot.
#[derive(Debug, Clone, Default)]
pub struct SampleSnapshotSupplier;

impl SampleSnapshotSupplier {
    /// Create the sample supplier.
    pub fn new() -> Self {
        Self
    }
}

impl SnapshotSupplier for SampleSnapshotSupplier {
    fn snapshot(&self) -> Result<Snapshot, SnapshotError> {
        Ok(sample_snapshot())
    }
}

/// The sample snapshot, fetched "now".
pub fn sample_snapshot() -> Snapshot {
    let pair_counts = |id: &str| {
        SAMPLE_RATES
            .iter()
            .filter(|(from, to, _)| *from == id || *to == id)
            .count() as u32
    };

    Snapshot {
        metadata: SnapshotMetadata::new("sample", "Rise of the Abyssal"),
        rates: SAMPLE_RATES
            .iter()
            .map(|&(from, to, rate)| RateEntry::new(from, to, rate))
            .collect(),
        currencies: SAMPLE_CURRENCIES
            .iter()
            .map(|&(id, name, tier, position)| {
                Currency::new(id, name)
                    .with_tier(tier)
                    .with_popularity(Popularity {
                        total_volume: 0.0,
                        best_position: position,
                        pair_count: pair_counts(id),
                    })
            })
            .collect(),
    }
}
