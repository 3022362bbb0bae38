//! Currency identifiers, descriptors and tiers.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique currency key (e.g. "divine", "exalted").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyId(String);

impl CurrencyId {
    /// Create a new currency id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the key is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for CurrencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CurrencyId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CurrencyId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CurrencyId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// How precious a currency is. Governs realistic rounding granularity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Tier {
    /// Rare, high-value currency traded in whole or half units.
    Premium,
    /// Mid-value currency.
    Moderate,
    /// Cheap, high-volume currency.
    #[default]
    Budget,
}

impl Tier {
    /// Whether this tier uses the premium rounding grid.
    pub fn is_premium(&self) -> bool {
        matches!(self, Tier::Premium)
    }
}

/// Trading popularity observed for a currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Popularity {
    /// Total traded volume across all pairs.
    #[serde(default)]
    pub total_volume: f64,
    /// Best (lowest) rank position in the exchange listing.
    #[serde(default)]
    pub best_position: u32,
    /// Number of pairs the currency appears in.
    #[serde(default)]
    pub pair_count: u32,
}

impl Popularity {
    /// Volume contribution is capped at 100 (one point per million traded).
    const MAX_VOLUME_SCORE: f64 = 100.0;

    /// Combined popularity score: higher volume and better rank score higher.
    pub fn score(&self) -> f64 {
        let volume_score = (self.total_volume / 1_000_000.0).min(Self::MAX_VOLUME_SCORE);
        let position_score = 100.0 - f64::from(self.best_position.min(100));
        volume_score + position_score
    }
}

/// Currency as described by the catalog collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    /// Unique key.
    pub id: CurrencyId,
    /// Display name (e.g. "Divine Orb").
    pub name: String,
    /// Optional popularity metadata.
    #[serde(default)]
    pub popularity: Option<Popularity>,
    /// Optional explicit tier.
    #[serde(default)]
    pub tier: Option<Tier>,
}

impl Currency {
    /// Create a currency with no metadata.
    pub fn new(id: impl Into<CurrencyId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            popularity: None,
            tier: None,
        }
    }

    /// Attach an explicit tier.
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }

    /// Attach popularity metadata.
    pub fn with_popularity(mut self, popularity: Popularity) -> Self {
        self.popularity = Some(popularity);
        self
    }

    /// Popularity score, zero when unknown.
    pub fn popularity_score(&self) -> f64 {
        self.popularity.map(|p| p.score()).unwrap_or(0.0)
    }
}
