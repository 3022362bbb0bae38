//! Currency catalog: display names, popularity ranking and tier table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::types::{Currency, CurrencyId, Tier};

/// Minimum number of currencies kept by [`CurrencyCatalog::top_currencies`].
pub const MIN_TOP_CURRENCIES: usize = 10;
/// Maximum number of currencies kept by [`CurrencyCatalog::top_currencies`].
pub const MAX_TOP_CURRENCIES: usize = 50;
/// Hub currencies kept by [`CurrencyCatalog::top_currencies`] whatever their rank.
pub const DEFAULT_CORE_CURRENCIES: [&str; 3] = ["exalted", "divine", "chaos"];

/// Explicit `currency -> tier` table used by the realistic simulator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierTable {
    tiers: HashMap<CurrencyId, Tier>,
    #[serde(default)]
    default_tier: Tier,
}

impl TierTable {
    /// Create an empty table; unknown currencies fall back to [`Tier::Budget`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tier used for unknown currencies.
    pub fn with_default(mut self, tier: Tier) -> Self {
        self.default_tier = tier;
        self
    }

    /// Assign a tier to a currency.
    pub fn insert(&mut self, id: impl Into<CurrencyId>, tier: Tier) {
        self.tiers.insert(id.into(), tier);
    }

    /// Builder-style [`TierTable::insert`].
    pub fn with(mut self, id: impl Into<CurrencyId>, tier: Tier) -> Self {
        self.insert(id, tier);
        self
    }

    /// Tier for a currency.
    pub fn tier_of(&self, id: &str) -> Tier {
        self.tiers.get(id).copied().unwrap_or(self.default_tier)
    }

    /// Number of explicit entries.
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    /// Whether the table has no explicit entries.
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

/// Catalog of known currencies as supplied by the catalog collaborator.
#[derive(Debug, Clone)]
pub struct CurrencyCatalog {
    currencies: Vec<Currency>,
    index: HashMap<CurrencyId, usize>,
    core: Vec<CurrencyId>,
}

impl Default for CurrencyCatalog {
    fn default() -> Self {
        Self {
            currencies: Vec::new(),
            index: HashMap::new(),
            core: DEFAULT_CORE_CURRENCIES
                .iter()
                .map(|id| CurrencyId::new(*id))
                .collect(),
        }
    }
}

impl CurrencyCatalog {
    /// Build a catalog with the default core currencies.
    /// Later duplicates replace earlier entries.
    pub fn new(currencies: impl IntoIterator<Item = Currency>) -> Self {
        let mut catalog = Self::default();
        for currency in currencies {
            match catalog.index.get(&currency.id) {
                Some(&pos) => catalog.currencies[pos] = currency,
                None => {
                    catalog
                        .index
                        .insert(currency.id.clone(), catalog.currencies.len());
                    catalog.currencies.push(currency);
                }
            }
        }
        catalog
    }

    /// Replace the core currencies kept by [`CurrencyCatalog::top_currencies`].
    pub fn with_core_currencies(mut self, core: impl IntoIterator<Item = CurrencyId>) -> Self {
        self.core = core.into_iter().collect();
        self
    }

    /// Core currencies, in the order they are appended.
    pub fn core_currencies(&self) -> &[CurrencyId] {
        &self.core
    }

    /// Look up a currency.
    pub fn get(&self, id: &str) -> Option<&Currency> {
        self.index.get(id).map(|&pos| &self.currencies[pos])
    }

    /// All currencies in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &Currency> {
        self.currencies.iter()
    }

    /// Number of currencies.
    pub fn len(&self) -> usize {
        self.currencies.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
    }

    /// Display name for a currency, generated from the key when unknown.
    pub fn display_name(&self, id: &str) -> String {
        match self.get(id) {
            Some(currency) if !currency.name.trim().is_empty() => currency.name.clone(),
            _ => generate_display_name(id),
        }
    }

    /// Most popular currencies, keeping `top_percentage` of the catalog.
    ///
    /// The count is clamped to `[MIN_TOP_CURRENCIES, MAX_TOP_CURRENCIES]` and
    /// never exceeds the catalog size. Ties are broken by id. Core currencies
    /// present in the catalog are then appended if the cut dropped them.
    pub fn top_currencies(&self, top_percentage: f64) -> Vec<CurrencyId> {
        let mut ranked: Vec<&Currency> = self.currencies.iter().collect();
        ranked.sort_by(|a, b| {
            b.popularity_score()
                .total_cmp(&a.popularity_score())
                .then_with(|| a.id.cmp(&b.id))
        });

        let total = ranked.len();
        let wanted = (total as f64 * top_percentage.clamp(0.0, 1.0)).floor() as usize;
        let target = wanted
            .max(MIN_TOP_CURRENCIES)
            .min(MAX_TOP_CURRENCIES)
            .min(total);

        let mut top: Vec<CurrencyId> = ranked
            .into_iter()
            .take(target)
            .map(|c| c.id.clone())
            .collect();

        for core in &self.core {
            if self.index.contains_key(core) && !top.contains(core) {
                top.push(core.clone());
            }
        }
        top
    }

    /// Explicit tier table from catalog entries that carry a tier.
    pub fn tier_table(&self) -> TierTable {
        let mut table = TierTable::new();
        for currency in &self.currencies {
            if let Some(tier) = currency.tier {
                table.insert(currency.id.clone(), tier);
            }
        }
        table
    }
}

/// Turn a snake_case key into a Title Case display name.
pub fn generate_display_name(key: &str) -> String {
    let name = key
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let lower = word.to_lowercase();
            if matches!(lower.as_str(), "of" | "the" | "and") {
                return lower;
            }
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    // "Dextral Omen Exaltation" reads as "Dextral Omen of Exaltation".
    if !name.ends_with(" Orb") && !name.starts_with("Omen") && name.to_lowercase().contains("omen")
    {
        return name.replace("Omen ", "Omen of ");
    }
    name
}
