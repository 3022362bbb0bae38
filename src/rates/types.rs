//! Rate entries, stored rates and provenance.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::currency::CurrencyId;

/// One observed directed quote: 1 `from` buys `rate` `to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEntry {
    /// Currency paid.
    pub from: CurrencyId,
    /// Currency received.
    pub to: CurrencyId,
    /// Units of `to` per unit of `from`, as observed.
    pub rate: f64,
}

impl RateEntry {
    /// Create a rate entry.
    pub fn new(from: impl Into<CurrencyId>, to: impl Into<CurrencyId>, rate: f64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            rate,
        }
    }
}

/// Where a stored rate came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    /// Quoted directly by the exchange.
    Observed,
    /// `1 / r` of an observed opposite quote.
    Inverse,
    /// Product of two rates through one intermediate currency.
    Transitive {
        /// Intermediate currency.
        via: CurrencyId,
    },
}

impl Provenance {
    /// Whether the rate was synthesized rather than observed.
    pub fn is_derived(&self) -> bool {
        !matches!(self, Provenance::Observed)
    }

    /// Whether the rate was derived through an intermediate currency.
    pub fn is_transitive(&self) -> bool {
        matches!(self, Provenance::Transitive { .. })
    }
}

/// Stored rate with provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    /// Units of target per unit of source.
    pub value: Decimal,
    /// Where the value came from.
    pub provenance: Provenance,
}

impl Rate {
    /// An observed rate.
    pub fn observed(value: Decimal) -> Self {
        Self {
            value,
            provenance: Provenance::Observed,
        }
    }

    /// A synthesized inverse rate.
    pub fn inverse(value: Decimal) -> Self {
        Self {
            value,
            provenance: Provenance::Inverse,
        }
    }

    /// A rate derived through `via`.
    pub fn transitive(value: Decimal, via: CurrencyId) -> Self {
        Self {
            value,
            provenance: Provenance::Transitive { via },
        }
    }

    /// Whether the rate was synthesized.
    pub fn is_derived(&self) -> bool {
        self.provenance.is_derived()
    }
}

/// Price of one currency expressed in a base currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    /// Priced currency.
    pub currency: CurrencyId,
    /// Units of base per unit of `currency`, `None` when unresolvable.
    pub price: Option<Decimal>,
    /// Whether the price relies on a synthesized rate.
    pub derived: bool,
}
