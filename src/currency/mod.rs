//! Currency module for the exchange data collaborators.
//!
//! This module handles:
//! - Currency ids, descriptors and tiers
//! - The currency catalog (display names, popularity ranking, tier table)
//! - Rate snapshots and snapshot suppliers
//! - Built-in sample market data

pub mod catalog;
pub mod sample;
pub mod snapshot;
pub mod types;

pub use catalog::{generate_display_name, CurrencyCatalog, TierTable};
pub use sample::{sample_snapshot, SampleSnapshotSupplier};
pub use snapshot::{FileSnapshotSupplier, Snapshot, SnapshotMetadata, SnapshotSupplier};
pub use types::{Currency, CurrencyId, Popularity, Tier};
