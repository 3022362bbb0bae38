//! Rate snapshots and the suppliers that produce them.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{debug, instrument};

use super::catalog::CurrencyCatalog;
use super::types::Currency;
use crate::error::SnapshotError;
use crate::rates::RateEntry;

/// Metadata describing where and when a snapshot was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// Data source (e.g. "poe2scout", "sample").
    pub source: String,
    /// League / market identifier.
    pub league: String,
    /// Game identifier.
    #[serde(default = "default_game")]
    pub game: String,
    /// When the rates were fetched.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub fetched_at: Option<OffsetDateTime>,
    /// How long the snapshot stays fresh.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
}

fn default_game() -> String {
    "poe2".to_string()
}

fn default_ttl_seconds() -> u64 {
    300
}

impl SnapshotMetadata {
    /// Create metadata fetched now with the default TTL.
    pub fn new(source: impl Into<String>, league: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            league: league.into(),
            game: default_game(),
            fetched_at: Some(OffsetDateTime::now_utc()),
            ttl_seconds: default_ttl_seconds(),
        }
    }

    /// Override the TTL.
    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    /// Whether the snapshot is stale at `now`. Missing fetch time counts as stale.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        match self.fetched_at {
            Some(fetched_at) => {
                let ttl = Duration::seconds(i64::try_from(self.ttl_seconds).unwrap_or(i64::MAX));
                now - fetched_at > ttl
            }
            None => true,
        }
    }

    /// Whether the snapshot is stale right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }
}

/// A timestamped set of observed rates plus the currency catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot metadata.
    pub metadata: SnapshotMetadata,
    /// Observed directed rates.
    pub rates: Vec<RateEntry>,
    /// Currency descriptors.
    #[serde(default)]
    pub currencies: Vec<Currency>,
}

impl Snapshot {
    /// Currency catalog built from this snapshot.
    pub fn catalog(&self) -> CurrencyCatalog {
        CurrencyCatalog::new(self.currencies.iter().cloned())
    }
}

/// Produces rate snapshots. How they are obtained is up to the implementor.
pub trait SnapshotSupplier {
    /// Produce the current snapshot.
    fn snapshot(&self) -> Result<Snapshot, SnapshotError>;
}

/// Reads a snapshot from a JSON document on disk.
#[derive(Debug, Clone)]
pub struct FileSnapshotSupplier {
    path: PathBuf,
}

impl FileSnapshotSupplier {
    /// Create a supplier reading from `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path this supplier reads.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotSupplier for FileSnapshotSupplier {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn snapshot(&self) -> Result<Snapshot, SnapshotError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| SnapshotError::Read {
            path: self.path.display().to_string(),
            source,
        })?;
        let snapshot: Snapshot = serde_json::from_str(&raw)?;
        debug!(
            rates = snapshot.rates.len(),
            currencies = snapshot.currencies.len(),
            "Snapshot loaded"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn metadata_expires_after_ttl() {
        let metadata = SnapshotMetadata {
            source: "test".to_string(),
            league: "Standard".to_string(),
            game: default_game(),
            fetched_at: Some(datetime!(2025-09-12 12:00 UTC)),
            ttl_seconds: 300,
        };

        assert!(!metadata.is_expired_at(datetime!(2025-09-12 12:04 UTC)));
        assert!(!metadata.is_expired_at(datetime!(2025-09-12 12:05 UTC)));
        assert!(metadata.is_expired_at(datetime!(2025-09-12 12:05:01 UTC)));
    }

    #[test]
    fn metadata_without_fetch_time_is_expired() {
        let mut metadata = SnapshotMetadata::new("test", "Standard");
        metadata.fetched_at = None;
        assert!(metadata.is_expired());
    }

    #[test]
    fn snapshot_parses_with_defaults() {
        let json = r#"{
            "metadata": {"source": "poe2scout", "league": "Standard",
                         "fetched_at": "2025-09-12T12:00:00Z"},
            "rates": [{"from": "divine", "to": "exalted", "rate": 139.48}]
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();

        assert_eq!(snapshot.metadata.game, "poe2");
        assert_eq!(snapshot.metadata.ttl_seconds, 300);
        assert_eq!(snapshot.rates.len(), 1);
        assert!(snapshot.currencies.is_empty());
    }

    #[test]
    fn file_supplier_reports_missing_file() {
        let supplier = FileSnapshotSupplier::new("/definitely/not/here.json");
        assert!(matches!(
            supplier.snapshot(),
            Err(SnapshotError::Read { .. })
        ));
    }

    #[test]
    fn file_supplier_reads_json() {
        let path = std::env::temp_dir().join(format!(
            "currency-arb-snapshot-{}.json",
            std::process::id()
        ));
        let json = r#"{
            "metadata": {"source": "file", "league": "Standard"},
            "rates": [{"from": "chaos", "to": "exalted", "rate": 4.48}],
            "currencies": [{"id": "chaos", "name": "Chaos Orb", "tier": "moderate"}]
        }"#;
        std::fs::write(&path, json).unwrap();

        let snapshot = FileSnapshotSupplier::new(&path).snapshot().unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(snapshot.metadata.source, "file");
        assert_eq!(snapshot.catalog().display_name("chaos"), "Chaos Orb");
    }
}
