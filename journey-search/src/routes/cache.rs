//! Disk-based cache for the interchange matrix.
//!
//! Building the matrix is quadratic in the number of routes, so a built
//! matrix is saved alongside the list of routes it was built for and reused
//! while that list is unchanged.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use fixedbitset::FixedBitSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::MatrixError;
use super::{RouteCostMatrix, RouteIndex};

/// Default cache TTL: 7 days.
const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Saved matrix with metadata.
#[derive(Debug, Serialize, Deserialize)]
struct CachedMatrix {
    /// Unix timestamp when the cache was written.
    cached_at_secs: u64,
    /// Route ids in index order.
    routes: Vec<String>,
    /// Set bits of each overlap row.
    overlaps: Vec<Vec<usize>>,
    /// Set bits of each row, per degree.
    degrees: Vec<Vec<Vec<usize>>>,
}

/// Configuration for the matrix disk cache.
#[derive(Debug, Clone)]
pub struct MatrixCacheConfig {
    /// Path to the cache file.
    pub path: PathBuf,
    /// How long the cache remains valid.
    pub ttl: Duration,
}

impl MatrixCacheConfig {
    /// Create a new cache config with the given path and default TTL (7 days).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ttl: DEFAULT_TTL,
        }
    }

    /// Set a custom TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

impl Default for MatrixCacheConfig {
    fn default() -> Self {
        Self::new("route_matrix_cache.json")
    }
}

/// Disk cache for [`RouteCostMatrix`].
#[derive(Debug, Clone)]
pub struct MatrixCache {
    config: MatrixCacheConfig,
}

impl MatrixCache {
    pub fn new(config: MatrixCacheConfig) -> Self {
        Self { config }
    }

    /// Try to load a matrix built for exactly the routes in `index`.
    ///
    /// Returns `None` if the cache doesn't exist, is invalid, has expired, or
    /// was built for a different route list.
    pub fn load(&self, index: &RouteIndex) -> Option<RouteCostMatrix> {
        let contents = std::fs::read_to_string(&self.config.path).ok()?;
        let cached: CachedMatrix = serde_json::from_str(&contents).ok()?;

        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .ok()?
            .as_secs();

        let age_secs = now.saturating_sub(cached.cached_at_secs);
        if age_secs >= self.config.ttl.as_secs() {
            debug!(path = %self.config.path.display(), age_secs, "matrix cache expired");
            return None;
        }

        match restore(cached, index) {
            Ok(matrix) => Some(matrix),
            Err(e) => {
                warn!(path = %self.config.path.display(), error = %e, "ignoring matrix cache");
                None
            }
        }
    }

    /// Save a matrix to the cache.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save(&self, index: &RouteIndex, matrix: &RouteCostMatrix) -> Result<(), MatrixError> {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_err(|_| MatrixError::Cache {
                message: "system time before unix epoch".to_string(),
            })?
            .as_secs();

        let cached = CachedMatrix {
            cached_at_secs: now,
            routes: index.fingerprint(),
            overlaps: matrix.overlaps().iter().map(set_bits).collect(),
            degrees: matrix
                .degrees()
                .iter()
                .map(|rows| rows.iter().map(set_bits).collect())
                .collect(),
        };

        if let Some(parent) = self.config.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| MatrixError::Cache {
                message: format!("failed to create cache directory: {}", e),
            })?;
        }

        let json = serde_json::to_string(&cached).map_err(|e| MatrixError::Cache {
            message: format!("failed to serialize cache: {}", e),
        })?;

        std::fs::write(&self.config.path, json).map_err(|e| MatrixError::Cache {
            message: format!("failed to write cache file: {}", e),
        })?;

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }
}

fn set_bits(row: &FixedBitSet) -> Vec<usize> {
    row.ones().collect()
}

fn restore(cached: CachedMatrix, index: &RouteIndex) -> Result<RouteCostMatrix, MatrixError> {
    if cached.routes != index.fingerprint() {
        return Err(MatrixError::Stale("route list changed"));
    }
    let size = index.len();
    if cached.overlaps.len() != size || cached.degrees.iter().any(|d| d.len() != size) {
        return Err(MatrixError::Stale("row count mismatch"));
    }
    if cached.degrees.is_empty() {
        return Err(MatrixError::Stale("no degrees saved"));
    }

    let overlaps = cached
        .overlaps
        .iter()
        .map(|bits| to_row(size, bits))
        .collect::<Result<Vec<_>, _>>()?;
    let degrees = cached
        .degrees
        .iter()
        .map(|rows| rows.iter().map(|bits| to_row(size, bits)).collect())
        .collect::<Result<Vec<Vec<_>>, _>>()?;

    Ok(RouteCostMatrix::from_parts(size, overlaps, degrees))
}

fn to_row(size: usize, bits: &[usize]) -> Result<FixedBitSet, MatrixError> {
    let mut row = FixedBitSet::with_capacity(size);
    for &bit in bits {
        if bit >= size {
            return Err(MatrixError::Stale("route index out of range"));
        }
        row.insert(bit);
    }
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DateRange, RouteId, ServiceCalendar, TransportMode};
    use crate::network::{TimetableBuilder, TransitData};
    use crate::routes::MAX_DEPTH;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn network(extra_route: bool) -> TransitData {
        let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let calendar = ServiceCalendar::daily(DateRange::single(day));
        let mut builder = TimetableBuilder::new();
        builder
            .station("A", "A")
            .station("B", "B")
            .station("C", "C")
            .route("R1", "R1", TransportMode::Tram)
            .route("R2", "R2", TransportMode::Tram)
            .service("S1", "R1", calendar.clone())
            .service("S2", "R2", calendar.clone())
            .trip("T1", "S1", &[("A", "08:00"), ("B", "08:10")])
            .trip("T2", "S2", &[("B", "08:20"), ("C", "08:30")]);
        if extra_route {
            builder
                .route("R3", "R3", TransportMode::Bus)
                .service("S3", "R3", calendar)
                .trip("T3", "S3", &[("C", "09:00"), ("A", "09:10")]);
        }
        builder.build().unwrap()
    }

    #[test]
    fn save_and_load_cache() {
        let dir = tempdir().unwrap();
        let cache = MatrixCache::new(MatrixCacheConfig::new(dir.path().join("matrix.json")));

        let data = network(true);
        let index = RouteIndex::from_transit(&data);
        let matrix = RouteCostMatrix::build(&data, &index, MAX_DEPTH);
        cache.save(&index, &matrix).unwrap();

        let loaded = cache.load(&index).unwrap();
        assert_eq!(loaded, matrix);
        let r1 = RouteId::parse("R1").unwrap();
        let r3 = RouteId::parse("R3").unwrap();
        let mut all = FixedBitSet::with_capacity(index.len());
        all.insert_range(..);
        assert_eq!(loaded.changes_between(index.pair(&r1, &r3).unwrap(), &all), 2);
    }

    #[test]
    fn changed_routes_invalidate_cache() {
        let dir = tempdir().unwrap();
        let cache = MatrixCache::new(MatrixCacheConfig::new(dir.path().join("matrix.json")));

        let before = network(false);
        let index = RouteIndex::from_transit(&before);
        cache
            .save(&index, &RouteCostMatrix::build(&before, &index, MAX_DEPTH))
            .unwrap();

        let after = network(true);
        assert!(cache.load(&RouteIndex::from_transit(&after)).is_none());
    }

    #[test]
    fn expired_cache_returns_none() {
        let dir = tempdir().unwrap();
        let config =
            MatrixCacheConfig::new(dir.path().join("matrix.json")).with_ttl(Duration::from_secs(0));
        let cache = MatrixCache::new(config);

        let data = network(false);
        let index = RouteIndex::from_transit(&data);
        cache
            .save(&index, &RouteCostMatrix::build(&data, &index, MAX_DEPTH))
            .unwrap();

        // With 0 TTL, cache should immediately be expired
        assert!(cache.load(&index).is_none());
    }

    #[test]
    fn corrupt_cache_returns_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("matrix.json");
        std::fs::write(&path, "{not json").unwrap();
        let cache = MatrixCache::new(MatrixCacheConfig::new(&path));
        let index = RouteIndex::from_transit(&network(false));
        assert!(cache.load(&index).is_none());
    }

    #[test]
    fn missing_cache_returns_none() {
        let cache = MatrixCache::new(MatrixCacheConfig::new("/nonexistent/path/matrix.json"));
        let index = RouteIndex::from_transit(&network(false));
        assert!(cache.load(&index).is_none());
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("dir").join("matrix.json");
        let cache = MatrixCache::new(MatrixCacheConfig::new(&path));

        let data = network(false);
        let index = RouteIndex::from_transit(&data);
        cache
            .save(&index, &RouteCostMatrix::build(&data, &index, MAX_DEPTH))
            .unwrap();
        assert!(path.exists());
        assert_eq!(cache.path(), path.as_path());
    }
}
