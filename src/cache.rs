// 🗃️ Metrics Cache - Explicit memoization of loaded metrics files
//
// Entries are keyed by path and invalidated when the file's SHA-256
// fingerprint changes (or, optionally, when a TTL elapses).

use crate::metrics::MergedMetrics;
use crate::storage::load_metrics;
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct CacheEntry {
    fingerprint: String,
    loaded_at: Instant,
    metrics: Arc<MergedMetrics>,
}

/// MetricsCache - path → parsed metrics table
pub struct MetricsCache {
    period_field: String,
    ttl: Option<Duration>,
    entries: HashMap<PathBuf, CacheEntry>,
}

/// SHA-256 of the file contents, hex encoded
pub fn fingerprint(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

impl MetricsCache {
    pub fn new(period_field: &str) -> Self {
        MetricsCache {
            period_field: period_field.to_string(),
            ttl: None,
            entries: HashMap::new(),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Return the cached table for `path`, reloading when the file changed.
    pub fn get_or_load(&mut self, path: &Path) -> Result<Arc<MergedMetrics>> {
        let current = fingerprint(path)?;

        if let Some(entry) = self.entries.get(path) {
            let expired = self
                .ttl
                .map_or(false, |ttl| entry.loaded_at.elapsed() >= ttl);
            if entry.fingerprint == current && !expired {
                tracing::debug!(path = %path.display(), "metrics cache hit");
                return Ok(Arc::clone(&entry.metrics));
            }
        }

        let metrics = Arc::new(load_metrics(path, &self.period_field)?);
        tracing::info!(path = %path.display(), rows = metrics.len(), "loaded metrics file");

        self.entries.insert(
            path.to_path_buf(),
            CacheEntry {
                fingerprint: current,
                loaded_at: Instant::now(),
                metrics: Arc::clone(&metrics),
            },
        );

        Ok(metrics)
    }

    /// Drop one entry; returns whether it was cached
    pub fn invalidate(&mut self, path: &Path) -> bool {
        self.entries.remove(path).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
