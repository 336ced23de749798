//! Snapshot of the tile proxy's configuration
//!
//! The snapshot is fetched fresh before every sub-task. Only two things are
//! read from it: whether a grid is declared, and which backing store a
//! layer's cache uses. The raw text is kept verbatim so it can be written
//! back to disk for the seeding tool.

use serde_yaml::Value;

use crate::error::ValidationError;
use crate::types::CacheType;

/// A parsed proxy configuration document
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    raw: String,
    document: Value,
}

impl ProxyConfig {
    /// Parse the raw YAML returned by the proxy's config endpoint
    pub fn parse(raw: impl Into<String>) -> Result<Self, serde_yaml::Error> {
        let raw = raw.into();
        let document = serde_yaml::from_str(&raw)?;
        Ok(Self { raw, document })
    }

    /// The configuration exactly as fetched
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether `grid` is declared under `grids`
    pub fn has_grid(&self, grid: &str) -> bool {
        self.document
            .get("grids")
            .and_then(|grids| grids.get(grid))
            .is_some()
    }

    /// Whether `layer` has an entry under `caches`
    pub fn has_cache(&self, layer: &str) -> bool {
        self.cache_entry(layer).is_some()
    }

    /// `caches.<layer>.cache.type`, if present
    pub fn cache_backend(&self, layer: &str) -> Option<&str> {
        self.cache_entry(layer)?.get("cache")?.get("type")?.as_str()
    }

    fn cache_entry(&self, layer: &str) -> Option<&Value> {
        self.document.get("caches")?.get(layer)
    }

    /// Check that `layer` is cached in `expected` and that `grid` exists.
    ///
    /// The backing store is checked before the grid.
    pub fn validate_target(
        &self,
        layer: &str,
        grid: &str,
        expected: CacheType,
    ) -> Result<(), ValidationError> {
        if !self.has_cache(layer) {
            return Err(ValidationError::CacheNotFound(layer.to_string()));
        }

        let backend = self.cache_backend(layer);
        if backend != Some(expected.as_str()) {
            return Err(ValidationError::UnsupportedBackingStore {
                layer: layer.to_string(),
                found: backend.map(str::to_string),
            });
        }

        if !self.has_grid(grid) {
            return Err(ValidationError::GridNotFound(grid.to_string()));
        }

        Ok(())
    }
}
