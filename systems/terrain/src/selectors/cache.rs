//! Memoization of an expensive selector.

use std::sync::Mutex;

use orbitile_core::{IVec2, LruCache};
use serde::Deserialize;

use crate::{
    factory::SelectorDescription, Selector, TerrainError, TerrainSelector,
    TerrainSelectorParameters,
};

/// Config of [`CacheSelector`].
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    /// Selector being cached.
    pub source: SelectorDescription,
    /// Positions kept in memory.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

fn default_cache_size() -> usize {
    4096
}

/// Least-recently-used cache over `(x, y) → value`.
#[derive(Debug)]
pub struct CacheSelector {
    source: Selector,
    values: Mutex<LruCache<IVec2, f32>>,
}

impl CacheSelector {
    /// Builds the selector and its child.
    pub fn new(config: CacheConfig, parameters: TerrainSelectorParameters) -> Result<Self, TerrainError> {
        if config.cache_size == 0 {
            return Err(TerrainError::bad_config("cache", "cacheSize must be positive"));
        }
        Ok(Self {
            source: config.source.build(parameters)?,
            values: Mutex::new(LruCache::new(config.cache_size)),
        })
    }
}

impl TerrainSelector for CacheSelector {
    fn get(&self, x: i32, y: i32) -> f32 {
        let key = IVec2::new(x, y);
        let mut values = match self.values.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(value) = values.get(&key) {
            return *value;
        }
        let value = self.source.get(x, y);
        let _ = values.insert(key, value);
        value
    }
}
