use std::path::{Path, PathBuf};

use anyhow::Context as _;
use orbitile_system_celestial::CelestialDatabaseConfig;
use orbitile_world::{WorldStorageConfig, SECTOR_KEY_SIZE, SECTOR_STORE_IDENTIFIER};
use serde::Deserialize;

/// Runtime tuning read from the `--config` TOML file.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct OrbitileConfig {
    pub(crate) world: WorldSection,
    pub(crate) celestial: CelestialDatabaseConfig,
    pub(crate) storage: StorageSection,
}

/// `[world]`: shape and persistence of generated worlds.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct WorldSection {
    /// Width and height in tiles used when no celestial body is named.
    pub(crate) size: [u32; 2],
    /// Seed used when no celestial body is named.
    pub(crate) seed: u64,
    /// Seconds an idle sector stays loaded.
    pub(crate) sector_time_to_live: f32,
    /// Sector database; in memory when absent.
    pub(crate) storage_path: Option<PathBuf>,
}

impl Default for WorldSection {
    fn default() -> Self {
        Self {
            size: [2048, 1024],
            seed: 0,
            sector_time_to_live: WorldStorageConfig::default().sector_time_to_live,
            storage_path: None,
        }
    }
}

impl WorldSection {
    pub(crate) fn storage_config(&self) -> WorldStorageConfig {
        WorldStorageConfig {
            sector_time_to_live: self.sector_time_to_live,
        }
    }
}

/// `[storage]`: how `storage` opens a database file.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct StorageSection {
    /// Content identifier the file must carry.
    pub(crate) content_identifier: String,
    /// Key width in bytes.
    pub(crate) key_size: usize,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            content_identifier: SECTOR_STORE_IDENTIFIER.to_owned(),
            key_size: SECTOR_KEY_SIZE,
        }
    }
}

impl OrbitileConfig {
    /// Reads `path`, or returns the defaults when no file is given.
    pub(crate) fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub(crate) fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = OrbitileConfig::parse(
            r#"
            [world]
            size = [512, 256]

            [celestial]
            seed = 99
            max_cached_chunks = 8
            "#,
        )
        .expect("valid config");
        assert_eq!(config.world.size, [512, 256]);
        assert_eq!(config.world.storage_path, None);
        assert_eq!(config.celestial.seed, 99);
        assert_eq!(config.celestial.max_cached_chunks, 8);
        assert_eq!(
            config.celestial.commit_interval_ms,
            CelestialDatabaseConfig::default().commit_interval_ms
        );
        assert_eq!(config.storage, StorageSection::default());
        assert_eq!(OrbitileConfig::parse("").expect("empty config"), OrbitileConfig::default());
    }

    #[test]
    fn mistyped_values_are_reported() {
        assert!(OrbitileConfig::parse("[world]\nsize = \"big\"").is_err());
    }
}
