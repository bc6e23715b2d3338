use orbitile_core::{CelestialCoordinate, IVec2};
use orbitile_storage::BTreeDatabase;
use orbitile_system_celestial::{CelestialParameters, VisitableWorldParameters};
use orbitile_system_terrain::{TerrainDatabase, TerrainError, TerrainSelectorParameters};
use orbitile_world::{SectorGenerator, TerrainSectorGenerator, WorldStorage, WorldStorageConfig};

/// What a world generated for a celestial body is built from.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldTemplate {
    coordinate: CelestialCoordinate,
    name: String,
    size: IVec2,
    threat_level: f32,
    gravity: f32,
    selector_parameters: TerrainSelectorParameters,
}

impl WorldTemplate {
    /// Template for the body `parameters` describe, or `None` when it cannot
    /// be landed on.
    #[must_use]
    pub fn from_celestial(parameters: &CelestialParameters) -> Option<Self> {
        let visitable = parameters.visitable.as_ref()?;
        if matches!(visitable, VisitableWorldParameters::GasGiant(_)) {
            return None;
        }
        let common = visitable.common();
        let [width, height] = common.world_size;
        let size = IVec2::new(
            i32::try_from(width).unwrap_or(i32::MAX),
            i32::try_from(height).unwrap_or(i32::MAX),
        );
        Some(Self {
            coordinate: parameters.coordinate,
            name: parameters.name.clone(),
            size,
            threat_level: common.threat_level,
            gravity: common.gravity,
            selector_parameters: TerrainSelectorParameters::new(
                width,
                height as f32 / 2.0,
                parameters.seed,
            ),
        })
    }

    /// Template for a world that belongs to no celestial body, such as an
    /// instance or a test map.
    #[must_use]
    pub fn detached(name: &str, world_size: [u32; 2], seed: u64, gravity: f32) -> Self {
        let [width, height] = world_size;
        Self {
            coordinate: CelestialCoordinate::null(),
            name: name.to_owned(),
            size: IVec2::new(
                i32::try_from(width).unwrap_or(i32::MAX),
                i32::try_from(height).unwrap_or(i32::MAX),
            ),
            threat_level: 0.0,
            gravity,
            selector_parameters: TerrainSelectorParameters::new(width, height as f32 / 2.0, seed),
        }
    }

    /// Body the world belongs to.
    #[must_use]
    pub const fn coordinate(&self) -> CelestialCoordinate {
        self.coordinate
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// World dimensions in tiles.
    #[must_use]
    pub const fn size(&self) -> IVec2 {
        self.size
    }

    /// Difficulty of the world.
    #[must_use]
    pub const fn threat_level(&self) -> f32 {
        self.threat_level
    }

    /// Gravity applied in the world.
    #[must_use]
    pub const fn gravity(&self) -> f32 {
        self.gravity
    }

    /// Inputs for every terrain selector of the world.
    #[must_use]
    pub const fn selector_parameters(&self) -> TerrainSelectorParameters {
        self.selector_parameters
    }

    /// Sector generator carving the named selectors out of solid ground.
    pub fn sector_generator(
        &self,
        terrain: &TerrainDatabase,
        solid: &str,
        cave: Option<&str>,
    ) -> Result<TerrainSectorGenerator, TerrainError> {
        let mut generator =
            TerrainSectorGenerator::new(terrain.create_named_selector(solid, self.selector_parameters)?);
        if let Some(cave) = cave {
            let parameters = self.selector_parameters.derived(cave);
            generator = generator.with_cave(terrain.create_named_selector(cave, parameters)?);
        }
        Ok(generator)
    }

    /// Tile storage for the world, generating missing sectors with
    /// `generator`.
    #[must_use]
    pub fn create_storage(
        &self,
        database: BTreeDatabase,
        generator: Box<dyn SectorGenerator>,
        config: WorldStorageConfig,
    ) -> WorldStorage {
        log::debug!("creating {}x{} world storage for {}", self.size.x, self.size.y, self.coordinate);
        WorldStorage::new(self.size, database, generator, config)
    }
}

#[cfg(test)]
mod tests {
    use orbitile_core::IVec3;
    use orbitile_system_celestial::VisitableCommon;
    use orbitile_world::{EmptySectorGenerator, EMPTY_MATERIAL_ID, SECTOR_KEY_SIZE, SECTOR_STORE_IDENTIFIER};
    use serde_json::json;

    use super::*;

    fn body(visitable: Option<VisitableWorldParameters>) -> CelestialParameters {
        CelestialParameters {
            coordinate: CelestialCoordinate::planet(IVec3::new(3, 4, 5), 2),
            seed: 77,
            name: "Kessel II".to_owned(),
            parameters: json!({ "typeName": "garden" }),
            visitable,
        }
    }

    fn common(world_size: [u32; 2]) -> VisitableCommon {
        VisitableCommon {
            type_name: "garden".to_owned(),
            threat_level: 2.0,
            world_size,
            gravity: 80.0,
            airless: false,
        }
    }

    #[test]
    fn templates_take_their_inputs_from_the_body() {
        let template = WorldTemplate::from_celestial(&body(Some(VisitableWorldParameters::Asteroids(
            common([512, 256]),
        ))))
        .expect("asteroids are visitable");
        assert_eq!(template.size(), IVec2::new(512, 256));
        assert_eq!(template.name(), "Kessel II");
        assert_eq!(template.selector_parameters(), TerrainSelectorParameters::new(512, 128.0, 77));

        assert!(WorldTemplate::from_celestial(&body(None)).is_none());
        let detached = WorldTemplate::detached("arena", [512, 256], 77, 80.0);
        assert!(detached.coordinate().is_null());
        assert_eq!(detached.selector_parameters(), template.selector_parameters());
        assert!(WorldTemplate::from_celestial(&body(Some(VisitableWorldParameters::GasGiant(
            common([512, 256]),
        ))))
        .is_none());
    }

    #[test]
    fn generated_ground_sits_below_half_height() {
        let template = WorldTemplate::from_celestial(&body(Some(VisitableWorldParameters::Asteroids(
            common([512, 256]),
        ))))
        .expect("visitable");
        let terrain = TerrainDatabase::builtin().expect("built-in selectors parse");
        let generator = template
            .sector_generator(&terrain, "rollingHills", None)
            .expect("selector builds");
        assert_ne!(generator.tile_at(40, 10).foreground, EMPTY_MATERIAL_ID);
        assert_eq!(generator.tile_at(40, 250).foreground, EMPTY_MATERIAL_ID);
        assert!(template
            .sector_generator(&terrain, "noSuchSelector", None)
            .is_err());

        let database = BTreeDatabase::in_memory(SECTOR_STORE_IDENTIFIER, SECTOR_KEY_SIZE)
            .expect("in-memory database opens");
        let storage =
            template.create_storage(database, Box::new(EmptySectorGenerator), WorldStorageConfig::default());
        assert_eq!(storage.tiles().size(), IVec2::new(512, 256));
    }
}
