//! Deterministic chunk generation.

use std::collections::BTreeMap;

use orbitile_core::{
    derive_seed, static_random_u64, CelestialCoordinate, IVec2, IVec3, Perlin, RandomSource,
    RectI,
};
use serde_json::{Map, Value};

use crate::{
    chunk::midpoint, CelestialChunk, CelestialError, CelestialGenerationConfig,
    CelestialParameters, CelestialPlanet, CelestialSystemObjects, ConstellationLine,
    VisitableCommon, VisitableKind, VisitableTemplate, VisitableWorldParameters,
};

const SYSTEM_TYPE_STREAM: &str = "systemType";
const ORBIT_STREAM: i64 = 1;
const NAME_SEPARATOR: &str = " ";

/// Generates chunks from a seed and the generation tables.
///
/// Every chunk depends only on the seed, the tables, and its own index, so
/// chunks may be generated in any order and on any thread.
#[derive(Debug)]
pub struct CelestialGenerator {
    config: CelestialGenerationConfig,
    seed: u64,
    system_type_noise: Perlin,
}

impl CelestialGenerator {
    /// Validates `config` and prepares the system type noise.
    pub fn new(config: CelestialGenerationConfig, seed: u64) -> Result<Self, CelestialError> {
        config.validate()?;
        let system_type_noise = Perlin::new(
            config.system_type_perlin.clone(),
            derive_seed(seed, SYSTEM_TYPE_STREAM),
        );
        Ok(Self {
            config,
            seed,
            system_type_noise,
        })
    }

    /// Generation tables in use.
    #[must_use]
    pub fn config(&self) -> &CelestialGenerationConfig {
        &self.config
    }

    /// Seed every chunk derives from.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Side length of a chunk.
    #[must_use]
    pub const fn chunk_size(&self) -> i32 {
        self.config.chunk_size
    }

    /// System locations covered by chunk `index`, clipped to the valid range.
    #[must_use]
    pub fn chunk_region(&self, index: IVec2) -> RectI {
        let size = self.config.chunk_size;
        let [low, high] = self.config.xy_coord_range;
        let origin = index * size;
        RectI::new(
            origin.x.max(low),
            origin.y.max(low),
            (origin.x + size).min(high.saturating_add(1)),
            (origin.y + size).min(high.saturating_add(1)),
        )
    }

    /// Generates the chunk at `index`: its systems and constellations.
    ///
    /// Planets and satellites are left out; [`system_objects`](Self::system_objects)
    /// lays them out for one system when they are first needed.
    #[must_use]
    pub fn generate_chunk(&self, index: IVec2) -> CelestialChunk {
        let region = self.chunk_region(index);
        let mut random = RandomSource::keyed(self.seed, &[i64::from(index.x), i64::from(index.y)]);
        let [z_low, z_high] = self.config.z_coord_range;

        let mut chunk = CelestialChunk {
            chunk_index: index,
            ..CelestialChunk::default()
        };
        let mut stars = Vec::new();
        for y in region.min().y..region.max().y {
            for x in region.min().x..region.max().x {
                if !random.bernoulli(self.config.system_probability) {
                    continue;
                }
                let location = IVec3::new(x, y, random.rand_int_range(z_low, z_high));
                let parameters = self.system_parameters(location);
                let _ = chunk.system_parameters.insert(parameters.coordinate, parameters);
                stars.push(IVec2::new(x, y));
            }
        }
        chunk.constellations = self.constellations(&stars, &mut random);
        log::debug!(
            "generated celestial chunk {index} with {} systems and {} constellation lines",
            chunk.system_parameters.len(),
            chunk.constellations.len()
        );
        chunk
    }

    /// System type at a location, chosen by binning the noise field.
    #[must_use]
    pub fn system_type_at(&self, location: IVec2) -> &str {
        let value = self
            .system_type_noise
            .get2(f64::from(location.x), f64::from(location.y)) as f32;
        let bins = &self.config.system_type_bins;
        let mut chosen = bins.first().map_or("", |(_, name)| name.as_str());
        for (threshold, name) in bins {
            if value >= *threshold {
                chosen = name.as_str();
            }
        }
        chosen
    }

    /// Parameters of the system at `location`.
    #[must_use]
    pub fn system_parameters(&self, location: IVec3) -> CelestialParameters {
        let coordinate = CelestialCoordinate::system(location);
        let seed = static_random_u64(self.seed, &location_key(location));
        let mut random = RandomSource::new(seed);
        let type_name = self.system_type_at(location.truncate()).to_owned();

        let name = [
            &self.config.system_prefix_names,
            &self.config.system_names,
            &self.config.system_suffix_names,
        ]
        .into_iter()
        .filter_map(|pool| random.pick_weighted(pool).cloned())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(NAME_SEPARATOR);

        let parameters = match self.config.system_types.get(&type_name) {
            Some(system_type) => merge_parameters(
                &system_type.base_parameters,
                pick(&mut random, &system_type.variation_parameters),
                &type_name,
            ),
            None => merge_parameters(&Value::Null, None, &type_name),
        };
        CelestialParameters {
            coordinate,
            seed,
            name,
            parameters,
            visitable: None,
        }
    }

    /// Lays out the planets and satellites of a system.
    #[must_use]
    pub fn system_objects(&self, system: &CelestialParameters) -> CelestialSystemObjects {
        let location = system.coordinate.location();
        let mut objects = CelestialSystemObjects::empty(location);
        let Some(system_type) = system
            .type_name()
            .and_then(|name| self.config.system_types.get(name))
        else {
            return objects;
        };
        let mut random = RandomSource::keyed(system.seed, &[ORBIT_STREAM]);

        for region in &system_type.orbit_regions {
            for orbit in region.orbit_range[0]..=region.orbit_range[1] {
                if !random.bernoulli(region.body_probability) {
                    continue;
                }
                let Some(planet_type_name) = random.pick_weighted(&region.planetary_types) else {
                    continue;
                };
                let Some(planet_type) = self.config.planetary_types.get(planet_type_name) else {
                    continue;
                };
                let planet_coordinate = CelestialCoordinate::planet(location, orbit);
                let planet_name = format!(
                    "{}{NAME_SEPARATOR}{}",
                    system.name,
                    suffix(&self.config.planetary_suffixes, orbit)
                );
                let planet_parameters = self.body_parameters(
                    planet_coordinate,
                    planet_name,
                    planet_type_name,
                    &planet_type.base_parameters,
                    &planet_type.variation_parameters,
                    planet_type.visitable.as_ref(),
                );

                let mut satellite_parameters = BTreeMap::new();
                let satellite_count = i32::try_from(planet_type.max_satellite_count).unwrap_or(i32::MAX);
                for satellite_orbit in 1..=satellite_count {
                    if !random.bernoulli(planet_type.satellite_probability) {
                        continue;
                    }
                    let Some(satellite_type_name) = random.pick_weighted(&region.satellite_types)
                    else {
                        continue;
                    };
                    let Some(satellite_type) = self.config.satellite_types.get(satellite_type_name)
                    else {
                        continue;
                    };
                    let name = format!(
                        "{}{}",
                        planet_parameters.name,
                        suffix(&self.config.satellite_suffixes, satellite_orbit)
                    );
                    let _ = satellite_parameters.insert(
                        satellite_orbit,
                        self.body_parameters(
                            CelestialCoordinate::satellite(location, orbit, satellite_orbit),
                            name,
                            satellite_type_name,
                            &satellite_type.base_parameters,
                            &satellite_type.variation_parameters,
                            satellite_type.visitable.as_ref(),
                        ),
                    );
                }
                let _ = objects.planets.insert(
                    orbit,
                    CelestialPlanet {
                        planet_parameters,
                        satellite_parameters,
                    },
                );
            }
        }
        objects
    }

    fn body_parameters(
        &self,
        coordinate: CelestialCoordinate,
        name: String,
        type_name: &str,
        base: &Value,
        variations: &[Value],
        visitable: Option<&VisitableTemplate>,
    ) -> CelestialParameters {
        let location = coordinate.location();
        let mut key = location_key(location).to_vec();
        key.push(i64::from(coordinate.planet_orbit()));
        key.push(i64::from(coordinate.satellite_orbit()));
        let seed = static_random_u64(self.seed, &key);
        let mut random = RandomSource::new(seed);
        let parameters = merge_parameters(base, pick(&mut random, variations), type_name);
        let visitable = visitable.map(|template| self.visitable(template, &mut random));
        CelestialParameters {
            coordinate,
            seed,
            name,
            parameters,
            visitable,
        }
    }

    fn visitable(
        &self,
        template: &VisitableTemplate,
        random: &mut RandomSource,
    ) -> VisitableWorldParameters {
        let common = VisitableCommon {
            type_name: template.type_name.clone(),
            threat_level: draw(random, template.threat_range),
            world_size: self
                .config
                .world_sizes
                .get(&template.size)
                .copied()
                .unwrap_or_default(),
            gravity: draw(random, template.gravity_range),
            airless: template.airless,
        };
        match template.kind {
            VisitableKind::Terrestrial => VisitableWorldParameters::Terrestrial {
                common,
                primary_biome: pick(random, &template.biomes)
                    .cloned()
                    .unwrap_or_else(|| template.type_name.clone()),
                primary_liquid: pick(random, &template.liquids).cloned(),
                hue_shift: draw(random, self.config.hue_shift_range),
                size_name: template.size.clone(),
            },
            VisitableKind::Asteroids => VisitableWorldParameters::Asteroids(common),
            VisitableKind::FloatingDungeon => VisitableWorldParameters::FloatingDungeon {
                common,
                dungeon: pick(random, &template.dungeons).cloned().unwrap_or_default(),
            },
            VisitableKind::GasGiant => VisitableWorldParameters::GasGiant(common),
        }
    }

    fn constellations(&self, stars: &[IVec2], random: &mut RandomSource) -> Vec<ConstellationLine> {
        let settings = &self.config.constellation;
        let mut lines: Vec<ConstellationLine> = Vec::new();
        if stars.len() < 2 {
            return lines;
        }
        let last = i32::try_from(stars.len() - 1).unwrap_or(i32::MAX);
        for _ in 0..settings.candidate_tries {
            if lines.len() >= settings.max_lines {
                break;
            }
            let first = stars[random.rand_int_range(0, last) as usize];
            let second = stars[random.rand_int_range(0, last) as usize];
            if first == second {
                continue;
            }
            let candidate = ConstellationLine { a: first, b: second };
            let length = candidate.to_line().length();
            if length < settings.min_line_length || length > settings.max_line_length {
                continue;
            }
            let center = midpoint(&candidate);
            let crowded = lines.iter().any(|accepted| {
                accepted.to_line().distance_to_point(center) < settings.min_line_separation
                    || candidate.to_line().distance_to_point(midpoint(accepted))
                        < settings.min_line_separation
            });
            if !crowded {
                lines.push(candidate);
            }
        }
        lines
    }
}

fn location_key(location: IVec3) -> [i64; 3] {
    [
        i64::from(location.x),
        i64::from(location.y),
        i64::from(location.z),
    ]
}

fn pick<'a, T>(random: &mut RandomSource, values: &'a [T]) -> Option<&'a T> {
    if values.is_empty() {
        return None;
    }
    let last = i32::try_from(values.len() - 1).unwrap_or(i32::MAX);
    values.get(random.rand_int_range(0, last) as usize)
}

fn draw(random: &mut RandomSource, range: [f32; 2]) -> f32 {
    random.randf_range(range[0], range[1])
}

fn suffix(suffixes: &[String], orbit: i32) -> String {
    usize::try_from(orbit - 1)
        .ok()
        .and_then(|index| suffixes.get(index))
        .cloned()
        .unwrap_or_else(|| orbit.to_string())
}

fn merge_parameters(base: &Value, variation: Option<&Value>, type_name: &str) -> Value {
    let mut merged = match base {
        Value::Object(fields) => fields.clone(),
        _ => Map::new(),
    };
    if let Some(Value::Object(fields)) = variation {
        for (key, value) in fields {
            let _ = merged.insert(key.clone(), value.clone());
        }
    }
    let _ = merged.insert("typeName".to_owned(), Value::String(type_name.to_owned()));
    Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn generator(seed: u64) -> CelestialGenerator {
        let config = CelestialGenerationConfig::builtin().expect("built-in config parses");
        CelestialGenerator::new(config, seed).expect("generator builds")
    }

    #[test]
    fn variation_overrides_base_and_type_is_recorded() {
        let merged = merge_parameters(
            &json!({ "magnitude": 2.0, "color": "red" }),
            Some(&json!({ "magnitude": 3.0 })),
            "redDwarf",
        );
        assert_eq!(merged, json!({ "magnitude": 3.0, "color": "red", "typeName": "redDwarf" }));
    }

    #[test]
    fn suffixes_fall_back_to_orbit_numbers() {
        let suffixes = vec!["I".to_owned(), "II".to_owned()];
        assert_eq!(suffix(&suffixes, 2), "II");
        assert_eq!(suffix(&suffixes, 5), "5");
    }

    #[test]
    fn chunk_region_clips_to_coordinate_range() {
        let mut config = CelestialGenerationConfig::builtin().expect("built-in config parses");
        config.xy_coord_range = [-10, 10];
        let generator = CelestialGenerator::new(config, 1).expect("generator builds");
        assert_eq!(generator.chunk_region(IVec2::new(0, 0)), RectI::new(0, 0, 11, 11));
        assert_eq!(generator.chunk_region(IVec2::new(-1, 0)), RectI::new(-10, 0, 0, 11));
        assert!(generator.chunk_region(IVec2::new(3, 0)).is_empty());
    }

    #[test]
    fn systems_lie_inside_their_chunk_and_bodies_follow_their_tables() {
        let generator = generator(42);
        let chunk = generator.generate_chunk(IVec2::new(1, -2));
        let region = generator.chunk_region(IVec2::new(1, -2));
        assert!(!chunk.system_parameters.is_empty());
        for (coordinate, parameters) in &chunk.system_parameters {
            assert!(region.contains(coordinate.location().truncate()));
            let type_name = parameters.type_name().expect("systems carry a type");
            assert!(generator.config().system_types.contains_key(type_name));
            let objects = generator.system_objects(parameters);
            assert_eq!(objects.system_location, coordinate.location());
            for (orbit, planet) in &objects.planets {
                assert_eq!(planet.planet_parameters.coordinate.planet_orbit(), *orbit);
                assert!(planet.planet_parameters.name.starts_with(&parameters.name));
                for satellite in planet.satellite_parameters.values() {
                    assert_eq!(satellite.coordinate.parent(), planet.planet_parameters.coordinate);
                }
            }
        }
        for line in &chunk.constellations {
            let length = line.to_line().length();
            assert!(length >= 3.0 && length <= 20.0);
        }
    }

    #[test]
    fn body_seeds_are_independent_of_chunk_order() {
        let generator = generator(5);
        let chunk = generator.generate_chunk(IVec2::new(0, 0));
        let (coordinate, parameters) = chunk
            .system_parameters
            .iter()
            .next()
            .expect("chunk holds a system");
        let regenerated = generator.system_parameters(coordinate.location());
        assert_eq!(&regenerated, parameters);
        assert_eq!(generator.system_objects(&regenerated), generator.system_objects(parameters));
    }

    #[test]
    fn fresh_chunks_hold_no_system_objects() {
        let chunk = generator(42).generate_chunk(IVec2::new(1, -2));
        assert!(!chunk.system_parameters.is_empty());
        assert!(chunk.system_objects.is_empty());
    }
}
