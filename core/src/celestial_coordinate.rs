//! Addressing for systems, planets and satellites on the star map.

use std::{fmt, str::FromStr};

use glam::IVec3;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Failure raised while parsing a [`CelestialCoordinate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordinateParseError {
    /// The string did not have between three and five `:` separated parts.
    #[error("celestial coordinate '{0}' must have 3 to 5 ':' separated parts")]
    PartCount(String),
    /// One of the parts was not an integer.
    #[error("celestial coordinate part '{part}' is not an integer")]
    BadNumber {
        /// Offending text.
        part: String,
    },
    /// An orbit number was negative, or a satellite was given without a planet.
    #[error("celestial coordinate '{0}' has an invalid orbit")]
    BadOrbit(String),
}

/// Position in the system → planet → satellite hierarchy.
///
/// Orbit zero means "the body itself": a coordinate with planet orbit zero
/// names a system, one with satellite orbit zero names a planet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CelestialCoordinate {
    location: IVec3Key,
    planet: i32,
    satellite: i32,
    null: bool,
}

/// `IVec3` lacks `Ord`; coordinates are ordered by x, y, z.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct IVec3Key(i32, i32, i32);

impl From<IVec3> for IVec3Key {
    fn from(value: IVec3) -> Self {
        Self(value.x, value.y, value.z)
    }
}

impl Default for CelestialCoordinate {
    fn default() -> Self {
        Self::null()
    }
}

impl CelestialCoordinate {
    /// The distinguished null coordinate.
    #[must_use]
    pub const fn null() -> Self {
        Self {
            location: IVec3Key(0, 0, 0),
            planet: 0,
            satellite: 0,
            null: true,
        }
    }

    /// Coordinate naming the system at `location`.
    #[must_use]
    pub fn system(location: IVec3) -> Self {
        Self {
            location: location.into(),
            planet: 0,
            satellite: 0,
            null: false,
        }
    }

    /// Coordinate naming planet `orbit` of the system at `location`.
    #[must_use]
    pub fn planet(location: IVec3, orbit: i32) -> Self {
        Self {
            planet: orbit.max(0),
            ..Self::system(location)
        }
    }

    /// Coordinate naming satellite `satellite` of planet `planet`.
    #[must_use]
    pub fn satellite(location: IVec3, planet: i32, satellite: i32) -> Self {
        let planet = planet.max(0);
        Self {
            planet,
            satellite: if planet == 0 { 0 } else { satellite.max(0) },
            ..Self::system(location)
        }
    }

    /// Reports whether this is the null coordinate.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.null
    }

    /// Reports whether this names a system.
    #[must_use]
    pub const fn is_system(&self) -> bool {
        !self.null && self.planet == 0
    }

    /// Reports whether this names a planet.
    #[must_use]
    pub const fn is_planetary_body(&self) -> bool {
        !self.null && self.planet != 0 && self.satellite == 0
    }

    /// Reports whether this names a satellite.
    #[must_use]
    pub const fn is_satellite_body(&self) -> bool {
        !self.null && self.planet != 0 && self.satellite != 0
    }

    /// System location.
    #[must_use]
    pub fn location(&self) -> IVec3 {
        IVec3::new(self.location.0, self.location.1, self.location.2)
    }

    /// Planet orbit number, zero for systems.
    #[must_use]
    pub const fn planet_orbit(&self) -> i32 {
        self.planet
    }

    /// Satellite orbit number, zero for systems and planets.
    #[must_use]
    pub const fn satellite_orbit(&self) -> i32 {
        self.satellite
    }

    /// Orbit number of this body within its parent, zero for systems.
    #[must_use]
    pub const fn orbit_number(&self) -> i32 {
        if self.satellite != 0 {
            self.satellite
        } else {
            self.planet
        }
    }

    /// Parent body: satellite → planet → system → null.
    #[must_use]
    pub fn parent(&self) -> Self {
        if self.is_satellite_body() {
            Self::planet(self.location(), self.planet)
        } else if self.is_planetary_body() {
            Self::system(self.location())
        } else {
            Self::null()
        }
    }

    /// Child body at `orbit`; satellites and null have no children.
    #[must_use]
    pub fn child(&self, orbit: i32) -> Option<Self> {
        if self.is_system() {
            Some(Self::planet(self.location(), orbit))
        } else if self.is_planetary_body() {
            Some(Self::satellite(self.location(), self.planet, orbit))
        } else {
            None
        }
    }

    /// The containing system.
    #[must_use]
    pub fn system_coordinate(&self) -> Self {
        if self.null {
            return Self::null();
        }
        Self::system(self.location())
    }

    /// The containing planet, or the planet itself. `None` for systems.
    #[must_use]
    pub fn planet_coordinate(&self) -> Option<Self> {
        if self.is_planetary_body() || self.is_satellite_body() {
            Some(Self::planet(self.location(), self.planet))
        } else {
            None
        }
    }

    /// Filename-safe form with `:` replaced by `_`.
    #[must_use]
    pub fn filename(&self) -> String {
        self.to_string().replace(':', "_")
    }
}

impl fmt::Display for CelestialCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.null {
            return f.write_str("null");
        }
        let IVec3Key(x, y, z) = self.location;
        write!(f, "{x}:{y}:{z}")?;
        if self.planet != 0 {
            write!(f, ":{}", self.planet)?;
            if self.satellite != 0 {
                write!(f, ":{}", self.satellite)?;
            }
        }
        Ok(())
    }
}

impl FromStr for CelestialCoordinate {
    type Err = CoordinateParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
            return Ok(Self::null());
        }
        let parts: Vec<&str> = trimmed.split(':').collect();
        if !(3..=5).contains(&parts.len()) {
            return Err(CoordinateParseError::PartCount(text.to_owned()));
        }
        let mut numbers = [0_i32; 5];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| CoordinateParseError::BadNumber {
                part: (*part).to_owned(),
            })?;
        }
        let [x, y, z, planet, satellite] = numbers;
        if planet < 0 || satellite < 0 || (planet == 0 && satellite != 0) {
            return Err(CoordinateParseError::BadOrbit(text.to_owned()));
        }
        Ok(Self::satellite(IVec3::new(x, y, z), planet, satellite))
    }
}

impl Serialize for CelestialCoordinate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            CoordinateObject::from(*self).serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for CelestialCoordinate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            match CoordinateForm::deserialize(deserializer)? {
                CoordinateForm::Text(text) => text.parse().map_err(serde::de::Error::custom),
                CoordinateForm::Object(object) => Ok(object.into()),
                CoordinateForm::Null(()) => Ok(Self::null()),
            }
        } else {
            CoordinateObject::deserialize(deserializer).map(Into::into)
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CoordinateForm {
    Text(String),
    Object(CoordinateObject),
    Null(()),
}

#[derive(Serialize, Deserialize)]
struct CoordinateObject {
    location: Option<[i32; 3]>,
    #[serde(default)]
    planet: i32,
    #[serde(default)]
    satellite: i32,
}

impl From<CelestialCoordinate> for CoordinateObject {
    fn from(value: CelestialCoordinate) -> Self {
        if value.null {
            return Self {
                location: None,
                planet: 0,
                satellite: 0,
            };
        }
        let IVec3Key(x, y, z) = value.location;
        Self {
            location: Some([x, y, z]),
            planet: value.planet,
            satellite: value.satellite,
        }
    }
}

impl From<CoordinateObject> for CelestialCoordinate {
    fn from(value: CoordinateObject) -> Self {
        match value.location {
            Some([x, y, z]) => Self::satellite(IVec3::new(x, y, z), value.planet, value.satellite),
            None => Self::null(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchy_navigation() {
        let moon = CelestialCoordinate::satellite(IVec3::new(4, -2, 9), 3, 1);
        assert!(moon.is_satellite_body());
        assert_eq!(moon.orbit_number(), 1);
        let planet = moon.parent();
        assert!(planet.is_planetary_body());
        assert_eq!(planet.child(1), Some(moon));
        let system = planet.parent();
        assert!(system.is_system());
        assert!(system.parent().is_null());
        assert_eq!(moon.system_coordinate(), system);
        assert_eq!(moon.planet_coordinate(), Some(planet));
        assert_eq!(moon.child(1), None);
    }

    #[test]
    fn string_form_round_trips() {
        let moon = CelestialCoordinate::satellite(IVec3::new(4, -2, 9), 3, 1);
        assert_eq!(moon.to_string(), "4:-2:9:3:1");
        assert_eq!("4:-2:9:3:1".parse::<CelestialCoordinate>(), Ok(moon));
        assert_eq!(moon.filename(), "4_-2_9_3_1");
        assert_eq!("null".parse::<CelestialCoordinate>(), Ok(CelestialCoordinate::null()));
        assert_eq!(CelestialCoordinate::null().to_string(), "null");
    }

    #[test]
    fn malformed_strings_are_rejected() {
        assert!(matches!(
            "1:2".parse::<CelestialCoordinate>(),
            Err(CoordinateParseError::PartCount(_))
        ));
        assert!(matches!(
            "1:2:x".parse::<CelestialCoordinate>(),
            Err(CoordinateParseError::BadNumber { .. })
        ));
        assert!(matches!(
            "1:2:3:-1".parse::<CelestialCoordinate>(),
            Err(CoordinateParseError::BadOrbit(_))
        ));
        assert!(matches!(
            "1:2:3:0:2".parse::<CelestialCoordinate>(),
            Err(CoordinateParseError::BadOrbit(_))
        ));
    }

    #[test]
    fn json_accepts_both_forms() {
        let expected = CelestialCoordinate::planet(IVec3::new(1, 2, 3), 4);
        let from_text: CelestialCoordinate =
            serde_json::from_str("\"1:2:3:4\"").expect("string form parses");
        let from_object: CelestialCoordinate =
            serde_json::from_str(r#"{"location":[1,2,3],"planet":4,"satellite":0}"#)
                .expect("object form parses");
        let from_null: CelestialCoordinate =
            serde_json::from_str("null").expect("null parses");
        assert_eq!(from_text, expected);
        assert_eq!(from_object, expected);
        assert!(from_null.is_null());
        assert_eq!(
            serde_json::to_string(&expected).expect("serializes"),
            "\"1:2:3:4\""
        );
    }

    #[test]
    fn binary_form_round_trips() {
        let moon = CelestialCoordinate::satellite(IVec3::new(-7, 0, 12), 2, 5);
        let bytes = bincode::serialize(&moon).expect("serializes");
        let decoded: CelestialCoordinate = bincode::deserialize(&bytes).expect("deserializes");
        assert_eq!(decoded, moon);
    }
}
