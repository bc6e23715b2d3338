//! Byte encodings of replicated field values.

use orbitile_core::{ByteReader, ByteWriter, CelestialCoordinate};
use serde_json::Value;

use crate::NetError;

/// A value a [`NetField`](crate::NetField) can replicate.
pub trait NetValue: Clone + PartialEq {
    /// Appends the value.
    fn write_value(&self, writer: &mut ByteWriter);

    /// Reads a value written by [`write_value`](Self::write_value).
    fn read_value(reader: &mut ByteReader<'_>) -> Result<Self, NetError>;
}

/// Field-less enum replicated by variant index.
pub trait NetEnum: Copy + PartialEq {
    /// Index of the variant.
    fn to_index(self) -> u64;

    /// Variant for `index`, if any.
    fn from_index(index: u64) -> Option<Self>;
}

impl<E: NetEnum> NetValue for E {
    fn write_value(&self, writer: &mut ByteWriter) {
        writer.write_vlq_u(self.to_index());
    }

    fn read_value(reader: &mut ByteReader<'_>) -> Result<Self, NetError> {
        let index = reader.read_vlq_u()?;
        E::from_index(index).ok_or(NetError::InvalidEnum(index))
    }
}

impl NetValue for bool {
    fn write_value(&self, writer: &mut ByteWriter) {
        writer.write_bool(*self);
    }

    fn read_value(reader: &mut ByteReader<'_>) -> Result<Self, NetError> {
        Ok(reader.read_bool()?)
    }
}

impl NetValue for i64 {
    fn write_value(&self, writer: &mut ByteWriter) {
        writer.write_vlq_i(*self);
    }

    fn read_value(reader: &mut ByteReader<'_>) -> Result<Self, NetError> {
        Ok(reader.read_vlq_i()?)
    }
}

impl NetValue for u64 {
    fn write_value(&self, writer: &mut ByteWriter) {
        writer.write_vlq_u(*self);
    }

    fn read_value(reader: &mut ByteReader<'_>) -> Result<Self, NetError> {
        Ok(reader.read_vlq_u()?)
    }
}

impl NetValue for f64 {
    fn write_value(&self, writer: &mut ByteWriter) {
        writer.write_f64(*self);
    }

    fn read_value(reader: &mut ByteReader<'_>) -> Result<Self, NetError> {
        Ok(reader.read_f64()?)
    }
}

impl NetValue for String {
    fn write_value(&self, writer: &mut ByteWriter) {
        writer.write_string(self);
    }

    fn read_value(reader: &mut ByteReader<'_>) -> Result<Self, NetError> {
        Ok(reader.read_string()?)
    }
}

impl NetValue for Vec<u8> {
    fn write_value(&self, writer: &mut ByteWriter) {
        writer.write_bytes(self);
    }

    fn read_value(reader: &mut ByteReader<'_>) -> Result<Self, NetError> {
        Ok(reader.read_bytes()?.to_vec())
    }
}

impl NetValue for Value {
    fn write_value(&self, writer: &mut ByteWriter) {
        writer.write_string(&self.to_string());
    }

    fn read_value(reader: &mut ByteReader<'_>) -> Result<Self, NetError> {
        Ok(serde_json::from_str(&reader.read_string()?)?)
    }
}

impl NetValue for CelestialCoordinate {
    fn write_value(&self, writer: &mut ByteWriter) {
        writer.write_string(&self.to_string());
    }

    fn read_value(reader: &mut ByteReader<'_>) -> Result<Self, NetError> {
        reader
            .read_string()?
            .parse()
            .map_err(|error: orbitile_core::CoordinateParseError| {
                NetError::InvalidText(error.to_string())
            })
    }
}

impl<T: NetValue> NetValue for Option<T> {
    fn write_value(&self, writer: &mut ByteWriter) {
        match self {
            Some(value) => {
                writer.write_bool(true);
                value.write_value(writer);
            }
            None => writer.write_bool(false),
        }
    }

    fn read_value(reader: &mut ByteReader<'_>) -> Result<Self, NetError> {
        if reader.read_bool()? {
            Ok(Some(T::read_value(reader)?))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Mode {
        Idle,
        Busy,
    }

    impl NetEnum for Mode {
        fn to_index(self) -> u64 {
            self as u64
        }

        fn from_index(index: u64) -> Option<Self> {
            match index {
                0 => Some(Self::Idle),
                1 => Some(Self::Busy),
                _ => None,
            }
        }
    }

    fn reread<T: NetValue>(value: &T) -> Result<T, NetError> {
        let mut writer = ByteWriter::new();
        value.write_value(&mut writer);
        T::read_value(&mut ByteReader::new(writer.as_bytes()))
    }

    #[test]
    fn enums_and_json_survive_the_wire() {
        assert_eq!(reread(&Mode::Busy).expect("decodes"), Mode::Busy);
        let value = json!({ "fuel": 3, "tags": ["a"] });
        assert_eq!(reread(&value).expect("decodes"), value);
        assert_eq!(reread(&Some(-5_i64)).expect("decodes"), Some(-5));
        let planet = CelestialCoordinate::planet(orbitile_core::IVec3::new(4, -2, 9), 3);
        assert_eq!(reread(&planet).expect("decodes"), planet);
        assert!(reread(&CelestialCoordinate::null()).expect("decodes").is_null());
    }

    #[test]
    fn unknown_variants_are_rejected() {
        let mut writer = ByteWriter::new();
        writer.write_vlq_u(7);
        assert!(matches!(
            Mode::read_value(&mut ByteReader::new(writer.as_bytes())),
            Err(NetError::InvalidEnum(7))
        ));
    }
}
