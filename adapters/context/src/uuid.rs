use std::{fmt, str::FromStr};

use orbitile_core::RandomSource;
use serde::{Deserialize, Serialize};

use crate::UuidParseError;

/// 128-bit identifier printed as 32 lowercase hex digits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uuid([u8; 16]);

impl Uuid {
    /// Wraps raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Draws a uuid from `random`.
    pub fn random(random: &mut RandomSource) -> Self {
        let mut bytes = [0_u8; 16];
        bytes[..8].copy_from_slice(&random.randu64().to_be_bytes());
        bytes[8..].copy_from_slice(&random.randu64().to_be_bytes());
        Self(bytes)
    }

    /// Raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for Uuid {
    type Err = UuidParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let well_formed = text.len() == 32
            && text
                .bytes()
                .all(|byte| byte.is_ascii_digit() || (b'a'..=b'f').contains(&byte));
        if !well_formed {
            return Err(UuidParseError(text.to_owned()));
        }
        let mut bytes = [0_u8; 16];
        for (slot, pair) in bytes.iter_mut().zip(text.as_bytes().chunks(2)) {
            let digits = std::str::from_utf8(pair).map_err(|_| UuidParseError(text.to_owned()))?;
            *slot = u8::from_str_radix(digits, 16).map_err(|_| UuidParseError(text.to_owned()))?;
        }
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Uuid {
    type Error = UuidParseError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        text.parse()
    }
}

impl From<Uuid> for String {
    fn from(uuid: Uuid) -> Self {
        uuid.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_lowercase_hex_and_parses_it_back() {
        let uuid = Uuid::random(&mut RandomSource::new(3));
        let text = uuid.to_string();
        assert_eq!(text.len(), 32);
        assert_eq!(text.parse::<Uuid>(), Ok(uuid));

        let fixed = Uuid::from_bytes([0xab; 16]);
        assert_eq!(fixed.to_string(), "ab".repeat(16));
        assert!("AB".repeat(16).parse::<Uuid>().is_err());
        assert!("1234".parse::<Uuid>().is_err());
        assert!("g".repeat(32).parse::<Uuid>().is_err());
    }
}
