//! Opaque request/response messages between slaves and a master.

use orbitile_core::{IVec2, IVec3};
use serde::{Deserialize, Serialize};

use crate::{CelestialChunk, CelestialError, CelestialSystemObjects};

/// Something a slave is missing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CelestialRequest {
    /// A chunk's systems and constellations.
    Chunk(IVec2),
    /// The objects orbiting the system at a location.
    System(IVec3),
}

/// Answer to a [`CelestialRequest`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CelestialResponse {
    /// Chunk without system objects.
    Chunk(CelestialChunk),
    /// Objects of one system.
    System(IVec3, CelestialSystemObjects),
}

/// Encodes a batch of requests.
pub fn encode_requests(requests: &[CelestialRequest]) -> Result<Vec<u8>, CelestialError> {
    Ok(bincode::serialize(requests)?)
}

/// Decodes a batch of requests.
pub fn decode_requests(bytes: &[u8]) -> Result<Vec<CelestialRequest>, CelestialError> {
    Ok(bincode::deserialize(bytes)?)
}

/// Encodes a batch of responses.
pub fn encode_responses(responses: &[CelestialResponse]) -> Result<Vec<u8>, CelestialError> {
    Ok(bincode::serialize(responses)?)
}

/// Decodes a batch of responses.
pub fn decode_responses(bytes: &[u8]) -> Result<Vec<CelestialResponse>, CelestialError> {
    Ok(bincode::deserialize(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_batches_fail_to_decode() {
        let bytes = encode_requests(&[
            CelestialRequest::Chunk(IVec2::new(-2, 7)),
            CelestialRequest::System(IVec3::new(1, 2, 3)),
        ])
        .expect("requests encode");
        assert_eq!(
            decode_requests(&bytes).expect("requests decode"),
            vec![
                CelestialRequest::Chunk(IVec2::new(-2, 7)),
                CelestialRequest::System(IVec3::new(1, 2, 3)),
            ]
        );
        assert!(matches!(
            decode_requests(&bytes[..bytes.len() - 1]),
            Err(CelestialError::Codec(_))
        ));
    }
}
