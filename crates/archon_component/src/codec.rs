//! MessagePack codec helpers.
//!
//! Component values and every persisted record go through these two
//! functions. Structs are encoded with field names so a stored blob carries
//! enough shape information to be checked against a later registration.

use serde::{Serialize, de::DeserializeOwned};

use crate::error::CodecError;

/// Encode a value to named MessagePack bytes.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialisation fails.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    rmp_serde::to_vec_named(value).map_err(CodecError::Encode)
}

/// Decode a value from MessagePack bytes.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] if deserialisation fails.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    rmp_serde::from_slice(bytes).map_err(CodecError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Energy {
        amt: i64,
        cap: i64,
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let value = Energy { amt: 10, cap: 100 };
        let bytes = encode(&value).unwrap();
        let restored: Energy = decode(&bytes).unwrap();
        assert_eq!(value, restored);
    }

    #[test]
    fn test_decode_invalid_bytes() {
        let result: Result<Energy, _> = decode(&[0xFF, 0xFF]);
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }
}
