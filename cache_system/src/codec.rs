//! JSON encoding of cached values

use crate::errors::CacheError;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CacheError> {
    Ok(serde_json::to_vec(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CacheError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use store_object::{EntityId, Record};

    #[test]
    fn test_record_encodes_as_flat_json() {
        let created_at = "2024-05-01T12:00:00Z".parse().unwrap();
        let record = Record::new(
            EntityId::new("u1"),
            created_at,
            serde_json::json!({"name": "alice"}),
        );

        let bytes = encode(&record).unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();
        assert!(text.contains("\"id\":\"u1\""));
        assert!(text.contains("\"name\":\"alice\""));

        let back: Record<serde_json::Value> = decode(&bytes).unwrap();
        assert_eq!(back.id, record.id);
        assert_eq!(back.created_at, record.created_at);
    }

    #[test]
    fn test_decode_garbage_is_serialization_error() {
        let err = decode::<Vec<u32>>(b"not json").unwrap_err();
        assert!(matches!(err, CacheError::SerializationError(_)));
        assert!(!err.is_retryable());
    }
}
