use serde::{Serialize, de::DeserializeOwned};

use crate::error::{Error, Result};

/// MIME type of the event wire format.
pub const CONTENT_TYPE: &str = "application/json";

/// Encode a value to its JSON wire representation.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(Error::from)
}

/// Decode a value from its JSON wire representation.
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    serde_json::from_slice(data).map_err(Error::from)
}
