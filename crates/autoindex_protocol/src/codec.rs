//! Canonical byte encoding of [`Response`] (JSON).

use crate::error::Result;
use crate::types::Response;

/// Encode a response into its wire bytes.
pub fn encode(response: &Response) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(response)?)
}

/// Decode wire bytes back into a response.
pub fn decode(bytes: &[u8]) -> Result<Response> {
    Ok(serde_json::from_slice(bytes)?)
}
