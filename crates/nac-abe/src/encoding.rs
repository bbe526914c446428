//! Versioned, size-limited bincode framing shared by every scheme object

use bincode::Options;
use nac_core::{NacError, Result};
use serde::{de::DeserializeOwned, Serialize};

/// Current encoding version of scheme objects
pub const SCHEME_ENCODING_VERSION: u8 = 1;

/// Upper bound on any encoded scheme object
pub const MAX_OBJECT_BYTES: u64 = 4 * 1024 * 1024;

fn options() -> impl Options {
    bincode::DefaultOptions::new().with_limit(MAX_OBJECT_BYTES)
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let body = options().serialize(value)?;
    let mut out = Vec::with_capacity(body.len() + 1);
    out.push(SCHEME_ENCODING_VERSION);
    out.extend_from_slice(&body);
    Ok(out)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8], what: &str) -> Result<T> {
    let (version, body) = bytes
        .split_first()
        .ok_or_else(|| NacError::serialization(format!("empty {what} encoding")))?;
    if *version != SCHEME_ENCODING_VERSION {
        return Err(NacError::serialization(format!(
            "unsupported {what} encoding version {version}"
        )));
    }
    options()
        .reject_trailing_bytes()
        .deserialize(body)
        .map_err(|e| NacError::serialization(format!("invalid {what} encoding: {e}")))
}
