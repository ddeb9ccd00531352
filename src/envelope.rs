//! Strict decode of the fixed page envelope.
//!
//! Wire shape: `{"data": {"total": <int>, "results": [<Item>, ...]}}`.
//! `total` is the server-side count for the filter; `results` carries only
//! the requested offset/limit window.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::DecodeError;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Page<T>,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    total: u64,
    results: Vec<T>,
}

/// Decode one page envelope into `(items, total)`.
///
/// Any shape mismatch is an error here; the fetch engine degrades it to
/// "no progress this round" so transient decode failures never corrupt
/// previously accumulated state.
pub fn decode_page<T: DeserializeOwned>(bytes: &[u8]) -> Result<(Vec<T>, u64), DecodeError> {
    let envelope: Envelope<T> = serde_json::from_slice(bytes)?;
    Ok((envelope.data.results, envelope.data.total))
}
