//! Binary envelope used by every structure's `to_bytes` and `from_bytes`.
//!
//! ```text
//! +-------+---------+-----+----------------------+
//! | magic | version | tag | payload (bincode)    |
//! | 4 B   | u16 BE  | u8  | ...                  |
//! +-------+---------+-----+----------------------+
//! ```
//!
//! Payloads use fixed-width integer encoding and are decoded with a size limit equal to the
//! payload length, so a forged length prefix cannot trigger a large allocation.

use crate::error::{corrupt_state, Error, Result};
use crate::structure::StructureKind;
use bincode::Options;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Cursor, Read};

const MAGIC: [u8; 4] = *b"PSKE";
pub(crate) const FORMAT_VERSION: u16 = 1;
const HEADER_LEN: usize = MAGIC.len() + 2 + 1;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_big_endian()
}

/// Encodes `state` behind a header tagged with `kind`.
pub(crate) fn encode<T: Serialize>(kind: StructureKind, state: &T) -> Result<Vec<u8>> {
    let payload = options()
        .serialize(state)
        .map_err(|err| Error::Encode(err.to_string()))?;
    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(&MAGIC);
    bytes
        .write_u16::<BigEndian>(FORMAT_VERSION)
        .and_then(|_| bytes.write_u8(kind.tag()))
        .map_err(|err| Error::Encode(err.to_string()))?;
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Reads the header of `bytes`, returning the structure kind and the payload.
pub(crate) fn decode_header(bytes: &[u8]) -> Result<(StructureKind, &[u8])> {
    let mut cursor = Cursor::new(bytes);
    let mut magic = [0u8; 4];
    cursor
        .read_exact(&mut magic)
        .map_err(|_| corrupt_state("buffer is too short for a header"))?;
    if magic != MAGIC {
        return Err(corrupt_state("bad magic bytes"));
    }
    let version = cursor
        .read_u16::<BigEndian>()
        .map_err(|_| corrupt_state("buffer is too short for a header"))?;
    if version != FORMAT_VERSION {
        return Err(corrupt_state(format!(
            "unsupported format version {} (expected {})",
            version, FORMAT_VERSION,
        )));
    }
    let tag = cursor
        .read_u8()
        .map_err(|_| corrupt_state("buffer is too short for a header"))?;
    let kind = StructureKind::from_tag(tag)
        .ok_or_else(|| corrupt_state(format!("unknown structure tag {}", tag)))?;
    Ok((kind, &bytes[HEADER_LEN..]))
}

/// Decodes the payload of a structure of the given `kind`.
pub(crate) fn decode<T: DeserializeOwned>(expected: StructureKind, bytes: &[u8]) -> Result<T> {
    let (kind, payload) = decode_header(bytes)?;
    if kind != expected {
        return Err(corrupt_state(format!(
            "buffer holds a {} but a {} was expected",
            kind, expected,
        )));
    }
    decode_payload(payload)
}

pub(crate) fn decode_payload<T: DeserializeOwned>(payload: &[u8]) -> Result<T> {
    options()
        .with_limit(payload.len() as u64)
        .reject_trailing_bytes()
        .deserialize(payload)
        .map_err(|err| {
            tracing::debug!(error = %err, "rejected payload");
            corrupt_state(err.to_string())
        })
}
