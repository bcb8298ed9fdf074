//! Autoindex wire types and cache record format
//!
//! Metadata responses are served as JSON (see [`types`]). The cache keeps
//! each encoded response behind a fixed-width expiry header so that freshness
//! travels with the bytes instead of living in cache bookkeeping.
//!
//! # Cache Record Format
//!
//! Header Format: !q (8 bytes, Network Byte Order / Big Endian)
//! ```text
//! [EXPIRES_AT:8][BODY:*]
//! ```
//!
//! - EXPIRES_AT (i64): absolute Unix timestamp (seconds). The record is fresh
//!   strictly before this second and expired from it onwards.
//! - BODY: the encoded [`Response`] exactly as served.

pub mod codec;
pub mod defaults;
pub mod error;
pub mod types;

pub use codec::{decode, encode};
pub use error::{ProtocolError, Result};
pub use types::{Entry, EntryKind, Response};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;
use std::time::Duration;

/// Header size in bytes
pub const HEADER_SIZE: usize = 8;

/// Expiry prefix of a cache record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryHeader {
    pub expires_at: i64,
}

impl ExpiryHeader {
    pub fn new(expires_at: i64) -> Self {
        Self { expires_at }
    }

    /// Header for a record written at `now` that lives for `ttl`.
    ///
    /// Sub-second parts of `ttl` are dropped; the clock has second resolution.
    pub fn expiring_after(now: i64, ttl: Duration) -> Self {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        Self::new(now.saturating_add(ttl_secs))
    }

    /// Pack header into 8-byte buffer
    pub fn pack(&self) -> Result<[u8; HEADER_SIZE]> {
        let mut buf = [0u8; HEADER_SIZE];
        let mut cursor = Cursor::new(&mut buf[..]);
        cursor.write_i64::<BigEndian>(self.expires_at)?;
        Ok(buf)
    }

    /// Unpack header from the first 8 bytes of `data`
    pub fn unpack(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(ProtocolError::CorruptRecord {
                expected: HEADER_SIZE,
                got: data.len(),
            });
        }

        let mut cursor = Cursor::new(&data[..HEADER_SIZE]);
        let expires_at = cursor.read_i64::<BigEndian>()?;

        Ok(Self { expires_at })
    }

    pub fn is_expired(&self, now: i64) -> bool {
        is_expired(self.expires_at, now)
    }
}

/// Closed-open freshness window: expired starting exactly at `expires_at`.
#[inline]
pub fn is_expired(expires_at: i64, now: i64) -> bool {
    now >= expires_at
}

/// Prepend an expiry header (`now + ttl`) to an encoded body.
pub fn wrap_record(body: &[u8], ttl: Duration, now: i64) -> Result<Vec<u8>> {
    let header = ExpiryHeader::expiring_after(now, ttl).pack()?;
    let mut record = Vec::with_capacity(HEADER_SIZE + body.len());
    record.extend_from_slice(&header);
    record.extend_from_slice(body);
    Ok(record)
}

/// Split a cache record into its header and body.
pub fn unwrap_record(record: &[u8]) -> Result<(ExpiryHeader, &[u8])> {
    let header = ExpiryHeader::unpack(record)?;
    Ok((header, &record[HEADER_SIZE..]))
}
