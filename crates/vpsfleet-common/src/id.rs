//! Batch identifiers with an embedded creation timestamp
//!
//! A batch id is 32 lowercase hex characters: a 20-character random prefix
//! followed by a 12-character (48-bit) millisecond UNIX timestamp. Every
//! server in a batch carries the id in its free-text group tag, so batch
//! membership and age can be recomputed from live vendor state alone —
//! there is no local registry to lose or corrupt.
//!
//! ## Tag Schema
//!
//! | Form | Example |
//! |------|---------|
//! | bare id | `d1f0a9c3b2e48876aa10015c2f3ab4d9` |
//! | full group tag | `batch-d1f0a9c3b2e48876aa10015c2f3ab4d9` |

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Serialize, Serializer};
use std::fmt;

/// Total id length in hex characters.
pub const ID_LEN: usize = 32;

/// Hex characters reserved for the millisecond timestamp suffix.
const TIMESTAMP_LEN: usize = 12;

/// Literal prefix of the full group tag.
pub const TAG_PREFIX: &str = "batch";

/// Ids with an embedded timestamp at or before this instant are rejected
/// (2017-06-01T00:00:00Z, before the first deployment of this scheme).
const EPOCH_FLOOR_MS: i64 = 1_496_275_200_000;

/// Clock-skew allowance when validating the timestamp upper bound.
const MAX_SKEW_MS: i64 = 24 * 3600 * 1000;

/// Opaque batch identifier embedding its creation time.
///
/// Constructed only through [`BatchId::generate`] or the parsers, so a value
/// of this type always satisfies the length, alphabet and timestamp-window
/// invariants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchId {
    token: String,
    timestamp_ms: i64,
}

impl BatchId {
    /// Mint a fresh id: random prefix, current time suffix.
    pub fn generate() -> Self {
        let mut prefix = [0u8; (ID_LEN - TIMESTAMP_LEN) / 2];
        rand::thread_rng().fill_bytes(&mut prefix);
        let timestamp_ms = Utc::now().timestamp_millis();
        let mut token = String::with_capacity(ID_LEN);
        for byte in prefix {
            token.push_str(&format!("{byte:02x}"));
        }
        token.push_str(&format!("{timestamp_ms:012x}"));
        Self { token, timestamp_ms }
    }

    /// Parse a candidate id.
    ///
    /// Returns `None` unless the candidate is exactly [`ID_LEN`] lowercase
    /// hex characters and its timestamp suffix falls strictly between the
    /// epoch floor and now + 24h. Absence, never an error: callers treat
    /// unparseable strings as "not part of any managed batch".
    pub fn parse(candidate: &str) -> Option<Self> {
        if candidate.len() != ID_LEN {
            return None;
        }
        if !candidate
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        {
            return None;
        }
        let timestamp_ms = i64::from_str_radix(&candidate[ID_LEN - TIMESTAMP_LEN..], 16).ok()?;
        let max = Utc::now().timestamp_millis() + MAX_SKEW_MS;
        if timestamp_ms <= EPOCH_FLOOR_MS || timestamp_ms >= max {
            return None;
        }
        Some(Self {
            token: candidate.to_string(),
            timestamp_ms,
        })
    }

    /// Parse a full group tag of the form `batch-<id>`.
    ///
    /// The tag field is vendor free text; anything after the id component is
    /// ignored so unrelated suffixes cannot hide a managed batch.
    pub fn parse_full_tag(tag: &str) -> Option<Self> {
        let mut parts = tag.split('-');
        if parts.next()? != TAG_PREFIX {
            return None;
        }
        Self::parse(parts.next()?)
    }

    /// The full group tag, `batch-<id>`.
    pub fn full_tag(&self) -> String {
        format!("{}-{}", TAG_PREFIX, self.token)
    }

    /// The bare 32-character token.
    pub fn as_str(&self) -> &str {
        &self.token
    }

    /// Embedded creation time in milliseconds since the UNIX epoch.
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    /// Embedded creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp_ms).unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Replace the timestamp suffix, preserving the random prefix.
    ///
    /// Only test and administrative tooling rewrites timestamps, to simulate
    /// batch age; the production workflow never mutates an id.
    pub fn with_timestamp(&self, timestamp_ms: i64) -> Self {
        let timestamp_ms = timestamp_ms & 0xffff_ffff_ffff;
        let mut token = self.token[..ID_LEN - TIMESTAMP_LEN].to_string();
        token.push_str(&format!("{timestamp_ms:012x}"));
        Self { token, timestamp_ms }
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

impl Serialize for BatchId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.token)
    }
}
