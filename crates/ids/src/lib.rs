//! Time-ordered 16-byte identifiers.
//!
//! The first 8 bytes are a big-endian nanosecond timestamp; the last 8 are
//! random with the variant nibble cleared so the value is visually distinct
//! from a standard UUID. Lexical (byte-wise) ordering matches generation
//! order, which is what peer leader election and assignment staleness checks
//! rely on.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdParseError {
    #[error("identifier must be 32 hex characters (with optional dashes), got {0}")]
    WrongLength(usize),
    #[error("identifier contains non-hex characters")]
    InvalidHex,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Id(pub [u8; 16]);

impl Id {
    /// Generate a new identifier stamped with the current wall-clock time.
    pub fn new() -> Self {
        Self::at(now_nanos())
    }

    /// Generate an identifier stamped with an explicit nanosecond timestamp.
    /// Exposed for deterministic tests that need strict ordering.
    pub fn at(nanos_since_epoch: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[0..8].copy_from_slice(&nanos_since_epoch.to_be_bytes());
        rand::thread_rng().fill_bytes(&mut bytes[8..16]);
        // Clear the top two bits of byte 8 so this never collides in shape
        // with a standard UUID variant byte.
        bytes[8] &= 0x3f;
        Id(bytes)
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Id(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Nanoseconds-since-epoch encoded in the leading 8 bytes.
    pub fn timestamp_nanos(&self) -> u64 {
        u64::from_be_bytes(self.0[0..8].try_into().expect("8 bytes"))
    }

    pub fn nil() -> Self {
        Id([0u8; 16])
    }

    pub fn is_nil(&self) -> bool {
        self.0 == [0u8; 16]
    }
}

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_nanos() as u64
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7], b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15]
        )
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self)
    }
}

impl FromStr for Id {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex: String = s.chars().filter(|c| *c != '-').collect();
        if hex.len() != 32 {
            return Err(IdParseError::WrongLength(hex.len()));
        }
        let mut bytes = [0u8; 16];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk).map_err(|_| IdParseError::InvalidHex)?;
            bytes[i] = u8::from_str_radix(pair, 16).map_err(|_| IdParseError::InvalidHex)?;
        }
        Ok(Id(bytes))
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Id::from_str(&s).map_err(serde::de::Error::custom)
    }
}
