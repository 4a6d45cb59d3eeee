//! Core types for the attendance ledger.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use scale::{Decode, Encode};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Sequential course identifier, assigned from 0.
pub type CourseId = u64;

/// Caller-supplied session identifier. Never validated against a registry.
pub type SessionId = u64;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Authenticated account identifier (32 bytes).
///
/// Produced by an identity provider outside the ledger. Textual form is
/// `0x`-prefixed hex; parsing also accepts bare hex and base58.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Encode, Decode)]
pub struct Identity([u8; 32]);

impl Identity {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Identity(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short hex prefix for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self)
    }
}

/// Failure to parse an identity from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityParseError {
    #[error("Identity must be 32 bytes, got {0}")]
    InvalidLength(usize),

    #[error("Identity is neither hex nor base58: {0}")]
    InvalidEncoding(String),
}

impl FromStr for Identity {
    type Err = IdentityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bytes = match trimmed.strip_prefix("0x") {
            Some(digits) => hex::decode(digits)
                .map_err(|e| IdentityParseError::InvalidEncoding(e.to_string()))?,
            None if trimmed.len() == 64 => hex::decode(trimmed)
                .map_err(|e| IdentityParseError::InvalidEncoding(e.to_string()))?,
            None => bs58::decode(trimmed)
                .into_vec()
                .map_err(|e| IdentityParseError::InvalidEncoding(e.to_string()))?,
        };
        let len = bytes.len();
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| IdentityParseError::InvalidLength(len))?;
        Ok(Identity(array))
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// A course and its authorized instructors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub is_active: bool,
    /// Append-only; duplicates collapse.
    pub instructors: BTreeSet<Identity>,
}

/// Presence flag and the commit timestamp of the last write.
///
/// `Default` is the zero record `(false, 0)` returned for keys never written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Encode, Decode)]
pub struct AttendanceRecord {
    pub timestamp: Timestamp,
    pub is_present: bool,
}

/// Composite key of an attendance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Encode, Decode)]
pub struct AttendanceKey {
    pub course_id: CourseId,
    pub session_id: SessionId,
    pub student: Identity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_hex_round_trip() {
        let identity = Identity::new([0xAB; 32]);
        let text = identity.to_string();
        assert!(text.starts_with("0xabab"));
        assert_eq!(text.parse::<Identity>().unwrap(), identity);
        assert_eq!(text[2..].parse::<Identity>().unwrap(), identity);
    }

    #[test]
    fn test_identity_base58() {
        let identity = Identity::new([7u8; 32]);
        let encoded = bs58::encode(identity.as_bytes()).into_string();
        assert_eq!(encoded.parse::<Identity>().unwrap(), identity);
    }

    #[test]
    fn test_identity_wrong_length() {
        assert_eq!(
            "0x0102".parse::<Identity>(),
            Err(IdentityParseError::InvalidLength(2))
        );
        assert!(matches!(
            "0xzz".parse::<Identity>(),
            Err(IdentityParseError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_identity_serde_as_string() {
        let identity = Identity::new([1u8; 32]);
        let json = serde_json::to_string(&identity).unwrap();
        assert_eq!(json, format!("\"{}\"", identity));
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, identity);
    }

    #[test]
    fn test_default_record_is_absent() {
        let record = AttendanceRecord::default();
        assert!(!record.is_present);
        assert_eq!(record.timestamp, 0);
    }
}
