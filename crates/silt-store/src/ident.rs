// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifier types and the wall clock used to stamp records.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;

use crate::error::StoreError;

/// Strongly typed 128-bit object identifier.
///
/// Ids are opaque 16-byte values, stable across restarts. Fresh ids are
/// random with two bytes forced into a UUID-shaped pattern so they read
/// familiarly in logs and hex dumps; nothing in the substrate relies on that
/// shape, and cryptographic quality is not guaranteed.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct ObjectId(pub [u8; 16]);

impl ObjectId {
    /// Draws a fresh random identifier.
    #[must_use]
    pub fn random() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes[6] = (bytes[6] & 0x0f) | 0x40;
        bytes[8] = (bytes[8] & 0x3f) | 0x80;
        Self(bytes)
    }

    /// Returns the canonical byte representation of this id.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Renders the canonical form: exactly 32 lowercase hexadecimal
    /// characters.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses the canonical hex form. Accepts exactly 32 hex characters,
    /// case-insensitive; anything else is [`StoreError::InvalidHex`].
    pub fn from_hex(text: &str) -> Result<Self, StoreError> {
        if text.len() != 32 {
            return Err(StoreError::InvalidHex(text.to_owned()));
        }
        let raw = hex::decode(text).map_err(|_| StoreError::InvalidHex(text.to_owned()))?;
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&raw);
        Ok(Self(bytes))
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Strongly typed identifier for the logical type of an object.
///
/// Nonzero for user types; compared for equality as a whole.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct TypeId(pub u64);

impl std::fmt::Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Monotonic per-object revision number. Creation always emits version 1; no
/// update operation exists today, so the data model's multi-version headroom
/// is unexercised.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Version(pub u64);

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a specific immutable revision of an object.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct ObjectRef {
    /// Object identity.
    pub id: ObjectId,
    /// Revision of that object.
    pub version: Version,
}

impl ObjectRef {
    /// Builds a ref from an id and a raw version number.
    #[must_use]
    pub fn new(id: ObjectId, version: u64) -> Self {
        Self {
            id,
            version: Version(version),
        }
    }
}

/// Current wall-clock milliseconds since the Unix epoch.
///
/// Not a causal clock: records produced in the same millisecond are ordered
/// by their segment offsets, never by this stamp.
#[must_use]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_carry_the_debug_pattern() {
        for _ in 0..64 {
            let id = ObjectId::random();
            assert_eq!(id.0[6] >> 4, 0x4);
            assert_eq!(id.0[8] >> 6, 0b10);
        }
    }

    #[test]
    fn hex_round_trip_is_exact() {
        let id = ObjectId::random();
        let text = id.to_hex();
        assert_eq!(text.len(), 32);
        assert!(text.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(ObjectId::from_hex(&text).unwrap(), id);
    }

    #[test]
    fn from_hex_accepts_uppercase() {
        let id = ObjectId::random();
        let upper = id.to_hex().to_uppercase();
        assert_eq!(ObjectId::from_hex(&upper).unwrap(), id);
    }

    #[test]
    fn from_hex_rejects_malformed_input() {
        assert!(matches!(
            ObjectId::from_hex("abc"),
            Err(StoreError::InvalidHex(_))
        ));
        assert!(matches!(
            ObjectId::from_hex(&"g".repeat(32)),
            Err(StoreError::InvalidHex(_))
        ));
        assert!(matches!(
            ObjectId::from_hex(&"0".repeat(33)),
            Err(StoreError::InvalidHex(_))
        ));
    }
}
