//! Core types for the snapshot engine.

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;

/// Current on-disk format version, written into every container file.
pub const FORMAT_VERSION: u32 = 1;

/// Content hash identifying stored objects (SHA-1, 20 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash(pub [u8; 20]);

impl Serialize for Hash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl Hash {
    /// Compute the hash of a byte slice.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(data);
        Hash(hasher.finalize().into())
    }

    /// Convert to a 40-character hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 40-character hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim())?;
        let arr: [u8; 20] = bytes.try_into().map_err(|_| {
            StoreError::InvalidFormat("a hex hash string must be 40 characters".into())
        })?;
        Ok(Hash(arr))
    }

    /// First two hex characters, used for on-disk sharding.
    pub fn shard_prefix(&self) -> String {
        hex::encode(&self.0[0..1])
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({}...)", &self.to_hex()[..8])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Validate a format version read from a container file.
///
/// Fails with a distinguishable error when the version is below the minimum
/// this build still reads, or newer than this build knows how to read.
pub fn validate_version(found: u32, minimum: u32) -> Result<()> {
    if found < minimum {
        return Err(StoreError::VersionTooOld { found, minimum });
    }
    if found > FORMAT_VERSION {
        return Err(StoreError::VersionTooNew {
            found,
            newest: FORMAT_VERSION,
        });
    }
    Ok(())
}

/// Magic numbers marking worldvault file formats.
pub mod magic {
    pub const BLOB: u32 = 0x7776_4262; // wvBb
    pub const TREE: u32 = 0x7776_4274; // wvBt
    pub const DIMENSION: u32 = 0x7776_4264; // wvBd
    pub const WORLD: u32 = 0x7776_4277; // wvBw
    pub const WORLD_CONTAINER: u32 = 0x7776_4257; // wvBW
    pub const COMMIT: u32 = 0x7776_426B; // wvBk
    pub const REGION_STORAGE: u32 = 0x7776_5273; // wvRs
    pub const REGION_VERSIONS: u32 = 0x7776_5276; // wvRv
}

/// Coordinates of a region file (units of 32x32 chunks).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionPos {
    pub x: i32,
    pub z: i32,
}

impl RegionPos {
    pub fn new(x: i32, z: i32) -> Self {
        RegionPos { x, z }
    }

    /// Format a region file name such as `r.-1.2.mca`.
    pub fn file_name(&self, extension: &str) -> String {
        format!("r.{}.{}{}", self.x, self.z, extension)
    }

    /// Parse region coordinates out of a file name such as `r.-1.2.mca`.
    pub fn parse_file_name(name: &str, extension: &str) -> Option<Self> {
        let rest = name.strip_prefix("r.")?.strip_suffix(extension)?;
        let (x, z) = rest.split_once('.')?;
        let x = x.parse().ok()?;
        let z = z.parse().ok()?;
        Some(RegionPos { x, z })
    }
}

impl fmt::Display for RegionPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_roundtrip() {
        let hash = Hash::from_bytes(b"hello world");
        let parsed = Hash::from_hex(&hash.to_hex()).unwrap();
        assert_eq!(hash, parsed);
    }

    #[test]
    fn hash_shard_prefix() {
        let hash = Hash::from_bytes(b"test");
        assert_eq!(hash.shard_prefix().len(), 2);
        assert!(hash.to_hex().starts_with(&hash.shard_prefix()));
    }

    #[test]
    fn version_validation() {
        assert!(validate_version(FORMAT_VERSION, 1).is_ok());
        assert!(matches!(
            validate_version(0, 1),
            Err(StoreError::VersionTooOld { found: 0, minimum: 1 })
        ));
        assert!(matches!(
            validate_version(FORMAT_VERSION + 1, 1),
            Err(StoreError::VersionTooNew { .. })
        ));
    }

    #[test]
    fn region_file_names() {
        let pos = RegionPos::new(-3, 12);
        assert_eq!(pos.file_name(".mca"), "r.-3.12.mca");
        assert_eq!(RegionPos::parse_file_name("r.-3.12.mca", ".mca"), Some(pos));
        assert_eq!(RegionPos::parse_file_name("r.-3.12.mca", ".wvs.zst"), None);
        assert_eq!(RegionPos::parse_file_name("level.dat", ".mca"), None);
    }
}
