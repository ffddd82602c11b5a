//! Deduplicating version-numbered storage.

use crate::error::{Result, StoreError};
use crate::nbt::{self, Compound};
use crate::wire;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::io::{Read, Write};

/// A map from version number to value with a reverse map for deduplication.
///
/// Version numbers are positive and assigned as the lowest unused number.
/// Inserting a value that is structurally equal to an already stored value
/// returns the existing version number without storing anything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VersionMap<T: Eq + Hash> {
    forward: BTreeMap<u32, T>,
    reverse: HashMap<T, u32>,
}

impl<T: Clone + Eq + Hash> VersionMap<T> {
    pub fn new() -> Self {
        VersionMap {
            forward: BTreeMap::new(),
            reverse: HashMap::new(),
        }
    }

    /// Insert a value, returning its version number. Deduplicates.
    pub fn insert(&mut self, value: T) -> u32 {
        if let Some(&existing) = self.reverse.get(&value) {
            return existing;
        }
        let mut number = 1;
        while self.forward.contains_key(&number) {
            number += 1;
        }
        self.forward.insert(number, value.clone());
        self.reverse.insert(value, number);
        number
    }

    /// Insert a value under a specific version number, as read from disk.
    pub fn insert_numbered(&mut self, number: u32, value: T) {
        self.forward.insert(number, value.clone());
        self.reverse.insert(value, number);
    }

    pub fn get(&self, number: u32) -> Option<&T> {
        self.forward.get(&number)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.forward.iter().map(|(&number, value)| (number, value))
    }
}

/// Versioned storage of nbt compounds, usually different versions of the
/// same logical piece of data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NbtStore {
    versions: VersionMap<Compound>,
}

impl NbtStore {
    pub fn new() -> Self {
        NbtStore {
            versions: VersionMap::new(),
        }
    }

    /// Store a compound, returning the version number it is stored as.
    /// An identical compound is not stored twice.
    pub fn store(&mut self, compound: Compound) -> u32 {
        self.versions.insert(compound)
    }

    /// Get a compound by version number.
    pub fn get(&self, number: u32) -> Result<&Compound> {
        self.versions.get(number).ok_or_else(|| {
            StoreError::InvalidFormat(format!("nbt version number {number} not present in storage"))
        })
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        wire::write_u32(w, self.versions.len() as u32)?;
        for (number, compound) in self.versions.iter() {
            wire::write_u32(w, number)?;
            nbt::write_compound(w, compound)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let count = wire::read_u32(r)?;
        let mut versions = VersionMap::new();
        for _ in 0..count {
            let number = wire::read_u32(r)?;
            let compound = nbt::read_compound(r)?;
            versions.insert_numbered(number, compound);
        }
        Ok(NbtStore { versions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nbt::Tag;

    #[test]
    fn version_numbers_start_at_one() {
        let mut map = VersionMap::new();
        assert_eq!(map.insert("a".to_string()), 1);
        assert_eq!(map.insert("b".to_string()), 2);
    }

    #[test]
    fn equal_values_share_a_version_number() {
        let mut map = VersionMap::new();
        assert_eq!(map.insert(vec![1, 2]), 1);
        assert_eq!(map.insert(vec![3]), 2);
        assert_eq!(map.insert(vec![1, 2]), 1);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn lowest_unused_number_fills_gaps() {
        let mut map = VersionMap::new();
        map.insert_numbered(1, "a".to_string());
        map.insert_numbered(3, "c".to_string());
        assert_eq!(map.insert("b".to_string()), 2);
    }

    #[test]
    fn nbt_store_roundtrip() {
        let mut store = NbtStore::new();
        let mut first = Compound::new();
        first.set("InhabitedTime", Tag::Long(120));
        let mut second = Compound::new();
        second.set("InhabitedTime", Tag::Long(140));

        let v1 = store.store(first.clone());
        let v2 = store.store(second);
        let again = store.store(first.clone());
        assert_eq!(v1, again);
        assert_ne!(v1, v2);

        let mut bytes = Vec::new();
        store.write_to(&mut bytes).unwrap();
        let read = NbtStore::read_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(read.get(v1).unwrap(), &first);

        // Deduplication still works after a read.
        let mut read = read;
        assert_eq!(read.store(first), v1);
    }
}
