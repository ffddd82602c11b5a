//! Versioned storage of a single chunk.

mod nbt_store;
mod parts;

pub use nbt_store::{NbtStore, VersionMap};
pub use parts::{PartId, PartStore, SectionStore, NO_SECTIONS};

use crate::error::{Result, StoreError};
use crate::nbt::Compound;
use crate::wire;
use std::collections::BTreeMap;
use std::io::{Read, Write};

/// One version of a chunk: the version number of each data part.
type ChunkVersion = BTreeMap<u8, u32>;

/// Storage for every stored version of one chunk.
///
/// A chunk version is the map from part id to part version number. The map
/// itself is deduplicated, so a chunk whose parts all resolved to existing
/// versions gets its old version number back and storing it adds nothing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChunkStorage {
    chunk_versions: VersionMap<ChunkVersion>,
    part_stores: BTreeMap<u8, PartStore>,
}

impl ChunkStorage {
    pub fn new() -> Self {
        ChunkStorage::default()
    }

    /// Store a version of this chunk, returning its chunk version number.
    ///
    /// The chunk compound is consumed; extraction dismembers it part by part.
    pub fn store(&mut self, chunk: Compound) -> Result<u32> {
        let mut chunk = chunk;
        let mut chunk_version = ChunkVersion::new();

        for part in PartId::ORDERED {
            let store = self
                .part_stores
                .entry(part.id())
                .or_insert_with(|| part.create_store());
            let part_version = store.store_part(part, &mut chunk)?;
            chunk_version.insert(part.id(), part_version);
        }

        Ok(self.chunk_versions.insert(chunk_version))
    }

    /// Restore a chunk by version number, reassembling its parts.
    pub fn restore(&self, version_number: u32) -> Result<Compound> {
        let chunk_version = self.chunk_versions.get(version_number).ok_or_else(|| {
            StoreError::InvalidFormat(format!(
                "chunk version number {version_number} not present in storage"
            ))
        })?;

        let mut chunk = Compound::new();
        for (&part_id, &part_version) in chunk_version {
            let store = self.part_stores.get(&part_id).ok_or_else(|| {
                StoreError::InvalidFormat(format!(
                    "chunk references data part id {part_id} with no storage"
                ))
            })?;
            store.restore_part(&mut chunk, part_version)?;
        }
        Ok(chunk)
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        wire::write_u32(w, self.chunk_versions.len() as u32)?;
        for (number, chunk_version) in self.chunk_versions.iter() {
            wire::write_u32(w, number)?;
            wire::write_u32(w, chunk_version.len() as u32)?;
            for (&part_id, &part_version) in chunk_version {
                wire::write_u8(w, part_id)?;
                wire::write_u32(w, part_version)?;
            }
        }
        wire::write_u32(w, self.part_stores.len() as u32)?;
        for (&part_id, store) in &self.part_stores {
            wire::write_u8(w, part_id)?;
            store.write_to(w)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let version_count = wire::read_u32(r)?;
        let mut chunk_versions = VersionMap::new();
        for _ in 0..version_count {
            let number = wire::read_u32(r)?;
            let part_count = wire::read_u32(r)?;
            let mut chunk_version = ChunkVersion::new();
            for _ in 0..part_count {
                let part_id = wire::read_u8(r)?;
                let part_version = wire::read_u32(r)?;
                chunk_version.insert(part_id, part_version);
            }
            chunk_versions.insert_numbered(number, chunk_version);
        }

        let store_count = wire::read_u32(r)?;
        let mut part_stores = BTreeMap::new();
        for _ in 0..store_count {
            let part_id = wire::read_u8(r)?;
            let part = PartId::from_id(part_id)?;
            part_stores.insert(part_id, part.read_store(r)?);
        }

        Ok(ChunkStorage {
            chunk_versions,
            part_stores,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nbt::Tag;

    fn chunk(last_update: i64, status: &str) -> Compound {
        let mut chunk = Compound::new();
        chunk.set("LastUpdate", Tag::Long(last_update));
        chunk.set("InhabitedTime", Tag::Long(77));
        chunk.set("Status", Tag::String(status.into()));
        let mut section = Compound::new();
        section.set("Y", Tag::Byte(0));
        chunk.set("sections", Tag::List(vec![Tag::Compound(section)]));
        chunk
    }

    #[test]
    fn store_and_restore_is_lossless() {
        let mut storage = ChunkStorage::new();
        let original = chunk(100, "full");
        let version = storage.store(original.clone()).unwrap();
        assert_eq!(storage.restore(version).unwrap(), original);
    }

    #[test]
    fn identical_chunks_share_a_version_number() {
        let mut storage = ChunkStorage::new();
        let v1 = storage.store(chunk(100, "full")).unwrap();
        let v2 = storage.store(chunk(100, "full")).unwrap();
        assert_eq!(v1, v2);
    }

    #[test]
    fn frequent_updater_change_gets_a_new_chunk_version() {
        let mut storage = ChunkStorage::new();
        let v1 = storage.store(chunk(100, "full")).unwrap();
        let v2 = storage.store(chunk(200, "full")).unwrap();
        assert_ne!(v1, v2);

        // Both versions restore independently.
        assert_eq!(
            storage.restore(v1).unwrap().get("LastUpdate"),
            Some(&Tag::Long(100))
        );
        assert_eq!(
            storage.restore(v2).unwrap().get("LastUpdate"),
            Some(&Tag::Long(200))
        );
    }

    #[test]
    fn serialization_roundtrip_preserves_versions() {
        let mut storage = ChunkStorage::new();
        let original = chunk(100, "full");
        let v1 = storage.store(original.clone()).unwrap();
        let v2 = storage.store(chunk(200, "empty")).unwrap();

        let mut bytes = Vec::new();
        storage.write_to(&mut bytes).unwrap();
        let mut read = ChunkStorage::read_from(&mut bytes.as_slice()).unwrap();

        assert_eq!(read.restore(v1).unwrap(), original);
        assert!(read.restore(v2).is_ok());

        // Storing the same chunk again still deduplicates.
        assert_eq!(read.store(original).unwrap(), v1);
    }

    #[test]
    fn unknown_version_number_is_an_error() {
        let storage = ChunkStorage::new();
        assert!(storage.restore(1).is_err());
    }
}
