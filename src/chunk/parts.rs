//! Chunk data parts.
//!
//! Chunk nbt is split into parts that are versioned independently, so a tag
//! that updates every tick does not force the block data to be stored again.

use super::nbt_store::{NbtStore, VersionMap};
use crate::error::{Result, StoreError};
use crate::nbt::{Compound, Tag};
use crate::wire;
use std::io::{Read, Write};

/// The key of the sections list inside chunk nbt.
const SECTIONS_TAG: &str = "sections";

/// The version number used when a chunk had no sections list.
pub const NO_SECTIONS: u32 = 0;

/// Identifies one part of a chunk's nbt data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PartId {
    /// Everything not extracted by another part. Must run last.
    Remaining = 1,
    /// Tags that change nearly every time the chunk is saved.
    FrequentUpdaters = 2,
    /// The sections list, versioned per section.
    Sections = 3,
    BlockEntities = 4,
    Heightmaps = 5,
}

impl PartId {
    /// Extraction order. Only the position of [`PartId::Remaining`] matters,
    /// it has to come after every other part.
    pub const ORDERED: [PartId; 5] = [
        PartId::FrequentUpdaters,
        PartId::Sections,
        PartId::BlockEntities,
        PartId::Heightmaps,
        PartId::Remaining,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            1 => Ok(PartId::Remaining),
            2 => Ok(PartId::FrequentUpdaters),
            3 => Ok(PartId::Sections),
            4 => Ok(PartId::BlockEntities),
            5 => Ok(PartId::Heightmaps),
            _ => Err(StoreError::InvalidFormat(format!(
                "unknown chunk data part id: {id}"
            ))),
        }
    }

    /// The keys a key-extraction part moves out of the chunk nbt.
    fn keys(self) -> &'static [&'static str] {
        match self {
            PartId::FrequentUpdaters => &["LastUpdate", "InhabitedTime"],
            PartId::BlockEntities => &["block_entities"],
            PartId::Heightmaps => &["Heightmaps"],
            PartId::Remaining | PartId::Sections => &[],
        }
    }

    pub fn create_store(self) -> PartStore {
        match self {
            PartId::Sections => PartStore::Sections(SectionStore::new()),
            _ => PartStore::Nbt(NbtStore::new()),
        }
    }

    pub fn read_store<R: Read>(self, r: &mut R) -> Result<PartStore> {
        match self {
            PartId::Sections => Ok(PartStore::Sections(SectionStore::read_from(r)?)),
            _ => Ok(PartStore::Nbt(NbtStore::read_from(r)?)),
        }
    }
}

/// Storage for one chunk data part.
#[derive(Clone, Debug, PartialEq)]
pub enum PartStore {
    Nbt(NbtStore),
    Sections(SectionStore),
}

impl PartStore {
    /// Extract this part from the chunk nbt and store it, returning the
    /// version number the part is stored as.
    ///
    /// The extracted tags are removed from `chunk`, which is why the
    /// remaining part must run after every other part.
    pub fn store_part(&mut self, part: PartId, chunk: &mut Compound) -> Result<u32> {
        match self {
            PartStore::Nbt(store) => {
                let extracted = match part {
                    PartId::Remaining => std::mem::take(chunk),
                    _ => {
                        let mut extracted = Compound::new();
                        for &key in part.keys() {
                            if let Some(tag) = chunk.remove(key) {
                                extracted.set(key, tag);
                            }
                        }
                        extracted
                    }
                };
                Ok(store.store(extracted))
            }
            PartStore::Sections(store) => store.store(chunk),
        }
    }

    /// Restore this part into the chunk nbt.
    pub fn restore_part(&self, chunk: &mut Compound, version_number: u32) -> Result<()> {
        match self {
            PartStore::Nbt(store) => {
                chunk.merge(store.get(version_number)?.clone());
                Ok(())
            }
            PartStore::Sections(store) => store.restore(chunk, version_number),
        }
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        match self {
            PartStore::Nbt(store) => store.write_to(w),
            PartStore::Sections(store) => store.write_to(w),
        }
    }
}

/// Storage for the sections list of a chunk.
///
/// Each section index gets its own nbt store so that when one section
/// changes, only that section is stored again. The per-snapshot list of
/// section version numbers is itself deduplicated.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SectionStore {
    list_versions: VersionMap<Vec<u32>>,
    section_stores: Vec<NbtStore>,
}

impl SectionStore {
    pub fn new() -> Self {
        SectionStore::default()
    }

    /// Store the sections list of a chunk, removing it from the chunk nbt.
    /// Returns [`NO_SECTIONS`] when the chunk has no sections list.
    pub fn store(&mut self, chunk: &mut Compound) -> Result<u32> {
        let sections = match chunk.remove(SECTIONS_TAG) {
            Some(Tag::List(sections)) => sections,
            Some(_) => {
                return Err(StoreError::InvalidFormat(
                    "sections tag is not a list".into(),
                ))
            }
            None => return Ok(NO_SECTIONS),
        };

        if self.section_stores.len() < sections.len() {
            self.section_stores.resize_with(sections.len(), NbtStore::new);
        }

        let mut version_numbers = Vec::with_capacity(sections.len());
        for (index, section) in sections.into_iter().enumerate() {
            let section = match section {
                Tag::Compound(section) => section,
                _ => {
                    return Err(StoreError::InvalidFormat(
                        "sections list element is not a compound".into(),
                    ))
                }
            };
            version_numbers.push(self.section_stores[index].store(section));
        }

        Ok(self.list_versions.insert(version_numbers))
    }

    /// Restore a sections list into the chunk nbt.
    pub fn restore(&self, chunk: &mut Compound, version_number: u32) -> Result<()> {
        if version_number == NO_SECTIONS {
            return Ok(());
        }

        let version_numbers = self.list_versions.get(version_number).ok_or_else(|| {
            StoreError::InvalidFormat(format!(
                "sections list version number {version_number} not present in storage"
            ))
        })?;

        let mut sections = Vec::with_capacity(version_numbers.len());
        for (index, &section_version) in version_numbers.iter().enumerate() {
            let store = self.section_stores.get(index).ok_or_else(|| {
                StoreError::InvalidFormat(format!("no section storage for index {index}"))
            })?;
            sections.push(Tag::Compound(store.get(section_version)?.clone()));
        }

        chunk.set(SECTIONS_TAG, Tag::List(sections));
        Ok(())
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        wire::write_u32(w, self.list_versions.len() as u32)?;
        for (number, version_numbers) in self.list_versions.iter() {
            wire::write_u32(w, number)?;
            wire::write_u32(w, version_numbers.len() as u32)?;
            for &section_version in version_numbers {
                wire::write_u32(w, section_version)?;
            }
        }
        wire::write_u32(w, self.section_stores.len() as u32)?;
        for store in &self.section_stores {
            store.write_to(w)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let list_count = wire::read_u32(r)?;
        let mut list_versions = VersionMap::new();
        for _ in 0..list_count {
            let number = wire::read_u32(r)?;
            let len = wire::read_u32(r)?;
            let mut version_numbers = Vec::with_capacity(len as usize);
            for _ in 0..len {
                version_numbers.push(wire::read_u32(r)?);
            }
            list_versions.insert_numbered(number, version_numbers);
        }
        let store_count = wire::read_u32(r)?;
        let mut section_stores = Vec::with_capacity(store_count as usize);
        for _ in 0..store_count {
            section_stores.push(NbtStore::read_from(r)?);
        }
        Ok(SectionStore {
            list_versions,
            section_stores,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(y: i8, marker: i32) -> Tag {
        let mut section = Compound::new();
        section.set("Y", Tag::Byte(y));
        section.set("marker", Tag::Int(marker));
        Tag::Compound(section)
    }

    fn chunk_with_sections(markers: &[i32]) -> Compound {
        let mut chunk = Compound::new();
        let sections = markers
            .iter()
            .enumerate()
            .map(|(i, &m)| section(i as i8 - 4, m))
            .collect();
        chunk.set(SECTIONS_TAG, Tag::List(sections));
        chunk
    }

    #[test]
    fn missing_sections_uses_marker_version() {
        let mut store = SectionStore::new();
        let mut chunk = Compound::new();
        chunk.set("Status", Tag::String("full".into()));
        assert_eq!(store.store(&mut chunk).unwrap(), NO_SECTIONS);

        let mut restored = Compound::new();
        store.restore(&mut restored, NO_SECTIONS).unwrap();
        assert!(!restored.contains_key(SECTIONS_TAG));
    }

    #[test]
    fn changing_one_section_stores_only_that_section() {
        let mut store = SectionStore::new();

        let mut first = chunk_with_sections(&[10, 20, 30]);
        let v1 = store.store(&mut first).unwrap();

        // Same content again reuses the list version.
        let mut same = chunk_with_sections(&[10, 20, 30]);
        assert_eq!(store.store(&mut same).unwrap(), v1);

        // One changed section: the two unchanged stores grow by nothing.
        let mut changed = chunk_with_sections(&[10, 99, 30]);
        let v2 = store.store(&mut changed).unwrap();
        assert_ne!(v1, v2);
        assert_eq!(store.section_stores[0].len(), 1);
        assert_eq!(store.section_stores[1].len(), 2);
        assert_eq!(store.section_stores[2].len(), 1);
    }

    #[test]
    fn restore_rebuilds_the_sections_list() {
        let mut store = SectionStore::new();
        let original = chunk_with_sections(&[1, 2]);
        let mut working = original.clone();
        let version = store.store(&mut working).unwrap();

        let mut restored = Compound::new();
        store.restore(&mut restored, version).unwrap();
        assert_eq!(restored.get(SECTIONS_TAG), original.get(SECTIONS_TAG));
    }

    #[test]
    fn extraction_removes_tags_from_the_chunk() {
        let mut store = PartId::FrequentUpdaters.create_store();
        let mut chunk = Compound::new();
        chunk.set("LastUpdate", Tag::Long(500));
        chunk.set("InhabitedTime", Tag::Long(60));
        chunk.set("Status", Tag::String("full".into()));

        let version = store
            .store_part(PartId::FrequentUpdaters, &mut chunk)
            .unwrap();
        assert_eq!(version, 1);
        assert!(!chunk.contains_key("LastUpdate"));
        assert!(!chunk.contains_key("InhabitedTime"));
        assert!(chunk.contains_key("Status"));
    }

    #[test]
    fn unknown_part_id_is_rejected() {
        assert!(PartId::from_id(0).is_err());
        assert!(PartId::from_id(6).is_err());
    }
}
