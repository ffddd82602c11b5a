//! Streaming access to region storage files.
//!
//! A region storage file holds the [`ChunkStorage`] of each of the 1024
//! chunk slots of one region, together with the last-modified stamp of the
//! most recently stored version of the slot. Slots are visited in a fixed
//! order (z rows, x within a row) so a visit only ever holds one slot in
//! memory: each slot is read, handed to the visitor, and written out again
//! before the next one is touched.

use crate::chunk::ChunkStorage;
use crate::error::{Result, StoreError};
use crate::nbt::Compound;
use crate::types::{magic, validate_version, FORMAT_VERSION};
use crate::wire;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

/// The minimum format version of region storage files this build reads.
const MIN_STORAGE_VERSION: u32 = 1;

/// One chunk slot being visited.
pub struct Slot {
    index: usize,
    chunk_x: i32,
    chunk_z: i32,
    last_modified: i32,
    storage: ChunkStorage,
    read_only: bool,
}

impl Slot {
    /// The slot index in the region storage file, 0 to 1023.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Chunk x coordinate relative to the region, 0 to 31.
    pub fn chunk_x(&self) -> i32 {
        self.chunk_x
    }

    /// Chunk z coordinate relative to the region, 0 to 31.
    pub fn chunk_z(&self) -> i32 {
        self.chunk_z
    }

    /// The last-modified stamp of the latest stored version of this slot,
    /// in epoch seconds. Zero when nothing has been stored.
    pub fn last_modified(&self) -> i32 {
        self.last_modified
    }

    /// Store a new version of the chunk, returning its chunk version
    /// number. The stamp becomes the slot's last-modified stamp.
    pub fn store(&mut self, chunk: Compound, last_modified: i32) -> Result<u32> {
        if self.read_only {
            return Err(StoreError::InvalidArgument(
                "cannot store a chunk during a read-only visit".into(),
            ));
        }
        let version_number = self.storage.store(chunk)?;
        self.last_modified = last_modified;
        Ok(version_number)
    }

    /// Restore the chunk nbt at the given chunk version number.
    pub fn restore(&self, version_number: u32) -> Result<Compound> {
        self.storage.restore(version_number)
    }
}

/// Visit a region storage file for reading and writing.
///
/// The file is created if it does not exist. The updated storage is
/// written to a temporary file and moved into place, so a failed visit
/// leaves the original file untouched.
pub fn visit<F>(path: &Path, mut visitor: F) -> Result<()>
where
    F: FnMut(&mut Slot) -> Result<()>,
{
    let parent = path.parent().ok_or_else(|| {
        StoreError::InvalidArgument("region storage path has no parent directory".into())
    })?;
    std::fs::create_dir_all(parent)?;

    let mut input = match File::open(path) {
        Ok(file) => Some(read_header(zstd::Decoder::new(file)?)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };

    let temp = tempfile::NamedTempFile::new_in(parent)?;
    let mut output = zstd::Encoder::new(BufWriter::new(temp.as_file()), 0)?;
    wire::write_u32(&mut output, magic::REGION_STORAGE)?;
    wire::write_u32(&mut output, FORMAT_VERSION)?;

    visit_slots(input.as_mut(), &mut |slot| {
        visitor(slot)?;
        wire::write_i32(&mut output, slot.last_modified)?;
        slot.storage.write_to(&mut output)
    })?;

    output.finish()?.flush()?;
    temp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

/// Visit an existing region storage file for reading.
pub fn visit_read_only<F>(path: &Path, mut visitor: F) -> Result<()>
where
    F: FnMut(&mut Slot) -> Result<()>,
{
    let file = File::open(path)?;
    let mut input = read_header(zstd::Decoder::new(file)?)?;
    visit_slots(Some(&mut input), &mut |slot| {
        slot.read_only = true;
        visitor(slot)
    })
}

fn read_header<R: Read>(mut input: R) -> Result<R> {
    wire::expect_magic(&mut input, magic::REGION_STORAGE)?;
    let version = wire::read_u32(&mut input)?;
    validate_version(version, MIN_STORAGE_VERSION)?;
    Ok(input)
}

fn visit_slots<R: Read>(
    mut input: Option<&mut R>,
    visit: &mut dyn FnMut(&mut Slot) -> Result<()>,
) -> Result<()> {
    let mut index = 0;
    for chunk_z in 0..32 {
        for chunk_x in 0..32 {
            // The iteration order defines the slot index.
            let (last_modified, storage) = match input.as_mut() {
                Some(input) => (wire::read_i32(*input)?, ChunkStorage::read_from(*input)?),
                None => (0, ChunkStorage::new()),
            };
            let mut slot = Slot {
                index,
                chunk_x,
                chunk_z,
                last_modified,
                storage,
                read_only: false,
            };
            visit(&mut slot)?;
            index += 1;
        }
    }
    Ok(())
}
