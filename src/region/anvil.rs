//! Reading and writing Minecraft region files (the "Anvil" format).
//!
//! A region file holds up to 32x32 chunks. The first two 4096-byte sectors
//! are the header: 1024 chunk locations followed by 1024 last-modified
//! timestamps in epoch seconds. Each chunk is a big-endian length, one
//! compression type byte and the compressed chunk nbt, padded to a whole
//! number of sectors.

use crate::error::{Result, StoreError};
use crate::nbt::{self, Compound, Tag};
use crate::wire;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

pub const SECTOR_SIZE: u64 = 4096;
pub const CHUNK_COUNT: usize = 1024;

/// Zlib, the only chunk compression type written by the game in practice.
const COMPRESSION_ZLIB: u8 = 2;

/// The header slot index of a chunk, from its absolute chunk coordinates.
pub fn chunk_index(chunk_x: i32, chunk_z: i32) -> usize {
    ((chunk_x & 31) + (chunk_z & 31) * 32) as usize
}

/// Get the coordinates of a chunk from its nbt.
///
/// Old versions of the game nest all chunk data in a "Level" tag. Worlds
/// saved by a current version can still contain chunks in that format when
/// they have not been touched in a long time, so fall back to it.
pub fn chunk_pos(chunk: &Compound) -> Result<(i32, i32)> {
    if let (Some(x), Some(z)) = (chunk.int("xPos"), chunk.int("zPos")) {
        return Ok((x, z));
    }
    if let Some(Tag::Compound(level)) = chunk.get("Level") {
        if let (Some(x), Some(z)) = (level.int("xPos"), level.int("zPos")) {
            return Ok((x, z));
        }
    }
    Err(StoreError::InvalidFormat(
        "chunk nbt does not specify its coordinates".into(),
    ))
}

/// Reads chunks from an existing region file.
pub struct AnvilReader {
    file: File,
    locations: [u32; CHUNK_COUNT],
    timestamps: [i32; CHUNK_COUNT],
}

impl AnvilReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut locations = [0u32; CHUNK_COUNT];
        for location in &mut locations {
            *location = wire::read_u32(&mut file)?;
        }
        let mut timestamps = [0i32; CHUNK_COUNT];
        for timestamp in &mut timestamps {
            *timestamp = wire::read_i32(&mut file)?;
        }
        Ok(AnvilReader {
            file,
            locations,
            timestamps,
        })
    }

    pub fn has_chunk(&self, chunk_x: i32, chunk_z: i32) -> bool {
        self.locations[chunk_index(chunk_x, chunk_z)] != 0
    }

    /// The last-modified time of a chunk in epoch seconds, straight from
    /// the header. Zero for an empty slot.
    pub fn chunk_last_modified(&self, chunk_x: i32, chunk_z: i32) -> i32 {
        self.timestamps[chunk_index(chunk_x, chunk_z)]
    }

    /// Read and decompress the nbt of a chunk.
    pub fn read_chunk(&mut self, chunk_x: i32, chunk_z: i32) -> Result<Compound> {
        let location = self.locations[chunk_index(chunk_x, chunk_z)];
        if location == 0 {
            return Err(StoreError::InvalidFormat(format!(
                "chunk {chunk_x} {chunk_z} is empty in this region file"
            )));
        }

        // The top three bytes are the sector offset, the low byte the
        // sector count. The exact byte length is read from the chunk itself.
        let offset_sector = u64::from(location >> 8);
        self.file.seek(SeekFrom::Start(offset_sector * SECTOR_SIZE))?;

        let length = wire::read_u32(&mut self.file)?;
        if length == 0 {
            return Err(StoreError::InvalidFormat(
                "zero-length chunk in region file".into(),
            ));
        }
        let compression_type = wire::read_u8(&mut self.file)?;
        if compression_type != COMPRESSION_ZLIB {
            return Err(StoreError::InvalidFormat(format!(
                "unsupported chunk compression type {compression_type}, only zlib (2) is supported"
            )));
        }

        let mut compressed = vec![0u8; (length - 1) as usize];
        self.file.read_exact(&mut compressed)?;

        let mut decoder = ZlibDecoder::new(compressed.as_slice());
        nbt::read_compound(&mut decoder)
    }
}

/// Writes a new region file from scratch. Chunks are appended in call
/// order; the header is written by [`AnvilWriter::finish`].
pub struct AnvilWriter {
    file: File,
    locations: [u32; CHUNK_COUNT],
    timestamps: [i32; CHUNK_COUNT],
}

impl AnvilWriter {
    /// Create a region file. The file must not already exist; this writer
    /// cannot edit region files in place.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        // Reserve the two header sectors.
        file.seek(SeekFrom::Start(2 * SECTOR_SIZE))?;
        Ok(AnvilWriter {
            file,
            locations: [0; CHUNK_COUNT],
            timestamps: [0; CHUNK_COUNT],
        })
    }

    /// Compress and append a chunk. The slot is taken from the xPos and
    /// zPos tags of the chunk nbt.
    pub fn write_chunk(&mut self, chunk: &Compound, last_modified: i32) -> Result<()> {
        let (chunk_x, chunk_z) = chunk_pos(chunk)?;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        nbt::write_compound(&mut encoder, chunk)?;
        let compressed = encoder.finish()?;

        let offset = self.file.stream_position()?;
        debug_assert_eq!(offset % SECTOR_SIZE, 0);
        let offset_sector = offset / SECTOR_SIZE;

        wire::write_u32(&mut self.file, compressed.len() as u32 + 1)?;
        wire::write_u8(&mut self.file, COMPRESSION_ZLIB)?;
        self.file.write_all(&compressed)?;

        // Pad to the next sector boundary.
        let end = self.file.stream_position()?;
        let padding = (SECTOR_SIZE - end % SECTOR_SIZE) % SECTOR_SIZE;
        if padding > 0 {
            self.file.write_all(&vec![0u8; padding as usize])?;
        }

        let sector_count = (end - offset).div_ceil(SECTOR_SIZE);
        let index = chunk_index(chunk_x, chunk_z);
        self.locations[index] = (offset_sector as u32) << 8 | sector_count as u32;
        self.timestamps[index] = last_modified;
        Ok(())
    }

    /// Write the header and close the file.
    pub fn finish(mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        for location in self.locations {
            wire::write_u32(&mut self.file, location)?;
        }
        for timestamp in self.timestamps {
            wire::write_i32(&mut self.file, timestamp)?;
        }
        self.file.flush()?;
        Ok(())
    }
}
