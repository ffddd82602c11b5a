//! Region version index files.
//!
//! For each region, the index maps a region version number to the 1024
//! chunk version numbers that reproduce that version of the region. The
//! dimension object references regions by these version numbers.

use super::CHUNK_COUNT;
use crate::error::{Result, StoreError};
use crate::types::{magic, validate_version, FORMAT_VERSION};
use crate::wire;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

const MIN_INDEX_VERSION: u32 = 1;

/// Record a region version, returning its region version number.
///
/// If an existing version has exactly the same chunk version numbers, its
/// number is returned and the file is not modified. Otherwise the new
/// version is appended under the next number and the file is atomically
/// rewritten. The index holds only version numbers so it stays small
/// enough to rewrite whole.
pub fn append(path: &Path, chunk_versions: &[u32; CHUNK_COUNT]) -> Result<u32> {
    let parent = path.parent().ok_or_else(|| {
        StoreError::InvalidArgument("region version index path has no parent directory".into())
    })?;
    std::fs::create_dir_all(parent)?;

    let entries = match File::open(path) {
        Ok(file) => read_entries(file)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    for (number, existing) in &entries {
        if existing.as_ref() == chunk_versions {
            return Ok(*number);
        }
    }

    let number = entries.iter().map(|(n, _)| *n).max().unwrap_or(0) + 1;

    let temp = tempfile::NamedTempFile::new_in(parent)?;
    let mut output = zstd::Encoder::new(BufWriter::new(temp.as_file()), 0)?;
    wire::write_u32(&mut output, magic::REGION_VERSIONS)?;
    wire::write_u32(&mut output, FORMAT_VERSION)?;
    wire::write_u32(&mut output, entries.len() as u32 + 1)?;
    for (existing_number, existing) in &entries {
        write_entry(&mut output, *existing_number, existing)?;
    }
    write_entry(&mut output, number, chunk_versions)?;
    output.finish()?.flush()?;
    temp.persist(path).map_err(|e| StoreError::Io(e.error))?;

    Ok(number)
}

/// Read the chunk version numbers of a region version.
pub fn read(path: &Path, region_version: u32) -> Result<Box<[u32; CHUNK_COUNT]>> {
    let entries = read_entries(File::open(path)?)?;
    entries
        .into_iter()
        .find(|(number, _)| *number == region_version)
        .map(|(_, chunk_versions)| chunk_versions)
        .ok_or_else(|| {
            StoreError::InvalidFormat(format!(
                "region version number {region_version} not present in the index"
            ))
        })
}

fn write_entry<W: Write>(w: &mut W, number: u32, chunk_versions: &[u32; CHUNK_COUNT]) -> Result<()> {
    wire::write_u32(w, number)?;
    for &version in chunk_versions.iter() {
        wire::write_u32(w, version)?;
    }
    Ok(())
}

#[allow(clippy::type_complexity)]
fn read_entries(file: File) -> Result<Vec<(u32, Box<[u32; CHUNK_COUNT]>)>> {
    let mut input = zstd::Decoder::new(file)?;
    wire::expect_magic(&mut input, magic::REGION_VERSIONS)?;
    let version = wire::read_u32(&mut input)?;
    validate_version(version, MIN_INDEX_VERSION)?;

    let count = wire::read_u32(&mut input)?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let number = wire::read_u32(&mut input)?;
        let mut chunk_versions = Box::new([0u32; CHUNK_COUNT]);
        for version in chunk_versions.iter_mut() {
            *version = wire::read_u32(&mut input)?;
        }
        entries.push((number, chunk_versions));
    }
    read_trailing(&mut input)?;
    Ok(entries)
}

fn read_trailing<R: Read>(input: &mut R) -> Result<()> {
    let mut buf = [0u8; 1];
    match input.read(&mut buf)? {
        0 => Ok(()),
        _ => Err(StoreError::InvalidFormat(
            "trailing data after region version index entries".into(),
        )),
    }
}
