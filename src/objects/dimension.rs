//! One dimension of a world at one snapshot.

use super::{ObjectKind, Reference, StorageObject, Tree};
use crate::error::Result;
use crate::types::RegionPos;
use crate::wire;
use std::fmt::Write as _;
use std::io::{Read, Write};

pub const OVERWORLD: &str = "minecraft:overworld";
pub const NETHER: &str = "minecraft:the_nether";
pub const THE_END: &str = "minecraft:the_end";

/// A pointer from a dimension into the region version index: which region
/// version number reproduces region (x, z) at this snapshot, plus the
/// last-modified stamp of the source region file used for change detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionFileRef {
    pub pos: RegionPos,
    pub version_number: u32,
    pub last_modified: i64,
}

impl RegionFileRef {
    fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        wire::write_i32(w, self.pos.x)?;
        wire::write_i32(w, self.pos.z)?;
        wire::write_u32(w, self.version_number)?;
        wire::write_i64(w, self.last_modified)
    }

    fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let x = wire::read_i32(r)?;
        let z = wire::read_i32(r)?;
        let version_number = wire::read_u32(r)?;
        let last_modified = wire::read_i64(r)?;
        Ok(RegionFileRef {
            pos: RegionPos::new(x, z),
            version_number,
            last_modified,
        })
    }
}

/// A dimension: its miscellaneous (non-region) file tree and the list of
/// region files present at this snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dimension {
    misc_files: Reference<Tree>,
    region_files: Vec<RegionFileRef>,
}

impl Dimension {
    pub fn new(misc_files: Reference<Tree>) -> Self {
        Dimension {
            misc_files,
            region_files: Vec::new(),
        }
    }

    pub fn misc_files(&self) -> Reference<Tree> {
        self.misc_files
    }

    pub fn add_region_file(&mut self, reference: RegionFileRef) {
        self.region_files.push(reference);
    }

    pub fn region_files(&self) -> &[RegionFileRef] {
        &self.region_files
    }

    pub fn region_file(&self, pos: RegionPos) -> Option<&RegionFileRef> {
        self.region_files.iter().find(|r| r.pos == pos)
    }
}

impl StorageObject for Dimension {
    const KIND: ObjectKind = ObjectKind::Dimension;

    fn write_payload<W: Write>(&self, w: &mut W) -> Result<()> {
        self.misc_files.write_to(w)?;
        wire::write_u32(w, self.region_files.len() as u32)?;
        for region_file in &self.region_files {
            region_file.write_to(w)?;
        }
        Ok(())
    }

    fn read_payload<R: Read>(r: &mut R, _version: u32) -> Result<Self> {
        let misc_files = Reference::read_from(r)?;
        let count = wire::read_u32(r)?;
        let mut region_files = Vec::with_capacity(count as usize);
        for _ in 0..count {
            region_files.push(RegionFileRef::read_from(r)?);
        }
        Ok(Dimension {
            misc_files,
            region_files,
        })
    }

    fn describe(&self) -> String {
        let mut out = String::from("region files:\n");
        for region_file in &self.region_files {
            let _ = writeln!(
                out,
                "region {} {}:\tversion number: {}",
                region_file.pos.x, region_file.pos.z, region_file.version_number
            );
        }
        if self.region_files.is_empty() {
            out.push_str("(empty)\n");
        }
        let _ = write!(out, "miscellaneous files: {}", self.misc_files.hash());
        out
    }
}
