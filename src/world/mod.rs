//! Access to the worlds being tracked.

mod direct;

pub use direct::DirectWorldProvider;

use crate::error::Result;
use crate::objects::{dimension, Reference, Tree};
use crate::region::AnvilReader;
use crate::store::ObjectStore;
use crate::types::RegionPos;
use std::path::{Path, PathBuf};

/// The directory of the nether dimension inside a world directory.
pub(crate) const NETHER_DIR: &str = "DIM-1";
/// The directory of the end dimension inside a world directory.
pub(crate) const THE_END_DIR: &str = "DIM1";

/// The directory a dimension lives in inside a world directory. The
/// overworld is the world directory itself.
pub fn dimension_directory(world_path: &Path, dimension: &str) -> PathBuf {
    match dimension {
        dimension::OVERWORLD => world_path.to_path_buf(),
        dimension::NETHER => world_path.join(NETHER_DIR),
        dimension::THE_END => world_path.join(THE_END_DIR),
        custom => {
            let mut path = world_path.join("dimensions");
            for part in custom.split(':') {
                path.push(part);
            }
            path
        }
    }
}

/// Information about a region file in a world, gathered without opening it.
#[derive(Clone, Debug)]
pub struct RegionFileInfo {
    pub file_name: String,
    pub pos: RegionPos,
    /// Last modified time of the file in milliseconds since the epoch.
    pub last_modified: i64,
    pub file_size: u64,
}

/// A source of world data to take snapshots of.
///
/// The provider abstracts where the world lives; the snapshot logic only
/// ever talks to this trait.
pub trait WorldProvider {
    /// The dimensions present in the world, as dimension keys.
    fn dimensions(&self) -> Result<Vec<String>>;

    /// The region files of a dimension. An empty list when the dimension
    /// has no region directory.
    fn region_files(&self, dimension: &str) -> Result<Vec<RegionFileInfo>>;

    /// Open a region file of a dimension for reading.
    fn open_region_file(&self, dimension: &str, file_name: &str) -> Result<AnvilReader>;

    /// Store the non-region files of a dimension as a tree of blobs.
    ///
    /// `filter` decides which top-level names to include. When the current
    /// tree of the previous snapshot is given, files whose last-modified
    /// time is unchanged reuse the stored blob without being read.
    fn track_directory_tree(
        &self,
        dimension: &str,
        store: &ObjectStore,
        filter: &dyn Fn(&str) -> bool,
        current: Option<&Tree>,
    ) -> Result<Reference<Tree>>;
}
