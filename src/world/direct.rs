//! Reading world data from a local directory.

use super::{dimension_directory, RegionFileInfo, WorldProvider, NETHER_DIR, THE_END_DIR};
use crate::error::Result;
use crate::objects::{dimension, Blob, FileRef, Reference, Tree};
use crate::region::AnvilReader;
use crate::store::ObjectStore;
use crate::types::RegionPos;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// A world provider that reads a world directory on the local filesystem.
pub struct DirectWorldProvider {
    path: PathBuf,
}

impl DirectWorldProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DirectWorldProvider { path: path.into() }
    }

    fn dimension_path(&self, dimension: &str) -> PathBuf {
        dimension_directory(&self.path, dimension)
    }

    fn track_directory(
        &self,
        store: &ObjectStore,
        directory: &Path,
        filter: &dyn Fn(&str) -> bool,
        current: Option<&Tree>,
    ) -> Result<Reference<Tree>> {
        let mut tree = Tree::new();

        let mut entries: Vec<_> = fs::read_dir(directory)?
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .map(|entry| entry.path())
            .collect();
        entries.sort();

        for path in entries {
            let name = match path.file_name().and_then(|name| name.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            if !filter(&name) {
                continue;
            }

            if path.is_dir() {
                let current_subtree = match current.and_then(|tree| tree.subtrees().get(&name)) {
                    Some(reference) => Some(reference.resolve(store)?),
                    None => None,
                };
                let reference =
                    self.track_directory(store, &path, &|_| true, current_subtree.as_ref())?;
                tree.add_subtree(name, reference);
            } else if path.is_file() {
                let last_modified = file_mtime_millis(&path)?;

                // An unchanged last-modified time means the stored blob can
                // be reused without reading the file.
                if let Some(existing) = current.and_then(|tree| tree.files().get(&name)) {
                    if existing.last_modified == last_modified {
                        tree.add_file(name, *existing);
                        continue;
                    }
                }

                let blob = Blob::new(fs::read(&path)?);
                let reference = store.save(&blob)?;
                tree.add_file(
                    name,
                    FileRef {
                        reference,
                        last_modified,
                    },
                );
            }
        }

        store.save(&tree)
    }
}

fn file_mtime_millis(path: &Path) -> Result<i64> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0))
}

impl WorldProvider for DirectWorldProvider {
    fn dimensions(&self) -> Result<Vec<String>> {
        let mut dimensions = Vec::with_capacity(3);
        if self.path.join("region").is_dir() {
            dimensions.push(dimension::OVERWORLD.to_string());
        }
        if self.path.join(NETHER_DIR).is_dir() {
            dimensions.push(dimension::NETHER.to_string());
        }
        if self.path.join(THE_END_DIR).is_dir() {
            dimensions.push(dimension::THE_END.to_string());
        }
        Ok(dimensions)
    }

    fn region_files(&self, dimension: &str) -> Result<Vec<RegionFileInfo>> {
        let region_dir = self.dimension_path(dimension).join("region");
        if !region_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut region_files = Vec::new();
        for entry in fs::read_dir(region_dir)? {
            let entry = entry?;
            let file_name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            let pos = match RegionPos::parse_file_name(&file_name, ".mca") {
                Some(pos) => pos,
                None => continue,
            };
            let metadata = entry.metadata()?;
            region_files.push(RegionFileInfo {
                file_name,
                pos,
                last_modified: file_mtime_millis(&entry.path())?,
                file_size: metadata.len(),
            });
        }
        Ok(region_files)
    }

    fn open_region_file(&self, dimension: &str, file_name: &str) -> Result<AnvilReader> {
        AnvilReader::open(self.dimension_path(dimension).join("region").join(file_name))
    }

    fn track_directory_tree(
        &self,
        dimension: &str,
        store: &ObjectStore,
        filter: &dyn Fn(&str) -> bool,
        current: Option<&Tree>,
    ) -> Result<Reference<Tree>> {
        self.track_directory(store, &self.dimension_path(dimension), filter, current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn object_store(dir: &TempDir) -> ObjectStore {
        let store = ObjectStore::new(dir.path().join("objects"), 16);
        store.create_directories().unwrap();
        store
    }

    #[test]
    fn detects_the_vanilla_dimensions() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("world/region")).unwrap();
        fs::create_dir_all(dir.path().join("world/DIM-1")).unwrap();

        let provider = DirectWorldProvider::new(dir.path().join("world"));
        let dimensions = provider.dimensions().unwrap();
        assert_eq!(
            dimensions,
            vec![
                dimension::OVERWORLD.to_string(),
                dimension::NETHER.to_string()
            ]
        );
    }

    #[test]
    fn lists_region_files_by_name() {
        let dir = TempDir::new().unwrap();
        let region_dir = dir.path().join("world/region");
        fs::create_dir_all(&region_dir).unwrap();
        fs::write(region_dir.join("r.0.0.mca"), b"x").unwrap();
        fs::write(region_dir.join("r.-1.2.mca"), b"x").unwrap();
        fs::write(region_dir.join("notes.txt"), b"x").unwrap();

        let provider = DirectWorldProvider::new(dir.path().join("world"));
        let mut files = provider.region_files(dimension::OVERWORLD).unwrap();
        files.sort_by_key(|info| (info.pos.x, info.pos.z));
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].pos, RegionPos::new(-1, 2));
        assert_eq!(files[1].pos, RegionPos::new(0, 0));
    }

    #[test]
    fn tracked_tree_contains_files_and_subdirectories() {
        let dir = TempDir::new().unwrap();
        let world = dir.path().join("world");
        fs::create_dir_all(world.join("data")).unwrap();
        fs::write(world.join("level.dat"), b"level").unwrap();
        fs::write(world.join("data/raids.dat"), b"raids").unwrap();
        fs::create_dir_all(world.join("region")).unwrap();
        fs::write(world.join("region/r.0.0.mca"), b"region").unwrap();

        let store = object_store(&dir);
        let provider = DirectWorldProvider::new(&world);
        let filter = |name: &str| name != "region";
        let reference = provider
            .track_directory_tree(dimension::OVERWORLD, &store, &filter, None)
            .unwrap();

        let tree = reference.resolve(&store).unwrap();
        assert!(tree.files().contains_key("level.dat"));
        assert!(!tree.files().contains_key("region"));
        assert!(!tree.subtrees().contains_key("region"));

        let data = tree.subtrees().get("data").unwrap().resolve(&store).unwrap();
        let raids = data.files().get("raids.dat").unwrap();
        assert_eq!(
            raids.reference.resolve(&store).unwrap().bytes(),
            b"raids"
        );
    }

    #[test]
    fn unchanged_files_reuse_the_stored_blob() {
        let dir = TempDir::new().unwrap();
        let world = dir.path().join("world");
        fs::create_dir_all(&world).unwrap();
        fs::write(world.join("level.dat"), b"level").unwrap();

        let store = object_store(&dir);
        let provider = DirectWorldProvider::new(&world);
        let filter = |_: &str| true;

        let first = provider
            .track_directory_tree(dimension::OVERWORLD, &store, &filter, None)
            .unwrap();
        let first_tree = first.resolve(&store).unwrap();

        let second = provider
            .track_directory_tree(dimension::OVERWORLD, &store, &filter, Some(&first_tree))
            .unwrap();
        // Identical content produces the identical tree object.
        assert_eq!(first, second);
    }
}
