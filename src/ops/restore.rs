//! Reconstructing a world from a commit.

use crate::error::{Result, StoreError};
use crate::objects::{Commit, Reference, Tree};
use crate::region::{index, storage, AnvilWriter};
use crate::repository::Repository;
use crate::store::ObjectStore;
use crate::types::Hash;
use crate::world::dimension_directory;
use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};
use tracing::{debug, info};

/// Restore one world of a commit into an output directory.
///
/// The output directory is created if needed and should be empty: region
/// files are written from scratch and cannot overwrite existing ones.
pub fn restore(
    repository: &Repository,
    commit: Reference<Commit>,
    world_id: Hash,
    output: &Path,
) -> Result<()> {
    let objects = repository.objects();

    let commit = commit.resolve(objects)?;
    let container = commit.world_container().resolve(objects)?;
    let world = container
        .world(world_id)
        .ok_or_else(|| StoreError::WorldNotFound(world_id.to_hex()))?
        .resolve(objects)?;

    for (dimension_key, dimension_reference) in world.dimensions() {
        debug!(dimension = %dimension_key, "restoring dimension");
        let dimension = dimension_reference.resolve(objects)?;
        let dimension_dir = dimension_directory(output, dimension_key);
        fs::create_dir_all(&dimension_dir)?;

        // Miscellaneous files first.
        let misc = dimension.misc_files().resolve(objects)?;
        restore_tree(objects, &misc, &dimension_dir)?;

        // Then the region files.
        if dimension.region_files().is_empty() {
            continue;
        }
        let region_dir = dimension_dir.join("region");
        fs::create_dir_all(&region_dir)?;

        for region_file in dimension.region_files() {
            let pos = region_file.pos;
            let index_path = repository.region_index_path(world_id, dimension_key, pos);
            let storage_path = repository.region_storage_path(world_id, dimension_key, pos);
            let chunk_versions = index::read(&index_path, region_file.version_number)?;

            let mut writer = AnvilWriter::create(region_dir.join(pos.file_name(".mca")))?;
            storage::visit_read_only(&storage_path, |slot| {
                let version_number = chunk_versions[slot.index()];
                if version_number != 0 {
                    let chunk = slot.restore(version_number)?;
                    writer.write_chunk(&chunk, slot.last_modified())?;
                }
                Ok(())
            })?;
            writer.finish()?;
        }
    }

    info!(world = %world_id, output = %output.display(), "restored world");
    Ok(())
}

/// Write a stored tree of files and subdirectories into a directory.
fn restore_tree(objects: &ObjectStore, tree: &Tree, directory: &Path) -> Result<()> {
    fs::create_dir_all(directory)?;
    for (name, file) in tree.files() {
        let blob = file.reference.resolve(objects)?;
        let path = directory.join(name);
        fs::write(&path, blob.bytes())?;

        // Replay the recorded modification time, best effort: not every
        // filesystem supports setting it.
        if file.last_modified > 0 {
            let modified = UNIX_EPOCH + Duration::from_millis(file.last_modified as u64);
            let handle = File::options().write(true).open(&path)?;
            if let Err(e) = handle.set_modified(modified) {
                debug!(file = %path.display(), error = %e, "could not restore modification time");
            }
        }
    }
    for (name, subtree_reference) in tree.subtrees() {
        let subtree = subtree_reference.resolve(objects)?;
        restore_tree(objects, &subtree, &directory.join(name))?;
    }
    Ok(())
}
