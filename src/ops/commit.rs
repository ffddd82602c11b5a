//! Taking a snapshot of all tracked worlds.

use crate::error::Result;
use crate::objects::{Commit, Dimension, Reference, RegionFileRef, World, WorldContainer};
use crate::region::{index, storage, CHUNK_COUNT};
use crate::repository::{Repository, TrackedWorld};
use crate::world::{DirectWorldProvider, RegionFileInfo, WorldProvider};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Top-level names in a dimension directory that are not miscellaneous
/// files: region data is tracked separately, nested dimension directories
/// are dimensions of their own.
fn is_misc_file(name: &str) -> bool {
    !matches!(name, "region" | "DIM1" | "DIM-1" | "dimensions")
}

/// Commit the current state of every tracked world.
///
/// Objects are written bottom-up; the head is moved only after the commit
/// object itself is saved, so an interrupted commit leaves at most
/// unreferenced objects behind and never a broken head.
pub fn commit(repository: &Repository, message: &str) -> Result<Reference<Commit>> {
    let objects = repository.objects();

    let head = repository.head()?;
    let current_container = match head {
        Some(reference) => Some(reference.resolve(objects)?.world_container().resolve(objects)?),
        None => None,
    };

    let mut container = WorldContainer::new();
    for tracked_world in repository.tracked_worlds() {
        let current_world = match current_container
            .as_ref()
            .and_then(|container| container.world(tracked_world.id))
        {
            Some(reference) => Some(reference.resolve(objects)?),
            None => None,
        };

        let world = commit_world(repository, tracked_world, current_world.as_ref())?;
        container.add_world(tracked_world.id, objects.save(&world)?);
    }

    let container_reference = objects.save(&container)?;
    let commit = Commit::new(message, now_millis(), container_reference, head);
    let reference = objects.save(&commit)?;
    repository.set_head(reference)?;

    info!(hash = %reference.hash(), message, "created commit");
    Ok(reference)
}

fn commit_world(
    repository: &Repository,
    tracked_world: &TrackedWorld,
    current_world: Option<&World>,
) -> Result<World> {
    let objects = repository.objects();
    let provider = DirectWorldProvider::new(&tracked_world.path);

    let mut world = World::new();
    for dimension_key in provider.dimensions()? {
        debug!(world = %tracked_world.name, dimension = %dimension_key, "processing dimension");

        let current_dimension = match current_world.and_then(|world| world.dimension(&dimension_key))
        {
            Some(reference) => Some(reference.resolve(objects)?),
            None => None,
        };
        let current_misc = match current_dimension.as_ref() {
            Some(dimension) => Some(dimension.misc_files().resolve(objects)?),
            None => None,
        };

        let misc_reference = provider.track_directory_tree(
            &dimension_key,
            objects,
            &is_misc_file,
            current_misc.as_ref(),
        )?;
        let mut dimension = Dimension::new(misc_reference);

        for info in provider.region_files(&dimension_key)? {
            if info.file_size == 0 {
                // The game sometimes leaves empty region files behind.
                // They contain no valid data, skip them.
                warn!(file = %info.file_name, "skipping empty region file");
                continue;
            }

            let current_region = current_dimension
                .as_ref()
                .and_then(|dimension| dimension.region_file(info.pos))
                .copied();

            if let Some(current) = current_region {
                if current.last_modified == info.last_modified {
                    // The file has not been touched since the last commit.
                    // Its version number carries over without reading it.
                    debug!(file = %info.file_name, "not modified");
                    dimension.add_region_file(current);
                    continue;
                }
            }

            let region_version = commit_region(
                repository,
                tracked_world,
                &dimension_key,
                &provider,
                &info,
                current_region.as_ref(),
            )?;
            dimension.add_region_file(RegionFileRef {
                pos: info.pos,
                version_number: region_version,
                last_modified: info.last_modified,
            });
        }

        world.add_dimension(dimension_key, objects.save(&dimension)?);
    }
    Ok(world)
}

fn commit_region(
    repository: &Repository,
    tracked_world: &TrackedWorld,
    dimension_key: &str,
    provider: &dyn WorldProvider,
    info: &RegionFileInfo,
    current_region: Option<&RegionFileRef>,
) -> Result<u32> {
    debug!(file = %info.file_name, "storing region file");

    let storage_path = repository.region_storage_path(tracked_world.id, dimension_key, info.pos);
    let index_path = repository.region_index_path(tracked_world.id, dimension_key, info.pos);
    let retention = repository.config().retention;

    // The chunk version numbers of the previous version of this region, if
    // any, used to skip chunks whose header stamp is unchanged.
    let current_chunk_versions = match current_region {
        Some(current) => Some(index::read(&index_path, current.version_number)?),
        None => None,
    };

    let mut reader = provider.open_region_file(dimension_key, &info.file_name)?;
    let mut chunk_versions = [0u32; CHUNK_COUNT];

    storage::visit(&storage_path, |slot| {
        let (chunk_x, chunk_z) = (slot.chunk_x(), slot.chunk_z());
        if !reader.has_chunk(chunk_x, chunk_z) {
            chunk_versions[slot.index()] = 0;
            return Ok(());
        }

        let stamp = reader.chunk_last_modified(chunk_x, chunk_z);

        if let Some(current) = current_chunk_versions.as_deref() {
            let current_version = current[slot.index()];
            if current_version != 0 && slot.last_modified() == stamp {
                // Unchanged since the previous commit.
                chunk_versions[slot.index()] = current_version;
                return Ok(());
            }
        }

        let chunk = reader.read_chunk(chunk_x, chunk_z)?;
        if retention.keeps(&chunk) {
            chunk_versions[slot.index()] = slot.store(chunk, stamp)?;
        } else {
            chunk_versions[slot.index()] = 0;
        }
        Ok(())
    })?;

    index::append(&index_path, &chunk_versions)
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
