//! End-to-end tests: track a world, commit, and restore.

use std::fs;
use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;
use worldvault::nbt::{Compound, Tag};
use worldvault::ops;
use worldvault::region::{AnvilReader, AnvilWriter};
use worldvault::{Hash, ObjectKind, Repository, RetentionPolicy, StoreError};

/// A chunk as the test worlds contain them: coordinates, an inhabited
/// time, a frequently updating tag and one section of block data.
fn chunk(x: i32, z: i32, inhabited: i64, last_update: i64, marker: i32) -> Compound {
    let mut section = Compound::new();
    section.set("Y", Tag::Byte(0));
    section.set("block_states", Tag::LongArray(vec![marker as i64; 16]));

    let mut chunk = Compound::new();
    chunk.set("xPos", Tag::Int(x));
    chunk.set("zPos", Tag::Int(z));
    chunk.set("InhabitedTime", Tag::Long(inhabited));
    chunk.set("LastUpdate", Tag::Long(last_update));
    chunk.set("Status", Tag::String("minecraft:full".into()));
    chunk.set("sections", Tag::List(vec![Tag::Compound(section)]));
    chunk
}

/// Write a region file from (chunk, header stamp) pairs, replacing any
/// existing file.
fn write_region(path: &Path, chunks: &[(Compound, i32)]) {
    if path.exists() {
        fs::remove_file(path).unwrap();
    }
    let mut writer = AnvilWriter::create(path).unwrap();
    for (chunk, stamp) in chunks {
        writer.write_chunk(chunk, *stamp).unwrap();
    }
    writer.finish().unwrap();
}

/// Build a world directory with a level.dat, a data subdirectory and four
/// region files in the overworld.
fn build_world(world: &Path) {
    fs::create_dir_all(world.join("region")).unwrap();
    fs::create_dir_all(world.join("data")).unwrap();
    fs::write(world.join("level.dat"), b"level data").unwrap();
    fs::write(world.join("data/raids.dat"), b"raids data").unwrap();

    for (rx, rz) in [(0, 0), (0, 1), (-1, 0), (-1, -1)] {
        let base_x = rx * 32;
        let base_z = rz * 32;
        write_region(
            world.join(format!("region/r.{rx}.{rz}.mca")).as_path(),
            &[
                (chunk(base_x, base_z, 100, 1, 1), 1000),
                (chunk(base_x + 1, base_z, 200, 1, 2), 1000),
            ],
        );
    }
}

fn setup() -> (TempDir, Repository, Hash) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let dir = TempDir::new().unwrap();
    build_world(&dir.path().join("world"));
    let mut repository = Repository::init(dir.path().join("vault")).unwrap();
    let world_id = repository
        .track_world("world", dir.path().join("world"))
        .unwrap();
    (dir, repository, world_id)
}

#[test]
fn first_commit_snapshots_the_world() {
    let (dir, repository, world_id) = setup();

    let reference = ops::commit(&repository, "initial snapshot").unwrap();
    assert_eq!(repository.head().unwrap(), Some(reference));

    let objects = repository.objects();
    let commit = reference.resolve(objects).unwrap();
    assert_eq!(commit.message(), "initial snapshot");
    assert!(commit.previous().is_none());

    let container = commit.world_container().resolve(objects).unwrap();
    let world = container.world(world_id).unwrap().resolve(objects).unwrap();
    assert_eq!(world.dimensions().len(), 1);

    let dimension = world
        .dimension("minecraft:overworld")
        .unwrap()
        .resolve(objects)
        .unwrap();
    assert_eq!(dimension.region_files().len(), 4);
    for region_file in dimension.region_files() {
        // First version of every region.
        assert_eq!(region_file.version_number, 1);
    }

    let misc = dimension.misc_files().resolve(objects).unwrap();
    assert!(misc.files().contains_key("level.dat"));
    assert!(misc.subtrees().contains_key("data"));
    assert!(!misc.subtrees().contains_key("region"));

    // The cat dump of the commit is readable.
    let text = objects
        .cat(ObjectKind::Commit, reference.hash())
        .unwrap();
    assert!(text.contains("initial snapshot"));

    drop(dir);
}

#[test]
fn open_or_init_reopens_an_existing_repository() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("vault");
    {
        let mut repository = Repository::open_or_init(&root).unwrap();
        repository.track_world("world", "/srv/world").unwrap();
    }
    let repository = Repository::open_or_init(&root).unwrap();
    assert_eq!(repository.tracked_worlds().len(), 1);
}

#[test]
fn unchanged_world_commits_to_the_same_container() {
    let (_dir, repository, _world_id) = setup();

    let first = ops::commit(&repository, "one").unwrap();
    let second = ops::commit(&repository, "two").unwrap();
    assert_ne!(first, second);

    let objects = repository.objects();
    let first_commit = first.resolve(objects).unwrap();
    let second_commit = second.resolve(objects).unwrap();

    // Nothing changed, so the entire object graph is shared.
    assert_eq!(
        first_commit.world_container(),
        second_commit.world_container()
    );
    assert_eq!(second_commit.previous(), Some(first));
}

#[test]
fn modified_chunk_creates_a_new_region_version() {
    let (dir, repository, world_id) = setup();
    let first = ops::commit(&repository, "one").unwrap();

    // Rewrite one region file: one chunk changed (new header stamp), the
    // other identical. Sleep so the file mtime is observably different.
    std::thread::sleep(Duration::from_millis(20));
    let region_path = dir.path().join("world/region/r.0.0.mca");
    write_region(
        &region_path,
        &[
            (chunk(0, 0, 100, 1, 1), 1000),
            (chunk(1, 0, 250, 2, 9), 2000),
        ],
    );

    let second = ops::commit(&repository, "two").unwrap();
    let objects = repository.objects();

    let dimension_of = |reference: worldvault::Reference<worldvault::Commit>| {
        reference
            .resolve(objects)
            .unwrap()
            .world_container()
            .resolve(objects)
            .unwrap()
            .world(world_id)
            .unwrap()
            .resolve(objects)
            .unwrap()
            .dimension("minecraft:overworld")
            .unwrap()
            .resolve(objects)
            .unwrap()
    };

    let before = dimension_of(first);
    let after = dimension_of(second);

    let pos = worldvault::RegionPos::new(0, 0);
    assert_eq!(before.region_file(pos).unwrap().version_number, 1);
    assert_eq!(after.region_file(pos).unwrap().version_number, 2);

    // Untouched regions kept their version and stamp.
    let other = worldvault::RegionPos::new(-1, 0);
    assert_eq!(
        before.region_file(other).unwrap(),
        after.region_file(other).unwrap()
    );

    // Both versions restore their own content.
    let restore_one = dir.path().join("restore-one");
    let restore_two = dir.path().join("restore-two");
    ops::restore(&repository, first, world_id, &restore_one).unwrap();
    ops::restore(&repository, second, world_id, &restore_two).unwrap();

    let mut reader = AnvilReader::open(restore_one.join("region/r.0.0.mca")).unwrap();
    assert_eq!(reader.read_chunk(1, 0).unwrap(), chunk(1, 0, 200, 1, 2));

    let mut reader = AnvilReader::open(restore_two.join("region/r.0.0.mca")).unwrap();
    assert_eq!(reader.read_chunk(1, 0).unwrap(), chunk(1, 0, 250, 2, 9));
    assert_eq!(reader.chunk_last_modified(1, 0), 2000);
    // The unchanged chunk is identical in both restores.
    assert_eq!(reader.read_chunk(0, 0).unwrap(), chunk(0, 0, 100, 1, 1));
}

#[test]
fn restore_reproduces_misc_files_and_chunks() {
    let (dir, repository, world_id) = setup();
    let reference = ops::commit(&repository, "snapshot").unwrap();

    let output = dir.path().join("restored");
    ops::restore(&repository, reference, world_id, &output).unwrap();

    assert_eq!(fs::read(output.join("level.dat")).unwrap(), b"level data");
    assert_eq!(
        fs::read(output.join("data/raids.dat")).unwrap(),
        b"raids data"
    );

    for (rx, rz) in [(0, 0), (0, 1), (-1, 0), (-1, -1)] {
        let path = output.join(format!("region/r.{rx}.{rz}.mca"));
        let mut reader = AnvilReader::open(&path).unwrap();
        let base_x = rx * 32;
        let base_z = rz * 32;
        assert_eq!(
            reader.read_chunk(base_x, base_z).unwrap(),
            chunk(base_x, base_z, 100, 1, 1)
        );
        assert_eq!(
            reader.read_chunk(base_x + 1, base_z).unwrap(),
            chunk(base_x + 1, base_z, 200, 1, 2)
        );
        assert_eq!(reader.chunk_last_modified(base_x, base_z), 1000);
        assert!(!reader.has_chunk(base_x + 2, base_z));
    }
}

#[test]
fn nether_dimension_is_tracked_and_restored() {
    let dir = TempDir::new().unwrap();
    let world = dir.path().join("world");
    build_world(&world);
    fs::create_dir_all(world.join("DIM-1/region")).unwrap();
    write_region(
        &world.join("DIM-1/region/r.0.0.mca"),
        &[(chunk(3, 3, 50, 1, 7), 500)],
    );

    let mut repository = Repository::init(dir.path().join("vault")).unwrap();
    let world_id = repository.track_world("world", &world).unwrap();
    let reference = ops::commit(&repository, "with nether").unwrap();

    let objects = repository.objects();
    let commit = reference.resolve(objects).unwrap();
    let container = commit.world_container().resolve(objects).unwrap();
    let tracked = container.world(world_id).unwrap().resolve(objects).unwrap();
    assert!(tracked.dimension("minecraft:the_nether").is_some());

    let output = dir.path().join("restored");
    ops::restore(&repository, reference, world_id, &output).unwrap();
    let mut reader = AnvilReader::open(output.join("DIM-1/region/r.0.0.mca")).unwrap();
    assert_eq!(reader.read_chunk(3, 3).unwrap(), chunk(3, 3, 50, 1, 7));
}

#[test]
fn retention_policy_skips_uninhabited_chunks() {
    let dir = TempDir::new().unwrap();
    let world = dir.path().join("world");
    fs::create_dir_all(world.join("region")).unwrap();
    write_region(
        &world.join("region/r.0.0.mca"),
        &[
            (chunk(0, 0, 0, 1, 1), 1000),
            (chunk(1, 0, 400, 1, 2), 1000),
        ],
    );

    let mut repository = Repository::init(dir.path().join("vault")).unwrap();
    repository
        .set_retention(RetentionPolicy::MinInhabitedTime(1))
        .unwrap();
    let world_id = repository.track_world("world", &world).unwrap();
    let reference = ops::commit(&repository, "pruned").unwrap();

    let output = dir.path().join("restored");
    ops::restore(&repository, reference, world_id, &output).unwrap();

    let mut reader = AnvilReader::open(output.join("region/r.0.0.mca")).unwrap();
    assert!(!reader.has_chunk(0, 0));
    assert_eq!(reader.read_chunk(1, 0).unwrap(), chunk(1, 0, 400, 1, 2));
}

#[test]
fn log_walks_the_commit_chain_newest_first() {
    let (_dir, repository, _world_id) = setup();
    assert!(ops::log(&repository).unwrap().is_empty());

    ops::commit(&repository, "one").unwrap();
    ops::commit(&repository, "two").unwrap();
    ops::commit(&repository, "three").unwrap();

    let log = ops::log(&repository).unwrap();
    let messages: Vec<_> = log.iter().map(|(_, commit)| commit.message()).collect();
    assert_eq!(messages, vec!["three", "two", "one"]);
    assert_eq!(repository.head().unwrap(), Some(log[0].0));
}

#[test]
fn restoring_an_untracked_world_fails() {
    let (dir, repository, _world_id) = setup();
    let reference = ops::commit(&repository, "snapshot").unwrap();

    let bogus = Hash::from_bytes(b"not a world");
    let result = ops::restore(&repository, reference, bogus, &dir.path().join("out"));
    assert!(matches!(result, Err(StoreError::WorldNotFound(_))));
}

#[test]
fn empty_region_files_are_skipped() {
    let (dir, repository, world_id) = setup();
    fs::write(dir.path().join("world/region/r.5.5.mca"), b"").unwrap();

    let reference = ops::commit(&repository, "snapshot").unwrap();
    let objects = repository.objects();
    let dimension = reference
        .resolve(objects)
        .unwrap()
        .world_container()
        .resolve(objects)
        .unwrap()
        .world(world_id)
        .unwrap()
        .resolve(objects)
        .unwrap()
        .dimension("minecraft:overworld")
        .unwrap()
        .resolve(objects)
        .unwrap();

    assert_eq!(dimension.region_files().len(), 4);
    assert!(dimension
        .region_file(worldvault::RegionPos::new(5, 5))
        .is_none());
}
