//! Property tests for the chunk split/merge pipeline.
//!
//! Splitting a chunk into parts and merging them back must be lossless
//! for any chunk shape, and structurally equal chunks must always
//! deduplicate to the same version number.

use proptest::prelude::*;
use worldvault::chunk::ChunkStorage;
use worldvault::nbt::{Compound, Tag};

fn leaf_tag() -> impl Strategy<Value = Tag> {
    prop_oneof![
        any::<i8>().prop_map(Tag::Byte),
        any::<i32>().prop_map(Tag::Int),
        any::<i64>().prop_map(Tag::Long),
        any::<f64>().prop_map(Tag::Double),
        "[a-z]{0,12}".prop_map(Tag::String),
        proptest::collection::vec(any::<i64>(), 0..8).prop_map(Tag::LongArray),
    ]
}

fn section() -> impl Strategy<Value = Tag> {
    proptest::collection::btree_map("[a-z]{1,8}", leaf_tag(), 0..4)
        .prop_map(|entries| Tag::Compound(entries.into_iter().collect()))
}

/// A chunk-shaped compound: optional special tags plus arbitrary extras.
fn chunk() -> impl Strategy<Value = Compound> {
    (
        proptest::option::of(any::<i64>()),
        proptest::option::of(any::<i64>()),
        proptest::option::of(proptest::collection::vec(section(), 0..5)),
        proptest::collection::btree_map("[A-Za-z]{1,10}", leaf_tag(), 0..6),
    )
        .prop_map(|(inhabited, last_update, sections, extra)| {
            let mut chunk: Compound = extra.into_iter().collect();
            // A sections tag must be a list; do not let the extras produce
            // a leaf tag under that name.
            chunk.remove("sections");
            if let Some(inhabited) = inhabited {
                chunk.set("InhabitedTime", Tag::Long(inhabited));
            }
            if let Some(last_update) = last_update {
                chunk.set("LastUpdate", Tag::Long(last_update));
            }
            if let Some(sections) = sections {
                chunk.set("sections", Tag::List(sections));
            }
            chunk
        })
}

proptest! {
    #[test]
    fn store_then_restore_is_lossless(chunk in chunk()) {
        let mut storage = ChunkStorage::new();
        let version = storage.store(chunk.clone()).unwrap();
        prop_assert_eq!(storage.restore(version).unwrap(), chunk);
    }

    #[test]
    fn equal_chunks_deduplicate(chunk in chunk(), other in chunk()) {
        let mut storage = ChunkStorage::new();
        let v1 = storage.store(chunk.clone()).unwrap();
        let v2 = storage.store(other.clone()).unwrap();
        let v3 = storage.store(chunk.clone()).unwrap();

        prop_assert_eq!(v1, v3);
        prop_assert_eq!(v1 == v2, chunk == other);
    }

    #[test]
    fn versions_survive_serialization(chunks in proptest::collection::vec(chunk(), 1..5)) {
        let mut storage = ChunkStorage::new();
        let versions: Vec<u32> = chunks
            .iter()
            .map(|chunk| storage.store(chunk.clone()).unwrap())
            .collect();

        let mut bytes = Vec::new();
        storage.write_to(&mut bytes).unwrap();
        let read = ChunkStorage::read_from(&mut bytes.as_slice()).unwrap();

        for (chunk, version) in chunks.iter().zip(versions) {
            prop_assert_eq!(&read.restore(version).unwrap(), chunk);
        }
    }
}
