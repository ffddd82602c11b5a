//! The typed objects stored in the content-addressed object store.
//!
//! Objects reference each other by hash, forming a DAG that represents one
//! snapshot: Commit -> WorldContainer -> World -> Dimension -> Tree/Blob.
//! Objects are immutable once written; identical content always serializes
//! to identical bytes and therefore a single stored copy.

mod blob;
mod commit;
pub mod dimension;
mod reference;
mod tree;
mod world;
mod world_container;

pub use blob::Blob;
pub use commit::Commit;
pub use dimension::{Dimension, RegionFileRef};
pub use reference::Reference;
pub use tree::{FileRef, Tree};
pub use world::World;
pub use world_container::WorldContainer;

use crate::error::{Result, StoreError};
use crate::types::magic;
use std::io::{Read, Write};

/// The closed set of object types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Blob,
    Tree,
    Dimension,
    World,
    WorldContainer,
    Commit,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 6] = [
        ObjectKind::Blob,
        ObjectKind::Tree,
        ObjectKind::Dimension,
        ObjectKind::World,
        ObjectKind::WorldContainer,
        ObjectKind::Commit,
    ];

    /// Directory name of this object type inside `objects/`.
    pub fn id(&self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Dimension => "dimension",
            ObjectKind::World => "world",
            ObjectKind::WorldContainer => "world_container",
            ObjectKind::Commit => "commit",
        }
    }

    /// The magic number written at the start of serialized objects.
    pub fn magic(&self) -> u32 {
        match self {
            ObjectKind::Blob => magic::BLOB,
            ObjectKind::Tree => magic::TREE,
            ObjectKind::Dimension => magic::DIMENSION,
            ObjectKind::World => magic::WORLD,
            ObjectKind::WorldContainer => magic::WORLD_CONTAINER,
            ObjectKind::Commit => magic::COMMIT,
        }
    }

    /// Look an object kind up by its id.
    pub fn from_id(id: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.id() == id)
            .ok_or_else(|| StoreError::InvalidArgument(format!("unknown object type \"{id}\"")))
    }
}

/// An object that can be stored by its content hash.
pub trait StorageObject: Sized {
    const KIND: ObjectKind;

    /// Serialize the payload (everything after the magic + version header).
    fn write_payload<W: Write>(&self, w: &mut W) -> Result<()>;

    /// Deserialize the payload. `version` is the already-validated format
    /// version read from the header.
    fn read_payload<R: Read>(r: &mut R, version: u32) -> Result<Self>;

    /// A human-readable dump, used by [`crate::store::ObjectStore::cat`].
    fn describe(&self) -> String;
}
