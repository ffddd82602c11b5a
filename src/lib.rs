//! # worldvault
//!
//! An incremental snapshot engine for Minecraft worlds.
//!
//! ## Core Concepts
//!
//! - **Objects**: Content-addressed storage for blobs, trees, dimensions,
//!   worlds and commits. Identical content is stored once.
//! - **Chunk storage**: Chunk nbt is split into parts that are versioned
//!   and deduplicated independently, so a timestamp tick does not force
//!   the block data to be stored again.
//! - **Region storage**: The 1024 chunk slots of a region are visited in a
//!   stream, one slot in memory at a time. A region version index maps a
//!   small version number to the chunk versions that reproduce the region.
//! - **Commits**: Each commit snapshots every tracked world. Unchanged
//!   files and chunks are detected by last-modified stamps and reuse what
//!   a previous commit stored.
//!
//! ## Example
//!
//! ```ignore
//! use worldvault::{ops, Repository};
//!
//! let mut repository = Repository::open_or_init("./vault")?;
//! repository.track_world("world", "/srv/minecraft/world")?;
//!
//! let commit = ops::commit(&repository, "nightly backup")?;
//! println!("commit hash: {}", commit.hash());
//! ```

pub mod chunk;
pub mod error;
pub mod nbt;
pub mod objects;
pub mod ops;
pub mod region;
pub mod repository;
pub mod store;
pub mod types;
pub mod wire;
pub mod world;

// Re-exports
pub use error::{Result, StoreError};
pub use objects::{
    Blob, Commit, Dimension, FileRef, ObjectKind, Reference, RegionFileRef, StorageObject, Tree,
    World, WorldContainer,
};
pub use repository::{Config, Repository, RetentionPolicy, TrackedWorld};
pub use store::ObjectStore;
pub use types::{Hash, RegionPos, FORMAT_VERSION};
pub use world::{DirectWorldProvider, RegionFileInfo, WorldProvider};
