//! Incremental storage of region files.
//!
//! Two kinds of files cooperate per region: the region storage file holds
//! the versioned chunk data of all 1024 chunk slots, and the region version
//! index maps region version numbers to the chunk version numbers that make
//! up each version of the region.

pub mod anvil;
pub mod index;
pub mod storage;

pub use anvil::{AnvilReader, AnvilWriter, CHUNK_COUNT};
