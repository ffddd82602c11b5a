//! High-level operations on a repository.

mod commit;
mod log;
mod restore;

pub use commit::commit;
pub use log::log;
pub use restore::restore;
